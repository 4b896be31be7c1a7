//! facetrack-engine: Tracking loop controller.
//!
//! Drives a [`RegionLocator`](facetrack_core::RegionLocator) over a
//! [`FrameSource`](facetrack_hw::FrameSource) at a fixed interval, keeps
//! the overlay current and answers quality queries for capture gating.

pub mod config;
pub mod snapshot;
pub mod tracker;

pub use config::{ConfigError, TrackerConfig};
pub use snapshot::{Detected, QualitySnapshot};
pub use tracker::{OverlayTarget, SharedSurface, Tracker, TrackerError};
