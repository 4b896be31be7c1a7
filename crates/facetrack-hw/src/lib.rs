//! facetrack-hw: Frame acquisition for the tracker.
//!
//! Provides the `FrameSource` abstraction with its ready signal, RGBA
//! frames and pixel format conversion, a still/synthetic source, and
//! (behind the `v4l` feature) V4L2 camera capture.

#[cfg(feature = "v4l")]
pub mod camera;
pub mod frame;
pub mod source;

#[cfg(feature = "v4l")]
pub use camera::{Camera, CameraError, DeviceInfo, PixelFormat};
pub use frame::{Frame, FrameError};
pub use source::{FrameSource, Geometry, ReadySignal, SourceError, StillSource};
