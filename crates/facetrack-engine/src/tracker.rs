//! Tracking loop controller.
//!
//! A [`Tracker`] owns at most one session: a spawned task that ticks at a
//! fixed interval, sampling the frame source, locating a region, scoring
//! it and redrawing the overlay. Every tick runs while holding the surface
//! lock and then the shared state lock, and checks the session generation
//! first, so once [`Tracker::stop`] returns no tick of the old session can
//! draw or record anything.

use crate::config::{ConfigError, TrackerConfig};
use crate::snapshot::{DetectionState, QualitySnapshot};
use facetrack_core::{
    assess_with, LocateError, OverlayRenderer, OverlaySurface, QualityAssessment, RasterCanvas,
    RegionCandidate, RegionLocator,
};
use facetrack_hw::{FrameSource, Geometry, SourceError};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Overlay surface shared between the host and the tracker.
///
/// Ticks lock the surface before the tracker's own state, so a host may
/// hold the surface lock while calling [`Tracker::current_quality`].
pub type SharedSurface = Arc<Mutex<dyn OverlaySurface>>;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("tracker must be started from within a tokio runtime")]
    NoRuntime,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Where a session draws.
pub enum OverlayTarget {
    /// The tracker creates its own raster overlay and drops it on stop.
    Create,
    /// Draw onto a caller-supplied surface. It is cleared on stop but
    /// otherwise left to the caller.
    Attach(SharedSurface),
}

#[derive(Error, Debug)]
enum TickError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Locate(#[from] LocateError),
}

type Located = Option<(RegionCandidate, QualityAssessment)>;

#[derive(Default)]
struct Shared {
    generation: u64,
    detection: DetectionState,
    ticks: u64,
}

struct Session {
    task: JoinHandle<()>,
    surface: SharedSurface,
    raster: Option<Arc<Mutex<RasterCanvas>>>,
}

pub struct Tracker {
    config: TrackerConfig,
    locator: Arc<dyn RegionLocator>,
    renderer: OverlayRenderer,
    shared: Arc<Mutex<Shared>>,
    session: Option<Session>,
}

impl Tracker {
    pub fn new(config: TrackerConfig, locator: Arc<dyn RegionLocator>) -> Self {
        Self {
            config,
            locator,
            renderer: OverlayRenderer::new(),
            shared: Arc::new(Mutex::new(Shared::default())),
            session: None,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Begin tracking `source`, replacing any running session.
    ///
    /// Returns once the session task is spawned. If the source has no
    /// metadata yet the task waits for its ready signal before the first
    /// tick. An invalid config is rejected before anything is spawned.
    pub fn start(
        &mut self,
        source: Arc<dyn FrameSource>,
        target: OverlayTarget,
    ) -> Result<(), TrackerError> {
        self.config.validate()?;
        let handle = tokio::runtime::Handle::try_current().map_err(|_| TrackerError::NoRuntime)?;
        self.stop();

        let (surface, raster) = match target {
            OverlayTarget::Create => {
                let raster = Arc::new(Mutex::new(RasterCanvas::new(0, 0)));
                let surface: SharedSurface = raster.clone();
                (surface, Some(raster))
            }
            OverlayTarget::Attach(surface) => (surface, None),
        };

        let generation = {
            let mut shared = lock(&self.shared);
            shared.generation += 1;
            shared.detection.clear();
            shared.ticks = 0;
            shared.generation
        };

        let runner = SessionRunner {
            generation,
            config: self.config.clone(),
            locator: Arc::clone(&self.locator),
            renderer: self.renderer.clone(),
            shared: Arc::clone(&self.shared),
            source,
            surface: Arc::clone(&surface),
            geometry: None,
            started: Instant::now(),
        };

        tracing::info!(
            generation,
            locator = self.locator.name(),
            interval_ms = self.config.tick_interval_ms,
            "tracking started"
        );

        let task = handle.spawn(runner.run());
        self.session = Some(Session {
            task,
            surface,
            raster,
        });
        Ok(())
    }

    /// End the current session. No-op when idle.
    pub fn stop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        {
            let mut shared = lock(&self.shared);
            shared.generation += 1;
            shared.detection.clear();
        }
        session.task.abort();

        let mut surface = lock(&session.surface);
        match surface.context() {
            Ok(canvas) => canvas.clear(),
            Err(e) => tracing::warn!(error = %e, "could not clear overlay on stop"),
        }
        drop(surface);

        tracing::info!(
            owned_surface = session.raster.is_some(),
            "tracking stopped"
        );
    }

    pub fn is_tracking(&self) -> bool {
        self.session.is_some()
    }

    /// Latest detection, judged against the staleness window.
    pub fn current_quality(&self) -> QualitySnapshot {
        if self.session.is_none() {
            return QualitySnapshot::unknown();
        }
        lock(&self.shared)
            .detection
            .snapshot(Instant::now(), self.config.staleness())
    }

    /// The surface the current session draws on.
    pub fn overlay(&self) -> Option<SharedSurface> {
        self.session.as_ref().map(|s| Arc::clone(&s.surface))
    }

    /// The tracker-created raster overlay, when the session uses one.
    pub fn overlay_raster(&self) -> Option<Arc<Mutex<RasterCanvas>>> {
        self.session.as_ref().and_then(|s| s.raster.clone())
    }

    /// Ticks processed by the current session.
    pub fn ticks(&self) -> u64 {
        lock(&self.shared).ticks
    }
}

impl Drop for Tracker {
    fn drop(&mut self) {
        self.stop();
    }
}

struct SessionRunner {
    generation: u64,
    config: TrackerConfig,
    locator: Arc<dyn RegionLocator>,
    renderer: OverlayRenderer,
    shared: Arc<Mutex<Shared>>,
    source: Arc<dyn FrameSource>,
    surface: SharedSurface,
    geometry: Option<Geometry>,
    started: Instant,
}

impl SessionRunner {
    async fn run(mut self) {
        let ready = self.source.ready();
        if !ready.is_ready() {
            tracing::debug!(generation = self.generation, "waiting for frame source");
            if let Err(e) = ready.wait().await {
                tracing::warn!(error = %e, "frame source never became ready");
                return;
            }
        }

        let mut interval = tokio::time::interval(self.config.tick_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            if !self.tick() {
                break;
            }
        }
    }

    /// One detection pass. Returns false once the session is superseded.
    fn tick(&mut self) -> bool {
        // Surface first, then shared state. Hosts rely on this order.
        let mut surface = lock(&self.surface);
        let mut shared = lock(&self.shared);
        if shared.generation != self.generation {
            return false;
        }
        shared.ticks += 1;

        let geometry = match self.source.geometry() {
            Some(g) if g.is_decoded() => g,
            _ => {
                tracing::trace!("frame source not decoded, skipping tick");
                return true;
            }
        };

        if self.geometry != Some(geometry) {
            surface.resize(
                geometry.width,
                geometry.height,
                (geometry.display_width, geometry.display_height),
            );
            tracing::debug!(
                width = geometry.width,
                height = geometry.height,
                display_width = geometry.display_width,
                display_height = geometry.display_height,
                "overlay resized"
            );
            self.geometry = Some(geometry);
        }

        let canvas = match surface.context() {
            Ok(canvas) => canvas,
            Err(e) => {
                tracing::warn!(error = %e, "overlay context unavailable, skipping draw");
                return true;
            }
        };

        let now = Instant::now();
        let elapsed = now.duration_since(self.started);

        match self.detect() {
            Ok((frame_size, Some((region, assessment)))) => {
                self.renderer.render(
                    canvas,
                    frame_size,
                    Some(&region),
                    Some(&assessment),
                    elapsed,
                );
                let sx = geometry.display_width as f32 / frame_size.0.max(1) as f32;
                let sy = geometry.display_height as f32 / frame_size.1.max(1) as f32;
                tracing::debug!(
                    x = region.x,
                    y = region.y,
                    width = region.width,
                    height = region.height,
                    confidence = region.confidence,
                    overall = assessment.overall_score,
                    "region detected"
                );
                shared
                    .detection
                    .record_hit(region.scaled(sx, sy), assessment, now);
            }
            Ok((frame_size, None)) => {
                self.renderer.render(canvas, frame_size, None, None, elapsed);
                shared.detection.record_miss(now);
            }
            Err(e) => {
                tracing::warn!(error = %e, "detection tick failed");
                let frame_size = (geometry.width, geometry.height);
                self.renderer.render(canvas, frame_size, None, None, elapsed);
            }
        }
        true
    }

    /// Sample, locate and score. Returns the frame size alongside the result.
    fn detect(&self) -> Result<((u32, u32), Located), TickError> {
        let frame = self.source.sample()?;
        let frame_size = (frame.width, frame.height);
        let located = self
            .locator
            .locate(&frame.data, frame.width, frame.height)?
            .map(|region| {
                let assessment = assess_with(
                    &self.config.scoring,
                    &region,
                    frame.width as f32,
                    frame.height as f32,
                );
                (region, assessment)
            });
        Ok((frame_size, located))
    }
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
