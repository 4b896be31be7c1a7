//! Frame sources and the one-shot "metadata ready" signal.

use crate::frame::Frame;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use thiserror::Error;
use tokio::sync::watch;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("source has no frame yet")]
    NotReady,
    #[error("source closed before becoming ready")]
    Closed,
    #[error("failed to load image {path}: {source}")]
    Image {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("capture failed: {0}")]
    CaptureFailed(String),
}

/// Pixel size of the decoded frames and the size they are displayed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
    pub display_width: u32,
    pub display_height: u32,
}

impl Geometry {
    /// Geometry displayed at its native pixel size.
    pub fn native(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            display_width: width,
            display_height: height,
        }
    }

    /// True once the stream has produced frames with real dimensions.
    pub fn is_decoded(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Resolves once a source's metadata (frame dimensions) is available.
pub struct ReadySignal {
    rx: watch::Receiver<bool>,
}

impl ReadySignal {
    /// A signal that has already fired.
    pub fn ready() -> Self {
        let (_tx, rx) = watch::channel(true);
        Self { rx }
    }

    pub fn is_ready(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until the source is ready. Fails if the source goes away first.
    pub async fn wait(mut self) -> Result<(), SourceError> {
        let outcome = self.rx.wait_for(|ready| *ready).await.map(|_| ());
        outcome.map_err(|_| SourceError::Closed)
    }
}

/// A live video-frame source the tracker samples from.
pub trait FrameSource: Send + Sync {
    /// Current geometry, or `None` before metadata is available.
    fn geometry(&self) -> Option<Geometry>;

    /// Signal that fires once `geometry()` becomes available.
    fn ready(&self) -> ReadySignal;

    /// Copy out the current frame.
    fn sample(&self) -> Result<Frame, SourceError>;
}

/// Source that serves the most recently pushed frame.
///
/// Starts pending when created with [`StillSource::pending`]; the first
/// [`push`](StillSource::push) fires the ready signal.
pub struct StillSource {
    frame: Mutex<Option<Frame>>,
    display: Mutex<Option<(u32, u32)>>,
    ready_tx: watch::Sender<bool>,
    sequence: AtomicU32,
}

impl StillSource {
    pub fn pending() -> Self {
        let (ready_tx, _) = watch::channel(false);
        Self {
            frame: Mutex::new(None),
            display: Mutex::new(None),
            ready_tx,
            sequence: AtomicU32::new(0),
        }
    }

    pub fn new(frame: Frame) -> Self {
        let source = Self::pending();
        source.push(frame);
        source
    }

    /// Load a still image from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let image = image::open(path).map_err(|source| SourceError::Image {
            path: path.display().to_string(),
            source,
        })?;
        let frame = Frame::from_image(image.to_rgba8());
        tracing::info!(
            path = %path.display(),
            width = frame.width,
            height = frame.height,
            "loaded still image"
        );
        Ok(Self::new(frame))
    }

    /// Show frames at a size other than their pixel size.
    pub fn with_display_size(self, width: u32, height: u32) -> Self {
        *lock(&self.display) = Some((width, height));
        self
    }

    /// Replace the current frame and mark the source ready.
    pub fn push(&self, mut frame: Frame) {
        frame.sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        *lock(&self.frame) = Some(frame);
        self.ready_tx.send_replace(true);
    }

    /// Drop the current frame; geometry reports an undecoded stream until
    /// the next push.
    pub fn blank(&self) {
        if let Some(frame) = lock(&self.frame).as_mut() {
            frame.data.clear();
            frame.width = 0;
            frame.height = 0;
        }
    }
}

impl FrameSource for StillSource {
    fn geometry(&self) -> Option<Geometry> {
        let frame = lock(&self.frame);
        let frame = frame.as_ref()?;
        let display = *lock(&self.display);
        let (dw, dh) = display.unwrap_or((frame.width, frame.height));
        Some(Geometry {
            width: frame.width,
            height: frame.height,
            display_width: dw,
            display_height: dh,
        })
    }

    fn ready(&self) -> ReadySignal {
        ReadySignal {
            rx: self.ready_tx.subscribe(),
        }
    }

    fn sample(&self) -> Result<Frame, SourceError> {
        lock(&self.frame).clone().ok_or(SourceError::NotReady)
    }
}

/// Lock ignoring poison: a panicked writer leaves a whole frame or none.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_pending_source_has_no_geometry() {
        let source = StillSource::pending();
        assert!(source.geometry().is_none());
        assert!(!source.ready().is_ready());
        assert!(matches!(source.sample(), Err(SourceError::NotReady)));
    }

    #[test]
    fn test_push_makes_source_ready() {
        let source = StillSource::pending();
        source.push(Frame::filled(4, 2, [0, 0, 0]));
        assert!(source.ready().is_ready());
        assert_eq!(source.geometry(), Some(Geometry::native(4, 2)));
        assert_eq!(source.sample().unwrap().sequence, 0);
        source.push(Frame::filled(4, 2, [0, 0, 0]));
        assert_eq!(source.sample().unwrap().sequence, 1);
    }

    #[test]
    fn test_display_size_override() {
        let source = StillSource::new(Frame::filled(4, 2, [0, 0, 0])).with_display_size(8, 4);
        let geometry = source.geometry().unwrap();
        assert_eq!((geometry.width, geometry.height), (4, 2));
        assert_eq!((geometry.display_width, geometry.display_height), (8, 4));
    }

    #[test]
    fn test_blank_reports_undecoded() {
        let source = StillSource::new(Frame::filled(4, 2, [0, 0, 0]));
        source.blank();
        assert!(!source.geometry().unwrap().is_decoded());
    }

    #[test]
    fn test_open_missing_file() {
        let result = StillSource::open("/nonexistent/facetrack.png");
        assert!(matches!(result, Err(SourceError::Image { .. })));
    }

    #[tokio::test]
    async fn test_ready_signal_resolves_on_push() {
        let source = Arc::new(StillSource::pending());
        let signal = source.ready();
        let pusher = Arc::clone(&source);
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            pusher.push(Frame::filled(2, 2, [0, 0, 0]));
        });
        signal.wait().await.unwrap();
        assert!(source.geometry().is_some());
    }

    #[tokio::test]
    async fn test_ready_signal_fails_when_source_dropped() {
        let source = StillSource::pending();
        let signal = source.ready();
        drop(source);
        assert!(matches!(signal.wait().await, Err(SourceError::Closed)));
    }

    #[tokio::test]
    async fn test_always_ready_signal() {
        let signal = ReadySignal::ready();
        assert!(signal.is_ready());
        signal.wait().await.unwrap();
    }
}
