use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use facetrack_core::{
    assess_with, OverlayRenderer, OverlaySurface, QualityAssessment, RasterCanvas,
    RegionCandidate, RegionLocator, SkinRules, SkinToneLocator,
};
use facetrack_engine::{Detected, OverlayTarget, QualitySnapshot, Tracker, TrackerConfig};
use facetrack_hw::{FrameSource, StillSource};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "facetrack", about = "Heuristic face tracking with a quality overlay")]
struct Cli {
    /// Config file (defaults to $FACETRACK_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Locate a face region in a still image
    Detect {
        image: PathBuf,
        /// Write the image with the overlay drawn on top
        #[arg(short, long)]
        overlay: Option<PathBuf>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show which skin-tone rules accept a pixel
    Classify { r: u8, g: u8, b: u8 },
    /// Run the tracking loop and print quality snapshots
    Watch {
        /// Track a still image
        #[arg(long, conflicts_with = "device")]
        image: Option<PathBuf>,
        /// Track a V4L2 camera (e.g. /dev/video0)
        #[arg(long)]
        device: Option<String>,
        /// Stop after this many seconds (runs until Ctrl-C when omitted)
        #[arg(long)]
        seconds: Option<u64>,
        /// Write the last frame with its overlay on exit
        #[arg(short, long)]
        overlay: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration
    Config,
    /// List capture devices
    Devices,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = TrackerConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Detect {
            image,
            overlay,
            json,
        } => detect(&config, &image, overlay.as_deref(), json),
        Commands::Classify { r, g, b } => {
            let rules = SkinRules::evaluate(r, g, b);
            println!("rgb({r}, {g}, {b})");
            println!("  basic:     {}", rules.basic);
            println!("  alternate: {}", rules.alternate);
            println!("  hue:       {}", rules.hue);
            println!("  skin tone: {}", rules.any());
            Ok(())
        }
        Commands::Watch {
            image,
            device,
            seconds,
            overlay,
            json,
        } => {
            let source = open_source(image.as_deref(), device.as_deref())?;
            watch(config, source, seconds, overlay.as_deref(), json).await
        }
        Commands::Config => {
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::Devices => list_devices(),
    }
}

fn detect(config: &TrackerConfig, path: &Path, overlay: Option<&Path>, json: bool) -> Result<()> {
    let source = StillSource::open(path)?;
    let frame = source.sample()?;
    let locator = SkinToneLocator::new(config.locator.clone());
    let region = locator.locate(&frame.data, frame.width, frame.height)?;
    let assessment = region.as_ref().map(|r| {
        assess_with(&config.scoring, r, frame.width as f32, frame.height as f32)
    });

    if json {
        let report = detection_report(region.as_ref(), assessment.as_ref());
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        match (&region, &assessment) {
            (Some(region), Some(assessment)) => print_detection(region, assessment),
            _ => println!("No face region found"),
        }
    }

    if let Some(out) = overlay {
        let mut canvas = RasterCanvas::new(frame.width, frame.height);
        OverlayRenderer::new().render(
            canvas.context()?,
            (frame.width, frame.height),
            region.as_ref(),
            assessment.as_ref(),
            Duration::ZERO,
        );
        save_composited(&canvas, &frame, out)?;
    }
    Ok(())
}

fn detection_report(
    region: Option<&RegionCandidate>,
    assessment: Option<&QualityAssessment>,
) -> serde_json::Value {
    serde_json::json!({
        "detected": region.is_some(),
        "region": region,
        "assessment": assessment,
    })
}

fn print_detection(region: &RegionCandidate, assessment: &QualityAssessment) {
    println!(
        "Face region at ({:.0}, {:.0}) size {:.0}x{:.0}",
        region.x, region.y, region.width, region.height
    );
    println!("  Confidence: {:.0}%", region.confidence * 100.0);
    println!("  Size:       {}", assessment.size_label.as_str());
    println!("  Position:   {}", assessment.position_label.as_str());
    println!("  Overall:    {:.0}%", assessment.overall_score * 100.0);
}

fn open_source(image: Option<&Path>, device: Option<&str>) -> Result<Arc<dyn FrameSource>> {
    match (image, device) {
        (Some(path), _) => Ok(Arc::new(StillSource::open(path)?)),
        (None, Some(device)) => open_camera(device),
        (None, None) => bail!("watch needs --image or --device"),
    }
}

#[cfg(feature = "v4l")]
fn open_camera(device: &str) -> Result<Arc<dyn FrameSource>> {
    let camera = facetrack_hw::Camera::open(device, 640, 480)
        .with_context(|| format!("failed to open {device}"))?;
    Ok(Arc::new(camera))
}

#[cfg(not(feature = "v4l"))]
fn open_camera(device: &str) -> Result<Arc<dyn FrameSource>> {
    bail!("cannot open {device}: facetrack was built without the `v4l` feature")
}

async fn watch(
    config: TrackerConfig,
    source: Arc<dyn FrameSource>,
    seconds: Option<u64>,
    overlay: Option<&Path>,
    json: bool,
) -> Result<()> {
    let locator = Arc::new(SkinToneLocator::new(config.locator.clone()));
    let mut tracker = Tracker::new(config, locator);
    tracker.start(Arc::clone(&source), OverlayTarget::Create)?;

    let deadline = seconds.map(|s| tokio::time::Instant::now() + Duration::from_secs(s));
    let mut report = tokio::time::interval(Duration::from_millis(500));
    report.tick().await;

    loop {
        tokio::select! {
            now = report.tick() => {
                print_snapshot(&tracker.current_quality(), json)?;
                if deadline.is_some_and(|d| now >= d) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                break;
            }
        }
    }

    if let Some(out) = overlay {
        let raster = tracker
            .overlay_raster()
            .context("tracker has no raster overlay")?;
        let frame = source.sample()?;
        let canvas = raster
            .lock()
            .map_err(|_| anyhow::anyhow!("overlay lock poisoned"))?
            .clone();
        save_composited(&canvas, &frame, out)?;
    }

    tracker.stop();
    Ok(())
}

fn print_snapshot(snapshot: &QualitySnapshot, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(snapshot)?);
        return Ok(());
    }
    match snapshot.detected {
        Detected::Yes => println!(
            "face: confidence {:.0}%, size {}, position {}, overall {:.0}%",
            snapshot.confidence * 100.0,
            snapshot.size_label.map(|l| l.as_str()).unwrap_or("-"),
            snapshot.position_label.map(|l| l.as_str()).unwrap_or("-"),
            snapshot.overall_score.unwrap_or(0.0) * 100.0,
        ),
        Detected::No => println!("face lost"),
        Detected::Unknown => println!("unknown"),
    }
    Ok(())
}

fn save_composited(canvas: &RasterCanvas, frame: &facetrack_hw::Frame, out: &Path) -> Result<()> {
    let mut image = frame.to_image().context("frame has no pixel data")?;
    canvas.compose_onto(&mut image);
    image
        .save(out)
        .with_context(|| format!("failed to write {}", out.display()))?;
    for label in canvas.labels() {
        tracing::debug!(x = label.x, y = label.y, text = %label.text, "overlay label");
    }
    println!("Overlay written to {}", out.display());
    Ok(())
}

#[cfg(feature = "v4l")]
fn list_devices() -> Result<()> {
    let devices = facetrack_hw::Camera::list_devices();
    if devices.is_empty() {
        println!("No V4L2 capture devices found");
    }
    for device in devices {
        println!("{}  {} ({}, {})", device.path, device.name, device.driver, device.bus);
    }
    Ok(())
}

#[cfg(not(feature = "v4l"))]
fn list_devices() -> Result<()> {
    println!("Device listing needs the `v4l` feature");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use facetrack_core::assess;

    #[test]
    fn test_cli_parses_watch() {
        let cli = Cli::try_parse_from(["facetrack", "watch", "--image", "face.png", "--seconds", "3"])
            .unwrap();
        match cli.command {
            Commands::Watch { image, seconds, .. } => {
                assert_eq!(image, Some(PathBuf::from("face.png")));
                assert_eq!(seconds, Some(3));
            }
            _ => panic!("expected watch"),
        }
    }

    #[test]
    fn test_watch_rejects_both_sources() {
        let result = Cli::try_parse_from([
            "facetrack", "watch", "--image", "a.png", "--device", "/dev/video0",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_watch_requires_a_source() {
        assert!(open_source(None, None).is_err());
    }

    #[test]
    fn test_detection_report() {
        let region = RegionCandidate {
            x: 195.0,
            y: 141.0,
            width: 249.0,
            height: 199.0,
            confidence: 1.0,
            centroid: (319.0, 240.0),
        };
        let assessment = assess(&region, 640.0, 480.0);
        let report = detection_report(Some(&region), Some(&assessment));
        assert_eq!(report["detected"], true);
        assert_eq!(report["assessment"]["position_label"], "centered");

        let empty = detection_report(None, None);
        assert_eq!(empty["detected"], false);
        assert!(empty["region"].is_null());
    }
}
