//! idscan - Interactive identity card scanner
//!
//! Finds an identity card in a camera or image frame, rectifies it to a
//! top-down view and, on request, reads its fields with OCR.

mod capture;
mod config;
mod dashboard;
mod extract;
mod ocr;
mod scanner;
mod storage;
mod vision;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::capture::FrameSource;
use crate::config::AppConfig;
use crate::ocr::TesseractEngine;
use crate::extract::SCAN_FAILED_MESSAGE;
use crate::scanner::ScanSession;
use crate::vision::{DocumentPipeline, Thresholds};

/// How long headless mode waits for the first camera frame
const HEADLESS_FRAME_TIMEOUT: Duration = Duration::from_secs(10);

/// idscan - identity card scanner
#[derive(Parser, Debug)]
#[command(name = "idscan")]
#[command(about = "Rectify identity cards from a camera or image and extract their fields")]
struct Args {
    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// MJPEG camera URL, overrides the configured source
    #[arg(short, long, conflicts_with = "image")]
    url: Option<String>,

    /// Static image to scan instead of the camera
    #[arg(short, long)]
    image: Option<PathBuf>,

    /// Directory scans are written to
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Process a single frame without a window, scan it and exit
    #[arg(long)]
    headless: bool,

    /// Write the effective configuration to the config path and exit
    #[arg(long)]
    init_config: bool,
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let config_path = match args.config {
        Some(ref path) => path.clone(),
        None => storage::default_config_path()?,
    };
    let mut config = load_or_default_config(&config_path);
    apply_overrides(&mut config, &args);

    if args.init_config {
        config::save_config(&config, &config_path)
            .with_context(|| format!("Failed to write config to {:?}", config_path))?;
        println!("Wrote configuration to {}", config_path.display());
        return Ok(());
    }

    info!("idscan starting...");

    let source = FrameSource::open(&config.capture).context("Failed to open frame source")?;
    info!("Frame source: {}", source.describe());

    let engine = TesseractEngine::new(&config.scan.ocr_language)
        .context("Failed to initialise OCR engine")?;
    let session = ScanSession::new(&config.scan, Box::new(engine))?;

    if args.headless {
        run_headless(&config, &source, session)?;
    } else {
        info!("Press S to scan a detected card, Q to quit");
        if let Err(e) = dashboard::run_dashboard(&config, source, session) {
            tracing::error!("Dashboard error: {}", e);
        }
    }

    info!("idscan shutdown complete");
    Ok(())
}

/// Load configuration from file, falling back to defaults
fn load_or_default_config(path: &Path) -> AppConfig {
    if path.exists() {
        match config::load_config(path) {
            Ok(config) => {
                info!("Loaded configuration from {:?}", path);
                return config;
            }
            Err(e) => warn!("{:#}, using defaults", e),
        }
    }
    info!("Using default configuration");
    AppConfig::default()
}

/// Command line flags win over the configuration file
fn apply_overrides(config: &mut AppConfig, args: &Args) {
    if let Some(ref url) = args.url {
        config.capture.use_camera = true;
        config.capture.camera_url = url.clone();
    }
    if let Some(ref image) = args.image {
        config.capture.use_camera = false;
        config.capture.image_path = image.clone();
    }
    if let Some(ref dir) = args.output_dir {
        config.scan.output_dir = dir.clone();
    }
}

/// Process one frame and scan it if a card is found
fn run_headless(config: &AppConfig, source: &FrameSource, mut session: ScanSession) -> Result<()> {
    let Some(frame) = source.wait_frame(HEADLESS_FRAME_TIMEOUT) else {
        bail!("No frame received from {}", source.describe());
    };

    let pipeline = DocumentPipeline::new(config.detection.clone());
    let output = pipeline.process(&frame.image, Thresholds::from(&config.detection));
    info!(
        "Processed frame in {} ms, {} contours",
        output.processing_time_ms, output.contour_count
    );

    let document = output.document.map(|d| d.warped);
    if document.is_none() {
        println!("No document detected");
        bail!("No four-cornered document found in the frame");
    }

    match session.scan(document.as_ref()) {
        Ok(_) => Ok(()),
        Err(e) => {
            warn!("Scan failed: {}", e);
            println!("{}", SCAN_FAILED_MESSAGE);
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_flag_disables_camera() {
        let args = Args::parse_from(["idscan", "--image", "card.jpg", "--output-dir", "out"]);
        let mut config = AppConfig::default();
        apply_overrides(&mut config, &args);

        assert!(!config.capture.use_camera);
        assert_eq!(config.capture.image_path, PathBuf::from("card.jpg"));
        assert_eq!(config.scan.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn test_url_flag_enables_camera() {
        let args = Args::parse_from(["idscan", "--url", "http://10.0.0.2:8080/video"]);
        let mut config = AppConfig::default();
        config.capture.use_camera = false;
        apply_overrides(&mut config, &args);

        assert!(config.capture.use_camera);
        assert_eq!(config.capture.camera_url, "http://10.0.0.2:8080/video");
    }

    #[test]
    fn test_url_and_image_conflict() {
        let result = Args::try_parse_from(["idscan", "--url", "http://x/video", "--image", "a.jpg"]);
        assert!(result.is_err());
    }

    struct FailingEngine;

    impl ocr::OcrEngine for FailingEngine {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn recognize(&self, _image: &image::DynamicImage) -> Result<Vec<ocr::OcrLine>, ocr::OcrError> {
            Err(ocr::OcrError::Recognition("engine crashed".to_string()))
        }
    }

    #[test]
    fn test_headless_reports_ocr_failure() {
        use image::{Rgb, RgbImage};
        use imageproc::drawing::draw_polygon_mut;
        use imageproc::point::Point;

        let dir = tempfile::tempdir().unwrap();
        let image_path = dir.path().join("card.png");
        let mut frame = RgbImage::from_pixel(400, 260, Rgb([30, 30, 35]));
        let corners = [
            Point::new(70, 40),
            Point::new(330, 55),
            Point::new(345, 215),
            Point::new(55, 200),
        ];
        draw_polygon_mut(&mut frame, &corners, Rgb([235, 230, 220]));
        frame.save(&image_path).unwrap();

        let mut config = AppConfig::default();
        config.detection.frame_width = 400;
        config.detection.frame_height = 260;
        config.scan.output_dir = dir.path().join("Scanned");

        let source = FrameSource::still(&image_path).unwrap();
        let session = ScanSession::new(&config.scan, Box::new(FailingEngine)).unwrap();

        let error = run_headless(&config, &source, session).unwrap_err();

        assert!(matches!(
            error.downcast_ref::<scanner::ScanError>(),
            Some(scanner::ScanError::Ocr(_))
        ));
        // The document was still written before OCR ran
        assert!(config.scan.output_dir.join("myImage0.jpg").is_file());
    }

    #[test]
    fn test_headless_without_document_fails() {
        let dir = tempfile::tempdir().unwrap();
        let image_path = dir.path().join("blank.png");
        image::RgbImage::from_pixel(400, 260, image::Rgb([90, 90, 90]))
            .save(&image_path)
            .unwrap();

        let mut config = AppConfig::default();
        config.detection.frame_width = 400;
        config.detection.frame_height = 260;
        config.scan.output_dir = dir.path().join("Scanned");

        let source = FrameSource::still(&image_path).unwrap();
        let session = ScanSession::new(&config.scan, Box::new(FailingEngine)).unwrap();

        assert!(run_headless(&config, &source, session).is_err());
        assert!(!config.scan.output_dir.join("myImage0.jpg").exists());
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let config = load_or_default_config(Path::new("/nonexistent/idscan/config.toml"));
        assert_eq!(config.detection.threshold1, 65);
    }
}
