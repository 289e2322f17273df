//! Scan Session
//!
//! Saves the rectified document, runs OCR on the saved file, extracts the
//! identity fields and reports them on the console.

use chrono::{Local, NaiveDate};
use image::RgbImage;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ScanSettings;
use crate::extract::{extract_fields, IdentityRecord};
use crate::ocr::{OcrEngine, OcrError, OcrLine};
use crate::storage::ScanStore;

/// Scan failures
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("no document has been detected yet")]
    NoDocument,
    #[error("scan requested during cooldown")]
    CoolingDown,
    #[error("failed to save scan: {0}")]
    Save(String),
    #[error("failed to reload saved scan: {0}")]
    Reload(#[from] image::ImageError),
    #[error("OCR failed: {0}")]
    Ocr(#[from] OcrError),
}

/// Result of one scan
#[derive(Debug, Clone)]
pub struct ScanReport {
    /// Where the document image was written
    pub path: PathBuf,
    /// Raw OCR output
    pub lines: Vec<OcrLine>,
    pub record: IdentityRecord,
    /// Scan number within the session, starting at 0
    pub index: u32,
}

impl ScanReport {
    pub fn is_found(&self) -> bool {
        self.record.is_found()
    }
}

/// Owns the scan counter, output directory and OCR engine
pub struct ScanSession {
    store: ScanStore,
    engine: Box<dyn OcrEngine>,
    min_name_chars: usize,
    cooldown: Duration,
    last_scan: Option<Instant>,
}

impl ScanSession {
    pub fn new(settings: &ScanSettings, engine: Box<dyn OcrEngine>) -> anyhow::Result<Self> {
        let store = ScanStore::new(&settings.output_dir, settings.file_prefix.as_str())?;
        info!(
            "Scan session ready: {:?}, OCR engine {}",
            store.dir(),
            engine.name()
        );

        Ok(Self {
            store,
            engine,
            min_name_chars: settings.min_name_chars,
            cooldown: Duration::from_millis(settings.cooldown_ms),
            last_scan: None,
        })
    }

    /// Scans completed so far
    pub fn count(&self) -> u32 {
        self.store.count()
    }

    /// Whether the cooldown after the previous scan has elapsed
    pub fn can_scan(&self) -> bool {
        self.last_scan
            .map_or(true, |last| last.elapsed() >= self.cooldown)
    }

    /// Scan a rectified document using today's date for the age
    pub fn scan(&mut self, document: Option<&RgbImage>) -> Result<ScanReport, ScanError> {
        self.scan_on(document, Local::now().date_naive())
    }

    /// Scan a rectified document, computing ages relative to `today`
    pub fn scan_on(
        &mut self,
        document: Option<&RgbImage>,
        today: NaiveDate,
    ) -> Result<ScanReport, ScanError> {
        let document = document.ok_or(ScanError::NoDocument)?;
        if !self.can_scan() {
            debug!("Scan ignored, cooling down");
            return Err(ScanError::CoolingDown);
        }

        let index = self.store.count();
        let path = self
            .store
            .save(document)
            .map_err(|e| ScanError::Save(format!("{:#}", e)))?;
        // Cooldown applies even when OCR fails
        self.last_scan = Some(Instant::now());
        println!("Saved: {}", path.display());

        let saved = image::open(&path)?;
        let start = Instant::now();
        let lines = self.engine.recognize(&saved)?;
        debug!(
            "{} recognised {} lines in {:?}",
            self.engine.name(),
            lines.len(),
            start.elapsed()
        );

        let record = extract_fields(&lines, self.min_name_chars, today);
        print!("{}", record);
        if record.is_found() {
            info!("Scan {} extracted fields from {:?}", index, path);
        } else {
            warn!("Scan {} found no identity fields", index);
        }

        Ok(ScanReport {
            path,
            lines,
            record,
            index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Gender;
    use image::{DynamicImage, Rgb};
    use std::sync::{Arc, Mutex};

    /// Engine returning canned lines and recording the image sizes it saw
    struct FakeEngine {
        lines: Vec<&'static str>,
        seen: Arc<Mutex<Vec<(u32, u32)>>>,
    }

    impl OcrEngine for FakeEngine {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn recognize(&self, image: &DynamicImage) -> Result<Vec<OcrLine>, OcrError> {
            self.seen.lock().unwrap().push((image.width(), image.height()));
            Ok(self
                .lines
                .iter()
                .map(|t| OcrLine {
                    text: t.to_string(),
                    bounds: (0, 0, 10, 10),
                    confidence: 1.0,
                })
                .collect())
        }
    }

    struct FailingEngine;

    impl OcrEngine for FailingEngine {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn recognize(&self, _image: &DynamicImage) -> Result<Vec<OcrLine>, OcrError> {
            Err(OcrError::Recognition("engine crashed".to_string()))
        }
    }

    fn settings(dir: &std::path::Path, cooldown_ms: u64) -> ScanSettings {
        ScanSettings {
            output_dir: dir.join("Scanned"),
            cooldown_ms,
            ..Default::default()
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    #[test]
    fn test_scan_saves_and_extracts() {
        let dir = tempfile::tempdir().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let engine = FakeEngine {
            lines: vec!["Ravikumar Shankar Sharma", "Male", "1234 5678 9012"],
            seen: seen.clone(),
        };
        let mut session = ScanSession::new(&settings(dir.path(), 0), Box::new(engine)).unwrap();
        let document = RgbImage::from_pixel(100, 65, Rgb([220, 220, 220]));

        let report = session.scan_on(Some(&document), today()).unwrap();

        assert_eq!(report.index, 0);
        assert_eq!(report.path, dir.path().join("Scanned").join("myImage0.jpg"));
        assert!(report.path.is_file());
        assert!(report.is_found());
        assert_eq!(report.record.gender, Some(Gender::Male));
        assert_eq!(report.lines.len(), 3);
        assert_eq!(session.count(), 1);
        // OCR ran on the reloaded file
        assert_eq!(seen.lock().unwrap().as_slice(), &[(100, 65)]);
    }

    #[test]
    fn test_scan_without_document() {
        let dir = tempfile::tempdir().unwrap();
        let engine = FakeEngine {
            lines: vec![],
            seen: Arc::new(Mutex::new(Vec::new())),
        };
        let mut session = ScanSession::new(&settings(dir.path(), 0), Box::new(engine)).unwrap();

        let result = session.scan_on(None, today());
        assert!(matches!(result, Err(ScanError::NoDocument)));
        assert_eq!(session.count(), 0);
    }

    #[test]
    fn test_cooldown_blocks_second_scan() {
        let dir = tempfile::tempdir().unwrap();
        let engine = FakeEngine {
            lines: vec!["nothing useful"],
            seen: Arc::new(Mutex::new(Vec::new())),
        };
        let mut session =
            ScanSession::new(&settings(dir.path(), 60_000), Box::new(engine)).unwrap();
        let document = RgbImage::new(20, 13);

        let first = session.scan_on(Some(&document), today()).unwrap();
        assert!(!first.is_found());
        assert!(!session.can_scan());

        let second = session.scan_on(Some(&document), today());
        assert!(matches!(second, Err(ScanError::CoolingDown)));
        assert_eq!(session.count(), 1);
    }

    #[test]
    fn test_counter_advances_per_scan() {
        let dir = tempfile::tempdir().unwrap();
        let engine = FakeEngine {
            lines: vec![],
            seen: Arc::new(Mutex::new(Vec::new())),
        };
        let mut session = ScanSession::new(&settings(dir.path(), 0), Box::new(engine)).unwrap();
        let document = RgbImage::new(20, 13);

        session.scan_on(Some(&document), today()).unwrap();
        let second = session.scan_on(Some(&document), today()).unwrap();

        assert_eq!(second.index, 1);
        assert!(second.path.ends_with("myImage1.jpg"));
    }

    #[test]
    fn test_ocr_failure_keeps_saved_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut session =
            ScanSession::new(&settings(dir.path(), 0), Box::new(FailingEngine)).unwrap();
        let document = RgbImage::new(20, 13);

        let result = session.scan_on(Some(&document), today());

        assert!(matches!(result, Err(ScanError::Ocr(_))));
        assert!(dir.path().join("Scanned").join("myImage0.jpg").is_file());
        assert_eq!(session.count(), 1);
    }
}
