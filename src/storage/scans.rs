//! Rectified document output
//!
//! Every scan writes the warped document as `<prefix><count>.jpg`. The counter
//! starts at zero each session, so files from an earlier run are overwritten.

use anyhow::{Context, Result};
use image::RgbImage;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Numbered JPEG writer for scanned documents
#[derive(Debug)]
pub struct ScanStore {
    dir: PathBuf,
    prefix: String,
    count: u32,
}

impl ScanStore {
    /// Create a store writing into `dir`, creating it if needed
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create scan directory {:?}", dir))?;

        Ok(Self {
            dir,
            prefix: prefix.into(),
            count: 0,
        })
    }

    /// Number of scans saved so far
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Output directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path the next scan will be written to
    pub fn next_path(&self) -> PathBuf {
        self.dir.join(format!("{}{}.jpg", self.prefix, self.count))
    }

    /// Write the document as JPEG and advance the counter
    pub fn save(&mut self, document: &RgbImage) -> Result<PathBuf> {
        let path = self.next_path();
        document
            .save_with_format(&path, image::ImageFormat::Jpeg)
            .with_context(|| format!("Failed to write scan to {:?}", path))?;

        self.count += 1;
        debug!("Saved: {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_next_path_uses_prefix_and_counter() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScanStore::new(dir.path(), "myImage").unwrap();

        assert_eq!(store.count(), 0);
        assert_eq!(store.next_path(), dir.path().join("myImage0.jpg"));
    }

    #[test]
    fn test_save_writes_jpeg_and_advances() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ScanStore::new(dir.path().join("Scanned"), "card").unwrap();
        let document = RgbImage::from_pixel(40, 26, Rgb([200, 180, 160]));

        let first = store.save(&document).unwrap();
        let second = store.save(&document).unwrap();

        assert_eq!(first, dir.path().join("Scanned").join("card0.jpg"));
        assert_eq!(second, dir.path().join("Scanned").join("card1.jpg"));
        assert_eq!(store.count(), 2);

        let reloaded = image::open(&first).unwrap();
        assert_eq!(reloaded.width(), 40);
        assert_eq!(reloaded.height(), 26);
    }

    #[test]
    fn test_new_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = ScanStore::new(&nested, "x").unwrap();

        assert!(nested.is_dir());
        assert_eq!(store.dir(), nested.as_path());
    }
}
