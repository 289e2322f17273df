//! Tesseract backend via rusty-tesseract

use image::DynamicImage;
use rusty_tesseract::{Args, Image};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

use super::{OcrEngine, OcrError, OcrLine};

/// Fully automatic page segmentation, no OSD
const PSM_AUTO: i32 = 3;
/// Default engine mode (LSTM when available)
const OEM_DEFAULT: i32 = 3;
/// Rectified cards are roughly A7 at the 1000px working width
const CARD_DPI: i32 = 300;

/// One word from tesseract's TSV output
#[derive(Debug, Clone)]
struct Word {
    block: i32,
    paragraph: i32,
    line: i32,
    word: i32,
    left: i32,
    top: i32,
    width: i32,
    height: i32,
    conf: f32,
    text: String,
}

/// OCR engine backed by the system tesseract install
pub struct TesseractEngine {
    language: String,
}

impl TesseractEngine {
    /// Create an engine, failing early when tesseract cannot be run
    pub fn new(language: &str) -> Result<Self, OcrError> {
        let version = rusty_tesseract::get_tesseract_version()
            .map_err(|e| OcrError::Unavailable(e.to_string()))?;
        info!("Using tesseract {} (language: {})", version.trim(), language);

        Ok(Self {
            language: language.to_string(),
        })
    }

    fn args(&self) -> Args {
        Args {
            lang: self.language.clone(),
            config_variables: HashMap::new(),
            dpi: Some(CARD_DPI),
            psm: Some(PSM_AUTO),
            oem: Some(OEM_DEFAULT),
        }
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn recognize(&self, image: &DynamicImage) -> Result<Vec<OcrLine>, OcrError> {
        debug!("Running tesseract on {}x{} image", image.width(), image.height());

        let tess_img =
            Image::from_dynamic_image(image).map_err(|e| OcrError::Image(e.to_string()))?;
        let output = rusty_tesseract::image_to_data(&tess_img, &self.args())
            .map_err(|e| OcrError::Recognition(e.to_string()))?;

        let words: Vec<Word> = output
            .data
            .into_iter()
            .map(|d| Word {
                block: d.block_num,
                paragraph: d.par_num,
                line: d.line_num,
                word: d.word_num,
                left: d.left,
                top: d.top,
                width: d.width,
                height: d.height,
                conf: d.conf,
                text: d.text,
            })
            .collect();
        let lines = group_lines(words);
        debug!("Tesseract returned {} lines", lines.len());
        Ok(lines)
    }
}

/// Join words into lines keyed by (block, paragraph, line), ordered top down
fn group_lines(words: Vec<Word>) -> Vec<OcrLine> {
    let mut grouped: BTreeMap<(i32, i32, i32), Vec<Word>> = BTreeMap::new();
    for word in words
        .into_iter()
        .filter(|w| !w.text.trim().is_empty() && w.conf >= 0.0)
    {
        grouped
            .entry((word.block, word.paragraph, word.line))
            .or_default()
            .push(word);
    }

    let mut lines: Vec<OcrLine> = grouped
        .into_values()
        .map(|mut words| {
            words.sort_by_key(|w| w.word);

            let left = words.iter().map(|w| w.left).min().unwrap_or(0);
            let top = words.iter().map(|w| w.top).min().unwrap_or(0);
            let right = words.iter().map(|w| w.left + w.width).max().unwrap_or(left);
            let bottom = words.iter().map(|w| w.top + w.height).max().unwrap_or(top);
            let confidence =
                words.iter().map(|w| w.conf).sum::<f32>() / words.len() as f32 / 100.0;

            OcrLine {
                text: words
                    .iter()
                    .map(|w| w.text.trim())
                    .collect::<Vec<_>>()
                    .join(" "),
                bounds: (
                    left.max(0) as u32,
                    top.max(0) as u32,
                    (right - left).max(0) as u32,
                    (bottom - top).max(0) as u32,
                ),
                confidence: confidence.clamp(0.0, 1.0),
            }
        })
        .collect();

    lines.sort_by_key(|l| (l.bounds.1, l.bounds.0));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(block: i32, line: i32, word: i32, left: i32, top: i32, text: &str) -> Word {
        Word {
            block,
            paragraph: 1,
            line,
            word,
            left,
            top,
            width: 40,
            height: 20,
            conf: 90.0,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_group_lines_joins_words_in_order() {
        let words = vec![
            word(1, 2, 2, 60, 50, "1990"),
            word(1, 1, 2, 60, 10, "KUMAR"),
            word(1, 1, 1, 10, 10, "RAVI"),
            word(1, 2, 1, 10, 50, "DOB:"),
        ];

        let lines = group_lines(words);

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "RAVI KUMAR");
        assert_eq!(lines[0].bounds, (10, 10, 90, 20));
        assert_eq!(lines[1].text, "DOB: 1990");
        assert!((lines[0].confidence - 0.9).abs() < 1e-5);
    }

    #[test]
    fn test_group_lines_skips_structural_rows() {
        let mut structural = word(1, 0, 0, 0, 0, "");
        structural.conf = -1.0;
        let lines = group_lines(vec![structural, word(2, 1, 1, 5, 80, "Male")]);

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "Male");
    }

    #[test]
    fn test_group_lines_orders_blocks_top_down() {
        let lines = group_lines(vec![
            word(1, 1, 1, 10, 200, "lower"),
            word(2, 1, 1, 10, 20, "upper"),
        ]);

        assert_eq!(lines[0].text, "upper");
        assert_eq!(lines[1].text, "lower");
    }

    #[test]
    #[ignore] // needs a tesseract install
    fn test_tesseract_engine_creation() {
        let engine = TesseractEngine::new("eng");
        assert!(engine.is_ok(), "TesseractEngine creation should succeed");
    }
}
