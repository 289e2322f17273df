//! Identity Field Extraction
//!
//! Pattern matching over OCR lines: person names, date of birth (with age),
//! gender and the 12-digit ID number.

use chrono::{Datelike, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;

use crate::ocr::OcrLine;

/// Printed when a scan yields no usable field
pub const SCAN_FAILED_MESSAGE: &str = "Scan Failed. Please try again with a horizontal scan.";

lazy_static! {
    /// Capitalised words ("Ravi Kumar Sharma") or an all-caps run ("RAVI KUMAR")
    static ref NAME_RE: Regex =
        Regex::new(r"([A-Z][a-z]*\.?(?:\s[A-Z][a-z]*\.?)+|[A-Z]{2,}(?:\s[A-Z]{2,})+)").unwrap();
    static ref DOB_RE: Regex = Regex::new(r"(\d{2}[/\-]\d{2}[/\-]\d{4})").unwrap();
    static ref SLASH_DATE_RE: Regex = Regex::new(r"\d{2}/\d{2}/\d{4}").unwrap();
    static ref GENDER_RE: Regex = Regex::new(r"(?i)(Male|Female|Transgender)").unwrap();
    static ref ID_NUMBER_RE: Regex = Regex::new(r"\d{4}\s?\d{4}\s?\d{4}").unwrap();
}

/// Gender as printed on the card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
    Transgender,
}

impl Gender {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            "transgender" => Some(Gender::Transgender),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Transgender => "Transgender",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First date-of-birth candidate found in the text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DobField {
    /// A real dd/mm/yyyy date not in the future
    Valid {
        text: String,
        date: NaiveDate,
        age: u32,
    },
    /// Looked like a date but could not be used
    Invalid { raw: String },
}

/// Fields pulled out of one scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityRecord {
    /// Name candidates long enough to be a full name, in reading order
    pub names: Vec<String>,
    pub dob: Option<DobField>,
    pub gender: Option<Gender>,
    /// ID number exactly as matched (may contain spaces)
    pub id_number: Option<String>,
}

impl IdentityRecord {
    /// Whether anything usable was recognised
    pub fn is_found(&self) -> bool {
        !self.names.is_empty()
            || matches!(self.dob, Some(DobField::Valid { .. }))
            || self.gender.is_some()
            || self.id_number.is_some()
    }

    /// ID number with whitespace removed
    pub fn id_digits(&self) -> Option<String> {
        self.id_number
            .as_ref()
            .map(|id| id.chars().filter(|c| c.is_ascii_digit()).collect())
    }
}

impl fmt::Display for IdentityRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for name in &self.names {
            writeln!(f, "Name: {}", name)?;
        }
        match &self.dob {
            Some(DobField::Valid { text, age, .. }) => {
                writeln!(f, "DOB: {}", text)?;
                writeln!(f, "Age: {}", age)?;
            }
            Some(DobField::Invalid { .. }) => writeln!(f, "No valid DOB found")?,
            None => {}
        }
        if let Some(gender) = self.gender {
            writeln!(f, "Gender: {}", gender)?;
        }
        if let Some(id) = &self.id_number {
            writeln!(f, "ID Number: {}", id)?;
        }
        if !self.is_found() {
            writeln!(f, "{}", SCAN_FAILED_MESSAGE)?;
        }
        Ok(())
    }
}

/// Extract identity fields from OCR lines, each line matched on its own
pub fn extract_fields(lines: &[OcrLine], min_name_chars: usize, today: NaiveDate) -> IdentityRecord {
    let mut names = Vec::new();
    let mut dob_raw: Option<String> = None;
    let mut gender = None;
    let mut id_number = None;

    for line in lines {
        let text = line.text.as_str();

        names.extend(
            NAME_RE
                .find_iter(text)
                .map(|m| m.as_str())
                .filter(|name| letter_count(name) > min_name_chars)
                .map(str::to_string),
        );

        if dob_raw.is_none() {
            dob_raw = DOB_RE.find(text).map(|m| m.as_str().to_string());
        }
        if gender.is_none() {
            gender = GENDER_RE.find(text).and_then(|m| Gender::parse(m.as_str()));
        }
        if id_number.is_none() {
            id_number = ID_NUMBER_RE.find(text).map(|m| m.as_str().to_string());
        }
    }

    IdentityRecord {
        names,
        dob: dob_raw.map(|raw| parse_dob(&raw, today)),
        gender,
        id_number,
    }
}

/// Characters of a name candidate excluding spaces
fn letter_count(name: &str) -> usize {
    name.chars().filter(|c| *c != ' ').count()
}

fn parse_dob(raw: &str, today: NaiveDate) -> DobField {
    let raw = raw.trim();
    let valid = SLASH_DATE_RE.find(raw).and_then(|m| {
        let date = NaiveDate::parse_from_str(m.as_str(), "%d/%m/%Y").ok()?;
        let age = age_on(date, today)?;
        Some(DobField::Valid {
            text: m.as_str().to_string(),
            date,
            age,
        })
    });

    valid.unwrap_or_else(|| DobField::Invalid {
        raw: raw.to_string(),
    })
}

/// Whole years from `born` to `today`; None for a date in the future
pub fn age_on(born: NaiveDate, today: NaiveDate) -> Option<u32> {
    if born > today {
        return None;
    }
    let before_birthday = (today.month(), today.day()) < (born.month(), born.day());
    let years = today.year() - born.year() - i32::from(before_birthday);
    u32::try_from(years).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(texts: &[&str]) -> Vec<OcrLine> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| OcrLine {
                text: t.to_string(),
                bounds: (0, i as u32 * 30, 300, 24),
                confidence: 0.9,
            })
            .collect()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    #[test]
    fn test_extract_full_card() {
        let ocr = lines(&[
            "Government of India",
            "Ravikumar Shankar Sharma",
            "DOB: 21/08/1990",
            "MALE",
            "1234 5678 9012",
        ]);

        let record = extract_fields(&ocr, 10, today());

        assert_eq!(record.names, vec!["Ravikumar Shankar Sharma".to_string()]);
        assert_eq!(
            record.dob,
            Some(DobField::Valid {
                text: "21/08/1990".to_string(),
                date: NaiveDate::from_ymd_opt(1990, 8, 21).unwrap(),
                age: 33,
            })
        );
        assert_eq!(record.gender, Some(Gender::Male));
        assert_eq!(record.id_number.as_deref(), Some("1234 5678 9012"));
        assert_eq!(record.id_digits().as_deref(), Some("123456789012"));
        assert!(record.is_found());
    }

    #[test]
    fn test_short_names_are_dropped() {
        // "Government of India" breaks at "of"; "Ravi Kumar" has only 9 letters
        let record = extract_fields(&lines(&["Government of India", "Ravi Kumar"]), 10, today());
        assert!(record.names.is_empty());
    }

    #[test]
    fn test_all_caps_name() {
        let record = extract_fields(&lines(&["RAVIKUMAR SHARMA"]), 10, today());
        assert_eq!(record.names, vec!["RAVIKUMAR SHARMA".to_string()]);
    }

    #[test]
    fn test_female_is_not_read_as_male() {
        let record = extract_fields(&lines(&["Female / FEMALE"]), 10, today());
        assert_eq!(record.gender, Some(Gender::Female));
    }

    #[test]
    fn test_first_gender_wins() {
        let record = extract_fields(&lines(&["Transgender", "Male"]), 10, today());
        assert_eq!(record.gender, Some(Gender::Transgender));
    }

    #[test]
    fn test_dash_date_is_not_valid() {
        let record = extract_fields(&lines(&["DOB 21-08-1990"]), 10, today());
        assert_eq!(
            record.dob,
            Some(DobField::Invalid {
                raw: "21-08-1990".to_string()
            })
        );
        assert!(!record.is_found());
    }

    #[test]
    fn test_impossible_date_is_not_valid() {
        let record = extract_fields(&lines(&["31/02/1990"]), 10, today());
        assert!(matches!(record.dob, Some(DobField::Invalid { .. })));
    }

    #[test]
    fn test_only_first_date_is_used() {
        let record = extract_fields(&lines(&["Issued 31-13-2020", "DOB 01/01/2000"]), 10, today());
        assert!(matches!(record.dob, Some(DobField::Invalid { .. })));
    }

    #[test]
    fn test_id_number_without_spaces() {
        let record = extract_fields(&lines(&["VID 123456789012"]), 10, today());
        assert_eq!(record.id_number.as_deref(), Some("123456789012"));
    }

    #[test]
    fn test_age_on() {
        let born = NaiveDate::from_ymd_opt(2000, 6, 16).unwrap();
        assert_eq!(age_on(born, today()), Some(23));
        let born = NaiveDate::from_ymd_opt(2000, 6, 15).unwrap();
        assert_eq!(age_on(born, today()), Some(24));
        let born = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        assert_eq!(age_on(born, today()), None);
    }

    #[test]
    fn test_display_report() {
        let record = extract_fields(
            &lines(&["Ravikumar Shankar Sharma", "15/06/2000", "Female", "1234 5678 9012"]),
            10,
            today(),
        );
        let text = record.to_string();

        assert!(text.contains("Name: Ravikumar Shankar Sharma"));
        assert!(text.contains("DOB: 15/06/2000"));
        assert!(text.contains("Age: 24"));
        assert!(text.contains("Gender: Female"));
        assert!(text.contains("ID Number: 1234 5678 9012"));
        assert!(!text.contains("Scan Failed"));
    }

    #[test]
    fn test_display_failed_scan() {
        let record = extract_fields(&lines(&["blurry", "text"]), 10, today());
        assert!(!record.is_found());
        assert_eq!(
            record.to_string(),
            "Scan Failed. Please try again with a horizontal scan.\n"
        );
    }
}
