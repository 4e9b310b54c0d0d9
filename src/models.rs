use crate::error::Error;
use crate::fields::FieldMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder written for the sex column; the export carries no value for it.
pub const SEX_PLACEHOLDER: &str = "n/a";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub report_file: String,
    pub reject_log: String,
    pub delimiter: String,
    pub encoding: TextEncoding,
    // Label printed in front of the section, "Lecture" or "Professor" depending on deployment
    pub lecture_label: String,
    pub email_domain: String,
    pub duplicate_key: DuplicateKey,
    pub reject_on: Vec<IssueKind>,
    pub field_map: FieldMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextEncoding {
    /// UTF-16 with byte-order mark detection, big-endian when no mark is present
    #[serde(rename = "unicode")]
    Unicode,
    #[serde(rename = "utf-16le")]
    Utf16Le,
    #[serde(rename = "utf-16be")]
    Utf16Be,
    #[serde(rename = "utf-8")]
    Utf8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuplicateKey {
    #[serde(rename = "name")]
    Name,
    #[serde(rename = "name_and_section")]
    NameAndSection,
}

/// Consistency problems the sanity checker can flag on a built record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueKind {
    #[serde(rename = "missing_name")]
    MissingName,
    #[serde(rename = "missing_email")]
    MissingEmail,
    #[serde(rename = "unrecognized_year")]
    UnrecognizedYear,
    #[serde(rename = "no_times")]
    NoTimes,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            IssueKind::MissingName => "missing name",
            IssueKind::MissingEmail => "missing or unusable email",
            IssueKind::UnrecognizedYear => "unrecognized year",
            IssueKind::NoTimes => "no good or possible times",
        };
        f.write_str(text)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            report_file: "students".to_string(),
            reject_log: "problem_students.txt".to_string(),
            delimiter: "\",\"".to_string(),
            encoding: TextEncoding::Unicode,
            lecture_label: "Lecture".to_string(),
            email_domain: "wildcats.unh.edu".to_string(),
            duplicate_key: DuplicateKey::NameAndSection,
            reject_on: vec![IssueKind::MissingName, IssueKind::MissingEmail],
            field_map: FieldMap::default(),
        }
    }
}

impl Config {
    pub fn load_from_file(file_path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(file_path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, file_path: &str) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(file_path, content)?;
        Ok(())
    }

    /// Reject settings that would make every row unparseable before any file is opened
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.delimiter.is_empty() {
            return Err(Error::configuration("delimiter must not be empty"));
        }
        if self.report_file.trim().is_empty() {
            return Err(Error::configuration("report_file must not be empty"));
        }
        if self.reject_log.trim().is_empty() {
            return Err(Error::configuration("reject_log must not be empty"));
        }
        self.field_map.validate()
    }
}

/// One ranked meeting time, rendered as `<day>: <start> - <end>`.
/// Any part may be empty when the source text did not contain it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TimeSlot {
    pub day: String,
    pub start: String,
    pub end: String,
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} - {}", self.day, self.start, self.end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentRecord {
    pub name: String,
    pub email: String,
    pub section: String,
    pub sex: String,
    pub year: u8,
    pub good_times: Vec<TimeSlot>,
    pub possible_times: Vec<TimeSlot>,
}

impl StudentRecord {
    /// Render the student block of the report
    pub fn render(&self, lecture_label: &str) -> String {
        let mut content = String::new();
        content.push_str(&format!(
            "Name: {}\n\
            Email: {}\n\
            {}: {}\n\
            Year: {}\n\
            Sex: {}\n\
            Number of good times: {}\n",
            self.name,
            self.email,
            lecture_label,
            self.section,
            self.year,
            self.sex,
            self.good_times.len()
        ));
        for slot in &self.good_times {
            content.push_str(&format!("{}\n", slot));
        }
        content.push_str(&format!(
            "Number of possible times: {}\n",
            self.possible_times.len()
        ));
        for slot in &self.possible_times {
            content.push_str(&format!("{}\n", slot));
        }
        content
    }
}
