use crate::error::{Error, Result};
use crate::fields::{split_line, Field, FieldMap, Row};
use crate::models::{Config, StudentRecord, TextEncoding, SEX_PLACEHOLDER};
use crate::normalize::{resolve_year, EmailNormalizer, TimeRangeParser};
use crate::roster::RosterSet;
use crate::validator::{Admission, SanityChecker};
use encoding::all::{UTF_16BE, UTF_16LE, UTF_8};
use encoding::{DecoderTrap, EncodingRef};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;
use tracing::{debug, info};

/// Counts for one parsed input file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSummary {
    pub section: String,
    pub rows: usize,
    pub admitted: usize,
    pub rejected: usize,
    pub skipped: usize,
}

pub struct RosterParser {
    delimiter: String,
    encoding: TextEncoding,
    field_map: FieldMap,
    emails: EmailNormalizer,
    times: TimeRangeParser,
}

impl RosterParser {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self {
            delimiter: config.delimiter.clone(),
            encoding: config.encoding,
            field_map: config.field_map.clone(),
            emails: EmailNormalizer::new(&config.email_domain)?,
            times: TimeRangeParser::new()?,
        })
    }

    /// Parse every data row of one export file into `rosters`.
    ///
    /// The first line is a header and is never read. Rows too short for the
    /// field map, blank lines included, are reported and skipped; read
    /// failures abort the run.
    pub fn parse_file<W: Write>(
        &self,
        path: &Path,
        checker: &mut SanityChecker<W>,
        rosters: &mut RosterSet,
    ) -> Result<FileSummary> {
        let section = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let content = read_input(path, self.encoding)?;
        rosters.begin_roster(section.clone());

        let mut summary = FileSummary {
            section: section.clone(),
            ..FileSummary::default()
        };

        for (index, line) in content.lines().enumerate().skip(1) {
            let line_number = index + 1;
            summary.rows += 1;

            let student = match self.parse_line(line, &section) {
                Ok(student) => student,
                Err(e) if e.is_row_level() => {
                    println!("   ⚠️  Skipping line {} of {}: {}", line_number, section, e);
                    summary.skipped += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            let name = student.name.clone();
            match checker.add_to_roster(rosters, student)? {
                Admission::Admitted => summary.admitted += 1,
                Admission::Rejected(reason) => {
                    summary.rejected += 1;
                    debug!("{} rejected: {}", name, reason);
                    println!(
                        "{} not added to roster. See {}",
                        name,
                        checker.log_path().display()
                    );
                }
            }
        }

        info!(
            "{}: {} rows, {} admitted, {} rejected, {} skipped",
            section, summary.rows, summary.admitted, summary.rejected, summary.skipped
        );
        Ok(summary)
    }

    /// Split one raw line and build a record from it
    pub fn parse_line(&self, line: &str, section: &str) -> Result<StudentRecord> {
        let row = Row::new(split_line(line, &self.delimiter), &self.field_map)?;
        debug!("{}: row with {} fields", section, row.len());
        Ok(self.build_record(&row, section))
    }

    pub fn build_record(&self, row: &Row<'_>, section: &str) -> StudentRecord {
        let map = &self.field_map;
        let name = format!(
            "{} {}",
            row.get(map, Field::FirstName),
            row.get(map, Field::LastName)
        );
        let email = self.emails.normalize(row.get(map, Field::Email));
        let year = resolve_year(row.get(map, Field::Year).trim());

        // Each label column is preceded by the meeting time it ranks
        let mut good_times = Vec::new();
        let mut possible_times = Vec::new();
        for column in map.choice_columns() {
            let label = row.at(column);
            if label == map.first_choice_label {
                good_times.push(self.times.parse(row.at(column - 1)));
            } else if label == map.second_choice_label {
                possible_times.push(self.times.parse(row.at(column - 1)));
            }
        }

        StudentRecord {
            name,
            email,
            section: section.to_string(),
            sex: SEX_PLACEHOLDER.to_string(),
            year,
            good_times,
            possible_times,
        }
    }
}

/// Read a whole input file and decode it to text
pub fn read_input(path: &Path, encoding: TextEncoding) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => Error::file_not_found(path.display().to_string()),
        _ => Error::io(format!("Failed to read {}", path.display()), e),
    })?;
    decode_input(&bytes, encoding, &path.display().to_string())
}

pub fn decode_input(bytes: &[u8], encoding: TextEncoding, source: &str) -> Result<String> {
    const UTF16_LE_BOM: [u8; 2] = [0xFF, 0xFE];
    const UTF16_BE_BOM: [u8; 2] = [0xFE, 0xFF];
    const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

    let (codec, body): (EncodingRef, &[u8]) = match encoding {
        TextEncoding::Unicode => {
            if let Some(rest) = bytes.strip_prefix(&UTF16_LE_BOM) {
                (UTF_16LE as EncodingRef, rest)
            } else if let Some(rest) = bytes.strip_prefix(&UTF16_BE_BOM) {
                (UTF_16BE as EncodingRef, rest)
            } else {
                (UTF_16BE as EncodingRef, bytes)
            }
        }
        TextEncoding::Utf16Le => (
            UTF_16LE as EncodingRef,
            bytes.strip_prefix(&UTF16_LE_BOM).unwrap_or(bytes),
        ),
        TextEncoding::Utf16Be => (
            UTF_16BE as EncodingRef,
            bytes.strip_prefix(&UTF16_BE_BOM).unwrap_or(bytes),
        ),
        TextEncoding::Utf8 => (
            UTF_8 as EncodingRef,
            bytes.strip_prefix(&UTF8_BOM).unwrap_or(bytes),
        ),
    };

    codec
        .decode(body, DecoderTrap::Strict)
        .map_err(|e| Error::encoding(source, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DuplicateKey, IssueKind};
    use crate::report::render_report;

    const WIDTH: usize = 95;

    /// Quoted export line with the given cells set and every other cell empty
    fn export_line(cells: &[(usize, &str)]) -> String {
        let mut fields = vec![""; WIDTH];
        for (index, value) in cells {
            fields[*index] = value;
        }
        format!("\"{}\"", fields.join("\",\""))
    }

    fn student_line(first: &str, last: &str, email: &str, year: &str) -> String {
        export_line(&[
            (2, last),
            (5, first),
            (8, email),
            (11, year),
            (16, "Lecture A Mon 9:00-9:50"),
            (17, "first choice"),
            (19, "Recitation Wed 2:10 - 3:00"),
            (20, "second choice"),
            (22, "Lab Fri 8"),
            (23, "not available"),
            (25, "Recitation Thu 11:10-12:00"),
            (26, "first choice"),
        ])
    }

    fn utf16le_with_bom(text: &str) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        bytes
    }

    fn parser() -> RosterParser {
        RosterParser::new(&Config::default()).unwrap()
    }

    fn checker() -> SanityChecker<Vec<u8>> {
        SanityChecker::from_writer(
            Vec::new(),
            "problem_students.txt",
            Config::default().reject_on,
        )
    }

    #[test]
    fn builds_record_from_positions() {
        let line = student_line("Jane", "Doe", "jd1001", " Sophomore ");
        let student = parser().parse_line(&line, "lecture1.txt").unwrap();

        assert_eq!(student.name, "Jane Doe");
        assert_eq!(student.email, "jd1001@wildcats.unh.edu");
        assert_eq!(student.section, "lecture1.txt");
        assert_eq!(student.sex, "n/a");
        assert_eq!(student.year, 2);

        let good: Vec<String> = student.good_times.iter().map(|t| t.to_string()).collect();
        let possible: Vec<String> = student
            .possible_times
            .iter()
            .map(|t| t.to_string())
            .collect();
        assert_eq!(good, vec!["Mon: 9:00 - 9:50", "Thu: 11:10 - 12:00"]);
        assert_eq!(possible, vec!["Wed: 2:10 - 3:00"]);
    }

    #[test]
    fn short_line_is_a_row_error() {
        let err = parser()
            .parse_line("\"a\",\"b\",\"c\"", "lecture1.txt")
            .unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedRow {
                found: 3,
                required: 93
            }
        ));
    }

    #[test]
    fn labels_outside_choice_block_are_ignored() {
        let line = export_line(&[
            (2, "Doe"),
            (5, "Jane"),
            (8, "x@y.org"),
            (9, "Mon 9"),
            (10, "first choice"),
        ]);
        let student = parser().parse_line(&line, "s").unwrap();
        assert!(student.good_times.is_empty());
        assert!(student.possible_times.is_empty());
    }

    #[test]
    fn decodes_unicode_with_either_byte_order() {
        let le = utf16le_with_bom("héllo\n");
        assert_eq!(decode_input(&le, TextEncoding::Unicode, "t").unwrap(), "héllo\n");

        let mut be = vec![0xFE, 0xFF];
        for unit in "abc".encode_utf16() {
            be.extend_from_slice(&unit.to_be_bytes());
        }
        assert_eq!(decode_input(&be, TextEncoding::Unicode, "t").unwrap(), "abc");
        assert_eq!(decode_input(&be[2..], TextEncoding::Unicode, "t").unwrap(), "abc");
    }

    #[test]
    fn invalid_bytes_are_an_encoding_error() {
        let err = decode_input(&[0x61, 0xC3, 0x28], TextEncoding::Utf8, "bad.txt").unwrap_err();
        assert!(matches!(err, Error::Encoding { ref path, .. } if path == "bad.txt"));
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_input(&dir.path().join("absent.txt"), TextEncoding::Unicode).unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }

    #[test]
    fn parses_file_skipping_header_and_short_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lecture1.txt");
        let content = format!(
            "{}\r\n{}\r\n\"Short\",\"row\"\r\n",
            student_line("First", "Header", "hdr", "Junior"),
            student_line("Jane", "Doe", "jd1001", "Sophomore"),
        );
        fs::write(&path, utf16le_with_bom(&content)).unwrap();

        let parser = parser();
        let mut checker = checker();
        let mut rosters = RosterSet::new(DuplicateKey::NameAndSection);
        let summary = parser.parse_file(&path, &mut checker, &mut rosters).unwrap();

        assert_eq!(
            summary,
            FileSummary {
                section: "lecture1.txt".to_string(),
                rows: 2,
                admitted: 1,
                rejected: 0,
                skipped: 1,
            }
        );
        assert_eq!(rosters.rosters().len(), 1);
        assert_eq!(rosters.rosters()[0].students[0].name, "Jane Doe");

        let report = render_report(&rosters, "Lecture");
        assert!(report.contains("Number of students: 1\n"));
        assert!(!report.contains("First Header"));
    }

    #[test]
    fn student_count_spans_all_files() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.txt");
        let second = dir.path().join("b.txt");
        let header = "header";
        fs::write(
            &first,
            utf16le_with_bom(&format!(
                "{}\n{}\n{}\n",
                header,
                student_line("Ann", "Lee", "al1", "Junior"),
                student_line("Ann", "Lee", "al1", "Junior"),
            )),
        )
        .unwrap();
        fs::write(
            &second,
            utf16le_with_bom(&format!(
                "{}\n\n{}\n",
                header,
                student_line("Bo", "Kim", "bk2", "Senior"),
            )),
        )
        .unwrap();

        let parser = parser();
        let mut checker = checker();
        let mut rosters = RosterSet::new(DuplicateKey::NameAndSection);
        let a = parser.parse_file(&first, &mut checker, &mut rosters).unwrap();
        let b = parser.parse_file(&second, &mut checker, &mut rosters).unwrap();

        assert_eq!((a.admitted, a.rejected), (1, 1));
        assert_eq!((b.rows, b.admitted, b.skipped), (2, 1, 1));
        assert_eq!(rosters.total_students(), 2);
        assert_eq!(checker.rejected(), 1);

        let report = render_report(&rosters, "Lecture");
        assert_eq!(report.matches("Number of students: 2\n").count(), 2);
    }

    #[test]
    fn blank_line_is_reported_as_short_row() {
        let err = parser().parse_line("", "lecture1.txt").unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedRow {
                found: 1,
                required: 93
            }
        ));
    }

    #[test]
    fn invalid_email_row_is_rejected_not_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.txt");
        fs::write(
            &path,
            utf16le_with_bom(&format!("h\n{}\n", student_line("No", "Mail", "1234", "Junior"))),
        )
        .unwrap();

        let mut checker = SanityChecker::from_writer(
            Vec::new(),
            "problem_students.txt",
            vec![IssueKind::MissingEmail],
        );
        let mut rosters = RosterSet::new(DuplicateKey::Name);
        let summary = parser().parse_file(&path, &mut checker, &mut rosters).unwrap();
        assert_eq!((summary.rejected, summary.skipped), (1, 0));
        assert_eq!(rosters.total_students(), 0);
    }
}
