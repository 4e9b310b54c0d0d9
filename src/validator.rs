//! Sanity checks and roster admission for built student records
//!
//! Every candidate record is checked for implausible fields and for duplicates
//! already admitted to the run. Flagged issues and rejections are appended to
//! the reject log, which stays open for the whole run.

use crate::error::{Error, Result};
use crate::models::{IssueKind, StudentRecord};
use crate::roster::RosterSet;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    Duplicate,
    Invalid(Vec<IssueKind>),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Duplicate => f.write_str("duplicate of an admitted student"),
            RejectReason::Invalid(issues) => {
                let text: Vec<String> = issues.iter().map(|i| i.to_string()).collect();
                write!(f, "{}", text.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    Rejected(RejectReason),
}

pub struct SanityChecker<W: Write> {
    log: W,
    log_path: PathBuf,
    reject_on: Vec<IssueKind>,
    rejected: usize,
}

impl SanityChecker<BufWriter<File>> {
    /// Open (or create) the reject log in append mode
    pub fn open(log_path: impl AsRef<Path>, reject_on: Vec<IssueKind>) -> Result<Self> {
        let log_path = log_path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
            .map_err(|e| {
                Error::io(
                    format!("Failed to open reject log {}", log_path.display()),
                    e,
                )
            })?;
        info!("Reject log: {}", log_path.display());
        Ok(Self::from_writer(BufWriter::new(file), log_path, reject_on))
    }
}

impl<W: Write> SanityChecker<W> {
    pub fn from_writer(log: W, log_path: impl AsRef<Path>, reject_on: Vec<IssueKind>) -> Self {
        Self {
            log,
            log_path: log_path.as_ref().to_path_buf(),
            reject_on,
            rejected: 0,
        }
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn rejected(&self) -> usize {
        self.rejected
    }

    /// Fields of the record that look implausible
    pub fn check_student(&self, student: &StudentRecord) -> Vec<IssueKind> {
        let mut issues = Vec::new();
        if student.name.trim().is_empty() {
            issues.push(IssueKind::MissingName);
        }
        if student.email.is_empty() || !student.email.contains('@') {
            issues.push(IssueKind::MissingEmail);
        }
        if student.year == 0 {
            issues.push(IssueKind::UnrecognizedYear);
        }
        if student.good_times.is_empty() && student.possible_times.is_empty() {
            issues.push(IssueKind::NoTimes);
        }
        issues
    }

    /// Decide whether the record joins the run, logging every issue and rejection.
    pub fn add_to_roster(
        &mut self,
        rosters: &mut RosterSet,
        student: StudentRecord,
    ) -> Result<Admission> {
        let issues = self.check_student(&student);
        for issue in &issues {
            self.write_entry(&student, &format!("flagged: {}", issue))?;
        }

        if rosters.is_duplicate(&student) {
            return self.reject(&student, RejectReason::Duplicate);
        }

        let blocking: Vec<IssueKind> = issues
            .into_iter()
            .filter(|issue| self.reject_on.contains(issue))
            .collect();
        if !blocking.is_empty() {
            return self.reject(&student, RejectReason::Invalid(blocking));
        }

        debug!("Admitted {} to {}", student.name, student.section);
        rosters.admit(student);
        Ok(Admission::Admitted)
    }

    /// Flush the log; called once after the last file
    pub fn finish(mut self) -> Result<()> {
        self.log
            .flush()
            .map_err(|e| Error::io("Failed to flush reject log", e))?;
        info!(
            "Reject log closed with {} rejected students",
            self.rejected
        );
        Ok(())
    }

    fn reject(&mut self, student: &StudentRecord, reason: RejectReason) -> Result<Admission> {
        self.write_entry(student, &format!("rejected: {}", reason))?;
        self.rejected += 1;
        debug!("Rejected {}: {}", student.name, reason);
        Ok(Admission::Rejected(reason))
    }

    fn write_entry(&mut self, student: &StudentRecord, entry: &str) -> Result<()> {
        writeln!(self.log, "{} [{}] {}", student.name, student.section, entry)
            .map_err(|e| Error::io("Failed to write reject log", e))
    }
}
