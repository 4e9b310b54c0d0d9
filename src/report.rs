//! Report rendering and writing
//!
//! The report is written once, after every input file has been parsed. When
//! the target already exists the caller decides what happens through a
//! `CollisionDecision`, so this module never talks to the terminal itself.

use crate::error::{Error, Result};
use crate::roster::{Roster, RosterSet};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const FORMAT_VERSION: u32 = 1;
pub const DESCRIPTION: &str = "A bunch of students";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollisionDecision {
    Overwrite,
    Abort,
    RenameTo(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Written(PathBuf),
    Aborted,
}

/// Header plus every student block of one roster
pub fn render_roster(roster: &Roster, total_students: usize, lecture_label: &str) -> String {
    let mut content = String::new();
    content.push_str(&format!("Student Info Format: {}\n", FORMAT_VERSION));
    content.push_str(&format!("Description: {}\n", DESCRIPTION));
    content.push_str(&format!("Number of students: {}\n", total_students));
    for student in &roster.students {
        content.push_str(&student.render(lecture_label));
    }
    content
}

/// All rosters in the order their files were parsed
pub fn render_report(rosters: &RosterSet, lecture_label: &str) -> String {
    let total = rosters.total_students();
    rosters
        .rosters()
        .iter()
        .map(|roster| render_roster(roster, total, lecture_label))
        .collect()
}

/// Write `content` to `path`, asking `resolve` what to do whenever the target exists.
pub fn write_report<F>(path: &Path, content: &str, mut resolve: F) -> Result<WriteOutcome>
where
    F: FnMut(&Path) -> Result<CollisionDecision>,
{
    let mut target = path.to_path_buf();
    loop {
        match OpenOptions::new().write(true).create_new(true).open(&target) {
            Ok(mut file) => {
                file.write_all(content.as_bytes())
                    .and_then(|_| file.flush())
                    .map_err(|e| {
                        Error::io(format!("Failed to write report {}", target.display()), e)
                    })?;
                info!("Report written to {}", target.display());
                return Ok(WriteOutcome::Written(target));
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => match resolve(&target)? {
                CollisionDecision::Overwrite => {
                    debug!("Removing existing report {}", target.display());
                    fs::remove_file(&target).map_err(|e| {
                        Error::io(format!("Failed to delete {}", target.display()), e)
                    })?;
                }
                CollisionDecision::Abort => return Ok(WriteOutcome::Aborted),
                CollisionDecision::RenameTo(name) => {
                    debug!("Retrying report as {}", name);
                    target = PathBuf::from(name);
                }
            },
            Err(e) => {
                return Err(Error::io(
                    format!("Failed to create report {}", target.display()),
                    e,
                ))
            }
        }
    }
}
