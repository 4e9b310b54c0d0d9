use crate::models::{DuplicateKey, StudentRecord};
use std::collections::HashSet;

/// Admitted students of one source file, in admission order
#[derive(Debug, Clone)]
pub struct Roster {
    pub section: String,
    pub students: Vec<StudentRecord>,
}

impl Roster {
    pub fn new(section: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            students: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.students.len()
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }
}

/// Every roster of a run plus the duplicate index of the roster being filled.
///
/// Records only enter through `admit`, which the sanity checker calls after a
/// record passes its checks. Duplicates are only looked for within the current
/// roster, so the same student may appear once in each source file.
#[derive(Debug)]
pub struct RosterSet {
    rosters: Vec<Roster>,
    seen: HashSet<String>,
    key: DuplicateKey,
}

impl RosterSet {
    pub fn new(key: DuplicateKey) -> Self {
        Self {
            rosters: Vec::new(),
            seen: HashSet::new(),
            key,
        }
    }

    /// Start the roster for the next source file; later admissions go there.
    pub fn begin_roster(&mut self, section: impl Into<String>) {
        self.seen.clear();
        self.rosters.push(Roster::new(section));
    }

    pub fn duplicate_key(&self, student: &StudentRecord) -> String {
        match self.key {
            DuplicateKey::Name => student.name.clone(),
            DuplicateKey::NameAndSection => format!("{}\u{1f}{}", student.name, student.section),
        }
    }

    pub fn is_duplicate(&self, student: &StudentRecord) -> bool {
        self.seen.contains(&self.duplicate_key(student))
    }

    /// Append to the current roster, opening one for the student's section if none is open.
    pub(crate) fn admit(&mut self, student: StudentRecord) {
        if self.rosters.is_empty() {
            self.begin_roster(student.section.clone());
        }
        self.seen.insert(self.duplicate_key(&student));
        if let Some(roster) = self.rosters.last_mut() {
            roster.students.push(student);
        }
    }

    pub fn rosters(&self) -> &[Roster] {
        &self.rosters
    }

    /// Admitted students across all files
    pub fn total_students(&self) -> usize {
        self.rosters.iter().map(Roster::len).sum()
    }
}
