//! Positional field access for roster export rows
//!
//! The export is a fixed layout: every row is a run of quoted fields joined by
//! `","`, and a block of `(time, choice label, blank)` triples holds the ranked
//! meeting times. `FieldMap` names each position once so the rest of the
//! pipeline never indexes a row with a bare number.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Split a raw line on every occurrence of the literal delimiter.
pub fn split_line<'a>(line: &'a str, delimiter: &str) -> Vec<&'a str> {
    line.split(delimiter).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    LastName,
    FirstName,
    Email,
    Year,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMap {
    pub last_name: usize,
    pub first_name: usize,
    pub email: usize,
    pub year: usize,
    /// Index of the first choice label column
    pub choice_start: usize,
    /// Exclusive upper bound for choice label columns
    pub choice_end: usize,
    pub choice_step: usize,
    pub first_choice_label: String,
    pub second_choice_label: String,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            last_name: 2,
            first_name: 5,
            email: 8,
            year: 11,
            choice_start: 17,
            choice_end: 93,
            choice_step: 3,
            first_choice_label: "first choice".to_string(),
            second_choice_label: "second choice".to_string(),
        }
    }
}

impl FieldMap {
    pub fn index_of(&self, field: Field) -> usize {
        match field {
            Field::LastName => self.last_name,
            Field::FirstName => self.first_name,
            Field::Email => self.email,
            Field::Year => self.year,
        }
    }

    /// Indices of the choice label columns, in row order
    pub fn choice_columns(&self) -> impl Iterator<Item = usize> {
        (self.choice_start..self.choice_end).step_by(self.choice_step.max(1))
    }

    /// Minimum number of fields a row needs for every mapped position to exist
    pub fn required_width(&self) -> usize {
        let named = [self.last_name, self.first_name, self.email, self.year];
        let last_choice = self.choice_columns().last();
        named
            .into_iter()
            .chain(last_choice)
            .max()
            .map_or(0, |index| index + 1)
    }

    /// Check that the map describes a layout rows can actually satisfy
    pub fn validate(&self) -> Result<()> {
        if self.choice_step == 0 {
            return Err(Error::schema_mismatch("choice_step must be at least 1"));
        }
        if self.choice_start == 0 {
            return Err(Error::schema_mismatch(
                "choice_start must be at least 1, the time column precedes each label",
            ));
        }
        if self.choice_start >= self.choice_end {
            return Err(Error::schema_mismatch(format!(
                "choice block is empty: start {} is not before end {}",
                self.choice_start, self.choice_end
            )));
        }
        if self.first_choice_label.is_empty() || self.second_choice_label.is_empty() {
            return Err(Error::schema_mismatch("choice labels must not be empty"));
        }
        Ok(())
    }
}

/// A split row checked against the field map's required width
#[derive(Debug)]
pub struct Row<'a> {
    fields: Vec<&'a str>,
}

impl<'a> Row<'a> {
    pub fn new(fields: Vec<&'a str>, map: &FieldMap) -> Result<Self> {
        let required = map.required_width();
        if fields.len() < required {
            return Err(Error::MalformedRow {
                found: fields.len(),
                required,
            });
        }
        Ok(Self { fields })
    }

    pub fn get(&self, map: &FieldMap, field: Field) -> &'a str {
        self.at(map.index_of(field))
    }

    /// Field at a raw position; positions come from a validated map
    pub fn at(&self, index: usize) -> &'a str {
        self.fields.get(index).copied().unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }
}
