//! Free-text field normalizers: email addresses, meeting times and class year.

use crate::models::TimeSlot;
use anyhow::{Context, Result};
use regex::Regex;

const MAILTO_MARKER: &str = "<a href=\"\"mailto:";
const LINE_BREAK_MARKER: &str = "<br />";

/// Map a trimmed class-standing label to its year code, 0 when unrecognized.
pub fn resolve_year(label: &str) -> u8 {
    match label {
        "First-year" => 1,
        "Sophomore" => 2,
        "Junior" => 3,
        "Senior" => 4,
        "Grad or Special Status" => 5,
        _ => 0,
    }
}

pub struct EmailNormalizer {
    domain: String,
    bare_username: Regex,
    embedded_username: Regex,
}

impl EmailNormalizer {
    pub fn new(domain: &str) -> Result<Self> {
        Ok(Self {
            domain: domain.to_string(),
            bare_username: Regex::new(r"^\s*([A-Za-z][A-Za-z0-9._-]*)\s*$")
                .context("Failed to compile bare username pattern")?,
            embedded_username: Regex::new(r"[a-zA-Z]{1,3}[0-9]*")
                .context("Failed to compile username pattern")?,
        })
    }

    /// Turn a username, an address or a mailto anchor into a plain address.
    ///
    /// Steps run in a fixed order, each only when its trigger is present:
    /// username completion (no `@`), anchor text extraction, `<br />` removal, trim.
    pub fn normalize(&self, raw: &str) -> String {
        let mut email = raw.to_string();

        if !email.contains('@') {
            if let Some(username) = self.find_username(&email) {
                email = format!("{}@{}", username, self.domain);
            }
        }

        if email.contains(MAILTO_MARKER) {
            email = anchor_text(&email).to_string();
        }

        // Removing one marker can join the halves of another
        while email.contains(LINE_BREAK_MARKER) {
            email = email.replace(LINE_BREAK_MARKER, "");
        }

        email.trim().to_string()
    }

    fn find_username<'t>(&self, text: &'t str) -> Option<&'t str> {
        if let Some(caps) = self.bare_username.captures(text) {
            return caps.get(1).map(|m| m.as_str());
        }
        self.embedded_username.find(text).map(|m| m.as_str())
    }
}

/// Visible text of the first anchor: after the first `>`, up to the next `<`.
fn anchor_text(html: &str) -> &str {
    let after_tag = match html.find('>') {
        Some(index) => &html[index + 1..],
        None => html,
    };
    match after_tag.find('<') {
        Some(index) => &after_tag[..index],
        None => after_tag,
    }
}

pub struct TimeRangeParser {
    time_token: Regex,
    weekday: Regex,
}

impl TimeRangeParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            time_token: Regex::new(r"(?:10|11|12|[1-9]):[0-5][0-9]|[1-9]")
                .context("Failed to compile time pattern")?,
            weekday: Regex::new(r"Mon|Tue|Wed|Thu|Fri").context("Failed to compile day pattern")?,
        })
    }

    /// Pull a weekday and up to two clock times out of a meeting description.
    ///
    /// Day and times are found by separate scans since the export does not keep
    /// them adjacent. Bare hour digits are widened to `H:00`.
    pub fn parse(&self, input: &str) -> TimeSlot {
        let mut times = self.time_token.find_iter(input).map(|m| widen_hour(m.as_str()));
        let start = times.next().unwrap_or_default();
        let end = times.next().unwrap_or_default();

        let day = self
            .weekday
            .find(input)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();

        TimeSlot { day, start, end }
    }
}

fn widen_hour(token: &str) -> String {
    if token.len() == 1 {
        format!("{}:00", token)
    } else {
        token.to_string()
    }
}
