//! Reference numbers in the `YY-NNN-VV` format: two-digit year, per-year
//! sequence number, version. Revisions keep the parent's year and sequence and
//! take the next free version.

use anyhow::{bail, Result};
use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceNumber {
    pub year: u32,
    pub sequence: u32,
    pub version: u32,
}

fn refnum_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{2})-(\d{3})-(\d{2})$").unwrap())
}

impl ReferenceNumber {
    pub fn parse(s: &str) -> Result<Self> {
        let captures = match refnum_regex().captures(s) {
            Some(c) => c,
            None => bail!("Malformed reference number: {}", s),
        };
        Ok(Self {
            year: captures[1].parse()?,
            sequence: captures[2].parse()?,
            version: captures[3].parse()?,
        })
    }

    pub fn format(&self) -> String {
        format!("{:02}-{:03}-{:02}", self.year, self.sequence, self.version)
    }
}

impl std::fmt::Display for ReferenceNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.format())
    }
}

/// Builds the reference number for a brand-new proposal: next free sequence in
/// the given year, version 01. `existing` holds all reference numbers already
/// assigned for that year.
pub fn next_reference_number(year: i32, existing: &[String]) -> Result<ReferenceNumber> {
    let year = (year % 100) as u32;
    let mut highest = 0;
    for raw in existing {
        let parsed = ReferenceNumber::parse(raw)?;
        if parsed.year == year && parsed.sequence > highest {
            highest = parsed.sequence;
        }
    }
    Ok(ReferenceNumber {
        year,
        sequence: highest + 1,
        version: 1,
    })
}

/// Builds the reference number for a revision: same year and sequence as the
/// parent, one past the highest version already assigned for that sequence.
///
/// The highest existing version is used rather than the parent's own version:
/// two revisions created from the same parent must not collide.
pub fn next_revision_reference_number(
    parent_reference: &str,
    existing: &[String],
) -> Result<ReferenceNumber> {
    let parent = ReferenceNumber::parse(parent_reference)?;
    let mut highest = parent.version;
    for raw in existing {
        let parsed = ReferenceNumber::parse(raw)?;
        if parsed.year == parent.year
            && parsed.sequence == parent.sequence
            && parsed.version > highest
        {
            highest = parsed.version;
        }
    }
    Ok(ReferenceNumber {
        year: parent.year,
        sequence: parent.sequence,
        version: highest + 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_format_roundtrip() {
        let parsed = ReferenceNumber::parse("26-047-01").unwrap();
        assert_eq!(parsed.year, 26);
        assert_eq!(parsed.sequence, 47);
        assert_eq!(parsed.version, 1);
        assert_eq!(parsed.format(), "26-047-01");
    }

    #[test]
    fn parse_rejects_malformed() {
        for bad in ["", "26-47-1", "2026-047-01", "26-047", "26-047-01-02", "ab-cde-fg"] {
            assert!(ReferenceNumber::parse(bad).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn first_number_of_the_year() {
        let refnum = next_reference_number(2026, &[]).unwrap();
        assert_eq!(refnum.format(), "26-001-01");
    }

    #[test]
    fn sequence_increments_within_year() {
        let existing = vec!["26-001-01".to_string(), "26-002-01".to_string()];
        let refnum = next_reference_number(2026, &existing).unwrap();
        assert_eq!(refnum.format(), "26-003-01");
    }

    #[test]
    fn other_years_do_not_affect_sequence() {
        let existing = vec!["25-014-01".to_string()];
        let refnum = next_reference_number(2026, &existing).unwrap();
        assert_eq!(refnum.format(), "26-001-01");
    }

    #[test]
    fn revision_takes_next_free_version() {
        let existing = vec![
            "26-003-01".to_string(),
            "26-003-02".to_string(),
            "26-004-01".to_string(),
        ];
        let refnum = next_revision_reference_number("26-003-01", &existing).unwrap();
        assert_eq!(refnum.format(), "26-003-03");
    }

    #[test]
    fn two_revisions_of_same_parent_do_not_collide() {
        // First revision of 26-005-01.
        let mut existing = vec!["26-005-01".to_string()];
        let first = next_revision_reference_number("26-005-01", &existing).unwrap();
        assert_eq!(first.format(), "26-005-02");
        existing.push(first.format());

        // Second revision created from the same parent, not from the first.
        let second = next_revision_reference_number("26-005-01", &existing).unwrap();
        assert_eq!(second.format(), "26-005-03");
    }
}
