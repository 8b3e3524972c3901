//! Run summaries.

use core::fmt;
use std::collections::BTreeMap;

use crate::finding::{Finding, Severity};

/// Counts for one verification run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunTally {
    /// Error and severe findings that passed the report floor.
    pub errors: usize,
    /// Warning findings that passed the report floor.
    pub warnings: usize,
    /// HDUs whose header and data phases both ran to completion.
    pub hdus_processed: usize,
    /// True when the run stopped early.
    pub aborted: bool,
}

impl RunTally {
    /// No errors and no warnings.
    pub fn is_valid(&self) -> bool {
        self.errors == 0 && self.warnings == 0
    }
}

impl fmt::Display for RunTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} HDU(s) verified: {} error(s), {} warning(s)",
            self.hdus_processed, self.errors, self.warnings
        )?;
        if self.aborted {
            f.write_str(" (aborted)")?;
        }
        Ok(())
    }
}

/// Totals across every run made with one context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CumulativeTally {
    pub errors: usize,
    pub warnings: usize,
}

impl CumulativeTally {
    pub(crate) fn add(&mut self, run: &RunTally) {
        self.errors += run.errors;
        self.warnings += run.warnings;
    }
}

/// Error and warning counts of one HDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HduCounts {
    pub hdu_index: usize,
    pub errors: usize,
    pub warnings: usize,
}

/// A run's tally together with every finding it emitted, in order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Report {
    pub tally: RunTally,
    pub findings: Vec<Finding>,
}

impl Report {
    pub fn is_valid(&self) -> bool {
        self.tally.is_valid()
    }

    /// Findings at or above `severity`.
    pub fn at_least(&self, severity: Severity) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.severity >= severity)
    }

    /// Findings with rule code `code`.
    pub fn with_code(&self, code: u16) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.code == code)
    }

    /// Findings attached to HDU `index`.
    pub fn for_hdu(&self, index: usize) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.hdu_index == index)
    }

    /// Errors and warnings per HDU, in HDU order. Every HDU with at least
    /// one finding of any severity is listed.
    pub fn hdu_counts(&self) -> Vec<HduCounts> {
        let mut counts = BTreeMap::new();
        for finding in &self.findings {
            let entry = counts
                .entry(finding.hdu_index)
                .or_insert_with(|| HduCounts {
                    hdu_index: finding.hdu_index,
                    ..HduCounts::default()
                });
            match finding.severity {
                Severity::Info => {}
                Severity::Warning => entry.warnings += 1,
                Severity::Error | Severity::Severe => entry.errors += 1,
            }
        }
        counts.into_values().collect()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for finding in &self.findings {
            writeln!(f, "{finding}")?;
        }
        let counts = self.hdu_counts();
        if !counts.is_empty() {
            writeln!(f)?;
            writeln!(f, "  HDU  Errors  Warnings")?;
            for c in &counts {
                writeln!(f, "{:>5}  {:>6}  {:>8}", c.hdu_index, c.errors, c.warnings)?;
            }
            writeln!(f)?;
        }
        write!(f, "{}", self.tally)
    }
}
