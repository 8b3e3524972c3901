//! Run configuration: which test categories are enabled, the report floor,
//! and whether findings carry hints.

use core::fmt;
use core::str::FromStr;

use crate::error::{Result, VerifyError};
use crate::finding::Severity;

/// Minimum severity a finding needs to be emitted and counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum ReportFloor {
    /// Everything, including informational notes and warnings.
    #[default]
    All,
    /// Errors and severe errors only.
    ErrorsAndAbove,
    /// Severe errors only.
    SevereOnly,
}

impl ReportFloor {
    /// The lowest severity that passes this floor.
    pub fn min_severity(self) -> Severity {
        match self {
            ReportFloor::All => Severity::Info,
            ReportFloor::ErrorsAndAbove => Severity::Error,
            ReportFloor::SevereOnly => Severity::Severe,
        }
    }

    /// True when a finding of `severity` passes.
    pub fn admits(self, severity: Severity) -> bool {
        severity >= self.min_severity()
    }
}

/// Legacy integer levels: 0 = all, 1 = errors and above, 2 = severe only.
impl TryFrom<i64> for ReportFloor {
    type Error = VerifyError;

    fn try_from(level: i64) -> Result<Self> {
        match level {
            0 => Ok(ReportFloor::All),
            1 => Ok(ReportFloor::ErrorsAndAbove),
            2 => Ok(ReportFloor::SevereOnly),
            other => Err(VerifyError::InvalidOption(format!(
                "error-report-floor must be 0, 1 or 2, got {other}"
            ))),
        }
    }
}

/// Verification settings. Snapshotted at the start of every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Options {
    pub test_data: bool,
    pub test_checksum: bool,
    pub test_fill: bool,
    pub archival_convention: bool,
    pub extended_keyword_convention: bool,
    pub report_floor: ReportFloor,
    pub emit_fix_hints: bool,
    pub emit_explanations: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            test_data: true,
            test_checksum: true,
            test_fill: true,
            archival_convention: true,
            extended_keyword_convention: false,
            report_floor: ReportFloor::All,
            emit_fix_hints: false,
            emit_explanations: false,
        }
    }
}

impl Options {
    pub fn test_data(mut self, on: bool) -> Self {
        self.test_data = on;
        self
    }

    pub fn test_checksum(mut self, on: bool) -> Self {
        self.test_checksum = on;
        self
    }

    pub fn test_fill(mut self, on: bool) -> Self {
        self.test_fill = on;
        self
    }

    pub fn archival_convention(mut self, on: bool) -> Self {
        self.archival_convention = on;
        self
    }

    pub fn extended_keyword_convention(mut self, on: bool) -> Self {
        self.extended_keyword_convention = on;
        self
    }

    pub fn report_floor(mut self, floor: ReportFloor) -> Self {
        self.report_floor = floor;
        self
    }

    pub fn emit_fix_hints(mut self, on: bool) -> Self {
        self.emit_fix_hints = on;
        self
    }

    pub fn emit_explanations(mut self, on: bool) -> Self {
        self.emit_explanations = on;
        self
    }

    /// Read one option.
    pub fn get(&self, option: VerifyOption) -> OptionValue {
        match option {
            VerifyOption::TestData => OptionValue::Bool(self.test_data),
            VerifyOption::TestChecksum => OptionValue::Bool(self.test_checksum),
            VerifyOption::TestFill => OptionValue::Bool(self.test_fill),
            VerifyOption::ArchivalConvention => OptionValue::Bool(self.archival_convention),
            VerifyOption::ExtendedKeywordConvention => {
                OptionValue::Bool(self.extended_keyword_convention)
            }
            VerifyOption::ErrorReportFloor => OptionValue::Floor(self.report_floor),
            VerifyOption::EmitFixHints => OptionValue::Bool(self.emit_fix_hints),
            VerifyOption::EmitExplanations => OptionValue::Bool(self.emit_explanations),
        }
    }

    /// Set one option. A value of the wrong kind is rejected and `self` is
    /// left untouched.
    pub fn set(&mut self, option: VerifyOption, value: OptionValue) -> Result<()> {
        let slot = match (option, value) {
            (VerifyOption::ErrorReportFloor, OptionValue::Floor(floor)) => {
                self.report_floor = floor;
                return Ok(());
            }
            (VerifyOption::ErrorReportFloor, OptionValue::Bool(_)) => {
                return Err(VerifyError::InvalidOption(format!(
                    "{option} takes a report floor, not a boolean"
                )));
            }
            (_, OptionValue::Floor(_)) => {
                return Err(VerifyError::InvalidOption(format!(
                    "{option} takes a boolean, not a report floor"
                )));
            }
            (VerifyOption::TestData, _) => &mut self.test_data,
            (VerifyOption::TestChecksum, _) => &mut self.test_checksum,
            (VerifyOption::TestFill, _) => &mut self.test_fill,
            (VerifyOption::ArchivalConvention, _) => &mut self.archival_convention,
            (VerifyOption::ExtendedKeywordConvention, _) => &mut self.extended_keyword_convention,
            (VerifyOption::EmitFixHints, _) => &mut self.emit_fix_hints,
            (VerifyOption::EmitExplanations, _) => &mut self.emit_explanations,
        };
        if let OptionValue::Bool(on) = value {
            *slot = on;
        }
        Ok(())
    }
}

/// The recognised option names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerifyOption {
    TestData,
    TestChecksum,
    TestFill,
    ArchivalConvention,
    ExtendedKeywordConvention,
    ErrorReportFloor,
    EmitFixHints,
    EmitExplanations,
}

impl VerifyOption {
    pub const ALL: [VerifyOption; 8] = [
        VerifyOption::TestData,
        VerifyOption::TestChecksum,
        VerifyOption::TestFill,
        VerifyOption::ArchivalConvention,
        VerifyOption::ExtendedKeywordConvention,
        VerifyOption::ErrorReportFloor,
        VerifyOption::EmitFixHints,
        VerifyOption::EmitExplanations,
    ];

    /// Kebab-case name.
    pub fn name(self) -> &'static str {
        match self {
            VerifyOption::TestData => "test-data",
            VerifyOption::TestChecksum => "test-checksum",
            VerifyOption::TestFill => "test-fill",
            VerifyOption::ArchivalConvention => "archival-convention",
            VerifyOption::ExtendedKeywordConvention => "extended-keyword-convention",
            VerifyOption::ErrorReportFloor => "error-report-floor",
            VerifyOption::EmitFixHints => "emit-fix-hints",
            VerifyOption::EmitExplanations => "emit-explanations",
        }
    }
}

impl fmt::Display for VerifyOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VerifyOption {
    type Err = VerifyError;

    fn from_str(s: &str) -> Result<Self> {
        VerifyOption::ALL
            .into_iter()
            .find(|o| o.name() == s)
            .ok_or_else(|| VerifyError::InvalidOption(format!("unknown option '{s}'")))
    }
}

/// Value carried by [`Options::set`] and returned by [`Options::get`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionValue {
    Bool(bool),
    Floor(ReportFloor),
}

impl From<bool> for OptionValue {
    fn from(on: bool) -> Self {
        OptionValue::Bool(on)
    }
}

impl From<ReportFloor> for OptionValue {
    fn from(floor: ReportFloor) -> Self {
        OptionValue::Floor(floor)
    }
}
