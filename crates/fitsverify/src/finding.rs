use core::fmt;

/// Importance of a finding. Ordered `Info < Warning < Error < Severe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Severity {
    Info,
    Warning,
    Error,
    Severe,
}

impl Severity {
    /// True for severities counted as errors.
    pub fn is_error(self) -> bool {
        self >= Severity::Error
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Severe => "severe error",
        })
    }
}

/// One diagnostic produced by a verification run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Finding {
    pub severity: Severity,
    /// Stable rule code; 0 for informational notes.
    pub code: u16,
    /// 0-based HDU index (primary = 0).
    pub hdu_index: usize,
    pub message: String,
    pub fix_hint: Option<String>,
    pub explanation: Option<String>,
}

impl Finding {
    pub fn new(
        severity: Severity,
        code: u16,
        hdu_index: usize,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            code,
            hdu_index,
            message: message.into(),
            fix_hint: None,
            explanation: None,
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Info => write!(f, "HDU {}: {}", self.hdu_index, self.message),
            severity => write!(
                f,
                "*** {} {} (HDU {}): {}",
                severity, self.code, self.hdu_index, self.message
            ),
        }
    }
}
