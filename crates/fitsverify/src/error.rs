/// Problems with the built-in rule table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("rule code {code} is used by both {first} and {second}")]
    DuplicateCode {
        code: u16,
        first: &'static str,
        second: &'static str,
    },
    #[error("rule {0} uses the reserved informational code 0")]
    ReservedCode(&'static str),
    #[error("convention rule {0} must default to warning severity")]
    ConventionSeverity(&'static str),
}

/// Errors returned by the [`crate::Context`] façade. Rule violations are
/// never errors; they are reported as findings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    /// Unknown option name or a value of the wrong kind. The configuration
    /// is left unchanged.
    #[error("invalid option: {0}")]
    InvalidOption(String),
    /// The input was rejected before any verification work started.
    #[error("unsupported input: {0}")]
    UnsupportedInput(String),
    /// The built-in rule table failed validation.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, VerifyError>;
