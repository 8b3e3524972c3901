//! FITS compliance verification.
//!
//! A [`Context`] walks every HDU of a file, checks the header against the
//! FITS standard and the archival conventions, checks the data unit
//! (checksums, fill, values) and reports each problem as a [`Finding`]
//! classified by a stable rule code from the built-in [`Catalog`].
//!
//! Findings stream to a registered sink as they are produced; every run
//! returns a [`RunTally`], and [`Context::verify_collect`] additionally
//! returns the findings as a [`Report`].

pub mod aggregate;
pub mod catalog;
pub mod config;
pub mod context;
pub mod data;
pub mod error;
pub mod finding;
pub mod header;
pub mod hints;
pub mod report;

pub use aggregate::ABORT_THRESHOLD;
pub use catalog::{codes, Catalog, Category, RuleDefinition, CATALOG_VERSION};
pub use config::{OptionValue, Options, ReportFloor, VerifyOption};
pub use context::Context;
pub use error::{CatalogError, Result, VerifyError};
pub use finding::{Finding, Severity};
pub use report::{CumulativeTally, HduCounts, Report, RunTally};

pub use fits_access::{AccessLayer, Source};

/// Version of this engine.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
