//! Finding classification, counting and the abort policy.

use tracing::{trace, warn};

use crate::catalog::{codes, Catalog, INFO_CODE};
use crate::config::Options;
use crate::finding::{Finding, Severity};
use crate::hints::HintBase;
use crate::report::RunTally;

/// Error count above which a run is aborted.
pub const ABORT_THRESHOLD: usize = 200;

/// Lifecycle of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Aborted,
    Completed,
}

/// Receives every finding of one run, filters it against the report floor,
/// enriches it with hints, forwards it to the sink and keeps the counts.
pub struct Aggregator<'s> {
    options: Options,
    catalog: &'static Catalog,
    hints: &'static HintBase,
    sink: &'s mut dyn FnMut(&Finding),
    tally: RunTally,
    state: RunState,
    last_hdu: usize,
}

impl<'s> Aggregator<'s> {
    pub fn new(
        options: Options,
        catalog: &'static Catalog,
        hints: &'static HintBase,
        sink: &'s mut dyn FnMut(&Finding),
    ) -> Self {
        Self {
            options,
            catalog,
            hints,
            sink,
            tally: RunTally::default(),
            state: RunState::Running,
            last_hdu: 0,
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn catalog(&self) -> &'static Catalog {
        self.catalog
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    /// Report a violation of rule `code` at its default severity. Dropped
    /// when the rule's category is disabled.
    pub fn rule(&mut self, code: u16, hdu_index: usize, message: impl Into<String>) {
        let enabled = self
            .catalog
            .category(code)
            .map_or(true, |c| c.enabled(&self.options));
        if enabled {
            let finding = self.catalog.finding(code, hdu_index, message);
            self.push(finding);
        }
    }

    /// Emit an informational note (code 0).
    pub fn note(&mut self, hdu_index: usize, message: impl Into<String>) {
        self.push(Finding::new(Severity::Info, INFO_CODE, hdu_index, message));
    }

    /// Process one finding. Ignored once the run has stopped.
    pub fn push(&mut self, finding: Finding) {
        if self.state != RunState::Running {
            return;
        }
        if !self.accept(finding) {
            return;
        }
        if self.tally.errors > ABORT_THRESHOLD {
            warn!(errors = self.tally.errors, "error limit exceeded, aborting run");
            let hdu_index = self.last_hdu;
            let finding = self.catalog.finding(
                codes::TOO_MANY_ERRORS,
                hdu_index,
                format!("more than {ABORT_THRESHOLD} errors; verification stopped"),
            );
            self.accept(finding);
            self.abort();
        }
    }

    /// Filter, enrich, emit and count. Returns false when the floor dropped
    /// the finding.
    fn accept(&mut self, mut finding: Finding) -> bool {
        if !self.options.report_floor.admits(finding.severity) {
            trace!(code = finding.code, severity = %finding.severity, "below report floor");
            return false;
        }
        if finding.severity >= Severity::Warning {
            let (fix, explanation) = self.hints.lookup(finding.code);
            if self.options.emit_fix_hints {
                finding.fix_hint = fix.map(str::to_string);
            }
            if self.options.emit_explanations {
                finding.explanation = explanation.map(str::to_string);
            }
        }
        self.last_hdu = finding.hdu_index;
        trace!(
            code = finding.code,
            hdu = finding.hdu_index,
            severity = %finding.severity,
            "finding"
        );
        (self.sink)(&finding);
        match finding.severity {
            Severity::Error | Severity::Severe => self.tally.errors += 1,
            Severity::Warning => self.tally.warnings += 1,
            Severity::Info => {}
        }
        true
    }

    /// Stop the run; later findings are ignored and no further HDU is read.
    pub fn abort(&mut self) {
        self.state = RunState::Aborted;
        self.tally.aborted = true;
    }

    /// Count an HDU whose checks all ran.
    pub fn hdu_completed(&mut self) {
        if self.state == RunState::Running {
            self.tally.hdus_processed += 1;
        }
    }

    /// End the run and return its tally.
    pub fn finish(mut self) -> RunTally {
        if self.state == RunState::Running {
            self.state = RunState::Completed;
        }
        self.tally
    }
}
