//! The verification context: configuration, the finding sink and totals
//! across runs.

use std::sync::Arc;

use fits_access::{AccessError, AccessLayer, AccessSession, Hdu, HduKind, HduReader, Source};
use tracing::{debug, info, warn};

use crate::aggregate::Aggregator;
use crate::catalog::codes::{EXTRA_BYTES, NOT_FITS, SOURCE_ACCESS};
use crate::catalog::Catalog;
use crate::config::{OptionValue, Options, VerifyOption};
use crate::data::{validate_data, DataOutcome};
use crate::error::{Result, VerifyError};
use crate::finding::Finding;
use crate::header::{validate_header, FileState, HeaderOutcome};
use crate::hints::HintBase;
use crate::report::{CumulativeTally, Report, RunTally};

type Sink = Box<dyn FnMut(&Finding) + Send>;

/// A reusable verifier.
///
/// Runs on one context are sequential (`verify` takes `&mut self`). Contexts
/// created with [`Context::new`] share the process-wide [`AccessLayer`] and
/// so run one at a time; give a context its own layer with
/// [`Context::with_access_layer`] to verify concurrently.
///
/// ```
/// use fits_access::writer::HduBuilder;
/// use fitsverify::{Context, Source};
///
/// let bytes = HduBuilder::primary_image(16, &[2, 2])
///     .data(vec![0; 8])
///     .with_checksum()
///     .to_bytes();
/// let mut ctx = Context::new();
/// let tally = ctx.verify(&Source::memory(&bytes)).unwrap();
/// assert!(tally.is_valid());
/// assert_eq!(tally.hdus_processed, 1);
/// ```
pub struct Context {
    options: Options,
    totals: CumulativeTally,
    access: Arc<AccessLayer>,
    sink: Option<Sink>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// A context with default options, using the shared access layer.
    pub fn new() -> Self {
        Self::with_access_layer(AccessLayer::shared())
    }

    /// A context that acquires `access` for each run.
    pub fn with_access_layer(access: Arc<AccessLayer>) -> Self {
        Self {
            options: Options::default(),
            totals: CumulativeTally::default(),
            access,
            sink: None,
        }
    }

    /// Replace all options at once.
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> Options {
        self.options
    }

    pub fn set_options(&mut self, options: Options) {
        self.options = options;
    }

    /// Set one option; on error the configuration is unchanged.
    pub fn set_option(
        &mut self,
        option: VerifyOption,
        value: impl Into<OptionValue>,
    ) -> Result<()> {
        self.options.set(option, value.into())
    }

    pub fn get_option(&self, option: VerifyOption) -> OptionValue {
        self.options.get(option)
    }

    /// Install the consumer called once per emitted finding, in order.
    pub fn register_sink(&mut self, sink: impl FnMut(&Finding) + Send + 'static) {
        self.sink = Some(Box::new(sink));
    }

    pub fn clear_sink(&mut self) {
        self.sink = None;
    }

    /// Error and warning totals over every run on this context.
    pub fn cumulative_totals(&self) -> CumulativeTally {
        self.totals
    }

    /// Verify one source, streaming findings to the registered sink.
    ///
    /// Returns `Err` only when the input is rejected before any checking
    /// starts. Every problem with the file itself, including an unreadable
    /// path, is reported as a finding.
    pub fn verify(&mut self, source: &Source<'_>) -> Result<RunTally> {
        let mut sink = self.sink.take();
        let tally = self.run(source, &mut |finding: &Finding| {
            if let Some(sink) = sink.as_mut() {
                sink(finding);
            }
        });
        self.sink = sink;
        tally
    }

    /// Verify one source and also collect its findings.
    pub fn verify_collect(&mut self, source: &Source<'_>) -> Result<Report> {
        let mut findings = Vec::new();
        let mut sink = self.sink.take();
        let tally = self.run(source, &mut |finding: &Finding| {
            findings.push(finding.clone());
            if let Some(sink) = sink.as_mut() {
                sink(finding);
            }
        });
        self.sink = sink;
        Ok(Report {
            tally: tally?,
            findings,
        })
    }

    fn run(&mut self, source: &Source<'_>, sink: &mut dyn FnMut(&Finding)) -> Result<RunTally> {
        if let Source::Memory { bytes, .. } = source {
            if bytes.is_empty() {
                return Err(VerifyError::UnsupportedInput(format!(
                    "{} is an empty buffer",
                    source.label()
                )));
            }
        }
        let catalog = Catalog::builtin()?;
        let label = source.label();
        let access = Arc::clone(&self.access);
        let mut session = access.session();
        let mut agg = Aggregator::new(self.options, catalog, HintBase::builtin(), sink);
        debug!(source = %label, "verification started");

        match session.load(source) {
            Ok(bytes) => walk(&bytes, &label, &mut session, &mut agg),
            Err(err) => {
                warn!(source = %label, error = %err, "source could not be read");
                let message = source_message(&label, &mut session);
                agg.rule(SOURCE_ACCESS, 0, message);
                agg.abort();
            }
        }

        let tally = agg.finish();
        drop(session);
        self.totals.add(&tally);
        info!(
            source = %label,
            errors = tally.errors,
            warnings = tally.warnings,
            hdus = tally.hdus_processed,
            aborted = tally.aborted,
            "verification finished"
        );
        Ok(tally)
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        debug!(
            errors = self.totals.errors,
            warnings = self.totals.warnings,
            "verification context released"
        );
    }
}

fn source_message(label: &str, session: &mut AccessSession<'_>) -> String {
    let mut message = format!("cannot verify {label}");
    for detail in session.take_messages() {
        message.push_str(": ");
        message.push_str(&detail);
    }
    message
}

fn walk(bytes: &[u8], label: &str, session: &mut AccessSession<'_>, agg: &mut Aggregator<'_>) {
    let mut file = FileState::new();
    let mut last_index = 0;

    for item in HduReader::new(bytes, label) {
        if !agg.is_running() {
            break;
        }
        let hdu = match item {
            Ok(hdu) => hdu,
            Err(AccessError::TrailingBytes { offset, len }) => {
                agg.rule(
                    EXTRA_BYTES,
                    last_index,
                    format!("{len} extra bytes after the last HDU, starting at offset {offset}"),
                );
                break;
            }
            Err(err) => {
                warn!(source = %label, error = %err, "not a readable FITS file");
                let code = if matches!(err, AccessError::NotFits(_)) {
                    NOT_FITS
                } else {
                    SOURCE_ACCESS
                };
                session.push_message(err.to_string());
                let message = source_message(label, session);
                agg.rule(code, 0, message);
                agg.abort();
                break;
            }
        };
        last_index = hdu.index;

        agg.note(hdu.index, summary(&hdu));
        if validate_header(&hdu, &mut file, agg) == HeaderOutcome::Failed {
            agg.abort();
            break;
        }
        if !agg.is_running() {
            break;
        }
        if validate_data(&hdu, bytes, agg) == DataOutcome::Truncated {
            agg.abort();
            break;
        }
        agg.hdu_completed();
    }
}

/// One-line description used for the informational note of each HDU.
fn summary(hdu: &Hdu) -> String {
    let data = &hdu.data;
    match &hdu.kind {
        HduKind::AsciiTable | HduKind::BinaryTable => {
            let columns = hdu.integer("TFIELDS").unwrap_or(0);
            let rows = data.axes.get(1).copied().unwrap_or(0);
            format!("{}, {columns} columns x {rows} rows", hdu.kind)
        }
        kind => {
            let shape = if data.axes.is_empty() {
                "no data".to_string()
            } else {
                data.axes
                    .iter()
                    .map(usize::to_string)
                    .collect::<Vec<_>>()
                    .join(" x ")
            };
            match data.bitpix {
                Some(bitpix) => format!("{kind}, BITPIX = {bitpix}, {shape}"),
                None => format!("{kind}, {shape}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::codes;
    use crate::config::ReportFloor;
    use crate::finding::Severity;
    use fits_access::writer::{quoted, FitsBuilder, HduBuilder};
    use std::sync::Mutex;

    fn isolated() -> Context {
        Context::with_access_layer(Arc::new(AccessLayer::new()))
    }

    // ---- lifecycle ----

    #[test]
    fn empty_buffer_is_rejected() {
        let mut ctx = isolated();
        let err = ctx.verify(&Source::memory(&[])).unwrap_err();
        assert!(matches!(err, VerifyError::UnsupportedInput(_)));
        assert_eq!(ctx.cumulative_totals(), CumulativeTally::default());
    }

    #[test]
    fn missing_file_is_a_severe_finding() {
        let mut ctx = isolated();
        let report = ctx
            .verify_collect(&Source::path("/no/such/dir/file.fits"))
            .unwrap();
        assert!(report.tally.aborted);
        assert_eq!(report.tally.errors, 1);
        assert_eq!(report.tally.hdus_processed, 0);
        let finding = &report.findings[0];
        assert_eq!(finding.code, codes::SOURCE_ACCESS);
        assert_eq!(finding.severity, Severity::Severe);
        assert!(finding.message.contains("/no/such/dir/file.fits"));
    }

    #[test]
    fn not_fits_input() {
        let mut ctx = isolated();
        let report = ctx.verify_collect(&Source::memory(b"hello world")).unwrap();
        assert!(report.tally.aborted);
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].code, codes::NOT_FITS);
    }

    #[test]
    fn extra_bytes_after_last_hdu() {
        let bytes = FitsBuilder::new()
            .hdu(HduBuilder::primary_image(8, &[]).with_checksum())
            .trailing(&[0u8; 10])
            .to_bytes();
        let mut ctx = isolated();
        let report = ctx.verify_collect(&Source::memory(&bytes)).unwrap();
        assert_eq!(report.with_code(codes::EXTRA_BYTES).count(), 1);
        assert_eq!(report.tally.errors, 1);
        assert_eq!(report.tally.hdus_processed, 1);
        assert!(!report.tally.aborted);
    }

    // ---- options ----

    #[test]
    fn set_option_validates_kind() {
        let mut ctx = isolated();
        assert!(ctx.set_option(VerifyOption::TestFill, ReportFloor::All).is_err());
        ctx.set_option(VerifyOption::TestFill, false).unwrap();
        assert_eq!(ctx.get_option(VerifyOption::TestFill), OptionValue::Bool(false));
        assert!(!ctx.options().test_fill);
    }

    // ---- sinks and totals ----

    #[test]
    fn sink_sees_findings_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut ctx = isolated();
        let store = Arc::clone(&seen);
        ctx.register_sink(move |f| store.lock().unwrap().push(f.code));

        let bytes = FitsBuilder::new()
            .hdu(HduBuilder::primary_image(8, &[]).with_checksum())
            .hdu(HduBuilder::image_extension(8, &[]).with_checksum())
            .to_bytes();
        let tally = ctx.verify(&Source::memory(&bytes)).unwrap();
        assert_eq!(tally.warnings, 1);
        assert_eq!(*seen.lock().unwrap(), vec![0, 0, codes::MISSING_EXTNAME]);
    }

    #[test]
    fn cumulative_totals_accumulate() {
        let bytes = HduBuilder::primary_image(8, &[]).to_bytes();
        let mut ctx = isolated();
        ctx.verify(&Source::memory(&bytes)).unwrap();
        ctx.verify(&Source::memory(&bytes)).unwrap();
        assert_eq!(ctx.cumulative_totals(), CumulativeTally { errors: 0, warnings: 2 });
    }

    // ---- notes ----

    #[test]
    fn info_notes_describe_hdus() {
        let bytes = FitsBuilder::new()
            .hdu(HduBuilder::primary_image(16, &[10, 20]).data(vec![0; 400]).with_checksum())
            .hdu(
                HduBuilder::binary_table(12, 10, &[("A", "1J"), ("B", "1J"), ("C", "1J")])
                    .card("EXTNAME", &quoted("EVENTS"))
                    .data(vec![0; 120])
                    .with_checksum(),
            )
            .to_bytes();
        let mut ctx = isolated();
        let report = ctx.verify_collect(&Source::memory(&bytes)).unwrap();
        assert!(report.is_valid(), "{report}");
        let notes: Vec<String> = report.findings.iter().map(ToString::to_string).collect();
        assert_eq!(
            notes,
            vec![
                "HDU 0: primary array, BITPIX = 16, 10 x 20",
                "HDU 1: binary table, 3 columns x 10 rows",
            ]
        );
    }

    // ---- access layer ----

    #[test]
    fn each_run_opens_one_session() {
        let layer = Arc::new(AccessLayer::new());
        let mut ctx = Context::with_access_layer(Arc::clone(&layer));
        let bytes = HduBuilder::primary_image(8, &[]).to_bytes();
        ctx.verify(&Source::memory(&bytes)).unwrap();
        ctx.verify(&Source::path("/no/such/file.fits")).unwrap();
        assert_eq!(layer.sessions_opened(), 2);
        assert!(layer.try_session().is_some());
    }
}
