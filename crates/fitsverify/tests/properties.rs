//! Properties that hold for any input, checked over randomly damaged files.

mod common;

use common::{clean_file, context, verify};
use fitsverify::{Finding, Options, Report, ReportFloor, Severity, Source, ABORT_THRESHOLD};
use proptest::prelude::*;
use proptest::sample::Index;

/// `clean_file()` with some bytes overwritten and an optional cut.
fn damaged(edits: &[(Index, u8)], cut: Option<Index>) -> Vec<u8> {
    let mut bytes = clean_file();
    for (at, byte) in edits {
        let i = at.index(bytes.len());
        bytes[i] = *byte;
    }
    if let Some(cut) = cut {
        let len = cut.index(bytes.len()).max(1);
        bytes.truncate(len);
    }
    bytes
}

fn damage() -> impl Strategy<Value = Vec<u8>> {
    (
        prop::collection::vec((any::<Index>(), any::<u8>()), 0..8),
        prop::option::weighted(0.2, any::<Index>()),
    )
        .prop_map(|(edits, cut)| damaged(&edits, cut))
}

fn shape(findings: &[Finding]) -> Vec<(u16, Severity, usize)> {
    findings
        .iter()
        .map(|f| (f.code, f.severity, f.hdu_index))
        .collect()
}

fn counted(report: &Report) -> (usize, usize) {
    let errors = report
        .findings
        .iter()
        .filter(|f| f.severity.is_error())
        .count();
    let warnings = report
        .findings
        .iter()
        .filter(|f| f.severity == Severity::Warning)
        .count();
    (errors, warnings)
}

proptest! {
    #[test]
    fn tally_matches_findings(bytes in damage()) {
        let report = verify(Options::default(), &bytes);
        prop_assert_eq!(counted(&report), (report.tally.errors, report.tally.warnings));
        prop_assert_eq!(
            report.is_valid(),
            report.findings.iter().all(|f| f.severity == Severity::Info)
        );
        prop_assert!(report.tally.errors <= ABORT_THRESHOLD + 2);
    }

    #[test]
    fn runs_are_deterministic(bytes in damage()) {
        let first = verify(Options::default(), &bytes);
        let second = verify(Options::default(), &bytes);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn floor_filters_without_reordering(bytes in damage()) {
        let all = verify(Options::default(), &bytes);
        let errors_only = verify(
            Options::default().report_floor(ReportFloor::ErrorsAndAbove),
            &bytes,
        );
        let expected: Vec<Finding> = all.at_least(Severity::Error).cloned().collect();
        prop_assert_eq!(&errors_only.findings, &expected);
        prop_assert_eq!(errors_only.tally.errors, all.tally.errors);
        prop_assert_eq!(errors_only.tally.warnings, 0);

        let severe = verify(Options::default().report_floor(ReportFloor::SevereOnly), &bytes);
        prop_assert!(severe.findings.iter().all(|f| f.severity == Severity::Severe));
    }

    #[test]
    fn hints_follow_severity(bytes in damage()) {
        let options = Options::default().emit_fix_hints(true).emit_explanations(true);
        let report = verify(options, &bytes);
        for finding in &report.findings {
            let hinted = finding.severity >= Severity::Warning;
            prop_assert_eq!(finding.fix_hint.is_some(), hinted);
            prop_assert_eq!(finding.explanation.is_some(), hinted);
        }
    }

    #[test]
    fn disabling_a_test_never_adds_findings(bytes in damage()) {
        let full = verify(Options::default(), &bytes);
        for options in [
            Options::default().test_data(false),
            Options::default().test_checksum(false),
            Options::default().test_fill(false),
            Options::default().archival_convention(false),
        ] {
            let reduced = verify(options, &bytes);
            prop_assert!(reduced.tally.errors <= full.tally.errors);
            prop_assert!(reduced.tally.warnings <= full.tally.warnings);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn file_and_memory_agree(bytes in damage()) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("damaged.fits");
        std::fs::write(&path, &bytes).unwrap();

        let from_memory = verify(Options::default(), &bytes);
        let from_file = context(Options::default())
            .verify_collect(&Source::path(&path))
            .unwrap();
        prop_assert_eq!(from_file.tally, from_memory.tally);
        prop_assert_eq!(shape(&from_file.findings), shape(&from_memory.findings));

        let labelled = context(Options::default())
            .verify_collect(&Source::memory(&bytes).with_label("upload-17"))
            .unwrap();
        prop_assert_eq!(labelled.tally, from_memory.tally);
        prop_assert_eq!(shape(&labelled.findings), shape(&from_memory.findings));
    }
}
