//! The rule catalog: every diagnostic code the engine can emit, its test
//! category and its default severity.
//!
//! Codes are stable across releases and never reused. Ranges:
//! 100-149 file structure, 150-199 mandatory keywords, 200-249 keyword
//! syntax, 250-299 keyword placement, 300-349 table structure, 350-399 data,
//! 480-499 abort, 500-549 warnings. Code 0 marks informational notes and is
//! not part of the catalog.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::config::Options;
use crate::error::CatalogError;
use crate::finding::{Finding, Severity};

/// Revision of the rule table.
pub const CATALOG_VERSION: &str = "1.0";

/// Code carried by informational notes.
pub const INFO_CODE: u16 = 0;

/// Test category a rule belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Category {
    Syntax,
    Mandatory,
    DataIntegrity,
    Checksum,
    Fill,
    Convention,
    HierarchConvention,
}

impl Category {
    /// Whether rules of this category run under `options`. Syntax and
    /// mandatory rules always run.
    pub fn enabled(self, options: &Options) -> bool {
        match self {
            Category::Syntax | Category::Mandatory => true,
            Category::DataIntegrity => options.test_data,
            Category::Checksum => options.test_checksum,
            Category::Fill => options.test_fill,
            Category::Convention => options.archival_convention,
            Category::HierarchConvention => options.extended_keyword_convention,
        }
    }

    /// Precedence when several rules match one card; higher wins.
    pub fn precedence(self) -> u8 {
        match self {
            Category::Mandatory => 3,
            Category::Syntax => 2,
            Category::HierarchConvention => 1,
            _ => 0,
        }
    }
}

/// One catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleDefinition {
    pub code: u16,
    pub name: &'static str,
    pub category: Category,
    pub default_severity: Severity,
}

/// Stable diagnostic codes.
pub mod codes {
    pub const TRUNCATED_FILE: u16 = 101;
    pub const EXTRA_BYTES: u16 = 102;
    pub const UNDETERMINED_DATA_SIZE: u16 = 103;
    pub const SOURCE_ACCESS: u16 = 104;
    pub const NOT_FITS: u16 = 105;

    pub const MISSING_KEYWORD: u16 = 150;
    pub const KEYWORD_ORDER: u16 = 151;
    pub const KEYWORD_DUPLICATE: u16 = 152;
    pub const KEYWORD_VALUE: u16 = 153;
    pub const KEYWORD_TYPE: u16 = 154;
    pub const MISSING_END: u16 = 155;
    pub const NOT_FIXED_FORMAT: u16 = 156;

    pub const NONASCII_HEADER: u16 = 200;
    pub const ILLEGAL_NAME_CHAR: u16 = 201;
    pub const NAME_NOT_JUSTIFIED: u16 = 202;
    pub const NO_COMMENT_SEPARATOR: u16 = 203;
    pub const MISSING_QUOTE: u16 = 204;
    pub const BAD_LOGICAL: u16 = 205;
    pub const BAD_NUMBER: u16 = 206;
    pub const LOWERCASE_EXPONENT: u16 = 207;
    pub const BAD_COMPLEX: u16 = 208;
    pub const UNKNOWN_VALUE_TYPE: u16 = 209;
    pub const BAD_STRING: u16 = 210;
    pub const WRONG_TYPE: u16 = 211;
    pub const LEADING_SPACE: u16 = 212;
    pub const END_NOT_BLANK: u16 = 213;
    pub const UNRECOGNIZED_KEYWORD: u16 = 214;

    pub const XTENSION_IN_PRIMARY: u16 = 250;
    pub const IMAGE_KEY_IN_TABLE: u16 = 251;
    pub const TABLE_KEY_IN_IMAGE: u16 = 252;
    pub const PRIMARY_KEY_IN_EXTENSION: u16 = 253;
    pub const BLANK_IN_FLOAT_IMAGE: u16 = 254;

    pub const BAD_TFIELDS: u16 = 300;
    pub const NAXIS1_MISMATCH: u16 = 301;
    pub const BAD_TFORM: u16 = 302;
    pub const INDEX_EXCEEDS_TFIELDS: u16 = 303;
    pub const TBCOL_OUT_OF_RANGE: u16 = 304;
    pub const WRONG_TABLE_KEYWORD: u16 = 305;

    pub const DATA_FILL: u16 = 350;
    pub const HEADER_FILL: u16 = 351;
    pub const NONFINITE_FLOAT: u16 = 352;
    pub const BLANK_OUT_OF_RANGE: u16 = 353;
    pub const DECLARED_RANGE_EXCEEDS_TYPE: u16 = 354;
    pub const DATA_OUTSIDE_DECLARED_RANGE: u16 = 355;
    pub const BAD_LOGICAL_DATA: u16 = 356;
    pub const NONASCII_DATA: u16 = 357;
    pub const NONASCII_TABLE: u16 = 358;
    pub const DATASUM_MISMATCH: u16 = 360;
    pub const HEADER_MODIFIED: u16 = 361;
    pub const CHECKSUM_MISMATCH: u16 = 362;
    pub const CHECKSUM_MISSING: u16 = 363;
    pub const CHECKSUM_MALFORMED: u16 = 364;
    pub const VAR_EXCEEDS_MAXLEN: u16 = 365;
    pub const VAR_EXCEEDS_HEAP: u16 = 366;
    pub const BIT_NOT_JUSTIFIED: u16 = 367;
    pub const NO_DECIMAL: u16 = 368;
    pub const EMBEDDED_SPACE: u16 = 369;

    pub const TOO_MANY_ERRORS: u16 = 480;

    pub const SIMPLE_FALSE: u16 = 500;
    pub const DEPRECATED_KEYWORD: u16 = 501;
    pub const DUPLICATE_EXTNAME: u16 = 502;
    pub const ZERO_SCALE: u16 = 503;
    pub const LEGACY_XTENSION: u16 = 504;
    pub const RANDOM_GROUPS: u16 = 505;
    pub const DUPLICATE_KEYWORD: u16 = 506;
    pub const Y2K_DATE: u16 = 507;
    pub const DATE_FORMAT: u16 = 508;
    pub const MISSING_LONGSTRN: u16 = 509;
    pub const TIMESYS_VALUE: u16 = 510;
    pub const INHERIT_WITH_PRIMARY_DATA: u16 = 511;
    pub const MISSING_EXTNAME: u16 = 520;
    pub const BAD_COLUMN_NAME: u16 = 521;
    pub const MISSING_COLUMN_NAME: u16 = 522;
    pub const DUPLICATE_COLUMN_NAME: u16 = 523;
    pub const HIERARCH_DUPLICATE: u16 = 530;
    pub const HIERARCH_MALFORMED: u16 = 531;
}

macro_rules! rules {
    ($($code:ident: $category:ident, $severity:ident;)*) => {
        &[$(RuleDefinition {
            code: codes::$code,
            name: stringify!($code),
            category: Category::$category,
            default_severity: Severity::$severity,
        },)*]
    };
}

/// The built-in rule table.
pub static RULES: &[RuleDefinition] = rules! {
    TRUNCATED_FILE: Mandatory, Severe;
    EXTRA_BYTES: Mandatory, Error;
    UNDETERMINED_DATA_SIZE: Mandatory, Severe;
    SOURCE_ACCESS: Mandatory, Severe;
    NOT_FITS: Mandatory, Severe;
    MISSING_KEYWORD: Mandatory, Error;
    KEYWORD_ORDER: Mandatory, Error;
    KEYWORD_DUPLICATE: Mandatory, Error;
    KEYWORD_VALUE: Mandatory, Error;
    KEYWORD_TYPE: Mandatory, Error;
    MISSING_END: Mandatory, Severe;
    NOT_FIXED_FORMAT: Mandatory, Error;
    NONASCII_HEADER: Syntax, Error;
    ILLEGAL_NAME_CHAR: Syntax, Error;
    NAME_NOT_JUSTIFIED: Syntax, Error;
    NO_COMMENT_SEPARATOR: Syntax, Error;
    MISSING_QUOTE: Syntax, Error;
    BAD_LOGICAL: Syntax, Error;
    BAD_NUMBER: Syntax, Error;
    LOWERCASE_EXPONENT: Syntax, Error;
    BAD_COMPLEX: Syntax, Error;
    UNKNOWN_VALUE_TYPE: Syntax, Error;
    BAD_STRING: Syntax, Error;
    WRONG_TYPE: Syntax, Error;
    LEADING_SPACE: Syntax, Error;
    END_NOT_BLANK: Syntax, Error;
    UNRECOGNIZED_KEYWORD: Syntax, Warning;
    XTENSION_IN_PRIMARY: Mandatory, Error;
    IMAGE_KEY_IN_TABLE: Mandatory, Error;
    TABLE_KEY_IN_IMAGE: Mandatory, Error;
    PRIMARY_KEY_IN_EXTENSION: Mandatory, Error;
    BLANK_IN_FLOAT_IMAGE: Mandatory, Error;
    BAD_TFIELDS: Mandatory, Error;
    NAXIS1_MISMATCH: Mandatory, Error;
    BAD_TFORM: Mandatory, Error;
    INDEX_EXCEEDS_TFIELDS: Mandatory, Error;
    TBCOL_OUT_OF_RANGE: Mandatory, Error;
    WRONG_TABLE_KEYWORD: Mandatory, Error;
    DATA_FILL: Fill, Error;
    HEADER_FILL: Fill, Error;
    NONFINITE_FLOAT: DataIntegrity, Warning;
    BLANK_OUT_OF_RANGE: DataIntegrity, Warning;
    DECLARED_RANGE_EXCEEDS_TYPE: DataIntegrity, Warning;
    DATA_OUTSIDE_DECLARED_RANGE: DataIntegrity, Warning;
    BAD_LOGICAL_DATA: DataIntegrity, Warning;
    NONASCII_DATA: DataIntegrity, Warning;
    NONASCII_TABLE: DataIntegrity, Warning;
    DATASUM_MISMATCH: Checksum, Error;
    HEADER_MODIFIED: Checksum, Error;
    CHECKSUM_MISMATCH: Checksum, Error;
    CHECKSUM_MISSING: Checksum, Warning;
    CHECKSUM_MALFORMED: Checksum, Error;
    VAR_EXCEEDS_MAXLEN: DataIntegrity, Error;
    VAR_EXCEEDS_HEAP: DataIntegrity, Error;
    BIT_NOT_JUSTIFIED: DataIntegrity, Warning;
    NO_DECIMAL: DataIntegrity, Warning;
    EMBEDDED_SPACE: DataIntegrity, Warning;
    TOO_MANY_ERRORS: Mandatory, Severe;
    SIMPLE_FALSE: Mandatory, Warning;
    DEPRECATED_KEYWORD: Mandatory, Warning;
    DUPLICATE_EXTNAME: Mandatory, Warning;
    ZERO_SCALE: Mandatory, Warning;
    LEGACY_XTENSION: Mandatory, Warning;
    RANDOM_GROUPS: Mandatory, Warning;
    DUPLICATE_KEYWORD: Syntax, Warning;
    Y2K_DATE: Convention, Warning;
    DATE_FORMAT: Convention, Warning;
    MISSING_LONGSTRN: Convention, Warning;
    TIMESYS_VALUE: Convention, Warning;
    INHERIT_WITH_PRIMARY_DATA: Convention, Warning;
    MISSING_EXTNAME: Convention, Warning;
    BAD_COLUMN_NAME: Convention, Warning;
    MISSING_COLUMN_NAME: Convention, Warning;
    DUPLICATE_COLUMN_NAME: Convention, Warning;
    HIERARCH_DUPLICATE: HierarchConvention, Warning;
    HIERARCH_MALFORMED: HierarchConvention, Warning;
};

/// A validated, indexed rule table.
#[derive(Debug)]
pub struct Catalog {
    rules: BTreeMap<u16, RuleDefinition>,
}

impl Catalog {
    /// Index `rules`, rejecting duplicate codes and the reserved info code.
    pub fn load(rules: &[RuleDefinition]) -> Result<Self, CatalogError> {
        let mut index = BTreeMap::new();
        for rule in rules {
            if rule.code == INFO_CODE {
                return Err(CatalogError::ReservedCode(rule.name));
            }
            if let Some(previous) = index.insert(rule.code, *rule) {
                return Err(CatalogError::DuplicateCode {
                    code: rule.code,
                    first: previous.name,
                    second: rule.name,
                });
            }
            if rule.category == Category::Convention && rule.default_severity != Severity::Warning {
                return Err(CatalogError::ConventionSeverity(rule.name));
            }
        }
        Ok(Self { rules: index })
    }

    /// The built-in catalog, validated on first use.
    pub fn builtin() -> Result<&'static Catalog, CatalogError> {
        static BUILTIN: OnceLock<Result<Catalog, CatalogError>> = OnceLock::new();
        BUILTIN.get_or_init(|| Catalog::load(RULES)).as_ref().map_err(Clone::clone)
    }

    pub fn rule(&self, code: u16) -> Option<&RuleDefinition> {
        self.rules.get(&code)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RuleDefinition> {
        self.rules.values()
    }

    /// A finding for `code` at its default severity.
    pub fn finding(&self, code: u16, hdu_index: usize, message: impl Into<String>) -> Finding {
        let severity = self.rule(code).map_or(Severity::Error, |r| r.default_severity);
        Finding::new(severity, code, hdu_index, message)
    }

    /// Category of `code`, `None` for info notes and unknown codes.
    pub fn category(&self, code: u16) -> Option<Category> {
        self.rule(code).map(|r| r.category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---- builtin table ----

    #[test]
    fn builtin_catalog_is_valid() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.len(), RULES.len());
    }

    #[test]
    fn codes_sit_in_their_ranges() {
        for rule in RULES {
            let ok = match rule.code {
                100..=149 | 150..=199 | 250..=299 | 300..=349 => {
                    rule.category == Category::Mandatory
                }
                200..=249 => rule.category == Category::Syntax,
                350..=399 => matches!(
                    rule.category,
                    Category::Fill | Category::DataIntegrity | Category::Checksum
                ),
                480..=499 => rule.default_severity == Severity::Severe,
                500..=549 => rule.default_severity == Severity::Warning,
                _ => false,
            };
            assert!(ok, "{} ({}) is outside its range", rule.name, rule.code);
        }
    }

    #[test]
    fn finding_uses_default_severity() {
        let catalog = Catalog::builtin().unwrap();
        let f = catalog.finding(codes::DUPLICATE_EXTNAME, 2, "dup");
        assert_eq!(f.severity, Severity::Warning);
        assert_eq!(catalog.category(codes::CHECKSUM_MISSING), Some(Category::Checksum));
        assert_eq!(catalog.category(INFO_CODE), None);
    }

    // ---- load validation ----

    #[test]
    fn duplicate_codes_are_rejected() {
        let rules = [
            RuleDefinition {
                code: 7,
                name: "A",
                category: Category::Syntax,
                default_severity: Severity::Error,
            },
            RuleDefinition {
                code: 7,
                name: "B",
                category: Category::Fill,
                default_severity: Severity::Error,
            },
        ];
        assert_eq!(
            Catalog::load(&rules).unwrap_err(),
            CatalogError::DuplicateCode {
                code: 7,
                first: "A",
                second: "B"
            }
        );
    }

    #[test]
    fn info_code_is_reserved() {
        let rules = [RuleDefinition {
            code: 0,
            name: "ZERO",
            category: Category::Syntax,
            default_severity: Severity::Error,
        }];
        assert!(matches!(Catalog::load(&rules), Err(CatalogError::ReservedCode("ZERO"))));
    }

    #[test]
    fn convention_rules_must_be_warnings() {
        let rules = [RuleDefinition {
            code: 9,
            name: "LOUD",
            category: Category::Convention,
            default_severity: Severity::Error,
        }];
        assert!(matches!(
            Catalog::load(&rules),
            Err(CatalogError::ConventionSeverity("LOUD"))
        ));
    }

    // ---- gating ----

    #[test]
    fn gating_follows_options() {
        let options = Options::default();
        assert!(Category::Syntax.enabled(&options));
        assert!(Category::Checksum.enabled(&options));
        assert!(!Category::HierarchConvention.enabled(&options));
        let options = options.test_fill(false);
        assert!(!Category::Fill.enabled(&options));
    }
}
