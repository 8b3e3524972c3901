//! Header checks: card syntax, mandatory keywords, keyword placement,
//! reserved value types, archival conventions and the HIERARCH convention.
//!
//! Findings anchored to a card are collected first and resolved so each card
//! reports only its most specific problem; header-level findings follow in
//! the order they were detected.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};

use fits_access::column::{parse_ascii_tform, parse_binary_tform};
use fits_access::hdu::bitpix_size;
use fits_access::{Card, CardIssue, Extent, Hdu, HduKind, Value, ValueIssue, BLOCK_SIZE};
use tracing::debug;

use crate::aggregate::Aggregator;
use crate::catalog::codes::*;
use crate::catalog::Catalog;
use crate::config::Options;

/// Whether the data phase may run for this HDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderOutcome {
    /// The header was read; findings may still have been reported.
    Success,
    /// The header is structurally unusable and the data cannot be located.
    Failed,
}

/// State carried from one HDU to the next within a run.
#[derive(Debug, Default)]
pub struct FileState {
    primary_has_data: bool,
    /// First HDU seen for each (kind, EXTNAME, EXTVER).
    extnames: HashMap<(HduKind, String, i64), usize>,
}

impl FileState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Keywords that may occur only once and describe the file's structure.
const STRUCTURAL_KEYWORDS: &[&str] = &[
    "SIMPLE", "XTENSION", "BITPIX", "NAXIS", "PCOUNT", "GCOUNT", "TFIELDS", "EXTEND", "GROUPS",
    "EXTNAME", "EXTVER", "THEAP",
];

const STRUCTURAL_ROOTS: &[&str] = &["NAXIS", "TFORM", "TBCOL", "TTYPE"];

/// Column keyword roots, used for index and placement checks.
const COLUMN_ROOTS: &[&str] = &[
    "TTYPE", "TFORM", "TBCOL", "TUNIT", "TSCAL", "TZERO", "TNULL", "TDISP", "TDIM", "TLMIN",
    "TLMAX", "TDMIN", "TDMAX",
];

/// Image scaling keywords not allowed in tables.
const IMAGE_KEYWORDS: &[&str] = &["BSCALE", "BZERO", "BUNIT", "BLANK", "DATAMIN", "DATAMAX"];

const PRIMARY_ONLY: &[&str] = &["SIMPLE", "EXTEND", "GROUPS", "BLOCKED"];

const DEPRECATED: &[&str] = &["BLOCKED", "EPOCH"];

const LEGACY_EXTENSIONS: &[&str] = &["A3DTABLE", "IUEIMAGE", "FOREIGN", "DUMP"];

const DATE_KEYWORDS: &[&str] = &["DATE", "DATE-OBS", "DATE-BEG", "DATE-END", "DATE-AVG"];

const TIME_SCALES: &[&str] = &[
    "UTC", "TAI", "TDB", "TT", "ET", "UT1", "UT", "TCG", "TCB", "TDT", "IAT", "GPS", "LOCAL",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    String,
    Integer,
    Number,
    Logical,
}

impl ValueKind {
    fn admits(self, value: &Value) -> bool {
        match self {
            ValueKind::String => matches!(value, Value::String(_)),
            ValueKind::Integer => matches!(value, Value::Integer(_)),
            ValueKind::Number => matches!(value, Value::Integer(_) | Value::Float(_)),
            ValueKind::Logical => matches!(value, Value::Logical(_)),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            ValueKind::String => "a string",
            ValueKind::Integer => "an integer",
            ValueKind::Number => "a number",
            ValueKind::Logical => "a logical",
        }
    }
}

/// Expected type of a reserved keyword whose value is not checked as
/// mandatory structure.
fn reserved_kind(card: &Card, hdu_kind: &HduKind) -> Option<ValueKind> {
    let name = card.name.as_str();
    let kind = match name {
        "EXTNAME" | "BUNIT" | "DATE" | "DATE-OBS" | "DATE-BEG" | "DATE-END" | "DATE-AVG"
        | "TELESCOP" | "INSTRUME" | "OBSERVER" | "OBJECT" | "ORIGIN" | "AUTHOR" | "REFERENC"
        | "CHECKSUM" | "DATASUM" | "TIMESYS" | "LONGSTRN" => ValueKind::String,
        "EXTVER" | "EXTLEVEL" | "BLANK" | "THEAP" => ValueKind::Integer,
        "BSCALE" | "BZERO" | "DATAMIN" | "DATAMAX" | "EQUINOX" | "EPOCH" => ValueKind::Number,
        "EXTEND" | "GROUPS" | "INHERIT" | "BLOCKED" => ValueKind::Logical,
        _ => {
            if ["TTYPE", "TUNIT", "TDISP", "TDIM", "CTYPE", "CUNIT"]
                .iter()
                .any(|root| card.index_of(root).is_some())
            {
                ValueKind::String
            } else if ["TSCAL", "TZERO", "CRPIX", "CRVAL", "CDELT"]
                .iter()
                .any(|root| card.index_of(root).is_some())
            {
                ValueKind::Number
            } else if *hdu_kind == HduKind::BinaryTable && card.index_of("TNULL").is_some() {
                ValueKind::Integer
            } else {
                return None;
            }
        }
    };
    Some(kind)
}

fn is_structural(card: &Card) -> bool {
    STRUCTURAL_KEYWORDS.contains(&card.name.as_str())
        || STRUCTURAL_ROOTS.iter().any(|root| card.index_of(root).is_some())
}

fn is_column_keyword(card: &Card) -> bool {
    COLUMN_ROOTS.iter().any(|root| card.index_of(root).is_some())
}

fn value_description(card: &Card) -> &'static str {
    card.value.as_ref().map_or("no value", Value::type_name)
}

fn syntax_code(issue: &CardIssue) -> u16 {
    match issue {
        CardIssue::NonAscii { .. } => NONASCII_HEADER,
        CardIssue::IllegalNameChar { .. } => ILLEGAL_NAME_CHAR,
        CardIssue::NameNotJustified => NAME_NOT_JUSTIFIED,
        CardIssue::EndNotBlank => END_NOT_BLANK,
        CardIssue::Value(issue) => match issue {
            ValueIssue::MissingQuote => MISSING_QUOTE,
            ValueIssue::BadLogical => BAD_LOGICAL,
            ValueIssue::BadNumber => BAD_NUMBER,
            ValueIssue::LowercaseExponent => LOWERCASE_EXPONENT,
            ValueIssue::BadComplex => BAD_COMPLEX,
            ValueIssue::UnknownType => UNKNOWN_VALUE_TYPE,
            ValueIssue::NoCommentSeparator => NO_COMMENT_SEPARATOR,
            ValueIssue::NonPrintableString => BAD_STRING,
        },
    }
}

fn syntax_message(card: &Card, issue: &CardIssue) -> String {
    match issue {
        CardIssue::NonAscii { column, byte } => format!(
            "card {}: byte 0x{byte:02X} in column {column} is not printable ASCII",
            card.position
        ),
        CardIssue::IllegalNameChar { column, byte } => format!(
            "card {}: keyword contains illegal character {:?} in column {column}",
            card.position,
            char::from(*byte)
        ),
        CardIssue::NameNotJustified => format!(
            "card {}: keyword {} does not start in column 1",
            card.position, card.name
        ),
        CardIssue::EndNotBlank => {
            format!("card {}: END card is not blank after column 8", card.position)
        }
        CardIssue::Value(issue) => format!("card {} ({}): {issue}", card.position, card.name),
    }
}

struct CardHit {
    precedence: u8,
    code: u16,
    message: String,
}

/// Findings for one header, before resolution.
struct HeaderPass<'a> {
    hdu: &'a Hdu,
    options: Options,
    catalog: &'static Catalog,
    cards: BTreeMap<usize, CardHit>,
    header: Vec<(u16, String)>,
}

impl<'a> HeaderPass<'a> {
    fn new(hdu: &'a Hdu, options: Options, catalog: &'static Catalog) -> Self {
        Self {
            hdu,
            options,
            catalog,
            cards: BTreeMap::new(),
            header: Vec::new(),
        }
    }

    /// Record a finding against `card`. A card keeps the finding from the
    /// highest-precedence enabled category; ties keep the first.
    fn card(&mut self, card: &Card, code: u16, message: String) {
        let Some(category) = self.catalog.category(code) else {
            return;
        };
        if !category.enabled(&self.options) {
            return;
        }
        let hit = CardHit {
            precedence: category.precedence(),
            code,
            message,
        };
        match self.cards.entry(card.position) {
            Entry::Vacant(slot) => {
                slot.insert(hit);
            }
            Entry::Occupied(mut slot) => {
                if hit.precedence > slot.get().precedence {
                    slot.insert(hit);
                }
            }
        }
    }

    fn header(&mut self, code: u16, message: String) {
        self.header.push((code, message));
    }

    fn flush(self, agg: &mut Aggregator<'_>) {
        let index = self.hdu.index;
        for hit in self.cards.into_values() {
            agg.rule(hit.code, index, hit.message);
        }
        for (code, message) in self.header {
            agg.rule(code, index, message);
        }
    }

    /// Non-commentary, non-HIERARCH cards other than `END`.
    fn value_cards(&self) -> impl Iterator<Item = &'a Card> {
        let hdu = self.hdu;
        hdu.cards
            .iter()
            .filter(|c| !c.is_end() && !c.is_commentary() && !c.hierarch)
    }

    // ---- syntax ----

    fn syntax(&mut self) {
        for card in &self.hdu.cards {
            if let Some(issue) = card.issues.first() {
                self.card(card, syntax_code(issue), syntax_message(card, issue));
            }
        }
    }

    fn duplicates(&mut self) {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for card in self.value_cards() {
            match seen.get(card.name.as_str()) {
                Some(&first) => {
                    let code = if is_structural(card) {
                        KEYWORD_DUPLICATE
                    } else {
                        DUPLICATE_KEYWORD
                    };
                    let message = format!(
                        "card {}: keyword {} repeats card {first}",
                        card.position, card.name
                    );
                    self.card(card, code, message);
                }
                None => {
                    seen.insert(&card.name, card.position);
                }
            }
        }
    }

    // ---- mandatory keywords ----

    /// Find mandatory `keyword`, expected as card `*next`.
    fn locate(&mut self, next: &mut usize, keyword: &str) -> Option<&'a Card> {
        match self.hdu.card(keyword) {
            Some(card) => {
                if card.position != *next {
                    let message = format!(
                        "{keyword} is card {}; it must be card {}",
                        card.position, *next
                    );
                    self.card(card, KEYWORD_ORDER, message);
                }
                *next += 1;
                Some(card)
            }
            None => {
                self.header(MISSING_KEYWORD, format!("mandatory keyword {keyword} is missing"));
                None
            }
        }
    }

    /// Require the value to end in column 30.
    fn fixed_format(&mut self, card: &Card) {
        if card.value_span.map(|(_, end)| end) != Some(30) {
            let message = format!(
                "card {} ({}): value is not right-justified to column 30",
                card.position, card.name
            );
            self.card(card, NOT_FIXED_FORMAT, message);
        }
    }

    fn mandatory_integer(&mut self, card: &Card) -> Option<i64> {
        match card.integer() {
            Some(v) => {
                self.fixed_format(card);
                Some(v)
            }
            None => {
                let message = format!(
                    "card {} ({}): value must be an integer, found {}",
                    card.position,
                    card.name,
                    value_description(card)
                );
                self.card(card, KEYWORD_TYPE, message);
                None
            }
        }
    }

    fn out_of_domain(&mut self, card: &Card, value: i64, allowed: &str) {
        let message = format!("{} = {value} is not legal; {allowed}", card.name);
        self.card(card, KEYWORD_VALUE, message);
    }

    fn bitpix(&mut self, card: &Card) -> Option<i64> {
        let bitpix = self.mandatory_integer(card)?;
        if bitpix_size(bitpix).is_none() {
            self.out_of_domain(card, bitpix, "expected 8, 16, 32, 64, -32 or -64");
            return None;
        }
        if self.hdu.kind.is_table() && bitpix != 8 {
            self.out_of_domain(card, bitpix, "tables require BITPIX = 8");
        }
        Some(bitpix)
    }

    fn naxis(&mut self, card: &Card) -> Option<usize> {
        let naxis = self.mandatory_integer(card)?;
        if !(0..=999).contains(&naxis) {
            self.out_of_domain(card, naxis, "expected 0 to 999");
            return None;
        }
        if self.hdu.kind.is_table() && naxis != 2 {
            self.out_of_domain(card, naxis, "tables require NAXIS = 2");
        }
        usize::try_from(naxis).ok()
    }

    fn axes(&mut self, next: &mut usize, naxis: usize) {
        for i in 1..=naxis {
            let Some(card) = self.locate(next, &format!("NAXIS{i}")) else {
                continue;
            };
            if let Some(n) = self.mandatory_integer(card) {
                if n < 0 {
                    self.out_of_domain(card, n, "axis lengths cannot be negative");
                }
            }
        }
    }

    fn simple(&mut self, card: &Card) {
        match card.logical() {
            Some(simple) => {
                self.fixed_format(card);
                if !simple {
                    let message = "SIMPLE = F: the file does not claim to conform".to_string();
                    self.card(card, SIMPLE_FALSE, message);
                }
            }
            None => {
                let message = format!(
                    "card {} (SIMPLE): value must be a logical, found {}",
                    card.position,
                    value_description(card)
                );
                self.card(card, KEYWORD_TYPE, message);
            }
        }
    }

    fn xtension(&mut self, card: &Card) {
        let Some(value) = card.string() else {
            let message = format!(
                "card {} (XTENSION): value must be a string, found {}",
                card.position,
                value_description(card)
            );
            self.card(card, KEYWORD_TYPE, message);
            return;
        };
        if card.value_span.map(|(start, _)| start) != Some(10) {
            let message = format!(
                "card {} (XTENSION): string value must start in column 11",
                card.position
            );
            self.card(card, NOT_FIXED_FORMAT, message);
        }
        let name = value.trim();
        if value.starts_with(' ') {
            let message = format!("XTENSION = '{value}' has leading spaces");
            self.card(card, LEADING_SPACE, message);
        } else if LEGACY_EXTENSIONS.contains(&name) {
            let message = format!("XTENSION = '{name}' is a legacy extension type");
            self.card(card, LEGACY_XTENSION, message);
        } else if !matches!(name, "IMAGE" | "TABLE" | "BINTABLE") {
            let message = format!("XTENSION = '{name}' is not a recognised extension type");
            self.card(card, KEYWORD_VALUE, message);
        }
    }

    fn mandatory(&mut self) {
        let kind = &self.hdu.kind;
        let mut next = 1;

        if kind.is_primary() {
            if let Some(card) = self.locate(&mut next, "SIMPLE") {
                self.simple(card);
            }
        } else if let Some(card) = self.locate(&mut next, "XTENSION") {
            self.xtension(card);
        }

        if let Some(card) = self.locate(&mut next, "BITPIX") {
            self.bitpix(card);
        }
        let naxis = match self.locate(&mut next, "NAXIS") {
            Some(card) => self.naxis(card),
            None => None,
        };
        self.axes(&mut next, naxis.unwrap_or(0));

        if *kind == HduKind::RandomGroups {
            self.header(
                RANDOM_GROUPS,
                "the primary HDU uses the deprecated random-groups structure".to_string(),
            );
            for keyword in ["PCOUNT", "GCOUNT"] {
                match self.hdu.card(keyword) {
                    Some(card) => {
                        self.mandatory_integer(card);
                    }
                    None => self.header(
                        MISSING_KEYWORD,
                        format!("mandatory keyword {keyword} is missing"),
                    ),
                }
            }
            return;
        }
        if kind.is_primary() {
            return;
        }

        if let Some(card) = self.locate(&mut next, "PCOUNT") {
            if let Some(pcount) = self.mandatory_integer(card) {
                if pcount < 0 {
                    self.out_of_domain(card, pcount, "expected 0 or more");
                } else if pcount != 0 && matches!(kind, HduKind::Image | HduKind::AsciiTable) {
                    self.out_of_domain(card, pcount, "this extension type requires PCOUNT = 0");
                }
            }
        }
        if let Some(card) = self.locate(&mut next, "GCOUNT") {
            if let Some(gcount) = self.mandatory_integer(card) {
                if gcount != 1 && (kind.is_table() || *kind == HduKind::Image) {
                    self.out_of_domain(card, gcount, "this extension type requires GCOUNT = 1");
                }
            }
        }
        if kind.is_table() {
            let tfields = match self.locate(&mut next, "TFIELDS") {
                Some(card) => self.tfields(card),
                None => None,
            };
            if let Some(tfields) = tfields {
                self.columns(tfields);
            }
        }
    }

    // ---- tables ----

    fn tfields(&mut self, card: &Card) -> Option<usize> {
        let tfields = self.mandatory_integer(card)?;
        if !(0..=999).contains(&tfields) {
            let message = format!("TFIELDS = {tfields} is not legal; expected 0 to 999");
            self.card(card, BAD_TFIELDS, message);
            return None;
        }
        usize::try_from(tfields).ok()
    }

    fn columns(&mut self, tfields: usize) {
        let naxis1 = self.hdu.integer("NAXIS1");
        let ascii = self.hdu.kind == HduKind::AsciiTable;
        let mut row_width = Some(0usize);

        for n in 1..=tfields {
            let keyword = format!("TFORM{n}");
            let Some(card) = self.hdu.card(&keyword) else {
                self.header(MISSING_KEYWORD, format!("mandatory keyword {keyword} is missing"));
                row_width = None;
                continue;
            };
            let Some(tform) = card.string() else {
                let message = format!(
                    "card {} ({keyword}): value must be a string, found {}",
                    card.position,
                    value_description(card)
                );
                self.card(card, KEYWORD_TYPE, message);
                row_width = None;
                continue;
            };
            let width = if ascii {
                parse_ascii_tform(tform).map(|f| f.width())
            } else {
                parse_binary_tform(tform).map(|f| f.width())
            };
            match width {
                Ok(width) => {
                    row_width = row_width.map(|w| w.saturating_add(width));
                    if ascii {
                        self.tbcol(n, width, naxis1);
                    }
                }
                Err(err) => {
                    let message = format!("card {} ({keyword}): {err}", card.position);
                    self.card(card, BAD_TFORM, message);
                    row_width = None;
                }
            }
        }

        if !ascii {
            if let (Some(sum), Some(naxis1)) = (row_width, naxis1) {
                if i64::try_from(sum).ok() != Some(naxis1) {
                    self.header(
                        NAXIS1_MISMATCH,
                        format!("column widths sum to {sum} bytes but NAXIS1 = {naxis1}"),
                    );
                }
            }
        }

        let beyond: Vec<&Card> = self
            .value_cards()
            .filter(|c| {
                COLUMN_ROOTS
                    .iter()
                    .any(|root| c.index_of(root).is_some_and(|i| i > tfields))
            })
            .collect();
        for card in beyond {
            let message = format!(
                "card {} ({}): column index exceeds TFIELDS = {tfields}",
                card.position, card.name
            );
            self.card(card, INDEX_EXCEEDS_TFIELDS, message);
        }
    }

    fn tbcol(&mut self, n: usize, width: usize, naxis1: Option<i64>) {
        let keyword = format!("TBCOL{n}");
        let Some(card) = self.hdu.card(&keyword) else {
            self.header(MISSING_KEYWORD, format!("mandatory keyword {keyword} is missing"));
            return;
        };
        let Some(tbcol) = card.integer() else {
            let message = format!(
                "card {} ({keyword}): value must be an integer, found {}",
                card.position,
                value_description(card)
            );
            self.card(card, KEYWORD_TYPE, message);
            return;
        };
        let last = tbcol.saturating_add(i64::try_from(width).unwrap_or(i64::MAX)).saturating_sub(1);
        if tbcol < 1 || naxis1.is_some_and(|naxis1| last > naxis1) {
            let message = match naxis1 {
                Some(naxis1) => format!(
                    "{keyword} = {tbcol} with width {width} does not fit in NAXIS1 = {naxis1}"
                ),
                None => format!("{keyword} = {tbcol} is out of range"),
            };
            self.card(card, TBCOL_OUT_OF_RANGE, message);
        }
    }

    // ---- placement and reserved values ----

    fn placement(&mut self) {
        let kind = &self.hdu.kind;
        let floating = self.hdu.integer("BITPIX").is_some_and(|b| b < 0);
        let imagelike = matches!(
            kind,
            HduKind::Primary | HduKind::Image | HduKind::RandomGroups
        );

        for card in self.value_cards() {
            let name = card.name.as_str();
            let ascii = *kind == HduKind::AsciiTable;
            let binary = *kind == HduKind::BinaryTable;
            let rules = [
                (
                    kind.is_primary() && name == "XTENSION",
                    XTENSION_IN_PRIMARY,
                    "is not allowed in the primary header",
                ),
                (
                    !kind.is_primary() && PRIMARY_ONLY.contains(&name),
                    PRIMARY_KEY_IN_EXTENSION,
                    "is only allowed in the primary header",
                ),
                (
                    kind.is_table() && IMAGE_KEYWORDS.contains(&name),
                    IMAGE_KEY_IN_TABLE,
                    "is not allowed in a table",
                ),
                (
                    imagelike
                        && (name == "TFIELDS" || name == "THEAP" || is_column_keyword(card)),
                    TABLE_KEY_IN_IMAGE,
                    "is only allowed in a table",
                ),
                (
                    ascii && (name == "THEAP" || card.index_of("TDIM").is_some()),
                    WRONG_TABLE_KEYWORD,
                    "is not allowed in an ASCII table",
                ),
                (
                    binary && card.index_of("TBCOL").is_some(),
                    WRONG_TABLE_KEYWORD,
                    "is not allowed in a binary table",
                ),
                (
                    imagelike && floating && name == "BLANK",
                    BLANK_IN_FLOAT_IMAGE,
                    "is not allowed when BITPIX is negative",
                ),
            ];
            for (misplaced, code, what) in rules {
                if misplaced {
                    self.card(card, code, format!("card {}: {name} {what}", card.position));
                }
            }
        }
    }

    fn reserved(&mut self) {
        for card in self.value_cards() {
            let name = card.name.as_str();
            if DEPRECATED.contains(&name) {
                let message = format!("card {}: keyword {name} is deprecated", card.position);
                self.card(card, DEPRECATED_KEYWORD, message);
            }
            let Some(value) = &card.value else {
                continue;
            };
            if let Some(expected) = reserved_kind(card, &self.hdu.kind) {
                if !expected.admits(value) {
                    let message = format!(
                        "card {} ({name}): value must be {}, found {}",
                        card.position,
                        expected.describe(),
                        value.type_name()
                    );
                    self.card(card, WRONG_TYPE, message);
                }
            }
            if name == "BSCALE" && card.number() == Some(0.0) {
                let message = format!("card {}: BSCALE is zero", card.position);
                self.card(card, ZERO_SCALE, message);
            }
        }
    }

    // ---- conventions ----

    fn conventions(&mut self, file: &FileState) {
        let kind = &self.hdu.kind;
        if !kind.is_primary() && self.hdu.card("EXTNAME").is_none() {
            self.header(MISSING_EXTNAME, "extension has no EXTNAME keyword".to_string());
        }

        for card in self.value_cards() {
            let name = card.name.as_str();
            let Some(text) = card.string() else {
                continue;
            };
            if DATE_KEYWORDS.contains(&name) {
                if is_two_digit_year_date(text) {
                    let message = format!("{name} = '{text}' uses the obsolete DD/MM/YY form");
                    self.card(card, Y2K_DATE, message);
                } else if !is_iso_date(text) {
                    let message = format!("{name} = '{text}' is not in YYYY-MM-DD[Thh:mm:ss] form");
                    self.card(card, DATE_FORMAT, message);
                }
            }
            if name == "TIMESYS" && !TIME_SCALES.contains(&text.trim()) {
                let message = format!("TIMESYS = '{text}' is not a recognised time scale");
                self.card(card, TIMESYS_VALUE, message);
            }
        }

        let uses_continue = self.hdu.cards.iter().any(Card::is_continue);
        if uses_continue && self.hdu.card("LONGSTRN").is_none() {
            self.header(
                MISSING_LONGSTRN,
                "CONTINUE cards are used but LONGSTRN is not declared".to_string(),
            );
        }

        if !kind.is_primary() && file.primary_has_data {
            if let Some(card) = self.hdu.card("INHERIT") {
                if card.logical() == Some(true) {
                    let message = format!(
                        "card {}: INHERIT = T but the primary HDU has data",
                        card.position
                    );
                    self.card(card, INHERIT_WITH_PRIMARY_DATA, message);
                }
            }
        }

        if kind.is_table() {
            self.column_names();
        }
    }

    fn column_names(&mut self) {
        let Some(tfields) = self
            .hdu
            .integer("TFIELDS")
            .and_then(|n| usize::try_from(n).ok())
            .filter(|&n| n <= 999)
        else {
            return;
        };
        let mut seen: HashMap<String, usize> = HashMap::new();
        for n in 1..=tfields {
            let keyword = format!("TTYPE{n}");
            let Some(card) = self.hdu.card(&keyword) else {
                self.header(MISSING_COLUMN_NAME, format!("column {n} has no {keyword} name"));
                continue;
            };
            let Some(name) = card.string() else {
                continue;
            };
            let name = name.trim_end();
            if name.is_empty() || !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
                let message = format!(
                    "{keyword} = '{name}' contains characters other than letters, digits and '_'"
                );
                self.card(card, BAD_COLUMN_NAME, message);
            }
            match seen.get(&name.to_ascii_uppercase()) {
                Some(&first) => {
                    let message =
                        format!("{keyword} = '{name}' duplicates the name of column {first}");
                    self.card(card, DUPLICATE_COLUMN_NAME, message);
                }
                None => {
                    seen.insert(name.to_ascii_uppercase(), n);
                }
            }
        }
    }

    // ---- HIERARCH ----

    fn hierarch(&mut self) {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        let cards: Vec<&'a Card> = self.hdu.cards.iter().filter(|c| c.hierarch).collect();
        for card in cards {
            if !self.options.extended_keyword_convention {
                let message = format!(
                    "card {} uses the HIERARCH convention, which is not being checked",
                    card.position
                );
                self.card(card, UNRECOGNIZED_KEYWORD, message);
                continue;
            }
            if !card.value_indicator {
                let message = format!("card {}: HIERARCH card has no '='", card.position);
                self.card(card, HIERARCH_MALFORMED, message);
                continue;
            }
            match seen.get(card.name.as_str()) {
                Some(&first) => {
                    let message = format!(
                        "card {}: HIERARCH keyword {} repeats card {first}",
                        card.position, card.name
                    );
                    self.card(card, HIERARCH_DUPLICATE, message);
                }
                None => {
                    seen.insert(&card.name, card.position);
                }
            }
        }
    }

    // ---- file-level ----

    fn extname(&mut self, file: &mut FileState) {
        let Some(name) = self.hdu.string("EXTNAME") else {
            return;
        };
        let key = (
            self.hdu.kind.clone(),
            name.trim().to_string(),
            self.hdu.integer("EXTVER").unwrap_or(1),
        );
        let index = self.hdu.index;
        match file.extnames.get(&key) {
            Some(&first) => {
                let (kind, name, version) = key;
                self.header(
                    DUPLICATE_EXTNAME,
                    format!(
                        "{kind} EXTNAME = '{name}' with EXTVER = {version} appears in both \
                         HDU {first} and HDU {index}"
                    ),
                );
            }
            None => {
                file.extnames.insert(key, index);
            }
        }
    }
}

/// Check one header and report its findings. Returns [`HeaderOutcome::Failed`]
/// when the header is incomplete or does not determine the data size.
pub fn validate_header(hdu: &Hdu, file: &mut FileState, agg: &mut Aggregator<'_>) -> HeaderOutcome {
    debug!(hdu = hdu.index, kind = %hdu.kind, cards = hdu.cards.len(), "checking header");
    let mut pass = HeaderPass::new(hdu, *agg.options(), agg.catalog());

    if let Extent::HeaderIncomplete { available } = hdu.extent {
        pass.syntax();
        pass.flush(agg);
        if available > 0 && available % BLOCK_SIZE == 0 && hdu.end_card().is_none() {
            agg.rule(
                MISSING_END,
                hdu.index,
                format!("no END card in the {} header block(s)", available / BLOCK_SIZE),
            );
        } else {
            agg.rule(
                TRUNCATED_FILE,
                hdu.index,
                format!("file ends {available} bytes into the header"),
            );
        }
        return HeaderOutcome::Failed;
    }

    pass.syntax();
    pass.duplicates();
    pass.mandatory();
    pass.placement();
    pass.reserved();
    pass.hierarch();
    if pass.options.archival_convention {
        pass.conventions(file);
    }
    pass.extname(file);
    if hdu.index == 0 {
        file.primary_has_data = hdu.data.byte_len.is_some_and(|n| n > 0);
    }
    pass.flush(agg);

    if hdu.extent == Extent::Undetermined {
        agg.rule(
            UNDETERMINED_DATA_SIZE,
            hdu.index,
            "the header does not determine the size of the data unit".to_string(),
        );
        return HeaderOutcome::Failed;
    }
    HeaderOutcome::Success
}

/// `DD/MM/YY`.
fn is_two_digit_year_date(text: &str) -> bool {
    let b = text.trim_end().as_bytes();
    b.len() == 8
        && b[2] == b'/'
        && b[5] == b'/'
        && [0, 1, 3, 4, 6, 7].iter().all(|&i| b[i].is_ascii_digit())
}

fn digits(b: &[u8], range: core::ops::Range<usize>) -> Option<u32> {
    let part = b.get(range)?;
    if !part.iter().all(u8::is_ascii_digit) {
        return None;
    }
    core::str::from_utf8(part).ok()?.parse().ok()
}

/// `YYYY-MM-DD` optionally followed by `Thh:mm:ss[.s...]`.
fn is_iso_date(text: &str) -> bool {
    let text = text.trim_end();
    let (date, time) = match text.split_once('T') {
        Some((date, time)) => (date.as_bytes(), Some(time.as_bytes())),
        None => (text.as_bytes(), None),
    };
    let date_ok = date.len() == 10
        && date[4] == b'-'
        && date[7] == b'-'
        && digits(date, 0..4).is_some()
        && digits(date, 5..7).is_some_and(|m| (1..=12).contains(&m))
        && digits(date, 8..10).is_some_and(|d| (1..=31).contains(&d));
    if !date_ok {
        return false;
    }
    let Some(time) = time else {
        return true;
    };
    let clock_ok = time.len() >= 8
        && time[2] == b':'
        && time[5] == b':'
        && digits(time, 0..2).is_some_and(|h| h <= 23)
        && digits(time, 3..5).is_some_and(|m| m <= 59)
        && digits(time, 6..8).is_some_and(|s| s <= 60);
    clock_ok
        && match &time[8..] {
            [] => true,
            [b'.', fraction @ ..] => {
                !fraction.is_empty() && fraction.iter().all(u8::is_ascii_digit)
            }
            _ => false,
        }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::{Finding, Severity};
    use crate::hints::HintBase;
    use fits_access::writer::{quoted, FitsBuilder, HduBuilder};
    use fits_access::HduReader;

    fn check_with(bytes: &[u8], options: Options) -> Vec<Finding> {
        let mut seen = Vec::new();
        let mut sink = |f: &Finding| seen.push(f.clone());
        let catalog = Catalog::builtin().unwrap();
        let mut agg = Aggregator::new(options, catalog, HintBase::builtin(), &mut sink);
        let mut file = FileState::new();
        for hdu in HduReader::new(bytes, "t").flatten() {
            validate_header(&hdu, &mut file, &mut agg);
        }
        agg.finish();
        seen
    }

    fn check(bytes: &[u8]) -> Vec<Finding> {
        check_with(bytes, Options::default())
    }

    fn codes(findings: &[Finding]) -> Vec<u16> {
        findings.iter().map(|f| f.code).collect()
    }

    // ---- clean headers ----

    #[test]
    fn minimal_primary_is_clean() {
        let bytes = HduBuilder::primary_image(16, &[4, 4]).data(vec![0; 32]).to_bytes();
        assert!(check(&bytes).is_empty());
    }

    #[test]
    fn named_extensions_are_clean() {
        let bytes = FitsBuilder::new()
            .hdu(HduBuilder::primary_image(8, &[]))
            .hdu(
                HduBuilder::image_extension(-32, &[2])
                    .card("EXTNAME", &quoted("SCI"))
                    .data(vec![0; 8]),
            )
            .hdu(
                HduBuilder::binary_table(10, 1, &[("TIME", "1D"), ("FLAG", "2A")])
                    .card("EXTNAME", &quoted("EVENTS"))
                    .data(vec![0; 10]),
            )
            .hdu(
                HduBuilder::ascii_table(8, 1, &[("NAME", "A4", 1), ("N", "I4", 5)])
                    .card("EXTNAME", &quoted("CAT"))
                    .data(b"abcd   1".to_vec()),
            )
            .to_bytes();
        assert_eq!(check(&bytes), Vec::<Finding>::new());
    }

    // ---- mandatory ----

    #[test]
    fn illegal_bitpix() {
        let bytes = HduBuilder::primary_image(16, &[2]).set("BITPIX", "99").to_bytes();
        let found = check(&bytes);
        assert_eq!(found[0].code, KEYWORD_VALUE);
        assert_eq!(found[0].severity, Severity::Error);
        assert_eq!(found[0].hdu_index, 0);
        assert_eq!(found.last().unwrap().code, UNDETERMINED_DATA_SIZE);
        assert_eq!(found.last().unwrap().severity, Severity::Severe);
    }

    #[test]
    fn missing_naxis_axis() {
        let bytes = HduBuilder::primary_image(8, &[]).set("NAXIS", "1").to_bytes();
        let found = check(&bytes);
        assert!(found.iter().any(|f| f.code == MISSING_KEYWORD && f.message.contains("NAXIS1")));
    }

    #[test]
    fn keyword_out_of_order() {
        let bytes = HduBuilder::empty()
            .card("SIMPLE", "T")
            .card("NAXIS", "0")
            .card("BITPIX", "8")
            .to_bytes();
        let found = check(&bytes);
        assert_eq!(codes(&found), vec![KEYWORD_ORDER, KEYWORD_ORDER]);
    }

    #[test]
    fn not_fixed_format() {
        let bytes = HduBuilder::primary_image(8, &[])
            .replace_raw("NAXIS", "NAXIS   = 0")
            .to_bytes();
        assert_eq!(codes(&check(&bytes)), vec![NOT_FIXED_FORMAT]);
    }

    #[test]
    fn simple_false_is_a_warning() {
        let bytes = HduBuilder::primary_image(8, &[]).set("SIMPLE", "F").to_bytes();
        let found = check(&bytes);
        assert_eq!(codes(&found), vec![SIMPLE_FALSE]);
        assert_eq!(found[0].severity, Severity::Warning);
    }

    #[test]
    fn structural_duplicate_is_an_error() {
        let bytes = HduBuilder::primary_image(8, &[]).card("NAXIS", "0").to_bytes();
        assert_eq!(codes(&check(&bytes)), vec![KEYWORD_DUPLICATE]);
    }

    #[test]
    fn other_duplicate_is_a_warning() {
        let bytes = HduBuilder::primary_image(8, &[])
            .card("OBSERVER", &quoted("A"))
            .card("OBSERVER", &quoted("B"))
            .to_bytes();
        let found = check(&bytes);
        assert_eq!(codes(&found), vec![DUPLICATE_KEYWORD]);
        assert_eq!(found[0].severity, Severity::Warning);
    }

    #[test]
    fn unknown_and_legacy_extensions() {
        let bytes = FitsBuilder::new()
            .hdu(HduBuilder::primary_image(8, &[]))
            .hdu(
                HduBuilder::image_extension(8, &[])
                    .set("XTENSION", &quoted("DUMP"))
                    .card("EXTNAME", &quoted("A")),
            )
            .hdu(
                HduBuilder::image_extension(8, &[])
                    .set("XTENSION", &quoted("WEIRD"))
                    .card("EXTNAME", &quoted("B")),
            )
            .to_bytes();
        let found = check(&bytes);
        assert_eq!(codes(&found), vec![LEGACY_XTENSION, KEYWORD_VALUE]);
        assert_eq!(found[1].hdu_index, 2);
    }

    #[test]
    fn xtension_leading_space() {
        let bytes = FitsBuilder::new()
            .hdu(HduBuilder::primary_image(8, &[]))
            .hdu(
                HduBuilder::image_extension(8, &[])
                    .replace_raw("XTENSION", "XTENSION= ' IMAGE  '")
                    .card("EXTNAME", &quoted("A")),
            )
            .to_bytes();
        assert_eq!(codes(&check(&bytes)), vec![LEADING_SPACE]);
    }

    // ---- tables ----

    #[test]
    fn naxis1_must_match_columns() {
        let bytes = FitsBuilder::new()
            .hdu(HduBuilder::primary_image(8, &[]))
            .hdu(
                HduBuilder::binary_table(9, 1, &[("A", "1J")])
                    .card("EXTNAME", &quoted("T"))
                    .data(vec![0; 9]),
            )
            .to_bytes();
        assert_eq!(codes(&check(&bytes)), vec![NAXIS1_MISMATCH]);
    }

    #[test]
    fn bad_tform_and_index_beyond_tfields() {
        let bytes = FitsBuilder::new()
            .hdu(HduBuilder::primary_image(8, &[]))
            .hdu(
                HduBuilder::binary_table(4, 1, &[("A", "1Z")])
                    .card("TUNIT2", &quoted("s"))
                    .card("EXTNAME", &quoted("T"))
                    .data(vec![0; 4]),
            )
            .to_bytes();
        let found = codes(&check(&bytes));
        assert_eq!(found, vec![BAD_TFORM, INDEX_EXCEEDS_TFIELDS]);
    }

    #[test]
    fn tbcol_past_row_end() {
        let bytes = FitsBuilder::new()
            .hdu(HduBuilder::primary_image(8, &[]))
            .hdu(
                HduBuilder::ascii_table(4, 1, &[("A", "A4", 2)])
                    .card("EXTNAME", &quoted("T"))
                    .data(b"abcd".to_vec()),
            )
            .to_bytes();
        assert_eq!(codes(&check(&bytes)), vec![TBCOL_OUT_OF_RANGE]);
    }

    #[test]
    fn missing_tform() {
        let bytes = FitsBuilder::new()
            .hdu(HduBuilder::primary_image(8, &[]))
            .hdu(
                HduBuilder::binary_table(4, 1, &[("A", "1J")])
                    .remove("TFORM1")
                    .card("EXTNAME", &quoted("T"))
                    .data(vec![0; 4]),
            )
            .to_bytes();
        let found = check(&bytes);
        assert!(found.iter().any(|f| f.code == MISSING_KEYWORD && f.message.contains("TFORM1")));
    }

    // ---- placement ----

    #[test]
    fn misplaced_keywords() {
        let bytes = FitsBuilder::new()
            .hdu(HduBuilder::primary_image(-32, &[]).card("BLANK", "0").card("TFIELDS", "1"))
            .hdu(
                HduBuilder::binary_table(4, 1, &[("A", "1J")])
                    .card("EXTNAME", &quoted("T"))
                    .card("BSCALE", "2.0")
                    .card("TBCOL1", "1")
                    .data(vec![0; 4]),
            )
            .to_bytes();
        let found = codes(&check(&bytes));
        assert_eq!(
            found,
            vec![BLANK_IN_FLOAT_IMAGE, TABLE_KEY_IN_IMAGE, IMAGE_KEY_IN_TABLE, WRONG_TABLE_KEYWORD]
        );
    }

    #[test]
    fn simple_in_extension() {
        let bytes = FitsBuilder::new()
            .hdu(HduBuilder::primary_image(8, &[]))
            .hdu(
                HduBuilder::image_extension(8, &[])
                    .card("EXTNAME", &quoted("A"))
                    .card("EXTEND", "T"),
            )
            .to_bytes();
        assert_eq!(codes(&check(&bytes)), vec![PRIMARY_KEY_IN_EXTENSION]);
    }

    // ---- reserved values ----

    #[test]
    fn reserved_keyword_types() {
        let bytes = HduBuilder::primary_image(8, &[])
            .card("EXTVER", &quoted("one"))
            .card("BSCALE", "0.0")
            .card("EPOCH", "2000.0")
            .to_bytes();
        assert_eq!(codes(&check(&bytes)), vec![WRONG_TYPE, ZERO_SCALE, DEPRECATED_KEYWORD]);
    }

    // ---- syntax ----

    #[test]
    fn card_syntax_issues() {
        let bytes = HduBuilder::primary_image(8, &[])
            .raw("lower   = 1")
            .raw("FLAG    = TRUE")
            .raw("RATIO   = 1.5e3")
            .raw("NAME    = 'open")
            .to_bytes();
        assert_eq!(
            codes(&check(&bytes)),
            vec![ILLEGAL_NAME_CHAR, BAD_LOGICAL, LOWERCASE_EXPONENT, MISSING_QUOTE]
        );
    }

    #[test]
    fn end_card_not_blank() {
        let bytes = HduBuilder::primary_image(8, &[]).end_card(Some("END     junk")).to_bytes();
        assert_eq!(codes(&check(&bytes)), vec![END_NOT_BLANK]);
    }

    #[test]
    fn mandatory_beats_syntax_on_one_card() {
        let bytes = HduBuilder::primary_image(8, &[])
            .replace_raw("BITPIX", "BITPIX  =                  8.0 junk")
            .to_bytes();
        assert_eq!(codes(&check(&bytes)), vec![KEYWORD_TYPE]);
    }

    // ---- HIERARCH ----

    #[test]
    fn hierarch_unrecognized_by_default() {
        let bytes = HduBuilder::primary_image(8, &[])
            .raw("HIERARCH ESO DET CHIP = 'A'")
            .to_bytes();
        let found = check(&bytes);
        assert_eq!(codes(&found), vec![UNRECOGNIZED_KEYWORD]);
        assert_eq!(found[0].severity, Severity::Warning);
    }

    #[test]
    fn hierarch_convention_checks() {
        let bytes = HduBuilder::primary_image(8, &[])
            .raw("HIERARCH ESO DET CHIP = 'A'")
            .raw("HIERARCH ESO DET CHIP = 'B'")
            .raw("HIERARCH no equals sign")
            .to_bytes();
        let found = check_with(&bytes, Options::default().extended_keyword_convention(true));
        assert_eq!(codes(&found), vec![HIERARCH_DUPLICATE, HIERARCH_MALFORMED]);
    }

    // ---- conventions ----

    #[test]
    fn archival_conventions() {
        let bytes = FitsBuilder::new()
            .hdu(
                HduBuilder::primary_image(8, &[])
                    .card("DATE", &quoted("01/02/99"))
                    .card("DATE-OBS", &quoted("2020-13-01")),
            )
            .hdu(
                HduBuilder::binary_table(8, 1, &[("A-B", "1J"), ("a-b", "1J")])
                    .card("TIMESYS", &quoted("MARS"))
                    .data(vec![0; 8]),
            )
            .to_bytes();
        let found = codes(&check(&bytes));
        assert_eq!(
            found,
            vec![
                Y2K_DATE,
                DATE_FORMAT,
                BAD_COLUMN_NAME,
                BAD_COLUMN_NAME,
                TIMESYS_VALUE,
                MISSING_EXTNAME
            ]
        );
    }

    #[test]
    fn conventions_can_be_disabled() {
        let bytes = FitsBuilder::new()
            .hdu(HduBuilder::primary_image(8, &[]))
            .hdu(HduBuilder::image_extension(8, &[]))
            .to_bytes();
        assert_eq!(codes(&check(&bytes)), vec![MISSING_EXTNAME]);
        assert!(check_with(&bytes, Options::default().archival_convention(false)).is_empty());
    }

    #[test]
    fn duplicate_column_names_ignore_case() {
        let bytes = FitsBuilder::new()
            .hdu(HduBuilder::primary_image(8, &[]))
            .hdu(
                HduBuilder::binary_table(8, 1, &[("FLUX", "1J"), ("flux", "1J")])
                    .card("EXTNAME", &quoted("T"))
                    .data(vec![0; 8]),
            )
            .to_bytes();
        assert_eq!(codes(&check(&bytes)), vec![DUPLICATE_COLUMN_NAME]);
    }

    #[test]
    fn longstrn_required_for_continue() {
        let bytes = HduBuilder::primary_image(8, &[])
            .raw("NOTE    = 'a long &'")
            .raw("CONTINUE  'string'")
            .to_bytes();
        assert_eq!(codes(&check(&bytes)), vec![MISSING_LONGSTRN]);
    }

    #[test]
    fn inherit_with_primary_data() {
        let bytes = FitsBuilder::new()
            .hdu(HduBuilder::primary_image(8, &[4]).data(vec![0; 4]))
            .hdu(
                HduBuilder::image_extension(8, &[])
                    .card("EXTNAME", &quoted("A"))
                    .card("INHERIT", "T"),
            )
            .to_bytes();
        assert_eq!(codes(&check(&bytes)), vec![INHERIT_WITH_PRIMARY_DATA]);
    }

    // ---- file level ----

    #[test]
    fn duplicate_extname_names_both_hdus() {
        let ext = HduBuilder::image_extension(8, &[]).card("EXTNAME", &quoted("SCI"));
        let bytes = FitsBuilder::new()
            .hdu(HduBuilder::primary_image(8, &[]))
            .hdu(ext.clone())
            .hdu(ext.card("EXTVER", "1"))
            .to_bytes();
        let found = check(&bytes);
        assert_eq!(codes(&found), vec![DUPLICATE_EXTNAME]);
        assert_eq!(found[0].severity, Severity::Warning);
        assert!(found[0].message.contains("HDU 1") && found[0].message.contains("HDU 2"));
        assert!(found[0].message.starts_with("image extension EXTNAME = 'SCI'"));
    }

    #[test]
    fn same_extname_on_different_kinds_is_allowed() {
        let bytes = FitsBuilder::new()
            .hdu(HduBuilder::primary_image(8, &[]))
            .hdu(HduBuilder::image_extension(8, &[]).card("EXTNAME", &quoted("SCI")))
            .hdu(HduBuilder::binary_table(4, 0, &[("A", "1J")]).card("EXTNAME", &quoted("SCI")))
            .to_bytes();
        assert!(check(&bytes).iter().all(|f| f.code != DUPLICATE_EXTNAME));
    }

    #[test]
    fn truncated_header_is_severe() {
        let bytes = FitsBuilder::new()
            .hdu(HduBuilder::primary_image(8, &[]))
            .hdu(HduBuilder::image_extension(8, &[]))
            .to_bytes();
        let found = check(&bytes[..BLOCK_SIZE + 500]);
        let last = found.last().unwrap();
        assert_eq!(last.code, TRUNCATED_FILE);
        assert_eq!(last.severity, Severity::Severe);
        assert_eq!(last.hdu_index, 1);
    }

    #[test]
    fn missing_end_is_severe() {
        let bytes = HduBuilder::primary_image(8, &[]).end_card(None).to_bytes();
        let found = check(&bytes);
        assert_eq!(codes(&found), vec![MISSING_END]);
        assert_eq!(found[0].severity, Severity::Severe);
    }

    // ---- dates ----

    #[test]
    fn date_forms() {
        assert!(is_iso_date("2024-02-29"));
        assert!(is_iso_date("2024-02-29T12:30:59.125"));
        assert!(!is_iso_date("2024-2-29"));
        assert!(!is_iso_date("2024-02-29T25:00:00"));
        assert!(!is_iso_date("2024-02-29T12:00:00."));
        assert!(is_two_digit_year_date("31/12/98"));
        assert!(!is_two_digit_year_date("1998-12-31"));
    }
}
