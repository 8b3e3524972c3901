//! Tolerant tokenizer for 80-byte header card images.
//!
//! Every card yields a [`Card`], however malformed. Lexical problems are
//! recorded in [`Card::issues`] in the order they were found so callers can
//! report them without re-reading the raw bytes.

use crate::block::CARD_SIZE;
use crate::value::{lex_value_field, Value, ValueIssue};

/// Keywords whose cards never carry a value.
const COMMENTARY_KEYWORDS: [&str; 3] = ["COMMENT", "HISTORY", ""];

/// Lexical problem found in a card image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardIssue {
    /// A byte outside printable ASCII; `column` is 1-based.
    NonAscii { column: usize, byte: u8 },
    /// A keyword byte that is not `A-Z`, `0-9`, `-` or `_`.
    IllegalNameChar { column: usize, byte: u8 },
    /// The keyword does not start in column 1.
    NameNotJustified,
    /// Columns 9-80 of the `END` card are not blank.
    EndNotBlank,
    /// Problem in the value field.
    Value(ValueIssue),
}

/// One tokenized header card.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    /// 1-based position of the card within its header.
    pub position: usize,
    /// Keyword name, trimmed. For HIERARCH cards with `=`, the long name.
    pub name: String,
    /// True when the card uses the `HIERARCH` long-keyword convention.
    pub hierarch: bool,
    /// True when the card carries a value indicator (`= ` in columns 9-10).
    pub value_indicator: bool,
    /// Typed value, if one was recovered.
    pub value: Option<Value>,
    /// Raw value token text.
    pub value_text: String,
    /// Column span `[start, end)` of the value token, 0-based within the card.
    pub value_span: Option<(usize, usize)>,
    /// Comment text, if any.
    pub comment: Option<String>,
    /// The raw card image.
    pub raw: [u8; CARD_SIZE],
    /// Lexical issues in detection order.
    pub issues: Vec<CardIssue>,
}

impl Card {
    /// True for the `END` card.
    pub fn is_end(&self) -> bool {
        !self.hierarch && self.name == "END"
    }

    /// True for COMMENT, HISTORY, blank-keyword and CONTINUE cards.
    pub fn is_commentary(&self) -> bool {
        !self.hierarch
            && (COMMENTARY_KEYWORDS.contains(&self.name.as_str()) || self.name == "CONTINUE")
    }

    /// True for a `CONTINUE` long-string continuation card.
    pub fn is_continue(&self) -> bool {
        !self.hierarch && self.name == "CONTINUE"
    }

    /// Integer value, if the card holds one.
    pub fn integer(&self) -> Option<i64> {
        match self.value {
            Some(Value::Integer(n)) => Some(n),
            _ => None,
        }
    }

    /// Numeric value as `f64`, accepting integers.
    pub fn number(&self) -> Option<f64> {
        match self.value {
            Some(Value::Integer(n)) => Some(n as f64),
            Some(Value::Float(x)) => Some(x),
            _ => None,
        }
    }

    /// String value, if the card holds one.
    pub fn string(&self) -> Option<&str> {
        match &self.value {
            Some(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Logical value, if the card holds one.
    pub fn logical(&self) -> Option<bool> {
        match self.value {
            Some(Value::Logical(b)) => Some(b),
            _ => None,
        }
    }

    /// For an indexed keyword such as `TFORM12`, returns `Some(12)` when
    /// `root` is `"TFORM"`.
    pub fn index_of(&self, root: &str) -> Option<usize> {
        if self.hierarch {
            return None;
        }
        let digits = self.name.strip_prefix(root)?;
        if digits.is_empty()
            || digits.starts_with('0')
            || !digits.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }
        digits.parse().ok()
    }
}

/// Tokenize one card image. `position` is the 1-based card number.
pub fn tokenize(raw: &[u8; CARD_SIZE], position: usize) -> Card {
    let mut card = Card {
        position,
        name: String::new(),
        hierarch: false,
        value_indicator: false,
        value: None,
        value_text: String::new(),
        value_span: None,
        comment: None,
        raw: *raw,
        issues: Vec::new(),
    };

    if let Some(column) = raw.iter().position(|b| !(0x20..=0x7e).contains(b)) {
        card.issues.push(CardIssue::NonAscii {
            column: column + 1,
            byte: raw[column],
        });
    }

    let name_field = &raw[..8];
    let name = String::from_utf8_lossy(name_field).trim().to_string();
    if name_field[0] == b' ' && !name.is_empty() {
        card.issues.push(CardIssue::NameNotJustified);
    }

    if name == "HIERARCH" {
        card.hierarch = true;
        tokenize_hierarch(&mut card);
        return card;
    }

    let trimmed_len = name_field.iter().rposition(|&b| b != b' ').map_or(0, |i| i + 1);
    let lead = name_field.iter().position(|&b| b != b' ').unwrap_or(0);
    if let Some(i) = name_field[lead..trimmed_len]
        .iter()
        .position(|&b| !matches!(b, b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_'))
    {
        card.issues.push(CardIssue::IllegalNameChar {
            column: lead + i + 1,
            byte: name_field[lead + i],
        });
    }
    card.name = name;

    if card.name == "END" {
        if raw[8..].iter().any(|&b| b != b' ') {
            card.issues.push(CardIssue::EndNotBlank);
        }
        return card;
    }

    if card.name == "CONTINUE" {
        apply_value_field(&mut card, 8);
        return card;
    }

    if COMMENTARY_KEYWORDS.contains(&card.name.as_str()) || &raw[8..10] != b"= " {
        let text = String::from_utf8_lossy(&raw[8..]).trim().to_string();
        card.comment = (!text.is_empty()).then_some(text);
        return card;
    }

    card.value_indicator = true;
    apply_value_field(&mut card, 10);
    card
}

fn tokenize_hierarch(card: &mut Card) {
    let rest = &card.raw[8..];
    match rest.iter().position(|&b| b == b'=') {
        Some(eq) => {
            card.name = String::from_utf8_lossy(&rest[..eq]).trim().to_string();
            card.value_indicator = true;
            apply_value_field(card, 8 + eq + 1);
        }
        None => {
            card.name = "HIERARCH".to_string();
            let text = String::from_utf8_lossy(rest).trim().to_string();
            card.comment = (!text.is_empty()).then_some(text);
        }
    }
}

fn apply_value_field(card: &mut Card, offset: usize) {
    let field = lex_value_field(&card.raw[offset..]);
    card.value = field.value;
    card.value_text = field.text;
    card.value_span = field.span.map(|(s, e)| (s + offset, e + offset));
    card.comment = field.comment;
    if let Some(issue) = field.issue {
        card.issues.push(CardIssue::Value(issue));
    }
}

/// Build a card image from text, padding with spaces or truncating to 80 bytes.
pub fn card_image(text: &str) -> [u8; CARD_SIZE] {
    let mut raw = [b' '; CARD_SIZE];
    let bytes = text.as_bytes();
    let n = bytes.len().min(CARD_SIZE);
    raw[..n].copy_from_slice(&bytes[..n]);
    raw
}
