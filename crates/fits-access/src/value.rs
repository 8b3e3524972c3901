use core::fmt;

/// A typed FITS header value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// FITS logical value (`T` or `F`).
    Logical(bool),
    /// FITS integer value.
    Integer(i64),
    /// FITS floating-point value.
    Float(f64),
    /// FITS character string (content between single quotes, trailing blanks removed).
    String(String),
    /// FITS complex integer `(real, imaginary)`.
    ComplexInt(i64, i64),
    /// FITS complex float `(real, imaginary)`.
    ComplexFloat(f64, f64),
}

impl Value {
    /// Short name of the value's type, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Logical(_) => "logical",
            Value::Integer(_) => "integer",
            Value::Float(_) => "floating-point",
            Value::String(_) => "string",
            Value::ComplexInt(_, _) => "complex integer",
            Value::ComplexFloat(_, _) => "complex floating-point",
        }
    }
}

/// Lexical problem found while reading a value field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueIssue {
    /// A string value has no closing quote.
    MissingQuote,
    /// A token starting with `T` or `F` is not exactly one character.
    BadLogical,
    /// A numeric token does not parse as an integer or float.
    BadNumber,
    /// A float uses `e` or `d` instead of `E` or `D`.
    LowercaseExponent,
    /// A parenthesised value is not a `(re, im)` pair.
    BadComplex,
    /// The token is not a string, logical, number or complex value.
    UnknownType,
    /// Text follows the value without a `/` separator.
    NoCommentSeparator,
    /// A string value contains a non-printable character.
    NonPrintableString,
}

impl fmt::Display for ValueIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ValueIssue::MissingQuote => "string value is missing its closing quote",
            ValueIssue::BadLogical => "logical value must be T or F",
            ValueIssue::BadNumber => "numeric value is malformed",
            ValueIssue::LowercaseExponent => "exponent must be written with an upper-case letter",
            ValueIssue::BadComplex => "complex value must be written as (real, imaginary)",
            ValueIssue::UnknownType => "value is not a string, logical, number or complex pair",
            ValueIssue::NoCommentSeparator => "comment text is not preceded by '/'",
            ValueIssue::NonPrintableString => "string value contains a non-printable character",
        };
        f.write_str(text)
    }
}

/// Result of lexing the value field of one card.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValueField {
    /// Typed value, when one could be recovered.
    pub value: Option<Value>,
    /// Raw text of the value token.
    pub text: String,
    /// Byte span `[start, end)` of the value token relative to the field.
    pub span: Option<(usize, usize)>,
    /// Comment text following the separator, trimmed.
    pub comment: Option<String>,
    /// First lexical problem found, if any.
    pub issue: Option<ValueIssue>,
}

/// Lex a value field (card columns 11-80, or 9-80 for `CONTINUE`).
///
/// Never fails: malformed input yields a best-effort value plus an issue.
pub fn lex_value_field(field: &[u8]) -> ValueField {
    let start = match field.iter().position(|&b| b != b' ') {
        Some(i) => i,
        None => return ValueField::default(),
    };

    let mut out = ValueField::default();
    let end = match field[start] {
        b'/' => {
            // Undefined value followed by a comment.
            out.comment = comment_text(&field[start + 1..]);
            return out;
        }
        b'\'' => lex_string(field, start, &mut out),
        b'(' => lex_complex(field, start, &mut out),
        _ => lex_token(field, start, &mut out),
    };

    out.text = String::from_utf8_lossy(&field[start..end]).into_owned();
    out.span = Some((start, end));

    let rest = &field[end..];
    match rest.iter().position(|&b| b != b' ') {
        None => {}
        Some(i) if rest[i] == b'/' => out.comment = comment_text(&rest[i + 1..]),
        Some(i) => {
            out.comment = comment_text(&rest[i..]);
            if out.issue.is_none() {
                out.issue = Some(ValueIssue::NoCommentSeparator);
            }
        }
    }
    out
}

fn comment_text(bytes: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Returns the index just past the closing quote (or the field end).
fn lex_string(field: &[u8], start: usize, out: &mut ValueField) -> usize {
    let mut text = String::new();
    let mut i = start + 1;
    let mut closed = false;
    while i < field.len() {
        let b = field[i];
        if b == b'\'' {
            if field.get(i + 1) == Some(&b'\'') {
                text.push('\'');
                i += 2;
                continue;
            }
            closed = true;
            i += 1;
            break;
        }
        if !(0x20..=0x7e).contains(&b) && out.issue.is_none() {
            out.issue = Some(ValueIssue::NonPrintableString);
        }
        text.push(b as char);
        i += 1;
    }
    if !closed {
        out.issue = Some(ValueIssue::MissingQuote);
    }
    let trimmed = text.trim_end().len();
    text.truncate(trimmed);
    out.value = Some(Value::String(text));
    i
}

fn lex_complex(field: &[u8], start: usize, out: &mut ValueField) -> usize {
    let close = match field[start..].iter().position(|&b| b == b')') {
        Some(i) => start + i,
        None => {
            out.issue = Some(ValueIssue::BadComplex);
            return field.len();
        }
    };
    let inner = String::from_utf8_lossy(&field[start + 1..close]).into_owned();
    let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
    let parsed = match parts.as_slice() {
        [re, im] => match (parse_number(re), parse_number(im)) {
            (Ok(Value::Integer(a)), Ok(Value::Integer(b))) => Some(Value::ComplexInt(a, b)),
            (Ok(a), Ok(b)) => number_as_f64(&a)
                .zip(number_as_f64(&b))
                .map(|(a, b)| Value::ComplexFloat(a, b)),
            _ => None,
        },
        _ => None,
    };
    match parsed {
        Some(v) => out.value = Some(v),
        None => out.issue = Some(ValueIssue::BadComplex),
    }
    close + 1
}

fn lex_token(field: &[u8], start: usize, out: &mut ValueField) -> usize {
    let len = field[start..]
        .iter()
        .position(|&b| b == b' ' || b == b'/')
        .unwrap_or(field.len() - start);
    let end = start + len;
    let token = String::from_utf8_lossy(&field[start..end]).into_owned();

    match field[start] {
        b'T' | b'F' => {
            if len == 1 {
                out.value = Some(Value::Logical(field[start] == b'T'));
            } else {
                out.issue = Some(ValueIssue::BadLogical);
            }
        }
        b'0'..=b'9' | b'+' | b'-' | b'.' => match parse_number(&token) {
            Ok(v) => {
                if token.contains(['e', 'd']) {
                    out.issue = Some(ValueIssue::LowercaseExponent);
                }
                out.value = Some(v);
            }
            Err(issue) => out.issue = Some(issue),
        },
        _ => out.issue = Some(ValueIssue::UnknownType),
    }
    end
}

fn number_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Integer(n) => Some(*n as f64),
        Value::Float(x) => Some(*x),
        _ => None,
    }
}

/// Parse a FITS integer or real token, accepting `D` exponents.
pub fn parse_number(token: &str) -> Result<Value, ValueIssue> {
    let valid_chars = token
        .bytes()
        .all(|b| matches!(b, b'0'..=b'9' | b'+' | b'-' | b'.' | b'E' | b'e' | b'D' | b'd'));
    if token.is_empty() || !valid_chars {
        return Err(ValueIssue::BadNumber);
    }

    let integral = token
        .bytes()
        .enumerate()
        .all(|(i, b)| b.is_ascii_digit() || (i == 0 && (b == b'+' || b == b'-')));
    if integral {
        if let Ok(n) = token.parse::<i64>() {
            return Ok(Value::Integer(n));
        }
    }

    let normalized = token.to_ascii_uppercase().replace('D', "E");
    normalized
        .parse::<f64>()
        .map(Value::Float)
        .map_err(|_| ValueIssue::BadNumber)
}
