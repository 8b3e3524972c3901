//! Table column format (`TFORMn`) parsing for ASCII and binary tables.

use crate::error::{AccessError, Result};

/// Element type of a binary table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryType {
    /// `L`: logical, one byte (`T`, `F` or NUL).
    Logical,
    /// `X`: bit array.
    Bit,
    /// `B`: unsigned byte.
    Byte,
    /// `I`: 16-bit integer.
    Short,
    /// `J`: 32-bit integer.
    Int,
    /// `K`: 64-bit integer.
    Long,
    /// `A`: character.
    Ascii,
    /// `E`: 32-bit float.
    Float,
    /// `D`: 64-bit float.
    Double,
    /// `C`: complex pair of 32-bit floats.
    ComplexFloat,
    /// `M`: complex pair of 64-bit floats.
    ComplexDouble,
    /// `P`: 32-bit variable-length array descriptor.
    VarArrayP,
    /// `Q`: 64-bit variable-length array descriptor.
    VarArrayQ,
}

impl BinaryType {
    fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            b'L' => BinaryType::Logical,
            b'X' => BinaryType::Bit,
            b'B' => BinaryType::Byte,
            b'I' => BinaryType::Short,
            b'J' => BinaryType::Int,
            b'K' => BinaryType::Long,
            b'A' => BinaryType::Ascii,
            b'E' => BinaryType::Float,
            b'D' => BinaryType::Double,
            b'C' => BinaryType::ComplexFloat,
            b'M' => BinaryType::ComplexDouble,
            _ => return None,
        })
    }

    /// Bytes occupied by one element (not meaningful for `Bit`).
    pub fn element_size(self) -> usize {
        match self {
            BinaryType::Logical | BinaryType::Bit | BinaryType::Byte | BinaryType::Ascii => 1,
            BinaryType::Short => 2,
            BinaryType::Int | BinaryType::Float => 4,
            BinaryType::Long
            | BinaryType::Double
            | BinaryType::ComplexFloat
            | BinaryType::VarArrayP => 8,
            BinaryType::ComplexDouble | BinaryType::VarArrayQ => 16,
        }
    }
}

/// Element type and declared maximum length of a `P` or `Q` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayDescriptor {
    pub element: BinaryType,
    /// The `(max)` suffix of the TFORM, if given.
    pub max: Option<usize>,
}

impl ArrayDescriptor {
    /// Heap bytes used by an array of `len` elements.
    pub fn heap_len(&self, len: u64) -> Option<u64> {
        match self.element {
            BinaryType::Bit => Some(len.div_ceil(8)),
            element => len.checked_mul(element.element_size() as u64),
        }
    }
}

/// Parsed binary table `TFORMn`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryFormat {
    pub repeat: usize,
    pub kind: BinaryType,
    /// Set for variable-length array columns.
    pub array: Option<ArrayDescriptor>,
}

impl BinaryFormat {
    /// Bytes the column occupies in each row.
    pub fn width(&self) -> usize {
        match self.kind {
            BinaryType::Bit => self.repeat.div_ceil(8),
            kind => self.repeat.saturating_mul(kind.element_size()),
        }
    }

    /// The `(length, heap offset)` pairs stored in one field of a `P` or
    /// `Q` column. Empty for other column types.
    pub fn descriptors<'a>(&self, field: &'a [u8]) -> impl Iterator<Item = (u64, u64)> + 'a {
        let size = match self.kind {
            BinaryType::VarArrayP | BinaryType::VarArrayQ => self.kind.element_size(),
            _ => 0,
        };
        field.chunks_exact(size.max(1)).filter(move |_| size > 0).map(|pair| {
            let (len, offset) = pair.split_at(pair.len() / 2);
            (be_unsigned(len), be_unsigned(offset))
        })
    }
}

fn be_unsigned(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}

/// Parse a binary `TFORMn` value such as `1J`, `20A`, `E` or `1PE(12)`.
pub fn parse_binary_tform(tform: &str) -> Result<BinaryFormat> {
    let invalid = || AccessError::InvalidTform(tform.to_string());
    let s = tform.trim();
    let digits = s.bytes().take_while(u8::is_ascii_digit).count();
    let repeat = if digits == 0 {
        1
    } else {
        s[..digits].parse::<usize>().map_err(|_| invalid())?
    };
    let rest = s[digits..].as_bytes();
    let (&code, tail) = rest.split_first().ok_or_else(invalid)?;

    let mut array = None;
    let kind = match code {
        b'P' | b'Q' => {
            // Array descriptor: element type, then an optional "(max)".
            let (&elem, after) = tail.split_first().ok_or_else(invalid)?;
            let element = BinaryType::from_code(elem).ok_or_else(invalid)?;
            let max = match after {
                [] => None,
                [b'(', digits @ .., b')']
                    if !digits.is_empty() && digits.iter().all(u8::is_ascii_digit) =>
                {
                    let digits = core::str::from_utf8(digits).map_err(|_| invalid())?;
                    Some(digits.parse::<usize>().map_err(|_| invalid())?)
                }
                _ => return Err(invalid()),
            };
            array = Some(ArrayDescriptor { element, max });
            if code == b'P' {
                BinaryType::VarArrayP
            } else {
                BinaryType::VarArrayQ
            }
        }
        // Characters after the type code are an application-specific suffix
        // (e.g. `20A10` for substring arrays) and do not affect the width.
        other => BinaryType::from_code(other).ok_or_else(invalid)?,
    };
    Ok(BinaryFormat {
        repeat,
        kind,
        array,
    })
}

/// Parsed ASCII table `TFORMn`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsciiFormat {
    /// `Aw`
    Character(usize),
    /// `Iw`
    Integer(usize),
    /// `Fw.d`
    FloatF(usize, usize),
    /// `Ew.d`
    FloatE(usize, usize),
    /// `Dw.d`
    DoubleE(usize, usize),
}

impl AsciiFormat {
    /// Field width in characters.
    pub fn width(&self) -> usize {
        match *self {
            AsciiFormat::Character(w)
            | AsciiFormat::Integer(w)
            | AsciiFormat::FloatF(w, _)
            | AsciiFormat::FloatE(w, _)
            | AsciiFormat::DoubleE(w, _) => w,
        }
    }
}

/// Parse an ASCII table `TFORMn` value such as `A20`, `I10` or `E15.7`.
pub fn parse_ascii_tform(tform: &str) -> Result<AsciiFormat> {
    let invalid = || AccessError::InvalidTform(tform.to_string());
    let s = tform.trim();
    let (&code, rest) = s.as_bytes().split_first().ok_or_else(invalid)?;
    let rest = core::str::from_utf8(rest).map_err(|_| invalid())?;

    let width = |text: &str| match text.parse::<usize>() {
        Ok(w) if w > 0 => Ok(w),
        _ => Err(invalid()),
    };
    let width_decimals = |text: &str| {
        let (w, d) = text.split_once('.').ok_or_else(invalid)?;
        let d = d.parse::<usize>().map_err(|_| invalid())?;
        Ok::<_, AccessError>((width(w)?, d))
    };

    match code {
        b'A' => Ok(AsciiFormat::Character(width(rest)?)),
        b'I' => Ok(AsciiFormat::Integer(width(rest)?)),
        b'F' => width_decimals(rest).map(|(w, d)| AsciiFormat::FloatF(w, d)),
        b'E' => width_decimals(rest).map(|(w, d)| AsciiFormat::FloatE(w, d)),
        b'D' => width_decimals(rest).map(|(w, d)| AsciiFormat::DoubleE(w, d)),
        _ => Err(invalid()),
    }
}
