use core::fmt;

use crate::block::{blocks_needed, padded_byte_len, BLOCK_SIZE, CARD_SIZE};
use crate::card::Card;

/// The structural kind of an HDU.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HduKind {
    /// Primary array.
    Primary,
    /// Primary HDU using the random-groups structure (GROUPS = T, NAXIS1 = 0).
    RandomGroups,
    /// `XTENSION = 'IMAGE'`.
    Image,
    /// `XTENSION = 'TABLE'`.
    AsciiTable,
    /// `XTENSION = 'BINTABLE'`.
    BinaryTable,
    /// Any other or missing `XTENSION` value (kept verbatim, trimmed).
    Other(String),
}

impl HduKind {
    /// True for the primary HDU in either form.
    pub fn is_primary(&self) -> bool {
        matches!(self, HduKind::Primary | HduKind::RandomGroups)
    }

    /// True for ASCII and binary tables.
    pub fn is_table(&self) -> bool {
        matches!(self, HduKind::AsciiTable | HduKind::BinaryTable)
    }
}

impl fmt::Display for HduKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HduKind::Primary => f.write_str("primary array"),
            HduKind::RandomGroups => f.write_str("random groups"),
            HduKind::Image => f.write_str("image extension"),
            HduKind::AsciiTable => f.write_str("ASCII table"),
            HduKind::BinaryTable => f.write_str("binary table"),
            HduKind::Other(name) if name.is_empty() => f.write_str("unknown extension"),
            HduKind::Other(name) => write!(f, "'{name}' extension"),
        }
    }
}

/// Shape and placement of an HDU's data unit, derived from its header.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DataDescriptor {
    /// BITPIX, when it is an integer.
    pub bitpix: Option<i64>,
    /// NAXISn values, in order. Empty when NAXIS = 0 or unreadable.
    pub axes: Vec<usize>,
    /// PCOUNT (0 when absent).
    pub pcount: usize,
    /// GCOUNT (1 when absent).
    pub gcount: usize,
    /// Byte offset of the data unit within the source.
    pub byte_offset: usize,
    /// Unpadded data length, `None` when the header does not determine it.
    pub byte_len: Option<usize>,
}

impl DataDescriptor {
    /// Bytes per element for a legal BITPIX.
    pub fn element_size(&self) -> Option<usize> {
        bitpix_size(self.bitpix?)
    }

    /// Length of the data unit including fill, when known.
    pub fn padded_len(&self) -> Option<usize> {
        self.byte_len
            .and_then(|n| blocks_needed(n).checked_mul(BLOCK_SIZE))
    }
}

/// Bytes per element for a BITPIX value, `None` for illegal codes.
pub fn bitpix_size(bitpix: i64) -> Option<usize> {
    match bitpix {
        8 => Some(1),
        16 => Some(2),
        32 | -32 => Some(4),
        64 | -64 => Some(8),
        _ => None,
    }
}

/// How much of an HDU the source actually holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extent {
    /// Header and padded data are both present.
    Complete,
    /// The source ended, or no `END` card was found, before the header finished.
    HeaderIncomplete { available: usize },
    /// The header is complete but the padded data unit runs past the end.
    DataTruncated { expected: usize, available: usize },
    /// The header does not determine the data size.
    Undetermined,
}

/// One Header-Data-Unit as found in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Hdu {
    /// 0-based HDU index; the primary HDU is 0.
    pub index: usize,
    pub kind: HduKind,
    /// Byte offset of the first header card.
    pub header_offset: usize,
    /// Header length including fill (whole blocks), or the bytes available
    /// when the header is incomplete.
    pub header_len: usize,
    /// Tokenized cards, including the `END` card when present.
    pub cards: Vec<Card>,
    pub data: DataDescriptor,
    pub extent: Extent,
}

impl Hdu {
    /// The `END` card, if the header has one.
    pub fn end_card(&self) -> Option<&Card> {
        self.cards.iter().find(|c| c.is_end())
    }

    /// First value card with the given keyword.
    pub fn card(&self, keyword: &str) -> Option<&Card> {
        self.cards
            .iter()
            .find(|c| !c.hierarch && !c.is_commentary() && c.name == keyword)
    }

    pub fn integer(&self, keyword: &str) -> Option<i64> {
        self.card(keyword).and_then(Card::integer)
    }

    pub fn number(&self, keyword: &str) -> Option<f64> {
        self.card(keyword).and_then(Card::number)
    }

    pub fn string(&self, keyword: &str) -> Option<&str> {
        self.card(keyword).and_then(Card::string)
    }

    pub fn logical(&self, keyword: &str) -> Option<bool> {
        self.card(keyword).and_then(Card::logical)
    }

    /// True when the header and data are both fully present.
    pub fn is_complete(&self) -> bool {
        self.extent == Extent::Complete
    }

    /// Header fill: bytes after the `END` card up to the header's block end.
    pub fn header_fill<'a>(&self, source: &'a [u8]) -> &'a [u8] {
        let used = self.cards.len() * CARD_SIZE;
        match self.header_len.checked_sub(used) {
            Some(fill) => slice(source, self.header_offset + used, fill),
            None => &[],
        }
    }

    /// Unpadded data bytes.
    pub fn data_bytes<'a>(&self, source: &'a [u8]) -> &'a [u8] {
        let len = self.data.byte_len.unwrap_or(0);
        slice(source, self.data.byte_offset, len)
    }

    /// Data fill: bytes after the data up to the data unit's block end.
    pub fn data_fill<'a>(&self, source: &'a [u8]) -> &'a [u8] {
        match self.data.byte_len {
            Some(len) => slice(
                source,
                self.data.byte_offset + len,
                padded_byte_len(len) - len,
            ),
            None => &[],
        }
    }

    /// Header plus padded data, as covered by the `CHECKSUM` keyword.
    pub fn hdu_bytes<'a>(&self, source: &'a [u8]) -> &'a [u8] {
        let data = self.data.padded_len().unwrap_or(0);
        slice(source, self.header_offset, self.header_len + data)
    }

    /// Padded data, as covered by the `DATASUM` keyword.
    pub fn padded_data_bytes<'a>(&self, source: &'a [u8]) -> &'a [u8] {
        let data = self.data.padded_len().unwrap_or(0);
        slice(source, self.data.byte_offset, data)
    }

    /// Byte offset just past this HDU's padded data.
    pub fn end_offset(&self) -> usize {
        self.data.byte_offset + self.data.padded_len().unwrap_or(0)
    }
}

fn slice(source: &[u8], offset: usize, len: usize) -> &[u8] {
    let start = offset.min(source.len());
    let end = offset.saturating_add(len).min(source.len());
    &source[start..end]
}

/// Derive the data descriptor from the header's structural keywords.
pub(crate) fn describe_data(kind: &HduKind, cards: &[Card], data_offset: usize) -> DataDescriptor {
    let find = |name: &str| {
        cards
            .iter()
            .find(|c| !c.hierarch && !c.is_commentary() && c.name == name)
            .and_then(Card::integer)
    };

    let bitpix = find("BITPIX");
    let axes: Option<Vec<usize>> = find("NAXIS")
        .and_then(|n| usize::try_from(n).ok())
        .and_then(|naxis| {
            (1..=naxis)
                .map(|i| find(&format!("NAXIS{i}")).and_then(|v| usize::try_from(v).ok()))
                .collect()
        });

    let pcount = find("PCOUNT").and_then(|v| usize::try_from(v).ok());
    let gcount = find("GCOUNT").and_then(|v| usize::try_from(v).ok());

    let mut data = DataDescriptor {
        bitpix,
        axes: axes.clone().unwrap_or_default(),
        pcount: pcount.unwrap_or(0),
        gcount: gcount.unwrap_or(1),
        byte_offset: data_offset,
        byte_len: None,
    };

    let Some(axes) = axes else {
        return data;
    };

    let elements = match kind {
        HduKind::Primary => {
            if axes.is_empty() {
                Some(0)
            } else {
                axes.iter().try_fold(1usize, |acc, &n| acc.checked_mul(n))
            }
        }
        HduKind::RandomGroups => axes
            .get(1..)
            .unwrap_or(&[])
            .iter()
            .try_fold(1usize, |acc, &n| acc.checked_mul(n))
            .and_then(|group| group.checked_add(data.pcount))
            .and_then(|per_group| per_group.checked_mul(data.gcount)),
        _ => {
            let product = if axes.is_empty() {
                Some(0)
            } else {
                axes.iter().try_fold(1usize, |acc, &n| acc.checked_mul(n))
            };
            product
                .and_then(|p| p.checked_add(data.pcount))
                .and_then(|p| p.checked_mul(data.gcount))
        }
    };

    data.byte_len = match (elements, data.element_size()) {
        (Some(0), _) => Some(0),
        (Some(n), Some(size)) => n.checked_mul(size),
        _ => None,
    };
    data
}

/// Classify an HDU from its cards. `index` 0 is always primary.
pub(crate) fn classify(index: usize, cards: &[Card]) -> HduKind {
    let value_card = |name: &str| {
        cards
            .iter()
            .find(|c| !c.hierarch && !c.is_commentary() && c.name == name)
    };
    if index == 0 {
        let groups = value_card("GROUPS").and_then(Card::logical) == Some(true);
        let naxis1_zero = value_card("NAXIS1").and_then(Card::integer) == Some(0);
        return if groups && naxis1_zero {
            HduKind::RandomGroups
        } else {
            HduKind::Primary
        };
    }
    match value_card("XTENSION").and_then(Card::string) {
        Some("IMAGE") => HduKind::Image,
        Some("TABLE") => HduKind::AsciiTable,
        Some("BINTABLE") => HduKind::BinaryTable,
        Some(other) => HduKind::Other(other.trim().to_string()),
        None => HduKind::Other(String::new()),
    }
}
