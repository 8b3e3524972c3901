//! Assembling FITS byte images from card text.
//!
//! The builders accept any card text, including illegal cards, so callers
//! can produce deliberately non-conforming files as well as clean ones.

use crate::block::{
    padded_byte_len, ASCII_TABLE_FILL_BYTE, CARD_SIZE, DATA_FILL_BYTE, HEADER_FILL_BYTE,
};
use crate::card::card_image;
use crate::checksum;

/// Format a fixed-format value card: keyword in columns 1-8, `= ` in 9-10,
/// numbers and logicals right-justified to column 30, strings starting in
/// column 11.
pub fn value_card(keyword: &str, value: &str) -> String {
    if value.starts_with('\'') {
        format!("{keyword:<8}= {value:<20}")
    } else {
        format!("{keyword:<8}= {value:>20}")
    }
}

/// Quote a string value, doubling embedded quotes and padding to at least
/// eight characters.
pub fn quoted(text: &str) -> String {
    format!("'{:<8}'", text.replace('\'', "''"))
}

/// One HDU under construction.
#[derive(Debug, Clone)]
pub struct HduBuilder {
    cards: Vec<String>,
    data: Vec<u8>,
    data_fill: u8,
    header_fill: u8,
    end_card: Option<String>,
    checksum: bool,
}

impl HduBuilder {
    /// An empty header; every card must be added explicitly.
    pub fn empty() -> Self {
        Self {
            cards: Vec::new(),
            data: Vec::new(),
            data_fill: DATA_FILL_BYTE,
            header_fill: HEADER_FILL_BYTE,
            end_card: Some("END".to_string()),
            checksum: false,
        }
    }

    /// Primary array header.
    pub fn primary_image(bitpix: i64, axes: &[usize]) -> Self {
        let mut hdu = Self::empty()
            .card("SIMPLE", "T")
            .card("BITPIX", &bitpix.to_string())
            .card("NAXIS", &axes.len().to_string());
        for (i, n) in axes.iter().enumerate() {
            hdu = hdu.card(&format!("NAXIS{}", i + 1), &n.to_string());
        }
        hdu
    }

    /// Image extension header.
    pub fn image_extension(bitpix: i64, axes: &[usize]) -> Self {
        let mut hdu = Self::empty()
            .card("XTENSION", &quoted("IMAGE"))
            .card("BITPIX", &bitpix.to_string())
            .card("NAXIS", &axes.len().to_string());
        for (i, n) in axes.iter().enumerate() {
            hdu = hdu.card(&format!("NAXIS{}", i + 1), &n.to_string());
        }
        hdu.card("PCOUNT", "0").card("GCOUNT", "1")
    }

    /// Binary table header; `columns` are `(TTYPE, TFORM)` pairs.
    pub fn binary_table(naxis1: usize, naxis2: usize, columns: &[(&str, &str)]) -> Self {
        let mut hdu = Self::table_prelude("BINTABLE", naxis1, naxis2, columns.len());
        for (i, (name, form)) in columns.iter().enumerate() {
            let n = i + 1;
            hdu = hdu
                .card(&format!("TTYPE{n}"), &quoted(name))
                .card(&format!("TFORM{n}"), &quoted(form));
        }
        hdu
    }

    /// ASCII table header; `columns` are `(TTYPE, TFORM, TBCOL)` triples.
    pub fn ascii_table(naxis1: usize, naxis2: usize, columns: &[(&str, &str, usize)]) -> Self {
        let mut hdu = Self::table_prelude("TABLE", naxis1, naxis2, columns.len());
        for (i, (name, form, col)) in columns.iter().enumerate() {
            let n = i + 1;
            hdu = hdu
                .card(&format!("TTYPE{n}"), &quoted(name))
                .card(&format!("TBCOL{n}"), &col.to_string())
                .card(&format!("TFORM{n}"), &quoted(form));
        }
        hdu.data_fill(ASCII_TABLE_FILL_BYTE)
    }

    fn table_prelude(xtension: &str, naxis1: usize, naxis2: usize, tfields: usize) -> Self {
        Self::empty()
            .card("XTENSION", &quoted(xtension))
            .card("BITPIX", "8")
            .card("NAXIS", "2")
            .card("NAXIS1", &naxis1.to_string())
            .card("NAXIS2", &naxis2.to_string())
            .card("PCOUNT", "0")
            .card("GCOUNT", "1")
            .card("TFIELDS", &tfields.to_string())
    }

    /// Append a fixed-format value card.
    pub fn card(mut self, keyword: &str, value: &str) -> Self {
        self.cards.push(value_card(keyword, value));
        self
    }

    /// Append a card verbatim.
    pub fn raw(mut self, text: &str) -> Self {
        self.cards.push(text.to_string());
        self
    }

    /// Replace the value of the first card with `keyword`, or append one.
    pub fn set(mut self, keyword: &str, value: &str) -> Self {
        match self.position(keyword) {
            Some(i) => self.cards[i] = value_card(keyword, value),
            None => self.cards.push(value_card(keyword, value)),
        }
        self
    }

    /// Replace the first card with `keyword` verbatim.
    pub fn replace_raw(mut self, keyword: &str, text: &str) -> Self {
        if let Some(i) = self.position(keyword) {
            self.cards[i] = text.to_string();
        }
        self
    }

    /// Remove every card with `keyword`.
    pub fn remove(mut self, keyword: &str) -> Self {
        self.cards.retain(|c| card_keyword(c) != keyword);
        self
    }

    /// Insert a value card before position `index` (0-based).
    pub fn insert(mut self, index: usize, keyword: &str, value: &str) -> Self {
        let index = index.min(self.cards.len());
        self.cards.insert(index, value_card(keyword, value));
        self
    }

    /// Set the unpadded data unit.
    pub fn data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }

    /// Byte used to pad the data unit.
    pub fn data_fill(mut self, fill: u8) -> Self {
        self.data_fill = fill;
        self
    }

    /// Byte used to pad the header after `END`.
    pub fn header_fill(mut self, fill: u8) -> Self {
        self.header_fill = fill;
        self
    }

    /// Replace the `END` card text, or omit it with `None`.
    pub fn end_card(mut self, text: Option<&str>) -> Self {
        self.end_card = text.map(str::to_string);
        self
    }

    /// Stamp `DATASUM` and `CHECKSUM` when serialized.
    pub fn with_checksum(mut self) -> Self {
        self.checksum = true;
        self
    }

    fn position(&self, keyword: &str) -> Option<usize> {
        self.cards.iter().position(|c| card_keyword(c) == keyword)
    }

    fn header_image(cards: &[String], end: Option<&str>, fill: u8) -> Vec<u8> {
        let mut header = Vec::with_capacity(padded_byte_len((cards.len() + 1) * CARD_SIZE));
        for card in cards.iter().map(String::as_str).chain(end) {
            header.extend_from_slice(&card_image(card));
        }
        header.resize(padded_byte_len(header.len()), fill);
        header
    }

    /// Serialize header, data and fill.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut data = self.data.clone();
        data.resize(padded_byte_len(data.len()), self.data_fill);

        if !self.checksum {
            let mut out =
                Self::header_image(&self.cards, self.end_card.as_deref(), self.header_fill);
            out.extend_from_slice(&data);
            return out;
        }

        let datasum = checksum::ones_complement_sum(&data, 0);
        let cards = self
            .clone()
            .set("DATASUM", &quoted(&datasum.to_string()))
            .set("CHECKSUM", &quoted("0000000000000000"));
        let slot = cards.position("CHECKSUM").unwrap_or(0);

        let mut header =
            Self::header_image(&cards.cards, self.end_card.as_deref(), self.header_fill);
        let sum = checksum::ones_complement_sum(&header, datasum);
        let encoded = checksum::encode(sum, true);
        let at = slot * CARD_SIZE + 11;
        header[at..at + checksum::ENCODED_LEN].copy_from_slice(&encoded);

        header.extend_from_slice(&data);
        header
    }
}

fn card_keyword(card: &str) -> &str {
    card.get(..8).unwrap_or(card).trim_end()
}

/// A whole file: a sequence of HDUs plus optional trailing bytes.
#[derive(Debug, Clone, Default)]
pub struct FitsBuilder {
    hdus: Vec<HduBuilder>,
    trailing: Vec<u8>,
}

impl FitsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hdu(mut self, hdu: HduBuilder) -> Self {
        self.hdus.push(hdu);
        self
    }

    /// Bytes appended after the last HDU.
    pub fn trailing(mut self, bytes: &[u8]) -> Self {
        self.trailing.extend_from_slice(bytes);
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out: Vec<u8> = self.hdus.iter().flat_map(HduBuilder::to_bytes).collect();
        out.extend_from_slice(&self.trailing);
        out
    }
}
