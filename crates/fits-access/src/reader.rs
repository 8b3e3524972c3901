//! Lazy walk over the HDUs of an in-memory FITS image.

use tracing::trace;

use crate::block::{padded_byte_len, CARD_SIZE};
use crate::card::{tokenize, Card};
use crate::error::AccessError;
use crate::hdu::{classify, describe_data, Extent, Hdu};

/// Iterator over the HDUs of a FITS byte image.
///
/// Yields every HDU whose header can be located. The walk stops after the
/// first HDU whose [`Extent`] is not `Complete`, because the start of the
/// next HDU is then unknown. Non-FITS input and trailing garbage after the
/// last HDU are reported as errors, after which the iterator is exhausted.
pub struct HduReader<'a> {
    bytes: &'a [u8],
    label: &'a str,
    offset: usize,
    index: usize,
    finished: bool,
}

impl<'a> HduReader<'a> {
    /// Start walking `bytes`; `label` names the source in error messages.
    pub fn new(bytes: &'a [u8], label: &'a str) -> Self {
        Self {
            bytes,
            label,
            offset: 0,
            index: 0,
            finished: false,
        }
    }

    fn read_hdu(&self) -> Hdu {
        let start = self.offset;
        let mut cards: Vec<Card> = Vec::new();
        let mut cursor = start;
        let mut found_end = false;

        while !found_end && cursor + CARD_SIZE <= self.bytes.len() {
            let mut raw = [0u8; CARD_SIZE];
            raw.copy_from_slice(&self.bytes[cursor..cursor + CARD_SIZE]);
            let card = tokenize(&raw, cards.len() + 1);
            found_end = card.is_end();
            cards.push(card);
            cursor += CARD_SIZE;
        }

        let kind = classify(self.index, &cards);
        let header_len = padded_byte_len(cards.len() * CARD_SIZE);
        let data_offset = start + header_len;
        let data = describe_data(&kind, &cards, data_offset);
        let available = self.bytes.len() - start;

        let extent = if !found_end || header_len > available {
            trace!(index = self.index, available, found_end, "header incomplete");
            Extent::HeaderIncomplete { available }
        } else {
            match data.padded_len() {
                None => Extent::Undetermined,
                Some(len) if len > self.bytes.len() - data_offset => Extent::DataTruncated {
                    expected: len,
                    available: self.bytes.len() - data_offset,
                },
                Some(_) => Extent::Complete,
            }
        };

        let header_len = if matches!(extent, Extent::HeaderIncomplete { .. }) {
            available
        } else {
            header_len
        };

        Hdu {
            index: self.index,
            kind,
            header_offset: start,
            header_len,
            cards,
            data,
            extent,
        }
    }
}

impl Iterator for HduReader<'_> {
    type Item = Result<Hdu, AccessError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if self.index == 0 {
            if self.bytes.is_empty() {
                self.finished = true;
                return Some(Err(AccessError::Empty(self.label.to_string())));
            }
            if !self.bytes.starts_with(b"SIMPLE  ") {
                self.finished = true;
                return Some(Err(AccessError::NotFits(self.label.to_string())));
            }
        } else if self.offset >= self.bytes.len() {
            self.finished = true;
            return None;
        } else if !self.bytes[self.offset..].starts_with(b"XTENSION") {
            self.finished = true;
            return Some(Err(AccessError::TrailingBytes {
                offset: self.offset,
                len: self.bytes.len() - self.offset,
            }));
        }

        let hdu = self.read_hdu();
        trace!(index = hdu.index, kind = %hdu.kind, extent = ?hdu.extent, "located HDU");
        if hdu.is_complete() {
            self.offset = hdu.end_offset();
        } else {
            self.finished = true;
        }
        self.index += 1;
        Some(Ok(hdu))
    }
}
