/// FITS logical record size in bytes.
pub const BLOCK_SIZE: usize = 2880;

/// Size of one header card image in bytes.
pub const CARD_SIZE: usize = 80;

/// Number of card images in a single header block.
pub const CARDS_PER_BLOCK: usize = BLOCK_SIZE / CARD_SIZE;

/// Fill byte mandated for unused space in header blocks (ASCII space).
pub const HEADER_FILL_BYTE: u8 = b' ';

/// Fill byte mandated for unused space in data blocks.
pub const DATA_FILL_BYTE: u8 = 0x00;

/// Fill byte mandated for unused space in ASCII table data blocks.
pub const ASCII_TABLE_FILL_BYTE: u8 = b' ';

/// Number of whole blocks required to hold `byte_count` bytes.
pub fn blocks_needed(byte_count: usize) -> usize {
    byte_count.div_ceil(BLOCK_SIZE)
}

/// Round `byte_count` up to the next block boundary.
pub fn padded_byte_len(byte_count: usize) -> usize {
    blocks_needed(byte_count) * BLOCK_SIZE
}

/// Offset (relative to `bytes`) of the first byte that differs from `fill`.
pub fn first_non_fill(bytes: &[u8], fill: u8) -> Option<usize> {
    bytes.iter().position(|&b| b != fill)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---- geometry ----

    #[test]
    fn cards_per_block_is_36() {
        assert_eq!(CARDS_PER_BLOCK, 36);
    }

    #[test]
    fn blocks_needed_rounds_up() {
        assert_eq!(blocks_needed(0), 0);
        assert_eq!(blocks_needed(1), 1);
        assert_eq!(blocks_needed(BLOCK_SIZE), 1);
        assert_eq!(blocks_needed(BLOCK_SIZE + 1), 2);
    }

    #[test]
    fn padded_len_is_block_multiple() {
        assert_eq!(padded_byte_len(0), 0);
        assert_eq!(padded_byte_len(100), BLOCK_SIZE);
        assert_eq!(padded_byte_len(2 * BLOCK_SIZE), 2 * BLOCK_SIZE);
    }

    // ---- fill scanning ----

    #[test]
    fn first_non_fill_finds_offset() {
        let mut bytes = vec![0u8; 16];
        assert_eq!(first_non_fill(&bytes, DATA_FILL_BYTE), None);
        bytes[11] = 7;
        assert_eq!(first_non_fill(&bytes, DATA_FILL_BYTE), Some(11));
    }

    #[test]
    fn header_fill_is_space() {
        let bytes = [b' '; 80];
        assert_eq!(first_non_fill(&bytes, HEADER_FILL_BYTE), None);
        assert_eq!(first_non_fill(&bytes, DATA_FILL_BYTE), Some(0));
    }
}
