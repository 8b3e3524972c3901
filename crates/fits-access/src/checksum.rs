//! The 32-bit ones-complement checksum used by the `CHECKSUM` and
//! `DATASUM` keywords, and its 16-character ASCII encoding.

/// Value of a correctly checksummed HDU: ones-complement negative zero.
pub const NEGATIVE_ZERO: u32 = 0xFFFF_FFFF;

/// Length of an encoded `CHECKSUM` value.
pub const ENCODED_LEN: usize = 16;

/// Accumulate `bytes` into a running checksum.
///
/// Words are big-endian 32-bit values summed as two 16-bit halves with
/// end-around carry. A trailing partial word is zero-extended, matching the
/// zero fill of a padded data unit.
pub fn ones_complement_sum(bytes: &[u8], initial: u32) -> u32 {
    let mut hi = u64::from(initial >> 16);
    let mut lo = u64::from(initial & 0xFFFF);

    let mut words = bytes.chunks_exact(4);
    for word in &mut words {
        hi += u64::from(u16::from_be_bytes([word[0], word[1]]));
        lo += u64::from(u16::from_be_bytes([word[2], word[3]]));
    }
    let tail = words.remainder();
    if !tail.is_empty() {
        let mut word = [0u8; 4];
        word[..tail.len()].copy_from_slice(tail);
        hi += u64::from(u16::from_be_bytes([word[0], word[1]]));
        lo += u64::from(u16::from_be_bytes([word[2], word[3]]));
    }

    fold(hi, lo)
}

/// Ones-complement sum of two checksums.
pub fn add(a: u32, b: u32) -> u32 {
    let hi = u64::from(a >> 16) + u64::from(b >> 16);
    let lo = u64::from(a & 0xFFFF) + u64::from(b & 0xFFFF);
    fold(hi, lo)
}

fn fold(mut hi: u64, mut lo: u64) -> u32 {
    loop {
        let hicarry = hi >> 16;
        let locarry = lo >> 16;
        if hicarry == 0 && locarry == 0 {
            break;
        }
        hi = (hi & 0xFFFF) + locarry;
        lo = (lo & 0xFFFF) + hicarry;
    }
    ((hi << 16) | lo) as u32
}

/// Punctuation skipped by the encoding so the result is alphanumeric.
const EXCLUDED: [u8; 13] = [
    b':', b';', b'<', b'=', b'>', b'?', b'@', b'[', b'\\', b']', b'^', b'_', b'`',
];

const ASCII_ZERO: u8 = b'0';

/// Encode a checksum as 16 printable characters. With `complement`, the
/// complement is encoded, which is what a `CHECKSUM` card stores.
pub fn encode(sum: u32, complement: bool) -> [u8; ENCODED_LEN] {
    let value = if complement { !sum } else { sum };
    let mut interleaved = [0u8; ENCODED_LEN];

    for (i, byte) in value.to_be_bytes().into_iter().enumerate() {
        let quotient = byte / 4 + ASCII_ZERO;
        let mut ch = [quotient; 4];
        ch[0] += byte % 4;

        for j in (0..4).step_by(2) {
            while EXCLUDED.contains(&ch[j]) || EXCLUDED.contains(&ch[j + 1]) {
                ch[j] += 1;
                ch[j + 1] -= 1;
            }
        }

        for (j, c) in ch.into_iter().enumerate() {
            interleaved[4 * j + i] = c;
        }
    }

    // Rotate right by one so the value lines up with a card's column 12.
    let mut out = [0u8; ENCODED_LEN];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = interleaved[(i + ENCODED_LEN - 1) % ENCODED_LEN];
    }
    out
}

/// Decode a 16-character encoded checksum.
pub fn decode(encoded: &[u8; ENCODED_LEN], complement: bool) -> u32 {
    let mut hi = 0u64;
    let mut lo = 0u64;
    for group in 0..4 {
        let at = |k: usize| {
            u64::from(encoded[(group * 4 + k + 1) % ENCODED_LEN].wrapping_sub(ASCII_ZERO))
        };
        hi += (at(0) << 8) + at(1);
        lo += (at(2) << 8) + at(3);
    }
    let sum = fold(hi, lo);
    if complement {
        !sum
    } else {
        sum
    }
}

/// True when `text` could be an encoded checksum: 16 characters drawn from
/// the encoding's alphabet.
pub fn is_well_formed(text: &str) -> bool {
    text.len() == ENCODED_LEN
        && text.bytes().all(|b| b.is_ascii_alphanumeric())
}
