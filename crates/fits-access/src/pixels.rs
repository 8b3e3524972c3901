//! Decoding of big-endian image arrays.

/// Decoded pixel values in native byte order.
#[derive(Debug, Clone, PartialEq)]
pub enum Pixels {
    U8(Vec<u8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl Pixels {
    pub fn len(&self) -> usize {
        match self {
            Pixels::U8(v) => v.len(),
            Pixels::I16(v) => v.len(),
            Pixels::I32(v) => v.len(),
            Pixels::I64(v) => v.len(),
            Pixels::F32(v) => v.len(),
            Pixels::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True for floating-point pixel types.
    pub fn is_float(&self) -> bool {
        matches!(self, Pixels::F32(_) | Pixels::F64(_))
    }
}

/// Decode `raw` big-endian bytes as an array of the given BITPIX.
///
/// Returns `None` for an illegal BITPIX. A trailing partial element is
/// ignored.
pub fn decode_pixels(raw: &[u8], bitpix: i64) -> Option<Pixels> {
    let whole = |size: usize| &raw[..raw.len() - raw.len() % size];
    let pixels = match bitpix {
        8 => Pixels::U8(raw.to_vec()),
        16 => {
            let v: Vec<i16> = bytemuck::pod_collect_to_vec(whole(2));
            Pixels::I16(v.into_iter().map(i16::from_be).collect())
        }
        32 => {
            let v: Vec<i32> = bytemuck::pod_collect_to_vec(whole(4));
            Pixels::I32(v.into_iter().map(i32::from_be).collect())
        }
        64 => {
            let v: Vec<i64> = bytemuck::pod_collect_to_vec(whole(8));
            Pixels::I64(v.into_iter().map(i64::from_be).collect())
        }
        -32 => {
            let v: Vec<u32> = bytemuck::pod_collect_to_vec(whole(4));
            Pixels::F32(v.into_iter().map(|b| f32::from_bits(u32::from_be(b))).collect())
        }
        -64 => {
            let v: Vec<u64> = bytemuck::pod_collect_to_vec(whole(8));
            Pixels::F64(v.into_iter().map(|b| f64::from_bits(u64::from_be(b))).collect())
        }
        _ => return None,
    };
    Some(pixels)
}
