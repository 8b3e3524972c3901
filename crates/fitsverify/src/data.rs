//! Data-unit checks: checksums, fill bytes and value sanity.

use fits_access::block::{
    first_non_fill, ASCII_TABLE_FILL_BYTE, CARD_SIZE, DATA_FILL_BYTE, HEADER_FILL_BYTE,
};
use fits_access::checksum::{self, NEGATIVE_ZERO};
use fits_access::column::{
    parse_ascii_tform, parse_binary_tform, AsciiFormat, BinaryFormat, BinaryType,
};
use fits_access::pixels::{decode_pixels, Pixels};
use fits_access::{Extent, Hdu, HduKind};
use tracing::debug;

use crate::aggregate::Aggregator;
use crate::catalog::codes::*;

/// Whether the data unit was fully available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataOutcome {
    Checked,
    /// The source ends inside the data unit.
    Truncated,
}

/// Run the enabled data checks for one HDU whose header was read.
pub fn validate_data(hdu: &Hdu, bytes: &[u8], agg: &mut Aggregator<'_>) -> DataOutcome {
    if let Extent::DataTruncated { expected, available } = hdu.extent {
        agg.rule(
            TRUNCATED_FILE,
            hdu.index,
            format!("data unit needs {expected} bytes but the file ends after {available}"),
        );
        return DataOutcome::Truncated;
    }

    let options = *agg.options();
    debug!(hdu = hdu.index, len = ?hdu.data.byte_len, "checking data");
    if options.test_checksum {
        checksums(hdu, bytes, agg);
    }
    if options.test_fill {
        fill(hdu, bytes, agg);
    }
    if options.test_data {
        match hdu.kind {
            HduKind::Primary | HduKind::Image => image_values(hdu, bytes, agg),
            HduKind::BinaryTable => binary_table_values(hdu, bytes, agg),
            HduKind::AsciiTable => ascii_table_values(hdu, bytes, agg),
            HduKind::RandomGroups | HduKind::Other(_) => {}
        }
    }
    DataOutcome::Checked
}

// ---- checksums ----

fn checksums(hdu: &Hdu, bytes: &[u8], agg: &mut Aggregator<'_>) {
    let index = hdu.index;
    let checksum_card = hdu.card("CHECKSUM");
    let datasum_card = hdu.card("DATASUM");
    if checksum_card.is_none() && datasum_card.is_none() {
        agg.rule(CHECKSUM_MISSING, index, "HDU has no CHECKSUM or DATASUM keyword");
        return;
    }

    let mut data_verified = None;
    if let Some(card) = datasum_card {
        match card.string().and_then(|s| s.trim().parse::<u32>().ok()) {
            Some(stored) => {
                let actual = checksum::ones_complement_sum(hdu.padded_data_bytes(bytes), 0);
                if stored == actual {
                    data_verified = Some(true);
                } else {
                    agg.rule(
                        DATASUM_MISMATCH,
                        index,
                        format!("data checksum mismatch: DATASUM = {stored}, computed {actual}"),
                    );
                    data_verified = Some(false);
                }
            }
            None => agg.rule(
                CHECKSUM_MALFORMED,
                index,
                format!("DATASUM = {} is not a decimal checksum", card.value_text),
            ),
        }
    }

    let Some(card) = checksum_card else {
        return;
    };
    if !card.string().is_some_and(checksum::is_well_formed) {
        agg.rule(
            CHECKSUM_MALFORMED,
            index,
            format!("CHECKSUM = {} is not a 16-character encoded checksum", card.value_text),
        );
        return;
    }
    if data_verified == Some(false) {
        return;
    }
    let sum = checksum::ones_complement_sum(hdu.hdu_bytes(bytes), 0);
    if sum == NEGATIVE_ZERO {
        return;
    }
    if data_verified == Some(true) {
        agg.rule(
            HEADER_MODIFIED,
            index,
            "header modified after checksum computed: the data checksum matches but CHECKSUM \
             does not",
        );
    } else {
        agg.rule(
            CHECKSUM_MISMATCH,
            index,
            format!("HDU checksum mismatch: sum is 0x{sum:08X}, expected 0xFFFFFFFF"),
        );
    }
}

// ---- fill ----

fn fill(hdu: &Hdu, bytes: &[u8], agg: &mut Aggregator<'_>) {
    if let Some(i) = first_non_fill(hdu.header_fill(bytes), HEADER_FILL_BYTE) {
        let offset = hdu.header_offset + hdu.cards.len() * CARD_SIZE + i;
        agg.rule(
            HEADER_FILL,
            hdu.index,
            format!("header fill after END is not blank; first bad byte at offset {offset}"),
        );
    }

    let (fill_byte, what) = if hdu.kind == HduKind::AsciiTable {
        (ASCII_TABLE_FILL_BYTE, "blanks")
    } else {
        (DATA_FILL_BYTE, "zeros")
    };
    if let Some(i) = first_non_fill(hdu.data_fill(bytes), fill_byte) {
        let offset = hdu.data.byte_offset + hdu.data.byte_len.unwrap_or(0) + i;
        agg.rule(
            DATA_FILL,
            hdu.index,
            format!("data fill is not all {what}; first bad byte at offset {offset}"),
        );
    }
}

// ---- values ----

fn integer_range(pixels: &Pixels) -> Option<(i64, i64)> {
    match pixels {
        Pixels::U8(_) => Some((0, 255)),
        Pixels::I16(_) => Some((i16::MIN.into(), i16::MAX.into())),
        Pixels::I32(_) => Some((i32::MIN.into(), i32::MAX.into())),
        Pixels::I64(_) => Some((i64::MIN, i64::MAX)),
        Pixels::F32(_) | Pixels::F64(_) => None,
    }
}

fn for_each_integer(pixels: &Pixels, mut f: impl FnMut(i64)) {
    match pixels {
        Pixels::U8(v) => v.iter().for_each(|&x| f(x.into())),
        Pixels::I16(v) => v.iter().for_each(|&x| f(x.into())),
        Pixels::I32(v) => v.iter().for_each(|&x| f(x.into())),
        Pixels::I64(v) => v.iter().for_each(|&x| f(x)),
        Pixels::F32(_) | Pixels::F64(_) => {}
    }
}

fn image_values(hdu: &Hdu, bytes: &[u8], agg: &mut Aggregator<'_>) {
    let Some(bitpix) = hdu.data.bitpix else {
        return;
    };
    let Some(pixels) = decode_pixels(hdu.data_bytes(bytes), bitpix) else {
        return;
    };
    if pixels.is_empty() {
        return;
    }
    let index = hdu.index;

    let infinite = match &pixels {
        Pixels::F32(v) => v.iter().filter(|x| x.is_infinite()).count(),
        Pixels::F64(v) => v.iter().filter(|x| x.is_infinite()).count(),
        _ => 0,
    };
    if infinite > 0 {
        agg.rule(
            NONFINITE_FLOAT,
            index,
            format!("{infinite} of {} pixels are infinite", pixels.len()),
        );
    }

    let Some((min, max)) = integer_range(&pixels) else {
        return;
    };
    let blank = hdu.integer("BLANK");
    if let Some(blank) = blank.filter(|b| !(min..=max).contains(b)) {
        agg.rule(
            BLANK_OUT_OF_RANGE,
            index,
            format!("BLANK = {blank} cannot be stored with BITPIX = {bitpix}"),
        );
    }

    // Declared ranges describe stored values only when no scaling applies.
    let scaled = hdu.number("BSCALE").is_some_and(|s| s != 1.0)
        || hdu.number("BZERO").is_some_and(|z| z != 0.0);
    if scaled {
        return;
    }
    let datamin = hdu.number("DATAMIN");
    let datamax = hdu.number("DATAMAX");
    let type_min = min as f64;
    let type_max = max as f64;
    let outside_type = |d: f64| d < type_min || d > type_max;
    if datamin.is_some_and(outside_type) || datamax.is_some_and(outside_type) {
        agg.rule(
            DECLARED_RANGE_EXCEEDS_TYPE,
            index,
            format!("DATAMIN/DATAMAX lie outside the range of BITPIX = {bitpix}"),
        );
        return;
    }
    if datamin.is_none() && datamax.is_none() {
        return;
    }
    let low = datamin.unwrap_or(f64::NEG_INFINITY);
    let high = datamax.unwrap_or(f64::INFINITY);
    let mut outside = 0usize;
    for_each_integer(&pixels, |x| {
        if Some(x) != blank && !(low..=high).contains(&(x as f64)) {
            outside += 1;
        }
    });
    if outside > 0 {
        agg.rule(
            DATA_OUTSIDE_DECLARED_RANGE,
            index,
            format!("{outside} pixels lie outside DATAMIN..DATAMAX"),
        );
    }
}

/// Column formats of a binary table, when they are all valid and fill the row.
fn binary_columns(hdu: &Hdu, row_width: usize) -> Option<Vec<(usize, BinaryFormat)>> {
    let tfields = usize::try_from(hdu.integer("TFIELDS")?).ok()?;
    let mut columns = Vec::with_capacity(tfields);
    let mut offset = 0usize;
    for n in 1..=tfields {
        let format = parse_binary_tform(hdu.string(&format!("TFORM{n}"))?).ok()?;
        columns.push((offset, format));
        offset = offset.checked_add(format.width())?;
    }
    (offset == row_width).then_some(columns)
}

fn binary_table_values(hdu: &Hdu, bytes: &[u8], agg: &mut Aggregator<'_>) {
    let (Some(&row_width), Some(&rows)) = (hdu.data.axes.first(), hdu.data.axes.get(1)) else {
        return;
    };
    let Some(columns) = binary_columns(hdu, row_width) else {
        return;
    };
    let data = hdu.data_bytes(bytes);
    let table = move || data.chunks_exact(row_width.max(1)).take(rows);
    let mut bad_logical = 0usize;
    let mut bad_chars = 0usize;

    for (n, &(offset, format)) in columns.iter().enumerate() {
        let column = n + 1;
        let end = offset + format.width();
        let fields = table().map(move |row| &row[offset..end]);
        match format.kind {
            BinaryType::Logical => {
                bad_logical += fields
                    .flatten()
                    .filter(|&&b| !matches!(b, b'T' | b'F' | 0))
                    .count();
            }
            BinaryType::Ascii => {
                bad_chars += fields
                    .flatten()
                    .filter(|&&b| b != 0 && !(0x20..=0x7e).contains(&b))
                    .count();
            }
            BinaryType::Bit => bit_justification(hdu.index, column, format, fields, agg),
            BinaryType::VarArrayP | BinaryType::VarArrayQ => {
                array_descriptors(hdu, column, format, fields, agg);
            }
            _ => {}
        }
    }

    if bad_logical > 0 {
        agg.rule(
            BAD_LOGICAL_DATA,
            hdu.index,
            format!("{bad_logical} logical column values are not 'T', 'F' or 0"),
        );
    }
    if bad_chars > 0 {
        agg.rule(
            NONASCII_DATA,
            hdu.index,
            format!("{bad_chars} bytes in character columns are not printable ASCII"),
        );
    }
}

/// Bits past the declared count in the last byte of an `X` field must be zero.
fn bit_justification<'a>(
    index: usize,
    column: usize,
    format: BinaryFormat,
    fields: impl Iterator<Item = &'a [u8]>,
    agg: &mut Aggregator<'_>,
) {
    let used = format.repeat % 8;
    if used == 0 {
        return;
    }
    let unused = 0xFFu8 >> used;
    let mut bad = 0usize;
    let mut first = None;
    for (row, field) in fields.enumerate() {
        if field.last().is_some_and(|&b| b & unused != 0) {
            bad += 1;
            first.get_or_insert(row + 1);
        }
    }
    if let Some(row) = first {
        agg.rule(
            BIT_NOT_JUSTIFIED,
            index,
            format!(
                "{bad} rows of column {column} set bits past the {} declared by TFORM{column}; \
                 first at row {row}",
                format.repeat
            ),
        );
    }
}

/// Check each `P`/`Q` descriptor against the TFORM maximum and the heap size.
fn array_descriptors<'a>(
    hdu: &Hdu,
    column: usize,
    format: BinaryFormat,
    fields: impl Iterator<Item = &'a [u8]>,
    agg: &mut Aggregator<'_>,
) {
    let Some(array) = format.array else {
        return;
    };
    let heap = hdu.data.pcount as u64;
    let mut too_long = 0usize;
    let mut first_too_long = None;
    let mut outside = 0usize;
    let mut first_outside = None;

    for (row, field) in fields.enumerate() {
        for (len, offset) in format.descriptors(field) {
            if let Some(max) = array.max.filter(|&max| len > max as u64) {
                too_long += 1;
                first_too_long.get_or_insert((row + 1, len, max));
            }
            let end = array.heap_len(len).and_then(|n| n.checked_add(offset));
            if !end.is_some_and(|end| end <= heap) {
                outside += 1;
                first_outside.get_or_insert((row + 1, len, offset));
            }
        }
    }

    if let Some((row, len, max)) = first_too_long {
        agg.rule(
            VAR_EXCEEDS_MAXLEN,
            hdu.index,
            format!(
                "{too_long} descriptors of column {column} exceed the maximum length {max} \
                 given by TFORM{column}; row {row} holds {len} elements"
            ),
        );
    }
    if let Some((row, len, offset)) = first_outside {
        agg.rule(
            VAR_EXCEEDS_HEAP,
            hdu.index,
            format!(
                "{outside} descriptors of column {column} point past the {heap}-byte heap; \
                 row {row} has {len} elements at offset {offset}"
            ),
        );
    }
}

fn ascii_table_values(hdu: &Hdu, bytes: &[u8], agg: &mut Aggregator<'_>) {
    let size = hdu.data.axes.iter().product::<usize>();
    let data = hdu.data_bytes(bytes);
    let table = &data[..size.min(data.len())];
    let bad = table.iter().filter(|&&b| b > 0x7f).count();
    if bad > 0 {
        agg.rule(
            NONASCII_TABLE,
            hdu.index,
            format!("{bad} bytes in the ASCII table are not 7-bit ASCII"),
        );
    }

    let Some(&row_width) = hdu.data.axes.first() else {
        return;
    };
    let tfields = hdu
        .integer("TFIELDS")
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(0);
    for n in 1..=tfields {
        let Some(format) = hdu
            .string(&format!("TFORM{n}"))
            .and_then(|tform| parse_ascii_tform(tform).ok())
        else {
            continue;
        };
        let floating = matches!(
            format,
            AsciiFormat::FloatF(..) | AsciiFormat::FloatE(..) | AsciiFormat::DoubleE(..)
        );
        if !floating {
            continue;
        }
        let Some(start) = hdu
            .integer(&format!("TBCOL{n}"))
            .and_then(|col| usize::try_from(col).ok())
            .and_then(|col| col.checked_sub(1))
        else {
            continue;
        };
        let end = start.saturating_add(format.width());
        let null = hdu.string(&format!("TNULL{n}")).map(str::trim);
        let fields = table
            .chunks_exact(row_width.max(1))
            .filter_map(|row| row.get(start..end));
        numeric_fields(hdu.index, n, fields, null, agg);
    }
}

/// Floating-point fields of an ASCII table need a decimal point and no
/// inner blanks. Only the first offending row is reported.
fn numeric_fields<'a>(
    index: usize,
    column: usize,
    fields: impl Iterator<Item = &'a [u8]>,
    null: Option<&str>,
    agg: &mut Aggregator<'_>,
) {
    let mut no_decimal = None;
    let mut embedded_space = None;
    for (row, field) in fields.enumerate() {
        let value = field.trim_ascii();
        if value.is_empty() || null.is_some_and(|null| null.as_bytes() == value) {
            continue;
        }
        if no_decimal.is_none() && !value.contains(&b'.') {
            no_decimal = Some((row + 1, value));
        }
        if embedded_space.is_none() && value.contains(&b' ') {
            embedded_space = Some((row + 1, value));
        }
    }
    if let Some((row, value)) = no_decimal {
        agg.rule(
            NO_DECIMAL,
            index,
            format!(
                "number in row {row}, column {column} has no decimal point: '{}'",
                String::from_utf8_lossy(value)
            ),
        );
    }
    if let Some((row, value)) = embedded_space {
        agg.rule(
            EMBEDDED_SPACE,
            index,
            format!(
                "number in row {row}, column {column} has an embedded space: '{}'",
                String::from_utf8_lossy(value)
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::config::Options;
    use crate::finding::{Finding, Severity};
    use crate::hints::HintBase;
    use fits_access::block::BLOCK_SIZE;
    use fits_access::writer::{quoted, FitsBuilder, HduBuilder};
    use fits_access::HduReader;

    fn check_with(bytes: &[u8], options: Options) -> Vec<Finding> {
        let mut seen = Vec::new();
        let mut sink = |f: &Finding| seen.push(f.clone());
        let catalog = Catalog::builtin().unwrap();
        let mut agg = Aggregator::new(options, catalog, HintBase::builtin(), &mut sink);
        for hdu in HduReader::new(bytes, "t").flatten() {
            validate_data(&hdu, bytes, &mut agg);
        }
        agg.finish();
        seen
    }

    fn check(bytes: &[u8]) -> Vec<u16> {
        check_with(bytes, Options::default())
            .iter()
            .map(|f| f.code)
            .collect()
    }

    fn be16(values: &[i16]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_be_bytes()).collect()
    }

    // ---- checksums ----

    #[test]
    fn stamped_hdu_is_clean() {
        let bytes = HduBuilder::primary_image(16, &[3])
            .data(be16(&[1, 2, 3]))
            .with_checksum()
            .to_bytes();
        assert!(check(&bytes).is_empty());
    }

    #[test]
    fn missing_checksums_warn() {
        let bytes = HduBuilder::primary_image(8, &[]).to_bytes();
        let found = check_with(&bytes, Options::default());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].code, CHECKSUM_MISSING);
        assert_eq!(found[0].severity, Severity::Warning);
    }

    #[test]
    fn altered_data_is_a_datasum_mismatch() {
        let mut bytes = HduBuilder::primary_image(8, &[4])
            .data(vec![1, 2, 3, 4])
            .with_checksum()
            .to_bytes();
        bytes[BLOCK_SIZE] = 9;
        assert_eq!(check(&bytes), vec![DATASUM_MISMATCH]);
        assert!(check_with(&bytes, Options::default().test_checksum(false)).is_empty());
    }

    #[test]
    fn altered_header_is_detected() {
        let mut bytes = HduBuilder::primary_image(8, &[4])
            .card("OBJECT", &quoted("M31"))
            .data(vec![1, 2, 3, 4])
            .with_checksum()
            .to_bytes();
        let at = 4 * 80 + 11;
        assert_eq!(bytes[at], b'M');
        bytes[at] = b'N';
        assert_eq!(check(&bytes), vec![HEADER_MODIFIED]);
    }

    #[test]
    fn checksum_without_datasum() {
        let mut bytes = HduBuilder::primary_image(8, &[4])
            .data(vec![1, 2, 3, 4])
            .with_checksum()
            .to_bytes();
        let hdu = HduReader::new(&bytes, "t").next().unwrap().unwrap();
        let position = hdu.card("DATASUM").unwrap().position;
        let start = (position - 1) * 80;
        bytes[start..start + 80].fill(b' ');
        assert_eq!(check(&bytes), vec![CHECKSUM_MISMATCH]);
    }

    #[test]
    fn malformed_checksum() {
        let bytes = HduBuilder::primary_image(8, &[])
            .card("CHECKSUM", &quoted("not-a-checksum"))
            .to_bytes();
        assert_eq!(check(&bytes), vec![CHECKSUM_MALFORMED]);
    }

    // ---- fill ----

    #[test]
    fn bad_data_fill() {
        let bytes = HduBuilder::primary_image(8, &[4])
            .data(vec![1, 2, 3, 4])
            .data_fill(b'x')
            .to_bytes();
        let found = check_with(&bytes, Options::default().test_checksum(false));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].code, DATA_FILL);
        assert!(found[0].message.contains(&format!("offset {}", BLOCK_SIZE + 4)));
    }

    #[test]
    fn bad_header_fill() {
        let bytes = HduBuilder::primary_image(8, &[]).header_fill(0).to_bytes();
        let options = Options::default().test_checksum(false);
        let found = check_with(&bytes, options);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].code, HEADER_FILL);
        assert!(check_with(&bytes, options.test_fill(false)).is_empty());
    }

    #[test]
    fn ascii_table_fill_is_blank() {
        let table = |fill: u8| {
            FitsBuilder::new()
                .hdu(HduBuilder::primary_image(8, &[]))
                .hdu(
                    HduBuilder::ascii_table(4, 1, &[("A", "A4", 1)])
                        .data(b"abcd".to_vec())
                        .data_fill(fill),
                )
                .to_bytes()
        };
        let options = Options::default().test_checksum(false);
        assert!(check_with(&table(b' '), options).is_empty());
        let found = check_with(&table(0), options);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].code, DATA_FILL);
    }

    // ---- values ----

    #[test]
    fn infinite_floats() {
        let data: Vec<u8> = [1.0f32, f32::INFINITY, f32::NAN, f32::NEG_INFINITY]
            .iter()
            .flat_map(|v| v.to_be_bytes())
            .collect();
        let bytes = HduBuilder::primary_image(-32, &[4]).data(data).to_bytes();
        let found = check_with(&bytes, Options::default().test_checksum(false));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].code, NONFINITE_FLOAT);
        assert_eq!(found[0].message, "2 of 4 pixels are infinite");
    }

    #[test]
    fn integer_ranges() {
        let options = Options::default().test_checksum(false);
        let blank = HduBuilder::primary_image(16, &[2])
            .card("BLANK", "40000")
            .data(be16(&[1, 2]))
            .to_bytes();
        assert_eq!(codes(check_with(&blank, options)), vec![BLANK_OUT_OF_RANGE]);

        let declared = HduBuilder::primary_image(8, &[2])
            .card("DATAMAX", "300")
            .data(vec![1, 2])
            .to_bytes();
        assert_eq!(codes(check_with(&declared, options)), vec![DECLARED_RANGE_EXCEEDS_TYPE]);

        let outside = HduBuilder::primary_image(16, &[3])
            .card("DATAMIN", "0")
            .card("DATAMAX", "10")
            .card("BLANK", "-1")
            .data(be16(&[-1, 5, 11]))
            .to_bytes();
        let found = check_with(&outside, options);
        assert_eq!(codes(found.clone()), vec![DATA_OUTSIDE_DECLARED_RANGE]);
        assert_eq!(found[0].message, "1 pixels lie outside DATAMIN..DATAMAX");
    }

    #[test]
    fn binary_table_columns() {
        let bytes = FitsBuilder::new()
            .hdu(HduBuilder::primary_image(8, &[]))
            .hdu(
                HduBuilder::binary_table(3, 2, &[("OK", "1L"), ("S", "2A")])
                    .data(b"TabFx\x01".to_vec()),
            )
            .to_bytes();
        let found = check_with(&bytes, Options::default().test_checksum(false));
        assert_eq!(codes(found), vec![NONASCII_DATA]);

        let bytes = FitsBuilder::new()
            .hdu(HduBuilder::primary_image(8, &[]))
            .hdu(
                HduBuilder::binary_table(3, 2, &[("OK", "1L"), ("S", "2A")])
                    .data(b"Xab\0\0\0".to_vec()),
            )
            .to_bytes();
        let found = check_with(&bytes, Options::default().test_checksum(false));
        assert_eq!(codes(found), vec![BAD_LOGICAL_DATA]);
    }

    #[test]
    fn ascii_table_high_bytes() {
        let bytes = FitsBuilder::new()
            .hdu(HduBuilder::primary_image(8, &[]))
            .hdu(
                HduBuilder::ascii_table(4, 1, &[("A", "A4", 1)])
                    .data(vec![b'a', 0xe9, b'b', b'c']),
            )
            .to_bytes();
        let found = check_with(&bytes, Options::default().test_checksum(false));
        assert_eq!(codes(found.clone()), vec![NONASCII_TABLE]);
        let options = Options::default().test_checksum(false).test_data(false);
        assert!(check_with(&bytes, options).is_empty());
    }

    // ---- variable-length arrays and bits ----

    /// One row holding a `1PJ(5)` descriptor and a `3X` byte, then the heap.
    fn array_table(descriptor: (i32, i32), bits: u8, heap: Vec<u8>) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&descriptor.0.to_be_bytes());
        data.extend_from_slice(&descriptor.1.to_be_bytes());
        data.push(bits);
        let pcount = heap.len();
        data.extend(heap);
        FitsBuilder::new()
            .hdu(HduBuilder::primary_image(8, &[]))
            .hdu(
                HduBuilder::binary_table(9, 1, &[("ARR", "1PJ(5)"), ("FLAGS", "3X")])
                    .set("PCOUNT", &pcount.to_string())
                    .data(data),
            )
            .to_bytes()
    }

    fn data_checks(bytes: &[u8]) -> Vec<Finding> {
        check_with(bytes, Options::default().test_checksum(false))
    }

    #[test]
    fn descriptor_past_heap_and_unjustified_bits() {
        let bytes = array_table((5, 1000), 0xFF, vec![0; 8]);
        let found = data_checks(&bytes);
        assert_eq!(codes(found.clone()), vec![VAR_EXCEEDS_HEAP, BIT_NOT_JUSTIFIED]);
        assert_eq!(found[0].severity, Severity::Error);
        assert_eq!(found[0].hdu_index, 1);
        assert!(found[0]
            .message
            .starts_with("1 descriptors of column 1 point past the 8-byte heap"));
        assert!(found[0].message.ends_with("row 1 has 5 elements at offset 1000"));
        assert!(found[1].message.contains("column 2"));

        let options = Options::default().test_checksum(false).test_data(false);
        assert!(check_with(&bytes, options).is_empty());
    }

    #[test]
    fn descriptor_longer_than_declared_max() {
        let bytes = array_table((7, 0), 0xE0, vec![0; 28]);
        let found = data_checks(&bytes);
        assert_eq!(codes(found.clone()), vec![VAR_EXCEEDS_MAXLEN]);
        assert!(found[0].message.contains("maximum length 5"));
        assert!(found[0].message.contains("7 elements"));
    }

    #[test]
    fn arrays_inside_the_heap_are_clean() {
        let heap: Vec<u8> = [1i32, 2, 3].iter().flat_map(|v| v.to_be_bytes()).collect();
        assert!(data_checks(&array_table((3, 0), 0xA0, heap)).is_empty());
        assert!(data_checks(&array_table((0, 0), 0, Vec::new())).is_empty());
    }

    // ---- ascii numbers ----

    #[test]
    fn ascii_numbers_need_a_decimal_point() {
        let rows: [&[u8]; 3] = [b"  1.50  1.2E+3", b"   150  1.0E+3", b"  1 .5        "];
        let bytes = FitsBuilder::new()
            .hdu(HduBuilder::primary_image(8, &[]))
            .hdu(
                HduBuilder::ascii_table(14, 3, &[("X", "F6.2", 1), ("Y", "E8.1", 7)])
                    .data(rows.concat()),
            )
            .to_bytes();
        let found = data_checks(&bytes);
        assert_eq!(codes(found.clone()), vec![NO_DECIMAL, EMBEDDED_SPACE]);
        assert_eq!(found[0].message, "number in row 2, column 1 has no decimal point: '150'");
        assert_eq!(
            found[1].message,
            "number in row 3, column 1 has an embedded space: '1 .5'"
        );
        assert!(found.iter().all(|f| f.severity == Severity::Warning));
    }

    #[test]
    fn ascii_null_and_text_fields_are_skipped() {
        let bytes = FitsBuilder::new()
            .hdu(HduBuilder::primary_image(8, &[]))
            .hdu(
                HduBuilder::ascii_table(10, 2, &[("X", "F6.2", 1), ("S", "A4", 7)])
                    .card("TNULL1", &quoted("NULL"))
                    .data(b"  NULL a b  2.25 cd ".to_vec()),
            )
            .to_bytes();
        assert!(data_checks(&bytes).is_empty());
    }

    // ---- truncation ----

    #[test]
    fn truncated_data_is_severe() {
        let bytes = HduBuilder::primary_image(8, &[100]).data(vec![1; 100]).to_bytes();
        let hdu = HduReader::new(&bytes[..BLOCK_SIZE + 50], "t").next().unwrap().unwrap();
        let mut seen = Vec::new();
        let mut sink = |f: &Finding| seen.push(f.clone());
        let catalog = Catalog::builtin().unwrap();
        let mut agg = Aggregator::new(Options::default(), catalog, HintBase::builtin(), &mut sink);
        let outcome = validate_data(&hdu, &bytes[..BLOCK_SIZE + 50], &mut agg);
        assert_eq!(outcome, DataOutcome::Truncated);
        agg.finish();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].code, TRUNCATED_FILE);
        assert_eq!(seen[0].severity, Severity::Severe);
    }

    fn codes(found: Vec<Finding>) -> Vec<u16> {
        found.into_iter().map(|f| f.code).collect()
    }
}
