//! Fixture files shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use fits_access::writer::{quoted, FitsBuilder, HduBuilder};
use fitsverify::{AccessLayer, Context, Options, Report, Source};

/// A context with its own access layer, so tests can run in parallel.
pub fn context(options: Options) -> Context {
    Context::with_access_layer(Arc::new(AccessLayer::new())).with_options(options)
}

pub fn verify(options: Options, bytes: &[u8]) -> Report {
    context(options)
        .verify_collect(&Source::memory(bytes))
        .expect("verification runs")
}

pub fn codes(report: &Report) -> Vec<u16> {
    report.findings.iter().filter(|f| f.code != 0).map(|f| f.code).collect()
}

/// 4x4 16-bit primary array with ramp values, checksums stamped.
pub fn clean_primary() -> HduBuilder {
    let data: Vec<u8> = (0..16i16).flat_map(i16::to_be_bytes).collect();
    HduBuilder::primary_image(16, &[4, 4])
        .card("DATE", &quoted("2024-03-01T12:00:00"))
        .data(data)
        .with_checksum()
}

/// Header-only primary, checksums stamped.
pub fn empty_primary() -> HduBuilder {
    HduBuilder::primary_image(8, &[]).with_checksum()
}

/// Small named image extension, checksums stamped.
pub fn named_image(name: &str) -> HduBuilder {
    HduBuilder::image_extension(8, &[4])
        .card("EXTNAME", &quoted(name))
        .data(vec![1, 2, 3, 4])
        .with_checksum()
}

/// Binary table with a logical, a string and an integer column.
pub fn events_table() -> HduBuilder {
    let mut data = Vec::new();
    for (flag, name, value) in [(b'T', b"ab", 1i32), (b'F', b"cd", -7), (b'T', b"ef", 42)] {
        data.push(flag);
        data.extend_from_slice(name);
        data.extend_from_slice(&value.to_be_bytes());
    }
    HduBuilder::binary_table(7, 3, &[("FLAG", "1L"), ("NAME", "2A"), ("VALUE", "1J")])
        .card("EXTNAME", &quoted("EVENTS"))
        .data(data)
        .with_checksum()
}

/// A file that should verify without any warning or error.
pub fn clean_file() -> Vec<u8> {
    FitsBuilder::new()
        .hdu(clean_primary())
        .hdu(events_table())
        .hdu(named_image("SCI"))
        .to_bytes()
}

/// Image extension whose header carries `bad_cards` illegal keyword names.
pub fn noisy_image(name: &str, bad_cards: usize) -> HduBuilder {
    let mut hdu = HduBuilder::image_extension(8, &[]).card("EXTNAME", &quoted(name));
    for i in 0..bad_cards {
        hdu = hdu.raw(&format!("{:<8}= {:>20}", format!("key{i}"), i));
    }
    hdu.with_checksum()
}
