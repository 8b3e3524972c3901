//! Tolerant access to FITS files.
//!
//! Unlike a conventional reader, nothing here rejects a file for breaking
//! the standard: cards are tokenized with their lexical issues attached,
//! HDUs are located as far as the bytes allow, and the caller decides what
//! each irregularity means.

pub mod block;
pub mod card;
pub mod checksum;
pub mod column;
pub mod error;
pub mod hdu;
pub mod pixels;
pub mod reader;
pub mod source;
pub mod value;
pub mod writer;

pub use block::{BLOCK_SIZE, CARDS_PER_BLOCK, CARD_SIZE};
pub use card::{Card, CardIssue};
pub use error::{AccessError, Result};
pub use hdu::{DataDescriptor, Extent, Hdu, HduKind};
pub use reader::HduReader;
pub use source::{AccessLayer, AccessSession, Source};
pub use value::{Value, ValueIssue};
