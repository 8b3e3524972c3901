use std::path::PathBuf;

/// Failures of the access layer itself. Rule violations inside a readable
/// file are not errors here; they surface through [`crate::card::CardIssue`]
/// and [`crate::hdu::Extent`].
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    /// The file could not be opened or read.
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The source holds no bytes at all.
    #[error("source {0} is empty")]
    Empty(String),
    /// The first card is not `SIMPLE`.
    #[error("source {0} does not begin with a SIMPLE card; not a FITS file")]
    NotFits(String),
    /// Bytes follow the last HDU that do not begin a new extension.
    #[error("{len} extra bytes after the last HDU at offset {offset}")]
    TrailingBytes { offset: usize, len: usize },
    /// A `TFORMn` value could not be parsed.
    #[error("invalid TFORM value '{0}'")]
    InvalidTform(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, AccessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_trailing_bytes() {
        let e = AccessError::TrailingBytes {
            offset: 5760,
            len: 12,
        };
        assert_eq!(e.to_string(), "12 extra bytes after the last HDU at offset 5760");
    }

    #[test]
    fn display_io_names_path() {
        let e = AccessError::Io {
            path: PathBuf::from("/no/such.fits"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert_eq!(e.to_string(), "cannot read /no/such.fits: not found");
    }

    #[test]
    fn io_error_has_source() {
        use std::error::Error as _;
        let e = AccessError::Io {
            path: PathBuf::from("x"),
            source: std::io::Error::other("boom"),
        };
        assert!(e.source().is_some());
    }

    #[test]
    fn display_not_fits() {
        assert_eq!(
            AccessError::NotFits("<memory>".into()).to_string(),
            "source <memory> does not begin with a SIMPLE card; not a FITS file"
        );
    }
}
