//! Error types for manifest extraction.
//!
//! Every variant except [`Error::Resolver`] is local to a single embedded
//! image: the extractor logs it and moves on to the next image.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// An index derived from the export directory points past the exports buffer.
    #[error("parsing the executable generated an invalid index: {index:#x} (buffer is {len:#x} bytes)")]
    InvalidIndex { index: u64, len: usize },

    /// A marker offset or the declared payload length reaches past the data region.
    #[error("the {symbol} symbol overflows the data region: end {end:#x} > {len:#x}")]
    BoundsViolation {
        symbol: &'static str,
        end: u64,
        len: usize,
    },

    /// The region holding the payload is absent from the image.
    #[error("{0} region missing from the image")]
    SectionMissing(&'static str),

    /// The container was recognised but its headers could not be read.
    #[error("malformed container: {0}")]
    Object(#[from] object::read::Error),

    /// The payload is not a valid gzip stream.
    #[error("could not decompress the embedded SBOM: {0}")]
    Decompress(#[source] std::io::Error),

    /// The decompressed payload does not match the CycloneDX shape.
    #[error("could not parse the embedded SBOM: {0}")]
    Json(#[from] serde_json::Error),

    /// No readable image could be obtained for the file at all.
    #[error("unable to read {path}: {reason}")]
    Resolver { path: String, reason: String },
}

impl Error {
    /// Soft errors abort only the image that produced them.
    pub fn is_soft(&self) -> bool {
        !matches!(self, Error::Resolver { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
