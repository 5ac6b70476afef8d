//! Error types for catalog loading, matching, quantization and pattern building.

use thiserror::Error;

/// The thread catalog source could not be turned into a valid catalog.
/// Fatal at startup.
#[derive(Error, Debug)]
pub enum CatalogLoadError {
    /// Source is not valid JSON or a record is missing a required field
    #[error("Malformed catalog: {0}")]
    Malformed(#[from] serde_json::Error),

    /// I/O error while reading a catalog file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Brand name not one of the supported manufacturers
    #[error("Unknown brand '{brand}' for thread '{thread_id}'")]
    UnknownBrand { thread_id: String, brand: String },

    /// Required string field present but empty
    #[error("Missing required field '{field}' for thread '{thread_id}'")]
    MissingField { thread_id: String, field: &'static str },

    /// RGB channel outside 0..=255
    #[error("RGB value {value} out of range for thread '{thread_id}'")]
    RgbOutOfRange { thread_id: String, value: i64 },

    /// Two entries of one brand share a colour code
    #[error("Duplicate color code '{code}' for brand {brand}")]
    DuplicateCode { brand: String, code: String },

    /// Two entries share a thread id
    #[error("Duplicate thread id '{0}'")]
    DuplicateId(String),
}

/// Errors from nearest-thread lookups.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    /// Nothing to match against, even after inventory fallback.
    /// Signals a catalog data gap.
    #[error("No candidate threads to match against")]
    EmptyCandidateSet,

    /// Source thread of a brand conversion does not exist
    #[error("Thread {brand} {code} not found in catalog")]
    UnknownThread { brand: String, code: String },

    /// Brand is not known or has no threads in the catalog
    #[error("Unsupported thread brand '{0}'")]
    UnsupportedBrand(String),
}

/// Errors from palette quantization.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantizeError {
    #[error("Cannot quantize an empty pixel set")]
    EmptyInput,

    #[error("Cluster count must be greater than 0")]
    ZeroClusters,
}

/// Errors returned by [`crate::PatternBuilder::build`]. No partial artifact
/// is ever produced alongside an error.
#[derive(Error, Debug)]
pub enum PatternError {
    /// Empty image or zero dimension
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// Requested brand unknown or absent from the catalog
    #[error("Unsupported thread brand '{0}'")]
    UnsupportedBrand(String),

    /// Configuration value outside its accepted range
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Match(#[from] MatchError),

    #[error(transparent)]
    Quantize(#[from] QuantizeError),
}
