//! The error kinds a query or schema operation can fail with.
//!
//! Every variant here corresponds to one row of the error table in the
//! design document's error-handling section; the policy for each (fail the
//! call, fail submit, return INCOMPLETE, ...) is enforced by the caller of
//! that variant, not by this type itself.

use tiledb_common::datatype::Datatype;
use tiledb_common::filter::FilterError;

/// A coordinate value formatted for inclusion in an error message.
pub type DisplayCoord = String;

#[derive(Clone, Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid range on dimension `{dimension}`: {reason}")]
    InvalidRange { dimension: String, reason: String },

    #[error("range [{lo}, {hi}] on dimension `{dimension}` is outside the domain")]
    OOBError {
        dimension: String,
        lo: DisplayCoord,
        hi: DisplayCoord,
    },

    #[error("invalid layout: {0}")]
    InvalidLayout(String),

    #[error("write coordinate {coord} is outside the domain of dimension `{dimension}`")]
    BoundsError { dimension: String, coord: DisplayCoord },

    #[error("unknown field `{0}`")]
    UnknownName(String),

    #[error("buffer for `{field}` is too small to hold even a single cell")]
    BufferOverflow { field: String },

    #[error("partition for `{field}` cannot be split further but still overflows the memory budget")]
    UnsplittableOverflow { field: String },

    #[error("I/O error reading `{uri}`: {reason}")]
    IOError { uri: String, reason: String },

    #[error("codec error: {0}")]
    CodecError(#[from] FilterError),

    #[error("format error: {0}")]
    FormatError(String),

    #[error("corrupt fragment metadata for `{uri}`: {reason}")]
    MetadataError { uri: String, reason: String },

    #[error("finalize() called on a global-order write with {written} cells, not a multiple of the tile size {tile_size}")]
    IncompleteWrite { written: usize, tile_size: usize },

    #[error("datatype mismatch: expected {expected}, found {found}")]
    DatatypeMismatch { expected: Datatype, found: Datatype },

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
