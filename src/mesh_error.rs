//! MeshSieveError: Unified error type for the GMSH section readers.
//!
//! Every failure raised while locating, decoding or validating a mesh section
//! is reported through this enum and propagated unchanged to the caller of
//! the top-level read. There is no partial result: an `Err` means no mesh
//! data is available for that call.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for mesh-sieve-gmsh operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MeshSieveError {
    /// The `$Name` sigil was not found, even after rewinding the stream once.
    #[error("Couldn't find mesh section `{0}`")]
    SectionNotFound(String),
    /// The stream ran out before the `$EndName` sigil was read.
    #[error("Read to end of stream without finding section end `{0}`")]
    PrematureEnd(String),
    /// The token following the section body was not the closing sigil.
    #[error("The {section} section was read incorrectly: expected `{expected}`, found `{found}`")]
    SectionEndMismatch {
        section: String,
        expected: String,
        found: String,
    },
    /// The number of records decoded does not match what the partition expects.
    #[error("The number of {section} records does not match expectation: expected {expected}, read {found}")]
    RetainedCountMismatch {
        section: String,
        expected: usize,
        found: usize,
    },
    /// A retained tag lies outside the declared `[min_tag, max_tag]` range.
    #[error("{section} tag {tag} lies outside the declared range [{min_tag}, {max_tag}]")]
    RangeViolation {
        section: String,
        tag: usize,
        min_tag: usize,
        max_tag: usize,
    },
    /// Dense numbering was declared but sorted tags are not unit-strided.
    #[error("Expected contiguous {0} indices, yet sorted indices were non-contiguous")]
    ContiguityViolation(String),
    /// Sparse numbering was declared and a repeated tag was found.
    #[error("Expected non-contiguous {0} indices: duplicate indices were found")]
    DuplicateIndex(String),
    /// The MeshFormat version differs from the configured one.
    #[error("GMSH mesh format in file != expected version: {found} vs {expected}")]
    VersionMismatch { expected: String, found: String },
    /// A boolean flag token was neither `"0"` nor `"1"`.
    #[error("Can't convert string to bool: `{0}`")]
    MalformedBoolean(String),
    /// Binary payloads must carry 8-byte floating-point values.
    #[error("Unsupported floating point width in binary mesh: {0} bytes")]
    UnsupportedFloatWidth(usize),
    /// An element type with unknown node count was encountered.
    #[error("Unsupported element type: {0}")]
    UnsupportedElementType(i32),
    /// The `{rank, size}` descriptor is not usable.
    #[error("Invalid parallel environment: rank {rank} of size {size}")]
    InvalidParallel { rank: usize, size: usize },
    /// The mesh file does not exist.
    #[error("Could not find mesh file {0:?}")]
    MissingFile(PathBuf),
    /// The path does not point at a mesh this crate understands.
    #[error("Unknown mesh format: {0}")]
    UnknownFormat(String),
    /// Malformed token or line inside a section.
    #[error("Mesh I/O parse error: {0}")]
    MeshIoParse(String),
    /// Underlying I/O failure (message only, to keep the error `Clone`).
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for MeshSieveError {
    fn from(err: std::io::Error) -> Self {
        MeshSieveError::Io(err.to_string())
    }
}
