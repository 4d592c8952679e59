//! Error types for strata_core operations.

use thiserror::Error;

/// Core error type for strata_core operations.
#[derive(Error, Debug)]
pub enum StrataError {
    /// The hash algorithm tag is not recognized.
    #[error("invalid hash algorithm: {0:?}")]
    InvalidHashAlgorithm(String),

    /// Path traversal missed a step while resolving a document.
    #[error("document not found: {0}")]
    DocumentNotFound(String),

    /// A branch-pointer precondition (claim or compare-and-swap) failed.
    #[error("invalid old reference for pointer {0}")]
    InvalidOldRef(String),

    /// The changeset carries more than one parent commit.
    #[error("cannot apply a changeset with {0} parents: merge commits are unsupported")]
    MergeUnsupported(usize),

    /// The key was not found in the KV store.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// A referenced object could not be resolved from the staging map or the KV.
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    /// Empty keys are rejected by every KV operation.
    #[error("empty key")]
    EmptyKey,

    /// Serialization error while encoding a record.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error on a malformed blob.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// A document id string is not a valid k-sortable id.
    #[error("invalid document id: {0}")]
    InvalidDocumentId(String),

    /// Configuration error (loading, parsing, invalid values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Error from the underlying storage engine.
    #[error("storage error: {0}")]
    Storage(String),

    /// I/O error during hashing or file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type for strata_core operations.
pub type Result<T> = std::result::Result<T, StrataError>;
