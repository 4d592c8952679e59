//! Deterministic encoding of structured records.
//!
//! One process-wide codec handles every record that gets content-addressed,
//! so equal records produce identical bytes (and therefore identical hashes)
//! across platforms. postcard gives compact, deterministic output; lists with
//! a sort invariant are sorted by construction before they ever reach the
//! encoder.

use crate::blob::Blob;
use crate::error::{Result, StrataError};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encodes a record into its canonical blob form.
pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Blob> {
    let bytes =
        postcard::to_allocvec(value).map_err(|e| StrataError::Serialization(e.to_string()))?;
    Ok(Blob::new(bytes))
}

/// Decodes a record from a blob.
pub(crate) fn decode<T: DeserializeOwned>(blob: &Blob) -> Result<T> {
    postcard::from_bytes(blob.as_bytes())
        .map_err(|e| StrataError::Deserialization(e.to_string()))
}
