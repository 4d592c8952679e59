//! Blobs, content hashes, and blob references.
//!
//! Every persisted record is ultimately a [`Blob`] keyed in the KV by the
//! textual form of its own content hash, so equal content is stored once and
//! a reference can always be checked against the bytes it points at.

use crate::codec;
use crate::error::{Result, StrataError};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::str::FromStr;

/// Hash algorithm used for all newly created references.
pub const DEFAULT_HASH_ALG: HashAlg = HashAlg::Blake3;

/// Capability for records that can be rendered into a content-addressed blob.
///
/// Commits, directory nodes, and references all need "encode, hash, buffer"
/// behavior; implementing this trait is what makes a record storable.
pub trait ToBlob {
    /// Encodes the record into its canonical blob form.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if the codec rejects the record. For the
    /// fixed codec and well-formed in-memory records this does not happen.
    fn to_blob(&self) -> Result<Blob>;
}

/// An opaque byte sequence; the fundamental unit of storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blob {
    content: Vec<u8>,
}

impl Blob {
    /// Wraps raw bytes in a blob.
    pub fn new(content: Vec<u8>) -> Self {
        Self { content }
    }

    /// Returns the blob's bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.content
    }

    /// True if the blob carries no bytes.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Number of bytes in the blob.
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// Computes this blob's reference under the given algorithm.
    pub fn ref_with(&self, alg: HashAlg) -> Result<BlobRef> {
        alg.compute_bytes(&self.content)
    }
}

impl From<&str> for Blob {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for Blob {
    fn from(content: Vec<u8>) -> Self {
        Self::new(content)
    }
}

impl From<&[u8]> for Blob {
    fn from(content: &[u8]) -> Self {
        Self::new(content.to_vec())
    }
}

impl ToBlob for Blob {
    fn to_blob(&self) -> Result<Blob> {
        Ok(self.clone())
    }
}

/// Enumerated tag identifying a cryptographic hash function.
///
/// Unrecognized tags fail closed: they cannot compute references and they
/// cannot be parsed.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum HashAlg {
    /// Absence of an algorithm; appears only inside a zero [`BlobRef`].
    #[default]
    #[serde(rename = "")]
    None,

    /// 256-bit BLAKE3.
    #[serde(rename = "blake3")]
    Blake3,
}

impl HashAlg {
    /// The textual tag, as used in the `"{alg}:{value}"` key form.
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlg::None => "",
            HashAlg::Blake3 => "blake3",
        }
    }

    fn check_valid(&self) -> Result<()> {
        match self {
            HashAlg::Blake3 => Ok(()),
            HashAlg::None => Err(StrataError::InvalidHashAlgorithm(self.as_str().to_string())),
        }
    }

    /// Computes the reference for a byte slice.
    ///
    /// # Errors
    ///
    /// Returns `InvalidHashAlgorithm` if the tag is not a real algorithm.
    pub fn compute_bytes(&self, bytes: &[u8]) -> Result<BlobRef> {
        self.check_valid()?;
        let digest = blake3::hash(bytes);
        Ok(BlobRef {
            alg: *self,
            value: URL_SAFE_NO_PAD.encode(digest.as_bytes()),
        })
    }

    /// Computes the reference for a stream.
    ///
    /// # Errors
    ///
    /// Returns `InvalidHashAlgorithm` for an unrecognized tag, or the
    /// stream's own I/O error.
    pub fn compute_reader<R: Read>(&self, reader: &mut R) -> Result<BlobRef> {
        self.check_valid()?;
        let mut hasher = blake3::Hasher::new();
        std::io::copy(reader, &mut hasher)?;
        Ok(BlobRef {
            alg: *self,
            value: URL_SAFE_NO_PAD.encode(hasher.finalize().as_bytes()),
        })
    }
}

impl fmt::Display for HashAlg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlg {
    type Err = StrataError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "blake3" => Ok(HashAlg::Blake3),
            other => Err(StrataError::InvalidHashAlgorithm(other.to_string())),
        }
    }
}

/// The identity of a blob: an algorithm tag plus the base64url (unpadded)
/// form of the raw digest.
///
/// The `Display` form `"{alg}:{value}"` is the KV key for the underlying
/// blob. A ref is *zero* iff both fields are empty, meaning "no pointer yet".
#[derive(
    Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct BlobRef {
    /// Algorithm used to compute the digest.
    pub alg: HashAlg,

    /// base64url-unpadded digest text.
    pub value: String,
}

impl BlobRef {
    /// Returns the zero reference.
    pub fn zero() -> Self {
        Self::default()
    }

    /// True iff both components are empty.
    pub fn is_zero(&self) -> bool {
        self.alg == HashAlg::None && self.value.is_empty()
    }
}

impl fmt::Display for BlobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.alg, self.value)
    }
}

impl FromStr for BlobRef {
    type Err = StrataError;

    fn from_str(s: &str) -> Result<Self> {
        let (alg, value) = s
            .split_once(':')
            .ok_or_else(|| StrataError::InvalidHashAlgorithm(s.to_string()))?;
        Ok(Self {
            alg: alg.parse()?,
            value: value.to_string(),
        })
    }
}

impl ToBlob for BlobRef {
    fn to_blob(&self) -> Result<Blob> {
        codec::encode(self)
    }
}

/// An ordered sequence of references, sorted lexicographically by
/// `(alg, value)` and deduplicated on insert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobRefList(Vec<BlobRef>);

impl BlobRefList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a sorted, deduplicated list from the given refs.
    pub fn from_refs(refs: impl IntoIterator<Item = BlobRef>) -> Self {
        let mut list = Self::new();
        for r in refs {
            list.insert(r);
        }
        list
    }

    /// True if the ref is present (structural equality).
    pub fn contains(&self, r: &BlobRef) -> bool {
        self.0.iter().any(|v| v == r)
    }

    /// Inserts the ref, keeping the list sorted. Returns false if it was
    /// already present.
    pub fn insert(&mut self, r: BlobRef) -> bool {
        match self.0.binary_search(&r) {
            Ok(_) => false,
            Err(pos) => {
                self.0.insert(pos, r);
                true
            }
        }
    }

    /// Number of refs in the list.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the list holds no refs.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The refs, in sorted order.
    pub fn as_slice(&self) -> &[BlobRef] {
        &self.0
    }

    /// Iterates the refs in sorted order.
    pub fn iter(&self) -> std::slice::Iter<'_, BlobRef> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a BlobRefList {
    type Item = &'a BlobRef;
    type IntoIter = std::slice::Iter<'a, BlobRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
