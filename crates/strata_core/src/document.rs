//! Document keys and their derived tree paths.

use crate::error::{Result, StrataError};
use std::fmt;
use svix_ksuid::{Ksuid, KsuidLike};

/// User-facing handle for a document: a `set` namespace plus a 160-bit
/// k-sortable id.
///
/// The key induces a fixed 8-component path: the set name, six byte-pair
/// buckets from the id's 27-character textual form, then the full id. That
/// path is the sole determinant of the document's position in the directory
/// tree, and the byte-pair buckets bound the fan-out under each set.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DocumentKey {
    set: String,
    id: Ksuid,
}

impl DocumentKey {
    /// Creates a key with a fresh random id in the given set.
    pub fn random(set: impl Into<String>) -> Self {
        Self {
            set: set.into(),
            id: Ksuid::new(None, None),
        }
    }

    /// Reconstructs a key from a set name and the id's textual form.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDocumentId` if the id string is not a valid
    /// 27-character k-sortable id.
    pub fn parse(set: impl Into<String>, id: &str) -> Result<Self> {
        let id = Ksuid::from_base62(id)
            .map_err(|e| StrataError::InvalidDocumentId(e.to_string()))?;
        Ok(Self {
            set: set.into(),
            id,
        })
    }

    /// The set this document belongs to.
    pub fn set(&self) -> &str {
        &self.set
    }

    /// The id's 27-character textual form.
    pub fn id(&self) -> String {
        self.id.to_base62()
    }

    /// The derived path: `[set, id[0:2], id[2:4], id[4:6], id[6:8],
    /// id[8:10], id[10:12], id]`.
    pub(crate) fn path(&self) -> Vec<String> {
        let id = self.id();
        vec![
            self.set.clone(),
            id[0..2].to_string(),
            id[2..4].to_string(),
            id[4..6].to_string(),
            id[6..8].to_string(),
            id[8..10].to_string(),
            id[10..12].to_string(),
            id,
        ]
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.set, self.id())
    }
}
