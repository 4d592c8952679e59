//! Staged batch of document writes consumed by `apply`.

use crate::blob::{Blob, BlobRef, BlobRefList};
use crate::document::DocumentKey;
use std::collections::BTreeMap;

/// An in-memory batch of `(DocumentKey → payload)` writes plus the parent
/// refs of the commit being prepared.
///
/// A changeset is built by one logical task and then handed to
/// [`Repo::apply`](crate::Repo::apply) exactly once; `apply` takes it by
/// value, so the type system enforces the single-use contract. It is not
/// meant to be shared across threads while being built.
#[derive(Debug, Default)]
pub struct Changeset {
    leafs: BTreeMap<DocumentKey, Blob>,
    parents: BlobRefList,
}

impl Changeset {
    /// Creates a changeset for a root commit (no parents).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a changeset on top of the given parent commits.
    pub fn with_parents(parents: impl IntoIterator<Item = BlobRef>) -> Self {
        Self {
            leafs: BTreeMap::new(),
            parents: BlobRefList::from_refs(parents),
        }
    }

    /// Stages a document write. A second write to the same key replaces the
    /// first: last write wins.
    pub fn put(&mut self, key: DocumentKey, blob: Blob) {
        self.leafs.insert(key, blob);
    }

    /// Reads a staged write back, if the key is part of this changeset.
    pub fn read(&self, key: &DocumentKey) -> Option<&Blob> {
        self.leafs.get(key)
    }

    /// Number of staged documents.
    pub fn len(&self) -> usize {
        self.leafs.len()
    }

    /// True if no documents are staged.
    pub fn is_empty(&self) -> bool {
        self.leafs.is_empty()
    }

    /// The parent refs, sorted.
    pub fn parents(&self) -> &BlobRefList {
        &self.parents
    }

    pub(crate) fn into_parts(self) -> (BTreeMap<DocumentKey, Blob>, BlobRefList) {
        (self.leafs, self.parents)
    }
}
