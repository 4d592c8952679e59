//! Commit records: immutable snapshots of the whole logical database.

use crate::blob::{Blob, BlobRef, BlobRefList, ToBlob};
use crate::codec;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// A single snapshot of the entire database.
///
/// `folder` points at the root directory [`File`](crate::File) of the
/// snapshot; `parents` is the sorted list of prior commit refs. A commit
/// with no parents is a root commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Root directory of this snapshot.
    pub folder: BlobRef,

    /// Prior commits, sorted by `(alg, value)`.
    pub parents: BlobRefList,
}

impl ToBlob for Commit {
    fn to_blob(&self) -> Result<Blob> {
        codec::encode(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::HashAlg;

    #[test]
    fn test_commit_encoding_deterministic() {
        let folder = HashAlg::Blake3.compute_bytes(b"root").unwrap();
        let parent = HashAlg::Blake3.compute_bytes(b"parent").unwrap();

        let commit = Commit {
            folder: folder.clone(),
            parents: BlobRefList::from_refs([parent.clone()]),
        };
        let again = Commit {
            folder,
            parents: BlobRefList::from_refs([parent]),
        };

        assert_eq!(commit.to_blob().unwrap(), again.to_blob().unwrap());
    }

    #[test]
    fn test_parent_order_does_not_affect_encoding() {
        let folder = HashAlg::Blake3.compute_bytes(b"root").unwrap();
        let a = HashAlg::Blake3.compute_bytes(b"a").unwrap();
        let b = HashAlg::Blake3.compute_bytes(b"b").unwrap();

        let one = Commit {
            folder: folder.clone(),
            parents: BlobRefList::from_refs([a.clone(), b.clone()]),
        };
        let two = Commit {
            folder,
            parents: BlobRefList::from_refs([b, a]),
        };

        assert_eq!(one.to_blob().unwrap(), two.to_blob().unwrap());
    }
}
