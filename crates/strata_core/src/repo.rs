//! Repository handle: applying changesets, reading content, branch pointers.

use crate::blob::{Blob, BlobRef, ToBlob};
use crate::blobmap::BlobMap;
use crate::changeset::Changeset;
use crate::codec;
use crate::commit::Commit;
use crate::config::RepoConfig;
use crate::document::DocumentKey;
use crate::error::{Result, StrataError};
use crate::kv::{Kv, MemoryKv};
use crate::redb_kv::RedbKv;
use crate::tree::{Edge, File, CONTENT_EDGE};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Logical KV prefix under which the mutable branch pointers live. All other
/// keys are content-addressed and immutable.
const POINTER_PREFIX: &str = "refs/";

/// A content-addressed, versioned document store.
///
/// Writes are staged in a [`Changeset`] and applied as a whole, producing a
/// new [`Commit`] whose ref identifies an immutable snapshot of the entire
/// logical database. Named branch pointers advance via compare-and-swap.
///
/// # Examples
///
/// ```
/// use strata_core::{Blob, Changeset, DocumentKey, Repo};
///
/// let repo = Repo::in_memory();
///
/// let mut cs = Changeset::new();
/// let key = DocumentKey::random("people");
/// cs.put(key.clone(), Blob::from("bob bobson"));
///
/// let commit = repo.apply(cs).unwrap();
/// let content = repo.get_content_at_key(&commit, &key).unwrap();
/// assert_eq!(content, Blob::from("bob bobson"));
/// ```
pub struct Repo {
    kv: Box<dyn Kv>,
    config: RepoConfig,
}

impl Repo {
    /// Creates a repository over the given KV with default configuration.
    pub fn with_kv(kv: impl Kv + 'static) -> Self {
        Self {
            kv: Box::new(kv),
            config: RepoConfig::default(),
        }
    }

    /// Creates an ephemeral in-memory repository.
    pub fn in_memory() -> Self {
        Self::with_kv(MemoryKv::new())
    }

    /// Opens (or initializes) a persistent repository in the given folder.
    ///
    /// The folder is created if needed; `config.toml` inside it is loaded if
    /// present, written with defaults otherwise.
    ///
    /// # Errors
    ///
    /// Returns `Config` on a malformed config file or `Storage` if the
    /// database cannot be opened.
    pub fn persistent(folder: impl AsRef<Path>) -> Result<Self> {
        let folder = folder.as_ref();
        fs::create_dir_all(folder)?;

        let config = RepoConfig::load(folder)?;
        if !folder.join("config.toml").exists() {
            config.save(folder)?;
        }

        let kv = RedbKv::open(folder.join(&config.db_file))?;
        Ok(Self {
            kv: Box::new(kv),
            config,
        })
    }

    /// Returns the repository configuration.
    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    /// Applies the changeset and returns the ref of the new commit.
    ///
    /// Every document is woven into the directory tree inherited from the
    /// parent commit (or an empty tree for a root commit); all new objects
    /// are staged locally and flushed to the KV in one put-if-absent pass, so
    /// re-flushing identical content is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `MergeUnsupported` if the changeset carries two or more
    /// parents; KV and decode errors surface verbatim.
    pub fn apply(&self, changeset: Changeset) -> Result<BlobRef> {
        let (leafs, parents) = changeset.into_parts();

        let mut root = match parents.as_slice() {
            [] => File::default(),
            [parent_ref] => {
                let parent = self.get_commit(parent_ref)?;
                self.get_file(&parent.folder)?
            }
            more => return Err(StrataError::MergeUnsupported(more.len())),
        };

        let mut blobs = BlobMap::new(self.kv.as_ref(), self.config.hash_alg);
        let documents = leafs.len();

        for (key, payload) in leafs {
            let payload_ref = blobs.put(&payload)?;
            let spine = path_spine(&key.path(), payload_ref, &mut blobs)?;
            root = merge(&root, &spine, &mut blobs)?;
            blobs.put(&root)?;
        }

        // The root must reach the staging buffer even when no documents were
        // written, or the commit's folder ref would dangle.
        let folder = blobs.put(&root)?;
        let commit = Commit { folder, parents };
        let commit_ref = blobs.put(&commit)?;

        self.persist(&mut blobs)?;
        debug!(documents, commit = %commit_ref, "applied changeset");
        Ok(commit_ref)
    }

    /// Returns the blob at the given ref.
    ///
    /// # Errors
    ///
    /// Returns `KeyNotFound` if the ref resolves to nothing.
    pub fn get_blob(&self, r: &BlobRef) -> Result<Blob> {
        self.kv.get(&r.to_string())
    }

    /// Returns the commit record at the given ref.
    pub fn get_commit(&self, r: &BlobRef) -> Result<Commit> {
        codec::decode(&self.get_blob(r)?)
    }

    /// Returns the directory node at the given ref.
    pub fn get_file(&self, r: &BlobRef) -> Result<File> {
        codec::decode(&self.get_blob(r)?)
    }

    /// Resolves a document inside the given commit's snapshot.
    ///
    /// Walks the commit's directory tree along the key's derived path and
    /// returns the payload blob at the leaf.
    ///
    /// # Errors
    ///
    /// Returns `DocumentNotFound` if any step of the path (or the leaf's
    /// payload edge) is missing.
    pub fn get_content_at_key(&self, commit_ref: &BlobRef, key: &DocumentKey) -> Result<Blob> {
        let commit = self.get_commit(commit_ref)?;
        let mut file = self.get_file(&commit.folder)?;

        for step in key.path() {
            let target = match file.children.find(&step) {
                Some(edge) => edge.target.clone(),
                None => return Err(StrataError::DocumentNotFound(key.to_string())),
            };
            file = self.get_file(&target)?;
        }

        let edge = file
            .children
            .find(CONTENT_EDGE)
            .ok_or_else(|| StrataError::DocumentNotFound(key.to_string()))?;
        self.get_blob(&edge.target)
    }

    /// Moves the named branch pointer from `old_ref` to `new_ref`.
    ///
    /// A zero `old_ref` claims a fresh pointer slot; otherwise the update is
    /// a compare-and-swap against the current value. The two branches are
    /// mutually exclusive.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOldRef` if the slot is already taken (fresh claim) or
    /// the stored value differs from `old_ref` (swap). The pointer is left
    /// unchanged in both cases.
    pub fn update_pointer(&self, name: &str, new_ref: &BlobRef, old_ref: &BlobRef) -> Result<()> {
        let key = format!("{}{}", POINTER_PREFIX, name);
        let new_blob = new_ref.to_blob()?;

        let moved = if old_ref.is_zero() {
            self.kv.put_new(&key, &new_blob)?
        } else {
            self.kv.cas(&key, &old_ref.to_blob()?, &new_blob)?
        };

        if !moved {
            return Err(StrataError::InvalidOldRef(name.to_string()));
        }
        debug!(pointer = name, new = %new_ref, "pointer updated");
        Ok(())
    }

    /// Reads the named branch pointer.
    ///
    /// # Errors
    ///
    /// Returns `KeyNotFound` if the pointer was never created, or a decode
    /// error on a malformed slot.
    pub fn get_pointer(&self, name: &str) -> Result<BlobRef> {
        let blob = self.kv.get(&format!("{}{}", POINTER_PREFIX, name))?;
        codec::decode(&blob)
    }

    /// Releases the underlying KV.
    pub fn close(self) -> Result<()> {
        self.kv.close()
    }

    /// Flushes every staged object with put-if-absent semantics.
    fn persist(&self, blobs: &mut BlobMap<'_>) -> Result<()> {
        for r in blobs.keys() {
            let blob = blobs
                .raw(&r)?
                .ok_or_else(|| StrataError::ObjectNotFound(r.to_string()))?;
            self.kv.put_new(&r.to_string(), &blob)?;
        }
        Ok(())
    }
}

/// Builds the chain of Files for one document write: a leaf node carrying
/// the payload edge, wrapped by one node per remaining path component, topped
/// by a synthetic node named `"root"`. Every node is buffered.
fn path_spine(steps: &[String], payload: BlobRef, blobs: &mut BlobMap<'_>) -> Result<File> {
    let mut spine_root = File::new("root", false);
    let Some((leaf_name, rest)) = steps.split_last() else {
        return Ok(spine_root);
    };

    let leaf = File::new(leaf_name.clone(), true).with_content(payload);
    let mut child_name = leaf.name.clone();
    let mut child_ref = blobs.put(&leaf)?;

    for step in rest.iter().rev() {
        let node = File::new(step.clone(), false).add(Edge::new(child_name, child_ref));
        child_name = node.name.clone();
        child_ref = blobs.put(&node)?;
    }

    spine_root = spine_root.add(Edge::new(child_name, child_ref));
    blobs.put(&spine_root)?;
    Ok(spine_root)
}

/// Merges the entries of `partial` (a path spine) into `full`, returning the
/// merged node. Nothing is mutated in place; rewritten children are buffered
/// so their new refs propagate upward.
fn merge(full: &File, partial: &File, blobs: &mut BlobMap<'_>) -> Result<File> {
    // A spine node carries at most one child edge.
    let Some(incoming) = partial.children.first() else {
        return Ok(full.clone());
    };

    if full.leaf && partial.leaf {
        // Both sides reached the document leaf: the incoming payload wins.
        return Ok(full.with_content(partial.content_ref()));
    }

    match full.children.find(&incoming.name) {
        None => Ok(full.add(incoming.clone())),
        Some(existing) => {
            let existing_ref = existing.target.clone();
            let old_child = read_file(blobs, &existing_ref)?;
            let new_child = read_file(blobs, &incoming.target)?;

            let merged = merge(&old_child, &new_child, blobs)?;
            let merged_ref = blobs.put(&merged)?;
            Ok(full.add(Edge::new(incoming.name.clone(), merged_ref)))
        }
    }
}

fn read_file(blobs: &mut BlobMap<'_>, r: &BlobRef) -> Result<File> {
    blobs
        .read(r)?
        .ok_or_else(|| StrataError::ObjectNotFound(r.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::HashAlg;

    #[test]
    fn test_empty_changeset_no_parents() {
        let repo = Repo::in_memory();
        let commit_ref = repo.apply(Changeset::new()).unwrap();

        let commit = repo.get_commit(&commit_ref).unwrap();
        assert!(commit.parents.is_empty());

        // The folder ref resolves and holds an empty root.
        let root = repo.get_file(&commit.folder).unwrap();
        assert!(root.children.is_empty());
        assert!(!root.leaf);
    }

    #[test]
    fn test_empty_changeset_inherits_parent_folder() {
        let repo = Repo::in_memory();

        let mut cs = Changeset::new();
        cs.put(DocumentKey::random("people"), Blob::from("someone"));
        let first = repo.apply(cs).unwrap();

        let second = repo.apply(Changeset::with_parents([first.clone()])).unwrap();
        assert_ne!(first, second);

        let parent = repo.get_commit(&first).unwrap();
        let child = repo.get_commit(&second).unwrap();
        assert_eq!(parent.folder, child.folder);
        assert!(child.parents.contains(&first));
    }

    #[test]
    fn test_merge_commits_unsupported() {
        let repo = Repo::in_memory();
        let a = HashAlg::Blake3.compute_bytes(b"a").unwrap();
        let b = HashAlg::Blake3.compute_bytes(b"b").unwrap();

        let result = repo.apply(Changeset::with_parents([a, b]));
        assert!(matches!(result, Err(StrataError::MergeUnsupported(2))));
    }

    #[test]
    fn test_reapply_is_idempotent() {
        let repo = Repo::in_memory();
        let key = DocumentKey::random("people");

        let mut first = Changeset::new();
        first.put(key.clone(), Blob::from("same content"));
        let mut second = Changeset::new();
        second.put(key, Blob::from("same content"));

        assert_eq!(repo.apply(first).unwrap(), repo.apply(second).unwrap());
    }

    #[test]
    fn test_missing_document() {
        let repo = Repo::in_memory();
        let mut cs = Changeset::new();
        cs.put(DocumentKey::random("people"), Blob::from("present"));
        let commit = repo.apply(cs).unwrap();

        let result = repo.get_content_at_key(&commit, &DocumentKey::random("people"));
        assert!(matches!(result, Err(StrataError::DocumentNotFound(_))));
    }

    #[test]
    fn test_documents_in_same_set_coexist() {
        let repo = Repo::in_memory();
        let mut cs = Changeset::new();
        let keys: Vec<_> = (0..8).map(|_| DocumentKey::random("bulk")).collect();
        for (i, key) in keys.iter().enumerate() {
            cs.put(key.clone(), Blob::from(format!("doc {}", i).as_str()));
        }

        let commit = repo.apply(cs).unwrap();
        for (i, key) in keys.iter().enumerate() {
            let content = repo.get_content_at_key(&commit, key).unwrap();
            assert_eq!(content, Blob::from(format!("doc {}", i).as_str()));
        }
    }

    #[test]
    fn test_pointer_claim_then_swap() {
        let repo = Repo::in_memory();
        let first = repo.apply(Changeset::new()).unwrap();

        repo.update_pointer("main/HEAD", &first, &BlobRef::zero())
            .unwrap();
        assert_eq!(repo.get_pointer("main/HEAD").unwrap(), first);

        // Claiming an occupied slot fails and leaves the pointer alone.
        let other = HashAlg::Blake3.compute_bytes(b"other").unwrap();
        let result = repo.update_pointer("main/HEAD", &other, &BlobRef::zero());
        assert!(matches!(result, Err(StrataError::InvalidOldRef(_))));
        assert_eq!(repo.get_pointer("main/HEAD").unwrap(), first);

        repo.update_pointer("main/HEAD", &other, &first).unwrap();
        assert_eq!(repo.get_pointer("main/HEAD").unwrap(), other);
    }

    #[test]
    fn test_pointer_never_created() {
        let repo = Repo::in_memory();
        assert!(matches!(
            repo.get_pointer("missing"),
            Err(StrataError::KeyNotFound(_))
        ));
    }
}
