//! Strata Core Library
//!
//! A content-addressed, versioned document store with commit semantics:
//! - Document writes are staged into a [`Changeset`] and applied as a whole.
//! - Every applied changeset yields an immutable [`Commit`] identifying a
//!   snapshot of the entire logical database as a Merkle directory tree.
//! - All persisted objects are keyed by the hash of their serialized form;
//!   the only mutable state is the set of named branch pointers, advanced
//!   atomically via compare-and-swap.
//!
//! # Quick Start
//!
//! ```
//! use strata_core::{Blob, BlobRef, Changeset, DocumentKey, Repo};
//!
//! let repo = Repo::in_memory();
//!
//! // Stage two documents and commit them.
//! let bob = DocumentKey::random("people");
//! let alice = DocumentKey::random("people");
//! let mut cs = Changeset::new();
//! cs.put(bob.clone(), Blob::from("bob bobson"));
//! cs.put(alice.clone(), Blob::from("alice anderson"));
//! let first = repo.apply(cs).unwrap();
//!
//! // Point a branch at the new commit.
//! repo.update_pointer("master/HEAD", &first, &BlobRef::zero()).unwrap();
//! assert_eq!(repo.get_pointer("master/HEAD").unwrap(), first);
//!
//! // A successor commit sees the old content through the directory merge.
//! let mut cs = Changeset::with_parents([first.clone()]);
//! cs.put(bob.clone(), Blob::from("Bob Buffon"));
//! let second = repo.apply(cs).unwrap();
//!
//! assert_eq!(repo.get_content_at_key(&first, &bob).unwrap(), Blob::from("bob bobson"));
//! assert_eq!(repo.get_content_at_key(&second, &bob).unwrap(), Blob::from("Bob Buffon"));
//! assert_eq!(repo.get_content_at_key(&second, &alice).unwrap(), Blob::from("alice anderson"));
//! ```
//!
//! # Storage model
//!
//! The store sits on any transactional KV exposing get/has/put plus a
//! conditional put ([`Kv`]); [`MemoryKv`] backs ephemeral repositories and
//! [`RedbKv`] backs persistent ones. Content-addressed keys are written once
//! with put-if-absent semantics and never overwritten, so interrupted or
//! concurrent flushes converge.

mod blob;
mod blobmap;
mod changeset;
mod codec;
mod commit;
mod config;
mod document;
mod error;
mod kv;
mod redb_kv;
mod repo;
mod tree;
mod verify;

pub use blob::{Blob, BlobRef, BlobRefList, HashAlg, ToBlob, DEFAULT_HASH_ALG};
pub use changeset::Changeset;
pub use commit::Commit;
pub use config::RepoConfig;
pub use document::DocumentKey;
pub use error::{Result, StrataError};
pub use kv::{CheckFn, Kv, MemoryKv};
pub use redb_kv::RedbKv;
pub use repo::Repo;
pub use tree::{Edge, EdgeList, File};
pub use verify::{verify_commit, VerifyReport};
