//! Snapshot integrity verification.
//!
//! Persisted objects are self-verifying: every ref must resolve to a blob
//! whose recomputed hash equals the ref. `verify_commit` walks a commit's
//! history and directory trees checking exactly that, without mutating
//! anything.

use crate::blob::{Blob, BlobRef};
use crate::codec;
use crate::commit::Commit;
use crate::error::{Result, StrataError};
use crate::repo::Repo;
use crate::tree::File;
use std::collections::{HashSet, VecDeque};

/// Report from a verification walk.
#[derive(Debug, Default)]
pub struct VerifyReport {
    /// Total number of blobs checked.
    pub objects_checked: usize,

    /// Refs that resolved to nothing in the KV.
    pub missing: Vec<BlobRef>,

    /// Refs whose blob does not hash back to the ref, or does not decode to
    /// the expected record shape.
    pub corrupted: Vec<BlobRef>,

    /// Number of commits walked.
    pub commits_checked: usize,
}

impl VerifyReport {
    /// True if any issues were found.
    pub fn has_issues(&self) -> bool {
        !self.missing.is_empty() || !self.corrupted.is_empty()
    }

    /// Returns a summary message.
    pub fn summary(&self) -> String {
        if !self.has_issues() {
            return format!(
                "verified {} objects across {} commits, no issues",
                self.objects_checked, self.commits_checked
            );
        }
        format!(
            "found {} missing and {} corrupted objects",
            self.missing.len(),
            self.corrupted.len()
        )
    }
}

/// Walks the commit DAG from `commit_ref` (the commit records, every
/// directory node, every leaf payload) and re-hashes each blob against the
/// ref it was reached by.
///
/// Missing and corrupted objects are collected in the report; KV failures
/// other than not-found propagate as errors.
pub fn verify_commit(repo: &Repo, commit_ref: &BlobRef) -> Result<VerifyReport> {
    let mut report = VerifyReport::default();
    let mut visited = HashSet::new();
    let mut commits = VecDeque::new();
    commits.push_back(commit_ref.clone());

    while let Some(r) = commits.pop_front() {
        if !visited.insert(r.clone()) {
            continue;
        }
        let Some(blob) = fetch_checked(repo, &r, &mut report)? else {
            continue;
        };
        let commit: Commit = match codec::decode(&blob) {
            Ok(commit) => commit,
            Err(_) => {
                report.corrupted.push(r);
                continue;
            }
        };
        report.commits_checked += 1;

        check_tree(repo, &commit.folder, &mut visited, &mut report)?;
        for parent in &commit.parents {
            commits.push_back(parent.clone());
        }
    }

    Ok(report)
}

/// Walks one directory tree, checking every node and leaf payload.
fn check_tree(
    repo: &Repo,
    root: &BlobRef,
    visited: &mut HashSet<BlobRef>,
    report: &mut VerifyReport,
) -> Result<()> {
    let mut stack = vec![root.clone()];

    while let Some(r) = stack.pop() {
        if !visited.insert(r.clone()) {
            continue;
        }
        let Some(blob) = fetch_checked(repo, &r, report)? else {
            continue;
        };
        let file: File = match codec::decode(&blob) {
            Ok(file) => file,
            Err(_) => {
                report.corrupted.push(r);
                continue;
            }
        };

        if file.leaf {
            // The single child is the raw payload; hash it, don't decode it.
            let payload_ref = file.content_ref();
            if visited.insert(payload_ref.clone()) {
                fetch_checked(repo, &payload_ref, report)?;
            }
        } else {
            for edge in &file.children {
                stack.push(edge.target.clone());
            }
        }
    }

    Ok(())
}

/// Fetches the blob at `r` and re-hashes it. Records a missing or corrupted
/// ref in the report and returns `None` for it; healthy blobs come back for
/// further decoding.
fn fetch_checked(repo: &Repo, r: &BlobRef, report: &mut VerifyReport) -> Result<Option<Blob>> {
    let blob = match repo.get_blob(r) {
        Ok(blob) => blob,
        Err(StrataError::KeyNotFound(_)) => {
            report.missing.push(r.clone());
            return Ok(None);
        }
        Err(e) => return Err(e),
    };
    // Zero-length values count as absent, matching the KV `has` contract.
    if blob.is_empty() {
        report.missing.push(r.clone());
        return Ok(None);
    }
    report.objects_checked += 1;

    match r.alg.compute_bytes(blob.as_bytes()) {
        Ok(actual) if actual == *r => Ok(Some(blob)),
        _ => {
            report.corrupted.push(r.clone());
            Ok(None)
        }
    }
}
