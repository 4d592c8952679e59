//! Staging map used while building a commit.
//!
//! A read-through, write-buffered two-tier map: new objects accumulate in a
//! local buffer while reads fall back to the backing KV (priming the buffer),
//! so parent-tree traversal and new-node creation share one lookup path.
//! Nothing reaches the KV until the repo explicitly flushes.

use crate::blob::{Blob, BlobRef, HashAlg, ToBlob};
use crate::codec;
use crate::error::Result;
use crate::kv::Kv;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// Write buffer over the KV, owned by a single `apply` call.
pub(crate) struct BlobMap<'kv> {
    kv: &'kv dyn Kv,
    staged: HashMap<BlobRef, Blob>,
    alg: HashAlg,
}

impl<'kv> BlobMap<'kv> {
    pub(crate) fn new(kv: &'kv dyn Kv, alg: HashAlg) -> Self {
        Self {
            kv,
            staged: HashMap::new(),
            alg,
        }
    }

    /// Encodes the record, hashes it, and buffers it locally. Returns the
    /// record's canonical ref.
    pub(crate) fn put<T: ToBlob>(&mut self, record: &T) -> Result<BlobRef> {
        let blob = record.to_blob()?;
        let r = blob.ref_with(self.alg)?;
        self.staged.insert(r.clone(), blob);
        Ok(r)
    }

    /// True if the ref resolves locally or in the backing KV.
    pub(crate) fn has(&self, r: &BlobRef) -> Result<bool> {
        if self.staged.contains_key(r) {
            return Ok(true);
        }
        self.kv.has(&r.to_string())
    }

    /// Decodes the record at `r`, priming the local buffer from the KV on a
    /// local miss. Returns `None` if the ref resolves in neither tier.
    pub(crate) fn read<T: DeserializeOwned>(&mut self, r: &BlobRef) -> Result<Option<T>> {
        match self.fetch(r)? {
            Some(blob) => Ok(Some(codec::decode(blob)?)),
            None => Ok(None),
        }
    }

    /// Returns the raw bytes at `r` under the same lookup policy as `read`.
    pub(crate) fn raw(&mut self, r: &BlobRef) -> Result<Option<Blob>> {
        Ok(self.fetch(r)?.cloned())
    }

    /// Refs currently in the local buffer: the flush list.
    pub(crate) fn keys(&self) -> Vec<BlobRef> {
        self.staged.keys().cloned().collect()
    }

    fn fetch(&mut self, r: &BlobRef) -> Result<Option<&Blob>> {
        if !self.staged.contains_key(r) && !self.prime(r)? {
            return Ok(None);
        }
        Ok(self.staged.get(r))
    }

    fn prime(&mut self, r: &BlobRef) -> Result<bool> {
        let key = r.to_string();
        if !self.kv.has(&key)? {
            return Ok(false);
        }
        let blob = self.kv.get(&key)?;
        if blob.is_empty() {
            return Ok(false);
        }
        self.staged.insert(r.clone(), blob);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKv;
    use crate::tree::File;

    #[test]
    fn test_put_buffers_locally() {
        let kv = MemoryKv::new();
        let mut map = BlobMap::new(&kv, HashAlg::Blake3);

        let blob = Blob::from("payload");
        let r = map.put(&blob).unwrap();

        assert!(map.has(&r).unwrap());
        assert_eq!(map.keys(), vec![r.clone()]);
        // Nothing flushed yet.
        assert!(!kv.has(&r.to_string()).unwrap());
    }

    #[test]
    fn test_read_decodes_buffered_record() {
        let kv = MemoryKv::new();
        let mut map = BlobMap::new(&kv, HashAlg::Blake3);

        let file = File::new("dir", false);
        let r = map.put(&file).unwrap();

        let decoded: File = map.read(&r).unwrap().unwrap();
        assert_eq!(decoded, file);
    }

    #[test]
    fn test_read_primes_from_kv() {
        let kv = MemoryKv::new();
        let file = File::new("persisted", false);
        let blob = file.to_blob().unwrap();
        let r = blob.ref_with(HashAlg::Blake3).unwrap();
        kv.put(&r.to_string(), &blob).unwrap();

        let mut map = BlobMap::new(&kv, HashAlg::Blake3);
        assert!(map.keys().is_empty());

        let decoded: File = map.read(&r).unwrap().unwrap();
        assert_eq!(decoded, file);
        // Primed into the buffer after the read-through.
        assert_eq!(map.keys(), vec![r]);
    }

    #[test]
    fn test_read_unresolvable() {
        let kv = MemoryKv::new();
        let mut map = BlobMap::new(&kv, HashAlg::Blake3);

        let r = HashAlg::Blake3.compute_bytes(b"never stored").unwrap();
        let missing: Option<File> = map.read(&r).unwrap();
        assert!(missing.is_none());
        assert!(map.raw(&r).unwrap().is_none());
    }

    #[test]
    fn test_raw_returns_exact_bytes() {
        let kv = MemoryKv::new();
        let mut map = BlobMap::new(&kv, HashAlg::Blake3);

        let blob = Blob::from("raw bytes");
        let r = map.put(&blob).unwrap();
        assert_eq!(map.raw(&r).unwrap().unwrap(), blob);
    }

    #[test]
    fn test_put_same_content_once() {
        let kv = MemoryKv::new();
        let mut map = BlobMap::new(&kv, HashAlg::Blake3);

        let r1 = map.put(&Blob::from("same")).unwrap();
        let r2 = map.put(&Blob::from("same")).unwrap();
        assert_eq!(r1, r2);
        assert_eq!(map.keys().len(), 1);
    }
}
