//! Transactional key-value contract backing the repository.
//!
//! Atomicity is per-key; no multi-key transactions are required. Content-
//! addressed object keys are written once with [`Kv::put_new`] and never
//! overwritten, so the only genuinely mutable keys are the branch pointers
//! under `refs/`.

use crate::blob::Blob;
use crate::error::{Result, StrataError};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Check invoked by [`Kv::put_if`] with the previous value (empty if the key
/// is absent) and the candidate value. Returning `true` commits the write.
pub type CheckFn<'a> = &'a dyn Fn(&[u8], &[u8]) -> Result<bool>;

/// Rejects the empty key, which no KV operation accepts.
pub(crate) fn check_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(StrataError::EmptyKey);
    }
    Ok(())
}

/// The storage boundary: any transactional KV exposing get/has/put plus a
/// conditional put is enough to back a repository.
pub trait Kv: Send + Sync {
    /// Returns the current value.
    ///
    /// # Errors
    ///
    /// Returns `KeyNotFound` if the key is absent.
    fn get(&self, key: &str) -> Result<Blob>;

    /// Presence test. A key whose value has zero-length content counts as
    /// absent.
    fn has(&self, key: &str) -> Result<bool>;

    /// Unconditional write.
    fn put(&self, key: &str, blob: &Blob) -> Result<()>;

    /// Atomic read-modify-write: reads the current value (empty blob if
    /// absent), invokes `check(prev, next)`, and writes `next` only if the
    /// check returns true. Check errors propagate and leave the key
    /// untouched.
    fn put_if(&self, key: &str, blob: &Blob, check: CheckFn<'_>) -> Result<bool>;

    /// Writes only if the key is currently absent.
    fn put_new(&self, key: &str, blob: &Blob) -> Result<bool> {
        self.put_if(key, blob, &|prev, _next| Ok(prev.is_empty()))
    }

    /// Compare-and-swap: writes `new` only if the current bytes equal `old`.
    fn cas(&self, key: &str, old: &Blob, new: &Blob) -> Result<bool> {
        self.put_if(key, new, &|prev, _next| Ok(prev == old.as_bytes()))
    }

    /// Releases underlying resources. Both built-in backends also release on
    /// drop; this hook exists for callers that want the error.
    fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// In-memory KV for ephemeral repositories and tests.
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryKv {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        // A poisoned lock only means another thread panicked mid-write of a
        // single entry; the map itself is still usable.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Kv for MemoryKv {
    fn get(&self, key: &str) -> Result<Blob> {
        check_key(key)?;
        self.lock()
            .get(key)
            .map(|v| Blob::new(v.clone()))
            .ok_or_else(|| StrataError::KeyNotFound(key.to_string()))
    }

    fn has(&self, key: &str) -> Result<bool> {
        check_key(key)?;
        Ok(self.lock().get(key).is_some_and(|v| !v.is_empty()))
    }

    fn put(&self, key: &str, blob: &Blob) -> Result<()> {
        check_key(key)?;
        self.lock()
            .insert(key.to_string(), blob.as_bytes().to_vec());
        Ok(())
    }

    fn put_if(&self, key: &str, blob: &Blob, check: CheckFn<'_>) -> Result<bool> {
        check_key(key)?;
        let mut entries = self.lock();
        let prev = entries.get(key).map(Vec::as_slice).unwrap_or_default();
        if !check(prev, blob.as_bytes())? {
            return Ok(false);
        }
        entries.insert(key.to_string(), blob.as_bytes().to_vec());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_put_roundtrip() {
        let kv = MemoryKv::new();
        kv.put("k", &Blob::from("value")).unwrap();
        assert_eq!(kv.get("k").unwrap(), Blob::from("value"));
    }

    #[test]
    fn test_get_missing() {
        let kv = MemoryKv::new();
        assert!(matches!(kv.get("nope"), Err(StrataError::KeyNotFound(_))));
    }

    #[test]
    fn test_has_treats_empty_value_as_absent() {
        let kv = MemoryKv::new();
        assert!(!kv.has("k").unwrap());

        kv.put("k", &Blob::default()).unwrap();
        assert!(!kv.has("k").unwrap());

        kv.put("k", &Blob::from("v")).unwrap();
        assert!(kv.has("k").unwrap());
    }

    #[test]
    fn test_empty_key_rejected() {
        let kv = MemoryKv::new();
        assert!(matches!(kv.get(""), Err(StrataError::EmptyKey)));
        assert!(matches!(
            kv.put("", &Blob::from("v")),
            Err(StrataError::EmptyKey)
        ));
        assert!(matches!(kv.has(""), Err(StrataError::EmptyKey)));
    }

    #[test]
    fn test_put_new() {
        let kv = MemoryKv::new();
        assert!(kv.put_new("k", &Blob::from("first")).unwrap());
        assert!(!kv.put_new("k", &Blob::from("second")).unwrap());
        assert_eq!(kv.get("k").unwrap(), Blob::from("first"));
    }

    #[test]
    fn test_put_new_claims_empty_slot() {
        let kv = MemoryKv::new();
        kv.put("k", &Blob::default()).unwrap();
        assert!(kv.put_new("k", &Blob::from("v")).unwrap());
    }

    #[test]
    fn test_cas() {
        let kv = MemoryKv::new();
        kv.put("k", &Blob::from("one")).unwrap();

        assert!(!kv.cas("k", &Blob::from("wrong"), &Blob::from("two")).unwrap());
        assert_eq!(kv.get("k").unwrap(), Blob::from("one"));

        assert!(kv.cas("k", &Blob::from("one"), &Blob::from("two")).unwrap());
        assert_eq!(kv.get("k").unwrap(), Blob::from("two"));
    }

    #[test]
    fn test_put_if_check_error_propagates() {
        let kv = MemoryKv::new();
        kv.put("k", &Blob::from("v")).unwrap();

        let result = kv.put_if("k", &Blob::from("next"), &|_, _| {
            Err(StrataError::Config("boom".to_string()))
        });
        assert!(matches!(result, Err(StrataError::Config(_))));
        assert_eq!(kv.get("k").unwrap(), Blob::from("v"));
    }
}
