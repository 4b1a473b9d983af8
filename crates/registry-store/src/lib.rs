//! registry-store — the typed Value Store (§4.10): a (domain, key) → value
//! map with kind-exclusive keys and blob-file side effects.

pub mod blob;
pub mod dispatcher;

pub use dispatcher::RequestDispatcher;

use std::path::PathBuf;

use dashmap::DashMap;
use registry_core::errors::{self, ErrorCode};
use registry_core::ValueKind;

/// Errors raised by the Value Store. Values map 1:1 onto the `DATABASE_*`
/// numeric codes (§6), since the original backend forwards its own error
/// code straight through as the wire `ERROR` payload with no remapping.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("no entry for this (domain, key)")]
    NoSuchKey,
    #[error("entry exists with a different value kind")]
    TypeMismatch,
    #[error("store is in an invalid state (blob path escape, bad backend state)")]
    InvalidState,
    #[error("blob file I/O failed")]
    Io,
    #[error("unrecognized value kind")]
    TypeUnknown,
}

impl StoreError {
    pub fn code(&self) -> ErrorCode {
        match self {
            StoreError::NoSuchKey => errors::DATABASE_NO_SUCH_KEY,
            StoreError::TypeMismatch => errors::DATABASE_TYPE_MISMATCH,
            StoreError::InvalidState => errors::DATABASE_INVALID,
            StoreError::Io => errors::DATABASE_IO,
            StoreError::TypeUnknown => errors::DATABASE_TYPE_UNKNOWN,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Entry {
    Int(i64),
    Double(f64),
    String(String),
    /// The blob's bytes live on disk; the map only remembers that a blob
    /// entry exists so `get_type`/kind-change cleanup can find it.
    Blob,
}

impl Entry {
    fn kind(&self) -> ValueKind {
        match self {
            Entry::Int(_) => ValueKind::Int,
            Entry::Double(_) => ValueKind::Double,
            Entry::String(_) => ValueKind::String,
            Entry::Blob => ValueKind::Blob,
        }
    }
}

/// A typed (domain, key) → value map with an associated blob directory.
///
/// Exclusively owned by the Request Dispatcher for its lifetime (§3); not
/// `Sync`-guarded beyond what `DashMap` already provides, since the
/// dispatcher itself is single-threaded (§5).
pub struct ValueStore {
    entries: DashMap<(String, String), Entry>,
    blob_dir: PathBuf,
}

impl ValueStore {
    /// Opens a store rooted at `blob_dir`, which must be an absolute path
    /// to an existing directory (§4.10).
    pub fn open(blob_dir: PathBuf) -> Result<Self, StoreError> {
        if !blob_dir.is_absolute() {
            return Err(StoreError::InvalidState);
        }
        std::fs::create_dir_all(&blob_dir).map_err(|_| StoreError::Io)?;
        Ok(Self {
            entries: DashMap::new(),
            blob_dir,
        })
    }

    fn key(domain: &str, key: &str) -> (String, String) {
        (domain.to_string(), key.to_string())
    }

    /// Removes the prior entry's payload if `domain`/`key` holds one of a
    /// different kind than `new_kind`, deleting its blob file too. Returns
    /// whether a same-kind entry already existed (affects nothing
    /// observable, but useful for tests/logging).
    fn evict_if_kind_changed(&self, domain: &str, key: &str, new_kind: ValueKind) {
        let k = Self::key(domain, key);
        if let Some(prior) = self.entries.get(&k) {
            if prior.kind() != new_kind && prior.kind() == ValueKind::Blob {
                blob::delete(&self.blob_dir, domain, key);
            }
        }
    }

    pub fn get_int(&self, domain: &str, key: &str) -> Result<i64, StoreError> {
        match self.entries.get(&Self::key(domain, key)) {
            Some(e) => match &*e {
                Entry::Int(v) => Ok(*v),
                _ => Err(StoreError::TypeMismatch),
            },
            None => Err(StoreError::NoSuchKey),
        }
    }

    pub fn set_int(&self, domain: &str, key: &str, value: i64) -> Result<(), StoreError> {
        self.evict_if_kind_changed(domain, key, ValueKind::Int);
        self.entries.insert(Self::key(domain, key), Entry::Int(value));
        Ok(())
    }

    pub fn get_double(&self, domain: &str, key: &str) -> Result<f64, StoreError> {
        match self.entries.get(&Self::key(domain, key)) {
            Some(e) => match &*e {
                Entry::Double(v) => Ok(*v),
                _ => Err(StoreError::TypeMismatch),
            },
            None => Err(StoreError::NoSuchKey),
        }
    }

    pub fn set_double(&self, domain: &str, key: &str, value: f64) -> Result<(), StoreError> {
        self.evict_if_kind_changed(domain, key, ValueKind::Double);
        self.entries.insert(Self::key(domain, key), Entry::Double(value));
        Ok(())
    }

    pub fn get_string(&self, domain: &str, key: &str) -> Result<String, StoreError> {
        match self.entries.get(&Self::key(domain, key)) {
            Some(e) => match &*e {
                Entry::String(v) => Ok(v.clone()),
                _ => Err(StoreError::TypeMismatch),
            },
            None => Err(StoreError::NoSuchKey),
        }
    }

    pub fn set_string(&self, domain: &str, key: &str, value: &str) -> Result<(), StoreError> {
        self.evict_if_kind_changed(domain, key, ValueKind::String);
        self.entries
            .insert(Self::key(domain, key), Entry::String(value.to_string()));
        Ok(())
    }

    pub fn get_blob(&self, domain: &str, key: &str) -> Result<Vec<u8>, StoreError> {
        match self.entries.get(&Self::key(domain, key)) {
            Some(e) => match &*e {
                Entry::Blob => blob::read(&self.blob_dir, domain, key),
                _ => Err(StoreError::TypeMismatch),
            },
            None => Err(StoreError::NoSuchKey),
        }
    }

    /// Writes the blob file first, then commits the map entry, so a
    /// mid-operation failure (e.g. a path-containment violation) leaves
    /// the prior entry untouched — the atomic-transaction requirement of
    /// §4.10.
    pub fn set_blob(&self, domain: &str, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        blob::write(&self.blob_dir, domain, key, bytes)?;
        self.evict_if_kind_changed(domain, key, ValueKind::Blob);
        self.entries.insert(Self::key(domain, key), Entry::Blob);
        Ok(())
    }

    pub fn get_type(&self, domain: &str, key: &str) -> Result<ValueKind, StoreError> {
        match self.entries.get(&Self::key(domain, key)) {
            Some(e) => Ok(e.kind()),
            None => Err(StoreError::NoSuchKey),
        }
    }

    /// Lists keys in `domain` matching the shell-glob `pattern`, sorted
    /// lexicographically ascending (§4.10, invariant 8). An empty pattern
    /// matches nothing.
    pub fn enum_keys(&self, domain: &str, pattern: &str) -> Result<Vec<String>, StoreError> {
        if pattern.is_empty() {
            return Ok(Vec::new());
        }
        let matcher = glob::Pattern::new(pattern).map_err(|_| StoreError::InvalidState)?;
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|kv| kv.key().0 == domain && matcher.matches(&kv.key().1))
            .map(|kv| kv.key().1.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (ValueStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = ValueStore::open(dir.path().to_path_buf()).unwrap();
        (store, dir)
    }

    #[test]
    fn set_then_get_int_roundtrips() {
        let (s, _dir) = store();
        s.set_int("d", "n", 0x0123456789abcdefi64).unwrap();
        assert_eq!(s.get_int("d", "n").unwrap(), 0x0123456789abcdefi64);
    }

    #[test]
    fn kind_change_surfaces_type_mismatch_and_switches_type() {
        let (s, _dir) = store();
        s.set_string("d", "x", "abc").unwrap();
        assert_eq!(s.get_type("d", "x").unwrap(), ValueKind::String);

        s.set_int("d", "x", 7).unwrap();
        assert_eq!(s.get_type("d", "x").unwrap(), ValueKind::Int);
        assert_eq!(s.get_string("d", "x"), Err(StoreError::TypeMismatch));
        assert_eq!(s.get_int("d", "x").unwrap(), 7);
    }

    #[test]
    fn blob_roundtrip_and_cleanup_on_kind_change() {
        let (s, dir) = store();
        let bytes = [0x42u8, 0x21, 0x13, 0x23];
        s.set_blob("d", "b", &bytes).unwrap();
        assert_eq!(s.get_blob("d", "b").unwrap(), bytes.to_vec());

        s.set_int("d", "b", 5).unwrap();
        assert_eq!(s.get_int("d", "b").unwrap(), 5);
        assert!(!dir.path().join("d").join("b").exists());
    }

    #[test]
    fn no_such_key_on_absent_entry() {
        let (s, _dir) = store();
        assert_eq!(s.get_int("d", "missing"), Err(StoreError::NoSuchKey));
    }

    #[test]
    fn enum_keys_sorted_ascending() {
        let (s, _dir) = store();
        for (k, _) in [("key3", 0), ("key1", 0), ("key2", 0), ("no match", 0)] {
            s.set_int("enum", k, 0).unwrap();
        }
        let keys = s.enum_keys("enum", "key*").unwrap();
        assert_eq!(keys, vec!["key1", "key2", "key3"]);
    }
}
