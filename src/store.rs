use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use sha2::{Digest, Sha256};

use crate::data::uri::{ContentUri, Scheme};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Content stores: bytes in, sha256:// locator out
// ---------------------------------------------------------------------------

/// A byte store addressed by the SHA-256 of the content.
pub trait ContentStore {
    /// Store `bytes` and return the locator that identifies them.
    fn store_bytes(&self, bytes: &[u8]) -> Result<ContentUri>;

    /// Fetch the bytes behind a locator previously returned by `store_bytes`.
    fn load_bytes(&self, uri: &ContentUri) -> Result<Vec<u8>>;
}

/// Hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn require_sha256(uri: &ContentUri) -> Result<()> {
    match uri.scheme {
        Scheme::Sha256 => Ok(()),
        other => Err(Error::UnsupportedScheme(other.to_string())),
    }
}

// -- Local directory store --

/// Files laid out as `<root>/sha256/ab/cd/ef/<hex>`.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the blob with the given hex digest.  Short or non-ASCII
    /// digests (which the store never produces itself) get no fan-out
    /// directories.
    pub fn path_for(&self, hash: &str) -> PathBuf {
        let mut path = self.root.join("sha256");
        if hash.len() >= 6 && hash.is_ascii() {
            path.push(&hash[0..2]);
            path.push(&hash[2..4]);
            path.push(&hash[4..6]);
        }
        path.push(hash);
        path
    }
}

impl ContentStore for LocalStore {
    fn store_bytes(&self, bytes: &[u8]) -> Result<ContentUri> {
        let hash = sha256_hex(bytes);
        let path = self.path_for(&hash);
        if path.exists() {
            log::debug!("{} already stored", path.display());
        } else {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            // Write to a sibling then rename so readers never see partial blobs.
            let tmp = path.with_extension("partial");
            fs::write(&tmp, bytes)?;
            fs::rename(&tmp, &path)?;
            log::debug!("stored {} bytes at {}", bytes.len(), path.display());
        }
        Ok(ContentUri::new(Scheme::Sha256, hash))
    }

    fn load_bytes(&self, uri: &ContentUri) -> Result<Vec<u8>> {
        require_sha256(uri)?;
        uri.validate()?;
        let path = self.path_for(&uri.hash);
        if !path.exists() {
            return Err(Error::NotFound(uri.base()));
        }
        Ok(fs::read(path)?)
    }
}

// -- In-memory store --

/// Keeps blobs in a process-local map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct blobs stored.  Still counts after a panic
    /// poisoned the lock.
    pub fn len(&self) -> usize {
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ContentStore for MemoryStore {
    fn store_bytes(&self, bytes: &[u8]) -> Result<ContentUri> {
        let hash = sha256_hex(bytes);
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|_| Error::Io(std::io::Error::other("memory store lock poisoned")))?;
        blobs.entry(hash.clone()).or_insert_with(|| bytes.to_vec());
        Ok(ContentUri::new(Scheme::Sha256, hash))
    }

    fn load_bytes(&self, uri: &ContentUri) -> Result<Vec<u8>> {
        require_sha256(uri)?;
        let blobs = self
            .blobs
            .lock()
            .map_err(|_| Error::Io(std::io::Error::other("memory store lock poisoned")))?;
        blobs
            .get(&uri.hash)
            .cloned()
            .ok_or_else(|| Error::NotFound(uri.base()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_of_known_input() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn local_store_uses_fan_out_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        let uri = store.store_bytes(b"abc").unwrap();

        let expected = dir
            .path()
            .join("sha256/ba/78/16")
            .join("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
        assert!(expected.is_file());
        assert_eq!(store.load_bytes(&uri).unwrap(), b"abc");
    }

    #[test]
    fn local_store_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        let first = store.store_bytes(b"same bytes").unwrap();
        let second = store.store_bytes(b"same bytes").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn missing_content_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        let uri = ContentUri::new(Scheme::Sha256, sha256_hex(b"never stored"));
        assert!(matches!(store.load_bytes(&uri), Err(Error::NotFound(_))));
    }

    #[test]
    fn local_store_refuses_paths_outside_its_root() {
        let dir = tempfile::tempdir().unwrap();
        let secret = dir.path().join("secret.txt");
        std::fs::write(&secret, b"outside the store").unwrap();
        let store = LocalStore::new(dir.path().join("store"));

        let escaping = ContentUri::new(Scheme::Sha256, secret.to_string_lossy());
        assert!(matches!(
            store.load_bytes(&escaping),
            Err(Error::InvalidUri { .. })
        ));

        let non_ascii = ContentUri::new(Scheme::Sha256, "a\u{e9}\u{e9}\u{e9}\u{e9}");
        assert!(matches!(
            store.load_bytes(&non_ascii),
            Err(Error::InvalidUri { .. })
        ));
        // Building the path alone must not panic either.
        let path = store.path_for("a\u{e9}\u{e9}\u{e9}\u{e9}");
        assert_eq!(path.parent(), Some(dir.path().join("store/sha256").as_path()));
    }

    #[test]
    fn memory_store_len_survives_a_poisoned_lock() {
        let store = std::sync::Arc::new(MemoryStore::new());
        store.store_bytes(b"x").unwrap();
        let poisoner = std::sync::Arc::clone(&store);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.blobs.lock().unwrap();
            panic!("poison the lock");
        })
        .join();
        assert!(store.blobs.is_poisoned());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn memory_store_rejects_ipfs_locators() {
        let store = MemoryStore::new();
        let uri = ContentUri::new(Scheme::Ipfs, "bafy");
        assert!(matches!(
            store.load_bytes(&uri),
            Err(Error::UnsupportedScheme(s)) if s == "ipfs"
        ));
        store.store_bytes(b"x").unwrap();
        store.store_bytes(b"x").unwrap();
        assert_eq!(store.len(), 1);
    }
}
