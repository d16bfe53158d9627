//! Parameter initialization and key file lifecycle.
//!
//! ```text
//! generate::<B>() ──► save_proving_key / save_verifying_key
//!
//! unopened::<B>() ──► load_verifying_key(path)
//!                 └─► preload_proving_key(path) ──► load_proving_key()  (lazy)
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, Once, PoisonError};

use log::{debug, info};
use shade_privacy::{TREE_DEPTH, empty_root, poseidon::poseidon_config};

use crate::error::{JoinSplitError, KeyKind, Result};
use crate::joinsplit::JoinSplit;

static INIT: Once = Once::new();

/// Serializes every key file read and write in the process.
static KEY_IO: Mutex<()> = Mutex::new(());

/// One-time setup of the shared hash parameters. Safe to call repeatedly
/// and from many threads.
pub fn initialize() {
    INIT.call_once(|| {
        poseidon_config();
        let root = empty_root(TREE_DEPTH);
        info!(
            "JoinSplit parameters initialized (tree depth {}, empty root {})",
            TREE_DEPTH,
            hex::encode(root.as_bytes())
        );
    });
}

fn io_error(kind: KeyKind, path: &Path, source: io::Error) -> JoinSplitError {
    JoinSplitError::Io {
        kind,
        path: path.to_path_buf(),
        source,
    }
}

fn write_key(kind: KeyKind, path: &Path, bytes: &[u8]) -> Result<()> {
    let _guard = KEY_IO.lock().unwrap_or_else(PoisonError::into_inner);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| io_error(kind, path, e))?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, bytes).map_err(|e| io_error(kind, &tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| io_error(kind, path, e))?;
    Ok(())
}

fn read_key(kind: KeyKind, path: &Path) -> Result<Vec<u8>> {
    let _guard = KEY_IO.lock().unwrap_or_else(PoisonError::into_inner);
    fs::read(path).map_err(|e| io_error(kind, path, e))
}

fn malformed(kind: KeyKind, path: &Path) -> JoinSplitError {
    io_error(
        kind,
        path,
        io::Error::new(io::ErrorKind::InvalidData, format!("malformed {}", kind)),
    )
}

impl JoinSplit {
    pub fn save_proving_key(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = self
            .backend
            .proving_key_bytes()?
            .ok_or(JoinSplitError::KeyAbsent(KeyKind::Proving))?;
        write_key(KeyKind::Proving, path, &bytes)?;
        info!("Saved proving key to {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }

    pub fn save_verifying_key(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = self
            .backend
            .verifying_key_bytes()?
            .ok_or(JoinSplitError::KeyAbsent(KeyKind::Verifying))?;
        write_key(KeyKind::Verifying, path, &bytes)?;
        info!("Saved verifying key to {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }

    pub fn load_verifying_key(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = read_key(KeyKind::Verifying, path)?;
        self.backend
            .load_verifying_key(&bytes)
            .ok_or_else(|| malformed(KeyKind::Verifying, path))?;
        info!(
            "Loaded {} verifying key from {} (blake3 {})",
            self.backend.name(),
            path.display(),
            hex::encode(blake3::hash(&bytes).as_bytes())
        );
        Ok(())
    }

    /// Remember where the proving key lives without reading it.
    pub fn preload_proving_key(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        debug!("Proving key path set to {}", path.display());
        self.proving_key_path = Some(path);
    }

    /// Read the proving key from the preloaded path.
    pub fn load_proving_key(&mut self) -> Result<()> {
        let path = self
            .proving_key_path
            .clone()
            .ok_or(JoinSplitError::KeyPathUnknown(KeyKind::Proving))?;
        let bytes = read_key(KeyKind::Proving, &path)?;
        self.backend
            .load_proving_key(&bytes)
            .ok_or_else(|| malformed(KeyKind::Proving, &path))?;
        info!(
            "Loaded {} proving key from {} ({} bytes)",
            self.backend.name(),
            path.display(),
            bytes.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_is_idempotent() {
        let handles: Vec<_> = (0..4).map(|_| std::thread::spawn(initialize)).collect();
        for h in handles {
            h.join().unwrap();
        }
        initialize();
        assert!(INIT.is_completed());
    }

    #[test]
    fn test_write_key_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/keys/test.vk");
        write_key(KeyKind::Verifying, &path, b"blob").unwrap();
        assert_eq!(read_key(KeyKind::Verifying, &path).unwrap(), b"blob");
        assert!(!dir.path().join("nested/keys/test.vk.tmp").exists());
    }

    #[test]
    fn test_read_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.pk");
        let err = read_key(KeyKind::Proving, &path).unwrap_err();
        assert!(matches!(err, JoinSplitError::Io { kind: KeyKind::Proving, .. }));
    }
}
