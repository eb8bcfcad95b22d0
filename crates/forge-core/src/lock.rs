use crate::error::{ForgeError, Result};
use crate::paths;
use fd_lock::RwLock;
use std::fs::File;
use std::path::Path;

/// Advisory exclusive lock on `.forge/lock`, held for the duration of a
/// state-mutating command. Acquisition never blocks: a second invocation
/// against the same project fails fast with `Locked` instead of racing on
/// the state file.
pub struct StateLock {
    lock: RwLock<File>,
}

impl StateLock {
    pub fn new(root: &Path) -> Result<Self> {
        let path = paths::lock_path(root);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::options()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;
        Ok(Self {
            lock: RwLock::new(file),
        })
    }

    /// Try to take the exclusive lock without blocking.
    pub fn lock(&mut self) -> Result<LockedGuard<'_>> {
        let guard = self.lock.try_write().map_err(|_| ForgeError::Locked)?;
        Ok(LockedGuard { _guard: guard })
    }
}

pub struct LockedGuard<'a> {
    _guard: fd_lock::RwLockWriteGuard<'a, File>,
}
