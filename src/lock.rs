//! Exclusive advisory lock over the profile store
//!
//! Held for the duration of every store-mutating or switching command so two
//! concurrent invocations never interleave on the same profile directory.

use std::fs::{self, File, OpenOptions};
use std::path::Path;

use tracing::debug;

use crate::constants::files;
use crate::error::ProfileError;

/// Released when dropped.
///
/// Switch hooks run while the lock is held, so a hook that invokes `save`,
/// `load`, `auto` or `remove` on the same store blocks forever. Read-only
/// commands (`show`, `list`, `fingerprint`) are safe to call from hooks.
pub struct StoreLock {
    #[cfg(unix)]
    _lock: nix::fcntl::Flock<File>,
    #[cfg(not(unix))]
    _file: File,
}

impl StoreLock {
    /// Block until the exclusive lock on `<root>/.lock` is held
    pub fn acquire(root: &Path) -> Result<Self, ProfileError> {
        fs::create_dir_all(root).map_err(|e| ProfileError::storage(root, e))?;

        let path = root.join(files::LOCK);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| ProfileError::storage(&path, e))?;

        #[cfg(unix)]
        let lock = nix::fcntl::Flock::lock(file, nix::fcntl::FlockArg::LockExclusive)
            .map_err(|(_, errno)| ProfileError::storage(&path, errno.into()))?;

        debug!(path = %path.display(), "Acquired store lock");
        Ok(Self {
            #[cfg(unix)]
            _lock: lock,
            #[cfg(not(unix))]
            _file: file,
        })
    }
}
