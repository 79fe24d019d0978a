use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::ledger::{BalanceLedger, LedgerSnapshot};

const LOCK_TIMEOUT: Duration = Duration::from_secs(10);
const LOCK_POLL: Duration = Duration::from_millis(10);

/// JSON state file holding one ledger snapshot.
#[derive(Clone, Debug)]
pub struct StateFile {
    path: PathBuf,
    lock_timeout: Duration,
}

/// Exclusive hold on a state file. Released (lock file removed) on drop.
#[derive(Debug)]
pub struct StateLock {
    path: PathBuf,
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path) {
            warn!(lock = %self.path.display(), %err, "failed to release state lock");
        }
    }
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock_timeout: LOCK_TIMEOUT,
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn lock_path(&self) -> PathBuf {
        let mut lock = self.path.clone().into_os_string();
        lock.push(".lock");
        PathBuf::from(lock)
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    /// Takes the `<file>.lock` sibling, waiting up to the lock timeout for
    /// another holder to release it.
    pub fn lock(&self) -> Result<StateLock, StoreError> {
        fs::create_dir_all(self.parent_dir())?;
        let lock_path = self.lock_path();
        let deadline = Instant::now() + self.lock_timeout;
        loop {
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&lock_path)
            {
                Ok(mut file) => {
                    // holder pid, for whoever has to clean up a stale lock
                    let _ = writeln!(file, "{}", std::process::id());
                    return Ok(StateLock { path: lock_path });
                }
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    if Instant::now() >= deadline {
                        return Err(StoreError::Locked {
                            path: self.path.display().to_string(),
                            lock: lock_path.display().to_string(),
                        });
                    }
                    thread::sleep(LOCK_POLL);
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Reads and verifies the stored snapshot.
    pub fn load(&self) -> Result<BalanceLedger, StoreError> {
        let raw = fs::read(&self.path)?;
        let snapshot: LedgerSnapshot = serde_json::from_slice(&raw)?;
        let ledger = BalanceLedger::from_snapshot(snapshot)?;
        debug!(path = %self.path.display(), height = ledger.height(), "state loaded");
        Ok(ledger)
    }

    /// Writes to a fresh temp file in the same directory, syncs it and
    /// renames it into place.
    pub fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), StoreError> {
        let dir = self.parent_dir();
        fs::create_dir_all(dir)?;

        let bytes = serde_json::to_vec_pretty(snapshot)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|err| err.error)?;
        debug!(path = %self.path.display(), root = %snapshot.state_root_hex(), "state saved");
        Ok(())
    }

    /// Like [`StateFile::save`] but refuses to replace an existing file.
    pub fn create(&self, snapshot: &LedgerSnapshot) -> Result<(), StoreError> {
        if self.exists() {
            return Err(StoreError::AlreadyExists(self.path.display().to_string()));
        }
        self.save(snapshot)
    }

    /// Load, apply `f`, save, all under the file lock. Nothing is written
    /// when `f` fails.
    pub fn transact<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut BalanceLedger) -> Result<T, E>,
        E: From<StoreError>,
    {
        let _lock = self.lock()?;
        let mut ledger = self.load()?;
        let out = f(&mut ledger)?;
        self.save(&ledger.snapshot())?;
        Ok(out)
    }
}
