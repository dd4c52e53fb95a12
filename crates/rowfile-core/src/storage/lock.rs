use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::StorageError;

/// An advisory lock (`flock(2)` on Unix) guarding one table file.
///
/// The lock lives in a sibling `<table>.lock` file and is released when this
/// struct is dropped (the underlying file descriptor is closed).
#[derive(Debug)]
pub struct TableLock {
    _file: File,
    path: PathBuf,
}

impl TableLock {
    /// Path of the lock file guarding `table_path`.
    pub fn lock_path(table_path: &Path) -> PathBuf {
        let mut name = OsString::from(table_path.as_os_str());
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Try to acquire an exclusive lock without blocking.
    /// Returns `Err(StorageError::FileLocked)` if another handle holds it.
    pub fn try_exclusive(table_path: &Path) -> Result<Self, StorageError> {
        let path = Self::lock_path(table_path);
        let file = open_lock_file(&path)?;

        file.try_lock_exclusive()
            .map_err(|_| StorageError::FileLocked)?;

        Ok(Self { _file: file, path })
    }

    /// Path of the lock file this guard holds.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn open_lock_file(path: &Path) -> Result<File, StorageError> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;
    Ok(file)
}
