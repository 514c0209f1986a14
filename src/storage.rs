//! Storage for uploaded originals and signed copies.
//!
//! Files are addressed by relative paths of the form `uploads/<name>`, which is also
//! the URL path they are served under. Writes go through a stage/publish protocol so
//! a half written file is never visible under its final name.

use crate::Error;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use uuid::Uuid;

/// Prefix of every path handed out by a storage.
pub const UPLOADS_MOUNT: &str = "uploads";

const STAGING_DIR: &str = ".staging";

/// A file written to a private staging area, not yet visible under its name.
#[derive(Debug)]
pub struct StagedFile {
    name: String,
    staging_key: String,
}

pub trait FileStorage: Send + Sync {
    fn stage(&self, name: &str, bytes: &[u8]) -> Result<StagedFile, Error>;

    /// Atomically move a staged file to its final name, replacing any previous file.
    /// Returns the storage path.
    fn publish(&self, staged: StagedFile) -> Result<String, Error>;

    fn discard(&self, staged: StagedFile) -> Result<(), Error>;

    fn get(&self, path: &str) -> Result<Vec<u8>, Error>;

    fn remove(&self, path: &str) -> Result<(), Error>;

    fn put(&self, name: &str, bytes: &[u8]) -> Result<String, Error> {
        let staged = self.stage(name, bytes)?;
        self.publish(staged)
    }
}

/// Check a file name is a single plain path component.
fn validate_name(name: &str) -> Result<(), Error> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.starts_with(STAGING_DIR)
        || name.contains(|c| c == '/' || c == '\\' || c == '\0')
    {
        return Err(Error::Validation(format!("invalid file name `{}`", name)));
    }
    Ok(())
}

/// Split `uploads/<name>` into `<name>`.
pub fn name_from_path(path: &str) -> Result<&str, Error> {
    let name = path
        .strip_prefix(UPLOADS_MOUNT)
        .and_then(|rest| rest.strip_prefix('/'))
        .ok_or(Error::NotFound)?;
    validate_name(name).map_err(|_| Error::NotFound)?;
    Ok(name)
}

fn storage_path(name: &str) -> String {
    format!("{}/{}", UPLOADS_MOUNT, name)
}

/// Files in a directory on the local disk.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Open (and create if needed) the upload directory at `root`.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, Error> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join(STAGING_DIR))?;
        Ok(LocalStorage { root })
    }

    fn staging_path(&self, staging_key: &str) -> PathBuf {
        self.root.join(STAGING_DIR).join(staging_key)
    }
}

impl FileStorage for LocalStorage {
    fn stage(&self, name: &str, bytes: &[u8]) -> Result<StagedFile, Error> {
        validate_name(name)?;
        let staging_key = format!("{}-{}", Uuid::new_v4().simple(), name);
        let path = self.staging_path(&staging_key);
        fs::write(&path, bytes)?;
        // Make sure the bytes are on disk before the rename makes them visible.
        fs::File::open(&path)?.sync_all()?;
        log::debug!("Staged `{}` as `{}`.", name, path.display());
        Ok(StagedFile {
            name: name.to_owned(),
            staging_key,
        })
    }

    fn publish(&self, staged: StagedFile) -> Result<String, Error> {
        let target = self.root.join(&staged.name);
        let staging_path = self.staging_path(&staged.staging_key);
        if let Err(err) = fs::rename(&staging_path, &target) {
            if let Err(cleanup_err) = fs::remove_file(&staging_path) {
                log::warn!(
                    "Could not remove staged file `{}`: {}",
                    staging_path.display(),
                    cleanup_err
                );
            }
            return Err(err.into());
        }
        Ok(storage_path(&staged.name))
    }

    fn discard(&self, staged: StagedFile) -> Result<(), Error> {
        match fs::remove_file(self.staging_path(&staged.staging_key)) {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }

    fn get(&self, path: &str) -> Result<Vec<u8>, Error> {
        let name = name_from_path(path)?;
        match fs::read(self.root.join(name)) {
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(Error::NotFound),
            result => Ok(result?),
        }
    }

    fn remove(&self, path: &str) -> Result<(), Error> {
        let name = name_from_path(path)?;
        match fs::remove_file(self.root.join(name)) {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
struct MemoryFiles {
    published: HashMap<String, Vec<u8>>,
    staged: HashMap<String, Vec<u8>>,
}

/// Files kept in memory, for tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: Mutex<MemoryFiles>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().published.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn staged_count(&self) -> usize {
        self.lock().staged.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryFiles> {
        self.files
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl FileStorage for MemoryStorage {
    fn stage(&self, name: &str, bytes: &[u8]) -> Result<StagedFile, Error> {
        validate_name(name)?;
        let staging_key = Uuid::new_v4().to_string();
        self.lock()
            .staged
            .insert(staging_key.clone(), bytes.to_vec());
        Ok(StagedFile {
            name: name.to_owned(),
            staging_key,
        })
    }

    fn publish(&self, staged: StagedFile) -> Result<String, Error> {
        let mut files = self.lock();
        let bytes = files
            .staged
            .remove(&staged.staging_key)
            .ok_or_else(|| Error::Other(format!("staged file `{}` vanished", staged.name)))?;
        files.published.insert(staged.name.clone(), bytes);
        Ok(storage_path(&staged.name))
    }

    fn discard(&self, staged: StagedFile) -> Result<(), Error> {
        self.lock().staged.remove(&staged.staging_key);
        Ok(())
    }

    fn get(&self, path: &str) -> Result<Vec<u8>, Error> {
        let name = name_from_path(path)?;
        self.lock()
            .published
            .get(name)
            .cloned()
            .ok_or(Error::NotFound)
    }

    fn remove(&self, path: &str) -> Result<(), Error> {
        let name = name_from_path(path)?;
        self.lock().published.remove(name);
        Ok(())
    }
}
