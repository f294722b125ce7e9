use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use super::{KeyValueStore, StorageError};

/// All keys live in one JSON object on disk, the way a browser's
/// localStorage keeps one document per origin.
///
/// Every write locks the file exclusively, re-reads it and rewrites it
/// whole, so two processes sharing a path never lose each other's keys.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    path: PathBuf,
}

type Document = BTreeMap<String, String>;

impl FileKeyValueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<Document, StorageError> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Document::new()),
            Err(e) => return Err(self.read_error(e)),
        };
        FileExt::lock_shared(&file).map_err(|e| self.read_error(e))?;
        let mut contents = String::new();
        let read = file.read_to_string(&mut contents);
        let _ = FileExt::unlock(&file);
        read.map_err(|e| self.read_error(e))?;
        parse_document(&contents)
    }

    fn update(&self, apply: impl FnOnce(&mut Document)) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.write_error(e))?;
        }
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .map_err(|e| self.write_error(e))?;
        FileExt::lock_exclusive(&file).map_err(|e| self.write_error(e))?;
        let result = self.rewrite_locked(&mut file, apply);
        let _ = FileExt::unlock(&file);
        result
    }

    fn rewrite_locked(
        &self,
        file: &mut File,
        apply: impl FnOnce(&mut Document),
    ) -> Result<(), StorageError> {
        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| self.read_error(e))?;
        let mut document = match parse_document(&contents) {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Replacing corrupt storage document");
                Document::new()
            }
        };
        apply(&mut document);

        let json = serde_json::to_string_pretty(&document)?;
        file.set_len(0).map_err(|e| self.write_error(e))?;
        file.seek(SeekFrom::Start(0))
            .map_err(|e| self.write_error(e))?;
        file.write_all(json.as_bytes())
            .map_err(|e| self.write_error(e))?;
        file.sync_all().map_err(|e| self.write_error(e))
    }

    fn read_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Read {
            path: self.path.clone(),
            source,
        }
    }

    fn write_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

fn parse_document(contents: &str) -> Result<Document, StorageError> {
    if contents.trim().is_empty() {
        return Ok(Document::new());
    }
    Ok(serde_json::from_str(contents)?)
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_document()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(|doc| {
            doc.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        if !self.path.exists() {
            return Ok(());
        }
        self.update(|doc| {
            doc.remove(key);
        })
    }
}
