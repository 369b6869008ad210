//! Local blob store for uploaded files.
//!
//! Files are stored flat under a configured root directory, keyed by their
//! client-supplied filename. Concurrent writes to the same filename resolve
//! last-writer-wins; filename collisions are a client concern. Deleting a
//! missing file is not an error at this layer — the deletion coordinator
//! distinguishes that case.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::PipelineError;
use crate::models::FileRecord;

pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Open (creating if needed) a blob store rooted at `root`.
    pub fn new(root: &Path) -> Result<Self, PipelineError> {
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `bytes` under `filename`, replacing any existing content.
    pub fn put(&self, filename: &str, bytes: &[u8]) -> Result<(), PipelineError> {
        let path = self.resolve(filename)?;
        fs::write(&path, bytes)?;
        debug!(filename, size = bytes.len(), "stored blob");
        Ok(())
    }

    /// Read the raw bytes of a stored file.
    pub fn read(&self, filename: &str) -> Result<Vec<u8>, PipelineError> {
        let path = self.resolve(filename)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(PipelineError::NotFound(filename.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn exists(&self, filename: &str) -> bool {
        self.resolve(filename)
            .map(|p| p.is_file())
            .unwrap_or(false)
    }

    /// List all stored files with their size and upload (mtime) timestamp.
    pub fn list(&self) -> Result<Vec<FileRecord>, PipelineError> {
        let mut records = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let meta = entry.metadata()?;
            if !meta.is_file() {
                continue;
            }
            let filename = entry.file_name().to_string_lossy().into_owned();
            let uploaded_at: DateTime<Utc> = meta
                .modified()
                .map(DateTime::from)
                .unwrap_or_else(|_| Utc::now());
            records.push(FileRecord {
                filename,
                size_bytes: meta.len(),
                uploaded_at,
            });
        }
        // Directory iteration order is platform-dependent
        records.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(records)
    }

    /// Delete a stored file. Returns whether the file existed; a missing
    /// file is not an error.
    pub fn delete(&self, filename: &str) -> Result<bool, PipelineError> {
        let path = self.resolve(filename)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Map a client-supplied filename to a path under the root, rejecting
    /// names that would escape it.
    fn resolve(&self, filename: &str) -> Result<PathBuf, io::Error> {
        if filename.is_empty()
            || filename.contains('/')
            || filename.contains('\\')
            || filename == "."
            || filename == ".."
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid filename: {:?}", filename),
            ));
        }
        Ok(self.root.join(filename))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, BlobStore) {
        let tmp = TempDir::new().unwrap();
        let store = BlobStore::new(tmp.path()).unwrap();
        (tmp, store)
    }

    #[test]
    fn put_then_read_roundtrip() {
        let (_tmp, store) = store();
        store.put("a.txt", b"hello").unwrap();
        assert!(store.exists("a.txt"));
        assert_eq!(store.read("a.txt").unwrap(), b"hello");
    }

    #[test]
    fn list_reports_size() {
        let (_tmp, store) = store();
        store.put("a.txt", b"12345").unwrap();
        store.put("b.txt", b"xy").unwrap();
        let records = store.list().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].filename, "a.txt");
        assert_eq!(records[0].size_bytes, 5);
        assert_eq!(records[1].size_bytes, 2);
    }

    #[test]
    fn delete_is_idempotent() {
        let (_tmp, store) = store();
        store.put("a.txt", b"x").unwrap();
        assert!(store.delete("a.txt").unwrap());
        assert!(!store.delete("a.txt").unwrap());
        assert!(!store.exists("a.txt"));
    }

    #[test]
    fn last_writer_wins() {
        let (_tmp, store) = store();
        store.put("a.txt", b"first").unwrap();
        store.put("a.txt", b"second").unwrap();
        assert_eq!(store.read("a.txt").unwrap(), b"second");
    }

    #[test]
    fn path_escapes_rejected() {
        let (_tmp, store) = store();
        assert!(store.put("../evil.txt", b"x").is_err());
        assert!(store.put("a/b.txt", b"x").is_err());
        assert!(!store.exists("../evil.txt"));
    }
}
