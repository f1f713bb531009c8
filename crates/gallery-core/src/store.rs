//! JSON-backed persistence
//!
//! Both persisted maps are whole-file JSON documents, read once at startup
//! and rewritten in full after every mutation.

use crate::{Error, Result};
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::runtime::{Handle, RuntimeFlavor};

/// Run blocking file work, handing the worker thread's other tasks off
/// first when called on a multi-thread runtime.
///
/// A current-thread runtime cannot hand off, so there (and outside any
/// runtime) `f` just runs.
fn offload<R>(f: impl FnOnce() -> R) -> R {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

/// A JSON document on disk
#[derive(Debug)]
pub struct JsonFile {
    path: PathBuf,
    writer: Mutex<()>,
}

impl JsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: Mutex::new(()),
        }
    }

    /// Read and decode the document. A missing file yields `T::default()`.
    pub fn load_or_default<T: DeserializeOwned + Default>(&self) -> Result<T> {
        match std::fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| self.persist_error(e.into())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(T::default()),
            Err(e) => Err(self.persist_error(e.into())),
        }
    }

    /// Run `f` as the only writer of this file.
    ///
    /// Snapshots encoded inside `f` reach the disk in the order they were
    /// taken. Callers keep their own state lock only around the mutation
    /// and [`encode`](Self::encode), never around [`write`](Self::write).
    pub fn exclusive<R>(&self, f: impl FnOnce(&Self) -> R) -> R {
        offload(|| {
            let _writer = self.writer.lock();
            f(self)
        })
    }

    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| self.persist_error(e.into()))
    }

    /// Rewrite the whole file.
    pub fn write(&self, bytes: &[u8]) -> Result<()> {
        std::fs::write(&self.path, bytes).map_err(|e| self.persist_error(e.into()))
    }

    fn persist_error(&self, source: Error) -> Error {
        Error::Persist {
            path: self.path.clone(),
            source: Box::new(source),
        }
    }
}

/// Comments keyed by image path, in submission order
pub struct CommentStore {
    comments: Mutex<BTreeMap<String, Vec<String>>>,
    file: JsonFile,
}

impl CommentStore {
    /// Load from `path`; a missing file starts an empty store.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let file = JsonFile::new(path);
        let comments = file.load_or_default()?;
        Ok(Self {
            comments: Mutex::new(comments),
            file,
        })
    }

    /// Comments for one image; empty when the image has none.
    pub fn get(&self, image_path: &str) -> Vec<String> {
        self.comments
            .lock()
            .get(image_path)
            .cloned()
            .unwrap_or_default()
    }

    /// Append a comment and persist the whole map.
    ///
    /// If the write fails the append is undone, so memory never holds
    /// state that a restart would lose.
    pub fn add(&self, image_path: &str, comment: &str) -> Result<()> {
        self.file.exclusive(|file| {
            let written = {
                let mut comments = self.comments.lock();
                comments
                    .entry(image_path.to_string())
                    .or_default()
                    .push(comment.to_string());
                file.encode(&*comments)
            }
            .and_then(|bytes| file.write(&bytes));

            if written.is_err() {
                let mut comments = self.comments.lock();
                if let Some(list) = comments.get_mut(image_path) {
                    list.pop();
                    if list.is_empty() {
                        comments.remove(image_path);
                    }
                }
            }
            written
        })
    }

    /// Number of images with at least one comment
    pub fn image_count(&self) -> usize {
        self.comments.lock().len()
    }
}
