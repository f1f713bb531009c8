//! Permanent ban list
//!
//! Bans are never lifted by the server; removing an address means editing
//! the persisted file while the server is down.

use crate::store::JsonFile;
use crate::Result;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Set of banned addresses, written through to a JSON array on disk
pub struct BanRegistry {
    banned: Mutex<BTreeSet<String>>,
    file: JsonFile,
}

impl BanRegistry {
    /// Load from `path`; a missing file starts with no bans.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let file = JsonFile::new(path);
        let banned: Vec<String> = file.load_or_default()?;
        Ok(Self {
            banned: Mutex::new(banned.into_iter().collect()),
            file,
        })
    }

    pub fn is_banned(&self, address: &str) -> bool {
        self.banned.lock().contains(address)
    }

    /// Add `address` and persist the full set.
    ///
    /// Banning an already banned address is a no-op and skips the write.
    /// On write failure the address stays banned in memory.
    pub fn ban(&self, address: &str) -> Result<()> {
        self.file.exclusive(|file| {
            let bytes = {
                let mut banned = self.banned.lock();
                if !banned.insert(address.to_string()) {
                    return Ok(());
                }
                file.encode(&*banned)?
            };
            file.write(&bytes)
        })
    }

    pub fn len(&self) -> usize {
        self.banned.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.banned.lock().is_empty()
    }
}
