// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

/// Name of the slot that holds the task collection.
pub const TASKS_KEY: &str = "tasks";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to serialize value for slot '{key}': {source}")]
    Serialize {
        key: String,
        source: serde_json::Error,
    },

    #[error("failed to write slot '{key}': {source}")]
    Io { key: String, source: io::Error },
}

/// Raw text storage keyed by slot name.
pub trait SlotBackend {
    fn read(&self, key: &str) -> io::Result<Option<String>>;
    fn write(&mut self, key: &str, value: &str) -> io::Result<()>;
    fn remove(&mut self, key: &str) -> io::Result<()>;
}

/// Stores each slot as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn slot_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl SlotBackend for FileBackend {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.slot_path(key)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> io::Result<()> {
        // Ensure the directory exists before saving the file
        fs::create_dir_all(&self.dir)?;

        // Write next to the target and rename over it, so readers only ever
        // see the old or the new content.
        let path = self.slot_path(key);
        let tmp = self.dir.join(format!(".{key}.json.tmp"));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)
    }

    fn remove(&mut self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.slot_path(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// In-process slots. Writes can be made to fail to simulate a full disk.
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    slots: HashMap<String, String>,
    fail_writes: bool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_slot(mut self, key: &str, value: &str) -> Self {
        self.slots.insert(key.to_string(), value.to_string());
        self
    }

    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    pub fn raw(&self, key: &str) -> Option<&str> {
        self.slots.get(key).map(String::as_str)
    }
}

impl SlotBackend for MemoryBackend {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.slots.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> io::Result<()> {
        if self.fail_writes {
            return Err(io::Error::new(
                io::ErrorKind::StorageFull,
                "storage quota exceeded",
            ));
        }
        self.slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> io::Result<()> {
        self.slots.remove(key);
        Ok(())
    }
}

/// Typed JSON load/save on top of a [`SlotBackend`].
///
/// Loading never fails: a missing slot yields the default, and an unreadable
/// one is dropped and replaced by the default.
#[derive(Debug)]
pub struct PersistentStore<B> {
    backend: B,
}

impl<B: SlotBackend> PersistentStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn load<T: DeserializeOwned>(&mut self, key: &str, default: T) -> T {
        let data = match self.backend.read(key) {
            Ok(Some(data)) => data,
            Ok(None) => {
                debug!("Slot '{}' is empty, using default.", key);
                return default;
            }
            // Not valid UTF-8: the slot holds garbage, same as bad JSON.
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                self.discard(key, &e);
                return default;
            }
            Err(e) => {
                warn!("Could not read slot '{}': {}. Using default.", key, e);
                return default;
            }
        };

        match serde_json::from_str(&data) {
            Ok(value) => value,
            Err(e) => {
                self.discard(key, &e);
                default
            }
        }
    }

    fn discard(&mut self, key: &str, reason: &dyn std::fmt::Display) {
        warn!("Slot '{}' is corrupted ({}), discarding it.", key, reason);
        if let Err(e) = self.backend.remove(key) {
            warn!("Failed to remove corrupted slot '{}': {}", key, e);
        }
    }

    pub fn save<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), StoreError> {
        let data = serde_json::to_string_pretty(value).map_err(|source| StoreError::Serialize {
            key: key.to_string(),
            source,
        })?;
        self.backend
            .write(key, &data)
            .map_err(|source| StoreError::Io {
                key: key.to_string(),
                source,
            })
    }
}
