//! Key-value persistence for the pet configuration.
//!
//! [`Storage`] is the local-storage seam: a flat map from string keys to
//! string values. [`ConfigStore`] keeps the configuration document under one
//! fixed key and owns the load/merge and validate/save rules.

use std::collections::HashMap;
use std::fmt::Debug;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::config::{CommandConfig, EventConfig, PetConfig, StateConfig};
use crate::error::{Error, Result};

/// Storage key the configuration lives under.
pub const STORAGE_KEY: &str = "streamPetConfig";

/// A flat string key-value store.
pub trait Storage: Debug + Send + Sync {
    /// Read a value. Missing keys are `Ok(None)`.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a value. Deleting a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-process storage, lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Store files under `dir`, creating it on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory holding the files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(source) if source.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(Error::StorageRead {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let write_error = |source| Error::StorageWrite {
            key: key.to_string(),
            source,
        };
        std::fs::create_dir_all(&self.dir).map_err(write_error)?;
        std::fs::write(self.path_for(key), value).map_err(write_error)
    }

    fn remove(&self, key: &str) -> Result<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(source) if source.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(Error::StorageWrite {
                key: key.to_string(),
                source,
            }),
        }
    }
}

/// Loads and saves the [`PetConfig`] document.
///
/// Clones share the storage and the fallback flag.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    storage: Arc<dyn Storage>,
    key: String,
    /// Set while the last [`ConfigStore::load`] had to use the defaults
    /// because the stored document could not be read or parsed.
    fell_back: Arc<AtomicBool>,
}

impl ConfigStore {
    /// A store over `storage` using the standard key.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            key: STORAGE_KEY.to_string(),
            fell_back: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A store backed by fresh in-memory storage.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Use a different storage key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// The storage key in use.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load the configuration, falling back to the defaults if the stored
    /// document is missing, unreadable or malformed.
    ///
    /// A fallback is remembered until the next explicit save, see
    /// [`ConfigStore::fell_back`].
    pub fn load(&self) -> PetConfig {
        match self.try_load() {
            Ok(config) => {
                self.fell_back.store(false, Ordering::Relaxed);
                config
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "falling back to default configuration");
                self.fell_back.store(true, Ordering::Relaxed);
                PetConfig::default()
            }
        }
    }

    /// Whether the last load replaced an unusable stored document with the
    /// defaults. Background saves must not overwrite the document then.
    pub fn fell_back(&self) -> bool {
        self.fell_back.load(Ordering::Relaxed)
    }

    /// Load the configuration, surfacing read and parse errors.
    ///
    /// A missing document is not an error: it yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::StorageRead` or `Error::ConfigParse`.
    pub fn try_load(&self) -> Result<PetConfig> {
        let Some(raw) = self.storage.get(&self.key)? else {
            tracing::debug!(key = %self.key, "no stored configuration, using defaults");
            return Ok(PetConfig::default());
        };
        let stored: Value =
            serde_json::from_str(&raw).map_err(|source| Error::ConfigParse { source })?;
        PetConfig::merged_with(stored)
    }

    /// Validate `config` in place and write it.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigSerialize` if the document cannot be encoded
    /// and `Error::StorageWrite` if the storage rejects the write.
    pub fn save(&self, config: &mut PetConfig) -> Result<()> {
        config.validate();
        let content =
            serde_json::to_string(config).map_err(|source| Error::ConfigSerialize { source })?;
        self.storage.set(&self.key, &content)?;
        self.fell_back.store(false, Ordering::Relaxed);
        tracing::debug!(key = %self.key, bytes = content.len(), "configuration saved");
        Ok(())
    }

    /// Drop the stored document and write the defaults.
    pub fn reset(&self) -> Result<PetConfig> {
        self.storage.remove(&self.key)?;
        let mut config = PetConfig::default();
        self.save(&mut config)?;
        Ok(config)
    }

    /// The loaded configuration as pretty JSON.
    pub fn export(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.load())
            .map_err(|source| Error::ConfigSerialize { source })
    }

    /// Replace the stored configuration with a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if the text is not JSON or lacks a
    /// required section, and `Error::ConfigParse` if it does not fit the
    /// schema.
    pub fn import(&self, json: &str) -> Result<PetConfig> {
        let document: Value = serde_json::from_str(json)
            .map_err(|e| Error::invalid_config(format!("invalid JSON format: {e}")))?;
        self.import_value(document)
    }

    /// Replace the stored configuration with an already-parsed document.
    pub fn import_value(&self, document: Value) -> Result<PetConfig> {
        PetConfig::check_sections(&document)?;
        let mut config = PetConfig::merged_with(document)?;
        self.save(&mut config)?;
        Ok(config)
    }

    /// Insert or replace an event reaction.
    pub fn update_event(&self, name: &str, event: EventConfig) -> Result<()> {
        self.modify(|config| {
            config.events.insert(name.to_string(), event);
            Ok(())
        })
    }

    /// Insert or replace a state.
    pub fn update_state(&self, name: &str, state: StateConfig) -> Result<()> {
        self.modify(|config| {
            config.states.insert(name.to_string(), state);
            Ok(())
        })
    }

    /// Add a new state.
    ///
    /// # Errors
    ///
    /// Returns `Error::AlreadyExists` if the name is taken.
    pub fn add_state(&self, name: &str, state: StateConfig) -> Result<()> {
        self.modify(|config| {
            if config.states.contains_key(name) {
                return Err(Error::already_exists("state", name));
            }
            config.states.insert(name.to_string(), state);
            Ok(())
        })
    }

    /// Delete a state.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if there is no such state.
    pub fn delete_state(&self, name: &str) -> Result<()> {
        self.modify(|config| {
            config
                .states
                .remove(name)
                .map(|_| ())
                .ok_or_else(|| Error::not_found("state", name))
        })
    }

    /// Add a new chat command.
    ///
    /// # Errors
    ///
    /// Returns `Error::AlreadyExists` if the command is taken.
    pub fn add_command(&self, name: &str, command: CommandConfig) -> Result<()> {
        self.modify(|config| {
            if config.commands.contains_key(name) {
                return Err(Error::already_exists("command", name));
            }
            config.commands.insert(name.to_string(), command);
            Ok(())
        })
    }

    /// Insert or replace a chat command.
    pub fn update_command(&self, name: &str, command: CommandConfig) -> Result<()> {
        self.modify(|config| {
            config.commands.insert(name.to_string(), command);
            Ok(())
        })
    }

    /// Delete a chat command.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if there is no such command.
    pub fn delete_command(&self, name: &str) -> Result<()> {
        self.modify(|config| {
            config
                .commands
                .remove(name)
                .map(|_| ())
                .ok_or_else(|| Error::not_found("command", name))
        })
    }

    fn modify(&self, change: impl FnOnce(&mut PetConfig) -> Result<()>) -> Result<()> {
        let mut config = self.load();
        change(&mut config)?;
        self.save(&mut config)
    }
}
