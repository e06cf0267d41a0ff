//! # Settings Persistence
//!
//! Vocabulary categories and mask templates live in named JSON documents.
//! [`FileStore`] maps a name to `<root>/<name>.json`; [`MemoryStore`] keeps
//! documents in memory.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Result, TitlemaskError};

/// Name of the document holding the mask templates.
pub const TEMPLATES: &str = "torrents_masks";

/// Source and sink of settings documents.
pub trait SettingsStore {
    /// Returns the raw contents of the named document.
    ///
    /// # Errors
    ///
    /// `TitlemaskError::MissingSettings` if the document does not exist,
    /// `TitlemaskError::Io` if it cannot be read.
    fn read(&self, name: &str) -> Result<String>;

    /// Replaces the named document. Implementations must never leave a
    /// partially written document behind.
    fn write(&mut self, name: &str, contents: &str) -> Result<()>;
}

/// Reads and deserializes a JSON document from `store`.
pub fn load_json<T, S>(store: &S, name: &str) -> Result<T>
where
    T: DeserializeOwned,
    S: SettingsStore + ?Sized,
{
    let raw = store.read(name)?;
    serde_json::from_str(&raw).map_err(|source| TitlemaskError::MalformedJson {
        name: name.to_string(),
        source,
    })
}

/// Serializes `value` as pretty JSON and writes it to `store`.
pub fn save_json<T, S>(store: &mut S, name: &str, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
    S: SettingsStore + ?Sized,
{
    let json = serde_json::to_string_pretty(value).map_err(|source| {
        TitlemaskError::MalformedJson {
            name: name.to_string(),
            source,
        }
    })?;
    store.write(name, &json)
}

/// Settings directory on disk.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the named document.
    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.json"))
    }
}

impl SettingsStore for FileStore {
    fn read(&self, name: &str) -> Result<String> {
        let path = self.path(name);
        if !path.is_file() {
            return Err(TitlemaskError::MissingSettings {
                name: name.to_string(),
                path,
            });
        }

        std::fs::read_to_string(&path).map_err(|source| TitlemaskError::Io {
            name: name.to_string(),
            source,
        })
    }

    fn write(&mut self, name: &str, contents: &str) -> Result<()> {
        let io_err = |source| TitlemaskError::Io {
            name: name.to_string(),
            source,
        };
        let path = self.path(name);

        // Write next to the target and rename over it, so readers only ever
        // see the old or the new document.
        let mut tmp = NamedTempFile::new_in(&self.root).map_err(io_err)?;
        tmp.write_all(contents.as_bytes()).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&path).map_err(|e| io_err(e.error))?;

        debug!(file = %path.display(), bytes = contents.len(), "settings written");
        Ok(())
    }
}

/// In-memory settings documents.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    documents: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a document, builder style.
    pub fn with(mut self, name: impl Into<String>, contents: impl Into<String>) -> Self {
        self.documents.insert(name.into(), contents.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.documents.get(name).map(String::as_str)
    }
}

impl SettingsStore for MemoryStore {
    fn read(&self, name: &str) -> Result<String> {
        self.documents
            .get(name)
            .cloned()
            .ok_or_else(|| TitlemaskError::MissingSettings {
                name: name.to_string(),
                path: PathBuf::from(format!("memory://{name}")),
            })
    }

    fn write(&mut self, name: &str, contents: &str) -> Result<()> {
        self.documents.insert(name.to_string(), contents.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path());

        store.write("audio_codecs", "{\"aac\": {\"freq\": 1}}").unwrap();
        assert!(dir.path().join("audio_codecs.json").is_file());
        assert_eq!(store.read("audio_codecs").unwrap(), "{\"aac\": {\"freq\": 1}}");
    }

    #[test]
    fn file_store_overwrites_fully() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path());

        store.write("doc", &"x".repeat(1024)).unwrap();
        store.write("doc", "short").unwrap();
        assert_eq!(store.read("doc").unwrap(), "short");

        // Only the target remains; no temp files are left behind.
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn missing_document_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        let err = store.read("release_groups").unwrap_err();
        assert!(matches!(err, TitlemaskError::MissingSettings { ref name, .. } if name == "release_groups"));

        let err = MemoryStore::new().read("release_groups").unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn malformed_json_is_reported() {
        let store = MemoryStore::new().with("doc", "{not json");
        let err = load_json::<BTreeMap<String, u64>, _>(&store, "doc").unwrap_err();
        assert!(matches!(err, TitlemaskError::MalformedJson { ref name, .. } if name == "doc"));
    }

    #[test]
    fn save_then_load_json() {
        let mut store = MemoryStore::new();
        let mut value = BTreeMap::new();
        value.insert("a".to_string(), 3u64);

        save_json(&mut store, "doc", &value).unwrap();
        let back: BTreeMap<String, u64> = load_json(&store, "doc").unwrap();
        assert_eq!(back, value);
    }
}
