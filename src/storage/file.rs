use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::KeyValueStore;
use crate::error::{ClientError, Result};

type Values = BTreeMap<String, String>;

/// A store backed by a single JSON object on disk.
///
/// Every read goes to the file, so a login or logout made by another process
/// is seen on the next read. Writes replace the file atomically.
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Opens (and if needed creates the directory for) a store at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        tracing::debug!("📁 Key-value store at {}", path.display());

        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Values> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Values::new()),
            Ok(bytes) => Ok(sonic_rs::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Values::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn persist(&self, values: &Values) -> Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, sonic_rs::to_string(values)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut Values) -> bool) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| ClientError::Storage("file store lock poisoned".to_string()))?;

        let (mut values, recovered) = match self.load() {
            Ok(values) => (values, false),
            Err(ClientError::Serialization(e)) => {
                tracing::warn!("❌ Replacing unreadable store {}: {}", self.path.display(), e);
                (Values::new(), true)
            }
            Err(e) => return Err(e),
        };

        if apply(&mut values) || recovered {
            self.persist(&values)?;
        }
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.update(|values| {
            values.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.update(|values| values.remove(key).is_some())
    }
}
