use std::path::Path;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::FilterError;

/// Per-user key/value storage owned by the hosting application.
///
/// Keys are dot-delimited paths into nested objects, so `"search.daterange.start"`
/// addresses `start` inside `daterange` inside `search`.
pub trait SessionStore {
    /// Whether a value (including `null`) is stored at `key`.
    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    fn get(&self, key: &str) -> Option<Value>;

    /// Store `value` at `key`, creating intermediate objects as needed.
    fn set(&mut self, key: &str, value: Value);

    /// Remove the value at `key`, returning it if present.
    fn forget(&mut self, key: &str) -> Option<Value>;
}

impl<S: SessionStore + ?Sized> SessionStore for &mut S {
    fn has(&self, key: &str) -> bool {
        (**self).has(key)
    }

    fn get(&self, key: &str) -> Option<Value> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: Value) {
        (**self).set(key, value)
    }

    fn forget(&mut self, key: &str) -> Option<Value> {
        (**self).forget(key)
    }
}

/// In-process session store backed by a JSON object.
///
/// Snapshots can be loaded from and saved to a JSON file, which is how the
/// CLI keeps filters between invocations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySessionStore {
    data: Map<String, Value>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self, FilterError> {
        match value {
            Value::Object(data) => Ok(Self { data }),
            other => Err(FilterError::InvalidData(format!(
                "session snapshot must be a JSON object, got {other}"
            ))),
        }
    }

    /// Load a snapshot file. A missing file yields an empty store.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FilterError> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("no session snapshot at {}, starting empty", path.display());
            return Ok(Self::new());
        }
        let text = std::fs::read_to_string(path)?;
        if text.trim().is_empty() {
            return Ok(Self::new());
        }
        Self::from_value(serde_json::from_str(&text)?)
    }

    /// Write the snapshot as pretty-printed JSON, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), FilterError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(&self.data)?;
        std::fs::write(path, text)?;
        debug!("saved session snapshot to {}", path.display());
        Ok(())
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.data.clone())
    }

    fn lookup(&self, key: &str) -> Option<&Value> {
        let mut segments = key.split('.');
        let mut current = self.data.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.lookup(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) {
        let mut segments: Vec<&str> = key.split('.').collect();
        let Some(last) = segments.pop() else {
            return;
        };

        let mut map = &mut self.data;
        for segment in segments {
            let entry = map
                .entry(segment)
                .or_insert_with(|| Value::Object(Map::new()));
            // Scalars on the path are replaced by objects.
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            let Value::Object(next) = entry else {
                return;
            };
            map = next;
        }
        map.insert(last.to_string(), value);
    }

    fn forget(&mut self, key: &str) -> Option<Value> {
        let mut segments: Vec<&str> = key.split('.').collect();
        let last = segments.pop()?;

        let mut map = &mut self.data;
        for segment in segments {
            map = map.get_mut(segment)?.as_object_mut()?;
        }
        map.remove(last)
    }
}
