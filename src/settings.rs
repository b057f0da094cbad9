//! Open-ended settings bag, saved to and restored from one JSON file.
//!
//! ```no_run
//! use cmlload::Settings;
//!
//! let mut settings = Settings::new();
//! settings.set("somelist", vec![1, 2, 3]).unwrap();
//! settings.set("importantstring", "saveme").unwrap();
//! settings.save(Settings::DEFAULT_FILE).unwrap();
//!
//! let settings = Settings::load(Settings::DEFAULT_FILE).unwrap();
//! let list: Vec<i32> = settings.get("somelist").unwrap().unwrap();
//! ```
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;

use crate::error::{CmlError, Result};

#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings {
    values: Map<String, Value>,
}

impl Settings {
    pub const DEFAULT_FILE: &'static str = "settings.json";

    pub fn new() -> Self {
        Self::default()
    }

    /// Store any serialisable value under `key`, replacing an earlier one.
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> Result<()> {
        self.values.insert(key.to_string(), serde_json::to_value(value)?);
        Ok(())
    }

    /// Typed read of `key`; `Ok(None)` if absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.values
            .get(key)
            .map(|v| serde_json::from_value(v.clone()).map_err(CmlError::from))
            .transpose()
    }

    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.shift_remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| CmlError::NotFound(format!("{}: {e}", path.display())))?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// `key: value` per line.
impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self
            .values
            .iter()
            .map(|(k, v)| format!("{k}: {}", crate::session::value_text(v)))
            .collect();
        f.write_str(&lines.join("\n"))
    }
}

/// `Settings(key=value, …)`.
impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<String> = self.values.iter().map(|(k, v)| format!("{k}={v}")).collect();
        write!(f, "Settings({})", fields.join(", "))
    }
}
