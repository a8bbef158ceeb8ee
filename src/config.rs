use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{EduCopyError, EduCopyResult};

/// Persisted key names. These match the settings page and the message protocol.
pub mod keys {
    pub const API_KEY: &str = "apiKey";
    pub const API_ENDPOINT: &str = "apiEndpoint";
    pub const MODEL: &str = "model";
    pub const CUSTOM_MODEL: &str = "customModel";
    pub const OCR_MODEL: &str = "ocrModel";
    pub const PROMPT_TEMPLATE: &str = "promptTemplate";
    pub const NOTIFICATIONS_ENABLED: &str = "notificationsEnabled";
    pub const SHOW_PREVIEW: &str = "showPreview";

    pub const ALL: [&str; 8] = [
        API_KEY,
        API_ENDPOINT,
        MODEL,
        CUSTOM_MODEL,
        OCR_MODEL,
        PROMPT_TEMPLATE,
        NOTIFICATIONS_ENABLED,
        SHOW_PREVIEW,
    ];
}

/// Model selector value meaning "use `customModel` instead".
pub const CUSTOM_MODEL_SENTINEL: &str = "custom";

/// Opaque persisted key-value storage shared by the Controller and the Agent.
pub trait ConfigStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value) -> EduCopyResult<()>;
}

/// Typed view over the persisted configuration, read once per task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_endpoint: Option<String>,
    /// Named model, or `"custom"` to use `custom_model`.
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub custom_model: Option<String>,
    /// Model used for region captures. Falls back to the text model.
    #[serde(default)]
    pub ocr_model: Option<String>,
    #[serde(default = "default_prompt_template")]
    pub prompt_template: String,
    #[serde(default = "default_true")]
    pub notifications_enabled: bool,
    #[serde(default = "default_true")]
    pub show_preview: bool,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

pub(crate) fn default_prompt_template() -> String {
    "{text}".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_endpoint: None,
            model: default_model(),
            custom_model: None,
            ocr_model: None,
            prompt_template: default_prompt_template(),
            notifications_enabled: true,
            show_preview: true,
        }
    }
}

impl Settings {
    /// Read every known key from the store. Missing or null keys take their defaults.
    pub fn load(store: &dyn ConfigStore) -> EduCopyResult<Self> {
        let mut map = serde_json::Map::new();
        for key in keys::ALL {
            if let Some(value) = store.get(key) {
                if !value.is_null() {
                    map.insert(key.to_string(), value);
                }
            }
        }
        let settings: Settings = serde_json::from_value(Value::Object(map))
            .map_err(|e| EduCopyError::Config(format!("invalid stored settings: {e}")))?;
        Ok(settings)
    }

    /// Returns `(endpoint, api_key)` or `ConfigMissing` when either is absent or blank.
    pub fn credentials(&self) -> EduCopyResult<(&str, &str)> {
        let endpoint = non_blank(self.api_endpoint.as_deref());
        let key = non_blank(self.api_key.as_deref());
        match (endpoint, key) {
            (Some(endpoint), Some(key)) => Ok((endpoint, key)),
            _ => Err(EduCopyError::ConfigMissing),
        }
    }

    /// The model name sent to the API for text tasks.
    pub fn effective_model(&self) -> String {
        if self.model == CUSTOM_MODEL_SENTINEL {
            self.custom_model.clone().unwrap_or_default()
        } else {
            self.model.clone()
        }
    }

    pub fn effective_ocr_model(&self) -> String {
        match non_blank(self.ocr_model.as_deref()) {
            Some(model) => model.to_string(),
            None => self.effective_model(),
        }
    }

    /// Checks performed by the settings page before persisting.
    pub fn validate_for_save(&self) -> EduCopyResult<()> {
        self.credentials()?;
        if self.model == CUSTOM_MODEL_SENTINEL && non_blank(self.custom_model.as_deref()).is_none() {
            return Err(EduCopyError::Config("please fill in the custom model name".into()));
        }
        Ok(())
    }

    /// Validate, trim and persist every field. An empty template is stored as `{text}`.
    pub fn save(&self, store: &dyn ConfigStore) -> EduCopyResult<()> {
        self.validate_for_save()?;
        let trimmed = |v: &Option<String>| match v {
            Some(s) => Value::String(s.trim().to_string()),
            None => Value::Null,
        };
        let template = match self.prompt_template.trim() {
            "" => default_prompt_template(),
            other => other.to_string(),
        };
        store.set(keys::API_KEY, trimmed(&self.api_key))?;
        store.set(keys::API_ENDPOINT, trimmed(&self.api_endpoint))?;
        store.set(keys::MODEL, Value::String(self.model.clone()))?;
        store.set(keys::CUSTOM_MODEL, trimmed(&self.custom_model))?;
        store.set(keys::OCR_MODEL, trimmed(&self.ocr_model))?;
        store.set(keys::PROMPT_TEMPLATE, Value::String(template))?;
        store.set(keys::NOTIFICATIONS_ENABLED, Value::Bool(self.notifications_enabled))?;
        store.set(keys::SHOW_PREVIEW, Value::Bool(self.show_preview))?;
        tracing::info!(model = %self.model, "settings saved");
        Ok(())
    }
}

fn non_blank(v: Option<&str>) -> Option<&str> {
    v.map(str::trim).filter(|s| !s.is_empty())
}

/// Read the notification flag; anything other than an explicit `false` counts as enabled.
pub fn notifications_enabled(store: &dyn ConfigStore) -> bool {
    !matches!(store.get(keys::NOTIFICATIONS_ENABLED), Some(Value::Bool(false)))
}

pub fn show_preview(store: &dyn ConfigStore) -> bool {
    !matches!(store.get(keys::SHOW_PREVIEW), Some(Value::Bool(false)))
}

/// In-memory store, used by tests and by embedders that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values<I, K>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let map = values.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self {
            values: Mutex::new(map),
        }
    }
}

impl ConfigStore for MemoryConfigStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> EduCopyResult<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| EduCopyError::Config("config store poisoned".into()))?;
        if value.is_null() {
            values.remove(key);
        } else {
            values.insert(key.to_string(), value);
        }
        Ok(())
    }
}

/// Flat TOML table persisted to disk. A missing or blank `apiKey` / `apiEndpoint`
/// is filled in from `EDUCOPY_API_KEY` / `EDUCOPY_API_ENDPOINT`.
pub struct TomlConfigStore {
    path: PathBuf,
    table: Mutex<toml::Table>,
}

impl TomlConfigStore {
    pub fn open(path: impl Into<PathBuf>) -> EduCopyResult<Self> {
        let path = path.into();
        let table = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            toml::from_str::<toml::Table>(&content)?
        } else {
            toml::Table::new()
        };
        tracing::info!(path = %path.display(), keys = table.len(), "config store opened");
        Ok(Self {
            path,
            table: Mutex::new(table),
        })
    }

    pub fn open_default() -> EduCopyResult<Self> {
        Self::open(resolve_config_path()?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn env_override(key: &str) -> Option<Value> {
        let var = match key {
            keys::API_KEY => "EDUCOPY_API_KEY",
            keys::API_ENDPOINT => "EDUCOPY_API_ENDPOINT",
            _ => return None,
        };
        std::env::var(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(Value::String)
    }

    fn flush(&self, table: &toml::Table) -> EduCopyResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = toml::to_string_pretty(table)?;
        std::fs::write(&self.path, content)?;
        tracing::debug!(path = %self.path.display(), "config saved");
        Ok(())
    }
}

impl ConfigStore for TomlConfigStore {
    fn get(&self, key: &str) -> Option<Value> {
        let stored = self
            .table
            .lock()
            .ok()
            .and_then(|table| table.get(key).and_then(|v| serde_json::to_value(v).ok()));
        match stored {
            Some(Value::String(s)) if s.trim().is_empty() => Self::env_override(key).or(Some(Value::String(s))),
            Some(value) => Some(value),
            None => Self::env_override(key),
        }
    }

    fn set(&self, key: &str, value: Value) -> EduCopyResult<()> {
        let mut table = self
            .table
            .lock()
            .map_err(|_| EduCopyError::Config("config store poisoned".into()))?;
        if value.is_null() {
            table.remove(key);
        } else {
            let toml_value = toml::Value::try_from(&value)
                .map_err(|e| EduCopyError::Config(format!("cannot store '{key}': {e}")))?;
            table.insert(key.to_string(), toml_value);
        }
        self.flush(&table)
    }
}

fn resolve_config_path() -> EduCopyResult<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join("config.toml");
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Ok(candidate);
            }
        }
    }

    let cwd = std::env::current_dir()?;
    let candidate = cwd.join("config.toml");
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Ok(candidate);
    }

    dirs::config_dir()
        .map(|dir| dir.join("educopy").join("config.toml"))
        .ok_or_else(|| EduCopyError::Config("no config directory available on this platform".into()))
}
