//! Settings loading from configuration files.
//!
//! Loading order:
//!
//! 1. Start with default settings.
//! 2. Load from a TOML or JSON document (overriding defaults).
//! 3. Apply environment variable overrides (highest priority).
//!
//! ## Environment Variable Mapping
//!
//! | Env Var | Setting |
//! |---|---|
//! | `STEPFORM_DEBUG` | `debug` |
//! | `STEPFORM_LOG_LEVEL` | `log_level` |
//! | `STEPFORM_LANGUAGE_CODE` | `language_code` |
//! | `STEPFORM_API_PREFIX` | `api_prefix` |
//! | `STEPFORM_API_VERSION` | `api_version` |
//! | `STEPFORM_ASSET_BASE_URL` | `asset_base_url` |
//! | `STEPFORM_THEME` | `theme` |
//! | `STEPFORM_SCROLL_DURATION_MS` | `scroll_duration_ms` |
//!
//! ## Examples
//!
//! ```rust,no_run
//! use stepform_core::settings_loader;
//!
//! let settings = settings_loader::from_toml_file_with_env("config/stepform.toml").unwrap();
//! ```

use std::path::Path;

use crate::error::StepformError;
use crate::settings::Settings;

/// Loads settings from a TOML string.
///
/// Fields missing from the document keep their default values.
///
/// # Errors
///
/// Returns an error if the TOML is malformed or cannot be deserialized.
pub fn from_toml_str(toml_str: &str) -> Result<Settings, StepformError> {
    let toml_value: toml::Value = toml::from_str(toml_str)
        .map_err(|e| StepformError::ImproperlyConfigured(format!("Failed to parse TOML: {e}")))?;

    merge_over_defaults(toml_to_json(toml_value), "TOML")
}

/// Loads settings from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the TOML is malformed.
pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Settings, StepformError> {
    from_toml_str(&read(path.as_ref(), "TOML")?)
}

/// Loads settings from a TOML file and then applies environment variable overrides.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the TOML is malformed.
pub fn from_toml_file_with_env(path: impl AsRef<Path>) -> Result<Settings, StepformError> {
    let mut settings = from_toml_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Loads settings from a JSON string.
///
/// # Errors
///
/// Returns an error if the JSON is malformed or cannot be deserialized.
pub fn from_json_str(json_str: &str) -> Result<Settings, StepformError> {
    let json_value: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| StepformError::ImproperlyConfigured(format!("Failed to parse JSON: {e}")))?;

    merge_over_defaults(json_value, "JSON")
}

/// Loads settings from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the JSON is malformed.
pub fn from_json_file(path: impl AsRef<Path>) -> Result<Settings, StepformError> {
    from_json_str(&read(path.as_ref(), "JSON")?)
}

/// Loads settings from just environment variables (starting from defaults).
pub fn from_env() -> Settings {
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings);
    settings
}

/// Applies `STEPFORM_*` environment variable overrides to a settings struct.
pub fn apply_env_overrides(settings: &mut Settings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Applies overrides from an arbitrary variable lookup.
///
/// Unparseable numeric values are ignored.
pub fn apply_overrides<F>(settings: &mut Settings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup("STEPFORM_DEBUG") {
        settings.debug = matches!(val.to_lowercase().as_str(), "true" | "1" | "yes");
    }

    if let Some(val) = lookup("STEPFORM_LOG_LEVEL") {
        settings.log_level = val;
    }

    if let Some(val) = lookup("STEPFORM_LANGUAGE_CODE") {
        settings.language_code = val;
    }

    if let Some(val) = lookup("STEPFORM_API_PREFIX") {
        settings.api_prefix = val;
    }

    if let Some(val) = lookup("STEPFORM_API_VERSION") {
        settings.api_version = val;
    }

    if let Some(val) = lookup("STEPFORM_ASSET_BASE_URL") {
        settings.asset_base_url = val;
    }

    if let Some(val) = lookup("STEPFORM_THEME") {
        settings.theme = val;
    }

    if let Some(val) = lookup("STEPFORM_SCROLL_DURATION_MS") {
        if let Ok(ms) = val.parse::<u64>() {
            settings.scroll_duration_ms = ms;
        }
    }
}

// ============================================================
// Helpers
// ============================================================

fn read(path: &Path, format: &str) -> Result<String, StepformError> {
    std::fs::read_to_string(path).map_err(|e| {
        StepformError::ImproperlyConfigured(format!(
            "Failed to read {format} file '{}': {e}",
            path.display()
        ))
    })
}

fn merge_over_defaults(
    value: serde_json::Value,
    format: &str,
) -> Result<Settings, StepformError> {
    let default_json = serde_json::to_value(Settings::default()).map_err(|e| {
        StepformError::ImproperlyConfigured(format!("Failed to serialize default settings: {e}"))
    })?;

    serde_json::from_value(merge_json(default_json, value)).map_err(|e| {
        StepformError::ImproperlyConfigured(format!(
            "Failed to deserialize settings from {format}: {e}"
        ))
    })
}

/// Converts a TOML value to a `serde_json::Value`.
fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::json!(i),
        toml::Value::Float(f) => serde_json::json!(f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => serde_json::Value::Object(
            table.into_iter().map(|(k, v)| (k, toml_to_json(v))).collect(),
        ),
    }
}

/// Deep-merges two JSON values. The `override_val` takes precedence.
fn merge_json(base: serde_json::Value, override_val: serde_json::Value) -> serde_json::Value {
    match (base, override_val) {
        (serde_json::Value::Object(mut base_map), serde_json::Value::Object(override_map)) => {
            for (key, override_v) in override_map {
                let merged = match base_map.remove(&key) {
                    Some(base_v) => merge_json(base_v, override_v),
                    None => override_v,
                };
                base_map.insert(key, merged);
            }
            serde_json::Value::Object(base_map)
        }
        (_, override_val) => override_val,
    }
}
