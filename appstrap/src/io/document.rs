//! Configuration document loading (JSON, TOML or YAML, by extension).

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::core::config::{ConfigKey, ConfigValue, RawConfig};
use crate::error::ConfigError;

/// Read a flat configuration document into a raw layer.
///
/// Unknown keys are ignored. Values must be booleans, strings or integers.
pub fn load_document(path: &Path) -> Result<RawConfig, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let parse_err = |message: String| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    };

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    let object: BTreeMap<String, Value> = match extension.as_deref() {
        Some("toml") => toml::from_str(&contents).map_err(|err| parse_err(err.to_string()))?,
        Some("yaml" | "yml") => {
            serde_yaml::from_str(&contents).map_err(|err| parse_err(err.to_string()))?
        }
        _ => serde_json::from_str(&contents).map_err(|err| parse_err(err.to_string()))?,
    };

    raw_from_object(object).map_err(parse_err)
}

fn raw_from_object(object: BTreeMap<String, Value>) -> Result<RawConfig, String> {
    let mut raw = RawConfig::new();
    for (name, value) in object {
        let Some(key) = ConfigKey::from_name(&name) else {
            debug!(key = %name, "ignoring unknown configuration key");
            continue;
        };
        let value = match value {
            Value::Bool(flag) => ConfigValue::Bool(flag),
            Value::String(text) => ConfigValue::Text(text),
            Value::Number(number) if number.is_u64() || number.is_i64() => {
                ConfigValue::Text(number.to_string())
            }
            Value::Null => continue,
            other => {
                return Err(format!(
                    "`{name}` must be a boolean, string or integer, got {other}"
                ));
            }
        };
        raw.set(key, value);
    }
    Ok(raw)
}
