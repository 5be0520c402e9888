//! Binding of untyped extension arguments onto typed configuration.
//!
//! Catalog authors may spell argument keys in camelCase (`includeNumeric`),
//! kebab-case (`include-numeric`) or snake_case (`include_numeric`). Keys are
//! first rewritten to camelCase, then the resulting map is deserialized into
//! the factory's configuration type. Configuration types are expected to use
//! `#[serde(rename_all = "camelCase", deny_unknown_fields, default)]` so that
//! unknown keys are rejected and missing keys fall back to defaults.

use appbroker_core::ExtensionArgs;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::ExtensionError;

/// Configuration for extensions that accept no arguments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmptyConfig {}

/// Rewrites a kebab-case or snake_case key to camelCase.
///
/// Keys already in camelCase are returned unchanged.
#[must_use]
pub fn canonical_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper_next = false;
    for ch in key.chars() {
        if ch == '-' || ch == '_' {
            upper_next = !out.is_empty();
            continue;
        }
        if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Binds `args` onto a fresh configuration object for extension `name`.
///
/// # Errors
///
/// Returns [`ExtensionError::InvalidConfiguration`] if two keys normalize to
/// the same field, if a key is not recognized, or if a value has the wrong type.
pub fn bind_config<C: DeserializeOwned>(
    name: &str,
    args: &ExtensionArgs,
) -> Result<C, ExtensionError> {
    let mut normalized = serde_json::Map::with_capacity(args.len());
    for (key, value) in args {
        let canonical = canonical_key(key);
        if normalized.contains_key(&canonical) {
            return Err(ExtensionError::InvalidConfiguration {
                name: name.to_string(),
                reason: format!("argument '{canonical}' is supplied more than once"),
            });
        }
        normalized.insert(canonical, value.clone());
    }

    serde_json::from_value(Value::Object(normalized)).map_err(|e| {
        ExtensionError::InvalidConfiguration {
            name: name.to_string(),
            reason: e.to_string(),
        }
    })
}

/// Accepts either a list of strings or a single comma-separated string.
///
/// # Errors
///
/// Fails if the value is neither a string nor a list of strings.
pub fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrList {
        One(String),
        Many(Vec<String>),
    }

    Ok(match StringOrList::deserialize(deserializer)? {
        StringOrList::One(joined) => joined
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        StringOrList::Many(list) => list,
    })
}
