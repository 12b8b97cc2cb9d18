//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`ConduitSettings::default()`]
//! 2. If `~/.conduit/settings.json` exists, deep-merge user values over defaults
//! 3. Apply environment variable overrides (highest priority)

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::ConduitSettings;

/// Resolve the path to the settings file (`~/.conduit/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".conduit").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<ConduitSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. A file with invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<ConduitSettings> {
    let mut settings = read_settings_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Defaults merged with the file at `path`, without env overrides.
pub fn read_settings_file(path: &Path) -> Result<ConduitSettings> {
    let defaults = serde_json::to_value(ConduitSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let user: Value = serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    serde_json::from_value(merged).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Lay the user's `settings.json` over the compiled defaults.
///
/// Sections (`origin`, `relay`, `client`, `logging`) merge key by key, so a
/// file that sets only `relay.originUrl` keeps every other relay default.
/// Scalars and arrays in the file replace the default outright, and `null`
/// leaves the default in place.
pub fn deep_merge(defaults: Value, overlay: Value) -> Value {
    match (defaults, overlay) {
        (Value::Object(mut merged), Value::Object(overlay)) => {
            for (key, value) in overlay.into_iter().filter(|(_, v)| !v.is_null()) {
                let next = match merged.remove(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value,
                };
                merged.insert(key, next);
            }
            Value::Object(merged)
        }
        (_, overlay) => overlay,
    }
}

/// Apply `CONDUIT_*` environment variable overrides.
pub fn apply_env_overrides(settings: &mut ConduitSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides from any key lookup. Invalid values are logged and ignored.
pub fn apply_overrides(settings: &mut ConduitSettings, lookup: impl Fn(&str) -> Option<String>) {
    let string = |name: &str| lookup(name).filter(|v| !v.is_empty());
    let port = |name: &str| number(name, string(name), 1u16, u16::MAX);
    let count = |name: &str, min: u64, max: u64| number(name, string(name), min, max);

    // ── Bind addresses ──────────────────────────────────────────────
    if let Some(v) = string("CONDUIT_HOST") {
        settings.origin.host = v.clone();
        settings.relay.host = v;
    }
    if let Some(v) = port("CONDUIT_ORIGIN_PORT") {
        settings.origin.port = v;
    }
    if let Some(v) = port("CONDUIT_RELAY_PORT") {
        settings.relay.port = v;
    }

    // ── Upstream / downstream URLs ──────────────────────────────────
    if let Some(v) = string("CONDUIT_ORIGIN_URL") {
        settings.relay.origin_url = v;
    }
    if let Some(v) = string("CONDUIT_RELAY_URL") {
        settings.client.relay_url = v;
    }
    if let Some(v) = count("CONDUIT_TIMEOUT_SECS", 1, 3_600) {
        settings.relay.timeout_secs = v;
        settings.client.timeout_secs = v;
    }

    // ── Pacing ──────────────────────────────────────────────────────
    if let Some(v) = count("CONDUIT_CHAR_DELAY_MS", 0, 10_000) {
        settings.origin.char_delay_ms = v;
    }
    if let Some(v) = count("CONDUIT_STAGE_BUDGET_MS", 0, 600_000) {
        settings.origin.stage_budget_ms = v;
    }
    if let Some(v) = count("CONDUIT_TOKEN_DELAY_MS", 0, 10_000) {
        settings.origin.token_delay_ms = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = string("CONDUIT_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(raw) = string("CONDUIT_LOG_JSON") {
        match parse_bool(&raw) {
            Some(v) => settings.logging.json = v,
            None => warn!(key = "CONDUIT_LOG_JSON", value = %raw, "invalid boolean env var, ignoring"),
        }
    }
}

fn number<T: FromStr + PartialOrd>(name: &str, raw: Option<String>, min: T, max: T) -> Option<T> {
    let raw = raw?;
    let parsed = parse_in_range(&raw, min, max);
    if parsed.is_none() {
        warn!(key = name, value = %raw, "out-of-range or non-numeric env var, ignoring");
    }
    parsed
}

/// Truthiness of a `CONDUIT_LOG_JSON`-style flag. Case-insensitive
/// `true`/`1`/`yes`/`on` and `false`/`0`/`no`/`off`; anything else is `None`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a number and keep it only if it lies in `min..=max`.
pub fn parse_in_range<T: FromStr + PartialOrd>(val: &str, min: T, max: T) -> Option<T> {
    let n: T = val.trim().parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn deep_merge_objects_recursively() {
        let target = json!({"relay": {"port": 8000, "timeoutSecs": 60}, "origin": {"port": 8001}});
        let source = json!({"relay": {"port": 9000}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["relay"]["port"], 9000);
        assert_eq!(merged["relay"]["timeoutSecs"], 60);
        assert_eq!(merged["origin"]["port"], 8001);
    }

    #[test]
    fn deep_merge_skips_nulls_and_replaces_arrays() {
        let merged = deep_merge(json!({"a": 1, "b": [1, 2]}), json!({"a": null, "b": [3]}));
        assert_eq!(merged, json!({"a": 1, "b": [3]}));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = read_settings_file(&dir.path().join("absent.json")).unwrap();
        assert_eq!(settings.relay.port, 8000);
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"relay":{"originUrl":"http://ml:9001"},"origin":{"charDelayMs":5}}"#,
        )
        .unwrap();

        let settings = read_settings_file(&path).unwrap();
        assert_eq!(settings.relay.origin_url, "http://ml:9001");
        assert_eq!(settings.relay.port, 8000);
        assert_eq!(settings.origin.char_delay_ms, 5);
        assert_eq!(settings.origin.stage_budget_ms, 3_000);
    }

    #[test]
    fn invalid_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(read_settings_file(&path).is_err());
    }

    #[test]
    fn env_overrides_apply() {
        let mut settings = ConduitSettings::default();
        apply_overrides(
            &mut settings,
            lookup(&[
                ("CONDUIT_RELAY_PORT", "9100"),
                ("CONDUIT_ORIGIN_URL", "http://origin:7000"),
                ("CONDUIT_TIMEOUT_SECS", "5"),
                ("CONDUIT_CHAR_DELAY_MS", "0"),
                ("CONDUIT_LOG_JSON", "yes"),
                ("CONDUIT_HOST", "127.0.0.1"),
            ]),
        );
        assert_eq!(settings.relay.port, 9100);
        assert_eq!(settings.relay.origin_url, "http://origin:7000");
        assert_eq!(settings.relay.timeout_secs, 5);
        assert_eq!(settings.client.timeout_secs, 5);
        assert_eq!(settings.origin.char_delay_ms, 0);
        assert!(settings.logging.json);
        assert_eq!(settings.origin.host, "127.0.0.1");
        assert_eq!(settings.relay.host, "127.0.0.1");
    }

    #[test]
    fn invalid_env_values_are_ignored() {
        let mut settings = ConduitSettings::default();
        apply_overrides(
            &mut settings,
            lookup(&[
                ("CONDUIT_RELAY_PORT", "0"),
                ("CONDUIT_ORIGIN_PORT", "not-a-port"),
                ("CONDUIT_TIMEOUT_SECS", "999999"),
                ("CONDUIT_LOG_JSON", "maybe"),
                ("CONDUIT_ORIGIN_URL", ""),
            ]),
        );
        assert_eq!(settings.relay.port, 8000);
        assert_eq!(settings.origin.port, 8001);
        assert_eq!(settings.relay.timeout_secs, 60);
        assert!(!settings.logging.json);
        assert_eq!(settings.relay.origin_url, "http://localhost:8001");
    }

    #[test]
    fn parse_helpers() {
        assert_eq!(parse_bool("ON"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool(" Yes "), Some(true));
        assert_eq!(parse_bool("2"), None);
        assert_eq!(parse_in_range("80", 1u16, u16::MAX), Some(80));
        assert_eq!(parse_in_range::<u16>("70000", 1, u16::MAX), None);
        assert_eq!(parse_in_range(" 5 ", 0u64, 5), Some(5));
        assert_eq!(parse_in_range("10", 0u64, 5), None);
    }
}
