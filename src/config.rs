//! Process configuration, read from `POLYGLOT_*` environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::token_budget::DEFAULT_MODEL;

const DEFAULT_GATE_URL: &str = "http://localhost:54321/functions/v1/translate-post";
const DEFAULT_GATE_TIMEOUT_SECS: u64 = 120;
const DEFAULT_DB_PATH: &str = "translations.db";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct GateConfig {
    pub url: String,
    /// Service credential sent as a bearer token. Not user specific.
    pub token: Option<String>,
    pub timeout: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_GATE_URL.to_string(),
            token: None,
            timeout: Duration::from_secs(DEFAULT_GATE_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ManagerConfig {
    pub default_model: String,
    /// Upper bound for a single gate call. Expiry counts as a transport failure.
    pub gate_timeout: Duration,
    /// Fire the attempt's cancellation token on cancel instead of only
    /// reclassifying the key.
    pub abort_on_cancel: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            default_model: DEFAULT_MODEL.to_string(),
            gate_timeout: Duration::from_secs(DEFAULT_GATE_TIMEOUT_SECS),
            abort_on_cancel: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gate: GateConfig,
    pub manager: ManagerConfig,
    pub db_path: PathBuf,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gate: GateConfig::default(),
            manager: ManagerConfig::default(),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            log_format: LogFormat::Pretty,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Unset or unparsable values
    /// fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let timeout = non_empty("POLYGLOT_GATE_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .map(|secs| Duration::from_secs(secs.max(1)))
            .unwrap_or(Duration::from_secs(DEFAULT_GATE_TIMEOUT_SECS));

        let gate = GateConfig {
            url: non_empty("POLYGLOT_GATE_URL").unwrap_or_else(|| DEFAULT_GATE_URL.to_string()),
            token: non_empty("POLYGLOT_GATE_TOKEN"),
            timeout,
        };

        let manager = ManagerConfig {
            default_model: non_empty("POLYGLOT_DEFAULT_MODEL")
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            gate_timeout: timeout,
            abort_on_cancel: non_empty("POLYGLOT_ABORT_ON_CANCEL")
                .map(|v| parse_bool_env(&v))
                .unwrap_or(false),
        };

        let log_format = match non_empty("POLYGLOT_LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Self {
            gate,
            manager,
            db_path: non_empty("POLYGLOT_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
            log_format,
        }
    }
}

fn parse_bool_env(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = AppConfig::from_lookup(lookup(&[]));
        assert_eq!(config.gate.url, DEFAULT_GATE_URL);
        assert!(config.gate.token.is_none());
        assert_eq!(config.manager.default_model, DEFAULT_MODEL);
        assert_eq!(config.manager.gate_timeout, Duration::from_secs(120));
        assert!(!config.manager.abort_on_cancel);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn reads_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("POLYGLOT_GATE_URL", "https://gate.example/translate"),
            ("POLYGLOT_GATE_TOKEN", "secret"),
            ("POLYGLOT_GATE_TIMEOUT_SECS", "15"),
            ("POLYGLOT_ABORT_ON_CANCEL", "Yes"),
            ("POLYGLOT_LOG_FORMAT", "json"),
            ("POLYGLOT_DB_PATH", "/tmp/t.db"),
        ]));
        assert_eq!(config.gate.url, "https://gate.example/translate");
        assert_eq!(config.gate.token.as_deref(), Some("secret"));
        assert_eq!(config.gate.timeout, Duration::from_secs(15));
        assert_eq!(config.manager.gate_timeout, Duration::from_secs(15));
        assert!(config.manager.abort_on_cancel);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.db_path, PathBuf::from("/tmp/t.db"));
    }

    #[test]
    fn blank_token_and_bad_timeout_fall_back() {
        let config = AppConfig::from_lookup(lookup(&[
            ("POLYGLOT_GATE_TOKEN", "   "),
            ("POLYGLOT_GATE_TIMEOUT_SECS", "soon"),
        ]));
        assert!(config.gate.token.is_none());
        assert_eq!(config.gate.timeout, Duration::from_secs(120));
    }
}
