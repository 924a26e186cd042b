use std::time::Duration;

use claims_flow::EngineConfig;
use thiserror::Error;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_PACING_MS: u64 = 500;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a non-negative integer, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        match value {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// Process settings, read once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub port: u16,
    pub log_format: LogFormat,
    pub engine: EngineConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            log_format: LogFormat::default(),
            engine: EngineConfig::default(),
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset keys fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup("PORT") {
            Some(value) => parse_number::<u16>("PORT", value)?,
            None => DEFAULT_PORT,
        };
        let log_format = lookup("LOG_FORMAT")
            .map(|v| LogFormat::parse(&v))
            .unwrap_or_default();

        let pacing_ms = match lookup("CLAIMS_PACING_MS") {
            Some(value) => parse_number::<u64>("CLAIMS_PACING_MS", value)?,
            None => DEFAULT_PACING_MS,
        };
        let mut engine = EngineConfig::default().with_base_pause(Duration::from_millis(pacing_ms));
        if let Some(currency) = lookup("CLAIMS_PAYOUT_CURRENCY").filter(|c| !c.trim().is_empty()) {
            engine = engine.with_payout_currency(currency);
        }

        Ok(Self {
            port,
            log_format,
            engine,
        })
    }
}

fn parse_number<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidNumber { var, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = ServiceConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServiceConfig::default());
        assert!(config.engine.pacing_enabled());
    }

    #[test]
    fn test_zero_pacing_disables_pauses() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("LOG_FORMAT", "pretty"),
            ("CLAIMS_PACING_MS", "0"),
            ("CLAIMS_PAYOUT_CURRENCY", "S$"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(!config.engine.pacing_enabled());
        assert_eq!(config.engine.payout_currency, "S$");
    }

    #[test]
    fn test_rejects_malformed_numbers() {
        let err = ServiceConfig::from_lookup(lookup(&[("CLAIMS_PACING_MS", "fast")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidNumber {
                var: "CLAIMS_PACING_MS",
                value: "fast".to_string()
            }
        );
    }
}
