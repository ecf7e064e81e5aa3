use std::time::Duration;
use tracing::Level;

const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
const DEFAULT_DELAY_MS: u64 = 500;
const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 30;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration the orchestrator needs from its host.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Base URL of the question backend; `/handle-answer` is appended.
    pub backend_url: String,
    pub backend_timeout: Duration,
    /// Pause between a backend answer and the instruction injection.
    pub follow_up_delay: Duration,
    pub log_level: Level,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            backend_timeout: Duration::from_secs(DEFAULT_BACKEND_TIMEOUT_SECS),
            follow_up_delay: Duration::from_millis(DEFAULT_DELAY_MS),
            log_level: Level::INFO,
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let backend_url = std::env::var("FOLLOWUP_BACKEND_URL")
            .unwrap_or_else(|_| DEFAULT_BACKEND_URL.to_string());
        if !(backend_url.starts_with("http://") || backend_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue(
                "FOLLOWUP_BACKEND_URL".to_string(),
                format!("'{}' is not an http(s) URL", backend_url),
            ));
        }

        let follow_up_delay =
            Duration::from_millis(parse_u64("FOLLOWUP_DELAY_MS", DEFAULT_DELAY_MS)?);

        let timeout_secs =
            parse_u64("FOLLOWUP_BACKEND_TIMEOUT_SECS", DEFAULT_BACKEND_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "FOLLOWUP_BACKEND_TIMEOUT_SECS".to_string(),
                "timeout must be greater than zero".to_string(),
            ));
        }

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            backend_url,
            backend_timeout: Duration::from_secs(timeout_secs),
            follow_up_delay,
            log_level,
        })
    }
}

fn parse_u64(var: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidValue(var.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clear_env_vars() {
        unsafe {
            env::remove_var("FOLLOWUP_BACKEND_URL");
            env::remove_var("FOLLOWUP_DELAY_MS");
            env::remove_var("FOLLOWUP_BACKEND_TIMEOUT_SECS");
            env::remove_var("RUST_LOG");
        }
    }

    #[test]
    fn test_config_error_display() {
        let invalid_value =
            ConfigError::InvalidValue("TEST_VAR".to_string(), "bad_value".to_string());
        assert_eq!(
            format!("{}", invalid_value),
            "Invalid value for environment variable TEST_VAR: bad_value"
        );
    }

    #[test]
    #[serial]
    fn test_config_from_env_defaults() {
        clear_env_vars();

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config, Config::default());
        assert_eq!(config.backend_url, "http://localhost:8000");
        assert_eq!(config.follow_up_delay, Duration::from_millis(500));
        assert_eq!(config.backend_timeout, Duration::from_secs(30));
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    #[serial]
    fn test_config_from_env_custom_values() {
        clear_env_vars();
        unsafe {
            env::set_var("FOLLOWUP_BACKEND_URL", "https://questions.internal:9000");
            env::set_var("FOLLOWUP_DELAY_MS", "250");
            env::set_var("FOLLOWUP_BACKEND_TIMEOUT_SECS", "5");
            env::set_var("RUST_LOG", "debug");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.backend_url, "https://questions.internal:9000");
        assert_eq!(config.follow_up_delay, Duration::from_millis(250));
        assert_eq!(config.backend_timeout, Duration::from_secs(5));
        assert_eq!(config.log_level, Level::DEBUG);
        clear_env_vars();
    }

    #[test]
    #[serial]
    fn test_config_invalid_backend_url() {
        clear_env_vars();
        unsafe {
            env::set_var("FOLLOWUP_BACKEND_URL", "localhost:8000");
        }

        let ConfigError::InvalidValue(var, _) = Config::from_env().unwrap_err();
        assert_eq!(var, "FOLLOWUP_BACKEND_URL");
        clear_env_vars();
    }

    #[test]
    #[serial]
    fn test_config_invalid_delay() {
        clear_env_vars();
        unsafe {
            env::set_var("FOLLOWUP_DELAY_MS", "half a second");
        }

        let ConfigError::InvalidValue(var, _) = Config::from_env().unwrap_err();
        assert_eq!(var, "FOLLOWUP_DELAY_MS");
        clear_env_vars();
    }

    #[test]
    #[serial]
    fn test_config_zero_timeout() {
        clear_env_vars();
        unsafe {
            env::set_var("FOLLOWUP_BACKEND_TIMEOUT_SECS", "0");
        }

        let ConfigError::InvalidValue(var, _) = Config::from_env().unwrap_err();
        assert_eq!(var, "FOLLOWUP_BACKEND_TIMEOUT_SECS");
        clear_env_vars();
    }

    #[test]
    #[serial]
    fn test_config_invalid_log_level() {
        clear_env_vars();
        unsafe {
            env::set_var("RUST_LOG", "not-a-level");
        }

        let ConfigError::InvalidValue(var, _) = Config::from_env().unwrap_err();
        assert_eq!(var, "RUST_LOG");
        clear_env_vars();
    }
}
