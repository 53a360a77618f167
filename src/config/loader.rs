//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::config::schema::RouterConfig;
use crate::config::validation::{join_errors, validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value '{value}' for environment variable {var}")]
    Env { var: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// Load, override from the process environment, and validate a TOML file.
pub fn load_config(path: &Path) -> Result<RouterConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: RouterConfig = toml::from_str(&content)?;

    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Build a configuration from the environment alone.
pub fn config_from_env() -> Result<RouterConfig, ConfigError> {
    let mut config = RouterConfig::default();
    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Overlay environment values on top of a parsed configuration.
///
/// `lookup` abstracts the environment so callers can supply their own source.
pub fn apply_env_overrides<F>(config: &mut RouterConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("DATABASE_URL") {
        config.database.primary_url = Some(url);
    }
    if let Some(url) = lookup("DATABASE_REPLICA_URL") {
        config.database.replica_url = Some(url);
    }
    if let Some(raw) = lookup("USE_READ_REPLICA") {
        config.database.use_read_replica = parse_bool("USE_READ_REPLICA", &raw)?;
    }
    if let Some(raw) = lookup("DB_MAX_REPLICATION_LAG_MS") {
        config.replica.max_replication_lag_ms = parse_num("DB_MAX_REPLICATION_LAG_MS", &raw)?;
    }
    if let Some(raw) = lookup("DB_HEALTH_CHECK_INTERVAL_MS") {
        config.replica.health_check_interval_ms = parse_num("DB_HEALTH_CHECK_INTERVAL_MS", &raw)?;
    }
    if let Some(raw) = lookup("DB_MAX_CONSECUTIVE_FAILURES") {
        config.replica.max_consecutive_failures = parse_num("DB_MAX_CONSECUTIVE_FAILURES", &raw)?;
    }
    Ok(())
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::Env { var, value: raw.to_string() }),
    }
}

fn parse_num<T: FromStr>(var: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Env { var, value: raw.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = RouterConfig::default();
        config.database.primary_url = Some("postgres://file/app".into());

        apply_env_overrides(
            &mut config,
            env(&[
                ("DATABASE_URL", "postgres://env/app"),
                ("DATABASE_REPLICA_URL", "postgres://env-replica/app"),
                ("USE_READ_REPLICA", "true"),
                ("DB_MAX_CONSECUTIVE_FAILURES", "5"),
            ]),
        )
        .unwrap();

        assert_eq!(config.database.primary_url.as_deref(), Some("postgres://env/app"));
        assert_eq!(config.database.replica_url.as_deref(), Some("postgres://env-replica/app"));
        assert!(config.database.use_read_replica);
        assert_eq!(config.replica.max_consecutive_failures, 5);
        assert_eq!(config.replica.max_replication_lag_ms, 1000);
    }

    #[test]
    fn test_bad_env_value_is_reported() {
        let mut config = RouterConfig::default();
        let err = apply_env_overrides(&mut config, env(&[("USE_READ_REPLICA", "maybe")])).unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: "USE_READ_REPLICA", .. }));

        let err = apply_env_overrides(&mut config, env(&[("DB_MAX_REPLICATION_LAG_MS", "-4")])).unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: "DB_MAX_REPLICATION_LAG_MS", .. }));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [database]
            primary_url = "postgres://primary/app"
            replica_url = "postgres://replica/app"
            use_read_replica = true

            [replica]
            max_replication_lag_ms = 500
            "#
        )
        .unwrap();

        let content = fs::read_to_string(file.path()).unwrap();
        let config: RouterConfig = toml::from_str(&content).unwrap();
        validate_config(&config).unwrap();

        assert!(config.database.use_read_replica);
        assert_eq!(config.replica.max_replication_lag_ms, 500);
    }

    #[test]
    fn test_validation_errors_are_joined() {
        let err = ConfigError::Validation(vec![
            ValidationError::MissingPrimaryUrl,
            ValidationError::Zero("replica.max_consecutive_failures"),
        ]);
        assert_eq!(
            err.to_string(),
            "Validation failed: database.primary_url is required, replica.max_consecutive_failures must be greater than zero"
        );
    }
}
