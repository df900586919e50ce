//! Effective settings for raise-dv
//!
//! The TOML configuration is loaded first; command-line / environment
//! overrides are applied on top, then the result is validated once before
//! anything connects.

use raise_common::config::{FailurePolicy, TomlConfig};
use raise_common::{Error, Result};
use std::path::PathBuf;

/// Individual overrides from the command line or environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub log_level: Option<String>,
    pub indicators_path: Option<PathBuf>,
    pub endpoint: Option<String>,
    pub collection: Option<String>,
    pub subject_prefix: Option<String>,
    pub timeout_secs: Option<u64>,
    pub verification_queue: Option<String>,
    pub response_queue: Option<String>,
    pub subject_field: Option<String>,
    pub instance_id_field: Option<String>,
    pub on_evaluation_failure: Option<FailurePolicy>,
}

/// Apply `overrides` on top of `config`
pub fn apply_overrides(mut config: TomlConfig, overrides: Overrides) -> TomlConfig {
    if let Some(level) = overrides.log_level {
        config.logging.level = level;
    }
    if let Some(path) = overrides.indicators_path {
        config.indicators.path = path;
    }
    if let Some(endpoint) = overrides.endpoint {
        config.evaluation.endpoint = endpoint;
    }
    if let Some(collection) = overrides.collection {
        config.evaluation.collection = collection;
    }
    if let Some(prefix) = overrides.subject_prefix {
        config.evaluation.subject_prefix = prefix;
    }
    if let Some(timeout) = overrides.timeout_secs {
        config.evaluation.timeout_secs = timeout;
    }
    if let Some(queue) = overrides.verification_queue {
        config.queues.verification = queue;
    }
    if let Some(queue) = overrides.response_queue {
        config.queues.response = queue;
    }
    if let Some(field) = overrides.subject_field {
        config.fields.subject = field;
    }
    if let Some(field) = overrides.instance_id_field {
        config.fields.instance_id = field;
    }
    if let Some(policy) = overrides.on_evaluation_failure {
        config.worker.on_evaluation_failure = policy;
    }
    config
}

/// Reject configurations the worker cannot run with
pub fn validate(config: &TomlConfig) -> Result<()> {
    let required = [
        ("queues.verification", &config.queues.verification),
        ("queues.response", &config.queues.response),
        ("fields.subject", &config.fields.subject),
        ("fields.instance_id", &config.fields.instance_id),
        ("evaluation.endpoint", &config.evaluation.endpoint),
        ("evaluation.collection", &config.evaluation.collection),
        ("evaluation.outcomes_field", &config.evaluation.outcomes_field),
    ];
    for (key, value) in required {
        if value.trim().is_empty() {
            return Err(Error::Config(format!("{} must not be empty", key)));
        }
    }

    if config.queues.verification == config.queues.response {
        return Err(Error::Config(format!(
            "Inbound and response queues must differ (both are '{}')",
            config.queues.verification
        )));
    }
    if config.fields.instance_id == "result" {
        return Err(Error::Config(
            "fields.instance_id cannot be 'result' (reserved for the report body)".to_string(),
        ));
    }
    if !(config.evaluation.endpoint.starts_with("http://")
        || config.evaluation.endpoint.starts_with("https://"))
    {
        return Err(Error::Config(format!(
            "evaluation.endpoint must be an http(s) URL, got '{}'",
            config.evaluation.endpoint
        )));
    }
    if config.evaluation.timeout_secs == 0 {
        return Err(Error::Config(
            "evaluation.timeout_secs must be greater than zero".to_string(),
        ));
    }
    if config.indicators.path.as_os_str().is_empty() {
        return Err(Error::Config("indicators.path must not be empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate(&TomlConfig::default()).is_ok());
    }

    #[test]
    fn test_example_config_is_valid_and_matches_defaults() {
        let config =
            TomlConfig::from_toml_str(include_str!("../config/raise-dv.example.toml")).unwrap();
        assert!(validate(&config).is_ok());
        assert_eq!(config, TomlConfig::default());
    }

    #[test]
    fn test_overrides_replace_only_given_values() {
        let config = apply_overrides(
            TomlConfig::default(),
            Overrides {
                endpoint: Some("http://127.0.0.1:8000/evaluations".to_string()),
                subject_prefix: Some(String::new()),
                on_evaluation_failure: Some(FailurePolicy::Terminate),
                ..Overrides::default()
            },
        );

        assert_eq!(config.evaluation.endpoint, "http://127.0.0.1:8000/evaluations");
        assert_eq!(config.evaluation.subject_prefix, "");
        assert_eq!(config.evaluation.collection, "fair-enough-data");
        assert_eq!(config.worker.on_evaluation_failure, FailurePolicy::Terminate);
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_same_queue_rejected() {
        let mut config = TomlConfig::default();
        config.queues.response = config.queues.verification.clone();
        assert!(matches!(validate(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_blank_field_rejected() {
        let mut config = TomlConfig::default();
        config.fields.subject = " ".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_reserved_instance_field_rejected() {
        let mut config = TomlConfig::default();
        config.fields.instance_id = "result".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_timeout_and_bad_endpoint_rejected() {
        let mut config = TomlConfig::default();
        config.evaluation.timeout_secs = 0;
        assert!(validate(&config).is_err());

        let mut config = TomlConfig::default();
        config.evaluation.endpoint = "api.example.org/evaluations".to_string();
        assert!(validate(&config).is_err());
    }
}
