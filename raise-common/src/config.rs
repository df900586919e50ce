//! Configuration loading and config file resolution
//!
//! Config file resolution priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. Per-user config file (`~/.config/raise/<module>.toml`)
//! 4. Compiled defaults (fallback, no file)
//!
//! A file named explicitly by (1) or (2) must exist. A missing per-user file
//! falls through to compiled defaults. Nothing here logs: resolution runs
//! before the tracing subscriber exists, so callers report the source.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_VERIFICATION_QUEUE: &str = "RaiseDatasetVerificationQueue";
pub const DEFAULT_RESPONSE_QUEUE: &str = "RaiseDatasetResponseQueue";
pub const DEFAULT_SUBJECT_FIELD: &str = "uniqueIdentifier";
pub const DEFAULT_INSTANCE_ID_FIELD: &str = "instanceId";
pub const DEFAULT_EVALUATION_ENDPOINT: &str =
    "https://api.fair-enough.semanticscience.org/evaluations";
pub const DEFAULT_COLLECTION: &str = "fair-enough-data";
pub const DEFAULT_SUBJECT_PREFIX: &str = "https://doi.org/";
pub const DEFAULT_OUTCOMES_FIELD: &str = "contains";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_INDICATORS_PATH: &str = "tests_relations.json";

/// Top-level TOML configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub logging: LoggingConfig,
    pub queues: QueueConfig,
    pub fields: FieldConfig,
    pub evaluation: EvaluationConfig,
    pub indicators: IndicatorsConfig,
    pub worker: WorkerConfig,
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// Append logs to this file instead of stderr
    pub log_file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_file: None,
        }
    }
}

/// `[queues]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Inbound queue carrying verification requests
    pub verification: String,
    /// Outbound queue receiving reports
    pub response: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            verification: DEFAULT_VERIFICATION_QUEUE.to_string(),
            response: DEFAULT_RESPONSE_QUEUE.to_string(),
        }
    }
}

/// `[fields]` section: envelope field names, which differ per deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    pub subject: String,
    pub instance_id: String,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            subject: DEFAULT_SUBJECT_FIELD.to_string(),
            instance_id: DEFAULT_INSTANCE_ID_FIELD.to_string(),
        }
    }
}

/// `[evaluation]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub endpoint: String,
    pub collection: String,
    /// Prepended to bare identifiers. Empty string sends identifiers verbatim.
    pub subject_prefix: String,
    /// Response field holding the outcome list
    pub outcomes_field: String,
    pub timeout_secs: u64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_EVALUATION_ENDPOINT.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            subject_prefix: DEFAULT_SUBJECT_PREFIX.to_string(),
            outcomes_field: DEFAULT_OUTCOMES_FIELD.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// `[indicators]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorsConfig {
    /// JSON file mapping indicator identifiers to categories
    pub path: PathBuf,
}

impl Default for IndicatorsConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_INDICATORS_PATH),
        }
    }
}

/// `[worker]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub on_evaluation_failure: FailurePolicy,
}

/// What the worker does after an evaluation service failure
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Abandon the current message and keep consuming
    #[default]
    Continue,
    /// Stop the worker with the failure
    Terminate,
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a file that must exist
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            Error::Config(format!("Invalid config file {}: {}", path.display(), e))
        })
    }
}

/// Where the effective configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    CommandLine(PathBuf),
    Environment(PathBuf),
    UserFile(PathBuf),
    CompiledDefaults,
}

/// Resolves and loads a module's TOML config following the priority order
pub struct ConfigResolver {
    module_name: String,
    env_var_name: String,
    user_config_dir: Option<PathBuf>,
}

impl ConfigResolver {
    /// Create a resolver for `module_name`, reading `env_var_name` as the
    /// environment override
    pub fn new(module_name: &str, env_var_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            env_var_name: env_var_name.to_string(),
            user_config_dir: dirs::config_dir().map(|d| d.join("raise")),
        }
    }

    /// Override the per-user config directory (tests, containers)
    pub fn with_user_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.user_config_dir = Some(dir.into());
        self
    }

    /// Per-user config file path, if a config directory is known
    pub fn user_config_path(&self) -> Option<PathBuf> {
        self.user_config_dir
            .as_ref()
            .map(|d| d.join(format!("{}.toml", self.module_name)))
    }

    /// Determine which source wins without reading any file
    pub fn locate(&self, cli_arg: Option<&Path>) -> ConfigSource {
        // Priority 1: Command-line argument
        if let Some(path) = cli_arg {
            return ConfigSource::CommandLine(path.to_path_buf());
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(&self.env_var_name) {
            if !path.trim().is_empty() {
                return ConfigSource::Environment(PathBuf::from(path));
            }
        }

        // Priority 3: Per-user config file
        if let Some(path) = self.user_config_path() {
            if path.exists() {
                return ConfigSource::UserFile(path);
            }
        }

        // Priority 4: Compiled defaults
        ConfigSource::CompiledDefaults
    }

    /// Locate and load the configuration
    pub fn resolve(&self, cli_arg: Option<&Path>) -> Result<(TomlConfig, ConfigSource)> {
        let source = self.locate(cli_arg);
        let config = match &source {
            ConfigSource::CommandLine(path)
            | ConfigSource::Environment(path)
            | ConfigSource::UserFile(path) => TomlConfig::load(path)?,
            ConfigSource::CompiledDefaults => TomlConfig::default(),
        };
        Ok((config, source))
    }
}
