use crate::services::plan_analyzer::{
    AnalyzerOptions, DEFAULT_HIDDEN_NODE_NAMES, DEFAULT_ROW_COUNT_METRIC_NAMES,
};
use crate::utils::{EngineError, EngineResult};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub analyzer: AnalyzerConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Daily rolling log file; stderr only when unset
    pub file: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Plumbing operators hidden from every tier
    pub hidden_node_names: Vec<String>,
    /// Metric names holding a node's output row count
    pub row_count_metric_names: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct OutputConfig {
    /// Pretty-print the JSON result
    pub pretty: bool,
}

/// Where the configuration came from
///
/// Collected while loading and logged once the subscriber is installed, since
/// the subscriber itself is configured from the result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOrigin {
    /// Configuration file that was read; defaults were used when `None`
    pub file: Option<PathBuf>,
    /// `key = value` for every environment override applied
    pub overrides: Vec<String>,
    /// Settings that are valid but probably unintended
    pub warnings: Vec<String>,
}

impl ConfigOrigin {
    pub fn log(&self) {
        match &self.file {
            Some(file) => tracing::info!("Loaded configuration from {}", file.display()),
            None => tracing::warn!("Configuration file not found, using defaults"),
        }
        for applied in &self.overrides {
            tracing::info!("Override {} from env", applied);
        }
        for warning in &self.warnings {
            tracing::warn!("{}", warning);
        }
    }
}

impl Config {
    /// Load configuration with environment variable override support
    ///
    /// Loading order:
    /// 1. Load from the given file, or conf/config.toml / config.toml when present
    /// 2. Override with environment variables (prefixed with APP_)
    /// 3. Validate the final configuration
    pub fn load(path: Option<&Path>) -> EngineResult<(Self, ConfigOrigin)> {
        // 1. Load from config file
        let file = match path {
            Some(path) => Some(path.to_path_buf()),
            None => Self::find_config_file(),
        };
        let mut config = match &file {
            Some(file) => Self::from_toml(file)?,
            None => Config::default(),
        };

        // 2. Override with environment variables
        let overrides = config.apply_env_overrides(|key| std::env::var(key).ok());

        // 3. Validate configuration
        config.validate().map_err(EngineError::config)?;

        let mut warnings = Vec::new();
        if config.analyzer.hidden_node_names.is_empty() {
            warnings.push(
                "analyzer.hidden_node_names is empty, plumbing operators will show in every tier".to_string(),
            );
        }

        Ok((config, ConfigOrigin { file, overrides, warnings }))
    }

    /// Apply environment variable overrides, returning what was applied
    ///
    /// Supported environment variables:
    /// - APP_LOG_LEVEL: Logging level (e.g., "info,plan_lens=debug")
    /// - APP_LOG_FILE: Log file path
    /// - APP_OUTPUT_PRETTY: Pretty-print JSON output (true/false)
    /// - APP_HIDDEN_NODE_NAMES: Comma-separated operator names hidden from every tier
    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) -> Vec<String> {
        let mut applied = Vec::new();

        if let Some(level) = var("APP_LOG_LEVEL") {
            self.logging.level = level;
            applied.push(format!("logging.level = {}", self.logging.level));
        }

        if let Some(file) = var("APP_LOG_FILE") {
            self.logging.file = Some(file).filter(|f| !f.is_empty());
            applied.push(format!("logging.file = {:?}", self.logging.file));
        }

        if let Some(pretty) = var("APP_OUTPUT_PRETTY")
            && let Ok(pretty) = pretty.parse()
        {
            self.output.pretty = pretty;
            applied.push(format!("output.pretty = {}", self.output.pretty));
        }

        if let Some(names) = var("APP_HIDDEN_NODE_NAMES") {
            self.analyzer.hidden_node_names = names
                .split(',')
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string)
                .collect();
            applied.push(format!("analyzer.hidden_node_names = {:?}", self.analyzer.hidden_node_names));
        }

        applied
    }

    /// Validate configuration
    fn validate(&self) -> Result<(), anyhow::Error> {
        if self.logging.level.trim().is_empty() {
            anyhow::bail!("logging.level cannot be empty");
        }

        if self.analyzer.row_count_metric_names.is_empty() {
            anyhow::bail!("analyzer.row_count_metric_names must name at least one metric");
        }

        Ok(())
    }

    fn find_config_file() -> Option<PathBuf> {
        let possible_paths =
            ["conf/config.toml", "config.toml", "./conf/config.toml", "./config.toml"];

        possible_paths.iter().map(PathBuf::from).find(|path| path.exists())
    }

    fn from_toml(path: &Path) -> EngineResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| EngineError::config(format!("cannot read {}: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| EngineError::config(format!("invalid {}: {}", path.display(), e)))
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info,plan_lens=debug".to_string(), file: None }
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            hidden_node_names: DEFAULT_HIDDEN_NODE_NAMES.iter().map(|s| s.to_string()).collect(),
            row_count_metric_names: DEFAULT_ROW_COUNT_METRIC_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl From<&AnalyzerConfig> for AnalyzerOptions {
    fn from(config: &AnalyzerConfig) -> Self {
        AnalyzerOptions {
            hidden_node_names: config.hidden_node_names.clone(),
            row_count_metric_names: config.row_count_metric_names.clone(),
        }
    }
}
