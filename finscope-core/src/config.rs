//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/finscope/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/finscope/` (~/.config/finscope/)
//! - State/Logs: `$XDG_STATE_HOME/finscope/` (~/.local/state/finscope/)

use crate::error::{Error, Result};
use crate::types::{CoverageThresholds, ThresholdSet, ValuePolicy};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Runtime metric thresholds and store behavior
    #[serde(default)]
    pub performance: PerformanceConfig,

    /// Chapter scanning and coverage thresholds
    #[serde(default)]
    pub coverage: CoverageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Default performance thresholds and metrics store settings
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    #[serde(default = "default_max_calculation_time_ms")]
    pub max_calculation_time_ms: f64,

    #[serde(default = "default_max_memory_bytes")]
    pub max_memory_bytes: f64,

    /// One frame at 60fps
    #[serde(default = "default_max_render_time_ms")]
    pub max_render_time_ms: f64,

    #[serde(default = "default_max_recompute_count")]
    pub max_recompute_count: f64,

    /// Ratio between 0.0 and 1.0
    #[serde(default = "default_min_cache_hit_rate")]
    pub min_cache_hit_rate: f64,

    /// Handling of negative and non-finite values
    #[serde(default)]
    pub value_policy: ValuePolicy,

    /// Oldest samples beyond this count are dropped (unbounded if unset)
    #[serde(default)]
    pub max_samples_per_subject: Option<usize>,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            max_calculation_time_ms: default_max_calculation_time_ms(),
            max_memory_bytes: default_max_memory_bytes(),
            max_render_time_ms: default_max_render_time_ms(),
            max_recompute_count: default_max_recompute_count(),
            min_cache_hit_rate: default_min_cache_hit_rate(),
            value_policy: ValuePolicy::default(),
            max_samples_per_subject: None,
        }
    }
}

impl PerformanceConfig {
    /// Default thresholds applied to subjects without overrides.
    pub fn thresholds(&self) -> ThresholdSet {
        ThresholdSet {
            max_calculation_time_ms: self.max_calculation_time_ms,
            max_memory_bytes: self.max_memory_bytes,
            max_render_time_ms: self.max_render_time_ms,
            max_recompute_count: self.max_recompute_count,
            min_cache_hit_rate: self.min_cache_hit_rate,
        }
    }
}

fn default_max_calculation_time_ms() -> f64 {
    ThresholdSet::default().max_calculation_time_ms
}

fn default_max_memory_bytes() -> f64 {
    ThresholdSet::default().max_memory_bytes
}

fn default_max_render_time_ms() -> f64 {
    ThresholdSet::default().max_render_time_ms
}

fn default_max_recompute_count() -> f64 {
    ThresholdSet::default().max_recompute_count
}

fn default_min_cache_hit_rate() -> f64 {
    ThresholdSet::default().min_cache_hit_rate
}

/// Coverage analysis configuration
#[derive(Debug, Deserialize, Clone)]
pub struct CoverageConfig {
    /// Percentage thresholds per coverage metric
    #[serde(default)]
    pub thresholds: CoverageThresholds,

    /// Components with complexity above this are critical paths
    #[serde(default = "default_critical_complexity")]
    pub critical_complexity: u32,

    /// Directory holding one subdirectory per chapter
    #[serde(default = "default_components_root")]
    pub components_root: PathBuf,

    /// Chapter directory name; `{n}` is replaced by the chapter number
    #[serde(default = "default_chapter_dir_template")]
    pub chapter_dir_template: String,

    /// File extensions treated as component sources
    #[serde(default = "default_source_extensions")]
    pub source_extensions: Vec<String>,

    /// Glob patterns (matched against file names) that are never analyzed
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,

    /// Istanbul `coverage-summary.json` to take measured coverage from
    #[serde(default)]
    pub coverage_summary: Option<PathBuf>,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            thresholds: CoverageThresholds::default(),
            critical_complexity: default_critical_complexity(),
            components_root: default_components_root(),
            chapter_dir_template: default_chapter_dir_template(),
            source_extensions: default_source_extensions(),
            exclude_patterns: default_exclude_patterns(),
            coverage_summary: None,
        }
    }
}

impl CoverageConfig {
    /// Directory holding the components of `chapter`.
    pub fn chapter_dir(&self, chapter: u32) -> PathBuf {
        self.components_root.join(
            self.chapter_dir_template
                .replace("{n}", &chapter.to_string()),
        )
    }
}

fn default_critical_complexity() -> u32 {
    5
}

fn default_components_root() -> PathBuf {
    PathBuf::from("src/components/chapters")
}

fn default_chapter_dir_template() -> String {
    "chapter{n}".to_string()
}

fn default_source_extensions() -> Vec<String> {
    ["ts", "tsx", "js", "jsx"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_exclude_patterns() -> Vec<String> {
    vec!["*.test.*".to_string()]
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

fn check_percentage(name: &str, value: f64) -> Result<()> {
    if (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "coverage.thresholds.{} must be between 0 and 100, got {}",
            name, value
        )))
    }
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate value ranges, returning an error describing the first problem
    pub fn validate(&self) -> Result<()> {
        let perf = &self.performance;
        if !(0.0..=1.0).contains(&perf.min_cache_hit_rate) {
            return Err(Error::Config(format!(
                "performance.min_cache_hit_rate must be between 0 and 1, got {}",
                perf.min_cache_hit_rate
            )));
        }
        if perf.max_samples_per_subject == Some(0) {
            return Err(Error::Config(
                "performance.max_samples_per_subject must be at least 1".to_string(),
            ));
        }

        let thresholds = &self.coverage.thresholds;
        check_percentage("statements", thresholds.statements)?;
        check_percentage("branches", thresholds.branches)?;
        check_percentage("functions", thresholds.functions)?;
        check_percentage("lines", thresholds.lines)?;

        if !self.coverage.chapter_dir_template.contains("{n}") {
            return Err(Error::Config(
                "coverage.chapter_dir_template must contain {n}".to_string(),
            ));
        }
        for pattern in &self.coverage.exclude_patterns {
            glob::Pattern::new(pattern)?;
        }
        Ok(())
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/finscope/config.toml` (~/.config/finscope/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("finscope").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/finscope/` (~/.local/state/finscope/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("finscope")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/finscope/finscope.log` (~/.local/state/finscope/finscope.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("finscope.log")
    }
}
