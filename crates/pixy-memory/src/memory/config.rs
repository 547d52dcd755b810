use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Name of the directory holding notes, relative to the workspace.
pub const MEMORY_DIR_NAME: &str = "memory";
/// File name of the long-term note inside the memory directory.
pub const LONG_TERM_FILE_NAME: &str = "MEMORY.md";

const DEFAULT_SEARCH_MAX_RESULTS: usize = 10;
const SEARCH_MAX_RESULTS_CAP: usize = 50;
const DEFAULT_CONSOLIDATION_MAX_ITERATIONS: usize = 10;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration for the memory subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Workspace root. Notes live under `<workspace>/memory`, and the
    /// consolidation file tools are confined to this directory.
    pub workspace: PathBuf,

    /// Result count used by search when the caller gives none.
    pub search_default_max_results: usize,

    /// Upper bound applied to any requested result count.
    pub search_max_results_cap: usize,

    /// Completion requests allowed per consolidation run.
    pub consolidation_max_iterations: usize,

    /// Optional deadline for each completion request.
    pub request_timeout_secs: Option<u64>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            workspace: PathBuf::from("."),
            search_default_max_results: DEFAULT_SEARCH_MAX_RESULTS,
            search_max_results_cap: SEARCH_MAX_RESULTS_CAP,
            consolidation_max_iterations: DEFAULT_CONSOLIDATION_MAX_ITERATIONS,
            request_timeout_secs: None,
        }
    }
}

impl MemoryConfig {
    /// Create a new memory config rooted at `workspace`.
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
            ..Default::default()
        }
    }

    pub fn memory_dir(&self) -> PathBuf {
        self.workspace.join(MEMORY_DIR_NAME)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Resolve a caller-supplied result count into `[1, cap]`.
    pub fn clamp_max_results(&self, requested: Option<i64>) -> usize {
        let cap = self.search_max_results_cap.max(1);
        match requested {
            None => self.search_default_max_results.clamp(1, cap),
            Some(value) if value < 1 => 1,
            Some(value) => usize::try_from(value).unwrap_or(cap).min(cap),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.search_max_results_cap == 0 {
            return Err(ConfigError::Invalid(
                "search_max_results_cap must be greater than 0".to_string(),
            ));
        }
        if self.search_default_max_results == 0 {
            return Err(ConfigError::Invalid(
                "search_default_max_results must be greater than 0".to_string(),
            ));
        }
        if self.search_default_max_results > self.search_max_results_cap {
            return Err(ConfigError::Invalid(format!(
                "search_default_max_results ({}) exceeds search_max_results_cap ({})",
                self.search_default_max_results, self.search_max_results_cap
            )));
        }
        if self.consolidation_max_iterations == 0 {
            return Err(ConfigError::Invalid(
                "consolidation_max_iterations must be greater than 0".to_string(),
            ));
        }
        if self.request_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be greater than 0 when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Logging options for the `pixy-memory` binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    /// Directory for the log file; `~/.pixy` when unset.
    pub dir: Option<PathBuf>,
    pub file_name: String,
    pub stdout: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
            file_name: "pixy-memory.log".to_string(),
            stdout: false,
        }
    }
}

impl LogConfig {
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".pixy")
        })
    }
}

/// Contents of a `pixy-memory.toml` file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PixyMemoryToml {
    pub memory: MemoryConfig,
    pub log: LogConfig,
}

impl PixyMemoryToml {
    pub fn parse(path: &Path, text: &str) -> Result<Self, ConfigError> {
        let parsed: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        parsed.memory.validate()?;
        Ok(parsed)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &text)
    }

    /// Load `path` if given, otherwise fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}
