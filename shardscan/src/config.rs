use config::{Config as ConfigBuilder, File};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::errors::{SearchError, SearchResult};

const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// Configuration for a sharded search run.
///
/// # Configuration Locations
///
/// Loaded from, in increasing order of precedence:
/// 1. Global `$HOME/.config/shardscan/config.yaml`
/// 2. Local `.shardscan.yaml` in the current directory
/// 3. Custom config file specified via `--config`
///
/// Command-line arguments are applied last through [`SearchConfig::merge_with_cli`].
///
/// # Configuration Format
///
/// ```yaml
/// # Number of workers (default: CPU cores)
/// worker_count: 4
///
/// # Trailing bytes excluded from the searchable region,
/// # e.g. 1 to skip a final newline
/// exclude_trailing: 0
///
/// # Show only statistics
/// stats_only: false
///
/// # Log level (trace, debug, info, warn, error, off)
/// log_level: "info"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Number of workers the input is partitioned across
    #[serde(default = "default_worker_count")]
    pub worker_count: NonZeroUsize,

    /// Bytes at the end of the input that are never searched
    #[serde(default)]
    pub exclude_trailing: usize,

    /// Log level (trace, debug, info, warn, error, off)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to only show statistics instead of individual offsets
    #[serde(default)]
    pub stats_only: bool,
}

/// Values given on the command line; `None` keeps the configured value
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub worker_count: Option<NonZeroUsize>,
    pub exclude_trailing: Option<usize>,
    pub log_level: Option<String>,
    pub stats_only: bool,
}

fn default_worker_count() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN)
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            exclude_trailing: 0,
            log_level: default_log_level(),
            stats_only: false,
        }
    }
}

impl SearchConfig {
    /// Configuration with `workers` workers and defaults for everything else
    pub fn with_workers(workers: usize) -> SearchResult<Self> {
        let worker_count =
            NonZeroUsize::new(workers).ok_or(SearchError::InvalidWorkerCount(workers))?;
        Ok(Self {
            worker_count,
            ..Self::default()
        })
    }

    /// Loads configuration from the default locations
    pub fn load() -> SearchResult<Self> {
        Self::load_from(None)
    }

    /// Loads configuration, layering a specific file over the default locations
    pub fn load_from(config_path: Option<&Path>) -> SearchResult<Self> {
        let mut builder = ConfigBuilder::builder();

        let defaults = [
            // Global config
            dirs::config_dir().map(|p| p.join("shardscan/config.yaml")),
            // Local config
            Some(PathBuf::from(".shardscan.yaml")),
        ];
        for path in defaults.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        // An explicitly named file must exist.
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Merges CLI arguments with configuration file values
    pub fn merge_with_cli(mut self, cli: ConfigOverrides) -> Self {
        if let Some(workers) = cli.worker_count {
            self.worker_count = workers;
        }
        if let Some(exclude) = cli.exclude_trailing {
            self.exclude_trailing = exclude;
        }
        if let Some(level) = cli.log_level {
            self.log_level = level;
        }
        if cli.stats_only {
            self.stats_only = true;
        }
        self
    }

    /// Rejects a log level outside trace, debug, info, warn, error and off.
    /// Worker counts need no check here since `NonZeroUsize` cannot hold zero.
    pub fn validate(&self) -> SearchResult<()> {
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(SearchError::config_error(format!(
                "unknown log level '{}', expected one of {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        let mut file = File::create(&config_path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        (dir, config_path)
    }

    #[test]
    fn test_load_config_file() {
        let (_dir, config_path) = write_config(
            r#"
            worker_count: 4
            exclude_trailing: 1
            stats_only: true
            log_level: "debug"
        "#,
        );

        let config = SearchConfig::load_from(Some(&config_path)).unwrap();
        assert_eq!(config.worker_count, NonZeroUsize::new(4).unwrap());
        assert_eq!(config.exclude_trailing, 1);
        assert!(config.stats_only);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_default_values() {
        let (_dir, config_path) = write_config("stats_only: false\n");

        let config = SearchConfig::load_from(Some(&config_path)).unwrap();
        assert_eq!(
            config.worker_count,
            NonZeroUsize::new(num_cpus::get()).unwrap()
        );
        assert_eq!(config.exclude_trailing, 0);
        assert!(!config.stats_only);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_merge_with_cli() {
        let config_file = SearchConfig {
            worker_count: NonZeroUsize::new(4).unwrap(),
            exclude_trailing: 1,
            log_level: "warn".to_string(),
            stats_only: false,
        };

        let cli = ConfigOverrides {
            worker_count: NonZeroUsize::new(8),
            exclude_trailing: None,
            log_level: Some("debug".to_string()),
            stats_only: true,
        };

        let merged = config_file.merge_with_cli(cli);
        assert_eq!(merged.worker_count, NonZeroUsize::new(8).unwrap()); // CLI value
        assert_eq!(merged.exclude_trailing, 1); // File value (CLI None)
        assert_eq!(merged.log_level, "debug"); // CLI value
        assert!(merged.stats_only); // CLI value
    }

    #[test]
    fn test_zero_workers_rejected() {
        let (_dir, config_path) = write_config("worker_count: 0\n");
        assert!(SearchConfig::load_from(Some(&config_path)).is_err());
        assert!(matches!(
            SearchConfig::with_workers(0),
            Err(SearchError::InvalidWorkerCount(0))
        ));
    }

    #[test]
    fn test_invalid_config() {
        let (_dir, config_path) = write_config(
            r#"
            worker_count: "many"
            exclude_trailing: []
        "#,
        );
        let result = SearchConfig::load_from(Some(&config_path));
        assert!(result.is_err(), "Expected error loading invalid config");
    }

    #[test]
    fn test_unknown_log_level() {
        let config = SearchConfig {
            log_level: "loud".to_string(),
            ..SearchConfig::default()
        };
        assert!(matches!(config.validate(), Err(SearchError::ConfigError(_))));
    }

    #[test]
    fn test_known_log_levels_accepted() {
        for level in ["trace", "DEBUG", "info", "warn", "error", "off"] {
            let config = SearchConfig {
                log_level: level.to_string(),
                ..SearchConfig::default()
            };
            assert!(config.validate().is_ok(), "level {} rejected", level);
        }
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = SearchConfig::load_from(Some(Path::new("nonexistent.yaml")));
        assert!(matches!(result, Err(SearchError::ConfigLoad(_))));
    }
}
