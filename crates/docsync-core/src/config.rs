//! Configuration module for docsync.
//!
//! Typed configuration structs that map to the YAML configuration file,
//! with loading, defaults, and the compiled ignore rules the engine
//! consults for every path.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level configuration for the docsync daemon.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Synchronized roots; each runs its own independent scheduler.
    pub roots: Vec<RootConfig>,
    pub watcher: WatcherConfig,
    pub logging: LoggingConfig,
}

/// One synchronized root: a local directory paired with a remote folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootConfig {
    /// Short name used in log output and for the index database file.
    pub name: String,
    /// Local directory to mirror.
    pub local_root: PathBuf,
    /// Remote repository path to mirror, e.g. "/User Homes/alice/sync".
    pub remote_root: String,
    /// Seconds between remote polling cycles.
    pub poll_interval: u64,
    /// Relative path prefixes excluded from synchronization.
    #[serde(default)]
    pub ignored_paths: Vec<String>,
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            local_root: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("~"))
                .join("Documents"),
            remote_root: "/".to_string(),
            poll_interval: 30,
            ignored_paths: Vec::new(),
        }
    }
}

/// Filesystem watcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Seconds a path must stay quiet before its change is acted on.
    pub debounce_delay: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self { debounce_delay: 2 }
    }
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/docsync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("docsync")
            .join("config.yaml")
    }
}

// ---------------------------------------------------------------------------
// Ignore rules
// ---------------------------------------------------------------------------

/// Suffix used for in-flight transfer temp files; never synchronized.
pub const TEMP_SUFFIX: &str = ".sync.tmp";

/// Compiled per-root exclusion rules.
///
/// Combines the configured path prefixes with the built-in filename
/// filter: transfer temp files, editor backups and names the local
/// filesystem cannot represent are never worth synchronizing in either
/// direction.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    prefixes: Vec<String>,
}

impl IgnoreRules {
    /// Build rules from configured relative path prefixes.
    ///
    /// Prefixes are normalized to forward slashes without leading or
    /// trailing separators; empty entries are dropped.
    #[must_use]
    pub fn new(ignored_paths: &[String]) -> Self {
        let prefixes = ignored_paths
            .iter()
            .map(|p| p.trim_matches('/').replace('\\', "/"))
            .filter(|p| !p.is_empty())
            .collect();
        Self { prefixes }
    }

    /// Whether a relative path (slash-delimited) is excluded by prefix.
    ///
    /// Segment-aware: ignoring `"tmp"` does not ignore `"tmp2/x"`.
    #[must_use]
    pub fn is_ignored(&self, rel_path: &str) -> bool {
        self.prefixes.iter().any(|prefix| {
            rel_path == prefix
                || (rel_path.len() > prefix.len()
                    && rel_path.starts_with(prefix.as_str())
                    && rel_path.as_bytes()[prefix.len()] == b'/')
        })
    }

    /// Whether a single file or folder name should ever be synchronized.
    ///
    /// Rejects transfer temp files, common editor backup names, path
    /// separators and control characters, and the `.`/`..` pseudo-names.
    #[must_use]
    pub fn is_name_syncable(name: &str) -> bool {
        if name.is_empty() || name == "." || name == ".." {
            return false;
        }
        if name.ends_with(TEMP_SUFFIX) {
            return false;
        }
        if name.starts_with("~$") || name.ends_with('~') {
            return false;
        }
        if name.contains('/') || name.contains('\\') || name.contains('\0') {
            return false;
        }
        if name.chars().any(char::is_control) {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.roots.is_empty());
        assert_eq!(config.watcher.debounce_delay, 2);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_default_path_is_nonempty() {
        assert!(!Config::default_path().as_os_str().is_empty());
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
roots:
  - name: work
    local_root: /home/alice/work
    remote_root: "/User Homes/alice/work"
    poll_interval: 60
    ignored_paths:
      - build
watcher:
  debounce_delay: 5
logging:
  level: debug
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.roots.len(), 1);
        assert_eq!(config.roots[0].poll_interval, 60);
        assert_eq!(config.roots[0].ignored_paths, vec!["build".to_string()]);
        assert_eq!(config.watcher.debounce_delay, 5);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_load_or_default_on_missing_file() {
        let config = Config::load_or_default(Path::new("/nonexistent/config.yaml"));
        assert!(config.roots.is_empty());
    }

    #[test]
    fn test_ignore_prefix_matching() {
        let rules = IgnoreRules::new(&["tmp".to_string(), "build/out".to_string()]);
        assert!(rules.is_ignored("tmp"));
        assert!(rules.is_ignored("tmp/cache.bin"));
        assert!(rules.is_ignored("build/out/a.o"));
        assert!(!rules.is_ignored("tmp2/x"));
        assert!(!rules.is_ignored("build"));
        assert!(!rules.is_ignored("src/main.rs"));
    }

    #[test]
    fn test_ignore_prefix_normalization() {
        let rules = IgnoreRules::new(&["/tmp/".to_string(), "".to_string()]);
        assert!(rules.is_ignored("tmp/x"));
        assert!(!rules.is_ignored("x"));
    }

    #[test]
    fn test_name_syncable() {
        assert!(IgnoreRules::is_name_syncable("report.pdf"));
        assert!(IgnoreRules::is_name_syncable(".hidden"));
        assert!(!IgnoreRules::is_name_syncable("draft.sync.tmp"));
        assert!(!IgnoreRules::is_name_syncable("~$report.docx"));
        assert!(!IgnoreRules::is_name_syncable("backup~"));
        assert!(!IgnoreRules::is_name_syncable("a/b"));
        assert!(!IgnoreRules::is_name_syncable("bad\0name"));
        assert!(!IgnoreRules::is_name_syncable(".."));
        assert!(!IgnoreRules::is_name_syncable(""));
    }
}
