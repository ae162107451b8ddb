//! Runtime configuration
//!
//! Layers, later wins: built-in defaults, TOML file, `CCT_*` environment
//! variables, command line flags (applied by the binary).
//!
//! ```toml
//! modules_dir = "/var/lib/cct/modules"
//! http_timeout_secs = 120
//! git = "/usr/bin/git"
//! verbose = false
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default HTTP timeout for artifact downloads
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 300;

const MIN_HTTP_TIMEOUT_SECS: u64 = 5;
const MAX_HTTP_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ConfigToml {
    modules_dir: Option<PathBuf>,
    http_timeout_secs: Option<u64>,
    git: Option<String>,
    verbose: Option<bool>,
}

/// Resolved configuration for one cct invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Directory scanned for modules; dependencies are cloned below it
    pub modules_dir: PathBuf,
    /// Timeout applied to every artifact download
    pub http_timeout: Duration,
    /// Git executable used to fetch module dependencies
    pub git_bin: String,
    pub verbose: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            modules_dir: default_modules_dir(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            git_bin: "git".to_string(),
            verbose: false,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from `path`, or from the default location when
    /// `path` is `None`. An explicit path must exist; the default one may not.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        match path {
            Some(path) => config.apply_file(path)?,
            None => {
                if let Some(default) = default_config_path()
                    && default.is_file()
                {
                    config.apply_file(&default)?;
                }
            }
        }

        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Merge a TOML configuration file into this configuration
    pub fn apply_file(&mut self, path: &Path) -> Result<()> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let parsed: ConfigToml = toml::from_str(&text)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;

        if let Some(dir) = parsed.modules_dir {
            self.modules_dir = dir;
        }
        if let Some(secs) = parsed.http_timeout_secs {
            self.http_timeout = clamp_timeout(secs);
        }
        if let Some(git) = parsed.git {
            self.git_bin = git;
        }
        if let Some(verbose) = parsed.verbose {
            self.verbose = verbose;
        }
        Ok(())
    }

    /// Apply `CCT_MODULES_DIR`, `CCT_HTTP_TIMEOUT` and `CCT_GIT` overrides.
    ///
    /// Unparseable timeouts are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup("CCT_MODULES_DIR").filter(|s| !s.is_empty()) {
            self.modules_dir = PathBuf::from(dir);
        }
        if let Some(secs) = lookup("CCT_HTTP_TIMEOUT").and_then(|s| s.parse::<u64>().ok()) {
            self.http_timeout = clamp_timeout(secs);
        }
        if let Some(git) = lookup("CCT_GIT").filter(|s| !s.is_empty()) {
            self.git_bin = git;
        }
    }
}

fn clamp_timeout(secs: u64) -> Duration {
    Duration::from_secs(secs.clamp(MIN_HTTP_TIMEOUT_SECS, MAX_HTTP_TIMEOUT_SECS))
}

/// `$XDG_DATA_HOME/cct/modules`, falling back to `~/.local/share`
fn default_modules_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cct/modules")
}

/// `$XDG_CONFIG_HOME/cct/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("cct/config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.http_timeout, Duration::from_secs(300));
        assert_eq!(config.git_bin, "git");
        assert!(config.modules_dir.ends_with("cct/modules"));
        assert!(!config.verbose);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "modules_dir = \"/srv/modules\"\nhttp_timeout_secs = 60\nverbose = true\n",
        )
        .unwrap();

        let mut config = RuntimeConfig::default();
        config.apply_file(&path).unwrap();
        assert_eq!(config.modules_dir, PathBuf::from("/srv/modules"));
        assert_eq!(config.http_timeout, Duration::from_secs(60));
        assert!(config.verbose);
        assert_eq!(config.git_bin, "git");
    }

    #[test]
    fn test_file_rejects_unknown_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "modules = \"/srv\"\n").unwrap();

        let mut config = RuntimeConfig::default();
        assert!(config.apply_file(&path).is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = TempDir::new().unwrap();
        let result = RuntimeConfig::load(Some(&dir.path().join("nope.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_env_overrides_and_clamps() {
        let env: HashMap<&str, &str> = [
            ("CCT_MODULES_DIR", "/env/modules"),
            ("CCT_HTTP_TIMEOUT", "9999"),
            ("CCT_GIT", "/opt/git/bin/git"),
        ]
        .into_iter()
        .collect();

        let mut config = RuntimeConfig::default();
        config.apply_env(|name| env.get(name).map(|v| v.to_string()));
        assert_eq!(config.modules_dir, PathBuf::from("/env/modules"));
        assert_eq!(config.http_timeout, Duration::from_secs(300));
        assert_eq!(config.git_bin, "/opt/git/bin/git");
    }

    #[test]
    fn test_env_ignores_garbage_timeout() {
        let mut config = RuntimeConfig::default();
        config.apply_env(|name| (name == "CCT_HTTP_TIMEOUT").then(|| "soon".to_string()));
        assert_eq!(config.http_timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_timeout_lower_bound() {
        assert_eq!(clamp_timeout(1), Duration::from_secs(5));
    }
}
