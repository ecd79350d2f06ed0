use anyhow::{Context, Result};
use kubekit::KubectlRunner;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::state::StateFile;

/// Get the config directory path (~/.config/kmanifest)
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("kmanifest"))
}

/// Get the config file path
pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Expand `~` in a user-supplied path
pub fn expand_path(path: &str) -> PathBuf {
    let expanded = shellexpand::tilde(path);
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Settings
// ============================================================================

/// User settings, from the config file with CLI flags layered on top.
///
/// Every field is optional. An unset field falls back to the built-in
/// default: kubectl from PATH, kubectl's own kubeconfig and context, no
/// timeout, and the default state file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Path to the kubectl executable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubectl: Option<String>,

    /// Kubeconfig passed to every kubectl call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<String>,

    /// Kubeconfig context passed to every kubectl call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// Seconds to wait for a single kubectl call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Where resource records are kept
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_file: Option<String>,
}

impl Settings {
    /// Load settings from the default config file, or defaults if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&config_file()?)
    }

    /// Load settings from `path`, or defaults if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("Config file {} does not exist, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let settings: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Layer `overrides` on top, keeping our value wherever theirs is unset
    pub fn merge(self, overrides: Settings) -> Self {
        Self {
            kubectl: overrides.kubectl.or(self.kubectl),
            kubeconfig: overrides.kubeconfig.or(self.kubeconfig),
            context: overrides.context.or(self.context),
            timeout_secs: overrides.timeout_secs.or(self.timeout_secs),
            state_file: overrides.state_file.or(self.state_file),
        }
    }

    /// Resolved state file location
    pub fn state_path(&self) -> Result<PathBuf> {
        match &self.state_file {
            Some(path) => Ok(expand_path(path)),
            None => StateFile::default_path(),
        }
    }

    /// Build the kubectl runner these settings describe
    pub fn runner(&self) -> Result<KubectlRunner> {
        let mut runner = match &self.kubectl {
            Some(program) => KubectlRunner::with_program(expand_path(program)),
            None => KubectlRunner::new()?,
        };

        if let Some(kubeconfig) = &self.kubeconfig {
            runner = runner.with_kubeconfig(expand_path(kubeconfig));
        }
        if let Some(context) = &self.context {
            runner = runner.with_context(context);
        }
        if let Some(secs) = self.timeout_secs.filter(|secs| *secs > 0) {
            runner = runner.with_timeout(Duration::from_secs(secs));
        }

        log::debug!("Using kubectl at {}", runner.program().display());
        Ok(runner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "kubectl = \"/opt/bin/kubectl\"\ncontext = \"staging\"\ntimeout_secs = 30\n",
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.kubectl.as_deref(), Some("/opt/bin/kubectl"));
        assert_eq!(settings.context.as_deref(), Some("staging"));
        assert_eq!(settings.timeout_secs, Some(30));
        assert!(settings.kubeconfig.is_none());
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "timeout_secs = \"soon\"\n").unwrap();

        let err = Settings::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_flags_win_over_file() {
        let file = Settings {
            context: Some("staging".to_string()),
            timeout_secs: Some(30),
            ..Settings::default()
        };
        let flags = Settings {
            context: Some("prod".to_string()),
            ..Settings::default()
        };

        let merged = file.merge(flags);
        assert_eq!(merged.context.as_deref(), Some("prod"));
        assert_eq!(merged.timeout_secs, Some(30));
    }

    #[test]
    fn test_explicit_state_path() {
        let settings = Settings {
            state_file: Some("/tmp/kmanifest/state.toml".to_string()),
            ..Settings::default()
        };
        assert_eq!(
            settings.state_path().unwrap(),
            PathBuf::from("/tmp/kmanifest/state.toml")
        );
    }

    #[test]
    fn test_runner_from_explicit_program() {
        let settings = Settings {
            kubectl: Some("/opt/bin/kubectl".to_string()),
            ..Settings::default()
        };
        let runner = settings.runner().unwrap();
        assert_eq!(runner.program(), Path::new("/opt/bin/kubectl"));
    }
}
