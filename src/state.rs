use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use kubekit::ResourceRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Records for every tracked resource, keyed by the name the user gave it.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StateFile {
    /// Last time the state was updated
    pub last_updated: DateTime<Utc>,

    /// Tracked resources
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceRecord>,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            last_updated: Utc::now(),
            resources: BTreeMap::new(),
        }
    }
}

impl StateFile {
    /// Get the default state file path (~/.local/state/kmanifest/state.toml)
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home
            .join(".local")
            .join("state")
            .join("kmanifest")
            .join("state.toml"))
    }

    /// Load state from `path`, or return default if the file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file does not exist, using default state");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;

        let state: StateFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        log::debug!(
            "Loaded {} resource(s) from {}",
            state.resources.len(),
            path.display()
        );
        Ok(state)
    }

    /// Save state to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).with_context(|| {
                format!("Failed to create state directory: {}", dir.display())
            })?;
        }

        let content = toml::to_string_pretty(&self).context("Failed to serialize state to TOML")?;

        fs::write(path, &content)
            .with_context(|| format!("Failed to write state file: {}", path.display()))?;

        log::debug!("Saved state to {}", path.display());
        Ok(())
    }

    /// Update the last_updated timestamp and save
    pub fn touch(&mut self, path: &Path) -> Result<()> {
        self.last_updated = Utc::now();
        self.save(path)
    }

    /// Look up a record by name
    pub fn get(&self, name: &str) -> Option<&ResourceRecord> {
        self.resources.get(name)
    }

    /// Store a record, replacing any previous one with the same name
    pub fn insert(&mut self, name: &str, record: ResourceRecord) {
        self.resources.insert(name.to_string(), record);
    }

    /// Stop tracking a resource
    pub fn remove(&mut self, name: &str) -> Option<ResourceRecord> {
        self.resources.remove(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_state() {
        let state = StateFile::default();
        assert!(state.resources.is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let state = StateFile::load(&dir.path().join("state.toml")).unwrap();
        assert!(state.resources.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("state.toml");

        let mut state = StateFile::default();
        let mut record = ResourceRecord::new("kind: ConfigMap\nmetadata:\n  name: demo\n");
        record.id = Some("api/v1/namespaces/default/configmaps/demo".to_string());
        state.insert("demo", record.clone());
        state.insert("pending", ResourceRecord::new("{\"a\":1}"));
        state.touch(&path).unwrap();

        let loaded = StateFile::load(&path).unwrap();
        assert_eq!(loaded.resources.len(), 2);
        assert_eq!(loaded.get("demo"), Some(&record));
        assert_eq!(loaded.get("pending").and_then(|r| r.id.as_deref()), None);
        assert_eq!(loaded.last_updated, state.last_updated);
    }

    #[test]
    fn test_absent_id_not_written() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.toml");

        let mut state = StateFile::default();
        state.insert("pending", ResourceRecord::new("{\"a\":1}"));
        state.save(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("[resources.pending]"));
        assert!(!content.contains("id ="));
    }

    #[test]
    fn test_remove() {
        let mut state = StateFile::default();
        state.insert("demo", ResourceRecord::new("{}"));
        assert!(state.remove("demo").is_some());
        assert!(state.remove("demo").is_none());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.toml");
        fs::write(&path, "resources = 3").unwrap();

        let err = StateFile::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse state file"));
    }
}
