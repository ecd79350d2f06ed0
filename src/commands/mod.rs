pub mod apply;
pub mod destroy;
pub mod import;
pub mod inspect;
pub mod refresh;

use anyhow::{Context as AnyhowContext, Result};
use std::ffi::OsStr;
use std::fs;
use std::path::Path;

use crate::ui;

/// Print an error, plus advice when it came from kubekit
pub fn report(err: &anyhow::Error) {
    ui::error(&format!("{err:#}"));

    let category = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<kubekit::Error>())
        .map(kubekit::Error::category);
    if let Some(category) = category {
        ui::hint(&format!("{category}. {}", category.advice()));
    }
}

/// Read a manifest file
fn read_manifest(file: &Path) -> Result<String> {
    fs::read_to_string(file).with_context(|| format!("Failed to read manifest: {}", file.display()))
}

/// Name to track a manifest under: the explicit one, or the file stem
fn resource_name(file: &Path, name: Option<&str>) -> Result<String> {
    if let Some(name) = name {
        return Ok(name.to_string());
    }
    file.file_stem()
        .and_then(OsStr::to_str)
        .map(str::to_string)
        .with_context(|| {
            format!(
                "Could not derive a name from {}, pass --name",
                file.display()
            )
        })
}

/// Pretty-print canonical JSON for display, falling back to the raw text
fn pretty(content: &str) -> String {
    serde_json::from_str::<serde_json::Value>(content)
        .and_then(|value| serde_json::to_string_pretty(&value))
        .unwrap_or_else(|_| content.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_resource_name_from_stem() {
        let file = PathBuf::from("deploy/configmap.yaml");
        assert_eq!(resource_name(&file, None).unwrap(), "configmap");
        assert_eq!(resource_name(&file, Some("cm")).unwrap(), "cm");
    }

    #[test]
    fn test_resource_name_needs_stem() {
        assert!(resource_name(Path::new("/"), None).is_err());
    }

    #[test]
    fn test_pretty() {
        assert_eq!(pretty(r#"{"a":1}"#), "{\n  \"a\": 1\n}");
        assert_eq!(pretty("a: [1"), "a: [1");
    }
}
