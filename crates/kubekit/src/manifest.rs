//! Lifecycle operations for a single manifest.
//!
//! [`Manifest`] holds no per-object state. Each operation takes the
//! object's [`ResourceRecord`] and updates it in place, only after the
//! operation has fully succeeded. The host is expected to run one operation
//! at a time per record; nothing here guards against two writers.

use crate::canonical::{canonicalize, parse_document};
use crate::error::{Error, LAST_APPLIED_ANNOTATION, Result, ShapeError};
use crate::identity::{IdentityCodec, ObjectRef, SelfLinkCodec};
use crate::record::{ResourceRecord, ResourceState};
use crate::runner::{KubectlRunner, Runner};
use serde::Deserialize;
use serde_json::Value as Json;

/// Response of `kubectl get -f - -o json`.
#[derive(Debug, Deserialize)]
struct ItemList {
    #[serde(default)]
    items: Option<Vec<Item>>,
}

#[derive(Debug, Default, Deserialize)]
struct Item {
    #[serde(default)]
    metadata: ItemMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct ItemMetadata {
    #[serde(default, rename = "selflink", alias = "selfLink")]
    selflink: Option<String>,
}

/// Reconciles manifests through kubectl.
pub struct Manifest<R: Runner = KubectlRunner, C: IdentityCodec = SelfLinkCodec> {
    runner: R,
    codec: C,
}

impl Manifest<KubectlRunner, SelfLinkCodec> {
    /// Create a manifest handler using the kubectl on PATH.
    pub fn new() -> Result<Self> {
        Ok(Self::with_runner(KubectlRunner::new()?))
    }
}

impl<R: Runner> Manifest<R, SelfLinkCodec> {
    /// Create a manifest handler with a custom runner.
    pub fn with_runner(runner: R) -> Self {
        Self {
            runner,
            codec: SelfLinkCodec,
        }
    }
}

impl<R: Runner, C: IdentityCodec> Manifest<R, C> {
    /// Create a manifest handler with a custom runner and identity scheme.
    pub fn with_codec(runner: R, codec: C) -> Self {
        Self { runner, codec }
    }

    /// Apply the record's content and start tracking the created object.
    ///
    /// Runs `apply`, then `get` to learn the object's self-link. The record
    /// is untouched on failure, even when the apply itself went through.
    pub fn create(&self, record: &mut ResourceRecord) -> Result<()> {
        self.apply(&record.content)?;

        let response = self
            .runner
            .run(&["get", "-f", "-", "-o", "json"], Some(&record.content))?;
        let items = created_items(&response)?;
        if items.len() != 1 {
            return Err(Error::Cardinality { count: items.len() });
        }

        let selflink = items
            .into_iter()
            .next()
            .and_then(|item| item.metadata.selflink)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::IdentityMissing {
                response: response.trim().to_string(),
            })?;

        log::info!("created {selflink}");
        record.id = Some(selflink);
        Ok(())
    }

    /// Refresh the record from the live object.
    ///
    /// The object's last-applied configuration becomes the record's content,
    /// so edits made outside this tool show up as drift. If the object no
    /// longer exists the record's identity is cleared.
    pub fn read(&self, record: &mut ResourceRecord) -> Result<ResourceState> {
        let object = self.object_ref(record)?;

        let mut args = vec![
            "get",
            "--export=true",
            "-o",
            "yaml",
            "--ignore-not-found",
            object.resource.as_str(),
        ];
        args.extend(object.scope_args());

        let output = self.runner.run(&args, None)?;
        let output = output.trim();
        if output.is_empty() {
            log::info!("{} no longer exists", object.resource);
            record.id = None;
            return Ok(ResourceState::Absent);
        }

        let definition = parse_document(output)?;
        let annotation = last_applied(&definition)?;
        record.content = canonicalize(annotation)?;
        log::debug!("refreshed {}", object.resource);
        Ok(ResourceState::Present)
    }

    /// Re-apply the record's content. Identity is kept as is.
    pub fn update(&self, record: &ResourceRecord) -> Result<()> {
        self.apply(&record.content)?;
        if let Some(id) = &record.id {
            log::info!("updated {id}");
        }
        Ok(())
    }

    /// Delete the tracked object and clear the record's identity.
    pub fn delete(&self, record: &mut ResourceRecord) -> Result<()> {
        let object = self.object_ref(record)?;

        let mut args = vec!["delete", object.resource.as_str()];
        args.extend(object.scope_args());
        self.runner.run(&args, None)?;

        log::info!("deleted {}", object.resource);
        record.id = None;
        Ok(())
    }

    /// Adopt an existing object by identity and fill its content.
    pub fn import(&self, id: &str) -> Result<ResourceRecord> {
        let mut record = ResourceRecord::imported(id);
        if self.read(&mut record)? == ResourceState::Absent {
            return Err(Error::InvalidIdentity { id: id.to_string() });
        }
        Ok(record)
    }

    fn apply(&self, content: &str) -> Result<()> {
        self.runner.run(&["apply", "-f", "-"], Some(content))?;
        Ok(())
    }

    fn object_ref(&self, record: &ResourceRecord) -> Result<ObjectRef> {
        let id = record.id.as_deref().unwrap_or_default();
        self.codec
            .decode(id)
            .ok_or_else(|| Error::InvalidIdentity { id: id.to_string() })
    }
}

/// Items in a `get -o json` response.
///
/// kubectl wraps multiple objects in a `List`; a bare object is taken as a
/// list of one.
fn created_items(response: &str) -> Result<Vec<Item>> {
    let decode = |source: serde_json::Error| Error::Decode { source };
    let value: Json = serde_json::from_str(response).map_err(decode)?;

    if value.get("items").is_none() && value.get("metadata").is_some() {
        let item: Item = serde_json::from_value(value).map_err(decode)?;
        return Ok(vec![item]);
    }

    let list: ItemList = serde_json::from_value(value).map_err(decode)?;
    Ok(list.items.unwrap_or_default())
}

/// Walk `metadata.annotations` down to the last-applied configuration.
fn last_applied(definition: &Json) -> std::result::Result<&str, ShapeError> {
    let metadata = definition
        .get("metadata")
        .ok_or_else(|| ShapeError::MetadataMissing {
            observed: render(definition),
        })?;
    if !metadata.is_object() {
        return Err(ShapeError::MetadataType {
            observed: render(metadata),
        });
    }

    let annotations = metadata
        .get("annotations")
        .ok_or_else(|| ShapeError::AnnotationsMissing {
            observed: render(metadata),
        })?;
    if !annotations.is_object() {
        return Err(ShapeError::AnnotationsType {
            observed: render(annotations),
        });
    }

    let raw = annotations
        .get(LAST_APPLIED_ANNOTATION)
        .ok_or_else(|| ShapeError::AnnotationMissing {
            key: LAST_APPLIED_ANNOTATION.to_string(),
            observed: render(annotations),
        })?;
    raw.as_str().ok_or_else(|| ShapeError::AnnotationType {
        key: LAST_APPLIED_ANNOTATION.to_string(),
        observed: render(raw),
    })
}

fn render(value: &Json) -> String {
    value.to_string()
}
