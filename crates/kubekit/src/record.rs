//! Persisted state for a tracked object.

use crate::canonical::attempt_canonicalize;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a tracked object currently exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceState {
    /// Identity known; the object is assumed to match its content
    Present,
    /// Never created, deleted, or found gone
    Absent,
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present => write!(f, "present"),
            Self::Absent => write!(f, "absent"),
        }
    }
}

/// The state record a host persists for one tracked object.
///
/// `content` is the manifest in canonical form. `id` is the object's
/// self-link exactly as kubectl reported it, and is `None` while the object
/// is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Self-link of the tracked object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Canonical manifest
    #[serde(default)]
    pub content: String,
}

impl ResourceRecord {
    /// Create an untracked record for `content`.
    ///
    /// Content is canonicalized on a best-effort basis, so a malformed
    /// manifest is stored as written.
    pub fn new(content: &str) -> Self {
        Self {
            id: None,
            content: attempt_canonicalize(content),
        }
    }

    /// Adopt an existing object by its self-link.
    ///
    /// Content is left empty; a read fills it from the live object.
    pub fn imported(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            content: String::new(),
        }
    }

    /// Replace the desired content, canonicalizing on a best-effort basis.
    pub fn set_content(&mut self, content: &str) {
        self.content = attempt_canonicalize(content);
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ResourceState {
        if self.id.is_some() {
            ResourceState::Present
        } else {
            ResourceState::Absent
        }
    }
}
