//! Converge one tracked resource toward a desired manifest.
//!
//! The host decides between create, update and no-op here; the library only
//! knows how to perform each lifecycle operation.

use kubekit::{
    IdentityCodec, Manifest, ResourceRecord, ResourceState, Runner, attempt_canonicalize,
};
use std::fmt;

/// What an apply would do, judged from stored state alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Nothing tracked yet
    Create,
    /// Tracked, and the stored content differs
    Update,
    /// Tracked, and the stored content matches
    NoChange,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::NoChange => write!(f, "no change"),
        }
    }
}

/// Result of converging a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyResult {
    /// Live object already matched
    NoChange,
    /// Object was created
    Created,
    /// Object had disappeared and was created again
    Recreated,
    /// Object was re-applied with new content
    Modified,
}

impl ApplyResult {
    /// Check if the result represents a change
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::NoChange)
    }
}

impl fmt::Display for ApplyResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoChange => write!(f, "unchanged"),
            Self::Created => write!(f, "created"),
            Self::Recreated => write!(f, "re-created"),
            Self::Modified => write!(f, "updated"),
        }
    }
}

/// Decide what applying `desired` would do, without touching the cluster.
pub fn plan(record: Option<&ResourceRecord>, desired: &str) -> Action {
    match record {
        Some(record) if record.state() == ResourceState::Present => {
            if record.content == attempt_canonicalize(desired) {
                Action::NoChange
            } else {
                Action::Update
            }
        }
        _ => Action::Create,
    }
}

/// Bring the object behind `record` in line with `desired`.
///
/// A tracked record is refreshed first so drift made outside this tool is
/// detected. If the object has gone it is created again. On error `record`
/// still reflects what is known about the cluster.
pub fn converge<R: Runner, C: IdentityCodec>(
    manifest: &Manifest<R, C>,
    record: &mut ResourceRecord,
    desired: &str,
) -> kubekit::Result<ApplyResult> {
    if record.state() == ResourceState::Absent {
        record.set_content(desired);
        manifest.create(record)?;
        return Ok(ApplyResult::Created);
    }

    if manifest.read(record)? == ResourceState::Absent {
        log::info!("Tracked object is gone, creating it again");
        record.set_content(desired);
        manifest.create(record)?;
        return Ok(ApplyResult::Recreated);
    }

    let desired = attempt_canonicalize(desired);
    if record.content == desired {
        return Ok(ApplyResult::NoChange);
    }

    let mut next = record.clone();
    next.content = desired;
    manifest.update(&next)?;
    *record = next;
    Ok(ApplyResult::Modified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kubekit::{Error, MockRunner};

    const SELFLINK: &str = "api/v1/namespaces/ns1/widgets/w1";
    const CREATED: &str = r#"{"items":[{"metadata":{"selfLink":"api/v1/namespaces/ns1/widgets/w1"}}]}"#;

    fn live(last_applied: &str) -> String {
        format!(
            "metadata:\n  annotations:\n    kubectl.kubernetes.io/last-applied-configuration: '{last_applied}'\n"
        )
    }

    fn tracked(content: &str) -> ResourceRecord {
        let mut record = ResourceRecord::new(content);
        record.id = Some(SELFLINK.to_string());
        record
    }

    #[test]
    fn test_plan() {
        assert_eq!(plan(None, "a: 1"), Action::Create);
        assert_eq!(
            plan(Some(&ResourceRecord::new("a: 1")), "a: 1"),
            Action::Create
        );
        assert_eq!(plan(Some(&tracked("a: 1")), "{\"a\": 1}"), Action::NoChange);
        assert_eq!(plan(Some(&tracked("a: 1")), "a: 2"), Action::Update);
    }

    #[test]
    fn test_converge_creates_untracked() {
        let runner = MockRunner::new().respond("").respond(CREATED);
        let manifest = Manifest::with_runner(&runner);
        let mut record = ResourceRecord::default();

        let result = converge(&manifest, &mut record, "b: 2\na: 1\n").unwrap();

        assert_eq!(result, ApplyResult::Created);
        assert_eq!(record.id.as_deref(), Some(SELFLINK));
        assert_eq!(record.content, r#"{"a":1,"b":2}"#);
        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].subcommand(), "apply");
    }

    #[test]
    fn test_converge_no_change() {
        let runner = MockRunner::new().respond(live(r#"{"a":1}"#));
        let manifest = Manifest::with_runner(&runner);
        let mut record = tracked(r#"{"a":1}"#);

        let result = converge(&manifest, &mut record, "a: 1").unwrap();

        assert_eq!(result, ApplyResult::NoChange);
        assert!(!result.is_change());
        assert_eq!(runner.calls().len(), 1);
        assert_eq!(runner.calls()[0].subcommand(), "get");
    }

    #[test]
    fn test_converge_updates_changed_content() {
        let runner = MockRunner::new().respond(live(r#"{"a":1}"#)).respond("");
        let manifest = Manifest::with_runner(&runner);
        let mut record = tracked(r#"{"a":1}"#);

        let result = converge(&manifest, &mut record, "a: 2").unwrap();

        assert_eq!(result, ApplyResult::Modified);
        assert_eq!(record.content, r#"{"a":2}"#);
        assert_eq!(record.id.as_deref(), Some(SELFLINK));
        let calls = runner.calls();
        assert_eq!(calls[1].subcommand(), "apply");
        assert_eq!(calls[1].stdin.as_deref(), Some(r#"{"a":2}"#));
    }

    #[test]
    fn test_converge_picks_up_drift() {
        // Stored content matches desired but the live object was changed
        let runner = MockRunner::new().respond(live(r#"{"a":9}"#)).respond("");
        let manifest = Manifest::with_runner(&runner);
        let mut record = tracked(r#"{"a":1}"#);

        let result = converge(&manifest, &mut record, "a: 1").unwrap();

        assert_eq!(result, ApplyResult::Modified);
        assert_eq!(record.content, r#"{"a":1}"#);
    }

    #[test]
    fn test_converge_recreates_vanished_object() {
        let runner = MockRunner::new()
            .respond("\n")
            .respond("")
            .respond(CREATED);
        let manifest = Manifest::with_runner(&runner);
        let mut record = tracked(r#"{"a":1}"#);

        let result = converge(&manifest, &mut record, "a: 1").unwrap();

        assert_eq!(result, ApplyResult::Recreated);
        assert_eq!(record.id.as_deref(), Some(SELFLINK));
        assert_eq!(runner.calls().len(), 3);
    }

    #[test]
    fn test_failed_update_keeps_live_content() {
        let runner = MockRunner::new()
            .respond(live(r#"{"a":1}"#))
            .fail(Error::Tool {
                command: "kubectl apply -f -".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "forbidden".to_string(),
            });
        let manifest = Manifest::with_runner(&runner);
        let mut record = tracked(r#"{"a":1}"#);

        let err = converge(&manifest, &mut record, "a: 2").unwrap_err();

        assert!(matches!(err, Error::Tool { .. }));
        assert_eq!(record.content, r#"{"a":1}"#);
        assert_eq!(record.id.as_deref(), Some(SELFLINK));
    }

    #[test]
    fn test_failed_create_leaves_record_absent() {
        let runner = MockRunner::new().respond("").respond(r#"{"items":[]}"#);
        let manifest = Manifest::with_runner(&runner);
        let mut record = ResourceRecord::default();

        let err = converge(&manifest, &mut record, "a: 1").unwrap_err();

        assert!(matches!(err, Error::Cardinality { count: 0 }));
        assert_eq!(record.state(), ResourceState::Absent);
    }
}
