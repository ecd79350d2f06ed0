use anyhow::{Context as AnyhowContext, Result, bail};
use kubekit::{ResourceState, Runner};

use crate::Context;
use crate::state::StateFile;
use crate::ui::{self, Mark};

use super::report;

/// Outcome of refreshing one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Refreshed {
    Unchanged,
    Drifted,
    Gone,
    Untracked,
}

/// Re-read one tracked resource, or all of them
pub fn run(ctx: &Context, name: Option<&str>) -> Result<()> {
    let (mut state, path) = ctx.load_state()?;

    let names: Vec<String> = match name {
        Some(name) if state.get(name).is_none() => bail!("'{name}' is not tracked"),
        Some(name) => vec![name.to_string()],
        None => state.resources.keys().cloned().collect(),
    };
    if names.is_empty() {
        ui::status(Mark::Note, "No resources tracked");
        return Ok(());
    }

    let manifest = ctx.manifest()?;
    let mut failed = 0;

    for name in &names {
        match refresh_one(&manifest, &mut state, name) {
            Ok(outcome) => {
                if outcome != Refreshed::Unchanged && outcome != Refreshed::Untracked {
                    state.touch(&path)?;
                }
                print_outcome(ctx, name, outcome);
            }
            Err(err) => {
                report(&err);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} resource(s) failed to refresh", names.len());
    }
    Ok(())
}

fn refresh_one<R: Runner>(
    manifest: &kubekit::Manifest<R>,
    state: &mut StateFile,
    name: &str,
) -> Result<Refreshed> {
    let Some(mut record) = state.get(name).cloned() else {
        return Ok(Refreshed::Untracked);
    };
    if record.state() == ResourceState::Absent {
        return Ok(Refreshed::Untracked);
    }

    let before = record.content.clone();
    let live = manifest
        .read(&mut record)
        .with_context(|| format!("Failed to refresh '{name}'"))?;

    match live {
        ResourceState::Absent => {
            state.remove(name);
            Ok(Refreshed::Gone)
        }
        ResourceState::Present if record.content == before => Ok(Refreshed::Unchanged),
        ResourceState::Present => {
            state.insert(name, record);
            Ok(Refreshed::Drifted)
        }
    }
}

fn print_outcome(ctx: &Context, name: &str, outcome: Refreshed) {
    if ctx.quiet {
        return;
    }
    let (mark, msg) = match outcome {
        Refreshed::Unchanged if ctx.verbose == 0 => return,
        Refreshed::Unchanged => (Mark::Done, "up to date"),
        Refreshed::Drifted => (Mark::Drift, "changed outside kmanifest"),
        Refreshed::Gone => (Mark::Drift, "no longer exists, stopped tracking"),
        Refreshed::Untracked => (Mark::Skip, "was never created, skipping"),
    };
    ui::status(mark, &format!("{name} {msg}"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use kubekit::{Manifest, MockRunner, ResourceRecord};

    fn tracked(content: &str) -> ResourceRecord {
        let mut record = ResourceRecord::new(content);
        record.id = Some("api/v1/namespaces/ns1/widgets/w1".to_string());
        record
    }

    fn live(last_applied: &str) -> String {
        format!(
            "metadata:\n  annotations:\n    kubectl.kubernetes.io/last-applied-configuration: '{last_applied}'\n"
        )
    }

    #[test]
    fn test_unchanged() {
        let runner = MockRunner::new().respond(live(r#"{"a":1}"#));
        let manifest = Manifest::with_runner(&runner);
        let mut state = StateFile::default();
        state.insert("w1", tracked(r#"{"a":1}"#));

        let outcome = refresh_one(&manifest, &mut state, "w1").unwrap();
        assert_eq!(outcome, Refreshed::Unchanged);
    }

    #[test]
    fn test_drift_updates_record() {
        let runner = MockRunner::new().respond(live(r#"{"a":2}"#));
        let manifest = Manifest::with_runner(&runner);
        let mut state = StateFile::default();
        state.insert("w1", tracked(r#"{"a":1}"#));

        let outcome = refresh_one(&manifest, &mut state, "w1").unwrap();
        assert_eq!(outcome, Refreshed::Drifted);
        assert_eq!(state.get("w1").unwrap().content, r#"{"a":2}"#);
    }

    #[test]
    fn test_gone_drops_record() {
        let runner = MockRunner::new().respond("  \n");
        let manifest = Manifest::with_runner(&runner);
        let mut state = StateFile::default();
        state.insert("w1", tracked(r#"{"a":1}"#));

        let outcome = refresh_one(&manifest, &mut state, "w1").unwrap();
        assert_eq!(outcome, Refreshed::Gone);
        assert!(state.get("w1").is_none());
    }

    #[test]
    fn test_never_created_is_skipped() {
        let runner = MockRunner::new();
        let manifest = Manifest::with_runner(&runner);
        let mut state = StateFile::default();
        state.insert("w1", ResourceRecord::new(r#"{"a":1}"#));

        let outcome = refresh_one(&manifest, &mut state, "w1").unwrap();
        assert_eq!(outcome, Refreshed::Untracked);
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_failure_keeps_record() {
        let runner = MockRunner::new().respond("metadata: {}\n");
        let manifest = Manifest::with_runner(&runner);
        let mut state = StateFile::default();
        state.insert("w1", tracked(r#"{"a":1}"#));

        let err = refresh_one(&manifest, &mut state, "w1").unwrap_err();
        assert!(err.to_string().contains("Failed to refresh 'w1'"));
        assert_eq!(state.get("w1").unwrap().content, r#"{"a":1}"#);
    }
}
