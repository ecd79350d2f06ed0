use anyhow::{Context as AnyhowContext, Result, bail};
use colored::Colorize;
use kubekit::{attempt_canonicalize, canonicalize};
use std::path::Path;

use crate::Context;
use crate::reconcile::{self, Action};
use crate::ui::{self, Mark};

use super::{pretty, read_manifest, resource_name};

/// Show how `file` differs from the stored record
pub fn diff(ctx: &Context, file: &Path, name: Option<&str>) -> Result<()> {
    let name = resource_name(file, name)?;
    let desired = read_manifest(file)?;
    let (state, _) = ctx.load_state()?;
    let record = state.get(&name);

    let stored = record.map(|r| pretty(&r.content)).unwrap_or_default();
    let wanted = pretty(&attempt_canonicalize(&desired));

    ui::header(&format!("Diff: {name}"));
    if let Some(id) = record.and_then(|r| r.id.as_deref()) {
        ui::field("Tracking", id);
    }
    println!();
    print_text_diff(&stored, &wanted);

    println!();
    match reconcile::plan(record, &desired) {
        Action::NoChange => ui::status(
            Mark::Note,
            "Next apply: no change (run 'kmanifest refresh' to check for drift)",
        ),
        action => ui::status(Mark::Note, &format!("Next apply: {action}")),
    }
    Ok(())
}

fn print_text_diff(old: &str, new: &str) {
    let old = with_newline(old);
    let new = with_newline(new);
    let diff = similar::TextDiff::from_lines(&old, &new);
    let mut has_changes = false;

    for change in diff.iter_all_changes() {
        match change.tag() {
            similar::ChangeTag::Delete => {
                has_changes = true;
                print!("    {}", format!("- {change}").red());
            }
            similar::ChangeTag::Insert => {
                has_changes = true;
                print!("    {}", format!("+ {change}").green());
            }
            similar::ChangeTag::Equal => {}
        }
    }

    if !has_changes {
        println!("    {}", "(no differences)".dimmed());
    }
}

fn with_newline(text: &str) -> String {
    if text.is_empty() || text.ends_with('\n') {
        text.to_string()
    } else {
        format!("{text}\n")
    }
}

/// Show one tracked resource, or all of them
pub fn show(ctx: &Context, name: Option<&str>) -> Result<()> {
    let (state, path) = ctx.load_state()?;

    let records: Vec<_> = match name {
        Some(name) => match state.get(name) {
            Some(record) => vec![(name.to_string(), record)],
            None => bail!("'{name}' is not tracked"),
        },
        None => state
            .resources
            .iter()
            .map(|(name, record)| (name.clone(), record))
            .collect(),
    };

    if records.is_empty() {
        ui::status(Mark::Note, "No resources tracked");
        ui::status(Mark::Skip, &format!("State file: {}", path.display()));
        return Ok(());
    }

    for (name, record) in records {
        ui::header(&name);
        ui::field("State", &ui::state(record.state()).to_string());
        ui::field("Id", record.id.as_deref().unwrap_or("-"));
        ui::field("Content", "");
        ui::block(&pretty(&record.content));
    }

    if ctx.verbose > 0 {
        println!();
        let updated = state.last_updated.format("%Y-%m-%d %H:%M:%S UTC");
        ui::status(
            Mark::Skip,
            &format!("State file: {} (updated {updated})", path.display()),
        );
    }
    Ok(())
}

/// Print a manifest in canonical form
pub fn normalize(file: &Path) -> Result<()> {
    let content = read_manifest(file)?;
    let canonical = canonicalize(&content)
        .with_context(|| format!("Failed to normalize {}", file.display()))?;
    println!("{canonical}");
    Ok(())
}
