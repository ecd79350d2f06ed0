use anyhow::{Context as AnyhowContext, Result};
use kubekit::{Manifest, ResourceRecord, Runner};
use std::path::Path;

use crate::Context;
use crate::reconcile::{self, ApplyResult};
use crate::state::StateFile;
use crate::ui::{self, Mark};

use super::{read_manifest, resource_name};

/// Converge the object described by `file`
pub fn run(ctx: &Context, file: &Path, name: Option<&str>) -> Result<()> {
    let name = resource_name(file, name)?;
    let desired = read_manifest(file)?;

    let (mut state, path) = ctx.load_state()?;
    let manifest = ctx.manifest()?;

    let (result, record) = apply_record(&manifest, &mut state, &path, &name, &desired)?;
    if ctx.quiet {
        return Ok(());
    }

    let id = record.id.as_deref().unwrap_or_default();
    if result.is_change() {
        ui::status(Mark::Done, &format!("{name} {result} ({id})"));
    } else {
        ui::status(Mark::Note, &format!("{name} {result} ({id})"));
    }
    Ok(())
}

/// Converge one named record and persist it, even when converging fails.
///
/// A converge failure is the error returned; a save failure alongside it is
/// only printed.
fn apply_record<R: Runner>(
    manifest: &Manifest<R>,
    state: &mut StateFile,
    path: &Path,
    name: &str,
    desired: &str,
) -> Result<(ApplyResult, ResourceRecord)> {
    let mut record = state.get(name).cloned().unwrap_or_default();
    let result = reconcile::converge(manifest, &mut record, desired);

    state.insert(name, record.clone());
    let saved = state.touch(path);

    let result = match result {
        Ok(result) => result,
        Err(err) => {
            if let Err(save_err) = saved {
                ui::error(&format!("{save_err:#}"));
            }
            return Err(err).with_context(|| format!("Failed to apply '{name}'"));
        }
    };
    saved?;
    Ok((result, record))
}
