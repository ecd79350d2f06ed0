use anyhow::{Context as AnyhowContext, Result, bail};
use dialoguer::Confirm;
use kubekit::ResourceState;

use crate::Context;
use crate::ui::{self, Mark};

/// Delete a tracked object and forget it
pub fn run(ctx: &Context, name: &str, yes: bool) -> Result<()> {
    let (mut state, path) = ctx.load_state()?;
    let Some(mut record) = state.get(name).cloned() else {
        bail!("'{name}' is not tracked");
    };

    if record.state() == ResourceState::Absent {
        state.remove(name);
        state.touch(&path)?;
        ui::status(
            Mark::Skip,
            &format!("{name} was never created, removed from state"),
        );
        return Ok(());
    }

    let id = record.id.clone().unwrap_or_default();
    if !yes {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete {id}?"))
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;
        if !confirmed {
            ui::status(Mark::Note, "Cancelled");
            return Ok(());
        }
    }

    ctx.manifest()?
        .delete(&mut record)
        .with_context(|| format!("Failed to destroy '{name}'"))?;

    state.remove(name);
    state.touch(&path)?;

    if !ctx.quiet {
        ui::status(Mark::Done, &format!("Deleted {name} ({id})"));
    }
    Ok(())
}
