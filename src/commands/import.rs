use anyhow::{Context as AnyhowContext, Result, bail};
use kubekit::ResourceState;

use crate::Context;
use crate::ui::{self, Mark};

/// Start tracking an object that already exists
pub fn run(ctx: &Context, name: &str, selflink: &str) -> Result<()> {
    let (mut state, path) = ctx.load_state()?;
    if let Some(existing) = state.get(name)
        && existing.state() == ResourceState::Present
    {
        bail!(
            "'{name}' already tracks {}",
            existing.id.as_deref().unwrap_or_default()
        );
    }

    let record = ctx
        .manifest()?
        .import(selflink)
        .with_context(|| format!("Failed to import '{name}'"))?;

    state.insert(name, record);
    state.touch(&path)?;

    if !ctx.quiet {
        ui::status(Mark::Done, &format!("Imported {selflink} as {name}"));
    }
    Ok(())
}
