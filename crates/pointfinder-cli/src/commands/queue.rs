//! Queue maintenance: reselect, discard, clear

use crate::console::CliConsole;
use anyhow::bail;
use dialoguer::{Confirm, theme::ColorfulTheme};
use pointfinder_core::ClientContext;
use std::path::Path;
use uuid::Uuid;

pub async fn reselect(ctx: &ClientContext, console: &CliConsole, action: Uuid, file: &Path) -> anyhow::Result<()> {
    let Some(pending) = ctx.store().get(action).await else {
        bail!("No queued action {}", action);
    };
    if pending.media().is_none() {
        bail!("Action {} is a {}, not a media submission", action, pending.kind.name());
    }
    if ctx.reselect_media(action, file).await? {
        console.success(&format!("Action {} now uploads {}", action, file.display()));
    }
    Ok(())
}

pub async fn discard(ctx: &ClientContext, console: &CliConsole, action: Uuid) -> anyhow::Result<()> {
    if ctx.discard_action(action).await? {
        console.success(&format!("Discarded {}", action));
    } else {
        console.warn(&format!("No queued action {}", action));
    }
    Ok(())
}

pub async fn clear(ctx: &ClientContext, console: &CliConsole, game: Option<Uuid>, yes: bool) -> anyhow::Result<()> {
    let count = match game {
        Some(game) => ctx.store().pending_for_game(game).await.len(),
        None => ctx.pending_count().await,
    };
    if count == 0 {
        console.success("Queue is already empty");
        return Ok(());
    }

    if !yes {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Delete {} queued action(s)? They will never be sent.", count))
            .default(false)
            .interact()?;
        if !confirmed {
            console.warn("Nothing deleted");
            return Ok(());
        }
    }

    let removed = ctx.clear_queue(game).await?;
    console.success(&format!("Removed {} action(s)", removed));
    Ok(())
}
