//! Reporting on newly queued actions

use super::sync;
use crate::console::CliConsole;
use pointfinder_core::ClientContext;
use uuid::Uuid;

/// Confirm the enqueue and, unless told otherwise, drain the queue
pub async fn report(
    ctx: &ClientContext,
    console: &CliConsole,
    queued: Option<Uuid>,
    what: &str,
    no_sync: bool,
) -> anyhow::Result<()> {
    match queued {
        Some(id) => console.success(&format!("Queued {} {}", what, id)),
        None => {
            console.warn(&format!("An identical {} is already queued", what));
            return Ok(());
        }
    }
    if no_sync {
        return Ok(());
    }
    sync::run(ctx, console).await
}
