//! Queue and connection status

use super::sync::print_last_issue;
use crate::console::CliConsole;
use colored::*;
use pointfinder_core::{ClientContext, PendingAction};
use serde_json::json;
use uuid::Uuid;

pub async fn show(ctx: &ClientContext, console: &CliConsole, game: Option<Uuid>, as_json: bool) -> anyhow::Result<()> {
    let status = ctx.status().await;
    let actions = match game {
        Some(game) => ctx.store().pending_for_game(game).await,
        None => ctx.store().all_pending().await,
    };

    if as_json {
        let issue = status.last_sync_error.as_ref().map(|issue| {
            json!({
                "kind": format!("{:?}", issue.kind),
                "message": issue.message,
                "actionId": issue.action_id,
            })
        });
        let body = json!({
            "online": status.online,
            "pendingCount": status.pending_count,
            "isSyncing": status.is_syncing,
            "lastSyncError": issue,
            "connectionState": status.connection_state.to_string(),
            "actions": actions,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    console.print_header("Pointfinder client");
    let online = if status.online { "online".green() } else { "offline".yellow() };
    console.field("Network", &online.to_string());
    console.field("Queued", &status.pending_count.to_string());
    console.field("Realtime", &status.connection_state.to_string());
    print_last_issue(ctx);

    if actions.is_empty() {
        return Ok(());
    }
    println!();
    for action in &actions {
        print_action(action);
    }
    Ok(())
}

fn print_action(action: &PendingAction) {
    let mut line = format!(
        "  {} {:<16} base {} queued {}",
        action.id.to_string().dimmed(),
        action.kind.name(),
        action.base_id,
        action.created_at.format("%Y-%m-%d %H:%M:%S")
    );
    if action.retry_count > 0 {
        line.push_str(&format!(" retries {}", action.retry_count));
    }
    if let Some(media) = action.media() {
        let progress = match media.total_chunks {
            Some(total) => format!(" chunks {}/{}", media.next_chunk_index, total),
            None => " not started".to_string(),
        };
        line.push_str(&progress);
        if media.needs_reselect {
            line.push_str(&format!(" {}", "needs reselect".red()));
        }
    }
    println!("{}", line);
    if let Some(error) = &action.last_error {
        println!("      {}", error.dimmed());
    }
}
