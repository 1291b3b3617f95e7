//! Manual sync pass

use crate::console::CliConsole;
use colored::*;
use pointfinder_core::{ClientContext, SyncIssueKind, SyncReport};

pub async fn run(ctx: &ClientContext, console: &CliConsole) -> anyhow::Result<()> {
    if !ctx.connectivity().is_online() {
        console.warn("Offline; nothing was sent");
        return Ok(());
    }
    let pending = ctx.pending_count().await;
    if pending == 0 {
        console.success("Queue is empty");
        return Ok(());
    }

    console.info(&format!("Syncing {} queued action(s)", pending));
    match ctx.sync_pending_actions().await {
        Some(report) => {
            print_report(console, &report);
            print_last_issue(ctx);
        }
        None => console.warn("A sync pass is already running"),
    }
    Ok(())
}

pub fn print_report(console: &CliConsole, report: &SyncReport) {
    let summary = format!(
        "{} synced, {} will retry, {} dropped, {} waiting for you",
        report.synced, report.retried, report.dropped, report.stalled
    );
    if report.dropped > 0 || report.stalled > 0 {
        console.warn(&summary);
    } else {
        console.success(&summary);
    }
}

pub fn print_last_issue(ctx: &ClientContext) {
    let Some(issue) = ctx.last_sync_error() else {
        return;
    };
    let label = match issue.kind {
        SyncIssueKind::WillRetry => "will retry".yellow(),
        SyncIssueKind::NeedsReselect => "reselect media".red().bold(),
        SyncIssueKind::Rejected => "rejected".red(),
        SyncIssueKind::RetriesExhausted => "gave up".red(),
        SyncIssueKind::AuthExpired => "sign in again".red().bold(),
    };
    match issue.action_id {
        Some(id) => println!("  last issue [{}] {} ({})", label, issue.message, id),
        None => println!("  last issue [{}] {}", label, issue.message),
    }
}
