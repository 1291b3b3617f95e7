//! Stream realtime events for a game

use crate::console::CliConsole;
use colored::*;
use pointfinder_core::{ClientContext, ConnectionState};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

pub async fn run(ctx: &ClientContext, console: &CliConsole, game: Uuid, seconds: Option<u64>) -> anyhow::Result<()> {
    if !ctx.realtime().is_enabled() {
        console.warn("Realtime is disabled in the configuration");
        return Ok(());
    }

    let mut events = ctx.realtime_events();
    let mut states = ctx.subscribe_connection_state();
    ctx.connect_realtime(game).await?;
    console.info(&format!("Listening for events in game {}", game));

    let deadline = async {
        match seconds {
            Some(seconds) => tokio::time::sleep(Duration::from_secs(seconds)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = &mut deadline => break,
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *states.borrow_and_update();
                match state {
                    ConnectionState::Connected => console.success("Connected"),
                    ConnectionState::Reconnecting(attempt) => {
                        console.warn(&format!("Connection lost, reconnect attempt {}", attempt))
                    }
                    other => console.info(&other.to_string()),
                }
            }
            event = events.recv() => match event {
                Ok(envelope) => {
                    if !envelope.is_for_game(game) {
                        continue;
                    }
                    let at = envelope
                        .emitted_at
                        .map(|at| at.format("%H:%M:%S").to_string())
                        .unwrap_or_else(|| "--:--:--".to_string());
                    let data = envelope.data.map(|data| data.to_string()).unwrap_or_default();
                    println!("{} {} {}", at.dimmed(), envelope.event_type.cyan(), data);
                }
                Err(RecvError::Lagged(skipped)) => console.warn(&format!("Skipped {} events", skipped)),
                Err(RecvError::Closed) => break,
            },
        }
    }

    ctx.disconnect_realtime().await?;
    Ok(())
}
