//! Command routing logic for CLI

use crate::args::{Cli, Commands};
use crate::commands;
use crate::console::CliConsole;
use crate::logging;
use anyhow::Context;
use pointfinder_core::{ClientContext, ConnectivityMonitor, Credentials, load_config};

/// Load configuration, start the client and run the selected command
pub async fn route(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref()).context("loading configuration")?;
    logging::init(&config.logging, cli.verbose)?;

    let credentials = match &cli.token {
        Some(token) => Credentials::new(token.clone(), cli.refresh_token.clone()),
        None => Credentials {
            access_token: None,
            refresh_token: cli.refresh_token.clone(),
        },
    };
    let ctx = ClientContext::builder(config)
        .credentials(credentials)
        .connectivity(ConnectivityMonitor::new(!cli.offline))
        .build()
        .await
        .context("starting client")?;

    let console = CliConsole::new(cli.verbose);
    tracing::debug!(command = ?cli.command, "dispatching command");
    let result = dispatch(&ctx, &console, cli.command).await;
    ctx.shutdown().await;
    result
}

async fn dispatch(ctx: &ClientContext, console: &CliConsole, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Status { game, json } => commands::status::show(ctx, console, game, json).await,
        Commands::Sync => commands::sync::run(ctx, console).await,
        Commands::CheckIn {
            game,
            base,
            no_sync,
        } => {
            let queued = ctx.queue_check_in(game, base).await?;
            commands::enqueue::report(ctx, console, queued, "check-in", no_sync).await
        }
        Commands::Submit {
            game,
            base,
            challenge,
            answer,
            no_sync,
        } => {
            let queued = ctx.queue_submission(game, base, challenge, answer).await?;
            commands::enqueue::report(ctx, console, queued, "submission", no_sync).await
        }
        Commands::SubmitMedia {
            game,
            base,
            challenge,
            file,
            answer,
            content_type,
            no_sync,
        } => {
            let queued = ctx
                .queue_media_submission(game, base, challenge, answer, &file, content_type.as_deref())
                .await?;
            commands::enqueue::report(ctx, console, queued, "media submission", no_sync).await
        }
        Commands::Reselect { action, file } => commands::queue::reselect(ctx, console, action, &file).await,
        Commands::Discard { action } => commands::queue::discard(ctx, console, action).await,
        Commands::Clear { game, yes } => commands::queue::clear(ctx, console, game, yes).await,
        Commands::Listen { game, seconds } => commands::listen::run(ctx, console, game, seconds).await,
    }
}
