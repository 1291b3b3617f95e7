//! Pointfinder CLI
//!
//! Operator and debugging front end for the offline action queue: inspect and
//! drain the queue, enqueue check-ins and answers, repair stalled media
//! uploads and follow the realtime event stream.
//!
//! ```bash
//! pointfinder status
//! pointfinder check-in <game> <base>
//! pointfinder sync
//! pointfinder listen <game>
//! ```

mod args;
mod commands;
mod console;
mod logging;
mod router;

use clap::Parser;
use console::CliConsole;
use std::process::ExitCode;

pub use args::{Cli, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let console = CliConsole::new(cli.verbose);
    match router::route(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            console.error(&format!("{:#}", err));
            ExitCode::FAILURE
        }
    }
}
