//! CLI argument definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "pointfinder")]
#[command(about = "Inspect and drain the Pointfinder offline action queue")]
#[command(version)]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, short = 'c', env = "POINTFINDER_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Access token for the player API
    #[arg(long, env = "POINTFINDER_ACCESS_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Refresh token used when the access token is rejected
    #[arg(long, env = "POINTFINDER_REFRESH_TOKEN", hide_env_values = true, global = true)]
    pub refresh_token: Option<String>,

    /// Treat the network as unavailable; actions are only queued
    #[arg(long, global = true)]
    pub offline: bool,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show queue, sync and realtime state
    Status {
        /// Only list actions of this game
        #[arg(long)]
        game: Option<Uuid>,

        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Run one sync pass over the queued actions
    Sync,

    /// Queue a base check-in
    CheckIn {
        game: Uuid,
        base: Uuid,

        /// Queue only, do not sync afterwards
        #[arg(long)]
        no_sync: bool,
    },

    /// Queue a text answer to a challenge
    Submit {
        game: Uuid,
        base: Uuid,
        challenge: Uuid,
        answer: String,

        /// Queue only, do not sync afterwards
        #[arg(long)]
        no_sync: bool,
    },

    /// Queue a photo or video answer to a challenge
    SubmitMedia {
        game: Uuid,
        base: Uuid,
        challenge: Uuid,
        file: PathBuf,

        /// Text sent along with the media
        #[arg(long, default_value = "")]
        answer: String,

        /// MIME type; guessed from the file extension when omitted
        #[arg(long)]
        content_type: Option<String>,

        /// Queue only, do not sync afterwards
        #[arg(long)]
        no_sync: bool,
    },

    /// Point a stalled media submission at a new file
    Reselect { action: Uuid, file: PathBuf },

    /// Remove one queued action and cancel its upload
    Discard { action: Uuid },

    /// Remove queued actions
    Clear {
        /// Only clear actions of this game
        #[arg(long)]
        game: Option<Uuid>,

        /// Do not ask for confirmation
        #[arg(long, short)]
        yes: bool,
    },

    /// Print realtime events for a game until interrupted
    Listen {
        game: Uuid,

        /// Stop after this many seconds
        #[arg(long)]
        seconds: Option<u64>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_check_in() {
        let game = Uuid::new_v4();
        let base = Uuid::new_v4();
        let cli = Cli::try_parse_from([
            "pointfinder",
            "check-in",
            &game.to_string(),
            &base.to_string(),
            "--no-sync",
        ])
        .unwrap();

        match cli.command {
            Commands::CheckIn {
                game: g,
                base: b,
                no_sync,
            } => {
                assert_eq!(g, game);
                assert_eq!(b, base);
                assert!(no_sync);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["pointfinder", "sync", "--offline", "--token", "abc"]).unwrap();
        assert!(cli.offline);
        assert_eq!(cli.token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_rejects_malformed_uuid() {
        assert!(Cli::try_parse_from(["pointfinder", "discard", "not-a-uuid"]).is_err());
    }
}
