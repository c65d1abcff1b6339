//! # filmswap CLI Module
//!
//! This module implements the CLI interface for filmswap.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `init` - Initialize a new database, optionally from a backup
//! - `create` - Create the swap
//! - `join` / `leave` / `rename` - Participant enrollment
//! - `letter` / `gift` / `done` - Participant submissions
//! - `read` / `receive` - Read the giftee's letter or the received gift
//! - `match` / `unmatch` - Build or clear the assignment
//! - `ban` / `unban` - Moderation
//! - `period` - Move between JOIN, SWAP and WATCH
//! - `info` - Summary of the swap
//! - `reveal` - Show who gifts to whom
//! - `backup` - Write a JSON or binary backup

mod commands;

use crate::config::Settings;
use clap::{Parser, Subcommand};
use filmswap_core::SwapError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// filmswap - a recurring film swap
///
/// Every participant writes a letter, gets a giftee to pick a film for,
/// and receives a film from their santa.
#[derive(Parser, Debug)]
#[command(name = "filmswap")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the TOML config file [default: filmswap.toml]
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the swap database (overrides the config file)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to (overrides the config file)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Initialize a new empty database
    Init {
        /// Overwrite an existing database
        #[arg(short, long)]
        force: bool,

        /// Load a JSON or binary backup into the new database
        #[arg(short, long)]
        restore: Option<PathBuf>,
    },

    /// Create the swap, starting in the JOIN period
    Create,

    /// Join the swap
    Join {
        /// Participant id
        id: u64,
        /// Display name
        name: String,
    },

    /// Write or replace a letter
    Letter {
        /// Participant id
        id: u64,
        /// Letter text
        text: String,
    },

    /// Submit the gift for your giftee
    Gift {
        /// Participant id
        id: u64,
        /// Gift text
        text: String,
    },

    /// Mark a participant done watching
    Done {
        /// Participant id
        id: u64,

        /// Clear the flag instead of setting it
        #[arg(long)]
        undo: bool,
    },

    /// Leave the swap
    Leave {
        /// Participant id
        id: u64,
    },

    /// Ban a participant, removing them from the swap
    Ban {
        /// Participant id
        id: u64,
    },

    /// Lift a ban
    Unban {
        /// Participant id
        id: u64,
    },

    /// Match every participant who has written a letter
    Match,

    /// Clear every giftee and santa (recovery only)
    Unmatch,

    /// Change the swap period
    Period {
        /// JOIN, SWAP or WATCH (case-insensitive)
        name: String,
    },

    /// Read your giftee's letter
    Read {
        /// Participant id
        id: u64,
    },

    /// Read the gift your santa sent
    Receive {
        /// Participant id
        id: u64,
    },

    /// Show the swap summary
    Info,

    /// Show the assignment
    Reveal {
        /// Report format (text, pretty, graph)
        #[arg(short = 't', long, default_value = "text")]
        format: String,

        /// Graph layout (circle, random, kamada_kawai, spring, spectral, randomize)
        #[arg(short, long)]
        layout: Option<String>,

        /// Number of graphs to produce
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,

        /// Reveal a backup file instead of the database
        #[arg(short, long)]
        backup: Option<PathBuf>,

        /// Directory for graph JSON files
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Write a backup to the backup directory
    Backup {
        /// Use the binary snapshot format instead of JSON
        #[arg(long)]
        binary: bool,
    },

    /// Update a participant's display name
    Rename {
        /// Participant id
        id: u64,
        /// New display name
        name: String,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli, mut settings: Settings) -> Result<(), SwapError> {
    if let Some(database) = cli.database {
        settings.database = database;
    }
    let ctx = Context {
        settings,
        json_mode: cli.json_mode,
    };

    match cli.command {
        Some(Commands::Server { host, port }) => cmd_server(ctx, host, port).await,
        Some(Commands::Init { force, restore }) => cmd_init(&ctx, force, restore.as_deref()),
        Some(Commands::Create) => cmd_create(&ctx),
        Some(Commands::Join { id, name }) => cmd_join(&ctx, id, &name),
        Some(Commands::Letter { id, text }) => cmd_letter(&ctx, id, &text),
        Some(Commands::Gift { id, text }) => cmd_gift(&ctx, id, &text),
        Some(Commands::Done { id, undo }) => cmd_done(&ctx, id, !undo),
        Some(Commands::Leave { id }) => cmd_leave(&ctx, id),
        Some(Commands::Ban { id }) => cmd_ban(&ctx, id),
        Some(Commands::Unban { id }) => cmd_unban(&ctx, id),
        Some(Commands::Match) => cmd_match(&ctx),
        Some(Commands::Unmatch) => cmd_unmatch(&ctx),
        Some(Commands::Period { name }) => cmd_period(&ctx, &name),
        Some(Commands::Read { id }) => cmd_read(&ctx, id),
        Some(Commands::Receive { id }) => cmd_receive(&ctx, id),
        Some(Commands::Info) => cmd_info(&ctx),
        Some(Commands::Reveal {
            format,
            layout,
            count,
            backup,
            output,
        }) => cmd_reveal(
            &ctx,
            &RevealArgs {
                format,
                layout,
                count,
                backup,
                output,
            },
        ),
        Some(Commands::Backup { binary }) => cmd_backup(&ctx, binary),
        Some(Commands::Rename { id, name }) => cmd_rename(&ctx, id, &name),
        None => {
            // No subcommand - show the summary by default
            cmd_info(&ctx)
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["filmswap", "join", "7", "Agnès", "--json-mode", "-q"])
            .expect("parse");
        assert!(cli.json_mode);
        assert!(cli.quiet);
        assert!(matches!(
            cli.command,
            Some(Commands::Join { id: 7, ref name }) if name == "Agnès"
        ));
    }

    #[test]
    fn reveal_defaults() {
        let cli = Cli::try_parse_from(["filmswap", "reveal"]).expect("parse");
        let Some(Commands::Reveal {
            format,
            layout,
            count,
            backup,
            ..
        }) = cli.command
        else {
            unreachable!("parsed a different command");
        };
        assert_eq!(format, "text");
        assert_eq!(layout, None);
        assert_eq!(count, 1);
        assert_eq!(backup, None);
    }

    #[test]
    fn done_undo_flag() {
        let cli = Cli::try_parse_from(["filmswap", "done", "3", "--undo"]).expect("parse");
        assert!(matches!(cli.command, Some(Commands::Done { id: 3, undo: true })));
    }
}
