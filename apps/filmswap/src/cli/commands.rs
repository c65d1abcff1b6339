//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands. Every
//! command opens the configured store, runs one engine call and prints the
//! result, as JSON when `--json-mode` is set.

use crate::api::{self, AppState};
use crate::backup::{self, BackupFormat};
use crate::config::{Backend, Settings};
use crate::{Engine, deliver, open_engine};
use filmswap_core::{
    GraphLayout, Notification, ParticipantId, RedbStore, Reveal, RevealFormat, StorageBackend,
    SummaryEntry, SwapEngine, SwapError,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Resolved settings plus output mode, shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    pub settings: Settings,
    pub json_mode: bool,
}

impl Context {
    fn engine(&self) -> Result<Engine, SwapError> {
        open_engine(&self.settings)
    }

    /// Print `value` as JSON in json mode, otherwise run `human`.
    fn output<T: Serialize>(&self, value: &T, human: impl FnOnce(&T)) -> Result<(), SwapError> {
        if self.json_mode {
            let text = serde_json::to_string_pretty(value)
                .map_err(|e| SwapError::SerializationError(e.to_string()))?;
            println!("{}", text);
        } else {
            human(value);
        }
        Ok(())
    }
}

fn print_notifications(notifications: &[Notification]) {
    deliver::dispatch(notifications);
    for notification in notifications {
        let marker = if notification.is_skipped() { " (skipped)" } else { "" };
        println!(
            "-> {}{}: {}",
            notification.recipient(),
            marker,
            notification.message()
        );
    }
}

fn names(entries: &[SummaryEntry]) -> String {
    if entries.is_empty() {
        return "none".to_string();
    }
    entries
        .iter()
        .map(|e| e.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(
    ctx: Context,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), SwapError> {
    let mut settings = ctx.settings;
    if let Some(host) = host {
        settings.host = host;
    }
    if let Some(port) = port {
        settings.port = port;
    }
    let engine = open_engine(&settings)?;

    println!("filmswap server starting...");
    println!();
    println!("Configuration:");
    println!("  Address:  {}", settings.bind_addr());
    println!("  Backend:  {:?}", settings.backend);
    println!("  Database: {:?}", settings.database);
    println!();
    println!("Endpoints:");
    println!("  GET  /swap                      - Period and counts");
    println!("  POST /participants              - Join");
    println!("  GET  /participants/{{id}}/giftee-letter");
    println!("  POST /admin/match               - Match participants");
    println!("  POST /admin/period              - Change period");
    println!("  GET  /health                    - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let state = AppState::new(engine, &settings);
    api::run_server(&settings.bind_addr(), state, &settings.cors_origins).await
}

// =============================================================================
// INIT / CREATE
// =============================================================================

/// Initialize a new database, optionally loading a backup.
pub fn cmd_init(ctx: &Context, force: bool, restore: Option<&Path>) -> Result<(), SwapError> {
    let db_path = &ctx.settings.database;
    if ctx.settings.backend != Backend::Redb {
        return Err(SwapError::ConfigError(
            "init needs the redb backend".to_string(),
        ));
    }
    if db_path.exists() {
        if !force {
            return Err(SwapError::IoError(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(db_path)
            .map_err(|e| SwapError::IoError(format!("Remove {}: {}", db_path.display(), e)))?;
    }

    let mut store = RedbStore::open(db_path)?;
    if let Some(path) = restore {
        let snapshot = backup::read_backup(path)?;
        backup::restore_into(&mut store, &snapshot)?;
        println!(
            "Restored {} participants from {:?}",
            snapshot.participants.len(),
            path
        );
    }
    println!("Initialized new redb database at {:?}", db_path);
    Ok(())
}

/// Create the swap.
pub fn cmd_create(ctx: &Context) -> Result<(), SwapError> {
    let record = ctx.engine()?.create_swap()?;
    ctx.output(&record, |r| println!("Swap created, period is {}", r.period))
}

// =============================================================================
// PARTICIPANT COMMANDS
// =============================================================================

/// Join the swap.
pub fn cmd_join(ctx: &Context, id: u64, name: &str) -> Result<(), SwapError> {
    let outcome = ctx.engine()?.join(ParticipantId(id), name)?;
    ctx.output(&outcome, |o| {
        if o.letter_restored {
            println!("{} joined the swap. Your old letter has been restored.", o.participant.name);
        } else {
            println!("{} joined the swap. Write a letter next.", o.participant.name);
        }
    })
}

/// Write a letter.
pub fn cmd_letter(ctx: &Context, id: u64, text: &str) -> Result<(), SwapError> {
    ctx.engine()?.set_letter(ParticipantId(id), text)?;
    ctx.output(&serde_json::json!({ "id": id, "letter": "set" }), |_| {
        println!("Letter saved.");
    })
}

/// Submit a gift.
pub fn cmd_gift(ctx: &Context, id: u64, text: &str) -> Result<(), SwapError> {
    ctx.engine()?.set_gift(ParticipantId(id), text)?;
    ctx.output(&serde_json::json!({ "id": id, "gift": "set" }), |_| {
        println!("Gift saved. It will be delivered when the watch period starts.");
    })
}

/// Set or clear the done-watching flag.
pub fn cmd_done(ctx: &Context, id: u64, done: bool) -> Result<(), SwapError> {
    ctx.engine()?.set_done_watching(ParticipantId(id), done)?;
    ctx.output(&serde_json::json!({ "id": id, "done_watching": done }), |_| {
        if done {
            println!("Marked as done watching.");
        } else {
            println!("Marked as not done watching.");
        }
    })
}

/// Update the display name.
pub fn cmd_rename(ctx: &Context, id: u64, name: &str) -> Result<(), SwapError> {
    ctx.engine()?.rename(ParticipantId(id), name)?;
    ctx.output(&serde_json::json!({ "id": id, "name": name.trim() }), |_| {
        println!("Name updated.");
    })
}

/// Leave the swap.
pub fn cmd_leave(ctx: &Context, id: u64) -> Result<(), SwapError> {
    let outcome = ctx.engine()?.leave(ParticipantId(id))?;
    ctx.output(&outcome, |o| {
        println!("{} left the swap.", o.removed);
        print_notifications(&o.notifications);
    })
}

/// The giftee's letter.
pub fn cmd_read(ctx: &Context, id: u64) -> Result<(), SwapError> {
    let letter = ctx.engine()?.read_giftee_letter(ParticipantId(id))?;
    ctx.output(&letter, |l| {
        println!("Your giftee is {}. Their letter:", l.name);
        println!();
        println!("{}", l.letter);
    })
}

/// The gift from the santa.
pub fn cmd_receive(ctx: &Context, id: u64) -> Result<(), SwapError> {
    let gift = ctx.engine()?.receive_gift(ParticipantId(id))?;
    ctx.output(&gift, |g| {
        println!("Your santa sent you:");
        println!();
        println!("{}", g.gift);
    })
}

// =============================================================================
// ADMIN COMMANDS
// =============================================================================

/// Ban a participant.
pub fn cmd_ban(ctx: &Context, id: u64) -> Result<(), SwapError> {
    let outcome = ctx.engine()?.ban(ParticipantId(id))?;
    ctx.output(&outcome, |o| {
        println!("{} is banned.", o.removed);
        print_notifications(&o.notifications);
    })
}

/// Lift a ban.
pub fn cmd_unban(ctx: &Context, id: u64) -> Result<(), SwapError> {
    ctx.engine()?.unban(ParticipantId(id))?;
    ctx.output(&serde_json::json!({ "id": id, "banned": false }), |_| {
        println!("{} is no longer banned.", id);
    })
}

/// Match participants.
pub fn cmd_match(ctx: &Context) -> Result<(), SwapError> {
    let outcome = ctx.engine()?.match_users()?;
    ctx.output(&api::MatchResponse::from(outcome), |o| {
        if o.newly_matched.is_empty() {
            println!("Nobody new to match.");
        } else {
            println!(
                "Matched {} participants ({:?}).",
                o.newly_matched.len(),
                o.strategy
            );
        }
        print_notifications(&o.notifications);
    })
}

/// Clear every assignment edge.
pub fn cmd_unmatch(ctx: &Context) -> Result<(), SwapError> {
    if ctx.settings.disable_unmatch {
        return Err(SwapError::ConfigError("unmatch is disabled".to_string()));
    }
    let outcome = ctx.engine()?.unmatch_all()?;
    ctx.output(&outcome, |o| {
        println!("Unmatched {} participants.", o.unmatched.len());
    })
}

/// Change the period.
pub fn cmd_period(ctx: &Context, name: &str) -> Result<(), SwapError> {
    let mut transition = ctx.engine()?.set_period(name)?;
    if !ctx.settings.period_post_hook {
        transition.notifications.clear();
    }
    ctx.output(&transition, |t| {
        println!("Period changed from {} to {}.", t.from, t.to);
        print_notifications(&t.notifications);
    })
}

/// Swap summary.
pub fn cmd_info(ctx: &Context) -> Result<(), SwapError> {
    let summary = ctx.engine()?.summary()?;
    ctx.output(&summary, |s| {
        println!("filmswap Summary");
        println!("================");
        println!("Period:            {}", s.period);
        println!("Participants:      {} ({} active)", s.all.len(), s.active());
        println!();
        println!("Without letters:   {}", names(&s.without_letters));
        println!("Without gifts:     {}", names(&s.without_gifts));
        println!("Not done watching: {}", names(&s.not_done_watching));
        println!("Without giftees:   {}", names(&s.without_giftees));
        println!("Without santas:    {}", names(&s.without_santas));
        println!("Banned:            {}", names(&s.banned));
    })
}

// =============================================================================
// REVEAL / BACKUP
// =============================================================================

/// Arguments of `reveal`.
#[derive(Debug, Clone)]
pub struct RevealArgs {
    pub format: String,
    pub layout: Option<String>,
    pub count: usize,
    pub backup: Option<PathBuf>,
    pub output: PathBuf,
}

/// Reveal the assignment, from the database or a backup file.
pub fn cmd_reveal(ctx: &Context, args: &RevealArgs) -> Result<(), SwapError> {
    let format: RevealFormat = args.format.parse()?;
    let layout: GraphLayout = match &args.layout {
        Some(name) => name.parse()?,
        None => ctx.settings.default_layout,
    };

    let engine = match &args.backup {
        Some(path) => {
            let snapshot = backup::read_backup(path)?;
            SwapEngine::new(
                StorageBackend::InMemory(snapshot.into_store()),
                StdRng::from_entropy(),
            )
        }
        None => ctx.engine()?,
    };
    let reveal = engine.reveal(format, layout, args.count)?;

    if ctx.json_mode {
        return ctx.output(&reveal, |_| {});
    }
    match reveal {
        Reveal::Text(report) | Reveal::Pretty(report) => println!("{}", report),
        Reveal::Graph(graphs) => {
            std::fs::create_dir_all(&args.output).map_err(|e| {
                SwapError::IoError(format!("Create {}: {}", args.output.display(), e))
            })?;
            for (i, graph) in graphs.iter().enumerate() {
                let path = args.output.join(format!("reveal-{}.json", i + 1));
                let data = serde_json::to_vec_pretty(graph)
                    .map_err(|e| SwapError::SerializationError(e.to_string()))?;
                std::fs::write(&path, data)
                    .map_err(|e| SwapError::IoError(format!("Write {}: {}", path.display(), e)))?;
                println!("Wrote {} layout to {:?}", graph.layout, path);
            }
        }
    }
    Ok(())
}

/// Write a backup of the whole store.
pub fn cmd_backup(ctx: &Context, binary: bool) -> Result<(), SwapError> {
    let snapshot = ctx.engine()?.export()?;
    let format = if binary {
        BackupFormat::Binary
    } else {
        BackupFormat::Json
    };
    let path = backup::write_backup(&snapshot, &ctx.settings.backup_dir, format)?;
    ctx.output(&serde_json::json!({ "path": path }), |_| {
        println!("Backup written to {:?}", path);
    })
}
