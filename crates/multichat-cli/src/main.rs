//! multichat command-line front end.
//!
//! Opens the data directory, loads everything, runs one command, and exits.
//! Logs go to stderr through `env_logger` (`RUST_LOG` overrides `-v`).

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use multichat_core::{AppContext, ImportMode, PrivacyLevel};

#[derive(Parser, Debug)]
#[command(name = "multichat", version, about = "Manage multichat personas, conversations, and backups")]
struct Cli {
    /// Data directory (defaults to $MULTICHAT_DATA_DIR, then ~/.multichat)
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List members and conversations
    List,
    /// Show counts and settings
    Stats,
    /// Create a member
    AddMember {
        name: String,
        /// Comma-separated personality tags
        #[arg(long, default_value = "")]
        tags: String,
        #[arg(long, default_value = "")]
        background: String,
        #[arg(long, default_value = "public")]
        privacy: PrivacyLevel,
    },
    /// Make a member the current one
    Switch { id: String },
    /// Delete a member (their sent messages are kept)
    DeleteMember { id: String },
    /// Create a conversation and open it
    NewConversation { name: String },
    /// Open a conversation
    Select { id: String },
    /// Rename a conversation
    RenameConversation { id: String, name: String },
    /// Delete a conversation and all its messages
    DeleteConversation { id: String },
    /// Send a message as the current member
    Send {
        #[arg(required = true, num_args = 1..)]
        content: Vec<String>,
        /// Send into this conversation instead of the open one
        #[arg(long)]
        conversation: Option<String>,
        /// Send as this member instead of the current one
        #[arg(long = "as", value_name = "MEMBER_ID")]
        sender: Option<String>,
    },
    /// Print the messages of a conversation
    History {
        /// Conversation id (defaults to the open one)
        id: Option<String>,
    },
    /// Search message content
    Search { query: String },
    /// Export a bundle
    Export {
        path: PathBuf,
        #[arg(long)]
        no_members: bool,
        #[arg(long)]
        no_conversations: bool,
        #[arg(long)]
        no_settings: bool,
    },
    /// Import a bundle
    Import {
        path: PathBuf,
        #[arg(long, default_value = "merge")]
        mode: ImportMode,
    },
    /// Show what a bundle contains without importing it
    Preview { path: PathBuf },
    /// Delete every conversation and message
    ClearHistory {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Pick a color theme by index
    Theme { index: usize },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .target(env_logger::Target::Stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut builder = AppContext::builder();
    if let Some(dir) = &cli.data_dir {
        builder = builder.data_dir(dir);
    }
    let ctx = builder.build().context("failed to open data directory")?;
    log::debug!("Using data directory {}", ctx.data_dir().display());

    let outcome = ctx.load_all();
    for (path, reason) in &outcome.failed {
        log::warn!("Skipped {}: {reason}", path.display());
    }

    commands::run(&ctx, cli.command)
}
