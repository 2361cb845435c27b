//! CLI definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

/// NoteSync — version-control-style sync between Notion and a local
/// Markdown tree.
#[derive(Parser, Debug)]
#[command(name = "ns", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a project folder for syncing
    Init {
        /// Project folder (defaults to the current directory)
        folder: Option<PathBuf>,

        /// Workspace URL (parent of the project page)
        #[arg(long)]
        workspace_url: Option<String>,

        /// Root page URL (falls back to NOTION_ROOT_URL)
        #[arg(long)]
        root_url: Option<String>,
    },

    /// Initialize from a remote page and pull its whole subtree
    Clone {
        /// Root page URL to clone
        url: Option<String>,

        /// Target folder (defaults to the current directory)
        folder: Option<PathBuf>,

        /// Workspace URL (parent of the project page)
        #[arg(long)]
        workspace_url: Option<String>,
    },

    /// Push local changes to the remote
    Push {
        /// Project folder
        folder: PathBuf,

        /// Re-push everything, ignoring content hashes
        #[arg(long)]
        force_all: bool,

        /// Compute and print the plan without any remote writes
        #[arg(long)]
        dry_run: bool,
    },

    /// Pull remote changes into the local tree
    Pull {
        /// Project folder
        folder: PathBuf,

        /// Only discover pages not yet tracked locally
        #[arg(long, conflicts_with = "existing_only")]
        new_only: bool,

        /// Only refresh pages already tracked locally
        #[arg(long)]
        existing_only: bool,

        /// Re-render every page, ignoring edit timestamps
        #[arg(long)]
        force_all: bool,

        /// Enumerate the plan without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Show sync state; --fix repairs configuration and index
    Status {
        /// Project folder
        folder: PathBuf,

        /// Re-resolve the root URL and normalize the index
        #[arg(long)]
        fix: bool,
    },
}
