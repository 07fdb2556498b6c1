//! CLI argument definitions.

use clap::builder::RangedU64ValueParser;
use clap::{Parser, Subcommand};
use seqid_core::{DEFAULT_MIN_WIDTH, MAX_BATCH, MAX_WIDTH};

/// Top-level CLI parser for `seqid`.
#[derive(Debug, Parser)]
#[command(name = "seqid", version, about = "Allocate and inspect human-readable entity IDs")]
pub struct Cli {
    /// Minimum digits in the numeric part of allocated IDs.
    #[arg(
        long,
        env = "SEQID_MIN_WIDTH",
        default_value_t = DEFAULT_MIN_WIDTH,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..=MAX_WIDTH as u64),
        global = true
    )]
    pub min_width: usize,

    /// Print machine-readable JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,

    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the counter table if it does not exist.
    Migrate,
    /// Allocate IDs for a code or entity kind name (`US`, `user`, `EV`, ...).
    Allocate {
        /// Entity code or registered kind name.
        target: String,
        /// How many consecutive IDs to allocate.
        #[arg(
            long,
            short = 'n',
            default_value_t = 1,
            value_parser = clap::value_parser!(u64).range(1..=MAX_BATCH)
        )]
        count: u64,
    },
    /// Show the last issued sequence for one code, or every counter.
    Show {
        /// Entity code or registered kind name.
        target: Option<String>,
    },
    /// List the registered entity kinds and their codes.
    Kinds,
}
