pub mod app;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "blogdb")]
#[command(about = "Blog store with soft deletion and self-maintaining counters")]
#[command(version)]
pub struct Cli {
    /// Snapshot file to restore from and write back to (overrides BLOGDB_SNAPSHOT).
    /// Without one, every invocation starts from an empty store.
    #[arg(long, global = true)]
    pub snapshot: Option<PathBuf>,

    /// bcrypt cost for new passwords (overrides BLOGDB_BCRYPT_COST)
    #[arg(long, global = true)]
    pub bcrypt_cost: Option<u32>,

    /// Log filter, e.g. `blogdb=debug`
    #[arg(long, global = true, env = "RUST_LOG")]
    pub log_level: Option<String>,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Seed sample data, print the reports, exercise removals and audit
    Demo,
    /// Create the sample users, posts and comments
    Seed,
    /// Show a user's live posts with their live comments
    Posts {
        #[arg(long)]
        user: u64,
    },
    /// Show the most commented live posts
    Top,
    /// Soft-remove one comment
    RemoveComment { id: u64 },
    /// Remove a post together with its comments
    RemovePost { id: u64 },
    /// Recompute every counter and report drift
    Audit,
}
