pub mod commands;

use clap::Parser;

pub use commands::{Commands, MergeArgs};

/// nessus-merge: combine Nessus scan reports
///
/// Keeps the policy of the first report and one copy of every host.
#[derive(Parser, Debug)]
#[command(
    name = "nessus-merge",
    version,
    about = "Merge Nessus v2 reports into a single deduplicated report",
    long_about = "nessus-merge streams every .nessus/.xml report in a directory into one file.\nThe first report supplies the policy; each host appears once, first occurrence wins."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}
