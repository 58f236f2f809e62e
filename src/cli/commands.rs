use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Merge all reports in a directory into one deduplicated report
    Merge(MergeArgs),

    /// Initialize a .nessus-merge.toml config file in the current directory
    Init,
}

#[derive(clap::Args, Debug)]
pub struct MergeArgs {
    /// Path to the directory holding the .nessus files
    #[arg(short = 'l', long)]
    pub launch_directory: PathBuf,

    /// Name of the merged report, extension included. Written inside the
    /// launch directory.
    #[arg(short = 'o', long)]
    pub report_name: String,

    /// Summary format: "terminal" or "json"
    #[arg(short, long, default_value = "terminal")]
    pub format: String,

    /// Also write the JSON summary to this file
    #[arg(long)]
    pub summary_out: Option<PathBuf>,

    /// Ignore .nessus-merge.toml config files
    #[arg(long)]
    pub no_config: bool,
}
