use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use nessus_merge::cli::{self, Cli};
use nessus_merge::config::{self, MergeConfig};
use nessus_merge::report;
use nessus_merge::{MergeOptions, ReportAssembler};

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("nessus_merge=debug")
    } else if cli.quiet {
        EnvFilter::new("nessus_merge=error")
    } else {
        EnvFilter::new("nessus_merge=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    info!("nessus-merge v{}", env!("CARGO_PKG_VERSION"));

    match &cli.command {
        cli::Commands::Merge(args) => {
            let mut options = MergeOptions::default();
            if !args.no_config {
                if let Some(cfg) = MergeConfig::load(&args.launch_directory) {
                    cfg.apply(&mut options);
                }
            }

            let assembler = ReportAssembler::new(&args.launch_directory, &args.report_name, options);
            let summary = assembler
                .run()
                .with_context(|| format!("merge into {} failed", assembler.output_path().display()))?;

            match args.format.as_str() {
                "json" => println!("{}", report::json::render(&summary)?),
                _ => {
                    if !cli.quiet {
                        report::terminal::render(&summary);
                    }
                }
            }

            if let Some(ref path) = args.summary_out {
                let json_output = report::json::render(&summary)?;
                std::fs::write(path, &json_output)
                    .with_context(|| format!("writing summary to {}", path.display()))?;
                info!("Summary written to {}", path.display());
            }
        }
        cli::Commands::Init => {
            let dir = std::env::current_dir()?;
            if config::init_config(&dir)? {
                println!("✅ Created {}", config::CONFIG_FILE);
                println!("   Edit it to customize merge settings.");
            } else {
                println!("⚠️  {} already exists in this directory", config::CONFIG_FILE);
            }
        }
    }

    Ok(())
}
