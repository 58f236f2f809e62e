use owo_colors::OwoColorize;

use crate::report::summary::MergeSummary;

/// Render a merge summary to the terminal with colors
pub fn render(summary: &MergeSummary) {
    println!();
    println!(
        "{}  nessus-merge v{} — Merged {} files in {:.2}s",
        "🧩".bold(),
        summary.version,
        summary.files_accepted,
        summary.duration_ms as f64 / 1000.0
    );
    println!();

    if summary.files.is_empty() {
        println!("  {}  No .nessus or .xml files found", "⚠️".bold());
    }

    for file in &summary.files {
        let name = file.path.display().to_string();
        if !file.accepted {
            println!(
                "  {}  {}",
                " SKIP ".on_white().black(),
                name.dimmed()
            );
            println!(
                "           root element <{}> is not a Nessus v2 report",
                file.root_tag
            );
            continue;
        }

        println!("  {}  {}", " MERGE ".on_blue().white().bold(), name);
        let mut details = vec![format!("{} hosts", file.hosts_written)];
        if file.duplicates > 0 {
            details.push(format!("{} duplicates", file.duplicates).yellow().to_string());
        }
        if file.policy {
            details.push("policy".green().to_string());
        }
        println!("           {}", details.join(", "));
    }

    println!();
    println!("{}", "━".repeat(60));

    println!(
        " {} unique hosts written to {}",
        summary.hosts_written.to_string().bold(),
        summary.output.display().bold()
    );
    if summary.duplicates_skipped > 0 {
        println!(
            " {} duplicate hosts dropped",
            summary.duplicates_skipped.to_string().yellow()
        );
    }
    if !summary.policy_written {
        println!(" {}", "No <Policy> block found in the first report".dimmed());
    }
    if summary.files_skipped > 0 {
        println!(
            " ({} files skipped)",
            summary.files_skipped.to_string().dimmed()
        );
    }

    println!("{}", "━".repeat(60));
    println!();
}
