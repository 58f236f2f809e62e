use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::extract::ExtractOutcome;

/// What happened to one input file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileOutcome {
    pub path: PathBuf,

    /// False when the root element was not the expected one
    pub accepted: bool,

    /// Root element seen in the file
    pub root_tag: String,

    /// Whether this file supplied the policy block
    pub policy: bool,

    pub hosts_written: usize,

    /// Host records dropped because their name was already merged
    pub duplicates: usize,
}

impl FileOutcome {
    pub fn accepted(path: &Path, root_tag: String) -> Self {
        FileOutcome {
            path: path.to_path_buf(),
            accepted: true,
            root_tag,
            policy: false,
            hosts_written: 0,
            duplicates: 0,
        }
    }

    pub fn skipped(path: &Path, root_tag: String) -> Self {
        FileOutcome {
            accepted: false,
            ..FileOutcome::accepted(path, root_tag)
        }
    }

    pub fn record_hosts(&mut self, outcome: ExtractOutcome) {
        self.hosts_written += outcome.written;
        self.duplicates += outcome.skipped;
    }
}

/// Result of a complete merge run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeSummary {
    /// nessus-merge version
    pub version: String,

    /// When the run finished (RFC 3339)
    pub timestamp: String,

    pub input_dir: PathBuf,

    pub output: PathBuf,

    /// Per-file outcomes in processing order
    pub files: Vec<FileOutcome>,

    pub files_accepted: usize,

    pub files_skipped: usize,

    /// Whether a policy block made it into the output
    pub policy_written: bool,

    /// Distinct host names written
    pub hosts_written: usize,

    pub duplicates_skipped: usize,

    pub bytes_written: u64,

    pub duration_ms: u64,
}

impl MergeSummary {
    pub fn new(
        input_dir: &Path,
        output: &Path,
        files: Vec<FileOutcome>,
        policy_written: bool,
        hosts_written: usize,
        bytes_written: u64,
        duration: Duration,
    ) -> Self {
        let files_accepted = files.iter().filter(|f| f.accepted).count();
        let duplicates_skipped = files.iter().map(|f| f.duplicates).sum();
        MergeSummary {
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            input_dir: input_dir.to_path_buf(),
            output: output.to_path_buf(),
            files_skipped: files.len() - files_accepted,
            files_accepted,
            files,
            policy_written,
            hosts_written,
            duplicates_skipped,
            bytes_written,
            duration_ms: duration.as_millis() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_are_derived_from_file_outcomes() {
        let mut a = FileOutcome::accepted(Path::new("a.nessus"), "NessusClientData_v2".to_string());
        a.policy = true;
        a.record_hosts(ExtractOutcome { written: 2, skipped: 0 });
        let mut b = FileOutcome::accepted(Path::new("b.nessus"), "NessusClientData_v2".to_string());
        b.record_hosts(ExtractOutcome { written: 1, skipped: 1 });
        let c = FileOutcome::skipped(Path::new("c.xml"), "html".to_string());

        let summary = MergeSummary::new(
            Path::new("in"),
            Path::new("in/out.nessus"),
            vec![a, b, c],
            true,
            3,
            120,
            Duration::from_millis(5),
        );
        assert_eq!(summary.files_accepted, 2);
        assert_eq!(summary.files_skipped, 1);
        assert_eq!(summary.duplicates_skipped, 1);
        assert_eq!(summary.duration_ms, 5);
        assert!(!summary.files[2].accepted);
        assert_eq!(summary.files[2].root_tag, "html");
    }
}
