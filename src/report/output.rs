use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use quick_xml::escape::escape;
use tracing::debug;

use crate::error::{MergeError, Result};
use crate::stream::Element;

pub const ROOT_TAG: &str = "NessusClientData_v2";
pub const POLICY_TAG: &str = "Policy";
pub const HOST_TAG: &str = "ReportHost";
pub const REPORT_TAG: &str = "Report";
pub const CM_NAMESPACE: &str = "http://www.nessus.org/cm";

/// Where the output document is in its one-way lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NotStarted,
    PrologueWritten,
    PolicyPhase,
    HostPhase,
    Sealed,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::NotStarted => "not started",
            Phase::PrologueWritten => "after prologue",
            Phase::PolicyPhase => "in policy phase",
            Phase::HostPhase => "in host phase",
            Phase::Sealed => "sealed",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The merged report on disk.
///
/// Append-only: every write opens the file, appends, flushes and closes it
/// again, so a failed run leaves a clean prefix of the final document.
/// Writes are only accepted in the phases that allow them.
#[derive(Debug)]
pub struct OutputDocument {
    path: PathBuf,
    root_tag: String,
    indent: usize,
    sync: bool,
    phase: Phase,
    bytes_written: u64,
}

impl OutputDocument {
    /// Create (or truncate) the output file
    pub fn create(path: &Path, root_tag: &str, indent: usize, sync: bool) -> Result<Self> {
        File::create(path).map_err(|e| MergeError::io(path, e))?;
        Ok(OutputDocument {
            path: path.to_path_buf(),
            root_tag: root_tag.to_string(),
            indent,
            sync,
            phase: Phase::NotStarted,
            bytes_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// XML declaration and root opening tag
    pub fn write_prologue(&mut self) -> Result<()> {
        self.expect(&[Phase::NotStarted], "write the prologue")?;
        let prologue = format!("<?xml version=\"1.0\" ?>\n<{}>\n", self.root_tag);
        self.append(prologue.as_bytes())?;
        self.phase = Phase::PrologueWritten;
        Ok(())
    }

    /// Enter the policy phase. Allowed once, before the report container.
    pub fn begin_policy(&mut self) -> Result<()> {
        self.expect(&[Phase::PrologueWritten], "begin the policy phase")?;
        self.phase = Phase::PolicyPhase;
        Ok(())
    }

    /// Open the report container; host records follow it
    pub fn open_report(&mut self, report_name: &str) -> Result<()> {
        self.expect(&[Phase::PrologueWritten, Phase::PolicyPhase], "open the report")?;
        let tag = format!(
            "<{} name=\"{}\" xmlns:cm=\"{}\">\n",
            REPORT_TAG,
            escape(report_name),
            CM_NAMESPACE
        );
        self.append(tag.as_bytes())?;
        self.phase = Phase::HostPhase;
        Ok(())
    }

    /// Append one serialized subtree
    pub fn append_subtree(&mut self, element: &Element) -> Result<()> {
        self.expect(&[Phase::PolicyPhase, Phase::HostPhase], "append a subtree")?;
        let bytes = element.to_pretty_xml(self.indent)?;
        self.append(&bytes)
    }

    /// Close the report container and the root. Nothing may follow.
    pub fn seal(&mut self) -> Result<()> {
        self.expect(&[Phase::HostPhase], "seal the document")?;
        let closing = format!("</{}>\n</{}>\n", REPORT_TAG, self.root_tag);
        self.append(closing.as_bytes())?;
        self.phase = Phase::Sealed;
        debug!("Sealed {} ({} bytes)", self.path.display(), self.bytes_written);
        Ok(())
    }

    fn expect(&self, allowed: &[Phase], action: &'static str) -> Result<()> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(MergeError::InvalidTransition {
                from: self.phase.as_str(),
                action,
            })
        }
    }

    fn append(&mut self, bytes: &[u8]) -> Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| MergeError::io(&self.path, e))?;
        file.write_all(bytes).map_err(|e| MergeError::io(&self.path, e))?;
        file.flush().map_err(|e| MergeError::io(&self.path, e))?;
        if self.sync {
            file.sync_data().map_err(|e| MergeError::io(&self.path, e))?;
        }
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(dir: &tempfile::TempDir) -> OutputDocument {
        OutputDocument::create(&dir.path().join("out.nessus"), ROOT_TAG, 2, false).unwrap()
    }

    #[test]
    fn empty_run_writes_prologue_report_and_closing_tags() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = document(&dir);
        doc.write_prologue().unwrap();
        doc.open_report("merged.nessus").unwrap();
        doc.seal().unwrap();

        let written = std::fs::read_to_string(doc.path()).unwrap();
        assert_eq!(
            written,
            "<?xml version=\"1.0\" ?>\n<NessusClientData_v2>\n\
             <Report name=\"merged.nessus\" xmlns:cm=\"http://www.nessus.org/cm\">\n\
             </Report>\n</NessusClientData_v2>\n"
        );
        assert_eq!(doc.bytes_written(), written.len() as u64);
        assert_eq!(doc.phase(), Phase::Sealed);
    }

    #[test]
    fn report_name_is_escaped() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = document(&dir);
        doc.write_prologue().unwrap();
        doc.open_report("a\"&b").unwrap();
        let written = std::fs::read_to_string(doc.path()).unwrap();
        assert!(written.contains("name=\"a&quot;&amp;b\""));
    }

    #[test]
    fn writes_after_seal_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = document(&dir);
        doc.write_prologue().unwrap();
        doc.open_report("r").unwrap();
        doc.seal().unwrap();

        assert!(matches!(
            doc.open_report("again"),
            Err(MergeError::InvalidTransition { from: "sealed", .. })
        ));
        assert!(doc.seal().is_err());
    }

    #[test]
    fn policy_phase_only_before_report() {
        let dir = tempfile::tempdir().unwrap();
        let mut doc = document(&dir);
        assert!(doc.begin_policy().is_err());
        doc.write_prologue().unwrap();
        doc.begin_policy().unwrap();
        assert!(doc.begin_policy().is_err());
        doc.open_report("r").unwrap();
        assert!(doc.begin_policy().is_err());
    }

    #[test]
    fn create_truncates_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.nessus");
        std::fs::write(&path, "stale content").unwrap();
        let doc = OutputDocument::create(&path, ROOT_TAG, 2, false).unwrap();
        assert_eq!(std::fs::read_to_string(doc.path()).unwrap(), "");
    }
}
