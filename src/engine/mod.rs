pub mod file_walker;

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::extract::{ExtractOutcome, HostDeduplicator, PolicyExtractor, SeenHosts, SubtreeExtractor};
use crate::report::output::{OutputDocument, HOST_TAG, POLICY_TAG, ROOT_TAG};
use crate::report::summary::{FileOutcome, MergeSummary};
use crate::stream::ElementStream;

/// Tunables for a merge run. Defaults match the Nessus v2 format.
#[derive(Debug, Clone)]
pub struct MergeOptions {
    pub root_tag: String,
    pub policy_tag: String,
    pub host_tag: String,
    /// Accepted file extensions, without the dot
    pub extensions: Vec<String>,
    /// File names to leave out of discovery
    pub exclude: Vec<String>,
    /// Spaces per level when re-indenting copied subtrees
    pub indent: usize,
    /// fsync after every append
    pub sync: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        MergeOptions {
            root_tag: ROOT_TAG.to_string(),
            policy_tag: POLICY_TAG.to_string(),
            host_tag: HOST_TAG.to_string(),
            extensions: vec!["nessus".to_string(), "xml".to_string()],
            exclude: Vec::new(),
            indent: 2,
            sync: false,
        }
    }
}

/// Merges every report in a directory into one document.
///
/// The first accepted file supplies the policy block; host records are taken
/// from all accepted files, first occurrence of each name wins. Files are
/// handled one after another and every copied subtree is appended to the
/// output as soon as it closes.
pub struct ReportAssembler {
    input_dir: PathBuf,
    report_name: String,
    options: MergeOptions,
}

impl ReportAssembler {
    pub fn new(input_dir: impl Into<PathBuf>, report_name: impl Into<String>, options: MergeOptions) -> Self {
        ReportAssembler {
            input_dir: input_dir.into(),
            report_name: report_name.into(),
            options,
        }
    }

    /// Output location: the report name inside the input directory
    pub fn output_path(&self) -> PathBuf {
        self.input_dir.join(&self.report_name)
    }

    /// Run the full merge
    pub fn run(&self) -> Result<MergeSummary> {
        let start = Instant::now();
        let output_path = self.output_path();

        // Step 1: Discover inputs (order is fixed here)
        info!("Discovering reports in {}", self.input_dir.display());
        let inputs = file_walker::discover_reports(
            &self.input_dir,
            &self.options.extensions,
            &self.options.exclude,
            Some(&output_path),
        )?;
        info!("Found {} candidate files", inputs.len());

        self.merge_files(&inputs, &output_path, start)
    }

    /// Merge an explicit, already ordered list of inputs into `output_path`
    pub fn merge_files(&self, inputs: &[PathBuf], output_path: &Path, start: Instant) -> Result<MergeSummary> {
        // Step 2: Prologue
        let mut output = OutputDocument::create(
            output_path,
            &self.options.root_tag,
            self.options.indent,
            self.options.sync,
        )?;
        output.write_prologue()?;

        let mut seen = SeenHosts::new();
        let mut files = Vec::with_capacity(inputs.len());
        let mut policy_written = false;
        let mut first_accepted = true;

        // Steps 3-5: one file at a time
        for path in inputs {
            let mut stream = ElementStream::open(path)?;
            let root = stream.document_root()?.to_string();
            if root != self.options.root_tag {
                warn!("Skipping {}: root element is <{}>", path.display(), root);
                files.push(FileOutcome::skipped(path, root));
                continue;
            }

            let mut outcome = FileOutcome::accepted(path, root);

            if first_accepted {
                first_accepted = false;
                output.begin_policy()?;
                let policy = self.run_extractor(
                    &mut PolicyExtractor::new(self.options.policy_tag.as_str()),
                    &mut stream,
                    &mut output,
                )?;
                policy_written = policy.written > 0;
                outcome.policy = policy_written;
                output.open_report(&self.report_name)?;

                // The policy pass may have stopped anywhere; hosts need a fresh parse
                stream = ElementStream::open(path)?;
                stream.document_root()?;
            }

            let hosts = self.run_extractor(
                &mut HostDeduplicator::new(self.options.host_tag.as_str(), &mut seen),
                &mut stream,
                &mut output,
            )?;
            outcome.record_hosts(hosts);
            files.push(outcome);
        }

        // Step 6: Seal. With no accepted input the report container is still emitted.
        if first_accepted {
            debug!("No accepted inputs; writing an empty report");
            output.open_report(&self.report_name)?;
        }
        output.seal()?;

        let summary = MergeSummary::new(
            &self.input_dir,
            output.path(),
            files,
            policy_written,
            seen.len(),
            output.bytes_written(),
            start.elapsed(),
        );
        info!(
            "Merged {} hosts from {} of {} files into {}",
            summary.hosts_written,
            summary.files_accepted,
            summary.files.len(),
            output.path().display()
        );
        Ok(summary)
    }

    fn run_extractor<E: SubtreeExtractor, R: std::io::BufRead>(
        &self,
        extractor: &mut E,
        stream: &mut ElementStream<R>,
        output: &mut OutputDocument,
    ) -> Result<ExtractOutcome> {
        debug!(
            "Running {} pass (<{}>) over {}",
            extractor.name(),
            extractor.tag(),
            stream.source().display()
        );
        let outcome = extractor.extract(stream, output)?;
        debug!(
            "{} pass over {}: {} written, {} skipped",
            extractor.name(),
            stream.source().display(),
            outcome.written,
            outcome.skipped
        );
        Ok(outcome)
    }
}
