pub mod hosts;
pub mod policy;

use std::io::BufRead;

use crate::error::Result;
use crate::report::output::OutputDocument;
use crate::stream::ElementStream;

pub use hosts::{HostDeduplicator, SeenHosts};
pub use policy::PolicyExtractor;

/// What one extraction pass wrote and skipped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractOutcome {
    /// Subtrees appended to the output
    pub written: usize,
    /// Matching subtrees left out (already seen)
    pub skipped: usize,
}

/// A pass over one element stream that copies selected subtrees into the
/// output document.
pub trait SubtreeExtractor {
    /// Short name used in logs (e.g. "policy", "hosts")
    fn name(&self) -> &str;

    /// Tag of the subtrees this extractor looks for
    fn tag(&self) -> &str;

    /// Consume as much of the stream as needed and append matches
    fn extract<R: BufRead>(
        &mut self,
        stream: &mut ElementStream<R>,
        output: &mut OutputDocument,
    ) -> Result<ExtractOutcome>;
}
