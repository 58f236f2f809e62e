use std::io::BufRead;

use tracing::debug;

use crate::error::Result;
use crate::extract::{ExtractOutcome, SubtreeExtractor};
use crate::report::output::OutputDocument;
use crate::stream::{ElementId, ElementStream, EventKind};

/// Copies the first policy block of a document into the output.
///
/// Stops as soon as that block is written; the rest of the stream is left
/// unread. A document without a policy block writes nothing.
pub struct PolicyExtractor {
    tag: String,
}

impl PolicyExtractor {
    pub fn new(tag: impl Into<String>) -> Self {
        PolicyExtractor { tag: tag.into() }
    }
}

impl SubtreeExtractor for PolicyExtractor {
    fn name(&self) -> &str {
        "policy"
    }

    fn tag(&self) -> &str {
        &self.tag
    }

    fn extract<R: BufRead>(
        &mut self,
        stream: &mut ElementStream<R>,
        output: &mut OutputDocument,
    ) -> Result<ExtractOutcome> {
        let mut target: Option<ElementId> = None;

        while let Some(event) = stream.next_event()? {
            match (event.kind, target) {
                (EventKind::Entered, None) => {
                    if stream.element().is_some_and(|el| el.name() == self.tag) {
                        target = Some(event.id);
                    }
                }
                (EventKind::Closed, Some(id)) if id == event.id => {
                    if let Some(element) = stream.element() {
                        output.append_subtree(element)?;
                    }
                    stream.release(event.id);
                    debug!("Policy copied from {}", stream.source().display());
                    return Ok(ExtractOutcome {
                        written: 1,
                        skipped: 0,
                    });
                }
                _ => {}
            }
        }

        debug!("No <{}> in {}", self.tag, stream.source().display());
        Ok(ExtractOutcome::default())
    }
}
