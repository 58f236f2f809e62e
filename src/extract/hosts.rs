use std::collections::HashSet;
use std::io::BufRead;

use tracing::debug;

use crate::error::Result;
use crate::extract::{ExtractOutcome, SubtreeExtractor};
use crate::report::output::OutputDocument;
use crate::stream::{ElementStream, EventKind};

/// Host names already written during one merge run, in first-seen order.
///
/// Only grows. A missing `name` attribute counts as the empty name.
#[derive(Debug, Default)]
pub struct SeenHosts {
    order: Vec<String>,
    index: HashSet<String>,
}

impl SeenHosts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains(name)
    }

    /// Record a name; false if it was already present
    pub fn insert(&mut self, name: &str) -> bool {
        if self.index.contains(name) {
            return false;
        }
        self.index.insert(name.to_string());
        self.order.push(name.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

/// Copies every host record whose name has not been seen yet in this run.
///
/// Borrows the run's [`SeenHosts`] for one file; the assembler creates a
/// new deduplicator per input and passes the same set each time.
pub struct HostDeduplicator<'a> {
    tag: String,
    seen: &'a mut SeenHosts,
}

impl<'a> HostDeduplicator<'a> {
    pub fn new(tag: impl Into<String>, seen: &'a mut SeenHosts) -> Self {
        HostDeduplicator {
            tag: tag.into(),
            seen,
        }
    }
}

impl SubtreeExtractor for HostDeduplicator<'_> {
    fn name(&self) -> &str {
        "hosts"
    }

    fn tag(&self) -> &str {
        &self.tag
    }

    fn extract<R: BufRead>(
        &mut self,
        stream: &mut ElementStream<R>,
        output: &mut OutputDocument,
    ) -> Result<ExtractOutcome> {
        let mut outcome = ExtractOutcome::default();

        while let Some(event) = stream.next_event()? {
            if event.kind != EventKind::Closed {
                continue;
            }
            let Some(host) = stream.element() else {
                continue;
            };
            if host.name() != self.tag {
                continue;
            }

            let name = host
                .attribute("name")
                .map(|n| n.into_owned())
                .unwrap_or_default();

            if !self.seen.insert(&name) {
                // Left in place; the next release clears it with its siblings
                debug!("Duplicate host {:?} in {}", name, stream.source().display());
                outcome.skipped += 1;
                continue;
            }

            output.append_subtree(host)?;
            stream.release(event.id);
            outcome.written += 1;
            debug!("Host {:?} copied from {}", name, stream.source().display());
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::report::output::{HOST_TAG, ROOT_TAG};

    fn hosts_doc(hosts: &[(&str, &str)]) -> String {
        let mut xml = String::from("<NessusClientData_v2><Report name=\"r\">");
        for (name, body) in hosts {
            xml.push_str(&format!("<ReportHost name=\"{name}\"><note>{body}</note></ReportHost>"));
        }
        xml.push_str("</Report></NessusClientData_v2>");
        xml
    }

    fn extract_all(docs: &[String], seen: &mut SeenHosts) -> (Vec<ExtractOutcome>, String) {
        let dir = tempfile::tempdir().unwrap();
        let mut output =
            OutputDocument::create(&dir.path().join("out.nessus"), ROOT_TAG, 2, false).unwrap();
        output.write_prologue().unwrap();
        output.open_report("r").unwrap();

        let mut outcomes = Vec::new();
        for (i, doc) in docs.iter().enumerate() {
            let mut stream =
                ElementStream::from_reader(Cursor::new(doc.as_bytes().to_vec()), format!("{i}.nessus"));
            let outcome = HostDeduplicator::new(HOST_TAG, seen)
                .extract(&mut stream, &mut output)
                .unwrap();
            outcomes.push(outcome);
        }
        (outcomes, std::fs::read_to_string(output.path()).unwrap())
    }

    #[test]
    fn seen_hosts_keeps_first_seen_order() {
        let mut seen = SeenHosts::new();
        assert!(seen.insert("b"));
        assert!(seen.insert("a"));
        assert!(!seen.insert("b"));
        assert_eq!(seen.iter().collect::<Vec<_>>(), vec!["b", "a"]);
        assert!(seen.contains("a"));
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn first_occurrence_wins_across_files() {
        let mut seen = SeenHosts::new();
        let a = hosts_doc(&[("10.0.0.1", "from-a"), ("10.0.0.2", "a2")]);
        let b = hosts_doc(&[("10.0.0.1", "from-b"), ("10.0.0.3", "b3")]);
        let (outcomes, written) = extract_all(&[a, b], &mut seen);

        assert_eq!(outcomes[0], ExtractOutcome { written: 2, skipped: 0 });
        assert_eq!(outcomes[1], ExtractOutcome { written: 1, skipped: 1 });
        assert!(written.contains("from-a"));
        assert!(!written.contains("from-b"));

        let one = written.find("10.0.0.1").unwrap();
        let two = written.find("10.0.0.2").unwrap();
        let three = written.find("10.0.0.3").unwrap();
        assert!(one < two && two < three);
        assert_eq!(seen.iter().collect::<Vec<_>>(), vec!["10.0.0.1", "10.0.0.2", "10.0.0.3"]);
    }

    #[test]
    fn duplicates_within_one_file_are_dropped() {
        let mut seen = SeenHosts::new();
        let doc = hosts_doc(&[("x", "1"), ("x", "2"), ("y", "3")]);
        let (outcomes, written) = extract_all(&[doc], &mut seen);
        assert_eq!(outcomes[0], ExtractOutcome { written: 2, skipped: 1 });
        assert_eq!(written.matches("<ReportHost").count(), 2);
    }

    #[test]
    fn unnamed_hosts_share_the_empty_name() {
        let mut seen = SeenHosts::new();
        let doc = "<NessusClientData_v2><Report><ReportHost><a/></ReportHost>\
                   <ReportHost name=\"\"><b/></ReportHost></Report></NessusClientData_v2>"
            .to_string();
        let (outcomes, _) = extract_all(&[doc], &mut seen);
        assert_eq!(outcomes[0], ExtractOutcome { written: 1, skipped: 1 });
        assert!(seen.contains(""));
    }

    #[test]
    fn nested_host_tags_anywhere_are_matched() {
        let mut seen = SeenHosts::new();
        let doc = "<NessusClientData_v2><Other><ReportHost name=\"deep\"/></Other></NessusClientData_v2>"
            .to_string();
        let (outcomes, written) = extract_all(&[doc], &mut seen);
        assert_eq!(outcomes[0].written, 1);
        assert!(written.contains("<ReportHost name=\"deep\"/>"));
    }
}
