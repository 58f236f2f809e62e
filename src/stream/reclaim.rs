use std::io::BufRead;

use tracing::trace;

use crate::stream::element::ElementId;
use crate::stream::emitter::ElementStream;

impl<R: BufRead> ElementStream<R> {
    /// Release a subtree the consumer has finished with.
    ///
    /// `id` must name the element of the last `Closed` event. Its content is
    /// dropped, and so is every child already materialized under each open
    /// ancestor: those are all preceding siblings of the ancestor chain and
    /// will never be reported again. Elements still to come are untouched.
    ///
    /// Returns false (and drops nothing) if `id` is not the pending closed
    /// element.
    pub fn release(&mut self, id: ElementId) -> bool {
        match self.closed.as_mut() {
            Some(element) if element.id() == id => element.clear(),
            _ => return false,
        }
        self.closed = None;

        for ancestor in &mut self.open {
            if !ancestor.children().is_empty() {
                trace!(
                    "releasing {} visited children of <{}>",
                    ancestor.children().len(),
                    ancestor.name()
                );
                ancestor.clear_children();
            }
        }
        true
    }

    /// Nodes currently held in memory by the stream
    pub fn resident_nodes(&self) -> usize {
        let open: usize = self
            .open
            .iter()
            .map(|el| el.node_count())
            .sum();
        open + self.closed.as_ref().map_or(0, |el| el.node_count())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crate::stream::{ElementStream, EventKind};

    fn stream(xml: &str) -> ElementStream<Cursor<Vec<u8>>> {
        ElementStream::from_reader(Cursor::new(xml.as_bytes().to_vec()), "test.xml")
    }

    fn many_hosts(count: usize) -> String {
        let mut xml = String::from("<root><Report>");
        for i in 0..count {
            xml.push_str(&format!(
                "<ReportHost name=\"h{i}\"><ReportItem port=\"{i}\"><out>x</out></ReportItem></ReportHost>"
            ));
        }
        xml.push_str("</Report></root>");
        xml
    }

    #[test]
    fn releasing_each_host_keeps_memory_flat() {
        let mut s = stream(&many_hosts(500));
        let mut peak = 0;
        while let Some(ev) = s.next_event().unwrap() {
            peak = peak.max(s.resident_nodes());
            if ev.kind == EventKind::Closed && s.element().unwrap().name() == "ReportHost" {
                assert!(s.release(ev.id));
            }
        }
        // root + Report + one host subtree (host, item, out, text)
        assert!(peak <= 6, "peak resident nodes {}", peak);
    }

    #[test]
    fn without_release_siblings_accumulate() {
        let mut s = stream(&many_hosts(50));
        let mut peak = 0;
        while s.next_event().unwrap().is_some() {
            peak = peak.max(s.resident_nodes());
        }
        assert!(peak > 50 * 4);
    }

    #[test]
    fn release_rejects_stale_id() {
        let mut s = stream("<root><a/><b/></root>");
        s.next_event().unwrap(); // root entered
        let a_in = s.next_event().unwrap().unwrap();
        let a_out = s.next_event().unwrap().unwrap();
        assert_eq!(a_out.kind, EventKind::Closed);
        assert_eq!(a_in.id, a_out.id);

        s.next_event().unwrap(); // b entered, a now attached to root
        assert!(!s.release(a_out.id));
        let b_out = s.next_event().unwrap().unwrap();
        assert!(s.release(b_out.id));
        // a was a preceding sibling of b and is gone too
        assert_eq!(s.resident_nodes(), 1);
    }

    #[test]
    fn release_leaves_following_content_untouched() {
        let mut s = stream("<root><x><a/></x><y><b/></y></root>");
        let mut released = None;
        let mut names_after = Vec::new();
        while let Some(ev) = s.next_event().unwrap() {
            let name = s.element().unwrap().name().to_string();
            if released.is_some() {
                names_after.push((ev.kind, name.clone()));
            }
            if ev.kind == EventKind::Closed && name == "a" {
                assert!(s.release(ev.id));
                released = Some(ev.id);
            }
        }
        assert_eq!(
            names_after,
            vec![
                (EventKind::Closed, "x".to_string()),
                (EventKind::Entered, "y".to_string()),
                (EventKind::Entered, "b".to_string()),
                (EventKind::Closed, "b".to_string()),
                (EventKind::Closed, "y".to_string()),
                (EventKind::Closed, "root".to_string()),
            ]
        );
    }
}
