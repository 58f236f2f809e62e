use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::trace;

use crate::error::{MergeError, Result};
use crate::stream::element::{is_blank, Element, ElementId, Node};

/// Whether an event opens or closes its element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Entered,
    Closed,
}

/// One step of the element stream. The element itself is borrowed from the
/// stream with [`ElementStream::element`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamEvent {
    pub kind: EventKind,
    pub id: ElementId,
}

/// Owned copy of one parser event, so the read buffer can be reused
/// before the stream state is touched.
enum Parsed {
    Start(String, Attributes),
    Empty(String, Attributes),
    End,
    Child(Node),
    Skip,
    Eof,
}

/// Pull-based stream of element enter/close events over one XML document.
///
/// Only the chain of currently open elements is held, each with the children
/// that have closed under it so far. Consumers call [`ElementStream::release`]
/// after handling a closed subtree to drop what has already been visited.
/// The stream is finite and cannot be restarted; open a new one to re-read
/// the same file.
pub struct ElementStream<R> {
    reader: Reader<R>,
    source: PathBuf,
    buf: Vec<u8>,
    /// Document root first, innermost open element last
    pub(crate) open: Vec<Element>,
    /// Most recently closed element, attached to its parent on the next pull
    pub(crate) closed: Option<Element>,
    /// Set after a self-closing tag: its close event is due next
    pending_close: bool,
    next_id: u64,
    root_tag: Option<String>,
    finished: bool,
}

impl ElementStream<BufReader<File>> {
    /// Open a fresh stream over a file on disk
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| MergeError::io(path, e))?;
        Ok(Self::from_reader(BufReader::new(file), path))
    }
}

impl<R: BufRead> ElementStream<R> {
    /// Stream over any buffered reader. `source` only labels errors.
    pub fn from_reader(reader: R, source: impl Into<PathBuf>) -> Self {
        let mut reader = Reader::from_reader(reader);
        reader.config_mut().check_end_names = true;
        ElementStream {
            reader,
            source: source.into(),
            buf: Vec::new(),
            open: Vec::new(),
            closed: None,
            pending_close: false,
            next_id: 0,
            root_tag: None,
            finished: false,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Tag of the document root, pulling the first event if it has not been
    /// read yet. Errors if the document has no root element.
    pub fn document_root(&mut self) -> Result<&str> {
        if self.root_tag.is_none() {
            self.next_event()?;
        }
        match self.root_tag {
            Some(ref tag) => Ok(tag.as_str()),
            None => Err(MergeError::malformed(&self.source, "no root element")),
        }
    }

    /// The element the last event refers to: the innermost open element
    /// after `Entered`, the just-closed subtree after `Closed`.
    pub fn element(&self) -> Option<&Element> {
        self.closed.as_ref().or_else(|| self.open.last())
    }

    /// Current nesting depth (open elements)
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Pull the next enter/close event, or `None` once the document is done.
    pub fn next_event(&mut self) -> Result<Option<StreamEvent>> {
        self.attach_closed();

        if self.pending_close {
            self.pending_close = false;
            return self.close_innermost().map(Some);
        }

        if self.finished {
            return Ok(None);
        }

        loop {
            match self.read_parsed()? {
                Parsed::Start(name, attributes) => {
                    return self.enter(name, attributes).map(Some);
                }
                Parsed::Empty(name, attributes) => {
                    self.pending_close = true;
                    return self.enter(name, attributes).map(Some);
                }
                Parsed::End => {
                    return self.close_innermost().map(Some);
                }
                Parsed::Child(node) => match self.open.last_mut() {
                    Some(parent) => parent.push_child(node),
                    // Outside the root only whitespace, comments and PIs are allowed
                    None => match node {
                        Node::Text(ref raw) if is_blank(raw) => {}
                        Node::Text(_) | Node::CData(_) => {
                            return Err(MergeError::malformed(
                                &self.source,
                                "character data outside the root element",
                            ));
                        }
                        _ => {}
                    },
                },
                Parsed::Skip => {}
                Parsed::Eof => {
                    if let Some(unclosed) = self.open.last() {
                        return Err(MergeError::malformed(
                            &self.source,
                            format!("unexpected end of document, <{}> is not closed", unclosed.name()),
                        ));
                    }
                    if self.root_tag.is_none() {
                        return Err(MergeError::malformed(&self.source, "no root element"));
                    }
                    self.finished = true;
                    return Ok(None);
                }
            }
        }
    }

    fn enter(&mut self, name: String, attributes: Attributes) -> Result<StreamEvent> {
        if self.open.is_empty() {
            if self.root_tag.is_some() {
                return Err(MergeError::malformed(
                    &self.source,
                    format!("second root element <{}>", name),
                ));
            }
            self.root_tag = Some(name.clone());
        }

        let id = ElementId(self.next_id);
        self.next_id += 1;
        trace!("enter <{}> at depth {}", name, self.open.len());
        self.open.push(Element::new(id, name, attributes));
        Ok(StreamEvent {
            kind: EventKind::Entered,
            id,
        })
    }

    fn close_innermost(&mut self) -> Result<StreamEvent> {
        let mut element = self
            .open
            .pop()
            .ok_or_else(|| MergeError::malformed(&self.source, "closing tag without an open element"))?;
        element.drop_layout_whitespace();
        let id = element.id();
        self.closed = Some(element);
        Ok(StreamEvent {
            kind: EventKind::Closed,
            id,
        })
    }

    /// Hand the last closed subtree over to its parent. A closed root is
    /// simply dropped.
    fn attach_closed(&mut self) {
        if let Some(element) = self.closed.take() {
            if let Some(parent) = self.open.last_mut() {
                parent.push_child(Node::Element(element));
            }
        }
    }

    fn read_parsed(&mut self) -> Result<Parsed> {
        self.buf.clear();
        let path = &self.source;
        let event = self
            .reader
            .read_event_into(&mut self.buf)
            .map_err(|source| MergeError::Parse {
                path: path.clone(),
                source,
            })?;
        let bad = |message: String| MergeError::malformed(path, message);

        let parsed = match event {
            Event::Start(start) => {
                let (name, attributes) = owned_start(&start).map_err(bad)?;
                Parsed::Start(name, attributes)
            }
            Event::Empty(start) => {
                let (name, attributes) = owned_start(&start).map_err(bad)?;
                Parsed::Empty(name, attributes)
            }
            Event::End(_) => Parsed::End,
            Event::Text(text) => Parsed::Child(Node::Text(utf8(&text).map_err(bad)?)),
            Event::CData(data) => Parsed::Child(Node::CData(utf8(&data).map_err(bad)?)),
            Event::Comment(comment) => Parsed::Child(Node::Comment(utf8(&comment).map_err(bad)?)),
            Event::PI(pi) => Parsed::Child(Node::ProcessingInstruction(utf8(&pi).map_err(bad)?)),
            Event::Decl(_) | Event::DocType(_) => Parsed::Skip,
            Event::Eof => Parsed::Eof,
        };

        Ok(parsed)
    }
}

type Attributes = Vec<(String, String)>;

/// Copy a start tag into an owned name and escaped attribute pairs
fn owned_start(start: &BytesStart<'_>) -> std::result::Result<(String, Attributes), String> {
    let name = utf8(start.name().as_ref())?;
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        attributes.push((utf8(attr.key.as_ref())?, utf8(&attr.value)?));
    }
    Ok((name, attributes))
}

fn utf8(bytes: &[u8]) -> std::result::Result<String, String> {
    String::from_utf8(bytes.to_vec()).map_err(|e| format!("invalid UTF-8: {}", e))
}
