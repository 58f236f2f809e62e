use std::borrow::Cow;
use std::io::Write;

use quick_xml::escape::unescape;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesCData, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::name::QName;
use quick_xml::Writer;

use crate::error::Result;

/// Identity of an element within one stream, assigned in document order
/// when the element is entered. Two elements with the same tag never share
/// an id, so start/end pairing does not depend on tag names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId(pub(crate) u64);

/// A child of a materialized element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    /// Character data, still escaped exactly as it appeared in the input
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
}

/// An element and whatever part of its subtree has been materialized so far.
///
/// While an element is open only its already-closed children are present;
/// once its end tag is read the whole subtree is available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    id: ElementId,
    name: String,
    /// (qualified name, escaped value) in document order
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    pub(crate) fn new(id: ElementId, name: String, attributes: Vec<(String, String)>) -> Self {
        Element {
            id,
            name,
            attributes,
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    /// Qualified tag name, prefix included
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unescaped value of an attribute, if present.
    ///
    /// Values with broken entity references are returned as written.
    pub fn attribute(&self, key: &str) -> Option<Cow<'_, str>> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, raw)| unescape(raw).unwrap_or(Cow::Borrowed(raw.as_str())))
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            _ => None,
        })
    }

    pub(crate) fn push_child(&mut self, node: Node) {
        self.children.push(node);
    }

    /// Drop every materialized child
    pub(crate) fn clear_children(&mut self) {
        self.children = Vec::new();
    }

    /// Drop whitespace-only text between child elements. Elements without
    /// child elements keep their text as is, blank or not.
    pub(crate) fn drop_layout_whitespace(&mut self) {
        if self.children.iter().any(|node| matches!(node, Node::Element(_))) {
            self.children
                .retain(|node| !matches!(node, Node::Text(raw) if is_blank(raw)));
        }
    }

    /// Drop attributes and children, keeping only identity and tag
    pub(crate) fn clear(&mut self) {
        self.attributes = Vec::new();
        self.children = Vec::new();
    }

    /// Number of nodes held under this element, itself included
    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(|node| match node {
                Node::Element(el) => el.node_count(),
                _ => 1,
            })
            .sum::<usize>()
    }

    /// Serialize the subtree as indented XML without a declaration.
    ///
    /// `indent` is the number of spaces per level; 0 writes everything on one
    /// line. The result always ends with a newline.
    pub fn to_pretty_xml(&self, indent: usize) -> Result<Vec<u8>> {
        let mut writer = if indent == 0 {
            Writer::new(Vec::new())
        } else {
            Writer::new_with_indent(Vec::new(), b' ', indent)
        };
        self.write_into(&mut writer)?;
        let mut bytes = writer.into_inner();
        bytes.push(b'\n');
        Ok(bytes)
    }

    fn write_into<W: Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            // Values are already escaped; only quotes from single-quoted
            // input still need it.
            let value = if value.contains('"') {
                Cow::Owned(value.replace('"', "&quot;").into_bytes())
            } else {
                Cow::Borrowed(value.as_bytes())
            };
            start.push_attribute(Attribute {
                key: QName(key.as_bytes()),
                value,
            });
        }

        if self.children.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        for child in &self.children {
            match child {
                Node::Element(el) => el.write_into(writer)?,
                Node::Text(raw) => {
                    writer.write_event(Event::Text(BytesText::from_escaped(raw.as_str())))?
                }
                Node::CData(content) => {
                    writer.write_event(Event::CData(BytesCData::new(content.as_str())))?
                }
                Node::Comment(raw) => {
                    writer.write_event(Event::Comment(BytesText::from_escaped(raw.as_str())))?
                }
                Node::ProcessingInstruction(content) => {
                    writer.write_event(Event::PI(BytesPI::new(content.as_str())))?
                }
            }
        }
        writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
        Ok(())
    }
}

/// Whitespace only (a leading byte order mark counts as whitespace)
pub(crate) fn is_blank(raw: &str) -> bool {
    raw.trim_start_matches('\u{feff}').trim().is_empty()
}
