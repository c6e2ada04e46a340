//! Owned XML element tree over `quick-xml`.
//!
//! Just enough DOM to read a classification document, edit its property
//! definitions and write it back with every unrelated element, attribute and
//! comment intact. Whitespace-only text is dropped on read (unless an
//! enclosing element sets `xml:space="preserve"`) and the output is
//! re-indented, so formatting is normalised but content is not.

use std::io::Write;

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::{Error, Result};

/// A child of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), attributes: Vec::new(), children: Vec::new() }
    }

    /// Element holding a single text node.
    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        let mut element = Self::new(name);
        element.set_text(text);
        element
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.push(child);
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// Child elements, skipping text and comments.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(|node| match node {
            XmlNode::Element(e) => Some(e),
            _ => None,
        })
    }

    /// First direct child with the given name.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut XmlElement> {
        self.elements_mut().find(|e| e.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.elements().filter(move |e| e.name == name)
    }

    /// Trimmed text of a direct child; `None` when missing or blank.
    pub fn child_text(&self, name: &str) -> Option<String> {
        self.child(name).map(XmlElement::text).filter(|t| !t.is_empty())
    }

    /// Concatenated direct text content, trimmed.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            match node {
                XmlNode::Text(t) | XmlNode::CData(t) => out.push_str(t),
                _ => {}
            }
        }
        out.trim().to_string()
    }

    /// Concatenated text of every descendant, in document order.
    pub fn deep_text(&self) -> String {
        fn collect(element: &XmlElement, out: &mut String) {
            for node in &element.children {
                match node {
                    XmlNode::Text(t) | XmlNode::CData(t) => out.push_str(t),
                    XmlNode::Element(e) => collect(e, out),
                    _ => {}
                }
            }
        }
        let mut out = String::new();
        collect(self, &mut out);
        out
    }

    /// Replace all content with a single text node.
    pub fn set_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.children.clear();
        if !text.is_empty() {
            self.children.push(XmlNode::Text(text));
        }
    }

    pub fn push(&mut self, child: XmlElement) {
        self.children.push(XmlNode::Element(child));
    }

    /// First descendant (depth-first, self excluded) with the given name.
    pub fn find(&self, name: &str) -> Option<&XmlElement> {
        for child in self.elements() {
            if child.name == name {
                return Some(child);
            }
            if let Some(found) = child.find(name) {
                return Some(found);
            }
        }
        None
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut XmlElement> {
        for child in self.elements_mut() {
            if child.name == name {
                return Some(child);
            }
            if let Some(found) = child.find_mut(name) {
                return Some(found);
            }
        }
        None
    }

    /// All descendants with the given name, document order. Matches are not
    /// searched further.
    pub fn descendants<'a>(&'a self, name: &str) -> Vec<&'a XmlElement> {
        fn collect<'a>(element: &'a XmlElement, name: &str, out: &mut Vec<&'a XmlElement>) {
            for child in element.elements() {
                if child.name == name {
                    out.push(child);
                } else {
                    collect(child, name, out);
                }
            }
        }
        let mut out = Vec::new();
        collect(self, name, &mut out);
        out
    }

    /// Call `f` on every descendant with the given name. Matches are not
    /// searched further.
    pub fn visit_mut(&mut self, name: &str, f: &mut dyn FnMut(&mut XmlElement)) {
        for child in self.elements_mut() {
            if child.name == name {
                f(child);
            } else {
                child.visit_mut(name, f);
            }
        }
    }

    /// Remove every descendant element matching the predicate; returns how
    /// many were removed.
    pub fn remove_where(&mut self, pred: &dyn Fn(&XmlElement) -> bool) -> usize {
        let before = self.children.len();
        self.children.retain(|node| !matches!(node, XmlNode::Element(e) if pred(e)));
        let mut removed = before - self.children.len();
        for child in self.elements_mut() {
            removed += child.remove_where(pred);
        }
        removed
    }
}

// ============================================================================
// Document
// ============================================================================

/// A parsed XML document: the root element plus any comments or processing
/// instructions around it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    pub prolog: Vec<XmlNode>,
    pub root: XmlElement,
}

impl XmlDocument {
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut prolog = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            let event = reader.read_event().map_err(|e| {
                Error::Xml(format!("at position {}: {e}", reader.buffer_position()))
            })?;
            match event {
                Event::Start(ref e) => stack.push(start_element(e)?),
                Event::Empty(ref e) => {
                    let element = start_element(e)?;
                    attach(&mut stack, &mut root, XmlNode::Element(element))?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| Error::Xml("unexpected closing tag".into()))?;
                    attach(&mut stack, &mut root, XmlNode::Element(element))?;
                }
                Event::Text(ref t) => {
                    let text = std::str::from_utf8(t)
                        .map_err(|_| Error::Xml("invalid UTF-8 in text content".into()))?;
                    push_text(&mut stack, text);
                }
                Event::GeneralRef(ref r) => {
                    let name: &[u8] = r;
                    let resolved = match r.resolve_char_ref() {
                        Ok(Some(ch)) => ch,
                        _ => resolve_entity(name).ok_or_else(|| {
                            Error::Xml(format!("unknown entity &{};", String::from_utf8_lossy(name)))
                        })?,
                    };
                    push_text(&mut stack, resolved.encode_utf8(&mut [0; 4]));
                }
                Event::CData(ref t) => {
                    let text = String::from_utf8_lossy(t).into_owned();
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(XmlNode::CData(text));
                    }
                }
                Event::Comment(ref t) => {
                    let node = XmlNode::Comment(String::from_utf8_lossy(t).into_owned());
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(node),
                        None => prolog.push(node),
                    }
                }
                Event::PI(ref p) => {
                    let node = XmlNode::ProcessingInstruction(String::from_utf8_lossy(p).into_owned());
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(node),
                        None => prolog.push(node),
                    }
                }
                Event::Eof => break,
                // Declaration and doctype are regenerated on write.
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(Error::Xml(format!("{} unclosed element(s)", stack.len())));
        }
        let mut root = root.ok_or_else(|| Error::Xml("document has no root element".into()))?;
        drop_blank_text(&mut root);
        Ok(Self { prolog, root })
    }

    /// Serialize with an XML declaration and two-space indentation.
    pub fn to_xml_string(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        String::from_utf8(buf).map_err(|_| Error::Xml("serialized document is not UTF-8".into()))
    }

    pub fn write_to<W: Write>(&self, out: W) -> Result<()> {
        let mut writer = Writer::new_with_indent(out, b' ', 2);
        emit(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        for node in &self.prolog {
            write_node(&mut writer, node)?;
        }
        write_element(&mut writer, &self.root)?;
        writer.get_mut().write_all(b"\n")?;
        Ok(())
    }
}

// ============================================================================
// Reading helpers
// ============================================================================

fn start_element(e: &BytesStart<'_>) -> Result<XmlElement> {
    let name = std::str::from_utf8(e.name().as_ref())
        .map_err(|_| Error::Xml("invalid UTF-8 in tag name".into()))?
        .to_string();
    let mut element = XmlElement::new(name);
    for attr in e.attributes() {
        let attr = attr.map_err(|e| Error::Xml(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(|e| Error::Xml(e.to_string()))?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, node: XmlNode) -> Result<()> {
    match (stack.last_mut(), node) {
        (Some(parent), node) => parent.children.push(node),
        (None, XmlNode::Element(element)) => {
            if root.is_some() {
                return Err(Error::Xml("multiple root elements".into()));
            }
            *root = Some(element);
        }
        (None, _) => {}
    }
    Ok(())
}

/// Append text to the open element, merging with a preceding text node so
/// entity references do not split it.
fn push_text(stack: &mut [XmlElement], text: &str) {
    let Some(parent) = stack.last_mut() else { return };
    match parent.children.last_mut() {
        Some(XmlNode::Text(existing)) => existing.push_str(text),
        _ => parent.children.push(XmlNode::Text(text.to_string())),
    }
}

fn resolve_entity(name: &[u8]) -> Option<char> {
    match name {
        b"amp" => Some('&'),
        b"lt" => Some('<'),
        b"gt" => Some('>'),
        b"quot" => Some('"'),
        b"apos" => Some('\''),
        _ => None,
    }
}

/// Whitespace-only text is dropped, except below an element declaring
/// `xml:space="preserve"`.
fn drop_blank_text(element: &mut XmlElement) {
    if element.attribute("xml:space") == Some("preserve") {
        return;
    }
    element
        .children
        .retain(|node| !matches!(node, XmlNode::Text(t) if t.trim().is_empty()));
    for child in element.elements_mut() {
        drop_blank_text(child);
    }
}

// ============================================================================
// Writing helpers
// ============================================================================

fn emit<W: Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<()> {
    writer.write_event(event).map_err(|e| Error::Xml(e.to_string()))
}

fn write_node<W: Write>(writer: &mut Writer<W>, node: &XmlNode) -> Result<()> {
    match node {
        XmlNode::Element(e) => write_element(writer, e),
        XmlNode::Text(t) => emit(writer, Event::Text(BytesText::new(t))),
        XmlNode::CData(t) => emit(writer, Event::CData(BytesCData::new(t.as_str()))),
        XmlNode::Comment(t) => emit(writer, Event::Comment(BytesText::from_escaped(t.as_str()))),
        XmlNode::ProcessingInstruction(t) => emit(writer, Event::PI(BytesPI::new(t.as_str()))),
    }
}

fn write_element<W: Write>(writer: &mut Writer<W>, element: &XmlElement) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() {
        return emit(writer, Event::Empty(start));
    }

    emit(writer, Event::Start(start))?;
    for child in &element.children {
        write_node(writer, child)?;
    }
    emit(writer, Event::End(BytesEnd::new(element.name.as_str())))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!-- exported -->
<Root version="2">
  <System>
    <Name>BIMids &amp; co</Name>
    <Note><![CDATA[raw <text>]]></Note>
  </System>
  <Items>
    <Item><ID>A</ID></Item>
    <Item><ID>B</ID><Children><Item><ID>C</ID></Item></Children></Item>
  </Items>
</Root>
"#;

    #[test]
    fn test_parse_resolves_entities_and_drops_blank_text() {
        let doc = XmlDocument::parse(SAMPLE).unwrap();
        assert_eq!(doc.root.attribute("version"), Some("2"));
        assert_eq!(doc.root.find("System").unwrap().child_text("Name").as_deref(), Some("BIMids & co"));
        assert_eq!(doc.root.find("Note").unwrap().text(), "raw <text>");
        assert_eq!(doc.prolog, vec![XmlNode::Comment(" exported ".into())]);
        assert!(doc.root.children.iter().all(|n| matches!(n, XmlNode::Element(_))));
    }

    #[test]
    fn test_preserved_whitespace_survives_parse() {
        let doc = XmlDocument::parse(
            r#"<Row>
  <Cell xml:space="preserve"> </Cell>
  <Cell> </Cell>
</Row>"#,
        ).unwrap();
        let cells: Vec<&XmlElement> = doc.root.children_named("Cell").collect();
        assert_eq!(cells[0].children, vec![XmlNode::Text(" ".into())]);
        assert!(cells[1].children.is_empty());
    }

    #[test]
    fn test_descendants_stop_at_match() {
        let doc = XmlDocument::parse(SAMPLE).unwrap();
        let items = doc.root.find("Items").unwrap();
        let top: Vec<String> = items.descendants("Item").iter().map(|i| i.child_text("ID").unwrap()).collect();
        assert_eq!(top, vec!["A", "B"]);
    }

    #[test]
    fn test_round_trip_is_stable() {
        let doc = XmlDocument::parse(SAMPLE).unwrap();
        let written = doc.to_xml_string().unwrap();
        assert!(written.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(written.contains("<Name>BIMids &amp; co</Name>"));
        let reparsed = XmlDocument::parse(&written).unwrap();
        assert_eq!(reparsed, doc);
    }

    #[test]
    fn test_remove_where_counts_nested_matches() {
        let mut doc = XmlDocument::parse(SAMPLE).unwrap();
        let removed = doc.root.remove_where(&|e| e.name == "Item" && e.child_text("ID").as_deref() == Some("C"));
        assert_eq!(removed, 1);
        assert!(doc.root.find("Children").unwrap().children.is_empty());
    }

    #[test]
    fn test_malformed_xml_is_rejected() {
        assert!(matches!(XmlDocument::parse("<Root><Items></Root>"), Err(Error::Xml(_))));
        assert!(matches!(XmlDocument::parse(""), Err(Error::Xml(_))));
    }
}
