//! Minimal attribute-only element tree for server XML.
//!
//! Media server responses carry everything interesting in attributes, so
//! text nodes are dropped while parsing.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use thiserror::Error;

/// XML could not be turned into a tree.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum XmlError {
    #[error("malformed XML: {0}")]
    Malformed(String),

    #[error("document has no root element")]
    Empty,
}

/// One element with its attributes and child elements.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
}

fn element_from(start: &BytesStart) -> XmlElement {
    let attributes = start
        .attributes()
        .flatten()
        .map(|a| {
            let key = String::from_utf8_lossy(a.key.as_ref()).to_string();
            let raw = String::from_utf8_lossy(&a.value);
            (key, html_escape::decode_html_entities(&raw).to_string())
        })
        .collect();

    XmlElement {
        name: String::from_utf8_lossy(start.name().as_ref()).to_string(),
        attributes,
        children: Vec::new(),
    }
}

impl XmlElement {
    /// Parses a document and returns its root element.
    pub fn parse(xml: &str) -> Result<Self, XmlError> {
        let mut reader = Reader::from_str(xml);
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => stack.push(element_from(e)),
                Ok(Event::Empty(ref e)) => {
                    let elem = element_from(e);
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(elem),
                        None if root.is_none() => root = Some(elem),
                        None => {}
                    }
                }
                Ok(Event::End(_)) => {
                    let Some(elem) = stack.pop() else {
                        return Err(XmlError::Malformed("unbalanced end tag".to_string()));
                    };
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(elem),
                        None if root.is_none() => root = Some(elem),
                        None => {}
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XmlError::Malformed(e.to_string())),
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(XmlError::Malformed("unclosed element".to_string()));
        }
        root.ok_or(XmlError::Empty)
    }

    /// Attribute value by exact name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Attribute value, or `default` when absent.
    pub fn attr_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.attr(name).unwrap_or(default)
    }

    /// Attribute parsed as an integer; None when absent or not numeric.
    pub fn attr_i64(&self, name: &str) -> Option<i64> {
        self.attr(name).and_then(|v| v.trim().parse().ok())
    }

    /// First direct child with `name`.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Direct children with `name`.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// All descendants with `name`, depth-first in document order.
    pub fn descendants<'a>(&'a self, name: &str) -> Vec<&'a XmlElement> {
        let mut found = Vec::new();
        self.collect_descendants(name, &mut found);
        found
    }

    fn collect_descendants<'a>(&'a self, name: &str, found: &mut Vec<&'a XmlElement>) {
        for child in &self.children {
            if child.name == name {
                found.push(child);
            }
            child.collect_descendants(name, found);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_elements_and_attributes() {
        let xml = r#"<?xml version="1.0"?>
<MediaContainer size="1" friendlyName="Den &amp; Attic">
  <Video key="/library/metadata/1" title="A">
    <Media id="5"><Part key="/p/1" file="/x.mkv"/></Media>
  </Video>
</MediaContainer>"#;
        let root = XmlElement::parse(xml).unwrap();
        assert_eq!(root.name, "MediaContainer");
        assert_eq!(root.attr("friendlyName"), Some("Den & Attic"));
        let video = root.child("Video").unwrap();
        assert_eq!(video.attr_or("missing", "dflt"), "dflt");
        let parts = root.descendants("Part");
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].attr("file"), Some("/x.mkv"));
    }

    #[test]
    fn empty_root_element() {
        let root = XmlElement::parse(r#"<message status="offline"></message>"#).unwrap();
        assert_eq!(root.attr("status"), Some("offline"));
        let root = XmlElement::parse(r#"<message status="offline"/>"#).unwrap();
        assert!(root.children.is_empty());
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(XmlElement::parse(""), Err(XmlError::Empty));
        assert!(XmlElement::parse("<a><b></a>").is_err());
    }

    #[test]
    fn numeric_attributes() {
        let root = XmlElement::parse(r#"<Video viewOffset="1500" duration="x"/>"#).unwrap();
        assert_eq!(root.attr_i64("viewOffset"), Some(1500));
        assert_eq!(root.attr_i64("duration"), None);
    }
}
