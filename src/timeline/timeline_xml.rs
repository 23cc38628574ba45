use quick_xml::{events::BytesStart, events::Event, Reader};

use crate::error::{Error, Result};

/// Element node of a parsed XML document. Text and comments are dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlNode {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }
}

fn element_node(e: &BytesStart) -> Result<XmlNode> {
    let mut node = XmlNode {
        name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
        ..Default::default()
    };
    for attr in e.attributes() {
        let attr = attr.map_err(|e| Error::Xml(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| Error::Xml(e.to_string()))?
            .into_owned();
        node.attributes.push((key, value));
    }
    Ok(node)
}

/// Parses `xml` and returns its document element.
pub fn parse_xml(xml: &str) -> Result<XmlNode> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlNode> = Vec::new();
    let mut document: Option<XmlNode> = None;

    loop {
        let finished = match reader.read_event()? {
            Event::Start(ref e) => {
                stack.push(element_node(e)?);
                None
            }
            Event::Empty(ref e) => Some(element_node(e)?),
            Event::End(_) => stack.pop(),
            Event::Eof => break,
            _ => None,
        };

        if let Some(node) = finished {
            match stack.last_mut() {
                Some(parent) => parent.children.push(node),
                None if document.is_none() => document = Some(node),
                None => return Err(Error::Xml("more than one document element".into())),
            }
        }
    }

    if let Some(open) = stack.last() {
        return Err(Error::Xml(format!("element <{}> is never closed", open.name)));
    }
    document.ok_or_else(|| Error::Xml("no document element".into()))
}
