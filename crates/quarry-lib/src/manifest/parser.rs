use super::ManifestError;
use std::io::Read;
use xml::reader::{EventReader, XmlEvent};

/// A decoded element: namespace-qualified name, concatenated text content
/// and child elements in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlNode {
    pub namespace: Option<String>,
    pub name: String,
    pub text: String,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    /// First child with the given local name.
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Trimmed text of a child, `None` when the child is absent.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.trim())
    }
}

pub fn parse_document(source: &str) -> Result<XmlNode, ManifestError> {
    parse_reader(source.as_bytes())
}

pub fn parse_reader<R: Read>(reader: R) -> Result<XmlNode, ManifestError> {
    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root = None;

    for event in EventReader::new(reader) {
        match event? {
            XmlEvent::StartElement { name, .. } => {
                stack.push(XmlNode {
                    namespace: name.namespace,
                    name: name.local_name,
                    ..XmlNode::default()
                });
            }
            XmlEvent::EndElement { .. } => {
                let Some(node) = stack.pop() else {
                    return Err(ManifestError::Invalid("unbalanced element".into()));
                };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => root = Some(node),
                }
            }
            XmlEvent::Characters(text) | XmlEvent::CData(text) => {
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&text);
                }
            }
            _ => {}
        }
    }

    root.ok_or_else(|| ManifestError::Invalid("document has no root element".into()))
}
