//! Owned XML element tree.
//!
//! quick-xml only streams events, while in-place rewriting needs a mutable
//! tree. Element names and namespace declarations are stored exactly as they
//! appear in the source, so an untouched subtree is written back unchanged.
//! Text and comments keep their raw (escaped) form; attribute values are
//! stored unescaped and escaped again on write.

use crate::error::{Error, Result};
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

/// Index path from the root element through `children` vectors
pub type NodePath = Vec<usize>;

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
    DocType(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    /// Qualified name as written in the source (`alto:String`, `String`)
    pub name: String,
    /// Namespace URI resolved at parse time
    pub namespace: Option<String>,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>, namespace: Option<String>) -> Self {
        Self {
            name: name.into(),
            namespace,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn local_name(&self) -> &str {
        match self.name.split_once(':') {
            Some((_, local)) => local,
            None => &self.name,
        }
    }

    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attribute(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key.to_string(), value)),
        }
    }

    pub fn child_elements(&self) -> impl Iterator<Item = (usize, &XmlElement)> {
        self.children.iter().enumerate().filter_map(|(i, node)| match node {
            XmlNode::Element(el) => Some((i, el)),
            _ => None,
        })
    }

    pub fn element_at(&self, path: &[usize]) -> Option<&XmlElement> {
        let mut current = self;
        for &index in path {
            current = match current.children.get(index)? {
                XmlNode::Element(el) => el,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn element_at_mut(&mut self, path: &[usize]) -> Option<&mut XmlElement> {
        let mut current = self;
        for &index in path {
            current = match current.children.get_mut(index)? {
                XmlNode::Element(el) => el,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Paths (relative to `self`) of every descendant accepted by `pred`, in document order
    pub fn find_descendants<F>(&self, pred: &F) -> Vec<NodePath>
    where
        F: Fn(&XmlElement) -> bool,
    {
        let mut found = Vec::new();
        let mut path = Vec::new();
        self.collect_descendants(pred, &mut path, &mut found);
        found
    }

    fn collect_descendants<F>(&self, pred: &F, path: &mut NodePath, found: &mut Vec<NodePath>)
    where
        F: Fn(&XmlElement) -> bool,
    {
        for (index, child) in self.child_elements() {
            path.push(index);
            if pred(child) {
                found.push(path.clone());
            }
            child.collect_descendants(pred, path, found);
            path.pop();
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct XmlDeclaration {
    pub version: String,
    pub standalone: Option<String>,
}

impl Default for XmlDeclaration {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            standalone: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct XmlTree {
    pub declaration: Option<XmlDeclaration>,
    /// Comments, PIs and doctype before the root element
    pub prolog: Vec<XmlNode>,
    pub root: XmlElement,
    /// Comments and PIs after the root element
    pub epilog: Vec<XmlNode>,
}

/// Prefix bindings introduced by one element (`""` is the default namespace)
type ScopeFrame = Vec<(String, String)>;

fn resolve_namespace(name: &str, scopes: &[ScopeFrame]) -> Option<String> {
    let prefix = name.split_once(':').map(|(p, _)| p).unwrap_or("");
    scopes
        .iter()
        .rev()
        .flat_map(|frame| frame.iter())
        .find(|(p, _)| p == prefix)
        .map(|(_, uri)| uri.clone())
        .filter(|uri| !uri.is_empty())
}

fn element_from_start(e: &BytesStart<'_>, scopes: &mut Vec<ScopeFrame>) -> Result<XmlElement> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    let mut frame = ScopeFrame::new();

    for attr in e.attributes() {
        let attr = attr.map_err(|err| Error::XmlReconstruction(err.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        if key == "xmlns" {
            frame.push((String::new(), value.clone()));
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            frame.push((prefix.to_string(), value.clone()));
        }
        attributes.push((key, value));
    }

    scopes.push(frame);
    let namespace = resolve_namespace(&name, scopes);

    Ok(XmlElement {
        name,
        namespace,
        attributes,
        children: Vec::new(),
    })
}

fn raw_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

impl XmlTree {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(bytes);
        reader.trim_text(false);

        let mut buf = Vec::new();
        let mut declaration = None;
        let mut prolog = Vec::new();
        let mut epilog = Vec::new();
        let mut root: Option<XmlElement> = None;
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut scopes: Vec<ScopeFrame> = Vec::new();

        loop {
            let event = reader.read_event_into(&mut buf)?;
            let node = match event {
                Event::Start(e) => {
                    if root.is_some() && stack.is_empty() {
                        return Err(Error::XmlReconstruction(
                            "multiple root elements".to_string(),
                        ));
                    }
                    stack.push(element_from_start(&e, &mut scopes)?);
                    None
                }
                Event::End(_) => {
                    scopes.pop();
                    let element = stack.pop().ok_or_else(|| {
                        Error::XmlReconstruction("unexpected closing tag".to_string())
                    })?;
                    Some(XmlNode::Element(element))
                }
                Event::Empty(e) => {
                    if root.is_some() && stack.is_empty() {
                        return Err(Error::XmlReconstruction(
                            "multiple root elements".to_string(),
                        ));
                    }
                    let element = element_from_start(&e, &mut scopes)?;
                    scopes.pop();
                    Some(XmlNode::Element(element))
                }
                Event::Text(e) => Some(XmlNode::Text(raw_text(&e))),
                Event::CData(e) => Some(XmlNode::CData(raw_text(&e))),
                Event::Comment(e) => Some(XmlNode::Comment(raw_text(&e))),
                Event::PI(e) => Some(XmlNode::ProcessingInstruction(raw_text(&e))),
                Event::DocType(e) => Some(XmlNode::DocType(raw_text(&e))),
                Event::Decl(d) => {
                    let version = d
                        .version()
                        .map(|v| raw_text(&v))
                        .unwrap_or_else(|_| "1.0".to_string());
                    let standalone = d.standalone().and_then(|s| s.ok()).map(|s| raw_text(&s));
                    declaration = Some(XmlDeclaration {
                        version,
                        standalone,
                    });
                    None
                }
                Event::Eof => break,
            };

            if let Some(node) = node {
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => match node {
                        XmlNode::Element(element) => root = Some(element),
                        // whitespace between prolog, root and epilog is regenerated on write
                        XmlNode::Text(text) if text.trim().is_empty() => {}
                        XmlNode::Text(_) | XmlNode::CData(_) => {
                            return Err(Error::XmlReconstruction(
                                "text outside the root element".to_string(),
                            ))
                        }
                        other if root.is_none() => prolog.push(other),
                        other => epilog.push(other),
                    },
                }
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(Error::XmlReconstruction(format!(
                "unclosed element <{}>",
                stack.last().map(|e| e.name.as_str()).unwrap_or_default()
            )));
        }

        let root = root.ok_or_else(|| Error::XmlReconstruction("no root element".to_string()))?;

        Ok(Self {
            declaration,
            prolog,
            root,
            epilog,
        })
    }

    /// Serialize the tree. The declaration is always written, as UTF-8.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());
        let declaration = self.declaration.clone().unwrap_or_default();

        write(
            &mut writer,
            Event::Decl(BytesDecl::new(
                &declaration.version,
                Some("UTF-8"),
                declaration.standalone.as_deref(),
            )),
        )?;
        write(&mut writer, Event::Text(BytesText::from_escaped("\n")))?;

        for node in &self.prolog {
            write_node(&mut writer, node)?;
            write(&mut writer, Event::Text(BytesText::from_escaped("\n")))?;
        }
        write_element(&mut writer, &self.root)?;
        for node in &self.epilog {
            write(&mut writer, Event::Text(BytesText::from_escaped("\n")))?;
            write_node(&mut writer, node)?;
        }
        write(&mut writer, Event::Text(BytesText::from_escaped("\n")))?;

        Ok(writer.into_inner())
    }
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::XmlReconstruction(e.to_string()))
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &XmlNode) -> Result<()> {
    match node {
        XmlNode::Element(element) => write_element(writer, element),
        XmlNode::Text(raw) => write(writer, Event::Text(BytesText::from_escaped(raw.as_str()))),
        XmlNode::CData(raw) => write(writer, Event::CData(BytesCData::new(raw.as_str()))),
        XmlNode::Comment(raw) => {
            write(writer, Event::Comment(BytesText::from_escaped(raw.as_str())))
        }
        XmlNode::ProcessingInstruction(raw) => {
            write(writer, Event::PI(BytesText::from_escaped(raw.as_str())))
        }
        XmlNode::DocType(raw) => write(writer, Event::DocType(BytesText::from_escaped(raw.as_str()))),
    }
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &XmlElement) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() {
        return write(writer, Event::Empty(start));
    }

    write(writer, Event::Start(start))?;
    for child in &element.children {
        write_node(writer, child)?;
    }
    write(writer, Event::End(BytesEnd::new(element.name.as_str())))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!-- scanned by hand -->
<root xmlns="urn:example" xmlns:x="urn:other">
  <a id="1">t &amp; u</a>
  <x:b note="&lt;q&gt;"/>
  <![CDATA[raw <stuff>]]>
</root>
"#;

    #[test]
    fn test_parse_resolves_namespaces() {
        let tree = XmlTree::parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(tree.root.namespace.as_deref(), Some("urn:example"));
        let (_, a) = tree.root.child_elements().next().unwrap();
        assert_eq!(a.namespace.as_deref(), Some("urn:example"));
        let (_, b) = tree.root.child_elements().nth(1).unwrap();
        assert_eq!(b.local_name(), "b");
        assert_eq!(b.prefix(), Some("x"));
        assert_eq!(b.namespace.as_deref(), Some("urn:other"));
        assert_eq!(b.attribute("note"), Some("<q>"));
        assert_eq!(tree.prolog, vec![XmlNode::Comment(" scanned by hand ".to_string())]);
    }

    #[test]
    fn test_round_trip_preserves_content() {
        let tree = XmlTree::parse(SAMPLE.as_bytes()).unwrap();
        let bytes = tree.to_bytes().unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(text.contains("<root xmlns=\"urn:example\" xmlns:x=\"urn:other\">"));
        assert!(text.contains("t &amp; u"));
        assert!(text.contains("<![CDATA[raw <stuff>]]>"));
        assert_eq!(XmlTree::parse(&bytes).unwrap(), tree);
    }

    #[test]
    fn test_paths_address_elements() {
        let tree = XmlTree::parse(SAMPLE.as_bytes()).unwrap();
        let paths = tree.root.find_descendants(&|e: &XmlElement| e.local_name() == "b");
        assert_eq!(paths.len(), 1);
        let b = tree.root.element_at(&paths[0]).unwrap();
        assert_eq!(b.name, "x:b");
    }

    #[test]
    fn test_rejects_malformed_documents() {
        assert!(XmlTree::parse(b"<a><b></a>").is_err());
        assert!(XmlTree::parse(b"<a>").is_err());
        assert!(XmlTree::parse(b"").is_err());
        assert!(XmlTree::parse(b"<a/><b/>").is_err());
    }
}
