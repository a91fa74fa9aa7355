//! ALTO layout documents.
//!
//! `Page` > `TextBlock` > `TextLine` > `String` with HPOS/VPOS/WIDTH/HEIGHT
//! geometry and the word in CONTENT. The document owns its element tree;
//! blocks and lines are handed out as [`NodePath`]s so extraction results can
//! be kept around while the tree is rewritten.

pub mod redistribute;
pub mod tree;

pub use redistribute::{batch_sizes, distribute_words};
pub use tree::{NodePath, XmlElement, XmlNode, XmlTree};

use crate::error::{Error, Result};
use crate::types::{BoundingBox, PageSize, PageWords, WordToken};
use std::path::Path;
use tracing::{debug, warn};

const GEOMETRY_ATTRIBUTES: [&str; 4] = ["HPOS", "VPOS", "WIDTH", "HEIGHT"];

/// Root namespace of a document, resolved once at parse time
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Namespace {
    pub uri: Option<String>,
    /// Prefix the root element is written with; `None` for a default namespace
    pub prefix: Option<String>,
}

impl Namespace {
    pub fn of(root: &XmlElement) -> Self {
        Self {
            uri: root.namespace.clone(),
            prefix: root.prefix().map(str::to_string),
        }
    }

    /// Tag name for a generated element
    pub fn qualify(&self, local: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{local}"),
            None => local.to_string(),
        }
    }

    pub fn matches(&self, element: &XmlElement, local: &str) -> bool {
        element.local_name() == local && element.namespace == self.uri
    }

    fn declaration_attribute(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("xmlns:{prefix}"),
            None => "xmlns".to_string(),
        }
    }
}

/// Serializer configuration, passed explicitly to every write
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlWriteOptions {
    pub namespace: Namespace,
}

impl XmlWriteOptions {
    pub fn new(namespace: Namespace) -> Self {
        Self { namespace }
    }
}

/// Flattened words and raw boxes for the reading-order engine
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderingInputs {
    pub words: Vec<String>,
    pub boxes: Vec<BoundingBox>,
    pub page_size: PageSize,
}

impl From<OrderingInputs> for PageWords {
    fn from(inputs: OrderingInputs) -> Self {
        PageWords {
            size: inputs.page_size,
            words: inputs
                .words
                .into_iter()
                .zip(inputs.boxes)
                .map(|(text, bbox)| WordToken::new(text, bbox))
                .collect(),
        }
    }
}

/// A text block with non-empty content, and the lines that contributed to it
#[derive(Debug, Clone, PartialEq)]
pub struct BlockText {
    pub block: NodePath,
    pub text: String,
    /// Absolute paths of the lines with non-empty text, in document order
    pub lines: Vec<NodePath>,
}

#[derive(Debug, Clone)]
pub struct AltoDocument {
    tree: XmlTree,
    namespace: Namespace,
}

impl AltoDocument {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let tree = XmlTree::parse(bytes)?;
        let namespace = Namespace::of(&tree.root);
        debug!(
            "Parsed ALTO document <{}> (namespace: {})",
            tree.root.name,
            namespace.uri.as_deref().unwrap_or("none")
        );
        Ok(Self { tree, namespace })
    }

    pub fn open(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::parse(&bytes)
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn root(&self) -> &XmlElement {
        &self.tree.root
    }

    /// Write options matching this document's root namespace
    pub fn write_options(&self) -> XmlWriteOptions {
        XmlWriteOptions::new(self.namespace.clone())
    }

    fn find(&self, scope: &XmlElement, local: &str) -> Vec<NodePath> {
        scope.find_descendants(&|e: &XmlElement| self.namespace.matches(e, local))
    }

    /// Every qualifying `String` run directly under a `TextLine`, across the whole document
    pub fn extract_ordering_inputs(&self) -> OrderingInputs {
        let root = &self.tree.root;
        let Some(page) = self
            .find(root, "Page")
            .first()
            .and_then(|path| root.element_at(path))
        else {
            return OrderingInputs::default();
        };

        let page_size = PageSize::new(
            page.attribute("WIDTH").and_then(parse_truncated).unwrap_or(0.0),
            page.attribute("HEIGHT").and_then(parse_truncated).unwrap_or(0.0),
        );

        let mut inputs = OrderingInputs {
            page_size,
            ..Default::default()
        };

        for line_path in self.find(root, "TextLine") {
            let Some(line) = root.element_at(&line_path) else {
                continue;
            };
            for (_, run) in line.child_elements() {
                if run.local_name() != "String" {
                    continue;
                }
                let Some(content) = run.attribute("CONTENT").filter(|c| !c.trim().is_empty())
                else {
                    continue;
                };
                let Some([x, y, w, h]) = geometry_of(run) else {
                    continue;
                };
                inputs.words.push(content.to_string());
                inputs.boxes.push(BoundingBox::from_origin_size(x, y, w, h));
            }
        }

        inputs
    }

    /// Blocks with their aggregate text and contributing lines, in document order
    pub fn extract_blocks(&self) -> Vec<BlockText> {
        let root = &self.tree.root;
        let mut blocks = Vec::new();

        for block_path in self.find(root, "TextBlock") {
            let Some(block) = root.element_at(&block_path) else {
                continue;
            };

            let mut lines = Vec::new();
            let mut parts = Vec::new();
            for line_rel in self.find(block, "TextLine") {
                let Some(line) = block.element_at(&line_rel) else {
                    continue;
                };
                let words: Vec<&str> = self
                    .find(line, "String")
                    .iter()
                    .filter_map(|p| line.element_at(p))
                    .filter_map(|run| run.attribute("CONTENT"))
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .collect();
                if words.is_empty() {
                    continue;
                }
                parts.push(words.join(" "));
                lines.push(block_path.iter().chain(&line_rel).copied().collect());
            }

            let text = parts.join(" ");
            if !text.trim().is_empty() && !lines.is_empty() {
                blocks.push(BlockText {
                    block: block_path,
                    text,
                    lines,
                });
            }
        }

        blocks
    }

    /// Replace the runs of `lines` with `translated`, dealt out line by line.
    ///
    /// Every child node of each line is removed first, and a line that
    /// receives no words is left empty. Returns the number of runs created.
    pub fn rewrite_lines(
        &mut self,
        lines: &[NodePath],
        translated: &str,
        options: &XmlWriteOptions,
    ) -> usize {
        if lines.is_empty() {
            return 0;
        }

        let run_name = options.namespace.qualify("String");
        let mut created = 0;

        for (path, batch) in lines.iter().zip(distribute_words(translated, lines.len())) {
            let Some(line) = self.tree.root.element_at_mut(path) else {
                warn!("Line path {:?} no longer addresses an element, skipping", path);
                continue;
            };
            line.children.clear();
            if batch.is_empty() {
                continue;
            }

            let mut run = XmlElement::new(run_name.clone(), options.namespace.uri.clone());
            run.set_attribute("CONTENT", batch.join(" "));
            for key in GEOMETRY_ATTRIBUTES {
                run.set_attribute(key, line.attribute(key).unwrap_or("0"));
            }
            line.children.push(XmlNode::Element(run));
            created += 1;
        }

        created
    }

    /// Serialize with the XML declaration and the original namespace declarations
    pub fn serialize(&self, options: &XmlWriteOptions) -> Result<Vec<u8>> {
        let Some(uri) = &options.namespace.uri else {
            return self.tree.to_bytes();
        };

        let declaration = options.namespace.declaration_attribute();
        if self.tree.root.attribute(&declaration).is_some() {
            return self.tree.to_bytes();
        }

        let mut tree = self.tree.clone();
        tree.root.set_attribute(&declaration, uri.as_str());
        tree.to_bytes()
    }

    pub fn write_to(&self, path: &Path, options: &XmlWriteOptions) -> Result<()> {
        let bytes = self.serialize(options)?;
        std::fs::write(path, bytes).map_err(Error::from)
    }
}

/// Numeric attribute value, truncated toward zero
fn parse_truncated(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(f64::trunc)
}

fn geometry_of(run: &XmlElement) -> Option<[f64; 4]> {
    let mut out = [0.0; 4];
    for (slot, key) in out.iter_mut().zip(GEOMETRY_ATTRIBUTES) {
        *slot = parse_truncated(run.attribute(key)?)?;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALTO: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<alto xmlns="http://www.loc.gov/standards/alto/ns-v3#">
  <Layout>
    <Page ID="p1" WIDTH="2000.7" HEIGHT="3000">
      <PrintSpace>
        <TextBlock ID="b1">
          <TextLine ID="l1" HPOS="10" VPOS="20" WIDTH="300" HEIGHT="40">
            <String CONTENT="Dobrý" HPOS="10.9" VPOS="20" WIDTH="100" HEIGHT="40"/>
            <SP/>
            <String CONTENT="den" HPOS="120" VPOS="20" WIDTH="80" HEIGHT="40"/>
          </TextLine>
          <TextLine ID="l2" HPOS="10" VPOS="70" WIDTH="200" HEIGHT="40">
            <String CONTENT="světe" HPOS="10" VPOS="70" WIDTH="x" HEIGHT="40"/>
          </TextLine>
          <TextLine ID="l3">
            <String CONTENT="   " HPOS="1" VPOS="1" WIDTH="1" HEIGHT="1"/>
          </TextLine>
        </TextBlock>
        <TextBlock ID="b2">
          <TextLine ID="l4"><String CONTENT=""/></TextLine>
        </TextBlock>
      </PrintSpace>
    </Page>
  </Layout>
</alto>
"#;

    fn doc() -> AltoDocument {
        AltoDocument::parse(ALTO.as_bytes()).unwrap()
    }

    #[test]
    fn test_detects_default_namespace() {
        let doc = doc();
        assert_eq!(
            doc.namespace().uri.as_deref(),
            Some("http://www.loc.gov/standards/alto/ns-v3#")
        );
        assert_eq!(doc.namespace().prefix, None);
        assert_eq!(doc.namespace().qualify("String"), "String");
    }

    #[test]
    fn test_ordering_inputs_skip_unusable_runs() {
        let inputs = doc().extract_ordering_inputs();
        assert_eq!(inputs.words, vec!["Dobrý", "den"]);
        assert_eq!(
            inputs.boxes,
            vec![
                BoundingBox::new(10.0, 20.0, 110.0, 60.0),
                BoundingBox::new(120.0, 20.0, 200.0, 60.0),
            ]
        );
        assert_eq!(inputs.page_size, PageSize::new(2000.0, 3000.0));
    }

    #[test]
    fn test_no_page_gives_empty_inputs() {
        let doc = AltoDocument::parse(b"<alto><TextLine><String CONTENT=\"a\" HPOS=\"1\" VPOS=\"1\" WIDTH=\"1\" HEIGHT=\"1\"/></TextLine></alto>").unwrap();
        assert_eq!(doc.extract_ordering_inputs(), OrderingInputs::default());
    }

    #[test]
    fn test_blocks_keep_only_lines_with_text() {
        let doc = doc();
        let blocks = doc.extract_blocks();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "Dobrý den světe");
        assert_eq!(blocks[0].lines.len(), 2);
        let first = doc.root().element_at(&blocks[0].lines[0]).unwrap();
        assert_eq!(first.attribute("ID"), Some("l1"));
    }

    #[test]
    fn test_rewrite_distributes_over_lines() {
        let mut doc = doc();
        let options = doc.write_options();
        let block = doc.extract_blocks().remove(0);
        let created = doc.rewrite_lines(&block.lines, "w1 w2 w3", &options);
        assert_eq!(created, 2);

        let l1 = doc.root().element_at(&block.lines[0]).unwrap();
        assert_eq!(l1.children.len(), 1);
        let (_, run) = l1.child_elements().next().unwrap();
        assert_eq!(run.name, "String");
        assert_eq!(run.attribute("CONTENT"), Some("w1 w2"));
        assert_eq!(run.attribute("HPOS"), Some("10"));
        assert_eq!(run.attribute("WIDTH"), Some("300"));

        let l2 = doc.root().element_at(&block.lines[1]).unwrap();
        let (_, run) = l2.child_elements().next().unwrap();
        assert_eq!(run.attribute("CONTENT"), Some("w3"));
    }

    #[test]
    fn test_rewrite_clears_lines_without_words() {
        let mut doc = doc();
        let options = doc.write_options();
        let block = doc.extract_blocks().remove(0);
        assert_eq!(doc.rewrite_lines(&block.lines, "jen", &options), 1);
        let l2 = doc.root().element_at(&block.lines[1]).unwrap();
        assert!(l2.children.is_empty());
    }

    #[test]
    fn test_missing_line_geometry_defaults_to_zero() {
        let xml = r#"<alto><Layout><Page WIDTH="10" HEIGHT="10"><TextBlock><TextLine><String CONTENT="a"/></TextLine></TextBlock></Page></Layout></alto>"#;
        let mut doc = AltoDocument::parse(xml.as_bytes()).unwrap();
        let options = doc.write_options();
        let block = doc.extract_blocks().remove(0);
        doc.rewrite_lines(&block.lines, "b", &options);
        let line = doc.root().element_at(&block.lines[0]).unwrap();
        let (_, run) = line.child_elements().next().unwrap();
        for key in GEOMETRY_ATTRIBUTES {
            assert_eq!(run.attribute(key), Some("0"));
        }
    }

    #[test]
    fn test_prefixed_namespace_survives_rewrite() {
        let xml = r#"<a:alto xmlns:a="urn:alto"><a:Page WIDTH="1" HEIGHT="1"><a:TextBlock><a:TextLine HPOS="1" VPOS="2" WIDTH="3" HEIGHT="4"><a:String CONTENT="x"/></a:TextLine></a:TextBlock></a:Page></a:alto>"#;
        let mut doc = AltoDocument::parse(xml.as_bytes()).unwrap();
        let options = doc.write_options();
        let block = doc.extract_blocks().remove(0);
        doc.rewrite_lines(&block.lines, "y", &options);

        let out = String::from_utf8(doc.serialize(&options).unwrap()).unwrap();
        assert!(out.starts_with("<?xml"));
        assert!(out.contains(r#"<a:alto xmlns:a="urn:alto">"#));
        assert!(out.contains(r#"<a:String CONTENT="y" HPOS="1" VPOS="2" WIDTH="3" HEIGHT="4"/>"#));
    }

    #[test]
    fn test_serialize_round_trips_untouched_document() {
        let doc = doc();
        let bytes = doc.serialize(&doc.write_options()).unwrap();
        let again = AltoDocument::parse(&bytes).unwrap();
        assert_eq!(again.extract_blocks(), doc.extract_blocks());
        assert_eq!(again.extract_ordering_inputs(), doc.extract_ordering_inputs());
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains(r#"<alto xmlns="http://www.loc.gov/standards/alto/ns-v3#">"#));
    }

    #[test]
    fn test_serialize_adds_missing_namespace_declaration() {
        let mut root = XmlElement::new("alto", Some("urn:alto".to_string()));
        root.children.push(XmlNode::Element(XmlElement::new("Layout", Some("urn:alto".to_string()))));
        let doc = AltoDocument {
            namespace: Namespace::of(&root),
            tree: XmlTree {
                declaration: None,
                prolog: Vec::new(),
                root,
                epilog: Vec::new(),
            },
        };
        let out = String::from_utf8(doc.serialize(&doc.write_options()).unwrap()).unwrap();
        assert!(out.contains(r#"<alto xmlns="urn:alto"><Layout/></alto>"#));
    }
}
