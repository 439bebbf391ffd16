use crate::errors::NodeError;
use std::fmt::{Debug, Formatter};
use xot::{Node, Xot};

/// The capabilities the client needs from an XML document model.
///
/// The client never walks or edits trees itself: it parses what the server returns, serializes what is written back
/// and leaves traversal and mutation to the caller through the implementing type's own API.
pub trait XmlNode: Sized + Debug {
    /// Parses a well-formed XML document or element.
    fn parse(source: &str) -> Result<Self, NodeError>;

    /// Serializes the node back into XML text.
    fn serialize(&self) -> Result<String, NodeError>;

    /// The concatenated text content of the node and all its descendants.
    fn full_text(&self) -> String;

    /// Records the URL the node was fetched from. Implementations without use for it may ignore it.
    fn set_source_url(&mut self, _url: &str) {}
}

/// [`XmlNode`] backed by a [`xot`] tree.
///
/// Each node owns its own [`Xot`] arena, so trees are never shared between resources. Use [`XotNode::xot_mut`] to
/// edit the tree with the full `xot` API.
///
/// # Examples
///
/// ```
/// # use existdb::{XmlNode, XotNode, NodeError};
/// # fn main() -> Result<(), NodeError> {
/// let mut node = XotNode::parse("<head>Hugo Ball</head>")?;
/// node.append_text(" & Emmy Hennings")?;
/// assert_eq!("Hugo Ball & Emmy Hennings", node.full_text());
/// assert_eq!("<head>Hugo Ball &amp; Emmy Hennings</head>", node.serialize()?);
/// # Ok(())
/// # }
/// ```
pub struct XotNode {
    xot: Xot,
    root: Node,
    source_url: Option<String>,
}

impl XotNode {
    /// The arena holding the tree.
    pub fn xot(&self) -> &Xot {
        &self.xot
    }

    /// Mutable access to the arena, for editing the tree.
    pub fn xot_mut(&mut self) -> &mut Xot {
        &mut self.xot
    }

    /// The document node of the tree.
    pub fn root(&self) -> Node {
        self.root
    }

    /// The outermost element of the tree.
    pub fn document_element(&self) -> Result<Node, NodeError> {
        self.xot.document_element(self.root).map_err(NodeError::new)
    }

    /// Appends a text node as the last child of the outermost element.
    pub fn append_text(&mut self, text: &str) -> Result<(), NodeError> {
        let element = self.document_element()?;
        let text = self.xot.new_text(text);
        self.xot.append(element, text).map_err(NodeError::new)
    }

    /// The URL the node was fetched from, when it was fetched by path.
    pub fn source_url(&self) -> Option<&str> {
        self.source_url.as_deref()
    }
}

impl XmlNode for XotNode {
    fn parse(source: &str) -> Result<Self, NodeError> {
        let mut xot = Xot::new();
        let root = xot.parse(source).map_err(NodeError::new)?;

        Ok(Self {
            xot,
            root,
            source_url: None,
        })
    }

    fn serialize(&self) -> Result<String, NodeError> {
        self.xot.to_string(self.root).map_err(NodeError::new)
    }

    fn full_text(&self) -> String {
        self.xot
            .descendants(self.root)
            .filter_map(|node| self.xot.text_str(node))
            .collect()
    }

    fn set_source_url(&mut self, url: &str) {
        self.source_url = Some(url.to_owned());
    }
}

impl Debug for XotNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XotNode")
            .field("xml", &self.serialize().unwrap_or_default())
            .field("source_url", &self.source_url)
            .finish()
    }
}
