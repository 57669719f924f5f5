//! Owned XML tree for Android resource documents (`res/values/values.xml`).
//!
//! Parsing goes through the `quick-xml` event reader and builds a plain tree of
//! elements, attributes, and ordered children. The tree is owned by whoever parsed
//! it; nothing is shared between documents.
//!
//! Serialization is pretty-printed with a four-space indent:
//! - elements that only contain other elements (and comments) are laid out one child per line
//! - elements holding text or CDATA, and every `<string>` / `<item>`, are written back
//!   verbatim together with their whole subtree, so styled values like
//!   `<string>Click <b>here</b></string>` never gain or lose whitespace
//! - the XML declaration is preserved as parsed

use quick_xml::events::{BytesDecl, BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

const INDENT: &str = "    ";

/// Resource elements whose content is a value, even when it starts with markup
const VALUE_ELEMENTS: &[&str] = &["string", "item"];

/// Errors produced while parsing a resource document
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XmlError {
    #[error("malformed XML at byte {position}: {message}")]
    Syntax { position: usize, message: String },
    #[error("element <{0}> is never closed")]
    Unclosed(String),
    #[error("closing tag </{0}> has no matching start tag")]
    UnexpectedEnd(String),
    #[error("document has no root element")]
    NoRoot,
    #[error("document has more than one root element (found <{0}> after the root)")]
    MultipleRoots(String),
    #[error("text content outside the root element")]
    TextOutsideRoot,
    #[error("document is not valid UTF-8")]
    Utf8,
}

/// The `<?xml ...?>` declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<String>,
}

impl Default for Declaration {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            encoding: Some("utf-8".to_string()),
            standalone: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    /// Unescaped value
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    /// Character data in its escaped source form
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
    DocType(String),
}

impl Node {
    fn is_blank_text(&self) -> bool {
        matches!(self, Node::Text(text) if text.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style helper that appends an attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Builder-style helper that appends a child element
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    /// Remove an attribute, returning its value if it was present.
    /// The order of the remaining attributes is kept.
    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let index = self.attributes.iter().position(|attr| attr.name == name)?;
        Some(self.attributes.remove(index).value)
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }

    pub fn child_elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }

    /// Whether the children must be written back exactly as parsed
    fn has_inline_content(&self) -> bool {
        if VALUE_ELEMENTS.contains(&self.name.as_str()) {
            return true;
        }

        let has_text = self.children.iter().any(|node| match node {
            Node::Text(text) => !text.trim().is_empty(),
            Node::CData(_) => true,
            _ => false,
        });
        let has_structure = self.children.iter().any(|node| !matches!(node, Node::Text(_)));

        has_text || !has_structure
    }
}

/// A parsed resource document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub declaration: Option<Declaration>,
    /// Comments, processing instructions and doctype before the root element
    pub prolog: Vec<Node>,
    pub root: Element,
    /// Comments and processing instructions after the root element
    pub epilog: Vec<Node>,
}

impl Document {
    pub fn new(root: Element) -> Self {
        Self {
            declaration: Some(Declaration::default()),
            prolog: Vec::new(),
            root,
            epilog: Vec::new(),
        }
    }

    /// Serialize with the stable pretty-printed layout, ending in a newline
    pub fn to_pretty_string(&self) -> String {
        let mut out = String::new();

        if let Some(declaration) = &self.declaration {
            write_declaration(&mut out, declaration);
            out.push('\n');
        }

        for node in self.prolog.iter().filter(|node| !node.is_blank_text()) {
            write_node(&mut out, node, 0, false);
            out.push('\n');
        }

        write_element(&mut out, &self.root, 0, false);
        out.push('\n');

        for node in self.epilog.iter().filter(|node| !node.is_blank_text()) {
            write_node(&mut out, node, 0, false);
            out.push('\n');
        }

        out
    }
}

/// Parse a resource document into an owned tree
pub fn parse(source: &str) -> Result<Document, XmlError> {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let mut reader = Reader::from_str(source);

    let mut declaration = None;
    let mut prolog = Vec::new();
    let mut epilog = Vec::new();
    let mut root: Option<Element> = None;
    let mut stack: Vec<Element> = Vec::new();

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(err) => {
                return Err(XmlError::Syntax {
                    position: reader.buffer_position(),
                    message: err.to_string(),
                })
            }
        };
        let position = reader.buffer_position();

        match event {
            Event::Decl(decl) => {
                declaration = Some(declaration_from(&decl, position)?);
            }
            Event::Start(start) => {
                if stack.is_empty() && root.is_some() {
                    return Err(XmlError::MultipleRoots(utf8(start.name().as_ref())?.to_string()));
                }
                stack.push(element_from(&start, position)?);
            }
            Event::Empty(start) => {
                let element = element_from(&start, position)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(end) => {
                let name = utf8(end.name().as_ref())?.to_string();
                let element = stack.pop().ok_or_else(|| XmlError::UnexpectedEnd(name.clone()))?;
                if element.name != name {
                    return Err(XmlError::Syntax {
                        position,
                        message: format!("expected </{}>, found </{}>", element.name, name),
                    });
                }
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                let raw = utf8(&text)?.to_string();
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(Node::Text(raw));
                } else if !raw.trim().is_empty() {
                    return Err(XmlError::TextOutsideRoot);
                }
            }
            Event::CData(cdata) => {
                let content = utf8(&cdata)?.to_string();
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::CData(content)),
                    None => return Err(XmlError::TextOutsideRoot),
                }
            }
            Event::Comment(comment) => {
                let node = Node::Comment(utf8(&comment)?.to_string());
                push_misc(&mut stack, &root, &mut prolog, &mut epilog, node);
            }
            Event::PI(pi) => {
                let node = Node::ProcessingInstruction(utf8(&pi)?.to_string());
                push_misc(&mut stack, &root, &mut prolog, &mut epilog, node);
            }
            Event::DocType(doctype) => {
                prolog.push(Node::DocType(utf8(&doctype)?.trim().to_string()));
            }
            Event::Eof => break,
        }
    }

    if let Some(open) = stack.pop() {
        return Err(XmlError::Unclosed(open.name));
    }

    let root = root.ok_or(XmlError::NoRoot)?;

    Ok(Document {
        declaration,
        prolog,
        root,
        epilog,
    })
}

fn utf8(bytes: &[u8]) -> Result<&str, XmlError> {
    std::str::from_utf8(bytes).map_err(|_| XmlError::Utf8)
}

fn syntax(position: usize, err: impl std::fmt::Display) -> XmlError {
    XmlError::Syntax {
        position,
        message: err.to_string(),
    }
}

fn declaration_from(decl: &BytesDecl, position: usize) -> Result<Declaration, XmlError> {
    let version = decl.version().map_err(|err| syntax(position, err))?;
    let encoding = decl
        .encoding()
        .transpose()
        .map_err(|err| syntax(position, err))?;
    let standalone = decl
        .standalone()
        .transpose()
        .map_err(|err| syntax(position, err))?;

    Ok(Declaration {
        version: utf8(&version)?.to_string(),
        encoding: encoding.map(|e| utf8(&e).map(str::to_string)).transpose()?,
        standalone: standalone.map(|s| utf8(&s).map(str::to_string)).transpose()?,
    })
}

fn element_from(start: &BytesStart, position: usize) -> Result<Element, XmlError> {
    let mut element = Element::new(utf8(start.name().as_ref())?);

    for attr in start.attributes() {
        let attr = attr.map_err(|err| syntax(position, err))?;
        let name = utf8(attr.key.as_ref())?.to_string();
        if element.attribute(&name).is_some() {
            return Err(syntax(position, format!("duplicate attribute '{}'", name)));
        }
        let value = attr
            .unescape_value()
            .map_err(|err| syntax(position, err))?
            .into_owned();
        element.attributes.push(Attribute { name, value });
    }

    Ok(element)
}

/// Attach a finished element to its parent, or make it the document root
fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), XmlError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Node::Element(element));
    } else if root.is_some() {
        return Err(XmlError::MultipleRoots(element.name));
    } else {
        *root = Some(element);
    }
    Ok(())
}

fn push_misc(
    stack: &mut [Element],
    root: &Option<Element>,
    prolog: &mut Vec<Node>,
    epilog: &mut Vec<Node>,
    node: Node,
) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    } else if root.is_some() {
        epilog.push(node);
    } else {
        prolog.push(node);
    }
}

fn write_declaration(out: &mut String, declaration: &Declaration) {
    out.push_str("<?xml version=\"");
    out.push_str(&declaration.version);
    out.push('"');
    if let Some(encoding) = &declaration.encoding {
        out.push_str(" encoding=\"");
        out.push_str(encoding);
        out.push('"');
    }
    if let Some(standalone) = &declaration.standalone {
        out.push_str(" standalone=\"");
        out.push_str(standalone);
        out.push('"');
    }
    out.push_str("?>");
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

/// `inline` marks nodes inside a text-bearing element; they are written without layout.
fn write_node(out: &mut String, node: &Node, depth: usize, inline: bool) {
    match node {
        Node::Element(element) => write_element(out, element, depth, inline),
        Node::Text(raw) => out.push_str(raw),
        Node::CData(content) => {
            out.push_str("<![CDATA[");
            out.push_str(content);
            out.push_str("]]>");
        }
        Node::Comment(content) => {
            out.push_str("<!--");
            out.push_str(content);
            out.push_str("-->");
        }
        Node::ProcessingInstruction(content) => {
            out.push_str("<?");
            out.push_str(content);
            out.push_str("?>");
        }
        Node::DocType(content) => {
            out.push_str("<!DOCTYPE ");
            out.push_str(content);
            out.push('>');
        }
    }
}

fn write_element(out: &mut String, element: &Element, depth: usize, inline: bool) {
    out.push('<');
    out.push_str(&element.name);
    for attr in &element.attributes {
        out.push(' ');
        out.push_str(&attr.name);
        out.push_str("=\"");
        out.push_str(&escape_attribute(&attr.value));
        out.push('"');
    }

    if element.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');

    if inline || element.has_inline_content() {
        // The whole subtree is part of a value, e.g. a styled <string>
        for child in &element.children {
            write_node(out, child, depth + 1, true);
        }
    } else {
        for child in element.children.iter().filter(|node| !node.is_blank_text()) {
            out.push('\n');
            push_indent(out, depth + 1);
            write_node(out, child, depth + 1, false);
        }
        out.push('\n');
        push_indent(out, depth);
    }

    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
}

fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\n' => escaped.push_str("&#10;"),
            '\r' => escaped.push_str("&#13;"),
            '\t' => escaped.push_str("&#9;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
