//! Arena-backed syntax tree.
//!
//! Nodes live in a single vector and refer to each other by index. A tree is
//! produced once per parse and never mutated afterwards; `NodeRef` is the
//! borrowed view used for traversal.

use serde::Serialize;
use serde::ser::{SerializeStruct, Serializer};

use crate::Span;
use crate::lexer::{StringStyle, TokenKind};

/// Index of a node in its tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeKind {
    Runbook,
    AddonBlock,
    SignerBlock,
    ActionBlock,
    OutputBlock,
    VariableDecl,
    InputDecl,
    ImportStmt,
    Block,
    Attribute,
    String,
    Number,
    Boolean,
    Null,
    Array,
    Object,
    ObjectField,
    Reference,
    IndexAccess,
    FunctionCall,
    BinaryExpr,
    Identifier,
    Comment,
    Error,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Runbook => "runbook",
            NodeKind::AddonBlock => "addon_block",
            NodeKind::SignerBlock => "signer_block",
            NodeKind::ActionBlock => "action_block",
            NodeKind::OutputBlock => "output_block",
            NodeKind::VariableDecl => "variable_declaration",
            NodeKind::InputDecl => "input_declaration",
            NodeKind::ImportStmt => "import_statement",
            NodeKind::Block => "block",
            NodeKind::Attribute => "attribute",
            NodeKind::String => "string",
            NodeKind::Number => "number",
            NodeKind::Boolean => "boolean",
            NodeKind::Null => "null",
            NodeKind::Array => "array",
            NodeKind::Object => "object",
            NodeKind::ObjectField => "object_field",
            NodeKind::Reference => "reference",
            NodeKind::IndexAccess => "index_access",
            NodeKind::FunctionCall => "function_call",
            NodeKind::BinaryExpr => "binary_expression",
            NodeKind::Identifier => "identifier",
            NodeKind::Comment => "comment",
            NodeKind::Error => "ERROR",
        }
    }

    /// Comments are kept for round-trip fidelity but carry no meaning
    pub fn is_trivia(self) -> bool {
        self == NodeKind::Comment
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named child slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Name,
    Type,
    Network,
    Path,
    Key,
    Value,
    Arguments,
    Config,
    Left,
    Right,
    Target,
    Index,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Type => "type",
            Field::Network => "network",
            Field::Path => "path",
            Field::Key => "key",
            Field::Value => "value",
            Field::Arguments => "arguments",
            Field::Config => "config",
            Field::Left => "left",
            Field::Right => "right",
            Field::Target => "target",
            Field::Index => "index",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    pub fn from_token(kind: TokenKind) -> Option<BinaryOp> {
        match kind {
            TokenKind::Plus => Some(BinaryOp::Add),
            TokenKind::Minus => Some(BinaryOp::Sub),
            TokenKind::Star => Some(BinaryOp::Mul),
            TokenKind::Slash => Some(BinaryOp::Div),
            _ => None,
        }
    }

    /// Multiplicative operators bind tighter than additive ones
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Add | BinaryOp::Sub => 1,
            BinaryOp::Mul | BinaryOp::Div => 2,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberForm {
    Hex,
    Integer,
    Float,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentStyle {
    /// `# ...`
    Hash,
    /// `// ...`
    DoubleSlash,
    /// `/* ... */`
    Block,
}

/// Kind-specific data that doesn't fit in children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Detail {
    #[default]
    None,
    String {
        style: StringStyle,
        /// Content between the delimiters
        content: Span,
        /// Whether the closing delimiter was found
        terminated: bool,
    },
    Number(NumberForm),
    Operator(BinaryOp),
    Comment(CommentStyle),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    pub children: Vec<NodeId>,
    pub fields: Vec<(Field, NodeId)>,
    pub parent: Option<NodeId>,
    pub detail: Detail,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    source: String,
    nodes: Vec<Node>,
    root: NodeId,
}

impl Tree {
    pub fn root(&self) -> NodeRef<'_> {
        self.get(self.root)
    }

    pub fn get(&self, id: NodeId) -> NodeRef<'_> {
        NodeRef { tree: self, id }
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in creation order (children before parents)
    pub fn nodes(&self) -> impl Iterator<Item = NodeRef<'_>> {
        (0..self.nodes.len()).map(|i| self.get(NodeId(i as u32)))
    }

    pub fn has_error_nodes(&self) -> bool {
        self.nodes.iter().any(|n| n.kind == NodeKind::Error)
    }

    /// Smallest node whose span contains `offset`
    pub fn covering_node(&self, offset: u32) -> Option<NodeRef<'_>> {
        let mut current = self.root();
        if !current.span().contains(offset) {
            return None;
        }
        'descend: loop {
            for child in current.children() {
                if child.span().contains(offset) {
                    current = child;
                    continue 'descend;
                }
            }
            return Some(current);
        }
    }

    /// S-expression of the semantic structure, with field labels.
    ///
    /// Comments are left out; leaves print their source text.
    pub fn to_sexp(&self) -> String {
        let mut out = String::new();
        write_sexp(self.root(), &mut out);
        out
    }
}

fn write_sexp(node: NodeRef<'_>, out: &mut String) {
    out.push('(');
    out.push_str(node.kind().as_str());
    match node.kind() {
        NodeKind::Identifier | NodeKind::Number | NodeKind::Boolean => {
            out.push(' ');
            out.push_str(node.text());
        }
        NodeKind::String => {
            out.push(' ');
            out.push_str(&format!("{:?}", node.string_value().unwrap_or_default()));
        }
        NodeKind::BinaryExpr => {
            if let Some(op) = node.operator() {
                out.push(' ');
                out.push_str(op.symbol());
            }
        }
        _ => {}
    }
    for child in node.semantic_children() {
        out.push(' ');
        if let Some(field) = node.field_of(child.id()) {
            out.push_str(field.as_str());
            out.push_str(": ");
        }
        write_sexp(child, out);
    }
    out.push(')');
}

/// Borrowed view of one node
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a Tree,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tree(&self) -> &'a Tree {
        self.tree
    }

    fn raw(&self) -> &'a Node {
        &self.tree.nodes[self.id.index()]
    }

    pub fn kind(&self) -> NodeKind {
        self.raw().kind
    }

    pub fn span(&self) -> Span {
        self.raw().span
    }

    pub fn detail(&self) -> Detail {
        self.raw().detail
    }

    pub fn text(&self) -> &'a str {
        self.span().text(&self.tree.source)
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.raw().parent.map(|id| self.tree.get(id))
    }

    /// All children in source order, trivia included
    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let tree = self.tree;
        self.raw().children.iter().map(move |&id| tree.get(id))
    }

    /// Children without comment trivia
    pub fn semantic_children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        self.children().filter(|c| !c.kind().is_trivia())
    }

    pub fn child_count(&self) -> usize {
        self.raw().children.len()
    }

    /// First child stored under `field`
    pub fn field(&self, field: Field) -> Option<NodeRef<'a>> {
        self.raw()
            .fields
            .iter()
            .find(|(f, _)| *f == field)
            .map(|&(_, id)| self.tree.get(id))
    }

    /// Every child stored under `field`, in source order
    pub fn fields(&self, field: Field) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let tree = self.tree;
        self.raw()
            .fields
            .iter()
            .filter(move |(f, _)| *f == field)
            .map(move |&(_, id)| tree.get(id))
    }

    /// Which field of this node, if any, holds `child`
    pub fn field_of(&self, child: NodeId) -> Option<Field> {
        self.raw()
            .fields
            .iter()
            .find(|(_, id)| *id == child)
            .map(|&(f, _)| f)
    }

    /// Content of a String node, without delimiters
    pub fn string_value(&self) -> Option<&'a str> {
        match self.detail() {
            Detail::String { content, .. } => Some(content.text(&self.tree.source)),
            _ => None,
        }
    }

    pub fn operator(&self) -> Option<BinaryOp> {
        match self.detail() {
            Detail::Operator(op) => Some(op),
            _ => None,
        }
    }

    /// Pre-order walk of this node and all its descendants
    pub fn descendants(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let tree = self.tree;
        let mut stack = vec![self.id];
        std::iter::from_fn(move || {
            let id = stack.pop()?;
            stack.extend(tree.nodes[id.index()].children.iter().rev());
            Some(tree.get(id))
        })
    }
}

impl std::fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}@{}..{}",
            self.kind(),
            self.span().start,
            self.span().end
        )
    }
}

impl Serialize for NodeRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let leaf = self.child_count() == 0;
        let mut state = serializer.serialize_struct("Node", 5)?;
        state.serialize_field("kind", self.kind().as_str())?;
        state.serialize_field("span", &self.span())?;
        let field = self
            .parent()
            .and_then(|parent| parent.field_of(self.id))
            .map(Field::as_str);
        state.serialize_field("field", &field)?;
        state.serialize_field("text", &leaf.then(|| self.text()))?;
        let children: Vec<NodeRef<'_>> = self.children().collect();
        state.serialize_field("children", &children)?;
        state.end()
    }
}

impl Serialize for Tree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.root().serialize(serializer)
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Position in the open node's child list, used to wrap already finished
/// children into a new parent (left operands of binary expressions,
/// references that turn out to be indexed)
#[derive(Debug, Clone, Copy)]
pub(crate) struct Checkpoint(usize);

struct Frame {
    kind: NodeKind,
    span: Option<Span>,
    children: Vec<NodeId>,
    fields: Vec<(Field, NodeId)>,
    detail: Detail,
}

impl Frame {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            span: None,
            children: Vec::new(),
            fields: Vec::new(),
            detail: Detail::None,
        }
    }

    fn extend(&mut self, span: Span) {
        self.span = Some(match self.span {
            Some(current) => current.merge(span),
            None => span,
        });
    }
}

pub(crate) struct TreeBuilder {
    nodes: Vec<Node>,
    frames: Vec<Frame>,
    last_end: u32,
}

impl TreeBuilder {
    pub(crate) fn new() -> Self {
        Self {
            nodes: Vec::new(),
            frames: Vec::new(),
            last_end: 0,
        }
    }

    fn frame(&mut self) -> &mut Frame {
        self.frames
            .last_mut()
            .expect("tree builder has no open node")
    }

    pub(crate) fn start_node(&mut self, kind: NodeKind) {
        self.frames.push(Frame::new(kind));
    }

    pub(crate) fn checkpoint(&mut self) -> Checkpoint {
        Checkpoint(self.frame().children.len())
    }

    /// Open a node that adopts every child added since `checkpoint`
    pub(crate) fn start_node_at(&mut self, checkpoint: Checkpoint, kind: NodeKind) {
        let parent = self.frame();
        let adopted: Vec<NodeId> = parent.children.drain(checkpoint.0..).collect();
        let mut moved_fields = Vec::new();
        parent.fields.retain(|&(field, id)| {
            if adopted.contains(&id) {
                moved_fields.push((field, id));
                false
            } else {
                true
            }
        });

        let mut frame = Frame::new(kind);
        for &id in &adopted {
            frame.extend(self.nodes[id.index()].span);
        }
        frame.children = adopted;
        frame.fields = moved_fields;
        self.frames.push(frame);
    }

    /// Record a consumed token in the open node's span
    pub(crate) fn token(&mut self, span: Span) {
        self.last_end = span.end;
        self.frame().extend(span);
    }

    /// Add a childless node to the open node
    pub(crate) fn leaf(&mut self, kind: NodeKind, span: Span, detail: Detail) -> NodeId {
        self.start_node(kind);
        self.token(span);
        self.set_detail(detail);
        self.finish_node()
    }

    /// Span of a finished node
    pub(crate) fn span(&self, id: NodeId) -> Span {
        self.nodes[id.index()].span
    }

    pub(crate) fn set_detail(&mut self, detail: Detail) {
        self.frame().detail = detail;
    }

    /// Label a child of the open node
    pub(crate) fn mark_field(&mut self, field: Field, child: NodeId) {
        let frame = self.frame();
        debug_assert!(frame.children.contains(&child));
        frame.fields.push((field, child));
    }

    pub(crate) fn finish_node(&mut self) -> NodeId {
        let frame = self.frames.pop().expect("finish_node without start_node");
        let id = NodeId(self.nodes.len() as u32);
        for &child in &frame.children {
            self.nodes[child.index()].parent = Some(id);
        }
        let span = frame.span.unwrap_or(Span::empty(self.last_end));
        self.nodes.push(Node {
            kind: frame.kind,
            span,
            children: frame.children,
            fields: frame.fields,
            parent: None,
            detail: frame.detail,
        });
        if let Some(parent) = self.frames.last_mut() {
            parent.children.push(id);
            parent.extend(span);
        }
        id
    }

    /// Close the root node, forcing its span over the whole source
    pub(crate) fn finish(mut self, source: String) -> Tree {
        let full = Span::new(0, source.len() as u32);
        self.frame().span = Some(full);
        let root = self.finish_node();
        debug_assert!(self.frames.is_empty());
        Tree {
            source,
            nodes: self.nodes,
            root,
        }
    }
}
