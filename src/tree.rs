//! Target tree data structures
//!
//! A target tree holds the propositions and mentions of one sentence. Nodes
//! live in an arena addressed by `NodeId`; a node may fill roles under more
//! than one proposition, so the structure is a DAG rather than a strict tree.
//! Children are always added by id, which keeps every reference inside the
//! arena and lets `TargetBuilder::build` reject cycles up front.

use crate::coverage::Coverage;
use crate::parser::is_plain_label;
use crate::symbols::{Sym, SymbolTable};
use std::collections::VecDeque;
use std::fmt;
use thiserror::Error;

/// Unique identifier for a node
pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A predicate with arguments (verb, noun predicate, modifier)
    Proposition,
    /// An entity or noun phrase filling an argument role
    Mention,
}

/// Inclusive token range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenSpan {
    pub start: usize,
    pub end: usize,
}

impl TokenSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
        }
    }

    pub fn union(self, other: TokenSpan) -> TokenSpan {
        TokenSpan {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetEdge {
    pub role: Sym,
    pub child: NodeId,
}

/// A node in a target tree
#[derive(Debug, Clone)]
pub struct TargetNode {
    pub id: NodeId,
    pub predicate: Sym,
    pub kind: NodeKind,
    /// Tokens of the node's own head
    pub head_span: Option<TokenSpan>,
    /// Head span widened over all descendants
    pub span: Option<TokenSpan>,
    pub children: Vec<TargetEdge>,
    pub parents: Vec<NodeId>,
}

impl TargetNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Error raised while building a target tree
#[derive(Debug, Error, PartialEq)]
pub enum TreeError {
    #[error("Tree error: edge refers to node {index} but the tree has {len} nodes")]
    DanglingIndex { index: NodeId, len: usize },

    #[error("Tree error: node {0} is its own child")]
    SelfLoop(NodeId),

    #[error("Tree error: edges form a cycle through {0} nodes")]
    Cycle(usize),
}

/// A validated target tree (one sentence)
#[derive(Debug, Clone, Default)]
pub struct TargetTree {
    nodes: Vec<TargetNode>,
    roots: Vec<NodeId>,
    depth: usize,
    sizes: Vec<usize>,
}

impl TargetTree {
    /// Create a new empty tree
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in id order
    pub fn nodes(&self) -> &[TargetNode] {
        &self.nodes
    }

    /// Get a node by ID
    pub fn get_node(&self, id: NodeId) -> Option<&TargetNode> {
        self.nodes.get(id)
    }

    /// Get a node by ID
    ///
    /// Panics if `id` is out of range; ids come from this tree.
    #[inline]
    pub fn node(&self, id: NodeId) -> &TargetNode {
        &self.nodes[id]
    }

    /// Get the role-labeled children of a node
    #[inline]
    pub fn children(&self, id: NodeId) -> &[TargetEdge] {
        &self.nodes[id].children
    }

    pub fn parents(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].parents
    }

    /// Nodes that fill no role under another node, in id order
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Every node id in enumeration order
    pub fn node_ids(&self) -> std::ops::Range<NodeId> {
        0..self.nodes.len()
    }

    /// Number of nodes on the longest root-to-leaf path
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Size of the tree below `id`, counting shared nodes once per path
    ///
    /// Saturates at `usize::MAX` on DAGs with many shared levels.
    pub fn subtree_size(&self, id: NodeId) -> usize {
        self.sizes[id]
    }

    /// Token extent of a node and everything below it
    pub fn span(&self, id: NodeId) -> Option<TokenSpan> {
        self.nodes[id].span
    }

    /// Token extent of all target nodes referenced by a coverage
    pub fn covering_span(&self, coverage: &Coverage) -> Option<TokenSpan> {
        coverage
            .matched_nodes()
            .filter_map(|id| self.get_node(id).and_then(|n| n.span))
            .reduce(TokenSpan::union)
    }

    /// Render in the bracketed notation accepted by `parse_target`
    pub fn display<'a>(&'a self, symbols: &'a SymbolTable) -> impl fmt::Display + 'a {
        TargetDisplay {
            tree: self,
            symbols,
        }
    }
}

struct TargetDisplay<'a> {
    tree: &'a TargetTree,
    symbols: &'a SymbolTable,
}

impl TargetDisplay<'_> {
    fn write_node(&self, f: &mut fmt::Formatter<'_>, id: NodeId) -> fmt::Result {
        let node = self.tree.node(id);
        let label = self.symbols.resolve(node.predicate);
        // Lowercase leaves read back as propositions, so quote them
        let quote = !is_plain_label(label)
            || (node.kind == NodeKind::Mention && !label.starts_with(|c: char| c.is_uppercase()));
        if quote {
            write!(f, "\"{}\"", label)?;
        } else {
            write!(f, "{}", label)?;
        }
        if !node.children.is_empty() {
            write!(f, "(")?;
            for (i, edge) in node.children.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}: ", self.symbols.resolve(edge.role))?;
                self.write_node(f, edge.child)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

impl fmt::Display for TargetDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, &root) in self.tree.roots().iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            self.write_node(f, root)?;
        }
        Ok(())
    }
}

/// Incremental construction of a `TargetTree`
#[derive(Debug, Clone, Default)]
pub struct TargetBuilder {
    nodes: Vec<TargetNode>,
    edges: Vec<(NodeId, TargetEdge)>,
}

impl TargetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node to the tree
    pub fn add_node(&mut self, predicate: Sym, kind: NodeKind) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(TargetNode {
            id,
            predicate,
            kind,
            head_span: None,
            span: None,
            children: Vec::new(),
            parents: Vec::new(),
        });
        id
    }

    pub fn add_proposition(&mut self, predicate: Sym) -> NodeId {
        self.add_node(predicate, NodeKind::Proposition)
    }

    pub fn add_mention(&mut self, predicate: Sym) -> NodeId {
        self.add_node(predicate, NodeKind::Mention)
    }

    /// Attach `child` under `parent` in the given role
    pub fn add_edge(&mut self, parent: NodeId, role: Sym, child: NodeId) {
        self.edges.push((parent, TargetEdge { role, child }));
    }

    /// Set the head token span of a node
    pub fn set_span(&mut self, id: NodeId, start: usize, end: usize) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.head_span = Some(TokenSpan::new(start, end));
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Validate the edges and produce the finished tree
    pub fn build(self) -> Result<TargetTree, TreeError> {
        let TargetBuilder { mut nodes, edges } = self;
        let len = nodes.len();

        for (parent, edge) in edges {
            for index in [parent, edge.child] {
                if index >= len {
                    return Err(TreeError::DanglingIndex { index, len });
                }
            }
            if parent == edge.child {
                return Err(TreeError::SelfLoop(parent));
            }
            nodes[parent].children.push(edge);
            if !nodes[edge.child].parents.contains(&parent) {
                nodes[edge.child].parents.push(parent);
            }
        }

        // Kahn's algorithm: parents come out before their children
        let mut in_degree: Vec<usize> = vec![0; len];
        for node in &nodes {
            for edge in &node.children {
                in_degree[edge.child] += 1;
            }
        }
        let roots: Vec<NodeId> = (0..len).filter(|&i| in_degree[i] == 0).collect();
        let mut queue: VecDeque<NodeId> = roots.iter().copied().collect();
        let mut order = Vec::with_capacity(len);
        while let Some(id) = queue.pop_front() {
            order.push(id);
            for edge in &nodes[id].children {
                in_degree[edge.child] -= 1;
                if in_degree[edge.child] == 0 {
                    queue.push_back(edge.child);
                }
            }
        }
        if order.len() < len {
            return Err(TreeError::Cycle(len - order.len()));
        }

        let mut sizes = vec![1usize; len];
        let mut depths = vec![1usize; len];
        for &id in order.iter().rev() {
            let mut span = nodes[id].head_span;
            for i in 0..nodes[id].children.len() {
                let child = nodes[id].children[i].child;
                sizes[id] = sizes[id].saturating_add(sizes[child]);
                depths[id] = depths[id].max(depths[child] + 1);
                span = match (span, nodes[child].span) {
                    (Some(a), Some(b)) => Some(a.union(b)),
                    (a, b) => a.or(b),
                };
            }
            nodes[id].span = span;
        }
        let depth = roots.iter().map(|&r| depths[r]).max().unwrap_or(0);

        Ok(TargetTree {
            nodes,
            roots,
            depth,
            sizes,
        })
    }
}
