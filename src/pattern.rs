//! Compiled pattern trees
//!
//! A pattern is a small forest of labeled nodes (a relation or event
//! template, possibly a disjunction of several templates) that gets aligned
//! against much larger target trees. It is traversed many times per
//! sentence, so it is stored flat: nodes in a dense table, edges grouped by
//! parent so that the children of a node are one contiguous slice, and a
//! preorder table in which every subtree is also a contiguous slice.

use crate::parser::is_plain_label;
use crate::symbols::{Sym, SymbolTable};
use std::fmt;
use thiserror::Error;

/// Index of a node within its pattern tree
pub type PatternIdx = usize;

/// What a pattern node matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternLabel {
    /// A concrete predicate such as `buy`
    Predicate(Sym),
    /// A slot that any argument may fill, optionally named (`?buyer`)
    Wildcard(Option<Sym>),
}

impl PatternLabel {
    pub fn predicate(&self) -> Option<Sym> {
        match self {
            PatternLabel::Predicate(sym) => Some(*sym),
            PatternLabel::Wildcard(_) => None,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, PatternLabel::Wildcard(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatternNode {
    pub index: PatternIdx,
    pub label: PatternLabel,
    /// Contribution of this node to the aggregate match score
    pub weight: f32,
}

/// A role-labeled edge from `parent` to `child`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternEdge {
    pub parent: PatternIdx,
    pub role: Sym,
    pub child: PatternIdx,
}

/// Error raised while compiling a pattern tree
#[derive(Debug, Error, PartialEq)]
pub enum PatternError {
    #[error("Pattern error: edge refers to node {index} but the pattern has {len} nodes")]
    DanglingIndex { index: PatternIdx, len: usize },

    #[error("Pattern error: node {0} is its own child")]
    SelfLoop(PatternIdx),

    #[error("Pattern error: node {child} already has parent {parent}")]
    SharedChild { child: PatternIdx, parent: PatternIdx },

    #[error("Pattern error: edges form a cycle ({unreachable} nodes unreachable from a root)")]
    Cycle { unreachable: usize },

    #[error("Pattern error: node {index} has invalid weight {weight}")]
    InvalidWeight { index: PatternIdx, weight: f32 },
}

/// An immutable, validated pattern forest
#[derive(Debug, Clone)]
pub struct PatternTree {
    nodes: Vec<PatternNode>,
    /// Edges sorted by parent, insertion order kept within a parent
    edges: Vec<PatternEdge>,
    /// `edges[offsets[i]..offsets[i + 1]]` are the children of node i
    offsets: Vec<usize>,
    parents: Vec<Option<(PatternIdx, Sym)>>,
    roots: Vec<PatternIdx>,
    preorder: Vec<PatternIdx>,
    /// (position in `preorder`, subtree size) per node
    subtree_spans: Vec<(usize, usize)>,
    height: usize,
}

impl PatternTree {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[PatternNode] {
        &self.nodes
    }

    /// Get a node by index
    ///
    /// Panics if `idx` is out of range; indices come from this tree.
    #[inline]
    pub fn node(&self, idx: PatternIdx) -> &PatternNode {
        &self.nodes[idx]
    }

    pub fn get(&self, idx: PatternIdx) -> Option<&PatternNode> {
        self.nodes.get(idx)
    }

    /// Outgoing edges of a node, in the order they were declared
    #[inline]
    pub fn children(&self, idx: PatternIdx) -> &[PatternEdge] {
        &self.edges[self.offsets[idx]..self.offsets[idx + 1]]
    }

    /// Parent of a node and the role it fills there
    pub fn parent(&self, idx: PatternIdx) -> Option<(PatternIdx, Sym)> {
        self.parents[idx]
    }

    /// Parentless nodes in index order
    pub fn roots(&self) -> &[PatternIdx] {
        &self.roots
    }

    /// All nodes of the subtree rooted at `idx`, in preorder
    #[inline]
    pub fn subtree(&self, idx: PatternIdx) -> &[PatternIdx] {
        let (start, size) = self.subtree_spans[idx];
        &self.preorder[start..start + size]
    }

    /// Number of nodes on the longest root-to-leaf path
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn edges(&self) -> &[PatternEdge] {
        &self.edges
    }

    pub fn total_weight(&self) -> f32 {
        self.nodes.iter().map(|n| n.weight).sum()
    }

    /// Render in the bracketed tree notation accepted by `parse_pattern`
    pub fn display<'a>(&'a self, symbols: &'a SymbolTable) -> impl fmt::Display + 'a {
        PatternDisplay {
            tree: self,
            symbols,
        }
    }
}

struct PatternDisplay<'a> {
    tree: &'a PatternTree,
    symbols: &'a SymbolTable,
}

impl PatternDisplay<'_> {
    fn write_node(&self, f: &mut fmt::Formatter<'_>, idx: PatternIdx) -> fmt::Result {
        let node = self.tree.node(idx);
        match node.label {
            PatternLabel::Predicate(sym) => {
                let label = self.symbols.resolve(sym);
                if is_plain_label(label) {
                    write!(f, "{}", label)?;
                } else {
                    write!(f, "\"{}\"", label)?;
                }
            }
            PatternLabel::Wildcard(None) => write!(f, "?")?,
            PatternLabel::Wildcard(Some(name)) => write!(f, "?{}", self.symbols.resolve(name))?,
        }
        if node.weight != 1.0 {
            write!(f, "^{}", node.weight)?;
        }
        let children = self.tree.children(idx);
        if !children.is_empty() {
            write!(f, "(")?;
            for (i, edge) in children.iter().enumerate() {
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

impl fmt::Display for PatternDisplay<'_> {
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

/// Incremental construction of a `PatternTree`
///
/// Nodes and edges may be added in any order; all structural checks happen
/// in `build`.
#[derive(Debug, Clone, Default)]
pub struct PatternBuilder {
    nodes: Vec<PatternNode>,
    edges: Vec<PatternEdge>,
}

impl PatternBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node with weight 1.0 and return its index
    pub fn add_node(&mut self, label: PatternLabel) -> PatternIdx {
        let index = self.nodes.len();
        self.nodes.push(PatternNode {
            index,
            label,
            weight: 1.0,
        });
        index
    }

    pub fn add_predicate(&mut self, predicate: Sym) -> PatternIdx {
        self.add_node(PatternLabel::Predicate(predicate))
    }

    pub fn add_wildcard(&mut self) -> PatternIdx {
        self.add_node(PatternLabel::Wildcard(None))
    }

    pub fn add_edge(&mut self, parent: PatternIdx, role: Sym, child: PatternIdx) {
        self.edges.push(PatternEdge {
            parent,
            role,
            child,
        });
    }

    /// Set a node's weight; unknown indices are ignored here and the weight
    /// itself is validated in `build`
    pub fn set_weight(&mut self, idx: PatternIdx, weight: f32) {
        if let Some(node) = self.nodes.get_mut(idx) {
            node.weight = weight;
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Validate and flatten into a `PatternTree`
    pub fn build(self) -> Result<PatternTree, PatternError> {
        let PatternBuilder { nodes, mut edges } = self;
        let len = nodes.len();

        for node in &nodes {
            if !node.weight.is_finite() || node.weight < 0.0 {
                return Err(PatternError::InvalidWeight {
                    index: node.index,
                    weight: node.weight,
                });
            }
        }

        let mut parents: Vec<Option<(PatternIdx, Sym)>> = vec![None; len];
        for edge in &edges {
            for index in [edge.parent, edge.child] {
                if index >= len {
                    return Err(PatternError::DanglingIndex { index, len });
                }
            }
            if edge.parent == edge.child {
                return Err(PatternError::SelfLoop(edge.child));
            }
            if let Some((parent, _)) = parents[edge.child] {
                return Err(PatternError::SharedChild {
                    child: edge.child,
                    parent,
                });
            }
            parents[edge.child] = Some((edge.parent, edge.role));
        }

        // sort_by_key is stable, so sibling order is declaration order
        edges.sort_by_key(|e| e.parent);
        let mut offsets = vec![0; len + 1];
        for edge in &edges {
            offsets[edge.parent + 1] += 1;
        }
        for i in 0..len {
            offsets[i + 1] += offsets[i];
        }

        let roots: Vec<PatternIdx> = (0..len).filter(|&i| parents[i].is_none()).collect();

        // Preorder walk from every root; a node missed here sits on a cycle
        let mut preorder = Vec::with_capacity(len);
        let mut position = vec![usize::MAX; len];
        let mut stack = Vec::new();
        for &root in &roots {
            stack.push(root);
            while let Some(idx) = stack.pop() {
                position[idx] = preorder.len();
                preorder.push(idx);
                for edge in edges[offsets[idx]..offsets[idx + 1]].iter().rev() {
                    stack.push(edge.child);
                }
            }
        }
        if preorder.len() < len {
            return Err(PatternError::Cycle {
                unreachable: len - preorder.len(),
            });
        }

        let mut sizes = vec![1usize; len];
        let mut heights = vec![1usize; len];
        for &idx in preorder.iter().rev() {
            for edge in &edges[offsets[idx]..offsets[idx + 1]] {
                sizes[idx] += sizes[edge.child];
                heights[idx] = heights[idx].max(heights[edge.child] + 1);
            }
        }
        let subtree_spans = (0..len).map(|i| (position[i], sizes[i])).collect();
        let height = roots.iter().map(|&r| heights[r]).max().unwrap_or(0);

        Ok(PatternTree {
            nodes,
            edges,
            offsets,
            parents,
            roots,
            preorder,
            subtree_spans,
            height,
        })
    }
}
