//! Interned labels shared by pattern and target trees
//!
//! Predicate and role labels are compared many times per matching run,
//! so both tree kinds store them as interned symbols from one table.

use lasso::{Spur, ThreadedRodeo};
use std::fmt;
use std::sync::Arc;

/// Interned predicate or role label
pub type Sym = Spur;

/// Thread-safe string interner handle
///
/// Cloning is cheap and every clone refers to the same table, so a pattern
/// compiled once can be matched against targets built on other threads.
#[derive(Clone, Default)]
pub struct SymbolTable(Arc<ThreadedRodeo>);

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn intern(&self, label: &str) -> Sym {
        self.0.get_or_intern(label)
    }

    /// Look up a label without interning it
    #[inline]
    pub fn get(&self, label: &str) -> Option<Sym> {
        self.0.get(label)
    }

    #[inline]
    pub fn resolve(&self, sym: Sym) -> &str {
        self.0.resolve(&sym)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if both handles share one underlying table
    pub fn same_table(&self, other: &SymbolTable) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymbolTable")
            .field("len", &self.len())
            .finish()
    }
}
