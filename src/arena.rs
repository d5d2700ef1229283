//! A typed arena holding every AST node of one demangling.
//!
//! Nodes refer to each other through `NodeId` indices rather than owning
//! references: the grammar's back-reference mechanisms (substitutions and
//! forward template references) can produce cyclic structures on ill-formed
//! input, which index edges represent without trouble. `reset` drops the
//! whole AST in one operation so a parser instance can be reused.

use ast::{Cache, Node};
use std::fmt;

/// A stable index of a node in its [`Arena`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

struct Entry {
    node: Node,
    // Memoized "does printing this type need a right-hand side / is it an
    // array / is it a function" answers, fixed at allocation time. `Unknown`
    // appears when the answer depends on which element of a parameter pack
    // is active, and forces the printer down the slow recomputation path.
    rhs: Cache,
    array: Cache,
    function: Cache,
}

/// The node arena backing one parse.
pub struct Arena {
    nodes: Vec<Entry>,
}

// Sized so that typical symbols never reallocate.
const INITIAL_CAPACITY: usize = 64;

impl Arena {
    pub fn new() -> Arena {
        Arena {
            nodes: Vec::with_capacity(INITIAL_CAPACITY),
        }
    }

    /// Move `node` into the arena and return its index.
    ///
    /// The node's cache bits are computed here, from the already-allocated
    /// children, and never change afterwards.
    pub fn alloc(&mut self, node: Node) -> NodeId {
        let (rhs, array, function) = node.initial_caches(self);
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Entry {
            node,
            rhs,
            array,
            function,
        });
        id
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()].node
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub(crate) fn rhs_cache(&self, id: NodeId) -> Cache {
        self.nodes[id.index()].rhs
    }

    #[inline]
    pub(crate) fn array_cache(&self, id: NodeId) -> Cache {
        self.nodes[id.index()].array
    }

    #[inline]
    pub(crate) fn function_cache(&self, id: NodeId) -> Cache {
        self.nodes[id.index()].function
    }

    /// Point the `ForwardTemplateReference` at `id` to its referent. Happens
    /// exactly once per forward reference, when the enclosing encoding's
    /// template arguments become known.
    pub(crate) fn resolve_forward_ref(&mut self, id: NodeId, target: NodeId) {
        match self.nodes[id.index()].node {
            Node::ForwardTemplateReference {
                ref mut resolved, ..
            } => {
                debug_assert!(resolved.is_none());
                *resolved = Some(target);
            }
            _ => debug_assert!(false, "not a forward template reference"),
        }
    }

    /// Drop every node, invalidating all outstanding `NodeId`s, but keep the
    /// backing storage for reuse.
    pub fn reset(&mut self) {
        self.nodes.clear();
    }
}

impl fmt::Debug for Arena {
    // A full dump of every node is unreadable; summarize.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Arena {{ {} nodes }}", self.nodes.len())
    }
}

impl Default for Arena {
    fn default() -> Arena {
        Arena::new()
    }
}
