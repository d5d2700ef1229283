//! The substitution table.
//!
//! Itanium manglings compress repeated components: most parsed types,
//! prefixes, and unscoped template names are appended here as a side effect
//! of parsing, and `S_` / `S<seq-id>_` refer back to them by index. Builtin
//! primitive types never enter the table; vendor extended builtins do.

use arena::NodeId;
use std::fmt;
use std::ops::Deref;

/// The components parsed so far that a back-reference may target.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SubstitutionTable {
    substitutions: Vec<NodeId>,
}

impl SubstitutionTable {
    pub fn new() -> SubstitutionTable {
        Default::default()
    }

    /// Append a freshly-parsed substitutable component and return the index
    /// at which it now lives.
    pub fn insert(&mut self, id: NodeId) -> usize {
        let idx = self.substitutions.len();
        log!("SubstitutionTable::insert @ {}: {:?}", idx, id);
        self.substitutions.push(id);
        idx
    }

    /// The component a parsed `<seq-id>` refers to, if in bounds.
    pub fn get(&self, idx: usize) -> Option<NodeId> {
        self.substitutions.get(idx).copied()
    }

    /// Remove and return the most recent entry.
    ///
    /// A nested name's final component is popped back off once the whole
    /// name is chosen as the encoding's name, since the complete name is not
    /// itself a substitution candidate there.
    pub fn pop(&mut self) -> Option<NodeId> {
        log!(
            "SubstitutionTable::pop @ {}: {:?}",
            self.substitutions.len(),
            self.substitutions.last()
        );
        self.substitutions.pop()
    }

    pub fn len(&self) -> usize {
        self.substitutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.substitutions.is_empty()
    }
}

impl Deref for SubstitutionTable {
    type Target = [NodeId];

    fn deref(&self) -> &[NodeId] {
        &self.substitutions[..]
    }
}

impl fmt::Debug for SubstitutionTable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.pad("SubstitutionTable ")?;
        f.debug_map()
            .entries(self.substitutions.iter().enumerate())
            .finish()
    }
}
