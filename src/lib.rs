//! `itanium_demangle` parses symbols mangled under the Itanium C++ ABI (the
//! scheme used by mainstream C++ toolchains on ELF and Mach-O platforms) and
//! pretty-prints them back into readable declarations.
//!
//! ```
//! use itanium_demangle::BorrowedSymbol;
//!
//! let sym = BorrowedSymbol::new(&b"_ZN3foo3barEi"[..])
//!     .expect("should parse mangled symbol");
//! assert_eq!(sym.to_string(), "foo::bar(int)");
//! ```
//!
//! Parsing builds an abstract syntax tree in a typed arena, resolving the
//! grammar's back-references (substitutions, template parameters, forward
//! template references) along the way; printing walks that tree, handling
//! C++'s split declarator syntax, operator precedence, and parameter pack
//! expansion. The two stages are exposed separately through
//! [`PartialDemangler`] for callers that want structural queries or partial
//! output.

#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
// `error_chain!` can recurse deeply.
#![recursion_limit = "1024"]

#[macro_use]
extern crate error_chain;
extern crate fixedbitset;

use std::fmt;

#[macro_use]
mod logging;

pub mod error;

mod arena;
mod ast;
mod index_str;
mod parse;
mod partial;
mod print;
mod subs;

use arena::{Arena, NodeId};
use error::Result;

pub use partial::PartialDemangler;

/// A mangled symbol that owns its raw bytes.
pub type OwnedSymbol = Symbol<Vec<u8>>;

/// A mangled symbol borrowing its raw bytes.
pub type BorrowedSymbol<'a> = Symbol<&'a [u8]>;

/// A parsed mangled symbol: the raw input plus the AST built from it.
///
/// Construction performs the complete parse; printing never fails after
/// that, and repeated printing yields byte-identical output.
#[derive(Debug)]
pub struct Symbol<T> {
    raw: T,
    arena: Arena,
    root: NodeId,
}

impl<T> Symbol<T>
where
    T: AsRef<[u8]>,
{
    /// Parse `raw` as a mangled symbol.
    ///
    /// Accepts the `_Z`/`__Z` encodings, the `___Z…_block_invoke` extension,
    /// and bare mangled types.
    pub fn new(raw: T) -> Result<Symbol<T>> {
        let (arena, root) = parse::parse(raw.as_ref())?;
        log!("Symbol::new: parsed {} nodes, root {:?}", arena.len(), root);
        Ok(Symbol { raw, arena, root })
    }

    /// The raw mangled bytes this symbol was parsed from.
    pub fn raw(&self) -> &[u8] {
        self.raw.as_ref()
    }

    /// Render the demangled declaration.
    pub fn demangle(&self) -> String {
        let bytes = print::demangle_node(&self.arena, self.raw.as_ref(), self.root);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl<T> fmt::Display for Symbol<T>
where
    T: AsRef<[u8]>,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.demangle())
    }
}

/// Demangle `mangled` in one step.
///
/// Equivalent to parsing a [`Symbol`] and printing it; use a `Symbol` or a
/// [`PartialDemangler`] to hold onto the parse.
pub fn demangle(mangled: &[u8]) -> Result<String> {
    BorrowedSymbol::new(mangled).map(|sym| sym.demangle())
}

#[cfg(test)]
mod tests {
    use super::{demangle, OwnedSymbol};

    #[test]
    fn demangling_is_pure() {
        let sym = OwnedSymbol::new(b"_ZN3foo3barEi".to_vec()).expect("should parse");
        let first = sym.demangle();
        let second = sym.demangle();
        assert_eq!(first, second);
        assert_eq!(first, "foo::bar(int)");
    }

    #[test]
    fn failures_produce_no_output() {
        assert!(demangle(b"").is_err());
        assert!(demangle(b"_Zxxxxxxx").is_err());
        assert!(demangle(b"_Z").is_err());
    }

    #[test]
    fn deeply_nested_pointers_demangle() {
        let mut mangled = vec![b'P'; 100];
        mangled.push(b'i');
        let expected = format!("int{}", "*".repeat(100));
        assert_eq!(demangle(&mangled).expect("should parse"), expected);
    }

    #[test]
    fn pathological_nesting_fails_cleanly() {
        // Far past the recursion bound; must error, not overflow the stack.
        let mut mangled = vec![b'P'; 100_000];
        mangled.push(b'i');
        assert!(demangle(&mangled).is_err());
    }
}
