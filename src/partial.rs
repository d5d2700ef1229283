//! A persistent parser/AST pair that re-exposes pieces of a parsed symbol.
//!
//! Useful for callers that want to ask structural questions (is this a
//! function? a constructor?) or print a single projection (just the
//! parameters, just the declaration context) without rendering the whole
//! declaration. The arena is kept across calls and recycled by each new
//! parse.

use arena::{Arena, NodeId};
use ast::{FunctionRefQual, Node};
use error::Result;
use parse::Parser;
use print::DemangleContext;
use std::mem;

/// A reusable demangler that holds onto its most recent parse.
#[derive(Debug, Default)]
pub struct PartialDemangler {
    input: Vec<u8>,
    arena: Arena,
    root: Option<NodeId>,
}

impl PartialDemangler {
    /// Construct an empty `PartialDemangler`.
    pub fn new() -> PartialDemangler {
        PartialDemangler {
            input: Vec::new(),
            arena: Arena::new(),
            root: None,
        }
    }

    /// Parse `mangled` into an AST, discarding any previous parse. No output
    /// is produced yet; use the projection methods afterwards.
    pub fn partial_demangle(&mut self, mangled: &[u8]) -> Result<()> {
        self.root = None;
        self.input.clear();
        self.input.extend_from_slice(mangled);

        let arena = mem::replace(&mut self.arena, Arena::new());
        let mut parser = Parser::with_arena(arena, &self.input);
        let result = parser.parse_mangled_name();
        self.arena = parser.into_arena();

        self.root = Some(result?);
        Ok(())
    }

    fn print_node(&self, id: NodeId) -> String {
        let mut ctx = DemangleContext::new(&self.arena, &self.input);
        ctx.print(id);
        String::from_utf8_lossy(&ctx.into_bytes()).into_owned()
    }

    /// The whole demangled declaration, equal to what a one-shot demangle of
    /// the same input produces.
    pub fn finish(&self) -> Option<String> {
        self.root.map(|root| self.print_node(root))
    }

    /// Does the symbol name a function?
    pub fn is_function(&self) -> bool {
        match self.root {
            Some(root) => matches!(*self.arena.get(root), Node::FunctionEncoding { .. }),
            None => false,
        }
    }

    /// Does the symbol name a vtable, thunk, or other special entity?
    pub fn is_special_name(&self) -> bool {
        match self.root {
            Some(root) => matches!(
                *self.arena.get(root),
                Node::SpecialName { .. } | Node::CtorVtableSpecialName { .. }
            ),
            None => false,
        }
    }

    /// Does the symbol name a data object (anything that is neither a
    /// function nor a special name)?
    pub fn is_data(&self) -> bool {
        self.root.is_some() && !self.is_function() && !self.is_special_name()
    }

    /// Does the symbol name a constructor or destructor?
    pub fn is_ctor_or_dtor(&self) -> bool {
        let mut node = match self.root {
            Some(root) => root,
            None => return false,
        };
        loop {
            node = match *self.arena.get(node) {
                Node::CtorDtorName { .. } => return true,
                Node::AbiTagAttr { base, .. } => base,
                Node::FunctionEncoding { name, .. } => name,
                Node::LocalName { entity, .. } => entity,
                Node::NameWithTemplateArgs { name, .. } => name,
                Node::NestedName { name, .. } => name,
                Node::ModuleEntity { name, .. } => name,
                _ => return false,
            };
        }
    }

    /// Does the function have CV- or ref-qualifiers?
    pub fn has_function_qualifiers(&self) -> bool {
        match self.root {
            Some(root) => match *self.arena.get(root) {
                Node::FunctionEncoding {
                    cv_quals, ref_qual, ..
                } => !cv_quals.is_empty() || ref_qual != FunctionRefQual::None,
                _ => false,
            },
            None => false,
        }
    }

    /// The root, provided it is a function encoding.
    fn function_encoding(&self) -> Option<&Node> {
        let root = self.root?;
        let node = self.arena.get(root);
        match *node {
            Node::FunctionEncoding { .. } => Some(node),
            _ => None,
        }
    }

    /// The base name of the function: the name with all of its context,
    /// template arguments, and ABI tags stripped away.
    pub fn function_base_name(&self) -> Option<String> {
        let mut name = match *self.function_encoding()? {
            Node::FunctionEncoding { name, .. } => name,
            _ => unreachable!(),
        };
        loop {
            name = match *self.arena.get(name) {
                Node::AbiTagAttr { base, .. } => base,
                Node::ModuleEntity { name, .. } => name,
                Node::NestedName { name, .. } => name,
                Node::LocalName { entity, .. } => entity,
                Node::NameWithTemplateArgs { name, .. } => name,
                _ => return Some(self.print_node(name)),
            };
        }
    }

    /// The context the function is declared in, e.g. `foo::bar` for
    /// `foo::bar::baz(int)`. Empty for a free function.
    pub fn function_decl_context_name(&self) -> Option<String> {
        let mut name = match *self.function_encoding()? {
            Node::FunctionEncoding { name, .. } => name,
            _ => unreachable!(),
        };

        let mut ctx = DemangleContext::new(&self.arena, &self.input);
        'keep_going: loop {
            loop {
                name = match *self.arena.get(name) {
                    Node::AbiTagAttr { base, .. } => base,
                    Node::NameWithTemplateArgs { name, .. } => name,
                    _ => break,
                };
            }

            if let Node::ModuleEntity { name: entity, .. } = *self.arena.get(name) {
                name = entity;
            }

            match *self.arena.get(name) {
                Node::NestedName { qual, .. } => {
                    ctx.print(qual);
                    break 'keep_going;
                }
                Node::LocalName { encoding, entity } => {
                    ctx.print(encoding);
                    ctx.out.write_str("::");
                    name = entity;
                }
                _ => break 'keep_going,
            }
        }
        Some(String::from_utf8_lossy(&ctx.into_bytes()).into_owned())
    }

    /// The function's entire name, context and template arguments included,
    /// without parameters or return type.
    pub fn function_name(&self) -> Option<String> {
        match *self.function_encoding()? {
            Node::FunctionEncoding { name, .. } => Some(self.print_node(name)),
            _ => unreachable!(),
        }
    }

    /// The parenthesized parameter list.
    pub fn function_parameters(&self) -> Option<String> {
        let params = match *self.function_encoding()? {
            Node::FunctionEncoding { ref params, .. } => params,
            _ => unreachable!(),
        };
        let mut ctx = DemangleContext::new(&self.arena, &self.input);
        ctx.out.write_byte(b'(');
        ctx.print_with_comma(params);
        ctx.out.write_byte(b')');
        Some(String::from_utf8_lossy(&ctx.into_bytes()).into_owned())
    }

    /// The function's return type, when the mangling records one. Empty for
    /// functions whose return type is not mangled.
    pub fn function_return_type(&self) -> Option<String> {
        match *self.function_encoding()? {
            Node::FunctionEncoding { ret, .. } => Some(match ret {
                Some(ret) => self.print_node(ret),
                None => String::new(),
            }),
            _ => unreachable!(),
        }
    }

}

#[cfg(test)]
mod tests {
    use super::PartialDemangler;

    #[test]
    fn projections_of_a_member_function() {
        let mut partial = PartialDemangler::new();
        partial
            .partial_demangle(b"_ZN3foo3barEi")
            .expect("should parse");

        assert!(partial.is_function());
        assert!(!partial.is_ctor_or_dtor());
        assert!(!partial.is_special_name());
        assert!(!partial.is_data());
        assert!(!partial.has_function_qualifiers());

        assert_eq!(partial.function_base_name().unwrap(), "bar");
        assert_eq!(partial.function_decl_context_name().unwrap(), "foo");
        assert_eq!(partial.function_name().unwrap(), "foo::bar");
        assert_eq!(partial.function_parameters().unwrap(), "(int)");
        assert_eq!(partial.function_return_type().unwrap(), "");
        assert_eq!(partial.finish().unwrap(), "foo::bar(int)");
    }

    #[test]
    fn projections_of_a_template_function() {
        let mut partial = PartialDemangler::new();
        partial.partial_demangle(b"_Z1fIiEvT_").expect("should parse");

        assert_eq!(partial.function_base_name().unwrap(), "f");
        assert_eq!(partial.function_name().unwrap(), "f<int>");
        assert_eq!(partial.function_return_type().unwrap(), "void");
        assert_eq!(partial.finish().unwrap(), "void f<int>(int)");
    }

    #[test]
    fn structural_predicates() {
        let mut partial = PartialDemangler::new();

        partial.partial_demangle(b"_ZN3ns1AC2Ev").expect("should parse");
        assert!(partial.is_ctor_or_dtor());
        assert!(partial.is_function());

        partial.partial_demangle(b"_ZTV1A").expect("should parse");
        assert!(partial.is_special_name());
        assert!(!partial.is_function());
        assert!(!partial.is_data());

        partial
            .partial_demangle(b"_ZN11InstrumentsL8gSessionE")
            .expect("should parse");
        assert!(partial.is_data());
        assert!(!partial.is_ctor_or_dtor());
    }

    #[test]
    fn reuse_discards_the_previous_parse() {
        let mut partial = PartialDemangler::new();
        partial.partial_demangle(b"_Z3foov").expect("should parse");
        assert_eq!(partial.finish().unwrap(), "foo()");

        assert!(partial.partial_demangle(b"not a symbol at all").is_err());
        assert!(partial.finish().is_none());
        assert!(!partial.is_function());

        partial.partial_demangle(b"_Z3barv").expect("should parse");
        assert_eq!(partial.finish().unwrap(), "bar()");
    }

    #[test]
    fn finish_agrees_with_one_shot_demangling() {
        let mut partial = PartialDemangler::new();
        for mangled in &[
            &b"_Z3foov"[..],
            b"_ZN3foo3barEi",
            b"_Z1fIiEvT_",
            b"_ZNSt3vectorIiSaIiEE9push_backEOi",
            b"_ZTV1A",
        ] {
            partial.partial_demangle(mangled).expect("should parse");
            assert_eq!(
                partial.finish().unwrap(),
                ::demangle(mangled).unwrap(),
                "finish() must agree with demangle() for {}",
                String::from_utf8_lossy(mangled)
            );
        }
    }

    #[test]
    fn qualified_member_function() {
        let mut partial = PartialDemangler::new();
        partial.partial_demangle(b"_ZNKR1A1fEv").expect("should parse");
        assert!(partial.has_function_qualifiers());
        assert_eq!(partial.finish().unwrap(), "A::f() const &");
    }
}
