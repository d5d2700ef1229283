//! The pretty-printer.
//!
//! Types print in two halves, *left* then *right*, because C++ declarator
//! syntax interleaves outer and inner declarators around the declared name:
//! for `int (*f(float))(char)` we print the return type's left, the name and
//! parameters, then the return type's right. Whether a node needs a right
//! half at all is answered by the cache tri-states on the arena, falling back
//! to a recomputation when the answer depends on the active pack element.
//!
//! All ambient print state (current pack index, the `>`-inside-template-args
//! counter, and the per-node re-entry guards that keep cyclic references from
//! recursing forever) lives on the [`DemangleContext`], not on the nodes.

use arena::{Arena, NodeId};
use ast::{
    Cache, FunctionRefQual, Node, Prec, Qualifiers, ReferenceKind, SpecialSubKind,
    TemplateParamKind, Text,
};
use fixedbitset::FixedBitSet;
use std::io::Write;

/// Sentinel for "no pack expansion is active".
const NO_PACK: u32 = ::std::u32::MAX;

/// A growable byte sink. The printer needs to query and rewind the current
/// position to erase commas and empty pack expansions after the fact, so this
/// is a plain byte vector rather than a generic writer.
pub(crate) struct OutputBuffer {
    buf: Vec<u8>,
}

impl OutputBuffer {
    pub(crate) fn new() -> OutputBuffer {
        OutputBuffer { buf: Vec::new() }
    }

    #[inline]
    pub(crate) fn write_byte(&mut self, b: u8) {
        self.buf.push(b);
    }

    #[inline]
    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    #[inline]
    pub(crate) fn write_str(&mut self, s: &str) {
        self.write_bytes(s.as_bytes());
    }

    pub(crate) fn write_dec(&mut self, value: u32) {
        // Writing into a Vec cannot fail.
        let _ = write!(self.buf, "{}", value);
    }

    /// The current logical position; positions only ever move backwards via
    /// [`OutputBuffer::truncate`].
    #[inline]
    pub(crate) fn position(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub(crate) fn truncate(&mut self, position: usize) {
        self.buf.truncate(position);
    }

    /// The last byte written, or `0` if nothing has been.
    #[inline]
    pub(crate) fn last(&self) -> u8 {
        self.buf.last().copied().unwrap_or(0)
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Render `root` into bytes.
pub(crate) fn demangle_node(arena: &Arena, input: &[u8], root: NodeId) -> Vec<u8> {
    let mut ctx = DemangleContext::new(arena, input);
    ctx.print(root);
    ctx.into_bytes()
}

/// Read-only walk over the AST plus the output buffer and ambient state.
pub(crate) struct DemangleContext<'a> {
    arena: &'a Arena,
    input: &'a [u8],
    pub(crate) out: OutputBuffer,
    /// Which element of the innermost pack expansion is being printed;
    /// `NO_PACK` outside any expansion.
    pack_index: u32,
    pack_max: u32,
    /// Zero exactly while printing template arguments, where a bare `>`
    /// would close the argument list early and must be parenthesized.
    gt_is_gt: u32,
    /// Per-node re-entry guards for reference types and forward template
    /// references; ill-formed back-references can tie them into cycles.
    printing: FixedBitSet,
}

impl<'a> DemangleContext<'a> {
    pub(crate) fn new(arena: &'a Arena, input: &'a [u8]) -> DemangleContext<'a> {
        DemangleContext {
            arena,
            input,
            out: OutputBuffer::new(),
            pack_index: NO_PACK,
            pack_max: NO_PACK,
            gt_is_gt: 1,
            printing: FixedBitSet::with_capacity(arena.len()),
        }
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.out.into_bytes()
    }

    fn write_text(&mut self, text: Text) {
        let input = self.input;
        self.out.write_bytes(text.bytes(input));
    }

    fn print_open(&mut self, open: u8) {
        self.gt_is_gt += 1;
        self.out.write_byte(open);
    }

    fn print_close(&mut self, close: u8) {
        self.gt_is_gt -= 1;
        self.out.write_byte(close);
    }

    fn is_gt_inside_template_args(&self) -> bool {
        self.gt_is_gt == 0
    }

    fn is_printing(&self, id: NodeId) -> bool {
        self.printing.contains(id.index())
    }

    fn set_printing(&mut self, id: NodeId, value: bool) {
        self.printing.set(id.index(), value);
    }

    // -- cached queries --

    fn has_rhs(&mut self, id: NodeId) -> bool {
        match self.arena.rhs_cache(id) {
            Cache::Yes => true,
            Cache::No => false,
            Cache::Unknown => self.has_rhs_slow(id),
        }
    }

    fn has_rhs_slow(&mut self, id: NodeId) -> bool {
        let arena = self.arena;
        match *arena.get(id) {
            Node::QualType { child, .. } => self.has_rhs(child),
            Node::PointerType { pointee } | Node::ReferenceType { pointee, .. } => {
                self.has_rhs(pointee)
            }
            Node::PointerToMemberType { member_type, .. } => self.has_rhs(member_type),
            Node::ArrayType { .. } | Node::FunctionType { .. } | Node::FunctionEncoding { .. } => {
                true
            }
            Node::ParameterPack { ref data } => {
                self.init_pack_expansion(data.len());
                let idx = self.pack_index as usize;
                idx < data.len() && self.has_rhs(data[idx])
            }
            Node::ForwardTemplateReference { resolved, .. } => {
                if self.is_printing(id) {
                    return false;
                }
                self.set_printing(id, true);
                let result = resolved.map_or(false, |target| self.has_rhs(target));
                self.set_printing(id, false);
                result
            }
            _ => false,
        }
    }

    fn has_array(&mut self, id: NodeId) -> bool {
        match self.arena.array_cache(id) {
            Cache::Yes => true,
            Cache::No => false,
            Cache::Unknown => self.has_array_slow(id),
        }
    }

    fn has_array_slow(&mut self, id: NodeId) -> bool {
        let arena = self.arena;
        match *arena.get(id) {
            Node::QualType { child, .. } => self.has_array(child),
            Node::ArrayType { .. } => true,
            Node::ParameterPack { ref data } => {
                self.init_pack_expansion(data.len());
                let idx = self.pack_index as usize;
                idx < data.len() && self.has_array(data[idx])
            }
            Node::ForwardTemplateReference { resolved, .. } => {
                if self.is_printing(id) {
                    return false;
                }
                self.set_printing(id, true);
                let result = resolved.map_or(false, |target| self.has_array(target));
                self.set_printing(id, false);
                result
            }
            _ => false,
        }
    }

    fn has_function(&mut self, id: NodeId) -> bool {
        match self.arena.function_cache(id) {
            Cache::Yes => true,
            Cache::No => false,
            Cache::Unknown => self.has_function_slow(id),
        }
    }

    fn has_function_slow(&mut self, id: NodeId) -> bool {
        let arena = self.arena;
        match *arena.get(id) {
            Node::QualType { child, .. } => self.has_function(child),
            Node::FunctionType { .. } | Node::FunctionEncoding { .. } => true,
            Node::ParameterPack { ref data } => {
                self.init_pack_expansion(data.len());
                let idx = self.pack_index as usize;
                idx < data.len() && self.has_function(data[idx])
            }
            Node::ForwardTemplateReference { resolved, .. } => {
                if self.is_printing(id) {
                    return false;
                }
                self.set_printing(id, true);
                let result = resolved.map_or(false, |target| self.has_function(target));
                self.set_printing(id, false);
                result
            }
            _ => false,
        }
    }

    /// Dig through "glue" nodes (parameter packs, forward references) to the
    /// node carrying concrete syntax.
    fn syntax_node(&mut self, id: NodeId) -> NodeId {
        let arena = self.arena;
        match *arena.get(id) {
            Node::ParameterPack { ref data } => {
                self.init_pack_expansion(data.len());
                let idx = self.pack_index as usize;
                if idx < data.len() {
                    self.syntax_node(data[idx])
                } else {
                    id
                }
            }
            Node::ForwardTemplateReference { resolved, .. } => {
                if self.is_printing(id) {
                    return id;
                }
                match resolved {
                    Some(target) => {
                        self.set_printing(id, true);
                        let result = self.syntax_node(target);
                        self.set_printing(id, false);
                        result
                    }
                    None => id,
                }
            }
            _ => id,
        }
    }

    /// Set up pack state for an expansion, unless one is already active.
    fn init_pack_expansion(&mut self, size: usize) {
        if self.pack_max == NO_PACK {
            self.pack_max = size as u32;
            self.pack_index = 0;
        }
    }

    // -- printing --

    pub(crate) fn print(&mut self, id: NodeId) {
        self.print_left(id);
        if self.arena.rhs_cache(id) != Cache::No {
            self.print_right(id);
        }
    }

    /// Print `id` as an expression operand, parenthesizing it if its
    /// precedence is (strictly) weaker than the context `p`.
    fn print_as_operand(&mut self, id: NodeId, p: Prec, strictly_worse: bool) {
        let prec = self.arena.get(id).precedence();
        let paren = prec as u32 >= p as u32 + strictly_worse as u32;
        if paren {
            self.print_open(b'(');
        }
        self.print(id);
        if paren {
            self.print_close(b')');
        }
    }

    /// Comma-separated printing. An element that produces no output (an
    /// empty pack expansion) also erases the comma written for it.
    pub(crate) fn print_with_comma(&mut self, nodes: &[NodeId]) {
        let mut first_element = true;
        for &node in nodes {
            let before_comma = self.out.position();
            if !first_element {
                self.out.write_str(", ");
            }
            let after_comma = self.out.position();
            self.print_as_operand(node, Prec::Comma, false);

            if after_comma == self.out.position() {
                self.out.truncate(before_comma);
                continue;
            }
            first_element = false;
        }
    }

    fn print_qualifiers(&mut self, quals: Qualifiers) {
        if quals.contains(Qualifiers::CONST) {
            self.out.write_str(" const");
        }
        if quals.contains(Qualifiers::VOLATILE) {
            self.out.write_str(" volatile");
        }
        if quals.contains(Qualifiers::RESTRICT) {
            self.out.write_str(" restrict");
        }
    }

    fn print_ref_qualifier(&mut self, ref_qual: FunctionRefQual) {
        match ref_qual {
            FunctionRefQual::None => {}
            FunctionRefQual::LValue => self.out.write_str(" &"),
            FunctionRefQual::RValue => self.out.write_str(" &&"),
        }
    }

    /// The pack-expansion algorithm: print the child once (which, on finding
    /// a pack below, sets up the pack state and prints element 0), then
    /// re-print it for each remaining index. A child containing no pack gets
    /// a literal `...`; a pack with no elements erases everything printed.
    fn print_pack_expansion(&mut self, child: NodeId) {
        let saved_index = ::std::mem::replace(&mut self.pack_index, NO_PACK);
        let saved_max = ::std::mem::replace(&mut self.pack_max, NO_PACK);
        let stream_pos = self.out.position();

        self.print(child);

        if self.pack_max == NO_PACK {
            // No pack below the child; this was an expansion of e.g. a
            // <function-param>.
            self.out.write_str("...");
        } else if self.pack_max == 0 {
            self.out.truncate(stream_pos);
        } else {
            for i in 1..self.pack_max {
                self.out.write_str(", ");
                self.pack_index = i;
                self.print(child);
            }
        }

        self.pack_index = saved_index;
        self.pack_max = saved_max;
    }

    /// Walk through nested reference types, collapsing them: rvalue-ref of
    /// rvalue-ref stays rvalue, anything else becomes an lvalue ref. An
    /// ill-formed combination of forward references and substitutions can tie
    /// the chain into a cycle; Floyd's tortoise-and-hare detects that, and
    /// the reference then prints as nothing.
    fn collapse_refs(
        &mut self,
        kind: ReferenceKind,
        pointee: NodeId,
    ) -> Option<(ReferenceKind, NodeId)> {
        let mut so_far = (kind, pointee);
        // The chain so far; its midpoint is the "slow" pointer moving at
        // half speed.
        let mut prev: Vec<NodeId> = Vec::new();
        loop {
            let syntax = self.syntax_node(so_far.1);
            let (next_pointee, next_kind) = match *self.arena.get(syntax) {
                Node::ReferenceType { pointee, kind } => (pointee, kind),
                _ => break,
            };
            so_far = (so_far.0.min(next_kind), next_pointee);

            prev.push(so_far.1);
            if prev.len() > 1 && so_far.1 == prev[(prev.len() - 1) / 2] {
                return None;
            }
        }
        Some(so_far)
    }

    fn is_objc_object(&self, pointee: NodeId) -> bool {
        match *self.arena.get(pointee) {
            Node::ObjCProtoName { ty, .. } => match *self.arena.get(ty) {
                Node::NameType { name } => name.bytes(self.input) == b"objc_object",
                _ => false,
            },
            _ => false,
        }
    }

    fn print_left(&mut self, id: NodeId) {
        let arena = self.arena;
        match *arena.get(id) {
            Node::NodeArrayNode { ref array } => self.print_with_comma(array),

            Node::DotSuffix { prefix, suffix } => {
                self.print(prefix);
                self.out.write_str(" (");
                self.write_text(suffix);
                self.out.write_str(")");
            }

            Node::VendorExtQualType {
                ty,
                ext,
                template_args,
            } => {
                self.print(ty);
                self.out.write_str(" ");
                self.write_text(ext);
                if let Some(args) = template_args {
                    self.print(args);
                }
            }

            Node::QualType { child, quals } => {
                self.print_left(child);
                self.print_qualifiers(quals);
            }

            Node::ConversionOperatorType { ty } => {
                self.out.write_str("operator ");
                self.print(ty);
            }

            Node::PostfixQualifiedType { ty, postfix } => {
                self.print_left(ty);
                self.out.write_str(postfix);
            }

            Node::NameType { name } => self.write_text(name),

            Node::BitIntType { size, signed } => {
                if !signed {
                    self.out.write_str("unsigned ");
                }
                self.out.write_str("_BitInt");
                self.print_open(b'(');
                self.print_as_operand(size, Prec::Default, false);
                self.print_close(b')');
            }

            Node::ElaboratedTypeSpefType { kind, child } => {
                self.out.write_str(kind);
                self.out.write_byte(b' ');
                self.print(child);
            }

            Node::AbiTagAttr { base, tag } => {
                self.print_left(base);
                self.out.write_str("[abi:");
                self.write_text(tag);
                self.out.write_str("]");
            }

            Node::EnableIfAttr { ref conditions } => {
                self.out.write_str(" [enable_if:");
                self.print_with_comma(conditions);
                self.out.write_byte(b']');
            }

            Node::ObjCProtoName { ty, protocol } => {
                self.print(ty);
                self.out.write_str("<");
                self.write_text(protocol);
                self.out.write_str(">");
            }

            Node::PointerType { pointee } => {
                // objc_object<SomeProtocol>* rewrites to id<SomeProtocol>.
                if !self.is_objc_object(pointee) {
                    self.print_left(pointee);
                    if self.has_array(pointee) {
                        self.out.write_str(" ");
                    }
                    if self.has_array(pointee) || self.has_function(pointee) {
                        self.out.write_str("(");
                    }
                    self.out.write_str("*");
                } else {
                    let protocol = match *arena.get(pointee) {
                        Node::ObjCProtoName { protocol, .. } => protocol,
                        _ => unreachable!("is_objc_object checked the kind"),
                    };
                    self.out.write_str("id<");
                    self.write_text(protocol);
                    self.out.write_str(">");
                }
            }

            Node::ReferenceType { pointee, kind } => {
                if self.is_printing(id) {
                    return;
                }
                self.set_printing(id, true);
                if let Some((collapsed_kind, collapsed)) = self.collapse_refs(kind, pointee) {
                    self.print_left(collapsed);
                    if self.has_array(collapsed) {
                        self.out.write_str(" ");
                    }
                    if self.has_array(collapsed) || self.has_function(collapsed) {
                        self.out.write_str("(");
                    }
                    self.out.write_str(match collapsed_kind {
                        ReferenceKind::LValue => "&",
                        ReferenceKind::RValue => "&&",
                    });
                }
                self.set_printing(id, false);
            }

            Node::PointerToMemberType {
                class_type,
                member_type,
            } => {
                self.print_left(member_type);
                if self.has_array(member_type) || self.has_function(member_type) {
                    self.out.write_str("(");
                } else {
                    self.out.write_str(" ");
                }
                self.print(class_type);
                self.out.write_str("::*");
            }

            Node::ArrayType { base, .. } => self.print_left(base),

            Node::FunctionType { ret, .. } => {
                self.print_left(ret);
                self.out.write_str(" ");
            }

            Node::NoexceptSpec { expr } => {
                self.out.write_str("noexcept");
                self.print_open(b'(');
                self.print_as_operand(expr, Prec::Default, false);
                self.print_close(b')');
            }

            Node::DynamicExceptionSpec { ref types } => {
                self.out.write_str("throw");
                self.print_open(b'(');
                self.print_with_comma(types);
                self.print_close(b')');
            }

            Node::FunctionEncoding { ret, name, .. } => {
                if let Some(ret) = ret {
                    self.print_left(ret);
                    if !self.has_rhs(ret) {
                        self.out.write_str(" ");
                    }
                }
                self.print(name);
            }

            Node::LiteralOperator { op_name } => {
                self.out.write_str("operator\"\" ");
                self.print(op_name);
            }

            Node::SpecialName { special, child } => {
                self.out.write_str(special);
                self.print(child);
            }

            Node::CtorVtableSpecialName {
                first_type,
                second_type,
            } => {
                self.out.write_str("construction vtable for ");
                self.print(first_type);
                self.out.write_str("-in-");
                self.print(second_type);
            }

            Node::NestedName { qual, name } => {
                self.print(qual);
                self.out.write_str("::");
                self.print(name);
            }

            Node::ModuleName {
                parent,
                name,
                is_partition,
            } => {
                if let Some(parent) = parent {
                    self.print(parent);
                }
                if parent.is_some() || is_partition {
                    self.out.write_byte(if is_partition { b':' } else { b'.' });
                }
                self.print(name);
            }

            Node::ModuleEntity { module, name } => {
                self.print(name);
                self.out.write_byte(b'@');
                self.print(module);
            }

            Node::LocalName { encoding, entity } => {
                self.print(encoding);
                self.out.write_str("::");
                self.print(entity);
            }

            Node::QualifiedName { qualifier, name } => {
                self.print(qualifier);
                self.out.write_str("::");
                self.print(name);
            }

            Node::GlobalQualifiedName { child } => {
                self.out.write_str("::");
                self.print(child);
            }

            Node::VectorType {
                base_type,
                dimension,
            } => {
                self.print(base_type);
                self.out.write_str(" vector[");
                if let Some(dimension) = dimension {
                    self.print(dimension);
                }
                self.out.write_str("]");
            }

            Node::PixelVectorType { dimension } => {
                self.out.write_str("pixel vector[");
                self.print(dimension);
                self.out.write_str("]");
            }

            Node::SyntheticTemplateParamName { kind, index } => {
                self.out.write_str(match kind {
                    TemplateParamKind::Type => "$T",
                    TemplateParamKind::NonType => "$N",
                    TemplateParamKind::Template => "$TT",
                });
                if index > 0 {
                    self.out.write_dec(index - 1);
                }
            }

            Node::TypeTemplateParamDecl { .. } => self.out.write_str("typename "),

            Node::NonTypeTemplateParamDecl { ty, .. } => {
                self.print_left(ty);
                if !self.has_rhs(ty) {
                    self.out.write_str(" ");
                }
            }

            Node::TemplateTemplateParamDecl { ref params, .. } => {
                let saved_gt = ::std::mem::replace(&mut self.gt_is_gt, 0);
                self.out.write_str("template<");
                self.print_with_comma(params);
                self.out.write_str("> typename ");
                self.gt_is_gt = saved_gt;
            }

            Node::TemplateParamPackDecl { param } => {
                self.print_left(param);
                self.out.write_str("...");
            }

            Node::ParameterPack { ref data } => {
                self.init_pack_expansion(data.len());
                let idx = self.pack_index as usize;
                if idx < data.len() {
                    self.print_left(data[idx]);
                }
            }

            Node::TemplateArgumentPack { ref elements } => self.print_with_comma(elements),

            Node::ParameterPackExpansion { child } => self.print_pack_expansion(child),

            Node::TemplateArgs { ref params } => {
                let saved_gt = ::std::mem::replace(&mut self.gt_is_gt, 0);
                self.out.write_str("<");
                self.print_with_comma(params);
                // Don't let the last argument's '>' close our list.
                if self.out.last() == b'>' {
                    self.out.write_str(" ");
                }
                self.out.write_str(">");
                self.gt_is_gt = saved_gt;
            }

            Node::ForwardTemplateReference { resolved, .. } => {
                if self.is_printing(id) {
                    return;
                }
                if let Some(target) = resolved {
                    self.set_printing(id, true);
                    self.print_left(target);
                    self.set_printing(id, false);
                }
            }

            Node::NameWithTemplateArgs {
                name,
                template_args,
            } => {
                self.print(name);
                self.print(template_args);
            }

            Node::SpecialSubstitution { kind } => {
                self.out.write_str("std::");
                self.out.write_str(kind.plain_base_name());
            }

            Node::ExpandedSpecialSubstitution { kind } => {
                self.out.write_str("std::");
                self.out.write_str(kind.expanded_base_name());
                if kind.is_instantiation() {
                    self.out.write_str("<char, std::char_traits<char>");
                    if kind == SpecialSubKind::String {
                        self.out.write_str(", std::allocator<char>");
                    }
                    if self.out.last() == b'>' {
                        self.out.write_str(" ");
                    }
                    self.out.write_str(">");
                }
            }

            Node::CtorDtorName {
                basename, is_dtor, ..
            } => {
                if is_dtor {
                    self.out.write_str("~");
                }
                let base = arena.base_name(basename);
                self.write_text(base);
            }

            Node::DtorName { base } => {
                self.out.write_str("~");
                self.print_left(base);
            }

            Node::UnnamedTypeName { count } => {
                self.out.write_str("'unnamed");
                self.write_text(count);
                self.out.write_str("'");
            }

            Node::ClosureTypeName { count, .. } => {
                self.out.write_str("'lambda");
                self.write_text(count);
                self.out.write_str("'");
                self.print_closure_declarator(id);
            }

            Node::StructuredBindingName { ref bindings } => {
                self.print_open(b'[');
                self.print_with_comma(bindings);
                self.print_close(b']');
            }

            // -- expressions --
            Node::BinaryExpr {
                lhs,
                infix,
                rhs,
                prec,
            } => {
                let paren_all =
                    self.is_gt_inside_template_args() && (infix == ">" || infix == ">>");
                if paren_all {
                    self.print_open(b'(');
                }
                // Assignment is right associative, with special LHS
                // precedence.
                let is_assign = prec == Prec::Assign;
                self.print_as_operand(lhs, if is_assign { Prec::OrIf } else { prec }, !is_assign);
                if infix != "," {
                    self.out.write_byte(b' ');
                }
                self.out.write_str(infix);
                self.out.write_byte(b' ');
                self.print_as_operand(rhs, prec, is_assign);
                if paren_all {
                    self.print_close(b')');
                }
            }

            Node::ArraySubscriptExpr { base, index, prec } => {
                self.print_as_operand(base, prec, false);
                self.print_open(b'[');
                self.print_as_operand(index, Prec::Default, false);
                self.print_close(b']');
            }

            Node::PostfixExpr {
                child,
                operator,
                prec,
            } => {
                self.print_as_operand(child, prec, true);
                self.out.write_str(operator);
            }

            Node::ConditionalExpr {
                cond,
                then,
                or_else,
                prec,
            } => {
                self.print_as_operand(cond, prec, false);
                self.out.write_str(" ? ");
                self.print_as_operand(then, Prec::Default, false);
                self.out.write_str(" : ");
                self.print_as_operand(or_else, Prec::Assign, true);
            }

            Node::MemberExpr {
                lhs,
                kind,
                rhs,
                prec,
            } => {
                self.print_as_operand(lhs, prec, true);
                self.out.write_str(kind);
                self.print_as_operand(rhs, prec, false);
            }

            Node::SubobjectExpr {
                ty,
                sub_expr,
                offset,
                ..
            } => {
                self.print(sub_expr);
                self.out.write_str(".<");
                self.print(ty);
                self.out.write_str(" at offset ");
                let bytes = offset.bytes(self.input);
                if bytes.is_empty() {
                    self.out.write_str("0");
                } else if bytes[0] == b'n' {
                    self.out.write_str("-");
                    self.out.write_bytes(&bytes[1..]);
                } else {
                    self.out.write_bytes(bytes);
                }
                self.out.write_str(">");
            }

            Node::EnclosingExpr { prefix, infix, .. } => {
                self.out.write_str(prefix);
                self.print_open(b'(');
                self.print(infix);
                self.print_close(b')');
            }

            Node::CastExpr {
                cast_kind,
                to,
                from,
                ..
            } => {
                self.out.write_str(cast_kind);
                {
                    let saved_gt = ::std::mem::replace(&mut self.gt_is_gt, 0);
                    self.out.write_str("<");
                    self.print_left(to);
                    self.out.write_str(">");
                    self.gt_is_gt = saved_gt;
                }
                self.print_open(b'(');
                self.print_as_operand(from, Prec::Default, false);
                self.print_close(b')');
            }

            Node::SizeofParamPackExpr { pack } => {
                self.out.write_str("sizeof...");
                self.print_open(b'(');
                self.print_pack_expansion(pack);
                self.print_close(b')');
            }

            Node::CallExpr {
                callee, ref args, ..
            } => {
                self.print(callee);
                self.print_open(b'(');
                self.print_with_comma(args);
                self.print_close(b')');
            }

            Node::NewExpr {
                ref expr_list,
                ty,
                ref init_list,
                is_global,
                is_array,
                ..
            } => {
                if is_global {
                    self.out.write_str("::");
                }
                self.out.write_str("new");
                if is_array {
                    self.out.write_str("[]");
                }
                if !expr_list.is_empty() {
                    self.print_open(b'(');
                    self.print_with_comma(expr_list);
                    self.print_close(b')');
                }
                self.out.write_str(" ");
                self.print(ty);
                if !init_list.is_empty() {
                    self.print_open(b'(');
                    self.print_with_comma(init_list);
                    self.print_close(b')');
                }
            }

            Node::DeleteExpr {
                op,
                is_global,
                is_array,
                ..
            } => {
                if is_global {
                    self.out.write_str("::");
                }
                self.out.write_str("delete");
                if is_array {
                    self.out.write_str("[]");
                }
                self.out.write_byte(b' ');
                self.print(op);
            }

            Node::PrefixExpr {
                prefix,
                child,
                prec,
            } => {
                self.out.write_str(prefix);
                self.print_as_operand(child, prec, false);
            }

            Node::FunctionParam { number } => {
                self.out.write_str("fp");
                self.write_text(number);
            }

            Node::ConversionExpr {
                ty,
                ref expressions,
                ..
            } => {
                self.print_open(b'(');
                self.print(ty);
                self.print_close(b')');
                self.print_open(b'(');
                self.print_with_comma(expressions);
                self.print_close(b')');
            }

            Node::PointerToMemberConversionExpr { ty, sub_expr, .. } => {
                self.print_open(b'(');
                self.print(ty);
                self.print_close(b')');
                self.print_open(b'(');
                self.print(sub_expr);
                self.print_close(b')');
            }

            Node::InitListExpr { ty, ref inits } => {
                if let Some(ty) = ty {
                    self.print(ty);
                }
                self.out.write_byte(b'{');
                self.print_with_comma(inits);
                self.out.write_byte(b'}');
            }

            Node::BracedExpr {
                elem,
                init,
                is_array,
            } => {
                if is_array {
                    self.out.write_byte(b'[');
                    self.print(elem);
                    self.out.write_byte(b']');
                } else {
                    self.out.write_byte(b'.');
                    self.print(elem);
                }
                match *arena.get(init) {
                    Node::BracedExpr { .. } | Node::BracedRangeExpr { .. } => {}
                    _ => self.out.write_str(" = "),
                }
                self.print(init);
            }

            Node::BracedRangeExpr { first, last, init } => {
                self.out.write_byte(b'[');
                self.print(first);
                self.out.write_str(" ... ");
                self.print(last);
                self.out.write_byte(b']');
                match *arena.get(init) {
                    Node::BracedExpr { .. } | Node::BracedRangeExpr { .. } => {}
                    _ => self.out.write_str(" = "),
                }
                self.print(init);
            }

            Node::FoldExpr {
                is_left_fold,
                operator,
                pack,
                init,
            } => {
                // Either '[init op ]... op pack' or 'pack op ...[ op init]'.
                // Fold expr operands are cast-expressions.
                self.print_open(b'(');
                if is_left_fold {
                    if let Some(init) = init {
                        self.print_as_operand(init, Prec::Cast, true);
                        self.out.write_byte(b' ');
                        self.out.write_str(operator);
                        self.out.write_byte(b' ');
                    }
                    self.out.write_str("...");
                    self.out.write_byte(b' ');
                    self.out.write_str(operator);
                    self.out.write_byte(b' ');
                    self.print_open(b'(');
                    self.print_pack_expansion(pack);
                    self.print_close(b')');
                } else {
                    self.print_open(b'(');
                    self.print_pack_expansion(pack);
                    self.print_close(b')');
                    self.out.write_byte(b' ');
                    self.out.write_str(operator);
                    self.out.write_byte(b' ');
                    self.out.write_str("...");
                    if let Some(init) = init {
                        self.out.write_byte(b' ');
                        self.out.write_str(operator);
                        self.out.write_byte(b' ');
                        self.print_as_operand(init, Prec::Cast, true);
                    }
                }
                self.print_close(b')');
            }

            Node::ThrowExpr { op } => {
                self.out.write_str("throw ");
                self.print(op);
            }

            Node::BoolExpr { value } => {
                self.out.write_str(if value { "true" } else { "false" });
            }

            Node::StringLiteral { ty } => {
                self.out.write_str("\"<");
                self.print(ty);
                self.out.write_str(">\"");
            }

            Node::LambdaExpr { ty } => {
                self.out.write_str("[]");
                if let Node::ClosureTypeName { .. } = *arena.get(ty) {
                    self.print_closure_declarator(ty);
                }
                self.out.write_str("{...}");
            }

            Node::EnumLiteral { ty, integer } => {
                self.print_open(b'(');
                self.print(ty);
                self.print_close(b')');

                let bytes = integer.bytes(self.input);
                if bytes.first() == Some(&b'n') {
                    self.out.write_str("-");
                    self.out.write_bytes(&bytes[1..]);
                } else {
                    self.out.write_bytes(bytes);
                }
            }

            Node::IntegerLiteral { ty, value } => {
                if ty.len() > 3 {
                    self.print_open(b'(');
                    self.out.write_str(ty);
                    self.print_close(b')');
                }

                let bytes = value.bytes(self.input);
                if bytes.first() == Some(&b'n') {
                    self.out.write_byte(b'-');
                    self.out.write_bytes(&bytes[1..]);
                } else {
                    self.out.write_bytes(bytes);
                }

                if ty.len() <= 3 {
                    self.out.write_str(ty);
                }
            }
        }
    }

    fn print_right(&mut self, id: NodeId) {
        let arena = self.arena;
        match *arena.get(id) {
            Node::QualType { child, .. } => self.print_right(child),

            Node::PointerType { pointee } => {
                if !self.is_objc_object(pointee) {
                    if self.has_array(pointee) || self.has_function(pointee) {
                        self.out.write_str(")");
                    }
                    self.print_right(pointee);
                }
            }

            Node::ReferenceType { pointee, kind } => {
                if self.is_printing(id) {
                    return;
                }
                self.set_printing(id, true);
                if let Some((_, collapsed)) = self.collapse_refs(kind, pointee) {
                    if self.has_array(collapsed) || self.has_function(collapsed) {
                        self.out.write_str(")");
                    }
                    self.print_right(collapsed);
                }
                self.set_printing(id, false);
            }

            Node::PointerToMemberType { member_type, .. } => {
                if self.has_array(member_type) || self.has_function(member_type) {
                    self.out.write_str(")");
                }
                self.print_right(member_type);
            }

            Node::ArrayType { base, dimension } => {
                if self.out.last() != b']' {
                    self.out.write_str(" ");
                }
                self.out.write_str("[");
                if let Some(dimension) = dimension {
                    self.print(dimension);
                }
                self.out.write_str("]");
                self.print_right(base);
            }

            Node::FunctionType {
                ret,
                ref params,
                cv_quals,
                ref_qual,
                exception_spec,
            } => {
                self.print_open(b'(');
                self.print_with_comma(params);
                self.print_close(b')');
                self.print_right(ret);
                self.print_qualifiers(cv_quals);
                self.print_ref_qualifier(ref_qual);
                if let Some(spec) = exception_spec {
                    self.out.write_byte(b' ');
                    self.print(spec);
                }
            }

            Node::FunctionEncoding {
                ret,
                ref params,
                attrs,
                cv_quals,
                ref_qual,
                ..
            } => {
                self.print_open(b'(');
                self.print_with_comma(params);
                self.print_close(b')');
                if let Some(ret) = ret {
                    self.print_right(ret);
                }
                self.print_qualifiers(cv_quals);
                self.print_ref_qualifier(ref_qual);
                if let Some(attrs) = attrs {
                    self.print(attrs);
                }
            }

            Node::TypeTemplateParamDecl { name } => self.print(name),

            Node::NonTypeTemplateParamDecl { name, ty } => {
                self.print(name);
                self.print_right(ty);
            }

            Node::TemplateTemplateParamDecl { name, .. } => self.print(name),

            Node::TemplateParamPackDecl { param } => self.print_right(param),

            Node::ParameterPack { ref data } => {
                self.init_pack_expansion(data.len());
                let idx = self.pack_index as usize;
                if idx < data.len() {
                    self.print_right(data[idx]);
                }
            }

            Node::ForwardTemplateReference { resolved, .. } => {
                if self.is_printing(id) {
                    return;
                }
                if let Some(target) = resolved {
                    self.set_printing(id, true);
                    self.print_right(target);
                    self.set_printing(id, false);
                }
            }

            // Everything else has no right-hand component. AbiTagAttr can
            // carry its base's cache bits here, but deliberately prints
            // nothing on the right.
            _ => {}
        }
    }

    /// A closure's `<template params>(params)` declarator, shared by its
    /// name and by lambda literals.
    fn print_closure_declarator(&mut self, id: NodeId) {
        let arena = self.arena;
        let (template_params, params) = match *arena.get(id) {
            Node::ClosureTypeName {
                ref template_params,
                ref params,
                ..
            } => (template_params, params),
            _ => return,
        };
        if !template_params.is_empty() {
            let saved_gt = ::std::mem::replace(&mut self.gt_is_gt, 0);
            self.out.write_str("<");
            self.print_with_comma(template_params);
            self.out.write_str(">");
            self.gt_is_gt = saved_gt;
        }
        self.print_open(b'(');
        self.print_with_comma(params);
        self.print_close(b')');
    }
}

#[cfg(test)]
mod tests {
    use super::OutputBuffer;

    #[test]
    fn positions_rewind() {
        let mut out = OutputBuffer::new();
        out.write_str("foo");
        let pos = out.position();
        out.write_str(", bar");
        out.truncate(pos);
        out.write_byte(b'!');
        assert_eq!(out.into_bytes(), b"foo!");
    }

    #[test]
    fn last_byte_of_empty_output_is_nul() {
        let out = OutputBuffer::new();
        assert_eq!(out.last(), 0);
        let mut out = OutputBuffer::new();
        out.write_dec(42);
        assert_eq!(out.last(), b'2');
    }
}
