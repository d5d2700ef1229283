//! The grammar-directed parser.
//!
//! A recursive descent over the Itanium C++ ABI mangling grammar. Dispatch is
//! on the next one or two bytes; the leading characters of the productions
//! are disjoint per context, so no backtracking is needed. The two documented
//! speculative modes (`try_to_parse_template_args` and
//! `permit_forward_template_references`) are plain booleans saved and
//! restored around the sub-parses they scope.
//!
//! Every production returns `Result<NodeId>`; a failure anywhere fails the
//! whole parse and no partial output is ever produced.

use arena::{Arena, NodeId};
use ast::{
    FunctionRefQual, Node, Prec, Qualifiers, ReferenceKind, SpecialSubKind, TemplateParamKind,
    Text,
};
use error::{ErrorKind, Result};
use index_str::IndexStr;
use std::mem;
use subs::SubstitutionTable;

/// Hostile inputs can nest productions arbitrarily deep; anything real stays
/// far below this.
const MAX_RECURSION_DEPTH: usize = 512;

/// How an operator encoding shapes the expression around it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum OperatorKind {
    /// Prefix unary: `@ expr`.
    Prefix,
    /// Postfix unary: `expr @`.
    Postfix,
    /// Binary: `lhs @ rhs`.
    Binary,
    /// Array index: `lhs [ rhs ]`.
    Array,
    /// Member access: `lhs @ rhs`.
    Member,
    New,
    Del,
    /// Function call: `expr (expr*)`.
    Call,
    /// C cast: `(type)expr`.
    CCast,
    /// Conditional: `expr ? expr : expr`.
    Conditional,
    /// Overload name only, not allowed in expressions.
    NameOnly,
    /// Named cast: `@<type>(expr)`. From here down the entries carry no
    /// `operator` spelling.
    NamedCast,
    /// `alignof`, `sizeof`, `typeid`.
    OfIdOp,
}

struct OperatorInfo {
    enc: [u8; 2],
    kind: OperatorKind,
    /// Entry-specific flag: array form for new/delete, type operand for
    /// `OfIdOp`, nameable member access for `Member`.
    flag: bool,
    prec: Prec,
    name: &'static str,
}

impl OperatorInfo {
    fn is_nameable(&self) -> bool {
        self.kind < OperatorKind::NamedCast
    }

    /// The spelling without the `operator` prefix, e.g. `&&` for `aa`.
    fn symbol(&self) -> &'static str {
        if self.is_nameable() {
            let sym = &self.name["operator".len()..];
            if sym.starts_with(' ') {
                &sym[1..]
            } else {
                sym
            }
        } else {
            self.name
        }
    }
}

macro_rules! op {
    ( $enc:expr, $kind:ident, $flag:expr, $prec:ident, $name:expr ) => {
        OperatorInfo {
            enc: *$enc,
            kind: OperatorKind::$kind,
            flag: $flag,
            prec: Prec::$prec,
            name: $name,
        }
    };
}

// Keep ordered by encoding; dispatch is a binary search.
static OPERATORS: [OperatorInfo; 62] = [
    op!(b"aN", Binary, false, Assign, "operator&="),
    op!(b"aS", Binary, false, Assign, "operator="),
    op!(b"aa", Binary, false, AndIf, "operator&&"),
    op!(b"ad", Prefix, false, Unary, "operator&"),
    op!(b"an", Binary, false, And, "operator&"),
    op!(b"at", OfIdOp, true, Unary, "alignof "),
    op!(b"aw", NameOnly, false, Primary, "operator co_await"),
    op!(b"az", OfIdOp, false, Unary, "alignof "),
    op!(b"cc", NamedCast, false, Postfix, "const_cast"),
    op!(b"cl", Call, false, Postfix, "operator()"),
    op!(b"cm", Binary, false, Comma, "operator,"),
    op!(b"co", Prefix, false, Unary, "operator~"),
    op!(b"cv", CCast, false, Cast, "operator"),
    op!(b"dV", Binary, false, Assign, "operator/="),
    op!(b"da", Del, true, Unary, "operator delete[]"),
    op!(b"dc", NamedCast, false, Postfix, "dynamic_cast"),
    op!(b"de", Prefix, false, Unary, "operator*"),
    op!(b"dl", Del, false, Unary, "operator delete"),
    op!(b"ds", Member, false, PtrMem, "operator.*"),
    op!(b"dt", Member, false, Postfix, "operator."),
    op!(b"dv", Binary, false, Assign, "operator/"),
    op!(b"eO", Binary, false, Assign, "operator^="),
    op!(b"eo", Binary, false, Xor, "operator^"),
    op!(b"eq", Binary, false, Equality, "operator=="),
    op!(b"ge", Binary, false, Relational, "operator>="),
    op!(b"gt", Binary, false, Relational, "operator>"),
    op!(b"ix", Array, false, Postfix, "operator[]"),
    op!(b"lS", Binary, false, Assign, "operator<<="),
    op!(b"le", Binary, false, Relational, "operator<="),
    op!(b"ls", Binary, false, Shift, "operator<<"),
    op!(b"lt", Binary, false, Relational, "operator<"),
    op!(b"mI", Binary, false, Assign, "operator-="),
    op!(b"mL", Binary, false, Assign, "operator*="),
    op!(b"mi", Binary, false, Additive, "operator-"),
    op!(b"ml", Binary, false, Multiplicative, "operator*"),
    op!(b"mm", Postfix, false, Postfix, "operator--"),
    op!(b"na", New, true, Unary, "operator new[]"),
    op!(b"ne", Binary, false, Equality, "operator!="),
    op!(b"ng", Prefix, false, Unary, "operator-"),
    op!(b"nt", Prefix, false, Unary, "operator!"),
    op!(b"nw", New, false, Unary, "operator new"),
    op!(b"oR", Binary, false, Assign, "operator|="),
    op!(b"oo", Binary, false, OrIf, "operator||"),
    op!(b"or", Binary, false, Ior, "operator|"),
    op!(b"pL", Binary, false, Assign, "operator+="),
    op!(b"pl", Binary, false, Additive, "operator+"),
    op!(b"pm", Member, false, PtrMem, "operator->*"),
    op!(b"pp", Postfix, false, Postfix, "operator++"),
    op!(b"ps", Prefix, false, Unary, "operator+"),
    op!(b"pt", Member, true, Postfix, "operator->"),
    op!(b"qu", Conditional, false, Conditional, "operator?"),
    op!(b"rM", Binary, false, Assign, "operator%="),
    op!(b"rS", Binary, false, Assign, "operator>>="),
    op!(b"rc", NamedCast, false, Postfix, "reinterpret_cast"),
    op!(b"rm", Binary, false, Multiplicative, "operator%"),
    op!(b"rs", Binary, false, Shift, "operator>>"),
    op!(b"sc", NamedCast, false, Postfix, "static_cast"),
    op!(b"ss", Binary, false, Spaceship, "operator<=>"),
    op!(b"st", OfIdOp, true, Unary, "sizeof "),
    op!(b"sz", OfIdOp, false, Unary, "sizeof "),
    op!(b"te", OfIdOp, false, Postfix, "typeid "),
    op!(b"ti", OfIdOp, true, Postfix, "typeid "),
];

/// Extra information about a `<name>` gathered while parsing it, pertinent
/// when the name belongs to an `<encoding>`.
#[derive(Debug)]
struct NameState {
    ctor_dtor_conversion: bool,
    ends_with_template_args: bool,
    cv_qualifiers: Qualifiers,
    reference_qualifier: FunctionRefQual,
    forward_template_refs_begin: usize,
}

impl NameState {
    fn new(parser: &Parser) -> NameState {
        NameState {
            ctor_dtor_conversion: false,
            ends_with_template_args: false,
            cv_qualifiers: Qualifiers::NONE,
            reference_qualifier: FunctionRefQual::None,
            forward_template_refs_begin: parser.forward_template_refs.len(),
        }
    }
}

/// Parse `input` as a whole mangled name, yielding the arena and the root.
pub(crate) fn parse(input: &[u8]) -> Result<(Arena, NodeId)> {
    let mut parser = Parser::with_arena(Arena::new(), input);
    let root = parser.parse_mangled_name()?;
    Ok((parser.into_arena(), root))
}

/// One parse invocation's state: the input cursor, the name stack used to
/// accumulate node arrays, the substitution and template-parameter tables,
/// and the speculative-mode flags.
pub(crate) struct Parser<'a> {
    original: &'a [u8],
    input: IndexStr<'a>,
    arena: Arena,
    /// Temporary names the parser collapses into larger nodes.
    names: Vec<NodeId>,
    subs: SubstitutionTable,
    /// Template parameter scopes, indexed by depth as in `TL<level>_…`.
    /// Element 0 is the scope of the encoding's own template args; inner
    /// elements belong to lambdas. `None` marks a generic-lambda scope that
    /// has not been materialized yet.
    template_params: Vec<Option<Vec<NodeId>>>,
    /// Unresolved `T_` references from a conversion operator's type, fixed up
    /// once the enclosing encoding's template arguments are known.
    forward_template_refs: Vec<NodeId>,
    try_to_parse_template_args: bool,
    permit_forward_template_references: bool,
    parsing_lambda_params_at_level: Option<usize>,
    num_synthetic_template_parameters: [u32; 3],
    depth: usize,
}

impl<'a> Parser<'a> {
    pub(crate) fn with_arena(mut arena: Arena, input: &'a [u8]) -> Parser<'a> {
        arena.reset();
        Parser {
            original: input,
            input: IndexStr::new(input),
            arena,
            names: Vec::new(),
            subs: SubstitutionTable::new(),
            template_params: Vec::new(),
            forward_template_refs: Vec::new(),
            try_to_parse_template_args: true,
            permit_forward_template_references: false,
            parsing_lambda_params_at_level: None,
            num_synthetic_template_parameters: [0; 3],
            depth: 0,
        }
    }

    pub(crate) fn into_arena(self) -> Arena {
        self.arena
    }

    // -- cursor helpers --

    fn look(&self, ahead: usize) -> u8 {
        self.input.look(ahead)
    }

    fn eat(&mut self, b: u8) -> bool {
        self.input.eat(b)
    }

    fn eat_str(&mut self, s: &[u8]) -> bool {
        self.input.eat_str(s)
    }

    fn num_left(&self) -> usize {
        self.input.len()
    }

    fn make(&mut self, node: Node) -> NodeId {
        self.arena.alloc(node)
    }

    fn text_bytes(&self, t: Text) -> &[u8] {
        t.bytes(self.original)
    }

    fn fail<T>(&self) -> Result<T> {
        Err(if self.input.is_empty() {
            ErrorKind::UnexpectedEnd.into()
        } else {
            ErrorKind::UnexpectedText.into()
        })
    }

    fn recurse<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        if self.depth >= MAX_RECURSION_DEPTH {
            return Err(ErrorKind::TooMuchRecursion.into());
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn pop_trailing_node_array(&mut self, from: usize) -> Vec<NodeId> {
        debug_assert!(from <= self.names.len());
        self.names.split_off(from)
    }

    // -- small shared scanners --

    /// `<number> ::= [n] <non-negative decimal integer>`
    ///
    /// Returns an empty `Text` when no digits are present.
    fn parse_number(&mut self, allow_negative: bool) -> Text {
        let start = self.input.index();
        if allow_negative {
            self.eat(b'n');
        }
        if !self.look(0).is_ascii_digit() {
            return Text::empty();
        }
        while self.look(0).is_ascii_digit() {
            self.input.advance(1);
        }
        Text::Input {
            start,
            end: self.input.index(),
        }
    }

    /// `<positive length number> ::= [0-9]*`
    fn parse_positive_integer(&mut self) -> Result<usize> {
        if !self.look(0).is_ascii_digit() {
            return self.fail();
        }
        let mut out: usize = 0;
        while self.look(0).is_ascii_digit() {
            let digit = (self.input.next_byte() - b'0') as usize;
            out = out
                .checked_mul(10)
                .and_then(|o| o.checked_add(digit))
                .ok_or(ErrorKind::Overflow)?;
        }
        Ok(out)
    }

    fn parse_bare_source_name(&mut self) -> Result<Text> {
        let len = self.parse_positive_integer()?;
        if self.num_left() < len || len == 0 {
            return self.fail();
        }
        let start = self.input.index();
        self.input.advance(len);
        Ok(Text::Input {
            start,
            end: start + len,
        })
    }

    /// `<seq-id> ::= <0-9A-Z>+`, base 36.
    fn parse_seq_id(&mut self) -> Result<usize> {
        if !self.look(0).is_ascii_digit() && !self.look(0).is_ascii_uppercase() {
            return self.fail();
        }
        let mut id: usize = 0;
        loop {
            let digit = match self.look(0) {
                b @ b'0'..=b'9' => (b - b'0') as usize,
                b @ b'A'..=b'Z' => (b - b'A') as usize + 10,
                _ => return Ok(id),
            };
            id = id
                .checked_mul(36)
                .and_then(|i| i.checked_add(digit))
                .ok_or(ErrorKind::Overflow)?;
            self.input.advance(1);
        }
    }

    /// `<CV-Qualifiers> ::= [r] [V] [K]`
    fn parse_cv_qualifiers(&mut self) -> Qualifiers {
        let mut quals = Qualifiers::NONE;
        if self.eat(b'r') {
            quals |= Qualifiers::RESTRICT;
        }
        if self.eat(b'V') {
            quals |= Qualifiers::VOLATILE;
        }
        if self.eat(b'K') {
            quals |= Qualifiers::CONST;
        }
        quals
    }

    /// `<discriminator> := _ <digit>` or `__ <number> _`, or trailing digits
    /// at the end of the string. Parsed but never printed.
    fn parse_discriminator(&mut self) {
        if self.input.is_empty() {
            return;
        }
        if self.look(0) == b'_' {
            if self.look(1).is_ascii_digit() {
                self.input.advance(2);
            } else if self.look(1) == b'_' {
                let mut t = 2;
                while self.look(t).is_ascii_digit() {
                    t += 1;
                }
                if self.look(t) == b'_' {
                    self.input.advance(t + 1);
                }
            }
        } else if self.look(0).is_ascii_digit() {
            let mut t = 1;
            while self.look(t).is_ascii_digit() {
                t += 1;
            }
            if t == self.num_left() {
                self.input.advance(t);
            }
        }
    }

    /// If the next two bytes are an operator encoding, consume them and
    /// return the table entry.
    fn parse_operator_encoding(&mut self) -> Option<&'static OperatorInfo> {
        if self.num_left() < 2 {
            return None;
        }
        let peek = [self.look(0), self.look(1)];
        let idx = OPERATORS.binary_search_by(|op| op.enc.cmp(&peek)).ok()?;
        self.input.advance(2);
        Some(&OPERATORS[idx])
    }

    // -- top level --

    // <mangled-name> ::= _Z <encoding>
    //                ::= <type>
    // extension      ::= ___Z <encoding> _block_invoke
    // extension      ::= ___Z <encoding> _block_invoke<decimal-digit>+
    // extension      ::= ___Z <encoding> _block_invoke_<decimal-digit>+
    pub(crate) fn parse_mangled_name(&mut self) -> Result<NodeId> {
        log!("parse_mangled_name: {:?}", self.input);

        if self.eat_str(b"_Z") || self.eat_str(b"__Z") {
            let mut encoding = self.parse_encoding()?;
            if self.look(0) == b'.' {
                let start = self.input.index();
                let end = start + self.num_left();
                self.input.advance(self.num_left());
                encoding = self.make(Node::DotSuffix {
                    prefix: encoding,
                    suffix: Text::Input { start, end },
                });
            }
            if self.num_left() != 0 {
                return self.fail();
            }
            debug_assert!(self.names.is_empty());
            return Ok(encoding);
        }

        if self.eat_str(b"___Z") || self.eat_str(b"____Z") {
            let encoding = self.parse_encoding()?;
            if !self.eat_str(b"_block_invoke") {
                return self.fail();
            }
            let require_number = self.eat(b'_');
            if self.parse_number(false).is_empty() && require_number {
                return self.fail();
            }
            if self.look(0) == b'.' {
                self.input.advance(self.num_left());
            }
            if self.num_left() != 0 {
                return self.fail();
            }
            return Ok(self.make(Node::SpecialName {
                special: "invocation function for block in ",
                child: encoding,
            }));
        }

        let ty = self.parse_type()?;
        if self.num_left() != 0 {
            return self.fail();
        }
        Ok(ty)
    }

    // <encoding> ::= <function name> <bare-function-type>
    //            ::= <data name>
    //            ::= <special-name>
    fn parse_encoding(&mut self) -> Result<NodeId> {
        // The template parameters of an encoding are unrelated to those of
        // the enclosing context.
        let saved_template_params = mem::replace(&mut self.template_params, Vec::new());
        let result = self.parse_encoding_inner();
        self.template_params = saved_template_params;
        result
    }

    fn parse_encoding_inner(&mut self) -> Result<NodeId> {
        log!("parse_encoding: {:?}", self.input);

        if self.look(0) == b'G' || self.look(0) == b'T' {
            return self.parse_special_name();
        }

        let mut name_info = NameState::new(self);
        let name = self.parse_name(Some(&mut name_info))?;
        self.resolve_forward_template_refs(&name_info)?;

        if self.is_end_of_encoding() {
            return Ok(name);
        }

        let mut attrs = None;
        if self.eat_str(b"Ua9enable_ifI") {
            let before_args = self.names.len();
            while !self.eat(b'E') {
                let arg = self.parse_template_arg()?;
                self.names.push(arg);
            }
            let conditions = self.pop_trailing_node_array(before_args);
            attrs = Some(self.make(Node::EnableIfAttr { conditions }));
        }

        let mut ret = None;
        if !name_info.ctor_dtor_conversion && name_info.ends_with_template_args {
            ret = Some(self.parse_type()?);
        }

        if self.eat(b'v') {
            return Ok(self.make(Node::FunctionEncoding {
                ret,
                name,
                params: Vec::new(),
                attrs,
                cv_quals: name_info.cv_qualifiers,
                ref_qual: name_info.reference_qualifier,
            }));
        }

        let params_begin = self.names.len();
        loop {
            let ty = self.parse_type()?;
            self.names.push(ty);
            if self.is_end_of_encoding() {
                break;
            }
        }
        let params = self.pop_trailing_node_array(params_begin);
        Ok(self.make(Node::FunctionEncoding {
            ret,
            name,
            params,
            attrs,
            cv_quals: name_info.cv_qualifiers,
            ref_qual: name_info.reference_qualifier,
        }))
    }

    /// The set of chars that can follow an `<encoding>`, none of which can
    /// start a `<type>`. Enumerating these avoids speculative parsing.
    fn is_end_of_encoding(&self) -> bool {
        self.num_left() == 0 || matches!(self.look(0), b'E' | b'.' | b'_')
    }

    fn resolve_forward_template_refs(&mut self, state: &NameState) -> Result<()> {
        let begin = state.forward_template_refs_begin;
        for i in begin..self.forward_template_refs.len() {
            let fwd = self.forward_template_refs[i];
            let index = match *self.arena.get(fwd) {
                Node::ForwardTemplateReference { index, .. } => index,
                _ => unreachable!("only forward refs are recorded"),
            };
            let target = self
                .template_params
                .get(0)
                .and_then(|scope| scope.as_ref())
                .and_then(|scope| scope.get(index).copied());
            match target {
                Some(t) => self.arena.resolve_forward_ref(fwd, t),
                None => return Err(ErrorKind::ForwardTemplateArgReference.into()),
            }
        }
        self.forward_template_refs.truncate(begin);
        Ok(())
    }

    // -- names --

    // <name> ::= <nested-name>
    //        ::= <local-name>
    //        ::= <unscoped-template-name> <template-args>
    //        ::= <unscoped-name>
    fn parse_name(&mut self, state: Option<&mut NameState>) -> Result<NodeId> {
        self.recurse(|p| p.parse_name_inner(state))
    }

    fn parse_name_inner(&mut self, mut state: Option<&mut NameState>) -> Result<NodeId> {
        log!("parse_name: {:?}", self.input);

        if self.look(0) == b'N' {
            return self.parse_nested_name(state);
        }
        if self.look(0) == b'Z' {
            return self.parse_local_name(state);
        }

        let mut is_subst = false;
        let result = self.parse_unscoped_name(state.as_deref_mut(), Some(&mut is_subst))?;

        if self.look(0) == b'I' {
            //        ::= <unscoped-template-name> <template-args>
            if !is_subst {
                // An unscoped-template-name is substitutable.
                self.subs.insert(result);
            }
            let template_args = self.parse_template_args(state.is_some())?;
            if let Some(s) = state {
                s.ends_with_template_args = true;
            }
            Ok(self.make(Node::NameWithTemplateArgs {
                name: result,
                template_args,
            }))
        } else if is_subst {
            // The substitution case must be followed by <template-args>.
            self.fail()
        } else {
            Ok(result)
        }
    }

    // <local-name> := Z <function encoding> E <entity name> [<discriminator>]
    //              := Z <function encoding> E s [<discriminator>]
    //              := Z <function encoding> Ed [ <parameter number> ] _ <entity name>
    fn parse_local_name(&mut self, state: Option<&mut NameState>) -> Result<NodeId> {
        if !self.eat(b'Z') {
            return self.fail();
        }
        let encoding = self.parse_encoding()?;
        if !self.eat(b'E') {
            return self.fail();
        }

        if self.eat(b's') {
            self.parse_discriminator();
            let entity = self.make(Node::NameType {
                name: Text::Fixed("string literal"),
            });
            return Ok(self.make(Node::LocalName { encoding, entity }));
        }

        if self.eat(b'd') {
            self.parse_number(true);
            if !self.eat(b'_') {
                return self.fail();
            }
            let entity = self.parse_name(state)?;
            return Ok(self.make(Node::LocalName { encoding, entity }));
        }

        let entity = self.parse_name(state)?;
        self.parse_discriminator();
        Ok(self.make(Node::LocalName { encoding, entity }))
    }

    // <unscoped-name> ::= <unqualified-name>
    //                 ::= St <unqualified-name>   # ::std::
    fn parse_unscoped_name(
        &mut self,
        state: Option<&mut NameState>,
        is_subst: Option<&mut bool>,
    ) -> Result<NodeId> {
        let mut std_node = None;
        if self.eat_str(b"St") {
            std_node = Some(self.make(Node::NameType {
                name: Text::Fixed("std"),
            }));
        }

        let mut result = None;
        let mut module = None;
        if self.look(0) == b'S' {
            let s = self.parse_substitution()?;
            if let Node::ModuleName { .. } = *self.arena.get(s) {
                module = Some(s);
            } else if let (Some(flag), None) = (is_subst, std_node) {
                result = Some(s);
                *flag = true;
            } else {
                return self.fail();
            }
        }

        match result {
            Some(r) if std_node.is_none() => Ok(r),
            _ => self.parse_unqualified_name(state, std_node, module),
        }
    }

    // <unqualified-name> ::= [<module-name>] L? <operator-name> [<abi-tags>]
    //                    ::= [<module-name>] <ctor-dtor-name> [<abi-tags>]
    //                    ::= [<module-name>] L? <source-name> [<abi-tags>]
    //                    ::= [<module-name>] L? <unnamed-type-name> [<abi-tags>]
    //                    ::= [<module-name>] L? DC <source-name>+ E  # structured binding
    fn parse_unqualified_name(
        &mut self,
        state: Option<&mut NameState>,
        scope: Option<NodeId>,
        module: Option<NodeId>,
    ) -> Result<NodeId> {
        let mut scope = scope;
        let mut module = module;
        self.parse_module_name_opt(&mut module)?;

        self.eat(b'L');

        let mut result = if self.look(0).is_ascii_digit() && self.look(0) != b'0' {
            self.parse_source_name()?
        } else if self.look(0) == b'U' {
            self.parse_unnamed_type_name(state)?
        } else if self.eat_str(b"DC") {
            let bindings_begin = self.names.len();
            loop {
                let binding = self.parse_source_name()?;
                self.names.push(binding);
                if self.eat(b'E') {
                    break;
                }
            }
            let bindings = self.pop_trailing_node_array(bindings_begin);
            self.make(Node::StructuredBindingName { bindings })
        } else if self.look(0) == b'C' || self.look(0) == b'D' {
            // A <ctor-dtor-name> names its scope.
            let mut so_far = match scope {
                Some(s) if module.is_none() => s,
                _ => return self.fail(),
            };
            let ctor = self.parse_ctor_dtor_name(&mut so_far, state)?;
            // Expanding a special substitution replaces the scope too.
            scope = Some(so_far);
            ctor
        } else {
            self.parse_operator_name(state)?
        };

        if let Some(module) = module {
            result = self.make(Node::ModuleEntity {
                module,
                name: result,
            });
        }
        result = self.parse_abi_tags(result)?;
        if let Some(qual) = scope {
            result = self.make(Node::NestedName { qual, name: result });
        }
        Ok(result)
    }

    // <module-name> ::= <module-subname>
    //               ::= <module-name> <module-subname>
    //               ::= <substitution>  # passed in by caller
    // <module-subname> ::= W <source-name>
    //                  ::= W P <source-name>
    fn parse_module_name_opt(&mut self, module: &mut Option<NodeId>) -> Result<()> {
        while self.eat(b'W') {
            let is_partition = self.eat(b'P');
            let name = self.parse_source_name()?;
            let m = self.make(Node::ModuleName {
                parent: *module,
                name,
                is_partition,
            });
            self.subs.insert(m);
            *module = Some(m);
        }
        Ok(())
    }

    // <unnamed-type-name> ::= Ut [<nonnegative number>] _
    //                     ::= <closure-type-name>
    fn parse_unnamed_type_name(&mut self, state: Option<&mut NameState>) -> Result<NodeId> {
        // <template-params> refer to the innermost <template-args>. Clear out
        // any outer args that we may have inserted into the table.
        if state.is_some() {
            self.template_params.clear();
        }

        if self.eat_str(b"Ut") {
            let count = self.parse_number(false);
            if !self.eat(b'_') {
                return self.fail();
            }
            return Ok(self.make(Node::UnnamedTypeName { count }));
        }

        if self.eat_str(b"Ul") {
            let saved_lambda_level = mem::replace(
                &mut self.parsing_lambda_params_at_level,
                Some(self.template_params.len()),
            );
            let saved_len = self.template_params.len();
            self.template_params.push(Some(Vec::new()));

            let result = self.parse_closure_type_name();

            self.template_params.truncate(saved_len);
            self.parsing_lambda_params_at_level = saved_lambda_level;
            return result;
        }

        if self.eat_str(b"Ub") {
            self.parse_number(false);
            if !self.eat(b'_') {
                return self.fail();
            }
            return Ok(self.make(Node::NameType {
                name: Text::Fixed("'block-literal'"),
            }));
        }

        self.fail()
    }

    // <closure-type-name> ::= Ul <lambda-sig> E [ <nonnegative number> ] _
    // <lambda-sig> ::= <template-param-decl>* <parameter type>+
    //               # or "v" if the lambda has no parameters
    fn parse_closure_type_name(&mut self) -> Result<NodeId> {
        let params_begin = self.names.len();
        while self.look(0) == b'T' && matches!(self.look(1), b'y' | b'p' | b't' | b'n') {
            let decl = self.parse_template_param_decl()?;
            self.names.push(decl);
        }
        let template_params = self.pop_trailing_node_array(params_begin);

        // A lambda without explicit template parameters gets its scope
        // created lazily, when an `auto` parameter first refers to it.
        if template_params.is_empty() {
            self.template_params.pop();
        }

        if !self.eat_str(b"vE") {
            loop {
                let param = self.parse_type()?;
                self.names.push(param);
                if self.eat(b'E') {
                    break;
                }
            }
        }
        let params = self.pop_trailing_node_array(params_begin);

        let count = self.parse_number(false);
        if !self.eat(b'_') {
            return self.fail();
        }
        Ok(self.make(Node::ClosureTypeName {
            template_params,
            params,
            count,
        }))
    }

    // <source-name> ::= <positive length number> <identifier>
    fn parse_source_name(&mut self) -> Result<NodeId> {
        let length = self.parse_positive_integer()?;
        if self.num_left() < length || length == 0 {
            return self.fail();
        }
        let start = self.input.index();
        self.input.advance(length);
        let name = Text::Input {
            start,
            end: start + length,
        };
        if self.text_bytes(name).starts_with(b"_GLOBAL__N") {
            return Ok(self.make(Node::NameType {
                name: Text::Fixed("(anonymous namespace)"),
            }));
        }
        Ok(self.make(Node::NameType { name }))
    }

    // <operator-name> ::= See the operator table
    //                 ::= li <source-name>          # operator ""
    //                 ::= v <digit> <source-name>   # vendor extended operator
    fn parse_operator_name(&mut self, state: Option<&mut NameState>) -> Result<NodeId> {
        if let Some(op) = self.parse_operator_encoding() {
            if op.kind == OperatorKind::CCast {
                //              ::= cv <type>    # (cast)
                let saved_try = mem::replace(&mut self.try_to_parse_template_args, false);
                // Inside an encoding, the conversion operator's <type> may
                // contain a <template-param> referring to <template-arg>s
                // further ahead in the mangled name.
                let saved_permit = self.permit_forward_template_references;
                self.permit_forward_template_references = saved_permit || state.is_some();
                let ty = self.parse_type();
                self.try_to_parse_template_args = saved_try;
                self.permit_forward_template_references = saved_permit;
                let ty = ty?;

                if let Some(s) = state {
                    s.ctor_dtor_conversion = true;
                }
                return Ok(self.make(Node::ConversionOperatorType { ty }));
            }

            if !op.is_nameable() {
                return self.fail();
            }
            if op.kind == OperatorKind::Member && !op.flag {
                // Not a nameable member access.
                return self.fail();
            }
            return Ok(self.make(Node::NameType {
                name: Text::Fixed(op.name),
            }));
        }

        if self.eat_str(b"li") {
            let op_name = self.parse_source_name()?;
            return Ok(self.make(Node::LiteralOperator { op_name }));
        }

        if self.eat(b'v') {
            if self.look(0).is_ascii_digit() {
                self.input.advance(1);
                let ty = self.parse_source_name()?;
                return Ok(self.make(Node::ConversionOperatorType { ty }));
            }
            return self.fail();
        }

        self.fail()
    }

    // <ctor-dtor-name> ::= C1 | C2 | C3 | C4 | C5   # constructors
    //                  ::= CI1 <name> | CI2 <name>  # inheriting constructors
    //                  ::= D0 | D1 | D2 | D4 | D5   # destructors
    fn parse_ctor_dtor_name(
        &mut self,
        so_far: &mut NodeId,
        mut state: Option<&mut NameState>,
    ) -> Result<NodeId> {
        if let Node::SpecialSubstitution { kind } = *self.arena.get(*so_far) {
            // Constructor name position forces the expanded form.
            *so_far = self.make(Node::ExpandedSpecialSubstitution { kind });
        }

        if self.eat(b'C') {
            let is_inherited = self.eat(b'I');
            let variant = self.look(0);
            if !(b'1'..=b'5').contains(&variant) {
                return self.fail();
            }
            self.input.advance(1);
            if let Some(s) = state.as_deref_mut() {
                s.ctor_dtor_conversion = true;
            }
            if is_inherited {
                self.parse_name(state)?;
            }
            return Ok(self.make(Node::CtorDtorName {
                basename: *so_far,
                is_dtor: false,
                variant: variant - b'0',
            }));
        }

        if self.look(0) == b'D' && matches!(self.look(1), b'0' | b'1' | b'2' | b'4' | b'5') {
            let variant = self.look(1) - b'0';
            self.input.advance(2);
            if let Some(s) = state {
                s.ctor_dtor_conversion = true;
            }
            return Ok(self.make(Node::CtorDtorName {
                basename: *so_far,
                is_dtor: true,
                variant,
            }));
        }

        self.fail()
    }

    // <nested-name> ::= N [<CV-Qualifiers>] [<ref-qualifier>] <prefix> <unqualified-name> E
    //               ::= N [<CV-Qualifiers>] [<ref-qualifier>] <template-prefix> <template-args> E
    //
    // <prefix> ::= <prefix> <unqualified-name>
    //          ::= <template-prefix> <template-args>
    //          ::= <template-param>
    //          ::= <decltype>
    //          ::= # empty
    //          ::= <substitution>
    //          ::= <prefix> <data-member-prefix>
    fn parse_nested_name(&mut self, mut state: Option<&mut NameState>) -> Result<NodeId> {
        if !self.eat(b'N') {
            return self.fail();
        }

        let cv = self.parse_cv_qualifiers();
        if let Some(s) = state.as_deref_mut() {
            s.cv_qualifiers = cv;
        }
        let ref_qual = if self.eat(b'O') {
            FunctionRefQual::RValue
        } else if self.eat(b'R') {
            FunctionRefQual::LValue
        } else {
            FunctionRefQual::None
        };
        if let Some(s) = state.as_deref_mut() {
            s.reference_qualifier = ref_qual;
        }

        let mut so_far: Option<NodeId> = None;
        while !self.eat(b'E') {
            // Only the template-args case below may leave this set.
            if let Some(s) = state.as_deref_mut() {
                s.ends_with_template_args = false;
            }

            if self.look(0) == b'T' {
                //          ::= <template-param>
                if so_far.is_some() {
                    return self.fail(); // Cannot have a prefix.
                }
                so_far = Some(self.parse_template_param()?);
            } else if self.look(0) == b'I' {
                //          ::= <template-prefix> <template-args>
                let prefix = match so_far {
                    Some(p) => p,
                    None => return self.fail(), // Must have a prefix.
                };
                let template_args = self.parse_template_args(state.is_some())?;
                if let Node::NameWithTemplateArgs { .. } = *self.arena.get(prefix) {
                    // <template-args> <template-args> cannot be generated by
                    // a C++ entity; there is always a name between them.
                    return self.fail();
                }
                if let Some(s) = state.as_deref_mut() {
                    s.ends_with_template_args = true;
                }
                so_far = Some(self.make(Node::NameWithTemplateArgs {
                    name: prefix,
                    template_args,
                }));
            } else if self.look(0) == b'D' && (self.look(1) == b't' || self.look(1) == b'T') {
                //          ::= <decltype>
                if so_far.is_some() {
                    return self.fail(); // Cannot have a prefix.
                }
                so_far = Some(self.parse_decltype()?);
            } else {
                let mut module = None;

                if self.look(0) == b'S' {
                    //          ::= <substitution>
                    let s = if self.look(1) == b't' {
                        self.input.advance(2);
                        self.make(Node::NameType {
                            name: Text::Fixed("std"),
                        })
                    } else {
                        self.parse_substitution()?
                    };
                    if let Node::ModuleName { .. } = *self.arena.get(s) {
                        module = Some(s);
                    } else if so_far.is_some() {
                        return self.fail(); // Cannot have a prefix.
                    } else {
                        so_far = Some(s);
                        continue; // Do not push a new substitution.
                    }
                }

                //          ::= [<prefix>] <unqualified-name>
                so_far = Some(self.parse_unqualified_name(state.as_deref_mut(), so_far, module)?);
            }

            match so_far {
                Some(part) => {
                    self.subs.insert(part);
                }
                None => return self.fail(),
            }

            // No longer used.
            // <data-member-prefix> := <member source-name> [<template-args>] M
            self.eat(b'M');
        }

        let result = match so_far {
            Some(r) if !self.subs.is_empty() => r,
            _ => return self.fail(),
        };
        // The complete nested name is not a substitution candidate when it is
        // about to be chosen as the encoding's name.
        self.subs.pop();
        Ok(result)
    }

    // <simple-id> ::= <source-name> [ <template-args> ]
    fn parse_simple_id(&mut self) -> Result<NodeId> {
        let name = self.parse_source_name()?;
        if self.look(0) == b'I' {
            let template_args = self.parse_template_args(false)?;
            return Ok(self.make(Node::NameWithTemplateArgs {
                name,
                template_args,
            }));
        }
        Ok(name)
    }

    // <destructor-name> ::= <unresolved-type>  # e.g., ~T or ~decltype(f())
    //                   ::= <simple-id>        # e.g., ~A<2*N>
    fn parse_destructor_name(&mut self) -> Result<NodeId> {
        let base = if self.look(0).is_ascii_digit() {
            self.parse_simple_id()?
        } else {
            self.parse_unresolved_type()?
        };
        Ok(self.make(Node::DtorName { base }))
    }

    // <unresolved-type> ::= <template-param>
    //                   ::= <decltype>
    //                   ::= <substitution>
    fn parse_unresolved_type(&mut self) -> Result<NodeId> {
        if self.look(0) == b'T' {
            let param = self.parse_template_param()?;
            self.subs.insert(param);
            return Ok(param);
        }
        if self.look(0) == b'D' {
            let decltype = self.parse_decltype()?;
            self.subs.insert(decltype);
            return Ok(decltype);
        }
        self.parse_substitution()
    }

    // <base-unresolved-name> ::= <simple-id>
    //                        ::= on <operator-name> [<template-args>]
    //                        ::= dn <destructor-name>
    fn parse_base_unresolved_name(&mut self) -> Result<NodeId> {
        if self.look(0).is_ascii_digit() {
            return self.parse_simple_id();
        }

        if self.eat_str(b"dn") {
            return self.parse_destructor_name();
        }

        self.eat_str(b"on");

        let oper = self.parse_operator_name(None)?;
        if self.look(0) == b'I' {
            let template_args = self.parse_template_args(false)?;
            return Ok(self.make(Node::NameWithTemplateArgs {
                name: oper,
                template_args,
            }));
        }
        Ok(oper)
    }

    // <unresolved-name>
    //     ::= [gs] <base-unresolved-name>
    //     ::= sr <unresolved-type> [<template-args>] <base-unresolved-name>
    //     ::= srN <unresolved-type> [<template-args>] <unresolved-qualifier-level>* E
    //         <base-unresolved-name>
    //     ::= [gs] sr <unresolved-qualifier-level>+ E <base-unresolved-name>
    fn parse_unresolved_name(&mut self, global: bool) -> Result<NodeId> {
        if self.eat_str(b"srN") {
            let mut so_far = self.parse_unresolved_type()?;

            if self.look(0) == b'I' {
                let template_args = self.parse_template_args(false)?;
                so_far = self.make(Node::NameWithTemplateArgs {
                    name: so_far,
                    template_args,
                });
            }

            while !self.eat(b'E') {
                let qual = self.parse_simple_id()?;
                so_far = self.make(Node::QualifiedName {
                    qualifier: so_far,
                    name: qual,
                });
            }

            let base = self.parse_base_unresolved_name()?;
            return Ok(self.make(Node::QualifiedName {
                qualifier: so_far,
                name: base,
            }));
        }

        if !self.eat_str(b"sr") {
            // [gs] <base-unresolved-name>
            let mut so_far = self.parse_base_unresolved_name()?;
            if global {
                so_far = self.make(Node::GlobalQualifiedName { child: so_far });
            }
            return Ok(so_far);
        }

        let mut so_far: Option<NodeId> = None;
        if self.look(0).is_ascii_digit() {
            // [gs] sr <unresolved-qualifier-level>+ E <base-unresolved-name>
            loop {
                let qual = self.parse_simple_id()?;
                so_far = Some(match so_far {
                    Some(prev) => self.make(Node::QualifiedName {
                        qualifier: prev,
                        name: qual,
                    }),
                    None if global => self.make(Node::GlobalQualifiedName { child: qual }),
                    None => qual,
                });
                if self.eat(b'E') {
                    break;
                }
            }
        } else {
            // sr <unresolved-type> [<template-args>] <base-unresolved-name>
            let mut ty = self.parse_unresolved_type()?;
            if self.look(0) == b'I' {
                let template_args = self.parse_template_args(false)?;
                ty = self.make(Node::NameWithTemplateArgs {
                    name: ty,
                    template_args,
                });
            }
            so_far = Some(ty);
        }

        let qualifier = match so_far {
            Some(q) => q,
            None => return self.fail(),
        };
        let base = self.parse_base_unresolved_name()?;
        Ok(self.make(Node::QualifiedName {
            qualifier,
            name: base,
        }))
    }

    // <abi-tags> ::= <abi-tag> [<abi-tags>]
    // <abi-tag> ::= B <source-name>
    fn parse_abi_tags(&mut self, node: NodeId) -> Result<NodeId> {
        let mut node = node;
        while self.eat(b'B') {
            let tag = self.parse_bare_source_name()?;
            node = self.make(Node::AbiTagAttr { base: node, tag });
        }
        Ok(node)
    }

    // -- types --

    // <function-type> ::= [<CV-qualifiers>] [<exception-spec>] [Dx] F [Y]
    //                     <bare-function-type> [<ref-qualifier>] E
    //
    // <exception-spec> ::= Do                # noexcept / throw()
    //                  ::= DO <expression> E # computed noexcept
    //                  ::= Dw <type>+ E      # dynamic exception specification
    fn parse_function_type(&mut self) -> Result<NodeId> {
        let cv_quals = self.parse_cv_qualifiers();

        let mut exception_spec = None;
        if self.eat_str(b"Do") {
            exception_spec = Some(self.make(Node::NameType {
                name: Text::Fixed("noexcept"),
            }));
        } else if self.eat_str(b"DO") {
            let expr = self.parse_expr()?;
            if !self.eat(b'E') {
                return self.fail();
            }
            exception_spec = Some(self.make(Node::NoexceptSpec { expr }));
        } else if self.eat_str(b"Dw") {
            let specs_begin = self.names.len();
            while !self.eat(b'E') {
                let ty = self.parse_type()?;
                self.names.push(ty);
            }
            let types = self.pop_trailing_node_array(specs_begin);
            exception_spec = Some(self.make(Node::DynamicExceptionSpec { types }));
        }

        self.eat_str(b"Dx"); // transaction safe

        if !self.eat(b'F') {
            return self.fail();
        }
        self.eat(b'Y'); // extern "C"
        let ret = self.parse_type()?;

        let mut ref_qual = FunctionRefQual::None;
        let params_begin = self.names.len();
        loop {
            if self.eat(b'E') {
                break;
            }
            if self.eat(b'v') {
                continue;
            }
            if self.eat_str(b"RE") {
                ref_qual = FunctionRefQual::LValue;
                break;
            }
            if self.eat_str(b"OE") {
                ref_qual = FunctionRefQual::RValue;
                break;
            }
            let ty = self.parse_type()?;
            self.names.push(ty);
        }
        let params = self.pop_trailing_node_array(params_begin);

        Ok(self.make(Node::FunctionType {
            ret,
            params,
            cv_quals,
            ref_qual,
            exception_spec,
        }))
    }

    // <vector-type> ::= Dv <positive dimension number> _ <extended element type>
    //               ::= Dv [<dimension expression>] _ <element type>
    // <extended element type> ::= <element type>
    //                         ::= p    # AltiVec vector pixel
    fn parse_vector_type(&mut self) -> Result<NodeId> {
        if !self.eat_str(b"Dv") {
            return self.fail();
        }

        if self.look(0).is_ascii_digit() && self.look(0) != b'0' {
            let number = self.parse_number(false);
            let dimension = self.make(Node::NameType { name: number });
            if !self.eat(b'_') {
                return self.fail();
            }
            if self.eat(b'p') {
                return Ok(self.make(Node::PixelVectorType { dimension }));
            }
            let base_type = self.parse_type()?;
            return Ok(self.make(Node::VectorType {
                base_type,
                dimension: Some(dimension),
            }));
        }

        if !self.eat(b'_') {
            let dimension = self.parse_expr()?;
            if !self.eat(b'_') {
                return self.fail();
            }
            let base_type = self.parse_type()?;
            return Ok(self.make(Node::VectorType {
                base_type,
                dimension: Some(dimension),
            }));
        }

        let base_type = self.parse_type()?;
        Ok(self.make(Node::VectorType {
            base_type,
            dimension: None,
        }))
    }

    // <decltype> ::= Dt <expression> E  # decltype of an id-expression or member access
    //            ::= DT <expression> E  # decltype of an expression
    fn parse_decltype(&mut self) -> Result<NodeId> {
        if !self.eat(b'D') {
            return self.fail();
        }
        if !self.eat(b't') && !self.eat(b'T') {
            return self.fail();
        }
        let infix = self.parse_expr()?;
        if !self.eat(b'E') {
            return self.fail();
        }
        Ok(self.make(Node::EnclosingExpr {
            prefix: "decltype",
            infix,
            prec: Prec::Primary,
        }))
    }

    // <array-type> ::= A <positive dimension number> _ <element type>
    //              ::= A [<dimension expression>] _ <element type>
    fn parse_array_type(&mut self) -> Result<NodeId> {
        if !self.eat(b'A') {
            return self.fail();
        }

        let mut dimension = None;
        if self.look(0).is_ascii_digit() {
            let number = self.parse_number(false);
            dimension = Some(self.make(Node::NameType { name: number }));
            if !self.eat(b'_') {
                return self.fail();
            }
        } else if !self.eat(b'_') {
            let expr = self.parse_expr()?;
            if !self.eat(b'_') {
                return self.fail();
            }
            dimension = Some(expr);
        }

        let base = self.parse_type()?;
        Ok(self.make(Node::ArrayType { base, dimension }))
    }

    // <pointer-to-member-type> ::= M <class type> <member type>
    fn parse_pointer_to_member_type(&mut self) -> Result<NodeId> {
        if !self.eat(b'M') {
            return self.fail();
        }
        let class_type = self.parse_type()?;
        let member_type = self.parse_type()?;
        Ok(self.make(Node::PointerToMemberType {
            class_type,
            member_type,
        }))
    }

    // <class-enum-type> ::= <name>
    //                   ::= Ts <name>  # elaborated type specifier: 'struct' or 'class'
    //                   ::= Tu <name>  # 'union'
    //                   ::= Te <name>  # 'enum'
    fn parse_class_enum_type(&mut self) -> Result<NodeId> {
        let elab_spef = if self.eat_str(b"Ts") {
            Some("struct")
        } else if self.eat_str(b"Tu") {
            Some("union")
        } else if self.eat_str(b"Te") {
            Some("enum")
        } else {
            None
        };

        let name = self.parse_name(None)?;

        if let Some(kind) = elab_spef {
            return Ok(self.make(Node::ElaboratedTypeSpefType { kind, child: name }));
        }
        Ok(name)
    }

    // <qualified-type> ::= <qualifiers> <type>
    // <qualifiers> ::= <extended-qualifier>* <CV-qualifiers>
    // <extended-qualifier> ::= U <source-name> [<template-args>]
    fn parse_qualified_type(&mut self) -> Result<NodeId> {
        if self.eat(b'U') {
            let qual = self.parse_bare_source_name()?;

            // extension ::= U <objc-name> <objc-type>  # objc-type<identifier>
            if self.text_bytes(qual).starts_with(b"objcproto") {
                // The protocol's <source-name> lives inside the qualifier's
                // own bytes; parse it from there.
                let (start, end) = match qual {
                    Text::Input { start, end } => (start, end),
                    Text::Fixed(_) => unreachable!("bare source names point into the input"),
                };
                let inner = IndexStr::new(&self.original[..end]).range_from(start + 9..);
                let saved = mem::replace(&mut self.input, inner);
                let proto = self.parse_bare_source_name();
                self.input = saved;
                let protocol = proto?;

                let ty = self.parse_qualified_type()?;
                return Ok(self.make(Node::ObjCProtoName { ty, protocol }));
            }

            let mut template_args = None;
            if self.look(0) == b'I' {
                template_args = Some(self.parse_template_args(false)?);
            }

            let ty = self.parse_qualified_type()?;
            return Ok(self.make(Node::VendorExtQualType {
                ty,
                ext: qual,
                template_args,
            }));
        }

        let quals = self.parse_cv_qualifiers();
        let ty = self.parse_type()?;
        if !quals.is_empty() {
            return Ok(self.make(Node::QualType { child: ty, quals }));
        }
        Ok(ty)
    }

    // <type> ::= <builtin-type>
    //        ::= <qualified-type>
    //        ::= <function-type>
    //        ::= <class-enum-type>
    //        ::= <array-type>
    //        ::= <pointer-to-member-type>
    //        ::= <template-param>
    //        ::= <template-template-param> <template-args>
    //        ::= <decltype>
    //        ::= P <type>        # pointer
    //        ::= R <type>        # l-value reference
    //        ::= O <type>        # r-value reference
    //        ::= C <type>        # complex pair
    //        ::= G <type>        # imaginary
    //        ::= <substitution>
    fn parse_type(&mut self) -> Result<NodeId> {
        self.recurse(|p| p.parse_type_inner())
    }

    fn parse_type_inner(&mut self) -> Result<NodeId> {
        log!("parse_type: {:?}", self.input);

        let builtin = |p: &mut Self, consume: usize, name: &'static str| {
            p.input.advance(consume);
            Ok(p.make(Node::NameType {
                name: Text::Fixed(name),
            }))
        };

        let result = match self.look(0) {
            //        ::= <qualified-type>
            b'r' | b'V' | b'K' => {
                let mut after_quals = 0;
                if self.look(after_quals) == b'r' {
                    after_quals += 1;
                }
                if self.look(after_quals) == b'V' {
                    after_quals += 1;
                }
                if self.look(after_quals) == b'K' {
                    after_quals += 1;
                }

                if self.look(after_quals) == b'F'
                    || (self.look(after_quals) == b'D'
                        && matches!(self.look(after_quals + 1), b'o' | b'O' | b'w' | b'x'))
                {
                    self.parse_function_type()?
                } else {
                    self.parse_qualified_type()?
                }
            }
            b'U' => self.parse_qualified_type()?,

            // <builtin-type>s never enter the substitution table.
            b'v' => return builtin(self, 1, "void"),
            b'w' => return builtin(self, 1, "wchar_t"),
            b'b' => return builtin(self, 1, "bool"),
            b'c' => return builtin(self, 1, "char"),
            b'a' => return builtin(self, 1, "signed char"),
            b'h' => return builtin(self, 1, "unsigned char"),
            b's' => return builtin(self, 1, "short"),
            b't' => return builtin(self, 1, "unsigned short"),
            b'i' => return builtin(self, 1, "int"),
            b'j' => return builtin(self, 1, "unsigned int"),
            b'l' => return builtin(self, 1, "long"),
            b'm' => return builtin(self, 1, "unsigned long"),
            b'x' => return builtin(self, 1, "long long"),
            b'y' => return builtin(self, 1, "unsigned long long"),
            b'n' => return builtin(self, 1, "__int128"),
            b'o' => return builtin(self, 1, "unsigned __int128"),
            b'f' => return builtin(self, 1, "float"),
            b'd' => return builtin(self, 1, "double"),
            b'e' => return builtin(self, 1, "long double"),
            b'g' => return builtin(self, 1, "__float128"),
            b'z' => return builtin(self, 1, "..."),

            // <builtin-type> ::= u <source-name>    # vendor extended type
            //
            // Unlike the primitive builtins, vendor extended builtins are
            // substitution candidates (Itanium C++ ABI 5.9.1).
            b'u' => {
                self.input.advance(1);
                let name = self.parse_bare_source_name()?;
                self.make(Node::NameType { name })
            }

            b'D' => match self.look(1) {
                //        ::= DB <number> _    # signed _BitInt(N)
                //        ::= DB <instantiation-dependent expression> _
                //        ::= DU <number> _    # unsigned _BitInt(N)
                //        ::= DU <instantiation-dependent expression> _
                b'B' | b'U' => {
                    let signed = self.look(1) == b'B';
                    self.input.advance(2);
                    let size = if self.look(0).is_ascii_digit() {
                        let number = self.parse_number(false);
                        self.make(Node::NameType { name: number })
                    } else {
                        self.parse_expr()?
                    };
                    if !self.eat(b'_') {
                        return self.fail();
                    }
                    return Ok(self.make(Node::BitIntType { size, signed }));
                }
                b'i' => return builtin(self, 2, "char32_t"),
                b's' => return builtin(self, 2, "char16_t"),
                b'u' => return builtin(self, 2, "char8_t"),
                b'a' => return builtin(self, 2, "auto"),
                b'c' => return builtin(self, 2, "decltype(auto)"),
                b'n' => return builtin(self, 2, "std::nullptr_t"),
                b'd' => return builtin(self, 2, "decimal64"),
                b'e' => return builtin(self, 2, "decimal128"),
                b'f' => return builtin(self, 2, "decimal32"),
                b'h' => return builtin(self, 2, "half"),

                //        ::= <decltype>
                b't' | b'T' => self.parse_decltype()?,

                //        ::= <vector-type>   # starts with Dv
                b'v' => self.parse_vector_type()?,

                //        ::= Dp <type>       # pack expansion
                b'p' => {
                    self.input.advance(2);
                    let child = self.parse_type()?;
                    self.make(Node::ParameterPackExpansion { child })
                }

                // Exception specifier or transaction-safe marker on a
                // function type.
                b'o' | b'O' | b'w' | b'x' => self.parse_function_type()?,

                _ => return self.fail(),
            },

            //        ::= <function-type>
            b'F' => self.parse_function_type()?,
            //        ::= <array-type>
            b'A' => self.parse_array_type()?,
            //        ::= <pointer-to-member-type>
            b'M' => self.parse_pointer_to_member_type()?,

            //        ::= <template-param>
            b'T' => {
                // This could be an elaborated type specifier on a
                // <class-enum-type>.
                if matches!(self.look(1), b's' | b'u' | b'e') {
                    self.parse_class_enum_type()?
                } else {
                    let param = self.parse_template_param()?;

                    // <template-template-param> <template-args>, if some
                    // <template-args> follow and we may parse them.
                    if self.try_to_parse_template_args && self.look(0) == b'I' {
                        let template_args = self.parse_template_args(false)?;
                        self.make(Node::NameWithTemplateArgs {
                            name: param,
                            template_args,
                        })
                    } else {
                        param
                    }
                }
            }

            //        ::= P <type>        # pointer
            b'P' => {
                self.input.advance(1);
                let pointee = self.parse_type()?;
                self.make(Node::PointerType { pointee })
            }
            //        ::= R <type>        # l-value reference
            b'R' => {
                self.input.advance(1);
                let pointee = self.parse_type()?;
                self.make(Node::ReferenceType {
                    pointee,
                    kind: ReferenceKind::LValue,
                })
            }
            //        ::= O <type>        # r-value reference
            b'O' => {
                self.input.advance(1);
                let pointee = self.parse_type()?;
                self.make(Node::ReferenceType {
                    pointee,
                    kind: ReferenceKind::RValue,
                })
            }
            //        ::= C <type>        # complex pair
            b'C' => {
                self.input.advance(1);
                let ty = self.parse_type()?;
                self.make(Node::PostfixQualifiedType {
                    ty,
                    postfix: " complex",
                })
            }
            //        ::= G <type>        # imaginary
            b'G' => {
                self.input.advance(1);
                let ty = self.parse_type()?;
                self.make(Node::PostfixQualifiedType {
                    ty,
                    postfix: " imaginary",
                })
            }

            //        ::= <substitution>
            b'S' if self.look(1) != b't' => {
                let mut is_subst = false;
                let sub = self.parse_unscoped_name(None, Some(&mut is_subst))?;

                // The substitution can also be a <template-template-param>;
                // some following <template-args> select that production.
                if self.look(0) == b'I' && (!is_subst || self.try_to_parse_template_args) {
                    if !is_subst {
                        self.subs.insert(sub);
                    }
                    let template_args = self.parse_template_args(false)?;
                    self.make(Node::NameWithTemplateArgs {
                        name: sub,
                        template_args,
                    })
                } else if is_subst {
                    // A bare substitution is not re-inserted into the table.
                    return Ok(sub);
                } else {
                    sub
                }
            }

            //        ::= <class-enum-type>
            _ => self.parse_class_enum_type()?,
        };

        // All <builtin-type>s and bare <substitution>s returned early; every
        // other parsed type becomes a substitution candidate.
        self.subs.insert(result);
        Ok(result)
    }

    // -- expressions --

    fn parse_prefix_expr(&mut self, prefix: &'static str, prec: Prec) -> Result<NodeId> {
        let child = self.parse_expr()?;
        Ok(self.make(Node::PrefixExpr {
            prefix,
            child,
            prec,
        }))
    }

    fn parse_binary_expr(&mut self, infix: &'static str, prec: Prec) -> Result<NodeId> {
        let lhs = self.parse_expr()?;
        let rhs = self.parse_expr()?;
        Ok(self.make(Node::BinaryExpr {
            lhs,
            infix,
            rhs,
            prec,
        }))
    }

    fn parse_integer_literal(&mut self, ty: &'static str) -> Result<NodeId> {
        let value = self.parse_number(true);
        if !value.is_empty() && self.eat(b'E') {
            return Ok(self.make(Node::IntegerLiteral { ty, value }));
        }
        self.fail()
    }

    // <function-param> ::= fp <top-level CV-Qualifiers> _
    //                  ::= fp <top-level CV-Qualifiers> <number> _
    //                  ::= fL <number> p <top-level CV-Qualifiers> [<number>] _
    //                  ::= fpT    # 'this' expression
    fn parse_function_param(&mut self) -> Result<NodeId> {
        if self.eat_str(b"fpT") {
            return Ok(self.make(Node::NameType {
                name: Text::Fixed("this"),
            }));
        }
        if self.eat_str(b"fp") {
            self.parse_cv_qualifiers();
            let number = self.parse_number(false);
            if !self.eat(b'_') {
                return self.fail();
            }
            return Ok(self.make(Node::FunctionParam { number }));
        }
        if self.eat_str(b"fL") {
            if self.parse_number(false).is_empty() {
                return self.fail();
            }
            if !self.eat(b'p') {
                return self.fail();
            }
            self.parse_cv_qualifiers();
            let number = self.parse_number(false);
            if !self.eat(b'_') {
                return self.fail();
            }
            return Ok(self.make(Node::FunctionParam { number }));
        }
        self.fail()
    }

    // <expr-primary> ::= L <type> <value number> E   # integer literal
    //                ::= L <string type> E           # string literal
    //                ::= L <nullptr type> E          # nullptr literal
    //                ::= L <lambda type> E           # lambda expression
    //                ::= L <mangled-name> E          # external name
    fn parse_expr_primary(&mut self) -> Result<NodeId> {
        if !self.eat(b'L') {
            return self.fail();
        }
        match self.look(0) {
            b'w' => {
                self.input.advance(1);
                self.parse_integer_literal("wchar_t")
            }
            b'b' => {
                if self.eat_str(b"b0E") {
                    return Ok(self.make(Node::BoolExpr { value: false }));
                }
                if self.eat_str(b"b1E") {
                    return Ok(self.make(Node::BoolExpr { value: true }));
                }
                self.fail()
            }
            b'c' => {
                self.input.advance(1);
                self.parse_integer_literal("char")
            }
            b'a' => {
                self.input.advance(1);
                self.parse_integer_literal("signed char")
            }
            b'h' => {
                self.input.advance(1);
                self.parse_integer_literal("unsigned char")
            }
            b's' => {
                self.input.advance(1);
                self.parse_integer_literal("short")
            }
            b't' => {
                self.input.advance(1);
                self.parse_integer_literal("unsigned short")
            }
            b'i' => {
                self.input.advance(1);
                self.parse_integer_literal("")
            }
            b'j' => {
                self.input.advance(1);
                self.parse_integer_literal("u")
            }
            b'l' => {
                self.input.advance(1);
                self.parse_integer_literal("l")
            }
            b'm' => {
                self.input.advance(1);
                self.parse_integer_literal("ul")
            }
            b'x' => {
                self.input.advance(1);
                self.parse_integer_literal("ll")
            }
            b'y' => {
                self.input.advance(1);
                self.parse_integer_literal("ull")
            }
            b'n' => {
                self.input.advance(1);
                self.parse_integer_literal("__int128")
            }
            b'o' => {
                self.input.advance(1);
                self.parse_integer_literal("unsigned __int128")
            }
            // Floating-point literals are not rendered.
            b'f' | b'd' | b'e' | b'g' => self.fail(),
            b'_' => {
                if self.eat_str(b"_Z") {
                    let encoding = self.parse_encoding()?;
                    if self.eat(b'E') {
                        return Ok(encoding);
                    }
                }
                self.fail()
            }
            b'A' => {
                let ty = self.parse_type()?;
                // The string contents are not encoded in the mangling.
                if self.eat(b'E') {
                    return Ok(self.make(Node::StringLiteral { ty }));
                }
                self.fail()
            }
            b'D' => {
                if self.eat_str(b"Dn") {
                    self.eat(b'0');
                    if self.eat(b'E') {
                        return Ok(self.make(Node::NameType {
                            name: Text::Fixed("nullptr"),
                        }));
                    }
                }
                self.fail()
            }
            // LT… would be an invalid mangled name.
            b'T' => self.fail(),
            b'U' => {
                if self.look(1) != b'l' {
                    return self.fail();
                }
                let ty = self.parse_unnamed_type_name(None)?;
                if !self.eat(b'E') {
                    return self.fail();
                }
                Ok(self.make(Node::LambdaExpr { ty }))
            }
            _ => {
                // Might be a named (enum) type.
                let ty = self.parse_type()?;
                let integer = self.parse_number(true);
                if integer.is_empty() {
                    return self.fail();
                }
                if !self.eat(b'E') {
                    return self.fail();
                }
                Ok(self.make(Node::EnumLiteral { ty, integer }))
            }
        }
    }

    // <braced-expression> ::= <expression>
    //                     ::= di <field source-name> <braced-expression>
    //                     ::= dx <index expression> <braced-expression>
    //                     ::= dX <range begin expression> <range end expression>
    //                         <braced-expression>
    fn parse_braced_expr(&mut self) -> Result<NodeId> {
        if self.look(0) == b'd' {
            match self.look(1) {
                b'i' => {
                    self.input.advance(2);
                    let elem = self.parse_source_name()?;
                    let init = self.parse_braced_expr()?;
                    return Ok(self.make(Node::BracedExpr {
                        elem,
                        init,
                        is_array: false,
                    }));
                }
                b'x' => {
                    self.input.advance(2);
                    let elem = self.parse_expr()?;
                    let init = self.parse_braced_expr()?;
                    return Ok(self.make(Node::BracedExpr {
                        elem,
                        init,
                        is_array: true,
                    }));
                }
                b'X' => {
                    self.input.advance(2);
                    let first = self.parse_expr()?;
                    let last = self.parse_expr()?;
                    let init = self.parse_braced_expr()?;
                    return Ok(self.make(Node::BracedRangeExpr { first, last, init }));
                }
                _ => {}
            }
        }
        self.parse_expr()
    }

    // <fold-expr> ::= fL <binary-operator-name> <expression> <expression>
    //             ::= fR <binary-operator-name> <expression> <expression>
    //             ::= fl <binary-operator-name> <expression>
    //             ::= fr <binary-operator-name> <expression>
    fn parse_fold_expr(&mut self) -> Result<NodeId> {
        if !self.eat(b'f') {
            return self.fail();
        }

        let (is_left_fold, has_initializer) = match self.look(0) {
            b'L' => (true, true),
            b'R' => (false, true),
            b'l' => (true, false),
            b'r' => (false, false),
            _ => return self.fail(),
        };
        self.input.advance(1);

        let op = match self.parse_operator_encoding() {
            Some(op) => op,
            None => return self.fail(),
        };
        let is_member_star =
            op.kind == OperatorKind::Member && op.name.as_bytes().last() == Some(&b'*');
        if op.kind != OperatorKind::Binary && !is_member_star {
            return self.fail();
        }

        let mut pack = self.parse_expr()?;
        let mut init = None;
        if has_initializer {
            init = Some(self.parse_expr()?);
        }

        if is_left_fold {
            if let Some(i) = init {
                init = Some(pack);
                pack = i;
            }
        }

        Ok(self.make(Node::FoldExpr {
            is_left_fold,
            operator: op.symbol(),
            pack,
            init,
        }))
    }

    // <expression> ::= mc <parameter type> <expr> [<offset number>] E
    fn parse_pointer_to_member_conversion_expr(&mut self, prec: Prec) -> Result<NodeId> {
        let ty = self.parse_type()?;
        let sub_expr = self.parse_expr()?;
        let offset = self.parse_number(true);
        if !self.eat(b'E') {
            return self.fail();
        }
        Ok(self.make(Node::PointerToMemberConversionExpr {
            ty,
            sub_expr,
            offset,
            prec,
        }))
    }

    // <expression> ::= so <referent type> <expr> [<offset number>]
    //                  <union-selector>* [p] E
    // <union-selector> ::= _ [<number>]
    fn parse_subobject_expr(&mut self) -> Result<NodeId> {
        let ty = self.parse_type()?;
        let sub_expr = self.parse_expr()?;
        let offset = self.parse_number(true);
        let selectors_begin = self.names.len();
        while self.eat(b'_') {
            let number = self.parse_number(false);
            let selector = self.make(Node::NameType { name: number });
            self.names.push(selector);
        }
        let one_past_the_end = self.eat(b'p');
        if !self.eat(b'E') {
            return self.fail();
        }
        let union_selectors = self.pop_trailing_node_array(selectors_begin);
        Ok(self.make(Node::SubobjectExpr {
            ty,
            sub_expr,
            offset,
            union_selectors,
            one_past_the_end,
        }))
    }

    fn parse_expr(&mut self) -> Result<NodeId> {
        self.recurse(|p| p.parse_expr_inner())
    }

    fn parse_expr_inner(&mut self) -> Result<NodeId> {
        log!("parse_expr: {:?}", self.input);

        let global = self.eat_str(b"gs");

        if let Some(op) = self.parse_operator_encoding() {
            let sym = op.symbol();
            match op.kind {
                OperatorKind::Binary => {
                    // Binary operator: lhs @ rhs
                    return self.parse_binary_expr(sym, op.prec);
                }
                OperatorKind::Prefix => {
                    // Prefix unary operator: @ expr
                    return self.parse_prefix_expr(sym, op.prec);
                }
                OperatorKind::Postfix => {
                    // Postfix unary operator: expr @, or the prefix form with
                    // a leading underscore.
                    if self.eat(b'_') {
                        return self.parse_prefix_expr(sym, op.prec);
                    }
                    let child = self.parse_expr()?;
                    return Ok(self.make(Node::PostfixExpr {
                        child,
                        operator: sym,
                        prec: op.prec,
                    }));
                }
                OperatorKind::Array => {
                    // Array index: lhs [ rhs ]
                    let base = self.parse_expr()?;
                    let index = self.parse_expr()?;
                    return Ok(self.make(Node::ArraySubscriptExpr {
                        base,
                        index,
                        prec: op.prec,
                    }));
                }
                OperatorKind::Member => {
                    // Member access: lhs @ rhs
                    let lhs = self.parse_expr()?;
                    let rhs = self.parse_expr()?;
                    return Ok(self.make(Node::MemberExpr {
                        lhs,
                        kind: sym,
                        rhs,
                        prec: op.prec,
                    }));
                }
                OperatorKind::New => {
                    // [gs] nw <expression>* _ <type> [pi <expression>*] E
                    // [gs] na <expression>* _ <type> [pi <expression>*] E
                    let exprs_begin = self.names.len();
                    while !self.eat(b'_') {
                        let expr = self.parse_expr()?;
                        self.names.push(expr);
                    }
                    let expr_list = self.pop_trailing_node_array(exprs_begin);
                    let ty = self.parse_type()?;
                    let have_inits = self.eat_str(b"pi");
                    let inits_begin = self.names.len();
                    while !self.eat(b'E') {
                        if !have_inits {
                            return self.fail();
                        }
                        let init = self.parse_expr()?;
                        self.names.push(init);
                    }
                    let init_list = self.pop_trailing_node_array(inits_begin);
                    return Ok(self.make(Node::NewExpr {
                        expr_list,
                        ty,
                        init_list,
                        is_global: global,
                        is_array: op.flag,
                        prec: op.prec,
                    }));
                }
                OperatorKind::Del => {
                    // [gs] dl <expression>   # delete
                    let expr = self.parse_expr()?;
                    return Ok(self.make(Node::DeleteExpr {
                        op: expr,
                        is_global: global,
                        is_array: op.flag,
                        prec: op.prec,
                    }));
                }
                OperatorKind::Call => {
                    // cl <expression>+ E
                    let callee = self.parse_expr()?;
                    let exprs_begin = self.names.len();
                    while !self.eat(b'E') {
                        let expr = self.parse_expr()?;
                        self.names.push(expr);
                    }
                    let args = self.pop_trailing_node_array(exprs_begin);
                    return Ok(self.make(Node::CallExpr {
                        callee,
                        args,
                        prec: op.prec,
                    }));
                }
                OperatorKind::CCast => {
                    // cv <type> <expression>
                    // cv <type> _ <expression>* E
                    let saved_try = mem::replace(&mut self.try_to_parse_template_args, false);
                    let ty = self.parse_type();
                    self.try_to_parse_template_args = saved_try;
                    let ty = ty?;

                    let exprs_begin = self.names.len();
                    let is_many = self.eat(b'_');
                    if is_many {
                        while !self.eat(b'E') {
                            let expr = self.parse_expr()?;
                            self.names.push(expr);
                        }
                    } else {
                        let expr = self.parse_expr()?;
                        self.names.push(expr);
                    }
                    let expressions = self.pop_trailing_node_array(exprs_begin);
                    return Ok(self.make(Node::ConversionExpr {
                        ty,
                        expressions,
                        prec: op.prec,
                    }));
                }
                OperatorKind::Conditional => {
                    // qu <expression> <expression> <expression>
                    let cond = self.parse_expr()?;
                    let then = self.parse_expr()?;
                    let or_else = self.parse_expr()?;
                    return Ok(self.make(Node::ConditionalExpr {
                        cond,
                        then,
                        or_else,
                        prec: op.prec,
                    }));
                }
                OperatorKind::NamedCast => {
                    // @<type>(expr)
                    let to = self.parse_type()?;
                    let from = self.parse_expr()?;
                    return Ok(self.make(Node::CastExpr {
                        cast_kind: sym,
                        to,
                        from,
                        prec: op.prec,
                    }));
                }
                OperatorKind::OfIdOp => {
                    // [sizeof/alignof/typeid] ( <type>|<expr> )
                    let infix = if op.flag {
                        self.parse_type()?
                    } else {
                        self.parse_expr()?
                    };
                    return Ok(self.make(Node::EnclosingExpr {
                        prefix: sym,
                        infix,
                        prec: op.prec,
                    }));
                }
                OperatorKind::NameOnly => {
                    // Not valid as an expression operand.
                    return self.fail();
                }
            }
        }

        if self.num_left() < 2 {
            return self.fail();
        }

        if self.look(0) == b'L' {
            return self.parse_expr_primary();
        }
        if self.look(0) == b'T' {
            return self.parse_template_param();
        }
        if self.look(0) == b'f' {
            // Disambiguate a fold expression from a <function-param>.
            if self.look(1) == b'p' || (self.look(1) == b'L' && self.look(2).is_ascii_digit()) {
                return self.parse_function_param();
            }
            return self.parse_fold_expr();
        }
        if self.eat_str(b"il") {
            let inits_begin = self.names.len();
            while !self.eat(b'E') {
                let expr = self.parse_braced_expr()?;
                self.names.push(expr);
            }
            let inits = self.pop_trailing_node_array(inits_begin);
            return Ok(self.make(Node::InitListExpr { ty: None, inits }));
        }
        if self.eat_str(b"mc") {
            return self.parse_pointer_to_member_conversion_expr(Prec::Unary);
        }
        if self.eat_str(b"nx") {
            let infix = self.parse_expr()?;
            return Ok(self.make(Node::EnclosingExpr {
                prefix: "noexcept ",
                infix,
                prec: Prec::Unary,
            }));
        }
        if self.eat_str(b"so") {
            return self.parse_subobject_expr();
        }
        if self.eat_str(b"sp") {
            let child = self.parse_expr()?;
            return Ok(self.make(Node::ParameterPackExpansion { child }));
        }
        if self.eat_str(b"sZ") {
            if self.look(0) == b'T' {
                let pack = self.parse_template_param()?;
                return Ok(self.make(Node::SizeofParamPackExpr { pack }));
            }
            let infix = self.parse_function_param()?;
            return Ok(self.make(Node::EnclosingExpr {
                prefix: "sizeof... ",
                infix,
                prec: Prec::Primary,
            }));
        }
        if self.eat_str(b"sP") {
            let args_begin = self.names.len();
            while !self.eat(b'E') {
                let arg = self.parse_template_arg()?;
                self.names.push(arg);
            }
            let array = self.pop_trailing_node_array(args_begin);
            let pack = self.make(Node::NodeArrayNode { array });
            return Ok(self.make(Node::EnclosingExpr {
                prefix: "sizeof... ",
                infix: pack,
                prec: Prec::Primary,
            }));
        }
        if self.eat_str(b"tl") {
            let ty = self.parse_type()?;
            let inits_begin = self.names.len();
            while !self.eat(b'E') {
                let expr = self.parse_braced_expr()?;
                self.names.push(expr);
            }
            let inits = self.pop_trailing_node_array(inits_begin);
            return Ok(self.make(Node::InitListExpr {
                ty: Some(ty),
                inits,
            }));
        }
        if self.eat_str(b"tr") {
            return Ok(self.make(Node::NameType {
                name: Text::Fixed("throw"),
            }));
        }
        if self.eat_str(b"tw") {
            let op = self.parse_expr()?;
            return Ok(self.make(Node::ThrowExpr { op }));
        }
        if self.eat(b'u') {
            let callee = self.parse_source_name()?;
            // Special case the legacy __uuidof mangling: the 't' and 'z'
            // appear where a <template-arg> is expected, but neither
            // __uuidof(short) nor __uuidof(...) can actually occur, so there
            // is no conflict.
            let args_begin = self.names.len();
            let mut is_uuid = false;
            if self.text_bytes(self.arena.base_name(callee)) == b"__uuidof" {
                if self.eat(b't') {
                    let uuid = self.parse_type()?;
                    self.names.push(uuid);
                    is_uuid = true;
                } else if self.eat(b'z') {
                    let uuid = self.parse_expr()?;
                    self.names.push(uuid);
                    is_uuid = true;
                }
            }
            if !is_uuid {
                while !self.eat(b'E') {
                    let arg = self.parse_template_arg()?;
                    self.names.push(arg);
                }
            }
            let args = self.pop_trailing_node_array(args_begin);
            return Ok(self.make(Node::CallExpr {
                callee,
                args,
                prec: Prec::Postfix,
            }));
        }

        // Only unresolved names remain.
        self.parse_unresolved_name(global)
    }

    // -- special names --

    // <call-offset> ::= h <nv-offset> _
    //               ::= v <v-offset> _
    //
    // <nv-offset> ::= <offset number>
    // <v-offset>  ::= <offset number> _ <virtual offset number>
    fn parse_call_offset(&mut self) -> Result<()> {
        // Scanned but never printed.
        if self.eat(b'h') {
            if self.parse_number(true).is_empty() || !self.eat(b'_') {
                return self.fail();
            }
            return Ok(());
        }
        if self.eat(b'v') {
            if self.parse_number(true).is_empty()
                || !self.eat(b'_')
                || self.parse_number(true).is_empty()
                || !self.eat(b'_')
            {
                return self.fail();
            }
            return Ok(());
        }
        self.fail()
    }

    // <special-name> ::= TV <type>    # virtual table
    //                ::= TT <type>    # VTT structure
    //                ::= TI <type>    # typeinfo structure
    //                ::= TS <type>    # typeinfo name
    //                ::= Tc <call-offset> <call-offset> <base encoding>
    //                ::= T <call-offset> <base encoding>
    //                ::= GV <object name>    # guard variable
    //                ::= TW <object name>    # thread-local wrapper
    //                ::= TH <object name>    # thread-local initialization
    //                ::= GR <object name> [<seq-id>] _    # reference temporary
    //      extension ::= TC <first type> <number> _ <second type>
    //      extension ::= GI <module name>    # module global initializer
    fn parse_special_name(&mut self) -> Result<NodeId> {
        let special = |p: &mut Self, prefix: &'static str| -> Result<NodeId> {
            let child = p.parse_type()?;
            Ok(p.make(Node::SpecialName {
                special: prefix,
                child,
            }))
        };

        match (self.look(0), self.look(1)) {
            // TA <template-arg>    # template parameter object
            (b'T', b'A') => {
                self.input.advance(2);
                let child = self.parse_template_arg()?;
                Ok(self.make(Node::SpecialName {
                    special: "template parameter object for ",
                    child,
                }))
            }
            (b'T', b'V') => {
                self.input.advance(2);
                special(self, "vtable for ")
            }
            (b'T', b'T') => {
                self.input.advance(2);
                special(self, "VTT for ")
            }
            (b'T', b'I') => {
                self.input.advance(2);
                special(self, "typeinfo for ")
            }
            (b'T', b'S') => {
                self.input.advance(2);
                special(self, "typeinfo name for ")
            }
            (b'T', b'c') => {
                self.input.advance(2);
                self.parse_call_offset()?;
                self.parse_call_offset()?;
                let child = self.parse_encoding()?;
                Ok(self.make(Node::SpecialName {
                    special: "covariant return thunk to ",
                    child,
                }))
            }
            // TC <first type> <number> _ <second type>
            //     # construction vtable for second-in-first
            (b'T', b'C') => {
                self.input.advance(2);
                let first_type = self.parse_type()?;
                if self.parse_number(true).is_empty() || !self.eat(b'_') {
                    return self.fail();
                }
                let second_type = self.parse_type()?;
                Ok(self.make(Node::CtorVtableSpecialName {
                    first_type: second_type,
                    second_type: first_type,
                }))
            }
            (b'T', b'W') => {
                self.input.advance(2);
                let child = self.parse_name(None)?;
                Ok(self.make(Node::SpecialName {
                    special: "thread-local wrapper routine for ",
                    child,
                }))
            }
            (b'T', b'H') => {
                self.input.advance(2);
                let child = self.parse_name(None)?;
                Ok(self.make(Node::SpecialName {
                    special: "thread-local initialization routine for ",
                    child,
                }))
            }
            // T <call-offset> <base encoding>    # thunk
            (b'T', _) => {
                self.input.advance(1);
                let is_virtual = self.look(0) == b'v';
                self.parse_call_offset()?;
                let child = self.parse_encoding()?;
                Ok(self.make(Node::SpecialName {
                    special: if is_virtual {
                        "virtual thunk to "
                    } else {
                        "non-virtual thunk to "
                    },
                    child,
                }))
            }
            (b'G', b'V') => {
                self.input.advance(2);
                let child = self.parse_name(None)?;
                Ok(self.make(Node::SpecialName {
                    special: "guard variable for ",
                    child,
                }))
            }
            (b'G', b'R') => {
                self.input.advance(2);
                let child = self.parse_name(None)?;
                let parsed_seq_id =
                    if self.look(0).is_ascii_digit() || self.look(0).is_ascii_uppercase() {
                        self.parse_seq_id()?;
                        true
                    } else {
                        false
                    };
                if !self.eat(b'_') && parsed_seq_id {
                    return self.fail();
                }
                Ok(self.make(Node::SpecialName {
                    special: "reference temporary for ",
                    child,
                }))
            }
            (b'G', b'I') => {
                self.input.advance(2);
                let mut module = None;
                self.parse_module_name_opt(&mut module)?;
                let child = match module {
                    Some(m) => m,
                    None => return self.fail(),
                };
                Ok(self.make(Node::SpecialName {
                    special: "initializer for module ",
                    child,
                }))
            }
            _ => self.fail(),
        }
    }

    // -- substitutions and template parameters --

    // <substitution> ::= S <seq-id> _
    //                ::= S_
    //                ::= Sa # ::std::allocator
    //                ::= Sb # ::std::basic_string
    //                ::= Ss # ::std::basic_string<char, char_traits<char>, allocator<char>>
    //                ::= Si # ::std::basic_istream<char, char_traits<char>>
    //                ::= So # ::std::basic_ostream<char, char_traits<char>>
    //                ::= Sd # ::std::basic_iostream<char, char_traits<char>>
    //
    // The St case is handled specially in parse_nested_name.
    fn parse_substitution(&mut self) -> Result<NodeId> {
        if !self.eat(b'S') {
            return self.fail();
        }

        if self.look(0).is_ascii_lowercase() {
            let kind = match self.look(0) {
                b'a' => SpecialSubKind::Allocator,
                b'b' => SpecialSubKind::BasicString,
                b'd' => SpecialSubKind::Iostream,
                b'i' => SpecialSubKind::Istream,
                b'o' => SpecialSubKind::Ostream,
                b's' => SpecialSubKind::String,
                _ => return self.fail(),
            };
            self.input.advance(1);
            let special = self.make(Node::SpecialSubstitution { kind });
            // Itanium C++ ABI 5.1.2: a built-in substitution with ABI tags
            // appended is itself a substitutable component.
            let with_tags = self.parse_abi_tags(special)?;
            if with_tags != special {
                self.subs.insert(with_tags);
            }
            return Ok(with_tags);
        }

        //                ::= S_
        if self.eat(b'_') {
            return match self.subs.get(0) {
                Some(first) => Ok(first),
                None => Err(ErrorKind::BadBackReference.into()),
            };
        }

        //                ::= S <seq-id> _
        let index = self.parse_seq_id()? + 1;
        if !self.eat(b'_') {
            return self.fail();
        }
        match self.subs.get(index) {
            Some(sub) => Ok(sub),
            None => Err(ErrorKind::BadBackReference.into()),
        }
    }

    // <template-param> ::= T_    # first template parameter
    //                  ::= T <parameter-2 non-negative number> _
    //                  ::= TL <level-1> __
    //                  ::= TL <level-1> _ <parameter-2 non-negative number> _
    fn parse_template_param(&mut self) -> Result<NodeId> {
        if !self.eat(b'T') {
            return self.fail();
        }

        let mut level = 0;
        if self.eat(b'L') {
            level = self.parse_positive_integer()? + 1;
            if !self.eat(b'_') {
                return self.fail();
            }
        }

        let mut index = 0;
        if !self.eat(b'_') {
            index = self.parse_positive_integer()? + 1;
            if !self.eat(b'_') {
                return self.fail();
            }
        }

        // In the contexts where this <template-param> may refer to a
        // <template-arg> further ahead in the mangled name (conversion
        // operator types), produce a placeholder to resolve later. This can
        // only happen at the outermost level.
        if self.permit_forward_template_references && level == 0 {
            let fwd = self.make(Node::ForwardTemplateReference {
                index,
                resolved: None,
            });
            self.forward_template_refs.push(fwd);
            return Ok(fwd);
        }

        let found = self
            .template_params
            .get(level)
            .and_then(|scope| scope.as_ref())
            .and_then(|scope| scope.get(index).copied());
        if let Some(param) = found {
            return Ok(param);
        }

        // Itanium ABI 5.1.8: in a generic lambda, uses of auto in the
        // parameter list are mangled as the corresponding artificial template
        // type parameter. Materialize that scope on first use.
        if self.parsing_lambda_params_at_level == Some(level)
            && level <= self.template_params.len()
        {
            if level == self.template_params.len() {
                self.template_params.push(None);
            }
            return Ok(self.make(Node::NameType {
                name: Text::Fixed("auto"),
            }));
        }

        Err(ErrorKind::BadTemplateArgReference.into())
    }

    fn invent_template_param_name(&mut self, kind: TemplateParamKind) -> NodeId {
        let slot = match kind {
            TemplateParamKind::Type => 0,
            TemplateParamKind::NonType => 1,
            TemplateParamKind::Template => 2,
        };
        let index = self.num_synthetic_template_parameters[slot];
        self.num_synthetic_template_parameters[slot] += 1;
        let name = self.make(Node::SyntheticTemplateParamName { kind, index });
        match self.template_params.last_mut() {
            Some(Some(scope)) => scope.push(name),
            _ => debug_assert!(false, "no template parameter scope to invent into"),
        }
        name
    }

    // <template-param-decl> ::= Ty                          # type parameter
    //                       ::= Tn <type>                   # non-type parameter
    //                       ::= Tt <template-param-decl>* E # template parameter
    //                       ::= Tp <template-param-decl>    # parameter pack
    fn parse_template_param_decl(&mut self) -> Result<NodeId> {
        if self.eat_str(b"Ty") {
            let name = self.invent_template_param_name(TemplateParamKind::Type);
            return Ok(self.make(Node::TypeTemplateParamDecl { name }));
        }

        if self.eat_str(b"Tn") {
            let name = self.invent_template_param_name(TemplateParamKind::NonType);
            let ty = self.parse_type()?;
            return Ok(self.make(Node::NonTypeTemplateParamDecl { name, ty }));
        }

        if self.eat_str(b"Tt") {
            let name = self.invent_template_param_name(TemplateParamKind::Template);
            let params_begin = self.names.len();
            let saved_len = self.template_params.len();
            self.template_params.push(Some(Vec::new()));
            loop {
                if self.eat(b'E') {
                    break;
                }
                match self.parse_template_param_decl() {
                    Ok(decl) => self.names.push(decl),
                    Err(e) => {
                        self.template_params.truncate(saved_len);
                        return Err(e);
                    }
                }
            }
            self.template_params.truncate(saved_len);
            let params = self.pop_trailing_node_array(params_begin);
            return Ok(self.make(Node::TemplateTemplateParamDecl { name, params }));
        }

        if self.eat_str(b"Tp") {
            let param = self.parse_template_param_decl()?;
            return Ok(self.make(Node::TemplateParamPackDecl { param }));
        }

        self.fail()
    }

    // <template-arg> ::= <type>                # type or template
    //                ::= X <expression> E      # expression
    //                ::= <expr-primary>        # simple expressions
    //                ::= J <template-arg>* E   # argument pack
    //                ::= LZ <encoding> E       # extension
    fn parse_template_arg(&mut self) -> Result<NodeId> {
        match self.look(0) {
            b'X' => {
                self.input.advance(1);
                let arg = self.parse_expr()?;
                if !self.eat(b'E') {
                    return self.fail();
                }
                Ok(arg)
            }
            b'J' => {
                self.input.advance(1);
                let args_begin = self.names.len();
                while !self.eat(b'E') {
                    let arg = self.parse_template_arg()?;
                    self.names.push(arg);
                }
                let elements = self.pop_trailing_node_array(args_begin);
                Ok(self.make(Node::TemplateArgumentPack { elements }))
            }
            b'L' => {
                //                ::= LZ <encoding> E           # extension
                if self.look(1) == b'Z' {
                    self.input.advance(2);
                    let arg = self.parse_encoding()?;
                    if !self.eat(b'E') {
                        return self.fail();
                    }
                    return Ok(arg);
                }
                //                ::= <expr-primary>
                self.parse_expr_primary()
            }
            _ => self.parse_type(),
        }
    }

    // <template-args> ::= I <template-arg>* E
    //
    // When the args belong to an <encoding>'s name (`tag_templates`), each
    // argument is also recorded in the template parameter table so that
    // `T_`-style references can find it; argument packs are wrapped so that
    // parameter indexing sees the pack as a unit.
    fn parse_template_args(&mut self, tag_templates: bool) -> Result<NodeId> {
        if !self.eat(b'I') {
            return self.fail();
        }

        // <template-params> refer to the innermost <template-args>. Clear
        // out any outer args that we may have inserted into the table.
        if tag_templates {
            self.template_params.clear();
            self.template_params.push(Some(Vec::new()));
        }

        let args_begin = self.names.len();
        while !self.eat(b'E') {
            if tag_templates {
                // An argument can't refer to the parameters it is among.
                let saved_params = mem::replace(&mut self.template_params, Vec::new());
                let arg = self.parse_template_arg();
                self.template_params = saved_params;
                let arg = arg?;
                self.names.push(arg);

                let pack_elements = match *self.arena.get(arg) {
                    Node::TemplateArgumentPack { ref elements } => Some(elements.clone()),
                    _ => None,
                };
                let table_entry = match pack_elements {
                    Some(data) => self.make(Node::ParameterPack { data }),
                    None => arg,
                };
                match self.template_params.last_mut() {
                    Some(Some(scope)) => scope.push(table_entry),
                    _ => debug_assert!(false, "tagged template args always have a scope"),
                }
            } else {
                let arg = self.parse_template_arg()?;
                self.names.push(arg);
            }
        }
        let params = self.pop_trailing_node_array(args_begin);
        Ok(self.make(Node::TemplateArgs { params }))
    }
}

#[cfg(test)]
mod tests {
    use super::{Parser, OPERATORS};
    use arena::Arena;
    use ast::Text;

    fn parser(input: &'static [u8]) -> Parser<'static> {
        Parser::with_arena(Arena::new(), input)
    }

    #[test]
    fn operator_table_is_sorted() {
        for pair in OPERATORS.windows(2) {
            assert!(
                pair[0].enc < pair[1].enc,
                "operator table must stay sorted: {:?} >= {:?}",
                pair[0].enc,
                pair[1].enc
            );
        }
    }

    #[test]
    fn operator_symbols_drop_the_operator_prefix() {
        let mut p = parser(b"aa");
        let op = p.parse_operator_encoding().expect("aa is in the table");
        assert_eq!(op.name, "operator&&");
        assert_eq!(op.symbol(), "&&");

        let mut p = parser(b"sc");
        let op = p.parse_operator_encoding().expect("sc is in the table");
        assert_eq!(op.symbol(), "static_cast");
    }

    #[test]
    fn unknown_operator_encodings_consume_nothing() {
        let mut p = parser(b"zz");
        assert!(p.parse_operator_encoding().is_none());
        assert_eq!(p.num_left(), 2);
    }

    #[test]
    fn seq_ids_are_base_36() {
        assert_eq!(parser(b"_").parse_seq_id().ok(), None);
        assert_eq!(parser(b"0_").parse_seq_id().ok(), Some(0));
        assert_eq!(parser(b"9_").parse_seq_id().ok(), Some(9));
        assert_eq!(parser(b"A_").parse_seq_id().ok(), Some(10));
        assert_eq!(parser(b"Z_").parse_seq_id().ok(), Some(35));
        assert_eq!(parser(b"10_").parse_seq_id().ok(), Some(36));
    }

    #[test]
    fn numbers_keep_their_negative_marker() {
        let mut p = parser(b"n42_");
        let num = p.parse_number(true);
        assert_eq!(num, Text::Input { start: 0, end: 3 });

        let mut p = parser(b"x");
        assert!(p.parse_number(true).is_empty());
    }

    #[test]
    fn positive_integers_reject_overflow() {
        let mut p = parser(b"99999999999999999999999999999999999");
        assert!(p.parse_positive_integer().is_err());
    }

    #[test]
    fn discriminators_are_scanned() {
        let mut p = parser(b"_1x");
        p.parse_discriminator();
        assert_eq!(p.num_left(), 1);

        let mut p = parser(b"__10_x");
        p.parse_discriminator();
        assert_eq!(p.num_left(), 1);

        // Trailing digits only count at the very end of the input.
        let mut p = parser(b"12");
        p.parse_discriminator();
        assert_eq!(p.num_left(), 0);
    }
}
