//! The abstract syntax tree for mangled symbols.
//!
//! Every grammar production the parser recognizes maps onto one `Node`
//! variant. Children are `NodeId` edges into the [`Arena`](crate::arena::Arena)
//! that owns all nodes of a single parse; substring payloads are byte ranges
//! of the original input (see [`Text`]) so the tree never borrows from it.

use arena::{Arena, NodeId};

/// A handle to a node's textual payload: either a byte range of the mangled
/// input, or a fixed spelling chosen during parsing (builtin type names,
/// operator spellings, and the like).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Text {
    /// The range `[start, end)` of the original input bytes.
    Input { start: usize, end: usize },
    /// A fixed spelling.
    Fixed(&'static str),
}

impl Text {
    pub fn empty() -> Text {
        Text::Fixed("")
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        match *self {
            Text::Input { start, end } => end - start,
            Text::Fixed(s) => s.len(),
        }
    }

    /// Resolve this handle against the input it was parsed from.
    pub fn bytes<'i>(&self, input: &'i [u8]) -> &'i [u8] {
        match *self {
            Text::Input { start, end } => &input[start..end],
            Text::Fixed(s) => s.as_bytes(),
        }
    }
}

/// Three-way bool memoizing a per-node printing query. `Unknown` appears when
/// the answer depends on an unexpanded parameter pack below the node and must
/// be recomputed for each pack index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cache {
    Yes,
    No,
    Unknown,
}

/// Operator precedence for expression nodes, used to decide where the printer
/// must parenthesize.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Prec {
    Primary,
    Postfix,
    Unary,
    Cast,
    PtrMem,
    Multiplicative,
    Additive,
    Shift,
    Spaceship,
    Relational,
    Equality,
    And,
    Xor,
    Ior,
    AndIf,
    OrIf,
    Conditional,
    Assign,
    Comma,
    Default,
}

/// `&` versus `&&`. The derived order makes reference collapsing a `min`:
/// rvalue-of-rvalue stays rvalue, every other combination is an lvalue ref.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReferenceKind {
    LValue,
    RValue,
}

/// A function type's ref-qualifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FunctionRefQual {
    None,
    LValue,
    RValue,
}

/// The `r`/`V`/`K` qualifier set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Qualifiers(u8);

impl Qualifiers {
    pub const NONE: Qualifiers = Qualifiers(0);
    pub const CONST: Qualifiers = Qualifiers(0x1);
    pub const VOLATILE: Qualifiers = Qualifiers(0x2);
    pub const RESTRICT: Qualifiers = Qualifiers(0x4);

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: Qualifiers) -> bool {
        self.0 & other.0 != 0
    }
}

impl ::std::ops::BitOr for Qualifiers {
    type Output = Qualifiers;
    fn bitor(self, rhs: Qualifiers) -> Qualifiers {
        Qualifiers(self.0 | rhs.0)
    }
}

impl ::std::ops::BitOrAssign for Qualifiers {
    fn bitor_assign(&mut self, rhs: Qualifiers) {
        self.0 |= rhs.0;
    }
}

/// Which of the six `S?` abbreviations a substitution stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpecialSubKind {
    Allocator,
    BasicString,
    String,
    Istream,
    Ostream,
    Iostream,
}

impl SpecialSubKind {
    /// The `std::string`/`std::istream`/... family are typedefs for
    /// instantiations of their `basic_` template.
    pub(crate) fn is_instantiation(self) -> bool {
        match self {
            SpecialSubKind::String
            | SpecialSubKind::Istream
            | SpecialSubKind::Ostream
            | SpecialSubKind::Iostream => true,
            SpecialSubKind::Allocator | SpecialSubKind::BasicString => false,
        }
    }

    /// Base name in the expanded (template) form.
    pub(crate) fn expanded_base_name(self) -> &'static str {
        match self {
            SpecialSubKind::Allocator => "allocator",
            SpecialSubKind::BasicString | SpecialSubKind::String => "basic_string",
            SpecialSubKind::Istream => "basic_istream",
            SpecialSubKind::Ostream => "basic_ostream",
            SpecialSubKind::Iostream => "basic_iostream",
        }
    }

    /// Base name in the plain (typedef) form: the instantiations drop the
    /// `basic_` prefix.
    pub(crate) fn plain_base_name(self) -> &'static str {
        match self {
            SpecialSubKind::Allocator => "allocator",
            SpecialSubKind::BasicString => "basic_string",
            SpecialSubKind::String => "string",
            SpecialSubKind::Istream => "istream",
            SpecialSubKind::Ostream => "ostream",
            SpecialSubKind::Iostream => "iostream",
        }
    }
}

/// The kind of an invented template parameter name (`$T`, `$N`, `$TT`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TemplateParamKind {
    Type,
    NonType,
    Template,
}

/// One node of the AST.
///
/// Text payloads carried as `&'static str` always originate from a fixed
/// table (operator spellings, special-name prefixes); payloads that can point
/// into the input are [`Text`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    /// A comma-separated sequence used where a node is required but a list
    /// was parsed (`sP … E` packs).
    NodeArrayNode { array: Vec<NodeId> },

    /// `foo (.suffix)` — a vendor suffix carried through verbatim.
    DotSuffix { prefix: NodeId, suffix: Text },

    /// `U <source-name> [<template-args>]` vendor extended qualifier.
    VendorExtQualType {
        ty: NodeId,
        ext: Text,
        template_args: Option<NodeId>,
    },

    /// A type with `const`/`volatile`/`restrict` applied.
    QualType { child: NodeId, quals: Qualifiers },

    /// `operator <type>`.
    ConversionOperatorType { ty: NodeId },

    /// A type followed by a fixed token, e.g. `… complex`.
    PostfixQualifiedType {
        ty: NodeId,
        postfix: &'static str,
    },

    /// A plain identifier or builtin type name.
    NameType { name: Text },

    /// `_BitInt(N)` / `unsigned _BitInt(N)`.
    BitIntType { size: NodeId, signed: bool },

    /// `struct foo` / `union foo` / `enum foo`.
    ElaboratedTypeSpefType {
        kind: &'static str,
        child: NodeId,
    },

    /// `base[abi:tag]`.
    AbiTagAttr { base: NodeId, tag: Text },

    /// ` [enable_if:…]` attribute on an encoding.
    EnableIfAttr { conditions: Vec<NodeId> },

    /// `ty<Protocol>` — an Objective-C protocol-qualified type.
    ObjCProtoName { ty: NodeId, protocol: Text },

    PointerType { pointee: NodeId },

    ReferenceType {
        pointee: NodeId,
        kind: ReferenceKind,
    },

    PointerToMemberType {
        class_type: NodeId,
        member_type: NodeId,
    },

    ArrayType {
        base: NodeId,
        dimension: Option<NodeId>,
    },

    FunctionType {
        ret: NodeId,
        params: Vec<NodeId>,
        cv_quals: Qualifiers,
        ref_qual: FunctionRefQual,
        exception_spec: Option<NodeId>,
    },

    /// `noexcept(expr)` exception specification.
    NoexceptSpec { expr: NodeId },

    /// `throw(type, …)` dynamic exception specification.
    DynamicExceptionSpec { types: Vec<NodeId> },

    /// A whole function entity: name, parameters, and optionally the return
    /// type (present exactly when the name ends with template args).
    FunctionEncoding {
        ret: Option<NodeId>,
        name: NodeId,
        params: Vec<NodeId>,
        attrs: Option<NodeId>,
        cv_quals: Qualifiers,
        ref_qual: FunctionRefQual,
    },

    /// `operator"" _suffix`.
    LiteralOperator { op_name: NodeId },

    /// `vtable for …`, `guard variable for …`, and the rest of the
    /// prefix-plus-entity special names.
    SpecialName {
        special: &'static str,
        child: NodeId,
    },

    /// `construction vtable for A-in-B`.
    CtorVtableSpecialName {
        first_type: NodeId,
        second_type: NodeId,
    },

    NestedName { qual: NodeId, name: NodeId },

    /// One segment of a C++20 module name; `parent` chains segments.
    ModuleName {
        parent: Option<NodeId>,
        name: NodeId,
        is_partition: bool,
    },

    /// An entity attached to a module, printed `name@module`.
    ModuleEntity { module: NodeId, name: NodeId },

    /// `encoding::entity` for an entity local to a function.
    LocalName { encoding: NodeId, entity: NodeId },

    /// `qualifier::name` from an `<unresolved-name>`.
    QualifiedName { qualifier: NodeId, name: NodeId },

    /// `::child`.
    GlobalQualifiedName { child: NodeId },

    VectorType {
        base_type: NodeId,
        dimension: Option<NodeId>,
    },

    /// AltiVec `pixel vector[N]`.
    PixelVectorType { dimension: NodeId },

    /// An invented name (`$T0`, `$N1`, …) for a template parameter that has
    /// no corresponding argument, from an explicit lambda template list.
    SyntheticTemplateParamName {
        kind: TemplateParamKind,
        index: u32,
    },

    /// `typename T`.
    TypeTemplateParamDecl { name: NodeId },

    /// `int N`.
    NonTypeTemplateParamDecl { name: NodeId, ty: NodeId },

    /// `template<…> typename N`.
    TemplateTemplateParamDecl {
        name: NodeId,
        params: Vec<NodeId>,
    },

    /// `typename ...T`.
    TemplateParamPackDecl { param: NodeId },

    /// An unexpanded argument pack as referenced through a template
    /// parameter; printed one element at a time under a pack expansion.
    ParameterPack { data: Vec<NodeId> },

    /// `J…E`, a pack of template arguments.
    TemplateArgumentPack { elements: Vec<NodeId> },

    /// `Dp <type>` / `sp <expr>`: expands the packs below it.
    ParameterPackExpansion { child: NodeId },

    /// `I…E` template argument list.
    TemplateArgs { params: Vec<NodeId> },

    /// A `T_` seen before its binding argument list (conversion operator
    /// types). `resolved` is filled in once the enclosing encoding's
    /// arguments are known.
    ForwardTemplateReference {
        index: usize,
        resolved: Option<NodeId>,
    },

    NameWithTemplateArgs {
        name: NodeId,
        template_args: NodeId,
    },

    /// One of `Sa`/`Sb`/`Ss`/`Si`/`So`/`Sd` in its plain, typedef form.
    SpecialSubstitution { kind: SpecialSubKind },

    /// The same abbreviation forced into its expanded template form, as
    /// required in constructor/destructor name position.
    ExpandedSpecialSubstitution { kind: SpecialSubKind },

    /// A constructor or destructor, named after its class.
    CtorDtorName {
        basename: NodeId,
        is_dtor: bool,
        variant: u8,
    },

    /// `~name` from a destructor `<unresolved-name>`.
    DtorName { base: NodeId },

    /// `'unnamedN'`.
    UnnamedTypeName { count: Text },

    /// `'lambdaN'(params…)`, with any explicit template parameter list.
    ClosureTypeName {
        template_params: Vec<NodeId>,
        params: Vec<NodeId>,
        count: Text,
    },

    /// `[a, b]` structured binding declaration name.
    StructuredBindingName { bindings: Vec<NodeId> },

    // -- Expressions --
    BinaryExpr {
        lhs: NodeId,
        infix: &'static str,
        rhs: NodeId,
        prec: Prec,
    },

    ArraySubscriptExpr {
        base: NodeId,
        index: NodeId,
        prec: Prec,
    },

    PostfixExpr {
        child: NodeId,
        operator: &'static str,
        prec: Prec,
    },

    ConditionalExpr {
        cond: NodeId,
        then: NodeId,
        or_else: NodeId,
        prec: Prec,
    },

    MemberExpr {
        lhs: NodeId,
        kind: &'static str,
        rhs: NodeId,
        prec: Prec,
    },

    /// `expr.<type at offset n>` — a subobject reference in a non-type
    /// template argument.
    SubobjectExpr {
        ty: NodeId,
        sub_expr: NodeId,
        offset: Text,
        union_selectors: Vec<NodeId>,
        one_past_the_end: bool,
    },

    /// `prefix(operand)` — `sizeof (…)`, `decltype(…)`, `noexcept (…)`, ….
    EnclosingExpr {
        prefix: &'static str,
        infix: NodeId,
        prec: Prec,
    },

    /// `static_cast<To>(from)` and the other named casts.
    CastExpr {
        cast_kind: &'static str,
        to: NodeId,
        from: NodeId,
        prec: Prec,
    },

    /// `sizeof...(pack)`.
    SizeofParamPackExpr { pack: NodeId },

    CallExpr {
        callee: NodeId,
        args: Vec<NodeId>,
        prec: Prec,
    },

    NewExpr {
        expr_list: Vec<NodeId>,
        ty: NodeId,
        init_list: Vec<NodeId>,
        is_global: bool,
        is_array: bool,
        prec: Prec,
    },

    DeleteExpr {
        op: NodeId,
        is_global: bool,
        is_array: bool,
        prec: Prec,
    },

    PrefixExpr {
        prefix: &'static str,
        child: NodeId,
        prec: Prec,
    },

    /// `fpN` — a reference to an enclosing function's parameter.
    FunctionParam { number: Text },

    /// `(type)(expr…)` C-style cast.
    ConversionExpr {
        ty: NodeId,
        expressions: Vec<NodeId>,
        prec: Prec,
    },

    /// `(type)(expr)` pointer-to-member conversion.
    PointerToMemberConversionExpr {
        ty: NodeId,
        sub_expr: NodeId,
        offset: Text,
        prec: Prec,
    },

    /// `ty{…}` or `{…}`.
    InitListExpr {
        ty: Option<NodeId>,
        inits: Vec<NodeId>,
    },

    /// `.field = init` / `[index] = init` designated initializer.
    BracedExpr {
        elem: NodeId,
        init: NodeId,
        is_array: bool,
    },

    /// `[first ... last] = init` GNU range designator.
    BracedRangeExpr {
        first: NodeId,
        last: NodeId,
        init: NodeId,
    },

    FoldExpr {
        is_left_fold: bool,
        operator: &'static str,
        pack: NodeId,
        init: Option<NodeId>,
    },

    ThrowExpr { op: NodeId },

    BoolExpr { value: bool },

    /// `"<type>"` — the contents are not encoded in the mangling.
    StringLiteral { ty: NodeId },

    /// `[]…{...}` lambda literal.
    LambdaExpr { ty: NodeId },

    /// `(Ty)value`.
    EnumLiteral { ty: NodeId, integer: Text },

    /// An integer literal plus its type, rendered either as a suffix (`42ul`)
    /// or as a cast (`(short)42`).
    IntegerLiteral { ty: &'static str, value: Text },
}

impl Node {
    /// The precedence this node binds at when used as an expression operand.
    pub fn precedence(&self) -> Prec {
        match *self {
            Node::BinaryExpr { prec, .. }
            | Node::ArraySubscriptExpr { prec, .. }
            | Node::PostfixExpr { prec, .. }
            | Node::ConditionalExpr { prec, .. }
            | Node::MemberExpr { prec, .. }
            | Node::EnclosingExpr { prec, .. }
            | Node::CastExpr { prec, .. }
            | Node::CallExpr { prec, .. }
            | Node::NewExpr { prec, .. }
            | Node::DeleteExpr { prec, .. }
            | Node::PrefixExpr { prec, .. }
            | Node::ConversionExpr { prec, .. }
            | Node::PointerToMemberConversionExpr { prec, .. } => prec,
            _ => Prec::Primary,
        }
    }

    /// Compute the cache tri-states for a node about to enter the arena.
    ///
    /// Wrapper types forward their child's bits; declarator-splitting types
    /// are constant; packs and forward references degrade to `Unknown`
    /// because their answers depend on print-time state.
    pub(crate) fn initial_caches(&self, arena: &Arena) -> (Cache, Cache, Cache) {
        match *self {
            Node::QualType { child, .. } | Node::AbiTagAttr { base: child, .. } => (
                arena.rhs_cache(child),
                arena.array_cache(child),
                arena.function_cache(child),
            ),
            Node::PointerType { pointee } | Node::ReferenceType { pointee, .. } => {
                (arena.rhs_cache(pointee), Cache::No, Cache::No)
            }
            Node::PointerToMemberType { member_type, .. } => {
                (arena.rhs_cache(member_type), Cache::No, Cache::No)
            }
            Node::ArrayType { .. } => (Cache::Yes, Cache::Yes, Cache::No),
            Node::FunctionType { .. } | Node::FunctionEncoding { .. } => {
                (Cache::Yes, Cache::No, Cache::Yes)
            }
            Node::TypeTemplateParamDecl { .. }
            | Node::NonTypeTemplateParamDecl { .. }
            | Node::TemplateTemplateParamDecl { .. }
            | Node::TemplateParamPackDecl { .. } => (Cache::Yes, Cache::No, Cache::No),
            Node::ParameterPack { ref data } => {
                let all_no = |cache: fn(&Arena, NodeId) -> Cache| {
                    if data.iter().all(|&d| cache(arena, d) == Cache::No) {
                        Cache::No
                    } else {
                        Cache::Unknown
                    }
                };
                (
                    all_no(Arena::rhs_cache),
                    all_no(Arena::array_cache),
                    all_no(Arena::function_cache),
                )
            }
            Node::ForwardTemplateReference { .. } => {
                (Cache::Unknown, Cache::Unknown, Cache::Unknown)
            }
            _ => (Cache::No, Cache::No, Cache::No),
        }
    }
}

impl Arena {
    /// The base (rightmost unqualified) name of a name-ish node, or empty.
    /// Constructors and destructors print this for their class.
    pub(crate) fn base_name(&self, id: NodeId) -> Text {
        match *self.get(id) {
            Node::NameType { name } => name,
            Node::NestedName { name, .. }
            | Node::ModuleEntity { name, .. }
            | Node::QualifiedName { name, .. }
            | Node::NameWithTemplateArgs { name, .. } => self.base_name(name),
            Node::GlobalQualifiedName { child } => self.base_name(child),
            Node::ExpandedSpecialSubstitution { kind } => Text::Fixed(kind.expanded_base_name()),
            Node::SpecialSubstitution { kind } => Text::Fixed(kind.plain_base_name()),
            _ => Text::Fixed(""),
        }
    }
}
