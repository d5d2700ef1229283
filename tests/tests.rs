#![allow(non_snake_case)]

extern crate diff;
extern crate itanium_demangle;

fn assert_demangles_as(mangled: &str, expected: &str) {
    let sym = itanium_demangle::BorrowedSymbol::new(mangled.as_bytes())
        .expect("should parse mangled symbol ok");

    let actual = sym.demangle();

    if expected != actual {
        println!();
        println!("Diff:");
        println!("--- expected");
        print!("+++ actual");

        let mut last = None;
        for cmp in diff::chars(expected, &actual) {
            match (last, cmp.clone()) {
                (Some(diff::Result::Left(_)), diff::Result::Left(_))
                | (Some(diff::Result::Both(..)), diff::Result::Both(..))
                | (Some(diff::Result::Right(_)), diff::Result::Right(_)) => {}

                (_, diff::Result::Left(_)) => print!("\n-"),
                (_, diff::Result::Both(..)) => print!("\n "),
                (_, diff::Result::Right(_)) => print!("\n+"),
            };
            match cmp.clone() {
                diff::Result::Left(c) | diff::Result::Both(c, _) | diff::Result::Right(c) => {
                    print!("{}", c)
                }
            }
            last = Some(cmp);
        }
        println!();
    }

    assert_eq!(expected, actual);
}

fn assert_does_not_demangle(s: &str) {
    if let Ok(sym) = itanium_demangle::BorrowedSymbol::new(s.as_bytes()) {
        panic!("Unexpectedly demangled '{}' as '{}'", s, sym);
    }
}

macro_rules! demangles {
    ( $mangled:ident , $demangled:expr ) => {
        #[test]
        fn $mangled() {
            assert_demangles_as(stringify!($mangled), $demangled);
        }
    };
    ( $name:ident , $mangled:expr , $demangled:expr ) => {
        #[test]
        fn $name() {
            assert_demangles_as($mangled, $demangled);
        }
    };
}

macro_rules! does_not_demangle {
    ( $name:ident , $s:expr ) => {
        #[test]
        fn $name() {
            assert_does_not_demangle($s);
        }
    };
}

// Free and member functions.
demangles!(_Z3foov, "foo()");
demangles!(_ZN3foo3barEi, "foo::bar(int)");
demangles!(_Z3fooiPiPKcRKj, "foo(int, int*, char const*, unsigned int const&)");
demangles!(_ZN1A1fEz, "A::f(...)");
demangles!(_ZN5boost6chronoL12steady_clockEv, "boost::chrono::steady_clock()");
demangles!(
    _ZN12_GLOBAL__N_14fredEv,
    "(anonymous namespace)::fred()"
);
demangles!(_ZNK1fB5cxx11Ev, "f[abi:cxx11]() const");
demangles!(_ZNR1A1fEv, "A::f() &");
demangles!(_ZNO1A1fEv, "A::f() &&");
demangles!(_ZNKR1A1fEv, "A::f() const &");

// Data names.
demangles!(_ZN11InstrumentsL8gSessionE, "Instruments::gSession");
demangles!(_ZSt4cout, "std::cout");
demangles!(_ZDC1a1bE, "[a, b]");

// Templates, template args, and the parameter table.
demangles!(_Z1fIiEvT_, "void f<int>(int)");
demangles!(_Z3fooILi42EEvv, "void foo<42>()");
demangles!(_Z3absILi11EEvv, "void abs<11>()");
demangles!(_Z3fooILb0EEvi, "void foo<false>(int)");
demangles!(_Z3fooILb1EEvi, "void foo<true>(int)");
demangles!(_Z1fILj3EEvv, "void f<3u>()");
demangles!(_Z1fILl3EEvv, "void f<3l>()");
demangles!(_Z1fILy3EEvv, "void f<3ull>()");
demangles!(_Z1fILin3EEvv, "void f<-3>()");
demangles!(_Z1fILc65EEvv, "void f<(char)65>()");
demangles!(_Z1fIL1E1EEvv, "void f<(E)1>()");
demangles!(_Z1fIRiEvOT_, "void f<int&>(int&)");
demangles!(
    _Z20instantiate_with_intI3FooET_IiEv,
    "Foo<int> instantiate_with_int<Foo>()"
);
demangles!(
    _ZSt4copyIPKcPcET0_T_S4_S3_,
    "char* std::copy<char const*, char*>(char const*, char const*, char*)"
);
demangles!(_Z1fIXplLi1ELi2EEEvv, "void f<1 + 2>()");
demangles!(_Z1fIXgtLi1ELi2EEEvv, "void f<(1 > 2)>()");

// Substitutions.
demangles!(_ZN4funcI2TyEEN6ResultIT_EES3_, "Result<Ty> func<Ty>(Result<Ty>)");
demangles!(_ZN4funcI2TyEEN6ResultIT_EES2_, "Result<Ty> func<Ty>(Ty)");
demangles!(_ZN4funcI2TyEEN6ResultIT_EES1_, "Result<Ty> func<Ty>(Result)");
demangles!(_ZN4funcI2TyEEN6ResultIT_EES_, "Result<Ty> func<Ty>(func)");
demangles!(_Zrm1XS_, "operator%(X, X)");
demangles!(_ZplR1XS0_, "operator+(X&, X&)");
demangles!(
    _ZNSt3vectorIiSaIiEE9push_backEOi,
    "std::vector<int, std::allocator<int> >::push_back(int&&)"
);
demangles!(
    _ZNSt6vectorI4BlobSaIS0_EE13shrink_to_fitEv,
    "std::vector<Blob, std::allocator<Blob> >::shrink_to_fit()"
);
demangles!(
    _ZN2Ty6methodIS_EEvMT_FvPKcES5_,
    "void Ty::method<Ty>(void (Ty::*)(char const*), void (Ty::*)(char const*))"
);

// Constructors, destructors, and the expanded special substitutions.
demangles!(_ZN3ns1AC2Ev, "ns::A::A()");
demangles!(_ZN3ns1AC1Ev, "ns::A::A()");
demangles!(_ZN1AD1Ev, "A::~A()");
demangles!(_ZN1AD0Ev, "A::~A()");
demangles!(
    _ZNSsC1EPKc,
    "std::basic_string<char, std::char_traits<char>, std::allocator<char> >::basic_string(char const*)"
);

// Operator names.
demangles!(_ZdlPv, "operator delete(void*)");
demangles!(_ZnwmRKSt9nothrow_t, "operator new(unsigned long, std::nothrow_t const&)");
demangles!(_Zli5_fooy, "operator\"\" _foo(unsigned long long)");
demangles!(_ZN1AcviEv, "A::operator int()");
demangles!(_ZN1AcvT_IiEEv, "A::operator int<int>()");

// Pointers, arrays, functions, and the split declarator syntax.
demangles!(_Z1fPA5_i, "f(int (*) [5])");
demangles!(_Z1fPFvvE, "f(void (*)())");
demangles!(_Z1fPFYvvE, "f(void (*)())");
demangles!(_Z1fPKPKc, "f(char const* const*)");
demangles!(_Z1fM1AFvvE, "f(void (A::*)())");
demangles!(_Z1fM1AKFvvE, "f(void (A::*)() const)");
demangles!(_Z1fM1AKi, "f(int const A::*)");
demangles!(
    _ZN5space20templated_trampolineIPFvvEEEvT_,
    "void space::templated_trampoline<void (*)()>(void (*)())"
);
demangles!(_Z1fIiEPFvvET_, "void (*f<int>(int))()");

// Exception specifications on function types.
demangles!(_Z1fPDoFvvE, "f(void (*)() noexcept)");
demangles!(_Z1fPDOLb1EEFvvE, "f(void (*)() noexcept(true))");
demangles!(_Z1fPDwiEFvvE, "f(void (*)() throw(int))");

// Vendor extensions and extended types.
demangles!(_Z1fu6float8, "f(float8)");
demangles!(_Z1fU3fooi, "f(int foo)");
demangles!(_Z9_mm_or_psDv4_fS_, "_mm_or_ps(float vector[4], float vector[4])");
demangles!(_Z1fDv4_p, "f(pixel vector[4])");
demangles!(_Z1fDB32_, "f(_BitInt(32))");
demangles!(_Z1fDU8_, "f(unsigned _BitInt(8))");
demangles!(_Z1fDn, "f(std::nullptr_t)");
demangles!(_Z1fDu, "f(char8_t)");
demangles!(
    _Z1fPU11objcproto1A11objc_object,
    "f(id<A>)"
);
demangles!(_Z1fTs3foo, "f(struct foo)");

// Parameter packs.
demangles!(_Z1fIJiciEEvDpT_, "void f<int, char, int>(int, char, int)");
demangles!(_Z1fIJEEvDpT_, "void f<>()");
demangles!(_Z1fIJEEviDpT_i, "void f<>(int, int)");

// Local names, lambdas, and discriminators.
demangles!(_ZZ3foovE1s, "foo()::s");
demangles!(_ZZ3foovE1s_0, "foo()::s");
demangles!(_ZZ3foovEs, "foo()::string literal");
demangles!(
    _ZZ3foovENKUlvE_clEv,
    "foo()::'lambda'()::operator()() const"
);
demangles!(
    _ZZ3foovENKUliE_clEi,
    "foo()::'lambda'(int)::operator()(int) const"
);

// Special names.
demangles!(_ZTV1A, "vtable for A");
demangles!(_ZTT1A, "VTT for A");
demangles!(_ZTI1A, "typeinfo for A");
demangles!(_ZTS1A, "typeinfo name for A");
demangles!(_ZGVZ3foovE1x, "guard variable for foo()::x");
demangles!(_ZGRL13MozLangGroups_, "reference temporary for MozLangGroups");
demangles!(_ZTWN2js10TlsContextE, "thread-local wrapper routine for js::TlsContext");
demangles!(_ZThn8_N1A1fEv, "non-virtual thunk to A::f()");
demangles!(_ZTv0_n12_N1A1fEv, "virtual thunk to A::f()");
demangles!(TC_construction_vtable, "_ZTC1B0_1A", "construction vtable for A-in-B");
demangles!(
    ___Z3foov_block_invoke,
    "invocation function for block in foo()"
);
demangles!(
    dot_suffix,
    "_Z3foov.isra.0",
    "foo() (.isra.0)"
);

// Modules.
demangles!(_ZW1M1fv, "f@M()");
demangles!(_ZGIW3foo, "initializer for module foo");
demangles!(_ZGIW3fooWP3bar, "initializer for module foo:bar");

// enable_if attributes.
demangles!(
    _Z3fooUa9enable_ifIXgefp_Li0EEEi,
    "foo(int) [enable_if:fp >= 0]"
);

// Bare types demangle too.
demangles!(i, "int");
demangles!(PKc, "char const*");
demangles!(Ss, "std::string");
demangles!(Sa, "std::allocator");
demangles!(A10_i, "int [10]");
demangles!(A_i, "int []");
demangles!(A1_A2_i, "int [1][2]");
demangles!(DTplLi1ELi2EE, "decltype(1 + 2)");
demangles!(DTquLb1ELi1ELi2EE, "decltype(true ? 1 : 2)");
demangles!(DTdtfp_4sizeE, "decltype(fp.size)");
demangles!(DTdlfp_E, "decltype(delete fp)");

// Inputs that must be rejected, with no partial output.
does_not_demangle!(close_should_not_demangle, "close");
does_not_demangle!(empty_input, "");
does_not_demangle!(bare_prefix, "_Z");
does_not_demangle!(truncated_nested_name, "_ZN3foo");
does_not_demangle!(invalid_encoding, "_Zxxxxxxx");
does_not_demangle!(substitution_with_empty_table, "_ZS_");
does_not_demangle!(out_of_range_substitution, "_ZN4funcI2TyEEN6ResultIT_EES9_");
does_not_demangle!(bool_literals_are_0_or_1, "_Z3fooILb2EEvi");
does_not_demangle!(float_literals_are_not_rendered, "_Z1fILf40490fdbEEvv");
does_not_demangle!(trailing_garbage_after_type, "iQQQ");
