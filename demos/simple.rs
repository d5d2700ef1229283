extern crate itanium_demangle;

use itanium_demangle::BorrowedSymbol;

fn main() {
    let mangled = b"_ZN5space20templated_trampolineIPFvvEEEvT_";
    let sym = BorrowedSymbol::new(&mangled[..]).expect("should parse mangled symbol");
    println!("{}", sym);
}
