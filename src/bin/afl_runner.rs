extern crate afl;
extern crate itanium_demangle;

fn main() {
    afl::fuzz!(|data: &[u8]| {
        // Parsing may reject the input, but must never panic.
        let _ = itanium_demangle::demangle(data);
    });
}
