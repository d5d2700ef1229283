//! Custom `Error` and `Result` types for the `itanium_demangle` crate.

error_chain! {
    errors {
        /// The mangled symbol ends abruptly.
        UnexpectedEnd {
            display("mangled symbol ends abruptly")
        }
        /// The mangled symbol is not well-formed.
        UnexpectedText {
            display("mangled symbol is not well-formed")
        }
        /// Found a back reference that is out-of-bounds of the substitution
        /// table.
        BadBackReference {
            display("back reference that is out-of-bounds of the substitution table")
        }
        /// Found a reference to a template arg that is either out-of-bounds,
        /// or in a context without template args.
        BadTemplateArgReference {
            display("reference to a template arg that is either out-of-bounds, or in a \
                     context without template args")
        }
        /// Found a `T_` reference to a template arg that has not been parsed
        /// yet, outside the contexts where the grammar permits that.
        ForwardTemplateArgReference {
            display("forward reference to a template arg outside a conversion operator's type")
        }
        /// An overflow or underflow would occur when parsing an integer in a
        /// mangled symbol.
        Overflow {
            display("an overflow would occur when parsing an integer in a mangled symbol")
        }
        /// Encountered too much recursion when parsing a symbol.
        TooMuchRecursion {
            display("encountered too much recursion when parsing a symbol")
        }
    }
}
