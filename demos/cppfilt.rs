//! A `c++filt` work-alike: read lines on stdin, demangle any mangled
//! symbols found in them, and echo the rest through untouched.

extern crate clap;
extern crate itanium_demangle;

use clap::{App, Arg};
use itanium_demangle::BorrowedSymbol;
use std::io::{self, BufRead, Write};
use std::process;

/// Find the next potential mangled symbol in `line[start..]`: a `_Z` or
/// `__Z` prefix, ending at the first byte that cannot appear in a mangling.
fn find_mangled(line: &[u8], start: usize) -> Option<(usize, usize)> {
    let is_symbol_byte = |b: u8| b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b == b'.';

    let mut i = start;
    while i + 1 < line.len() {
        if line[i] == b'_' && line[i + 1] == b'Z' {
            let mut end = i + 2;
            while end < line.len() && is_symbol_byte(line[end]) {
                end += 1;
            }
            return Some((i, end));
        }
        i += 1;
    }
    None
}

fn filter_line(line: &[u8], out: &mut dyn Write) -> io::Result<()> {
    let mut pos = 0;
    while let Some((start, end)) = find_mangled(line, pos) {
        out.write_all(&line[pos..start])?;
        match BorrowedSymbol::new(&line[start..end]) {
            Ok(sym) => write!(out, "{}", sym)?,
            Err(_) => out.write_all(&line[start..end])?,
        }
        pos = end;
    }
    out.write_all(&line[pos..])?;
    writeln!(out)
}

fn main() {
    let matches = App::new("cppfilt")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Demangle Itanium C++ ABI symbols found on stdin or the command line")
        .arg(
            Arg::with_name("symbols")
                .multiple(true)
                .help("Mangled symbols to demangle; stdin is filtered when none are given"),
        )
        .get_matches();

    let stdout = io::stdout();
    let mut stdout = stdout.lock();

    if let Some(symbols) = matches.values_of("symbols") {
        for symbol in symbols {
            match BorrowedSymbol::new(symbol.as_bytes()) {
                Ok(sym) => println!("{}", sym),
                Err(e) => {
                    eprintln!("error demangling '{}': {}", symbol, e);
                    process::exit(1);
                }
            }
        }
        return;
    }

    let stdin = io::stdin();
    for line in stdin.lock().split(b'\n') {
        let line = line.expect("should read line from stdin");
        filter_line(&line, &mut stdout).expect("should write to stdout");
    }
}
