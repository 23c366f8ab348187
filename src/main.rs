//! gridquery CLI entry point
//!
//! Parses arguments and dispatches via `cli::run`. On failure, writes an
//! error object to stdout, the message to stderr, and exits non-zero.

use gridquery::cli;

fn main() {
    if let Err(e) = cli::run() {
        let _ = cli::write_error(e.code_str(), e.message());
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
