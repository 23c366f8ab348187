//! CLI module for gridquery
//!
//! Provides command-line interface for:
//! - query: run a query over a local JSON dataset
//! - params: show the request a query translates to
//! - fetch: run a query against a live source

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, ModeArg, QueryArgs};
pub use commands::{build_query, fetch, params, query_file, run, run_command};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_json_file, write_error, write_response};
