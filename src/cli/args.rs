//! CLI argument definitions using clap
//!
//! Commands:
//! - gridquery query --data <file> [query flags]
//! - gridquery params --endpoint <endpoint> [query flags]
//! - gridquery fetch --endpoint <endpoint> [--config <path>] [--base-url <url>] [query flags]

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::gateway::{DataSource, ExecutionMode};

/// gridquery - paged, sorted, filtered table queries over remote sources
#[derive(Parser, Debug)]
#[command(name = "gridquery")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a query locally over a JSON file (array or `{data, total}`)
    Query {
        /// Path to the dataset
        #[arg(long)]
        data: PathBuf,

        #[command(flatten)]
        query: QueryArgs,
    },

    /// Print the GET request a query translates to
    Params {
        /// Endpoint path or absolute URL
        #[arg(long)]
        endpoint: String,

        /// Prefix for relative endpoints
        #[arg(long, default_value = "/api")]
        base_url: String,

        #[arg(long, value_enum, default_value_t = ModeArg::Auto)]
        mode: ModeArg,

        #[command(flatten)]
        query: QueryArgs,
    },

    /// Run a query against a live source
    Fetch {
        /// Endpoint path or absolute URL
        #[arg(long)]
        endpoint: String,

        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Overrides the config's api_base_url for relative endpoints
        #[arg(long)]
        base_url: Option<String>,

        #[arg(long, value_enum, default_value_t = ModeArg::Auto)]
        mode: ModeArg,

        #[command(flatten)]
        query: QueryArgs,
    },
}

/// Query flags shared by every command
#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    /// Zero-based page index
    #[arg(long, default_value_t = 0)]
    pub page: usize,

    /// Rows per page
    #[arg(long, default_value_t = 10)]
    pub size: usize,

    /// Sort key as `field:asc|desc`; repeat for tie-breakers
    #[arg(long = "sort", value_name = "FIELD:DIR")]
    pub sorts: Vec<String>,

    /// Filter as `field=value` or `field:op=value`; repeatable
    #[arg(long = "filter", value_name = "FILTER")]
    pub filters: Vec<String>,

    /// Free-text search across all fields
    #[arg(long)]
    pub global: Option<String>,
}

/// Execution mode selection
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    /// Absolute URLs run client-side, relative paths server-side
    Auto,
    Server,
    Client,
}

impl ModeArg {
    pub fn source(&self, endpoint: &str) -> DataSource {
        match self {
            ModeArg::Auto => DataSource::infer(endpoint),
            ModeArg::Server => DataSource::new(endpoint, ExecutionMode::Server),
            ModeArg::Client => DataSource::new(endpoint, ExecutionMode::Client),
        }
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
