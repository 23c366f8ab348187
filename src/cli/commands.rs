//! CLI command implementations
//!
//! Each command builds a `QueryState` from flags, runs it, and writes one
//! JSON object to stdout.

use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::config::GatewayConfig;
use crate::gateway::{DataSource, ExecutionMode, HttpTransport, QueryGateway, TransportRequest};
use crate::normalize::ResponseNormalizer;
use crate::observability::{Logger, Severity};
use crate::query::{FilterCriterion, FilterOperator, QueryState, SortSpec};

use super::args::{Command, ModeArg, QueryArgs};
use super::errors::{CliError, CliResult};
use super::io::{read_json_file, write_response};

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Query { data, query } => query_file(&data, &query),
        Command::Params {
            endpoint,
            base_url,
            mode,
            query,
        } => params(&endpoint, &base_url, mode, &query),
        Command::Fetch {
            endpoint,
            config,
            base_url,
            mode,
            query,
        } => fetch(&endpoint, config.as_deref(), base_url.as_deref(), mode, &query),
    }
}

/// Run a query over a local dataset file
pub fn query_file(data: &Path, args: &QueryArgs) -> CliResult<()> {
    let query = build_query(args)?;
    let payload = read_json_file(data)?;

    let config = GatewayConfig::default();
    let normalizer = ResponseNormalizer::new(config.id_fallback_fields, Logger::stdout(Severity::Warn));
    let normalized = normalizer.normalize(&payload, &query, ExecutionMode::Client);
    if let Some(warning) = normalized.warning {
        return Err(CliError::invalid_query(format!(
            "{} is not a dataset: {}",
            data.display(),
            warning
        )));
    }

    write_response(serde_json::to_value(&normalized.result)?)
}

/// Print the request a query translates to
pub fn params(endpoint: &str, base_url: &str, mode: ModeArg, args: &QueryArgs) -> CliResult<()> {
    let query = build_query(args)?;
    let source = mode.source(endpoint);
    let request = TransportRequest::for_source(&source, base_url, &query);
    write_response(request_json(&request, source.mode()))
}

/// Run a query against a live source
pub fn fetch(
    endpoint: &str,
    config_path: Option<&Path>,
    base_url: Option<&str>,
    mode: ModeArg,
    args: &QueryArgs,
) -> CliResult<()> {
    let query = build_query(args)?;
    let source = mode.source(endpoint);
    let config = fetch_config(config_path, base_url, &source)?;

    let transport = HttpTransport::from_config(&config)?;
    let logger = Logger::stdout(config.log_level);
    let gateway = QueryGateway::new(&config, Arc::new(transport), logger);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::runtime_failed(format!("Failed to create tokio runtime: {}", e)))?;
    let outcome = rt.block_on(gateway.load(&source, &query));

    if let Some(err) = outcome.error {
        return Err(err.into());
    }

    write_response(json!({
        "requestId": outcome.request_id,
        "origin": outcome.origin,
        "mode": source.mode(),
        "result": outcome.result,
    }))
}

/// Loads the config for `fetch` and checks that `source` resolves to an
/// absolute URL
fn fetch_config(
    config_path: Option<&Path>,
    base_url: Option<&str>,
    source: &DataSource,
) -> CliResult<GatewayConfig> {
    let mut config = match config_path {
        Some(path) => GatewayConfig::load(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(base_url) = base_url {
        config.api_base_url = base_url.to_string();
    }

    if source.is_absolute() {
        config.validate()?;
    } else {
        config.validate_for_http()?;
    }
    Ok(config)
}

/// Builds a `QueryState` from command-line flags
pub fn build_query(args: &QueryArgs) -> CliResult<QueryState> {
    let mut query = QueryState::new(args.page, args.size)?;

    for sort in &args.sorts {
        query = query.sorted_by(SortSpec::parse(sort)?);
    }

    for filter in &args.filters {
        let (field, criterion) = parse_filter(filter)?;
        query = query.filtered_by(field, criterion);
    }

    if let Some(global) = &args.global {
        query = query.searching(global.as_str());
    }

    Ok(query)
}

/// Parses `field=value` or `field:op=value`
fn parse_filter(raw: &str) -> CliResult<(String, FilterCriterion)> {
    let (lhs, value) = raw
        .split_once('=')
        .ok_or_else(|| CliError::invalid_query(format!("Filter '{}' must look like field=value", raw)))?;

    let (field, criterion) = match lhs.split_once(':') {
        Some((field, op)) => (
            field.trim(),
            FilterCriterion::structured(op.trim().parse::<FilterOperator>()?, value),
        ),
        None => (lhs.trim(), FilterCriterion::scalar(value)),
    };

    if field.is_empty() {
        return Err(CliError::invalid_query(format!("Filter '{}' has no field", raw)));
    }
    Ok((field.to_string(), criterion))
}

fn request_json(request: &TransportRequest, mode: ExecutionMode) -> Value {
    let params: Vec<Value> = request
        .query_params
        .iter()
        .map(|(k, v)| json!([k, v]))
        .collect();
    json!({
        "method": "GET",
        "mode": mode,
        "url": request.url,
        "queryParams": params,
        "display": request.display_url(),
    })
}
