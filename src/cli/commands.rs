//! CLI command implementations
//!
//! Both commands load the configuration, read one request from stdin and
//! write one response to stdout. Request and query failures are reported
//! as error responses; configuration and I/O failures end the process.

use std::path::Path;
use std::sync::Arc;

use futures_util::TryStreamExt;
use serde_json::{json, Value};

use crate::config::RepositoryConfig;
use crate::errors::QueryResult;
use crate::execution::Outcome;
use crate::repository::{Parameters, RepositoryQuery};
use crate::store::DocumentStore;

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_request, write_error, write_response};
use super::request::{self, QueryRequest};

/// Main CLI entry point; the only function main.rs calls
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Query { config } => query(&config),
        Command::Explain { config } => explain(&config),
    }
}

fn load_config(path: &Path) -> CliResult<RepositoryConfig> {
    let config = RepositoryConfig::load(path).map_err(|e| CliError::config_error(e.to_string()))?;
    config
        .init_logging()
        .map_err(|e| CliError::config_error(e.to_string()))?;
    Ok(config)
}

/// Runs one request against the fixture-seeded store
pub fn query(config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    let store: Arc<dyn DocumentStore> = Arc::new(
        config
            .open_store()
            .map_err(|e| CliError::config_error(e.to_string()))?,
    );

    let request = match QueryRequest::from_value(read_request()?) {
        Ok(request) => request,
        Err(e) => return write_error(e.code_str(), e.message()),
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::runtime_failed(format!("Failed to create tokio runtime: {}", e)))?;

    let result = runtime.block_on(run_request(&config, store, &request));
    match result {
        Ok(data) => write_response(data),
        Err(e) => write_error(e.code(), &e.to_string()),
    }
}

/// Prints the plan for one request without touching the store
pub fn explain(config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;

    let request = match QueryRequest::from_value(read_request()?) {
        Ok(request) => request,
        Err(e) => return write_error(e.code_str(), e.message()),
    };

    match explain_request(&config, &request) {
        Ok(plan) => write_response(plan),
        Err(e) => write_error(e.code(), &e.to_string()),
    }
}

fn explain_request(config: &RepositoryConfig, request: &QueryRequest) -> QueryResult<Value> {
    let store: Arc<dyn DocumentStore> = Arc::new(crate::store::InMemoryStore::new());
    let registered = request.register(config, store)?;
    request::explain(&registered, request.parameters()?)
}

/// Registers and executes `request`, rendering the outcome as JSON
pub async fn run_request(
    config: &RepositoryConfig,
    store: Arc<dyn DocumentStore>,
    request: &QueryRequest,
) -> QueryResult<Value> {
    let registered: RepositoryQuery<Value> = request.register(config, store)?;
    let parameters: Parameters = request.parameters()?;
    render(registered.execute(parameters)).await
}

async fn render(outcome: Outcome<Value>) -> QueryResult<Value> {
    Ok(match outcome {
        Outcome::Single(fut) => fut.await?.unwrap_or(Value::Null),
        Outcome::Many(stream) => Value::Array(stream.try_collect().await?),
        Outcome::Page(fut) => {
            let page = fut.await?;
            json!({
                "total_pages": page.total_pages(),
                "has_next": page.has_next(),
                "content": page.content,
                "page_number": page.page_number,
                "page_size": page.page_size,
                "total_elements": page.total_elements,
            })
        }
        Outcome::Slice(fut) => {
            let slice = fut.await?;
            json!({
                "content": slice.content,
                "page_number": slice.page_number,
                "page_size": slice.page_size,
                "has_next": slice.has_next,
            })
        }
        Outcome::Count(fut) => json!({ "count": fut.await? }),
        Outcome::Deleted(fut) => {
            let deleted = fut.await?;
            json!({ "deleted_count": deleted.deleted_count, "items": deleted.items })
        }
    })
}
