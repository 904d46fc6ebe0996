//! CLI for aerorepo
//!
//! - query: run one JSON request against the fixture-seeded store
//! - explain: show the strategy and effective query for a request

mod args;
mod commands;
mod errors;
mod io;
mod request;

pub use args::{Cli, Command};
pub use commands::{explain, query, run, run_command, run_request};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_request, write_error, write_response};
pub use request::{PageSpec, QueryRequest};
