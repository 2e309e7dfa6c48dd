//! campusmeet client library.
//!
//! Loads a store snapshot and answers expansion and management requests
//! through the service handler:
//!
//! - `cli`: command-line argument parsing
//! - `config`: client configuration (`config.toml`)
//! - `commands`: subcommand implementations
//! - `render`: table and JSON output

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod render;

pub use cli::Cli;
pub use error::{ClientError, ClientResult};
