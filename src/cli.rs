//! Command-line argument parsing for the `uds` binary.

use crate::config::{Config, ServerConfig};
use crate::error::{Result, UdsError};
use crate::query::{ResultFormat, Submission};
use crate::render::OutputFormat;
use clap::{Args, Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;

/// Client for the unified data service.
#[derive(Parser, Debug)]
#[command(name = "uds")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Service base URL (e.g., http://localhost:8080)
    #[arg(long, global = true, env = "UDS_BASE_URL", value_name = "URL")]
    pub base_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true, env = "UDS_TIMEOUT_SECS", value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Config file path
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long, global = true, value_name = "FORMAT", default_value = "text")]
    pub format: OutputFormat,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run a SQL query and print the result table
    Query(QueryArgs),

    /// Manage metrics
    #[command(subcommand)]
    Metrics(MetricCommand),

    /// Manage table definitions
    #[command(subcommand)]
    Tables(TableCommand),

    /// Manage configuration entries
    #[command(subcommand)]
    Configs(ConfigCommand),

    /// Open a view by path (/, /metrics, /tables, /query)
    Open(OpenArgs),
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct QueryArgs {
    /// SQL text, sent to the server unchanged
    #[arg(value_name = "SQL", required_unless_present = "file")]
    pub sql: Option<String>,

    /// Read SQL from a file ("-" for stdin)
    #[arg(short, long, value_name = "PATH", conflicts_with = "sql")]
    pub file: Option<String>,

    /// Send the SQL as a GET query parameter and ask for this result format
    /// (arrow or json)
    #[arg(long, value_name = "FORMAT")]
    pub get: Option<ResultFormat>,
}

impl QueryArgs {
    /// POST by default; GET when `--get` is given.
    pub fn submission(&self) -> Submission {
        self.get.map(Submission::Get).unwrap_or_default()
    }

    /// Returns the SQL to submit, reading it from the file or stdin if asked.
    pub fn read_sql(&self) -> Result<String> {
        match (&self.sql, self.file.as_deref()) {
            (Some(sql), _) => Ok(sql.clone()),
            (None, Some("-")) => {
                let mut sql = String::new();
                std::io::stdin()
                    .read_to_string(&mut sql)
                    .map_err(|e| UdsError::input(format!("Failed to read SQL from stdin: {e}")))?;
                Ok(sql)
            }
            (None, Some(path)) => std::fs::read_to_string(path)
                .map_err(|e| UdsError::input(format!("Failed to read SQL file '{path}': {e}"))),
            (None, None) => Err(UdsError::input("No SQL given")),
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum MetricCommand {
    /// List all metrics
    List,
    /// Show one metric
    Get { id: i64 },
    /// Create a metric from a JSON document
    Create {
        #[arg(value_name = "JSON")]
        json: String,
    },
    /// Replace a metric with a JSON document
    Update {
        id: i64,
        #[arg(value_name = "JSON")]
        json: String,
    },
    /// Delete a metric
    Delete { id: i64 },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum TableCommand {
    /// List all table definitions
    List,
    /// Show one table definition
    Get { id: i64 },
    /// Show a table definition by its name
    ByName { name: String },
    /// Create a table definition from a JSON document
    Create {
        #[arg(value_name = "JSON")]
        json: String,
    },
    /// Replace a table definition with a JSON document
    Update {
        id: i64,
        #[arg(value_name = "JSON")]
        json: String,
    },
    /// Delete a table definition
    Delete { id: i64 },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// List all configuration entries
    List,
    /// Show one configuration entry
    Get { id: i64 },
    /// Create a configuration entry from a JSON document
    Create {
        #[arg(value_name = "JSON")]
        json: String,
    },
    /// Replace a configuration entry with a JSON document
    Update {
        id: i64,
        #[arg(value_name = "JSON")]
        json: String,
    },
    /// Delete a configuration entry
    Delete { id: i64 },
    /// Show the server's preview of a configuration entry
    Preview { id: i64 },
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct OpenArgs {
    /// View path
    #[arg(value_name = "PATH", default_value = "/")]
    pub path: String,

    /// SQL to run when the path opens the query view
    #[arg(long, value_name = "SQL")]
    pub sql: Option<String>,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Builds the effective server settings: flags and their environment
    /// variables over the config file over defaults.
    pub fn server_config(&self, config: &Config) -> ServerConfig {
        let mut server = config.server.clone();
        server.merge(self.base_url.clone(), self.timeout);
        server
    }
}
