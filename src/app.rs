//! Command dispatch for the `uds` binary.
//!
//! Runs one parsed command against a transport and returns the rendered
//! output, so every command can be exercised without a terminal.

use serde::de::DeserializeOwned;
use tracing::info;

use crate::cli::{Command, ConfigCommand, MetricCommand, OpenArgs, TableCommand};
use crate::error::{Result, UdsError};
use crate::query::{ExecuteOptions, QueryExecutor, Submission};
use crate::render::{self, OutputFormat};
use crate::resources::{
    Configuration, ConfigurationClient, MetricClient, MetricInfo, TableClient, TableDefinition,
};
use crate::routes::{self, Resolved, View};
use crate::transport::Transport;

/// Runs `command` and returns what should be printed on stdout.
pub async fn dispatch(
    command: &Command,
    format: OutputFormat,
    transport: &dyn Transport,
) -> Result<String> {
    match command {
        Command::Query(args) => {
            let sql = args.read_sql()?;
            run_query(&sql, args.submission(), format, transport).await
        }
        Command::Metrics(cmd) => run_metrics(cmd, format, transport).await,
        Command::Tables(cmd) => run_tables(cmd, format, transport).await,
        Command::Configs(cmd) => run_configs(cmd, format, transport).await,
        Command::Open(args) => open(args, format, transport).await,
    }
}

async fn run_query(
    sql: &str,
    submission: Submission,
    format: OutputFormat,
    transport: &dyn Transport,
) -> Result<String> {
    let options = ExecuteOptions::default().via(submission);
    let table = QueryExecutor::new(transport).execute_with(sql, options).await?;
    Ok(render::render_result(&table, format))
}

async fn run_metrics(
    cmd: &MetricCommand,
    format: OutputFormat,
    transport: &dyn Transport,
) -> Result<String> {
    let client = MetricClient::new(transport);

    let metric = match cmd {
        MetricCommand::List => {
            let metrics = client.list().await?;
            return Ok(render::render_metrics(&metrics, format));
        }
        MetricCommand::Get { id } => client.get(*id).await?,
        MetricCommand::Create { json } => {
            client.create(&parse_payload::<MetricInfo>(json)?).await?
        }
        MetricCommand::Update { id, json } => {
            client
                .update(*id, &parse_payload::<MetricInfo>(json)?)
                .await?
        }
        MetricCommand::Delete { id } => {
            client.delete(*id).await?;
            return Ok(format!("Deleted metric {id}\n"));
        }
    };

    Ok(render::render_metrics(std::slice::from_ref(&metric), format))
}

async fn run_tables(
    cmd: &TableCommand,
    format: OutputFormat,
    transport: &dyn Transport,
) -> Result<String> {
    let client = TableClient::new(transport);

    let table = match cmd {
        TableCommand::List => {
            let tables = client.list().await?;
            return Ok(render::render_tables(&tables, format));
        }
        TableCommand::Get { id } => client.get(*id).await?,
        TableCommand::ByName { name } => client.get_by_name(name).await?,
        TableCommand::Create { json } => {
            client
                .create(&parse_payload::<TableDefinition>(json)?)
                .await?
        }
        TableCommand::Update { id, json } => {
            client
                .update(*id, &parse_payload::<TableDefinition>(json)?)
                .await?
        }
        TableCommand::Delete { id } => {
            client.delete(*id).await?;
            return Ok(format!("Deleted table {id}\n"));
        }
    };

    Ok(render::render_tables(std::slice::from_ref(&table), format))
}

async fn run_configs(
    cmd: &ConfigCommand,
    format: OutputFormat,
    transport: &dyn Transport,
) -> Result<String> {
    let client = ConfigurationClient::new(transport);

    let config = match cmd {
        ConfigCommand::List => {
            let configs = client.list().await?;
            return Ok(render::render_configurations(&configs, format));
        }
        ConfigCommand::Get { id } => client.get(*id).await?,
        ConfigCommand::Create { json } => {
            client
                .create(&parse_payload::<Configuration>(json)?)
                .await?
        }
        ConfigCommand::Update { id, json } => {
            client
                .update(*id, &parse_payload::<Configuration>(json)?)
                .await?
        }
        ConfigCommand::Delete { id } => {
            client.delete(*id).await?;
            return Ok(format!("Deleted configuration {id}\n"));
        }
        ConfigCommand::Preview { id } => {
            let mut preview = client.preview(*id).await?;
            if !preview.ends_with('\n') {
                preview.push('\n');
            }
            return Ok(preview);
        }
    };

    Ok(render::render_configurations(std::slice::from_ref(&config), format))
}

/// Resolves a view path and renders that view.
async fn open(args: &OpenArgs, format: OutputFormat, transport: &dyn Transport) -> Result<String> {
    if let Resolved::Redirect { from, to } = routes::resolve(&args.path) {
        info!("Redirecting {} -> {}", from, to);
    }

    let view = routes::navigate(&args.path)
        .ok_or_else(|| UdsError::input(format!("No view at '{}'", args.path)))?;

    match view {
        View::MetricManagement => run_metrics(&MetricCommand::List, format, transport).await,
        View::TableManagement => run_tables(&TableCommand::List, format, transport).await,
        View::SqlQuery => match &args.sql {
            Some(sql) => run_query(sql, Submission::Post, format, transport).await,
            None => Ok(format!("{view}: pass --sql to run a query\n")),
        },
    }
}

fn parse_payload<T: DeserializeOwned>(json: &str) -> Result<T> {
    serde_json::from_str(json).map_err(|e| UdsError::input(format!("Invalid JSON payload: {e}")))
}
