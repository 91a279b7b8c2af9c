//! Plain-text and JSON rendering of results.
//!
//! Query results and resource listings are drawn as boxed, auto-sized text
//! tables; errors are shown by tag instead of a table.

use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::object::Segment;
use tabled::settings::{Modify, Style, Width};

use crate::error::QueryError;
use crate::query::DecodedTable;
use crate::resources::{Configuration, MetricInfo, TableDefinition};

/// Maximum width for any column.
const MAX_COLUMN_WIDTH: usize = 40;

/// Minimum width for any column.
const MIN_COLUMN_WIDTH: usize = 4;

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Boxed text tables.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid output format: {s}. Expected: text or json")),
        }
    }
}

/// A text table built from string cells.
#[derive(Debug, Clone, Default)]
pub struct TextTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TextTable {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Appends a row. Missing cells render blank; extra cells are dropped.
    pub fn push_row(&mut self, mut cells: Vec<String>) {
        cells.resize(self.headers.len(), String::new());
        self.rows.push(cells);
    }

    /// Renders the table with a row count footer.
    pub fn render(&self) -> String {
        if self.headers.is_empty() {
            return "(empty result)\n".to_string();
        }

        let mut builder = Builder::new();
        builder.push_record(self.headers.iter().cloned());
        for row in &self.rows {
            builder.push_record(row.iter().cloned());
        }

        let truncate = Width::truncate(MAX_COLUMN_WIDTH).suffix("...");
        let mut table = builder.build();
        table
            .with(Style::sharp())
            .with(Modify::new(Segment::all()).with(truncate))
            .with(Modify::new(Segment::all()).with(Width::increase(MIN_COLUMN_WIDTH)));

        let count = self.rows.len();
        format!("{table}\n{} row{}\n", count, if count == 1 { "" } else { "s" })
    }
}

/// Renders a decoded query result.
pub fn render_result(table: &DecodedTable, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut text = TextTable::new(table.column_names());
            for row in table.rows() {
                text.push_row(row.iter().map(|v| v.to_display_string()).collect());
            }
            text.render()
        }
        OutputFormat::Json => render_json(table),
    }
}

/// Renders a failed query as `[tag status] message`.
pub fn render_query_error(err: &QueryError) -> String {
    match err.status() {
        Some(status) => format!("[{} {}] {}", err.tag(), status, err),
        None => format!("[{}] {}", err.tag(), err),
    }
}

/// Pretty-prints any serializable value as JSON.
pub fn render_json<T: Serialize + ?Sized>(value: &T) -> String {
    let mut out = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"Failed to serialize: {}\"}}", e));
    out.push('\n');
    out
}

/// Renders a metric listing.
pub fn render_metrics(metrics: &[MetricInfo], format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        return render_json(metrics);
    }

    let mut table = TextTable::new(["id", "name", "source", "url", "fields"]);
    for metric in metrics {
        table.push_row(vec![
            display_id(metric.id),
            metric.name.clone(),
            metric.data_source_type.to_string(),
            metric.source_url.clone(),
            metric
                .field_mappings
                .iter()
                .map(|(name, ty)| format!("{name}:{ty}"))
                .collect::<Vec<_>>()
                .join(", "),
        ]);
    }
    table.render()
}

/// Renders a table definition listing.
pub fn render_tables(tables: &[TableDefinition], format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        return render_json(tables);
    }

    let mut text = TextTable::new(["id", "table", "keys", "metrics", "granularity"]);
    for table in tables {
        text.push_row(vec![
            display_id(table.id),
            table.table_name.clone(),
            table.primary_keys.join(", "),
            table.metric_fields.len().to_string(),
            table
                .time_granularity
                .map(|g| g.to_string())
                .unwrap_or_default(),
        ]);
    }
    text.render()
}

/// Renders configuration entries.
pub fn render_configurations(configs: &[Configuration], format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        return render_json(configs);
    }

    let mut text = TextTable::new(["id", "name", "type", "value", "description"]);
    for config in configs {
        text.push_row(vec![
            display_id(config.id),
            config.name.clone(),
            config.config_type.clone().unwrap_or_default(),
            config.config_value.clone().unwrap_or_default(),
            config.description.clone().unwrap_or_default(),
        ]);
    }
    text.render()
}

fn display_id(id: Option<i64>) -> String {
    id.map(|id| id.to_string()).unwrap_or_default()
}
