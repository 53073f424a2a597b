//! Rendering of encoder readings as a table, JSON or CSV

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{Table, Tabled};

use crate::readings::{Readings, VideoInput, SENSOR_TYPES};

/// How readings are written to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table (default)
    #[default]
    Table,
    /// Pretty-printed JSON array
    Json,
    /// Comma-separated values with a header row
    Csv,
}

/// Output settings shared by every command
pub struct OutputContext {
    pub format: OutputFormat,
    pub quiet: bool,
}

impl OutputContext {
    pub fn new(format: OutputFormat, no_color: bool, quiet: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self { format, quiet }
    }

    /// Status line in green, suppressed by `--quiet`
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg.green());
        }
    }

    /// Plain status line, suppressed by `--quiet`
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg);
        }
    }

    /// Warning on stderr, printed even in quiet mode
    pub fn warn(&self, msg: &str) {
        eprintln!("{}", msg.yellow());
    }

    /// Error on stderr
    pub fn error(&self, msg: &str) {
        eprintln!("{}", msg.red());
    }

    /// Print rows in the selected format
    pub fn print<T: Tabled + Serialize>(&self, data: &[T]) {
        match self.format {
            OutputFormat::Table => {
                if data.is_empty() {
                    if !self.quiet {
                        println!("No data");
                    }
                } else {
                    let table = Table::new(data).to_string();
                    println!("{}", table);
                }
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(data).unwrap_or_else(|_| "[]".to_string())
                );
            }
            OutputFormat::Csv => {
                print_csv(data);
            }
        }
    }

    /// Pretty-print a device payload or snapshot as JSON
    pub fn print_json<T: Serialize>(&self, value: &T) {
        println!(
            "{}",
            serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string())
        );
    }
}

/// Columns follow the field order of the first row
fn print_csv<T: Serialize>(data: &[T]) {
    if data.is_empty() {
        return;
    }

    let first = serde_json::to_value(&data[0]).unwrap_or_default();
    if let serde_json::Value::Object(map) = &first {
        let headers: Vec<&str> = map.keys().map(|s| s.as_str()).collect();
        println!("{}", headers.join(","));

        for item in data {
            if let Ok(serde_json::Value::Object(row)) = serde_json::to_value(item) {
                let values: Vec<String> = headers
                    .iter()
                    .map(|h| {
                        row.get(*h)
                            .map(|v| match v {
                                serde_json::Value::String(s) => escape_csv(s),
                                other => escape_csv(&other.to_string()),
                            })
                            .unwrap_or_default()
                    })
                    .collect();
                println!("{}", values.join(","));
            }
        }
    }
}

/// Quote a cell containing a comma, quote or newline
fn escape_csv(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

// =============================================================================
// Display types
// =============================================================================

/// One static sensor reading
#[derive(Debug, Tabled, Serialize)]
pub struct ReadingRow {
    #[tabled(rename = "Sensor")]
    pub sensor: String,
    #[tabled(rename = "Value")]
    pub value: String,
    #[tabled(rename = "Unit")]
    pub unit: String,
}

impl ReadingRow {
    /// One row per static sensor; `stale` marks values kept from an earlier poll
    pub fn from_readings(readings: &Readings, stale: bool) -> Vec<Self> {
        SENSOR_TYPES
            .iter()
            .map(|(key, name, unit)| {
                let value = match readings.get(key) {
                    Some(v) if stale => format!("{} (stale)", v),
                    Some(v) => v.to_string(),
                    None => "unavailable".to_string(),
                };
                ReadingRow {
                    sensor: name.to_string(),
                    value,
                    unit: unit.to_string(),
                }
            })
            .collect()
    }
}

/// One video input channel
#[derive(Debug, Tabled, Serialize)]
pub struct VideoInputRow {
    #[tabled(rename = "Channel")]
    pub channel: i64,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "State")]
    pub state: String,
    #[tabled(rename = "Protocol")]
    pub protocol: String,
    #[tabled(rename = "Details")]
    pub details: String,
}

impl From<&VideoInput> for VideoInputRow {
    fn from(input: &VideoInput) -> Self {
        let details = input
            .attributes
            .iter()
            .filter(|(k, _)| k.as_str() != "avalible" && k.as_str() != "protocol")
            .map(|(k, v)| format!("{}={}", k, format_json_value(v)))
            .collect::<Vec<_>>()
            .join(" ");

        Self {
            channel: input.channel,
            name: input.name.clone(),
            state: input.state().to_string(),
            protocol: input.protocol.clone().unwrap_or_else(|| "-".to_string()),
            details,
        }
    }
}

fn format_json_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}
