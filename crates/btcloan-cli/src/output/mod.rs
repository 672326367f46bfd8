pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Pull the schedule rows out of a result object, whether the command
/// returned a schedule directly or a repayment carrying a revised one.
pub(crate) fn schedule_entries(result: &Value) -> Option<&Vec<Value>> {
    if let Some(Value::Array(entries)) = result.get("entries") {
        return Some(entries);
    }
    result
        .get("revised_schedule")
        .and_then(|s| s.get("entries"))
        .and_then(Value::as_array)
}
