use serde_json::Value;
use tabled::{builder::Builder, Table};

use super::schedule_entries;

/// Order in which amortization columns are shown.
const SCHEDULE_COLUMNS: [&str; 6] = [
    "month",
    "due_date",
    "payment",
    "principal",
    "interest",
    "remaining_balance",
];

/// Format output as a table using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_flat_object(value);
            }
        }
        Value::Array(arr) => print_schedule_rows(arr),
        _ => println!("{}", value),
    }
}

fn print_result_table(result: &Value, envelope: &serde_json::Map<String, Value>) {
    // Summary fields first, schedule rows below
    if let Value::Object(res_map) = result {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in res_map {
            if key == "entries" || key == "revised_schedule" {
                continue;
            }
            builder.push_record([key.as_str(), &format_value(val)]);
        }
        let table = Table::from(builder);
        println!("{}", table);
    } else {
        print_flat_object(&Value::Object(envelope.clone()));
    }

    if let Some(entries) = schedule_entries(result) {
        println!();
        print_schedule_rows(entries);
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_flat_object(value: &Value) {
    if let Value::Object(map) = value {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in map {
            builder.push_record([key.as_str(), &format_value(val)]);
        }
        let table = Table::from(builder);
        println!("{}", table);
    }
}

/// Render schedule rows month by month with a fixed column order.
fn print_schedule_rows(rows: &[Value]) {
    if rows.is_empty() {
        println!("(empty)");
        return;
    }

    let mut builder = Builder::default();
    builder.push_record(SCHEDULE_COLUMNS);

    for row in rows {
        if let Value::Object(map) = row {
            let record: Vec<String> = SCHEDULE_COLUMNS
                .iter()
                .map(|col| map.get(*col).map(format_value).unwrap_or_default())
                .collect();
            builder.push_record(record);
        }
    }

    let table = Table::from(builder);
    println!("{}", table);
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
