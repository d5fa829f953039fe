use crate::cli::OutputFormat;
use colored::Colorize;
use serde_json::Value;
use tabled::builder::Builder;
use tabled::settings::Style;

pub fn print_value(value: &Value, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        OutputFormat::Table => {
            println!("{}", render_table(value));
        }
    }
    Ok(())
}

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(cell).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

/// Arrays of objects become one row per element; objects become
/// field/value rows.
fn render_table(value: &Value) -> String {
    let mut builder = Builder::default();
    match value {
        Value::Array(rows) => {
            let Some(Value::Object(first)) = rows.first() else {
                return "No entries.".to_string();
            };
            let columns: Vec<String> = first.keys().cloned().collect();
            builder.push_record(columns.iter().map(|c| c.to_uppercase()));
            for row in rows {
                builder.push_record(
                    columns
                        .iter()
                        .map(|c| row.get(c).map(cell).unwrap_or_default()),
                );
            }
        }
        Value::Object(fields) => {
            builder.push_record(["FIELD", "VALUE"]);
            for (name, v) in fields {
                match v {
                    Value::Object(nested) => {
                        for (inner, v) in nested {
                            builder.push_record([format!("{name}.{inner}"), cell(v)]);
                        }
                    }
                    _ => builder.push_record([name.clone(), cell(v)]),
                }
            }
        }
        scalar => return cell(scalar),
    }
    builder.build().with(Style::rounded()).to_string()
}
