use comfy_table::Table;
use serde::Serialize;
use serde_json::Value;

use crate::cli::OutputFormat;
use crate::error::Result;

/// Print `data` in the requested format. `Auto` renders a table.
pub fn print_output<T: Serialize>(data: T, format: OutputFormat) -> Result<()> {
    let json_value = serde_json::to_value(data)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json_value)?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yaml::to_string(&json_value)?);
        }
        OutputFormat::Auto | OutputFormat::Table => {
            println!("{}", render_table(&json_value));
        }
    }

    Ok(())
}

pub fn render_table(value: &Value) -> String {
    match value {
        Value::Array(arr) if !arr.is_empty() => {
            let mut table = Table::new();
            if let Value::Object(first) = &arr[0] {
                let headers: Vec<String> = first.keys().cloned().collect();
                table.set_header(&headers);

                for item in arr {
                    if let Value::Object(obj) = item {
                        let row: Vec<String> = headers
                            .iter()
                            .map(|h| format_value(obj.get(h).unwrap_or(&Value::Null)))
                            .collect();
                        table.add_row(row);
                    }
                }
            } else {
                table.set_header(vec!["Value"]);
                for item in arr {
                    table.add_row(vec![format_value(item)]);
                }
            }
            table.to_string()
        }
        Value::Object(obj) => {
            let mut table = Table::new();
            table.set_header(vec!["Key", "Value"]);

            for (key, val) in obj {
                if !val.is_null() {
                    table.add_row(vec![key.clone(), format_value(val)]);
                }
            }
            table.to_string()
        }
        _ => format_value(value),
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(arr) => arr.iter().map(format_value).collect::<Vec<_>>().join(", "),
        Value::Object(obj) => format!("{{{} fields}}", obj.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_table_skips_nulls() {
        let rendered = render_table(&json!({
            "primary_id": "snap-1",
            "dependent_id": null,
            "outcome": "completed",
        }));

        assert!(rendered.contains("snap-1"));
        assert!(rendered.contains("completed"));
        assert!(!rendered.contains("dependent_id"));
    }

    #[test]
    fn test_array_table_uses_first_object_keys() {
        let rendered = render_table(&json!([
            {"name": "orders", "region": "eu-west-1"},
            {"name": "billing", "region": null},
        ]));

        assert!(rendered.contains("name"));
        assert!(rendered.contains("billing"));
        assert!(rendered.contains("-"));
    }

    #[test]
    fn test_list_values_are_joined() {
        assert_eq!(format_value(&json!(["a", "b"])), "a, b");
    }
}
