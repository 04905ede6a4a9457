use anyhow::Result;
use colored::Colorize;
use libris_client::Book;
use serde::Serialize;
use serde_json::Value;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::cli::{OutputFormat, Theme};

/// The light theme renders plain text: no colors in headings or markers.
pub fn apply_theme(theme: Theme) {
    match theme {
        Theme::Light => colored::control::set_override(false),
        Theme::Dark => colored::control::unset_override(),
    }
}

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

pub fn print_hint(msg: &str) {
    eprintln!("{} {}", "→".yellow(), msg);
}

pub fn print_heading(title: &str) {
    println!("{}", title.cyan().bold());
}

pub fn print_serialized<T: Serialize>(value: &T, format: OutputFormat) -> Result<()> {
    print_value(&serde_json::to_value(value)?, format)
}

pub fn print_value(value: &Value, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => println!("{}", to_yaml(value)),
        OutputFormat::Table => println!("{}", fields_table(value)),
    }
    Ok(())
}

pub fn print_books(books: &[Book], format: OutputFormat) -> Result<()> {
    if format != OutputFormat::Table {
        return print_serialized(&books, format);
    }
    if books.is_empty() {
        println!("No books found.");
        return Ok(());
    }
    println!("{}", books_table(books));
    Ok(())
}

fn books_table(books: &[Book]) -> String {
    let mut builder = Builder::default();
    builder.push_record(["ID", "Title", "Authors"]);
    for book in books {
        let authors = if book.authors.is_empty() {
            "-".to_string()
        } else {
            book.authors.join(", ")
        };
        builder.push_record([book.id.clone(), book.title.clone(), authors]);
    }
    builder.build().with(Style::rounded()).to_string()
}

/// Two-column table of an object's top-level fields.
fn fields_table(value: &Value) -> String {
    let Value::Object(map) = value else {
        return scalar(value);
    };
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, field) in map {
        let rendered = match field {
            Value::Array(items) => items.iter().map(scalar).collect::<Vec<_>>().join(", "),
            Value::Object(_) => field.to_string(),
            other => scalar(other),
        };
        builder.push_record([key.clone(), rendered]);
    }
    builder.build().with(Style::rounded()).to_string()
}

fn scalar(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_yaml(value: &Value) -> String {
    let mut out = String::new();
    match value {
        Value::Object(map) if !map.is_empty() => write_yaml(&mut out, value, 0),
        Value::Array(items) if !items.is_empty() => write_yaml(&mut out, value, 0),
        other => out.push_str(&yaml_scalar(other)),
    }
    out.trim_end().to_string()
}

fn write_yaml(out: &mut String, value: &Value, indent: usize) {
    let pad = " ".repeat(indent);
    match value {
        Value::Object(map) => {
            for (key, field) in map {
                if is_nested(field) {
                    out.push_str(&format!("{pad}{key}:\n"));
                    write_yaml(out, field, indent + 2);
                } else {
                    out.push_str(&format!("{pad}{key}: {}\n", yaml_scalar(field)));
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                if is_nested(item) {
                    out.push_str(&format!("{pad}-\n"));
                    write_yaml(out, item, indent + 2);
                } else {
                    out.push_str(&format!("{pad}- {}\n", yaml_scalar(item)));
                }
            }
        }
        other => out.push_str(&format!("{pad}{}\n", yaml_scalar(other))),
    }
}

fn is_nested(value: &Value) -> bool {
    match value {
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => false,
    }
}

// JSON scalars are valid YAML flow scalars; strings stay double-quoted.
fn yaml_scalar(value: &Value) -> String {
    match value {
        Value::Object(_) => "{}".to_string(),
        Value::Array(_) => "[]".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_yaml_nesting() {
        let yaml = to_yaml(&json!({
            "book": {"authors": ["Frank Herbert"]}
        }));
        assert_eq!(yaml, "book:\n  authors:\n    - \"Frank Herbert\"");

        let yaml = to_yaml(&json!({"meta": {"tags": [], "isbn": null}}));
        assert!(yaml.starts_with("meta:\n"));
        assert!(yaml.contains("  tags: []"));
        assert!(yaml.contains("  isbn: null"));
    }

    #[test]
    fn test_yaml_list_of_objects() {
        let yaml = to_yaml(&json!([{"id": "g1"}, "plain"]));
        assert_eq!(yaml, "-\n  id: \"g1\"\n- \"plain\"");
    }

    #[test]
    fn test_yaml_scalars() {
        assert_eq!(to_yaml(&json!("hello")), "\"hello\"");
        assert_eq!(to_yaml(&json!({})), "{}");
    }

    #[test]
    fn test_books_table_lists_authors() {
        let table = books_table(&[Book {
            id: "g1".into(),
            title: "Good Omens".into(),
            authors: vec!["Terry Pratchett".into(), "Neil Gaiman".into()],
            thumbnail: String::new(),
        }]);
        assert!(table.contains("Good Omens"));
        assert!(table.contains("Terry Pratchett, Neil Gaiman"));
    }

    #[test]
    fn test_fields_table() {
        let table = fields_table(&json!({"username": "ada", "email": null, "tags": ["a", "b"]}));
        assert!(table.contains("ada"));
        assert!(table.contains("a, b"));
        assert!(table.contains('-'));
    }
}
