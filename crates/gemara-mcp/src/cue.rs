//! Conversion of JSON / YAML data into CUE source.
//!
//! Only data import is supported; evaluating or validating CUE needs a CUE engine.
use mcp_common::mcp_api::DataFormat;
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::AppError;

const KEYWORDS: &[&str] = &[
    "package", "import", "for", "in", "if", "let", "true", "false", "null",
];

/// Decode `content` as `format` and render it as CUE.
pub fn import_to_cue(content: &str, format: DataFormat) -> Result<String, AppError> {
    let value: Value = match format {
        DataFormat::Json => serde_json::from_str(content).map_err(|e| AppError::Decode {
            format: "JSON",
            message: e.to_string(),
        })?,
        DataFormat::Yaml => serde_yaml::from_str(content).map_err(|e| AppError::Decode {
            format: "YAML",
            message: e.to_string(),
        })?,
    };
    Ok(render(&value))
}

/// Render a data value as CUE. A top-level object becomes a list of top-level fields.
pub fn render(value: &Value) -> String {
    let mut writer = CueWriter::new();
    match value {
        Value::Object(map) if !map.is_empty() => writer.fields(map, 0),
        other => {
            writer.value(other, 0);
            writer.out.push('\n');
        }
    }
    writer.out
}

struct CueWriter {
    out: String,
    identifier: Regex,
}

impl CueWriter {
    fn new() -> Self {
        Self {
            out: String::new(),
            identifier: Regex::new(r"^[A-Za-z$][A-Za-z0-9_$]*$").expect("valid regex"),
        }
    }

    fn fields(&mut self, map: &Map<String, Value>, indent: usize) {
        for (key, value) in map {
            self.indent(indent);
            self.label(key);
            self.out.push_str(": ");
            self.value(value, indent);
            self.out.push('\n');
        }
    }

    fn value(&mut self, value: &Value, indent: usize) {
        match value {
            Value::Null => self.out.push_str("null"),
            Value::Bool(b) => self.out.push_str(if *b { "true" } else { "false" }),
            Value::Number(n) => self.out.push_str(&n.to_string()),
            Value::String(s) => self.string(s),
            Value::Array(items) if items.is_empty() => self.out.push_str("[]"),
            Value::Array(items) if items.iter().all(is_scalar) => {
                self.out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.value(item, indent);
                }
                self.out.push(']');
            }
            Value::Array(items) => {
                self.out.push_str("[\n");
                for item in items {
                    self.indent(indent + 1);
                    self.value(item, indent + 1);
                    self.out.push_str(",\n");
                }
                self.indent(indent);
                self.out.push(']');
            }
            Value::Object(map) if map.is_empty() => self.out.push_str("{}"),
            Value::Object(map) => {
                self.out.push_str("{\n");
                self.fields(map, indent + 1);
                self.indent(indent);
                self.out.push('}');
            }
        }
    }

    fn label(&mut self, key: &str) {
        if self.identifier.is_match(key) && !KEYWORDS.contains(&key) {
            self.out.push_str(key);
        } else {
            self.string(key);
        }
    }

    fn string(&mut self, s: &str) {
        // JSON string escapes are a subset of CUE's.
        match serde_json::to_string(s) {
            Ok(quoted) => self.out.push_str(&quoted),
            Err(_) => self.out.push_str("\"\""),
        }
    }

    fn indent(&mut self, depth: usize) {
        for _ in 0..depth {
            self.out.push('\t');
        }
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}
