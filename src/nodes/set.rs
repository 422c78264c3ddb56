//! Set executor - add or update fields in object data.

use chrono::Utc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::types::{ExecutionContext, Executor};
use crate::error::{Error, Result};

/// Set executor.
///
/// Merges configured field assignments into the (object) input. String
/// values support `{{ ... }}` templates resolved against the input and other
/// nodes' recorded outputs.
pub struct SetExecutor;

impl SetExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SetExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct SetConfig {
    fields: Vec<SetField>,
}

#[derive(Debug, Deserialize)]
struct SetField {
    name: String,
    value: Value,
}

#[async_trait]
impl Executor for SetExecutor {
    fn node_type(&self) -> &str {
        "set"
    }

    fn description(&self) -> &str {
        "Set or update fields in object data"
    }

    async fn execute(&self, ctx: &ExecutionContext) -> Result<Value> {
        let config: SetConfig = serde_json::from_value(ctx.data().clone())
            .map_err(|e| Error::Node(format!("Invalid set config: {}", e)))?;

        if config.fields.is_empty() {
            return Err(Error::Node(
                "Set node requires at least one field assignment".to_string(),
            ));
        }

        let mut output = match &ctx.input {
            Value::Object(obj) => obj.clone(),
            _ => Map::new(),
        };

        for assignment in &config.fields {
            if assignment.name.trim().is_empty() {
                return Err(Error::Node(
                    "Set node field name cannot be empty".to_string(),
                ));
            }

            let rendered = render_value(&assignment.value, ctx);
            set_path_value(&mut output, &assignment.name, rendered);
        }

        Ok(Value::Object(output))
    }
}

fn render_value(value: &Value, ctx: &ExecutionContext) -> Value {
    match value {
        Value::String(s) => render_string_value(s, ctx),
        Value::Array(arr) => Value::Array(arr.iter().map(|v| render_value(v, ctx)).collect()),
        Value::Object(obj) => {
            let mut out = Map::new();
            for (k, v) in obj {
                out.insert(k.clone(), render_value(v, ctx));
            }
            Value::Object(out)
        }
        _ => value.clone(),
    }
}

fn render_string_value(template: &str, ctx: &ExecutionContext) -> Value {
    let full_template = regex_lite::Regex::new(r"^\s*\{\{\s*([^{}]+?)\s*\}\}\s*$").unwrap();
    if let Some(captures) = full_template.captures(template) {
        let expr = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
        return resolve_expression(expr, ctx);
    }

    let template_re = regex_lite::Regex::new(r"\{\{\s*(.+?)\s*\}\}").unwrap();
    let rendered = template_re
        .replace_all(template, |caps: &regex_lite::Captures| {
            let expr = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let value = resolve_expression(expr, ctx);
            match value {
                Value::String(s) => s,
                other => other.to_string(),
            }
        })
        .to_string();

    Value::String(rendered)
}

fn resolve_expression(expr: &str, ctx: &ExecutionContext) -> Value {
    let expr = expr.trim();

    if expr == "now()" {
        return Value::String(Utc::now().to_rfc3339());
    }

    if expr == "input" {
        return ctx.input.clone();
    }

    if let Some(path) = expr.strip_prefix("input.") {
        return get_path_value(&ctx.input, path).unwrap_or(Value::Null);
    }

    if let Some(rest) = expr.strip_prefix("nodes.") {
        if let Some((node_id, path)) = rest.split_once(".output") {
            let base = ctx
                .status_snapshot()
                .get(node_id)
                .map(|s| s.output.clone())
                .unwrap_or(Value::Null);
            let path = path.strip_prefix('.').unwrap_or(path);
            if path.is_empty() {
                return base;
            }
            return get_path_value(&base, path).unwrap_or(Value::Null);
        }
    }

    Value::Null
}

fn set_path_value(root: &mut Map<String, Value>, path: &str, value: Value) {
    let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return;
    }

    let mut current = root;
    for segment in &segments[..segments.len() - 1] {
        let entry = current
            .entry((*segment).to_string())
            .or_insert_with(|| Value::Object(Map::new()));

        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }

        if let Some(map) = entry.as_object_mut() {
            current = map;
        } else {
            return;
        }
    }

    current.insert(segments[segments.len() - 1].to_string(), value);
}

fn get_path_value(root: &Value, path: &str) -> Option<Value> {
    let mut current = root;
    for segment in path.split('.') {
        if segment.is_empty() {
            continue;
        }
        match current {
            Value::Object(map) => current = map.get(segment)?,
            Value::Array(items) => {
                let index = segment.parse::<usize>().ok()?;
                current = items.get(index)?;
            }
            _ => return None,
        }
    }
    Some(current.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::types::test_support::test_ctx;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_add_fields() {
        let executor = SetExecutor::new();
        let ctx = test_ctx(
            "set",
            json!({
                "fields": [
                    {"name": "status", "value": "processed"},
                    {"name": "full_name", "value": "{{ input.first_name }} {{ input.last_name }}"}
                ]
            }),
            json!({
                "first_name": "Nur",
                "last_name": "Alya"
            }),
        );

        let output = executor.execute(&ctx).await.unwrap();
        assert_eq!(output["status"], "processed");
        assert_eq!(output["full_name"], "Nur Alya");
    }

    #[tokio::test]
    async fn test_set_nested_field() {
        let executor = SetExecutor::new();
        let ctx = test_ctx(
            "set",
            json!({
                "fields": [
                    {"name": "meta.source", "value": "editor"},
                    {"name": "meta.raw", "value": "{{ input }}"}
                ]
            }),
            json!({"order_id": "A-1"}),
        );

        let output = executor.execute(&ctx).await.unwrap();
        assert_eq!(output["meta"]["source"], "editor");
        assert_eq!(output["meta"]["raw"], json!({"order_id": "A-1"}));
    }

    #[tokio::test]
    async fn test_set_reads_other_node_output() {
        let executor = SetExecutor::new();
        let ctx = test_ctx(
            "set",
            json!({
                "fields": [
                    {"name": "copied", "value": "{{ nodes.n1.output.total }}"}
                ]
            }),
            json!({}),
        );
        ctx.run.mark_success("n1", json!({"total": 12}));

        let output = executor.execute(&ctx).await.unwrap();
        assert_eq!(output["copied"], 12);
    }

    #[tokio::test]
    async fn test_set_requires_fields() {
        let executor = SetExecutor::new();
        let ctx = test_ctx("set", json!({"fields": []}), json!({}));
        assert!(executor.execute(&ctx).await.is_err());
    }
}
