//! Branch (if) executor - conditional edge selection.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use super::types::{ExecutionContext, Executor};
use crate::engine::LogKind;
use crate::error::Result;

/// Branch executor.
///
/// Evaluates its configured conditions against the propagated input and
/// returns `{"condition_result": bool, "value": input}`. The dispatcher
/// filters the node's outgoing edges on that boolean: `sourceHandle: "true"`
/// edges fire only when true, `"false"` only when false.
///
/// Ill-formed configs and conditions never fail the node: they evaluate to
/// false so the graph keeps progressing deterministically, with a log entry
/// recording what happened.
pub struct BranchExecutor;

impl BranchExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BranchExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct BranchConfig {
    #[serde(default)]
    conditions: Vec<Condition>,
    #[serde(default = "default_match_mode")]
    match_mode: String, // "all" | "any"
}

#[derive(Debug, Deserialize)]
struct Condition {
    field: String,
    operator: String,
    value: Value,
}

fn default_match_mode() -> String {
    "all".to_string()
}

#[async_trait]
impl Executor for BranchExecutor {
    fn node_type(&self) -> &str {
        "if"
    }

    fn description(&self) -> &str {
        "Evaluate conditions and select the true or false edge"
    }

    async fn execute(&self, ctx: &ExecutionContext) -> Result<Value> {
        let outcome = match serde_json::from_value::<BranchConfig>(ctx.data().clone()) {
            Ok(config) => evaluate_branch(&config, ctx),
            Err(e) => {
                ctx.add_log(
                    LogKind::Info,
                    format!("Invalid if config ({}), falling back to false", e),
                );
                false
            }
        };

        Ok(json!({
            "condition_result": outcome,
            "value": ctx.input,
        }))
    }
}

fn evaluate_branch(config: &BranchConfig, ctx: &ExecutionContext) -> bool {
    if config.conditions.is_empty() {
        ctx.add_log(
            LogKind::Info,
            "If node has no conditions, falling back to false",
        );
        return false;
    }

    let results: Vec<bool> = config
        .conditions
        .iter()
        .map(|condition| {
            let left = resolve_field(&condition.field, ctx);
            evaluate_condition(&left, &condition.operator, &condition.value, ctx)
        })
        .collect();

    match config.match_mode.to_lowercase().as_str() {
        "any" => results.iter().any(|r| *r),
        "all" => results.iter().all(|r| *r),
        other => {
            ctx.add_log(
                LogKind::Info,
                format!("Invalid match_mode '{}', falling back to false", other),
            );
            false
        }
    }
}

/// Evaluate one condition. Unknown operators and non-comparable operands
/// resolve to false rather than failing the node.
fn evaluate_condition(left: &Value, operator: &str, right: &Value, ctx: &ExecutionContext) -> bool {
    match operator {
        "equals" => left == right,
        "not_equals" => left != right,
        "contains" => match left {
            Value::String(s) => right
                .as_str()
                .map(|needle| s.contains(needle))
                .unwrap_or(false),
            Value::Array(items) => items.contains(right),
            Value::Object(map) => right.as_str().map(|k| map.contains_key(k)).unwrap_or(false),
            _ => false,
        },
        "gt" | "lt" | "gte" | "lte" => match (as_f64(left), as_f64(right)) {
            (Some(l), Some(r)) => match operator {
                "gt" => l > r,
                "lt" => l < r,
                "gte" => l >= r,
                "lte" => l <= r,
                _ => false,
            },
            _ => {
                ctx.add_log(
                    LogKind::Info,
                    format!("Operator '{}' on non-numeric operands, treated as false", operator),
                );
                false
            }
        },
        "regex" => {
            let Some(pattern) = right.as_str() else {
                return false;
            };
            match regex_lite::Regex::new(pattern) {
                Ok(regex) => regex.is_match(&stringify_value(left)),
                Err(e) => {
                    ctx.add_log(
                        LogKind::Info,
                        format!("Invalid regex '{}' ({}), treated as false", pattern, e),
                    );
                    false
                }
            }
        }
        other => {
            warn!("Unsupported if operator '{}', treated as false", other);
            ctx.add_log(
                LogKind::Info,
                format!("Unsupported operator '{}', treated as false", other),
            );
            false
        }
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    }
}

fn stringify_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        _ => value.to_string(),
    }
}

/// Resolve a condition field against the context: `input`, `input.path`,
/// `nodes.<id>.output[.path]` (read from the status snapshot), or a literal.
/// `{{ ... }}` wrapping is tolerated.
fn resolve_field(field: &str, ctx: &ExecutionContext) -> Value {
    let expr = normalize_template(field.trim());
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

    Value::String(field.to_string())
}

fn normalize_template(expr: &str) -> &str {
    let trimmed = expr.trim();
    if trimmed.starts_with("{{") && trimmed.ends_with("}}") {
        trimmed[2..trimmed.len() - 2].trim()
    } else {
        trimmed
    }
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
