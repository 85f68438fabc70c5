//! Upstream payload adapter
//!
//! The AI service answers either with an envelope object or, in older
//! revisions, with a bare list of entries. Both normalize into
//! [`UpstreamPayload`]; anything else is [`Error::MalformedPayload`].

use matchmate_core::{Error, Result};
use serde_json::{Map, Value};

/// One validated entry of an upstream answer
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamEntry {
    pub user_id: String,
    /// Clamped into [0, 1]
    pub compatibility_score: f64,
    pub cluster_id: Option<i64>,
    /// Remaining fields, passed through untouched
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpstreamPayload {
    pub entries: Vec<UpstreamEntry>,
    pub cluster_info: Option<Value>,
    pub model_metrics: Option<Value>,
    pub requested_user_id: Option<String>,
}

impl UpstreamPayload {
    pub fn parse(value: Value) -> Result<Self> {
        match value {
            Value::Array(items) => Ok(Self {
                entries: parse_entries(items)?,
                ..Default::default()
            }),
            Value::Object(mut envelope) => {
                let items = match envelope.remove("recommendations") {
                    Some(Value::Array(items)) => items,
                    Some(_) => return Err(malformed("`recommendations` is not a list")),
                    None => return Err(malformed("missing `recommendations`")),
                };
                Ok(Self {
                    entries: parse_entries(items)?,
                    cluster_info: non_null(envelope.remove("cluster_info")),
                    model_metrics: non_null(envelope.remove("model_metrics")),
                    requested_user_id: envelope
                        .remove("requested_user_id")
                        .and_then(|v| v.as_str().map(str::to_string)),
                })
            }
            other => Err(malformed(format!("unexpected {} payload", kind(&other)))),
        }
    }

    /// Cluster of the requester, when the service reports it
    pub fn requester_cluster(&self) -> Option<i64> {
        let info = self.cluster_info.as_ref()?;
        ["user_cluster", "cluster_id", "cluster"]
            .iter()
            .find_map(|key| info.get(key).and_then(Value::as_i64))
    }
}

fn parse_entries(items: Vec<Value>) -> Result<Vec<UpstreamEntry>> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| parse_entry(item).map_err(|reason| malformed(format!("entry {}: {}", index, reason))))
        .collect()
}

fn parse_entry(item: Value) -> std::result::Result<UpstreamEntry, String> {
    let Value::Object(mut fields) = item else {
        return Err(format!("expected an object, got {}", kind(&item)));
    };

    let user_id = match fields.remove("user_id") {
        Some(Value::String(id)) if !id.trim().is_empty() => id,
        _ => return Err("missing or empty `user_id`".to_string()),
    };

    let score = fields
        .remove("compatibility_score")
        .and_then(|v| v.as_f64())
        .ok_or_else(|| "missing numeric `compatibility_score`".to_string())?;
    if !score.is_finite() || !(-1.0..=1.0).contains(&score) {
        return Err(format!("`compatibility_score` {} out of range", score));
    }

    let cluster_id = fields.remove("cluster_id");
    let cluster = fields.remove("cluster");
    let cluster_id = cluster_id.or(cluster).as_ref().and_then(Value::as_i64);

    Ok(UpstreamEntry {
        user_id,
        compatibility_score: score.clamp(0.0, 1.0),
        cluster_id,
        extra: fields,
    })
}

fn non_null(value: Option<Value>) -> Option<Value> {
    value.filter(|v| !v.is_null())
}

fn malformed(reason: impl Into<String>) -> Error {
    Error::MalformedPayload(reason.into())
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
