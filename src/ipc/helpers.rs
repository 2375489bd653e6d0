use std::collections::BTreeMap;

use crate::config::Config;
use crate::ipc::error::{err, HandlerErr};
use crate::ipc::types::{AppState, Request};

pub fn config<'a>(state: &'a AppState, req: &Request) -> Result<&'a Config, serde_json::Value> {
    state
        .config
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

/// The key value every record operation starts from. Must be present and
/// non-blank after trimming; handed on trimmed.
pub fn required_roll(params: &serde_json::Value) -> Result<String, HandlerErr> {
    params
        .get("roll")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| HandlerErr::bad_params("Roll No required"))
}

pub fn required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {key}")))
}

pub fn optional_str(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// The `fields` object of a save request as a column → cell-string patch.
/// Records are open-ended property bags, so any JSON scalar is accepted and
/// coerced to its cell text; null clears the cell.
pub fn cell_patch(params: &serde_json::Value, key: &str) -> BTreeMap<String, String> {
    let Some(obj) = params.get(key).and_then(|v| v.as_object()) else {
        return BTreeMap::new();
    };
    obj.iter()
        .map(|(k, v)| (k.clone(), cell_value(v)))
        .collect()
}

fn cell_value(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
