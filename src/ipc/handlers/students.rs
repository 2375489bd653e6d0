use crate::config::{Config, STUDENT_SHEET};
use crate::fields::FieldMap;
use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::helpers::{self, required_roll};
use crate::ipc::types::{AppState, Request};
use crate::{photos, workbook};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::Path;

pub const KEY_COLUMN: &str = "Roll No";

/// Read path shared by `students.get` and the report generators: load the
/// sheet fresh, locate the row by roll, project it, and translate to external
/// field names. The photo path rides along when a photo file exists.
pub(super) fn fetch_external_record(
    cfg: &Config,
    fields: &FieldMap,
    roll: &str,
) -> Result<BTreeMap<String, String>, HandlerErr> {
    let table = workbook::load(&cfg.student_data_path).map_err(HandlerErr::io)?;
    if table.is_empty() {
        return Err(HandlerErr::not_found("No data"));
    }
    let key_idx = table
        .column_index(KEY_COLUMN)
        .ok_or_else(|| HandlerErr::new("schema_missing_column", "Roll No column missing"))?;
    let row_idx = table
        .find_row(key_idx, roll)
        .ok_or_else(|| HandlerErr::not_found("Student not found"))?;

    let mut record = fields.record_to_external(&table.record(row_idx));
    if let Some(path) = photos::access_path(&cfg.photo_dir, roll) {
        record.insert("ImagePath".to_string(), path);
    }
    Ok(record)
}

fn student_get(
    cfg: &Config,
    fields: &FieldMap,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let roll = required_roll(params)?;
    let record = fetch_external_record(cfg, fields, &roll)?;
    Ok(json!(record))
}

fn student_save(
    cfg: &Config,
    fields: &FieldMap,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let roll = required_roll(params)?;

    let mut table = workbook::load(&cfg.student_data_path).map_err(HandlerErr::io)?;
    table.ensure_columns(&fields.store_columns());

    // External field names come in; columns the sheet does not track after
    // reconciliation are dropped silently by the upsert.
    let mut patch = BTreeMap::new();
    for (name, value) in helpers::cell_patch(params, "fields") {
        patch.insert(fields.store_name(&name).to_string(), value);
    }
    table.upsert(KEY_COLUMN, &roll, &patch)?;

    if let Some(staged) = helpers::optional_str(params, "photoPath") {
        let original_name = helpers::optional_str(params, "photoName").unwrap_or_default();
        photos::store_photo(&cfg.photo_dir, &roll, Path::new(&staged), &original_name)
            .map_err(HandlerErr::io)?;
    }

    workbook::save(&cfg.student_data_path, &table, STUDENT_SHEET).map_err(HandlerErr::io)?;
    tracing::info!(roll = %roll, "student record saved");
    Ok(json!({ "ok": true }))
}

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let cfg = match helpers::config(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match student_get(cfg, &state.fields, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(e) => e.response(&req.id),
    }
}

fn handle_save(state: &mut AppState, req: &Request) -> serde_json::Value {
    let cfg = match helpers::config(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match student_save(cfg, &state.fields, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(e) => e.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.get" => Some(handle_get(state, req)),
        "students.save" => Some(handle_save(state, req)),
        _ => None,
    }
}
