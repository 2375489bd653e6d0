use crate::config::{Config, DONOR_SHEET};
use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::helpers::{self, required_roll};
use crate::ipc::types::{AppState, Request};
use crate::{photos, workbook};
use serde_json::json;
use std::path::Path;

/// Donor sheet schema. The key column is lower-case `roll`; reads also accept
/// older sheets that used the primary table's `Roll No` spelling.
const KEY_COLUMN: &str = "roll";
const LEGACY_KEY_COLUMN: &str = "Roll No";
const DONOR_COLUMNS: &[&str] = &[
    "roll",
    "Name",
    "Class",
    "Session",
    "AdmissionDate",
    "Donor ID",
    "Donor Name",
];

fn donor_get(cfg: &Config, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let roll = required_roll(params)?;

    if !cfg.donor_data_path.exists() {
        return Err(HandlerErr::not_found("Donor file not found"));
    }
    let table = workbook::load(&cfg.donor_data_path).map_err(HandlerErr::io)?;
    if table.is_empty() {
        return Err(HandlerErr::not_found("No donor data"));
    }
    let key_idx = table
        .key_column_index(KEY_COLUMN, LEGACY_KEY_COLUMN)
        .ok_or_else(|| HandlerErr::new("schema_missing_column", "Roll column missing"))?;
    let row_idx = table
        .find_row(key_idx, &roll)
        .ok_or_else(|| HandlerErr::not_found("Donor student not found"))?;

    // Donor records go out under their store column names, untranslated.
    let mut record = table.record(row_idx);
    if let Some(path) = photos::access_path(&cfg.photo_dir, &roll) {
        record.insert("ImagePath".to_string(), path);
    }
    Ok(json!(record))
}

fn donor_save(cfg: &Config, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let roll = required_roll(params)?;

    let mut table = workbook::load(&cfg.donor_data_path).map_err(HandlerErr::io)?;
    table.ensure_columns(DONOR_COLUMNS);

    let patch = helpers::cell_patch(params, "fields");
    table.upsert(KEY_COLUMN, &roll, &patch)?;

    if let Some(staged) = helpers::optional_str(params, "photoPath") {
        let original_name = helpers::optional_str(params, "photoName").unwrap_or_default();
        photos::store_photo(&cfg.photo_dir, &roll, Path::new(&staged), &original_name)
            .map_err(HandlerErr::io)?;
    }

    workbook::save(&cfg.donor_data_path, &table, DONOR_SHEET).map_err(HandlerErr::io)?;
    tracing::info!(roll = %roll, "donor record saved");
    Ok(json!({ "ok": true }))
}

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let cfg = match helpers::config(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match donor_get(cfg, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(e) => e.response(&req.id),
    }
}

fn handle_save(state: &mut AppState, req: &Request) -> serde_json::Value {
    let cfg = match helpers::config(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match donor_save(cfg, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(e) => e.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "donors.get" => Some(handle_get(state, req)),
        "donors.save" => Some(handle_save(state, req)),
        _ => None,
    }
}
