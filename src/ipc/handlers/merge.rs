use crate::config::{Config, STUDENT_SHEET};
use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::helpers;
use crate::ipc::types::{AppState, Request};
use crate::workbook;
use serde_json::json;
use std::path::{Path, PathBuf};

use super::students::KEY_COLUMN;

fn merge_upload(cfg: &Config, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let staged = helpers::optional_str(params, "path")
        .map(PathBuf::from)
        .filter(|p| p.is_file())
        .ok_or_else(|| HandlerErr::bad_params("No file uploaded"))?;

    // The staged upload is removed whether the merge was accepted or not;
    // cleanup failure is not worth failing an otherwise-finished request.
    let outcome = merge_staged(cfg, &staged);
    if let Err(e) = std::fs::remove_file(&staged) {
        tracing::warn!(path = %staged.display(), error = %e, "failed to remove staged upload");
    }

    let merged = outcome?;
    Ok(json!({
        "merged": merged,
        "message": format!("Successfully merged {merged} students!"),
    }))
}

fn merge_staged(cfg: &Config, staged: &Path) -> Result<usize, HandlerErr> {
    let source = workbook::load(staged).map_err(HandlerErr::io)?;
    if source.is_empty() {
        return Err(HandlerErr::bad_params("Uploaded file is empty"));
    }
    if source.column_index(KEY_COLUMN).is_none() {
        return Err(HandlerErr::bad_params(
            "Uploaded file must have \"Roll No\" column",
        ));
    }

    let mut main = workbook::load(&cfg.student_data_path).map_err(HandlerErr::io)?;
    let merged = main.merge_from(&source, KEY_COLUMN)?;
    workbook::save(&cfg.student_data_path, &main, STUDENT_SHEET).map_err(HandlerErr::io)?;
    tracing::info!(merged, "merged uploaded sheet into master");
    Ok(merged)
}

fn handle_merge_upload(state: &mut AppState, req: &Request) -> serde_json::Value {
    let cfg = match helpers::config(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match merge_upload(cfg, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(e) => e.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.mergeUpload" => Some(handle_merge_upload(state, req)),
        _ => None,
    }
}
