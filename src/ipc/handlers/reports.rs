use crate::config::Config;
use crate::fields::FieldMap;
use crate::ipc::error::{ok, HandlerErr};
use crate::ipc::helpers::{self, required_roll, required_str};
use crate::ipc::types::{AppState, Request};
use crate::{docx, pdf};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::Path;

use super::students;

/// Renderers get the same record a `students.get` would return, completed so
/// that every mapped external field is present (empty when the sheet has no
/// value). Templates can reference any mapped field without caring whether
/// the column has been filled in yet.
fn resolved_record(
    cfg: &Config,
    fields: &FieldMap,
    roll: &str,
) -> Result<BTreeMap<String, String>, HandlerErr> {
    let mut record = students::fetch_external_record(cfg, fields, roll)?;
    for name in fields.external_names() {
        record.entry(name.to_string()).or_default();
    }
    Ok(record)
}

fn report_docx(
    cfg: &Config,
    fields: &FieldMap,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let roll = required_roll(params)?;
    let out_path = required_str(params, "outPath")?;
    let record = resolved_record(cfg, fields, &roll)?;

    if !cfg.template_path.is_file() {
        return Err(HandlerErr::new("template_missing", "DOCX template missing"));
    }
    docx::render_template(&cfg.template_path, Path::new(&out_path), &record)
        .map_err(|e| HandlerErr::new("render_failed", format!("Render failed: {e:#}")))?;

    tracing::info!(roll = %roll, out = %out_path, "docx result generated");
    Ok(json!({
        "fileName": format!("Result_{roll}.docx"),
        "outPath": out_path,
    }))
}

fn report_pdf(
    cfg: &Config,
    fields: &FieldMap,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let roll = required_roll(params)?;
    let out_path = required_str(params, "outPath")?;
    let record = resolved_record(cfg, fields, &roll)?;

    pdf::render_report(&record, Path::new(&out_path))
        .map_err(|e| HandlerErr::new("render_failed", format!("Render failed: {e:#}")))?;

    tracing::info!(roll = %roll, out = %out_path, "pdf result generated");
    Ok(json!({
        "fileName": format!("Result_{roll}.pdf"),
        "outPath": out_path,
    }))
}

fn handle_docx(state: &mut AppState, req: &Request) -> serde_json::Value {
    let cfg = match helpers::config(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match report_docx(cfg, &state.fields, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(e) => e.response(&req.id),
    }
}

fn handle_pdf(state: &mut AppState, req: &Request) -> serde_json::Value {
    let cfg = match helpers::config(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match report_pdf(cfg, &state.fields, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(e) => e.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.docx" => Some(handle_docx(state, req)),
        "reports.pdf" => Some(handle_pdf(state, req)),
        _ => None,
    }
}
