use crate::bulk::{self, BulkMarksRequest};
use crate::ipc::helpers::{db_conn, parse_value, require_admin, required_str, respond, to_json, HandlerErr, HandlerResult};
use crate::ipc::types::{AppState, Request};
use crate::marks::{self, MarksOrder, MarksPatch, NewMarksEntry};
use serde_json::json;

fn parse_order(params: &serde_json::Value) -> Result<MarksOrder, HandlerErr> {
    match params.get("order").and_then(|v| v.as_str()) {
        None => Ok(MarksOrder::default()),
        Some(raw) => MarksOrder::parse(raw).ok_or_else(|| HandlerErr {
            code: "bad_params",
            message: format!("unknown order: {}", raw),
            details: Some(json!({ "allowed": ["examDateDesc", "examDateAsc", "createdDesc"] })),
        }),
    }
}

fn handle_list(state: &AppState, req: &Request) -> HandlerResult {
    require_admin(req)?;
    let conn = db_conn(state)?;
    let filter = marks::parse_marks_filter(req.params.get("filters"))?;
    let order = parse_order(&req.params)?;
    let entries = marks::query(conn, &filter, order)?;
    Ok(json!({
        "count": entries.len(),
        "marks": to_json(&entries)?,
    }))
}

fn handle_create(state: &AppState, req: &Request) -> HandlerResult {
    let actor = require_admin(req)?;
    let conn = db_conn(state)?;
    let new: NewMarksEntry = parse_value(Some(&req.params), "marks entry")?;
    let entry = marks::create(conn, &new, &actor.id)?;
    Ok(json!({ "entry": to_json(&entry)? }))
}

fn handle_update(state: &AppState, req: &Request) -> HandlerResult {
    require_admin(req)?;
    let conn = db_conn(state)?;
    let id = required_str(&req.params, "id")?;
    let patch: MarksPatch = parse_value(req.params.get("patch"), "patch")?;
    let entry = marks::update(conn, &id, &patch)?;
    Ok(json!({ "entry": to_json(&entry)? }))
}

fn handle_delete(state: &AppState, req: &Request) -> HandlerResult {
    require_admin(req)?;
    let conn = db_conn(state)?;
    let id = required_str(&req.params, "id")?;
    marks::delete(conn, &id)?;
    Ok(json!({ "deleted": true }))
}

fn handle_bulk_upload(state: &AppState, req: &Request) -> HandlerResult {
    let actor = require_admin(req)?;
    let conn = db_conn(state)?;
    let batch: BulkMarksRequest = parse_value(Some(&req.params), "bulk upload")?;
    to_json(&bulk::ingest(conn, &batch, &actor.id)?)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let outcome = match req.method.as_str() {
        "marks.list" => handle_list(state, req),
        "marks.create" => handle_create(state, req),
        "marks.update" => handle_update(state, req),
        "marks.delete" => handle_delete(state, req),
        "marks.bulkUpload" => handle_bulk_upload(state, req),
        _ => return None,
    };
    Some(respond(req, outcome))
}
