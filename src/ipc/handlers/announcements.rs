use crate::announcements::{self, AnnouncementPatch, NewAnnouncement};
use crate::ipc::helpers::{db_conn, parse_value, require_admin, required_str, respond, to_json, HandlerResult};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_list(state: &AppState, req: &Request) -> HandlerResult {
    require_admin(req)?;
    let conn = db_conn(state)?;
    let rows = announcements::list(conn)?;
    Ok(json!({ "announcements": to_json(&rows)? }))
}

fn handle_create(state: &AppState, req: &Request) -> HandlerResult {
    let actor = require_admin(req)?;
    let conn = db_conn(state)?;
    let new: NewAnnouncement = parse_value(Some(&req.params), "announcement")?;
    let a = announcements::create(conn, &new, &actor.id)?;
    Ok(json!({ "announcement": to_json(&a)? }))
}

fn handle_update(state: &AppState, req: &Request) -> HandlerResult {
    require_admin(req)?;
    let conn = db_conn(state)?;
    let id = required_str(&req.params, "id")?;
    let patch: AnnouncementPatch = parse_value(req.params.get("patch"), "patch")?;
    let a = announcements::update(conn, &id, &patch)?;
    Ok(json!({ "announcement": to_json(&a)? }))
}

fn handle_delete(state: &AppState, req: &Request) -> HandlerResult {
    require_admin(req)?;
    let conn = db_conn(state)?;
    let id = required_str(&req.params, "id")?;
    announcements::delete(conn, &id)?;
    Ok(json!({ "deleted": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let outcome = match req.method.as_str() {
        "announcements.list" => handle_list(state, req),
        "announcements.create" => handle_create(state, req),
        "announcements.update" => handle_update(state, req),
        "announcements.delete" => handle_delete(state, req),
        _ => return None,
    };
    Some(respond(req, outcome))
}
