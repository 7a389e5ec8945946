use crate::announcements;
use crate::dates;
use crate::ipc::helpers::{parse_value, require_student, respond, to_json, HandlerResult};
use crate::ipc::types::{AppState, Request};
use crate::marks;
use crate::reports;
use crate::students::{self, ProfilePatch};
use serde_json::json;

fn handle_profile_get(state: &AppState, req: &Request) -> HandlerResult {
    let (_, me) = require_student(state, req)?;
    Ok(json!({ "student": to_json(&me)? }))
}

fn handle_profile_update(state: &AppState, req: &Request) -> HandlerResult {
    let (conn, me) = require_student(state, req)?;
    let patch: ProfilePatch = parse_value(Some(&req.params), "profile")?;
    let updated = students::update_profile(conn, &me.id, &patch)?;
    Ok(json!({ "student": to_json(&updated)? }))
}

fn handle_marks(state: &AppState, req: &Request) -> HandlerResult {
    let (conn, me) = require_student(state, req)?;
    let filter = marks::parse_marks_filter(req.params.get("filters"))?;
    to_json(&reports::student_marks(conn, &me.id, &filter)?)
}

fn handle_results_summary(state: &AppState, req: &Request) -> HandlerResult {
    let (conn, me) = require_student(state, req)?;
    to_json(&reports::student_summary(conn, &me)?)
}

fn handle_announcements(state: &AppState, req: &Request) -> HandlerResult {
    let (conn, me) = require_student(state, req)?;
    let rows = announcements::visible_to(conn, &me.class, dates::today())?;
    Ok(json!({ "announcements": to_json(&rows)? }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let outcome = match req.method.as_str() {
        "student.profile.get" => handle_profile_get(state, req),
        "student.profile.update" => handle_profile_update(state, req),
        "student.marks" => handle_marks(state, req),
        "student.results.summary" => handle_results_summary(state, req),
        "student.announcements" => handle_announcements(state, req),
        _ => return None,
    };
    Some(respond(req, outcome))
}
