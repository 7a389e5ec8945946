use crate::ipc::helpers::{db_conn, require_admin, respond, to_json, HandlerResult};
use crate::ipc::types::{AppState, Request};
use crate::marks;
use crate::reports;

fn handle_dashboard(state: &AppState, req: &Request) -> HandlerResult {
    require_admin(req)?;
    let conn = db_conn(state)?;
    to_json(&reports::dashboard(conn)?)
}

fn handle_performance(state: &AppState, req: &Request) -> HandlerResult {
    require_admin(req)?;
    let conn = db_conn(state)?;
    let filter = marks::parse_marks_filter(req.params.get("filters"))?;
    to_json(&reports::performance_analytics(conn, &filter)?)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let outcome = match req.method.as_str() {
        "dashboard.stats" => handle_dashboard(state, req),
        "analytics.performance" => handle_performance(state, req),
        _ => return None,
    };
    Some(respond(req, outcome))
}
