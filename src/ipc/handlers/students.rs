use crate::ipc::helpers::{db_conn, parse_value, require_admin, required_str, respond, to_json, HandlerErr, HandlerResult};
use crate::ipc::types::{AppState, Request};
use crate::students::{self, NewStudent, StatusFilter, StudentListQuery, StudentPatch};
use serde_json::json;

fn opt_str(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("all"))
        .map(str::to_string)
}

fn opt_usize(params: &serde_json::Value, key: &str) -> Result<Option<usize>, HandlerErr> {
    match params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| HandlerErr::bad_params(format!("{} must be a non-negative integer", key))),
    }
}

fn list_query(params: &serde_json::Value) -> Result<StudentListQuery, HandlerErr> {
    let mut q = StudentListQuery {
        search: opt_str(params, "search"),
        class: opt_str(params, "class"),
        section: opt_str(params, "section"),
        ..StudentListQuery::default()
    };
    q.status = match opt_str(params, "status").as_deref() {
        None => StatusFilter::Any,
        Some("active") => StatusFilter::Active,
        Some("inactive") => StatusFilter::Inactive,
        Some(other) => {
            return Err(HandlerErr::bad_params(format!(
                "status must be active or inactive, got {}",
                other
            )))
        }
    };
    if let Some(page) = opt_usize(params, "page")? {
        if page < 1 {
            return Err(HandlerErr::bad_params("page must be >= 1"));
        }
        q.page = page;
    }
    if let Some(limit) = opt_usize(params, "limit")? {
        if !(1..=students::LIST_MAX_LIMIT).contains(&limit) {
            return Err(HandlerErr::bad_params(format!(
                "limit must be between 1 and {}",
                students::LIST_MAX_LIMIT
            )));
        }
        q.limit = limit;
    }
    Ok(q)
}

fn handle_list(state: &AppState, req: &Request) -> HandlerResult {
    require_admin(req)?;
    let conn = db_conn(state)?;
    let q = list_query(&req.params)?;
    to_json(&students::list(conn, &q)?)
}

fn handle_create(state: &AppState, req: &Request) -> HandlerResult {
    require_admin(req)?;
    let conn = db_conn(state)?;
    let new: NewStudent = parse_value(Some(&req.params), "student")?;
    let student = students::create(conn, &new)?;
    Ok(json!({ "student": to_json(&student)? }))
}

fn handle_get(state: &AppState, req: &Request) -> HandlerResult {
    require_admin(req)?;
    let conn = db_conn(state)?;
    let id = required_str(&req.params, "id")?;
    let student = students::get(conn, &id)?;
    Ok(json!({ "student": to_json(&student)? }))
}

fn handle_update(state: &AppState, req: &Request) -> HandlerResult {
    require_admin(req)?;
    let conn = db_conn(state)?;
    let id = required_str(&req.params, "id")?;
    let patch: StudentPatch = parse_value(req.params.get("patch"), "patch")?;
    let student = students::update(conn, &id, &patch)?;
    Ok(json!({ "student": to_json(&student)? }))
}

fn handle_delete(state: &AppState, req: &Request) -> HandlerResult {
    require_admin(req)?;
    let conn = db_conn(state)?;
    let id = required_str(&req.params, "id")?;
    let removed = students::delete(conn, &id)?;
    Ok(json!({ "deleted": true, "marksRemoved": removed }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let outcome = match req.method.as_str() {
        "students.list" => handle_list(state, req),
        "students.create" => handle_create(state, req),
        "students.get" => handle_get(state, req),
        "students.update" => handle_update(state, req),
        "students.delete" => handle_delete(state, req),
        _ => return None,
    };
    Some(respond(req, outcome))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_query_defaults_and_bounds() {
        let q = list_query(&json!({})).expect("defaults");
        assert_eq!(q.page, 1);
        assert_eq!(q.limit, students::LIST_DEFAULT_LIMIT);
        assert_eq!(q.status, StatusFilter::Any);

        let q = list_query(&json!({ "class": "ALL", "search": " asha ", "status": "inactive", "limit": 100 }))
            .expect("filters");
        assert_eq!(q.class, None);
        assert_eq!(q.search.as_deref(), Some("asha"));
        assert_eq!(q.status, StatusFilter::Inactive);
        assert_eq!(q.limit, 100);

        assert!(list_query(&json!({ "limit": 0 })).is_err());
        assert!(list_query(&json!({ "limit": 101 })).is_err());
        assert!(list_query(&json!({ "page": 0 })).is_err());
        assert!(list_query(&json!({ "page": -2 })).is_err());
        assert!(list_query(&json!({ "status": "graduated" })).is_err());
    }
}
