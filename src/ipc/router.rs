use super::handlers;
use super::types::{AppState, Request};
use crate::ipc::error::err;

type Handler = fn(&mut AppState, &Request) -> Option<serde_json::Value>;

const HANDLERS: &[Handler] = &[
    handlers::core::try_handle,
    handlers::students::try_handle,
    handlers::marks::try_handle,
    handlers::announcements::try_handle,
    handlers::analytics::try_handle,
    handlers::student::try_handle,
];

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    let span = tracing::debug_span!("request", id = %req.id, method = %req.method);
    let _guard = span.enter();

    for handler in HANDLERS {
        if let Some(resp) = handler(state, &req) {
            return resp;
        }
    }

    tracing::warn!("unknown method");
    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use serde_json::json;

    fn call(state: &mut AppState, method: &str, actor: serde_json::Value, params: serde_json::Value) -> serde_json::Value {
        let req: Request = serde_json::from_value(json!({
            "id": "t",
            "method": method,
            "params": params,
            "actor": actor,
        }))
        .expect("request");
        handle_request(state, req)
    }

    fn state() -> AppState {
        AppState {
            workspace: None,
            db: Some(db::open_in_memory()),
        }
    }

    #[test]
    fn unknown_methods_are_not_implemented() {
        let mut st = state();
        let resp = call(&mut st, "grades.explode", json!(null), json!({}));
        assert_eq!(resp["ok"], false);
        assert_eq!(resp["error"]["code"], "not_implemented");
    }

    #[test]
    fn roles_gate_methods() {
        let mut st = state();
        let admin = json!({ "id": "adm-1", "role": "admin" });
        let created = call(
            &mut st,
            "students.create",
            admin.clone(),
            json!({
                "name": "Asha Rao",
                "email": "asha@example.com",
                "class": "9th",
                "rollNo": "7",
                "contactNumber": "9876543210"
            }),
        );
        assert_eq!(created["ok"], true, "{created}");
        let sid = created["result"]["student"]["id"].as_str().expect("id").to_string();
        let student = json!({ "id": sid, "role": "student" });

        let resp = call(&mut st, "dashboard.stats", student.clone(), json!({}));
        assert_eq!(resp["error"]["code"], "forbidden");
        let resp = call(&mut st, "student.results.summary", admin.clone(), json!({}));
        assert_eq!(resp["error"]["code"], "forbidden");
        let resp = call(&mut st, "marks.list", json!(null), json!({}));
        assert_eq!(resp["error"]["code"], "unauthorized");

        let resp = call(&mut st, "student.profile.get", student, json!({}));
        assert_eq!(resp["ok"], true);
        assert_eq!(resp["result"]["student"]["studentCode"], "SPC000001");

        let ghost = json!({ "id": "gone", "role": "student" });
        let resp = call(&mut st, "student.marks", ghost, json!({}));
        assert_eq!(resp["error"]["code"], "unauthorized");
    }

    #[test]
    fn huge_student_page_is_bad_params() {
        let mut st = state();
        let admin = json!({ "id": "adm-1", "role": "admin" });
        let resp = call(
            &mut st,
            "students.list",
            admin.clone(),
            json!({ "page": u64::MAX, "limit": 10 }),
        );
        assert_eq!(resp["ok"], false);
        assert_eq!(resp["error"]["code"], "bad_params");

        let resp = call(&mut st, "students.list", admin, json!({}));
        assert_eq!(resp["ok"], true);
    }

    #[test]
    fn no_workspace_is_reported() {
        let mut st = AppState::default();
        let resp = call(&mut st, "marks.list", json!({ "id": "a", "role": "admin" }), json!({}));
        assert_eq!(resp["error"]["code"], "no_workspace");
        let resp = call(&mut st, "health", json!(null), json!({}));
        assert_eq!(resp["ok"], true);
        assert!(resp["result"]["workspacePath"].is_null());
    }
}
