use crate::error::CoreError;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{Actor, AppState, Request, Role};
use crate::students::{self, Student};
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

#[derive(Debug)]
pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        Self::new("bad_params", message)
    }
}

impl From<CoreError> for HandlerErr {
    fn from(e: CoreError) -> Self {
        Self {
            code: e.code(),
            details: e.details(),
            message: e.to_string(),
        }
    }
}

pub type HandlerResult = Result<serde_json::Value, HandlerErr>;

/// Wraps a handler outcome in the response envelope.
pub fn respond(req: &Request, outcome: HandlerResult) -> serde_json::Value {
    match outcome {
        Ok(v) => ok(&req.id, v),
        Err(e) => {
            tracing::warn!(
                request_id = %req.id,
                method = %req.method,
                code = e.code,
                message = %e.message,
                "request failed"
            );
            err(&req.id, e.code, e.message, e.details)
        }
    }
}

pub fn db_conn(state: &AppState) -> Result<&Connection, HandlerErr> {
    state
        .db
        .as_ref()
        .ok_or_else(|| HandlerErr::new("no_workspace", "select a workspace first"))
}

fn actor_with_role(req: &Request, role: Role) -> Result<&Actor, HandlerErr> {
    let Some(actor) = req.actor.as_ref().filter(|a| !a.id.trim().is_empty()) else {
        return Err(HandlerErr::new("unauthorized", "request has no actor"));
    };
    match actor.role() {
        Some(r) if r == role => Ok(actor),
        Some(_) => Err(HandlerErr::new("forbidden", format!("{} requires a different role", req.method))),
        None => Err(HandlerErr::new("unauthorized", format!("unknown role: {}", actor.role))),
    }
}

pub fn require_admin(req: &Request) -> Result<&Actor, HandlerErr> {
    actor_with_role(req, Role::Admin)
}

/// Checks the role, then loads the acting student. A student record that no
/// longer exists is treated as an unknown actor.
pub fn require_student<'a>(state: &'a AppState, req: &Request) -> Result<(&'a Connection, Student), HandlerErr> {
    let actor = actor_with_role(req, Role::Student)?;
    let conn = db_conn(state)?;
    let me = students::find_by_id(conn, &actor.id)?
        .ok_or_else(|| HandlerErr::new("unauthorized", "student account not found"))?;
    Ok((conn, me))
}

pub fn required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| HandlerErr::bad_params(format!("missing params.{}", key)))
}

/// Deserializes `value` (or an empty object when absent) into `T`.
pub fn parse_value<T: DeserializeOwned>(value: Option<&serde_json::Value>, what: &str) -> Result<T, HandlerErr> {
    let v = match value {
        None | Some(serde_json::Value::Null) => json!({}),
        Some(v) => v.clone(),
    };
    serde_json::from_value(v).map_err(|e| HandlerErr {
        code: "bad_params",
        message: format!("invalid {}: {}", what, e),
        details: None,
    })
}

pub fn to_json<T: Serialize>(value: &T) -> HandlerResult {
    serde_json::to_value(value).map_err(|e| HandlerErr::new("serialize_failed", e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(actor: Option<(&str, &str)>) -> Request {
        Request {
            id: "1".into(),
            method: "marks.list".into(),
            params: json!({}),
            actor: actor.map(|(id, role)| Actor {
                id: id.into(),
                role: role.into(),
            }),
        }
    }

    #[test]
    fn admin_gate() {
        assert!(require_admin(&req(Some(("a1", "admin")))).is_ok());
        assert_eq!(require_admin(&req(None)).unwrap_err().code, "unauthorized");
        assert_eq!(require_admin(&req(Some(("", "admin")))).unwrap_err().code, "unauthorized");
        assert_eq!(require_admin(&req(Some(("s1", "student")))).unwrap_err().code, "forbidden");
        assert_eq!(require_admin(&req(Some(("x", "root")))).unwrap_err().code, "unauthorized");
    }

    #[test]
    fn core_errors_keep_their_codes() {
        let e: HandlerErr = CoreError::NotFound("student").into();
        assert_eq!(e.code, "not_found");
        assert_eq!(e.details, Some(json!({ "entity": "student" })));
    }

    #[test]
    fn params_parsing() {
        let params = json!({ "id": "  abc ", "n": 3 });
        assert_eq!(required_str(&params, "id").expect("id"), "abc");
        assert_eq!(required_str(&params, "n").unwrap_err().code, "bad_params");
        assert_eq!(required_str(&params, "missing").unwrap_err().code, "bad_params");

        let patch: crate::marks::MarksPatch = parse_value(None, "patch").expect("empty");
        assert!(patch.total_marks.is_none());
        let bad: Result<crate::marks::MarksPatch, _> =
            parse_value(Some(&json!({ "totalMarks": "ten" })), "patch");
        assert_eq!(bad.unwrap_err().code, "bad_params");
    }
}
