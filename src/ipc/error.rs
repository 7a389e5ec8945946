use serde_json::json;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelopes() {
        assert_eq!(ok("1", json!(5)), json!({ "id": "1", "ok": true, "result": 5 }));
        let e = err("2", "not_found", "student not found", Some(json!({ "entity": "student" })));
        assert_eq!(e["ok"], false);
        assert_eq!(e["error"]["code"], "not_found");
        assert_eq!(e["error"]["details"]["entity"], "student");
        assert!(err("3", "x", "y", None)["error"].get("details").is_none());
    }
}
