//! JSON-RPC envelope helpers.
//!
//! Envelopes are handled as loosely typed maps because the tester forwards
//! arbitrary traffic; only the fields of the JSON-RPC 2.0 envelope itself
//! (`jsonrpc`, `id`, `method`, `params`, `result`, `error`) are interpreted.

use std::fmt;

use rand::Rng;
use serde_json::Value;

/// A JSON object with unconstrained values.
pub type AnyMap = serde_json::Map<String, Value>;

/// The JSON-RPC version stamped onto synthetic sends.
pub const JSONRPC_VERSION: &str = "2.0";

/// Synthetic request ids are drawn from `[ID_RANGE, 2 * ID_RANGE)`.
const ID_RANGE: u64 = 1000;

/// Fetch a field, treating JSON `null` as absent.
pub fn field<'a>(map: &'a AnyMap, name: &str) -> Option<&'a Value> {
    match map.get(name) {
        Some(Value::Null) | None => None,
        Some(value) => Some(value),
    }
}

/// Fetch a field that must be a non-empty string.
pub fn str_field<'a>(map: &'a AnyMap, name: &str) -> Option<&'a str> {
    match field(map, name) {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    }
}

/// What kind of JSON-RPC envelope a payload is, judged by shape alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeKind {
    /// Has `method` and `id`.
    Request,
    /// Has `method` but no `id`.
    Notification,
    /// Has `result`.
    Response,
    /// Has `error` and no `result`.
    Error,
    /// None of the above.
    Unknown,
}

impl EnvelopeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvelopeKind::Request => "request",
            EnvelopeKind::Notification => "notification",
            EnvelopeKind::Response => "response",
            EnvelopeKind::Error => "error",
            EnvelopeKind::Unknown => "unknown",
        }
    }
}

/// Classify an envelope by its fields.
pub fn classify(envelope: &AnyMap) -> EnvelopeKind {
    if str_field(envelope, "method").is_some() {
        if field(envelope, "id").is_some() {
            EnvelopeKind::Request
        } else {
            EnvelopeKind::Notification
        }
    } else if field(envelope, "result").is_some() {
        EnvelopeKind::Response
    } else if field(envelope, "error").is_some() {
        EnvelopeKind::Error
    } else {
        EnvelopeKind::Unknown
    }
}

/// A request id, keyed on the native JSON scalar.
///
/// JSON-RPC permits number or string ids; `1` and `"1"` are different ids.
/// Numbers keep their canonical text so integer and float forms stay
/// distinct as well.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RequestId {
    Number(String),
    String(String),
}

impl RequestId {
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(RequestId::Number(n.to_string())),
            Value::String(s) => Some(RequestId::String(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Number(n) => write!(f, "{n}"),
            RequestId::String(s) => write!(f, "{s}"),
        }
    }
}

/// Stamp an outgoing synthetic message.
///
/// Sets the JSON-RPC version, picks a fresh request id in `[1000, 1999]`
/// (as a string), and replaces a relative `params.path` value with its
/// absolute form. Ids may collide across synthetic sends; they are
/// short-lived by construction.
pub fn decorate_outgoing(message: &mut AnyMap) {
    message.insert(
        "jsonrpc".to_string(),
        Value::String(JSONRPC_VERSION.to_string()),
    );
    let id = rand::thread_rng().gen_range(ID_RANGE..ID_RANGE * 2);
    message.insert("id".to_string(), Value::String(id.to_string()));

    if let Some(Value::Object(params)) = message.get_mut("params") {
        if let Some(Value::String(path)) = params.get("path") {
            if let Ok(abs) = std::path::absolute(path) {
                params.insert(
                    "path".to_string(),
                    Value::String(abs.to_string_lossy().into_owned()),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> AnyMap {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn classify_by_shape() {
        let request = map(json!({"method": "textDocument/hover", "id": 1}));
        assert_eq!(classify(&request), EnvelopeKind::Request);

        let notification = map(json!({"method": "initialized"}));
        assert_eq!(classify(&notification), EnvelopeKind::Notification);

        let response = map(json!({"id": 1, "result": {"contents": "hi"}}));
        assert_eq!(classify(&response), EnvelopeKind::Response);

        let error = map(json!({"id": 1, "error": {"code": -32600, "message": "bad"}}));
        assert_eq!(classify(&error), EnvelopeKind::Error);

        let unknown = map(json!({"something": "else"}));
        assert_eq!(classify(&unknown), EnvelopeKind::Unknown);
    }

    #[test]
    fn null_fields_count_as_absent() {
        let envelope = map(json!({"method": "shutdown", "id": null}));
        assert_eq!(classify(&envelope), EnvelopeKind::Notification);

        let envelope = map(json!({"result": null, "error": {"code": 1, "message": "x"}}));
        assert_eq!(classify(&envelope), EnvelopeKind::Error);
    }

    #[test]
    fn request_ids_key_on_native_scalar() {
        let int_id = RequestId::from_value(&json!(1)).unwrap();
        let str_id = RequestId::from_value(&json!("1")).unwrap();
        let float_id = RequestId::from_value(&json!(1.5)).unwrap();

        assert_ne!(int_id, str_id);
        assert_ne!(int_id, float_id);
        assert_eq!(int_id, RequestId::Number("1".to_string()));
        assert_eq!(float_id, RequestId::Number("1.5".to_string()));
        assert!(RequestId::from_value(&json!(null)).is_none());
        assert!(RequestId::from_value(&json!({"nested": true})).is_none());
    }

    #[test]
    fn decorate_sets_version_and_id() {
        let mut message = map(json!({"method": "initialize", "params": {}}));
        decorate_outgoing(&mut message);

        assert_eq!(message["jsonrpc"], json!("2.0"));
        let id: u64 = message["id"].as_str().unwrap().parse().unwrap();
        assert!((1000..2000).contains(&id), "id {id} out of range");
    }

    #[test]
    fn decorate_absolutizes_params_path() {
        let mut message = map(json!({
            "method": "workspace/open",
            "params": {"path": "some/relative/file.rs"}
        }));
        decorate_outgoing(&mut message);

        let path = message["params"]["path"].as_str().unwrap();
        assert!(std::path::Path::new(path).is_absolute());
        assert!(path.ends_with("file.rs"));
    }

    #[test]
    fn decorate_leaves_non_string_path_alone() {
        let mut message = map(json!({"params": {"path": 42}}));
        decorate_outgoing(&mut message);
        assert_eq!(message["params"]["path"], json!(42));
    }
}
