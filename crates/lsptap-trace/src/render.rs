//! Direction inference and the keyword renderer.
//!
//! The keyword format compresses an envelope into one line of labeled
//! fields. Labels carry a prefix showing which side of the exchange a value
//! belongs to: `<` request params, `>` response result, `<>` the original
//! request a response answers, `!` error details, `%` envelope metadata.

use lsptap_protocol::envelope::{classify, field, str_field, AnyMap, EnvelopeKind, RequestId};
use serde_json::Value;

use crate::correlate::CorrelationCache;

/// Keys whose string value is used to summarize an object on one line.
const USE_STRING_FIELD: &[&str] = &["uri"];

/// Keys whose object value is descended into when summarizing.
const SUB_FIELD: &[&str] = &["textDocument"];

/// Infer the rendered direction of a message from its endpoint labels.
///
/// Returns the `a-->b` / `b<--a` text and whether any rule matched; callers
/// warn on the uncertain fallback.
pub fn direction(from: &str, to: &str) -> (String, bool) {
    if from.starts_with("client") {
        (format!("{from}-->{to}"), true)
    } else if from == "server" {
        (format!("{to}<--{from}"), true)
    } else if to.starts_with("client") {
        (format!("{to}<--{from}"), true)
    } else if to == "server" {
        (format!("{from}-->{to}"), true)
    } else {
        (format!("{from}<--{to}"), false)
    }
}

/// An ordered list of label/value pairs rendered as `label=value` text.
#[derive(Default)]
struct EventLine {
    fields: Vec<(String, String)>,
}

impl EventLine {
    fn push(&mut self, label: impl Into<String>, value: impl Into<String>) {
        self.fields.push((label.into(), value.into()));
    }

    fn render(&self) -> String {
        let mut out = String::new();
        for (label, value) in &self.fields {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(label);
            out.push('=');
            if value.chars().any(char::is_whitespace) {
                out.push_str(&format!("{value:?}"));
            } else {
                out.push_str(value);
            }
        }
        out
    }
}

/// Cut a string at a byte limit without splitting a character.
fn truncate_str(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Marshal a value to JSON, truncated with a `...` marker.
fn marshal_truncated(value: &Value, max: usize) -> String {
    let text = value.to_string();
    if text.len() > max {
        format!("{}...", truncate_str(&text, max))
    } else {
        text
    }
}

/// Render one envelope in keyword format.
///
/// Requests are recorded in the correlation cache; responses consult it and
/// surface the original `method`/`params` under `<>` labels.
pub fn render_keyword(envelope: &AnyMap, cache: &CorrelationCache, max_field_len: usize) -> String {
    let mut line = EventLine::default();
    let kind = classify(envelope);

    match kind {
        EnvelopeKind::Request | EnvelopeKind::Notification => {
            // classify() guarantees the method field.
            let method = str_field(envelope, "method").unwrap_or_default();
            line.push("%method", method);
            let id = field(envelope, "id").and_then(RequestId::from_value);
            if let Some(id) = &id {
                line.push("%ID", id.to_string());
            }
            let params = field(envelope, "params");
            if let Some(params) = params {
                add_data("<", params, &mut line, max_field_len);
            }
            if let Some(id) = id {
                cache.record(id, method, params);
            }
        }
        EnvelopeKind::Response => {
            if let Some(result) = field(envelope, "result") {
                add_data(">", result, &mut line, max_field_len);
            }
            if let Some(id) = field(envelope, "id").and_then(|v| RequestId::from_value(v)) {
                line.push("%ID", id.to_string());
                if let Some((method, params)) = cache.lookup(&id) {
                    line.push("<>method", method);
                    if let Some(params) = params {
                        add_data("<>", &params, &mut line, max_field_len);
                    }
                }
            }
            if let Some(error) = field(envelope, "error") {
                add_error(error, &mut line, max_field_len);
            }
        }
        EnvelopeKind::Error => {
            if let Some(error) = field(envelope, "error") {
                add_error(error, &mut line, max_field_len);
            }
        }
        EnvelopeKind::Unknown => {
            line.push(
                "msg",
                marshal_truncated(&Value::Object(envelope.clone()), max_field_len),
            );
        }
    }

    line.push("$Type", kind.as_str());
    line.render()
}

/// Add a `params`/`result` subtree under a label prefix.
fn add_data(prefix: &str, data: &Value, line: &mut EventLine, max: usize) {
    match data {
        Value::Object(map) => {
            for (key, item) in map {
                add_value(&format!("{prefix}{key}"), item, line, max);
            }
        }
        Value::Array(_) => {
            let label = match prefix {
                "<" => "params",
                ">" => "result",
                _ => "rqst-params",
            };
            add_value(label, data, line, max);
        }
        Value::Bool(b) => line.push(prefix, b.to_string()),
        Value::Null => {}
        other => line.push("data", marshal_truncated(other, max)),
    }
}

/// Add one labeled value. Returns whether anything was emitted.
fn add_value(label: &str, item: &Value, line: &mut EventLine, max: usize) -> bool {
    match item {
        Value::String(text) => {
            let text = if label.ends_with("path") {
                text.as_str()
            } else {
                truncate_str(text, max)
            };
            if text.is_empty() {
                return false;
            }
            line.push(label, text);
        }
        Value::Number(n) => line.push(label, n.to_string()),
        Value::Bool(b) => line.push(label, b.to_string()),
        Value::Object(map) if !map.is_empty() => {
            let mut added = false;
            // A preferred scalar field stands in for the whole object.
            for fld in USE_STRING_FIELD {
                if let Some(Value::String(text)) = map.get(*fld) {
                    line.push(label, text.clone());
                    added = true;
                    break;
                }
            }
            // A well-known sub-object is summarized recursively.
            for fld in SUB_FIELD {
                if let Some(sub) = map.get(*fld) {
                    added = add_value(label, sub, line, max);
                }
            }
            if !added {
                line.push(label, marshal_truncated(item, max));
            }
        }
        Value::Array(items) if !items.is_empty() => {
            line.push(format!("{label}#"), items.len().to_string());
            for element in items {
                // Only the first renderable element is shown.
                if add_value(&format!("{label}[0]"), element, line, max) {
                    break;
                }
            }
        }
        _ => {}
    }
    true
}

/// Add the fields of a JSON-RPC error object.
fn add_error(error: &Value, line: &mut EventLine, max: usize) {
    let Value::Object(map) = error else {
        return;
    };
    if let Some(Value::Number(code)) = map.get("code") {
        line.push("!code", code.to_string());
    }
    if let Some(Value::String(message)) = map.get("message") {
        line.push("!msg", message.clone());
    }
    if let Some(data) = map.get("data") {
        add_value("!data", data, line, max);
    }
}
