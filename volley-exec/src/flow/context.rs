use std::collections::BTreeMap;

use serde_json::Value as JsonValue;
use volley_core::template::{lookup_path, VariableSource};

use crate::http::HttpResponse;

/// Responses of the nodes that succeeded so far in one flow run, keyed by node alias.
///
/// Exposed to templates as `alias.response.status`, `alias.response.statusText`,
/// `alias.response.body[.path]`, `alias.response.headers.<name>` and `alias.response.elapsedMs`.
#[derive(Debug, Clone, Default)]
pub struct FlowContext {
    responses: BTreeMap<String, HttpResponse>,
    order: Vec<String>,
}

impl FlowContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, alias: impl Into<String>, response: HttpResponse) {
        let alias = alias.into();
        self.order.push(alias.clone());
        self.responses.insert(alias, response);
    }

    pub fn response(&self, alias: &str) -> Option<&HttpResponse> {
        self.responses.get(alias)
    }

    /// Aliases in the order their responses were recorded.
    pub fn aliases(&self) -> &[String] {
        &self.order
    }
}

impl VariableSource for FlowContext {
    fn lookup(&self, name: &str) -> Option<JsonValue> {
        let (alias, rest) = name.split_once('.')?;
        let resp = self.responses.get(alias)?;
        let field = rest.strip_prefix("response")?;
        if field.is_empty() {
            return serde_json::to_value(resp).ok();
        }
        let field = field.strip_prefix('.')?;
        let (head, tail) = match field.split_once('.') {
            Some((h, t)) => (h, Some(t)),
            None => (field, None),
        };
        match (head, tail) {
            ("status", None) => Some(JsonValue::from(resp.status)),
            ("statusText", None) => Some(JsonValue::String(resp.status_text.clone())),
            ("elapsedMs", None) => Some(JsonValue::from(resp.elapsed_ms)),
            ("headers", Some(h)) => resp.header(h).map(|v| JsonValue::String(v.to_string())),
            ("body", None) => Some(
                resp.body_json
                    .clone()
                    .unwrap_or_else(|| JsonValue::String(resp.body.clone())),
            ),
            ("body", Some(path)) => resp
                .body_json
                .as_ref()
                .and_then(|b| lookup_path(b, path))
                .cloned(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use volley_core::VariableScope;

    fn ctx() -> FlowContext {
        let mut c = FlowContext::new();
        let headers = BTreeMap::from([("X-Request-Id".to_string(), "r-1".to_string())]);
        c.record(
            "login",
            HttpResponse::new(200, headers, r#"{"token":"abc","user":{"id":42}}"#, 5),
        );
        c
    }

    #[test]
    fn resolves_status_body_paths_and_headers() {
        let c = ctx();
        assert_eq!(c.lookup("login.response.status"), Some(JsonValue::from(200)));
        assert_eq!(c.lookup("login.response.body.user.id"), Some(JsonValue::from(42)));
        assert_eq!(
            c.lookup("login.response.headers.x-request-id"),
            Some(JsonValue::String("r-1".into()))
        );
        assert_eq!(c.lookup("other.response.status"), None);
        assert_eq!(c.lookup("login.request.status"), None);
    }

    #[test]
    fn renders_through_scope_keeping_json_types() {
        let c = ctx();
        let scope = VariableScope::new().with(&c);
        assert_eq!(
            scope.render("Bearer {{login.response.body.token}}").unwrap(),
            "Bearer abc"
        );
        let body = serde_json::json!({ "userId": "{{ login.response.body.user.id }}" });
        assert_eq!(
            scope.render_json(&body).unwrap(),
            serde_json::json!({ "userId": 42 })
        );
    }
}
