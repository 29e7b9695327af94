use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use serde_json_path::JsonPath;
use volley_core::template::lookup_path;
use volley_core::types::{is_success_status, JsonPathAssertion, RequestValidation};

use crate::http::HttpResponse;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub passed: bool,
    pub failures: Vec<String>,
}

impl ValidationReport {
    fn from_failures(failures: Vec<String>) -> Self {
        Self {
            passed: failures.is_empty(),
            failures,
        }
    }

    pub fn summary(&self) -> Option<String> {
        (!self.failures.is_empty()).then(|| self.failures.join("; "))
    }
}

/// Check a response against explicit expectations. Every check runs; failures are collected.
pub fn validate_response(v: &RequestValidation, resp: &HttpResponse) -> ValidationReport {
    let mut failures = Vec::new();

    if let Some(expected) = &v.status {
        if !expected.matches(resp.status) {
            failures.push(format!("status {} does not match {expected}", resp.status));
        }
    }

    if let Some(max) = v.max_response_time_ms {
        if resp.elapsed_ms > max {
            failures.push(format!("response time {}ms exceeds {max}ms", resp.elapsed_ms));
        }
    }

    for needle in &v.body_contains {
        if !resp.body.contains(needle.as_str()) {
            failures.push(format!("body does not contain '{needle}'"));
        }
    }

    for (name, expected) in &v.headers {
        match resp.header(name) {
            Some(actual) if actual == expected => {}
            Some(actual) => failures.push(format!(
                "header '{name}' is '{actual}', expected '{expected}'"
            )),
            None => failures.push(format!("header '{name}' missing")),
        }
    }

    for assertion in &v.json_path {
        if let Some(f) = check_json_path(assertion, resp.body_json.as_ref()) {
            failures.push(f);
        }
    }

    ValidationReport::from_failures(failures)
}

/// The implicit expectation for requests without explicit validation: status in [200, 400).
pub fn default_expectation(resp: &HttpResponse) -> ValidationReport {
    if is_success_status(resp.status) {
        ValidationReport::from_failures(Vec::new())
    } else {
        ValidationReport::from_failures(vec![format!("HTTP {}", resp.status)])
    }
}

fn check_json_path(a: &JsonPathAssertion, body: Option<&JsonValue>) -> Option<String> {
    let Some(body) = body else {
        return Some(format!("{}: response body is not JSON", a.path));
    };

    // `$`-rooted paths are full JSONPath; anything else is a plain dot path.
    let actual: Option<&JsonValue> = if a.path.trim_start().starts_with('$') {
        let path = match JsonPath::parse(a.path.trim()) {
            Ok(p) => p,
            Err(e) => return Some(format!("{}: invalid JSONPath: {e}", a.path)),
        };
        path.query(body).all().into_iter().next()
    } else {
        lookup_path(body, &a.path)
    };

    match (actual, &a.equals) {
        (None, _) => Some(format!("{}: no match", a.path)),
        (Some(_), None) => None,
        (Some(actual), Some(expected)) if json_eq(actual, expected) => None,
        (Some(actual), Some(expected)) => {
            Some(format!("{}: expected {expected}, got {actual}", a.path))
        }
    }
}

/// Structural equality where numbers compare by value (`1` equals `1.0`).
fn json_eq(a: &JsonValue, b: &JsonValue) -> bool {
    match (a, b) {
        (JsonValue::Number(a), JsonValue::Number(b)) => a.as_f64() == b.as_f64(),
        (JsonValue::Array(a), JsonValue::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| json_eq(x, y))
        }
        (JsonValue::Object(a), JsonValue::Object(b)) => {
            a.len() == b.len()
                && a.iter().all(|(k, v)| b.get(k).is_some_and(|bv| json_eq(v, bv)))
        }
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;
    use volley_core::types::StatusExpectation;

    use super::*;

    fn resp(status: u16, body: &str) -> HttpResponse {
        let headers = BTreeMap::from([("Content-Type".to_string(), "application/json".to_string())]);
        HttpResponse::new(status, headers, body, 12)
    }

    #[test]
    fn collects_every_failure() {
        let v = RequestValidation {
            status: Some(StatusExpectation::Exact(200)),
            max_response_time_ms: Some(5),
            body_contains: vec!["token".into()],
            ..Default::default()
        };
        let r = validate_response(&v, &resp(404, "{}"));
        assert!(!r.passed);
        assert_eq!(r.failures.len(), 3);
    }

    #[test]
    fn header_names_ignore_case() {
        let v = RequestValidation {
            headers: BTreeMap::from([("content-type".to_string(), "application/json".to_string())]),
            ..Default::default()
        };
        assert!(validate_response(&v, &resp(200, "{}")).passed);
    }

    #[test]
    fn json_path_and_dot_path_assertions() {
        let body = r#"{"data":{"items":[{"id":7}],"ok":true}}"#;
        let v = RequestValidation {
            json_path: vec![
                JsonPathAssertion {
                    path: "$.data.items[0].id".into(),
                    equals: Some(json!(7.0)),
                },
                JsonPathAssertion {
                    path: "data.ok".into(),
                    equals: None,
                },
            ],
            ..Default::default()
        };
        assert!(validate_response(&v, &resp(200, body)).passed);
    }

    #[test]
    fn json_path_mismatch_reports_values() {
        let v = RequestValidation {
            json_path: vec![JsonPathAssertion {
                path: "$.id".into(),
                equals: Some(json!("a")),
            }],
            ..Default::default()
        };
        let r = validate_response(&v, &resp(200, r#"{"id":"b"}"#));
        assert_eq!(r.failures, vec![r#"$.id: expected "a", got "b""#.to_string()]);
    }

    #[test]
    fn default_expectation_accepts_redirects() {
        assert!(default_expectation(&resp(302, "")).passed);
        assert!(!default_expectation(&resp(500, "")).passed);
    }
}
