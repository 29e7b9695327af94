use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Expectations a response must meet for a test to pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestValidation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusExpectation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_response_time_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub body_contains: Vec<String>,

    /// Expected header values, header names compared case-insensitively.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub json_path: Vec<JsonPathAssertion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusExpectation {
    Exact(u16),
    OneOf(Vec<u16>),
    Range { min: u16, max: u16 },
}

impl StatusExpectation {
    pub fn matches(&self, status: u16) -> bool {
        match self {
            StatusExpectation::Exact(s) => *s == status,
            StatusExpectation::OneOf(list) => list.contains(&status),
            StatusExpectation::Range { min, max } => (*min..=*max).contains(&status),
        }
    }
}

impl std::fmt::Display for StatusExpectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusExpectation::Exact(s) => write!(f, "{s}"),
            StatusExpectation::OneOf(list) => {
                let parts: Vec<String> = list.iter().map(|s| s.to_string()).collect();
                write!(f, "one of [{}]", parts.join(", "))
            }
            StatusExpectation::Range { min, max } => write!(f, "{min}..={max}"),
        }
    }
}

/// Existence check when `equals` is absent, equality check otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonPathAssertion {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equals: Option<serde_json::Value>,
}
