use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{KeyValue, Request};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub requests: Vec<Request>,

    /// Headers applied to every request of the collection unless the request sets the same key.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<KeyValue>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}
