use serde::{Deserialize, Serialize};

use crate::types::{AuthProfile, Collection, Environment, Flow, TestSuite};

/// Everything a run needs, in one document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceDocument {
    #[serde(default)]
    pub collections: Vec<Collection>,

    #[serde(default)]
    pub environments: Vec<Environment>,

    #[serde(default)]
    pub auths: Vec<AuthProfile>,

    #[serde(default)]
    pub flows: Vec<Flow>,

    #[serde(default)]
    pub suites: Vec<TestSuite>,
}
