mod rules;
mod validator;

use crate::error::ValidationError;
use crate::types::{Flow, WorkspaceDocument};
use validator::Validator;

pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

impl Validate for Flow {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_flow(self)
    }
}

impl Validate for WorkspaceDocument {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_workspace(self)
    }
}

/// Structural checks plus cycle detection for a single flow.
pub fn validate_flow(flow: &Flow) -> Result<(), ValidationError> {
    let mut v = Validator::new();
    rules::flow::validate_flow(&mut v, "flow", flow);
    v.finish()
}

pub fn validate_workspace(doc: &WorkspaceDocument) -> Result<(), ValidationError> {
    let mut v = Validator::new();
    rules::workspace::validate_workspace(&mut v, doc);
    v.finish()
}
