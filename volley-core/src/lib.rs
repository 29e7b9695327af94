#![forbid(unsafe_code)]

pub mod error;
pub mod graph;
pub mod parser;
pub mod template;
pub mod types;
pub mod validate;

pub use crate::error::{ParseError, ValidationError, VolleyError, Violation};
pub use crate::graph::{FlowGraph, GraphError};
pub use crate::parser::{parse_workspace_str, DocumentFormat, ParsedWorkspace};
pub use crate::template::{TemplateError, VariableScope};
pub use crate::types::WorkspaceDocument;
pub use crate::validate::{validate_flow, validate_workspace, Validate};
