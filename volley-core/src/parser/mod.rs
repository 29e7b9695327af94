use crate::error::ParseError;
use crate::types::WorkspaceDocument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
    Auto,
}

#[derive(Debug, Clone)]
pub struct ParsedWorkspace {
    pub document: WorkspaceDocument,
    pub format: DocumentFormat,
}

pub fn parse_workspace_str(
    input: &str,
    format: DocumentFormat,
) -> Result<ParsedWorkspace, ParseError> {
    match format {
        DocumentFormat::Json => Ok(ParsedWorkspace {
            document: serde_json::from_str::<WorkspaceDocument>(input)?,
            format,
        }),
        DocumentFormat::Yaml => Ok(ParsedWorkspace {
            document: serde_yaml::from_str::<WorkspaceDocument>(input)?,
            format,
        }),
        DocumentFormat::Auto => parse_workspace_auto(input),
    }
}

fn parse_workspace_auto(input: &str) -> Result<ParsedWorkspace, ParseError> {
    // JSON documents start with `{` or `[`; everything else is tried as YAML first.
    let trimmed = input.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return match serde_json::from_str::<WorkspaceDocument>(input) {
            Ok(document) => Ok(ParsedWorkspace {
                document,
                format: DocumentFormat::Json,
            }),
            Err(e) => match serde_yaml::from_str::<WorkspaceDocument>(input) {
                Ok(document) => Ok(ParsedWorkspace {
                    document,
                    format: DocumentFormat::Yaml,
                }),
                Err(_) => Err(ParseError::Json(e)),
            },
        };
    }

    match serde_yaml::from_str::<WorkspaceDocument>(input) {
        Ok(document) => Ok(ParsedWorkspace {
            document,
            format: DocumentFormat::Yaml,
        }),
        Err(e) => {
            if let Ok(document) = serde_json::from_str::<WorkspaceDocument>(input) {
                return Ok(ParsedWorkspace {
                    document,
                    format: DocumentFormat::Json,
                });
            }
            Err(ParseError::Yaml(e))
        }
    }
}
