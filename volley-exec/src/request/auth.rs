use std::collections::BTreeMap;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use volley_core::types::{ApiKeyLocation, AuthProfile, AuthScheme};
use volley_core::VariableScope;

/// Headers and query parameters an auth profile contributes to a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthMaterial {
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
}

#[async_trait]
pub trait AuthResolver: Send + Sync {
    /// Resolve `auth_id` into request material. Secret values may themselves be templates.
    async fn resolve(
        &self,
        auth_id: &str,
        scope: &VariableScope<'_>,
    ) -> Result<AuthMaterial, String>;
}

/// Resolver for requests that never carry auth.
pub struct NoAuthResolver;

#[async_trait]
impl AuthResolver for NoAuthResolver {
    async fn resolve(
        &self,
        auth_id: &str,
        _scope: &VariableScope<'_>,
    ) -> Result<AuthMaterial, String> {
        Err(format!("auth profile '{auth_id}' not found"))
    }
}

/// Resolves the auth profiles declared in a workspace document.
#[derive(Debug, Default)]
pub struct WorkspaceAuthResolver {
    profiles: BTreeMap<String, AuthProfile>,
}

impl WorkspaceAuthResolver {
    pub fn new(profiles: impl IntoIterator<Item = AuthProfile>) -> Self {
        Self {
            profiles: profiles.into_iter().map(|p| (p.id.clone(), p)).collect(),
        }
    }
}

#[async_trait]
impl AuthResolver for WorkspaceAuthResolver {
    async fn resolve(
        &self,
        auth_id: &str,
        scope: &VariableScope<'_>,
    ) -> Result<AuthMaterial, String> {
        let profile = self
            .profiles
            .get(auth_id)
            .ok_or_else(|| format!("auth profile '{auth_id}' not found"))?;
        let render = |s: &str| {
            scope
                .render(s)
                .map_err(|e| format!("auth profile '{auth_id}': {e}"))
        };

        let mut material = AuthMaterial::default();
        match &profile.scheme {
            AuthScheme::None => {}
            AuthScheme::Bearer { token } => {
                let token = render(token.expose())?;
                material
                    .headers
                    .push(("Authorization".to_string(), format!("Bearer {token}")));
            }
            AuthScheme::Basic { username, password } => {
                let raw = format!("{}:{}", render(username.as_str())?, render(password.expose())?);
                material.headers.push((
                    "Authorization".to_string(),
                    format!("Basic {}", STANDARD.encode(raw)),
                ));
            }
            AuthScheme::ApiKey {
                key,
                value,
                location,
            } => {
                let pair = (key.clone(), render(value.expose())?);
                match location {
                    ApiKeyLocation::Header => material.headers.push(pair),
                    ApiKeyLocation::Query => material.query.push(pair),
                }
            }
        }
        Ok(material)
    }
}
