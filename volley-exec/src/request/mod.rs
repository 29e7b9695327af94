//! Turns a stored [`Request`] plus its layered overrides into a [`BuiltRequest`].

mod auth;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use volley_core::types::{
    Collection, Environment, KeyValue, Request, RequestBody, TestCaseOverrides,
};
use volley_core::VariableScope;

use crate::batch::CancelHandle;
use crate::deps::EngineDeps;
use crate::flow::FlowContext;
use crate::http::{BuiltRequest, CancelTarget, HttpResponse};

pub use auth::{AuthMaterial, AuthResolver, NoAuthResolver, WorkspaceAuthResolver};

/// Everything layered on top of a request when it is built.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildContext<'a> {
    pub collection: Option<&'a Collection>,
    pub environment: Option<&'a Environment>,
    /// Run-level auth (suite or flow default, or a CLI override).
    pub default_auth_id: Option<&'a str>,
    pub overrides: Option<&'a TestCaseOverrides>,
    pub flow: Option<&'a FlowContext>,
    /// Run-level variables, below case overrides and above everything else.
    pub variables: Option<&'a BTreeMap<String, String>>,
}

impl<'a> BuildContext<'a> {
    /// Variable lookup order: case overrides, run variables, flow context, environment, collection.
    pub fn scope(&self) -> VariableScope<'a> {
        let mut scope = VariableScope::new();
        if let Some(vars) = self.overrides.and_then(|o| o.variables.as_ref()) {
            scope = scope.with(vars);
        }
        if let Some(vars) = self.variables {
            scope = scope.with(vars);
        }
        if let Some(flow) = self.flow {
            scope = scope.with(flow);
        }
        if let Some(env) = self.environment {
            scope = scope.with(&env.variables);
        }
        if let Some(c) = self.collection {
            scope = scope.with(&c.variables);
        }
        scope
    }

    /// Auth precedence: case override, run default, request, collection.
    pub fn auth_id(&self, request: &'a Request) -> Option<&'a str> {
        self.overrides
            .and_then(|o| o.auth_id.as_deref())
            .or(self.default_auth_id)
            .or(request.auth_id.as_deref())
            .or(self.collection.and_then(|c| c.auth_id.as_deref()))
    }
}

#[async_trait]
pub trait RequestBuilder: Send + Sync {
    async fn build(&self, request: &Request, ctx: &BuildContext<'_>)
        -> Result<BuiltRequest, String>;
}

pub struct StandardRequestBuilder {
    auth: std::sync::Arc<dyn AuthResolver>,
    timeout: Option<Duration>,
}

impl StandardRequestBuilder {
    pub fn new(auth: std::sync::Arc<dyn AuthResolver>) -> Self {
        Self {
            auth,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl RequestBuilder for StandardRequestBuilder {
    async fn build(
        &self,
        request: &Request,
        ctx: &BuildContext<'_>,
    ) -> Result<BuiltRequest, String> {
        let scope = ctx.scope();
        let render = |s: &str| scope.render(s).map_err(|e| format!("template error: {e}"));

        let mut header_layers: Vec<&[KeyValue]> = Vec::new();
        if let Some(c) = ctx.collection {
            header_layers.push(&c.headers);
        }
        header_layers.push(&request.headers);
        if let Some(h) = ctx.overrides.and_then(|o| o.headers.as_deref()) {
            header_layers.push(h);
        }
        let mut headers = Vec::<(String, String)>::new();
        for kv in merge_key_values(&header_layers, true) {
            headers.push((render(&kv.key)?, render(&kv.value)?));
        }

        let mut param_layers: Vec<&[KeyValue]> = vec![request.params.as_slice()];
        if let Some(p) = ctx.overrides.and_then(|o| o.params.as_deref()) {
            param_layers.push(p);
        }
        let mut query = Vec::<(String, String)>::new();
        for kv in merge_key_values(&param_layers, false) {
            query.push((render(&kv.key)?, render(&kv.value)?));
        }

        if let Some(auth_id) = ctx.auth_id(request) {
            let material = self.auth.resolve(auth_id, &scope).await?;
            for (k, v) in material.headers {
                if !headers.iter().any(|(h, _)| h.eq_ignore_ascii_case(&k)) {
                    headers.push((k, v));
                }
            }
            query.extend(material.query);
        }

        let mut url = parse_url(&render(&request.url)?)?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in &query {
                pairs.append_pair(k, v);
            }
        }

        let body_src = ctx
            .overrides
            .and_then(|o| o.body.as_ref())
            .or(request.body.as_ref());
        let body = match body_src {
            None => Vec::new(),
            Some(b) => {
                let (bytes, content_type) = encode_body(b, &scope)?;
                if !headers.iter().any(|(h, _)| h.eq_ignore_ascii_case("content-type")) {
                    headers.push(("Content-Type".to_string(), content_type.to_string()));
                }
                bytes
            }
        };

        debug!(request_id = %request.id, method = %request.method, url = %url, "request built");
        Ok(BuiltRequest {
            method: request.method,
            url,
            headers: headers.into_iter().collect(),
            body,
            timeout: self.timeout,
        })
    }
}

/// Merge enabled key/value layers, later layers replacing earlier entries with the same key.
/// Order of first appearance is kept.
pub fn merge_key_values(layers: &[&[KeyValue]], case_insensitive: bool) -> Vec<KeyValue> {
    let mut out: Vec<KeyValue> = Vec::new();
    for layer in layers {
        for kv in layer.iter().filter(|kv| kv.enabled) {
            let existing = out.iter_mut().find(|o| {
                if case_insensitive {
                    o.key.eq_ignore_ascii_case(&kv.key)
                } else {
                    o.key == kv.key
                }
            });
            match existing {
                Some(o) => o.value = kv.value.clone(),
                None => out.push(kv.clone()),
            }
        }
    }
    out
}

fn parse_url(raw: &str) -> Result<url::Url, String> {
    match url::Url::parse(raw) {
        Ok(u) => Ok(u),
        Err(url::ParseError::RelativeUrlWithoutBase) => url::Url::parse(&format!("http://{raw}"))
            .map_err(|e| format!("invalid url '{raw}': {e}")),
        Err(e) => Err(format!("invalid url '{raw}': {e}")),
    }
}

fn encode_body(
    body: &RequestBody,
    scope: &VariableScope<'_>,
) -> Result<(Vec<u8>, &'static str), String> {
    let err = |e: volley_core::TemplateError| format!("template error: {e}");
    match body {
        RequestBody::Json(v) => {
            let rendered = scope.render_json(v).map_err(err)?;
            let bytes = serde_json::to_vec(&rendered).map_err(|e| format!("json error: {e}"))?;
            Ok((bytes, "application/json"))
        }
        RequestBody::Text(s) => Ok((scope.render(s).map_err(err)?.into_bytes(), "text/plain")),
        RequestBody::Form(fields) => {
            let mut parts = Vec::new();
            for kv in fields.iter().filter(|kv| kv.enabled) {
                parts.push(format!(
                    "{}={}",
                    urlencoding::encode(&scope.render(&kv.key).map_err(err)?),
                    urlencoding::encode(&scope.render(&kv.value).map_err(err)?)
                ));
            }
            Ok((
                parts.join("&").into_bytes(),
                "application/x-www-form-urlencoded",
            ))
        }
    }
}

/// Build `request` against `ctx` and send it. Build failures and transport errors both
/// come back as the error string recorded on the result.
///
/// Cancelling `cancel` while the request is in flight asks the transport to abort it; the
/// (possibly late) outcome is still awaited and returned.
pub async fn execute_request(
    deps: &EngineDeps,
    exchange_id: &str,
    request: &Request,
    ctx: &BuildContext<'_>,
    cancel: &CancelHandle,
) -> Result<HttpResponse, String> {
    let built = deps.builder.build(request, ctx).await?;
    let send = deps.http.execute(exchange_id, built);
    tokio::pin!(send);
    tokio::select! {
        r = &mut send => return r.map_err(|e| e.to_string()),
        _ = cancel.cancelled() => {}
    }
    deps.http.cancel_request(CancelTarget::Request(exchange_id));
    send.await.map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_layers_win_and_header_keys_ignore_case() {
        let base = vec![KeyValue::new("Accept", "text/plain"), KeyValue::new("X-A", "1")];
        let over = vec![KeyValue::new("accept", "application/json")];
        let merged = merge_key_values(&[base.as_slice(), over.as_slice()], true);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].key, "Accept");
        assert_eq!(merged[0].value, "application/json");
    }

    #[test]
    fn disabled_entries_are_dropped() {
        let mut off = KeyValue::new("page", "2");
        off.enabled = false;
        let layer = vec![KeyValue::new("q", "x"), off];
        let merged = merge_key_values(&[layer.as_slice()], false);
        assert_eq!(merged, vec![KeyValue::new("q", "x")]);
    }

    #[test]
    fn scheme_less_urls_default_to_http() {
        let u = parse_url("example.com/api").unwrap();
        assert_eq!(u.as_str(), "http://example.com/api");
    }
}
