//! Blob service client.
//!
//! Every operation funnels through [`BlobClient::perform`]: the request is
//! assembled, the URL is rewritten by the credential, the headers are
//! signed, the exchange goes out through the [`Context`] transport, and
//! failure statuses come back as structured errors.

use std::collections::HashMap;

use bytes::Bytes;
use http::Method;
use log::debug;
use percent_encoding::percent_encode;

use azblob_core::time;
use azblob_core::{Context, Error, Result, SigningRequest};

use crate::config::Config;
use crate::constants::{API_VERSION, PREFIX_METADATA, QUERY_ENCODE_SET, X_MS_VERSION};
use crate::credential::{Credential, Permission, ResourceKind, SharedKeyCredential};
use crate::xml;

mod blob;
mod container;
mod page;

/// Client for the blob service.
#[derive(Debug)]
pub struct BlobClient {
    ctx: Context,
    endpoint: String,
    credential: Credential,
}

impl BlobClient {
    /// Create a client against `endpoint` with the given credential.
    pub fn new(ctx: Context, endpoint: impl Into<String>, credential: Credential) -> Self {
        let mut endpoint = endpoint.into();
        while endpoint.ends_with('/') {
            endpoint.pop();
        }

        Self {
            ctx,
            endpoint,
            credential,
        }
    }

    /// Create a client from a [`Config`], signing with the account key.
    pub fn from_config(ctx: Context, config: &Config) -> Result<Self> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| Error::config_invalid("endpoint is required but missing"))?;
        let account_name = config
            .account_name
            .clone()
            .ok_or_else(|| Error::config_invalid("account_name is required but missing"))?;
        let account_key = config
            .account_key
            .as_deref()
            .ok_or_else(|| Error::config_invalid("account_key is required but missing"))?;

        let credential = SharedKeyCredential::new(account_name, account_key)?
            .with_path_style_uri(config.use_path_style_uri);

        Ok(Self::new(ctx, endpoint, Credential::SharedKey(credential)))
    }

    /// Create a client against local development storage.
    pub fn development_storage(ctx: Context) -> Result<Self> {
        Self::from_config(ctx, &Config::development_storage())
    }

    /// The endpoint requests are sent to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The credential authorizing requests.
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Assemble, authorize, send and check one request.
    pub(crate) async fn perform(&self, op: OpRequest) -> Result<http::Response<Bytes>> {
        let path = clean_path(&op.path);
        let uri = format!("{}{path}", self.endpoint);
        let body_len = op.body.as_ref().map(|b| b.len() as u64);

        let mut builder = http::Request::builder()
            .method(op.method)
            .uri(&uri)
            .header(X_MS_VERSION, API_VERSION);
        for (name, value) in &op.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let (mut parts, _) = builder.body(())?.into_parts();

        let mut signing = SigningRequest::build(&mut parts)?;
        for (k, v) in op.query {
            signing.query_push(k, v);
        }

        self.credential
            .sign_request_url(&mut signing, op.kind, op.permission)?;
        self.credential
            .sign_request_headers(&mut signing, false, body_len, time::now())?;

        for (_, v) in signing.query.iter_mut() {
            *v = percent_encode(v.as_bytes(), &QUERY_ENCODE_SET).to_string();
        }
        signing.apply(&mut parts)?;

        debug!("sending {} {}", parts.method, parts.uri);
        let req = http::Request::from_parts(parts, op.body.unwrap_or_default());
        let resp = self.ctx.http_send(req).await?;

        if resp.status().is_client_error() || resp.status().is_server_error() {
            return Err(service_error(&resp));
        }

        Ok(resp)
    }
}

/// One request as an operation describes it, before authorization.
pub(crate) struct OpRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
    pub kind: ResourceKind,
    pub permission: Permission,
}

impl OpRequest {
    pub fn new(method: Method, path: String, kind: ResourceKind, permission: Permission) -> Self {
        Self {
            method,
            path,
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            kind,
            permission,
        }
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn opt_header(mut self, name: &str, value: Option<&str>) -> Self {
        if let Some(value) = value {
            self.headers.push((name.to_string(), value.to_string()));
        }
        self
    }

    pub fn body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }
}

fn service_error(resp: &http::Response<Bytes>) -> Error {
    let parsed = xml::parse_service_error(resp.body());
    let message = parsed.message.unwrap_or_else(|| {
        resp.status()
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    });

    let mut err = Error::service(resp.status(), message);
    if let Some(detail) = parsed.authentication_error_detail {
        err = err.with_authentication_detail(detail);
    }
    err
}

/// The path portion of a resource URL. Spaces are the one character blob
/// names commonly carry that a URI cannot.
fn clean_path(path: &str) -> String {
    let path = path.replace(' ', "%20");
    if path.starts_with('/') {
        path
    } else {
        format!("/{path}")
    }
}

pub(crate) fn resource_path(container: &str, blob: &str) -> String {
    if container.is_empty() {
        format!("/{blob}")
    } else {
        format!("/{container}/{blob}")
    }
}

/// Boolean header values travel as literal `True` / `False`.
pub(crate) fn bool_header(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// Container names are 3 to 63 lowercase letters, digits and dashes,
/// starting with a letter or digit. `$root` is the one special case.
pub(crate) fn assert_container_name(name: &str) -> Result<()> {
    if name == "$root" {
        return Ok(());
    }

    let mut chars = name.chars();
    let valid = (3..=63).contains(&name.len())
        && chars
            .next()
            .map(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
            .unwrap_or(false)
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');

    if valid {
        Ok(())
    } else {
        Err(Error::request_invalid(format!("container name `{name}` is not valid")))
    }
}

pub(crate) fn assert_blob_name(container: &str, blob: &str) -> Result<()> {
    if blob.is_empty() {
        return Err(Error::request_invalid("blob name is not specified"));
    }
    if container == "$root" && blob.contains('/') {
        return Err(Error::request_invalid(
            "blobs stored in the root container cannot have a name containing a forward slash (/)",
        ));
    }
    Ok(())
}

/// Metadata names start with a letter, digit, `_` or `@`, then continue
/// with letters, digits and `_`.
fn is_valid_metadata_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .map(|c| c.is_ascii_alphanumeric() || c == '_' || c == '@')
        .unwrap_or(false)
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Render user metadata as `x-ms-meta-` headers, lowercasing names the way
/// the service stores them. Values must stay on one header line.
pub(crate) fn metadata_headers(metadata: &HashMap<String, String>) -> Result<Vec<(String, String)>> {
    let mut headers = Vec::with_capacity(metadata.len());
    for (name, value) in metadata {
        if !is_valid_metadata_name(name) {
            return Err(Error::request_invalid(format!(
                "metadata name `{name}` is not a valid identifier"
            )));
        }
        if value.contains('\r') || value.contains('\n') {
            return Err(Error::request_invalid(format!(
                "metadata value for `{name}` contains a line break"
            )));
        }
        headers.push((format!("{PREFIX_METADATA}{}", name.to_lowercase()), value.clone()));
    }
    headers.sort();
    Ok(headers)
}

/// Collect user metadata back out of `x-ms-meta-` response headers.
pub(crate) fn parse_metadata(headers: &http::HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            let name = name.as_str().strip_prefix(PREFIX_METADATA)?;
            Some((name.to_string(), value.to_str().ok()?.to_string()))
        })
        .collect()
}

pub(crate) fn header_string(resp: &http::Response<Bytes>, name: &str) -> String {
    resp.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
