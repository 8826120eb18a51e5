//! A recording transport for exercising the client without a service.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use azblob::BlobClient;
use azblob_core::{Context, HttpSend, Result};
use bytes::Bytes;

/// One request as the transport saw it, after signing.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: http::Method,
    pub uri: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Decoded query pairs of the request URI.
    pub fn query(&self) -> Vec<(String, String)> {
        let query = self.uri.split_once('?').map(|(_, q)| q).unwrap_or_default();
        form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    pub fn query_value(&self, key: &str) -> Option<String> {
        self.query().into_iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

/// A scripted response, served in push order.
struct ScriptedResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: Bytes,
}

#[derive(Default)]
struct State {
    requests: Vec<RecordedRequest>,
    responses: VecDeque<ScriptedResponse>,
}

/// Transport that records every request and answers from a script, falling
/// back to an empty `200 OK` carrying an etag and a modification date.
#[derive(Clone, Default)]
pub struct MockHttpSend {
    state: Arc<Mutex<State>>,
}

impl std::fmt::Debug for MockHttpSend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockHttpSend").finish()
    }
}

impl MockHttpSend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, status: u16, body: &str) {
        self.push_response_with_headers(status, &[], body);
    }

    pub fn push_response_with_headers(&self, status: u16, headers: &[(&str, &str)], body: &str) {
        let mut state = self.state.lock().unwrap();
        state.responses.push_back(ScriptedResponse {
            status,
            headers: headers
                .iter()
                .map(|(n, v)| (n.to_string(), v.to_string()))
                .collect(),
            body: Bytes::from(body.to_string()),
        });
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }
}

#[async_trait]
impl HttpSend for MockHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let mut state = self.state.lock().unwrap();

        state.requests.push(RecordedRequest {
            method: req.method().clone(),
            uri: req.uri().to_string(),
            headers: req
                .headers()
                .iter()
                .map(|(n, v)| (n.to_string(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
                .collect(),
            body: req.body().clone(),
        });

        let scripted = state.responses.pop_front().unwrap_or(ScriptedResponse {
            status: 200,
            headers: vec![
                ("etag".to_string(), "0x8CAFB82EFF70C46".to_string()),
                (
                    "last-modified".to_string(),
                    "Wed, 01 Jan 2020 00:00:00 GMT".to_string(),
                ),
            ],
            body: Bytes::new(),
        });

        let mut builder = http::Response::builder().status(scripted.status);
        for (name, value) in &scripted.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        Ok(builder.body(scripted.body).expect("response must build"))
    }
}

/// Development storage client wired to a fresh mock transport.
pub fn test_client() -> (BlobClient, MockHttpSend) {
    let _ = env_logger::builder().is_test(true).try_init();

    let mock = MockHttpSend::new();
    let ctx = Context::new().with_http_send(mock.clone());
    let client = BlobClient::development_storage(ctx).expect("devstore config is valid");
    (client, mock)
}
