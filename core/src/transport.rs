//! Raw HTTP round trips.
//!
//! # Design
//! `Transport` is the seam between the client and the network: it turns an
//! [`HttpRequest`] into an [`HttpResponse`] and reports only failures that
//! happened below HTTP (connect errors, timeouts, broken bodies). Status codes
//! are returned as data so the adapter can interpret them.
//!
//! `UreqTransport` is the default implementation. Any other HTTP stack, or a
//! canned responder in tests, can stand in by implementing the trait.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::debug;
use ureq::unversioned::multipart::{Form as MultipartForm, Part};

use crate::config::Credentials;
use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Multipart, RequestBody, Timeout};

/// Executes one HTTP request and returns the response as data.
pub trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// Blocking transport backed by a `ureq` agent.
///
/// The agent pools connections, so one instance can be shared across calls.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    authorization: Option<String>,
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport")
            .field("authenticated", &self.authorization.is_some())
            .finish()
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self {
            agent,
            authorization: None,
        }
    }

    /// Transport that sends HTTP Basic credentials with every request.
    pub fn with_credentials(credentials: &Credentials) -> Self {
        Self {
            authorization: Some(basic_authorization(credentials)),
            ..Self::new()
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authorization.is_some()
    }

    fn prepare<B>(&self, builder: ureq::RequestBuilder<B>, request: &HttpRequest) -> ureq::RequestBuilder<B> {
        let builder = request
            .query
            .iter()
            .fold(builder, |builder, (key, value)| builder.query(key, value));
        let builder = match &self.authorization {
            Some(value) => builder.header("Authorization", value.as_str()),
            None => builder,
        };
        match request.timeout {
            None => builder,
            Some(Timeout::Total(total)) => builder.config().timeout_global(Some(total)).build(),
            Some(Timeout::Phases { connect, read }) => builder
                .config()
                .timeout_connect(Some(connect))
                .timeout_recv_response(Some(read))
                .timeout_recv_body(Some(read))
                .build(),
        }
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        debug!(method = %request.method, url = %request.url, "sending request");

        let result = match (request.method, &request.body) {
            (HttpMethod::Get, _) => self.prepare(self.agent.get(&request.url), request).call(),
            (HttpMethod::Post, RequestBody::Empty) => {
                self.prepare(self.agent.post(&request.url), request).send_empty()
            }
            (HttpMethod::Post, RequestBody::Form(form)) => {
                self.prepare(self.agent.post(&request.url), request).send_form(form.iter())
            }
            (HttpMethod::Post, RequestBody::Multipart(multipart)) => {
                let form = multipart_form(multipart)?;
                self.prepare(self.agent.post(&request.url), request).send(form)
            }
        };

        let mut response = result.map_err(from_ureq)?;
        let status = response.status().as_u16();
        // Status and body are handed on even when the body is not UTF-8.
        let bytes = response.body_mut().read_to_vec().map_err(from_ureq)?;
        let body = String::from_utf8_lossy(&bytes).into_owned();
        debug!(status, bytes = body.len(), "received response");

        Ok(HttpResponse { status, body })
    }
}

fn multipart_form(multipart: &Multipart) -> Result<MultipartForm<'_>> {
    let form = multipart
        .fields
        .iter()
        .fold(MultipartForm::new(), |form, (name, value)| form.text(name, value));
    multipart.files.iter().try_fold(form, |form, file| -> Result<MultipartForm<'_>> {
        let part = Part::bytes(&file.content)
            .file_name(&disposition_file_name(&file.file_name))
            .mime_str("application/octet-stream")
            .map_err(from_ureq)?;
        Ok(form.part(&file.name, part))
    })
}

/// ureq writes the file name into the part header verbatim, so quotes,
/// backslashes and control characters are replaced before it gets there.
fn disposition_file_name(name: &str) -> String {
    name.chars()
        .map(|c| if c == '"' || c == '\\' || c.is_control() { '_' } else { c })
        .collect()
}

fn basic_authorization(credentials: &Credentials) -> String {
    let token = STANDARD.encode(format!("{}:{}", credentials.username, credentials.password));
    format!("Basic {token}")
}

fn from_ureq(error: ureq::Error) -> ApiError {
    match error {
        ureq::Error::Timeout(_) => ApiError::Timeout(error.to_string()),
        other => ApiError::Transport(Box::new(other)),
    }
}
