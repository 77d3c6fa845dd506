//! Transport adapter: one request in, a decoded Scrapyd envelope out.
//!
//! # Design
//! Every Scrapyd reply is a JSON object with a `status` of `"ok"` or
//! `"error"`. `Client` runs a request through its [`Transport`] and turns the
//! reply into either the envelope's fields (with `status` removed) or an
//! [`ApiError`]. The interpretation lives in [`check_status`] and
//! [`decode_envelope`], which are pure and can be applied to any
//! [`HttpResponse`].

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::config::Credentials;
use crate::error::{ApiError, Result, DEFAULT_RESPONSE_DETAIL};
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::{Transport, UreqTransport};

/// Fields of a successful envelope, `status` excluded.
pub type Envelope = Map<String, Value>;

/// Cheaply cloneable handle over a shared [`Transport`].
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Client over an unauthenticated [`UreqTransport`].
    pub fn new() -> Self {
        Self::with_transport(UreqTransport::new())
    }

    pub fn with_credentials(credentials: Option<&Credentials>) -> Self {
        match credentials {
            Some(credentials) => Self::with_transport(UreqTransport::with_credentials(credentials)),
            None => Self::new(),
        }
    }

    pub fn with_transport(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    /// Send `request` and decode the JSON envelope of the reply.
    pub fn request(&self, request: &HttpRequest) -> Result<Envelope> {
        let response = self.transport.send(request)?;
        check_status(&response)?;
        decode_envelope(response)
    }

    /// Send `request` and return the reply body untouched. Non-2xx statuses
    /// still fail.
    pub fn request_text(&self, request: &HttpRequest) -> Result<String> {
        let response = self.transport.send(request)?;
        check_status(&response)?;
        Ok(response.body)
    }
}

/// Reject any non-2xx response, keeping the raw body for diagnosis.
pub fn check_status(response: &HttpResponse) -> Result<()> {
    if response.is_success() {
        return Ok(());
    }
    Err(ApiError::HttpStatus {
        status: response.status,
        body: response.body.clone(),
    })
}

/// Decode a Scrapyd envelope, stripping `status` on success.
pub fn decode_envelope(response: HttpResponse) -> Result<Envelope> {
    let value: Value = match serde_json::from_str(&response.body) {
        Ok(value) => value,
        Err(_) => return Err(ApiError::InvalidJson { body: response.body }),
    };
    let Value::Object(mut envelope) = value else {
        return Err(ApiError::UnexpectedResponse(response.body));
    };

    match envelope.remove("status") {
        Some(Value::String(status)) if status == "ok" => Ok(envelope),
        Some(Value::String(status)) if status == "error" => {
            let message = match envelope.remove("message") {
                Some(Value::String(message)) => message,
                Some(other) => other.to_string(),
                None => DEFAULT_RESPONSE_DETAIL.to_string(),
            };
            Err(ApiError::Server { message })
        }
        _ => Err(ApiError::UnexpectedResponse(response.body)),
    }
}
