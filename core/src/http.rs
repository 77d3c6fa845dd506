//! HTTP request and response types exchanged with a [`Transport`].
//!
//! # Design
//! Requests and responses are plain data. The façade builds an `HttpRequest`
//! per call, a `Transport` executes it, and the adapter interprets the
//! `HttpResponse`. Keeping them as owned values makes every payload the
//! façade produces inspectable in tests without a network.
//!
//! [`Transport`]: crate::transport::Transport

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => f.write_str("GET"),
            HttpMethod::Post => f.write_str("POST"),
        }
    }
}

/// Upper bound on a single call.
///
/// Deserializes from either a number of seconds or a
/// `{ "connect": .., "read": .. }` pair of seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "TimeoutRepr")]
pub enum Timeout {
    /// Bounds the whole call, from connect to the last body byte.
    Total(Duration),
    /// Bounds connecting and reading the response separately.
    Phases { connect: Duration, read: Duration },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TimeoutRepr {
    Secs(f64),
    Phases { connect: f64, read: f64 },
}

impl TryFrom<TimeoutRepr> for Timeout {
    type Error = String;

    fn try_from(repr: TimeoutRepr) -> Result<Self, Self::Error> {
        let secs = |value: f64| {
            Duration::try_from_secs_f64(value).map_err(|e| format!("invalid timeout {value}: {e}"))
        };
        match repr {
            TimeoutRepr::Secs(total) => Ok(Timeout::Total(secs(total)?)),
            TimeoutRepr::Phases { connect, read } => Ok(Timeout::Phases {
                connect: secs(connect)?,
                read: secs(read)?,
            }),
        }
    }
}

impl From<Duration> for Timeout {
    fn from(duration: Duration) -> Self {
        Timeout::Total(duration)
    }
}

/// Ordered list of form fields. A key may appear more than once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form {
    fields: Vec<(String, String)>,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to a single value, replacing every earlier value in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let key = key.into();
        let value = value.into();
        match self.fields.iter().position(|(k, _)| *k == key) {
            Some(first) => {
                self.fields[first].1 = value;
                let mut index = 0;
                self.fields.retain(|(k, _)| {
                    let keep = index <= first || *k != key;
                    index += 1;
                    keep
                });
            }
            None => self.fields.push((key, value)),
        }
        self
    }

    /// Add another value for `key`, keeping existing ones.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.fields.push((key.into(), value.into()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == key)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Form {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// A file attached to a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub name: String,
    pub file_name: String,
    pub content: Vec<u8>,
}

/// A `multipart/form-data` body: plain fields followed by file parts.
///
/// Encoding is left to the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Multipart {
    pub fields: Form,
    pub files: Vec<FilePart>,
}

/// Body of an outgoing request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RequestBody {
    #[default]
    Empty,
    Form(Form),
    Multipart(Multipart),
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
    pub timeout: Option<Timeout>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            timeout: None,
        }
    }

    pub fn post(url: impl Into<String>, body: RequestBody) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            query: Vec::new(),
            body,
            timeout: None,
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Option<Timeout>) -> Self {
        self.timeout = timeout;
        self
    }

    /// The form fields carried by this request, whether url-encoded or multipart.
    pub fn form(&self) -> Option<&Form> {
        match &self.body {
            RequestBody::Empty => None,
            RequestBody::Form(form) => Some(form),
            RequestBody::Multipart(multipart) => Some(&multipart.fields),
        }
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
