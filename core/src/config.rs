//! Construction of a [`ScrapydApi`]: credentials, endpoint overrides,
//! a pre-built client and the per-call timeout.

use std::collections::BTreeMap;

use serde::Deserialize;
use url::Url;

use crate::api::ScrapydApi;
use crate::client::Client;
use crate::endpoints::Endpoints;
use crate::error::{ApiError, Result};
use crate::http::Timeout;

/// Target used when none is configured.
pub const DEFAULT_TARGET: &str = "http://localhost:6800";

/// HTTP Basic credential pair.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Declarative client settings, e.g. loaded from a JSON or TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_target")]
    pub target: String,
    #[serde(default)]
    pub auth: Option<Credentials>,
    #[serde(default)]
    pub endpoints: BTreeMap<String, String>,
    #[serde(default)]
    pub timeout: Option<Timeout>,
}

fn default_target() -> String {
    DEFAULT_TARGET.to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            target: default_target(),
            auth: None,
            endpoints: BTreeMap::new(),
            timeout: None,
        }
    }
}

/// Builder for [`ScrapydApi`].
#[derive(Debug)]
pub struct ApiBuilder {
    target: String,
    auth: Option<Credentials>,
    endpoints: Endpoints,
    client: Option<Client>,
    timeout: Option<Timeout>,
}

impl ApiBuilder {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            auth: None,
            endpoints: Endpoints::default(),
            client: None,
            timeout: None,
        }
    }

    /// Basic credentials for the default client. Ignored when
    /// [`ApiBuilder::client`] supplies a pre-built one.
    pub fn auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some(Credentials::new(username, password));
        self
    }

    pub fn credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.auth = credentials;
        self
    }

    pub fn endpoint(mut self, key: impl Into<String>, path: impl Into<String>) -> Self {
        self.endpoints.set(key, path);
        self
    }

    pub fn endpoints<I, K, V>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.endpoints.extend(overrides);
        self
    }

    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn timeout(mut self, timeout: impl Into<Timeout>) -> Self {
        self.timeout = Some(timeout.into());
        self
    }

    pub fn build(self) -> Result<ScrapydApi> {
        let target = Url::parse(&self.target).map_err(|source| ApiError::InvalidTarget {
            target: self.target.clone(),
            source,
        })?;
        if target.cannot_be_a_base() {
            return Err(ApiError::InvalidTarget {
                target: self.target,
                source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
            });
        }
        let client = match self.client {
            Some(client) => client,
            None => Client::with_credentials(self.auth.as_ref()),
        };
        Ok(ScrapydApi::from_parts(target, self.endpoints, client, self.timeout))
    }
}

impl From<ApiConfig> for ApiBuilder {
    fn from(config: ApiConfig) -> Self {
        let mut builder = ApiBuilder::new(config.target)
            .credentials(config.auth)
            .endpoints(config.endpoints);
        builder.timeout = config.timeout;
        builder
    }
}
