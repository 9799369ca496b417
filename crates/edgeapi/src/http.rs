//! HTTP gateway backed by a blocking `ureq` agent.

use crate::error::{Error, Result};
use crate::gateway::{Gateway, Method};
use base64::Engine as _;
use serde_json::Value;
use std::time::Duration;

const USER_AGENT: &str = concat!("edgectl/", env!("CARGO_PKG_VERSION"));

/// Credentials sent with every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    /// No `Authorization` header.
    None,
    /// Pre-issued bearer token.
    Bearer(String),
    /// HTTP basic credentials.
    Basic {
        /// User name.
        username: String,
        /// Password.
        password: String,
    },
}

impl Auth {
    fn header_value(&self) -> Option<String> {
        match self {
            Self::None => None,
            Self::Bearer(token) => Some(format!("Bearer {token}")),
            Self::Basic { username, password } => {
                let raw = format!("{username}:{password}");
                Some(format!(
                    "Basic {}",
                    base64::engine::general_purpose::STANDARD.encode(raw)
                ))
            }
        }
    }
}

/// Gateway that talks to a live server.
///
/// # Example
///
/// ```no_run
/// use edgeapi::{Auth, Gateway, HttpGateway};
/// use std::time::Duration;
///
/// let gateway = HttpGateway::new(
///     "https://console.redhat.com",
///     Auth::Bearer("token".into()),
///     Duration::from_secs(30),
/// );
/// let groups = gateway.get("/api/edge/v1/device-groups?name=lab").unwrap();
/// println!("{groups}");
/// ```
pub struct HttpGateway {
    agent: ureq::Agent,
    base_url: String,
    auth: Option<String>,
}

impl HttpGateway {
    /// Create a gateway for `base_url` (scheme and host, no trailing path).
    #[must_use]
    pub fn new(base_url: impl Into<String>, auth: Auth, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth: auth.header_value(),
        }
    }

    /// The configured server root.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }

    fn with_headers<B>(&self, req: ureq::RequestBuilder<B>) -> ureq::RequestBuilder<B> {
        let req = req
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT);
        match &self.auth {
            Some(value) => req.header("Authorization", value.as_str()),
            None => req,
        }
    }

    fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> std::result::Result<ureq::http::Response<ureq::Body>, ureq::Error> {
        match (method, body) {
            (Method::Get, _) => self.with_headers(self.agent.get(url)).call(),
            (Method::Delete, None) => self.with_headers(self.agent.delete(url)).call(),
            (Method::Delete, Some(body)) => self
                .with_headers(self.agent.delete(url))
                .force_send_body()
                .send_json(body),
            (Method::Post, Some(body)) => self.with_headers(self.agent.post(url)).send_json(body),
            (Method::Post, None) => self.with_headers(self.agent.post(url)).send_empty(),
            (Method::Put, Some(body)) => self.with_headers(self.agent.put(url)).send_json(body),
            (Method::Put, None) => self.with_headers(self.agent.put(url)).send_empty(),
            (Method::Patch, Some(body)) => self.with_headers(self.agent.patch(url)).send_json(body),
            (Method::Patch, None) => self.with_headers(self.agent.patch(url)).send_empty(),
        }
    }
}

impl Gateway for HttpGateway {
    fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let url = self.url(path);
        log::debug!("{method} {path}");

        let mut response = self.send(method, &url, body)?;
        let status = response.status().as_u16();
        log::trace!("{method} {path} -> {status}");

        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|e| Error::Network {
                message: format!("reading response from {path}: {e}"),
            })?;

        if !(200..300).contains(&status) {
            return Err(Error::remote(method.as_str(), path, status, text));
        }
        decode_body(path, &text)
    }
}

/// Decode a success body; empty means `{}`.
pub(crate) fn decode_body(path: &str, text: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    serde_json::from_str(text).map_err(|e| Error::invalid(path, e.to_string()))
}
