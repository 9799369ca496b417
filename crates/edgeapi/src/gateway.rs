//! Remote API gateway abstraction.
//!
//! Everything above this layer talks to the edge services through
//! [`Gateway`], so the reconcile engine runs unchanged against HTTP, a
//! scripted mock or a stateful fake.

use crate::error::Result;
use serde_json::Value;
use std::fmt;

/// HTTP method of a gateway request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

impl Method {
    /// Upper-case method name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Whether this method mutates remote state.
    #[must_use]
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Self::Get)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A JSON request/response channel to the edge services.
///
/// `path` is absolute from the server root and may carry a query string.
/// Implementations return the decoded JSON body on 2xx (an empty body is `{}`)
/// and [`crate::Error::Remote`] for any other status.
pub trait Gateway {
    /// Perform one request.
    fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value>;

    /// GET `path`.
    fn get(&self, path: &str) -> Result<Value> {
        self.request(Method::Get, path, None)
    }

    /// POST `body` to `path`.
    fn post(&self, path: &str, body: &Value) -> Result<Value> {
        self.request(Method::Post, path, Some(body))
    }

    /// PUT `body` to `path`.
    fn put(&self, path: &str, body: &Value) -> Result<Value> {
        self.request(Method::Put, path, Some(body))
    }

    /// PATCH `path` with `body`.
    fn patch(&self, path: &str, body: &Value) -> Result<Value> {
        self.request(Method::Patch, path, Some(body))
    }

    /// DELETE `path`, optionally with a body.
    fn delete(&self, path: &str, body: Option<&Value>) -> Result<Value> {
        self.request(Method::Delete, path, body)
    }
}

impl<G: Gateway + ?Sized> Gateway for &G {
    fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        (**self).request(method, path, body)
    }
}

impl<G: Gateway + ?Sized> Gateway for Box<G> {
    fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        (**self).request(method, path, body)
    }
}

/// Build `path?k=v&...`, percent-encoding every value.
///
/// Keys are passed through as given so callers can use bracketed keys such
/// as `filter[system_profile][host_type]`.
#[must_use]
pub fn with_query(path: &str, params: &[(&str, String)]) -> String {
    if params.is_empty() {
        return path.to_string();
    }
    let query = params
        .iter()
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    let sep = if path.contains('?') { '&' } else { '?' };
    format!("{path}{sep}{query}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_names() {
        assert_eq!(Method::Get.to_string(), "GET");
        assert_eq!(Method::Delete.as_str(), "DELETE");
        assert!(!Method::Get.is_mutating());
        assert!(Method::Patch.is_mutating());
    }

    #[test]
    fn test_with_query_encodes_values() {
        assert_eq!(with_query("/x", &[]), "/x");
        assert_eq!(
            with_query("/x", &[("name", "a b&c".to_string())]),
            "/x?name=a%20b%26c"
        );
        assert_eq!(
            with_query("/x?a=1", &[("b", "2".to_string())]),
            "/x?a=1&b=2"
        );
    }
}
