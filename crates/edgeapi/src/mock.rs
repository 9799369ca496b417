//! Scripted in-memory gateway for tests.
//!
//! Canned responses are keyed by method and exact path. Handlers answer
//! anything else, first match wins. Every request is logged.

use crate::error::{Error, Result};
use crate::gateway::{Gateway, Method};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;

/// A request the mock received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    /// Method.
    pub method: Method,
    /// Path including query.
    pub path: String,
    /// JSON body, if any.
    pub body: Option<Value>,
}

#[derive(Debug, Clone)]
enum Canned {
    Json(Value),
    Status(u16, String),
}

type Handler = Box<dyn Fn(Method, &str, Option<&Value>) -> Option<Result<Value>>>;

/// Scripted gateway.
#[derive(Default)]
pub struct MockGateway {
    canned: RefCell<HashMap<(Method, String), Canned>>,
    handlers: RefCell<Vec<Handler>>,
    log: RefCell<Vec<Recorded>>,
}

impl MockGateway {
    /// Empty mock; every request is a 404 until scripted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `method path` with `response`.
    pub fn on(&self, method: Method, path: impl Into<String>, response: Value) {
        self.canned
            .borrow_mut()
            .insert((method, path.into()), Canned::Json(response));
    }

    /// Answer `GET path` with `response`.
    pub fn on_get(&self, path: impl Into<String>, response: Value) {
        self.on(Method::Get, path, response);
    }

    /// Fail `method path` with a non-2xx status.
    pub fn on_status(&self, method: Method, path: impl Into<String>, status: u16, body: &str) {
        self.canned
            .borrow_mut()
            .insert((method, path.into()), Canned::Status(status, body.to_string()));
    }

    /// Answer unscripted requests; return `None` to pass.
    pub fn handle(
        &self,
        handler: impl Fn(Method, &str, Option<&Value>) -> Option<Result<Value>> + 'static,
    ) {
        self.handlers.borrow_mut().push(Box::new(handler));
    }

    /// Every request received, in order.
    pub fn requests(&self) -> Vec<Recorded> {
        self.log.borrow().clone()
    }

    /// Requests other than GET, in order.
    pub fn mutations(&self) -> Vec<Recorded> {
        self.log
            .borrow()
            .iter()
            .filter(|r| r.method.is_mutating())
            .cloned()
            .collect()
    }
}

impl Gateway for MockGateway {
    fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        self.log.borrow_mut().push(Recorded {
            method,
            path: path.to_string(),
            body: body.cloned(),
        });

        let canned = self
            .canned
            .borrow()
            .get(&(method, path.to_string()))
            .cloned();
        match canned {
            Some(Canned::Json(value)) => return Ok(value),
            Some(Canned::Status(status, body)) => {
                return Err(Error::remote(method.as_str(), path, status, body));
            }
            None => {}
        }

        for handler in self.handlers.borrow().iter() {
            if let Some(result) = handler(method, path, body) {
                return result;
            }
        }
        Err(Error::remote(method.as_str(), path, 404, "no scripted response"))
    }
}

/// Decoded value of query parameter `key` in `path`.
pub fn query_param(path: &str, key: &str) -> Option<String> {
    let (_, query) = path.split_once('?')?;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == key)
        .and_then(|(_, v)| urlencoding::decode(v).ok())
        .map(std::borrow::Cow::into_owned)
}

/// Path without its query string.
pub fn path_only(path: &str) -> &str {
    path.split_once('?').map_or(path, |(p, _)| p)
}
