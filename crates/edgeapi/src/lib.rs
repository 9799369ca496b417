//! # edgeapi
//!
//! Blocking client for the edge fleet and inventory REST services.
//!
//! This crate provides:
//! - [`Gateway`]: the request/response seam, with an HTTP implementation
//!   ([`HttpGateway`]) and a scripted one for tests ([`MockGateway`])
//! - [`Paginator`]: complete collections from page/per_page or limit/offset
//!   endpoints
//! - [`EdgeClient`]: typed operations on groups, devices, images, image sets,
//!   inventory hosts and custom repositories
//!
//! ## Example
//!
//! ```no_run
//! use edgeapi::{Auth, EdgeClient, HttpGateway};
//! use std::time::Duration;
//!
//! let gateway = HttpGateway::new(
//!     "https://console.redhat.com",
//!     Auth::Bearer(std::env::var("EDGECTL_TOKEN").unwrap()),
//!     Duration::from_secs(30),
//! );
//! let client = EdgeClient::new(&gateway).with_page_size(50);
//!
//! for device in client.list_devices().unwrap() {
//!     println!("{} {}", device.uuid, device.status);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod error;
pub mod gateway;
pub mod http;
pub mod mock;
pub mod models;
pub mod paginate;

// Re-export main types at crate root
pub use client::{EDGE_API, EdgeClient, INVENTORY_API};
pub use error::{Error, ErrorCategory, Result};
pub use gateway::{Gateway, Method, with_query};
pub use http::{Auth, HttpGateway};
pub use mock::MockGateway;
pub use paginate::{DEFAULT_STEP, PageQuery, PageStyle, Paginator};
