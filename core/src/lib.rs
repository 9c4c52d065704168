//! Declarative client core for the Drip marketing-automation API.
//!
//! # Overview
//! Named operations ("add subscriber", "tag subscriber", ...) map onto HTTP
//! requests through an `EndpointRegistry`. Caller values are substituted into
//! path and body templates by a small `<name>` placeholder engine, and a known
//! field is unwrapped from the JSON response.
//!
//! # Design
//! - `template` is pure: interpolation, placeholder extraction, narrowing.
//! - `EndpointRegistry` is built once and only read afterwards.
//! - `DripClient` splits each call into `build_request` / `parse_response`
//!   around a `Transport`, so the I/O boundary is explicit and replaceable.
//! - Failures are tagged `ClientError`s until the public convenience methods,
//!   which return `None` for any failure.

pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod template;

pub use client::DripClient;
pub use config::ClientConfig;
pub use endpoint::{operations, tags, EndpointDescriptor, EndpointRegistry};
pub use error::{ClientError, ParseMethodError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use template::{interpolate, interpolate_default, params, placeholders, Params};
