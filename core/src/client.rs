//! Declarative client for the Drip v2 API.
//!
//! # Design
//! `DripClient` owns its configuration, an immutable `EndpointRegistry` and a
//! `Transport`. Every operation runs the same pipeline:
//!
//! 1. look up the endpoint and check the parameters,
//! 2. trim `name` to the first name where the body expects one,
//! 3. render the path and body templates,
//! 4. send one request through the transport,
//! 5. decode the JSON body and unwrap the endpoint's response field.
//!
//! `build_request` and `parse_response` expose steps 1-3 and 5 so the caller
//! can run the round trip itself. `execute` keeps the failure kind;
//! `call` and the named operations collapse failures into `None`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::endpoint::{operations, EndpointDescriptor, EndpointRegistry};
use crate::error::ClientError;
use crate::http::{HttpRequest, HttpResponse, Transport, UreqTransport};
use crate::template::{interpolate, narrow, Params, DEFAULT_ESCAPE};

/// Client bound to one API key, base URL and endpoint table.
#[derive(Debug, Clone)]
pub struct DripClient<T = UreqTransport> {
    config: ClientConfig,
    registry: EndpointRegistry,
    transport: T,
}

impl DripClient<UreqTransport> {
    /// Client for the public Drip API using the built-in endpoint catalog.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_config(ClientConfig::new(api_key))
    }

    pub fn with_config(config: ClientConfig) -> Self {
        let transport = UreqTransport::new(config.timeout);
        Self::with_transport(config, transport)
    }
}

impl<T> DripClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self {
            config,
            registry: EndpointRegistry::default(),
            transport,
        }
    }

    /// Replace the endpoint table. `None` or an empty table restores the
    /// built-in catalog.
    pub fn load_endpoints(&mut self, entries: Option<IndexMap<String, EndpointDescriptor>>) {
        self.registry = EndpointRegistry::from_entries(entries.unwrap_or_default());
        debug!(operations = self.registry.len(), "loaded endpoint table");
    }

    pub fn set_registry(&mut self, registry: EndpointRegistry) {
        self.registry = registry;
    }

    pub fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn valid_params(&self, operation: &str, params: &Params) -> bool {
        self.registry.valid_params(operation, params)
    }

    /// Base URL followed by the rendered path template.
    ///
    /// Placeholders without a value stay in the URL as written.
    pub fn build_url(&self, operation: &str, params: &Params) -> Result<String, ClientError> {
        let descriptor = self.descriptor(operation)?;
        let binds = narrow(&descriptor.path, params);
        let path = interpolate(&descriptor.path, &binds, DEFAULT_ESCAPE, None);
        Ok(format!("{}{}", self.config.base_url(), path))
    }

    /// Rendered body template, trimmed. Empty when the endpoint has no body.
    pub fn build_body(&self, operation: &str, params: &Params) -> Result<String, ClientError> {
        let descriptor = self.descriptor(operation)?;
        let Some(template) = &descriptor.body else {
            return Ok(String::new());
        };
        let binds = narrow(template, params);
        Ok(interpolate(template, &binds, DEFAULT_ESCAPE, None)
            .trim()
            .to_string())
    }

    /// Validate `params` and produce the request for `operation`.
    pub fn build_request(&self, operation: &str, params: &Params) -> Result<HttpRequest, ClientError> {
        let descriptor = self.registry.check_params(operation, params)?;

        let trimmed;
        let params = if descriptor.takes_first_name() {
            trimmed = first_name_only(params);
            &trimmed
        } else {
            params
        };
        let url = self.build_url(operation, params)?;
        let body = self.build_body(operation, params)?;

        Ok(HttpRequest {
            method: descriptor.method,
            url,
            headers: vec![
                ("Content-Type".to_string(), "application/json".to_string()),
                ("Authorization".to_string(), self.authorization()),
            ],
            body: (!body.is_empty()).then_some(body),
        })
    }

    /// Decode the response and unwrap the endpoint's response field.
    ///
    /// The status code is not interpreted. When the field is absent or empty
    /// the whole decoded body is returned. An empty or undecodable body is
    /// `null`.
    pub fn parse_response(&self, operation: &str, response: HttpResponse) -> Result<Value, ClientError> {
        let descriptor = self.descriptor(operation)?;

        if !response.is_success() {
            warn!(operation, status = response.status, "non-success status from drip");
        }

        let value = decode_body(operation, &response.body);

        if !descriptor.response.is_empty() {
            if let Some(field) = value
                .get(descriptor.response.as_str())
                .filter(|field| !is_empty_value(field))
            {
                return Ok(field.clone());
            }
        }
        Ok(value)
    }

    fn descriptor(&self, operation: &str) -> Result<&EndpointDescriptor, ClientError> {
        self.registry
            .get(operation)
            .ok_or_else(|| ClientError::UnknownOperation(operation.to_string()))
    }

    fn authorization(&self) -> String {
        format!("Basic {}", STANDARD.encode(self.config.api_key()))
    }
}

impl<T: Transport> DripClient<T> {
    /// Run `operation` end to end, keeping the failure kind.
    pub fn execute(&self, operation: &str, params: &Params) -> Result<Value, ClientError> {
        let request = self.build_request(operation, params)?;
        debug!(operation, method = %request.method, url = %request.url, "sending drip request");
        let response = self.transport.send(&request)?;
        self.parse_response(operation, response)
    }

    /// Run `operation` end to end. `None` signals any failure.
    pub fn call(&self, operation: &str, params: &Params) -> Option<Value> {
        match self.execute(operation, params) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(operation, error = %e, "drip operation failed");
                None
            }
        }
    }

    pub fn accounts_list(&self) -> Option<Value> {
        self.call(operations::ACCOUNTS_LIST, &Params::new())
    }

    pub fn workflows_list(&self, params: &Params) -> Option<Value> {
        self.call(operations::WORKFLOWS_LIST, params)
    }

    pub fn campaigns_list(&self, params: &Params) -> Option<Value> {
        self.call(operations::CAMPAIGNS_LIST, params)
    }

    pub fn add_subscriber(&self, params: &Params) -> Option<Value> {
        self.call(operations::ADD_SUBSCRIBER, params)
    }

    pub fn remove_subscriber(&self, params: &Params) -> Option<Value> {
        self.call(operations::REMOVE_SUBSCRIBER, params)
    }

    pub fn add_tag(&self, params: &Params) -> Option<Value> {
        self.call(operations::TAG_SUBSCRIBER, params)
    }

    pub fn remove_tag(&self, params: &Params) -> Option<Value> {
        self.call(operations::REMOVE_TAG, params)
    }

    pub fn add_to_workflow(&self, params: &Params) -> Option<Value> {
        self.call(operations::ADD_TO_WORKFLOW, params)
    }

    pub fn remove_from_workflow(&self, params: &Params) -> Option<Value> {
        self.call(operations::REMOVE_FROM_WORKFLOW, params)
    }

    pub fn add_to_campaign(&self, params: &Params) -> Option<Value> {
        self.call(operations::ADD_TO_CAMPAIGN, params)
    }

    pub fn remove_from_campaign(&self, params: &Params) -> Option<Value> {
        self.call(operations::REMOVE_FROM_CAMPAIGN, params)
    }

    pub fn record_event(&self, params: &Params) -> Option<Value> {
        self.call(operations::RECORD_EVENT, params)
    }
}

/// Decoded JSON body, or `null` when the body is empty or not JSON.
fn decode_body(operation: &str, body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|e| {
        warn!(operation, error = %e, "drip response is not JSON");
        Value::Null
    })
}

/// Copy of `params` with `name` cut down to its first word.
fn first_name_only(params: &Params) -> Params {
    let mut params = params.clone();
    if let Some(name) = params.get_mut("name") {
        *name = name.split_whitespace().next().unwrap_or_default().to_string();
    }
    params
}

/// Whether a decoded value counts as empty: null, false, zero, "", "0", or an
/// empty array or object.
fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}
