//! Endpoint descriptors, the operation registry and parameter validation.
//!
//! # Design
//! Each operation maps to an `EndpointDescriptor`: method, path template,
//! optional body template and the response field to unwrap. The registry is
//! built once and then only read. Loading a new table replaces it wholesale;
//! there is no per-entry mutation.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::http::HttpMethod;
use crate::template::{placeholders, Params};

/// Names of the built-in operations.
pub mod operations {
    pub const ACCOUNTS_LIST: &str = "accounts_list";
    pub const WORKFLOWS_LIST: &str = "workflows_list";
    pub const CAMPAIGNS_LIST: &str = "campaigns_list";
    pub const ADD_TO_WORKFLOW: &str = "add_to_workflow";
    pub const REMOVE_FROM_WORKFLOW: &str = "remove_from_workflow";
    pub const ADD_SUBSCRIBER: &str = "add_subscriber";
    pub const REMOVE_SUBSCRIBER: &str = "remove_subscriber";
    pub const TAG_SUBSCRIBER: &str = "tag_subscriber";
    pub const REMOVE_TAG: &str = "remove_tag";
    pub const ADD_TO_CAMPAIGN: &str = "add_to_campaign";
    pub const REMOVE_FROM_CAMPAIGN: &str = "remove_from_campaign";
    pub const RECORD_EVENT: &str = "record_event";
}

/// Tag names applied when S7 products are installed or removed.
pub mod tags {
    pub const BUNDLE_INSTALL: &str = "S7 Bundle Install";
    pub const TIMER_INSTALL: &str = "S7 Timer Install";
    pub const EXPRESS_INSTALL: &str = "S7 Express Install";

    pub const BUNDLE_UNINSTALL: &str = "S7 Bundle Un-Install";
    pub const TIMER_UNINSTALL: &str = "S7 Timer Un-Install";
    pub const EXPRESS_UNINSTALL: &str = "S7 Express Un-Install";
}

static FIRST_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""first_name"\s*:\s*"<name>""#).expect("valid regex"));

/// Static definition of one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    pub method: HttpMethod,
    /// Path appended to the base URL, with `<name>` placeholders.
    pub path: String,
    /// JSON body template. `None` means the request has no body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Field unwrapped from the decoded response; empty returns it whole.
    #[serde(default)]
    pub response: String,
}

impl EndpointDescriptor {
    pub fn new(method: HttpMethod, path: &str, response: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            body: None,
            response: response.to_string(),
        }
    }

    pub fn with_body(mut self, body: &str) -> Self {
        self.body = Some(body.to_string());
        self
    }

    /// Whether the body binds `<name>` to a `first_name` field.
    pub fn takes_first_name(&self) -> bool {
        self.body
            .as_deref()
            .is_some_and(|body| FIRST_NAME_RE.is_match(body))
    }
}

/// Ordered map from operation name to descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointRegistry {
    entries: IndexMap<String, EndpointDescriptor>,
}

impl EndpointRegistry {
    /// Use exactly `entries`. An empty table installs the built-in catalog.
    pub fn from_entries(entries: IndexMap<String, EndpointDescriptor>) -> Self {
        if entries.is_empty() {
            return Self::default();
        }
        Self { entries }
    }

    /// Parse a JSON object of `operation -> descriptor`.
    pub fn from_json(raw: &str) -> Result<Self, ClientError> {
        let entries: IndexMap<String, EndpointDescriptor> =
            serde_json::from_str(raw).map_err(|e| ClientError::Config(e.to_string()))?;
        Ok(Self::from_entries(entries))
    }

    pub fn get(&self, operation: &str) -> Option<&EndpointDescriptor> {
        self.entries.get(operation)
    }

    pub fn contains(&self, operation: &str) -> bool {
        self.entries.contains_key(operation)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn operations(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Look up `operation` and check that every placeholder its templates
    /// reference has a non-empty value in `params`.
    ///
    /// `tag` is optional in the `add_subscriber` body and nowhere else.
    pub fn check_params(
        &self,
        operation: &str,
        params: &Params,
    ) -> Result<&EndpointDescriptor, ClientError> {
        let descriptor = self
            .get(operation)
            .ok_or_else(|| ClientError::UnknownOperation(operation.to_string()))?;

        for name in placeholders(&descriptor.path) {
            require(operation, params, name)?;
        }

        if let Some(body) = &descriptor.body {
            for name in placeholders(body) {
                if operation == operations::ADD_SUBSCRIBER && name == "tag" {
                    continue;
                }
                require(operation, params, name)?;
            }
        }

        Ok(descriptor)
    }

    pub fn valid_params(&self, operation: &str, params: &Params) -> bool {
        self.check_params(operation, params).is_ok()
    }
}

fn require(operation: &str, params: &Params, name: &str) -> Result<(), ClientError> {
    match params.get(name) {
        Some(value) if !value.is_empty() => Ok(()),
        _ => Err(ClientError::MissingParameter {
            operation: operation.to_string(),
            name: name.to_string(),
        }),
    }
}

impl Default for EndpointRegistry {
    fn default() -> Self {
        use operations::*;
        use HttpMethod::*;

        let entries = [
            (ACCOUNTS_LIST, EndpointDescriptor::new(Get, "/accounts", "accounts")),
            (
                WORKFLOWS_LIST,
                EndpointDescriptor::new(Get, "/<account_id>/workflows", "workflows"),
            ),
            (
                CAMPAIGNS_LIST,
                EndpointDescriptor::new(Get, "/<account_id>/campaigns", "campaigns"),
            ),
            (
                ADD_TO_WORKFLOW,
                EndpointDescriptor::new(
                    Post,
                    "/<account_id>/workflows/<workflow_id>/subscribers",
                    "subscribers",
                )
                .with_body(
                    r#"{
                      "subscribers": [{
                        "email": "<email>",
                        "custom_fields": {
                          "first_name": "<name>"
                        }
                      }]
                    }"#,
                ),
            ),
            (
                REMOVE_FROM_WORKFLOW,
                EndpointDescriptor::new(
                    Delete,
                    "/<account_id>/workflows/<workflow_id>/subscribers/<email>",
                    "",
                ),
            ),
            (
                ADD_SUBSCRIBER,
                EndpointDescriptor::new(Post, "/<account_id>/subscribers", "links").with_body(
                    r#"{"subscribers": [{"email": "<email>","custom_fields": {"first_name": "<name>"}}]}"#,
                ),
            ),
            (
                REMOVE_SUBSCRIBER,
                EndpointDescriptor::new(Delete, "/<account_id>/subscribers/<email>", "name"),
            ),
            (
                TAG_SUBSCRIBER,
                EndpointDescriptor::new(Post, "/<account_id>/tags", "name").with_body(
                    r#"{
                      "tags": [{
                        "email": "<email>",
                        "tag": "<tag>"
                      }]
                    }"#,
                ),
            ),
            (
                REMOVE_TAG,
                EndpointDescriptor::new(Delete, "/<account_id>/subscribers/<email>/tags/<tag>", ""),
            ),
            (
                ADD_TO_CAMPAIGN,
                EndpointDescriptor::new(
                    Post,
                    "/<account_id>/campaigns/<campaign_id>/subscribers",
                    "subscribers",
                )
                .with_body(
                    r#"{
                      "subscribers": [{
                        "email": "<email>",
                        "double_optin": false,
                        "reactivate_if_removed": true,
                        "custom_fields": {
                          "first_name": "<name>"
                        }
                      }]
                    }"#,
                ),
            ),
            (
                REMOVE_FROM_CAMPAIGN,
                EndpointDescriptor::new(
                    Post,
                    "/<account_id>/subscribers/<email>/unsubscribe?campaign_id=<campaign_id>",
                    "subscribers",
                ),
            ),
            (
                RECORD_EVENT,
                EndpointDescriptor::new(Post, "/<account_id>/events", "").with_body(
                    r#"{
                      "events": [{
                        "email": "<email>",
                        "action": "<event>",
                        "properties": {
                            "source": "demio",
                            "webinar_id": "<webinar_id>",
                            "webinar_name": "<webinar_name>"
                        },
                        "occurred_at": "<occurred_at>"
                      }]
                    }"#,
                ),
            ),
        ];

        Self {
            entries: entries
                .into_iter()
                .map(|(name, descriptor)| (name.to_string(), descriptor))
                .collect(),
        }
    }
}
