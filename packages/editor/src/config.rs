//! Session configuration

use crate::errors::EditorResult;
use serde::{Deserialize, Serialize};

/// Protocol version announced in the leading notify operation
pub const PROTOCOL_VERSION: &str = "0.22";

/// Options for one editing session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionOptions {
    /// Version string sent with every serialized batch
    pub protocol_version: String,

    /// Namespace prepended to every method name on serialization.
    /// A trailing `.` is added when missing.
    pub method_prefix: String,

    /// Hash of the capabilities the client was registered with
    pub capabilities_hash: Option<String>,

    /// When set, every queued operation is sent on behalf of this id
    pub proxy_for_id: Option<String>,

    /// Prefix of temporary blip ids minted before the server assigns real ones
    pub temp_id_prefix: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            method_prefix: String::new(),
            capabilities_hash: None,
            proxy_for_id: None,
            temp_id_prefix: "TBD".to_string(),
        }
    }
}

impl SessionOptions {
    /// Options for a session that acts on behalf of `proxy_for_id`
    pub fn proxying(proxy_for_id: &str) -> Self {
        Self {
            proxy_for_id: Some(proxy_for_id.to_string()),
            ..Default::default()
        }
    }

    /// Options whose methods are serialized under `prefix`
    pub fn namespaced(prefix: &str) -> Self {
        Self {
            method_prefix: prefix.to_string(),
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> EditorResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_capabilities_hash(mut self, hash: &str) -> Self {
        self.capabilities_hash = Some(hash.to_string());
        self
    }

    pub fn with_method_prefix(mut self, prefix: &str) -> Self {
        self.method_prefix = prefix.to_string();
        self
    }

    pub fn with_protocol_version(mut self, version: &str) -> Self {
        self.protocol_version = version.to_string();
        self
    }

    pub fn with_temp_id_prefix(mut self, prefix: &str) -> Self {
        self.temp_id_prefix = prefix.to_string();
        self
    }

    /// Method prefix normalized to end with `.`, or empty
    pub(crate) fn normalized_prefix(&self) -> String {
        if self.method_prefix.is_empty() || self.method_prefix.ends_with('.') {
            self.method_prefix.clone()
        } else {
            format!("{}.", self.method_prefix)
        }
    }
}
