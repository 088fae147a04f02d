//! Response envelopes and the normalized error shape.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Message used when a failure carries no usable text.
pub const FALLBACK_ERROR_MESSAGE: &str = "An unexpected error occurred";

const fn default_success() -> bool {
    true
}

/// `{ success, data, message }` wrapper around every successful response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    /// `false` signals an application-level failure despite a 2xx status.
    #[serde(default = "default_success")]
    pub success: bool,
    /// Payload, absent for bodiless responses such as deletes.
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Optional human-readable message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiEnvelope<T> {
    /// A successful envelope carrying `data`.
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    /// A successful envelope with a message and no data.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
        }
    }

    /// An application-level failure.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }
}

/// Body a server sends alongside a non-2xx status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Top-level message.
    #[serde(default)]
    pub message: Option<String>,
    /// Per-field messages; a list of messages keeps only the first.
    #[serde(default, deserialize_with = "first_message_per_field")]
    pub errors: BTreeMap<String, String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn first_message_per_field<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<String, String>, D::Error> {
    let raw = Option::<BTreeMap<String, OneOrMany>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(field, value)| {
            let message = match value {
                OneOrMany::One(message) => Some(message),
                OneOrMany::Many(messages) => messages.into_iter().next(),
            };
            message.map(|m| (field, m))
        })
        .collect())
}

/// Normalized failure shape handed to the rest of the client.
///
/// `status` is the HTTP status, or 0 when no response was received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// HTTP status, or 0 for transport failures.
    pub status: u16,
    /// Human-readable message, never empty.
    pub message: String,
    /// Per-field validation messages.
    #[serde(default)]
    pub errors: BTreeMap<String, String>,
}

impl ErrorEnvelope {
    /// Builds an envelope, substituting the fallback for a blank message.
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            status,
            message: if message.trim().is_empty() {
                FALLBACK_ERROR_MESSAGE.to_string()
            } else {
                message
            },
            errors: BTreeMap::new(),
        }
    }

    /// Attaches field errors.
    #[must_use]
    pub fn with_errors(mut self, errors: BTreeMap<String, String>) -> Self {
        self.errors = errors;
        self
    }
}
