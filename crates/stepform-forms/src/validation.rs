//! Validation endpoint responses.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use stepform_core::{StepformError, StepformResult};

/// One or several messages for the same key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    /// A single message.
    One(String),
    /// A list of messages.
    Many(Vec<String>),
}

impl OneOrMany {
    /// Returns the messages as a list.
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(msg) => vec![msg],
            Self::Many(msgs) => msgs,
        }
    }
}

/// The decoded answer of the validation endpoint.
///
/// # Examples
///
/// ```
/// use stepform_forms::validation::ValidationResponse;
///
/// let resp = ValidationResponse::from_value(serde_json::json!({
///     "status": false,
///     "messages": {"email": "Invalid address", "name": ["Too short", "No digits"]}
/// })).unwrap();
/// assert!(!resp.status);
/// let fields = resp.into_fields();
/// assert_eq!(fields["email"], vec!["Invalid address"]);
/// assert_eq!(fields["name"].len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResponse {
    /// `true` if the step is valid.
    pub status: bool,
    /// Messages keyed by widget UID or an unrecognized key.
    #[serde(default)]
    pub messages: BTreeMap<String, OneOrMany>,
}

impl ValidationResponse {
    /// Decodes a response body.
    ///
    /// # Errors
    ///
    /// Returns [`StepformError::MalformedResponse`] if the body does not
    /// have the expected shape.
    pub fn from_value(value: Value) -> StepformResult<Self> {
        serde_json::from_value(value).map_err(|e| {
            StepformError::MalformedResponse(format!("Invalid validation response: {e}"))
        })
    }

    /// Flattens the messages into lists, keeping key order.
    pub fn into_fields(self) -> BTreeMap<String, Vec<String>> {
        self.messages
            .into_iter()
            .map(|(k, v)| (k, v.into_vec()))
            .collect()
    }
}
