//! A scripted transport.
//!
//! [`MockTransport`] answers the widget-definitions endpoint from a per-step
//! table and the validation endpoint from per-step response queues, and
//! records every call for later assertions. The step of a request is read
//! from its `__form_data_step` field.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use stepform_test::{widget, MockTransport};
//!
//! let transport = Arc::new(MockTransport::new());
//! transport.set_widgets(1, vec![widget("email").text_input("email", "").build()]);
//! transport.push_validation(1, serde_json::json!({"status": false, "messages": {"email": "Required"}}));
//! assert_eq!(transport.calls().len(), 0);
//! ```

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use stepform_core::FormData;
use stepform_forms::WidgetDefinition;
use stepform_http::{Method, Transport, TransportError};

/// One request seen by the mock.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// The HTTP method.
    pub method: Method,
    /// The endpoint, including the form ID suffix.
    pub endpoint: String,
    /// The payload.
    pub payload: FormData,
    /// The `__form_data_step` of the payload.
    pub step: usize,
}

#[derive(Default)]
struct Script {
    widgets: BTreeMap<usize, Result<Value, TransportError>>,
    validation: BTreeMap<usize, VecDeque<Result<Value, TransportError>>>,
    calls: Vec<RecordedCall>,
}

/// A [`Transport`] answering from a script.
///
/// Unscripted widget requests get an empty list and unscripted validation
/// requests get `{"status": true}`. Other endpoints answer 404.
pub struct MockTransport {
    widgets_ep: String,
    validation_ep: String,
    script: Mutex<Script>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Creates a mock for the default endpoints (`form/widgets`, `form/validate`).
    pub fn new() -> Self {
        Self::with_endpoints("form/widgets", "form/validate")
    }

    /// Creates a mock for custom endpoints.
    pub fn with_endpoints(widgets_ep: &str, validation_ep: &str) -> Self {
        Self {
            widgets_ep: widgets_ep.to_string(),
            validation_ep: validation_ep.to_string(),
            script: Mutex::new(Script::default()),
        }
    }

    /// Sets the widget definitions returned for `step`.
    pub fn set_widgets(&self, step: usize, definitions: Vec<WidgetDefinition>) {
        let value = serde_json::to_value(definitions).unwrap_or_else(|_| json!([]));
        self.set_widgets_raw(step, value);
    }

    /// Sets the raw body returned for `step`'s widget request.
    pub fn set_widgets_raw(&self, step: usize, body: Value) {
        self.lock().widgets.insert(step, Ok(body));
    }

    /// Makes widget requests for `step` fail.
    pub fn fail_widgets(&self, step: usize, error: TransportError) {
        self.lock().widgets.insert(step, Err(error));
    }

    /// Queues a validation response for `step`.
    pub fn push_validation(&self, step: usize, body: Value) {
        self.lock()
            .validation
            .entry(step)
            .or_default()
            .push_back(Ok(body));
    }

    /// Queues a validation failure for `step`.
    pub fn fail_validation(&self, step: usize, error: TransportError) {
        self.lock()
            .validation
            .entry(step)
            .or_default()
            .push_back(Err(error));
    }

    /// Returns every recorded call.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    /// Returns the widget-definition requests.
    pub fn widget_calls(&self) -> Vec<RecordedCall> {
        self.calls_to(&self.widgets_ep)
    }

    /// Returns the validation requests.
    pub fn validation_calls(&self) -> Vec<RecordedCall> {
        self.calls_to(&self.validation_ep)
    }

    fn calls_to(&self, endpoint: &str) -> Vec<RecordedCall> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.endpoint.starts_with(endpoint))
            .cloned()
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().expect("mock transport lock poisoned")
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        payload: &FormData,
    ) -> Result<Value, TransportError> {
        let step = payload
            .get("__form_data_step")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);

        let mut script = self.lock();
        script.calls.push(RecordedCall {
            method,
            endpoint: endpoint.to_string(),
            payload: payload.clone(),
            step,
        });

        if endpoint.starts_with(&self.widgets_ep) {
            return script
                .widgets
                .get(&step)
                .cloned()
                .unwrap_or_else(|| Ok(json!([])));
        }
        if endpoint.starts_with(&self.validation_ep) {
            return script
                .validation
                .get_mut(&step)
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| Ok(json!({"status": true})));
        }
        Err(TransportError::http(404, "Not Found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepform_core::FieldValue;

    fn payload(step: usize) -> FormData {
        let mut data = FormData::new();
        data.insert("__form_data_step".into(), FieldValue::from(step));
        data
    }

    #[tokio::test]
    async fn test_scripted_answers() {
        let transport = MockTransport::new();
        transport.set_widgets_raw(2, json!([{"uid": "a"}]));
        transport.push_validation(1, json!({"status": false}));

        let body = transport
            .request(Method::POST, "form/widgets/f", &payload(2))
            .await
            .unwrap();
        assert_eq!(body[0]["uid"], "a");

        let first = transport
            .request(Method::POST, "form/validate/f", &payload(1))
            .await
            .unwrap();
        assert_eq!(first["status"], false);
        let second = transport
            .request(Method::POST, "form/validate/f", &payload(1))
            .await
            .unwrap();
        assert_eq!(second["status"], true);

        assert_eq!(transport.widget_calls().len(), 1);
        assert_eq!(transport.validation_calls().len(), 2);
        assert_eq!(transport.calls()[0].step, 2);
    }

    #[tokio::test]
    async fn test_failures_and_unknown_endpoint() {
        let transport = MockTransport::new();
        transport.fail_widgets(1, TransportError::http(503, "Service Unavailable"));
        let err = transport
            .request(Method::POST, "form/widgets/f", &payload(1))
            .await
            .unwrap_err();
        assert_eq!(err.status, 503);

        let err = transport
            .request(Method::GET, "other", &payload(0))
            .await
            .unwrap_err();
        assert_eq!(err.status, 404);
    }
}
