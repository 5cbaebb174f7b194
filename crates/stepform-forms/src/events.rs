//! Lifecycle notifications emitted by forms.

use stepform_core::FormData;
use stepform_signals::Signal;

use crate::widget::{WidgetInitError, WidgetReady};

/// A form was constructed and registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormReady {
    /// The form ID.
    pub form_id: String,
}

/// A form advanced to a new step and revealed its widgets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormForward {
    /// The form ID.
    pub form_id: String,
    /// The step the form is now on.
    pub step: usize,
}

/// A form is about to be submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSubmit {
    /// The form ID.
    pub form_id: String,
    /// The serialized form at the time of submission.
    pub payload: FormData,
}

/// The observer lists of one form instance.
#[derive(Debug)]
pub struct FormEvents {
    /// Sent after `forward()` shows the new step.
    pub forward: Signal<FormForward>,
    /// Sent when native submission is imminent (or would be, with
    /// `prevent_submit`).
    pub submit: Signal<FormSubmit>,
    /// Relayed from every owned widget that becomes ready.
    pub widget_ready: Signal<WidgetReady>,
    /// Relayed from every owned widget that fails to initialize.
    pub widget_init_error: Signal<WidgetInitError>,
}

impl Default for FormEvents {
    fn default() -> Self {
        Self {
            forward: Signal::named("form.forward"),
            submit: Signal::named("form.submit"),
            widget_ready: Signal::named("form.widget_ready"),
            widget_init_error: Signal::named("form.widget_init_error"),
        }
    }
}
