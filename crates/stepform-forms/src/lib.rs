//! # stepform-forms
//!
//! The multi-step form engine. A [`Form`] owns [`Widget`]s received from a
//! widget-definitions endpoint, validates each step against the server, and
//! walks the user step by step to submission.
//!
//! ## Modules
//!
//! - [`config`] - Per-form configuration from data attributes
//! - [`markup`] - Control extraction from widget markup
//! - [`widget`] - Widget definitions and lifecycle
//! - [`initializers`] - Per-kind widget initializers
//! - [`serialize`] - Control serialization
//! - [`layout`] - Layout areas
//! - [`validation`] - Validation responses
//! - [`messages`] - Form-level messages
//! - [`scroll`] - Scrolling seam
//! - [`events`] - Lifecycle notifications
//! - [`form`] - The step state machine
//! - [`registry`] - The forms of a page

pub mod config;
pub mod events;
pub mod form;
pub mod initializers;
pub mod layout;
pub mod markup;
pub mod messages;
pub mod registry;
pub mod scroll;
pub mod serialize;
pub mod validation;
pub mod widget;

pub use config::{BackwardPolicy, FormConfig};
pub use form::{Form, FormServices, Progress, StepOutcome, SubmitOutcome, Submission};
pub use initializers::InitializerRegistry;
pub use messages::{FormMessage, MessageLevel};
pub use registry::FormRegistry;
pub use scroll::{NoopScroller, ScrollContainer, ScrollTarget, Scroller};
pub use widget::{Lifecycle, Widget, WidgetDefinition, WidgetState};
