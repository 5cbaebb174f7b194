//! # stepform-test
//!
//! Testing utilities for stepform. Provides a scripted [`MockTransport`]
//! standing in for the widget-definitions and validation endpoints, a
//! [`MockAssetLoader`] with controllable failures and completion order, a
//! [`RecordingScroller`], and fixtures for building widget definitions and
//! ready-to-drive forms.

pub mod assets;
pub mod fixtures;
pub mod scroll;
pub mod transport;

pub use assets::MockAssetLoader;
pub use fixtures::{checkbox, text_input, widget, FormHarness, WidgetBuilder};
pub use scroll::RecordingScroller;
pub use transport::{MockTransport, RecordedCall};
