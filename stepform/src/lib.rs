//! # stepform
//!
//! A multi-step form engine. Forms receive their widgets from a server
//! endpoint one step at a time, validate each step server-side, and submit
//! once the last step passes.
//!
//! This is the meta-crate that re-exports all sub-crates for convenient access.
//! You can depend on `stepform` to get the whole engine, or depend on
//! individual crates for finer-grained control.

/// Core types, settings, logging, and error types.
pub use stepform_core as core;

/// Typed observer lists for lifecycle notifications.
#[cfg(feature = "signals")]
pub use stepform_signals as signals;

/// Location and query codec, and the transport seam.
#[cfg(feature = "http")]
pub use stepform_http as http;

/// Widget asset references and idempotent loading.
#[cfg(feature = "assets")]
pub use stepform_assets as assets;

/// Forms, widgets, serialization, and the step workflow.
#[cfg(feature = "forms")]
pub use stepform_forms as forms;

/// Testing utilities: scripted transport, asset loader, and fixtures.
#[cfg(feature = "testing")]
pub use stepform_test as test;

// Third-party crates the public API is built on.
pub use async_trait;
pub use serde;
pub use serde_json;
pub use tokio;
pub use tracing;
pub use tracing_subscriber;
