//! # stepform-core
//!
//! Core types, settings, and error types for stepform. This crate has no
//! stepform dependencies and provides the foundation for all other crates.
//!
//! ## Modules
//!
//! - [`error`] - Error types and result aliases
//! - [`utils`] - Utility types (`MultiValueDict`)
//! - [`settings`] - Ambient configuration
//! - [`settings_loader`] - TOML/JSON/env loading
//! - [`i18n`] - Translator seam
//! - [`value`] - Serialized field values
//! - [`logging`] - Tracing-based logging integration

pub mod error;
pub mod i18n;
pub mod logging;
pub mod settings;
pub mod settings_loader;
pub mod utils;
pub mod value;

// Re-export the most commonly used types at the crate root.
pub use error::{StepformError, StepformResult};
pub use i18n::{IdentityTranslator, Translator};
pub use settings::Settings;
pub use value::{FieldValue, FormData};
