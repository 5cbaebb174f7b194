//! Logging integration for stepform.
//!
//! Hosts call [`setup_logging`] once at startup. Form operations run inside a
//! [`form_span`], so every event they log carries the form ID and the step
//! the operation started on.

use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

use crate::settings::Settings;

/// Installs the global tracing subscriber described by `settings`.
///
/// `log_level` is an `EnvFilter` directive (`"info"`,
/// `"stepform_forms=debug,info"`); an invalid directive falls back to
/// `info`. Debug mode logs pretty, human-readable lines with source
/// locations, otherwise one JSON object per event.
///
/// Returns `false` if a global subscriber was already installed.
pub fn setup_logging(settings: &Settings) -> bool {
    let filter = EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_target(true);

    let installed = if settings.debug {
        builder
            .with_file(true)
            .with_line_number(true)
            .pretty()
            .try_init()
    } else {
        builder.json().try_init()
    };
    installed.is_ok()
}

/// Creates the span form operations run in.
///
/// # Examples
///
/// ```
/// use stepform_core::logging::form_span;
///
/// let span = form_span("signup", 1);
/// let _guard = span.enter();
/// tracing::info!("moving forward");
/// ```
pub fn form_span(form_id: &str, step: usize) -> tracing::Span {
    tracing::info_span!("form", id = form_id, step)
}
