//! A caller-owned collection of the forms on a page.

use std::collections::BTreeMap;

use stepform_core::{Settings, StepformError, StepformResult};
use stepform_http::Location;
use stepform_signals::Signal;

use crate::config::FormConfig;
use crate::events::FormReady;
use crate::form::{Form, FormServices};

/// The forms of one page, keyed by ID.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use stepform_core::Settings;
/// use stepform_forms::config::FormConfig;
/// use stepform_forms::form::FormServices;
/// use stepform_forms::registry::FormRegistry;
/// use stepform_http::Location;
/// # use async_trait::async_trait;
/// # use stepform_assets::{Asset, AssetError, AssetLoader};
/// # use stepform_core::FormData;
/// # use stepform_http::{Method, Transport, TransportError};
/// # struct NullTransport;
/// # #[async_trait]
/// # impl Transport for NullTransport {
/// #     async fn request(&self, _: Method, _: &str, _: &FormData) -> Result<serde_json::Value, TransportError> {
/// #         Ok(serde_json::Value::Null)
/// #     }
/// # }
/// # struct NullAssets;
/// # #[async_trait]
/// # impl AssetLoader for NullAssets {
/// #     async fn load_assets(&self, _: &[Asset]) -> Result<(), AssetError> { Ok(()) }
/// # }
///
/// let mut registry = FormRegistry::new();
/// registry.ready.connect_fn("log", |ev| println!("form {} ready", ev.form_id));
///
/// let services = FormServices::new(Arc::new(NullTransport), Arc::new(NullAssets));
/// let location = Location::parse("https://example.com/signup").unwrap();
/// registry
///     .create(FormConfig::new("signup"), Settings::default(), services, location)
///     .unwrap();
///
/// assert_eq!(registry.get("signup").unwrap().current_step(), 0);
/// assert!(registry.get("missing").is_err());
/// ```
#[derive(Debug)]
pub struct FormRegistry {
    forms: BTreeMap<String, Form>,
    /// Sent after a form is created and registered.
    pub ready: Signal<FormReady>,
}

impl Default for FormRegistry {
    fn default() -> Self {
        Self {
            forms: BTreeMap::new(),
            ready: Signal::named("form.ready"),
        }
    }
}

impl FormRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a form, registers it under its ID and sends `ready`.
    ///
    /// A form registered under the same ID is replaced.
    ///
    /// # Errors
    ///
    /// Returns the configuration errors of [`Form::new`].
    pub fn create(
        &mut self,
        config: FormConfig,
        settings: Settings,
        services: FormServices,
        location: Location,
    ) -> StepformResult<&mut Form> {
        let form = Form::new(config, settings, services, location)?;
        let id = form.id().to_string();
        if self.forms.insert(id.clone(), form).is_some() {
            tracing::warn!(form = %id, "replacing registered form");
        }

        self.ready.send(&FormReady {
            form_id: id.clone(),
        });
        self.get_mut(&id)
    }

    /// Returns the form with `id`.
    ///
    /// # Errors
    ///
    /// Returns [`StepformError::FormNotFound`] if it is not registered.
    pub fn get(&self, id: &str) -> StepformResult<&Form> {
        self.forms.get(id).ok_or_else(|| not_found(id))
    }

    /// Returns the form with `id` for mutation.
    ///
    /// # Errors
    ///
    /// Returns [`StepformError::FormNotFound`] if it is not registered.
    pub fn get_mut(&mut self, id: &str) -> StepformResult<&mut Form> {
        self.forms.get_mut(id).ok_or_else(|| not_found(id))
    }

    /// Unregisters the form with `id` and returns it.
    pub fn remove(&mut self, id: &str) -> Option<Form> {
        self.forms.remove(id)
    }

    /// Returns the registered IDs, ordered by form weight and then ID.
    pub fn ids(&self) -> Vec<&str> {
        let mut forms: Vec<&Form> = self.forms.values().collect();
        forms.sort_by_key(|f| f.config().weight);
        forms.into_iter().map(Form::id).collect()
    }

    /// Returns the number of registered forms.
    pub fn len(&self) -> usize {
        self.forms.len()
    }

    /// Returns `true` if no form is registered.
    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }
}

fn not_found(id: &str) -> StepformError {
    let err = StepformError::FormNotFound(id.to_string());
    tracing::error!(error = %err, "form lookup failed");
    err
}
