//! Per-kind widget initializers.
//!
//! Some widget kinds need client-side setup once their assets are present (a
//! date picker binding, an editor instance). An [`InitializerRegistry`] maps a
//! widget's `cid` to the function that performs it.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::widget::Widget;

/// A widget initializer. Returning `Err` puts the widget in the init-error state.
pub type Initializer = Arc<dyn Fn(&mut Widget) -> Result<(), String> + Send + Sync>;

/// A lookup table from widget class ID to initializer.
///
/// # Examples
///
/// ```
/// use stepform_forms::initializers::InitializerRegistry;
///
/// let mut registry = InitializerRegistry::new();
/// registry.register("app.widget.DatePicker", |widget| {
///     widget.add_message("Use YYYY-MM-DD");
///     Ok(())
/// });
/// assert!(registry.contains("app.widget.DatePicker"));
/// ```
#[derive(Default, Clone)]
pub struct InitializerRegistry {
    initializers: HashMap<String, Initializer>,
}

impl InitializerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the initializer for `cid`, replacing any previous one.
    pub fn register<F>(&mut self, cid: impl Into<String>, initializer: F)
    where
        F: Fn(&mut Widget) -> Result<(), String> + Send + Sync + 'static,
    {
        self.initializers.insert(cid.into(), Arc::new(initializer));
    }

    /// Returns `true` if an initializer is registered for `cid`.
    pub fn contains(&self, cid: &str) -> bool {
        self.initializers.contains_key(cid)
    }

    /// Runs the initializer registered for the widget's `cid`, if any.
    ///
    /// # Errors
    ///
    /// Returns the initializer's error message.
    pub fn run(&self, widget: &mut Widget) -> Result<(), String> {
        match self.initializers.get(widget.cid()) {
            Some(init) => {
                tracing::debug!(uid = widget.uid(), cid = widget.cid(), "running widget initializer");
                init(widget)
            }
            None => Ok(()),
        }
    }
}

impl fmt::Debug for InitializerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.initializers.keys().collect();
        kinds.sort();
        f.debug_struct("InitializerRegistry")
            .field("kinds", &kinds)
            .finish()
    }
}
