//! Fixtures for widget definitions and forms under test.
//!
//! ## Example
//!
//! ```rust,no_run
//! use stepform_test::{checkbox, widget, FormHarness};
//!
//! # async fn demo() {
//! let mut harness = FormHarness::new(2);
//! harness.transport.set_widgets(1, vec![
//!     widget("name").text_input("name", "").build(),
//!     widget("terms").markup(&checkbox("terms", "1")).weight(10).build(),
//! ]);
//! harness.form.forward().await.unwrap();
//! assert_eq!(harness.form.visible_widgets(), ["name", "terms"]);
//! # }
//! ```

use std::sync::Arc;

use stepform_assets::Asset;
use stepform_core::Settings;
use stepform_forms::{Form, FormConfig, FormServices, InitializerRegistry, WidgetDefinition};
use stepform_http::Location;

use crate::assets::MockAssetLoader;
use crate::scroll::RecordingScroller;
use crate::transport::MockTransport;

/// The page location harness forms are created at.
pub const DEFAULT_HREF: &str = "https://example.com/form";

/// Markup for a text input.
pub fn text_input(name: &str, value: &str) -> String {
    format!(r#"<input type="text" name="{name}" value="{value}">"#)
}

/// Markup for an unchecked checkbox.
pub fn checkbox(name: &str, value: &str) -> String {
    format!(r#"<input type="checkbox" name="{name}" value="{value}">"#)
}

/// Starts a [`WidgetDefinition`] for `uid`.
pub fn widget(uid: &str) -> WidgetBuilder {
    WidgetBuilder {
        definition: WidgetDefinition {
            uid: uid.to_string(),
            cid: String::new(),
            form_area: "body".to_string(),
            parent_uid: None,
            form_step: 0,
            weight: 0,
            replaces: None,
            hidden: false,
            assets: Vec::new(),
            markup: String::new(),
        },
    }
}

/// Builds a [`WidgetDefinition`].
#[derive(Debug, Clone)]
pub struct WidgetBuilder {
    definition: WidgetDefinition,
}

impl WidgetBuilder {
    /// Sets the widget class ID.
    #[must_use]
    pub fn cid(mut self, cid: &str) -> Self {
        self.definition.cid = cid.to_string();
        self
    }

    /// Sets the layout area.
    #[must_use]
    pub fn area(mut self, area: &str) -> Self {
        self.definition.form_area = area.to_string();
        self
    }

    /// Nests the widget under `parent`.
    #[must_use]
    pub fn parent(mut self, parent: &str) -> Self {
        self.definition.parent_uid = Some(parent.to_string());
        self
    }

    /// Sets the declared step.
    #[must_use]
    pub const fn step(mut self, step: usize) -> Self {
        self.definition.form_step = step;
        self
    }

    /// Sets the weight.
    #[must_use]
    pub const fn weight(mut self, weight: i64) -> Self {
        self.definition.weight = weight;
        self
    }

    /// Makes the widget supersede `uid`.
    #[must_use]
    pub fn replaces(mut self, uid: &str) -> Self {
        self.definition.replaces = Some(uid.to_string());
        self
    }

    /// Makes the widget always hidden.
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.definition.hidden = true;
        self
    }

    /// Adds an asset.
    #[must_use]
    pub fn asset(mut self, location: &str) -> Self {
        self.definition.assets.push(Asset::new(location));
        self
    }

    /// Appends raw markup.
    #[must_use]
    pub fn markup(mut self, markup: &str) -> Self {
        self.definition.markup.push_str(markup);
        self
    }

    /// Appends a text input.
    #[must_use]
    pub fn text_input(self, name: &str, value: &str) -> Self {
        self.markup(&text_input(name, value))
    }

    /// Appends an unchecked checkbox.
    #[must_use]
    pub fn checkbox(self, name: &str, value: &str) -> Self {
        self.markup(&checkbox(name, value))
    }

    /// Returns the definition.
    pub fn build(self) -> WidgetDefinition {
        self.definition
    }
}

/// A form wired to mock collaborators.
pub struct FormHarness {
    /// The form under test.
    pub form: Form,
    /// The scripted transport.
    pub transport: Arc<MockTransport>,
    /// The scripted asset loader.
    pub assets: Arc<MockAssetLoader>,
    /// The recording scroller.
    pub scroller: Arc<RecordingScroller>,
}

impl FormHarness {
    /// Creates a harness for a form `test-form` with `steps` steps.
    pub fn new(steps: usize) -> Self {
        let mut config = FormConfig::new("test-form");
        config.steps = steps;
        Self::with_config(config, DEFAULT_HREF)
    }

    /// Creates a harness for `config` at page location `href`.
    ///
    /// # Panics
    ///
    /// Panics if `href` does not parse or the configuration is invalid.
    pub fn with_config(config: FormConfig, href: &str) -> Self {
        Self::with_initializers(config, href, InitializerRegistry::new())
    }

    /// Creates a harness that runs `initializers`.
    ///
    /// # Panics
    ///
    /// Panics if `href` does not parse or the configuration is invalid.
    pub fn with_initializers(
        config: FormConfig,
        href: &str,
        initializers: InitializerRegistry,
    ) -> Self {
        let transport = Arc::new(MockTransport::with_endpoints(
            &config.get_widgets_ep,
            &config.validation_ep,
        ));
        let assets = Arc::new(MockAssetLoader::new());
        let scroller = Arc::new(RecordingScroller::new());

        let services = FormServices::new(transport.clone(), assets.clone())
            .with_initializers(initializers)
            .with_scroller(scroller.clone());
        let location = Location::parse(href).expect("harness location must parse");
        let form = Form::new(config, Settings::default(), services, location)
            .expect("harness configuration must be valid");

        Self {
            form,
            transport,
            assets,
            scroller,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widget_builder() {
        let def = widget("w")
            .cid("app.Text")
            .area("header")
            .parent("p")
            .weight(5)
            .replaces("old")
            .hidden()
            .asset("app@js/w.js")
            .text_input("title", "x")
            .build();
        assert_eq!(def.uid, "w");
        assert_eq!(def.form_area, "header");
        assert_eq!(def.parent_uid.as_deref(), Some("p"));
        assert_eq!(def.weight, 5);
        assert!(def.hidden);
        assert_eq!(def.assets.len(), 1);
        assert!(def.markup.contains(r#"name="title""#));
    }

    #[test]
    fn test_harness_starts_on_step_zero() {
        let harness = FormHarness::new(3);
        assert_eq!(harness.form.current_step(), 0);
        assert_eq!(harness.form.total_steps(), 3);
        assert!(harness.transport.calls().is_empty());
    }
}
