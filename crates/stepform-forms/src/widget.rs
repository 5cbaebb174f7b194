//! Widgets: client-side wrappers around server-rendered form fields.
//!
//! A [`Widget`] is built from a [`WidgetDefinition`] returned by the
//! widget-definitions endpoint. It starts hidden and in the
//! [`Lifecycle::Constructing`] state, loads its assets, runs the initializer
//! registered for its kind, and ends in [`Lifecycle::Ready`] or
//! [`Lifecycle::InitError`].

use std::fmt;

use serde::{Deserialize, Serialize};

use stepform_assets::{Asset, AssetError, AssetLoader};
use stepform_signals::Signal;

use crate::initializers::InitializerRegistry;
use crate::markup::{parse_controls, Control};

/// A widget as described by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetDefinition {
    /// Unique key within the owning form.
    pub uid: String,
    /// The widget class ID, used to look up its initializer.
    #[serde(default)]
    pub cid: String,
    /// The layout area to place the widget in when it has no parent.
    #[serde(default = "default_area")]
    pub form_area: String,
    /// The UID of the widget to nest this one under.
    #[serde(default)]
    pub parent_uid: Option<String>,
    /// The step the widget belongs to.
    #[serde(default)]
    pub form_step: usize,
    /// Sort key among widgets placed together.
    #[serde(default)]
    pub weight: i64,
    /// The UID of a widget this one supersedes.
    #[serde(default)]
    pub replaces: Option<String>,
    /// `show()` is a no-op for always-hidden widgets.
    #[serde(default)]
    pub hidden: bool,
    /// Scripts and stylesheets required before the widget is usable.
    #[serde(default)]
    pub assets: Vec<Asset>,
    /// Pre-rendered HTML.
    #[serde(default)]
    pub markup: String,
}

fn default_area() -> String {
    "body".to_string()
}

/// The presentation state set by validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetState {
    /// `has-success`.
    Success,
    /// `has-warning`.
    Warning,
    /// `has-error`.
    Error,
}

impl fmt::Display for WidgetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

/// Where a widget is in its initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lifecycle {
    /// Assets are loading.
    Constructing,
    /// Assets are present and the initializer succeeded.
    Ready,
    /// Asset loading or the initializer failed.
    InitError(String),
}

impl Lifecycle {
    /// Returns `true` for [`Lifecycle::Ready`] and [`Lifecycle::InitError`].
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Constructing)
    }
}

/// Sent by a widget when it becomes ready.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetReady {
    /// The widget UID.
    pub uid: String,
    /// The widget class ID.
    pub cid: String,
}

/// Sent by a widget when its initialization fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetInitError {
    /// The widget UID.
    pub uid: String,
    /// The widget class ID.
    pub cid: String,
    /// What went wrong.
    pub message: String,
}

/// The outcome of [`Widget::initialize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetSignal {
    /// The widget is ready.
    Ready(WidgetReady),
    /// The widget failed to initialize.
    InitError(WidgetInitError),
}

/// Lifecycle notifications of one widget instance.
#[derive(Debug)]
pub struct WidgetEvents {
    /// The widget became ready.
    pub ready: Signal<WidgetReady>,
    /// The widget failed to initialize.
    pub init_error: Signal<WidgetInitError>,
}

impl Default for WidgetEvents {
    fn default() -> Self {
        Self {
            ready: Signal::named("widget.ready"),
            init_error: Signal::named("widget.init_error"),
        }
    }
}

/// One server-defined form field owned by a form.
#[derive(Debug)]
pub struct Widget {
    uid: String,
    cid: String,
    form_area: String,
    parent_uid: Option<String>,
    form_step: usize,
    weight: i64,
    replaces: Option<String>,
    always_hidden: bool,
    assets: Vec<Asset>,
    markup: String,
    seq: u64,
    pub(crate) controls: Vec<Control>,
    pub(crate) children: Vec<String>,
    visible: bool,
    state: Option<WidgetState>,
    messages: Vec<String>,
    lifecycle: Lifecycle,
    /// Lifecycle notifications.
    pub events: WidgetEvents,
}

impl Widget {
    /// Builds a hidden, constructing widget from its definition.
    pub fn new(definition: WidgetDefinition) -> Self {
        Self::with_seq(definition, 0)
    }

    /// Builds a widget carrying an instance number, so that two instances
    /// with the same UID can be told apart.
    pub(crate) fn with_seq(definition: WidgetDefinition, seq: u64) -> Self {
        let controls = parse_controls(&definition.markup);
        Self {
            uid: definition.uid,
            cid: definition.cid,
            form_area: definition.form_area,
            parent_uid: definition.parent_uid.filter(|p| !p.is_empty()),
            form_step: definition.form_step,
            weight: definition.weight,
            replaces: definition.replaces.filter(|r| !r.is_empty()),
            always_hidden: definition.hidden,
            assets: definition.assets,
            markup: definition.markup,
            seq,
            controls,
            children: Vec::new(),
            visible: false,
            state: None,
            messages: Vec::new(),
            lifecycle: Lifecycle::Constructing,
            events: WidgetEvents::default(),
        }
    }

    /// Returns the UID.
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Returns the class ID.
    pub fn cid(&self) -> &str {
        &self.cid
    }

    /// Returns the layout area name.
    pub fn form_area(&self) -> &str {
        &self.form_area
    }

    /// Returns the parent widget UID, if nested.
    pub fn parent_uid(&self) -> Option<&str> {
        self.parent_uid.as_deref()
    }

    /// Returns the step the widget belongs to.
    pub const fn form_step(&self) -> usize {
        self.form_step
    }

    /// Returns the sort weight.
    pub const fn weight(&self) -> i64 {
        self.weight
    }

    /// Returns the UID this widget supersedes.
    pub fn replaces(&self) -> Option<&str> {
        self.replaces.as_deref()
    }

    /// Returns `true` if `show()` is a no-op.
    pub const fn always_hidden(&self) -> bool {
        self.always_hidden
    }

    /// Returns the declared assets.
    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    /// Returns the server-rendered markup.
    pub fn markup(&self) -> &str {
        &self.markup
    }

    pub(crate) const fn seq(&self) -> u64 {
        self.seq
    }

    /// Returns the named controls found in the markup.
    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    /// Returns the controls for mutation (host-side input binding).
    pub fn controls_mut(&mut self) -> &mut [Control] {
        &mut self.controls
    }

    /// Returns the first control named `name`.
    pub fn control_mut(&mut self, name: &str) -> Option<&mut Control> {
        self.controls.iter_mut().find(|c| c.name == name)
    }

    /// Returns the UIDs of the widgets placed inside this one.
    pub fn children(&self) -> &[String] {
        &self.children
    }

    /// Returns `true` if the widget is shown.
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    /// Returns the presentation state.
    pub const fn state(&self) -> Option<WidgetState> {
        self.state
    }

    /// Returns the messages attached to the widget.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Returns the initialization state.
    pub const fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Returns `true` once initialization succeeded.
    pub fn is_initialized(&self) -> bool {
        self.lifecycle == Lifecycle::Ready
    }

    /// Clears the presentation state.
    pub fn clear_state(&mut self) -> &mut Self {
        self.state = None;
        self
    }

    /// Replaces the presentation state.
    pub fn set_state(&mut self, state: WidgetState) -> &mut Self {
        self.clear_state();
        self.state = Some(state);
        self
    }

    /// Removes every message.
    pub fn clear_messages(&mut self) -> &mut Self {
        self.messages.clear();
        self
    }

    /// Appends a message. The text is stored as given.
    pub fn add_message(&mut self, text: impl Into<String>) -> &mut Self {
        self.messages.push(text.into());
        self
    }

    /// Shows the widget unless it is always hidden.
    pub fn show(&mut self) -> &mut Self {
        if !self.always_hidden {
            self.visible = true;
        }
        self
    }

    /// Hides the widget.
    pub fn hide(&mut self) -> &mut Self {
        self.visible = false;
        self
    }

    /// Restores every control to its markup default.
    pub fn reset(&mut self) {
        for control in &mut self.controls {
            control.reset();
        }
    }

    /// Loads the widget's assets, runs its initializer and reports the
    /// outcome. Calling it again on a settled widget returns the same outcome
    /// without loading anything.
    pub async fn initialize(
        &mut self,
        loader: &dyn AssetLoader,
        initializers: &InitializerRegistry,
    ) -> WidgetSignal {
        if !self.lifecycle.is_terminal() {
            let loaded = loader.load_assets(&self.assets).await;
            return self.complete_init(loaded, initializers);
        }
        self.outcome()
    }

    /// Finishes initialization once the asset load has settled.
    pub(crate) fn complete_init(
        &mut self,
        loaded: Result<(), AssetError>,
        initializers: &InitializerRegistry,
    ) -> WidgetSignal {
        let result = loaded
            .map_err(|e| e.to_string())
            .and_then(|()| initializers.run(self));

        self.lifecycle = match result {
            Ok(()) => Lifecycle::Ready,
            Err(message) => {
                tracing::warn!(uid = %self.uid, cid = %self.cid, %message, "widget init error");
                Lifecycle::InitError(message)
            }
        };

        let outcome = self.outcome();
        match &outcome {
            WidgetSignal::Ready(ev) => {
                tracing::debug!(uid = %self.uid, "widget ready");
                self.events.ready.send(ev);
            }
            WidgetSignal::InitError(ev) => {
                self.events.init_error.send(ev);
            }
        }
        outcome
    }

    fn outcome(&self) -> WidgetSignal {
        match &self.lifecycle {
            Lifecycle::InitError(message) => WidgetSignal::InitError(WidgetInitError {
                uid: self.uid.clone(),
                cid: self.cid.clone(),
                message: message.clone(),
            }),
            _ => WidgetSignal::Ready(WidgetReady {
                uid: self.uid.clone(),
                cid: self.cid.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use stepform_assets::AssetKind;

    struct Loader {
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AssetLoader for Loader {
        async fn load_assets(&self, assets: &[Asset]) -> Result<(), AssetError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AssetError {
                    kind: AssetKind::Js,
                    url: assets[0].location().to_string(),
                    reason: "404".into(),
                });
            }
            Ok(())
        }
    }

    fn definition(json: serde_json::Value) -> WidgetDefinition {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_definition_defaults() {
        let def = definition(serde_json::json!({"uid": "name"}));
        assert_eq!(def.form_area, "body");
        assert_eq!(def.form_step, 0);
        assert!(def.parent_uid.is_none());
        assert!(def.assets.is_empty());
    }

    #[test]
    fn test_definition_camel_case() {
        let def = definition(serde_json::json!({
            "uid": "city", "cid": "app.Select", "formArea": "footer", "parentUid": "address",
            "formStep": 2, "weight": -5, "replaces": "city", "hidden": true,
            "assets": ["geo@js/city.js"], "markup": "<select name=\"city\"></select>"
        }));
        let w = Widget::new(def);
        assert_eq!(w.parent_uid(), Some("address"));
        assert_eq!(w.form_step(), 2);
        assert_eq!(w.weight(), -5);
        assert_eq!(w.replaces(), Some("city"));
        assert!(w.always_hidden());
        assert_eq!(w.controls().len(), 1);
    }

    #[test]
    fn test_new_widget_is_hidden_and_constructing() {
        let w = Widget::new(definition(serde_json::json!({"uid": "a"})));
        assert!(!w.is_visible());
        assert_eq!(w.lifecycle(), &Lifecycle::Constructing);
        assert!(!w.is_initialized());
    }

    #[test]
    fn test_state_is_exclusive() {
        let mut w = Widget::new(definition(serde_json::json!({"uid": "a"})));
        w.set_state(WidgetState::Warning).set_state(WidgetState::Error);
        assert_eq!(w.state(), Some(WidgetState::Error));
        w.clear_state();
        assert_eq!(w.state(), None);
    }

    #[test]
    fn test_messages_are_ordered_and_unsanitized() {
        let mut w = Widget::new(definition(serde_json::json!({"uid": "a"})));
        w.add_message("<b>first</b>").add_message("second");
        assert_eq!(w.messages(), ["<b>first</b>", "second"]);
        w.clear_messages();
        assert!(w.messages().is_empty());
    }

    #[test]
    fn test_always_hidden_ignores_show() {
        let mut w = Widget::new(definition(serde_json::json!({"uid": "a", "hidden": true})));
        w.show();
        assert!(!w.is_visible());

        let mut w = Widget::new(definition(serde_json::json!({"uid": "b"})));
        w.show();
        assert!(w.is_visible());
        w.hide();
        assert!(!w.is_visible());
    }

    #[tokio::test]
    async fn test_initialize_ready_fires_signal() {
        let mut w = Widget::new(definition(
            serde_json::json!({"uid": "a", "cid": "k", "assets": ["x.js"]}),
        ));
        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();
        w.events.ready.connect_fn("t", move |ev: &WidgetReady| {
            assert_eq!(ev.uid, "a");
            f.fetch_add(1, Ordering::SeqCst);
        });

        let loader = Loader {
            fail: false,
            calls: AtomicUsize::new(0),
        };
        let mut registry = InitializerRegistry::new();
        registry.register("k", |w| {
            w.add_message("initialized");
            Ok(())
        });

        let signal = w.initialize(&loader, &registry).await;
        assert!(matches!(signal, WidgetSignal::Ready(_)));
        assert!(w.is_initialized());
        assert_eq!(w.messages(), ["initialized"]);
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        // A settled widget does not load again.
        w.initialize(&loader, &registry).await;
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_initialize_asset_failure() {
        let mut w = Widget::new(definition(
            serde_json::json!({"uid": "map", "assets": ["geo@maps.js"]}),
        ));
        let loader = Loader {
            fail: true,
            calls: AtomicUsize::new(0),
        };
        let signal = w.initialize(&loader, &InitializerRegistry::new()).await;
        let WidgetSignal::InitError(err) = signal else {
            panic!("expected init error");
        };
        assert_eq!(err.uid, "map");
        assert!(err.message.contains("404"));
        assert!(!w.is_initialized());
        assert!(w.lifecycle().is_terminal());
    }

    #[tokio::test]
    async fn test_initializer_failure() {
        let mut w = Widget::new(definition(serde_json::json!({"uid": "a", "cid": "bad"})));
        let loader = Loader {
            fail: false,
            calls: AtomicUsize::new(0),
        };
        let mut registry = InitializerRegistry::new();
        registry.register("bad", |_| Err("editor missing".to_string()));
        let signal = w.initialize(&loader, &registry).await;
        assert!(matches!(signal, WidgetSignal::InitError(ref e) if e.message == "editor missing"));
    }
}
