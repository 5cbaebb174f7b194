//! The multi-step form engine.
//!
//! A [`Form`] owns a set of [`Widget`]s placed into named layout areas and
//! numbered steps. It drives the step workflow: validate the current step
//! against the server, fetch and initialize the widgets of the next step,
//! reveal them, and finally let the host submit the form.
//!
//! All operations take `&mut self`, so a form never runs two transitions at
//! once. Responses are still checked against the step they were requested
//! for, which matters to hosts that drive the transport themselves through
//! [`Form::apply_widget_definitions`] and [`Form::apply_validation`].
//!
//! ## Step states
//!
//! ```text
//! 0 --forward--> 1 --forward--> ... --forward--> steps --forward--> submitted
//!   <-backward--   <-backward--     <-backward--
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::Value;
use tracing::Instrument;

use stepform_assets::AssetLoader;
use stepform_core::logging::form_span;
use stepform_core::{
    FieldValue, FormData, IdentityTranslator, Settings, StepformError, StepformResult, Translator,
};
use stepform_http::{Location, Method, QueryMap, Transport};

use crate::config::{BackwardPolicy, FormConfig};
use crate::events::{FormEvents, FormForward, FormSubmit};
use crate::initializers::InitializerRegistry;
use crate::layout::{Area, Node};
use crate::markup::{Control, ControlTag};
use crate::messages::{FormMessage, MessageLevel};
use crate::scroll::{NoopScroller, ScrollContainer, ScrollTarget, Scroller};
use crate::serialize::serialize;
use crate::validation::ValidationResponse;
use crate::widget::{Widget, WidgetDefinition, WidgetSignal, WidgetState};

/// The collaborators a form talks to.
#[derive(Clone)]
pub struct FormServices {
    /// Performs endpoint requests.
    pub transport: Arc<dyn Transport>,
    /// Loads widget assets.
    pub assets: Arc<dyn AssetLoader>,
    /// Per-kind widget initializers.
    pub initializers: Arc<InitializerRegistry>,
    /// Moves the viewport.
    pub scroller: Arc<dyn Scroller>,
    /// Translates built-in messages.
    pub translator: Arc<dyn Translator>,
}

impl FormServices {
    /// Creates services with no initializers, no scrolling and identity
    /// translation.
    pub fn new(transport: Arc<dyn Transport>, assets: Arc<dyn AssetLoader>) -> Self {
        Self {
            transport,
            assets,
            initializers: Arc::new(InitializerRegistry::new()),
            scroller: Arc::new(NoopScroller),
            translator: Arc::new(IdentityTranslator),
        }
    }

    /// Sets the initializer registry.
    #[must_use]
    pub fn with_initializers(mut self, initializers: InitializerRegistry) -> Self {
        self.initializers = Arc::new(initializers);
        self
    }

    /// Sets the scroller.
    #[must_use]
    pub fn with_scroller(mut self, scroller: Arc<dyn Scroller>) -> Self {
        self.scroller = scroller;
        self
    }

    /// Sets the translator.
    #[must_use]
    pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = translator;
        self
    }
}

impl fmt::Debug for FormServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormServices")
            .field("initializers", &self.initializers)
            .finish_non_exhaustive()
    }
}

/// Loading feedback while a step's widgets are fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    /// Whether the progress bar is shown.
    pub visible: bool,
    /// Completion, 0 to 100.
    pub percent: u8,
}

/// What the host should send when the form is submitted natively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// The submission target.
    pub action: String,
    /// The serialized form, including the `__form_data_*` inputs.
    pub payload: FormData,
}

/// The result of the final submit step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// `prevent_submit` is set: the submit notification was sent, nothing else.
    Prevented,
    /// Native submission proceeds.
    Submitted(Submission),
}

/// The result of `forward()` or `submit()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The form moved to the given step.
    Advanced(usize),
    /// The last step validated and the form went through submission.
    Finished(SubmitOutcome),
}

/// A multi-step form.
#[derive(Debug)]
pub struct Form {
    config: FormConfig,
    settings: Settings,
    services: FormServices,
    location: Location,
    current_step: usize,
    areas: Vec<Area>,
    widgets: BTreeMap<String, Widget>,
    loaded_steps: BTreeSet<usize>,
    ready_to_submit: bool,
    submitted: bool,
    submit_enabled: bool,
    is_current_step_validated: bool,
    title: Option<String>,
    messages: Vec<FormMessage>,
    progress: Progress,
    next_seq: u64,
    /// Lifecycle notifications.
    pub events: FormEvents,
}

impl Form {
    /// Creates a form on step 0 with empty layout areas.
    ///
    /// # Errors
    ///
    /// Returns [`StepformError::ImproperlyConfigured`] if the configuration
    /// is invalid.
    pub fn new(
        config: FormConfig,
        settings: Settings,
        services: FormServices,
        location: Location,
    ) -> StepformResult<Self> {
        config.check()?;
        let areas = config.areas.iter().cloned().map(Area::new).collect();
        tracing::debug!(form = %config.id, steps = config.steps, "form created");

        Ok(Self {
            config,
            settings,
            services,
            location,
            current_step: 0,
            areas,
            widgets: BTreeMap::new(),
            loaded_steps: BTreeSet::new(),
            ready_to_submit: false,
            submitted: false,
            submit_enabled: true,
            is_current_step_validated: true,
            title: None,
            messages: Vec::new(),
            progress: Progress::default(),
            next_seq: 0,
            events: FormEvents::default(),
        })
    }

    // ── Accessors ────────────────────────────────────────────────────

    /// Returns the form ID.
    pub fn id(&self) -> &str {
        &self.config.id
    }

    /// Returns the configuration.
    pub const fn config(&self) -> &FormConfig {
        &self.config
    }

    /// Returns the page location.
    pub const fn location(&self) -> &Location {
        &self.location
    }

    /// Replaces the page location (after client-side navigation).
    pub fn set_location(&mut self, location: Location) {
        self.location = location;
    }

    /// Returns the current step; 0 before the first `forward()`.
    pub const fn current_step(&self) -> usize {
        self.current_step
    }

    /// Returns the number of steps.
    pub const fn total_steps(&self) -> usize {
        self.config.steps
    }

    /// Returns `true` once the last step has validated.
    pub const fn ready_to_submit(&self) -> bool {
        self.ready_to_submit
    }

    /// Returns `true` once native submission went ahead.
    pub const fn is_submitted(&self) -> bool {
        self.submitted
    }

    /// Returns `true` if the submit control is enabled.
    pub const fn submit_enabled(&self) -> bool {
        self.submit_enabled
    }

    /// Returns `true` if the current step passed validation since it was shown.
    pub const fn is_current_step_validated(&self) -> bool {
        self.is_current_step_validated
    }

    /// Returns the steps whose widgets have been fetched.
    pub const fn loaded_steps(&self) -> &BTreeSet<usize> {
        &self.loaded_steps
    }

    /// Returns the title.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Returns the form-level messages.
    pub fn messages(&self) -> &[FormMessage] {
        &self.messages
    }

    /// Returns the loading feedback.
    pub const fn progress(&self) -> Progress {
        self.progress
    }

    /// Returns the layout areas.
    pub fn areas(&self) -> &[Area] {
        &self.areas
    }

    /// Returns the area named `name`.
    pub fn area(&self, name: &str) -> Option<&Area> {
        self.areas.iter().find(|a| a.name() == name)
    }

    /// Returns the owned widgets, keyed by UID.
    pub const fn widgets(&self) -> &BTreeMap<String, Widget> {
        &self.widgets
    }

    /// Returns the UIDs of the visible widgets.
    pub fn visible_widgets(&self) -> Vec<&str> {
        self.widgets
            .values()
            .filter(|w| w.is_visible())
            .map(Widget::uid)
            .collect()
    }

    // ── Messages ─────────────────────────────────────────────────────

    /// Sets the title.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    /// Removes every form-level message.
    pub fn clear_messages(&mut self) {
        self.messages.clear();
    }

    /// Appends a form-level message; the text is HTML-escaped.
    pub fn add_message(&mut self, text: &str, level: MessageLevel) {
        self.messages.push(FormMessage::new(text, level));
    }

    // ── Serialization ────────────────────────────────────────────────

    /// Serializes every placed control, in document order, skipping controls
    /// whose tag is in `skip_tags`.
    pub fn serialize(&self, skip_tags: &[ControlTag]) -> FormData {
        serialize(self.document_controls(), skip_tags)
    }

    /// Builds the payload sent with every endpoint request: the serialized
    /// form, the form's data attributes as `__form_data_<key>`, the non-empty
    /// location query, the current step, the form location and the form UID.
    pub fn request_payload(&self) -> FormData {
        let mut data = self.serialize(&[]);

        for (key, value) in &self.config.data {
            data.insert(format!("__form_data_{key}"), FieldValue::Text(value.clone()));
        }
        data.extend(self.location.non_empty_query());

        let mut query: QueryMap = self.location.query().clone();
        query.extend(self.serialize(&[ControlTag::Textarea]));
        query.insert("__form_data_step".to_string(), self.current_step.into());

        data.insert("__form_data_step".to_string(), self.current_step.into());
        data.insert(
            "__form_data_location".to_string(),
            FieldValue::Text(self.location.with_query(&query)),
        );
        data.insert(
            "__form_data_uid".to_string(),
            FieldValue::Text(self.config.id.clone()),
        );
        data
    }

    /// Sends the request payload to `<endpoint>/<form id>`.
    ///
    /// A transport failure is turned into a danger-level form message (the
    /// server's error text if any, else the status text) and returned.
    ///
    /// # Errors
    ///
    /// Returns [`StepformError::Transport`] on failure.
    pub async fn request(&mut self, method: Method, endpoint: &str) -> StepformResult<Value> {
        let url = format!("{}/{}", endpoint.trim_end_matches('/'), self.config.id);
        let payload = self.request_payload();
        let transport = Arc::clone(&self.services.transport);

        tracing::debug!(%method, %url, step = self.current_step, "form request");
        match transport.request(method, &url, &payload).await {
            Ok(value) => Ok(value),
            Err(err) => {
                tracing::warn!(%url, status = err.status, error = %err.message(), "form request failed");
                self.add_message(&err.message(), MessageLevel::Danger);
                Err(err.into())
            }
        }
    }

    // ── Widgets ──────────────────────────────────────────────────────

    /// Counts the owned widgets of `step`.
    pub fn count_widgets(&self, step: usize) -> usize {
        self.widgets
            .values()
            .filter(|w| w.form_step() == step)
            .count()
    }

    fn count_settled(&self, step: usize) -> usize {
        self.widgets
            .values()
            .filter(|w| w.form_step() == step && w.lifecycle().is_terminal())
            .count()
    }

    /// Creates a hidden widget from its definition and takes ownership of it.
    ///
    /// Any widget with the same UID, or with the UID named by `replaces`, is
    /// removed first, so a UID maps to at most one widget.
    pub fn create_widget(&mut self, definition: WidgetDefinition) -> &mut Widget {
        if let Some(replaced) = definition.replaces.as_deref().filter(|r| !r.is_empty()) {
            let replaced = replaced.to_string();
            self.remove_widget(&replaced);
        }
        self.remove_widget(&definition.uid);

        self.next_seq += 1;
        let mut widget = Widget::with_seq(definition, self.next_seq);
        widget.hide();
        tracing::debug!(uid = widget.uid(), step = widget.form_step(), "widget created");

        self.widgets
            .entry(widget.uid().to_string())
            .or_insert(widget)
    }

    /// Places an owned widget into its parent widget, or into its layout
    /// area when it has no parent. Placing an already placed widget moves it
    /// to the end of its container.
    ///
    /// # Errors
    ///
    /// All errors are configuration errors: [`StepformError::WidgetNotFound`]
    /// if `uid` is not owned, [`StepformError::ParentNotFound`] if the parent
    /// is not owned, [`StepformError::UnknownArea`] if the area does not
    /// exist, and [`StepformError::ImproperlyConfigured`] if the placement
    /// would nest a widget inside itself.
    pub fn add_widget(&mut self, uid: &str) -> StepformResult<()> {
        let widget = self.get_widget(uid)?;
        let parent = widget.parent_uid().map(ToString::to_string);
        let area = widget.form_area().to_string();

        let result = match parent {
            Some(parent) if self.is_ancestor(uid, &parent) => {
                Err(StepformError::ImproperlyConfigured(format!(
                    "Widget '{uid}' cannot be placed inside its own descendant '{parent}'"
                )))
            }
            Some(parent) if !self.widgets.contains_key(&parent) => {
                Err(StepformError::ParentNotFound {
                    uid: uid.to_string(),
                    parent,
                })
            }
            Some(parent) => {
                self.detach(uid);
                if let Some(p) = self.widgets.get_mut(&parent) {
                    p.children.push(uid.to_string());
                }
                Ok(())
            }
            None => match self.areas.iter().position(|a| a.name() == area) {
                Some(index) => {
                    self.detach(uid);
                    self.areas[index].push(Node::Widget(uid.to_string()));
                    Ok(())
                }
                None => Err(StepformError::UnknownArea {
                    uid: uid.to_string(),
                    area,
                }),
            },
        };

        if let Err(err) = &result {
            tracing::error!(form = %self.config.id, error = %err, "widget placement failed");
        }
        result
    }

    /// Returns the widget with `uid`.
    ///
    /// # Errors
    ///
    /// Returns [`StepformError::WidgetNotFound`] if it is not owned.
    pub fn get_widget(&self, uid: &str) -> StepformResult<&Widget> {
        self.widgets
            .get(uid)
            .ok_or_else(|| StepformError::WidgetNotFound(uid.to_string()))
    }

    /// Returns the widget with `uid` for mutation.
    ///
    /// # Errors
    ///
    /// Returns [`StepformError::WidgetNotFound`] if it is not owned.
    pub fn get_widget_mut(&mut self, uid: &str) -> StepformResult<&mut Widget> {
        self.widgets
            .get_mut(uid)
            .ok_or_else(|| StepformError::WidgetNotFound(uid.to_string()))
    }

    /// Detaches and drops the widget with `uid`. Does nothing if it is not
    /// owned.
    ///
    /// Widgets placed inside it stay owned but unplaced; the next placement
    /// pass puts them under whichever widget then holds `uid`.
    pub fn remove_widget(&mut self, uid: &str) {
        if self.widgets.remove(uid).is_none() {
            return;
        }
        self.detach(uid);
        tracing::debug!(uid, "widget removed");
    }

    /// Shows the widgets of `step`.
    pub fn show_widgets(&mut self, step: usize) {
        for widget in self.widgets.values_mut().filter(|w| w.form_step() == step) {
            widget.show();
        }
    }

    /// Hides the widgets of `step`.
    pub fn hide_widgets(&mut self, step: usize) {
        for widget in self.widgets.values_mut().filter(|w| w.form_step() == step) {
            widget.hide();
        }
    }

    /// Removes the widgets of `step`.
    pub fn remove_widgets(&mut self, step: usize) {
        let uids: Vec<String> = self
            .widgets
            .values()
            .filter(|w| w.form_step() == step)
            .map(|w| w.uid().to_string())
            .collect();
        for uid in uids {
            self.remove_widget(&uid);
        }
    }

    /// Fetches the widget definitions of the current step and installs them.
    ///
    /// # Errors
    ///
    /// Returns [`StepformError::Transport`] or
    /// [`StepformError::MalformedResponse`] if the definitions cannot be
    /// fetched, plus everything [`Form::apply_widget_definitions`] returns.
    pub async fn load_widgets(&mut self) -> StepformResult<()> {
        let step = self.current_step;
        self.progress = Progress {
            visible: true,
            percent: 0,
        };

        let endpoint = self.config.get_widgets_ep.clone();
        let definitions = match self.request(Method::POST, &endpoint).await {
            Ok(value) => serde_json::from_value::<Vec<WidgetDefinition>>(value)
                .map_err(|e| self.malformed(&format!("Invalid widget definitions: {e}"))),
            Err(err) => Err(err),
        };

        match definitions {
            Ok(definitions) => self.apply_widget_definitions(step, definitions).await,
            Err(err) => {
                self.progress.visible = false;
                Err(err)
            }
        }
    }

    /// Installs widget definitions fetched for step `issued`.
    ///
    /// Every definition becomes a widget of step `issued`. Their assets load
    /// concurrently; completions are counted until every live widget of the
    /// step has settled. If any widget fails to initialize, the step's
    /// widgets are removed and a danger message is added. Otherwise all owned
    /// widgets are placed in `(weight, creation)` order and filled from the
    /// location query.
    ///
    /// # Errors
    ///
    /// Returns [`StepformError::StaleResponse`] if `issued` is not the
    /// current step, [`StepformError::AssetLoad`] if a widget failed to
    /// initialize, and placement errors from [`Form::add_widget`].
    pub async fn apply_widget_definitions(
        &mut self,
        issued: usize,
        definitions: Vec<WidgetDefinition>,
    ) -> StepformResult<()> {
        self.ensure_current(issued)?;

        let mut pending = FuturesUnordered::new();
        for mut definition in definitions {
            definition.form_step = issued;
            let widget = self.create_widget(definition);
            let (uid, seq, assets) = (
                widget.uid().to_string(),
                widget.seq(),
                widget.assets().to_vec(),
            );
            let loader = Arc::clone(&self.services.assets);
            pending.push(async move {
                let loaded = loader.load_assets(&assets).await;
                (uid, seq, loaded)
            });
        }

        let expected = self.count_widgets(issued);
        let initializers = Arc::clone(&self.services.initializers);
        let mut failures = Vec::new();

        while self.count_settled(issued) < expected {
            let Some((uid, seq, loaded)) = pending.next().await else {
                break;
            };
            let Some(widget) = self.widgets.get_mut(&uid).filter(|w| w.seq() == seq) else {
                tracing::warn!(%uid, "ignoring init signal of a replaced widget");
                continue;
            };
            match widget.complete_init(loaded, &initializers) {
                WidgetSignal::Ready(ev) => {
                    self.events.widget_ready.send(&ev);
                }
                WidgetSignal::InitError(ev) => {
                    self.events.widget_init_error.send(&ev);
                    failures.push(ev);
                }
            }
            self.progress.percent = percent(self.count_settled(issued), expected);
        }

        if let Some(failure) = failures.into_iter().next() {
            let message = self.services.translator.translate_with(
                "Widget '{uid}' failed to initialize: {message}",
                &[
                    ("uid", failure.uid.as_str()),
                    ("message", failure.message.as_str()),
                ],
            );
            self.remove_widgets(issued);
            self.progress.visible = false;
            self.add_message(&message, MessageLevel::Danger);
            tracing::warn!(step = issued, uid = %failure.uid, "step load failed");
            return Err(StepformError::AssetLoad {
                uid: failure.uid,
                message: failure.message,
            });
        }

        let mut order: Vec<(i64, u64, String)> = self
            .widgets
            .values()
            .map(|w| (w.weight(), w.seq(), w.uid().to_string()))
            .collect();
        order.sort();
        for (_, _, uid) in &order {
            self.add_widget(uid)?;
        }

        self.progress = Progress {
            visible: false,
            percent: 100,
        };
        self.loaded_steps.insert(issued);
        let query = self.location.query().clone();
        self.fill(&query);

        tracing::info!(step = issued, widgets = expected, "widgets loaded");
        Ok(())
    }

    /// Writes values into the controls named `key` or `key[]`.
    ///
    /// Text controls receive scalars (lists are comma-joined). Checkboxes and
    /// radios are checked when their value matches, or is listed; a
    /// single checkbox is also checked by `true`.
    pub fn fill(&mut self, values: &QueryMap) {
        for widget in self.widgets.values_mut() {
            for control in widget.controls_mut() {
                fill_control(control, values);
            }
        }
        for area in &mut self.areas {
            for control in area.controls_mut() {
                fill_control(control, values);
            }
        }
    }

    /// Restores every control to its markup default.
    pub fn reset(&mut self) {
        for widget in self.widgets.values_mut() {
            widget.reset();
        }
        for area in &mut self.areas {
            for control in area.controls_mut() {
                control.reset();
            }
        }
    }

    // ── Workflow ─────────────────────────────────────────────────────

    /// Validates the current step against the validation endpoint.
    ///
    /// Step 0 is always valid and sends nothing. Otherwise form messages and
    /// widget states are cleared first.
    ///
    /// # Errors
    ///
    /// Returns [`StepformError::ValidationFailed`] when the server rejects
    /// the step, and [`StepformError::Transport`] or
    /// [`StepformError::MalformedResponse`] when it cannot answer. All of
    /// them are already rendered as messages.
    pub async fn validate(&mut self) -> StepformResult<()> {
        let step = self.current_step;
        if step == 0 {
            self.is_current_step_validated = true;
            return Ok(());
        }

        self.clear_messages();
        for widget in self.widgets.values_mut() {
            widget.clear_state().clear_messages();
        }

        let endpoint = self.config.validation_ep.clone();
        match self.request(Method::POST, &endpoint).await {
            Ok(value) => self.apply_validation(step, value),
            Err(err) => {
                self.scroll(ScrollTarget::Top, ScrollContainer::Window);
                Err(err)
            }
        }
    }

    /// Applies a validation response received for step `issued`.
    ///
    /// Messages for a live, not always-hidden widget put it in the error
    /// state; any other key becomes a danger form message `"<key>: <text>"`.
    ///
    /// # Errors
    ///
    /// Returns [`StepformError::StaleResponse`] if `issued` is not the
    /// current step, [`StepformError::MalformedResponse`] if the body does
    /// not decode, and [`StepformError::ValidationFailed`] on `status: false`.
    pub fn apply_validation(&mut self, issued: usize, response: Value) -> StepformResult<()> {
        self.ensure_current(issued)?;

        let response = match ValidationResponse::from_value(response) {
            Ok(response) => response,
            Err(err) => {
                let err = self.malformed(&err.to_string());
                self.scroll(ScrollTarget::Top, ScrollContainer::Window);
                return Err(err);
            }
        };

        if response.status {
            self.is_current_step_validated = true;
            tracing::debug!(step = issued, "step validated");
            return Ok(());
        }

        let fields = response.into_fields();
        for (uid, texts) in &fields {
            let widget = self.widgets.get_mut(uid).filter(|w| !w.always_hidden());
            if let Some(widget) = widget {
                widget.set_state(WidgetState::Error);
                for text in texts {
                    widget.add_message(text.clone());
                }
                continue;
            }
            for text in texts {
                self.add_message(&format!("{uid}: {text}"), MessageLevel::Danger);
            }
        }

        let target = self
            .placed_widgets()
            .into_iter()
            .find(|uid| {
                self.widgets
                    .get(*uid)
                    .is_some_and(|w| w.state() == Some(WidgetState::Error))
            })
            .map_or(ScrollTarget::Messages, |uid| ScrollTarget::Widget(uid.to_string()));
        let container = if self.config.modal {
            ScrollContainer::Modal
        } else {
            ScrollContainer::Window
        };
        self.scroll(target, container);

        tracing::info!(step = issued, fields = fields.len(), "step validation failed");
        Err(StepformError::ValidationFailed {
            step: issued,
            fields,
        })
    }

    /// Validates the current step and moves to the next one, or submits the
    /// form when the current step is the last.
    ///
    /// Cached step widgets are reused unless `nocache` is set. When the next
    /// step fails to load the form stays on the current step.
    ///
    /// # Errors
    ///
    /// Returns [`StepformError::InvalidTransition`] after submission,
    /// validation and loading errors otherwise.
    pub async fn forward(&mut self) -> StepformResult<StepOutcome> {
        let span = form_span(&self.config.id, self.current_step);
        self.step_forward().instrument(span).await
    }

    async fn step_forward(&mut self) -> StepformResult<StepOutcome> {
        if self.submitted {
            return Err(StepformError::InvalidTransition(
                "the form has already been submitted".to_string(),
            ));
        }

        self.submit_enabled = false;
        let validated = self.validate().await;
        self.submit_enabled = true;
        validated?;

        if self.current_step >= self.config.steps {
            self.ready_to_submit = true;
            return self.finalize_submit().map(StepOutcome::Finished);
        }

        let previous = self.current_step;
        self.hide_widgets(previous);
        self.current_step += 1;
        let step = self.current_step;

        let cached = !self.config.nocache
            && self.loaded_steps.contains(&step)
            && self.count_widgets(step) > 0;
        if !cached {
            self.remove_widgets(step);
            self.loaded_steps.remove(&step);
            if let Err(err) = self.load_widgets().await {
                self.remove_widgets(step);
                self.current_step = previous;
                self.show_widgets(previous);
                tracing::warn!(step, error = %err, "staying on step {previous}");
                return Err(err);
            }
        }

        self.is_current_step_validated = false;
        self.show_widgets(step);
        tracing::info!(step, cached, "form stepped forward");
        self.events.forward.send(&FormForward {
            form_id: self.config.id.clone(),
            step,
        });
        if step > 1 {
            self.scroll(ScrollTarget::FormRoot, ScrollContainer::Window);
        }
        Ok(StepOutcome::Advanced(step))
    }

    /// Moves to the previous step.
    ///
    /// With [`BackwardPolicy::Destroy`] the current step's widgets are
    /// removed, so the next `forward()` fetches them again; with
    /// [`BackwardPolicy::Retain`] they are only hidden.
    ///
    /// # Errors
    ///
    /// Returns [`StepformError::InvalidTransition`] on step 0 or after
    /// submission.
    pub fn backward(&mut self) -> StepformResult<usize> {
        if self.current_step == 0 || self.submitted {
            return Err(StepformError::InvalidTransition(format!(
                "cannot move backward from step {}",
                self.current_step
            )));
        }

        let step = self.current_step;
        match self.config.backward_policy {
            BackwardPolicy::Destroy => {
                self.remove_widgets(step);
                self.loaded_steps.remove(&step);
            }
            BackwardPolicy::Retain => self.hide_widgets(step),
        }

        self.current_step -= 1;
        self.ready_to_submit = false;
        self.show_widgets(self.current_step);
        self.scroll(ScrollTarget::FormRoot, ScrollContainer::Window);
        tracing::info!(form = %self.config.id, step = self.current_step, "form stepped backward");
        Ok(self.current_step)
    }

    /// Handles a submit request from the user.
    ///
    /// Until the last step has validated this is the same as `forward()`.
    /// Afterwards it sends the submit notification and, unless
    /// `prevent_submit` is set, finalizes native submission.
    ///
    /// # Errors
    ///
    /// Returns [`StepformError::InvalidTransition`] after submission, and
    /// whatever `forward()` returns.
    pub async fn submit(&mut self) -> StepformResult<StepOutcome> {
        if self.submitted {
            return Err(StepformError::InvalidTransition(
                "the form has already been submitted".to_string(),
            ));
        }
        if !self.ready_to_submit {
            return self.forward().await;
        }
        self.finalize_submit().map(StepOutcome::Finished)
    }

    fn finalize_submit(&mut self) -> StepformResult<SubmitOutcome> {
        self.events.submit.send(&FormSubmit {
            form_id: self.config.id.clone(),
            payload: self.serialize(&[]),
        });

        if self.config.prevent_submit {
            tracing::info!(form = %self.config.id, "native submission prevented");
            return Ok(SubmitOutcome::Prevented);
        }

        let hidden = self
            .areas
            .iter()
            .position(|a| a.name() == "hidden")
            .ok_or_else(|| StepformError::UnknownArea {
                uid: self.config.id.clone(),
                area: "hidden".to_string(),
            })?;

        for widget in self.widgets.values_mut() {
            widget.controls.retain(|c| !c.skip_serialization);
        }
        for area in &mut self.areas {
            area.retain_controls(|c| !c.skip_serialization);
        }
        for (key, value) in &self.config.data {
            self.areas[hidden].push(Node::Control(Control::hidden(
                format!("__form_data_{key}"),
                value.clone(),
            )));
        }

        self.submit_enabled = false;
        self.submitted = true;
        tracing::info!(form = %self.config.id, "form submitted");
        Ok(SubmitOutcome::Submitted(Submission {
            action: self.config.submit_ep.clone(),
            payload: self.serialize(&[]),
        }))
    }

    // ── Internals ────────────────────────────────────────────────────

    fn ensure_current(&self, issued: usize) -> StepformResult<()> {
        if issued == self.current_step {
            return Ok(());
        }
        tracing::warn!(issued, current = self.current_step, "discarding stale response");
        Err(StepformError::StaleResponse {
            issued,
            current: self.current_step,
        })
    }

    fn malformed(&mut self, detail: &str) -> StepformError {
        tracing::warn!(form = %self.config.id, detail, "malformed response");
        let message = self
            .services
            .translator
            .translate("The server returned an invalid response");
        self.add_message(&message, MessageLevel::Danger);
        StepformError::MalformedResponse(detail.to_string())
    }

    fn scroll(&self, target: ScrollTarget, container: ScrollContainer) {
        self.services
            .scroller
            .scroll_to(target, container, self.settings.scroll_duration_ms);
    }

    fn detach(&mut self, uid: &str) {
        for area in &mut self.areas {
            area.detach(uid);
        }
        for widget in self.widgets.values_mut() {
            widget.children.retain(|c| c != uid);
        }
    }

    /// Returns `true` if `uid` is `start` or one of its ancestors.
    fn is_ancestor(&self, uid: &str, start: &str) -> bool {
        let mut current = Some(start);
        for _ in 0..=self.widgets.len() {
            match current {
                Some(c) if c == uid => return true,
                Some(c) => current = self.widgets.get(c).and_then(Widget::parent_uid),
                None => return false,
            }
        }
        false
    }

    /// Returns the placed widgets in document order.
    fn placed_widgets(&self) -> Vec<&str> {
        let mut out = Vec::new();
        for area in &self.areas {
            for uid in area.widget_uids() {
                self.collect_placed(uid, &mut out);
            }
        }
        out
    }

    fn collect_placed<'a>(&'a self, uid: &str, out: &mut Vec<&'a str>) {
        if let Some(widget) = self.widgets.get(uid) {
            out.push(widget.uid());
            for child in widget.children() {
                self.collect_placed(child, out);
            }
        }
    }

    /// Returns the placed controls in document order.
    fn document_controls(&self) -> Vec<&Control> {
        let mut out = Vec::new();
        for area in &self.areas {
            for node in area.nodes() {
                match node {
                    Node::Control(control) => out.push(control),
                    Node::Widget(uid) => self.collect_controls(uid, &mut out),
                }
            }
        }
        out
    }

    fn collect_controls<'a>(&'a self, uid: &str, out: &mut Vec<&'a Control>) {
        if let Some(widget) = self.widgets.get(uid) {
            out.extend(widget.controls());
            for child in widget.children() {
                self.collect_controls(child, out);
            }
        }
    }
}

fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    u8::try_from(done.min(total) * 100 / total).unwrap_or(100)
}

fn fill_control(control: &mut Control, values: &QueryMap) {
    let is_list = control.name.ends_with("[]");
    let key = control.name.strip_suffix("[]").unwrap_or(&control.name);
    let Some(value) = values.get(key) else {
        return;
    };
    let toggles = control.is_checkbox() || control.is_radio();

    match value {
        FieldValue::Text(text) if toggles => {
            let truthy = control.is_checkbox()
                && !is_list
                && matches!(text.as_str(), "true" | "True" | "1");
            control.checked = control.value == *text || truthy;
        }
        FieldValue::Text(text) => control.value.clone_from(text),
        FieldValue::Bool(b) if control.is_checkbox() => control.checked = *b,
        FieldValue::Bool(b) if !toggles => control.value = b.to_string(),
        FieldValue::List(items) if toggles => control.checked = items.contains(&control.value),
        FieldValue::List(items) => control.value = items.join(","),
        FieldValue::Bool(_) | FieldValue::Dict(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use stepform_assets::{Asset, AssetError};
    use stepform_http::TransportError;

    /// Answers widget requests from a per-step table and validation requests
    /// with a fixed body.
    #[derive(Default)]
    struct StepTransport {
        widgets: BTreeMap<usize, Value>,
        validation: Option<Value>,
        calls: Mutex<Vec<(String, FormData)>>,
    }

    #[async_trait]
    impl Transport for StepTransport {
        async fn request(
            &self,
            _method: Method,
            endpoint: &str,
            payload: &FormData,
        ) -> Result<Value, TransportError> {
            self.calls
                .lock()
                .unwrap()
                .push((endpoint.to_string(), payload.clone()));
            let step: usize = payload["__form_data_step"]
                .as_str()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0);
            if endpoint.starts_with("form/widgets") {
                return Ok(self
                    .widgets
                    .get(&step)
                    .cloned()
                    .unwrap_or_else(|| serde_json::json!([])));
            }
            self.validation
                .clone()
                .ok_or_else(|| TransportError::http(500, "Internal Server Error"))
        }
    }

    struct NoAssets;

    #[async_trait]
    impl AssetLoader for NoAssets {
        async fn load_assets(&self, _assets: &[Asset]) -> Result<(), AssetError> {
            Ok(())
        }
    }

    fn form_with(transport: StepTransport, steps: usize) -> Form {
        let mut config = FormConfig::new("test");
        config.steps = steps;
        Form::new(
            config,
            Settings::default(),
            FormServices::new(Arc::new(transport), Arc::new(NoAssets)),
            Location::parse("https://example.com/form").unwrap(),
        )
        .unwrap()
    }

    fn def(uid: &str) -> WidgetDefinition {
        serde_json::from_value(serde_json::json!({
            "uid": uid,
            "markup": format!("<input name=\"{uid}\" value=\"v-{uid}\">"),
        }))
        .unwrap()
    }

    #[test]
    fn test_new_form_state() {
        let form = form_with(StepTransport::default(), 2);
        assert_eq!(form.current_step(), 0);
        assert_eq!(form.total_steps(), 2);
        assert!(!form.ready_to_submit());
        assert!(form.submit_enabled());
        assert_eq!(form.areas().len(), 4);
    }

    #[test]
    fn test_zero_steps_rejected() {
        let mut config = FormConfig::new("f");
        config.steps = 0;
        let err = Form::new(
            config,
            Settings::default(),
            FormServices::new(Arc::new(StepTransport::default()), Arc::new(NoAssets)),
            Location::parse("https://example.com/").unwrap(),
        )
        .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_create_widget_replaces_same_uid() {
        let mut form = form_with(StepTransport::default(), 1);
        form.create_widget(def("a"));
        let mut replacement = def("a");
        replacement.replaces = Some("a".into());
        replacement.weight = 7;
        form.create_widget(replacement);
        assert_eq!(form.widgets().len(), 1);
        assert_eq!(form.get_widget("a").unwrap().weight(), 7);
    }

    #[test]
    fn test_create_widget_replaces_other_uid() {
        let mut form = form_with(StepTransport::default(), 1);
        form.create_widget(def("old"));
        let mut new = def("new");
        new.replaces = Some("old".into());
        form.create_widget(new);
        assert!(form.get_widget("old").is_err());
        assert!(form.get_widget("new").is_ok());
    }

    #[test]
    fn test_add_widget_parent_and_area() {
        let mut form = form_with(StepTransport::default(), 1);
        form.create_widget(def("parent"));
        let mut child = def("child");
        child.parent_uid = Some("parent".into());
        form.create_widget(child);

        form.add_widget("parent").unwrap();
        form.add_widget("child").unwrap();
        assert_eq!(form.get_widget("parent").unwrap().children(), ["child"]);
        assert_eq!(form.area("body").unwrap().widget_uids().collect::<Vec<_>>(), ["parent"]);

        let data = form.serialize(&[]);
        assert_eq!(data.len(), 2);
    }

    #[test]
    fn test_add_widget_missing_parent_is_fatal() {
        let mut form = form_with(StepTransport::default(), 1);
        let mut orphan = def("orphan");
        orphan.parent_uid = Some("ghost".into());
        form.create_widget(orphan);
        let err = form.add_widget("orphan").unwrap_err();
        assert!(matches!(err, StepformError::ParentNotFound { ref parent, .. } if parent == "ghost"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_add_widget_unknown_area_is_fatal() {
        let mut form = form_with(StepTransport::default(), 1);
        let mut w = def("w");
        w.form_area = "sidebar".into();
        form.create_widget(w);
        assert!(matches!(
            form.add_widget("w"),
            Err(StepformError::UnknownArea { .. })
        ));
    }

    #[test]
    fn test_add_widget_cycle_rejected() {
        let mut form = form_with(StepTransport::default(), 1);
        let mut a = def("a");
        a.parent_uid = Some("b".into());
        let mut b = def("b");
        b.parent_uid = Some("a".into());
        form.create_widget(a);
        form.create_widget(b);
        assert!(form.add_widget("a").unwrap_err().is_fatal());
        assert!(form.add_widget("b").unwrap_err().is_fatal());

        let mut own = def("own");
        own.parent_uid = Some("own".into());
        form.create_widget(own);
        assert!(form.add_widget("own").unwrap_err().is_fatal());
    }

    #[test]
    fn test_remove_widget_keeps_children_unplaced() {
        let mut form = form_with(StepTransport::default(), 1);
        form.create_widget(def("p"));
        let mut c = def("c");
        c.parent_uid = Some("p".into());
        form.create_widget(c);
        form.add_widget("p").unwrap();
        form.add_widget("c").unwrap();

        form.remove_widget("p");
        assert_eq!(form.widgets().keys().collect::<Vec<_>>(), ["c"]);
        assert_eq!(form.area("body").unwrap().nodes().len(), 0);
        assert!(form.serialize(&[]).is_empty());

        // A new holder of the parent UID takes the child back.
        form.create_widget(def("p"));
        form.add_widget("p").unwrap();
        form.add_widget("c").unwrap();
        assert_eq!(form.get_widget("p").unwrap().children(), ["c"]);

        // Absent UID is a no-op.
        form.remove_widget("ghost");
    }

    #[test]
    fn test_get_widget_unknown() {
        let form = form_with(StepTransport::default(), 1);
        assert!(matches!(
            form.get_widget("nope"),
            Err(StepformError::WidgetNotFound(_))
        ));
    }

    #[test]
    fn test_fill_and_reset() {
        let mut form = form_with(StepTransport::default(), 1);
        let mut w = def("w");
        w.markup = r#"<input name="title" value="x"><input type="checkbox" name="agree"><input type="checkbox" name="tags[]" value="a"><input type="checkbox" name="tags[]" value="b">"#.into();
        form.create_widget(w);
        form.add_widget("w").unwrap();

        let query = stepform_http::parse_query("title=Hello&agree=true&tags[]=b&tags[]=c", false);
        form.fill(&query);
        let data = form.serialize(&[]);
        assert_eq!(data["title"], FieldValue::Text("Hello".into()));
        assert_eq!(data["agree"], FieldValue::Bool(true));
        assert_eq!(data["tags"], FieldValue::Text("b".into()));

        form.reset();
        let data = form.serialize(&[]);
        assert_eq!(data["title"], FieldValue::Text("x".into()));
        assert_eq!(data["agree"], FieldValue::Bool(false));
        assert!(!data.contains_key("tags"));
    }

    #[test]
    fn test_request_payload_context() {
        let mut config = FormConfig::new("signup");
        config.data.insert("cid".into(), "app.Signup".into());
        let mut form = Form::new(
            config,
            Settings::default(),
            FormServices::new(Arc::new(StepTransport::default()), Arc::new(NoAssets)),
            Location::parse("https://example.com/join?ref=ad&empty=").unwrap(),
        )
        .unwrap();
        form.create_widget(def("email"));
        form.add_widget("email").unwrap();

        let payload = form.request_payload();
        assert_eq!(payload["email"], FieldValue::Text("v-email".into()));
        assert_eq!(payload["__form_data_cid"], FieldValue::Text("app.Signup".into()));
        assert_eq!(payload["ref"], FieldValue::Text("ad".into()));
        assert!(!payload.contains_key("empty"));
        assert_eq!(payload["__form_data_step"], FieldValue::Text("0".into()));
        assert_eq!(payload["__form_data_uid"], FieldValue::Text("signup".into()));
        assert_eq!(
            payload["__form_data_location"],
            FieldValue::Text(
                "https://example.com/join?__form_data_step=0&email=v-email&empty=&ref=ad".into()
            )
        );
    }

    #[test]
    fn test_form_messages_are_escaped() {
        let mut form = form_with(StepTransport::default(), 1);
        form.add_message("<script>", MessageLevel::Warning);
        assert_eq!(form.messages()[0].html, "&lt;script&gt;");
        form.set_title("Sign up");
        assert_eq!(form.title(), Some("Sign up"));
        form.clear_messages();
        assert!(form.messages().is_empty());
    }

    #[tokio::test]
    async fn test_forward_loads_first_step() {
        let mut transport = StepTransport::default();
        transport
            .widgets
            .insert(1, serde_json::json!([{"uid": "b", "weight": 2}, {"uid": "a", "weight": 1}]));
        let mut form = form_with(transport, 2);

        let outcome = form.forward().await.unwrap();
        assert_eq!(outcome, StepOutcome::Advanced(1));
        assert_eq!(form.visible_widgets(), ["a", "b"]);
        assert_eq!(
            form.area("body").unwrap().widget_uids().collect::<Vec<_>>(),
            ["a", "b"]
        );
        assert!(form.loaded_steps().contains(&1));
        assert_eq!(form.progress(), Progress { visible: false, percent: 100 });
    }

    #[tokio::test]
    async fn test_stale_responses_discarded() {
        let mut form = form_with(StepTransport::default(), 2);
        let err = form
            .apply_validation(3, serde_json::json!({"status": true}))
            .unwrap_err();
        assert!(matches!(err, StepformError::StaleResponse { issued: 3, current: 0 }));
        let err = form
            .apply_widget_definitions(1, vec![def("x")])
            .await
            .unwrap_err();
        assert!(matches!(err, StepformError::StaleResponse { .. }));
        assert!(form.widgets().is_empty());
    }

    #[tokio::test]
    async fn test_validation_transport_failure_adds_message() {
        let mut transport = StepTransport::default();
        transport.widgets.insert(1, serde_json::json!([{"uid": "a"}]));
        let mut form = form_with(transport, 2);
        form.forward().await.unwrap();

        let err = form.forward().await.unwrap_err();
        assert!(matches!(err, StepformError::Transport { status: 500, .. }));
        assert_eq!(form.current_step(), 1);
        assert!(form.submit_enabled());
        assert_eq!(form.messages().len(), 1);
        assert_eq!(form.messages()[0].level, MessageLevel::Danger);
        assert!(form.messages()[0].contains("Internal Server Error"));
    }

    #[tokio::test]
    async fn test_backward_from_zero_is_invalid() {
        let mut form = form_with(StepTransport::default(), 1);
        assert!(matches!(
            form.backward(),
            Err(StepformError::InvalidTransition(_))
        ));
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(3, 3), 100);
        assert_eq!(percent(0, 0), 100);
    }
}
