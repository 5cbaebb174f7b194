//! # stepform-signals
//!
//! Observer lists for stepform. A [`Signal`] is owned by the object that
//! emits it (a form, a form registry) rather than living in a global event
//! namespace, so subscribers connect to exactly the instance they care about.
//!
//! ## Usage
//!
//! ```
//! use stepform_signals::Signal;
//! use std::sync::Arc;
//!
//! struct StepChanged(usize);
//!
//! let signal: Signal<StepChanged> = Signal::new();
//!
//! signal.connect("logger", Arc::new(|event: &StepChanged| {
//!     println!("now on step {}", event.0);
//! }));
//!
//! assert_eq!(signal.send(&StepChanged(2)), 1);
//! ```

use std::fmt;
use std::sync::{Arc, RwLock};

/// The type signature for a signal receiver callback.
///
/// Receivers must be `Send + Sync` so that the owning object can be moved
/// across task boundaries.
pub type SignalReceiver<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// An observer list carrying payloads of type `T`.
///
/// Receivers are keyed by an ID and called in the order they were connected.
/// The optional name only labels the signal in logs.
pub struct Signal<T: 'static> {
    name: &'static str,
    receivers: RwLock<Vec<(String, SignalReceiver<T>)>>,
}

impl<T: 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("name", &self.name)
            .field("receivers", &self.receiver_ids())
            .finish()
    }
}

impl<T: 'static> Signal<T> {
    /// Creates an unnamed signal with no receivers.
    pub const fn new() -> Self {
        Self::named("signal")
    }

    /// Creates a signal labelled `name` in logs.
    pub const fn named(name: &'static str) -> Self {
        Self {
            name,
            receivers: RwLock::new(Vec::new()),
        }
    }

    /// Returns the log label.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Connects a receiver to this signal.
    ///
    /// If a receiver with the same ID is already connected, it is replaced
    /// in place and keeps its position in the call order.
    pub fn connect(&self, receiver_id: impl Into<String>, callback: SignalReceiver<T>) {
        let id = receiver_id.into();
        let mut receivers = self.receivers.write().expect("signal lock poisoned");

        if let Some(entry) = receivers.iter_mut().find(|(rid, _)| *rid == id) {
            entry.1 = callback;
        } else {
            receivers.push((id, callback));
        }
    }

    /// Connects a plain closure, wrapping it in an `Arc`.
    pub fn connect_fn<F>(&self, receiver_id: impl Into<String>, callback: F)
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.connect(receiver_id, Arc::new(callback));
    }

    /// Disconnects the receiver `receiver_id`; returns `false` if it was not
    /// connected.
    pub fn disconnect(&self, receiver_id: &str) -> bool {
        let mut receivers = self.receivers.write().expect("signal lock poisoned");
        match receivers.iter().position(|(id, _)| id == receiver_id) {
            Some(index) => {
                receivers.remove(index);
                true
            }
            None => false,
        }
    }

    /// Sends the signal to all connected receivers.
    ///
    /// Receivers are called in connection order, outside of the internal
    /// lock, so a receiver may connect or disconnect others. Returns the
    /// number of receivers called.
    pub fn send(&self, payload: &T) -> usize {
        let snapshot: Vec<SignalReceiver<T>> = self
            .receivers
            .read()
            .expect("signal lock poisoned")
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        for callback in &snapshot {
            callback(payload);
        }
        tracing::trace!(signal = self.name, receivers = snapshot.len(), "signal sent");
        snapshot.len()
    }

    /// Returns the number of connected receivers.
    pub fn receiver_count(&self) -> usize {
        self.receivers.read().expect("signal lock poisoned").len()
    }

    /// Returns the IDs of connected receivers, in call order.
    pub fn receiver_ids(&self) -> Vec<String> {
        self.receivers
            .read()
            .expect("signal lock poisoned")
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }
}
