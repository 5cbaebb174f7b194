//! The scrolling seam.
//!
//! After validation and step changes the form moves the viewport to where the
//! user should look next. The host implements [`Scroller`]; headless hosts use
//! [`NoopScroller`].

/// Where to scroll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrollTarget {
    /// The top of the page.
    Top,
    /// The form's root element.
    FormRoot,
    /// The form's message area.
    Messages,
    /// The widget with the given UID.
    Widget(String),
}

/// The element that scrolls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollContainer {
    /// The browser window.
    Window,
    /// The modal dialog the form is rendered in.
    Modal,
}

/// Scrolls the host viewport.
pub trait Scroller: Send + Sync {
    /// Scrolls `container` so that `target` is visible, animating over
    /// `duration_ms`.
    fn scroll_to(&self, target: ScrollTarget, container: ScrollContainer, duration_ms: u64);
}

/// A [`Scroller`] that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopScroller;

impl Scroller for NoopScroller {
    fn scroll_to(&self, _target: ScrollTarget, _container: ScrollContainer, _duration_ms: u64) {}
}
