//! Layout areas of a form root.
//!
//! Each area holds an ordered list of nodes: placed widgets (by UID) and loose
//! controls appended by the form itself. Nested widgets are recorded on their
//! parent widget, so walking the areas and then each widget's children yields
//! document order.

use crate::markup::Control;

/// One entry of a layout area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A placed widget.
    Widget(String),
    /// A control rendered directly into the area.
    Control(Control),
}

/// A named container region of the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Area {
    name: String,
    nodes: Vec<Node>,
}

impl Area {
    pub(crate) const fn new(name: String) -> Self {
        Self {
            name,
            nodes: Vec::new(),
        }
    }

    /// Returns the area name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the area contents, in document order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Returns the UIDs of the widgets placed directly in this area.
    pub fn widget_uids(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().filter_map(|n| match n {
            Node::Widget(uid) => Some(uid.as_str()),
            Node::Control(_) => None,
        })
    }

    pub(crate) fn push(&mut self, node: Node) {
        self.nodes.push(node);
    }

    pub(crate) fn detach(&mut self, uid: &str) {
        self.nodes
            .retain(|n| !matches!(n, Node::Widget(placed) if placed == uid));
    }

    pub(crate) fn retain_controls(&mut self, keep: impl Fn(&Control) -> bool) {
        self.nodes.retain(|n| match n {
            Node::Control(c) => keep(c),
            Node::Widget(_) => true,
        });
    }

    pub(crate) fn controls_mut(&mut self) -> impl Iterator<Item = &mut Control> {
        self.nodes.iter_mut().filter_map(|n| match n {
            Node::Control(c) => Some(c),
            Node::Widget(_) => None,
        })
    }
}
