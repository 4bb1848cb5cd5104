//! Per-node multicast hooks.
//!
//! Each hook is an ordered list of subscribers. Emitting an event walks the
//! list in subscription order and stops at the first subscriber that returns
//! `true` (handled).

use crossterm::event::{KeyEvent, MouseEvent};
use ratatui::layout::Rect;

use crate::node::NodeId;

pub type Observer<E> = Box<dyn FnMut(&E) -> bool>;

pub struct Observers<E> {
    list: Vec<Observer<E>>,
}

impl<E> Default for Observers<E> {
    fn default() -> Self {
        Self { list: Vec::new() }
    }
}

impl<E> Observers<E> {
    pub fn subscribe<F>(&mut self, observer: F)
    where
        F: FnMut(&E) -> bool + 'static,
    {
        self.list.push(Box::new(observer));
    }

    /// Notifies subscribers in order; returns whether one marked the event
    /// handled.
    pub fn emit(&mut self, event: &E) -> bool {
        self.list.iter_mut().any(|observer| observer(event))
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn clear(&mut self) {
        self.list.clear();
    }
}

impl<E> std::fmt::Debug for Observers<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Observers({})", self.list.len())
    }
}

/// Payload of the added/removed hooks, emitted on the parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Membership {
    pub parent: NodeId,
    pub child: NodeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusChange {
    pub node: NodeId,
    pub focused: bool,
}

#[derive(Debug, Default)]
pub struct Hooks {
    pub added: Observers<Membership>,
    pub removed: Observers<Membership>,
    pub focus_changed: Observers<FocusChange>,
    pub key_press: Observers<KeyEvent>,
    /// Receives events already translated into the node's coordinates.
    pub mouse: Observers<MouseEvent>,
    /// Fired with the node's bounds after its children were laid out.
    pub layout_complete: Observers<Rect>,
}
