//! Compositing and interaction engine for character-cell user interfaces.
//!
//! The crate owns the containment tree of rectangular nodes and everything
//! that operates on it: the expression-based layout resolver, the focus
//! manager, damage tracking with a clipped redraw walk, and the input router.
//! Concrete widgets, terminal protocol handling and text shaping live in
//! consumers and are reached only through the traits in [`components`] and
//! [`drivers`].

pub mod actions;
pub mod component_context;
pub mod components;
pub mod constants;
pub mod damage;
pub mod drivers;
pub mod error;
pub mod event_loop;
pub mod focus;
pub mod input;
pub mod keybindings;
pub mod layout;
pub mod node;
pub mod observers;
pub mod region;
pub mod state;
pub mod tracing_sub;
pub mod tree;
pub mod ui;

pub use actions::Command;
pub use components::{MouseReply, Widget};
pub use error::{Result, TreeError};
pub use event_loop::{ControlFlow, EventLoop, LoopError};
pub use focus::Heading;
pub use keybindings::{KeyBindings, KeyCombo, KeyScope};
pub use layout::{Expr, Side};
pub use node::{LayoutMode, Node, NodeId};
pub use region::Region;
pub use state::{Invoker, NavigationDirection, Runtime, TimerToken};
pub use tree::Tree;
