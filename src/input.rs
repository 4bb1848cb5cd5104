//! Key and mouse routing.
//!
//! Keys go through three phases from the top-level node: a hot-key broadcast
//! over the whole visible tree, the normal phase down the focus chain, and a
//! cold-key broadcast when nothing on the chain wanted the key. Mouse events
//! go to the grab owner or to the deepest node under the pointer, in that
//! node's coordinates.

use crossterm::event::{Event, KeyEvent, KeyEventKind, MouseEvent, MouseEventKind};
use tracing::{debug, trace, warn};

use crate::actions::Command;
use crate::components::MouseReply;
use crate::error::Result;
use crate::focus::Heading;
use crate::keybindings::{KeyBindings, KeyCombo, KeyScope};
use crate::node::NodeId;
use crate::tree::Tree;

impl Tree {
    /// Registers the handler run for `command` on `node`, replacing any
    /// earlier one.
    pub fn add_command<F>(&mut self, node: NodeId, command: Command, handler: F) -> Result<()>
    where
        F: FnMut(&mut Tree, NodeId) -> Option<bool> + 'static,
    {
        self.node_mut(node)?
            .commands
            .insert(command, Box::new(handler));
        Ok(())
    }

    /// Binds `combo` to an ordered list of commands.
    pub fn bind_key<I>(&mut self, node: NodeId, combo: KeyCombo, scope: KeyScope, commands: I) -> Result<()>
    where
        I: IntoIterator<Item = Command>,
    {
        self.node_mut(node)?.bindings.set(combo, scope, commands);
        Ok(())
    }

    /// Runs `command` on `node`. `None` when the node has no handler or the
    /// handler reports the command does not apply.
    pub fn invoke_command(&mut self, node: NodeId, command: Command) -> Option<bool> {
        let mut handler = self.nodes.get_mut(node)?.commands.remove(&command)?;
        let result = handler(self, node);
        if let Some(n) = self.nodes.get_mut(node) {
            n.commands.entry(command).or_insert(handler);
        }
        trace!(node = ?node, %command, ?result, "command invoked");
        result
    }

    /// Tries the commands bound to `key` in order until one applies.
    pub fn invoke_key_bindings(&mut self, node: NodeId, key: &KeyEvent, scope: KeyScope) -> bool {
        let Some(commands) = self
            .nodes
            .get(node)
            .and_then(|n| n.bindings.commands_for(key, scope))
            .map(<[Command]>::to_vec)
        else {
            return false;
        };
        for command in commands {
            let registered = self
                .nodes
                .get(node)
                .is_some_and(|n| n.commands.contains_key(&command));
            if !registered {
                warn!(node = ?node, %command, "key bound to a command with no handler");
                continue;
            }
            if let Some(handled) = self.invoke_command(node, command) {
                return handled;
            }
        }
        false
    }

    /// Normal phase: key-press observers, then the focused child, then the
    /// node's widget, then its key bindings.
    pub fn process_key(&mut self, node: NodeId, key: &KeyEvent) -> bool {
        let (focused, enabled) = match self.nodes.get(node) {
            Some(n) => (n.focused, n.enabled && n.visible),
            None => return false,
        };
        if !enabled {
            return false;
        }
        if self
            .nodes
            .get_mut(node)
            .is_some_and(|n| n.hooks.key_press.emit(key))
        {
            return true;
        }
        if let Some(child) = focused
            && self.process_key(child, key)
        {
            return true;
        }
        if self
            .nodes
            .get_mut(node)
            .and_then(|n| n.widget.as_mut())
            .is_some_and(|w| w.on_key(key))
        {
            return true;
        }
        self.invoke_key_bindings(node, key, KeyScope::Focused)
    }

    /// Offers the key to every visible, enabled node below `node`,
    /// depth first, whether focused or not.
    pub fn process_hot_key(&mut self, node: NodeId, key: &KeyEvent) -> bool {
        self.broadcast(node, key, KeyScope::HotKey)
    }

    /// Like [`Tree::process_hot_key`], for keys nobody handled.
    pub fn process_cold_key(&mut self, node: NodeId, key: &KeyEvent) -> bool {
        self.broadcast(node, key, KeyScope::ColdKey)
    }

    fn broadcast(&mut self, node: NodeId, key: &KeyEvent, scope: KeyScope) -> bool {
        let children = match self.nodes.get_mut(node) {
            Some(n) if n.visible && n.enabled => {
                let by_widget = n.widget.as_mut().is_some_and(|w| match scope {
                    KeyScope::ColdKey => w.on_cold_key(key),
                    _ => w.on_hot_key(key),
                });
                if by_widget {
                    return true;
                }
                n.children.clone()
            }
            _ => return false,
        };
        if self.invoke_key_bindings(node, key, scope) {
            return true;
        }
        children
            .into_iter()
            .any(|child| self.broadcast(child, key, scope))
    }

    /// Runs all three key phases from `top`.
    pub fn dispatch_key(&mut self, top: NodeId, key: &KeyEvent) -> bool {
        let handled = self.process_hot_key(top, key)
            || self.process_key(top, key)
            || self.process_cold_key(top, key);
        trace!(top = ?top, code = ?key.code, handled, "key dispatched");
        handled
    }

    /// Binds Tab/BackTab and the arrow keys on `top` to focus navigation.
    /// Tab wraps around at this level; arrows only apply when focus moved.
    pub fn install_navigation(&mut self, top: NodeId) -> Result<()> {
        self.node_mut(top)?.bindings.merge(KeyBindings::navigation());
        self.add_command(top, Command::NextView, |tree, node| {
            Some(tree.focus_next(node).unwrap_or(false) || tree.focus_first(node).unwrap_or(false))
        })?;
        self.add_command(top, Command::PreviousView, |tree, node| {
            Some(tree.focus_prev(node).unwrap_or(false) || tree.focus_last(node).unwrap_or(false))
        })?;
        for (command, heading) in [
            (Command::FocusLeft, Heading::Left),
            (Command::FocusRight, Heading::Right),
            (Command::FocusUp, Heading::Up),
            (Command::FocusDown, Heading::Down),
        ] {
            self.add_command(top, command, move |tree, node| {
                tree.focus_direction(node, heading)
                    .unwrap_or(false)
                    .then_some(true)
            })?;
        }
        Ok(())
    }

    /// Routes a mouse event from the screen to the node that should see it.
    pub fn dispatch_mouse(&mut self, top: NodeId, event: &MouseEvent) -> bool {
        let target = match self.runtime.mouse_grab() {
            Some(grab) if self.contains(grab) => Some(grab),
            _ => self.find_deepest(top, event.column, event.row),
        };
        let released = matches!(event.kind, MouseEventKind::Up(_));
        let Some(target) = target else {
            if released {
                self.runtime.release_mouse();
            }
            return false;
        };
        if !self.nodes.get(target).is_some_and(|n| n.enabled) {
            if released {
                self.runtime.release_mouse();
            }
            return false;
        }

        let (col, row) = self
            .screen_to_view(target, i32::from(event.column), i32::from(event.row))
            .unwrap_or((0, 0));
        let local = MouseEvent {
            column: u16::try_from(col.max(0)).unwrap_or(u16::MAX),
            row: u16::try_from(row.max(0)).unwrap_or(u16::MAX),
            ..*event
        };

        if matches!(event.kind, MouseEventKind::Down(_))
            && self.nodes.get(target).is_some_and(|n| n.can_focus && !n.has_focus)
        {
            let focused = self.focus(target).unwrap_or(false);
            debug!(node = ?target, focused, "click to focus");
        }

        let reply = match self.nodes.get_mut(target) {
            Some(n) => {
                if n.hooks.mouse.emit(&local) {
                    MouseReply::Handled
                } else {
                    n.widget
                        .as_mut()
                        .map_or(MouseReply::Ignored, |w| w.on_mouse(&local))
                }
            }
            None => MouseReply::Ignored,
        };
        match reply {
            MouseReply::Grab => self.runtime.grab_mouse(target),
            MouseReply::Release if self.runtime.mouse_grab() == Some(target) => {
                self.runtime.release_mouse();
            }
            _ => {}
        }
        if released {
            self.runtime.release_mouse();
        }
        trace!(node = ?target, col = local.column, row = local.row, ?reply, "mouse dispatched");
        reply.handled()
    }

    /// Fans a terminal event out to the key, mouse and resize paths.
    pub fn dispatch_event(&mut self, top: NodeId, event: &Event) -> bool {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => self.dispatch_key(top, key),
            Event::Mouse(mouse) => self.dispatch_mouse(top, mouse),
            Event::Resize(_, _) => self.set_needs_layout(top).is_ok(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component_context::DrawContext;
    use crate::components::{Drawable, Focusable, KeyHandled, MouseHandled};
    use crate::node::Node;
    use crate::ui::Canvas;
    use crossterm::event::{KeyCode, KeyModifiers, MouseButton};
    use ratatui::layout::Rect;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    struct Recorder {
        name: &'static str,
        log: Log,
        key_result: bool,
        hot: bool,
        cold: bool,
        reply: MouseReply,
    }

    impl Recorder {
        fn new(name: &'static str, log: &Log) -> Self {
            Self {
                name,
                log: log.clone(),
                key_result: false,
                hot: false,
                cold: false,
                reply: MouseReply::Handled,
            }
        }
    }

    impl Drawable for Recorder {
        fn draw(&mut self, _canvas: &mut Canvas<'_>, _ctx: &DrawContext) {}
    }
    impl Focusable for Recorder {}
    impl KeyHandled for Recorder {
        fn on_key(&mut self, _key: &KeyEvent) -> bool {
            self.log.borrow_mut().push(format!("{}:key", self.name));
            self.key_result
        }
        fn on_hot_key(&mut self, _key: &KeyEvent) -> bool {
            self.log.borrow_mut().push(format!("{}:hot", self.name));
            self.hot
        }
        fn on_cold_key(&mut self, _key: &KeyEvent) -> bool {
            self.log.borrow_mut().push(format!("{}:cold", self.name));
            self.cold
        }
    }
    impl MouseHandled for Recorder {
        fn on_mouse(&mut self, event: &MouseEvent) -> MouseReply {
            self.log
                .borrow_mut()
                .push(format!("{}:mouse@{},{}", self.name, event.column, event.row));
            self.reply
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    #[test]
    fn first_applicable_bound_command_wins() {
        let mut tree = Tree::new();
        let node = tree.insert(Node::new("n"));
        let calls = Rc::new(RefCell::new(Vec::new()));
        let a = Command::Custom("a");
        let b = Command::Custom("b");
        let c = Command::Custom("c");
        for (command, result) in [(a, None), (b, Some(true)), (c, Some(true))] {
            let calls = calls.clone();
            tree.add_command(node, command, move |_, _| {
                calls.borrow_mut().push(command);
                result
            })
            .unwrap();
        }
        let combo = KeyCombo::plain(KeyCode::Enter);
        tree.bind_key(node, combo, KeyScope::Focused, [a, b, c]).unwrap();
        assert!(tree.process_key(node, &key(KeyCode::Enter)));
        assert_eq!(*calls.borrow(), vec![a, b]);

        calls.borrow_mut().clear();
        tree.bind_key(node, combo, KeyScope::Focused, [a]).unwrap();
        assert!(!tree.process_key(node, &key(KeyCode::Enter)));
        assert_eq!(*calls.borrow(), vec![a]);
        // Handlers survive being invoked.
        assert_eq!(tree.invoke_command(node, b), Some(true));
        assert_eq!(tree.invoke_command(node, Command::Accept), None);
    }

    #[test]
    fn normal_phase_order_is_observers_child_widget_bindings() {
        let mut tree = Tree::new();
        let log: Log = Rc::default();
        let top = tree.insert(Node::new("top").with_widget(Recorder::new("top", &log)));
        let child = tree.insert(
            Node::new("child")
                .focusable(true)
                .with_widget(Recorder::new("child", &log)),
        );
        tree.add(top, child).unwrap();
        tree.focus(child).unwrap();
        let bound = log.clone();
        tree.add_command(top, Command::Accept, move |_, _| {
            bound.borrow_mut().push("top:binding".into());
            Some(true)
        })
        .unwrap();
        tree.bind_key(top, KeyCode::Enter.into(), KeyScope::Focused, [Command::Accept])
            .unwrap();

        assert!(tree.process_key(top, &key(KeyCode::Enter)));
        assert_eq!(*log.borrow(), vec!["child:key", "top:key", "top:binding"]);

        log.borrow_mut().clear();
        let observed = log.clone();
        tree.hooks_mut(top).unwrap().key_press.subscribe(move |_| {
            observed.borrow_mut().push("top:observer".into());
            true
        });
        assert!(tree.process_key(top, &key(KeyCode::Enter)));
        assert_eq!(*log.borrow(), vec!["top:observer"]);
    }

    #[test]
    fn hot_and_cold_phases_reach_unfocused_nodes() {
        let mut tree = Tree::new();
        let log: Log = Rc::default();
        let top = tree.insert(Node::new("top"));
        let focused = tree.insert(
            Node::new("focused")
                .focusable(true)
                .with_widget(Recorder::new("focused", &log)),
        );
        let mut menu = Recorder::new("menu", &log);
        menu.cold = true;
        let menu = tree.insert(Node::new("menu").with_widget(menu));
        let hidden = tree.insert(Node::new("hidden").visible(false).with_widget(Recorder::new("hidden", &log)));
        tree.add(top, focused).unwrap();
        tree.add(top, menu).unwrap();
        tree.add(top, hidden).unwrap();
        tree.focus(focused).unwrap();

        assert!(tree.dispatch_key(top, &key(KeyCode::F(10))));
        assert_eq!(
            *log.borrow(),
            vec![
                "focused:hot",
                "menu:hot",
                "focused:key",
                "focused:cold",
                "menu:cold"
            ]
        );
    }

    #[test]
    fn hot_key_binding_short_circuits_normal_phase() {
        let mut tree = Tree::new();
        let log: Log = Rc::default();
        let top = tree.insert(Node::new("top"));
        let focused = tree.insert(
            Node::new("focused")
                .focusable(true)
                .with_widget(Recorder::new("focused", &log)),
        );
        let shortcut = tree.insert(Node::new("shortcut"));
        tree.add(top, focused).unwrap();
        tree.add(top, shortcut).unwrap();
        tree.focus(focused).unwrap();
        tree.add_command(shortcut, Command::HotKey, |_, _| Some(true)).unwrap();
        tree.bind_key(
            shortcut,
            KeyCombo::new(KeyCode::Char('s'), KeyModifiers::ALT),
            KeyScope::HotKey,
            [Command::HotKey],
        )
        .unwrap();
        let alt_s = KeyEvent::new(KeyCode::Char('s'), KeyModifiers::ALT);
        assert!(tree.dispatch_key(top, &alt_s));
        assert_eq!(*log.borrow(), vec!["focused:hot"]);
    }

    #[test]
    fn tab_wraps_at_top_level_and_backtab_reverses() {
        let mut tree = Tree::new();
        let top = tree.insert(Node::new("top").with_frame(Rect::new(0, 0, 20, 2)));
        let ids: Vec<NodeId> = (0..3)
            .map(|i| {
                let id = tree.insert(
                    Node::new(format!("b{i}"))
                        .with_frame(Rect::new(i * 5, 0, 4, 1))
                        .focusable(true),
                );
                tree.add(top, id).unwrap();
                id
            })
            .collect();
        tree.install_navigation(top).unwrap();
        tree.focus(top).unwrap();
        assert_eq!(tree.focused_child(top), Some(ids[0]));
        let tab = Event::Key(key(KeyCode::Tab));
        assert!(tree.dispatch_event(top, &tab));
        assert!(tree.dispatch_event(top, &tab));
        assert_eq!(tree.focused_child(top), Some(ids[2]));
        assert!(tree.dispatch_event(top, &tab));
        assert_eq!(tree.focused_child(top), Some(ids[0]));
        let back = Event::Key(KeyEvent::new(KeyCode::BackTab, KeyModifiers::SHIFT));
        assert!(tree.dispatch_event(top, &back));
        assert_eq!(tree.focused_child(top), Some(ids[2]));
        assert!(tree.dispatch_event(top, &Event::Key(key(KeyCode::Left))));
        assert_eq!(tree.focused_child(top), Some(ids[1]));
        // Nothing further up: the arrow is not applicable.
        assert!(!tree.dispatch_event(top, &Event::Key(key(KeyCode::Up))));
    }

    #[test]
    fn click_focuses_and_receives_local_coordinates() {
        let mut tree = Tree::new();
        let log: Log = Rc::default();
        let top = tree.insert(Node::new("top").with_frame(Rect::new(0, 0, 20, 10)));
        let panel = tree.insert(Node::new("panel").with_frame(Rect::new(2, 2, 10, 5)));
        let button = tree.insert(
            Node::new("button")
                .with_frame(Rect::new(3, 1, 4, 1))
                .focusable(true)
                .with_widget(Recorder::new("button", &log)),
        );
        tree.add(top, panel).unwrap();
        tree.add(panel, button).unwrap();

        let down = mouse(MouseEventKind::Down(MouseButton::Left), 6, 3);
        assert!(tree.dispatch_mouse(top, &down));
        assert!(tree.has_focus(button));
        assert_eq!(tree.most_focused(top), Some(button));
        assert_eq!(*log.borrow(), vec!["button:mouse@1,0"]);
        // Outside every child: lands on the top node, which has no widget.
        assert!(!tree.dispatch_mouse(top, &mouse(MouseEventKind::Moved, 19, 9)));
        assert!(!tree.dispatch_mouse(top, &mouse(MouseEventKind::Moved, 30, 30)));
    }

    #[test]
    fn grab_routes_drags_until_button_release() {
        let mut tree = Tree::new();
        let log: Log = Rc::default();
        let top = tree.insert(Node::new("top").with_frame(Rect::new(0, 0, 20, 10)));
        let mut handle = Recorder::new("handle", &log);
        handle.reply = MouseReply::Grab;
        let handle = tree.insert(Node::new("handle").with_frame(Rect::new(5, 5, 2, 1)).with_widget(handle));
        let other = tree.insert(
            Node::new("other")
                .with_frame(Rect::new(0, 0, 4, 4))
                .with_widget(Recorder::new("other", &log)),
        );
        tree.add(top, handle).unwrap();
        tree.add(top, other).unwrap();

        assert!(tree.dispatch_mouse(top, &mouse(MouseEventKind::Down(MouseButton::Left), 5, 5)));
        assert_eq!(tree.runtime().mouse_grab(), Some(handle));
        assert!(tree.dispatch_mouse(top, &mouse(MouseEventKind::Drag(MouseButton::Left), 1, 1)));
        assert!(tree.dispatch_mouse(top, &mouse(MouseEventKind::Up(MouseButton::Left), 7, 6)));
        assert_eq!(tree.runtime().mouse_grab(), None);
        assert!(tree.dispatch_mouse(top, &mouse(MouseEventKind::Moved, 1, 1)));
        assert_eq!(
            *log.borrow(),
            vec![
                "handle:mouse@0,0",
                "handle:mouse@0,0",
                "handle:mouse@2,1",
                "other:mouse@1,1"
            ]
        );
    }

    #[test]
    fn mouse_observers_run_before_the_widget() {
        let mut tree = Tree::new();
        let log: Log = Rc::default();
        let top = tree.insert(Node::new("top").with_frame(Rect::new(0, 0, 10, 10)));
        let pad = tree.insert(
            Node::new("pad")
                .with_frame(Rect::new(2, 2, 4, 4))
                .with_widget(Recorder::new("pad", &log)),
        );
        tree.add(top, pad).unwrap();
        let seen = log.clone();
        tree.hooks_mut(pad).unwrap().mouse.subscribe(move |event| {
            seen.borrow_mut()
                .push(format!("hook@{},{}", event.column, event.row));
            event.row == 0
        });

        assert!(tree.dispatch_mouse(top, &mouse(MouseEventKind::Moved, 3, 2)));
        assert!(tree.dispatch_mouse(top, &mouse(MouseEventKind::Moved, 3, 3)));
        assert_eq!(*log.borrow(), vec!["hook@1,0", "hook@1,1", "pad:mouse@1,1"]);
    }

    #[test]
    fn clicks_on_disabled_nodes_are_refused() {
        let mut tree = Tree::new();
        let log: Log = Rc::default();
        let top = tree.insert(Node::new("top").with_frame(Rect::new(0, 0, 10, 10)));
        let off = tree.insert(
            Node::new("off")
                .with_frame(Rect::new(0, 0, 5, 5))
                .focusable(true)
                .enabled(false)
                .with_widget(Recorder::new("off", &log)),
        );
        tree.add(top, off).unwrap();
        assert!(!tree.dispatch_mouse(top, &mouse(MouseEventKind::Down(MouseButton::Left), 1, 1)));
        assert!(!tree.has_focus(off));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn resize_requests_layout() {
        let mut tree = Tree::new();
        let top = tree.insert(Node::new("top"));
        tree.node_mut(top).unwrap().layout_needed = false;
        assert!(tree.dispatch_event(top, &Event::Resize(80, 24)));
        assert!(tree.node(top).unwrap().layout_needed());
    }
}
