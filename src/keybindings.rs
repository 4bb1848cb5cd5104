use std::collections::HashMap;
use std::fmt;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::actions::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyCombo {
    pub code: KeyCode,
    pub mods: KeyModifiers,
}

impl KeyCombo {
    pub fn new(code: KeyCode, mods: KeyModifiers) -> Self {
        Self { code, mods }
    }

    pub fn plain(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    /// Chord for an incoming key. Terminals report BackTab with SHIFT held;
    /// the modifier is folded into the code.
    pub fn from_event(key: &KeyEvent) -> Self {
        let mut mods = key.modifiers;
        if key.code == KeyCode::BackTab {
            mods.remove(KeyModifiers::SHIFT);
        }
        Self::new(key.code, mods)
    }

    pub fn matches(&self, key: &KeyEvent) -> bool {
        *self == Self::from_event(key)
    }

    pub fn display(&self) -> String {
        let mut parts = Vec::new();
        if self.mods.contains(KeyModifiers::CONTROL) {
            parts.push("Ctrl".to_string());
        }
        if self.mods.contains(KeyModifiers::SHIFT) {
            parts.push("Shift".to_string());
        }
        if self.mods.contains(KeyModifiers::ALT) {
            parts.push("Alt".to_string());
        }
        let code = match self.code {
            KeyCode::Char(' ') => "Space".to_string(),
            KeyCode::Char(c) => c.to_ascii_uppercase().to_string(),
            KeyCode::Esc => "Esc".to_string(),
            KeyCode::Enter => "Enter".to_string(),
            KeyCode::Tab => "Tab".to_string(),
            KeyCode::BackTab => "BackTab".to_string(),
            KeyCode::Backspace => "Backspace".to_string(),
            KeyCode::Left => "Left".to_string(),
            KeyCode::Right => "Right".to_string(),
            KeyCode::Up => "Up".to_string(),
            KeyCode::Down => "Down".to_string(),
            KeyCode::Home => "Home".to_string(),
            KeyCode::End => "End".to_string(),
            KeyCode::PageUp => "PageUp".to_string(),
            KeyCode::PageDown => "PageDown".to_string(),
            KeyCode::Delete => "Delete".to_string(),
            KeyCode::Insert => "Insert".to_string(),
            KeyCode::F(n) => format!("F{}", n),
            _ => format!("{:?}", self.code),
        };
        parts.push(code);
        parts.join("+")
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

impl From<KeyCode> for KeyCombo {
    fn from(code: KeyCode) -> Self {
        Self::plain(code)
    }
}

/// Dispatch phase in which a binding is consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyScope {
    /// Only while the node is on the focus path (normal phase).
    #[default]
    Focused,
    /// During the hot-key broadcast, regardless of focus.
    HotKey,
    /// During the cold-key broadcast after the normal phase went unhandled.
    ColdKey,
}

/// Chord to ordered-command table for one node.
#[derive(Debug, Clone, Default)]
pub struct KeyBindings {
    map: HashMap<(KeyCombo, KeyScope), Vec<Command>>,
}

impl KeyBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Focus navigation bindings installed on top-level nodes.
    pub fn navigation() -> Self {
        use Command::*;
        let mut kb = Self::new();
        kb.add(KeyCode::Tab.into(), KeyScope::Focused, NextView);
        kb.add(KeyCode::BackTab.into(), KeyScope::Focused, PreviousView);
        kb.add(KeyCode::Left.into(), KeyScope::Focused, FocusLeft);
        kb.add(KeyCode::Right.into(), KeyScope::Focused, FocusRight);
        kb.add(KeyCode::Up.into(), KeyScope::Focused, FocusUp);
        kb.add(KeyCode::Down.into(), KeyScope::Focused, FocusDown);
        kb
    }

    /// Appends `command` to the list bound to `combo`.
    pub fn add(&mut self, combo: KeyCombo, scope: KeyScope, command: Command) {
        self.map.entry((combo, scope)).or_default().push(command);
    }

    /// Replaces whatever `combo` was bound to.
    pub fn set<I>(&mut self, combo: KeyCombo, scope: KeyScope, commands: I)
    where
        I: IntoIterator<Item = Command>,
    {
        self.map.insert((combo, scope), commands.into_iter().collect());
    }

    pub fn remove(&mut self, combo: KeyCombo, scope: KeyScope) -> Option<Vec<Command>> {
        self.map.remove(&(combo, scope))
    }

    pub fn commands_for(&self, key: &KeyEvent, scope: KeyScope) -> Option<&[Command]> {
        self.map
            .get(&(KeyCombo::from_event(key), scope))
            .map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Appends `other`'s commands after any already bound to the same chord.
    pub fn merge(&mut self, other: KeyBindings) {
        for (key, commands) in other.map {
            self.map.entry(key).or_default().extend(commands);
        }
    }

    /// Return the display strings for all combos mapped to `command`.
    pub fn combos_for(&self, command: Command) -> Vec<String> {
        let mut combos: Vec<String> = self
            .map
            .iter()
            .filter(|(_, commands)| commands.contains(&command))
            .map(|((combo, _), _)| combo.display())
            .collect();
        combos.sort();
        combos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_binds_tab_and_backtab() {
        let kb = KeyBindings::navigation();
        let tab = KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE);
        assert_eq!(
            kb.commands_for(&tab, KeyScope::Focused),
            Some(&[Command::NextView][..])
        );
        // BackTab usually arrives with SHIFT held.
        let back = KeyEvent::new(KeyCode::BackTab, KeyModifiers::SHIFT);
        assert_eq!(
            kb.commands_for(&back, KeyScope::Focused),
            Some(&[Command::PreviousView][..])
        );
        assert!(kb.commands_for(&tab, KeyScope::HotKey).is_none());
    }

    #[test]
    fn commands_keep_binding_order() {
        let mut kb = KeyBindings::new();
        let combo = KeyCombo::plain(KeyCode::Down);
        kb.add(combo, KeyScope::Focused, Command::LineDown);
        kb.add(combo, KeyScope::Focused, Command::FocusDown);
        let ev = KeyEvent::new(KeyCode::Down, KeyModifiers::NONE);
        assert_eq!(
            kb.commands_for(&ev, KeyScope::Focused),
            Some(&[Command::LineDown, Command::FocusDown][..])
        );
        assert_eq!(kb.combos_for(Command::FocusDown), vec!["Down".to_string()]);
    }

    #[test]
    fn display_lists_modifiers() {
        let combo = KeyCombo::new(KeyCode::Char('q'), KeyModifiers::CONTROL);
        assert_eq!(combo.to_string(), "Ctrl+Q");
    }
}
