use std::fmt;

/// Abstract operation a node can perform, independent of the key that
/// triggers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    // Cursor / selection movement
    LineUp,
    LineDown,
    Left,
    Right,
    PageUp,
    PageDown,
    TopHome,
    BottomEnd,
    // Activation
    Accept,
    Cancel,
    HotKey,
    ToggleSelection,
    // Focus/tab navigation
    NextView,
    PreviousView,
    FocusLeft,
    FocusRight,
    FocusUp,
    FocusDown,
    /// Application-defined command.
    Custom(&'static str),
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Command::LineUp => "Line up",
            Command::LineDown => "Line down",
            Command::Left => "Left",
            Command::Right => "Right",
            Command::PageUp => "Page up",
            Command::PageDown => "Page down",
            Command::TopHome => "Top / home",
            Command::BottomEnd => "Bottom / end",
            Command::Accept => "Accept",
            Command::Cancel => "Cancel",
            Command::HotKey => "Hot key",
            Command::ToggleSelection => "Toggle selection / space",
            Command::NextView => "Focus next (Tab)",
            Command::PreviousView => "Focus previous (BackTab)",
            Command::FocusLeft => "Focus left",
            Command::FocusRight => "Focus right",
            Command::FocusUp => "Focus up",
            Command::FocusDown => "Focus down",
            Command::Custom(name) => *name,
        };
        write!(f, "{}", s)
    }
}
