//! Key and data events delivered by the surface.

/// Physical key identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
    /// Backspace
    Backspace,
    /// Enter / Return
    Enter,
    /// A character key, e.g. `Char('v')` for the V key
    Char(char),
    /// Any key the shell does not bind
    Other,
}

/// Whether the key went down or came up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Key pressed
    Down,
    /// Key released
    Up,
}

/// Modifier keys held during a key event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Control key
    pub ctrl: bool,
    /// Alt / Option key
    pub alt: bool,
    /// Shift key
    pub shift: bool,
}

impl Modifiers {
    /// Only the control key.
    pub const CTRL: Modifiers = Modifiers {
        ctrl: true,
        alt: false,
        shift: false,
    };
}

/// A key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// Key identity
    pub code: KeyCode,
    /// Held modifiers
    pub modifiers: Modifiers,
    /// Down or up
    pub action: KeyAction,
}

impl KeyEvent {
    /// A key press without modifiers.
    pub fn down(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::default(),
            action: KeyAction::Down,
        }
    }

    /// A key release without modifiers.
    pub fn up(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::default(),
            action: KeyAction::Up,
        }
    }

    /// The same event with modifiers held.
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// What the shell did with a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// The event was handled or deliberately ignored
    Handled,
    /// Input is blocked; the event was discarded
    Blocked,
    /// The host should read its clipboard and call `on_paste`
    PasteRequested,
}

/// Returns true for characters accepted as typed input.
///
/// Accepts printable ASCII and everything from U+00A0 upwards; control
/// characters are rejected.
pub fn is_printable(ch: char) -> bool {
    matches!(ch, '\u{20}'..='\u{7e}') || ch >= '\u{a0}'
}
