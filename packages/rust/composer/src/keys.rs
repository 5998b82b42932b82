//! Keyboard input relevant to the composer: Enter vs Shift+Enter.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Char(char),
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyPress {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    pub fn enter() -> Self {
        Self::new(Key::Enter, Modifiers::default())
    }

    pub fn shift_enter() -> Self {
        Self::new(
            Key::Enter,
            Modifiers {
                shift: true,
                ..Modifiers::default()
            },
        )
    }
}

/// What the composer does with a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Submit,
    InsertNewline,
    /// Not handled by the composer; normal text editing applies.
    Passthrough,
}

/// Plain Enter submits; Shift+Enter inserts a newline.
pub fn classify(press: KeyPress) -> KeyAction {
    match press.key {
        Key::Enter if press.modifiers.shift => KeyAction::InsertNewline,
        Key::Enter => KeyAction::Submit,
        Key::Char(_) | Key::Other => KeyAction::Passthrough,
    }
}
