//! Key bindings for the structural editor.
//!
//! Bindings are plain data: [`BINDINGS`] maps a key press to a
//! [`KeyCommand`]. `primary` is Ctrl, or Cmd on macOS; the host decides.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Key {
    Delete,
    Backspace,
    Enter,
    Escape,
    ArrowUp,
    ArrowDown,
    Char(char),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub primary: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        primary: false,
        alt: false,
    };
    pub const SHIFT: Modifiers = Modifiers {
        shift: true,
        primary: false,
        alt: false,
    };
    pub const PRIMARY: Modifiers = Modifiers {
        shift: false,
        primary: true,
        alt: false,
    };
    pub const PRIMARY_SHIFT: Modifiers = Modifiers {
        shift: true,
        primary: true,
        alt: false,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyPress {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyPress {
    pub const fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    pub const fn plain(key: Key) -> Self {
        Self::new(key, Modifiers::NONE)
    }

    /// Letter keys compare case-insensitively; shift is a modifier.
    fn normalized(self) -> Self {
        match self.key {
            Key::Char(c) => Self::new(Key::Char(c.to_ascii_lowercase()), self.modifiers),
            _ => self,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyCommand {
    DeleteSelection,
    SelectAll,
    Copy,
    Cut,
    Paste,
    Undo,
    Redo,
    Duplicate,
    SelectPrevious,
    SelectNext,
    ExtendPrevious,
    ExtendNext,
    /// Commit the inline edit, or begin one.
    Enter,
    /// Cancel the inline edit, else clear the selection, else exit.
    Escape,
}

pub const BINDINGS: &[(KeyPress, KeyCommand)] = &[
    (KeyPress::plain(Key::Delete), KeyCommand::DeleteSelection),
    (KeyPress::plain(Key::Backspace), KeyCommand::DeleteSelection),
    (KeyPress::new(Key::Char('a'), Modifiers::PRIMARY), KeyCommand::SelectAll),
    (KeyPress::new(Key::Char('c'), Modifiers::PRIMARY), KeyCommand::Copy),
    (KeyPress::new(Key::Char('x'), Modifiers::PRIMARY), KeyCommand::Cut),
    (KeyPress::new(Key::Char('v'), Modifiers::PRIMARY), KeyCommand::Paste),
    (KeyPress::new(Key::Char('z'), Modifiers::PRIMARY), KeyCommand::Undo),
    (KeyPress::new(Key::Char('z'), Modifiers::PRIMARY_SHIFT), KeyCommand::Redo),
    (KeyPress::new(Key::Char('y'), Modifiers::PRIMARY), KeyCommand::Redo),
    (KeyPress::new(Key::Char('d'), Modifiers::PRIMARY), KeyCommand::Duplicate),
    (KeyPress::plain(Key::ArrowUp), KeyCommand::SelectPrevious),
    (KeyPress::plain(Key::ArrowDown), KeyCommand::SelectNext),
    (KeyPress::new(Key::ArrowUp, Modifiers::SHIFT), KeyCommand::ExtendPrevious),
    (KeyPress::new(Key::ArrowDown, Modifiers::SHIFT), KeyCommand::ExtendNext),
    (KeyPress::plain(Key::Enter), KeyCommand::Enter),
    (KeyPress::plain(Key::Escape), KeyCommand::Escape),
];

pub fn command_for(press: KeyPress) -> Option<KeyCommand> {
    let press = press.normalized();
    BINDINGS
        .iter()
        .find(|(binding, _)| *binding == press)
        .map(|(_, command)| *command)
}

/// How a click on a node combines with the current selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickMode {
    Replace,
    Toggle,
    Range,
}

impl ClickMode {
    pub fn from_modifiers(modifiers: Modifiers) -> Self {
        if modifiers.shift {
            ClickMode::Range
        } else if modifiers.primary {
            ClickMode::Toggle
        } else {
            ClickMode::Replace
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(
            command_for(KeyPress::new(Key::Char('Z'), Modifiers::PRIMARY_SHIFT)),
            Some(KeyCommand::Redo)
        );
        assert_eq!(
            command_for(KeyPress::new(Key::ArrowDown, Modifiers::SHIFT)),
            Some(KeyCommand::ExtendNext)
        );
        assert_eq!(command_for(KeyPress::plain(Key::Char('q'))), None);
    }

    #[test]
    fn test_no_duplicate_bindings() {
        for (i, (press, _)) in BINDINGS.iter().enumerate() {
            assert!(!BINDINGS[i + 1..].iter().any(|(other, _)| other == press));
        }
    }

    #[test]
    fn test_click_mode() {
        assert_eq!(ClickMode::from_modifiers(Modifiers::PRIMARY), ClickMode::Toggle);
        assert_eq!(ClickMode::from_modifiers(Modifiers::SHIFT), ClickMode::Range);
        assert_eq!(ClickMode::from_modifiers(Modifiers::NONE), ClickMode::Replace);
    }
}
