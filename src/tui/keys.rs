//! Key representation and config-file key names
//!
//! A `Key` pairs a crossterm key code with its modifiers. Config files refer
//! to keys by name (`"q"`, `"ctrl+c"`, `"enter"`); `Key::parse` turns those
//! names into values at startup.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl Key {
    pub fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::NONE,
        }
    }

    pub fn char(c: char) -> Self {
        Self::new(KeyCode::Char(c))
    }

    pub fn ctrl(c: char) -> Self {
        Self {
            code: KeyCode::Char(c),
            modifiers: KeyModifiers::CONTROL,
        }
    }

    pub fn alt(c: char) -> Self {
        Self {
            code: KeyCode::Char(c),
            modifiers: KeyModifiers::ALT,
        }
    }

    /// Normalize a terminal key event into a `Key`.
    ///
    /// Shift is dropped for character keys: the shifted character already
    /// encodes it (`'G'` arrives as `Char('G')` plus SHIFT).
    pub fn from_event(event: KeyEvent) -> Self {
        let mut modifiers = event.modifiers;
        if matches!(event.code, KeyCode::Char(_)) {
            modifiers.remove(KeyModifiers::SHIFT);
        }
        Self {
            code: event.code,
            modifiers,
        }
    }

    /// Parse a config-file key name.
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        let unknown = || ConfigError::UnknownKeyName {
            name: name.to_string(),
        };

        let mut modifiers = KeyModifiers::NONE;
        let mut rest = name;
        loop {
            let lower = rest.to_ascii_lowercase();
            if let Some(tail) = lower.strip_prefix("ctrl+") {
                modifiers |= KeyModifiers::CONTROL;
                rest = &rest[rest.len() - tail.len()..];
            } else if let Some(tail) = lower.strip_prefix("alt+") {
                modifiers |= KeyModifiers::ALT;
                rest = &rest[rest.len() - tail.len()..];
            } else {
                break;
            }
        }

        let code = match rest.to_ascii_lowercase().as_str() {
            "enter" => KeyCode::Enter,
            "esc" | "escape" => KeyCode::Esc,
            "tab" => KeyCode::Tab,
            "space" => KeyCode::Char(' '),
            "backspace" => KeyCode::Backspace,
            "up" => KeyCode::Up,
            "down" => KeyCode::Down,
            "left" => KeyCode::Left,
            "right" => KeyCode::Right,
            "pageup" => KeyCode::PageUp,
            "pagedown" => KeyCode::PageDown,
            "home" => KeyCode::Home,
            "end" => KeyCode::End,
            _ => {
                let mut chars = rest.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => KeyCode::Char(c),
                    _ => return Err(unknown()),
                }
            }
        };

        Ok(Self { code, modifiers })
    }

    /// Human-readable form used in legends and the cheatsheet.
    pub fn label(&self) -> String {
        let base = match self.code {
            KeyCode::Char(' ') => "space".to_string(),
            KeyCode::Char(c) => c.to_string(),
            KeyCode::Enter => "enter".to_string(),
            KeyCode::Esc => "esc".to_string(),
            KeyCode::Tab => "tab".to_string(),
            KeyCode::Backspace => "backspace".to_string(),
            KeyCode::Up => "↑".to_string(),
            KeyCode::Down => "↓".to_string(),
            KeyCode::Left => "←".to_string(),
            KeyCode::Right => "→".to_string(),
            KeyCode::PageUp => "pgup".to_string(),
            KeyCode::PageDown => "pgdn".to_string(),
            other => format!("{other:?}").to_lowercase(),
        };

        let mut label = String::new();
        if self.modifiers.contains(KeyModifiers::CONTROL) {
            label.push_str("ctrl+");
        }
        if self.modifiers.contains(KeyModifiers::ALT) {
            label.push_str("alt+");
        }
        label.push_str(&base);
        label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_char() {
        assert_eq!(Key::parse("q").unwrap(), Key::char('q'));
        assert_eq!(Key::parse("G").unwrap(), Key::char('G'));
    }

    #[test]
    fn test_parse_ctrl_combo() {
        assert_eq!(Key::parse("ctrl+c").unwrap(), Key::ctrl('c'));
        assert_eq!(Key::parse("Ctrl+R").unwrap(), Key::ctrl('R'));
    }

    #[test]
    fn test_parse_named_keys() {
        assert_eq!(Key::parse("enter").unwrap(), Key::new(KeyCode::Enter));
        assert_eq!(Key::parse("esc").unwrap(), Key::new(KeyCode::Esc));
        assert_eq!(Key::parse("space").unwrap(), Key::char(' '));
    }

    #[test]
    fn test_parse_unknown_name_is_config_error() {
        let err = Key::parse("hyper+q").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKeyName { .. }));
    }

    #[test]
    fn test_from_event_strips_shift_on_chars() {
        let event = KeyEvent::new(KeyCode::Char('G'), KeyModifiers::SHIFT);
        assert_eq!(Key::from_event(event), Key::char('G'));
    }

    #[test]
    fn test_label() {
        assert_eq!(Key::char('q').label(), "q");
        assert_eq!(Key::ctrl('c').label(), "ctrl+c");
        assert_eq!(Key::char(' ').label(), "space");
    }
}
