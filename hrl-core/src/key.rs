use crate::error::{HrlError, HrlResult};
use std::fmt;
use std::str::FromStr;

/// Named button labels shared by every input device.
///
/// The response box buttons are named after the keyboard keys they stand in
/// for, so an experiment script can switch devices without touching its
/// response handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    Space,
    Escape,
    Nothing,
}

impl Key {
    pub fn label(&self) -> &'static str {
        match self {
            Key::Up => "Up",
            Key::Down => "Down",
            Key::Left => "Left",
            Key::Right => "Right",
            Key::Space => "Space",
            Key::Escape => "Escape",
            Key::Nothing => "Nothing",
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Key {
    type Err = HrlError;

    fn from_str(s: &str) -> HrlResult<Self> {
        Ok(match s {
            "Up" => Key::Up,
            "Down" => Key::Down,
            "Left" => Key::Left,
            "Right" => Key::Right,
            "Space" => Key::Space,
            "Escape" => Key::Escape,
            "Nothing" => Key::Nothing,
            other => return Err(HrlError::UnknownKey(other.to_string())),
        })
    }
}

/// Translates raw device codes into [`Key`]s.
pub trait KeyMap: Send + fmt::Debug {
    fn translate(&self, code: u32) -> HrlResult<Key>;
}

/// Colour buttons of the RESPONSEPixx box.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponsePixxMap;

impl KeyMap for ResponsePixxMap {
    fn translate(&self, code: u32) -> HrlResult<Key> {
        Ok(match code {
            0 => Key::Nothing,
            1 => Key::Right,
            2 => Key::Up,
            4 => Key::Left,
            8 => Key::Down,
            16 => Key::Space,
            other => return Err(HrlError::UnknownButtonCode(other)),
        })
    }
}

/// Keyboard key constants as reported by the display toolkit.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyboardMap;

impl KeyboardMap {
    pub const ESCAPE: u32 = 27;
    pub const SPACE: u32 = 32;
    pub const UP: u32 = 273;
    pub const DOWN: u32 = 274;
    pub const RIGHT: u32 = 275;
    pub const LEFT: u32 = 276;
}

impl KeyMap for KeyboardMap {
    fn translate(&self, code: u32) -> HrlResult<Key> {
        Ok(match code {
            Self::ESCAPE => Key::Escape,
            Self::SPACE => Key::Space,
            Self::UP => Key::Up,
            Self::DOWN => Key::Down,
            Self::RIGHT => Key::Right,
            Self::LEFT => Key::Left,
            other => return Err(HrlError::UnknownButtonCode(other)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_box_codes() {
        let map = ResponsePixxMap;
        assert_eq!(map.translate(2).unwrap(), Key::Up);
        assert_eq!(map.translate(16).unwrap(), Key::Space);
        assert_eq!(map.translate(0).unwrap(), Key::Nothing);
        assert!(matches!(
            map.translate(99),
            Err(HrlError::UnknownButtonCode(99))
        ));
    }

    #[test]
    fn keyboard_codes() {
        let map = KeyboardMap;
        assert_eq!(map.translate(276).unwrap(), Key::Left);
        assert_eq!(map.translate(27).unwrap(), Key::Escape);
        assert!(map.translate(2).is_err());
    }

    #[test]
    fn labels_parse_back() {
        for key in [Key::Up, Key::Down, Key::Left, Key::Right, Key::Space] {
            assert_eq!(key.label().parse::<Key>().unwrap(), key);
        }
        assert!("Enter".parse::<Key>().is_err());
    }
}
