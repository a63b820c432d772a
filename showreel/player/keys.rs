use crate::player::state::ControlError;
use std::str::FromStr;

/// Keyboard shortcuts understood by the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Space,
    K,
    F,
    M,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyAction {
    TogglePlay,
    ToggleFullscreen,
    ToggleMute,
    SeekBackward,
    SeekForward,
    VolumeUp,
    VolumeDown,
}

impl Key {
    pub fn action(self) -> KeyAction {
        match self {
            Key::Space | Key::K => KeyAction::TogglePlay,
            Key::F => KeyAction::ToggleFullscreen,
            Key::M => KeyAction::ToggleMute,
            Key::ArrowLeft => KeyAction::SeekBackward,
            Key::ArrowRight => KeyAction::SeekForward,
            Key::ArrowUp => KeyAction::VolumeUp,
            Key::ArrowDown => KeyAction::VolumeDown,
        }
    }
}

impl FromStr for Key {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            " " | "space" => Ok(Key::Space),
            "k" => Ok(Key::K),
            "f" => Ok(Key::F),
            "m" => Ok(Key::M),
            "left" | "arrowleft" => Ok(Key::ArrowLeft),
            "right" | "arrowright" => Ok(Key::ArrowRight),
            "up" | "arrowup" => Ok(Key::ArrowUp),
            "down" | "arrowdown" => Ok(Key::ArrowDown),
            _ => Err(ControlError::UnknownKey(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_browser_and_short_names() {
        assert_eq!("ArrowLeft".parse::<Key>(), Ok(Key::ArrowLeft));
        assert_eq!("left".parse::<Key>(), Ok(Key::ArrowLeft));
        assert_eq!(" ".parse::<Key>(), Ok(Key::Space));
        assert_eq!("K".parse::<Key>(), Ok(Key::K));
        assert!("q".parse::<Key>().is_err());
    }

    #[test]
    fn space_and_k_both_toggle() {
        assert_eq!(Key::Space.action(), KeyAction::TogglePlay);
        assert_eq!(Key::K.action(), KeyAction::TogglePlay);
        assert_eq!(Key::ArrowDown.action(), KeyAction::VolumeDown);
    }
}
