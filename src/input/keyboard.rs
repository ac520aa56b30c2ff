//! Keyboard shortcuts.
//!
//! | Key                         | Action            |
//! |-----------------------------|-------------------|
//! | Left, PageUp                | previous page     |
//! | Right, PageDown, Space      | next page         |
//! | Home / End                  | first / last page |
//! | `+` `=` / `-` `_` / `0`     | zoom in/out/reset |
//! | F                           | fullscreen        |
//! | T                           | thumbnails        |
//! | C                           | table of contents |
//! | P                           | auto-play         |
//! | Escape                      | exit fullscreen   |

use crate::action::ViewerAction;

/// Keyboard keys the viewer reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Escape,
    Backspace,
    Tab,
    Space,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    PageUp,
    PageDown,
}

impl Key {
    /// Parse a DOM `KeyboardEvent.key` value (also accepts the short arrow names).
    pub fn from_name(name: &str) -> Option<Key> {
        let key = match name {
            "Enter" => Key::Enter,
            "Escape" | "Esc" => Key::Escape,
            "Backspace" => Key::Backspace,
            "Tab" => Key::Tab,
            " " | "Space" | "Spacebar" => Key::Space,
            "ArrowLeft" | "Left" => Key::Left,
            "ArrowRight" | "Right" => Key::Right,
            "ArrowUp" | "Up" => Key::Up,
            "ArrowDown" | "Down" => Key::Down,
            "Home" => Key::Home,
            "End" => Key::End,
            "PageUp" => Key::PageUp,
            "PageDown" => Key::PageDown,
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Char(c),
                    _ => return None,
                }
            }
        };
        Some(key)
    }
}

/// Keyboard modifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl or Cmd held: the browser owns the shortcut.
    fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// State the handler needs to decide whether a key press is for the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyContext {
    /// `enableKeyboard` from the configuration.
    pub enabled: bool,
    /// The viewer has focus.
    pub viewer_focused: bool,
    /// A text input, textarea or select has focus.
    pub input_focused: bool,
    pub fullscreen: bool,
}

impl Default for KeyContext {
    fn default() -> Self {
        Self {
            enabled: true,
            viewer_focused: true,
            input_focused: false,
            fullscreen: false,
        }
    }
}

/// Map a key press to a viewer action. Returns `None` when the key is not handled;
/// the caller only prevents the default browser behaviour on `Some`.
pub fn map_key(key: Key, modifiers: Modifiers, ctx: &KeyContext) -> Option<ViewerAction> {
    if !ctx.enabled || !ctx.viewer_focused {
        return None;
    }
    if key == Key::Escape {
        return ctx.fullscreen.then_some(ViewerAction::ExitFullscreen);
    }
    if ctx.input_focused {
        return None;
    }

    match key {
        Key::Left | Key::PageUp => Some(ViewerAction::PreviousPage),
        Key::Right | Key::PageDown | Key::Space => Some(ViewerAction::NextPage),
        Key::Home => Some(ViewerAction::FirstPage),
        Key::End => Some(ViewerAction::LastPage),
        Key::Char(c) => match c.to_ascii_lowercase() {
            ' ' => Some(ViewerAction::NextPage),
            '+' | '=' => Some(ViewerAction::ZoomIn),
            '-' | '_' => Some(ViewerAction::ZoomOut),
            '0' => Some(ViewerAction::ResetZoom),
            'f' if !modifiers.command() => Some(ViewerAction::ToggleFullscreen),
            't' => Some(ViewerAction::ToggleThumbnails),
            'c' => Some(ViewerAction::ToggleToc),
            'p' if !modifiers.command() => Some(ViewerAction::ToggleAutoPlay),
            _ => None,
        },
        _ => None,
    }
}
