use crate::constants::{DEFAULT_CANCEL_KEY, DEFAULT_SAVE_KEY};
use crate::region::RegionSurface;
use crate::session::{EditSession, PendingSave};
use crate::toast::Severity;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use unicode_width::UnicodeWidthStr;

pub const HIDE_REFUSED: &str = "Please save or cancel your changes first";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid key combination '{0}'")]
pub struct KeyComboError(String);

/// A key plus modifiers, written like `ctrl+s` or `ctrl+esc`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyCombo {
    pub modifiers: KeyModifiers,
    pub code: KeyCode,
}

impl KeyCombo {
    /// Ctrl combos also accept Super (Cmd); letter keys ignore Shift.
    pub fn matches(&self, key: &KeyEvent) -> bool {
        let same_code = match (self.code, key.code) {
            (KeyCode::Char(a), KeyCode::Char(b)) => a.eq_ignore_ascii_case(&b),
            (a, b) => a == b,
        };
        if !same_code {
            return false;
        }

        let mut mods = key.modifiers;
        if mods.contains(KeyModifiers::SUPER) {
            mods.remove(KeyModifiers::SUPER);
            mods.insert(KeyModifiers::CONTROL);
        }
        if matches!(self.code, KeyCode::Char(_)) {
            mods.remove(KeyModifiers::SHIFT);
        }
        mods == self.modifiers
    }
}

impl FromStr for KeyCombo {
    type Err = KeyComboError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || KeyComboError(s.to_string());
        let lowered = s.trim().to_ascii_lowercase();
        let mut parts: Vec<&str> = lowered.split('+').map(str::trim).collect();
        let key = parts.pop().filter(|k| !k.is_empty()).ok_or_else(err)?;

        let mut modifiers = KeyModifiers::NONE;
        for part in parts {
            modifiers |= match part {
                "ctrl" | "control" => KeyModifiers::CONTROL,
                "alt" | "option" => KeyModifiers::ALT,
                "shift" => KeyModifiers::SHIFT,
                "super" | "cmd" | "meta" => KeyModifiers::CONTROL,
                _ => return Err(err()),
            };
        }

        let code = match key {
            "esc" | "escape" => KeyCode::Esc,
            "enter" | "return" => KeyCode::Enter,
            "tab" => KeyCode::Tab,
            "space" => KeyCode::Char(' '),
            "backspace" => KeyCode::Backspace,
            f if f.starts_with('f') && f.len() > 1 => {
                let n: u8 = f[1..].parse().map_err(|_| err())?;
                KeyCode::F(n)
            }
            c if c.chars().count() == 1 => KeyCode::Char(c.chars().next().ok_or_else(err)?),
            _ => return Err(err()),
        };
        Ok(Self { modifiers, code })
    }
}

impl TryFrom<String> for KeyCombo {
    type Error = KeyComboError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<KeyCombo> for String {
    fn from(combo: KeyCombo) -> Self {
        combo.to_string()
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.contains(KeyModifiers::CONTROL) {
            f.write_str("Ctrl+")?;
        }
        if self.modifiers.contains(KeyModifiers::ALT) {
            f.write_str("Alt+")?;
        }
        if self.modifiers.contains(KeyModifiers::SHIFT) {
            f.write_str("Shift+")?;
        }
        match self.code {
            KeyCode::Esc => f.write_str("Esc"),
            KeyCode::Enter => f.write_str("Enter"),
            KeyCode::Tab => f.write_str("Tab"),
            KeyCode::Backspace => f.write_str("Backspace"),
            KeyCode::Char(' ') => f.write_str("Space"),
            KeyCode::Char(c) => write!(f, "{}", c.to_ascii_uppercase()),
            KeyCode::F(n) => write!(f, "F{n}"),
            other => write!(f, "{other:?}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub save: KeyCombo,
    pub cancel: KeyCombo,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            save: DEFAULT_SAVE_KEY.parse().unwrap_or(KeyCombo {
                modifiers: KeyModifiers::CONTROL,
                code: KeyCode::Char('s'),
            }),
            cancel: DEFAULT_CANCEL_KEY.parse().unwrap_or(KeyCombo {
                modifiers: KeyModifiers::CONTROL,
                code: KeyCode::Esc,
            }),
        }
    }
}

impl KeyBindings {
    pub fn hint(&self) -> String {
        format!("{} to save, {} to cancel", self.save, self.cancel)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolbarButton {
    EditMode,
    Save,
    Cancel,
    Minimize,
    Restore,
}

impl ToolbarButton {
    pub fn label(self) -> &'static str {
        match self {
            ToolbarButton::EditMode => "✎ Edit Mode",
            ToolbarButton::Save => "Save",
            ToolbarButton::Cancel => "Cancel",
            ToolbarButton::Minimize => "−",
            ToolbarButton::Restore => "✎",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ButtonSlot {
    pub button: ToolbarButton,
    pub x_start: usize,
    pub x_end: usize,
}

/// What the app has to do after routing an event.
#[derive(Debug, PartialEq, Eq)]
pub enum Dispatch {
    Handled,
    Ignored,
    /// A validated save that still has to go over the network.
    Save(PendingSave),
}

/// The global toolbar: mode toggle, save, cancel and minimize/restore.
pub struct ToolbarController {
    visible: bool,
    bindings: KeyBindings,
}

impl ToolbarController {
    pub fn new(bindings: KeyBindings) -> Self {
        Self {
            visible: true,
            bindings,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    /// Refused while edit mode is on: the controls must stay reachable.
    pub fn hide_toolbar<S: RegionSurface>(&mut self, session: &mut EditSession<S>) -> bool {
        if session.is_edit_mode() {
            session.toasts_mut().show(HIDE_REFUSED, Severity::Warning);
            return false;
        }
        self.visible = false;
        true
    }

    pub fn show_toolbar(&mut self) {
        self.visible = true;
    }

    pub fn layout<S: RegionSurface>(&self, session: &EditSession<S>) -> Vec<ButtonSlot> {
        let buttons: &[ToolbarButton] = match (self.visible, session.is_edit_mode()) {
            (false, _) => &[ToolbarButton::Restore],
            (true, false) => &[ToolbarButton::EditMode, ToolbarButton::Minimize],
            (true, true) => &[
                ToolbarButton::Save,
                ToolbarButton::Cancel,
                ToolbarButton::Minimize,
            ],
        };

        let mut x = 0;
        buttons
            .iter()
            .map(|button| {
                let width = button.label().width() + 4;
                let slot = ButtonSlot {
                    button: *button,
                    x_start: x,
                    x_end: x + width,
                };
                x += width + 1;
                slot
            })
            .collect()
    }

    pub fn button_at<S: RegionSurface>(&self, session: &EditSession<S>, x: usize) -> Option<ToolbarButton> {
        self.layout(session)
            .into_iter()
            .find(|slot| x >= slot.x_start && x < slot.x_end)
            .map(|slot| slot.button)
    }

    pub fn press<S: RegionSurface>(
        &mut self,
        button: ToolbarButton,
        session: &mut EditSession<S>,
    ) -> Dispatch {
        tracing::debug!(?button, "toolbar button pressed");
        match button {
            ToolbarButton::EditMode => {
                self.visible = true;
                session.toggle_global_mode();
            }
            ToolbarButton::Save => {
                return match session.begin_save() {
                    Ok(pending) => Dispatch::Save(pending),
                    Err(_) => Dispatch::Handled,
                };
            }
            ToolbarButton::Cancel => session.cancel_edit(),
            ToolbarButton::Minimize => {
                self.hide_toolbar(session);
            }
            ToolbarButton::Restore => self.show_toolbar(),
        }
        Dispatch::Handled
    }

    /// Save/cancel shortcuts. Active only in edit mode, and not scoped to
    /// whatever has focus.
    pub fn handle_shortcut<S: RegionSurface>(
        &mut self,
        key: &KeyEvent,
        session: &mut EditSession<S>,
    ) -> Dispatch {
        if !session.is_edit_mode() {
            return Dispatch::Ignored;
        }
        if self.bindings.save.matches(key) {
            self.press(ToolbarButton::Save, session)
        } else if self.bindings.cancel.matches(key) {
            self.press(ToolbarButton::Cancel, session)
        } else {
            Dispatch::Ignored
        }
    }
}
