//! Terminal operating modes.
//!
//! A small set of independent flags mutated only by recognized control
//! sequences (DECSET/DECRST, SM/RM, kitty keyboard sequences) and read-only
//! to consumers. Input routing hosts poll these to decide how to encode
//! keyboard and mouse events.

use bitflags::bitflags;

/// Mouse reporting mode (DECSET 1000/1002/1003).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseMode {
    /// No mouse reporting.
    #[default]
    Off,
    /// Button presses and releases only (1000).
    Normal,
    /// Presses, releases, and motion while a button is held (1002).
    ButtonMotion,
    /// All motion regardless of button state (1003).
    AnyMotion,
}

/// Mouse coordinate encoding (DECSET 1005/1006/1016).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseEncoding {
    /// X10-style single-byte coordinates.
    #[default]
    Legacy,
    /// UTF-8 extended coordinates (1005).
    Utf8,
    /// SGR encoding (1006).
    Sgr,
    /// SGR with pixel coordinates (1016).
    SgrPixel,
}

bitflags! {
    /// Kitty keyboard protocol progressive-enhancement flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct KittyKeyboardFlags: u8 {
        const DISAMBIGUATE_ESCAPES = 1 << 0;
        const REPORT_EVENT_TYPES   = 1 << 1;
        const REPORT_ALTERNATES    = 1 << 2;
        const REPORT_ALL_KEYS      = 1 << 3;
        const REPORT_ASSOCIATED    = 1 << 4;
    }
}

/// Maximum depth of the kitty keyboard flag stack.
///
/// Pushes beyond this drop the oldest entry.
const KITTY_STACK_MAX: usize = 8;

/// All terminal operating modes for one session.
#[derive(Debug, Clone)]
pub struct ModeState {
    /// Alternate screen active (DECSET 47/1047/1049).
    pub alt_screen: bool,
    /// Bracketed paste (DECSET 2004).
    pub bracketed_paste: bool,
    /// Autowrap at the right margin (DECAWM, default on).
    pub autowrap: bool,
    /// Insert mode (SM 4): printing shifts the tail right.
    pub insert: bool,
    /// Cursor visible (DECTCEM, default on).
    pub cursor_visible: bool,
    /// Application keypad (DECKPAM/DECKPNM).
    pub application_keypad: bool,
    /// Mouse reporting mode.
    pub mouse_mode: MouseMode,
    /// Mouse coordinate encoding.
    pub mouse_encoding: MouseEncoding,
    /// Active kitty keyboard flags.
    pub kitty_keyboard: KittyKeyboardFlags,
    /// Saved kitty flag states (CSI > u push / CSI < u pop).
    kitty_stack: Vec<KittyKeyboardFlags>,
}

impl Default for ModeState {
    fn default() -> Self {
        Self {
            alt_screen: false,
            bracketed_paste: false,
            autowrap: true,
            insert: false,
            cursor_visible: true,
            application_keypad: false,
            mouse_mode: MouseMode::Off,
            mouse_encoding: MouseEncoding::Legacy,
            kitty_keyboard: KittyKeyboardFlags::empty(),
            kitty_stack: Vec::new(),
        }
    }
}

impl ModeState {
    /// Fresh default mode state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any mouse reporting mode is active.
    #[must_use]
    pub fn mouse_enabled(&self) -> bool {
        self.mouse_mode != MouseMode::Off
    }

    /// Whether the mouse encoding is SGR or SGR-pixel.
    #[must_use]
    pub fn mouse_sgr(&self) -> bool {
        matches!(
            self.mouse_encoding,
            MouseEncoding::Sgr | MouseEncoding::SgrPixel
        )
    }

    /// Whether motion events are reported (button-motion or any-motion).
    #[must_use]
    pub fn mouse_motion(&self) -> bool {
        matches!(
            self.mouse_mode,
            MouseMode::ButtonMotion | MouseMode::AnyMotion
        )
    }

    /// Whether all motion is reported regardless of button state.
    #[must_use]
    pub fn mouse_any_motion(&self) -> bool {
        self.mouse_mode == MouseMode::AnyMotion
    }

    /// Push the current kitty flags and activate `flags` (CSI > flags u).
    pub fn kitty_push(&mut self, flags: KittyKeyboardFlags) {
        if self.kitty_stack.len() == KITTY_STACK_MAX {
            self.kitty_stack.remove(0);
        }
        self.kitty_stack.push(self.kitty_keyboard);
        self.kitty_keyboard = flags;
    }

    /// Pop `n` kitty flag states (CSI < n u). Popping past the bottom of the
    /// stack leaves all flags cleared.
    pub fn kitty_pop(&mut self, n: u16) {
        for _ in 0..n.max(1) {
            match self.kitty_stack.pop() {
                Some(flags) => self.kitty_keyboard = flags,
                None => {
                    self.kitty_keyboard = KittyKeyboardFlags::empty();
                    break;
                }
            }
        }
    }

    /// Reset every mode to its default (RIS).
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
