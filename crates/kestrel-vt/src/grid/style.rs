//! Cell colors and SGR attributes.
//!
//! Colors follow the standard terminal hierarchy: default → 256-color
//! palette → 24-bit RGB. Snapshot consumers get colors resolved to packed
//! RGBA using the xterm default palette.

use bitflags::bitflags;

/// Color of a cell's foreground or background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    /// Terminal default (SGR 39 / SGR 49).
    #[default]
    Default,
    /// 256-color palette index. Indices 0-15 are the named ANSI colors.
    Indexed(u8),
    /// 24-bit true color.
    Rgb(u8, u8, u8),
}

impl Color {
    /// Resolve an ANSI 256-color index to RGB (xterm defaults).
    ///
    /// - 0-7: standard colors
    /// - 8-15: bright colors
    /// - 16-231: 6×6×6 color cube
    /// - 232-255: grayscale ramp (dark to light)
    #[must_use]
    pub const fn ansi_256_rgb(index: u8) -> (u8, u8, u8) {
        const ANSI_16: [(u8, u8, u8); 16] = [
            (0, 0, 0),       // 0: Black
            (205, 0, 0),     // 1: Red
            (0, 205, 0),     // 2: Green
            (205, 205, 0),   // 3: Yellow
            (0, 0, 238),     // 4: Blue
            (205, 0, 205),   // 5: Magenta
            (0, 205, 205),   // 6: Cyan
            (229, 229, 229), // 7: White
            (127, 127, 127), // 8: Bright Black (Gray)
            (255, 0, 0),     // 9: Bright Red
            (0, 255, 0),     // 10: Bright Green
            (255, 255, 0),   // 11: Bright Yellow
            (92, 92, 255),   // 12: Bright Blue
            (255, 0, 255),   // 13: Bright Magenta
            (0, 255, 255),   // 14: Bright Cyan
            (255, 255, 255), // 15: Bright White
        ];

        if index < 16 {
            ANSI_16[index as usize]
        } else if index < 232 {
            // 6×6×6 cube: 16 + 36r + 6g + b with r,g,b in [0,5]
            let idx = index - 16;
            let r = if idx / 36 == 0 { 0 } else { 55 + (idx / 36) * 40 };
            let g = if (idx % 36) / 6 == 0 {
                0
            } else {
                55 + ((idx % 36) / 6) * 40
            };
            let b = if idx % 6 == 0 { 0 } else { 55 + (idx % 6) * 40 };
            (r, g, b)
        } else {
            let gray = 8 + (index - 232) * 10;
            (gray, gray, gray)
        }
    }

    /// Pack this color as `0xAARRGGBB` for snapshot consumers.
    ///
    /// The default color resolves to `default_rgba`, letting foreground and
    /// background pick different fallbacks (opaque white vs. transparent).
    #[must_use]
    pub const fn to_rgba(self, default_rgba: u32) -> u32 {
        match self {
            Color::Default => default_rgba,
            Color::Indexed(i) => {
                let (r, g, b) = Self::ansi_256_rgb(i);
                0xFF00_0000 | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
            }
            Color::Rgb(r, g, b) => {
                0xFF00_0000 | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
            }
        }
    }
}

bitflags! {
    /// SGR text attribute flags.
    ///
    /// Maps directly to the ECMA-48 / VT100 SGR parameter values.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StyleAttrs: u16 {
        const BOLD             = 1 << 0;
        const DIM              = 1 << 1;
        const ITALIC           = 1 << 2;
        const UNDERLINE        = 1 << 3;
        const DOUBLE_UNDERLINE = 1 << 4;
        const CURLY_UNDERLINE  = 1 << 5;
        const BLINK            = 1 << 6;
        const INVERSE          = 1 << 7;
        const HIDDEN           = 1 << 8;
        const STRIKE           = 1 << 9;
        const OVERLINE         = 1 << 10;
    }
}

impl StyleAttrs {
    /// Mask covering every underline variant.
    pub const ANY_UNDERLINE: StyleAttrs = StyleAttrs::UNDERLINE
        .union(StyleAttrs::DOUBLE_UNDERLINE)
        .union(StyleAttrs::CURLY_UNDERLINE);
}

/// Rendition state stamped on written cells: colors plus attribute flags.
///
/// The interpreter keeps one running `Style` mutated by SGR sequences; each
/// printed character copies the current value into its cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Style {
    /// Foreground color.
    pub fg: Color,
    /// Background color.
    pub bg: Color,
    /// Attribute flags.
    pub attrs: StyleAttrs,
}

impl Style {
    /// Reset to the default rendition (SGR 0).
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
