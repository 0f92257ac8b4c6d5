//! Terminal cell: the fundamental unit of the grid.
//!
//! Each cell stores a short text run (base character plus combining marks),
//! its display width, rendition, and an optional hyperlink tag. Wide glyphs
//! occupy two cells: a width-2 lead carrying the text and a width-0 spacer
//! to its right with empty text. The width field — not a separate cell kind —
//! distinguishes the three shapes, which keeps the grid a uniform array.

use smallvec::SmallVec;
use unicode_width::UnicodeWidthChar;

use super::style::Style;
use crate::link::LinkTag;

/// Maximum combining marks attached to one cell.
///
/// Bounds per-cell memory against hostile streams of combining marks.
pub const MAX_COMBINING: usize = 4;

/// One grid position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    /// Base character. Blank cells hold a space.
    ch: char,
    /// Zero-width combining marks following the base character.
    combining: SmallVec<[char; 2]>,
    /// Display width in columns: 0 (wide spacer), 1, or 2 (wide lead).
    width: u8,
    /// Rendition stamped when the cell was written.
    pub style: Style,
    /// Hyperlink tag (0 = none), resolved through the session link table.
    pub link: LinkTag,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            combining: SmallVec::new(),
            width: 1,
            style: Style::default(),
            link: 0,
        }
    }
}

impl Cell {
    /// Create a narrow cell with the given character and rendition.
    #[must_use]
    pub fn new(ch: char, style: Style, link: LinkTag) -> Self {
        Self {
            ch,
            combining: SmallVec::new(),
            width: 1,
            style,
            link,
        }
    }

    /// Create a wide (2-column) cell pair: `(lead, spacer)`.
    ///
    /// The lead carries the glyph; the spacer is width 0 with empty text.
    #[must_use]
    pub fn wide(ch: char, style: Style, link: LinkTag) -> (Self, Self) {
        let lead = Self {
            ch,
            combining: SmallVec::new(),
            width: 2,
            style,
            link,
        };
        let spacer = Self {
            ch: ' ',
            combining: SmallVec::new(),
            width: 0,
            style,
            link,
        };
        (lead, spacer)
    }

    /// A blank cell carrying only a background rendition.
    ///
    /// Used by erase and scroll operations, which fill with the current
    /// background color but reset all other attributes.
    #[must_use]
    pub fn blank(style: Style) -> Self {
        Self {
            ch: ' ',
            combining: SmallVec::new(),
            width: 1,
            style: Style {
                bg: style.bg,
                ..Style::default()
            },
            link: 0,
        }
    }

    /// Base character of this cell.
    #[must_use]
    #[inline]
    pub fn base(&self) -> char {
        self.ch
    }

    /// Combining marks attached to the base character.
    #[must_use]
    #[inline]
    pub fn combining(&self) -> &[char] {
        &self.combining
    }

    /// Display width in columns (0, 1, or 2).
    #[must_use]
    #[inline]
    pub fn width(&self) -> u8 {
        self.width
    }

    /// Whether this is the lead half of a wide pair.
    #[must_use]
    #[inline]
    pub fn is_wide(&self) -> bool {
        self.width == 2
    }

    /// Whether this is the trailing spacer of a wide pair.
    #[must_use]
    #[inline]
    pub fn is_spacer(&self) -> bool {
        self.width == 0
    }

    /// Whether this cell is a plain blank (space, no marks, no link).
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.ch == ' ' && self.combining.is_empty() && self.link == 0 && self.width == 1
    }

    /// Append a combining mark to this cell's text run.
    ///
    /// Marks beyond [`MAX_COMBINING`] are dropped.
    pub fn push_combining(&mut self, mark: char) {
        if self.combining.len() < MAX_COMBINING {
            self.combining.push(mark);
        }
    }

    /// Reset to a blank keeping only the given background.
    pub fn erase(&mut self, style: Style) {
        *self = Cell::blank(style);
    }

    /// Number of UTF-8 bytes this cell's text occupies.
    ///
    /// Spacers report 0 (their text is empty).
    #[must_use]
    pub fn text_len(&self) -> usize {
        if self.is_spacer() {
            return 0;
        }
        self.ch.len_utf8() + self.combining.iter().map(|c| c.len_utf8()).sum::<usize>()
    }

    /// Encode this cell's text into `out`, returning the bytes written.
    ///
    /// Writes nothing if the full run does not fit.
    pub fn encode_text_into(&self, out: &mut [u8]) -> usize {
        let need = self.text_len();
        if need == 0 || out.len() < need {
            return 0;
        }
        let mut at = 0;
        at += self.ch.encode_utf8(&mut out[at..]).len();
        for &mark in &self.combining {
            at += mark.encode_utf8(&mut out[at..]).len();
        }
        at
    }

    /// Approximate heap + inline size of this cell, for scrollback accounting.
    #[must_use]
    pub fn encoded_size(&self) -> usize {
        let spilled = if self.combining.spilled() {
            self.combining.capacity() * std::mem::size_of::<char>()
        } else {
            0
        };
        std::mem::size_of::<Self>() + spilled
    }
}

/// Display width of a printable scalar value: 0, 1, or 2 columns.
///
/// Control characters report 0; they never reach the grid as text.
#[must_use]
#[inline]
pub fn char_width(ch: char) -> u8 {
    match UnicodeWidthChar::width(ch) {
        Some(w) => w.min(2) as u8,
        None => 0,
    }
}
