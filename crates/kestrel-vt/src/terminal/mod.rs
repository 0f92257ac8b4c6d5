//! Terminal session: the sequence interpreter over grid state.
//!
//! [`Terminal`] owns the parser, both screens, the scrollback, the
//! hyperlink table, and the mode flags. Bytes go in through [`Terminal::feed`];
//! every effect is applied synchronously before it returns. Replies (status
//! reports) go out through an optional writer callback, host notifications
//! (title, clipboard, bell) through an optional [`EventSink`]. With neither
//! installed the corresponding effects are dropped, never buffered.
//!
//! The session is single-threaded by contract: the host serializes reads
//! against `feed`/`resize`. Callbacks run synchronously and must not
//! re-enter the session.

use std::fmt::Write as _;

use tracing::{debug, trace};

use crate::grid::{char_width, Cell, Color, Grid, Row, Style, StyleAttrs};
use crate::link::{HyperlinkTable, LinkTag};
use crate::modes::{KittyKeyboardFlags, ModeState, MouseEncoding, MouseMode};
use crate::parser::{ActionSink, Parser};
use crate::scrollback::Scrollback;

/// Default history budget when none is configured.
pub const DEFAULT_SCROLLBACK_BYTES: usize = 2 * 1024 * 1024;

/// Packed RGBA used for the default foreground in snapshots (opaque white).
const DEFAULT_FG_RGBA: u32 = 0xFFFF_FFFF;

/// Packed RGBA used for the default background in snapshots (none).
const DEFAULT_BG_RGBA: u32 = 0;

/// Receiver for host notifications.
///
/// Each callback fires synchronously at the point the triggering sequence is
/// processed. Payloads borrow from the session only for the duration of the
/// call.
pub trait EventSink {
    /// OSC 0/2: window title changed.
    fn on_title(&mut self, _title: &str) {}
    /// OSC 52: clipboard set. The payload is the raw (base64) bytes from the
    /// sequence, not decoded.
    fn on_clipboard_set(&mut self, _payload: &[u8]) {}
    /// BEL in ground state.
    fn on_bell(&mut self) {}
}

/// One cell in a row snapshot.
///
/// Text lives in the caller-supplied arena at `text_offset..text_offset +
/// text_len`; a spacer or truncated cell has `text_len == 0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CellSnapshot {
    /// Byte offset of this cell's text in the arena.
    pub text_offset: u32,
    /// Byte length of this cell's text (0 = empty).
    pub text_len: u16,
    /// Foreground as `0xAARRGGBB` (default resolves to opaque white).
    pub fg_rgba: u32,
    /// Background as `0xAARRGGBB` (0 = default/none).
    pub bg_rgba: u32,
    /// Display width: 0 (spacer), 1, or 2.
    pub width: u8,
    /// Attribute flags.
    pub attrs: StyleAttrs,
    /// Hyperlink tag (0 = none).
    pub link_tag: LinkTag,
}

/// Result of a row snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowSnapshot {
    /// Cells written into the caller's array.
    pub cells_written: usize,
    /// Total arena bytes used.
    pub arena_used: usize,
}

/// Character set designated into G0/G1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Charset {
    #[default]
    Ascii,
    /// DEC special graphics (line drawing).
    DecSpecial,
}

impl Charset {
    /// Translate a printable through this charset.
    fn map(self, ch: char) -> char {
        if self == Charset::Ascii {
            return ch;
        }
        match ch {
            '`' => '◆',
            'a' => '▒',
            'b' => '␉',
            'c' => '␌',
            'd' => '␍',
            'e' => '␊',
            'f' => '°',
            'g' => '±',
            'h' => '␤',
            'i' => '␋',
            'j' => '┘',
            'k' => '┐',
            'l' => '┌',
            'm' => '└',
            'n' => '┼',
            'o' => '⎺',
            'p' => '⎻',
            'q' => '─',
            'r' => '⎼',
            's' => '⎽',
            't' => '├',
            'u' => '┤',
            'v' => '┴',
            'w' => '┬',
            'x' => '│',
            'y' => '≤',
            'z' => '≥',
            '{' => 'π',
            '|' => '≠',
            '}' => '£',
            '~' => '·',
            _ => ch,
        }
    }
}

/// Builder for [`Terminal`] instances.
#[derive(Debug, Clone)]
pub struct TerminalBuilder {
    cols: u16,
    rows: u16,
    max_scrollback_bytes: usize,
}

impl Default for TerminalBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalBuilder {
    /// Defaults: 80 × 24, 2 MiB scrollback.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cols: 80,
            rows: 24,
            max_scrollback_bytes: DEFAULT_SCROLLBACK_BYTES,
        }
    }

    /// Set the number of columns (clamped to ≥ 1).
    #[must_use]
    pub fn cols(mut self, cols: u16) -> Self {
        self.cols = cols;
        self
    }

    /// Set the number of rows (clamped to ≥ 1).
    #[must_use]
    pub fn rows(mut self, rows: u16) -> Self {
        self.rows = rows;
        self
    }

    /// Set both dimensions.
    #[must_use]
    pub fn size(mut self, cols: u16, rows: u16) -> Self {
        self.cols = cols;
        self.rows = rows;
        self
    }

    /// Set the scrollback byte budget (0 disables history).
    #[must_use]
    pub fn max_scrollback_bytes(mut self, bytes: usize) -> Self {
        self.max_scrollback_bytes = bytes;
        self
    }

    /// Build the terminal.
    #[must_use]
    pub fn build(self) -> Terminal {
        Terminal {
            parser: Parser::new(),
            inner: Interpreter::new(self.cols, self.rows, self.max_scrollback_bytes),
        }
    }
}

/// A terminal session.
pub struct Terminal {
    parser: Parser,
    inner: Interpreter,
}

impl std::fmt::Debug for Terminal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Terminal")
            .field("cols", &self.inner.primary.cols())
            .field("rows", &self.inner.primary.rows())
            .field("alt_screen", &self.inner.modes.alt_screen)
            .finish_non_exhaustive()
    }
}

impl Terminal {
    /// Create a session with default scrollback.
    #[must_use]
    pub fn new(cols: u16, rows: u16) -> Self {
        TerminalBuilder::new().size(cols, rows).build()
    }

    /// Create a builder.
    #[must_use]
    pub fn builder() -> TerminalBuilder {
        TerminalBuilder::new()
    }

    /// Feed raw bytes (text and control sequences).
    ///
    /// Parser state persists between calls: a sequence split across feeds
    /// parses identically to the unsplit stream.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.parser.advance(bytes, &mut self.inner);
    }

    /// Resize the viewport (both dimensions clamped to ≥ 1).
    ///
    /// Resize is host-driven only; no escape sequence triggers it.
    pub fn resize(&mut self, cols: u16, rows: u16) {
        debug!(cols, rows, "terminal resize");
        self.inner.primary.resize(cols, rows);
        self.inner.alt.resize(cols, rows);
    }

    /// Install a reply writer (status reports). Replaces any existing one.
    pub fn set_writer(&mut self, writer: impl FnMut(&[u8]) + 'static) {
        self.inner.writer = Some(Box::new(writer));
    }

    /// Remove the reply writer.
    pub fn clear_writer(&mut self) {
        self.inner.writer = None;
    }

    /// Install a host event sink. Replaces any existing one.
    pub fn set_event_sink(&mut self, sink: impl EventSink + 'static) {
        self.inner.events = Some(Box::new(sink));
    }

    /// Remove the event sink.
    pub fn clear_event_sink(&mut self) {
        self.inner.events = None;
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Number of visible rows.
    #[must_use]
    pub fn rows(&self) -> u16 {
        self.inner.primary.rows()
    }

    /// Number of columns.
    #[must_use]
    pub fn cols(&self) -> u16 {
        self.inner.primary.cols()
    }

    /// Cursor row, 0-based, on the active screen.
    #[must_use]
    pub fn cursor_row(&self) -> u16 {
        self.inner.active().cursor().row
    }

    /// Cursor column, 0-based, on the active screen.
    #[must_use]
    pub fn cursor_col(&self) -> u16 {
        self.inner.active().cursor().col
    }

    /// Whether the alternate screen is active.
    #[must_use]
    pub fn is_alt_screen(&self) -> bool {
        self.inner.modes.alt_screen
    }

    /// Bracketed paste mode (DECSET 2004).
    #[must_use]
    pub fn bracketed_paste(&self) -> bool {
        self.inner.modes.bracketed_paste
    }

    /// Whether any mouse reporting mode is active.
    #[must_use]
    pub fn mouse_enabled(&self) -> bool {
        self.inner.modes.mouse_enabled()
    }

    /// Whether mouse reports use SGR (or SGR-pixel) encoding.
    #[must_use]
    pub fn mouse_sgr(&self) -> bool {
        self.inner.modes.mouse_sgr()
    }

    /// Whether motion events are reported.
    #[must_use]
    pub fn mouse_motion(&self) -> bool {
        self.inner.modes.mouse_motion()
    }

    /// Whether all motion is reported regardless of buttons.
    #[must_use]
    pub fn mouse_any_motion(&self) -> bool {
        self.inner.modes.mouse_any_motion()
    }

    /// Current kitty keyboard flags as a bitmask.
    #[must_use]
    pub fn kitty_keyboard_flags(&self) -> u8 {
        self.inner.modes.kitty_keyboard.bits()
    }

    /// Whether the cursor is visible (DECTCEM).
    #[must_use]
    pub fn cursor_visible(&self) -> bool {
        self.inner.modes.cursor_visible
    }

    /// Last title set via OSC 0/2.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.inner.title
    }

    /// The active screen's grid (primary or alternate).
    #[must_use]
    pub fn grid(&self) -> &Grid {
        self.inner.active()
    }

    /// The scrollback history.
    #[must_use]
    pub fn scrollback(&self) -> &Scrollback {
        &self.inner.scrollback
    }

    // ------------------------------------------------------------------
    // Dirty tracking (active screen)
    // ------------------------------------------------------------------

    /// Whether a visible row has unacknowledged changes.
    #[must_use]
    pub fn row_dirty(&self, row: u16) -> bool {
        self.inner.active().damage().is_dirty(row)
    }

    /// Acknowledge one row.
    pub fn row_clear_dirty(&mut self, row: u16) {
        self.inner.active_mut().damage_mut().clear(row);
    }

    /// Acknowledge every row.
    pub fn clear_all_dirty(&mut self) {
        self.inner.active_mut().damage_mut().clear_all();
    }

    /// Coarse dirty span for a row: the full row width when dirty.
    #[must_use]
    pub fn row_dirty_span(&self, row: u16) -> Option<(u16, u16)> {
        let grid = self.inner.active();
        grid.damage().span(row, grid.cols())
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    /// Read one visible row into caller-owned buffers.
    ///
    /// Writes up to `cells.len()` cells and their UTF-8 text contiguously
    /// into `arena`. A cell whose text does not fit the remaining arena is
    /// written with `text_len == 0`. An out-of-range row writes nothing.
    /// No reference to either buffer is retained.
    pub fn snapshot_row(
        &self,
        row: u16,
        cells: &mut [CellSnapshot],
        arena: &mut [u8],
    ) -> RowSnapshot {
        match self.inner.active().row(row) {
            Some(grid_row) => snapshot_cells(grid_row, cells, arena),
            None => RowSnapshot {
                cells_written: 0,
                arena_used: 0,
            },
        }
    }

    /// Number of rows in scrollback history.
    #[must_use]
    pub fn scrollback_size(&self) -> usize {
        self.inner.scrollback.len()
    }

    /// Read one history row (index 0 = oldest); contract as [`Self::snapshot_row`].
    pub fn snapshot_scrollback_row(
        &self,
        index: usize,
        cells: &mut [CellSnapshot],
        arena: &mut [u8],
    ) -> RowSnapshot {
        match self.inner.scrollback.get(index) {
            Ok(row) => snapshot_cells(row, cells, arena),
            Err(_) => RowSnapshot {
                cells_written: 0,
                arena_used: 0,
            },
        }
    }

    // ------------------------------------------------------------------
    // Hyperlink resolution
    // ------------------------------------------------------------------

    /// URI of the hyperlink at a visible cell, if any.
    #[must_use]
    pub fn link_at(&self, row: u16, col: u16) -> Option<&str> {
        let cell = self.inner.active().cell(row, col)?;
        self.inner.links.resolve(cell.link).ok()
    }

    /// URI of the hyperlink at a scrollback cell (index 0 = oldest), if any.
    #[must_use]
    pub fn scrollback_link_at(&self, index: usize, col: u16) -> Option<&str> {
        let row = self.inner.scrollback.get(index).ok()?;
        let cell = row.get(col)?;
        self.inner.links.resolve(cell.link).ok()
    }
}

/// Encode one grid row into snapshot buffers.
fn snapshot_cells(row: &Row, out: &mut [CellSnapshot], arena: &mut [u8]) -> RowSnapshot {
    let mut used = 0;
    let mut count = 0;
    for (cell, slot) in row.cells().iter().zip(out.iter_mut()) {
        let written = cell.encode_text_into(&mut arena[used..]);
        *slot = CellSnapshot {
            text_offset: used as u32,
            text_len: written as u16,
            fg_rgba: cell.style.fg.to_rgba(DEFAULT_FG_RGBA),
            bg_rgba: cell.style.bg.to_rgba(DEFAULT_BG_RGBA),
            width: cell.width(),
            attrs: cell.style.attrs,
            link_tag: cell.link,
        };
        used += written;
        count += 1;
    }
    RowSnapshot {
        cells_written: count,
        arena_used: used,
    }
}

/// Everything the parser's actions mutate. Split from [`Terminal`] so the
/// parser and its sink can borrow disjoint fields during `feed`.
struct Interpreter {
    primary: Grid,
    alt: Grid,
    scrollback: Scrollback,
    links: HyperlinkTable,
    modes: ModeState,
    /// Running rendition applied to subsequent writes.
    style: Style,
    /// Active hyperlink tag applied to subsequent writes (0 = none).
    cur_link: LinkTag,
    charsets: [Charset; 2],
    active_charset: usize,
    /// Last printed character, for REP.
    last_printed: Option<char>,
    title: String,
    writer: Option<Box<dyn FnMut(&[u8])>>,
    events: Option<Box<dyn EventSink>>,
}

impl Interpreter {
    fn new(cols: u16, rows: u16, max_scrollback_bytes: usize) -> Self {
        Self {
            primary: Grid::new(cols, rows),
            alt: Grid::new(cols, rows),
            scrollback: Scrollback::new(max_scrollback_bytes),
            links: HyperlinkTable::new(),
            modes: ModeState::new(),
            style: Style::default(),
            cur_link: 0,
            charsets: [Charset::Ascii; 2],
            active_charset: 0,
            last_printed: None,
            title: String::new(),
            writer: None,
            events: None,
        }
    }

    #[inline]
    fn active(&self) -> &Grid {
        if self.modes.alt_screen {
            &self.alt
        } else {
            &self.primary
        }
    }

    #[inline]
    fn active_mut(&mut self) -> &mut Grid {
        if self.modes.alt_screen {
            &mut self.alt
        } else {
            &mut self.primary
        }
    }

    /// Send one complete reply through the writer, if installed.
    fn reply(&mut self, args: std::fmt::Arguments<'_>) {
        if let Some(writer) = self.writer.as_mut() {
            let mut buf = String::new();
            // Formatting into a String cannot fail.
            let _ = buf.write_fmt(args);
            writer(buf.as_bytes());
        }
    }

    // ------------------------------------------------------------------
    // Printing
    // ------------------------------------------------------------------

    fn print_char(&mut self, ch: char) {
        let ch = self.charsets[self.active_charset].map(ch);
        let width = char_width(ch);

        if width == 0 {
            // Combining mark: attach to the most recently written cell.
            let grid = self.active_mut();
            let cursor = grid.cursor();
            let col = if grid.pending_wrap() {
                grid.cols()
            } else {
                cursor.col
            };
            grid.combine_at_previous(cursor.row, col, ch);
            return;
        }

        let autowrap = self.modes.autowrap;
        let insert = self.modes.insert;
        let style = self.style;
        let link = self.cur_link;

        let grid = self.active_mut();
        if grid.pending_wrap() && autowrap {
            let row = grid.cursor().row;
            grid.set_cursor(row, 0);
            self.linefeed();
        }

        let grid = self.active_mut();
        let cols = grid.cols();
        let mut cursor = grid.cursor();

        // A wide character that cannot fit at the margin wraps early (or
        // pins to the last full slot when autowrap is off).
        if width == 2 && cursor.col + 2 > cols {
            if autowrap && cols >= 2 {
                grid.set_cursor(cursor.row, 0);
                self.linefeed();
            } else {
                let grid = self.active_mut();
                grid.set_cursor(cursor.row, cols.saturating_sub(2));
            }
            cursor = self.active_mut().cursor();
        }

        if insert {
            let grid = self.active_mut();
            grid.insert_cells(cursor.row, cursor.col, u16::from(width), style);
        }

        let grid = self.active_mut();
        let cell = if width == 2 {
            Cell::wide(ch, style, link).0
        } else {
            Cell::new(ch, style, link)
        };
        grid.write_cell(cursor.row, cursor.col, cell);

        let next_col = cursor.col + u16::from(width);
        if next_col >= cols {
            grid.set_cursor(cursor.row, cols - 1);
            grid.set_pending_wrap(autowrap);
        } else {
            grid.set_cursor(cursor.row, next_col);
        }
        self.last_printed = Some(ch);
    }

    // ------------------------------------------------------------------
    // Cursor motion and scrolling
    // ------------------------------------------------------------------

    /// Move down one row, scrolling the region when at its bottom margin.
    fn linefeed(&mut self) {
        let grid = self.active_mut();
        let region = grid.scroll_region();
        let cursor = grid.cursor();
        if cursor.row == region.bottom {
            self.scroll_region_up(1);
        } else if cursor.row + 1 < grid.rows() {
            grid.set_cursor(cursor.row + 1, cursor.col);
        } else {
            // Below the region at the screen bottom: stay put.
            grid.set_pending_wrap(false);
        }
    }

    /// Move up one row, scrolling the region down when at its top margin.
    fn reverse_index(&mut self) {
        let grid = self.active_mut();
        let region = grid.scroll_region();
        let cursor = grid.cursor();
        if cursor.row == region.top {
            self.scroll_region_down(1);
        } else if cursor.row > 0 {
            grid.set_cursor(cursor.row - 1, cursor.col);
        } else {
            grid.set_pending_wrap(false);
        }
    }

    /// Scroll the region up `n`, feeding scrollback from the primary screen
    /// when the region spans the full viewport.
    fn scroll_region_up(&mut self, n: u16) {
        let style = self.style;
        let alt_active = self.modes.alt_screen;
        let grid = self.active_mut();
        let region = grid.scroll_region();
        let keep_history = !alt_active && region.is_full(grid.rows());
        let displaced = grid.scroll_up(region.top, region.bottom, n, style);
        if keep_history {
            for row in displaced {
                self.scrollback.push_row(row);
            }
        }
    }

    /// Scroll the region down `n`; displaced rows are discarded.
    fn scroll_region_down(&mut self, n: u16) {
        let style = self.style;
        let grid = self.active_mut();
        let region = grid.scroll_region();
        grid.scroll_down(region.top, region.bottom, n, style);
    }

    // ------------------------------------------------------------------
    // Screen switching
    // ------------------------------------------------------------------

    fn enter_alt_screen(&mut self, clear: bool, save_cursor: bool) {
        if self.modes.alt_screen {
            return;
        }
        debug!(clear, save_cursor, "entering alternate screen");
        if save_cursor {
            let style = self.style;
            self.primary.save_cursor(style);
        }
        let cursor = self.primary.cursor();
        self.modes.alt_screen = true;
        if clear {
            let style = self.style;
            self.alt.erase_all(style);
        }
        self.alt.set_cursor(cursor.row, cursor.col);
        self.alt.damage_mut().mark_all();
    }

    fn leave_alt_screen(&mut self, clear_alt: bool, restore_cursor: bool) {
        if !self.modes.alt_screen {
            return;
        }
        debug!(clear_alt, restore_cursor, "leaving alternate screen");
        if clear_alt {
            let style = self.style;
            self.alt.erase_all(style);
        }
        let cursor = self.alt.cursor();
        self.modes.alt_screen = false;
        if restore_cursor {
            self.style = self.primary.restore_cursor();
        } else {
            self.primary.set_cursor(cursor.row, cursor.col);
        }
        self.primary.damage_mut().mark_all();
    }

    // ------------------------------------------------------------------
    // Erase in display
    // ------------------------------------------------------------------

    fn erase_display(&mut self, mode: u16) {
        let style = self.style;
        match mode {
            0 => {
                let grid = self.active_mut();
                let cursor = grid.cursor();
                grid.erase_below(cursor, style);
            }
            1 => {
                let grid = self.active_mut();
                let cursor = grid.cursor();
                grid.erase_above(cursor, style);
            }
            2 => {
                if self.modes.alt_screen {
                    self.alt.erase_all(style);
                } else {
                    // The viewport scrolls into history before clearing.
                    for row in self.primary.take_all_rows(style) {
                        self.scrollback.push_row(row);
                    }
                }
            }
            3 => self.scrollback.clear(),
            _ => trace!(mode, "ignored ED mode"),
        }
    }

    // ------------------------------------------------------------------
    // SGR
    // ------------------------------------------------------------------

    fn apply_sgr(&mut self, params: &[u16], subparam_mask: u16) {
        if params.is_empty() {
            self.style.reset();
            return;
        }

        let is_sub = |i: usize| i < 16 && subparam_mask & (1 << i) != 0;
        let mut i = 0;
        while i < params.len() {
            if is_sub(i) {
                // Subparameter not consumed by its primary; skip.
                i += 1;
                continue;
            }
            let p = params[i];
            match p {
                0 => self.style.reset(),
                1 => self.style.attrs |= StyleAttrs::BOLD,
                2 => self.style.attrs |= StyleAttrs::DIM,
                3 => self.style.attrs |= StyleAttrs::ITALIC,
                4 => {
                    // `4:n` selects an underline style.
                    if i + 1 < params.len() && is_sub(i + 1) {
                        self.style.attrs &= !StyleAttrs::ANY_UNDERLINE;
                        match params[i + 1] {
                            0 => {}
                            2 => self.style.attrs |= StyleAttrs::DOUBLE_UNDERLINE,
                            3 => self.style.attrs |= StyleAttrs::CURLY_UNDERLINE,
                            _ => self.style.attrs |= StyleAttrs::UNDERLINE,
                        }
                        i += 1;
                    } else {
                        self.style.attrs |= StyleAttrs::UNDERLINE;
                    }
                }
                5 | 6 => self.style.attrs |= StyleAttrs::BLINK,
                7 => self.style.attrs |= StyleAttrs::INVERSE,
                8 => self.style.attrs |= StyleAttrs::HIDDEN,
                9 => self.style.attrs |= StyleAttrs::STRIKE,
                21 => self.style.attrs |= StyleAttrs::DOUBLE_UNDERLINE,
                22 => self.style.attrs &= !(StyleAttrs::BOLD | StyleAttrs::DIM),
                23 => self.style.attrs &= !StyleAttrs::ITALIC,
                24 => self.style.attrs &= !StyleAttrs::ANY_UNDERLINE,
                25 => self.style.attrs &= !StyleAttrs::BLINK,
                27 => self.style.attrs &= !StyleAttrs::INVERSE,
                28 => self.style.attrs &= !StyleAttrs::HIDDEN,
                29 => self.style.attrs &= !StyleAttrs::STRIKE,
                30..=37 => self.style.fg = Color::Indexed(p as u8 - 30),
                38 => {
                    if let Some(color) = parse_extended_color(params, &mut i) {
                        self.style.fg = color;
                    }
                }
                39 => self.style.fg = Color::Default,
                40..=47 => self.style.bg = Color::Indexed(p as u8 - 40),
                48 => {
                    if let Some(color) = parse_extended_color(params, &mut i) {
                        self.style.bg = color;
                    }
                }
                49 => self.style.bg = Color::Default,
                53 => self.style.attrs |= StyleAttrs::OVERLINE,
                55 => self.style.attrs &= !StyleAttrs::OVERLINE,
                58 | 59 => {
                    // Underline color: recognized but not stored.
                    if p == 58 {
                        let _ = parse_extended_color(params, &mut i);
                    }
                }
                90..=97 => self.style.fg = Color::Indexed(p as u8 - 90 + 8),
                100..=107 => self.style.bg = Color::Indexed(p as u8 - 100 + 8),
                _ => trace!(param = p, "ignored SGR parameter"),
            }
            i += 1;
        }
    }

    // ------------------------------------------------------------------
    // Modes
    // ------------------------------------------------------------------

    fn set_dec_mode(&mut self, mode: u16, enable: bool) {
        match mode {
            7 => self.modes.autowrap = enable,
            25 => self.modes.cursor_visible = enable,
            47 => {
                if enable {
                    self.enter_alt_screen(false, false);
                } else {
                    self.leave_alt_screen(false, false);
                }
            }
            1000 => self.set_mouse_mode(MouseMode::Normal, enable),
            1002 => self.set_mouse_mode(MouseMode::ButtonMotion, enable),
            1003 => self.set_mouse_mode(MouseMode::AnyMotion, enable),
            1005 => self.set_mouse_encoding(MouseEncoding::Utf8, enable),
            1006 => self.set_mouse_encoding(MouseEncoding::Sgr, enable),
            1016 => self.set_mouse_encoding(MouseEncoding::SgrPixel, enable),
            1047 => {
                if enable {
                    self.enter_alt_screen(false, false);
                } else {
                    self.leave_alt_screen(true, false);
                }
            }
            1048 => {
                if enable {
                    let style = self.style;
                    self.active_mut().save_cursor(style);
                } else {
                    self.style = self.active_mut().restore_cursor();
                }
            }
            1049 => {
                if enable {
                    self.enter_alt_screen(true, true);
                } else {
                    self.leave_alt_screen(true, true);
                }
            }
            2004 => self.modes.bracketed_paste = enable,
            _ => trace!(mode, enable, "ignored DEC private mode"),
        }
    }

    fn set_mouse_mode(&mut self, mode: MouseMode, enable: bool) {
        if enable {
            self.modes.mouse_mode = mode;
        } else if self.modes.mouse_mode == mode {
            self.modes.mouse_mode = MouseMode::Off;
        }
    }

    fn set_mouse_encoding(&mut self, encoding: MouseEncoding, enable: bool) {
        if enable {
            self.modes.mouse_encoding = encoding;
        } else if self.modes.mouse_encoding == encoding {
            self.modes.mouse_encoding = MouseEncoding::Legacy;
        }
    }

    fn set_ansi_mode(&mut self, mode: u16, enable: bool) {
        match mode {
            4 => self.modes.insert = enable,
            _ => trace!(mode, enable, "ignored ANSI mode"),
        }
    }

    /// DECRQM status for a DEC private mode: 1 = set, 2 = reset, 0 = unknown.
    fn dec_mode_status(&self, mode: u16) -> u8 {
        let flag = match mode {
            7 => Some(self.modes.autowrap),
            25 => Some(self.modes.cursor_visible),
            47 | 1047 | 1049 => Some(self.modes.alt_screen),
            1000 => Some(self.modes.mouse_mode == MouseMode::Normal),
            1002 => Some(self.modes.mouse_mode == MouseMode::ButtonMotion),
            1003 => Some(self.modes.mouse_mode == MouseMode::AnyMotion),
            1005 => Some(self.modes.mouse_encoding == MouseEncoding::Utf8),
            1006 => Some(self.modes.mouse_encoding == MouseEncoding::Sgr),
            1016 => Some(self.modes.mouse_encoding == MouseEncoding::SgrPixel),
            2004 => Some(self.modes.bracketed_paste),
            _ => None,
        };
        match flag {
            Some(true) => 1,
            Some(false) => 2,
            None => 0,
        }
    }

    // ------------------------------------------------------------------
    // Full reset
    // ------------------------------------------------------------------

    fn full_reset(&mut self) {
        debug!("full terminal reset");
        self.primary.reset();
        self.alt.reset();
        self.modes.reset();
        self.style.reset();
        self.cur_link = 0;
        self.charsets = [Charset::Ascii; 2];
        self.active_charset = 0;
        self.last_printed = None;
        // Scrollback and window title survive a reset.
    }

    /// DECSTR: a narrower reset than RIS.
    fn soft_reset(&mut self) {
        self.style.reset();
        self.modes.insert = false;
        self.modes.cursor_visible = true;
        self.modes.application_keypad = false;
        let grid = self.active_mut();
        let rows = grid.rows();
        grid.set_scroll_region(0, rows.saturating_sub(1));
        grid.set_pending_wrap(false);
    }

    // ------------------------------------------------------------------
    // OSC handling
    // ------------------------------------------------------------------

    fn handle_osc(&mut self, params: &[&[u8]]) {
        let Some(code) = params
            .first()
            .and_then(|p| std::str::from_utf8(p).ok())
            .and_then(|s| s.parse::<u16>().ok())
        else {
            trace!("ignored OSC with non-numeric code");
            return;
        };
        match code {
            0 | 2 => {
                let payload = join_segments(&params[1..]);
                self.title = String::from_utf8_lossy(&payload).into_owned();
                if let Some(events) = self.events.as_mut() {
                    events.on_title(&self.title);
                }
            }
            8 => {
                // OSC 8 ; params ; URI — empty URI closes the link.
                let uri = join_segments(params.get(2..).unwrap_or(&[]));
                if uri.is_empty() {
                    self.cur_link = 0;
                } else {
                    let uri = String::from_utf8_lossy(&uri).into_owned();
                    self.cur_link = self.links.open(&uri);
                }
            }
            52 => {
                let payload = join_segments(params.get(2..).unwrap_or(&[]));
                if let Some(events) = self.events.as_mut() {
                    events.on_clipboard_set(&payload);
                }
            }
            _ => trace!(code, "ignored OSC"),
        }
    }
}

/// Rejoin OSC segments that the parser split on `;`.
fn join_segments(segments: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::new();
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            out.push(b';');
        }
        out.extend_from_slice(segment);
    }
    out
}

/// Parameter at `i`, or `default` when absent.
fn param(params: &[u16], i: usize, default: u16) -> u16 {
    params.get(i).copied().unwrap_or(default)
}

/// Parameter at `i` treated as a count: absent or 0 becomes 1.
fn param_or_one(params: &[u16], i: usize) -> u16 {
    param(params, i, 1).max(1)
}

/// Consume an extended color spec (`38;5;n`, `38;2;r;g;b`, or the colon
/// forms) starting at `params[*i]`. Advances `*i` past the consumed
/// parameters.
fn parse_extended_color(params: &[u16], i: &mut usize) -> Option<Color> {
    let mode = *params.get(*i + 1)?;
    match mode {
        5 => {
            let idx = params.get(*i + 2)?;
            *i += 2;
            Some(Color::Indexed((*idx).min(255) as u8))
        }
        2 => {
            let r = params.get(*i + 2)?;
            let g = params.get(*i + 3)?;
            let b = params.get(*i + 4)?;
            *i += 4;
            Some(Color::Rgb(
                (*r).min(255) as u8,
                (*g).min(255) as u8,
                (*b).min(255) as u8,
            ))
        }
        _ => {
            *i += 1;
            None
        }
    }
}

impl ActionSink for Interpreter {
    fn print(&mut self, ch: char) {
        self.print_char(ch);
    }

    fn print_run(&mut self, text: &str) {
        // ASCII runs skip per-character charset checks only when both
        // charsets are plain; otherwise fall back to the slow path.
        if self.charsets[self.active_charset] == Charset::Ascii
            && !self.modes.insert
            && !self.active().pending_wrap()
        {
            let style = self.style;
            let link = self.cur_link;
            let autowrap = self.modes.autowrap;
            let mut remaining = text;
            while !remaining.is_empty() {
                let grid = self.active_mut();
                let cols = grid.cols();
                let cursor = grid.cursor();
                let space = (cols - cursor.col) as usize;
                let take = remaining.len().min(space);
                let (chunk, rest) = remaining.split_at(take);
                for (offset, ch) in chunk.chars().enumerate() {
                    grid.write_cell(
                        cursor.row,
                        cursor.col + offset as u16,
                        Cell::new(ch, style, link),
                    );
                }
                self.last_printed = chunk.chars().last().or(self.last_printed);
                let next_col = cursor.col + take as u16;
                let grid = self.active_mut();
                if next_col >= cols {
                    grid.set_cursor(cursor.row, cols - 1);
                    grid.set_pending_wrap(autowrap);
                } else {
                    grid.set_cursor(cursor.row, next_col);
                }
                remaining = rest;
                if remaining.is_empty() {
                    break;
                }
                if autowrap {
                    let row = self.active().cursor().row;
                    self.active_mut().set_cursor(row, 0);
                    self.linefeed();
                } else {
                    // Without autowrap the margin cell absorbs the rest.
                    for ch in remaining.chars() {
                        self.print_char(ch);
                    }
                    return;
                }
            }
        } else {
            for ch in text.chars() {
                self.print_char(ch);
            }
        }
    }

    fn execute(&mut self, byte: u8) {
        match byte {
            0x07 => {
                if let Some(events) = self.events.as_mut() {
                    events.on_bell();
                }
            }
            0x08 => {
                let grid = self.active_mut();
                let cursor = grid.cursor();
                if cursor.col > 0 {
                    grid.set_cursor(cursor.row, cursor.col - 1);
                } else {
                    grid.set_pending_wrap(false);
                }
            }
            0x09 => {
                let grid = self.active_mut();
                let cursor = grid.cursor();
                let col = grid.next_tab_stop(cursor.col);
                grid.set_cursor(cursor.row, col);
            }
            0x0A | 0x0B | 0x0C => self.linefeed(),
            0x0D => {
                let grid = self.active_mut();
                let row = grid.cursor().row;
                grid.set_cursor(row, 0);
            }
            0x0E => self.active_charset = 1,
            0x0F => self.active_charset = 0,
            // CAN/SUB sequence aborts and other C0s have no display effect.
            _ => trace!(byte, "ignored control"),
        }
    }

    fn csi_dispatch(
        &mut self,
        params: &[u16],
        intermediates: &[u8],
        final_byte: u8,
        subparam_mask: u16,
    ) {
        match (intermediates, final_byte) {
            ([], b'A') => {
                let n = param_or_one(params, 0);
                let grid = self.active_mut();
                let cursor = grid.cursor();
                let region = grid.scroll_region();
                let floor = if cursor.row >= region.top { region.top } else { 0 };
                grid.set_cursor(cursor.row.saturating_sub(n).max(floor), cursor.col);
            }
            ([], b'B') => {
                let n = param_or_one(params, 0);
                let grid = self.active_mut();
                let cursor = grid.cursor();
                let region = grid.scroll_region();
                let ceil = if cursor.row <= region.bottom {
                    region.bottom
                } else {
                    grid.rows() - 1
                };
                grid.set_cursor((cursor.row + n).min(ceil), cursor.col);
            }
            ([], b'C') => {
                let n = param_or_one(params, 0);
                let grid = self.active_mut();
                let cursor = grid.cursor();
                grid.set_cursor(cursor.row, cursor.col.saturating_add(n));
            }
            ([], b'D') => {
                let n = param_or_one(params, 0);
                let grid = self.active_mut();
                let cursor = grid.cursor();
                grid.set_cursor(cursor.row, cursor.col.saturating_sub(n));
            }
            ([], b'E') => {
                let n = param_or_one(params, 0);
                let grid = self.active_mut();
                let cursor = grid.cursor();
                let region = grid.scroll_region();
                let ceil = if cursor.row <= region.bottom {
                    region.bottom
                } else {
                    grid.rows() - 1
                };
                grid.set_cursor((cursor.row + n).min(ceil), 0);
            }
            ([], b'F') => {
                let n = param_or_one(params, 0);
                let grid = self.active_mut();
                let cursor = grid.cursor();
                let region = grid.scroll_region();
                let floor = if cursor.row >= region.top { region.top } else { 0 };
                grid.set_cursor(cursor.row.saturating_sub(n).max(floor), 0);
            }
            ([], b'G') => {
                let col = param_or_one(params, 0) - 1;
                let grid = self.active_mut();
                let row = grid.cursor().row;
                grid.set_cursor(row, col);
            }
            ([], b'H' | b'f') => {
                let row = param_or_one(params, 0) - 1;
                let col = param_or_one(params, 1) - 1;
                self.active_mut().set_cursor(row, col);
            }
            ([], b'I') => {
                let n = param_or_one(params, 0);
                let grid = self.active_mut();
                let cursor = grid.cursor();
                let mut col = cursor.col;
                for _ in 0..n {
                    col = grid.next_tab_stop(col);
                }
                grid.set_cursor(cursor.row, col);
            }
            ([], b'J') => self.erase_display(param(params, 0, 0)),
            ([], b'K') => {
                let style = self.style;
                let grid = self.active_mut();
                let cursor = grid.cursor();
                match param(params, 0, 0) {
                    0 => grid.erase_line_right(cursor.row, cursor.col, style),
                    1 => grid.erase_line_left(cursor.row, cursor.col, style),
                    2 => grid.erase_line(cursor.row, style),
                    mode => trace!(mode, "ignored EL mode"),
                }
            }
            ([], b'L') => {
                let n = param_or_one(params, 0);
                let style = self.style;
                let grid = self.active_mut();
                let row = grid.cursor().row;
                grid.insert_lines(row, n, style);
            }
            ([], b'M') => {
                let n = param_or_one(params, 0);
                let style = self.style;
                let grid = self.active_mut();
                let row = grid.cursor().row;
                grid.delete_lines(row, n, style);
            }
            ([], b'P') => {
                let n = param_or_one(params, 0);
                let style = self.style;
                let grid = self.active_mut();
                let cursor = grid.cursor();
                grid.delete_cells(cursor.row, cursor.col, n, style);
            }
            ([], b'S') => self.scroll_region_up(param_or_one(params, 0)),
            ([], b'T') => self.scroll_region_down(param_or_one(params, 0)),
            ([], b'X') => {
                let n = param_or_one(params, 0);
                let style = self.style;
                let grid = self.active_mut();
                let cursor = grid.cursor();
                grid.erase_cells(cursor.row, cursor.col, n, style);
            }
            ([], b'Z') => {
                let n = param_or_one(params, 0);
                let grid = self.active_mut();
                let cursor = grid.cursor();
                let mut col = cursor.col;
                for _ in 0..n {
                    col = grid.prev_tab_stop(col);
                }
                grid.set_cursor(cursor.row, col);
            }
            ([], b'@') => {
                let n = param_or_one(params, 0);
                let style = self.style;
                let grid = self.active_mut();
                let cursor = grid.cursor();
                grid.insert_cells(cursor.row, cursor.col, n, style);
            }
            ([], b'b') => {
                if let Some(ch) = self.last_printed {
                    let n = param_or_one(params, 0);
                    for _ in 0..n {
                        self.print_char(ch);
                    }
                }
            }
            ([], b'd') => {
                let row = param_or_one(params, 0) - 1;
                let grid = self.active_mut();
                let col = grid.cursor().col;
                grid.set_cursor(row, col);
            }
            ([], b'g') => {
                let grid = self.active_mut();
                match param(params, 0, 0) {
                    0 => {
                        let col = grid.cursor().col;
                        grid.clear_tab_stop(col);
                    }
                    3 => grid.clear_all_tab_stops(),
                    mode => trace!(mode, "ignored TBC mode"),
                }
            }
            ([], b'h') => {
                for &mode in params {
                    self.set_ansi_mode(mode, true);
                }
            }
            ([], b'l') => {
                for &mode in params {
                    self.set_ansi_mode(mode, false);
                }
            }
            ([b'?'], b'h') => {
                for &mode in params {
                    self.set_dec_mode(mode, true);
                }
            }
            ([b'?'], b'l') => {
                for &mode in params {
                    self.set_dec_mode(mode, false);
                }
            }
            ([], b'm') => self.apply_sgr(params, subparam_mask),
            ([b'>'], b'm') => {} // XTMODKEYS: recognized, no effect
            ([], b'n') => match param(params, 0, 0) {
                5 => self.reply(format_args!("\x1b[0n")),
                6 => {
                    let cursor = self.active().cursor();
                    self.reply(format_args!("\x1b[{};{}R", cursor.row + 1, cursor.col + 1));
                }
                code => trace!(code, "ignored DSR"),
            },
            ([b'?'], b'n') => {
                if param(params, 0, 0) == 6 {
                    let cursor = self.active().cursor();
                    self.reply(format_args!(
                        "\x1b[?{};{}R",
                        cursor.row + 1,
                        cursor.col + 1
                    ));
                }
            }
            ([], b'c') | ([b'?'], b'c') => {
                if param(params, 0, 0) == 0 {
                    self.reply(format_args!("\x1b[?62;22c"));
                }
            }
            ([b'>'], b'c') => {
                if param(params, 0, 0) == 0 {
                    self.reply(format_args!("\x1b[>1;10;0c"));
                }
            }
            ([], b'r') => {
                let grid = self.active_mut();
                let top = param_or_one(params, 0) - 1;
                let bottom = param(params, 1, grid.rows()).max(1) - 1;
                grid.set_scroll_region(top, bottom.min(grid.rows() - 1));
                grid.set_cursor(0, 0);
            }
            ([], b's') => {
                let style = self.style;
                self.active_mut().save_cursor(style);
            }
            ([], b'u') => {
                self.style = self.active_mut().restore_cursor();
            }
            ([b'?'], b'u') => {
                let flags = self.modes.kitty_keyboard.bits();
                self.reply(format_args!("\x1b[?{flags}u"));
            }
            ([b'='], b'u') => {
                let flags = KittyKeyboardFlags::from_bits_truncate(param(params, 0, 0) as u8);
                match param(params, 1, 1) {
                    1 => self.modes.kitty_keyboard = flags,
                    2 => self.modes.kitty_keyboard |= flags,
                    3 => self.modes.kitty_keyboard &= !flags,
                    mode => trace!(mode, "ignored kitty keyboard set mode"),
                }
            }
            ([b'>'], b'u') => {
                let flags = KittyKeyboardFlags::from_bits_truncate(param(params, 0, 0) as u8);
                self.modes.kitty_push(flags);
            }
            ([b'<'], b'u') => {
                self.modes.kitty_pop(param(params, 0, 1));
            }
            ([b'?', b'$'], b'p') => {
                let mode = param(params, 0, 0);
                let status = self.dec_mode_status(mode);
                self.reply(format_args!("\x1b[?{mode};{status}$y"));
            }
            ([b'$'], b'p') => {
                let mode = param(params, 0, 0);
                let status = match mode {
                    4 => {
                        if self.modes.insert {
                            1
                        } else {
                            2
                        }
                    }
                    _ => 0,
                };
                self.reply(format_args!("\x1b[{mode};{status}$y"));
            }
            ([b'!'], b'p') => self.soft_reset(),
            _ => trace!(
                final_byte,
                ?intermediates,
                "ignored CSI sequence"
            ),
        }
    }

    fn esc_dispatch(&mut self, intermediates: &[u8], final_byte: u8) {
        match (intermediates, final_byte) {
            ([], b'7') => {
                let style = self.style;
                self.active_mut().save_cursor(style);
            }
            ([], b'8') => {
                self.style = self.active_mut().restore_cursor();
            }
            ([b'#'], b'8') => {
                // DECALN: fill the screen with E and reset margins.
                let grid = self.active_mut();
                let rows = grid.rows();
                let cols = grid.cols();
                grid.set_scroll_region(0, rows - 1);
                for row in 0..rows {
                    for col in 0..cols {
                        grid.write_cell(row, col, Cell::new('E', Style::default(), 0));
                    }
                }
                grid.set_cursor(0, 0);
            }
            ([], b'D') => self.linefeed(),
            ([], b'E') => {
                let grid = self.active_mut();
                let row = grid.cursor().row;
                grid.set_cursor(row, 0);
                self.linefeed();
            }
            ([], b'M') => self.reverse_index(),
            ([], b'H') => {
                let grid = self.active_mut();
                let col = grid.cursor().col;
                grid.set_tab_stop(col);
            }
            ([], b'c') => self.full_reset(),
            ([], b'=') => self.modes.application_keypad = true,
            ([], b'>') => self.modes.application_keypad = false,
            ([], b'\\') => {} // ST after a string sequence
            ([b'('], final_byte) => {
                self.charsets[0] = if final_byte == b'0' {
                    Charset::DecSpecial
                } else {
                    Charset::Ascii
                };
            }
            ([b')'], final_byte) => {
                self.charsets[1] = if final_byte == b'0' {
                    Charset::DecSpecial
                } else {
                    Charset::Ascii
                };
            }
            _ => trace!(final_byte, ?intermediates, "ignored ESC sequence"),
        }
    }

    fn osc_dispatch(&mut self, params: &[&[u8]]) {
        self.handle_osc(params);
    }

    fn dcs_hook(&mut self, _params: &[u16], intermediates: &[u8], final_byte: u8) {
        trace!(final_byte, ?intermediates, "ignored DCS string");
    }

    fn dcs_put(&mut self, _byte: u8) {}

    fn dcs_unhook(&mut self) {}
}
