//! Terminal grid: the visible cell matrix plus cursor state.
//!
//! ## Design
//!
//! - Row-major storage, one `Row` per visible line
//! - Cursor position with bounds enforcement
//! - Scroll region (DECSTBM) aware scrolling; displaced rows are returned
//!   to the caller so the session can feed them to scrollback
//! - Damage tracking for efficient redraw
//! - Wide-cell pairing kept consistent through every mutation: a width-2
//!   lead is always followed by a width-0 spacer, and a spacer never
//!   appears without its lead

mod cell;
mod damage;
mod style;

pub use cell::{char_width, Cell, MAX_COMBINING};
pub use damage::RowDamage;
pub use style::{Color, Style, StyleAttrs};

/// Cursor position, 0-indexed from the top-left of the visible area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    /// Row (0-indexed).
    pub row: u16,
    /// Column (0-indexed).
    pub col: u16,
}

impl Cursor {
    /// Create a new cursor at the given position.
    #[must_use]
    #[inline]
    pub const fn new(row: u16, col: u16) -> Self {
        Self { row, col }
    }
}

/// Saved cursor state (DECSC/DECRC).
#[derive(Debug, Clone, Copy, Default)]
pub struct SavedCursor {
    /// Cursor position.
    pub cursor: Cursor,
    /// Rendition at save time.
    pub style: Style,
    /// Whether a saved cursor exists.
    pub valid: bool,
}

/// Scroll region bounds (top and bottom rows, inclusive, 0-indexed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollRegion {
    /// Top row of the region (inclusive).
    pub top: u16,
    /// Bottom row of the region (inclusive).
    pub bottom: u16,
}

impl ScrollRegion {
    /// A region covering all visible rows.
    #[inline]
    #[must_use]
    pub fn full(rows: u16) -> Self {
        Self {
            top: 0,
            bottom: rows.saturating_sub(1),
        }
    }

    /// Whether this region spans the full screen.
    #[inline]
    #[must_use]
    pub fn is_full(&self, rows: u16) -> bool {
        self.top == 0 && self.bottom == rows.saturating_sub(1)
    }

    /// Number of rows in the region.
    #[inline]
    #[must_use]
    pub fn height(&self) -> u16 {
        self.bottom.saturating_sub(self.top) + 1
    }
}

/// One grid line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    cells: Vec<Cell>,
}

impl Row {
    /// Create a blank row of `cols` cells carrying the given background.
    #[must_use]
    pub fn blank(cols: u16, style: Style) -> Self {
        Self {
            cells: vec![Cell::blank(style); cols as usize],
        }
    }

    /// Cells of this row.
    #[must_use]
    #[inline]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Cell at `col`, if in bounds.
    #[must_use]
    #[inline]
    pub fn get(&self, col: u16) -> Option<&Cell> {
        self.cells.get(col as usize)
    }

    /// Number of cells.
    #[must_use]
    #[inline]
    pub fn len(&self) -> u16 {
        self.cells.len() as u16
    }

    /// Whether the row has zero cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Approximate encoded size, for scrollback byte accounting.
    #[must_use]
    pub fn encoded_size(&self) -> usize {
        std::mem::size_of::<Self>() + self.cells.iter().map(Cell::encoded_size).sum::<usize>()
    }

    /// Truncate or pad to `cols`, repairing a wide pair cut at the boundary.
    fn set_width(&mut self, cols: u16, style: Style) {
        let cols = cols as usize;
        if cols < self.cells.len() {
            self.cells.truncate(cols);
            // A lead whose spacer was cut off becomes a blank.
            if let Some(last) = self.cells.last_mut() {
                if last.is_wide() {
                    last.erase(Style {
                        bg: last.style.bg,
                        ..Style::default()
                    });
                }
            }
        } else {
            self.cells.resize(cols, Cell::blank(style));
        }
    }

    /// Blank out `start..=end` (inclusive), expanding the range so a wide
    /// pair is never split: erasing a spacer also erases its lead, erasing
    /// a lead also erases its spacer.
    fn fill_blank(&mut self, start: u16, end: u16, style: Style) {
        if self.cells.is_empty() {
            return;
        }
        let max = self.len() - 1;
        let mut start = start.min(max);
        let mut end = end.min(max);
        if self.cells[start as usize].is_spacer() && start > 0 {
            start -= 1;
        }
        if self.cells[end as usize].is_wide() && end < max {
            end += 1;
        }
        for cell in &mut self.cells[start as usize..=end as usize] {
            cell.erase(style);
        }
    }

    /// Blank any half of a wide pair left without its partner.
    ///
    /// Used after shift operations (ICH/DCH) that move cells within the row.
    fn repair_wide_pairs(&mut self) {
        let len = self.cells.len();
        for col in 0..len {
            if self.cells[col].is_wide() {
                let spacer_ok = col + 1 < len && self.cells[col + 1].is_spacer();
                if !spacer_ok {
                    let bg = self.cells[col].style;
                    self.cells[col].erase(Style {
                        bg: bg.bg,
                        ..Style::default()
                    });
                }
            } else if self.cells[col].is_spacer() {
                let lead_ok = col > 0 && self.cells[col - 1].is_wide();
                if !lead_ok {
                    let bg = self.cells[col].style;
                    self.cells[col].erase(Style {
                        bg: bg.bg,
                        ..Style::default()
                    });
                }
            }
        }
    }
}

/// The visible cell matrix with cursor, scroll region, and tab stops.
///
/// The grid never decides scrollback policy itself: scroll operations return
/// the rows displaced off the top and the session chooses whether to keep
/// them (primary screen) or drop them (alternate screen).
#[derive(Debug, Clone)]
pub struct Grid {
    rows_data: Vec<Row>,
    cols: u16,
    rows: u16,
    cursor: Cursor,
    saved_cursor: SavedCursor,
    scroll_region: ScrollRegion,
    /// Deferred autowrap: set after printing in the last column, consumed by
    /// the next printable character.
    pending_wrap: bool,
    tab_stops: Vec<bool>,
    damage: RowDamage,
}

impl Grid {
    /// Create a grid of `cols` × `rows` blank cells. Both are clamped to ≥ 1.
    #[must_use]
    pub fn new(cols: u16, rows: u16) -> Self {
        let cols = cols.max(1);
        let rows = rows.max(1);
        Self {
            rows_data: (0..rows).map(|_| Row::blank(cols, Style::default())).collect(),
            cols,
            rows,
            cursor: Cursor::default(),
            saved_cursor: SavedCursor::default(),
            scroll_region: ScrollRegion::full(rows),
            pending_wrap: false,
            tab_stops: Self::default_tab_stops(cols),
            damage: RowDamage::new(rows),
        }
    }

    /// Default tab stops: every 8 columns.
    fn default_tab_stops(cols: u16) -> Vec<bool> {
        (0..cols).map(|c| c > 0 && c % 8 == 0).collect()
    }

    /// Number of visible rows.
    #[must_use]
    #[inline]
    pub fn rows(&self) -> u16 {
        self.rows
    }

    /// Number of columns.
    #[must_use]
    #[inline]
    pub fn cols(&self) -> u16 {
        self.cols
    }

    /// Cursor position.
    #[must_use]
    #[inline]
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Move the cursor, clamping into bounds and clearing pending wrap.
    pub fn set_cursor(&mut self, row: u16, col: u16) {
        self.cursor.row = row.min(self.rows - 1);
        self.cursor.col = col.min(self.cols - 1);
        self.pending_wrap = false;
    }

    /// Whether the next printable should wrap before printing.
    #[must_use]
    #[inline]
    pub fn pending_wrap(&self) -> bool {
        self.pending_wrap
    }

    /// Set or clear the deferred-wrap flag.
    #[inline]
    pub fn set_pending_wrap(&mut self, pending: bool) {
        self.pending_wrap = pending;
    }

    /// Save the cursor and rendition (DECSC).
    pub fn save_cursor(&mut self, style: Style) {
        self.saved_cursor = SavedCursor {
            cursor: self.cursor,
            style,
            valid: true,
        };
    }

    /// Restore the saved cursor (DECRC), returning the saved rendition.
    ///
    /// Without a prior save this homes the cursor and returns the default
    /// rendition, per DEC semantics.
    pub fn restore_cursor(&mut self) -> Style {
        let saved = self.saved_cursor;
        if saved.valid {
            self.set_cursor(saved.cursor.row, saved.cursor.col);
            saved.style
        } else {
            self.set_cursor(0, 0);
            Style::default()
        }
    }

    /// Current scroll region.
    #[must_use]
    #[inline]
    pub fn scroll_region(&self) -> ScrollRegion {
        self.scroll_region
    }

    /// Set the scroll region (DECSTBM). Degenerate bounds reset to full.
    pub fn set_scroll_region(&mut self, top: u16, bottom: u16) {
        if top < bottom && bottom < self.rows {
            self.scroll_region = ScrollRegion { top, bottom };
        } else {
            self.scroll_region = ScrollRegion::full(self.rows);
        }
    }

    /// Row `r`, if in bounds.
    #[must_use]
    #[inline]
    pub fn row(&self, row: u16) -> Option<&Row> {
        self.rows_data.get(row as usize)
    }

    /// Cell at `(row, col)`, if in bounds.
    #[must_use]
    #[inline]
    pub fn cell(&self, row: u16, col: u16) -> Option<&Cell> {
        self.rows_data.get(row as usize)?.get(col)
    }

    /// Damage tracker.
    #[must_use]
    #[inline]
    pub fn damage(&self) -> &RowDamage {
        &self.damage
    }

    /// Mutable damage tracker.
    #[inline]
    pub fn damage_mut(&mut self) -> &mut RowDamage {
        &mut self.damage
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Overwrite one grid position, maintaining the wide-pair invariant.
    ///
    /// Writing a wide cell also writes its trailing spacer; overwriting
    /// either half of an existing pair blanks the partner so no orphan
    /// remains. A wide cell that does not fit (`col + 1 >= cols`) degrades
    /// to a blank. Marks the row dirty.
    pub fn write_cell(&mut self, row: u16, col: u16, cell: Cell) {
        if row >= self.rows || col >= self.cols {
            return;
        }
        if cell.is_wide() && col + 1 >= self.cols {
            let bg = cell.style;
            self.write_cell(row, col, Cell::blank(bg));
            return;
        }

        self.unlink_pair_at(row, col);
        let wide = cell.is_wide();
        let style = cell.style;
        let link = cell.link;
        self.rows_data[row as usize].cells[col as usize] = cell;
        if wide {
            self.unlink_pair_at(row, col + 1);
            let (_, spacer) = Cell::wide(' ', style, link);
            self.rows_data[row as usize].cells[col as usize + 1] = spacer;
        }
        self.damage.mark(row);
    }

    /// Blank the partner of a wide pair occupying `(row, col)`, if any.
    fn unlink_pair_at(&mut self, row: u16, col: u16) {
        let cells = &mut self.rows_data[row as usize].cells;
        let existing = &cells[col as usize];
        if existing.is_wide() && (col + 1) < self.cols {
            let bg = cells[col as usize + 1].style.bg;
            cells[col as usize + 1].erase(Style {
                bg,
                ..Style::default()
            });
        } else if existing.is_spacer() && col > 0 {
            let bg = cells[col as usize - 1].style.bg;
            cells[col as usize - 1].erase(Style {
                bg,
                ..Style::default()
            });
        }
    }

    /// Append a combining mark to the last written cell before `(row, col)`.
    ///
    /// Walks left over a spacer to its lead. Marks the row dirty when a cell
    /// accepts the mark.
    pub fn combine_at_previous(&mut self, row: u16, col: u16, mark: char) {
        if row >= self.rows || col == 0 {
            return;
        }
        let mut target = col - 1;
        if self.rows_data[row as usize].cells[target as usize].is_spacer() && target > 0 {
            target -= 1;
        }
        self.rows_data[row as usize].cells[target as usize].push_combining(mark);
        self.damage.mark(row);
    }

    // ------------------------------------------------------------------
    // Scrolling
    // ------------------------------------------------------------------

    /// Shift rows in `top..=bottom` up by `n`, returning the displaced rows
    /// (oldest first). Exposed rows at the bottom are blanked with `bg`.
    /// Marks the whole region dirty.
    pub fn scroll_up(&mut self, top: u16, bottom: u16, n: u16, bg: Style) -> Vec<Row> {
        if top > bottom || bottom >= self.rows || n == 0 {
            return Vec::new();
        }
        let height = bottom - top + 1;
        let n = n.min(height);
        let displaced: Vec<Row> = self
            .rows_data
            .drain(top as usize..(top + n) as usize)
            .collect();
        let insert_at = (bottom + 1 - n) as usize;
        for _ in 0..n {
            self.rows_data.insert(insert_at, Row::blank(self.cols, bg));
        }
        self.damage.mark_range(top, bottom);
        displaced
    }

    /// Shift rows in `top..=bottom` down by `n`. Rows displaced off the
    /// bottom are discarded; exposed rows at the top are blanked with `bg`.
    pub fn scroll_down(&mut self, top: u16, bottom: u16, n: u16, bg: Style) {
        if top > bottom || bottom >= self.rows || n == 0 {
            return;
        }
        let height = bottom - top + 1;
        let n = n.min(height);
        self.rows_data
            .drain((bottom + 1 - n) as usize..(bottom + 1) as usize);
        for _ in 0..n {
            self.rows_data.insert(top as usize, Row::blank(self.cols, bg));
        }
        self.damage.mark_range(top, bottom);
    }

    /// Insert `n` blank lines at `at` within the scroll region (IL).
    pub fn insert_lines(&mut self, at: u16, n: u16, bg: Style) {
        let region = self.scroll_region;
        if at < region.top || at > region.bottom {
            return;
        }
        self.scroll_down(at, region.bottom, n, bg);
    }

    /// Delete `n` lines at `at` within the scroll region (DL).
    pub fn delete_lines(&mut self, at: u16, n: u16, bg: Style) {
        let region = self.scroll_region;
        if at < region.top || at > region.bottom {
            return;
        }
        let _ = self.scroll_up(at, region.bottom, n, bg);
    }

    /// Replace every row with a blank one, returning the old rows in order.
    ///
    /// Used when erasing the full display on the primary screen: the session
    /// pushes the returned rows into scrollback first.
    pub fn take_all_rows(&mut self, bg: Style) -> Vec<Row> {
        let old = std::mem::replace(
            &mut self.rows_data,
            (0..self.rows).map(|_| Row::blank(self.cols, bg)).collect(),
        );
        self.damage.mark_all();
        old
    }

    // ------------------------------------------------------------------
    // Erase / insert / delete within rows
    // ------------------------------------------------------------------

    /// Erase from `col` to end of line (EL 0).
    pub fn erase_line_right(&mut self, row: u16, col: u16, bg: Style) {
        if row >= self.rows || col >= self.cols {
            return;
        }
        self.rows_data[row as usize].fill_blank(col, self.cols - 1, bg);
        self.damage.mark(row);
    }

    /// Erase from start of line through `col` (EL 1).
    pub fn erase_line_left(&mut self, row: u16, col: u16, bg: Style) {
        if row >= self.rows {
            return;
        }
        self.rows_data[row as usize].fill_blank(0, col.min(self.cols - 1), bg);
        self.damage.mark(row);
    }

    /// Erase the whole line (EL 2).
    pub fn erase_line(&mut self, row: u16, bg: Style) {
        if row >= self.rows {
            return;
        }
        self.rows_data[row as usize].fill_blank(0, self.cols - 1, bg);
        self.damage.mark(row);
    }

    /// Erase from the cursor to the end of the display (ED 0).
    pub fn erase_below(&mut self, cursor: Cursor, bg: Style) {
        self.erase_line_right(cursor.row, cursor.col, bg);
        for row in (cursor.row + 1)..self.rows {
            self.erase_line(row, bg);
        }
    }

    /// Erase from the start of the display through the cursor (ED 1).
    pub fn erase_above(&mut self, cursor: Cursor, bg: Style) {
        for row in 0..cursor.row {
            self.erase_line(row, bg);
        }
        self.erase_line_left(cursor.row, cursor.col, bg);
    }

    /// Erase the whole display in place (ED 2 on the alternate screen).
    pub fn erase_all(&mut self, bg: Style) {
        for row in 0..self.rows {
            self.erase_line(row, bg);
        }
    }

    /// Erase `n` cells at the cursor without shifting (ECH).
    pub fn erase_cells(&mut self, row: u16, col: u16, n: u16, bg: Style) {
        if row >= self.rows || col >= self.cols || n == 0 {
            return;
        }
        let end = col.saturating_add(n - 1).min(self.cols - 1);
        self.rows_data[row as usize].fill_blank(col, end, bg);
        self.damage.mark(row);
    }

    /// Insert `n` blank cells at `(row, col)`, shifting the tail right (ICH).
    pub fn insert_cells(&mut self, row: u16, col: u16, n: u16, bg: Style) {
        if row >= self.rows || col >= self.cols || n == 0 {
            return;
        }
        let n = n.min(self.cols - col) as usize;
        let cells = &mut self.rows_data[row as usize].cells;
        let col = col as usize;
        cells.truncate(cells.len() - n);
        for _ in 0..n {
            cells.insert(col, Cell::blank(bg));
        }
        self.rows_data[row as usize].repair_wide_pairs();
        self.damage.mark(row);
    }

    /// Delete `n` cells at `(row, col)`, shifting the tail left (DCH).
    pub fn delete_cells(&mut self, row: u16, col: u16, n: u16, bg: Style) {
        if row >= self.rows || col >= self.cols || n == 0 {
            return;
        }
        let n = n.min(self.cols - col) as usize;
        let cells = &mut self.rows_data[row as usize].cells;
        let col = col as usize;
        cells.drain(col..col + n);
        cells.resize(self.cols as usize, Cell::blank(bg));
        self.rows_data[row as usize].repair_wide_pairs();
        self.damage.mark(row);
    }

    // ------------------------------------------------------------------
    // Tab stops
    // ------------------------------------------------------------------

    /// Set a tab stop at `col` (HTS).
    pub fn set_tab_stop(&mut self, col: u16) {
        if let Some(stop) = self.tab_stops.get_mut(col as usize) {
            *stop = true;
        }
    }

    /// Clear the tab stop at `col` (TBC 0).
    pub fn clear_tab_stop(&mut self, col: u16) {
        if let Some(stop) = self.tab_stops.get_mut(col as usize) {
            *stop = false;
        }
    }

    /// Clear every tab stop (TBC 3).
    pub fn clear_all_tab_stops(&mut self) {
        self.tab_stops.fill(false);
    }

    /// Next tab stop strictly after `col`, or the last column.
    #[must_use]
    pub fn next_tab_stop(&self, col: u16) -> u16 {
        ((col + 1)..self.cols)
            .find(|&c| self.tab_stops[c as usize])
            .unwrap_or(self.cols - 1)
    }

    /// Previous tab stop strictly before `col`, or column 0.
    #[must_use]
    pub fn prev_tab_stop(&self, col: u16) -> u16 {
        (0..col.min(self.cols))
            .rev()
            .find(|&c| self.tab_stops[c as usize])
            .unwrap_or(0)
    }

    // ------------------------------------------------------------------
    // Resize
    // ------------------------------------------------------------------

    /// Resize to `cols` × `rows` (both clamped to ≥ 1).
    ///
    /// Rows are preserved top-aligned; columns beyond the new width are
    /// truncated (no reflow). The cursor is re-clamped, the scroll region
    /// resets to full, tab stops extend with the every-8 default, and all
    /// surviving rows are marked dirty.
    pub fn resize(&mut self, cols: u16, rows: u16) {
        let cols = cols.max(1);
        let rows = rows.max(1);

        if cols != self.cols {
            for row in &mut self.rows_data {
                row.set_width(cols, Style::default());
            }
            let old_cols = self.tab_stops.len() as u16;
            self.tab_stops.resize(cols as usize, false);
            for c in old_cols..cols {
                self.tab_stops[c as usize] = c > 0 && c % 8 == 0;
            }
            self.cols = cols;
        }

        if rows != self.rows {
            self.rows_data.truncate(rows as usize);
            while self.rows_data.len() < rows as usize {
                self.rows_data.push(Row::blank(cols, Style::default()));
            }
            self.rows = rows;
        }

        self.scroll_region = ScrollRegion::full(rows);
        self.cursor.row = self.cursor.row.min(rows - 1);
        self.cursor.col = self.cursor.col.min(cols - 1);
        self.pending_wrap = false;
        self.damage.resize(rows);
    }

    /// Reset content, cursor, tab stops, and scroll region (RIS).
    pub fn reset(&mut self) {
        for row in &mut self.rows_data {
            *row = Row::blank(self.cols, Style::default());
        }
        self.cursor = Cursor::default();
        self.saved_cursor = SavedCursor::default();
        self.scroll_region = ScrollRegion::full(self.rows);
        self.pending_wrap = false;
        self.tab_stops = Self::default_tab_stops(self.cols);
        self.damage.mark_all();
    }

    /// Whether every wide lead has its spacer and every spacer its lead.
    #[must_use]
    pub fn wide_pairs_consistent(&self) -> bool {
        for row in &self.rows_data {
            let cells = row.cells();
            for col in 0..cells.len() {
                if cells[col].is_wide() {
                    if col + 1 >= cells.len() || !cells[col + 1].is_spacer() {
                        return false;
                    }
                } else if cells[col].is_spacer()
                    && (col == 0 || !cells[col - 1].is_wide())
                {
                    return false;
                }
            }
        }
        true
    }
}
