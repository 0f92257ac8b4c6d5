//! Integration tests for the full byte-stream → grid pipeline.
//!
//! These exercise the terminal end to end: text output and wrapping,
//! cursor movement, erase and scroll operations, SGR, mode switching,
//! OSC title/hyperlink handling, status reports, and scrollback.

use std::cell::RefCell;
use std::rc::Rc;

use crate::grid::{Color, StyleAttrs};
use crate::terminal::{CellSnapshot, Terminal};

/// Collect one visible row as a string (spacers skipped, trailing blanks trimmed).
fn grid_line(term: &Terminal, row: u16) -> String {
    let grid = term.grid();
    let row = match grid.row(row) {
        Some(row) => row,
        None => return String::new(),
    };
    row.cells()
        .iter()
        .filter(|c| !c.is_spacer())
        .map(|c| c.base())
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Collect one scrollback row as a string (0 = oldest).
fn scrollback_line(term: &Terminal, index: usize) -> String {
    let mut cells = vec![CellSnapshot::default(); term.cols() as usize];
    let mut arena = vec![0u8; 4096];
    let snap = term.snapshot_scrollback_row(index, &mut cells, &mut arena);
    let mut out = String::new();
    for cell in &cells[..snap.cells_written] {
        let start = cell.text_offset as usize;
        let end = start + cell.text_len as usize;
        out.push_str(std::str::from_utf8(&arena[start..end]).unwrap());
    }
    out.trim_end().to_string()
}

/// Capture writer output into a shared buffer.
fn with_writer(term: &mut Terminal) -> Rc<RefCell<Vec<Vec<u8>>>> {
    let replies: Rc<RefCell<Vec<Vec<u8>>>> = Rc::default();
    let sink = replies.clone();
    term.set_writer(move |bytes| sink.borrow_mut().push(bytes.to_vec()));
    replies
}

// ============================================================================
// Basic text output
// ============================================================================

#[test]
fn basic_text_output() {
    let mut term = Terminal::new(80, 24);
    term.feed(b"Hello, World!");
    assert_eq!(grid_line(&term, 0), "Hello, World!");
    assert_eq!(term.cursor_col(), 13);
}

#[test]
fn crlf_moves_to_next_line_start() {
    let mut term = Terminal::new(80, 24);
    term.feed(b"Line 1\r\nLine 2\r\nLine 3");
    assert_eq!(grid_line(&term, 0), "Line 1");
    assert_eq!(grid_line(&term, 1), "Line 2");
    assert_eq!(grid_line(&term, 2), "Line 3");
}

#[test]
fn lf_alone_keeps_column() {
    let mut term = Terminal::new(80, 24);
    term.feed(b"abc\ndef");
    assert_eq!(term.cursor_row(), 1);
    // LF moved down without returning to column 0.
    assert_eq!(grid_line(&term, 1), "   def");
}

#[test]
fn carriage_return_overwrites_from_column_zero() {
    let mut term = Terminal::new(80, 24);
    term.feed(b"XXXXXX\rHello");
    assert_eq!(grid_line(&term, 0), "HelloX");
}

#[test]
fn backspace_moves_cursor_left() {
    let mut term = Terminal::new(80, 24);
    term.feed(b"ABC\x08X");
    assert_eq!(grid_line(&term, 0), "ABX");
}

#[test]
fn line_wrapping_at_right_margin() {
    let mut term = Terminal::new(10, 24);
    term.feed(b"1234567890ABCDE");
    assert_eq!(grid_line(&term, 0), "1234567890");
    assert_eq!(grid_line(&term, 1), "ABCDE");
}

#[test]
fn pending_wrap_defers_until_next_printable() {
    let mut term = Terminal::new(10, 24);
    term.feed(b"1234567890");
    // Cursor reports the pre-wrap position.
    assert_eq!(term.cursor_row(), 0);
    assert_eq!(term.cursor_col(), 9);
    term.feed(b"A");
    assert_eq!(term.cursor_row(), 1);
    assert_eq!(term.cursor_col(), 1);
}

#[test]
fn cursor_position_report_between_fill_and_wrap() {
    let mut term = Terminal::new(10, 24);
    let replies = with_writer(&mut term);
    term.feed(b"1234567890\x1b[6n");
    assert_eq!(replies.borrow().as_slice(), [b"\x1b[1;10R".to_vec()]);
}

#[test]
fn autowrap_disabled_pins_cursor_at_margin() {
    let mut term = Terminal::new(10, 24);
    term.feed(b"\x1b[?7l1234567890XY");
    assert_eq!(term.cursor_row(), 0);
    // Margin column keeps being overwritten.
    assert_eq!(grid_line(&term, 0), "123456789Y");
}

// ============================================================================
// Cursor movement
// ============================================================================

#[test]
fn cup_moves_cursor() {
    let mut term = Terminal::new(80, 24);
    term.feed(b"\x1b[3;5HX");
    assert_eq!(term.grid().cell(2, 4).unwrap().base(), 'X');
}

#[test]
fn cup_clamps_out_of_range() {
    let mut term = Terminal::new(20, 10);
    term.feed(b"\x1b[99;99H");
    assert_eq!(term.cursor_row(), 9);
    assert_eq!(term.cursor_col(), 19);
}

#[test]
fn relative_moves() {
    let mut term = Terminal::new(80, 24);
    term.feed(b"\x1b[10;10H\x1b[2A\x1b[3C\x1b[1B\x1b[4D");
    assert_eq!(term.cursor_row(), 8);
    assert_eq!(term.cursor_col(), 8);
}

#[test]
fn relative_moves_clamp_at_edges() {
    let mut term = Terminal::new(20, 10);
    term.feed(b"\x1b[H\x1b[5A\x1b[5D");
    assert_eq!(term.cursor_row(), 0);
    assert_eq!(term.cursor_col(), 0);
    term.feed(b"\x1b[99B\x1b[99C");
    assert_eq!(term.cursor_row(), 9);
    assert_eq!(term.cursor_col(), 19);
}

#[test]
fn cnl_cpl_reset_column() {
    let mut term = Terminal::new(80, 24);
    term.feed(b"\x1b[5;10H\x1b[2E");
    assert_eq!(term.cursor_row(), 6);
    assert_eq!(term.cursor_col(), 0);
    term.feed(b"\x1b[5;10H\x1b[F");
    assert_eq!(term.cursor_row(), 3);
    assert_eq!(term.cursor_col(), 0);
}

#[test]
fn cha_and_vpa_absolute_positioning() {
    let mut term = Terminal::new(80, 24);
    term.feed(b"\x1b[5G");
    assert_eq!(term.cursor_col(), 4);
    term.feed(b"\x1b[7d");
    assert_eq!(term.cursor_row(), 6);
    assert_eq!(term.cursor_col(), 4);
}

#[test]
fn save_restore_cursor_and_attrs() {
    let mut term = Terminal::new(80, 24);
    term.feed(b"\x1b[31m\x1b[5;5H\x1b7\x1b[32m\x1b[1;1H\x1b8X");
    assert_eq!(term.cursor_row(), 4);
    let cell = term.grid().cell(4, 4).unwrap();
    assert_eq!(cell.base(), 'X');
    // DECRC restored the rendition saved by DECSC.
    assert_eq!(cell.style.fg, Color::Indexed(1));
}

// ============================================================================
// Erase operations
// ============================================================================

#[test]
fn el_variants() {
    let mut term = Terminal::new(10, 3);
    term.feed(b"abcdefghij\x1b[1;5H\x1b[K");
    assert_eq!(grid_line(&term, 0), "abcd");

    term.feed(b"\x1b[2;1Habcdefghij\x1b[2;5H\x1b[1K");
    assert_eq!(grid_line(&term, 1), "     fghij");

    term.feed(b"\x1b[3;1Habcdefghij\x1b[2K");
    assert_eq!(grid_line(&term, 2), "");
}

#[test]
fn ed_0_erases_below() {
    let mut term = Terminal::new(10, 3);
    term.feed(b"aaaaa\r\nbbbbb\r\nccccc\x1b[2;3H\x1b[J");
    assert_eq!(grid_line(&term, 0), "aaaaa");
    assert_eq!(grid_line(&term, 1), "bb");
    assert_eq!(grid_line(&term, 2), "");
}

#[test]
fn ed_1_erases_above() {
    let mut term = Terminal::new(10, 3);
    term.feed(b"aaaaa\r\nbbbbb\r\nccccc\x1b[2;3H\x1b[1J");
    assert_eq!(grid_line(&term, 0), "");
    assert_eq!(grid_line(&term, 1), "   bb");
    assert_eq!(grid_line(&term, 2), "ccccc");
}

#[test]
fn ed_2_clears_screen_into_scrollback() {
    let mut term = Terminal::new(10, 3);
    term.feed(b"one\r\ntwo\r\nthree\x1b[2J");
    assert_eq!(grid_line(&term, 0), "");
    assert_eq!(grid_line(&term, 1), "");
    assert_eq!(grid_line(&term, 2), "");
    // The previously visible rows moved into history.
    assert_eq!(term.scrollback_size(), 3);
    assert_eq!(scrollback_line(&term, 0), "one");
    assert_eq!(scrollback_line(&term, 1), "two");
    assert_eq!(scrollback_line(&term, 2), "three");
}

#[test]
fn ed_3_clears_scrollback() {
    let mut term = Terminal::new(10, 2);
    term.feed(b"one\r\ntwo\r\nthree");
    assert!(term.scrollback_size() > 0);
    term.feed(b"\x1b[3J");
    assert_eq!(term.scrollback_size(), 0);
}

#[test]
fn ech_erases_without_shifting() {
    let mut term = Terminal::new(10, 2);
    term.feed(b"abcdef\x1b[1;2H\x1b[3X");
    assert_eq!(grid_line(&term, 0), "a   ef");
}

#[test]
fn erase_uses_current_background() {
    let mut term = Terminal::new(10, 2);
    term.feed(b"abc\x1b[44m\x1b[2K");
    let cell = term.grid().cell(0, 0).unwrap();
    assert_eq!(cell.base(), ' ');
    assert_eq!(cell.style.bg, Color::Indexed(4));
    // Erased cells carry background only, not the full rendition.
    assert_eq!(cell.style.attrs, StyleAttrs::empty());
}

// ============================================================================
// Insert / delete
// ============================================================================

#[test]
fn ich_inserts_blanks() {
    let mut term = Terminal::new(10, 2);
    term.feed(b"abcd\x1b[1;2H\x1b[2@");
    assert_eq!(grid_line(&term, 0), "a  bcd");
}

#[test]
fn dch_deletes_cells() {
    let mut term = Terminal::new(10, 2);
    term.feed(b"abcdef\x1b[1;2H\x1b[2P");
    assert_eq!(grid_line(&term, 0), "adef");
}

#[test]
fn il_and_dl_within_region() {
    let mut term = Terminal::new(10, 4);
    term.feed(b"a\r\nb\r\nc\r\nd\x1b[2;1H\x1b[L");
    assert_eq!(grid_line(&term, 0), "a");
    assert_eq!(grid_line(&term, 1), "");
    assert_eq!(grid_line(&term, 2), "b");
    assert_eq!(grid_line(&term, 3), "c");

    term.feed(b"\x1b[2;1H\x1b[M");
    assert_eq!(grid_line(&term, 1), "b");
    assert_eq!(grid_line(&term, 2), "c");
}

#[test]
fn insert_mode_shifts_existing_text() {
    let mut term = Terminal::new(10, 2);
    term.feed(b"abc\x1b[1;1H\x1b[4hX\x1b[4l");
    assert_eq!(grid_line(&term, 0), "Xabc");
}

#[test]
fn rep_repeats_last_printable() {
    let mut term = Terminal::new(10, 2);
    term.feed(b"ab\x1b[3b");
    assert_eq!(grid_line(&term, 0), "abbbb");
}

// ============================================================================
// Scrolling and scrollback
// ============================================================================

#[test]
fn scrolled_lines_enter_scrollback_oldest_first() {
    let mut term = Terminal::new(10, 3);
    term.feed(b"one\r\ntwo\r\nthree\r\nfour\r\nfive");
    assert_eq!(grid_line(&term, 0), "three");
    assert_eq!(grid_line(&term, 1), "four");
    assert_eq!(grid_line(&term, 2), "five");
    assert_eq!(term.scrollback_size(), 2);
    assert_eq!(scrollback_line(&term, 0), "one");
    assert_eq!(scrollback_line(&term, 1), "two");
}

#[test]
fn su_and_sd_shift_viewport() {
    let mut term = Terminal::new(10, 3);
    term.feed(b"a\r\nb\r\nc\x1b[S");
    assert_eq!(grid_line(&term, 0), "b");
    assert_eq!(grid_line(&term, 1), "c");
    assert_eq!(grid_line(&term, 2), "");
    assert_eq!(term.scrollback_size(), 1);

    term.feed(b"\x1b[T");
    assert_eq!(grid_line(&term, 0), "");
    assert_eq!(grid_line(&term, 1), "b");
    assert_eq!(grid_line(&term, 2), "c");
}

#[test]
fn scroll_region_restricts_scrolling() {
    let mut term = Terminal::new(10, 5);
    term.feed(b"top\x1b[2;4r\x1b[4;1Hx\x1bD");
    // IND at the region bottom scrolls rows 1..=3 only.
    assert_eq!(grid_line(&term, 0), "top");
    assert_eq!(grid_line(&term, 2), "x");
    assert_eq!(grid_line(&term, 3), "");
    // A sub-region scroll never feeds scrollback.
    assert_eq!(term.scrollback_size(), 0);
}

#[test]
fn decstbm_homes_cursor() {
    let mut term = Terminal::new(10, 5);
    term.feed(b"\x1b[3;3H\x1b[2;4r");
    assert_eq!(term.cursor_row(), 0);
    assert_eq!(term.cursor_col(), 0);
}

#[test]
fn reverse_index_scrolls_down_at_top() {
    let mut term = Terminal::new(10, 3);
    term.feed(b"a\r\nb\r\nc\x1b[1;1H\x1bM");
    assert_eq!(grid_line(&term, 0), "");
    assert_eq!(grid_line(&term, 1), "a");
    assert_eq!(grid_line(&term, 2), "b");
}

#[test]
fn scrollback_honors_byte_budget() {
    let mut term = Terminal::builder()
        .size(10, 2)
        .max_scrollback_bytes(4096)
        .build();
    for i in 0..200 {
        term.feed(format!("line{i}\r\n").as_bytes());
    }
    let size = term.scrollback_size();
    assert!(size > 0);
    // Far fewer than 200 rows retained under a 4 KiB budget.
    assert!(size < 200);
    // Oldest retained rows are still contiguous with the newest.
    let newest = scrollback_line(&term, size - 1);
    assert!(newest.starts_with("line"));
}

// ============================================================================
// Alternate screen
// ============================================================================

#[test]
fn alt_screen_1049_swap_preserves_primary() {
    let mut term = Terminal::new(20, 5);
    term.feed(b"primary\x1b[?1049h");
    assert!(term.is_alt_screen());
    assert_eq!(grid_line(&term, 0), "");
    // The cursor position carries across the swap; home it before writing.
    term.feed(b"\x1b[Halt text");
    assert_eq!(grid_line(&term, 0), "alt text");
    term.feed(b"\x1b[?1049l");
    assert!(!term.is_alt_screen());
    assert_eq!(grid_line(&term, 0), "primary");
    // Cursor restored to its saved position after "primary".
    assert_eq!(term.cursor_row(), 0);
    assert_eq!(term.cursor_col(), 7);
}

#[test]
fn alt_screen_scrolling_never_touches_scrollback() {
    let mut term = Terminal::new(10, 2);
    term.feed(b"\x1b[?1049h");
    term.feed(b"a\r\nb\r\nc\r\nd\r\ne");
    assert_eq!(term.scrollback_size(), 0);
    term.feed(b"\x1b[?1049l");
    assert_eq!(term.scrollback_size(), 0);
}

#[test]
fn alt_screen_47_reenter_preserves_content() {
    let mut term = Terminal::new(20, 5);
    term.feed(b"\x1b[?47halt stuff\x1b[?47l");
    assert!(!term.is_alt_screen());
    // Plain 47 does not clear the alternate screen on exit.
    term.feed(b"\x1b[?47h");
    assert_eq!(grid_line(&term, 0), "alt stuff");
}

#[test]
fn ed_2_on_alt_screen_skips_scrollback() {
    let mut term = Terminal::new(10, 3);
    term.feed(b"\x1b[?1049hxyz\x1b[2J");
    assert_eq!(term.scrollback_size(), 0);
    assert_eq!(grid_line(&term, 0), "");
}

// ============================================================================
// SGR
// ============================================================================

#[test]
fn sgr_basic_attributes() {
    let mut term = Terminal::new(20, 2);
    term.feed(b"\x1b[1;3;4;7;9mX");
    let attrs = term.grid().cell(0, 0).unwrap().style.attrs;
    assert!(attrs.contains(StyleAttrs::BOLD));
    assert!(attrs.contains(StyleAttrs::ITALIC));
    assert!(attrs.contains(StyleAttrs::UNDERLINE));
    assert!(attrs.contains(StyleAttrs::INVERSE));
    assert!(attrs.contains(StyleAttrs::STRIKE));
}

#[test]
fn sgr_reset_clears_running_attrs() {
    let mut term = Terminal::new(20, 2);
    term.feed(b"\x1b[1;31mA\x1b[0mB");
    let a = term.grid().cell(0, 0).unwrap();
    let b = term.grid().cell(0, 1).unwrap();
    assert_eq!(a.style.fg, Color::Indexed(1));
    assert!(a.style.attrs.contains(StyleAttrs::BOLD));
    assert_eq!(b.style.fg, Color::Default);
    assert!(b.style.attrs.is_empty());
}

#[test]
fn sgr_16_and_bright_colors() {
    let mut term = Terminal::new(20, 2);
    term.feed(b"\x1b[34mA\x1b[94mB\x1b[45mC");
    assert_eq!(term.grid().cell(0, 0).unwrap().style.fg, Color::Indexed(4));
    assert_eq!(term.grid().cell(0, 1).unwrap().style.fg, Color::Indexed(12));
    assert_eq!(term.grid().cell(0, 2).unwrap().style.bg, Color::Indexed(5));
}

#[test]
fn sgr_256_and_truecolor() {
    let mut term = Terminal::new(20, 2);
    term.feed(b"\x1b[38;5;196mA\x1b[48;2;10;20;30mB");
    assert_eq!(
        term.grid().cell(0, 0).unwrap().style.fg,
        Color::Indexed(196)
    );
    assert_eq!(
        term.grid().cell(0, 1).unwrap().style.bg,
        Color::Rgb(10, 20, 30)
    );
}

#[test]
fn sgr_default_fg_bg_resets_colors_only() {
    let mut term = Terminal::new(20, 2);
    term.feed(b"\x1b[1;31;41m\x1b[39;49mX");
    let cell = term.grid().cell(0, 0).unwrap();
    assert_eq!(cell.style.fg, Color::Default);
    assert_eq!(cell.style.bg, Color::Default);
    assert!(cell.style.attrs.contains(StyleAttrs::BOLD));
}

#[test]
fn sgr_underline_styles_via_subparams() {
    let mut term = Terminal::new(20, 2);
    term.feed(b"\x1b[4:3mA\x1b[4:0mB");
    let a = term.grid().cell(0, 0).unwrap();
    assert!(a.style.attrs.contains(StyleAttrs::CURLY_UNDERLINE));
    let b = term.grid().cell(0, 1).unwrap();
    assert!(!b.style.attrs.intersects(StyleAttrs::ANY_UNDERLINE));
}

// ============================================================================
// Modes
// ============================================================================

#[test]
fn bracketed_paste_toggles() {
    let mut term = Terminal::new(20, 5);
    assert!(!term.bracketed_paste());
    term.feed(b"\x1b[?2004h");
    assert!(term.bracketed_paste());
    term.feed(b"\x1b[?2004l");
    assert!(!term.bracketed_paste());
}

#[test]
fn mouse_modes_and_encodings() {
    let mut term = Terminal::new(20, 5);
    term.feed(b"\x1b[?1000h");
    assert!(term.mouse_enabled());
    assert!(!term.mouse_motion());

    term.feed(b"\x1b[?1002h");
    assert!(term.mouse_motion());
    assert!(!term.mouse_any_motion());

    term.feed(b"\x1b[?1003h");
    assert!(term.mouse_any_motion());

    term.feed(b"\x1b[?1006h");
    assert!(term.mouse_sgr());
    term.feed(b"\x1b[?1006l");
    assert!(!term.mouse_sgr());

    term.feed(b"\x1b[?1003l");
    assert!(!term.mouse_enabled());
}

#[test]
fn cursor_visibility_mode() {
    let mut term = Terminal::new(20, 5);
    assert!(term.cursor_visible());
    term.feed(b"\x1b[?25l");
    assert!(!term.cursor_visible());
    term.feed(b"\x1b[?25h");
    assert!(term.cursor_visible());
}

#[test]
fn kitty_keyboard_set_push_pop_query() {
    let mut term = Terminal::new(20, 5);
    let replies = with_writer(&mut term);

    term.feed(b"\x1b[=5;1u");
    assert_eq!(term.kitty_keyboard_flags(), 5);

    term.feed(b"\x1b[>2u");
    assert_eq!(term.kitty_keyboard_flags(), 2);

    term.feed(b"\x1b[?u");
    assert_eq!(replies.borrow().last().unwrap(), b"\x1b[?2u");

    term.feed(b"\x1b[<u");
    assert_eq!(term.kitty_keyboard_flags(), 5);
}

#[test]
fn decrqm_reports_mode_status() {
    let mut term = Terminal::new(20, 5);
    let replies = with_writer(&mut term);
    term.feed(b"\x1b[?2004$p");
    assert_eq!(replies.borrow().last().unwrap(), b"\x1b[?2004;2$y");
    term.feed(b"\x1b[?2004h\x1b[?2004$p");
    assert_eq!(replies.borrow().last().unwrap(), b"\x1b[?2004;1$y");
}

// ============================================================================
// Reports
// ============================================================================

#[test]
fn cpr_reports_one_based_position() {
    let mut term = Terminal::new(20, 5);
    let replies = with_writer(&mut term);
    term.feed(b"\x1b[6n");
    assert_eq!(replies.borrow().as_slice(), [b"\x1b[1;1R".to_vec()]);

    term.feed(b"\x1b[3;4H\x1b[6n");
    assert_eq!(replies.borrow().last().unwrap(), b"\x1b[3;4R");
}

#[test]
fn device_attributes_reply() {
    let mut term = Terminal::new(20, 5);
    let replies = with_writer(&mut term);
    term.feed(b"\x1b[c");
    assert_eq!(replies.borrow().as_slice(), [b"\x1b[?62;22c".to_vec()]);
    term.feed(b"\x1b[>c");
    assert_eq!(replies.borrow().last().unwrap(), b"\x1b[>1;10;0c");
}

// ============================================================================
// Hyperlinks
// ============================================================================

#[test]
fn osc8_tags_written_cells() {
    let mut term = Terminal::new(20, 5);
    term.feed(b"\x1b]8;;https://example.com\x1b\\LINK\x1b]8;;\x1b\\plain");
    for col in 0..4 {
        assert_eq!(term.link_at(0, col), Some("https://example.com"));
    }
    assert_eq!(term.link_at(0, 4), None);
}

#[test]
fn osc8_identical_uri_reuses_tag() {
    let mut term = Terminal::new(40, 5);
    term.feed(b"\x1b]8;;https://example.com\x07a\x1b]8;;\x07");
    term.feed(b"\x1b]8;;https://example.com\x07b\x1b]8;;\x07");
    let tag_a = term.grid().cell(0, 0).unwrap().link;
    let tag_b = term.grid().cell(0, 1).unwrap().link;
    assert_ne!(tag_a, 0);
    assert_eq!(tag_a, tag_b);
}

#[test]
fn links_resolvable_from_scrollback() {
    let mut term = Terminal::new(10, 2);
    term.feed(b"\x1b]8;;https://h.test\x07L\x1b]8;;\x07\r\n\r\n\r\n");
    assert!(term.scrollback_size() >= 1);
    assert_eq!(term.scrollback_link_at(0, 0), Some("https://h.test"));
    assert_eq!(term.scrollback_link_at(0, 5), None);
    assert_eq!(term.scrollback_link_at(99, 0), None);
}

#[test]
fn osc8_uri_with_semicolons_survives() {
    let mut term = Terminal::new(40, 5);
    term.feed(b"\x1b]8;;https://e.com/q?a=1;b=2;c=3\x07x\x1b]8;;\x07");
    assert_eq!(term.link_at(0, 0), Some("https://e.com/q?a=1;b=2;c=3"));
}

// ============================================================================
// Wide characters
// ============================================================================

#[test]
fn wide_char_occupies_two_columns() {
    let mut term = Terminal::new(10, 2);
    term.feed("中a".as_bytes());
    let lead = term.grid().cell(0, 0).unwrap();
    let spacer = term.grid().cell(0, 1).unwrap();
    assert_eq!(lead.base(), '中');
    assert_eq!(lead.width(), 2);
    assert!(spacer.is_spacer());
    assert_eq!(term.grid().cell(0, 2).unwrap().base(), 'a');
    assert!(term.grid().wide_pairs_consistent());
}

#[test]
fn wide_char_wraps_when_one_column_remains() {
    let mut term = Terminal::new(10, 2);
    term.feed("123456789中".as_bytes());
    assert_eq!(grid_line(&term, 0), "123456789");
    assert_eq!(term.grid().cell(1, 0).unwrap().base(), '中');
    assert!(term.grid().wide_pairs_consistent());
}

#[test]
fn overwriting_wide_half_clears_partner() {
    let mut term = Terminal::new(10, 2);
    term.feed("中".as_bytes());
    term.feed(b"\x1b[1;2Hx");
    assert_eq!(term.grid().cell(0, 0).unwrap().base(), ' ');
    assert_eq!(term.grid().cell(0, 1).unwrap().base(), 'x');
    assert!(term.grid().wide_pairs_consistent());
}

#[test]
fn combining_mark_attaches_to_previous_cell() {
    let mut term = Terminal::new(10, 2);
    term.feed("e\u{0301}x".as_bytes());
    let cell = term.grid().cell(0, 0).unwrap();
    assert_eq!(cell.base(), 'e');
    assert_eq!(cell.combining(), ['\u{0301}']);
    assert_eq!(term.grid().cell(0, 1).unwrap().base(), 'x');
}

#[test]
fn malformed_utf8_becomes_replacement_char() {
    let mut term = Terminal::new(10, 2);
    term.feed(&[0xFF, b'a']);
    assert_eq!(
        term.grid().cell(0, 0).unwrap().base(),
        char::REPLACEMENT_CHARACTER
    );
    assert_eq!(term.grid().cell(0, 1).unwrap().base(), 'a');
}

// ============================================================================
// Resize
// ============================================================================

#[test]
fn resize_narrower_truncates_rows() {
    let mut term = Terminal::new(80, 24);
    term.feed(b"0123456789012345678901234567890123456789ABCDE");
    term.feed(b"\x1b[1;79H");
    term.resize(40, 24);
    assert_eq!(term.cols(), 40);
    assert_eq!(grid_line(&term, 0).len(), 40);
    // Cursor clamped into the new width.
    assert_eq!(term.cursor_col(), 39);
}

#[test]
fn resize_preserves_wide_pairing_at_boundary() {
    let mut term = Terminal::new(80, 24);
    term.feed(b"\x1b[1;40H");
    term.feed("中".as_bytes()); // occupies columns 39 and 40 (0-based)
    term.resize(40, 24);
    // The spacer was cut off; no orphan lead survives.
    assert!(term.grid().wide_pairs_consistent());
}

#[test]
fn resize_taller_pads_blank_rows() {
    let mut term = Terminal::new(10, 2);
    term.feed(b"a\r\nb");
    term.resize(10, 5);
    assert_eq!(grid_line(&term, 0), "a");
    assert_eq!(grid_line(&term, 1), "b");
    assert_eq!(grid_line(&term, 4), "");
}

// ============================================================================
// Dirty tracking
// ============================================================================

#[test]
fn writes_mark_rows_dirty() {
    let mut term = Terminal::new(10, 4);
    term.clear_all_dirty();
    term.feed(b"\x1b[3;1Hx");
    assert!(term.row_dirty(2));
    assert!(!term.row_dirty(0));
}

#[test]
fn cleared_row_stays_clean_until_mutation() {
    let mut term = Terminal::new(10, 4);
    term.feed(b"x");
    term.row_clear_dirty(0);
    assert!(!term.row_dirty(0));
    term.feed(b"\x1b[1;5Hy");
    assert!(term.row_dirty(0));
}

#[test]
fn scroll_marks_region_dirty() {
    let mut term = Terminal::new(10, 3);
    term.feed(b"a\r\nb\r\nc");
    term.clear_all_dirty();
    term.feed(b"\x1b[S");
    assert!(term.row_dirty(0));
    assert!(term.row_dirty(1));
    assert!(term.row_dirty(2));
}

#[test]
fn dirty_span_is_conservative_full_row() {
    let mut term = Terminal::new(10, 3);
    term.clear_all_dirty();
    term.feed(b"\x1b[2;5Hx");
    assert_eq!(term.row_dirty_span(1), Some((0, 9)));
    assert_eq!(term.row_dirty_span(0), None);
    assert_eq!(term.row_dirty_span(99), None);
}

// ============================================================================
// Tabs
// ============================================================================

#[test]
fn tab_moves_to_next_stop() {
    let mut term = Terminal::new(40, 2);
    term.feed(b"\tX");
    assert_eq!(term.grid().cell(0, 8).unwrap().base(), 'X');
}

#[test]
fn hts_and_tbc_manage_stops() {
    let mut term = Terminal::new(40, 2);
    // Set a stop at column 4, clear all default stops, then tab to it.
    term.feed(b"\x1b[1;5H\x1bH\r\tX");
    assert_eq!(term.grid().cell(0, 4).unwrap().base(), 'X');

    term.feed(b"\x1b[3g\r\tY");
    // All stops cleared: tab runs to the last column.
    assert_eq!(term.grid().cell(0, 39).unwrap().base(), 'Y');
}

#[test]
fn cbt_moves_backwards() {
    let mut term = Terminal::new(40, 2);
    term.feed(b"\x1b[1;20H\x1b[Z");
    assert_eq!(term.cursor_col(), 16);
    term.feed(b"\x1b[2Z");
    assert_eq!(term.cursor_col(), 0);
}

// ============================================================================
// Malformed input recovery
// ============================================================================

#[test]
fn malformed_csi_does_not_corrupt_following_text() {
    let mut term = Terminal::new(20, 5);
    // `?` after digits is malformed; the sequence is consumed silently.
    term.feed(b"\x1b[12?xA");
    assert_eq!(term.grid().cell(0, 0).unwrap().base(), 'A');
    assert_eq!(term.cursor_col(), 1);
}

#[test]
fn unknown_csi_final_is_ignored() {
    let mut term = Terminal::new(20, 5);
    term.feed(b"\x1b[99}B");
    assert_eq!(term.grid().cell(0, 0).unwrap().base(), 'B');
}

#[test]
fn split_sequences_across_feeds() {
    let mut whole = Terminal::new(20, 5);
    whole.feed(b"ab\x1b[1;31mcd\xE4\xB8\xADe");

    let mut split = Terminal::new(20, 5);
    for byte in b"ab\x1b[1;31mcd\xE4\xB8\xADe" {
        split.feed(&[*byte]);
    }

    for row in 0..5 {
        for col in 0..20 {
            assert_eq!(
                whole.grid().cell(row, col),
                split.grid().cell(row, col),
                "cell ({row},{col}) diverged"
            );
        }
    }
    assert_eq!(whole.cursor_row(), split.cursor_row());
    assert_eq!(whole.cursor_col(), split.cursor_col());
}

// ============================================================================
// Reset and alignment
// ============================================================================

#[test]
fn ris_resets_screen_and_modes_keeps_scrollback() {
    let mut term = Terminal::new(10, 2);
    term.feed(b"one\r\ntwo\r\nthree\x1b[?2004h\x1b[31m");
    let history = term.scrollback_size();
    assert!(history > 0);
    term.feed(b"\x1bc");
    assert_eq!(grid_line(&term, 0), "");
    assert!(!term.bracketed_paste());
    assert_eq!(term.cursor_row(), 0);
    assert_eq!(term.cursor_col(), 0);
    assert_eq!(term.scrollback_size(), history);
    term.feed(b"X");
    assert_eq!(term.grid().cell(0, 0).unwrap().style.fg, Color::Default);
}

#[test]
fn decaln_fills_screen() {
    let mut term = Terminal::new(10, 3);
    term.feed(b"\x1b#8");
    for row in 0..3 {
        assert_eq!(grid_line(&term, row), "EEEEEEEEEE");
    }
    assert_eq!(term.cursor_row(), 0);
    assert_eq!(term.cursor_col(), 0);
}

#[test]
fn dec_special_charset_draws_boxes() {
    let mut term = Terminal::new(10, 2);
    term.feed(b"\x1b(0lqk\x1b(B");
    assert_eq!(grid_line(&term, 0), "┌─┐");
}

#[test]
fn so_si_switch_between_charsets() {
    let mut term = Terminal::new(10, 2);
    // Designate line drawing into G1, shift in/out around a glyph.
    term.feed(b"\x1b)0a\x0eq\x0fa");
    assert_eq!(term.grid().cell(0, 0).unwrap().base(), 'a');
    assert_eq!(term.grid().cell(0, 1).unwrap().base(), '─');
    assert_eq!(term.grid().cell(0, 2).unwrap().base(), 'a');
}
