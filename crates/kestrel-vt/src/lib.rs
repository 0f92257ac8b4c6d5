//! Host-agnostic terminal emulation engine.
//!
//! `kestrel-vt` consumes a raw byte stream (interleaved text and escape
//! sequences) and maintains a queryable model of a terminal: the visible
//! cell grid, bounded scrollback history, operating modes, per-row damage,
//! and hyperlink state. It does no I/O and spawns no processes — pty
//! plumbing, input encoding, and rendering belong to the host.
//!
//! # Quick start
//!
//! ```
//! use kestrel_vt::Terminal;
//!
//! let mut term = Terminal::new(80, 24);
//! term.feed(b"\x1b[1;31mhello\x1b[0m");
//! assert_eq!(term.grid().cell(0, 0).unwrap().base(), 'h');
//! assert_eq!(term.cursor_col(), 5);
//! ```
//!
//! # Architecture
//!
//! - [`parser`] — table-driven escape-sequence state machine; recognizes
//!   sequences and forwards them to an [`parser::ActionSink`].
//! - [`grid`] — the visible cell matrix: cursor, scroll region, tab stops,
//!   wide-cell pairing, per-row damage.
//! - [`scrollback`] — byte-budgeted FIFO history of rows scrolled off the
//!   primary screen.
//! - [`link`] — hyperlink tag table shared by grid and scrollback cells.
//! - [`modes`] — DEC/ANSI mode flags, mouse reporting, kitty keyboard state.
//! - [`terminal`] — the session tying it all together: the sequence
//!   interpreter, reply writer, host events, and the snapshot surface.
//!
//! Malformed input never fails the session: bad UTF-8 becomes U+FFFD,
//! unrecognized sequences are consumed and ignored, and out-of-range
//! queries return empty results.

pub mod grid;
pub mod link;
pub mod modes;
pub mod parser;
pub mod scrollback;
pub mod terminal;

#[cfg(test)]
mod tests;

pub use grid::{Cell, Color, Cursor, Grid, Row, ScrollRegion, Style, StyleAttrs};
pub use link::{HyperlinkTable, LinkError, LinkTag};
pub use modes::{KittyKeyboardFlags, ModeState, MouseEncoding, MouseMode};
pub use parser::Parser;
pub use scrollback::{HistoryError, Scrollback};
pub use terminal::{
    CellSnapshot, EventSink, RowSnapshot, Terminal, TerminalBuilder, DEFAULT_SCROLLBACK_BYTES,
};
