//! Property tests over the full pipeline.

use proptest::prelude::*;

use crate::terminal::Terminal;

/// Compare every observable piece of terminal state.
fn assert_same_state(a: &Terminal, b: &Terminal) {
    assert_eq!(a.cursor_row(), b.cursor_row());
    assert_eq!(a.cursor_col(), b.cursor_col());
    assert_eq!(a.is_alt_screen(), b.is_alt_screen());
    assert_eq!(a.bracketed_paste(), b.bracketed_paste());
    assert_eq!(a.kitty_keyboard_flags(), b.kitty_keyboard_flags());
    assert_eq!(a.scrollback_size(), b.scrollback_size());
    for row in 0..a.rows() {
        for col in 0..a.cols() {
            assert_eq!(
                a.grid().cell(row, col),
                b.grid().cell(row, col),
                "cell ({row},{col}) diverged"
            );
        }
    }
}

/// Fixed interesting fragments: movement, erase, scrolling, wide text
/// (`中`, `🎉`), a combining mark, hyperlinks, and malformed bytes.
const FRAGMENTS: &[&[u8]] = &[
    b"\r\n",
    b"\xE4\xB8\xAD",         // 中 (wide)
    b"\xF0\x9F\x8E\x89",     // 🎉 (wide)
    b"e\xCC\x81",            // e + combining acute
    b"\x1b[1;31m",
    b"\x1b[0m",
    b"\x1b[2J",
    b"\x1b[K",
    b"\x1b[3;2H",
    b"\x1b[5D",
    b"\x1b[2@",
    b"\x1b[3P",
    b"\x1b[2X",
    b"\x1b[2;4r",
    b"\x1b[r",
    b"\x1bM",
    b"\x1b]8;;https://p.test\x07",
    b"\x1b]8;;\x07",
    b"\x1b[12?x",
    b"\xFF\xC3",
];

/// Stream fragments that exercise printing, movement, erase, scrolling,
/// wide text, and sequences that should be recovered from.
fn fragment() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        "[ -~]{0,12}".prop_map(String::into_bytes),
        prop::sample::select(FRAGMENTS).prop_map(<[u8]>::to_vec),
    ]
}

proptest! {
    /// Splitting a byte stream at any point yields the same state as
    /// feeding it whole.
    #[test]
    fn chunk_boundary_independence(
        fragments in proptest::collection::vec(fragment(), 0..24),
        split in any::<prop::sample::Index>(),
    ) {
        let bytes: Vec<u8> = fragments.concat();

        let mut whole = Terminal::new(12, 4);
        whole.feed(&bytes);

        let mut chunked = Terminal::new(12, 4);
        let at = if bytes.is_empty() { 0 } else { split.index(bytes.len()) };
        chunked.feed(&bytes[..at]);
        chunked.feed(&bytes[at..]);

        assert_same_state(&whole, &chunked);
    }

    /// Feeding byte-at-a-time is equally indistinguishable.
    #[test]
    fn byte_at_a_time_independence(
        fragments in proptest::collection::vec(fragment(), 0..12),
    ) {
        let bytes: Vec<u8> = fragments.concat();

        let mut whole = Terminal::new(12, 4);
        whole.feed(&bytes);

        let mut single = Terminal::new(12, 4);
        for byte in &bytes {
            single.feed(std::slice::from_ref(byte));
        }

        assert_same_state(&whole, &single);
    }

    /// No input sequence may break the wide-cell pairing invariant.
    #[test]
    fn wide_pairing_survives_arbitrary_streams(
        fragments in proptest::collection::vec(fragment(), 0..32),
    ) {
        let mut term = Terminal::new(12, 4);
        for fragment in &fragments {
            term.feed(fragment);
            prop_assert!(term.grid().wide_pairs_consistent());
        }
    }

    /// Arbitrary garbage never panics the session and printables still land.
    #[test]
    fn arbitrary_bytes_never_panic(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let mut term = Terminal::new(12, 4);
        term.feed(&bytes);
        term.feed(b"\x1bc\x1b[HOK");
        // After a reset the session is fully functional again.
        prop_assert_eq!(term.grid().cell(0, 0).map(|c| c.base()), Some('O'));
        prop_assert_eq!(term.grid().cell(0, 1).map(|c| c.base()), Some('K'));
    }
}
