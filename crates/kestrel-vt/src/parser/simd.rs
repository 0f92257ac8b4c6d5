//! Fast scanning for ground-state text.
//!
//! Typical terminal output is long runs of printable ASCII broken by ESC or
//! line controls. `memchr` finds those common stop bytes with SIMD; a
//! precise scan then bounds the printable run, catching the rarer stops
//! (other C0 controls, DEL, high bytes).

/// Split `input` into its leading run of printable ASCII (0x20..=0x7E) and
/// the rest. Either part may be empty.
#[must_use]
pub fn take_printable(input: &[u8]) -> (&[u8], &[u8]) {
    let stop = memchr::memchr3(0x1B, b'\n', b'\r', input).unwrap_or(input.len());
    let end = input[..stop]
        .iter()
        .position(|&b| !(0x20..=0x7E).contains(&b))
        .unwrap_or(stop);
    input.split_at(end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_printable() {
        let (run, rest) = take_printable(b"Hello, World!");
        assert_eq!(run, b"Hello, World!");
        assert!(rest.is_empty());
    }

    #[test]
    fn stops_at_escape() {
        let (run, rest) = take_printable(b"abc\x1b[31m");
        assert_eq!(run, b"abc");
        assert_eq!(rest, b"\x1b[31m");
    }

    #[test]
    fn stops_at_control_before_escape() {
        let (run, rest) = take_printable(b"ab\tcd\x1bx");
        assert_eq!(run, b"ab");
        assert_eq!(rest, b"\tcd\x1bx");
    }

    #[test]
    fn stops_at_high_byte() {
        let (run, rest) = take_printable(b"ab\xC3\xA9");
        assert_eq!(run, b"ab");
        assert_eq!(rest, b"\xC3\xA9");
    }

    #[test]
    fn leading_control_yields_empty_run() {
        let (run, rest) = take_printable(b"\nabc");
        assert!(run.is_empty());
        assert_eq!(rest, b"\nabc");
    }

    #[test]
    fn empty_input() {
        let (run, rest) = take_printable(b"");
        assert!(run.is_empty());
        assert!(rest.is_empty());
    }
}
