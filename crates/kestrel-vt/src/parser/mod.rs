//! VT100/ANSI escape sequence parser.
//!
//! ## Design
//!
//! Table-driven state machine based on the
//! [vt100.net DEC ANSI parser](https://vt100.net/emu/dec_ansi_parser),
//! with UTF-8 decoding layered over the ground state.
//!
//! The parser recognizes sequences and forwards them to an [`ActionSink`];
//! it applies no terminal semantics itself. State persists across `advance`
//! calls, so a sequence split anywhere across feeds parses identically to
//! the unsplit stream.
//!
//! Malformed input never fails: bad UTF-8 becomes U+FFFD and resyncs at the
//! next lead byte, unrecognized sequences are consumed and ignored, and
//! parameter overflow saturates.

mod action;
mod simd;
mod state;
mod table;

pub use action::{ActionSink, NullSink};
pub use simd::take_printable;
pub use state::State;
pub use table::{ActionType, Transition, TRANSITIONS};

use arrayvec::ArrayVec;

/// Maximum number of CSI parameters.
pub const MAX_PARAMS: usize = 16;

/// Maximum number of intermediate bytes.
pub const MAX_INTERMEDIATES: usize = 4;

/// Maximum accumulated OSC data (64 KiB).
const MAX_OSC_DATA: usize = 65536;

/// Maximum OSC segments passed to the sink. The final segment receives the
/// undivided remainder, so hyperlink URIs containing semicolons survive.
const MAX_OSC_PARAMS: usize = 8;

/// VT parser state machine.
#[derive(Debug, Clone)]
pub struct Parser {
    state: State,
    params: ArrayVec<u16, MAX_PARAMS>,
    intermediates: ArrayVec<u8, MAX_INTERMEDIATES>,
    osc_data: Vec<u8>,
    current_param: u32,
    param_started: bool,
    dcs_active: bool,
    /// UTF-8 accumulation buffer for multi-byte sequences.
    utf8_buffer: [u8; 4],
    /// Bytes accumulated so far.
    utf8_len: u8,
    /// Total bytes expected for the current sequence (0 = none pending).
    utf8_expected: u8,
    /// Bit `i` set when `params[i]` was introduced by a colon.
    subparam_mask: u16,
    /// Whether the last separator seen was a colon.
    last_was_colon: bool,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// Create a parser in the ground state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: State::Ground,
            params: ArrayVec::new_const(),
            intermediates: ArrayVec::new_const(),
            osc_data: Vec::with_capacity(128),
            current_param: 0,
            param_started: false,
            dcs_active: false,
            utf8_buffer: [0; 4],
            utf8_len: 0,
            utf8_expected: 0,
            subparam_mask: 0,
            last_was_colon: false,
        }
    }

    /// Reset to the ground state, discarding any pending sequence.
    pub fn reset(&mut self) {
        self.state = State::Ground;
        self.clear();
        self.osc_data.clear();
        self.dcs_active = false;
        self.utf8_len = 0;
        self.utf8_expected = 0;
    }

    /// Current state.
    #[must_use]
    #[inline]
    pub fn state(&self) -> State {
        self.state
    }

    /// Process input bytes, forwarding actions to `sink`.
    ///
    /// Ground-state runs of printable ASCII are batched through
    /// [`ActionSink::print_run`]; everything else goes byte-by-byte through
    /// the transition table.
    pub fn advance<S: ActionSink>(&mut self, input: &[u8], sink: &mut S) {
        let mut remaining = input;
        while !remaining.is_empty() {
            if self.state == State::Ground {
                if self.utf8_expected > 0 {
                    let byte = remaining[0];
                    remaining = &remaining[1..];
                    self.utf8_continue(byte, sink);
                    continue;
                }

                let (printable, rest) = simd::take_printable(remaining);
                if !printable.is_empty() {
                    // SAFETY: `take_printable` returns only bytes in
                    // 0x20..=0x7E, all of which are single-byte UTF-8.
                    let text = unsafe { std::str::from_utf8_unchecked(printable) };
                    sink.print_run(text);
                }
                remaining = rest;
                if remaining.is_empty() {
                    break;
                }

                let byte = remaining[0];
                remaining = &remaining[1..];
                if byte >= 0x80 {
                    self.utf8_start(byte, sink);
                } else {
                    self.process_byte(byte, sink);
                }
            } else {
                let byte = remaining[0];
                remaining = &remaining[1..];
                self.process_byte(byte, sink);
            }
        }
    }

    /// Begin decoding at a high byte in ground state.
    #[inline]
    fn utf8_start<S: ActionSink>(&mut self, byte: u8, sink: &mut S) {
        let expected = match byte {
            0xC2..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF4 => 4,
            // Stray continuation, overlong lead, or out-of-range lead.
            _ => {
                sink.print(char::REPLACEMENT_CHARACTER);
                return;
            }
        };
        self.utf8_buffer[0] = byte;
        self.utf8_len = 1;
        self.utf8_expected = expected;
    }

    /// Continue a pending UTF-8 sequence.
    fn utf8_continue<S: ActionSink>(&mut self, byte: u8, sink: &mut S) {
        if (0x80..=0xBF).contains(&byte) {
            self.utf8_buffer[self.utf8_len as usize] = byte;
            self.utf8_len += 1;
            if self.utf8_len == self.utf8_expected {
                let bytes = &self.utf8_buffer[..self.utf8_len as usize];
                match std::str::from_utf8(bytes) {
                    Ok(text) => {
                        for ch in text.chars() {
                            sink.print(ch);
                        }
                    }
                    // Overlong encoding or surrogate range.
                    Err(_) => sink.print(char::REPLACEMENT_CHARACTER),
                }
                self.utf8_len = 0;
                self.utf8_expected = 0;
            }
        } else {
            // Invalid continuation: emit a replacement for the partial
            // sequence and reprocess this byte from scratch.
            sink.print(char::REPLACEMENT_CHARACTER);
            self.utf8_len = 0;
            self.utf8_expected = 0;
            if byte >= 0x80 {
                self.utf8_start(byte, sink);
            } else {
                self.process_byte(byte, sink);
            }
        }
    }

    /// Run one byte through the transition table.
    fn process_byte<S: ActionSink>(&mut self, byte: u8, sink: &mut S) {
        let transition = TRANSITIONS[self.state as usize][byte as usize];
        let prev_state = self.state;

        // Exit hooks: a string state left by any route still terminates its
        // string. ESC leading into ST, CAN/SUB aborts, and the explicit
        // terminators all converge here.
        if prev_state == State::DcsPassthrough
            && transition.next_state != State::DcsPassthrough
            && self.dcs_active
        {
            sink.dcs_unhook();
            self.dcs_active = false;
        }
        if prev_state == State::OscString
            && transition.next_state != State::OscString
            && transition.action != ActionType::OscEnd
        {
            self.dispatch_osc(sink);
        }

        match transition.action {
            ActionType::None | ActionType::Ignore => {}
            ActionType::Print => sink.print(byte as char),
            ActionType::Execute => sink.execute(byte),
            ActionType::Clear => {
                self.clear();
                self.osc_data.clear();
            }
            ActionType::Collect => self.collect(byte),
            ActionType::Param => self.add_param_byte(byte),
            ActionType::EscDispatch => sink.esc_dispatch(&self.intermediates, byte),
            ActionType::CsiDispatch => {
                if self.param_started {
                    self.finalize_param();
                }
                sink.csi_dispatch(&self.params, &self.intermediates, byte, self.subparam_mask);
            }
            ActionType::DcsHook => {
                if self.param_started {
                    self.finalize_param();
                }
                sink.dcs_hook(&self.params, &self.intermediates, byte);
                self.dcs_active = true;
            }
            ActionType::DcsPut => sink.dcs_put(byte),
            ActionType::DcsUnhook => {
                if self.dcs_active {
                    sink.dcs_unhook();
                    self.dcs_active = false;
                }
            }
            ActionType::OscStart => self.osc_data.clear(),
            ActionType::OscPut => {
                if self.osc_data.len() < MAX_OSC_DATA {
                    self.osc_data.push(byte);
                }
            }
            ActionType::OscEnd => self.dispatch_osc(sink),
        }

        self.state = transition.next_state;
    }

    /// Split accumulated OSC data on `;` and dispatch.
    ///
    /// The last permitted segment receives the entire remainder, so content
    /// containing semicolons (titles, URIs) is never truncated mid-payload.
    fn dispatch_osc<S: ActionSink>(&mut self, sink: &mut S) {
        {
            let mut params: ArrayVec<&[u8], MAX_OSC_PARAMS> = ArrayVec::new();
            let mut start = 0;
            for (i, &b) in self.osc_data.iter().enumerate() {
                if b == b';' && params.len() < MAX_OSC_PARAMS - 1 {
                    params.push(&self.osc_data[start..i]);
                    start = i + 1;
                }
            }
            params.push(&self.osc_data[start..]);
            sink.osc_dispatch(&params);
        }
        self.osc_data.clear();
    }

    /// Clear parameters and intermediates (entry to a new sequence).
    #[inline]
    fn clear(&mut self) {
        self.params.clear();
        self.intermediates.clear();
        self.current_param = 0;
        self.param_started = false;
        self.subparam_mask = 0;
        self.last_was_colon = false;
    }

    /// Accumulate a parameter digit or handle a `;`/`:` separator.
    #[inline]
    fn add_param_byte(&mut self, byte: u8) {
        match byte {
            b'0'..=b'9' => {
                self.current_param = self
                    .current_param
                    .saturating_mul(10)
                    .saturating_add(u32::from(byte - b'0'));
                self.param_started = true;
            }
            b';' => {
                self.finalize_param();
                self.last_was_colon = false;
            }
            b':' => {
                self.finalize_param();
                self.last_was_colon = true;
            }
            _ => {}
        }
    }

    /// Push the accumulated parameter, clamped to `u16::MAX`.
    #[inline]
    fn finalize_param(&mut self) {
        let index = self.params.len();
        if index < MAX_PARAMS {
            let value =
                u16::try_from(self.current_param.min(u32::from(u16::MAX))).unwrap_or(u16::MAX);
            self.params.push(value);
            if self.last_was_colon {
                self.subparam_mask |= 1 << index;
            }
        }
        self.current_param = 0;
        self.param_started = false;
    }

    /// Collect an intermediate or private-marker byte.
    #[inline]
    fn collect(&mut self, byte: u8) {
        if self.intermediates.len() < MAX_INTERMEDIATES {
            self.intermediates.push(byte);
        }
    }
}
