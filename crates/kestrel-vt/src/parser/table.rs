//! Compile-time state transition table.
//!
//! `TRANSITIONS[state][byte]` gives the action to perform and the state to
//! enter for every (state, byte) pair, following the vt100.net DEC ANSI
//! parser model. The table is built in a const context so lookups are a
//! plain double index at runtime.
//!
//! Deviations from the classic model, both shared with modern emulators:
//! - bytes ≥ 0x80 in ground state never reach the table (the parser decodes
//!   them as UTF-8 before lookup);
//! - `:` (0x3A) in CSI parameters is accumulated as a subparameter
//!   separator instead of routing to `CsiIgnore`.

use super::state::State;

/// Action attached to a state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionType {
    /// No action.
    None,
    /// Explicitly ignore the byte.
    Ignore,
    /// Print a ground-state byte.
    Print,
    /// Execute a C0 control.
    Execute,
    /// Clear collected parameters and intermediates.
    Clear,
    /// Collect an intermediate or private-marker byte.
    Collect,
    /// Accumulate a parameter digit or separator.
    Param,
    /// Dispatch a completed ESC sequence.
    EscDispatch,
    /// Dispatch a completed CSI sequence.
    CsiDispatch,
    /// Begin a DCS string.
    DcsHook,
    /// Forward a DCS data byte.
    DcsPut,
    /// End a DCS string.
    DcsUnhook,
    /// Begin an OSC string.
    OscStart,
    /// Accumulate an OSC data byte.
    OscPut,
    /// End an OSC string.
    OscEnd,
}

/// One table entry.
#[derive(Debug, Clone, Copy)]
pub struct Transition {
    /// Action to perform.
    pub action: ActionType,
    /// State to enter.
    pub next_state: State,
}

const fn t(action: ActionType, next_state: State) -> Transition {
    Transition { action, next_state }
}

/// C0 controls handled inside sequences: everything below 0x20 except
/// ESC (0x1B), CAN (0x18), and SUB (0x1A), which are covered by the
/// anywhere rules.
const fn is_seq_c0(byte: u8) -> bool {
    byte < 0x20 && byte != 0x1B && byte != 0x18 && byte != 0x1A
}

const fn ground(byte: u8) -> Transition {
    if is_seq_c0(byte) {
        t(ActionType::Execute, State::Ground)
    } else if byte >= 0x20 && byte <= 0x7E {
        t(ActionType::Print, State::Ground)
    } else {
        // DEL, plus bytes >= 0x80 (unreachable: the UTF-8 decoder claims
        // them before the table lookup).
        t(ActionType::Ignore, State::Ground)
    }
}

const fn escape(byte: u8) -> Transition {
    if is_seq_c0(byte) {
        t(ActionType::Execute, State::Escape)
    } else if byte >= 0x20 && byte <= 0x2F {
        t(ActionType::Collect, State::EscapeIntermediate)
    } else {
        match byte {
            0x50 => t(ActionType::None, State::DcsEntry),
            0x58 | 0x5E | 0x5F => t(ActionType::None, State::SosPmApcString),
            0x5B => t(ActionType::None, State::CsiEntry),
            0x5D => t(ActionType::OscStart, State::OscString),
            0x30..=0x7E => t(ActionType::EscDispatch, State::Ground),
            _ => t(ActionType::Ignore, State::Escape),
        }
    }
}

const fn escape_intermediate(byte: u8) -> Transition {
    if is_seq_c0(byte) {
        t(ActionType::Execute, State::EscapeIntermediate)
    } else if byte >= 0x20 && byte <= 0x2F {
        t(ActionType::Collect, State::EscapeIntermediate)
    } else if byte >= 0x30 && byte <= 0x7E {
        t(ActionType::EscDispatch, State::Ground)
    } else {
        t(ActionType::Ignore, State::EscapeIntermediate)
    }
}

const fn csi_entry(byte: u8) -> Transition {
    if is_seq_c0(byte) {
        t(ActionType::Execute, State::CsiEntry)
    } else if byte >= 0x20 && byte <= 0x2F {
        t(ActionType::Collect, State::CsiIntermediate)
    } else if byte >= 0x30 && byte <= 0x3B {
        t(ActionType::Param, State::CsiParam)
    } else if byte >= 0x3C && byte <= 0x3F {
        t(ActionType::Collect, State::CsiParam)
    } else if byte >= 0x40 && byte <= 0x7E {
        t(ActionType::CsiDispatch, State::Ground)
    } else {
        t(ActionType::Ignore, State::CsiEntry)
    }
}

const fn csi_param(byte: u8) -> Transition {
    if is_seq_c0(byte) {
        t(ActionType::Execute, State::CsiParam)
    } else if byte >= 0x20 && byte <= 0x2F {
        t(ActionType::Collect, State::CsiIntermediate)
    } else if byte >= 0x30 && byte <= 0x3B {
        t(ActionType::Param, State::CsiParam)
    } else if byte >= 0x3C && byte <= 0x3F {
        t(ActionType::None, State::CsiIgnore)
    } else if byte >= 0x40 && byte <= 0x7E {
        t(ActionType::CsiDispatch, State::Ground)
    } else {
        t(ActionType::Ignore, State::CsiParam)
    }
}

const fn csi_intermediate(byte: u8) -> Transition {
    if is_seq_c0(byte) {
        t(ActionType::Execute, State::CsiIntermediate)
    } else if byte >= 0x20 && byte <= 0x2F {
        t(ActionType::Collect, State::CsiIntermediate)
    } else if byte >= 0x30 && byte <= 0x3F {
        t(ActionType::None, State::CsiIgnore)
    } else if byte >= 0x40 && byte <= 0x7E {
        t(ActionType::CsiDispatch, State::Ground)
    } else {
        t(ActionType::Ignore, State::CsiIntermediate)
    }
}

const fn csi_ignore(byte: u8) -> Transition {
    if is_seq_c0(byte) {
        t(ActionType::Execute, State::CsiIgnore)
    } else if byte >= 0x40 && byte <= 0x7E {
        t(ActionType::Ignore, State::Ground)
    } else {
        t(ActionType::Ignore, State::CsiIgnore)
    }
}

const fn osc_string(byte: u8) -> Transition {
    match byte {
        0x07 => t(ActionType::OscEnd, State::Ground),
        0x9C => t(ActionType::OscEnd, State::Ground),
        0x20..=0x7F => t(ActionType::OscPut, State::OscString),
        // Raw high bytes are part of the UTF-8 payload.
        0x80..=0x9B | 0x9D..=0xFF => t(ActionType::OscPut, State::OscString),
        _ => t(ActionType::Ignore, State::OscString),
    }
}

const fn dcs_entry(byte: u8) -> Transition {
    if is_seq_c0(byte) {
        t(ActionType::Ignore, State::DcsEntry)
    } else if byte >= 0x20 && byte <= 0x2F {
        t(ActionType::Collect, State::DcsIntermediate)
    } else if byte >= 0x30 && byte <= 0x3B {
        t(ActionType::Param, State::DcsParam)
    } else if byte >= 0x3C && byte <= 0x3F {
        t(ActionType::Collect, State::DcsParam)
    } else if byte >= 0x40 && byte <= 0x7E {
        t(ActionType::DcsHook, State::DcsPassthrough)
    } else {
        t(ActionType::Ignore, State::DcsEntry)
    }
}

const fn dcs_param(byte: u8) -> Transition {
    if is_seq_c0(byte) {
        t(ActionType::Ignore, State::DcsParam)
    } else if byte >= 0x20 && byte <= 0x2F {
        t(ActionType::Collect, State::DcsIntermediate)
    } else if byte >= 0x30 && byte <= 0x3B {
        t(ActionType::Param, State::DcsParam)
    } else if byte >= 0x3C && byte <= 0x3F {
        t(ActionType::None, State::DcsIgnore)
    } else if byte >= 0x40 && byte <= 0x7E {
        t(ActionType::DcsHook, State::DcsPassthrough)
    } else {
        t(ActionType::Ignore, State::DcsParam)
    }
}

const fn dcs_intermediate(byte: u8) -> Transition {
    if is_seq_c0(byte) {
        t(ActionType::Ignore, State::DcsIntermediate)
    } else if byte >= 0x20 && byte <= 0x2F {
        t(ActionType::Collect, State::DcsIntermediate)
    } else if byte >= 0x30 && byte <= 0x3F {
        t(ActionType::None, State::DcsIgnore)
    } else if byte >= 0x40 && byte <= 0x7E {
        t(ActionType::DcsHook, State::DcsPassthrough)
    } else {
        t(ActionType::Ignore, State::DcsIntermediate)
    }
}

const fn dcs_passthrough(byte: u8) -> Transition {
    match byte {
        0x9C => t(ActionType::DcsUnhook, State::Ground),
        0x7F => t(ActionType::Ignore, State::DcsPassthrough),
        _ => {
            if is_seq_c0(byte) || (byte >= 0x20 && byte <= 0x7E) || byte >= 0x80 {
                t(ActionType::DcsPut, State::DcsPassthrough)
            } else {
                t(ActionType::Ignore, State::DcsPassthrough)
            }
        }
    }
}

const fn dcs_ignore(byte: u8) -> Transition {
    if byte == 0x9C {
        t(ActionType::Ignore, State::Ground)
    } else {
        t(ActionType::Ignore, State::DcsIgnore)
    }
}

const fn sos_pm_apc(byte: u8) -> Transition {
    if byte == 0x9C {
        t(ActionType::Ignore, State::Ground)
    } else {
        t(ActionType::Ignore, State::SosPmApcString)
    }
}

const fn transition_for(state: State, byte: u8) -> Transition {
    // Anywhere rules: ESC restarts sequence recognition, CAN/SUB abort.
    // The parser runs exit hooks (OSC dispatch, DCS unhook) before acting.
    match byte {
        0x1B => return t(ActionType::Clear, State::Escape),
        0x18 | 0x1A => return t(ActionType::Execute, State::Ground),
        _ => {}
    }

    match state {
        State::Ground => ground(byte),
        State::Escape => escape(byte),
        State::EscapeIntermediate => escape_intermediate(byte),
        State::CsiEntry => csi_entry(byte),
        State::CsiParam => csi_param(byte),
        State::CsiIntermediate => csi_intermediate(byte),
        State::CsiIgnore => csi_ignore(byte),
        State::OscString => osc_string(byte),
        State::DcsEntry => dcs_entry(byte),
        State::DcsParam => dcs_param(byte),
        State::DcsIntermediate => dcs_intermediate(byte),
        State::DcsPassthrough => dcs_passthrough(byte),
        State::DcsIgnore => dcs_ignore(byte),
        State::SosPmApcString => sos_pm_apc(byte),
    }
}

const fn state_from_index(index: usize) -> State {
    match index {
        0 => State::Ground,
        1 => State::Escape,
        2 => State::EscapeIntermediate,
        3 => State::CsiEntry,
        4 => State::CsiParam,
        5 => State::CsiIntermediate,
        6 => State::CsiIgnore,
        7 => State::OscString,
        8 => State::DcsEntry,
        9 => State::DcsParam,
        10 => State::DcsIntermediate,
        11 => State::DcsPassthrough,
        12 => State::DcsIgnore,
        _ => State::SosPmApcString,
    }
}

const fn build_table() -> [[Transition; 256]; State::COUNT] {
    let mut table = [[t(ActionType::None, State::Ground); 256]; State::COUNT];
    let mut state = 0;
    while state < State::COUNT {
        let mut byte = 0;
        while byte < 256 {
            table[state][byte] = transition_for(state_from_index(state), byte as u8);
            byte += 1;
        }
        state += 1;
    }
    table
}

/// The full transition table, indexed `[state as usize][byte as usize]`.
pub static TRANSITIONS: [[Transition; 256]; State::COUNT] = build_table();
