//! Built-in reference ROMs.

/// Canonical no-op word: `(!P3) ADD R0, R0, #0`.
pub const NOP: u32 = 0xE000_0000;

/// `(P3) BREAK 0x1F`, the end-of-program marker.
pub const HALT: u32 = 0xD118_3C00;

/// A named ROM shipped with the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinProgram {
    /// Short identifier.
    pub name: &'static str,
    /// One-line description.
    pub description: &'static str,
    /// ROM words, a whole number of packets.
    pub words: &'static [u32],
}

/// Rotated-constant adds into R0..R3, then halt.
pub const ROTATED_CONSTANTS: BuiltinProgram = BuiltinProgram {
    name: "rotated-constants",
    description: "ADD rotated immediates into R0-R3, then BREAK 0x1F",
    words: &[
        0xC004_0000,
        0xC004_4021,
        0xC006_C042,
        0xC800_0063,
        HALT,
        NOP,
        NOP,
        NOP,
    ],
};

/// `B $+0` forever; never reaches its halt packet.
pub const INFINITE_LOOP: BuiltinProgram = BuiltinProgram {
    name: "infinite-loop",
    description: "B $+0 with three NOPs",
    words: &[0xD800_0000, NOP, NOP, NOP, HALT, NOP, NOP, NOP],
};

/// `B $+0` with an `ADD R0, R0, #1` in the same packet.
pub const COUNTING_LOOP: BuiltinProgram = BuiltinProgram {
    name: "counting-loop",
    description: "B $+0 alongside ADD R0, R0, #1",
    words: &[0xD800_0000, 0xC004_0000, NOP, NOP, HALT, NOP, NOP, NOP],
};

/// Every built-in program in run order.
pub const BUILTIN_PROGRAMS: [BuiltinProgram; 3] =
    [ROTATED_CONSTANTS, INFINITE_LOOP, COUNTING_LOOP];
