use std::fmt;

/// Number of architecturally visible general-purpose registers (`R0..R31`).
pub const GENERAL_REGISTER_COUNT: usize = 32;
/// Number of single-bit predicate flags (`P0..P3`).
pub const PREDICATE_COUNT: usize = 4;
/// Number of coprocessor-0 registers reachable through `MFC`/`MTC`.
pub const COPROCESSOR_REGISTER_COUNT: usize = 32;
/// Instruction slots per packet; also the fall-through PC increment.
pub const PACKET_SLOTS: u32 = 4;

/// General-purpose register identifier (`R0..R31`).
///
/// `R0` is an ordinary read/write register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Register(u8);

impl Register {
    /// Register that receives the return address of a branch-and-link.
    pub const LINK: Self = Self(31);

    /// Returns the register for `index`, or `None` when `index > 31`.
    #[must_use]
    pub const fn new(index: u8) -> Option<Self> {
        if (index as usize) < GENERAL_REGISTER_COUNT {
            Some(Self(index))
        } else {
            None
        }
    }

    /// Decodes a 5-bit register field; upper bits of `bits` are ignored.
    #[must_use]
    pub const fn from_u5(bits: u32) -> Self {
        Self((bits & 0x1F) as u8)
    }

    /// Returns the array index for this register (`0..=31`).
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns the raw 5-bit field value.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0 as u32
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

/// Predicate flag identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum PredicateRegister {
    P0 = 0,
    P1 = 1,
    P2 = 2,
    P3 = 3,
}

impl PredicateRegister {
    /// Ordered list of all predicate flags.
    pub const ALL: [Self; PREDICATE_COUNT] = [Self::P0, Self::P1, Self::P2, Self::P3];

    /// Hard-wired true predicate; `(P3)` means always, `(!P3)` means never.
    pub const ALWAYS: Self = Self::P3;

    /// Decodes a 2-bit predicate field; upper bits of `bits` are ignored.
    #[must_use]
    pub const fn from_u2(bits: u32) -> Self {
        match bits & 0x3 {
            0 => Self::P0,
            1 => Self::P1,
            2 => Self::P2,
            _ => Self::P3,
        }
    }

    /// Returns the array index for this flag (`0..=3`).
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns the raw 2-bit field value.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for PredicateRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.index())
    }
}

/// Full architectural CPU state: register file, PC, predicates and the
/// auxiliary registers written by `Other`-class lanes.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CpuState {
    gpr: [u32; GENERAL_REGISTER_COUNT],
    pc: u32,
    predicates: [bool; PREDICATE_COUNT],
    extra: u32,
    coprocessor: [u32; COPROCESSOR_REGISTER_COUNT],
    reservation: Option<u32>,
}

impl Default for CpuState {
    fn default() -> Self {
        Self {
            gpr: [0; GENERAL_REGISTER_COUNT],
            pc: 0,
            predicates: [false, false, false, true],
            extra: 0,
            coprocessor: [0; COPROCESSOR_REGISTER_COUNT],
            reservation: None,
        }
    }
}

impl CpuState {
    /// Reads a general-purpose register.
    #[must_use]
    pub const fn gpr(&self, reg: Register) -> u32 {
        self.gpr[reg.index()]
    }

    /// Writes a general-purpose register.
    pub const fn set_gpr(&mut self, reg: Register, value: u32) {
        self.gpr[reg.index()] = value;
    }

    /// Returns the whole general-purpose register file.
    #[must_use]
    pub const fn gprs(&self) -> &[u32; GENERAL_REGISTER_COUNT] {
        &self.gpr
    }

    /// Reads the program counter (instruction-slot units).
    #[must_use]
    pub const fn pc(&self) -> u32 {
        self.pc
    }

    /// Writes the program counter.
    pub const fn set_pc(&mut self, value: u32) {
        self.pc = value;
    }

    /// Reads a predicate flag. `P3` always reads true.
    #[must_use]
    pub const fn predicate(&self, pred: PredicateRegister) -> bool {
        match pred {
            PredicateRegister::P3 => true,
            _ => self.predicates[pred.index()],
        }
    }

    /// Writes a predicate flag. Writes to `P3` are discarded.
    pub const fn set_predicate(&mut self, pred: PredicateRegister, value: bool) {
        if !matches!(pred, PredicateRegister::P3) {
            self.predicates[pred.index()] = value;
        }
    }

    /// Reads the extra-result register written by `MULT`/`DIV`/`MTHI`.
    #[must_use]
    pub const fn extra(&self) -> u32 {
        self.extra
    }

    /// Writes the extra-result register.
    pub const fn set_extra(&mut self, value: u32) {
        self.extra = value;
    }

    /// Reads a coprocessor-0 register.
    #[must_use]
    pub const fn coprocessor(&self, reg: Register) -> u32 {
        self.coprocessor[reg.index()]
    }

    /// Writes a coprocessor-0 register.
    pub const fn set_coprocessor(&mut self, reg: Register, value: u32) {
        self.coprocessor[reg.index()] = value;
    }

    /// Returns the byte address reserved by the last `LL`, if still held.
    #[must_use]
    pub const fn reservation(&self) -> Option<u32> {
        self.reservation
    }

    /// Replaces the load-linked reservation.
    pub const fn set_reservation(&mut self, addr: Option<u32>) {
        self.reservation = addr;
    }

    /// Resets every register, flag and the PC to power-on values.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
