//! Core simulator crate for the OSOROM predicated packet CPU.
//!
//! A packet is four instruction slots executed in lockstep against a
//! snapshot of architectural state and committed atomically. Data accesses
//! travel over a cycle-level, line-granular memory bus with ready/valid
//! handshaking, bursts and injectable backpressure.

/// Fault taxonomy for packet execution and the memory bus.
pub mod fault;
pub use fault::{FaultClass, FaultCode, PacketFault, ProtocolFault};

/// Architectural CPU state: general registers, predicates and run state.
pub mod state;
pub use state::{
    CpuState, PredicateRegister, Register, RunState, COPROCESSOR_REGISTER_COUNT,
    GENERAL_REGISTER_COUNT, PACKET_SLOTS, PREDICATE_COUNT,
};

/// Instruction-word field layout and opcode tables.
pub mod encoding;
pub use encoding::{AluOp, CompareOp, LoadStoreOp, OperationClass, OtherOp, ShiftType};

/// Instruction and packet decoding.
pub mod decoder;
pub use decoder::{
    AluSource, BranchTarget, DecodedInstruction, Decoder, InstructionPacket, Operation,
};

/// ALU, shifter and compare evaluation.
pub mod alu;

/// Line-granular backing store and sub-line access helpers.
pub mod memory;
pub use memory::{MemoryImage, Line, FULL_BYTE_ENABLE, LINE_BYTES, LINE_WORDS};

/// Cycle-level memory bus transactor, readiness policies and bus master.
pub mod bus;
pub use bus::{
    AlwaysReady, BurstDirection, BusMaster, BusRequest, BusResponse, BusState, MemoryBus,
    RandomBackpressure, ReadyPolicy, ReadyReplay,
};

/// Host-facing configuration, outcome types and the memory port seam.
pub mod api;
pub use api::{
    Backpressure, MemoryPort, PacketOutcome, RunOutcome, SimConfig, StepOutcome, StopReason,
    TerminalEvent, DEFAULT_MEMORY_BYTES, DEFAULT_NOT_READY_PERCENT, DEFAULT_PACKET_LIMIT,
};

/// Packet execution pipeline.
pub mod execute;
pub use execute::{execute_packet, is_stopping};

/// Run diagnostics counters.
pub mod diag;
pub use diag::DiagCounters;

/// ROM fetch and run loop tying the executor to the bus.
pub mod machine;
pub use machine::Machine;

/// Mnemonic rendering of instructions and ROM listings.
pub mod disasm;
pub use disasm::{disassemble_rom, DisassemblyRow};

/// Seeded random instruction generation.
pub mod fuzz;
pub use fuzz::InstructionFuzzer;

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
