//! Architectural CPU state model primitives.

/// Architectural register file types and storage model.
pub mod registers;
/// Host-observable execution state of the machine harness.
pub mod run_state;

pub use registers::{
    CpuState, PredicateRegister, Register, COPROCESSOR_REGISTER_COUNT, GENERAL_REGISTER_COUNT,
    PACKET_SLOTS, PREDICATE_COUNT,
};
pub use run_state::RunState;
