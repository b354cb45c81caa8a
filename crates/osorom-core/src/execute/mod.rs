//! Packet execution: predicate evaluation, lane execution and atomic commit.
//!
//! A packet runs in four phases:
//! 1. Evaluate each lane's predicate against the pre-packet flags.
//! 2. Compute every active lane's effects from the pre-packet snapshot.
//! 3. Reject same-packet write conflicts, then serve pending data accesses
//!    through the memory port: every load against pre-packet memory, then
//!    every store.
//! 4. Apply all register, predicate and PC updates in one step.
//!
//! A fault in any phase leaves `CpuState` untouched. Lane faults, including
//! out-of-range data addresses, are raised before the first bus access, so
//! memory is untouched as well; only a bus protocol fault can interrupt a
//! packet after its first store.

mod commit;
mod lane;
mod lsu;

pub use commit::check_conflicts;
pub use lane::{execute_lane, ControlEffect, LaneEffects, PendingAccess};
pub use lsu::{resolve_load, resolve_store};

use tracing::{debug, warn};

use crate::api::{MemoryPort, PacketOutcome, TerminalEvent};
use crate::decoder::InstructionPacket;
use crate::fault::PacketFault;
use crate::state::{CpuState, PACKET_SLOTS};

const LANES: usize = PACKET_SLOTS as usize;

/// Returns which lanes of `packet` are active under the current predicates.
#[must_use]
pub fn active_lanes(packet: &InstructionPacket, cpu: &CpuState) -> [bool; LANES] {
    packet
        .lanes
        .map(|lane| lane.is_active(cpu.predicate(lane.predicate)))
}

/// Executes one packet located at `cpu.pc()`.
///
/// # Errors
///
/// Returns a [`PacketFault`] for an unimplemented instruction or an illegal
/// data access on an active lane, a same-packet write conflict, or a bus
/// protocol fault. No architectural state is committed when a fault is
/// returned.
pub fn execute_packet(
    packet: &InstructionPacket,
    cpu: &mut CpuState,
    port: &mut dyn MemoryPort,
) -> Result<PacketOutcome, PacketFault> {
    let pc = cpu.pc();
    let active = active_lanes(packet, cpu);
    debug!(pc, ?active, "executing packet");

    let result = run_phases(packet, &active, cpu, port);
    if let Err(fault) = &result {
        warn!(pc, lane = ?fault.lane, code = %fault.code, "packet fault");
    }
    result
}

fn run_phases(
    packet: &InstructionPacket,
    active: &[bool; LANES],
    cpu: &mut CpuState,
    port: &mut dyn MemoryPort,
) -> Result<PacketOutcome, PacketFault> {
    let pc = cpu.pc();
    let memory_bytes = port.size_bytes();
    let mut effects: [Option<LaneEffects>; LANES] = [None; LANES];
    for (index, (slot, instruction)) in effects.iter_mut().zip(&packet.lanes).enumerate() {
        if active[index] {
            let lane = lane_number(index);
            *slot = Some(
                execute_lane(instruction, cpu, pc, memory_bytes)
                    .map_err(|code| PacketFault::lane(pc, lane, code))?,
            );
        }
    }

    check_conflicts(&effects).map_err(|(lane, code)| PacketFault::lane(pc, lane, code))?;

    let served = lsu::serve_packet(&mut effects, cpu.reservation(), port)
        .map_err(|(lane, fault)| PacketFault::bus(pc, Some(lane), fault))?;

    let (next_pc, branch_taken, terminal) = commit::apply(cpu, &effects, served.reservation);
    let outcome = PacketOutcome {
        pc,
        next_pc,
        active_lanes: *active,
        branch_taken,
        terminal,
        memory_accesses: served.accesses,
    };
    debug!(pc, next_pc, branch_taken, ?terminal, "packet committed");
    Ok(outcome)
}

fn lane_number(index: usize) -> u8 {
    u8::try_from(index).unwrap_or(u8::MAX)
}

/// Returns the packet's terminal event when it stops execution.
#[must_use]
pub fn is_stopping(outcome: &PacketOutcome) -> Option<TerminalEvent> {
    outcome.terminal.filter(|event| event.stops_execution())
}
