//! Saturating run diagnostics.

use std::fmt;

use crate::api::PacketOutcome;
use crate::fault::{FaultClass, FaultCode};

/// Counters accumulated by [`crate::Machine`] across packets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DiagCounters {
    /// Packets committed.
    pub packets_retired: u64,
    /// Lanes whose predicate allowed execution.
    pub active_lanes: u64,
    /// Lanes suppressed by their predicate.
    pub squashed_lanes: u64,
    /// Data accesses served by the bus.
    pub memory_accesses: u64,
    /// Taken branches.
    pub branches_taken: u64,
    /// Bus clocks.
    pub bus_cycles: u64,
    /// Bus clocks on which the port was not ready.
    pub bus_stall_cycles: u64,
    /// Decode-class faults.
    pub fault_count_decode: u32,
    /// Memory-class faults.
    pub fault_count_memory: u32,
    /// Commit-class faults.
    pub fault_count_commit: u32,
    /// Fetch-class faults.
    pub fault_count_fetch: u32,
    /// Bus-class faults.
    pub fault_count_bus: u32,
    /// Most recent fault code.
    pub last_fault_code: Option<FaultCode>,
    /// Packet address of the most recent fault.
    pub last_fault_pc: u32,
}

impl DiagCounters {
    /// Records a committed packet.
    pub fn record_packet(&mut self, outcome: &PacketOutcome) {
        let active = u64::from(outcome.active_count());
        self.packets_retired = self.packets_retired.saturating_add(1);
        self.active_lanes = self.active_lanes.saturating_add(active);
        self.squashed_lanes = self
            .squashed_lanes
            .saturating_add(outcome.active_lanes.len() as u64 - active);
        self.memory_accesses = self
            .memory_accesses
            .saturating_add(u64::from(outcome.memory_accesses));
        if outcome.branch_taken {
            self.branches_taken = self.branches_taken.saturating_add(1);
        }
    }

    /// Records a fault, updating the last-fault fields and its class counter.
    pub fn record_fault(&mut self, code: FaultCode, pc: u32) {
        self.last_fault_code = Some(code);
        self.last_fault_pc = pc;
        let counter = match code.class() {
            FaultClass::Decode => &mut self.fault_count_decode,
            FaultClass::Memory => &mut self.fault_count_memory,
            FaultClass::Commit => &mut self.fault_count_commit,
            FaultClass::Fetch => &mut self.fault_count_fetch,
            FaultClass::Bus => &mut self.fault_count_bus,
        };
        *counter = counter.saturating_add(1);
    }

    /// Replaces the bus counters with the transactor's totals.
    pub const fn sync_bus(&mut self, cycles: u64, stall_cycles: u64) {
        self.bus_cycles = cycles;
        self.bus_stall_cycles = stall_cycles;
    }

    /// Total faults across all classes.
    #[must_use]
    pub const fn total_faults(&self) -> u64 {
        self.fault_count_decode as u64
            + self.fault_count_memory as u64
            + self.fault_count_commit as u64
            + self.fault_count_fetch as u64
            + self.fault_count_bus as u64
    }
}

impl fmt::Display for DiagCounters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "packets={} lanes={}/{} mem={} branches={} bus={} stalls={} faults={}",
            self.packets_retired,
            self.active_lanes,
            self.active_lanes + self.squashed_lanes,
            self.memory_accesses,
            self.branches_taken,
            self.bus_cycles,
            self.bus_stall_cycles,
            self.total_faults()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::DiagCounters;
    use crate::api::{PacketOutcome, TerminalEvent};
    use crate::FaultCode;

    #[test]
    fn packet_records_lane_activity() {
        let mut counters = DiagCounters::default();
        counters.record_packet(&PacketOutcome {
            pc: 0,
            next_pc: 0,
            active_lanes: [true, false, true, false],
            branch_taken: true,
            terminal: Some(TerminalEvent::Fence),
            memory_accesses: 1,
        });
        assert_eq!(counters.packets_retired, 1);
        assert_eq!(counters.active_lanes, 2);
        assert_eq!(counters.squashed_lanes, 2);
        assert_eq!(counters.branches_taken, 1);
        assert_eq!(counters.memory_accesses, 1);
    }

    #[test]
    fn faults_count_by_class() {
        let mut counters = DiagCounters::default();
        counters.record_fault(FaultCode::UnimplementedInstruction, 4);
        counters.record_fault(FaultCode::ControlConflict, 8);
        counters.record_fault(FaultCode::RegisterWriteConflict, 12);
        assert_eq!(counters.fault_count_decode, 1);
        assert_eq!(counters.fault_count_commit, 2);
        assert_eq!(counters.last_fault_code, Some(FaultCode::RegisterWriteConflict));
        assert_eq!(counters.last_fault_pc, 12);
        assert_eq!(counters.total_faults(), 3);
    }

    #[test]
    fn fault_counters_saturate() {
        let mut counters = DiagCounters {
            fault_count_bus: u32::MAX,
            ..DiagCounters::default()
        };
        counters.record_fault(FaultCode::BusProtocol, 0);
        assert_eq!(counters.fault_count_bus, u32::MAX);
    }

    #[test]
    fn summary_line_is_compact() {
        let counters = DiagCounters {
            packets_retired: 2,
            active_lanes: 5,
            squashed_lanes: 3,
            ..DiagCounters::default()
        };
        assert_eq!(
            counters.to_string(),
            "packets=2 lanes=5/8 mem=0 branches=0 bus=0 stalls=0 faults=0"
        );
    }
}
