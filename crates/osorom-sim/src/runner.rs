//! Program execution and result reporting.
//!
//! A program runs on a fresh [`Machine`] until it halts, faults or reaches
//! the packet limit. Results carry the final register file and diagnostics
//! for printing.

use std::fmt;

use osorom_core::{
    CpuState, DiagCounters, Machine, PacketFault, RunState, SimConfig, StopReason, TerminalEvent,
};
use tracing::{debug, info, warn};

/// How a program run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramStatus {
    /// `BREAK 0x1F` committed.
    Halted,
    /// Another stopping terminal event committed.
    Stopped(TerminalEvent),
    /// The packet limit was reached without a stop.
    LimitReached,
    /// A packet faulted.
    Faulted(PacketFault),
    /// The machine was not running, so nothing executed.
    NotRunning(RunState),
}

impl ProgramStatus {
    /// Returns `true` unless the run faulted.
    #[must_use]
    pub const fn passed(&self) -> bool {
        !matches!(
            self,
            Self::Faulted(_) | Self::NotRunning(RunState::FaultLatched(_))
        )
    }
}

impl From<StopReason> for ProgramStatus {
    fn from(stop: StopReason) -> Self {
        match stop {
            StopReason::Terminal(TerminalEvent::Halt) => Self::Halted,
            StopReason::Terminal(event) => Self::Stopped(event),
            StopReason::PacketLimit => Self::LimitReached,
            StopReason::NotRunning(state) => Self::NotRunning(state),
            StopReason::Fault(fault) => Self::Faulted(fault),
        }
    }
}

impl fmt::Display for ProgramStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Halted => write!(f, "halted"),
            Self::Stopped(event) => write!(f, "stopped on {event:?}"),
            Self::LimitReached => write!(f, "packet limit reached"),
            Self::Faulted(fault) => write!(f, "fault: {fault}"),
            Self::NotRunning(state) => write!(f, "not running ({state:?})"),
        }
    }
}

/// Result of running one program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramResult {
    /// Program name.
    pub name: String,
    /// Packets committed.
    pub packets: u64,
    /// How the run ended.
    pub status: ProgramStatus,
    /// Final CPU state.
    pub cpu: CpuState,
    /// Run diagnostics.
    pub diag: DiagCounters,
}

impl ProgramResult {
    /// Returns `true` unless the run faulted.
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.status.passed()
    }

    /// General registers as `r = { .. }` in hex.
    #[must_use]
    pub fn register_dump(&self) -> String {
        let values: Vec<String> = self
            .cpu
            .gprs()
            .iter()
            .map(|value| format!("{value:x}"))
            .collect();
        format!("r = {{ {} }}", values.join(", "))
    }
}

impl fmt::Display for ProgramResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.passed() { "PASS" } else { "FAIL" };
        write!(
            f,
            "{verdict} {}: {} after {} packets (pc {:#x})",
            self.name,
            self.status,
            self.packets,
            self.cpu.pc()
        )
    }
}

/// Summary counts across several programs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Programs that did not fault.
    pub passed: usize,
    /// Programs that faulted.
    pub failed: usize,
}

impl RunSummary {
    /// Tallies `results`.
    #[must_use]
    pub fn of(results: &[ProgramResult]) -> Self {
        let passed = results.iter().filter(|result| result.passed()).count();
        Self {
            passed,
            failed: results.len() - passed,
        }
    }

    /// Number of programs run.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.passed + self.failed
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} passed, {} failed", self.passed, self.failed)
    }
}

/// Runs `rom` on a fresh machine built from `config`.
#[must_use]
pub fn run_program(name: &str, rom: &[u32], config: &SimConfig) -> ProgramResult {
    info!(name, words = rom.len(), "running program");
    let mut machine = Machine::new(rom.to_vec(), config.clone());
    let outcome = machine.run();
    let status = ProgramStatus::from(outcome.stop);
    match status {
        ProgramStatus::Faulted(fault) => warn!(name, %fault, "program faulted"),
        _ => debug!(name, %status, packets = outcome.packets, "program finished"),
    }
    ProgramResult {
        name: name.to_owned(),
        packets: outcome.packets,
        status,
        cpu: machine.cpu().clone(),
        diag: *machine.diag(),
    }
}

#[cfg(test)]
mod tests {
    use super::{run_program, ProgramStatus, RunSummary};
    use crate::programs::{COUNTING_LOOP, INFINITE_LOOP, NOP, ROTATED_CONSTANTS};
    use osorom_core::{Backpressure, FaultCode, Register, SimConfig};

    fn config(packet_limit: u64) -> SimConfig {
        SimConfig {
            backpressure: Backpressure::AlwaysReady,
            packet_limit,
            ..SimConfig::default()
        }
    }

    #[test]
    fn rotated_constants_halt_with_expected_registers() {
        let result = run_program(ROTATED_CONSTANTS.name, ROTATED_CONSTANTS.words, &config(64));
        assert_eq!(result.status, ProgramStatus::Halted);
        assert_eq!(result.packets, 2);
        assert!(result
            .register_dump()
            .starts_with("r = { 1, 40000000, 400, 200, 0,"));
        assert_eq!(
            result.to_string(),
            "PASS rotated-constants: halted after 2 packets (pc 0x8)"
        );
    }

    #[test]
    fn loops_stop_at_the_packet_limit() {
        let result = run_program(INFINITE_LOOP.name, INFINITE_LOOP.words, &config(32));
        assert_eq!(result.status, ProgramStatus::LimitReached);
        assert_eq!(result.cpu.pc(), 0);

        let result = run_program(COUNTING_LOOP.name, COUNTING_LOOP.words, &config(32));
        assert_eq!(result.packets, 32);
        assert_eq!(result.cpu.gpr(Register::from_u5(0)), 32);
        assert!(result.passed());
    }

    #[test]
    fn faults_fail_the_summary() {
        let faulting = run_program("off-the-end", &[NOP; 4], &config(8));
        assert!(matches!(
            faulting.status,
            ProgramStatus::Faulted(fault) if fault.code == FaultCode::FetchOutOfRange
        ));
        let halting = run_program(ROTATED_CONSTANTS.name, ROTATED_CONSTANTS.words, &config(8));
        let summary = RunSummary::of(&[faulting, halting]);
        assert_eq!(summary, RunSummary { passed: 1, failed: 1 });
        assert_eq!(summary.total(), 2);
        assert_eq!(summary.to_string(), "1 passed, 1 failed");
    }
}
