//! Host-facing API: configuration, outcome types and the executor's memory seam.

use crate::bus::{AlwaysReady, RandomBackpressure, ReadyPolicy, ReadyReplay};
use crate::fault::{PacketFault, ProtocolFault};
use crate::memory::Line;
use crate::state::RunState;

/// Default backing store size in bytes.
pub const DEFAULT_MEMORY_BYTES: usize = 64 * 1024;

/// Default number of packets [`crate::Machine::run`] executes before stopping.
pub const DEFAULT_PACKET_LIMIT: u64 = 4096;

/// Default per-cycle not-ready probability in percent (96% ready).
pub const DEFAULT_NOT_READY_PERCENT: u8 = 4;

/// Line-granular memory port used by load/store lanes.
///
/// The packet executor never touches the backing store directly; every
/// data access goes through this seam.
pub trait MemoryPort {
    /// Size of the backing store behind the port, in bytes.
    fn size_bytes(&self) -> usize;

    /// Reads one 16-byte line.
    ///
    /// # Errors
    ///
    /// Returns the bus protocol fault raised while serving the read.
    fn read_line(&mut self, line: u32) -> Result<Line, ProtocolFault>;

    /// Writes the byte-enabled bytes of one 16-byte line.
    ///
    /// # Errors
    ///
    /// Returns the bus protocol fault raised while serving the write.
    fn write_line(&mut self, line: u32, byte_enable: u16, data: Line)
        -> Result<(), ProtocolFault>;
}

/// Readiness policy selection for the memory bus transactor.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Backpressure {
    /// Ready on every cycle.
    AlwaysReady,
    /// Independent per-cycle not-ready probability.
    Random {
        /// Probability of a not-ready cycle, in percent.
        not_ready_percent: u8,
        /// Generator seed.
        seed: u64,
    },
    /// Scripted readiness, then always ready.
    Replay(Vec<bool>),
}

impl Default for Backpressure {
    fn default() -> Self {
        Self::Random {
            not_ready_percent: DEFAULT_NOT_READY_PERCENT,
            seed: 0,
        }
    }
}

impl Backpressure {
    /// Instantiates the configured policy.
    #[must_use]
    pub fn policy(&self) -> Box<dyn ReadyPolicy> {
        match self {
            Self::AlwaysReady => Box::new(AlwaysReady),
            Self::Random {
                not_ready_percent,
                seed,
            } => Box::new(RandomBackpressure::new(*not_ready_percent, *seed)),
            Self::Replay(sequence) => Box::new(ReadyReplay::new(sequence.iter().copied())),
        }
    }
}

/// Simulation configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct SimConfig {
    /// Backing store size in bytes, rounded up to whole lines.
    pub memory_bytes: usize,
    /// Bus readiness policy.
    pub backpressure: Backpressure,
    /// Packets executed by one `run` call before it stops.
    pub packet_limit: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            memory_bytes: DEFAULT_MEMORY_BYTES,
            backpressure: Backpressure::default(),
            packet_limit: DEFAULT_PACKET_LIMIT,
        }
    }
}

/// Packet-terminal events raised by active `Other`-class lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum TerminalEvent {
    /// `BREAK 0x1F`: program finished.
    Halt,
    /// `BREAK` with any other code.
    Breakpoint {
        /// Break code.
        code: u8,
    },
    /// `SYSCALL`.
    Syscall {
        /// Call number.
        code: u8,
    },
    /// `FENCE`: memory ordering point.
    Fence,
    /// `ERET`.
    ExceptionReturn,
}

impl TerminalEvent {
    /// `BREAK` code that ends a test program.
    pub const HALT_CODE: u8 = 0x1F;

    /// Returns `true` when the event stops a run loop.
    ///
    /// `FENCE` needs no caller action with a single in-order port.
    #[must_use]
    pub const fn stops_execution(self) -> bool {
        !matches!(self, Self::Fence)
    }
}

/// Result of committing one packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct PacketOutcome {
    /// Packet address, in instruction slots.
    pub pc: u32,
    /// PC after commit.
    pub next_pc: u32,
    /// Lane activity after predicate evaluation.
    pub active_lanes: [bool; 4],
    /// An active branch redirected control.
    pub branch_taken: bool,
    /// Packet-terminal event, if an active lane raised one.
    pub terminal: Option<TerminalEvent>,
    /// Load/store lanes served through the memory port.
    pub memory_accesses: u8,
}

impl PacketOutcome {
    /// Number of lanes whose predicate allowed execution.
    #[must_use]
    pub fn active_count(&self) -> u32 {
        self.active_lanes.iter().map(|active| u32::from(*active)).sum()
    }
}

/// Result of one machine step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Packet committed; the machine keeps running.
    Retired(PacketOutcome),
    /// Packet committed and raised a stopping terminal event.
    Stopped {
        /// Committed packet.
        outcome: PacketOutcome,
        /// Event that stopped the machine.
        event: TerminalEvent,
    },
    /// Packet faulted and committed nothing; the fault is latched.
    Fault(PacketFault),
    /// Machine is halted or faulted; nothing was executed.
    NotRunning(RunState),
}

/// Why a run loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A stopping terminal event committed.
    Terminal(TerminalEvent),
    /// A packet faulted.
    Fault(PacketFault),
    /// The configured packet limit was reached.
    PacketLimit,
    /// Machine was not running when the loop started.
    NotRunning(RunState),
}

/// Aggregated outcome of [`crate::Machine::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    /// Packets committed during this call.
    pub packets: u64,
    /// Stop condition.
    pub stop: StopReason,
}

#[cfg(test)]
mod tests {
    use super::{Backpressure, SimConfig, TerminalEvent, DEFAULT_NOT_READY_PERCENT};

    #[test]
    fn default_config_matches_reference_model() {
        let config = SimConfig::default();
        assert_eq!(config.memory_bytes, 65_536);
        assert_eq!(config.packet_limit, 4096);
        assert_eq!(
            config.backpressure,
            Backpressure::Random {
                not_ready_percent: DEFAULT_NOT_READY_PERCENT,
                seed: 0
            }
        );
    }

    #[test]
    fn replay_policy_follows_script() {
        let mut policy = Backpressure::Replay(vec![false, true]).policy();
        assert!(!policy.next_ready());
        assert!(policy.next_ready());
        assert!(policy.next_ready());
        assert!(Backpressure::AlwaysReady.policy().next_ready());
    }

    #[test]
    fn only_fence_lets_execution_continue() {
        assert!(!TerminalEvent::Fence.stops_execution());
        assert!(TerminalEvent::Halt.stops_execution());
        assert!(TerminalEvent::Breakpoint { code: 3 }.stops_execution());
        assert!(TerminalEvent::Syscall { code: 0 }.stops_execution());
        assert!(TerminalEvent::ExceptionReturn.stops_execution());
    }
}
