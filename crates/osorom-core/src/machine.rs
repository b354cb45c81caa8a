//! Machine harness wiring ROM fetch, the packet executor and the memory bus.

use tracing::{debug, warn};

use crate::api::{RunOutcome, SimConfig, StepOutcome, StopReason};
use crate::bus::{BusMaster, MemoryBus};
use crate::decoder::{Decoder, InstructionPacket, Operation};
use crate::diag::DiagCounters;
use crate::execute::{active_lanes, execute_packet, is_stopping};
use crate::fault::{FaultCode, PacketFault};
use crate::memory::MemoryImage;
use crate::state::{CpuState, RunState, PACKET_SLOTS};

/// A complete simulated system: CPU state, program ROM and memory bus.
#[derive(Debug)]
pub struct Machine {
    cpu: CpuState,
    rom: Vec<u32>,
    master: BusMaster,
    config: SimConfig,
    run_state: RunState,
    diag: DiagCounters,
}

impl Machine {
    /// Creates a machine at PC 0 executing `rom`.
    #[must_use]
    pub fn new(rom: Vec<u32>, config: SimConfig) -> Self {
        let bus = MemoryBus::new(
            MemoryImage::new(config.memory_bytes),
            config.backpressure.policy(),
        );
        Self {
            cpu: CpuState::default(),
            rom,
            master: BusMaster::new(bus),
            config,
            run_state: RunState::Running,
            diag: DiagCounters::default(),
        }
    }

    /// Architectural CPU state.
    #[must_use]
    pub const fn cpu(&self) -> &CpuState {
        &self.cpu
    }

    /// Mutable CPU state, for seeding registers before a run.
    pub const fn cpu_mut(&mut self) -> &mut CpuState {
        &mut self.cpu
    }

    /// Program ROM in instruction slots.
    #[must_use]
    pub fn rom(&self) -> &[u32] {
        &self.rom
    }

    /// Memory bus transactor.
    #[must_use]
    pub const fn bus(&self) -> &MemoryBus {
        self.master.bus()
    }

    /// Mutable memory bus transactor, for preloading data memory.
    pub const fn bus_mut(&mut self) -> &mut MemoryBus {
        self.master.bus_mut()
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Current run state.
    #[must_use]
    pub const fn run_state(&self) -> RunState {
        self.run_state
    }

    /// Accumulated diagnostics.
    #[must_use]
    pub const fn diag(&self) -> &DiagCounters {
        &self.diag
    }

    /// Resets CPU state, the bus handshake and diagnostics, then resumes
    /// running. Data memory is preserved; a latched bus fault is cleared.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.master.restart(self.config.backpressure.policy());
        self.diag = DiagCounters::default();
        self.run_state = RunState::Running;
    }

    /// Fetches and decodes the packet at `pc`.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::MisalignedFetch`] when `pc` is not a packet
    /// boundary and [`FaultCode::FetchOutOfRange`] when the packet is not
    /// fully inside the ROM.
    pub fn fetch(&self, pc: u32) -> Result<InstructionPacket, FaultCode> {
        if pc % PACKET_SLOTS != 0 {
            return Err(FaultCode::MisalignedFetch);
        }
        let start = usize::try_from(pc).map_err(|_| FaultCode::FetchOutOfRange)?;
        let words = self
            .rom
            .get(start..start + PACKET_SLOTS as usize)
            .ok_or(FaultCode::FetchOutOfRange)?;
        let mut packet = [0u32; PACKET_SLOTS as usize];
        packet.copy_from_slice(words);
        Ok(Decoder::decode_packet(packet))
    }

    /// Fetches, decodes and executes one packet.
    pub fn step_packet(&mut self) -> StepOutcome {
        if !self.run_state.is_running() {
            return StepOutcome::NotRunning(self.run_state);
        }
        let pc = self.cpu.pc();
        let result = self
            .fetch(pc)
            .map_err(|code| PacketFault::packet(pc, code))
            .and_then(|packet| {
                debug!(pc, "fetched packet\n{packet}");
                self.idle_unless_accessing(&packet, pc)?;
                execute_packet(&packet, &mut self.cpu, &mut self.master)
            });
        self.diag
            .sync_bus(self.master.bus().cycles(), self.master.bus().stall_cycles());

        match result {
            Ok(outcome) => {
                self.diag.record_packet(&outcome);
                match is_stopping(&outcome) {
                    Some(event) => {
                        debug!(pc, ?event, "machine stopped");
                        self.run_state = RunState::Halted;
                        StepOutcome::Stopped { outcome, event }
                    }
                    None => StepOutcome::Retired(outcome),
                }
            }
            Err(fault) => {
                warn!(%fault, "machine fault latched");
                self.diag.record_fault(fault.code, fault.pc);
                self.run_state = RunState::FaultLatched(fault.code);
                StepOutcome::Fault(fault)
            }
        }
    }

    /// Runs until a stopping terminal event, a fault or the packet limit.
    pub fn run(&mut self) -> RunOutcome {
        let mut packets = 0;
        while packets < self.config.packet_limit {
            let stop = match self.step_packet() {
                StepOutcome::Retired(_) => {
                    packets += 1;
                    continue;
                }
                StepOutcome::Stopped { event, .. } => {
                    packets += 1;
                    StopReason::Terminal(event)
                }
                StepOutcome::Fault(fault) => StopReason::Fault(fault),
                StepOutcome::NotRunning(state) => StopReason::NotRunning(state),
            };
            return RunOutcome { packets, stop };
        }
        RunOutcome {
            packets,
            stop: StopReason::PacketLimit,
        }
    }

    /// Clocks one idle bus cycle, before anything commits, for a packet with
    /// no active load/store lane.
    fn idle_unless_accessing(
        &mut self,
        packet: &InstructionPacket,
        pc: u32,
    ) -> Result<(), PacketFault> {
        let active = active_lanes(packet, &self.cpu);
        let accesses_memory = packet.lanes.iter().zip(active).any(|(lane, active)| {
            active && matches!(lane.operation, Operation::LoadStore { .. })
        });
        if !accesses_memory {
            self.master
                .idle_cycle()
                .map_err(|fault| PacketFault::bus(pc, None, fault))?;
        }
        Ok(())
    }
}
