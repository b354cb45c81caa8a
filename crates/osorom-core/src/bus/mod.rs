//! Cycle-stepped memory bus transactor.
//!
//! Models a single Avalon-style port: ready/valid flow control, declared
//! bursts and byte-enabled writes into an owned [`MemoryImage`]. The
//! transactor is clocked once per simulated cycle with the requester's
//! current lines and checks the protocol on every clock, whether or not
//! a CPU-side access is pending.

/// Bus master driving bursts through the transactor.
pub mod master;
/// Per-cycle readiness policies.
pub mod readiness;

pub use master::BusMaster;
pub use readiness::{AlwaysReady, RandomBackpressure, ReadyPolicy, ReadyReplay};

use tracing::{trace, warn};

use crate::fault::ProtocolFault;
use crate::memory::{Line, MemoryImage, LINE_WORDS};

/// Requester-driven lines sampled on each clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct BusRequest {
    /// Declares a new burst on this beat.
    pub burst_begin: bool,
    /// Read beat.
    pub read_req: bool,
    /// Write beat.
    pub write_req: bool,
    /// Line index (byte address / 16).
    pub address: u32,
    /// Burst length in beats; sampled with `burst_begin`.
    pub size: u32,
    /// Per-byte write enables for the 16-byte line.
    pub byte_enable: u16,
    /// Write data as four little-endian lanes.
    pub write_data: Line,
}

impl BusRequest {
    /// Request with every line deasserted.
    pub const IDLE: Self = Self {
        burst_begin: false,
        read_req: false,
        write_req: false,
        address: 0,
        size: 0,
        byte_enable: 0,
        write_data: [0; LINE_WORDS],
    };

    /// Returns `true` when a read or write beat is requested.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.read_req || self.write_req
    }
}

/// Transactor-driven lines produced by each clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct BusResponse {
    /// Readiness for the *next* cycle.
    pub ready: bool,
    /// Line addressed by the current read request.
    pub read_data: Line,
    /// A read beat was accepted on this clock.
    pub read_data_valid: bool,
}

/// Direction of an outstanding burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum BurstDirection {
    /// Read burst.
    Read,
    /// Write burst.
    Write,
}

/// Observable transactor state before the next clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum BusState {
    /// Port withholds readiness this cycle.
    NotReady,
    /// Ready with no burst outstanding.
    Idle,
    /// Ready during a read burst with `remaining` beats left.
    BurstRead {
        /// Beats still owed.
        remaining: u32,
    },
    /// Ready during a write burst with `remaining` beats left.
    BurstWrite {
        /// Beats still owed.
        remaining: u32,
    },
    /// A protocol fault latched; the port makes no further progress.
    Faulted(ProtocolFault),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Burst {
    direction: BurstDirection,
    remaining: u32,
}

/// Memory bus transactor owning the backing store.
#[derive(Debug)]
pub struct MemoryBus {
    image: MemoryImage,
    policy: Box<dyn ReadyPolicy>,
    ready: bool,
    last_read_req: bool,
    last_write_req: bool,
    burst: Option<Burst>,
    fault: Option<ProtocolFault>,
    cycles: u64,
    stall_cycles: u64,
}

impl MemoryBus {
    /// Creates a transactor over `image`; first-cycle readiness comes from `policy`.
    #[must_use]
    pub fn new(image: MemoryImage, mut policy: Box<dyn ReadyPolicy>) -> Self {
        let ready = policy.next_ready();
        Self {
            image,
            policy,
            ready,
            last_read_req: false,
            last_write_req: false,
            burst: None,
            fault: None,
            cycles: 0,
            stall_cycles: 0,
        }
    }

    /// Returns the port to its power-on state under `policy`.
    ///
    /// Clears any latched fault, outstanding burst and the cycle counters;
    /// the backing store is kept.
    pub fn restart(&mut self, mut policy: Box<dyn ReadyPolicy>) {
        self.ready = policy.next_ready();
        self.policy = policy;
        self.last_read_req = false;
        self.last_write_req = false;
        self.burst = None;
        self.fault = None;
        self.cycles = 0;
        self.stall_cycles = 0;
    }

    /// Readiness of the port for the upcoming clock.
    #[must_use]
    pub const fn ready(&self) -> bool {
        self.ready
    }

    /// Current state of the port.
    #[must_use]
    pub const fn state(&self) -> BusState {
        if let Some(fault) = self.fault {
            return BusState::Faulted(fault);
        }
        if !self.ready {
            return BusState::NotReady;
        }
        match self.burst {
            None => BusState::Idle,
            Some(Burst {
                direction: BurstDirection::Read,
                remaining,
            }) => BusState::BurstRead { remaining },
            Some(Burst {
                direction: BurstDirection::Write,
                remaining,
            }) => BusState::BurstWrite { remaining },
        }
    }

    /// Latched protocol fault, if any.
    #[must_use]
    pub const fn fault(&self) -> Option<ProtocolFault> {
        self.fault
    }

    /// Clocks elapsed since construction.
    #[must_use]
    pub const fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Clocks on which the port was not ready.
    #[must_use]
    pub const fn stall_cycles(&self) -> u64 {
        self.stall_cycles
    }

    /// Backing store.
    #[must_use]
    pub const fn image(&self) -> &MemoryImage {
        &self.image
    }

    /// Mutable backing store, for preloading test data between clocks.
    pub const fn image_mut(&mut self) -> &mut MemoryImage {
        &mut self.image
    }

    /// Advances the port by one clock with the requester's current lines.
    ///
    /// # Errors
    ///
    /// Returns the protocol fault detected on this clock, or the previously
    /// latched fault. Once faulted the transactor stays faulted.
    pub fn clock(&mut self, request: &BusRequest) -> Result<BusResponse, ProtocolFault> {
        if let Some(fault) = self.fault {
            return Err(fault);
        }
        self.cycles = self.cycles.saturating_add(1);
        match self.sample(request) {
            Ok(response) => Ok(response),
            Err(fault) => {
                warn!(cycle = self.cycles, ?fault, "memory bus protocol fault");
                self.fault = Some(fault);
                Err(fault)
            }
        }
    }

    fn sample(&mut self, request: &BusRequest) -> Result<BusResponse, ProtocolFault> {
        if self.ready {
            self.check_burst(request)?;
            if request.write_req {
                self.commit_write(request)?;
            }
        } else {
            self.stall_cycles = self.stall_cycles.saturating_add(1);
            if request.read_req != self.last_read_req {
                return Err(ProtocolFault::ReadChangedWhileNotReady);
            }
            if request.write_req != self.last_write_req {
                return Err(ProtocolFault::WriteChangedWhileNotReady);
            }
        }

        let read_data = if request.read_req {
            self.image
                .read_line(request.address)
                .ok_or(ProtocolFault::AddressOutOfRange {
                    line: request.address,
                })?
        } else {
            [0; LINE_WORDS]
        };
        let read_data_valid = request.read_req && self.ready;

        trace!(
            cycle = self.cycles,
            ready = self.ready,
            read = request.read_req,
            write = request.write_req,
            burst_begin = request.burst_begin,
            line = request.address,
            "bus cycle"
        );

        self.last_read_req = request.read_req;
        self.last_write_req = request.write_req;
        self.ready = self.policy.next_ready();

        Ok(BusResponse {
            ready: self.ready,
            read_data,
            read_data_valid,
        })
    }

    fn check_burst(&mut self, request: &BusRequest) -> Result<(), ProtocolFault> {
        if let Some(burst) = self.burst.as_mut() {
            if request.burst_begin {
                return Err(ProtocolFault::BurstBeginDuringBurst);
            }
            match burst.direction {
                BurstDirection::Read if request.write_req => {
                    return Err(ProtocolFault::WriteDuringReadBurst)
                }
                BurstDirection::Write if request.read_req => {
                    return Err(ProtocolFault::ReadDuringWriteBurst)
                }
                BurstDirection::Read | BurstDirection::Write => {}
            }
            if request.is_active() {
                burst.remaining -= 1;
            }
            if burst.remaining == 0 {
                self.burst = None;
            }
        } else if request.burst_begin {
            if request.read_req == request.write_req {
                return Err(ProtocolFault::InvalidBurstStart);
            }
            if request.size == 0 {
                return Err(ProtocolFault::ZeroLengthBurst);
            }
            let direction = if request.read_req {
                BurstDirection::Read
            } else {
                BurstDirection::Write
            };
            let remaining = request.size - 1;
            self.burst = (remaining > 0).then_some(Burst {
                direction,
                remaining,
            });
        } else if request.is_active() {
            return Err(ProtocolFault::RequestOutsideBurst);
        }
        Ok(())
    }

    fn commit_write(&mut self, request: &BusRequest) -> Result<(), ProtocolFault> {
        if self
            .image
            .write_line(request.address, request.byte_enable, request.write_data)
        {
            Ok(())
        } else {
            Err(ProtocolFault::AddressOutOfRange {
                line: request.address,
            })
        }
    }
}
