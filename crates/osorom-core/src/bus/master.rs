//! Bus master turning line accesses into protocol-correct bursts.
//!
//! The master drives a beat only on a ready cycle. While the port is not
//! ready it re-drives the lines of the previous clock unchanged; on a
//! ready cycle with nothing to send it drives an idle request.

use tracing::trace;

use super::{BusRequest, BusResponse, MemoryBus, ReadyPolicy};
use crate::api::MemoryPort;
use crate::fault::ProtocolFault;
use crate::memory::Line;

/// Requester side of the memory bus, owning the transactor it drives.
#[derive(Debug)]
pub struct BusMaster {
    bus: MemoryBus,
    held: BusRequest,
}

impl BusMaster {
    /// Wraps `bus`; the master starts with all lines deasserted.
    #[must_use]
    pub const fn new(bus: MemoryBus) -> Self {
        Self {
            bus,
            held: BusRequest::IDLE,
        }
    }

    /// Driven transactor.
    #[must_use]
    pub const fn bus(&self) -> &MemoryBus {
        &self.bus
    }

    /// Mutable access to the driven transactor.
    pub const fn bus_mut(&mut self) -> &mut MemoryBus {
        &mut self.bus
    }

    /// Restarts the transactor under `policy` and deasserts all lines.
    pub fn restart(&mut self, policy: Box<dyn ReadyPolicy>) {
        self.bus.restart(policy);
        self.held = BusRequest::IDLE;
    }

    /// Releases the transactor.
    #[must_use]
    pub fn into_bus(self) -> MemoryBus {
        self.bus
    }

    /// Clocks the bus once without issuing a new beat.
    ///
    /// # Errors
    ///
    /// Returns the transactor's protocol fault.
    pub fn idle_cycle(&mut self) -> Result<BusResponse, ProtocolFault> {
        if self.bus.ready() {
            self.held = BusRequest::IDLE;
        }
        self.bus.clock(&self.held)
    }

    /// Reads `beats` consecutive lines starting at `first_line`.
    ///
    /// # Errors
    ///
    /// Returns the transactor's protocol fault.
    pub fn read_burst(
        &mut self,
        first_line: u32,
        beats: u32,
    ) -> Result<Vec<Line>, ProtocolFault> {
        let mut lines = Vec::with_capacity(usize::try_from(beats).unwrap_or_default());
        for beat in 0..beats {
            let request = BusRequest {
                burst_begin: beat == 0,
                read_req: true,
                address: first_line.wrapping_add(beat),
                size: beats,
                ..BusRequest::IDLE
            };
            let response = self.drive_beat(request)?;
            if response.read_data_valid {
                lines.push(response.read_data);
            }
        }
        Ok(lines)
    }

    /// Writes consecutive lines starting at `first_line`, one beat per entry.
    ///
    /// Each entry carries the byte-enable mask and data for its line.
    ///
    /// # Errors
    ///
    /// Returns the transactor's protocol fault.
    pub fn write_burst(
        &mut self,
        first_line: u32,
        beats: &[(u16, Line)],
    ) -> Result<(), ProtocolFault> {
        let size = u32::try_from(beats.len()).unwrap_or(u32::MAX);
        for (beat, (byte_enable, data)) in (0u32..).zip(beats) {
            let request = BusRequest {
                burst_begin: beat == 0,
                write_req: true,
                address: first_line.wrapping_add(beat),
                size,
                byte_enable: *byte_enable,
                write_data: *data,
                ..BusRequest::IDLE
            };
            self.drive_beat(request)?;
        }
        Ok(())
    }

    fn drive_beat(&mut self, request: BusRequest) -> Result<BusResponse, ProtocolFault> {
        while !self.bus.ready() {
            trace!(line = request.address, "bus master waiting for ready");
            self.bus.clock(&self.held)?;
        }
        self.held = request;
        self.bus.clock(&request)
    }
}

impl MemoryPort for BusMaster {
    fn size_bytes(&self) -> usize {
        self.bus.image().len()
    }

    fn read_line(&mut self, line: u32) -> Result<Line, ProtocolFault> {
        let lines = self.read_burst(line, 1)?;
        Ok(lines.first().copied().unwrap_or_default())
    }

    fn write_line(
        &mut self,
        line: u32,
        byte_enable: u16,
        data: Line,
    ) -> Result<(), ProtocolFault> {
        self.write_burst(line, &[(byte_enable, data)])
    }
}
