use thiserror::Error;

/// Fault classes used for diagnostics aggregation and policy decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FaultClass {
    /// An active lane carried an encoding the core does not implement.
    Decode,
    /// A load/store lane computed an illegal data access.
    Memory,
    /// Two active lanes of one packet wrote the same architectural target.
    Commit,
    /// The packet fetch itself was illegal.
    Fetch,
    /// The memory bus transactor rejected a request.
    Bus,
}

/// Stable execute-side fault taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum FaultCode {
    /// Invalid class, reserved opcode or reserved compare condition on an active lane.
    #[error("unimplemented instruction")]
    UnimplementedInstruction = 0x01,
    /// Half-word or word access to an address that is not naturally aligned.
    #[error("misaligned data access")]
    MisalignedAccess = 0x02,
    /// Two active lanes wrote the same general-purpose register.
    #[error("register write conflict within packet")]
    RegisterWriteConflict = 0x03,
    /// Two active lanes wrote the same predicate flag.
    #[error("predicate write conflict within packet")]
    PredicateWriteConflict = 0x04,
    /// Two active lanes wrote the extra-result register.
    #[error("extra-result register write conflict within packet")]
    ExtraWriteConflict = 0x05,
    /// Two active lanes wrote the same coprocessor register.
    #[error("coprocessor register write conflict within packet")]
    CoprocessorWriteConflict = 0x06,
    /// More than one active lane redirected control (taken branch or terminal event).
    #[error("control conflict within packet")]
    ControlConflict = 0x07,
    /// PC is not on a packet boundary.
    #[error("packet fetch from misaligned program counter")]
    MisalignedFetch = 0x08,
    /// Packet lies outside the loaded ROM.
    #[error("packet fetch outside program rom")]
    FetchOutOfRange = 0x09,
    /// The bus transactor latched a protocol fault while serving a lane.
    #[error("memory bus protocol fault")]
    BusProtocol = 0x0A,
    /// Data access reaches past the end of the backing store.
    #[error("data access outside backing store")]
    AddressOutOfRange = 0x0B,
    /// Two active lanes stored to overlapping bytes of the same line.
    #[error("memory write conflict within packet")]
    MemoryWriteConflict = 0x0C,
}

impl FaultCode {
    /// Converts a fault code to its stable byte value.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Converts a stable byte value back into a fault code.
    #[must_use]
    pub const fn from_u8(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(Self::UnimplementedInstruction),
            0x02 => Some(Self::MisalignedAccess),
            0x03 => Some(Self::RegisterWriteConflict),
            0x04 => Some(Self::PredicateWriteConflict),
            0x05 => Some(Self::ExtraWriteConflict),
            0x06 => Some(Self::CoprocessorWriteConflict),
            0x07 => Some(Self::ControlConflict),
            0x08 => Some(Self::MisalignedFetch),
            0x09 => Some(Self::FetchOutOfRange),
            0x0A => Some(Self::BusProtocol),
            0x0B => Some(Self::AddressOutOfRange),
            0x0C => Some(Self::MemoryWriteConflict),
            _ => None,
        }
    }

    /// Returns the diagnostics fault class for this fault code.
    #[must_use]
    pub const fn class(self) -> FaultClass {
        match self {
            Self::UnimplementedInstruction => FaultClass::Decode,
            Self::MisalignedAccess | Self::AddressOutOfRange => FaultClass::Memory,
            Self::RegisterWriteConflict
            | Self::MemoryWriteConflict
            | Self::PredicateWriteConflict
            | Self::ExtraWriteConflict
            | Self::CoprocessorWriteConflict
            | Self::ControlConflict => FaultClass::Commit,
            Self::MisalignedFetch | Self::FetchOutOfRange => FaultClass::Fetch,
            Self::BusProtocol => FaultClass::Bus,
        }
    }
}

/// Bus protocol violations detected by the memory bus transactor.
///
/// These are wiring bugs in the requester, never recoverable runtime
/// conditions. The transactor latches the first one and refuses to
/// make further progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ProtocolFault {
    /// `read_req` changed while the port was not ready.
    #[error("read request changed during not ready")]
    ReadChangedWhileNotReady,
    /// `write_req` changed while the port was not ready.
    #[error("write request changed during not ready")]
    WriteChangedWhileNotReady,
    /// `write_req` asserted while a read burst is outstanding.
    #[error("write during read burst")]
    WriteDuringReadBurst,
    /// `read_req` asserted while a write burst is outstanding.
    #[error("read during write burst")]
    ReadDuringWriteBurst,
    /// `burst_begin` asserted while a burst is outstanding.
    #[error("burst start during burst")]
    BurstBeginDuringBurst,
    /// `burst_begin` asserted with both or neither of read/write.
    #[error("invalid burst start type")]
    InvalidBurstStart,
    /// Read or write asserted with no burst declared.
    #[error("read or write outside of burst")]
    RequestOutsideBurst,
    /// `burst_begin` asserted with a size of zero beats.
    #[error("burst declared with zero length")]
    ZeroLengthBurst,
    /// Line address beyond the end of the backing store.
    #[error("line address {line:#x} outside backing store")]
    AddressOutOfRange {
        /// Offending line index.
        line: u32,
    },
}

/// Error returned when a packet cannot be executed or committed.
///
/// A faulting packet commits nothing: register file, predicates and PC keep
/// their pre-packet values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[error("{code} (packet {pc:#x}, lane {lane:?})")]
pub struct PacketFault {
    /// Address of the faulting packet, in instruction slots.
    pub pc: u32,
    /// Lane that raised the fault, when one lane is responsible.
    pub lane: Option<u8>,
    /// Fault classification.
    pub code: FaultCode,
    /// Underlying bus protocol fault for [`FaultCode::BusProtocol`].
    #[source]
    pub protocol: Option<ProtocolFault>,
}

impl PacketFault {
    /// Creates a fault attributed to a single lane.
    #[must_use]
    pub const fn lane(pc: u32, lane: u8, code: FaultCode) -> Self {
        Self {
            pc,
            lane: Some(lane),
            code,
            protocol: None,
        }
    }

    /// Creates a fault attributed to the packet as a whole.
    #[must_use]
    pub const fn packet(pc: u32, code: FaultCode) -> Self {
        Self {
            pc,
            lane: None,
            code,
            protocol: None,
        }
    }

    /// Wraps a transactor protocol fault raised while serving `lane`.
    #[must_use]
    pub const fn bus(pc: u32, lane: Option<u8>, fault: ProtocolFault) -> Self {
        Self {
            pc,
            lane,
            code: FaultCode::BusProtocol,
            protocol: Some(fault),
        }
    }
}
