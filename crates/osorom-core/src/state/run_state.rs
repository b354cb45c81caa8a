use crate::FaultCode;

/// Execution state of a [`crate::Machine`] between packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RunState {
    /// Ready to fetch the next packet.
    #[default]
    Running,
    /// Program executed `BREAK 0x1F`; no further packets are fetched.
    Halted,
    /// Fault is latched and no further progress is possible without reset.
    FaultLatched(FaultCode),
}

impl RunState {
    /// Returns the currently latched fault, if this state is fault-latched.
    #[must_use]
    pub const fn latched_fault(self) -> Option<FaultCode> {
        match self {
            Self::FaultLatched(cause) => Some(cause),
            Self::Running | Self::Halted => None,
        }
    }

    /// Returns `true` when the machine may fetch another packet.
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }
}
