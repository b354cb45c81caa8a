//! Resolution of pending load/store lanes through the memory port.
//!
//! Every load of a packet reads pre-packet memory: all loads are served
//! before the first store is issued, so no lane observes a same-packet
//! store whatever its slot.

use tracing::debug;

use super::lane::{LaneEffects, PendingAccess};
use super::LANES;
use crate::api::MemoryPort;
use crate::encoding::LoadStoreOp;
use crate::fault::ProtocolFault;
use crate::memory::{byte_enable_mask, extract_from_line, line_index, place_in_line};

/// Word address tracked by a load-linked reservation.
const fn reservation_address(address: u32) -> u32 {
    address & !0x3
}

/// Reads the zero-extended value of a load or load-linked access.
///
/// # Errors
///
/// Returns the bus protocol fault raised by the port.
pub fn resolve_load(access: &PendingAccess, port: &mut dyn MemoryPort) -> Result<u32, ProtocolFault> {
    let data = port.read_line(line_index(access.address))?;
    Ok(extract_from_line(&data, access.address, access.op.width()))
}

/// Performs a store access.
///
/// A store-conditional writes only when `reservation` holds its word and
/// returns its status value (1 on success, 0 on failure); plain stores
/// return `None`.
///
/// # Errors
///
/// Returns the bus protocol fault raised by the port.
pub fn resolve_store(
    access: &PendingAccess,
    port: &mut dyn MemoryPort,
    reservation: Option<u32>,
) -> Result<Option<u32>, ProtocolFault> {
    if access.op != LoadStoreOp::StoreConditional {
        write(access, port)?;
        return Ok(None);
    }
    let success = reservation == Some(reservation_address(access.address));
    if success {
        write(access, port)?;
    } else {
        debug!(address = access.address, "store-conditional failed");
    }
    Ok(Some(u32::from(success)))
}

fn write(access: &PendingAccess, port: &mut dyn MemoryPort) -> Result<(), ProtocolFault> {
    let width = access.op.width();
    port.write_line(
        line_index(access.address),
        byte_enable_mask(access.address, width),
        place_in_line(access.address, width, access.store_value),
    )
}

/// Accesses served and the reservation to commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Served {
    pub accesses: u8,
    pub reservation: Option<u32>,
}

/// Serves a packet's pending accesses: every load in slot order, then every
/// store in slot order.
///
/// Store-conditionals check the pre-packet `reservation`. The committed
/// reservation is the word of the highest load-linked lane, else the
/// pre-packet one; any store-conditional, or a plain store to the reserved
/// line, clears it. Loads and store-conditionals record their result as the
/// lane's register write.
pub(super) fn serve_packet(
    effects: &mut [Option<LaneEffects>; LANES],
    reservation: Option<u32>,
    port: &mut dyn MemoryPort,
) -> Result<Served, (u8, ProtocolFault)> {
    let mut accesses = 0u8;
    let mut linked = None;
    for (lane, slot) in (0u8..).zip(effects.iter_mut()) {
        let Some(lane_effects) = slot.as_mut() else {
            continue;
        };
        let Some(access) = lane_effects.access.filter(|access| !access.op.is_store()) else {
            continue;
        };
        let value = resolve_load(&access, port).map_err(|fault| (lane, fault))?;
        lane_effects.gpr = Some((access.rd, value));
        if access.op == LoadStoreOp::LoadLinked {
            linked = Some(reservation_address(access.address));
        }
        accesses += 1;
    }

    let mut next = linked.or(reservation);
    for (lane, slot) in (0u8..).zip(effects.iter_mut()) {
        let Some(lane_effects) = slot.as_mut() else {
            continue;
        };
        let Some(access) = lane_effects.access.filter(|access| access.op.is_store()) else {
            continue;
        };
        let status = resolve_store(&access, port, reservation).map_err(|fault| (lane, fault))?;
        if let Some(value) = status {
            lane_effects.gpr = Some((access.rd, value));
            next = None;
        } else if next.is_some_and(|reserved| line_index(reserved) == line_index(access.address)) {
            next = None;
        }
        accesses += 1;
    }

    Ok(Served {
        accesses,
        reservation: next,
    })
}
