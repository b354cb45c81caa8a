//! Same-packet conflict detection and atomic commit.

use super::lane::{ControlEffect, LaneEffects};
use super::LANES;
use crate::api::TerminalEvent;
use crate::memory::{byte_enable_mask, line_index};
use crate::state::{CpuState, PredicateRegister, Register, PACKET_SLOTS};
use crate::FaultCode;

/// Rejects packets in which two active lanes write the same target.
///
/// Lanes are checked in slot order; the error names the later lane of the
/// first conflicting pair. Writes to the hard-wired `P3` have no effect and
/// never conflict. Stores, including store-conditionals, conflict when they
/// touch a common byte.
///
/// # Errors
///
/// Returns the conflicting lane and the matching conflict [`FaultCode`].
pub fn check_conflicts(effects: &[Option<LaneEffects>; LANES]) -> Result<(), (u8, FaultCode)> {
    let mut gprs: Vec<Register> = Vec::with_capacity(LANES);
    let mut predicates: Vec<PredicateRegister> = Vec::with_capacity(LANES);
    let mut coprocessor: Vec<Register> = Vec::with_capacity(LANES);
    let mut stores: Vec<(u32, u16)> = Vec::with_capacity(LANES);
    let mut extra_written = false;
    let mut control_written = false;

    for (lane, effects) in (0u8..).zip(effects) {
        let Some(effects) = effects else {
            continue;
        };
        if let Some(reg) = effects.gpr_target() {
            if gprs.contains(&reg) {
                return Err((lane, FaultCode::RegisterWriteConflict));
            }
            gprs.push(reg);
        }
        if let Some((pred, _)) = effects.predicate {
            if pred != PredicateRegister::ALWAYS {
                if predicates.contains(&pred) {
                    return Err((lane, FaultCode::PredicateWriteConflict));
                }
                predicates.push(pred);
            }
        }
        if let Some(access) = effects.access.filter(|access| access.op.is_store()) {
            let line = line_index(access.address);
            let bytes = byte_enable_mask(access.address, access.op.width());
            if stores
                .iter()
                .any(|(other_line, other_bytes)| *other_line == line && other_bytes & bytes != 0)
            {
                return Err((lane, FaultCode::MemoryWriteConflict));
            }
            stores.push((line, bytes));
        }
        if effects.extra.is_some() {
            if extra_written {
                return Err((lane, FaultCode::ExtraWriteConflict));
            }
            extra_written = true;
        }
        if let Some((reg, _)) = effects.coprocessor {
            if coprocessor.contains(&reg) {
                return Err((lane, FaultCode::CoprocessorWriteConflict));
            }
            coprocessor.push(reg);
        }
        if effects.control.is_some() {
            if control_written {
                return Err((lane, FaultCode::ControlConflict));
            }
            control_written = true;
        }
    }
    Ok(())
}

/// Applies resolved lane effects; returns `(next_pc, branch_taken, terminal)`.
pub(super) fn apply(
    cpu: &mut CpuState,
    effects: &[Option<LaneEffects>; LANES],
    reservation: Option<u32>,
) -> (u32, bool, Option<TerminalEvent>) {
    let mut next_pc = cpu.pc().wrapping_add(PACKET_SLOTS);
    let mut branch_taken = false;
    let mut terminal = None;

    for effects in effects.iter().flatten() {
        if let Some((reg, value)) = effects.gpr {
            cpu.set_gpr(reg, value);
        }
        if let Some((pred, value)) = effects.predicate {
            cpu.set_predicate(pred, value);
        }
        if let Some(value) = effects.extra {
            cpu.set_extra(value);
        }
        if let Some((reg, value)) = effects.coprocessor {
            cpu.set_coprocessor(reg, value);
        }
        match effects.control {
            Some(ControlEffect::Branch { target }) => {
                next_pc = target;
                branch_taken = true;
            }
            Some(ControlEffect::Terminal(event)) => terminal = Some(event),
            None => {}
        }
    }

    cpu.set_reservation(reservation);
    cpu.set_pc(next_pc);
    (next_pc, branch_taken, terminal)
}

#[cfg(test)]
mod tests {
    use super::{apply, check_conflicts};
    use crate::api::TerminalEvent;
    use crate::encoding::LoadStoreOp;
    use crate::execute::lane::{ControlEffect, LaneEffects, PendingAccess};
    use crate::state::{CpuState, PredicateRegister, Register};
    use crate::FaultCode;
    use rstest::rstest;

    fn writes_gpr(index: u32) -> Option<LaneEffects> {
        Some(LaneEffects {
            gpr: Some((Register::from_u5(index), 1)),
            ..LaneEffects::default()
        })
    }

    fn writes_predicate(pred: PredicateRegister) -> Option<LaneEffects> {
        Some(LaneEffects {
            predicate: Some((pred, true)),
            ..LaneEffects::default()
        })
    }

    fn writes_extra() -> Option<LaneEffects> {
        Some(LaneEffects {
            extra: Some(1),
            ..LaneEffects::default()
        })
    }

    fn writes_coprocessor(index: u32) -> Option<LaneEffects> {
        Some(LaneEffects {
            coprocessor: Some((Register::from_u5(index), 1)),
            ..LaneEffects::default()
        })
    }

    fn accesses(op: LoadStoreOp, address: u32) -> Option<LaneEffects> {
        Some(LaneEffects {
            access: Some(PendingAccess {
                op,
                address,
                rd: Register::from_u5(9),
                store_value: 0,
            }),
            ..LaneEffects::default()
        })
    }

    fn redirects(target: u32) -> Option<LaneEffects> {
        Some(LaneEffects {
            control: Some(ControlEffect::Branch { target }),
            ..LaneEffects::default()
        })
    }

    #[rstest]
    #[case([writes_gpr(3), None, writes_gpr(3), None], (2, FaultCode::RegisterWriteConflict))]
    #[case(
        [writes_predicate(PredicateRegister::P1), writes_predicate(PredicateRegister::P1), None, None],
        (1, FaultCode::PredicateWriteConflict)
    )]
    #[case([None, writes_extra(), None, writes_extra()], (3, FaultCode::ExtraWriteConflict))]
    #[case(
        [writes_coprocessor(4), writes_coprocessor(4), None, None],
        (1, FaultCode::CoprocessorWriteConflict)
    )]
    #[case([redirects(0), None, redirects(8), None], (2, FaultCode::ControlConflict))]
    #[case(
        [accesses(LoadStoreOp::StoreWord, 0x100), None, None, accesses(LoadStoreOp::StoreByte, 0x102)],
        (3, FaultCode::MemoryWriteConflict)
    )]
    #[case(
        [None, accesses(LoadStoreOp::StoreConditional, 0x40), accesses(LoadStoreOp::StoreHalf, 0x44), accesses(LoadStoreOp::StoreWord, 0x40)],
        (3, FaultCode::MemoryWriteConflict)
    )]
    fn conflicting_targets_are_rejected(
        #[case] effects: [Option<LaneEffects>; 4],
        #[case] expected: (u8, FaultCode),
    ) {
        assert_eq!(check_conflicts(&effects), Err(expected));
    }

    #[test]
    fn distinct_targets_and_always_predicate_do_not_conflict() {
        let effects = [
            writes_gpr(1),
            writes_gpr(2),
            writes_predicate(PredicateRegister::P3),
            writes_predicate(PredicateRegister::P3),
        ];
        assert_eq!(check_conflicts(&effects), Ok(()));
    }

    #[test]
    fn disjoint_stores_and_loads_of_stored_bytes_do_not_conflict() {
        let effects = [
            accesses(LoadStoreOp::StoreWord, 0x100),
            accesses(LoadStoreOp::StoreByte, 0x105),
            accesses(LoadStoreOp::StoreWord, 0x110),
            accesses(LoadStoreOp::LoadWord, 0x100),
        ];
        assert_eq!(check_conflicts(&effects), Ok(()));
    }

    #[test]
    fn apply_commits_all_lanes_and_terminal_falls_through() {
        let mut cpu = CpuState::default();
        cpu.set_pc(12);
        let effects = [
            writes_gpr(1),
            writes_predicate(PredicateRegister::P2),
            Some(LaneEffects {
                control: Some(ControlEffect::Terminal(TerminalEvent::Syscall { code: 4 })),
                ..LaneEffects::default()
            }),
            None,
        ];
        let (next_pc, taken, terminal) = apply(&mut cpu, &effects, Some(0x40));
        assert_eq!((next_pc, taken), (16, false));
        assert_eq!(terminal, Some(TerminalEvent::Syscall { code: 4 }));
        assert_eq!(cpu.gpr(Register::from_u5(1)), 1);
        assert!(cpu.predicate(PredicateRegister::P2));
        assert_eq!(cpu.reservation(), Some(0x40));
        assert_eq!(cpu.pc(), 16);
    }
}
