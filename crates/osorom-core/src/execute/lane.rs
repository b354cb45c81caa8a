//! Per-lane evaluation against the pre-packet register snapshot.

use crate::alu;
use crate::api::TerminalEvent;
use crate::decoder::{BranchTarget, DecodedInstruction, Operation};
use crate::encoding::{LoadStoreOp, OtherOp};
use crate::memory::{validate_alignment, validate_range};
use crate::state::{CpuState, PredicateRegister, Register, PACKET_SLOTS};
use crate::FaultCode;

/// Control effect of a lane: redirect or packet-terminal event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEffect {
    /// Taken branch to an absolute slot address.
    Branch {
        /// Target slot address.
        target: u32,
    },
    /// Terminal event reported to the caller.
    Terminal(TerminalEvent),
}

/// Data access still to be served through the memory port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingAccess {
    /// Access kind.
    pub op: LoadStoreOp,
    /// Effective byte address.
    pub address: u32,
    /// Load destination or store-conditional status register.
    pub rd: Register,
    /// Store data read from the snapshot.
    pub store_value: u32,
}

/// Side effects accumulated by one active lane; nothing is applied here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LaneEffects {
    /// General register write.
    pub gpr: Option<(Register, u32)>,
    /// Predicate write.
    pub predicate: Option<(PredicateRegister, bool)>,
    /// Extra-result register write.
    pub extra: Option<u32>,
    /// Coprocessor register write.
    pub coprocessor: Option<(Register, u32)>,
    /// PC redirection or terminal event.
    pub control: Option<ControlEffect>,
    /// Load/store to resolve before commit.
    pub access: Option<PendingAccess>,
}

impl LaneEffects {
    /// General register this lane writes, counting the result of a pending
    /// load or store-conditional.
    pub(crate) fn gpr_target(&self) -> Option<Register> {
        self.gpr.map(|(reg, _)| reg).or_else(|| {
            self.access
                .filter(|access| {
                    !access.op.is_store() || access.op == LoadStoreOp::StoreConditional
                })
                .map(|access| access.rd)
        })
    }
}

/// Evaluates one active lane of the packet at `pc` against a data memory of
/// `memory_bytes` bytes.
///
/// # Errors
///
/// Returns [`FaultCode::UnimplementedInstruction`] for invalid or reserved
/// encodings, [`FaultCode::MisalignedAccess`] for unaligned data accesses and
/// [`FaultCode::AddressOutOfRange`] for accesses past the end of memory.
pub fn execute_lane(
    instruction: &DecodedInstruction,
    cpu: &CpuState,
    pc: u32,
    memory_bytes: usize,
) -> Result<LaneEffects, FaultCode> {
    if instruction.operation.is_unimplemented() {
        return Err(FaultCode::UnimplementedInstruction);
    }
    let read = |reg: Register| cpu.gpr(reg);
    let mut effects = LaneEffects::default();
    match instruction.operation {
        Operation::Alu { op, rd, rs, source } => {
            let value = alu::evaluate(op, cpu.gpr(rs), alu::operand(source, read))
                .ok_or(FaultCode::UnimplementedInstruction)?;
            effects.gpr = Some((rd, value));
        }
        Operation::Compare {
            condition,
            pd,
            rs,
            source,
        } => {
            let value = alu::compare(condition, cpu.gpr(rs), alu::operand(source, read))
                .ok_or(FaultCode::UnimplementedInstruction)?;
            effects.predicate = Some((pd, value));
        }
        Operation::Branch { link, target } => {
            let target = match target {
                BranchTarget::Relative(offset) => {
                    pc.wrapping_add(offset.wrapping_mul(PACKET_SLOTS as i32) as u32)
                }
                BranchTarget::Register(rs) => cpu.gpr(rs),
            };
            effects.control = Some(ControlEffect::Branch { target });
            if link {
                effects.gpr = Some((Register::LINK, pc.wrapping_add(PACKET_SLOTS)));
            }
        }
        Operation::LoadStore {
            op,
            rd,
            base,
            offset,
        } => {
            let address = cpu.gpr(base).wrapping_add(i32::from(offset) as u32);
            validate_alignment(address, op.width())?;
            validate_range(address, op.width(), memory_bytes)?;
            effects.access = Some(PendingAccess {
                op,
                address,
                rd,
                store_value: cpu.gpr(rd),
            });
        }
        Operation::Other {
            op,
            code,
            rd,
            rs,
            rt,
        } => execute_other(op, code, rd, cpu.gpr(rs), rt, cpu, &mut effects),
        Operation::Invalid => return Err(FaultCode::UnimplementedInstruction),
    }
    Ok(effects)
}

fn execute_other(
    op: OtherOp,
    code: u8,
    rd: Register,
    rs_value: u32,
    rt: Register,
    cpu: &CpuState,
    effects: &mut LaneEffects,
) {
    let terminal = |event| Some(ControlEffect::Terminal(event));
    match op {
        OtherOp::Break if code == TerminalEvent::HALT_CODE => {
            effects.control = terminal(TerminalEvent::Halt);
        }
        OtherOp::Break => effects.control = terminal(TerminalEvent::Breakpoint { code }),
        OtherOp::Syscall => effects.control = terminal(TerminalEvent::Syscall { code }),
        OtherOp::Fence => effects.control = terminal(TerminalEvent::Fence),
        OtherOp::Eret => effects.control = terminal(TerminalEvent::ExceptionReturn),
        OtherOp::MoveFromCoprocessor => effects.gpr = Some((rd, cpu.coprocessor(rt))),
        OtherOp::MoveToCoprocessor => effects.coprocessor = Some((rt, rs_value)),
        OtherOp::Mult => {
            let product = i64::from(rs_value as i32) * i64::from(cpu.gpr(rt) as i32);
            effects.gpr = Some((rd, product as u32));
            effects.extra = Some((product >> 32) as u32);
        }
        OtherOp::Div => {
            let (quotient, remainder) = signed_divide(rs_value, cpu.gpr(rt));
            effects.gpr = Some((rd, quotient));
            effects.extra = Some(remainder);
        }
        OtherOp::MoveFromExtra => effects.gpr = Some((rd, cpu.extra())),
        OtherOp::MoveToExtra => effects.extra = Some(rs_value),
        OtherOp::CoprocessorOp
        | OtherOp::Reserved0
        | OtherOp::Simd0
        | OtherOp::Simd1
        | OtherOp::Simd2
        | OtherOp::Simd3 => {}
    }
}

/// Signed division returning `(quotient, remainder)`.
///
/// Division by zero yields `(0xFFFF_FFFF, dividend)`; `i32::MIN / -1` wraps.
const fn signed_divide(dividend: u32, divisor: u32) -> (u32, u32) {
    let (a, b) = (dividend as i32, divisor as i32);
    if b == 0 {
        return (u32::MAX, dividend);
    }
    (a.wrapping_div(b) as u32, a.wrapping_rem(b) as u32)
}

#[cfg(test)]
mod tests {
    use super::{execute_lane, signed_divide, ControlEffect, LaneEffects};
    use crate::api::TerminalEvent;
    use crate::decoder::{BranchTarget, DecodedInstruction, Decoder, Operation};
    use crate::encoding::{LoadStoreOp, OtherOp};
    use crate::state::{CpuState, Register};
    use crate::FaultCode;

    const MEMORY: usize = 1024;

    fn reg(index: u32) -> Register {
        Register::from_u5(index)
    }

    fn other(op: OtherOp, rd: u32, rs: u32, rt: u32) -> DecodedInstruction {
        DecodedInstruction::always(Operation::Other {
            op,
            code: 0,
            rd: reg(rd),
            rs: reg(rs),
            rt: reg(rt),
        })
    }

    #[test]
    fn reference_add_increments_from_snapshot() {
        let mut cpu = CpuState::default();
        cpu.set_gpr(reg(0), 41);
        let effects = execute_lane(&Decoder::decode(0xC004_0000), &cpu, 0, MEMORY).expect("add");
        assert_eq!(effects.gpr, Some((reg(0), 42)));
        assert_eq!(cpu.gpr(reg(0)), 41);
    }

    #[test]
    fn branch_and_link_targets_packet_relative() {
        let cpu = CpuState::default();
        let instruction = DecodedInstruction::always(Operation::Branch {
            link: true,
            target: BranchTarget::Relative(-2),
        });
        let effects = execute_lane(&instruction, &cpu, 16, MEMORY).expect("branch");
        assert_eq!(effects.control, Some(ControlEffect::Branch { target: 8 }));
        assert_eq!(effects.gpr, Some((Register::LINK, 20)));
    }

    #[test]
    fn mult_and_div_split_results() {
        let mut cpu = CpuState::default();
        cpu.set_gpr(reg(1), (-7i32) as u32);
        cpu.set_gpr(reg(2), 0x1_0000);
        let mult = execute_lane(&other(OtherOp::Mult, 3, 1, 2), &cpu, 0, MEMORY).expect("mult");
        assert_eq!(mult.gpr, Some((reg(3), 0xFFF9_0000)));
        assert_eq!(mult.extra, Some(0xFFFF_FFFF));

        cpu.set_gpr(reg(2), 2);
        let div = execute_lane(&other(OtherOp::Div, 3, 1, 2), &cpu, 0, MEMORY).expect("div");
        assert_eq!(div.gpr, Some((reg(3), (-3i32) as u32)));
        assert_eq!(div.extra, Some((-1i32) as u32));
    }

    #[test]
    fn division_edge_cases() {
        assert_eq!(signed_divide(5, 0), (u32::MAX, 5));
        assert_eq!(
            signed_divide(i32::MIN as u32, u32::MAX),
            (i32::MIN as u32, 0)
        );
    }

    #[test]
    fn break_codes_map_to_terminal_events() {
        let cpu = CpuState::default();
        let halt = execute_lane(&Decoder::decode(0xD118_3C00), &cpu, 0, MEMORY).expect("halt");
        assert_eq!(
            halt.control,
            Some(ControlEffect::Terminal(TerminalEvent::Halt))
        );
        let breakpoint = DecodedInstruction::always(Operation::Other {
            op: OtherOp::Break,
            code: 3,
            rd: reg(0),
            rs: reg(0),
            rt: reg(0),
        });
        let effects = execute_lane(&breakpoint, &cpu, 0, MEMORY).expect("break");
        assert_eq!(
            effects.control,
            Some(ControlEffect::Terminal(TerminalEvent::Breakpoint { code: 3 }))
        );
        assert_eq!(effects.gpr, None);
    }

    #[test]
    fn misaligned_and_unimplemented_lanes_fault() {
        let mut cpu = CpuState::default();
        cpu.set_gpr(reg(4), 0x101);
        let load = DecodedInstruction::always(Operation::LoadStore {
            op: LoadStoreOp::LoadWord,
            rd: reg(5),
            base: reg(4),
            offset: 0,
        });
        assert_eq!(
            execute_lane(&load, &cpu, 0, MEMORY),
            Err(FaultCode::MisalignedAccess)
        );
        assert_eq!(
            execute_lane(&DecodedInstruction::always(Operation::Invalid), &cpu, 0, MEMORY),
            Err(FaultCode::UnimplementedInstruction)
        );
        assert_eq!(
            execute_lane(&other(OtherOp::Simd2, 0, 0, 0), &cpu, 0, MEMORY),
            Err(FaultCode::UnimplementedInstruction)
        );
    }

    #[test]
    fn accesses_past_memory_end_fault_in_lane() {
        let mut cpu = CpuState::default();
        cpu.set_gpr(reg(4), 0x3FE);
        let access = |op| {
            DecodedInstruction::always(Operation::LoadStore {
                op,
                rd: reg(5),
                base: reg(4),
                offset: 0,
            })
        };
        assert!(execute_lane(&access(LoadStoreOp::LoadHalf), &cpu, 0, MEMORY).is_ok());
        assert_eq!(
            execute_lane(&access(LoadStoreOp::StoreHalf), &cpu, 0, 0x3FF),
            Err(FaultCode::AddressOutOfRange)
        );
        cpu.set_gpr(reg(4), 0x2_0000);
        assert_eq!(
            execute_lane(&access(LoadStoreOp::LoadWord), &cpu, 0, MEMORY),
            Err(FaultCode::AddressOutOfRange)
        );
    }

    #[test]
    fn gpr_target_includes_pending_loads_only() {
        let load = LaneEffects {
            access: Some(super::PendingAccess {
                op: LoadStoreOp::LoadByte,
                address: 0,
                rd: reg(6),
                store_value: 0,
            }),
            ..LaneEffects::default()
        };
        assert_eq!(load.gpr_target(), Some(reg(6)));
        let store = LaneEffects {
            access: Some(super::PendingAccess {
                op: LoadStoreOp::StoreWord,
                address: 0,
                rd: reg(6),
                store_value: 0,
            }),
            ..LaneEffects::default()
        };
        assert_eq!(store.gpr_target(), None);
    }
}
