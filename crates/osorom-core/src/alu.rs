//! ALU and barrel-shifter evaluation.
//!
//! All functions are pure and total over their inputs.

use crate::decoder::AluSource;
use crate::encoding::{AluOp, CompareOp, ShiftType};
use crate::state::Register;

/// Shifts `value` by `amount` (taken modulo 32) using `mode`.
///
/// An amount of zero is the identity for every mode.
#[must_use]
pub const fn shift(value: u32, mode: ShiftType, amount: u32) -> u32 {
    let amount = amount & 0x1F;
    match mode {
        ShiftType::Lsl => value << amount,
        ShiftType::Lsr => value >> amount,
        ShiftType::Asr => ((value as i32) >> amount) as u32,
        ShiftType::Ror => value.rotate_right(amount),
    }
}

/// Expands a 10-bit immediate rotated right by `2 * rotate`.
#[must_use]
pub const fn rotated_immediate(value: u16, rotate: u8) -> u32 {
    ((value as u32) & 0x3FF).rotate_right(((rotate as u32) & 0xF) * 2)
}

/// Evaluates the second ALU operand against the register file `read`.
pub fn operand(source: AluSource, read: impl Fn(Register) -> u32) -> u32 {
    match source {
        AluSource::Immediate { value, rotate } => rotated_immediate(value, rotate),
        AluSource::Register { rt, shift: mode, amount } => {
            shift(read(rt), mode, u32::from(amount))
        }
    }
}

/// Computes a register-writing ALU operation.
///
/// Binary operations combine `a` and `b`; unary operations use `b` only.
/// Returns `None` for `COMPARE` and the reserved sub-opcodes.
#[must_use]
pub const fn evaluate(op: AluOp, a: u32, b: u32) -> Option<u32> {
    let result = match op {
        AluOp::Add => a.wrapping_add(b),
        AluOp::And => a & b,
        AluOp::Nor => !(a | b),
        AluOp::Or => a | b,
        AluOp::Sub => a.wrapping_sub(b),
        AluOp::Rsb => b.wrapping_sub(a),
        AluOp::Xor => a ^ b,
        AluOp::Mov => b,
        AluOp::Mvn => !b,
        AluOp::Sxb => b as u8 as i8 as i32 as u32,
        AluOp::Sxh => b as u16 as i16 as i32 as u32,
        AluOp::Compare
        | AluOp::Reserved1
        | AluOp::Reserved2
        | AluOp::Reserved3
        | AluOp::Reserved4 => return None,
    };
    Some(result)
}

/// Evaluates a compare condition.
///
/// `BS`/`BC` test bit `b & 31` of `a`. Returns `None` for the reserved
/// condition.
#[must_use]
pub const fn compare(condition: CompareOp, a: u32, b: u32) -> Option<bool> {
    let result = match condition {
        CompareOp::Ltu => a < b,
        CompareOp::Leu => a <= b,
        CompareOp::Eq => a == b,
        CompareOp::Lts => (a as i32) < (b as i32),
        CompareOp::Les => (a as i32) <= (b as i32),
        CompareOp::BitSet => (a >> (b & 0x1F)) & 1 == 1,
        CompareOp::BitClear => (a >> (b & 0x1F)) & 1 == 0,
        CompareOp::Reserved => return None,
    };
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ShiftType::Lsl, 0x8000_0001, 1, 0x0000_0002)]
    #[case(ShiftType::Lsr, 0x8000_0000, 31, 0x0000_0001)]
    #[case(ShiftType::Asr, 0x8000_0000, 4, 0xF800_0000)]
    #[case(ShiftType::Asr, 0x4000_0000, 4, 0x0400_0000)]
    #[case(ShiftType::Ror, 0x0000_0001, 1, 0x8000_0000)]
    fn shifter_modes(
        #[case] mode: ShiftType,
        #[case] value: u32,
        #[case] amount: u32,
        #[case] expected: u32,
    ) {
        assert_eq!(shift(value, mode, amount), expected);
    }

    #[rstest]
    #[case(ShiftType::Lsl)]
    #[case(ShiftType::Lsr)]
    #[case(ShiftType::Asr)]
    #[case(ShiftType::Ror)]
    fn zero_shift_is_identity(#[case] mode: ShiftType) {
        assert_eq!(shift(0xDEAD_BEEF, mode, 0), 0xDEAD_BEEF);
    }

    #[rstest]
    #[case(1, 0, 0x0000_0001)]
    #[case(1, 1, 0x4000_0000)]
    #[case(1, 11, 0x0000_0400)]
    #[case(0x200, 0, 0x0000_0200)]
    #[case(0x3FF, 4, 0xFF00_0003)]
    fn rotated_immediates(#[case] value: u16, #[case] rotate: u8, #[case] expected: u32) {
        assert_eq!(rotated_immediate(value, rotate), expected);
    }

    #[rstest]
    #[case(AluOp::Add, 0xFFFF_FFFF, 2, 1)]
    #[case(AluOp::And, 0xF0F0, 0xFF00, 0xF000)]
    #[case(AluOp::Nor, 0, 0, 0xFFFF_FFFF)]
    #[case(AluOp::Or, 0xF0, 0x0F, 0xFF)]
    #[case(AluOp::Sub, 1, 2, 0xFFFF_FFFF)]
    #[case(AluOp::Rsb, 1, 2, 1)]
    #[case(AluOp::Xor, 0xFF, 0x0F, 0xF0)]
    #[case(AluOp::Mov, 7, 9, 9)]
    #[case(AluOp::Mvn, 7, 0, 0xFFFF_FFFF)]
    #[case(AluOp::Sxb, 0, 0x0000_0180, 0xFFFF_FF80)]
    #[case(AluOp::Sxh, 0, 0x0001_7FFF, 0x0000_7FFF)]
    fn alu_operations(#[case] op: AluOp, #[case] a: u32, #[case] b: u32, #[case] expected: u32) {
        assert_eq!(evaluate(op, a, b), Some(expected));
    }

    #[test]
    fn compare_and_reserved_ops_have_no_register_result() {
        assert_eq!(evaluate(AluOp::Compare, 1, 1), None);
        assert_eq!(evaluate(AluOp::Reserved3, 1, 1), None);
        assert_eq!(compare(CompareOp::Reserved, 1, 1), None);
    }

    #[rstest]
    #[case(CompareOp::Ltu, 1, 0xFFFF_FFFF, true)]
    #[case(CompareOp::Lts, 1, 0xFFFF_FFFF, false)]
    #[case(CompareOp::Leu, 5, 5, true)]
    #[case(CompareOp::Les, 0x8000_0000, 0, true)]
    #[case(CompareOp::Eq, 3, 4, false)]
    #[case(CompareOp::BitSet, 0b1000, 3, true)]
    #[case(CompareOp::BitClear, 0b1000, 3, false)]
    #[case(CompareOp::BitClear, 0b1000, 34, true)]
    fn compare_conditions(
        #[case] condition: CompareOp,
        #[case] a: u32,
        #[case] b: u32,
        #[case] expected: bool,
    ) {
        assert_eq!(compare(condition, a, b), Some(expected));
    }
}
