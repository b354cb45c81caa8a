//! Human-readable rendering of decoded instructions and ROM listings.
//!
//! The text format has no parse contract; it exists for traces and the CLI.

use std::fmt;

use crate::alu::rotated_immediate;
use crate::decoder::{
    AluSource, BranchTarget, DecodedInstruction, Decoder, InstructionPacket, Operation,
};
use crate::encoding::OtherOp;
use crate::state::PACKET_SLOTS;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One disassembled instruction slot.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DisassemblyRow {
    /// Slot address.
    pub address: u32,
    /// Raw instruction word.
    pub raw: u32,
    /// Predicate guard, e.g. `(P3)` or `(!P1)`.
    pub guard: String,
    /// Instruction mnemonic.
    pub mnemonic: String,
    /// Formatted operands; empty when the instruction takes none.
    pub operands: String,
    /// The encoding faults when executed on an active lane.
    pub is_unimplemented: bool,
}

impl DisassemblyRow {
    /// Disassembles `raw` located at slot `address`.
    #[must_use]
    pub fn new(address: u32, raw: u32) -> Self {
        let decoded = Decoder::decode(raw);
        let (mnemonic, operands) = render_operation(&decoded.operation);
        Self {
            address,
            raw,
            guard: guard(&decoded),
            mnemonic,
            operands,
            is_unimplemented: decoded.operation.is_unimplemented(),
        }
    }
}

impl fmt::Display for DisassemblyRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:#06x}: {:08x}  {} {}",
            self.address, self.raw, self.guard, self.mnemonic
        )?;
        if !self.operands.is_empty() {
            write!(f, " {}", self.operands)?;
        }
        Ok(())
    }
}

/// Disassembles up to `packets` packets of `rom` starting at slot `start_pc`.
///
/// Rows stop at the end of the ROM; a trailing partial packet is included.
#[must_use]
pub fn disassemble_rom(rom: &[u32], start_pc: u32, packets: usize) -> Vec<DisassemblyRow> {
    let start = usize::try_from(start_pc).unwrap_or(usize::MAX);
    let slots = packets.saturating_mul(PACKET_SLOTS as usize);
    rom.iter()
        .enumerate()
        .skip(start)
        .take(slots)
        .map(|(index, word)| {
            DisassemblyRow::new(u32::try_from(index).unwrap_or(u32::MAX), *word)
        })
        .collect()
}

fn guard(instruction: &DecodedInstruction) -> String {
    let bang = if instruction.complement { "!" } else { "" };
    format!("({bang}{})", instruction.predicate)
}

fn render_source(source: AluSource) -> String {
    match source {
        AluSource::Immediate { value, rotate } => {
            format!("#{:#x}", rotated_immediate(value, rotate))
        }
        AluSource::Register { rt, amount: 0, .. } => rt.to_string(),
        AluSource::Register { rt, shift, amount } => {
            format!("{rt} {} #{amount}", shift.mnemonic())
        }
    }
}

fn render_operation(operation: &Operation) -> (String, String) {
    match *operation {
        Operation::Alu { op, rd, rs, source } => {
            let operands = if op.is_unary() {
                format!("{rd}, {}", render_source(source))
            } else {
                format!("{rd}, {rs}, {}", render_source(source))
            };
            (op.mnemonic().to_owned(), operands)
        }
        Operation::Compare {
            condition,
            pd,
            rs,
            source,
        } => (
            format!("CMP.{}", condition.mnemonic()),
            format!("{pd}, {rs}, {}", render_source(source)),
        ),
        Operation::Branch { link, target } => {
            let mnemonic = if link { "BL" } else { "B" };
            let operands = match target {
                BranchTarget::Relative(offset) => format!("${offset:+}"),
                BranchTarget::Register(rs) => rs.to_string(),
            };
            (mnemonic.to_owned(), operands)
        }
        Operation::LoadStore {
            op,
            rd,
            base,
            offset,
        } => (op.mnemonic().to_owned(), format!("{rd}, [{base}, #{offset}]")),
        Operation::Other {
            op,
            code,
            rd,
            rs,
            rt,
        } => {
            let operands = match op {
                OtherOp::Break | OtherOp::Syscall => format!("{code:#x}"),
                OtherOp::MoveFromCoprocessor => format!("{rd}, C{}", rt.index()),
                OtherOp::MoveToCoprocessor => format!("C{}, {rs}", rt.index()),
                OtherOp::Mult | OtherOp::Div => format!("{rd}, {rs}, {rt}"),
                OtherOp::MoveFromExtra => rd.to_string(),
                OtherOp::MoveToExtra => rs.to_string(),
                OtherOp::Fence
                | OtherOp::Eret
                | OtherOp::CoprocessorOp
                | OtherOp::Reserved0
                | OtherOp::Simd0
                | OtherOp::Simd1
                | OtherOp::Simd2
                | OtherOp::Simd3 => String::new(),
            };
            (op.mnemonic().to_owned(), operands)
        }
        Operation::Invalid => ("<INVALID>".to_owned(), String::new()),
    }
}

impl fmt::Display for DecodedInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (mnemonic, operands) = render_operation(&self.operation);
        write!(f, "{} {mnemonic}", guard(self))?;
        if !operands.is_empty() {
            write!(f, " {operands}")?;
        }
        Ok(())
    }
}

impl fmt::Display for InstructionPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (slot, lane) in self.lanes.iter().enumerate() {
            writeln!(f, "  [{slot}] {lane}")?;
        }
        Ok(())
    }
}
