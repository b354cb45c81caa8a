//! Instruction decoder for the OSOROM packet ISA.
//!
//! Decoding is total: every 32-bit word yields a [`DecodedInstruction`].
//! Unassigned encodings map to [`Operation::Invalid`] or to the reserved
//! sub-opcode variants, and only fault once an *active* lane executes them.

use crate::encoding::{
    bit, bits, sign_extend, AluOp, CompareOp, LoadStoreOp, OperationClass, OtherOp, ShiftType,
    ALU_IMM_LO, ALU_IMM_WIDTH, ALU_OP_LO, ALU_ROT_LO, ALU_RT_LO, ALU_SHAMT_LO, ALU_STYPE_LO,
    BRANCH_LINK_BIT, BRANCH_OFFSET_WIDTH, BRANCH_REG_BIT, LSU_OFFSET_LO, LSU_OFFSET_WIDTH,
    LSU_OP_LO, OTHER_CODE_HI_BIT, OTHER_CODE_LO, OTHER_OP_LO, OTHER_RT_LO, PRED_COMP_BIT,
    PRED_REG_LO, RD_LO, RS_LO,
};
use crate::state::{PredicateRegister, Register, PACKET_SLOTS};

/// Second ALU operand: a rotated immediate or a shifted register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AluSource {
    /// 10-bit constant rotated right by `2 * rotate`.
    Immediate {
        /// Unrotated 10-bit constant.
        value: u16,
        /// Rotate field (`0..=15`); the rotate distance is twice this.
        rotate: u8,
    },
    /// Register operand passed through the shifter.
    Register {
        /// Shifted register.
        rt: Register,
        /// Shift mode.
        shift: ShiftType,
        /// Shift amount (`0..=31`).
        amount: u8,
    },
}

/// Branch target addressing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum BranchTarget {
    /// Signed packet offset relative to the branching packet's address.
    Relative(i32),
    /// Absolute slot address held in a register.
    Register(Register),
}

/// Class payload of a decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Operation {
    /// Arithmetic, logic or move writing a general register.
    Alu {
        /// Sub-opcode; never [`AluOp::Compare`] when produced by the decoder.
        op: AluOp,
        /// Destination register.
        rd: Register,
        /// First operand.
        rs: Register,
        /// Second operand.
        source: AluSource,
    },
    /// ALU `COMPARE` writing a predicate flag.
    Compare {
        /// Compare condition.
        condition: CompareOp,
        /// Destination predicate.
        pd: PredicateRegister,
        /// First operand.
        rs: Register,
        /// Second operand.
        source: AluSource,
    },
    /// Control transfer.
    Branch {
        /// Save the return address in [`Register::LINK`].
        link: bool,
        /// Target addressing.
        target: BranchTarget,
    },
    /// Data memory access.
    LoadStore {
        /// Sub-opcode.
        op: LoadStoreOp,
        /// Load destination or store data register.
        rd: Register,
        /// Base address register.
        base: Register,
        /// Signed 12-bit byte displacement.
        offset: i16,
    },
    /// System, coprocessor and multiply/divide operations.
    Other {
        /// Sub-opcode.
        op: OtherOp,
        /// 5-bit immediate code (`BREAK`/`SYSCALL` number).
        code: u8,
        /// Destination register.
        rd: Register,
        /// First source register.
        rs: Register,
        /// Second source or coprocessor register.
        rt: Register,
    },
    /// Unassigned class encoding.
    Invalid,
}

impl Operation {
    /// Returns the top-level operation class.
    #[must_use]
    pub const fn class(&self) -> OperationClass {
        match self {
            Self::Alu { .. } | Self::Compare { .. } => OperationClass::Alu,
            Self::Branch { .. } => OperationClass::Branch,
            Self::LoadStore { .. } => OperationClass::LoadStore,
            Self::Other { .. } => OperationClass::Other,
            Self::Invalid => OperationClass::Invalid,
        }
    }

    /// Returns `true` when executing this operation on an active lane faults.
    #[must_use]
    pub const fn is_unimplemented(&self) -> bool {
        match self {
            Self::Alu { op, .. } => op.is_reserved() || matches!(op, AluOp::Compare),
            Self::Compare { condition, .. } => condition.is_reserved(),
            Self::Other { op, .. } => op.is_reserved(),
            Self::Branch { .. } | Self::LoadStore { .. } => false,
            Self::Invalid => true,
        }
    }
}

/// One decoded instruction slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DecodedInstruction {
    /// Predicate flag gating this lane.
    pub predicate: PredicateRegister,
    /// Lane is active when the predicate is *false*.
    pub complement: bool,
    /// Class payload.
    pub operation: Operation,
}

impl DecodedInstruction {
    /// Canonical no-op: `(!P3) ADD R0, R0, #0`.
    pub const NOP: Self = Self {
        predicate: PredicateRegister::P3,
        complement: true,
        operation: Operation::Alu {
            op: AluOp::Add,
            rd: Register::from_u5(0),
            rs: Register::from_u5(0),
            source: AluSource::Immediate {
                value: 0,
                rotate: 0,
            },
        },
    };

    /// Creates an always-active instruction (`(P3)`).
    #[must_use]
    pub const fn always(operation: Operation) -> Self {
        Self {
            predicate: PredicateRegister::ALWAYS,
            complement: false,
            operation,
        }
    }

    /// Returns the top-level operation class.
    #[must_use]
    pub const fn class(&self) -> OperationClass {
        self.operation.class()
    }

    /// Returns `true` when the lane executes given the predicate value.
    #[must_use]
    pub const fn is_active(&self, predicate_value: bool) -> bool {
        predicate_value ^ self.complement
    }

    /// Re-encodes this instruction into a 32-bit word.
    ///
    /// Field values are masked to their encoded widths, so
    /// `Decoder::decode(d.encode()) == d` for every decoded `d`. Hand-built
    /// values outside the decoder's range do not round trip: an
    /// [`Operation::Alu`] carrying [`AluOp::Compare`] re-decodes as
    /// [`Operation::Compare`].
    #[must_use]
    pub const fn encode(&self) -> u32 {
        let prefix =
            (self.predicate.bits() << PRED_REG_LO) | ((self.complement as u32) << PRED_COMP_BIT);
        prefix | encode_operation(&self.operation)
    }
}

const fn encode_source(source: AluSource) -> u32 {
    match source {
        AluSource::Immediate { value, rotate } => {
            (((value as u32) & 0x3FF) << ALU_IMM_LO) | (((rotate as u32) & 0xF) << ALU_ROT_LO)
        }
        AluSource::Register { rt, shift, amount } => {
            (0b101 << 26)
                | (rt.bits() << ALU_RT_LO)
                | ((shift as u32) << ALU_STYPE_LO)
                | (((amount as u32) & 0x1F) << ALU_SHAMT_LO)
        }
    }
}

const fn encode_operation(operation: &Operation) -> u32 {
    match *operation {
        Operation::Alu { op, rd, rs, source } => {
            encode_source(source)
                | ((op as u32) << ALU_OP_LO)
                | (rs.bits() << RS_LO)
                | (rd.bits() << RD_LO)
        }
        Operation::Compare {
            condition,
            pd,
            rs,
            source,
        } => {
            encode_source(source)
                | ((AluOp::Compare as u32) << ALU_OP_LO)
                | (rs.bits() << RS_LO)
                | ((condition as u32) << 2)
                | pd.bits()
        }
        Operation::Branch { link, target } => {
            let form = match target {
                BranchTarget::Relative(offset) => (offset as u32) & 0x01FF_FFFF,
                BranchTarget::Register(rs) => (1 << BRANCH_REG_BIT) | (rs.bits() << RS_LO),
            };
            (0b11 << 27) | ((link as u32) << BRANCH_LINK_BIT) | form
        }
        Operation::LoadStore {
            op,
            rd,
            base,
            offset,
        } => {
            (0b1001 << 25)
                | ((op as u32) << LSU_OP_LO)
                | (((offset as u32) & 0xFFF) << LSU_OFFSET_LO)
                | (base.bits() << RS_LO)
                | (rd.bits() << RD_LO)
        }
        Operation::Other {
            op,
            code,
            rd,
            rs,
            rt,
        } => {
            let code = (code as u32) & 0x1F;
            (0b10001 << 24)
                | ((op as u32) << OTHER_OP_LO)
                | ((code >> 4) << OTHER_CODE_HI_BIT)
                | (rt.bits() << OTHER_RT_LO)
                | ((code & 0xF) << OTHER_CODE_LO)
                | (rs.bits() << RS_LO)
                | (rd.bits() << RD_LO)
        }
        Operation::Invalid => 0b10000 << 24,
    }
}

/// Four decoded lanes issued and committed together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct InstructionPacket {
    /// Lanes in slot order.
    pub lanes: [DecodedInstruction; PACKET_SLOTS as usize],
}

impl InstructionPacket {
    /// Packet of four no-ops.
    pub const NOP: Self = Self {
        lanes: [DecodedInstruction::NOP; PACKET_SLOTS as usize],
    };

    /// Re-encodes all four lanes.
    #[must_use]
    pub const fn encode(&self) -> [u32; PACKET_SLOTS as usize] {
        [
            self.lanes[0].encode(),
            self.lanes[1].encode(),
            self.lanes[2].encode(),
            self.lanes[3].encode(),
        ]
    }
}

/// Stateless instruction decoder.
pub struct Decoder;

impl Decoder {
    /// Decodes one 32-bit instruction word.
    #[must_use]
    pub const fn decode(word: u32) -> DecodedInstruction {
        DecodedInstruction {
            predicate: PredicateRegister::from_u2(bits(word, PRED_REG_LO, 2)),
            complement: bit(word, PRED_COMP_BIT),
            operation: Self::decode_operation(word),
        }
    }

    /// Decodes the four words of one packet.
    #[must_use]
    pub const fn decode_packet(words: [u32; PACKET_SLOTS as usize]) -> InstructionPacket {
        InstructionPacket {
            lanes: [
                Self::decode(words[0]),
                Self::decode(words[1]),
                Self::decode(words[2]),
                Self::decode(words[3]),
            ],
        }
    }

    const fn decode_operation(word: u32) -> Operation {
        let rd = Register::from_u5(bits(word, RD_LO, 5));
        let rs = Register::from_u5(bits(word, RS_LO, 5));
        match OperationClass::of_word(word) {
            OperationClass::Alu => {
                let source = if bit(word, 28) {
                    AluSource::Register {
                        rt: Register::from_u5(bits(word, ALU_RT_LO, 5)),
                        shift: ShiftType::from_u2(bits(word, ALU_STYPE_LO, 2)),
                        amount: bits(word, ALU_SHAMT_LO, 5) as u8,
                    }
                } else {
                    AluSource::Immediate {
                        value: bits(word, ALU_IMM_LO, ALU_IMM_WIDTH) as u16,
                        rotate: bits(word, ALU_ROT_LO, 4) as u8,
                    }
                };
                match AluOp::from_u4(bits(word, ALU_OP_LO, 4)) {
                    AluOp::Compare => Operation::Compare {
                        condition: CompareOp::from_u3(bits(word, 2, 3)),
                        pd: PredicateRegister::from_u2(bits(word, 0, 2)),
                        rs,
                        source,
                    },
                    op => Operation::Alu { op, rd, rs, source },
                }
            }
            OperationClass::Branch => Operation::Branch {
                link: bit(word, BRANCH_LINK_BIT),
                target: if bit(word, BRANCH_REG_BIT) {
                    BranchTarget::Register(rs)
                } else {
                    BranchTarget::Relative(sign_extend(word, BRANCH_OFFSET_WIDTH))
                },
            },
            OperationClass::LoadStore => Operation::LoadStore {
                op: LoadStoreOp::from_u3(bits(word, LSU_OP_LO, 3)),
                rd,
                base: rs,
                offset: sign_extend(bits(word, LSU_OFFSET_LO, LSU_OFFSET_WIDTH), LSU_OFFSET_WIDTH)
                    as i16,
            },
            OperationClass::Other => Operation::Other {
                op: OtherOp::from_u4(bits(word, OTHER_OP_LO, 4)),
                code: ((bits(word, OTHER_CODE_HI_BIT, 1) << 4) | bits(word, OTHER_CODE_LO, 4))
                    as u8,
                rd,
                rs,
                rt: Register::from_u5(bits(word, OTHER_RT_LO, 5)),
            },
            OperationClass::Invalid => Operation::Invalid,
        }
    }
}
