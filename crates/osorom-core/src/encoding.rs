//! Opcode tables and instruction-word field layout.
//!
//! Field positions (bit 31 is the MSB):
//!
//! | bits            | meaning                           |
//! |-----------------|-----------------------------------|
//! | `[31:30]`       | predicate register                |
//! | `[29]`          | predicate complement              |
//! | `[28]=0`        | ALU, rotated-immediate form       |
//! | `[28:27]=11`    | branch                            |
//! | `[28:26]=101`   | ALU, register form                |
//! | `[28:25]=1001`  | load/store                        |
//! | `[28:24]=10001` | other                             |
//! | `[28:24]=10000` | invalid                           |

/// Extracts `count` bits of `word` starting at bit `lo`.
#[must_use]
pub const fn bits(word: u32, lo: u32, count: u32) -> u32 {
    (word >> lo) & ((1u32 << count) - 1)
}

/// Extracts bit `idx` of `word` as a boolean.
#[must_use]
pub const fn bit(word: u32, idx: u32) -> bool {
    (word >> idx) & 1 != 0
}

/// Sign-extends the low `width` bits of `value`.
#[must_use]
pub const fn sign_extend(value: u32, width: u32) -> i32 {
    let shift = 32 - width;
    ((value << shift) as i32) >> shift
}

/// Predicate register field `[31:30]`.
pub const PRED_REG_LO: u32 = 30;
/// Predicate complement bit `[29]`.
pub const PRED_COMP_BIT: u32 = 29;
/// ALU rotated immediate `[27:18]`.
pub const ALU_IMM_LO: u32 = 18;
/// Width of the ALU immediate constant.
pub const ALU_IMM_WIDTH: u32 = 10;
/// ALU immediate rotate field `[17:14]`.
pub const ALU_ROT_LO: u32 = 14;
/// ALU register-form `rt` `[25:21]`.
pub const ALU_RT_LO: u32 = 21;
/// ALU register-form shift type `[20:19]`.
pub const ALU_STYPE_LO: u32 = 19;
/// ALU register-form shift amount `[18:14]`.
pub const ALU_SHAMT_LO: u32 = 14;
/// ALU sub-opcode `[13:10]`.
pub const ALU_OP_LO: u32 = 10;
/// Branch link bit `[26]`.
pub const BRANCH_LINK_BIT: u32 = 26;
/// Branch register-form bit `[25]`.
pub const BRANCH_REG_BIT: u32 = 25;
/// Width of the branch packet offset `[24:0]`.
pub const BRANCH_OFFSET_WIDTH: u32 = 25;
/// Load/store sub-opcode `[24:22]`.
pub const LSU_OP_LO: u32 = 22;
/// Load/store byte offset `[21:10]`.
pub const LSU_OFFSET_LO: u32 = 10;
/// Width of the load/store byte offset.
pub const LSU_OFFSET_WIDTH: u32 = 12;
/// Other sub-opcode `[23:20]`.
pub const OTHER_OP_LO: u32 = 20;
/// Other code high bit `[19]`.
pub const OTHER_CODE_HI_BIT: u32 = 19;
/// Other `rt` field `[18:14]`.
pub const OTHER_RT_LO: u32 = 14;
/// Other code low bits `[13:10]`.
pub const OTHER_CODE_LO: u32 = 10;
/// Source register `rs` `[9:5]`.
pub const RS_LO: u32 = 5;
/// Destination register `rd` `[4:0]`.
pub const RD_LO: u32 = 0;

/// Top-level operation classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(missing_docs)]
pub enum OperationClass {
    Branch,
    Alu,
    LoadStore,
    Other,
    Invalid,
}

impl OperationClass {
    /// Classifies a raw instruction word by its class-selector bits.
    #[must_use]
    pub const fn of_word(word: u32) -> Self {
        if !bit(word, 28) {
            Self::Alu
        } else if bit(word, 27) {
            Self::Branch
        } else if bit(word, 26) {
            Self::Alu
        } else if bit(word, 25) {
            Self::LoadStore
        } else if bit(word, 24) {
            Self::Other
        } else {
            Self::Invalid
        }
    }

    /// Human-readable class tag.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Branch => "<BRANCH_OP>",
            Self::Alu => "<ALU_OP>",
            Self::LoadStore => "<LSU_OP>",
            Self::Other => "<OTHER_OP>",
            Self::Invalid => "<INVALID_OP>",
        }
    }
}

/// ALU sub-opcodes. Order matches the 4-bit encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum AluOp {
    Add = 0,
    And = 1,
    Nor = 2,
    Or = 3,
    Sub = 4,
    Rsb = 5,
    Xor = 6,
    Compare = 7,
    Mov = 8,
    Mvn = 9,
    Sxb = 10,
    Sxh = 11,
    Reserved1 = 12,
    Reserved2 = 13,
    Reserved3 = 14,
    Reserved4 = 15,
}

impl AluOp {
    /// All sub-opcodes in encoding order.
    pub const ALL: [Self; 16] = [
        Self::Add,
        Self::And,
        Self::Nor,
        Self::Or,
        Self::Sub,
        Self::Rsb,
        Self::Xor,
        Self::Compare,
        Self::Mov,
        Self::Mvn,
        Self::Sxb,
        Self::Sxh,
        Self::Reserved1,
        Self::Reserved2,
        Self::Reserved3,
        Self::Reserved4,
    ];

    /// Decodes a 4-bit ALU sub-opcode field.
    #[must_use]
    pub const fn from_u4(bits: u32) -> Self {
        Self::ALL[(bits & 0xF) as usize]
    }

    /// Returns `true` for operations that take only the second operand.
    #[must_use]
    pub const fn is_unary(self) -> bool {
        matches!(self, Self::Mov | Self::Mvn | Self::Sxb | Self::Sxh)
    }

    /// Returns `true` for two-operand arithmetic/logic operations.
    #[must_use]
    pub const fn is_binary(self) -> bool {
        matches!(
            self,
            Self::Add | Self::And | Self::Nor | Self::Or | Self::Sub | Self::Rsb | Self::Xor
        )
    }

    /// Returns `true` for unassigned sub-opcodes.
    #[must_use]
    pub const fn is_reserved(self) -> bool {
        matches!(
            self,
            Self::Reserved1 | Self::Reserved2 | Self::Reserved3 | Self::Reserved4
        )
    }

    /// Assembly mnemonic.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::And => "AND",
            Self::Nor => "NOR",
            Self::Or => "OR",
            Self::Sub => "SUB",
            Self::Rsb => "RSB",
            Self::Xor => "XOR",
            Self::Compare => "<COMPARE>",
            Self::Mov => "MOV",
            Self::Mvn => "MVN",
            Self::Sxb => "SXB",
            Self::Sxh => "SXH",
            Self::Reserved1 => "<RESERVED 1>",
            Self::Reserved2 => "<RESERVED 2>",
            Self::Reserved3 => "<RESERVED 3>",
            Self::Reserved4 => "<RESERVED 4>",
        }
    }
}

/// Compare conditions. Order matches the 3-bit encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum CompareOp {
    Ltu = 0,
    Leu = 1,
    Eq = 2,
    Reserved = 3,
    Lts = 4,
    Les = 5,
    BitSet = 6,
    BitClear = 7,
}

impl CompareOp {
    /// All conditions in encoding order.
    pub const ALL: [Self; 8] = [
        Self::Ltu,
        Self::Leu,
        Self::Eq,
        Self::Reserved,
        Self::Lts,
        Self::Les,
        Self::BitSet,
        Self::BitClear,
    ];

    /// Decodes a 3-bit compare condition field.
    #[must_use]
    pub const fn from_u3(bits: u32) -> Self {
        Self::ALL[(bits & 0x7) as usize]
    }

    /// Returns `true` for the unassigned condition.
    #[must_use]
    pub const fn is_reserved(self) -> bool {
        matches!(self, Self::Reserved)
    }

    /// Assembly mnemonic.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Ltu => "LTU",
            Self::Leu => "LEU",
            Self::Eq => "EQ",
            Self::Reserved => "<RESERVED>",
            Self::Lts => "LTS",
            Self::Les => "LES",
            Self::BitSet => "BS",
            Self::BitClear => "BC",
        }
    }
}

/// Shift modes. Order matches the 2-bit encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum ShiftType {
    Lsl = 0,
    Lsr = 1,
    Asr = 2,
    Ror = 3,
}

impl ShiftType {
    /// Decodes a 2-bit shift type field.
    #[must_use]
    pub const fn from_u2(bits: u32) -> Self {
        match bits & 0x3 {
            0 => Self::Lsl,
            1 => Self::Lsr,
            2 => Self::Asr,
            _ => Self::Ror,
        }
    }

    /// Assembly mnemonic.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Lsl => "LSL",
            Self::Lsr => "LSR",
            Self::Asr => "ASR",
            Self::Ror => "ROR",
        }
    }
}

/// Load/store sub-opcodes. Order matches the 3-bit encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum LoadStoreOp {
    LoadByte = 0,
    LoadHalf = 1,
    LoadWord = 2,
    LoadLinked = 3,
    StoreByte = 4,
    StoreHalf = 5,
    StoreWord = 6,
    StoreConditional = 7,
}

impl LoadStoreOp {
    /// All sub-opcodes in encoding order.
    pub const ALL: [Self; 8] = [
        Self::LoadByte,
        Self::LoadHalf,
        Self::LoadWord,
        Self::LoadLinked,
        Self::StoreByte,
        Self::StoreHalf,
        Self::StoreWord,
        Self::StoreConditional,
    ];

    /// Decodes a 3-bit load/store sub-opcode field.
    #[must_use]
    pub const fn from_u3(bits: u32) -> Self {
        Self::ALL[(bits & 0x7) as usize]
    }

    /// Returns `true` for operations that write memory.
    #[must_use]
    pub const fn is_store(self) -> bool {
        matches!(
            self,
            Self::StoreByte | Self::StoreHalf | Self::StoreWord | Self::StoreConditional
        )
    }

    /// Access width in bytes.
    #[must_use]
    pub const fn width(self) -> u32 {
        match self {
            Self::LoadByte | Self::StoreByte => 1,
            Self::LoadHalf | Self::StoreHalf => 2,
            Self::LoadWord | Self::LoadLinked | Self::StoreWord | Self::StoreConditional => 4,
        }
    }

    /// Assembly mnemonic.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::LoadByte => "LB",
            Self::LoadHalf => "LHW",
            Self::LoadWord => "LW",
            Self::LoadLinked => "LL",
            Self::StoreByte => "SB",
            Self::StoreHalf => "SHW",
            Self::StoreWord => "SW",
            Self::StoreConditional => "SC",
        }
    }
}

/// Other-class sub-opcodes. Order matches the 4-bit encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum OtherOp {
    Reserved0 = 0,
    Break = 1,
    Syscall = 2,
    Fence = 3,
    Eret = 4,
    CoprocessorOp = 5,
    MoveFromCoprocessor = 6,
    MoveToCoprocessor = 7,
    Mult = 8,
    Div = 9,
    MoveFromExtra = 10,
    MoveToExtra = 11,
    Simd0 = 12,
    Simd1 = 13,
    Simd2 = 14,
    Simd3 = 15,
}

impl OtherOp {
    /// All sub-opcodes in encoding order.
    pub const ALL: [Self; 16] = [
        Self::Reserved0,
        Self::Break,
        Self::Syscall,
        Self::Fence,
        Self::Eret,
        Self::CoprocessorOp,
        Self::MoveFromCoprocessor,
        Self::MoveToCoprocessor,
        Self::Mult,
        Self::Div,
        Self::MoveFromExtra,
        Self::MoveToExtra,
        Self::Simd0,
        Self::Simd1,
        Self::Simd2,
        Self::Simd3,
    ];

    /// Decodes a 4-bit other sub-opcode field.
    #[must_use]
    pub const fn from_u4(bits: u32) -> Self {
        Self::ALL[(bits & 0xF) as usize]
    }

    /// Returns `true` for opcodes recognised but not implemented by this core.
    #[must_use]
    pub const fn is_reserved(self) -> bool {
        matches!(
            self,
            Self::Reserved0 | Self::Simd0 | Self::Simd1 | Self::Simd2 | Self::Simd3
        )
    }

    /// Assembly mnemonic.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Reserved0 => "<RESV0>",
            Self::Break => "BREAK",
            Self::Syscall => "SYSCALL",
            Self::Fence => "FENCE",
            Self::Eret => "ERET",
            Self::CoprocessorOp => "CPOP",
            Self::MoveFromCoprocessor => "MFC",
            Self::MoveToCoprocessor => "MTC",
            Self::Mult => "MULT",
            Self::Div => "DIV",
            Self::MoveFromExtra => "MFHI",
            Self::MoveToExtra => "MTHI",
            Self::Simd0 => "<SIMD0>",
            Self::Simd1 => "<SIMD1>",
            Self::Simd2 => "<SIMD2>",
            Self::Simd3 => "<SIMD3>",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_selector_matches_reference_words() {
        assert_eq!(OperationClass::of_word(0xE000_0000), OperationClass::Alu);
        assert_eq!(OperationClass::of_word(0xC004_0000), OperationClass::Alu);
        assert_eq!(OperationClass::of_word(0xD800_0000), OperationClass::Branch);
        assert_eq!(OperationClass::of_word(0xD118_3C00), OperationClass::Other);
        assert_eq!(OperationClass::of_word(0x1400_0000), OperationClass::Alu);
        assert_eq!(OperationClass::of_word(0x1200_0000), OperationClass::LoadStore);
        assert_eq!(OperationClass::of_word(0x1000_0000), OperationClass::Invalid);
    }

    #[test]
    fn sub_opcode_tables_follow_encoding_order() {
        for (index, op) in AluOp::ALL.iter().enumerate() {
            assert_eq!(*op as usize, index);
        }
        for (index, op) in OtherOp::ALL.iter().enumerate() {
            assert_eq!(*op as usize, index);
        }
        for (index, op) in LoadStoreOp::ALL.iter().enumerate() {
            assert_eq!(*op as usize, index);
        }
        for (index, op) in CompareOp::ALL.iter().enumerate() {
            assert_eq!(*op as usize, index);
        }
    }

    #[test]
    fn reserved_markers_cover_unassigned_slots() {
        let reserved_alu = AluOp::ALL.iter().filter(|op| op.is_reserved()).count();
        assert_eq!(reserved_alu, 4);
        let reserved_other = OtherOp::ALL.iter().filter(|op| op.is_reserved()).count();
        assert_eq!(reserved_other, 5);
        assert!(CompareOp::Reserved.is_reserved());
        assert!(!AluOp::Compare.is_unary() && !AluOp::Compare.is_binary());
    }

    #[test]
    fn sign_extension_of_narrow_fields() {
        assert_eq!(sign_extend(0xFFF, 12), -1);
        assert_eq!(sign_extend(0x7FF, 12), 2047);
        assert_eq!(sign_extend(0x100_0000, 25), -16_777_216);
        assert_eq!(bits(0xD118_3C00, 20, 4), 1);
    }
}
