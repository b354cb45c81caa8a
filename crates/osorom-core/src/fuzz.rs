//! Seeded random instruction words for stress-testing decode and execute.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::encoding::OperationClass;
use crate::state::PACKET_SLOTS;

/// Word bits below each class selector, i.e. the payload left free.
const ALU_IMM_PAYLOAD: u32 = (1 << 28) - 1;
const BRANCH_PAYLOAD: u32 = (1 << 27) - 1;
const ALU_REG_PAYLOAD: u32 = (1 << 26) - 1;
const LSU_PAYLOAD: u32 = (1 << 25) - 1;
const OTHER_PAYLOAD: u32 = (1 << 24) - 1;

const BRANCH_SELECTOR: u32 = 0b11 << 27;
const ALU_REG_SELECTOR: u32 = 0b101 << 26;
const LSU_SELECTOR: u32 = 0b1001 << 25;
const OTHER_SELECTOR: u32 = 0b1_0001 << 24;
const INVALID_SELECTOR: u32 = 0b1_0000 << 24;

/// Deterministic generator of instruction words and packets.
///
/// Two fuzzers built from the same seed yield the same sequence.
#[derive(Debug, Clone)]
pub struct InstructionFuzzer {
    rng: StdRng,
}

impl InstructionFuzzer {
    /// Creates a fuzzer seeded with `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Uniformly random 32-bit word.
    pub fn next_word(&mut self) -> u32 {
        self.rng.gen()
    }

    /// Random word whose class selector decodes to `class`.
    ///
    /// The predicate field and payload stay uniformly random.
    pub fn next_word_of(&mut self, class: OperationClass) -> u32 {
        let word: u32 = self.rng.gen();
        let prefix = word & 0xE000_0000;
        let selected = match class {
            OperationClass::Alu if self.rng.gen_bool(0.5) => word & ALU_IMM_PAYLOAD,
            OperationClass::Alu => ALU_REG_SELECTOR | (word & ALU_REG_PAYLOAD),
            OperationClass::Branch => BRANCH_SELECTOR | (word & BRANCH_PAYLOAD),
            OperationClass::LoadStore => LSU_SELECTOR | (word & LSU_PAYLOAD),
            OperationClass::Other => OTHER_SELECTOR | (word & OTHER_PAYLOAD),
            OperationClass::Invalid => INVALID_SELECTOR | (word & OTHER_PAYLOAD),
        };
        prefix | selected
    }

    /// Four uniformly random words.
    pub fn next_packet(&mut self) -> [u32; PACKET_SLOTS as usize] {
        std::array::from_fn(|_| self.next_word())
    }

    /// A random ROM of `packets` packets.
    pub fn rom(&mut self, packets: usize) -> Vec<u32> {
        (0..packets).flat_map(|_| self.next_packet()).collect()
    }
}
