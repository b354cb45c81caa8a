//! Random ROMs executed end to end: no panics, atomic faults and
//! deterministic replay.

use osorom_core::{
    Backpressure, InstructionFuzzer, Machine, OperationClass, RunState, SimConfig, StepOutcome,
};
use proptest::prelude::*;
use rand as _;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;
use tracing as _;

const HALT: u32 = 0xD118_3C00;
const NOP: u32 = 0xE000_0000;

fn config(seed: u64) -> SimConfig {
    SimConfig {
        memory_bytes: 4096,
        backpressure: Backpressure::Random {
            not_ready_percent: 30,
            seed,
        },
        packet_limit: 64,
    }
}

fn biased_rom(seed: u64, packets: usize) -> Vec<u32> {
    let mut fuzzer = InstructionFuzzer::new(seed);
    let classes = [
        OperationClass::Alu,
        OperationClass::Alu,
        OperationClass::LoadStore,
        OperationClass::Other,
    ];
    let mut rom: Vec<u32> = (0..packets * 4)
        .map(|slot| fuzzer.next_word_of(classes[slot % classes.len()]))
        .collect();
    rom.extend([HALT, NOP, NOP, NOP]);
    rom
}

proptest! {
    #[test]
    fn faulting_step_leaves_cpu_and_memory_untouched(seed in any::<u64>()) {
        let mut machine = Machine::new(biased_rom(seed, 6), config(seed));
        for _ in 0..16 {
            let before = machine.cpu().clone();
            let image = machine.bus().image().as_bytes().to_vec();
            match machine.step_packet() {
                StepOutcome::Fault(fault) => {
                    prop_assert_eq!(machine.cpu(), &before);
                    prop_assert_eq!(machine.bus().image().as_bytes(), &image[..]);
                    prop_assert_eq!(machine.run_state(), RunState::FaultLatched(fault.code));
                    break;
                }
                StepOutcome::NotRunning(_) | StepOutcome::Stopped { .. } => break,
                StepOutcome::Retired(outcome) => {
                    prop_assert_eq!(machine.cpu().pc(), outcome.next_pc);
                }
            }
        }
    }

    #[test]
    fn uniform_words_never_panic(seed in any::<u64>()) {
        let mut fuzzer = InstructionFuzzer::new(seed);
        let mut machine = Machine::new(fuzzer.rom(8), config(seed));
        let outcome = machine.run();
        prop_assert!(outcome.packets <= 64);
        prop_assert_eq!(machine.diag().packets_retired, outcome.packets);
    }
}

#[rstest]
#[case(0)]
#[case(17)]
#[case(0xDEAD_BEEF)]
fn identical_seeds_replay_identically(#[case] seed: u64) {
    let run = || {
        let mut machine = Machine::new(biased_rom(seed, 8), config(seed));
        let outcome = machine.run();
        (
            outcome,
            machine.cpu().clone(),
            *machine.diag(),
            machine.bus().image().as_bytes().to_vec(),
        )
    };
    assert_eq!(run(), run());
}
