#![no_main]

use libfuzzer_sys::fuzz_target;
use osorom_core::{disassemble_rom, Backpressure, Decoder, Machine, SimConfig, StepOutcome};

fuzz_target!(|data: &[u8]| {
    if data.len() < 17 {
        return;
    }

    let not_ready_percent = data[0] % 100;
    let rom: Vec<u32> = data[1..]
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    for word in &rom {
        let decoded = Decoder::decode(*word);
        assert_eq!(Decoder::decode(decoded.encode()), decoded);
    }
    let _ = disassemble_rom(&rom, 0, rom.len() / 4);

    let config = SimConfig {
        memory_bytes: 1024,
        backpressure: Backpressure::Random {
            not_ready_percent,
            seed: u64::from(data[0]),
        },
        packet_limit: 256,
    };
    let mut machine = Machine::new(rom, config);
    for _ in 0..256 {
        let before = machine.cpu().clone();
        let image = machine.bus().image().as_bytes().to_vec();
        match machine.step_packet() {
            StepOutcome::Retired(_) => {}
            StepOutcome::Fault(_) => {
                assert_eq!(machine.cpu(), &before);
                assert_eq!(machine.bus().image().as_bytes(), &image[..]);
                break;
            }
            StepOutcome::Stopped { .. } | StepOutcome::NotRunning(_) => break,
        }
    }
});
