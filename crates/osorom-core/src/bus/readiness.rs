//! Readiness policies deciding whether the port is ready on the next cycle.

use std::collections::VecDeque;
use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of per-cycle readiness for the memory bus transactor.
pub trait ReadyPolicy: fmt::Debug {
    /// Returns readiness for the next bus cycle.
    fn next_ready(&mut self) -> bool;
}

/// Port is ready on every cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlwaysReady;

impl ReadyPolicy for AlwaysReady {
    fn next_ready(&mut self) -> bool {
        true
    }
}

/// Independent per-cycle not-ready probability from a seeded generator.
#[derive(Debug, Clone)]
pub struct RandomBackpressure {
    rng: StdRng,
    not_ready_percent: u8,
}

impl RandomBackpressure {
    /// Creates a policy that withholds readiness `not_ready_percent`% of cycles.
    ///
    /// Percentages above 99 are clamped so the port eventually becomes ready.
    #[must_use]
    pub fn new(not_ready_percent: u8, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            not_ready_percent: not_ready_percent.min(99),
        }
    }
}

impl ReadyPolicy for RandomBackpressure {
    fn next_ready(&mut self) -> bool {
        self.rng.gen_range(0u8..100) >= self.not_ready_percent
    }
}

/// Replays a fixed readiness sequence, then stays ready.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadyReplay {
    sequence: VecDeque<bool>,
}

impl ReadyReplay {
    /// Creates a replay of `sequence`.
    #[must_use]
    pub fn new(sequence: impl IntoIterator<Item = bool>) -> Self {
        Self {
            sequence: sequence.into_iter().collect(),
        }
    }

    /// Number of scripted cycles not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.sequence.len()
    }
}

impl ReadyPolicy for ReadyReplay {
    fn next_ready(&mut self) -> bool {
        self.sequence.pop_front().unwrap_or(true)
    }
}
