//! Scripted `DeterministicRng` implementations for allocation tests.

use werewolf_core::rng::DeterministicRng;

/// Always answers the low end of the requested range.
///
/// With it, every draw takes the first candidate: `setup_roles` draws
/// special roles in a fixed order and every shuffle swap picks index 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockRng;

impl DeterministicRng for MockRng {
    fn next_u32_range(&mut self, min: u32, _max: u32) -> u32 {
        min
    }
}

/// Replays a fixed script of draws, clamped into each requested range.
///
/// Panics once the script runs out, so a test notices when the code under
/// test draws more often than expected.
#[derive(Debug)]
pub struct SequenceRng {
    values: Vec<u32>,
    index: usize,
}

impl SequenceRng {
    /// Creates an RNG that will answer with `values` in order.
    #[must_use]
    pub fn new(values: Vec<u32>) -> Self {
        Self { values, index: 0 }
    }

    /// Draws not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.values.len() - self.index
    }
}

impl DeterministicRng for SequenceRng {
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32 {
        let Some(value) = self.values.get(self.index).copied() else {
            panic!(
                "SequenceRng exhausted after {} draws (asked for {min}..={max})",
                self.index
            );
        };
        self.index += 1;
        value.clamp(min, max)
    }
}
