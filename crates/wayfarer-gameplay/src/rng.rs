//! Injectable randomness.
//!
//! Combat rolls and monster selection draw from a [`RandomSource`] passed in
//! by the caller, so a fixed seed or a scripted sequence reproduces a fight
//! exactly.

use std::collections::VecDeque;

/// A source of uniform random draws.
pub trait RandomSource {
    /// Uniform value in `[0, 100)`.
    fn roll_percent(&mut self) -> f64;

    /// Uniform index in `[0, len)`. `len` must be non-zero.
    fn pick_index(&mut self, len: usize) -> usize;
}

impl RandomSource for fastrand::Rng {
    fn roll_percent(&mut self) -> f64 {
        self.f64() * 100.0
    }

    fn pick_index(&mut self, len: usize) -> usize {
        self.usize(..len)
    }
}

impl<R: RandomSource + ?Sized> RandomSource for Box<R> {
    fn roll_percent(&mut self) -> f64 {
        (**self).roll_percent()
    }

    fn pick_index(&mut self, len: usize) -> usize {
        (**self).pick_index(len)
    }
}

/// Creates a generator, seeded when a seed is given.
#[must_use]
pub fn seeded(seed: Option<u64>) -> fastrand::Rng {
    match seed {
        Some(seed) => fastrand::Rng::with_seed(seed),
        None => fastrand::Rng::new(),
    }
}

/// Replays a fixed sequence of draws.
///
/// Once a queue runs dry the source keeps returning its fallback: a roll of
/// 99.99 (never a critical hit) and index 0.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRandom {
    rolls: VecDeque<f64>,
    picks: VecDeque<usize>,
}

impl ScriptedRandom {
    /// Roll returned once the scripted rolls are used up.
    pub const FALLBACK_ROLL: f64 = 99.99;

    /// Creates a source that never crits and always picks the first entry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues percentage rolls.
    #[must_use]
    pub fn with_rolls(mut self, rolls: impl IntoIterator<Item = f64>) -> Self {
        self.rolls.extend(rolls);
        self
    }

    /// Queues index picks.
    #[must_use]
    pub fn with_picks(mut self, picks: impl IntoIterator<Item = usize>) -> Self {
        self.picks.extend(picks);
        self
    }
}

impl RandomSource for ScriptedRandom {
    fn roll_percent(&mut self) -> f64 {
        self.rolls.pop_front().unwrap_or(Self::FALLBACK_ROLL)
    }

    fn pick_index(&mut self, len: usize) -> usize {
        self.picks.pop_front().unwrap_or(0).min(len.saturating_sub(1))
    }
}
