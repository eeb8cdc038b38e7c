//! Seedable random source for spawns and character draws
//!
//! Every random decision in the sim flows through here so a fixed seed
//! replays a full session.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::spawn::CharSet;
use crate::consts::LANE_COUNT;

/// Deterministic RNG handle owned by each game session
#[derive(Debug, Clone)]
pub struct GameRng {
    rng: Pcg32,
}

impl GameRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    /// Bernoulli draw with probability `p`
    pub fn chance(&mut self, p: f32) -> bool {
        self.rng.random::<f32>() < p
    }

    /// Uniform float in [lo, hi)
    pub fn range_f32(&mut self, lo: f32, hi: f32) -> f32 {
        self.rng.random_range(lo..hi)
    }

    /// Uniform integer in [0, n)
    pub fn below(&mut self, n: u32) -> u32 {
        self.rng.random_range(0..n)
    }

    /// Uniform lane index
    pub fn lane(&mut self) -> u8 {
        self.rng.random_range(0..LANE_COUNT)
    }

    /// Uniform pick from a non-empty slice
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.rng.random_range(0..items.len())]
    }

    /// Uppercase letter A-Z
    pub fn letter(&mut self) -> char {
        (b'A' + self.below(26) as u8) as char
    }

    /// Digit 0-9
    pub fn digit(&mut self) -> char {
        (b'0' + self.below(10) as u8) as char
    }

    /// Target character for a freshly spawned star.
    /// The mixed set leans toward letters at roughly two draws in three.
    pub fn star_char(&mut self, set: CharSet) -> char {
        match set {
            CharSet::LettersAndDigits => {
                if self.chance(0.66) {
                    self.letter()
                } else {
                    self.digit()
                }
            }
            CharSet::DigitsOnly => self.digit(),
        }
    }
}
