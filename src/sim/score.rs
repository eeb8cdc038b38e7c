//! Points, penalties and level progression
//!
//! Small pure functions so the numbers are easy to pin down in tests.

use crate::consts::TARGET_SECONDS;

/// Points for hitting the lit window with `seconds_left` on its clock.
/// Full marks inside the first second, stepping down to a floor of 5.
pub fn hit_points(seconds_left: u32) -> u32 {
    let elapsed = TARGET_SECONDS.saturating_sub(seconds_left);
    (10u32.saturating_sub(elapsed / 2)).max(5)
}

/// Stars needed for the level after one that required `prev`.
/// Integer form of floor(prev * 1.2).
pub fn next_threshold(prev: u32) -> u32 {
    prev.saturating_mul(6) / 5
}

/// Obstacle penalty: one point, never below zero
pub fn apply_penalty(score: u32) -> u32 {
    score.saturating_sub(1)
}

/// End-screen encouragement by final score
pub fn performance_message(score: u32) -> &'static str {
    match score {
        0..=14 => "Keep practicing!",
        15..=29 => "Good work!",
        30..=49 => "Great job!",
        _ => "Amazing driving!",
    }
}
