//! Spawn policies and difficulty tables
//!
//! The road game rolls spawns once per tick from per-level probability
//! tables. Tables are monotonic: a higher speed level is strictly busier
//! and faster, and each level-up ramps both further.

use serde::{Deserialize, Serialize};

use super::rng::GameRng;
use super::state::{Item, ItemKind};
use crate::consts::*;

/// Discrete difficulty selector shown as 1-5 in the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SpeedLevel {
    VerySlow,
    Slow,
    #[default]
    Medium,
    Fast,
    VeryFast,
}

impl SpeedLevel {
    pub const ALL: [SpeedLevel; 5] = [
        SpeedLevel::VerySlow,
        SpeedLevel::Slow,
        SpeedLevel::Medium,
        SpeedLevel::Fast,
        SpeedLevel::VeryFast,
    ];

    /// 1-based UI index
    pub fn index(self) -> u8 {
        match self {
            SpeedLevel::VerySlow => 1,
            SpeedLevel::Slow => 2,
            SpeedLevel::Medium => 3,
            SpeedLevel::Fast => 4,
            SpeedLevel::VeryFast => 5,
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            1 => Some(SpeedLevel::VerySlow),
            2 => Some(SpeedLevel::Slow),
            3 => Some(SpeedLevel::Medium),
            4 => Some(SpeedLevel::Fast),
            5 => Some(SpeedLevel::VeryFast),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SpeedLevel::VerySlow => "Very Slow",
            SpeedLevel::Slow => "Slow",
            SpeedLevel::Medium => "Medium",
            SpeedLevel::Fast => "Fast",
            SpeedLevel::VeryFast => "Very Fast",
        }
    }

    /// Fall-speed multiplier
    pub fn multiplier(self) -> f32 {
        match self {
            SpeedLevel::VerySlow => 0.4,
            SpeedLevel::Slow => 0.7,
            SpeedLevel::Medium => 1.0,
            SpeedLevel::Fast => 1.3,
            SpeedLevel::VeryFast => 1.7,
        }
    }
}

/// Which characters stars carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CharSet {
    #[default]
    LettersAndDigits,
    DigitsOnly,
}

/// How star spawn timing is decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SpawnPolicy {
    /// Independent per-tick probability rolls
    #[default]
    Timed,
    /// Rolls only happen while there is clear air below the spawn point
    MinGap,
}

/// Per-tick star spawn probability for a speed level
pub fn star_chance(level: SpeedLevel) -> f32 {
    match level {
        SpeedLevel::VerySlow => 0.0023,
        SpeedLevel::Slow => 0.0036,
        SpeedLevel::Medium => 0.0058,
        SpeedLevel::Fast => 0.0083,
        SpeedLevel::VeryFast => 0.0125,
    }
}

/// Per-tick obstacle spawn probability for a speed level
pub fn obstacle_chance(level: SpeedLevel) -> f32 {
    match level {
        SpeedLevel::VerySlow => 0.0007,
        SpeedLevel::Slow => 0.0015,
        SpeedLevel::Medium => 0.0033,
        SpeedLevel::Fast => 0.0052,
        SpeedLevel::VeryFast => 0.0083,
    }
}

/// Ramp applied on top of the speed level as the session levels up
pub fn level_ramp(session_level: u32) -> f32 {
    1.0 + LEVEL_RAMP_STEP * session_level.saturating_sub(1) as f32
}

/// Combined speed factor for fall velocity
pub fn game_speed(level: SpeedLevel, session_level: u32) -> f32 {
    level.multiplier() * level_ramp(session_level)
}

/// Under the gap policy a new star needs every live star to have fallen
/// at least `MIN_STAR_GAP` below the spawn point
pub fn star_gap_open(items: &[Item]) -> bool {
    items
        .iter()
        .filter(|i| i.kind == ItemKind::Star)
        .all(|i| i.pos.y - ITEM_SPAWN_Y >= MIN_STAR_GAP)
}

/// What to create this tick; ids get assigned by the session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnOrder {
    pub kind: ItemKind,
    pub lane: u8,
    pub ch: Option<char>,
    pub speed: f32,
}

/// Roll this tick's spawns and append orders.
/// The obstacle roll always happens before the star roll.
pub fn roll_spawns(
    rng: &mut GameRng,
    policy: SpawnPolicy,
    chars: CharSet,
    level: SpeedLevel,
    session_level: u32,
    items: &[Item],
    out: &mut Vec<SpawnOrder>,
) {
    let ramp = level_ramp(session_level);
    let speed = BASE_FALL_SPEED * game_speed(level, session_level);

    if rng.chance(obstacle_chance(level) * ramp) {
        out.push(SpawnOrder {
            kind: ItemKind::Obstacle,
            lane: rng.lane(),
            ch: None,
            speed,
        });
    }

    let star_roll = rng.chance(star_chance(level) * ramp);
    let star_ok = match policy {
        SpawnPolicy::Timed => true,
        SpawnPolicy::MinGap => star_gap_open(items),
    };
    if star_roll && star_ok {
        out.push(SpawnOrder {
            kind: ItemKind::Star,
            lane: rng.lane(),
            ch: Some(rng.star_char(chars)),
            speed,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    fn star_at(y: f32) -> Item {
        Item {
            id: 1,
            kind: ItemKind::Star,
            lane: 0,
            ch: Some('A'),
            pos: Vec2::new(10.0, y),
            vel: Vec2::new(0.0, 100.0),
        }
    }

    #[test]
    fn test_tables_are_monotonic() {
        for pair in SpeedLevel::ALL.windows(2) {
            assert!(star_chance(pair[1]) > star_chance(pair[0]));
            assert!(obstacle_chance(pair[1]) > obstacle_chance(pair[0]));
            assert!(pair[1].multiplier() > pair[0].multiplier());
        }
    }

    #[test]
    fn test_speed_level_round_trip() {
        for level in SpeedLevel::ALL {
            assert_eq!(SpeedLevel::from_index(level.index()), Some(level));
        }
        assert_eq!(SpeedLevel::from_index(0), None);
        assert_eq!(SpeedLevel::from_index(6), None);
    }

    #[test]
    fn test_level_ramp() {
        assert_eq!(level_ramp(1), 1.0);
        assert_eq!(level_ramp(2), 1.3);
        assert!((level_ramp(4) - 1.9).abs() < 1e-6);
    }

    #[test]
    fn test_gap_policy_blocks_close_star() {
        let near = [star_at(ITEM_SPAWN_Y + 10.0)];
        let far = [star_at(ITEM_SPAWN_Y + MIN_STAR_GAP + 1.0)];
        assert!(!star_gap_open(&near));
        assert!(star_gap_open(&far));
        assert!(star_gap_open(&[]));
    }

    #[test]
    fn test_gap_ignores_obstacles() {
        let obstacle = Item {
            kind: ItemKind::Obstacle,
            ch: None,
            ..star_at(ITEM_SPAWN_Y + 5.0)
        };
        assert!(star_gap_open(&[obstacle]));
    }

    #[test]
    fn test_roll_spawns_eventually_produces_both() {
        let mut rng = crate::sim::GameRng::new(3);
        let mut orders = Vec::new();
        for _ in 0..20_000 {
            roll_spawns(
                &mut rng,
                SpawnPolicy::Timed,
                CharSet::LettersAndDigits,
                SpeedLevel::Medium,
                1,
                &[],
                &mut orders,
            );
        }
        assert!(orders.iter().any(|o| o.kind == ItemKind::Star));
        assert!(orders.iter().any(|o| o.kind == ItemKind::Obstacle));
        for order in &orders {
            assert!(order.lane < LANE_COUNT);
            match order.kind {
                ItemKind::Star => assert!(order.ch.is_some()),
                ItemKind::Obstacle => assert!(order.ch.is_none()),
            }
        }
    }

    #[test]
    fn test_min_gap_policy_suppresses_star_rolls() {
        let blocker = [star_at(ITEM_SPAWN_Y + 1.0)];
        let mut rng = crate::sim::GameRng::new(3);
        let mut orders = Vec::new();
        for _ in 0..20_000 {
            roll_spawns(
                &mut rng,
                SpawnPolicy::MinGap,
                CharSet::LettersAndDigits,
                SpeedLevel::Medium,
                1,
                &blocker,
                &mut orders,
            );
        }
        assert!(orders.iter().all(|o| o.kind == ItemKind::Obstacle));
    }
}
