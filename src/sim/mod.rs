//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod collide;
pub mod racer;
pub mod rng;
pub mod schedule;
pub mod score;
pub mod shooter;
pub mod spawn;
pub mod state;

pub use racer::{ControlMode, RacerConfig, RacerInput, RacerState, racer_tick};
pub use rng::GameRng;
pub use schedule::{TimerId, TimerQueue};
pub use shooter::{
    BonusRound, BreakSound, ShooterInput, ShooterState, SubMode, WEAPONS, Weapon, shooter_tick,
    weapon_index, window_count,
};
pub use spawn::{CharSet, SpawnOrder, SpawnPolicy, SpeedLevel};
pub use state::{
    Debris, GameEvent, Item, ItemKind, Particle, Phase, Projectile, Rect, Splatter, TargetWindow,
    lane_center_x,
};
