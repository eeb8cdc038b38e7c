//! Type Rally - typing arcade games for the browser
//!
//! Two games share one deterministic core:
//! - Road: collect falling letter stars by typing them, dodge obstacles
//! - Castle: knock out lit windows by typing their letters before the clock runs out
//!
//! Core modules:
//! - `sim`: Deterministic simulation (state machines, spawning, collisions, scoring)
//! - `audio`: Synthesized sound effects and letter speech (wasm only)
//! - `settings`: Player options persisted to LocalStorage
//! - `progress`: Star bank and unlocked gear persisted across sessions

#[cfg(target_arch = "wasm32")]
pub mod audio;
pub mod progress;
pub mod settings;
pub mod sim;

pub use progress::Progress;
pub use settings::Settings;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 4;
    /// Ticks per wall-clock second at the fixed timestep
    pub const TICKS_PER_SECOND: u32 = 60;

    // === Road game ===

    /// Road dimensions in CSS pixels
    pub const ROAD_WIDTH: f32 = 300.0;
    pub const ROAD_HEIGHT: f32 = 500.0;
    pub const LANE_COUNT: u8 = 3;
    pub const LANE_WIDTH: f32 = ROAD_WIDTH / LANE_COUNT as f32;

    /// Falling item footprint (stars and obstacles share it)
    pub const ITEM_SIZE: f32 = 40.0;
    /// Items enter just above the visible road
    pub const ITEM_SPAWN_Y: f32 = -ITEM_SIZE;

    /// Car geometry, parked near the bottom edge
    pub const CAR_WIDTH: f32 = 60.0;
    pub const CAR_HEIGHT: f32 = 100.0;
    pub const CAR_TOP: f32 = ROAD_HEIGHT - CAR_HEIGHT - 20.0;
    /// Per-tick smoothing factor for the car chasing its lane center
    pub const CAR_SMOOTHING: f32 = 0.2;

    /// Collection window around the car in manual-lane mode
    pub const COLLECT_HALF_BAND: f32 = 50.0;
    /// Collection window as road-height fractions in autopilot mode
    pub const AUTO_BAND_TOP: f32 = ROAD_HEIGHT * 0.4;
    pub const AUTO_BAND_BOTTOM: f32 = ROAD_HEIGHT * 0.8;

    /// Minimum vertical clearance below the spawn point under the gap policy
    pub const MIN_STAR_GAP: f32 = 140.0;
    /// Fall speed at combined game speed 1.0 (pixels/second)
    pub const BASE_FALL_SPEED: f32 = 150.0;
    /// Extra speed and spawn rate per level beyond the first
    pub const LEVEL_RAMP_STEP: f32 = 0.3;
    /// Stars required for the first level-up
    pub const FIRST_LEVEL_THRESHOLD: u32 = 10;

    /// Road session length
    pub const SESSION_SECONDS: u32 = 120;
    /// Dodge duration after a lane key in autopilot mode
    pub const DODGE_TICKS: u32 = 30;
    /// Collision flash duration
    pub const FLASH_TICKS: u32 = 18;
    /// Level-up banner duration
    pub const LEVEL_UP_TICKS: u32 = 120;

    // === Castle game ===

    /// Scene dimensions in canvas pixels
    pub const SCENE_WIDTH: f32 = 800.0;
    pub const SCENE_HEIGHT: f32 = 600.0;
    /// Castle body
    pub const CASTLE_X: f32 = 420.0;
    pub const CASTLE_Y: f32 = 140.0;
    pub const CASTLE_W: f32 = 360.0;
    pub const CASTLE_H: f32 = 420.0;
    /// Window grid
    pub const WINDOW_WIDTH: f32 = 48.0;
    pub const WINDOW_HEIGHT: f32 = 64.0;
    pub const WINDOWS_PER_FLOOR: usize = 3;
    pub const WINDOW_FIRST_COL_X: f32 = 450.0;
    pub const WINDOW_COL_STEP: f32 = 110.0;
    pub const WINDOW_BASE_Y: f32 = 470.0;
    /// Cannon muzzle position
    pub const CANNON_X: f32 = 90.0;
    pub const CANNON_Y: f32 = 520.0;

    /// Per-target time limit
    pub const TARGET_SECONDS: u32 = 10;
    /// Bonus word time limit
    pub const BONUS_SECONDS: u32 = 30;
    pub const BONUS_POINTS: u32 = 100;
    /// Consecutive misses that end a run
    pub const MAX_MISSES: u32 = 3;

    /// Projectile progress per tick (a throw lands in just over half a second)
    pub const PROJECTILE_STEP: f32 = 0.03;
    /// Arc height as a fraction of horizontal throw distance
    pub const ARC_HEIGHT_FACTOR: f32 = 0.3;
    /// Castle collapse celebration length
    pub const CELEBRATION_TICKS: u32 = 240;

    /// Gravity applied to particles and debris (pixels/s^2)
    pub const PARTICLE_GRAVITY: f32 = 1500.0;
}

/// Linear interpolation between two values
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Whole seconds left on a tick countdown, rounded up for display
#[inline]
pub fn ticks_to_secs(ticks: u64) -> u32 {
    ticks.div_ceil(consts::TICKS_PER_SECOND as u64) as u32
}
