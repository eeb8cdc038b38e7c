//! Shared simulation records used by both games
//!
//! Plain data keyed by entity id. Render adapters keep their own
//! id-to-handle lookups; no platform handles live here.

use glam::Vec2;

use crate::consts::*;
use crate::lerp;

/// Top-level screen the session is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Title / mode select
    Menu,
    /// Active gameplay
    Playing,
    /// Between-levels screen (banner or shop)
    LevelUp,
    /// Run ended; only restart leaves this
    GameOver,
}

/// Axis-aligned box in screen coordinates, y growing downward
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Classic AABB overlap test (edge contact does not count)
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }
}

/// Falling entity kinds on the road
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Star,
    Obstacle,
}

/// A falling item locked to a lane
#[derive(Debug, Clone)]
pub struct Item {
    pub id: u32,
    pub kind: ItemKind,
    pub lane: u8,
    /// Target character; obstacles carry none
    pub ch: Option<char>,
    pub pos: Vec2,
    pub vel: Vec2,
}

impl Item {
    pub fn rect(&self) -> Rect {
        Rect::new(self.pos.x, self.pos.y, ITEM_SIZE, ITEM_SIZE)
    }

    pub fn center_y(&self) -> f32 {
        self.pos.y + ITEM_SIZE / 2.0
    }
}

/// Horizontal center of a lane
pub fn lane_center_x(lane: u8) -> f32 {
    (lane as f32 + 0.5) * LANE_WIDTH
}

/// A castle window target
#[derive(Debug, Clone)]
pub struct TargetWindow {
    pub rect: Rect,
    /// Assigned when the window lights up
    pub letter: char,
    pub lit: bool,
    /// Terminal: broken windows never change again
    pub broken: bool,
}

/// Trail length kept behind a projectile for rendering
pub const TRAIL_LENGTH: usize = 8;

/// Lobbed projectile parametrized by progress in [0, 1].
/// `window` and `weapon` are indices resolved by the castle game.
#[derive(Debug, Clone)]
pub struct Projectile {
    pub start: Vec2,
    pub target: Vec2,
    pub pos: Vec2,
    pub progress: f32,
    pub window: usize,
    pub weapon: usize,
    pub size: f32,
    /// Recent positions, newest first
    pub trail: Vec<Vec2>,
}

impl Projectile {
    pub fn new(start: Vec2, target: Vec2, window: usize, weapon: usize, size: f32) -> Self {
        Self {
            start,
            target,
            pos: start,
            progress: 0.0,
            window,
            weapon,
            size,
            trail: Vec::new(),
        }
    }

    /// Height of the sine arc for this throw
    pub fn arc_height(&self) -> f32 {
        (self.target.x - self.start.x).abs() * ARC_HEIGHT_FACTOR
    }

    /// Advance one tick along the arc; returns true on landing
    pub fn advance(&mut self) -> bool {
        self.progress = (self.progress + PROJECTILE_STEP).min(1.0);
        let x = lerp(self.start.x, self.target.x, self.progress);
        let y = lerp(self.start.y, self.target.y, self.progress)
            - (self.progress * std::f32::consts::PI).sin() * self.arc_height();
        self.pos = Vec2::new(x, y);
        self.trail.insert(0, self.pos);
        if self.trail.len() > TRAIL_LENGTH {
            self.trail.pop();
        }
        self.progress >= 1.0
    }
}

/// A burst particle for visual feedback
#[derive(Debug, Clone)]
pub struct Particle {
    pub id: u32,
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: f32,
    /// Palette index resolved by the renderer
    pub color: u32,
    pub life: f32,
    pub max_life: f32,
}

impl Particle {
    /// Ballistic step with gravity and lifetime decay
    pub fn step(&mut self, dt: f32) {
        self.vel.y += PARTICLE_GRAVITY * dt;
        self.pos += self.vel * dt;
        self.life -= dt;
    }

    /// Opacity follows remaining lifetime
    pub fn alpha(&self) -> f32 {
        (self.life / self.max_life).clamp(0.0, 1.0)
    }

    pub fn alive(&self) -> bool {
        self.life > 0.0
    }
}

/// A spinning castle fragment
#[derive(Debug, Clone)]
pub struct Debris {
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: f32,
    pub rotation: f32,
    pub rotation_vel: f32,
    pub life: f32,
    pub max_life: f32,
}

impl Debris {
    pub fn step(&mut self, dt: f32) {
        self.vel.y += PARTICLE_GRAVITY * dt;
        self.vel.x *= 0.99; // per-tick horizontal drag
        self.pos += self.vel * dt;
        self.rotation += self.rotation_vel * dt;
        self.life -= dt;
    }

    pub fn alpha(&self) -> f32 {
        (self.life / self.max_life).clamp(0.0, 1.0)
    }

    pub fn alive(&self) -> bool {
        self.life > 0.0
    }
}

/// Paint left on the castle wall by a juicy projectile
#[derive(Debug, Clone)]
pub struct Splatter {
    pub pos: Vec2,
    pub size: f32,
    /// Weapon palette index
    pub color: u32,
    pub life: f32,
    pub max_life: f32,
}

impl Splatter {
    pub fn step(&mut self, dt: f32) {
        self.life -= dt;
    }

    pub fn alpha(&self) -> f32 {
        (self.life / self.max_life).clamp(0.0, 1.0)
    }

    pub fn alive(&self) -> bool {
        self.life > 0.0
    }
}

/// Things the shell reacts to (sound, speech, HUD cues); drained every frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GameEvent {
    /// Road: a star was typed and collected
    StarCollected { ch: char },
    /// Road: the car clipped an obstacle
    ObstacleHit,
    /// Either game advanced a level
    LevelUp { level: u32 },
    /// Castle: lit window typed in time
    TargetHit { points: u32 },
    /// Castle: target clock ran out
    TargetMiss,
    /// Castle: projectile left the cannon
    Shot,
    /// Castle: projectile landed
    WindowBroken { weapon: usize },
    /// Castle: bonus word revealed
    BonusStarted,
    /// Castle: correct bonus letter typed
    BonusLetter { ch: char },
    /// Castle: bonus word finished
    BonusComplete,
    /// Castle: collapse rumble (staggered)
    CastleRumble,
    /// Run ended with this final score
    GameOver { score: u32 },
}
