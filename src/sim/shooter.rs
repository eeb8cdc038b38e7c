//! Castle game: type the lit window's letter before its clock runs out.
//! Three consecutive misses end the run; clearing every window opens a
//! timed bonus word, then the shop.

use glam::Vec2;

use super::collide::char_matches;
use super::rng::GameRng;
use super::schedule::{TimerId, TimerQueue};
use super::score;
use super::state::{
    Debris, GameEvent, Particle, Phase, Projectile, Rect, Splatter, TargetWindow,
};
use crate::consts::*;

/// What Playing currently waits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubMode {
    /// "Level N" banner; Enter begins play
    LevelStart,
    /// A window is lit and its clock is running
    Normal,
    /// Hit or miss acknowledged with Enter before the next target
    WaitingForInput,
    /// Timed word challenge after the last target
    Bonus,
}

/// Impact sound flavor per weapon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakSound {
    Thud,
    Ping,
    Splash,
    Pop,
    Thwack,
    Zap,
    Sparkle,
    Boom,
}

/// Throwable gear sold in the between-level shop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weapon {
    /// Stable id used by the persisted unlock list
    pub id: &'static str,
    pub name: &'static str,
    pub cost: u32,
    /// Projectile radius
    pub size: f32,
    /// Leaves paint on the wall
    pub splats: bool,
    pub sound: BreakSound,
}

pub const WEAPONS: [Weapon; 8] = [
    Weapon { id: "brick", name: "Brick", cost: 0, size: 10.0, splats: false, sound: BreakSound::Thud },
    Weapon { id: "slingshot", name: "Slingshot", cost: 50, size: 7.0, splats: false, sound: BreakSound::Ping },
    Weapon { id: "tomato", name: "Tomato", cost: 100, size: 11.0, splats: true, sound: BreakSound::Splash },
    Weapon { id: "watermelon", name: "Watermelon", cost: 200, size: 16.0, splats: true, sound: BreakSound::Pop },
    Weapon { id: "cannonball", name: "Cannonball", cost: 350, size: 14.0, splats: false, sound: BreakSound::Thwack },
    Weapon { id: "fireball", name: "Fireball", cost: 500, size: 13.0, splats: false, sound: BreakSound::Zap },
    Weapon { id: "lightning", name: "Lightning Bolt", cost: 750, size: 12.0, splats: false, sound: BreakSound::Sparkle },
    Weapon { id: "catapult", name: "Catapult", cost: 1000, size: 20.0, splats: true, sound: BreakSound::Boom },
];

/// Look up a weapon index by its persisted id
pub fn weapon_index(id: &str) -> Option<usize> {
    WEAPONS.iter().position(|w| w.id == id)
}

/// Number of targets for a level
pub fn window_count(level: u32) -> usize {
    3 + level.saturating_sub(1) as usize * 2
}

const BONUS_WORDS: [&str; 10] = [
    "CAT", "DOG", "SUN", "HAT", "RUN", "BIG", "RED", "TOP", "FUN", "ZIP",
];

/// Bonus word challenge state
#[derive(Debug, Clone)]
pub struct BonusRound {
    pub word: &'static str,
    /// Correctly typed prefix length
    pub typed: usize,
    /// Word finished; collapse celebration running
    pub done: bool,
}

/// Input commands for a single tick (one-shots, cleared by the driver)
#[derive(Debug, Clone, Default)]
pub struct ShooterInput {
    pub key: Option<char>,
    /// Enter: start from the menu, begin a level, acknowledge a result,
    /// leave the shop
    pub advance: bool,
    /// Remove the last bonus letter
    pub backspace: bool,
    pub start: bool,
    pub pause: bool,
    pub restart: bool,
}

/// Delayed effects on the tick queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShooterTimer {
    TargetExpired,
    BonusExpired,
    Rumble,
    CelebrationDone,
}

/// Complete castle-game state
#[derive(Debug, Clone)]
pub struct ShooterState {
    pub seed: u64,
    pub phase: Phase,
    pub paused: bool,
    pub submode: SubMode,
    pub score: u32,
    pub level: u32,
    /// Consecutive misses; any hit resets it
    pub misses: u32,
    pub windows: Vec<TargetWindow>,
    /// Index of the current target while the level runs
    pub cursor: usize,
    /// Equipped weapon (index into WEAPONS)
    pub weapon: usize,
    pub projectiles: Vec<Projectile>,
    pub particles: Vec<Particle>,
    pub debris: Vec<Debris>,
    pub splatters: Vec<Splatter>,
    pub bonus: Option<BonusRound>,
    pub events: Vec<GameEvent>,
    /// Simulation tick counter; stops while paused
    pub time_ticks: u64,
    timers: TimerQueue<ShooterTimer>,
    target_timer: Option<TimerId>,
    bonus_timer: Option<TimerId>,
    rng: GameRng,
    settled: bool,
    next_id: u32,
}

impl ShooterState {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            phase: Phase::Menu,
            paused: false,
            submode: SubMode::LevelStart,
            score: 0,
            level: 1,
            misses: 0,
            windows: Vec::new(),
            cursor: 0,
            weapon: 0,
            projectiles: Vec::new(),
            particles: Vec::new(),
            debris: Vec::new(),
            splatters: Vec::new(),
            bonus: None,
            events: Vec::new(),
            time_ticks: 0,
            timers: TimerQueue::new(),
            target_timer: None,
            bonus_timer: None,
            rng: GameRng::new(seed),
            settled: false,
            next_id: 1,
        }
    }

    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// The lit window, while one is accepting input
    pub fn current_target(&self) -> Option<&TargetWindow> {
        self.windows.get(self.cursor).filter(|w| w.lit)
    }

    /// Seconds left on the current target's clock (HUD and points)
    pub fn target_seconds_left(&self) -> u32 {
        self.target_timer
            .and_then(|id| self.timers.remaining(id, self.time_ticks))
            .map(crate::ticks_to_secs)
            .unwrap_or(0)
    }

    /// Seconds left on the bonus word clock
    pub fn bonus_seconds_left(&self) -> u32 {
        self.bonus_timer
            .and_then(|id| self.timers.remaining(id, self.time_ticks))
            .map(crate::ticks_to_secs)
            .unwrap_or(0)
    }

    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Session score for the star bank, exactly once, after game over
    pub fn take_settlement(&mut self) -> Option<u32> {
        if self.phase == Phase::GameOver && !self.settled {
            self.settled = true;
            Some(self.score)
        } else {
            None
        }
    }

    fn start(&mut self) {
        self.phase = Phase::Playing;
        self.paused = false;
        self.score = 0;
        self.level = 1;
        self.settled = false;
        self.particles.clear();
        self.debris.clear();
        self.splatters.clear();
        self.begin_level();
        log::info!("Castle session started");
    }

    /// Build this level's window grid and show the banner
    fn begin_level(&mut self) {
        self.windows = build_windows(self.level);
        self.cursor = 0;
        self.misses = 0;
        self.submode = SubMode::LevelStart;
        self.projectiles.clear();
        self.bonus = None;
        self.timers.clear();
        self.target_timer = None;
        self.bonus_timer = None;
    }

    fn reset_to_menu(&mut self) {
        self.phase = Phase::Menu;
        self.paused = false;
        self.windows.clear();
        self.projectiles.clear();
        self.particles.clear();
        self.debris.clear();
        self.splatters.clear();
        self.bonus = None;
        self.timers.clear();
        self.target_timer = None;
        self.bonus_timer = None;
        self.events.clear();
    }

    /// Light the window at the cursor and start its clock
    fn light_target(&mut self) {
        let letter = self.rng.letter();
        if let Some(w) = self.windows.get_mut(self.cursor) {
            w.letter = letter;
            w.lit = true;
        }
        let due = self.time_ticks + (TARGET_SECONDS * TICKS_PER_SECOND) as u64;
        self.target_timer = Some(self.timers.schedule(due, ShooterTimer::TargetExpired));
        self.submode = SubMode::Normal;
    }

    fn try_hit(&mut self, pressed: char) {
        if !pressed.is_ascii_alphabetic() {
            return;
        }
        let seconds_left = self.target_seconds_left();
        let Some(w) = self.windows.get(self.cursor) else {
            return;
        };
        if !w.lit || !char_matches(w.letter, pressed) {
            return; // wrong key: silent no-op
        }
        let target_center = w.rect.center();
        let points = score::hit_points(seconds_left);
        self.score += points;
        self.misses = 0;
        if let Some(id) = self.target_timer.take() {
            self.timers.cancel(id);
        }
        if let Some(w) = self.windows.get_mut(self.cursor) {
            w.lit = false;
        }
        self.projectiles.push(Projectile::new(
            Vec2::new(CANNON_X, CANNON_Y),
            target_center,
            self.cursor,
            self.weapon,
            WEAPONS[self.weapon].size,
        ));
        self.submode = SubMode::WaitingForInput;
        self.events.push(GameEvent::Shot);
        self.events.push(GameEvent::TargetHit { points });
    }

    fn on_target_expired(&mut self) {
        self.target_timer = None;
        if let Some(w) = self.windows.get_mut(self.cursor) {
            w.lit = false;
        }
        self.misses += 1;
        self.events.push(GameEvent::TargetMiss);
        if self.misses >= MAX_MISSES {
            self.game_over();
        } else {
            self.submode = SubMode::WaitingForInput;
        }
    }

    /// Enter after a hit or miss: next target, or the bonus round once
    /// the level is exhausted
    fn advance_target(&mut self) {
        self.cursor += 1;
        if self.cursor < self.windows.len() {
            self.light_target();
        } else {
            self.start_bonus();
        }
    }

    fn start_bonus(&mut self) {
        let word = *self.rng.pick(&BONUS_WORDS);
        self.bonus = Some(BonusRound {
            word,
            typed: 0,
            done: false,
        });
        let due = self.time_ticks + (BONUS_SECONDS * TICKS_PER_SECOND) as u64;
        self.bonus_timer = Some(self.timers.schedule(due, ShooterTimer::BonusExpired));
        self.submode = SubMode::Bonus;
        self.events.push(GameEvent::BonusStarted);
        log::info!("Bonus word: {word}");
    }

    fn bonus_key(&mut self, pressed: char) {
        let Some(bonus) = self.bonus.as_mut() else {
            return;
        };
        if bonus.done {
            return;
        }
        let Some(want) = bonus.word.chars().nth(bonus.typed) else {
            return;
        };
        if !char_matches(want, pressed) {
            return;
        }
        bonus.typed += 1;
        let finished = bonus.typed == bonus.word.len();
        self.events.push(GameEvent::BonusLetter { ch: want });
        if finished {
            if let Some(b) = self.bonus.as_mut() {
                b.done = true;
            }
            self.score += BONUS_POINTS;
            if let Some(id) = self.bonus_timer.take() {
                self.timers.cancel(id);
            }
            self.events.push(GameEvent::BonusComplete);
            self.collapse_castle();
            self.timers.schedule(
                self.time_ticks + CELEBRATION_TICKS as u64,
                ShooterTimer::CelebrationDone,
            );
            for delay in [20u64, 50, 85] {
                self.timers
                    .schedule(self.time_ticks + delay, ShooterTimer::Rumble);
            }
        }
    }

    fn bonus_backspace(&mut self) {
        if let Some(bonus) = self.bonus.as_mut() {
            if !bonus.done && bonus.typed > 0 {
                bonus.typed -= 1;
            }
        }
    }

    /// Blow the castle apart: spinning fragments and a shower of sparks
    fn collapse_castle(&mut self) {
        for _ in 0..24 {
            let x = self.rng.range_f32(CASTLE_X, CASTLE_X + CASTLE_W);
            let y = self.rng.range_f32(CASTLE_Y, WINDOW_BASE_Y);
            let life = self.rng.range_f32(1.2, 2.2);
            self.debris.push(Debris {
                pos: Vec2::new(x, y),
                vel: Vec2::new(
                    self.rng.range_f32(-220.0, 220.0),
                    self.rng.range_f32(-500.0, -150.0),
                ),
                size: self.rng.range_f32(8.0, 26.0),
                rotation: self.rng.range_f32(0.0, std::f32::consts::TAU),
                rotation_vel: self.rng.range_f32(-6.0, 6.0),
                life,
                max_life: life,
            });
        }
        self.spark_burst(
            Vec2::new(CASTLE_X + CASTLE_W / 2.0, CASTLE_Y + CASTLE_H / 2.0),
            40,
            2,
        );
    }

    fn spark_burst(&mut self, origin: Vec2, count: u32, color: u32) {
        for _ in 0..count {
            let id = self.next_entity_id();
            let angle = self.rng.range_f32(0.0, std::f32::consts::TAU);
            let speed = self.rng.range_f32(80.0, 420.0);
            let life = self.rng.range_f32(0.4, 1.1);
            self.particles.push(Particle {
                id,
                pos: origin,
                vel: Vec2::new(angle.cos() * speed, angle.sin() * speed - 120.0),
                size: self.rng.range_f32(3.0, 8.0),
                color,
                life,
                max_life: life,
            });
        }
    }

    fn enter_shop(&mut self) {
        self.bonus = None;
        self.phase = Phase::LevelUp;
        self.events.push(GameEvent::LevelUp { level: self.level });
        log::info!("Level {} cleared, score {}", self.level, self.score);
    }

    /// Projectile landed: break the window it was thrown at
    fn impact(&mut self, p: &Projectile) {
        let weapon = &WEAPONS[p.weapon];
        if let Some(w) = self.windows.get_mut(p.window) {
            w.broken = true;
            let center = w.rect.center();
            if weapon.splats {
                self.splatters.push(Splatter {
                    pos: center,
                    size: weapon.size * 3.0,
                    color: p.weapon as u32,
                    life: 6.0,
                    max_life: 6.0,
                });
            }
            self.spark_burst(center, 14, 3);
            self.events.push(GameEvent::WindowBroken { weapon: p.weapon });
        }
    }

    fn game_over(&mut self) {
        self.phase = Phase::GameOver;
        self.timers.clear();
        self.target_timer = None;
        self.bonus_timer = None;
        self.events.push(GameEvent::GameOver { score: self.score });
        log::info!(
            "Castle session over: score {}, reached level {}",
            self.score,
            self.level
        );
    }
}

fn build_windows(level: u32) -> Vec<TargetWindow> {
    let count = window_count(level);
    let floors = count.div_ceil(WINDOWS_PER_FLOOR);
    // Squeeze floors together once the castle fills up
    let spacing = 90.0_f32.min(440.0 / floors as f32);
    (0..count)
        .map(|i| {
            let floor = (i / WINDOWS_PER_FLOOR) as f32;
            let col = (i % WINDOWS_PER_FLOOR) as f32;
            TargetWindow {
                rect: Rect::new(
                    WINDOW_FIRST_COL_X + col * WINDOW_COL_STEP,
                    WINDOW_BASE_Y - floor * spacing,
                    WINDOW_WIDTH,
                    WINDOW_HEIGHT,
                ),
                letter: 'A',
                lit: false,
                broken: false,
            }
        })
        .collect()
}

/// Advance the castle game by one fixed timestep
pub fn shooter_tick(state: &mut ShooterState, input: &ShooterInput, dt: f32) {
    if input.restart && state.phase == Phase::GameOver {
        state.reset_to_menu();
    }
    if state.phase == Phase::Menu && (input.start || input.advance) {
        state.start();
        return;
    }
    if state.phase == Phase::LevelUp && input.advance {
        state.level += 1;
        state.begin_level();
        state.phase = Phase::Playing;
        return;
    }

    if input.pause && state.phase == Phase::Playing {
        state.paused = !state.paused;
        if state.paused {
            return;
        }
    }

    match state.phase {
        Phase::Menu | Phase::GameOver | Phase::LevelUp => return,
        Phase::Playing => {}
    }
    if state.paused {
        return;
    }

    state.time_ticks += 1;

    let mut due = Vec::new();
    state.timers.drain_due(state.time_ticks, &mut due);
    for timer in due {
        match timer {
            ShooterTimer::TargetExpired => {
                if state.submode == SubMode::Normal {
                    state.on_target_expired();
                }
            }
            ShooterTimer::BonusExpired => {
                state.bonus_timer = None;
                let live = state.bonus.as_ref().is_some_and(|b| !b.done);
                if live && state.submode == SubMode::Bonus {
                    // Timeout just moves on; the bonus is never punitive
                    state.enter_shop();
                }
            }
            ShooterTimer::Rumble => state.events.push(GameEvent::CastleRumble),
            ShooterTimer::CelebrationDone => {
                if state.phase == Phase::Playing {
                    state.enter_shop();
                }
            }
        }
    }
    if state.phase != Phase::Playing {
        return; // a timer ended the run or opened the shop
    }

    match state.submode {
        SubMode::LevelStart => {
            if input.advance {
                state.light_target();
                log::info!("Level {} begun: {} targets", state.level, state.windows.len());
            }
        }
        SubMode::Normal => {
            if let Some(ch) = input.key {
                state.try_hit(ch);
            }
        }
        SubMode::WaitingForInput => {
            if input.advance {
                state.advance_target();
            }
        }
        SubMode::Bonus => {
            if input.backspace {
                state.bonus_backspace();
            } else if let Some(ch) = input.key {
                state.bonus_key(ch);
            }
        }
    }

    // Transient effects animate through every submode
    let mut landed: Vec<usize> = Vec::new();
    for (i, p) in state.projectiles.iter_mut().enumerate() {
        if p.advance() {
            landed.push(i);
        }
    }
    for i in landed.into_iter().rev() {
        let p = state.projectiles.remove(i);
        state.impact(&p);
    }

    for p in state.particles.iter_mut() {
        p.step(dt);
    }
    state.particles.retain(|p| p.alive());
    for d in state.debris.iter_mut() {
        d.step(dt);
    }
    state.debris.retain(|d| d.alive());
    for s in state.splatters.iter_mut() {
        s.step(dt);
    }
    state.splatters.retain(|s| s.alive());
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = SIM_DT;

    fn idle() -> ShooterInput {
        ShooterInput::default()
    }

    fn enter() -> ShooterInput {
        ShooterInput {
            advance: true,
            ..Default::default()
        }
    }

    fn key(ch: char) -> ShooterInput {
        ShooterInput {
            key: Some(ch),
            ..Default::default()
        }
    }

    /// Start a session and begin level play (first window lit)
    fn playing(seed: u64) -> ShooterState {
        let mut state = ShooterState::new(seed);
        shooter_tick(&mut state, &enter(), DT);
        assert_eq!(state.submode, SubMode::LevelStart);
        shooter_tick(&mut state, &enter(), DT);
        state
    }

    fn lit_letter(state: &ShooterState) -> char {
        state.current_target().expect("a window should be lit").letter
    }

    /// Run the target clock out (fires the miss)
    fn run_out_target(state: &mut ShooterState) {
        for _ in 0..(TARGET_SECONDS * TICKS_PER_SECOND) {
            shooter_tick(state, &idle(), DT);
            if state.submode != SubMode::Normal {
                return;
            }
        }
        panic!("target never expired");
    }

    #[test]
    fn test_start_builds_level_one() {
        let state = playing(1);
        assert_eq!(state.phase, Phase::Playing);
        assert_eq!(state.submode, SubMode::Normal);
        assert_eq!(state.windows.len(), 3);
        assert_eq!(state.windows.iter().filter(|w| w.lit).count(), 1);
        assert_eq!(state.target_seconds_left(), TARGET_SECONDS);
    }

    #[test]
    fn test_window_count_grows_by_two() {
        assert_eq!(window_count(1), 3);
        assert_eq!(window_count(2), 5);
        assert_eq!(window_count(5), 11);
    }

    #[test]
    fn test_windows_stay_on_screen() {
        for level in 1..=12 {
            for w in build_windows(level) {
                assert!(w.rect.y > 0.0, "level {level} window above the scene");
                assert!(w.rect.bottom() <= CASTLE_Y + CASTLE_H);
                assert!(w.rect.x >= CASTLE_X);
                assert!(w.rect.right() <= CASTLE_X + CASTLE_W);
            }
        }
    }

    #[test]
    fn test_fast_hit_scores_full_points() {
        let mut state = playing(1);
        let target = lit_letter(&state).to_ascii_lowercase();
        shooter_tick(&mut state, &key(target), DT);
        assert_eq!(state.score, 10);
        assert_eq!(state.submode, SubMode::WaitingForInput);
        assert_eq!(state.projectiles.len(), 1);
        assert_eq!(state.misses, 0);
        assert!(state.events.iter().any(|e| *e == GameEvent::TargetHit { points: 10 }));
    }

    #[test]
    fn test_slow_hit_scores_less() {
        let mut state = playing(1);
        let target = lit_letter(&state);
        for _ in 0..300 {
            shooter_tick(&mut state, &idle(), DT);
        }
        shooter_tick(&mut state, &key(target), DT);
        // Five whole seconds left on the clock
        assert_eq!(state.score, 8);
    }

    #[test]
    fn test_wrong_key_is_noop() {
        let mut state = playing(1);
        let target = lit_letter(&state);
        let wrong = if target == 'Z' { 'a' } else { 'z' };
        shooter_tick(&mut state, &key(wrong), DT);
        assert_eq!(state.score, 0);
        assert_eq!(state.submode, SubMode::Normal);
        assert!(state.current_target().is_some());
    }

    #[test]
    fn test_projectile_breaks_window() {
        let mut state = playing(1);
        let target = lit_letter(&state);
        shooter_tick(&mut state, &key(target), DT);
        for _ in 0..40 {
            shooter_tick(&mut state, &idle(), DT);
        }
        assert!(state.projectiles.is_empty());
        assert!(state.windows[0].broken);
        assert!(
            state
                .events
                .iter()
                .any(|e| matches!(e, GameEvent::WindowBroken { .. }))
        );
    }

    #[test]
    fn test_timeout_is_a_miss() {
        let mut state = playing(1);
        run_out_target(&mut state);
        assert_eq!(state.misses, 1);
        assert_eq!(state.submode, SubMode::WaitingForInput);
        assert!(state.events.contains(&GameEvent::TargetMiss));
        assert!(!state.windows[0].broken);
    }

    #[test]
    fn test_third_consecutive_miss_ends_run() {
        let mut state = playing(1);
        run_out_target(&mut state);
        assert_eq!(state.phase, Phase::Playing);
        shooter_tick(&mut state, &enter(), DT);
        run_out_target(&mut state);
        assert_eq!(state.misses, 2);
        assert_eq!(state.phase, Phase::Playing);
        shooter_tick(&mut state, &enter(), DT);
        run_out_target(&mut state);
        assert_eq!(state.misses, 3);
        assert_eq!(state.phase, Phase::GameOver);
    }

    #[test]
    fn test_hit_resets_consecutive_misses() {
        let mut state = playing(1);
        run_out_target(&mut state);
        shooter_tick(&mut state, &enter(), DT);
        let target = lit_letter(&state);
        shooter_tick(&mut state, &key(target), DT);
        assert_eq!(state.misses, 0);
    }

    #[test]
    fn test_pause_freezes_target_clock() {
        let mut state = playing(1);
        for _ in 0..TICKS_PER_SECOND {
            shooter_tick(&mut state, &idle(), DT);
        }
        let frozen = state.target_seconds_left();
        let pause = ShooterInput {
            pause: true,
            ..Default::default()
        };
        shooter_tick(&mut state, &pause, DT);
        assert!(state.paused);
        for _ in 0..500 {
            shooter_tick(&mut state, &idle(), DT);
        }
        assert_eq!(state.target_seconds_left(), frozen);
        shooter_tick(&mut state, &pause, DT);
        assert!(!state.paused);
    }

    /// Clear every window on the current level by typing each lit letter
    fn clear_level(state: &mut ShooterState) {
        while state.submode == SubMode::Normal || state.submode == SubMode::WaitingForInput {
            match state.submode {
                SubMode::Normal => {
                    let target = lit_letter(state);
                    shooter_tick(state, &key(target), DT);
                }
                SubMode::WaitingForInput => {
                    shooter_tick(state, &enter(), DT);
                }
                _ => unreachable!(),
            }
        }
    }

    #[test]
    fn test_level_exhaustion_opens_bonus() {
        let mut state = playing(2);
        clear_level(&mut state);
        assert_eq!(state.submode, SubMode::Bonus);
        let bonus = state.bonus.as_ref().expect("bonus round");
        assert!(BONUS_WORDS.contains(&bonus.word));
        assert_eq!(state.bonus_seconds_left(), BONUS_SECONDS);
        assert!(state.events.contains(&GameEvent::BonusStarted));
    }

    #[test]
    fn test_bonus_word_completion_awards_and_celebrates() {
        let mut state = playing(2);
        clear_level(&mut state);
        let before = state.score;
        let word = state.bonus.as_ref().unwrap().word;
        for ch in word.chars() {
            shooter_tick(&mut state, &key(ch.to_ascii_lowercase()), DT);
        }
        assert_eq!(state.score, before + BONUS_POINTS);
        assert!(state.bonus.as_ref().unwrap().done);
        assert!(state.events.contains(&GameEvent::BonusComplete));
        assert!(!state.debris.is_empty());

        // Celebration rumbles, then the shop opens
        for _ in 0..=CELEBRATION_TICKS {
            shooter_tick(&mut state, &idle(), DT);
        }
        assert_eq!(state.phase, Phase::LevelUp);
        let rumbles = state
            .events
            .iter()
            .filter(|e| **e == GameEvent::CastleRumble)
            .count();
        assert_eq!(rumbles, 3);
    }

    #[test]
    fn test_bonus_timeout_opens_shop_without_penalty() {
        let mut state = playing(2);
        clear_level(&mut state);
        let score = state.score;
        for _ in 0..=(BONUS_SECONDS * TICKS_PER_SECOND) {
            shooter_tick(&mut state, &idle(), DT);
        }
        assert_eq!(state.phase, Phase::LevelUp);
        assert_eq!(state.score, score);
    }

    #[test]
    fn test_bonus_backspace_steps_back() {
        let mut state = playing(2);
        clear_level(&mut state);
        let word = state.bonus.as_ref().unwrap().word;
        let first: Vec<char> = word.chars().collect();
        shooter_tick(&mut state, &key(first[0]), DT);
        shooter_tick(&mut state, &key(first[1]), DT);
        assert_eq!(state.bonus.as_ref().unwrap().typed, 2);
        let bs = ShooterInput {
            backspace: true,
            ..Default::default()
        };
        shooter_tick(&mut state, &bs, DT);
        assert_eq!(state.bonus.as_ref().unwrap().typed, 1);
    }

    #[test]
    fn test_shop_exit_starts_next_level() {
        let mut state = playing(2);
        clear_level(&mut state);
        let word = state.bonus.as_ref().unwrap().word;
        for ch in word.chars() {
            shooter_tick(&mut state, &key(ch), DT);
        }
        for _ in 0..=CELEBRATION_TICKS {
            shooter_tick(&mut state, &idle(), DT);
        }
        assert_eq!(state.phase, Phase::LevelUp);
        shooter_tick(&mut state, &enter(), DT);
        assert_eq!(state.phase, Phase::Playing);
        assert_eq!(state.level, 2);
        assert_eq!(state.windows.len(), 5);
        assert_eq!(state.submode, SubMode::LevelStart);
        assert_eq!(state.misses, 0);
    }

    #[test]
    fn test_at_most_one_window_lit() {
        let mut state = playing(3);
        for i in 0..2000u32 {
            let input = match state.submode {
                SubMode::Normal if i % 7 == 0 => key(lit_letter(&state)),
                SubMode::WaitingForInput => enter(),
                _ => idle(),
            };
            shooter_tick(&mut state, &input, DT);
            let lit = state.windows.iter().filter(|w| w.lit).count();
            assert!(lit <= 1);
            if state.phase == Phase::Playing && state.submode == SubMode::Normal {
                assert_eq!(lit, 1);
            }
            if state.phase != Phase::Playing {
                break;
            }
        }
    }

    #[test]
    fn test_settlement_once_after_game_over() {
        let mut state = playing(2);
        clear_level(&mut state);
        let word = state.bonus.as_ref().unwrap().word;
        for ch in word.chars() {
            shooter_tick(&mut state, &key(ch), DT);
        }
        for _ in 0..=CELEBRATION_TICKS {
            shooter_tick(&mut state, &idle(), DT);
        }
        shooter_tick(&mut state, &enter(), DT); // leave the shop
        shooter_tick(&mut state, &enter(), DT); // begin level 2
        let banked = state.score;
        assert!(banked > 0);
        assert_eq!(state.take_settlement(), None);

        // Three straight misses with windows still left
        run_out_target(&mut state);
        shooter_tick(&mut state, &enter(), DT);
        run_out_target(&mut state);
        shooter_tick(&mut state, &enter(), DT);
        run_out_target(&mut state);
        assert_eq!(state.phase, Phase::GameOver);
        assert_eq!(state.take_settlement(), Some(banked));
        assert_eq!(state.take_settlement(), None);
    }

    #[test]
    fn test_restart_returns_to_menu() {
        let mut state = playing(1);
        run_out_target(&mut state);
        shooter_tick(&mut state, &enter(), DT);
        run_out_target(&mut state);
        shooter_tick(&mut state, &enter(), DT);
        run_out_target(&mut state);
        assert_eq!(state.phase, Phase::GameOver);
        let restart = ShooterInput {
            restart: true,
            ..Default::default()
        };
        shooter_tick(&mut state, &restart, DT);
        assert_eq!(state.phase, Phase::Menu);
        assert!(state.windows.is_empty());
    }

    #[test]
    fn test_determinism_same_seed_same_letters() {
        let mut a = playing(7);
        let mut b = playing(7);
        for _ in 0..3 {
            assert_eq!(lit_letter(&a), lit_letter(&b));
            let hit_a = key(lit_letter(&a));
            let hit_b = key(lit_letter(&b));
            shooter_tick(&mut a, &hit_a, DT);
            shooter_tick(&mut b, &hit_b, DT);
            shooter_tick(&mut a, &enter(), DT);
            shooter_tick(&mut b, &enter(), DT);
        }
        assert_eq!(a.score, b.score);
        assert_eq!(a.submode, b.submode);
        assert_eq!(
            a.bonus.as_ref().map(|x| x.word),
            b.bonus.as_ref().map(|x| x.word)
        );
    }
}
