//! Road game: type falling stars to collect them, dodge the obstacles,
//! beat the two-minute clock.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collide::{self, CollectBand};
use super::rng::GameRng;
use super::schedule::{TimerId, TimerQueue};
use super::score;
use super::spawn::{self, CharSet, SpawnPolicy, SpeedLevel};
use super::state::{GameEvent, Item, Particle, Phase, lane_center_x};
use crate::consts::*;
use crate::lerp;

/// How the player steers and collects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ControlMode {
    /// Lane keys steer the car; a star must share its lane to collect
    #[default]
    ManualLanes,
    /// Typing collects from any lane and the car chases the star;
    /// lane keys become a short dodge with obstacle immunity
    Autopilot,
}

/// Session options captured when a run starts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct RacerConfig {
    pub control: ControlMode,
    pub chars: CharSet,
    pub policy: SpawnPolicy,
    pub speed: SpeedLevel,
}

/// Input commands for a single tick (one-shots, cleared by the driver)
#[derive(Debug, Clone, Default)]
pub struct RacerInput {
    /// Typed character (collection attempt)
    pub key: Option<char>,
    /// Lane key
    pub lane: Option<u8>,
    /// Begin a session from the menu
    pub start: bool,
    /// Toggle pause during play
    pub pause: bool,
    /// Leave the game-over screen for the menu
    pub restart: bool,
}

/// Delayed effects on the tick queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RacerTimer {
    LevelBannerDone,
    FlashEnd,
    DodgeEnd,
}

/// Complete road-game state
#[derive(Debug, Clone)]
pub struct RacerState {
    pub seed: u64,
    pub config: RacerConfig,
    pub phase: Phase,
    pub paused: bool,
    pub score: u32,
    pub level: u32,
    /// Stars collected toward the next level
    pub level_progress: u32,
    pub stars_to_next_level: u32,
    /// Session countdown in ticks; display rounds up to whole seconds
    pub time_left_ticks: u32,
    /// Simulation tick counter; stops while paused
    pub time_ticks: u64,
    pub car_lane: u8,
    /// Smoothed car center x the renderer draws
    pub car_x: f32,
    pub dodging: bool,
    pub collision_flash: bool,
    pub items: Vec<Item>,
    pub particles: Vec<Particle>,
    pub events: Vec<GameEvent>,
    timers: TimerQueue<RacerTimer>,
    flash_timer: Option<TimerId>,
    rng: GameRng,
    settled: bool,
    next_id: u32,
}

impl RacerState {
    pub fn new(seed: u64, config: RacerConfig) -> Self {
        Self {
            seed,
            config,
            phase: Phase::Menu,
            paused: false,
            score: 0,
            level: 1,
            level_progress: 0,
            stars_to_next_level: FIRST_LEVEL_THRESHOLD,
            time_left_ticks: SESSION_SECONDS * TICKS_PER_SECOND,
            time_ticks: 0,
            car_lane: 1,
            car_x: lane_center_x(1),
            dodging: false,
            collision_flash: false,
            items: Vec::new(),
            particles: Vec::new(),
            events: Vec::new(),
            timers: TimerQueue::new(),
            flash_timer: None,
            rng: GameRng::new(seed),
            settled: false,
            next_id: 1,
        }
    }

    /// Allocate a unique entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Whole seconds left for the HUD
    pub fn time_left_secs(&self) -> u32 {
        crate::ticks_to_secs(self.time_left_ticks as u64)
    }

    /// Events since the last drain; the shell feeds sound and DOM cues
    /// from these
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
        self.level_progress = 0;
        self.stars_to_next_level = FIRST_LEVEL_THRESHOLD;
        self.time_left_ticks = SESSION_SECONDS * TICKS_PER_SECOND;
        self.car_lane = 1;
        self.car_x = lane_center_x(1);
        self.dodging = false;
        self.collision_flash = false;
        self.items.clear();
        self.particles.clear();
        self.timers.clear();
        self.flash_timer = None;
        self.settled = false;
        log::info!(
            "Road session started ({:?}, {:?}, {:?})",
            self.config.speed,
            self.config.control,
            self.config.policy
        );
    }

    fn reset_to_menu(&mut self) {
        self.phase = Phase::Menu;
        self.paused = false;
        self.items.clear();
        self.particles.clear();
        self.timers.clear();
        self.flash_timer = None;
        self.events.clear();
    }

    fn collect_band(&self) -> CollectBand {
        match self.config.control {
            ControlMode::ManualLanes => CollectBand {
                top: CAR_TOP - COLLECT_HALF_BAND,
                bottom: CAR_TOP + CAR_HEIGHT + COLLECT_HALF_BAND,
            },
            ControlMode::Autopilot => CollectBand {
                top: AUTO_BAND_TOP,
                bottom: AUTO_BAND_BOTTOM,
            },
        }
    }

    fn try_collect(&mut self, pressed: char) {
        if !pressed.is_ascii_alphanumeric() {
            return;
        }
        let lane_filter = match self.config.control {
            ControlMode::ManualLanes => Some(self.car_lane),
            ControlMode::Autopilot => None,
        };
        let band = self.collect_band();
        let car_center_y = CAR_TOP + CAR_HEIGHT / 2.0;
        let Some(idx) = collide::best_star(&self.items, pressed, lane_filter, band, car_center_y)
        else {
            return; // nothing eligible: keypress is a no-op
        };
        let star = self.items.remove(idx);
        if self.config.control == ControlMode::Autopilot {
            // The car chases whatever it just collected
            self.car_lane = star.lane;
        }
        self.score += 1;
        self.level_progress += 1;
        if let Some(ch) = star.ch {
            self.events.push(GameEvent::StarCollected { ch });
        }
        self.burst(star.rect().center(), 10, 0);
        if self.level_progress >= self.stars_to_next_level {
            self.level_up();
        }
    }

    fn level_up(&mut self) {
        self.level += 1;
        self.level_progress = 0;
        self.stars_to_next_level = score::next_threshold(self.stars_to_next_level);
        self.phase = Phase::LevelUp;
        self.timers.schedule(
            self.time_ticks + LEVEL_UP_TICKS as u64,
            RacerTimer::LevelBannerDone,
        );
        self.events.push(GameEvent::LevelUp { level: self.level });
        self.burst(Vec2::new(ROAD_WIDTH / 2.0, ROAD_HEIGHT / 2.0), 24, 1);
        log::info!(
            "Level {} reached, next at {} stars",
            self.level,
            self.stars_to_next_level
        );
    }

    /// Timed swerve with obstacle immunity (autopilot mode)
    fn dodge(&mut self, lane: u8) {
        if self.dodging {
            return;
        }
        self.car_lane = lane;
        self.dodging = true;
        self.timers
            .schedule(self.time_ticks + DODGE_TICKS as u64, RacerTimer::DodgeEnd);
    }

    fn hit_obstacle(&mut self, idx: usize) {
        self.items.remove(idx);
        self.score = score::apply_penalty(self.score);
        self.collision_flash = true;
        if let Some(id) = self.flash_timer.take() {
            self.timers.cancel(id);
        }
        self.flash_timer = Some(
            self.timers
                .schedule(self.time_ticks + FLASH_TICKS as u64, RacerTimer::FlashEnd),
        );
        self.events.push(GameEvent::ObstacleHit);
    }

    /// Scatter feedback particles from a point
    fn burst(&mut self, origin: Vec2, count: u32, color: u32) {
        for _ in 0..count {
            let id = self.next_entity_id();
            let angle = self.rng.range_f32(0.0, std::f32::consts::TAU);
            let speed = self.rng.range_f32(60.0, 260.0);
            let life = self.rng.range_f32(0.4, 0.9);
            self.particles.push(Particle {
                id,
                pos: origin,
                vel: Vec2::new(angle.cos() * speed, angle.sin() * speed - 80.0),
                size: self.rng.range_f32(3.0, 7.0),
                color,
                life,
                max_life: life,
            });
        }
    }

    fn game_over(&mut self) {
        self.phase = Phase::GameOver;
        self.timers.clear();
        self.flash_timer = None;
        self.collision_flash = false;
        self.dodging = false;
        self.events.push(GameEvent::GameOver { score: self.score });
        log::info!(
            "Road session over: score {}, reached level {}",
            self.score,
            self.level
        );
    }
}

/// Advance the road game by one fixed timestep
pub fn racer_tick(state: &mut RacerState, input: &RacerInput, dt: f32) {
    if input.restart && state.phase == Phase::GameOver {
        state.reset_to_menu();
    }
    if input.start && state.phase == Phase::Menu {
        state.start();
    }

    // Pause only means something during play
    if input.pause && state.phase == Phase::Playing {
        state.paused = !state.paused;
        if state.paused {
            return;
        }
    }

    match state.phase {
        Phase::Menu | Phase::GameOver => return,
        Phase::Playing | Phase::LevelUp => {}
    }
    if state.paused {
        return;
    }

    state.time_ticks += 1;

    // Delayed effects come off the queue before anything moves
    let mut due = Vec::new();
    state.timers.drain_due(state.time_ticks, &mut due);
    for timer in due {
        match timer {
            RacerTimer::LevelBannerDone => {
                if state.phase == Phase::LevelUp {
                    state.phase = Phase::Playing;
                }
            }
            RacerTimer::FlashEnd => {
                state.collision_flash = false;
                state.flash_timer = None;
            }
            RacerTimer::DodgeEnd => state.dodging = false,
        }
    }

    if state.phase == Phase::LevelUp {
        // Celebration particles keep falling behind the banner
        for p in state.particles.iter_mut() {
            p.step(dt);
        }
        state.particles.retain(|p| p.alive());
        return;
    }

    // The level banner holds the session clock; only live play drains it
    state.time_left_ticks = state.time_left_ticks.saturating_sub(1);
    if state.time_left_ticks == 0 {
        state.game_over();
        return;
    }

    // Spawn, then move, then resolve - the same order every tick
    let mut orders = Vec::new();
    spawn::roll_spawns(
        &mut state.rng,
        state.config.policy,
        state.config.chars,
        state.config.speed,
        state.level,
        &state.items,
        &mut orders,
    );
    for order in orders {
        let id = state.next_entity_id();
        state.items.push(Item {
            id,
            kind: order.kind,
            lane: order.lane,
            ch: order.ch,
            pos: Vec2::new(
                lane_center_x(order.lane) - ITEM_SIZE / 2.0,
                ITEM_SPAWN_Y,
            ),
            vel: Vec2::new(0.0, order.speed),
        });
    }

    for item in state.items.iter_mut() {
        item.pos += item.vel * dt;
    }
    // Items that roll off the bottom just disappear
    state.items.retain(|i| i.pos.y < ROAD_HEIGHT);

    for p in state.particles.iter_mut() {
        p.step(dt);
    }
    state.particles.retain(|p| p.alive());

    // Steering
    if let Some(lane) = input.lane {
        if lane < LANE_COUNT {
            match state.config.control {
                ControlMode::ManualLanes => state.car_lane = lane,
                ControlMode::Autopilot => state.dodge(lane),
            }
        }
    }
    state.car_x = lerp(state.car_x, lane_center_x(state.car_lane), CAR_SMOOTHING);

    // Collection
    if let Some(pressed) = input.key {
        state.try_collect(pressed);
    }

    // Obstacles pass through harmlessly while dodging
    if !state.dodging {
        if let Some(idx) = collide::obstacle_hit(&state.items, state.car_lane, state.car_x) {
            state.hit_obstacle(idx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::ItemKind;

    const DT: f32 = SIM_DT;

    fn started(seed: u64, config: RacerConfig) -> RacerState {
        let mut state = RacerState::new(seed, config);
        let input = RacerInput {
            start: true,
            ..Default::default()
        };
        racer_tick(&mut state, &input, DT);
        state
    }

    fn push_star(state: &mut RacerState, lane: u8, ch: char, y: f32) -> u32 {
        let id = state.next_entity_id();
        state.items.push(Item {
            id,
            kind: ItemKind::Star,
            lane,
            ch: Some(ch),
            pos: Vec2::new(lane_center_x(lane) - ITEM_SIZE / 2.0, y),
            vel: Vec2::new(0.0, 0.0),
        });
        id
    }

    fn push_obstacle(state: &mut RacerState, lane: u8, y: f32) -> u32 {
        let id = state.next_entity_id();
        state.items.push(Item {
            id,
            kind: ItemKind::Obstacle,
            lane,
            ch: None,
            pos: Vec2::new(lane_center_x(lane) - ITEM_SIZE / 2.0, y),
            vel: Vec2::new(0.0, 0.0),
        });
        id
    }

    fn key(ch: char) -> RacerInput {
        RacerInput {
            key: Some(ch),
            ..Default::default()
        }
    }

    #[test]
    fn test_start_from_menu() {
        let state = started(1, RacerConfig::default());
        assert_eq!(state.phase, Phase::Playing);
        assert_eq!(state.score, 0);
        assert_eq!(state.level, 1);
        assert_eq!(state.stars_to_next_level, FIRST_LEVEL_THRESHOLD);
        assert_eq!(state.time_left_secs(), SESSION_SECONDS);
    }

    #[test]
    fn test_collect_star_in_lane() {
        let mut state = started(1, RacerConfig::default());
        let id = push_star(&mut state, 1, 'C', CAR_TOP);
        racer_tick(&mut state, &key('c'), DT);
        assert_eq!(state.score, 1);
        assert_eq!(state.level_progress, 1);
        assert!(state.items.iter().all(|i| i.id != id));
        assert!(
            state
                .events
                .iter()
                .any(|e| *e == GameEvent::StarCollected { ch: 'C' })
        );
    }

    #[test]
    fn test_wrong_lane_star_not_collected() {
        let mut state = started(1, RacerConfig::default());
        let id = push_star(&mut state, 0, 'C', CAR_TOP);
        racer_tick(&mut state, &key('c'), DT);
        assert_eq!(state.score, 0);
        assert!(state.items.iter().any(|i| i.id == id));
    }

    #[test]
    fn test_star_outside_band_not_collected() {
        let mut state = started(1, RacerConfig::default());
        push_star(&mut state, 1, 'C', 10.0);
        racer_tick(&mut state, &key('c'), DT);
        assert_eq!(state.score, 0);
    }

    #[test]
    fn test_unmatched_key_is_noop() {
        let mut state = started(1, RacerConfig::default());
        let id = push_star(&mut state, 1, 'C', CAR_TOP);
        racer_tick(&mut state, &key('x'), DT);
        assert_eq!(state.score, 0);
        assert!(state.items.iter().any(|i| i.id == id));
        assert_eq!(state.phase, Phase::Playing);
    }

    #[test]
    fn test_autopilot_collects_any_lane_and_snaps() {
        let config = RacerConfig {
            control: ControlMode::Autopilot,
            ..Default::default()
        };
        let mut state = started(1, config);
        assert_eq!(state.car_lane, 1);
        push_star(&mut state, 0, 'K', (AUTO_BAND_TOP + AUTO_BAND_BOTTOM) / 2.0);
        racer_tick(&mut state, &key('k'), DT);
        assert_eq!(state.score, 1);
        assert_eq!(state.car_lane, 0);
    }

    #[test]
    fn test_lane_keys_steer_in_manual_mode() {
        let mut state = started(1, RacerConfig::default());
        let input = RacerInput {
            lane: Some(2),
            ..Default::default()
        };
        racer_tick(&mut state, &input, DT);
        assert_eq!(state.car_lane, 2);
        assert!(!state.dodging);
    }

    #[test]
    fn test_obstacle_costs_one_point_floored_at_zero() {
        let mut state = started(1, RacerConfig::default());
        push_obstacle(&mut state, 1, CAR_TOP + 10.0);
        racer_tick(&mut state, &RacerInput::default(), DT);
        // Already at zero: no underflow
        assert_eq!(state.score, 0);
        assert!(state.collision_flash);
        assert!(state.events.contains(&GameEvent::ObstacleHit));

        state.score = 2;
        push_obstacle(&mut state, 1, CAR_TOP + 10.0);
        racer_tick(&mut state, &RacerInput::default(), DT);
        assert_eq!(state.score, 1);
    }

    #[test]
    fn test_collision_flash_expires() {
        let mut state = started(1, RacerConfig::default());
        push_obstacle(&mut state, 1, CAR_TOP + 10.0);
        racer_tick(&mut state, &RacerInput::default(), DT);
        assert!(state.collision_flash);
        for _ in 0..=FLASH_TICKS {
            racer_tick(&mut state, &RacerInput::default(), DT);
        }
        assert!(!state.collision_flash);
    }

    #[test]
    fn test_dodge_grants_obstacle_immunity() {
        let config = RacerConfig {
            control: ControlMode::Autopilot,
            ..Default::default()
        };
        let mut state = started(1, config);
        let dodge = RacerInput {
            lane: Some(1),
            ..Default::default()
        };
        racer_tick(&mut state, &dodge, DT);
        assert!(state.dodging);

        push_obstacle(&mut state, 1, CAR_TOP + 10.0);
        racer_tick(&mut state, &RacerInput::default(), DT);
        assert!(state.events.iter().all(|e| *e != GameEvent::ObstacleHit));

        // Immunity runs out after the dodge window
        for _ in 0..=DODGE_TICKS {
            racer_tick(&mut state, &RacerInput::default(), DT);
        }
        assert!(!state.dodging);
        assert!(state.events.contains(&GameEvent::ObstacleHit));
    }

    #[test]
    fn test_level_up_at_threshold() {
        let mut state = started(1, RacerConfig::default());
        for _ in 0..FIRST_LEVEL_THRESHOLD {
            push_star(&mut state, 1, 'B', CAR_TOP);
            racer_tick(&mut state, &key('b'), DT);
        }
        assert_eq!(state.level, 2);
        assert_eq!(state.level_progress, 0);
        assert_eq!(state.stars_to_next_level, 12);
        assert_eq!(state.phase, Phase::LevelUp);
        assert!(state.events.contains(&GameEvent::LevelUp { level: 2 }));
    }

    #[test]
    fn test_level_banner_returns_to_play() {
        let mut state = started(1, RacerConfig::default());
        for _ in 0..FIRST_LEVEL_THRESHOLD {
            push_star(&mut state, 1, 'B', CAR_TOP);
            racer_tick(&mut state, &key('b'), DT);
        }
        assert_eq!(state.phase, Phase::LevelUp);
        for _ in 0..=LEVEL_UP_TICKS {
            racer_tick(&mut state, &RacerInput::default(), DT);
        }
        assert_eq!(state.phase, Phase::Playing);
    }

    #[test]
    fn test_no_spawns_during_level_banner() {
        let mut state = started(1, RacerConfig::default());
        for _ in 0..FIRST_LEVEL_THRESHOLD {
            push_star(&mut state, 1, 'B', CAR_TOP);
            racer_tick(&mut state, &key('b'), DT);
        }
        assert_eq!(state.phase, Phase::LevelUp);
        state.items.clear();
        for _ in 0..(LEVEL_UP_TICKS / 2) {
            racer_tick(&mut state, &RacerInput::default(), DT);
        }
        assert!(state.items.is_empty());
    }

    #[test]
    fn test_level_banner_holds_session_clock() {
        let mut state = started(1, RacerConfig::default());
        for _ in 0..FIRST_LEVEL_THRESHOLD {
            push_star(&mut state, 1, 'B', CAR_TOP);
            racer_tick(&mut state, &key('b'), DT);
        }
        assert_eq!(state.phase, Phase::LevelUp);
        let held = state.time_left_ticks;
        for _ in 0..(LEVEL_UP_TICKS - 1) {
            racer_tick(&mut state, &RacerInput::default(), DT);
        }
        assert_eq!(state.phase, Phase::LevelUp);
        assert_eq!(state.time_left_ticks, held);

        // The tick that drops the banner is live play again
        racer_tick(&mut state, &RacerInput::default(), DT);
        assert_eq!(state.phase, Phase::Playing);
        assert_eq!(state.time_left_ticks, held - 1);
    }

    #[test]
    fn test_pause_freezes_session_clock() {
        let mut state = started(1, RacerConfig::default());
        for _ in 0..5 {
            racer_tick(&mut state, &RacerInput::default(), DT);
        }
        let frozen = state.time_left_ticks;
        let pause = RacerInput {
            pause: true,
            ..Default::default()
        };
        racer_tick(&mut state, &pause, DT);
        assert!(state.paused);
        for _ in 0..100 {
            racer_tick(&mut state, &RacerInput::default(), DT);
        }
        assert_eq!(state.time_left_ticks, frozen);

        // No fast-forward on resume
        racer_tick(&mut state, &pause, DT);
        assert!(!state.paused);
        assert_eq!(state.time_left_ticks, frozen - 1);
    }

    #[test]
    fn test_clock_expiry_ends_session_and_settles_once() {
        let mut state = started(1, RacerConfig::default());
        state.score = 17;
        state.time_left_ticks = 3;
        for _ in 0..3 {
            racer_tick(&mut state, &RacerInput::default(), DT);
        }
        assert_eq!(state.phase, Phase::GameOver);
        assert!(state.events.contains(&GameEvent::GameOver { score: 17 }));
        assert_eq!(state.take_settlement(), Some(17));
        assert_eq!(state.take_settlement(), None);
    }

    #[test]
    fn test_no_settlement_before_game_over() {
        let mut state = started(1, RacerConfig::default());
        state.score = 9;
        assert_eq!(state.take_settlement(), None);
    }

    #[test]
    fn test_restart_returns_to_menu() {
        let mut state = started(1, RacerConfig::default());
        state.time_left_ticks = 1;
        racer_tick(&mut state, &RacerInput::default(), DT);
        assert_eq!(state.phase, Phase::GameOver);
        let restart = RacerInput {
            restart: true,
            ..Default::default()
        };
        racer_tick(&mut state, &restart, DT);
        assert_eq!(state.phase, Phase::Menu);
        assert!(state.items.is_empty());
        assert!(state.timers.is_empty());
    }

    #[test]
    fn test_menu_ignores_gameplay_input() {
        let mut state = RacerState::new(1, RacerConfig::default());
        for _ in 0..100 {
            racer_tick(&mut state, &key('a'), DT);
        }
        assert_eq!(state.phase, Phase::Menu);
        assert!(state.items.is_empty());
        assert_eq!(state.time_ticks, 0);
    }

    #[test]
    fn test_determinism_same_seed_same_run() {
        let config = RacerConfig::default();
        let mut a = started(99, config);
        let mut b = started(99, config);
        let script = [
            Some('a'),
            None,
            Some('e'),
            Some('3'),
            None,
            None,
            Some('k'),
            None,
        ];
        for i in 0..1200 {
            let input = RacerInput {
                key: script[i % script.len()],
                lane: if i % 97 == 0 { Some((i % 3) as u8) } else { None },
                ..Default::default()
            };
            racer_tick(&mut a, &input, DT);
            racer_tick(&mut b, &input, DT);
        }
        assert_eq!(a.score, b.score);
        assert_eq!(a.time_ticks, b.time_ticks);
        assert_eq!(a.items.len(), b.items.len());
        for (x, y) in a.items.iter().zip(b.items.iter()) {
            assert_eq!(x.id, y.id);
            assert_eq!(x.lane, y.lane);
            assert_eq!(x.ch, y.ch);
            assert!((x.pos.y - y.pos.y).abs() < 1e-6);
        }
    }
}
