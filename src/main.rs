//! Type Rally entry point
//!
//! Handles platform-specific initialization and runs the game loop for
//! whichever game the page mounts.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_app {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{CanvasRenderingContext2d, Document, HtmlCanvasElement, HtmlElement};

    use type_rally::audio::{AudioManager, SoundEffect};
    use type_rally::consts::*;
    use type_rally::sim::score::performance_message;
    use type_rally::sim::{
        CharSet, ControlMode, GameEvent, ItemKind, Phase, RacerInput, RacerState, ShooterInput,
        ShooterState, SpawnPolicy, SpeedLevel, SubMode, WEAPONS, racer_tick, shooter_tick,
        weapon_index,
    };
    use type_rally::{Progress, Settings};

    /// Whichever game the page mounted
    enum App {
        Road(RoadGame),
        Castle(CastleGame),
    }

    // === Road game shell ===

    struct RoadGame {
        state: RacerState,
        input: RacerInput,
        view: RoadView,
        settings: Settings,
        progress: Progress,
        audio: AudioManager,
        accumulator: f32,
        last_time: f64,
    }

    impl RoadGame {
        /// Run simulation ticks for one frame
        fn update(&mut self, dt: f32) {
            let dt = dt.min(0.1);
            self.accumulator += dt;

            let mut substeps = 0;
            while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
                let input = self.input.clone();
                racer_tick(&mut self.state, &input, SIM_DT);
                self.accumulator -= SIM_DT;
                substeps += 1;

                // All road inputs are one-shots
                self.input = RacerInput::default();
            }
        }

        /// Sounds, settlement, DOM sync after the ticks
        fn after_frame(&mut self, document: &Document) {
            let events = self.state.take_events();
            play_events(&self.audio, self.settings.effective_speech(), &events);

            if let Some(stars) = self.state.take_settlement() {
                self.progress.add_stars(stars);
                self.progress.save();
                log::info!("Banked {} stars ({} total)", stars, self.progress.total_stars);
            }

            self.view.sync(document, &self.state);
            self.update_hud(document);
        }

        fn update_hud(&self, document: &Document) {
            set_text(document, "hud-score", &self.state.score.to_string());
            set_text(document, "hud-level", &self.state.level.to_string());
            set_text(document, "hud-time", &format_clock(self.state.time_left_secs()));
            set_text(
                document,
                "hud-progress",
                &format!(
                    "{}/{}",
                    self.state.level_progress, self.state.stars_to_next_level
                ),
            );

            set_visible(document, "menu-screen", self.state.phase == Phase::Menu);
            set_visible(document, "pause-overlay", self.state.paused);
            set_visible(document, "level-up", self.state.phase == Phase::LevelUp);
            if self.state.phase == Phase::LevelUp {
                set_text(
                    document,
                    "level-up-label",
                    &format!("Level {}!", self.state.level),
                );
            }

            set_visible(document, "game-over", self.state.phase == Phase::GameOver);
            if self.state.phase == Phase::GameOver {
                set_text(document, "final-score", &self.state.score.to_string());
                set_text(
                    document,
                    "stars-banked",
                    &self.progress.total_stars.to_string(),
                );
                set_text(
                    document,
                    "performance-msg",
                    performance_message(self.state.score),
                );
            }
        }
    }

    /// DOM renderer for the road: one element per live entity, keyed by
    /// entity id so nodes persist across frames
    struct RoadView {
        root: HtmlElement,
        car: HtmlElement,
        items: HashMap<u32, HtmlElement>,
        sparks: HashMap<u32, HtmlElement>,
    }

    impl RoadView {
        fn new(document: &Document, root: HtmlElement) -> Self {
            let car = make_div(document, "car");
            let _ = root.append_child(&car);
            Self {
                root,
                car,
                items: HashMap::new(),
                sparks: HashMap::new(),
            }
        }

        fn sync(&mut self, document: &Document, state: &RacerState) {
            for item in &state.items {
                let el = self.items.entry(item.id).or_insert_with(|| {
                    let class = match item.kind {
                        ItemKind::Star => "item star",
                        ItemKind::Obstacle => "item obstacle",
                    };
                    let el = make_div(document, class);
                    if let Some(ch) = item.ch {
                        el.set_text_content(Some(&ch.to_string()));
                    }
                    let _ = self.root.append_child(&el);
                    el
                });
                let style = el.style();
                let _ = style.set_property("left", &format!("{}px", item.pos.x));
                let _ = style.set_property("top", &format!("{}px", item.pos.y));
            }
            self.items.retain(|id, el| {
                let live = state.items.iter().any(|i| i.id == *id);
                if !live {
                    el.remove();
                }
                live
            });

            for p in &state.particles {
                let el = self.sparks.entry(p.id).or_insert_with(|| {
                    let el = make_div(document, "spark");
                    let _ = self.root.append_child(&el);
                    el
                });
                let style = el.style();
                let _ = style.set_property("left", &format!("{}px", p.pos.x));
                let _ = style.set_property("top", &format!("{}px", p.pos.y));
                let _ = style.set_property("opacity", &format!("{:.2}", p.alpha()));
            }
            self.sparks.retain(|id, el| {
                let live = state.particles.iter().any(|p| p.id == *id);
                if !live {
                    el.remove();
                }
                live
            });

            let style = self.car.style();
            let _ = style.set_property("left", &format!("{}px", state.car_x - CAR_WIDTH / 2.0));
            let _ = style.set_property("top", &format!("{}px", CAR_TOP));
            let mut class = String::from("car");
            if state.dodging {
                class.push_str(" dodging");
            }
            if state.collision_flash {
                class.push_str(" hit");
            }
            let _ = self.car.set_attribute("class", &class);
        }
    }

    // === Castle game shell ===

    struct CastleGame {
        state: ShooterState,
        input: ShooterInput,
        view: CastleView,
        settings: Settings,
        progress: Progress,
        audio: AudioManager,
        accumulator: f32,
        last_time: f64,
        // Track phase so the shop refreshes once on entry
        last_phase: Phase,
    }

    impl CastleGame {
        fn update(&mut self, dt: f32) {
            let dt = dt.min(0.1);
            self.accumulator += dt;

            let mut substeps = 0;
            while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
                let input = self.input.clone();
                shooter_tick(&mut self.state, &input, SIM_DT);
                self.accumulator -= SIM_DT;
                substeps += 1;

                self.input = ShooterInput::default();
            }
        }

        fn after_frame(&mut self, document: &Document) {
            let events = self.state.take_events();
            play_events(&self.audio, self.settings.effective_speech(), &events);

            if let Some(stars) = self.state.take_settlement() {
                self.progress.add_stars(stars);
                self.progress.save();
                log::info!("Banked {} stars ({} total)", stars, self.progress.total_stars);
            }

            self.view.draw(&self.state);
            self.update_hud(document);
        }

        fn update_hud(&mut self, document: &Document) {
            let state = &self.state;
            set_text(document, "hud-score", &state.score.to_string());
            set_text(document, "hud-level", &state.level.to_string());
            set_text(
                document,
                "hud-misses",
                &format!("{}/{}", state.misses, MAX_MISSES),
            );

            let timer = match state.submode {
                SubMode::Normal => state.target_seconds_left().to_string(),
                SubMode::Bonus => state.bonus_seconds_left().to_string(),
                _ => String::new(),
            };
            set_text(document, "hud-timer", &timer);

            set_visible(document, "menu-screen", state.phase == Phase::Menu);
            set_visible(document, "pause-overlay", state.paused);

            let playing = state.phase == Phase::Playing;
            set_visible(
                document,
                "level-start",
                playing && state.submode == SubMode::LevelStart,
            );
            if state.submode == SubMode::LevelStart {
                set_text(
                    document,
                    "level-start-label",
                    &format!("Level {}", state.level),
                );
            }
            set_visible(
                document,
                "continue-prompt",
                playing && state.submode == SubMode::WaitingForInput,
            );

            set_visible(
                document,
                "bonus-bar",
                playing && state.submode == SubMode::Bonus,
            );
            if let Some(bonus) = &state.bonus {
                let display: String = bonus
                    .word
                    .chars()
                    .enumerate()
                    .map(|(i, ch)| if i < bonus.typed { ch } else { '_' })
                    .flat_map(|ch| [ch, ' '])
                    .collect();
                set_text(document, "bonus-word", display.trim_end());
            }

            set_visible(document, "shop", state.phase == Phase::LevelUp);
            if state.phase == Phase::LevelUp && self.last_phase != Phase::LevelUp {
                refresh_shop(document, &self.progress);
            }

            set_visible(document, "game-over", state.phase == Phase::GameOver);
            if state.phase == Phase::GameOver {
                set_text(document, "final-score", &state.score.to_string());
                set_text(document, "final-level", &state.level.to_string());
                set_text(
                    document,
                    "stars-banked",
                    &self.progress.total_stars.to_string(),
                );
            }

            self.last_phase = state.phase;
        }
    }

    /// Canvas renderer for the castle scene
    struct CastleView {
        ctx: CanvasRenderingContext2d,
    }

    impl CastleView {
        fn new(canvas: &HtmlCanvasElement) -> Option<Self> {
            let ctx = canvas
                .get_context("2d")
                .ok()
                .flatten()?
                .dyn_into::<CanvasRenderingContext2d>()
                .ok()?;
            Some(Self { ctx })
        }

        fn draw(&self, state: &ShooterState) {
            let ctx = &self.ctx;
            let w = SCENE_WIDTH as f64;
            let h = SCENE_HEIGHT as f64;

            // Sky and ground
            ctx.set_fill_style_str("#1a1a2e");
            ctx.fill_rect(0.0, 0.0, w, h);
            ctx.set_fill_style_str("#2d4a22");
            ctx.fill_rect(0.0, h - 40.0, w, 40.0);

            // Castle body with crenellations
            ctx.set_fill_style_str("#6b5b73");
            ctx.fill_rect(
                CASTLE_X as f64,
                CASTLE_Y as f64,
                CASTLE_W as f64,
                CASTLE_H as f64,
            );
            let mut x = CASTLE_X as f64;
            while x < (CASTLE_X + CASTLE_W) as f64 {
                ctx.fill_rect(x, CASTLE_Y as f64 - 20.0, 24.0, 20.0);
                x += 48.0;
            }

            // Windows; the lit one shows its letter
            for window in &state.windows {
                let r = &window.rect;
                let color = if window.broken {
                    "#14141f"
                } else if window.lit {
                    "#ffd94a"
                } else {
                    "#3d2f4f"
                };
                ctx.set_fill_style_str(color);
                ctx.fill_rect(r.x as f64, r.y as f64, r.w as f64, r.h as f64);
                if window.lit {
                    ctx.set_fill_style_str("#1a1a2e");
                    ctx.set_font("40px monospace");
                    ctx.set_text_align("center");
                    let _ = ctx.fill_text(
                        &window.letter.to_string(),
                        (r.x + r.w / 2.0) as f64,
                        (r.y + r.h / 2.0 + 14.0) as f64,
                    );
                }
            }

            // Cannon
            ctx.set_fill_style_str("#4a4a5a");
            ctx.fill_rect(CANNON_X as f64 - 30.0, CANNON_Y as f64, 60.0, 40.0);
            ctx.set_fill_style_str("#6a6a7a");
            ctx.fill_rect(CANNON_X as f64 - 8.0, CANNON_Y as f64 - 30.0, 16.0, 34.0);

            // Splatters under everything that moves
            for s in &state.splatters {
                ctx.set_global_alpha(s.alpha() as f64 * 0.8);
                ctx.set_fill_style_str(weapon_color(s.color as usize));
                ctx.begin_path();
                let _ = ctx.arc(
                    s.pos.x as f64,
                    s.pos.y as f64,
                    s.size as f64,
                    0.0,
                    std::f64::consts::TAU,
                );
                ctx.fill();
            }
            ctx.set_global_alpha(1.0);

            // Projectiles with fading trails
            for p in &state.projectiles {
                let color = weapon_color(p.weapon);
                for (i, t) in p.trail.iter().enumerate() {
                    ctx.set_global_alpha((1.0 - i as f64 / 8.0) * 0.35);
                    ctx.begin_path();
                    let _ = ctx.arc(
                        t.x as f64,
                        t.y as f64,
                        (p.size * 0.6) as f64,
                        0.0,
                        std::f64::consts::TAU,
                    );
                    ctx.set_fill_style_str(color);
                    ctx.fill();
                }
                ctx.set_global_alpha(1.0);
                ctx.begin_path();
                let _ = ctx.arc(
                    p.pos.x as f64,
                    p.pos.y as f64,
                    p.size as f64,
                    0.0,
                    std::f64::consts::TAU,
                );
                ctx.set_fill_style_str(color);
                ctx.fill();
            }

            // Debris tumbles with rotation
            for d in &state.debris {
                ctx.save();
                ctx.set_global_alpha(d.alpha() as f64);
                let _ = ctx.translate(d.pos.x as f64, d.pos.y as f64);
                let _ = ctx.rotate(d.rotation as f64);
                ctx.set_fill_style_str("#6b5b73");
                ctx.fill_rect(
                    -(d.size / 2.0) as f64,
                    -(d.size / 2.0) as f64,
                    d.size as f64,
                    d.size as f64,
                );
                ctx.restore();
            }

            for p in &state.particles {
                ctx.set_global_alpha(p.alpha() as f64);
                ctx.set_fill_style_str(particle_color(p.color));
                ctx.fill_rect(
                    (p.pos.x - p.size / 2.0) as f64,
                    (p.pos.y - p.size / 2.0) as f64,
                    p.size as f64,
                    p.size as f64,
                );
            }
            ctx.set_global_alpha(1.0);
        }
    }

    fn weapon_color(index: usize) -> &'static str {
        match index {
            0 => "#a65e44",
            1 => "#8a8a8a",
            2 => "#d9402b",
            3 => "#3f9e4d",
            4 => "#303038",
            5 => "#ff7b2f",
            6 => "#ffe94a",
            _ => "#7a5230",
        }
    }

    fn particle_color(color: u32) -> &'static str {
        match color {
            0 => "#ffd94a",
            1 => "#7ee0a3",
            2 => "#ffb347",
            _ => "#cfd6e3",
        }
    }

    // === Shared shell plumbing ===

    /// Route simulation events to sounds and speech
    fn play_events(audio: &AudioManager, speech: bool, events: &[GameEvent]) {
        for event in events {
            match *event {
                GameEvent::StarCollected { ch } => {
                    if ch.is_ascii_alphabetic() {
                        audio.play(SoundEffect::Letter(ch));
                    } else {
                        audio.play(SoundEffect::Collect);
                    }
                    if speech {
                        audio.speak(&ch.to_string());
                    }
                }
                GameEvent::ObstacleHit => audio.play(SoundEffect::Collision),
                GameEvent::LevelUp { .. } => audio.play(SoundEffect::LevelUp),
                GameEvent::TargetHit { .. } => audio.play(SoundEffect::Hit),
                GameEvent::TargetMiss => audio.play(SoundEffect::Miss),
                GameEvent::Shot => audio.play(SoundEffect::Shoot),
                GameEvent::WindowBroken { weapon } => {
                    audio.play(SoundEffect::Break(WEAPONS[weapon].sound));
                }
                GameEvent::BonusStarted => audio.play(SoundEffect::BonusStart),
                GameEvent::BonusLetter { ch } => {
                    audio.play(SoundEffect::Letter(ch));
                    if speech {
                        audio.speak(&ch.to_string());
                    }
                }
                GameEvent::BonusComplete => audio.play(SoundEffect::LevelUp),
                GameEvent::CastleRumble => audio.play(SoundEffect::Rumble),
                GameEvent::GameOver { .. } => audio.play(SoundEffect::GameOver),
            }
        }
    }

    fn set_text(document: &Document, id: &str, text: &str) {
        if let Some(el) = document.get_element_by_id(id) {
            el.set_text_content(Some(text));
        }
    }

    fn set_visible(document: &Document, id: &str, visible: bool) {
        if let Some(el) = document.get_element_by_id(id) {
            let _ = el.set_attribute("class", if visible { "" } else { "hidden" });
        }
    }

    fn make_div(document: &Document, class: &str) -> HtmlElement {
        let el = document.create_element("div").expect("create div");
        let _ = el.set_attribute("class", class);
        el.dyn_into::<HtmlElement>().expect("div is an HtmlElement")
    }

    fn format_clock(secs: u32) -> String {
        format!("{}:{:02}", secs / 60, secs % 60)
    }

    /// Page-level options on the road mount element:
    /// data-control="autopilot", data-chars="digits", data-policy="gap",
    /// data-speed="1".."5"
    fn apply_road_overrides(root: &HtmlElement, settings: &mut Settings) {
        if let Some(v) = root.get_attribute("data-control") {
            settings.control = if v == "autopilot" {
                ControlMode::Autopilot
            } else {
                ControlMode::ManualLanes
            };
        }
        if let Some(v) = root.get_attribute("data-chars") {
            settings.char_set = if v == "digits" {
                CharSet::DigitsOnly
            } else {
                CharSet::LettersAndDigits
            };
        }
        if let Some(v) = root.get_attribute("data-policy") {
            settings.spawn_policy = if v == "gap" {
                SpawnPolicy::MinGap
            } else {
                SpawnPolicy::Timed
            };
        }
        if let Some(v) = root.get_attribute("data-speed") {
            if let Some(level) = v.parse::<u8>().ok().and_then(SpeedLevel::from_index) {
                settings.speed_level = level;
            }
        }
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        log::info!("Type Rally starting...");

        let window = web_sys::window().expect("no window");
        let document = window.document().expect("no document");

        // Hide loading indicator
        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        let settings = Settings::load();
        let progress = Progress::load();
        let mut audio = AudioManager::new();
        audio.set_master_volume(settings.master_volume);
        audio.set_muted(!settings.sound_enabled);

        let seed = js_sys::Date::now() as u64;

        let app = if let Some(root) = document.get_element_by_id("road") {
            let root: HtmlElement = root.dyn_into().expect("road mount is not an element");
            let mut settings = settings;
            apply_road_overrides(&root, &mut settings);
            let state = RacerState::new(seed, settings.racer_config());
            let view = RoadView::new(&document, root);
            log::info!("Road game mounted with seed {seed}");
            App::Road(RoadGame {
                state,
                input: RacerInput::default(),
                view,
                settings,
                progress,
                audio,
                accumulator: 0.0,
                last_time: 0.0,
            })
        } else if let Some(canvas) = document.get_element_by_id("castle-canvas") {
            let canvas: HtmlCanvasElement = canvas.dyn_into().expect("castle mount is not a canvas");
            canvas.set_width(SCENE_WIDTH as u32);
            canvas.set_height(SCENE_HEIGHT as u32);
            let Some(view) = CastleView::new(&canvas) else {
                log::error!("2d canvas context unavailable");
                return;
            };
            let mut state = ShooterState::new(seed);
            state.weapon = progress.selected_weapon();
            log::info!("Castle game mounted with seed {seed}");
            App::Castle(CastleGame {
                state,
                input: ShooterInput::default(),
                view,
                settings,
                progress,
                audio,
                accumulator: 0.0,
                last_time: 0.0,
                last_phase: Phase::Menu,
            })
        } else {
            log::error!("No game mount point found (#road or #castle-canvas)");
            return;
        };

        let app = Rc::new(RefCell::new(app));

        setup_keyboard(app.clone());
        setup_buttons(app.clone());
        setup_speed_select(app.clone());
        setup_shop(app.clone());
        setup_volume(app.clone());
        setup_auto_pause(app.clone());
        init_controls(&document, &app);

        request_animation_frame(app);

        log::info!("Type Rally running!");
    }

    /// Reflect loaded settings in the menu controls once at startup
    fn init_controls(document: &Document, app: &Rc<RefCell<App>>) {
        let a = app.borrow();
        let settings = match &*a {
            App::Road(g) => &g.settings,
            App::Castle(g) => &g.settings,
        };
        set_text(
            document,
            "sound-btn",
            if settings.sound_enabled {
                "Sound: On"
            } else {
                "Sound: Off"
            },
        );
        if let Some(slider) = document.get_element_by_id("volume-slider") {
            if let Ok(slider) = slider.dyn_into::<web_sys::HtmlInputElement>() {
                slider.set_value(&format!("{}", (settings.master_volume * 100.0) as u32));
            }
        }
        refresh_speed_select(document, settings.speed_level);
    }

    fn setup_keyboard(app: Rc<RefCell<App>>) {
        let window = web_sys::window().unwrap();
        let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::KeyboardEvent| {
            let key = event.key();
            let mut a = app.borrow_mut();
            match &mut *a {
                App::Road(g) => road_key(g, &key),
                App::Castle(g) => castle_key(g, &key),
            }
        });
        let _ = window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn road_key(g: &mut RoadGame, key: &str) {
        match key {
            "ArrowLeft" => g.input.lane = Some(0),
            "ArrowDown" => g.input.lane = Some(1),
            "ArrowRight" => g.input.lane = Some(2),
            "Enter" => {
                g.input.start = true;
                if g.state.phase == Phase::GameOver {
                    g.input.restart = true;
                }
                g.audio.resume();
            }
            "Escape" => g.input.pause = true,
            k => {
                let mut chars = k.chars();
                if let (Some(ch), None) = (chars.next(), chars.next()) {
                    if ch.is_ascii_alphanumeric() {
                        // Letter keys double as lane keys when stars only
                        // carry digits
                        if g.settings.char_set == CharSet::DigitsOnly {
                            match ch.to_ascii_lowercase() {
                                'a' => {
                                    g.input.lane = Some(0);
                                    return;
                                }
                                's' => {
                                    g.input.lane = Some(1);
                                    return;
                                }
                                'd' => {
                                    g.input.lane = Some(2);
                                    return;
                                }
                                _ => {}
                            }
                        }
                        g.input.key = Some(ch);
                        g.audio.resume();
                    }
                }
            }
        }
    }

    fn castle_key(g: &mut CastleGame, key: &str) {
        match key {
            "Enter" => {
                g.input.advance = true;
                if g.state.phase == Phase::GameOver {
                    g.input.restart = true;
                }
                g.audio.resume();
            }
            "Backspace" => g.input.backspace = true,
            "Escape" => g.input.pause = true,
            k => {
                let mut chars = k.chars();
                if let (Some(ch), None) = (chars.next(), chars.next()) {
                    if ch.is_ascii_alphanumeric() {
                        g.input.key = Some(ch);
                        g.audio.resume();
                    }
                }
            }
        }
    }

    fn setup_buttons(app: Rc<RefCell<App>>) {
        let document = web_sys::window().unwrap().document().unwrap();

        if let Some(btn) = document.get_element_by_id("start-btn") {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
                let mut a = app.borrow_mut();
                match &mut *a {
                    App::Road(g) => {
                        g.input.start = true;
                        g.audio.resume();
                    }
                    App::Castle(g) => {
                        g.input.start = true;
                        g.audio.resume();
                    }
                }
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        if let Some(btn) = document.get_element_by_id("play-again-btn") {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
                let mut a = app.borrow_mut();
                match &mut *a {
                    App::Road(g) => {
                        g.input.restart = true;
                        g.input.start = true;
                    }
                    App::Castle(g) => {
                        g.input.restart = true;
                        g.input.start = true;
                    }
                }
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        if let Some(btn) = document.get_element_by_id("sound-btn") {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
                let mut a = app.borrow_mut();
                let (settings, audio) = match &mut *a {
                    App::Road(g) => (&mut g.settings, &mut g.audio),
                    App::Castle(g) => (&mut g.settings, &mut g.audio),
                };
                settings.sound_enabled = !settings.sound_enabled;
                audio.set_muted(!settings.sound_enabled);
                settings.save();
                let document = web_sys::window().unwrap().document().unwrap();
                set_text(
                    &document,
                    "sound-btn",
                    if settings.sound_enabled {
                        "Sound: On"
                    } else {
                        "Sound: Off"
                    },
                );
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    /// Menu speed buttons carry data-speed="1".."5"
    fn setup_speed_select(app: Rc<RefCell<App>>) {
        let document = web_sys::window().unwrap().document().unwrap();
        let Some(list) = document.get_element_by_id("speed-select") else {
            return;
        };

        let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::MouseEvent| {
            let Some(target) = event.target() else { return };
            let Ok(el) = target.dyn_into::<web_sys::Element>() else {
                return;
            };
            let Ok(Some(btn)) = el.closest("[data-speed]") else {
                return;
            };
            let Some(level) = btn
                .get_attribute("data-speed")
                .and_then(|v| v.parse::<u8>().ok())
                .and_then(SpeedLevel::from_index)
            else {
                return;
            };

            let mut a = app.borrow_mut();
            if let App::Road(g) = &mut *a {
                g.settings.speed_level = level;
                g.settings.save();
                g.state.config = g.settings.racer_config();
                log::info!("Speed set to {}", level.label());
            }
            let document = web_sys::window().unwrap().document().unwrap();
            refresh_speed_select(&document, level);
        });
        let _ = list.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn refresh_speed_select(document: &Document, selected: SpeedLevel) {
        let Some(list) = document.get_element_by_id("speed-select") else {
            return;
        };
        let children = list.children();
        for i in 0..children.length() {
            let Some(el) = children.item(i) else { continue };
            let Some(v) = el.get_attribute("data-speed") else {
                continue;
            };
            let class = if v == selected.index().to_string() {
                "speed-btn selected"
            } else {
                "speed-btn"
            };
            let _ = el.set_attribute("class", class);
        }
    }

    /// Build the shop item list and wire purchase clicks
    fn setup_shop(app: Rc<RefCell<App>>) {
        let document = web_sys::window().unwrap().document().unwrap();
        let Some(list) = document.get_element_by_id("shop-items") else {
            return;
        };

        for weapon in WEAPONS.iter() {
            if let Ok(btn) = document.create_element("button") {
                let _ = btn.set_attribute("data-weapon", weapon.id);
                let _ = btn.set_attribute("class", "shop-item");
                btn.set_text_content(Some(&format!("{} - {} stars", weapon.name, weapon.cost)));
                let _ = list.append_child(&btn);
            }
        }

        {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::MouseEvent| {
                let Some(target) = event.target() else { return };
                let Ok(el) = target.dyn_into::<web_sys::Element>() else {
                    return;
                };
                let Ok(Some(item)) = el.closest("[data-weapon]") else {
                    return;
                };
                let Some(id) = item.get_attribute("data-weapon") else {
                    return;
                };
                let Some(index) = weapon_index(&id) else { return };

                let mut a = app.borrow_mut();
                let App::Castle(g) = &mut *a else { return };
                if g.progress.purchase(&id, WEAPONS[index].cost) {
                    g.state.weapon = index;
                    g.progress.save();
                    g.audio.play(SoundEffect::Hit);
                    log::info!("Equipped {}", WEAPONS[index].name);
                } else {
                    g.audio.play(SoundEffect::Miss);
                }
                let document = web_sys::window().unwrap().document().unwrap();
                refresh_shop(&document, &g.progress);
            });
            let _ = list.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        if let Some(btn) = document.get_element_by_id("shop-continue") {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
                let mut a = app.borrow_mut();
                if let App::Castle(g) = &mut *a {
                    g.input.advance = true;
                }
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn refresh_shop(document: &Document, progress: &Progress) {
        set_text(document, "shop-stars", &progress.total_stars.to_string());
        let Some(list) = document.get_element_by_id("shop-items") else {
            return;
        };
        let children = list.children();
        for i in 0..children.length() {
            let Some(el) = children.item(i) else { continue };
            let Some(id) = el.get_attribute("data-weapon") else {
                continue;
            };
            let Some(weapon) = WEAPONS.iter().find(|w| w.id == id) else {
                continue;
            };
            let mut class = String::from("shop-item");
            if progress.selected_item == id {
                class.push_str(" selected");
            } else if progress.owns(&id) {
                class.push_str(" owned");
            } else if weapon.cost > progress.total_stars {
                class.push_str(" locked");
            }
            let _ = el.set_attribute("class", &class);
        }
    }

    fn setup_volume(app: Rc<RefCell<App>>) {
        let document = web_sys::window().unwrap().document().unwrap();
        let Some(slider) = document.get_element_by_id("volume-slider") else {
            return;
        };

        let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::Event| {
            let Some(target) = event.target() else { return };
            let Ok(input) = target.dyn_into::<web_sys::HtmlInputElement>() else {
                return;
            };
            let Ok(value) = input.value().parse::<f32>() else {
                return;
            };
            let vol = (value / 100.0).clamp(0.0, 1.0);

            let mut a = app.borrow_mut();
            let (settings, audio) = match &mut *a {
                App::Road(g) => (&mut g.settings, &mut g.audio),
                App::Castle(g) => (&mut g.settings, &mut g.audio),
            };
            settings.master_volume = vol;
            audio.set_master_volume(vol);
            settings.save();
        });
        let _ = slider.add_event_listener_with_callback("input", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_auto_pause(app: Rc<RefCell<App>>) {
        let window = web_sys::window().unwrap();
        let document = window.document().unwrap();

        // Visibility change (tab switch, minimize)
        {
            let app = app.clone();
            let document_clone = document.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                if document_clone.visibility_state() == web_sys::VisibilityState::Hidden {
                    let mut a = app.borrow_mut();
                    match &mut *a {
                        App::Road(g) => {
                            if g.state.phase == Phase::Playing && !g.state.paused {
                                g.input.pause = true;
                                log::info!("Auto-paused (tab hidden)");
                            }
                        }
                        App::Castle(g) => {
                            if g.state.phase == Phase::Playing && !g.state.paused {
                                g.input.pause = true;
                                log::info!("Auto-paused (tab hidden)");
                            }
                        }
                    }
                }
            });
            let _ = document.add_event_listener_with_callback(
                "visibilitychange",
                closure.as_ref().unchecked_ref(),
            );
            closure.forget();
        }

        // Window blur (click outside)
        {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::FocusEvent| {
                let mut a = app.borrow_mut();
                let (settings, audio, phase, paused, pause_flag) = match &mut *a {
                    App::Road(g) => (
                        &g.settings,
                        &mut g.audio,
                        g.state.phase,
                        g.state.paused,
                        &mut g.input.pause,
                    ),
                    App::Castle(g) => (
                        &g.settings,
                        &mut g.audio,
                        g.state.phase,
                        g.state.paused,
                        &mut g.input.pause,
                    ),
                };
                if settings.mute_on_blur {
                    audio.set_muted(true);
                }
                if phase == Phase::Playing && !paused {
                    *pause_flag = true;
                    log::info!("Auto-paused (window blur)");
                }
            });
            let _ =
                window.add_event_listener_with_callback("blur", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Focus returns: lift the blur mute unless sound is off
        {
            let window_clone = window.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::FocusEvent| {
                let mut a = app.borrow_mut();
                let (settings, audio) = match &mut *a {
                    App::Road(g) => (&g.settings, &mut g.audio),
                    App::Castle(g) => (&g.settings, &mut g.audio),
                };
                audio.set_muted(!settings.sound_enabled);
            });
            let _ = window_clone
                .add_event_listener_with_callback("focus", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn request_animation_frame(app: Rc<RefCell<App>>) {
        let window = web_sys::window().unwrap();
        let closure = Closure::once(move |time: f64| {
            game_loop(app, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(app: Rc<RefCell<App>>, time: f64) {
        {
            let document = web_sys::window().unwrap().document().unwrap();
            let mut a = app.borrow_mut();
            match &mut *a {
                App::Road(g) => {
                    let dt = if g.last_time > 0.0 {
                        ((time - g.last_time) / 1000.0) as f32
                    } else {
                        SIM_DT
                    };
                    g.last_time = time;
                    g.update(dt);
                    g.after_frame(&document);
                }
                App::Castle(g) => {
                    let dt = if g.last_time > 0.0 {
                        ((time - g.last_time) / 1000.0) as f32
                    } else {
                        SIM_DT
                    };
                    g.last_time = time;
                    g.update(dt);
                    g.after_frame(&document);
                }
            }
        }

        request_animation_frame(app);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_app::run();
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Type Rally (native) starting...");
    log::info!("The games run in a browser - this binary drives headless demos");

    println!("\nRoad demo (autopilot bot, 30 simulated seconds):");
    demo_road();
    println!("\nCastle demo (scripted bot, 60 simulated seconds):");
    demo_castle();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
fn demo_road() {
    use type_rally::consts::*;
    use type_rally::sim::{
        ControlMode, ItemKind, Phase, RacerConfig, RacerInput, RacerState, racer_tick,
    };

    let config = RacerConfig {
        control: ControlMode::Autopilot,
        ..Default::default()
    };
    let mut state = RacerState::new(42, config);
    let mut input = RacerInput {
        start: true,
        ..Default::default()
    };

    for _ in 0..(30 * TICKS_PER_SECOND) {
        racer_tick(&mut state, &input, SIM_DT);
        input = RacerInput::default();

        // Type whichever star is in the collection band
        if state.phase == Phase::Playing {
            if let Some(star) = state.items.iter().find(|i| {
                i.kind == ItemKind::Star
                    && i.center_y() >= AUTO_BAND_TOP
                    && i.center_y() <= AUTO_BAND_BOTTOM
            }) {
                input.key = star.ch;
            }
        }
    }

    println!(
        "  score {} at level {} with {}s left",
        state.score,
        state.level,
        state.time_left_secs()
    );
}

#[cfg(not(target_arch = "wasm32"))]
fn demo_castle() {
    use type_rally::consts::*;
    use type_rally::sim::{Phase, ShooterInput, ShooterState, SubMode, shooter_tick};

    let mut state = ShooterState::new(42);
    let mut input = ShooterInput {
        advance: true,
        ..Default::default()
    };

    for _ in 0..(60 * TICKS_PER_SECOND) {
        shooter_tick(&mut state, &input, SIM_DT);
        input = ShooterInput::default();

        match state.phase {
            Phase::Menu | Phase::LevelUp => input.advance = true,
            Phase::GameOver => break,
            Phase::Playing => match state.submode {
                SubMode::LevelStart | SubMode::WaitingForInput => input.advance = true,
                SubMode::Normal => {
                    input.key = state.current_target().map(|w| w.letter);
                }
                SubMode::Bonus => {
                    if let Some(bonus) = &state.bonus {
                        if !bonus.done {
                            input.key = bonus.word.chars().nth(bonus.typed);
                        }
                    }
                }
            },
        }
    }

    println!("  score {} at level {}", state.score, state.level);
}
