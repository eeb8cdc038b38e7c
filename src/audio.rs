//! Audio system using Web Audio API
//!
//! Procedurally generated sound effects - no external files needed.
//! Collected letters also play as notes on a chromatic scale, and the
//! speech synthesizer says them out loud.

use web_sys::{
    AudioBufferSourceNode, AudioContext, BiquadFilterType, GainNode, OscillatorNode,
    OscillatorType, SpeechSynthesisUtterance,
};

use crate::sim::BreakSound;

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SoundEffect {
    /// Star collected (non-letter pickup chime)
    Collect,
    /// Letter collected or typed - plays its note
    Letter(char),
    /// Car hit an obstacle
    Collision,
    /// Level up fanfare
    LevelUp,
    /// Target letter hit
    Hit,
    /// Target clock ran out
    Miss,
    /// Projectile launched
    Shoot,
    /// Window smashed - flavor depends on the weapon
    Break(BreakSound),
    /// Bonus word revealed
    BonusStart,
    /// Castle collapse rumble
    Rumble,
    /// Session over
    GameOver,
}

/// Note frequency for a letter: chromatic scale up from A4
fn letter_freq(ch: char) -> f32 {
    let ch = ch.to_ascii_uppercase();
    if !ch.is_ascii_uppercase() {
        return 440.0;
    }
    let idx = (ch as u8 - b'A') as f32;
    440.0 * 2.0_f32.powf(idx / 12.0)
}

/// Audio manager for both games
pub struct AudioManager {
    ctx: Option<AudioContext>,
    master_volume: f32,
    muted: bool,
}

impl Default for AudioManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioManager {
    pub fn new() -> Self {
        // Try to create audio context (may fail if not in secure context)
        let ctx = AudioContext::new().ok();
        if ctx.is_none() {
            log::warn!("Failed to create AudioContext - audio disabled");
        }
        Self {
            ctx,
            master_volume: 0.8,
            muted: false,
        }
    }

    /// Resume audio context (required after user gesture)
    pub fn resume(&self) {
        if let Some(ctx) = &self.ctx {
            let _ = ctx.resume();
        }
    }

    /// Set master volume (0.0 - 1.0)
    pub fn set_master_volume(&mut self, vol: f32) {
        self.master_volume = vol.clamp(0.0, 1.0);
    }

    /// Mute/unmute all audio
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    fn effective_volume(&self) -> f32 {
        if self.muted { 0.0 } else { self.master_volume }
    }

    /// Play a sound effect
    pub fn play(&self, effect: SoundEffect) {
        let vol = self.effective_volume();
        if vol <= 0.0 {
            return;
        }

        let Some(ctx) = &self.ctx else { return };

        // Resume context if suspended (browsers require user gesture)
        if ctx.state() == web_sys::AudioContextState::Suspended {
            let _ = ctx.resume();
        }

        match effect {
            SoundEffect::Collect => self.play_collect(ctx, vol),
            SoundEffect::Letter(ch) => self.play_letter(ctx, vol, ch),
            SoundEffect::Collision => self.play_collision(ctx, vol),
            SoundEffect::LevelUp => self.play_level_up(ctx, vol),
            SoundEffect::Hit => self.play_hit(ctx, vol),
            SoundEffect::Miss => self.play_miss(ctx, vol),
            SoundEffect::Shoot => self.play_shoot(ctx, vol),
            SoundEffect::Break(flavor) => self.play_break(ctx, vol, flavor),
            SoundEffect::BonusStart => self.play_bonus_start(ctx, vol),
            SoundEffect::Rumble => self.play_rumble(ctx, vol),
            SoundEffect::GameOver => self.play_game_over(ctx, vol),
        }
    }

    /// Say a letter or word out loud
    pub fn speak(&self, text: &str) {
        if self.muted {
            return;
        }
        let Some(window) = web_sys::window() else {
            return;
        };
        let Ok(synth) = window.speech_synthesis() else {
            return;
        };
        let Ok(utterance) = SpeechSynthesisUtterance::new_with_text(text) else {
            return;
        };
        utterance.set_rate(0.9);
        utterance.set_pitch(1.1);
        // Drop anything still queued so rapid typing stays snappy
        synth.cancel();
        synth.speak(&utterance);
    }

    // === Sound generators ===

    /// Create an oscillator with gain envelope
    fn create_osc(
        &self,
        ctx: &AudioContext,
        freq: f32,
        osc_type: OscillatorType,
    ) -> Option<(OscillatorNode, GainNode)> {
        let osc = ctx.create_oscillator().ok()?;
        let gain = ctx.create_gain().ok()?;

        osc.set_type(osc_type);
        osc.frequency().set_value(freq);
        osc.connect_with_audio_node(&gain).ok()?;
        gain.connect_with_audio_node(&ctx.destination()).ok()?;

        Some((osc, gain))
    }

    /// Create a white noise source with gain envelope
    fn create_noise(
        &self,
        ctx: &AudioContext,
        duration: f32,
    ) -> Option<(AudioBufferSourceNode, GainNode)> {
        let sample_rate = ctx.sample_rate();
        let len = (sample_rate * duration) as u32;
        let buffer = ctx.create_buffer(1, len, sample_rate).ok()?;
        let mut data = vec![0.0f32; len as usize];
        for sample in data.iter_mut() {
            *sample = js_sys::Math::random() as f32 * 2.0 - 1.0;
        }
        buffer.copy_to_channel(&mut data, 0).ok()?;

        let source = ctx.create_buffer_source().ok()?;
        source.set_buffer(Some(&buffer));
        let gain = ctx.create_gain().ok()?;
        source.connect_with_audio_node(&gain).ok()?;
        gain.connect_with_audio_node(&ctx.destination()).ok()?;

        Some((source, gain))
    }

    /// Noise routed through a lowpass filter
    fn create_filtered_noise(
        &self,
        ctx: &AudioContext,
        duration: f32,
        cutoff: f32,
    ) -> Option<(AudioBufferSourceNode, GainNode)> {
        let sample_rate = ctx.sample_rate();
        let len = (sample_rate * duration) as u32;
        let buffer = ctx.create_buffer(1, len, sample_rate).ok()?;
        let mut data = vec![0.0f32; len as usize];
        for sample in data.iter_mut() {
            *sample = js_sys::Math::random() as f32 * 2.0 - 1.0;
        }
        buffer.copy_to_channel(&mut data, 0).ok()?;

        let source = ctx.create_buffer_source().ok()?;
        source.set_buffer(Some(&buffer));
        let filter = ctx.create_biquad_filter().ok()?;
        filter.set_type(BiquadFilterType::Lowpass);
        filter.frequency().set_value(cutoff);
        let gain = ctx.create_gain().ok()?;
        source.connect_with_audio_node(&filter).ok()?;
        filter.connect_with_audio_node(&gain).ok()?;
        gain.connect_with_audio_node(&ctx.destination()).ok()?;

        Some((source, gain))
    }

    /// Star pickup - short 800 Hz ding
    fn play_collect(&self, ctx: &AudioContext, vol: f32) {
        let Some((osc, gain)) = self.create_osc(ctx, 800.0, OscillatorType::Sine) else {
            return;
        };
        let t = ctx.current_time();

        gain.gain().set_value_at_time(vol * 0.25, t).ok();
        gain.gain()
            .exponential_ramp_to_value_at_time(0.01, t + 0.1)
            .ok();

        osc.start().ok();
        osc.stop_with_when(t + 0.12).ok();
    }

    /// Letter note on the chromatic scale, with a soft octave shimmer
    fn play_letter(&self, ctx: &AudioContext, vol: f32, ch: char) {
        let freq = letter_freq(ch);
        let t = ctx.current_time();

        if let Some((osc, gain)) = self.create_osc(ctx, freq, OscillatorType::Sine) {
            gain.gain().set_value_at_time(vol * 0.35, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + 0.25)
                .ok();
            osc.start().ok();
            osc.stop_with_when(t + 0.3).ok();
        }

        if let Some((osc, gain)) = self.create_osc(ctx, freq * 2.0, OscillatorType::Triangle) {
            gain.gain().set_value_at_time(vol * 0.1, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + 0.15)
                .ok();
            osc.start().ok();
            osc.stop_with_when(t + 0.2).ok();
        }
    }

    /// Obstacle collision - harsh descending buzz
    fn play_collision(&self, ctx: &AudioContext, vol: f32) {
        let Some((osc, gain)) = self.create_osc(ctx, 200.0, OscillatorType::Sawtooth) else {
            return;
        };
        let t = ctx.current_time();

        gain.gain().set_value_at_time(vol * 0.4, t).ok();
        gain.gain()
            .exponential_ramp_to_value_at_time(0.01, t + 0.3)
            .ok();
        osc.frequency().set_value_at_time(200.0, t).ok();
        osc.frequency()
            .exponential_ramp_to_value_at_time(60.0, t + 0.3)
            .ok();

        osc.start().ok();
        osc.stop_with_when(t + 0.35).ok();
    }

    /// Level up - triumphant fanfare
    fn play_level_up(&self, ctx: &AudioContext, vol: f32) {
        for (i, freq) in [523.25, 659.25, 783.99].iter().enumerate() {
            let delay = i as f64 * 0.15;
            if let Some((osc, gain)) = self.create_osc(ctx, *freq, OscillatorType::Triangle) {
                let t = ctx.current_time() + delay;
                gain.gain().set_value_at_time(vol * 0.3, t).ok();
                gain.gain()
                    .exponential_ramp_to_value_at_time(0.01, t + 0.4)
                    .ok();
                osc.start_with_when(t).ok();
                osc.stop_with_when(t + 0.5).ok();
            }
        }
    }

    /// Target hit - bright ping
    fn play_hit(&self, ctx: &AudioContext, vol: f32) {
        let Some((osc, gain)) = self.create_osc(ctx, 880.0, OscillatorType::Sine) else {
            return;
        };
        let t = ctx.current_time();

        gain.gain().set_value_at_time(vol * 0.3, t).ok();
        gain.gain()
            .exponential_ramp_to_value_at_time(0.01, t + 0.12)
            .ok();

        osc.start().ok();
        osc.stop_with_when(t + 0.15).ok();
    }

    /// Target missed - sour drop
    fn play_miss(&self, ctx: &AudioContext, vol: f32) {
        let Some((osc, gain)) = self.create_osc(ctx, 300.0, OscillatorType::Square) else {
            return;
        };
        let t = ctx.current_time();

        gain.gain().set_value_at_time(vol * 0.25, t).ok();
        gain.gain()
            .exponential_ramp_to_value_at_time(0.01, t + 0.35)
            .ok();
        osc.frequency().set_value_at_time(300.0, t).ok();
        osc.frequency()
            .exponential_ramp_to_value_at_time(110.0, t + 0.3)
            .ok();

        osc.start().ok();
        osc.stop_with_when(t + 0.4).ok();
    }

    /// Projectile launch - whoosh down the arc
    fn play_shoot(&self, ctx: &AudioContext, vol: f32) {
        let Some((osc, gain)) = self.create_osc(ctx, 440.0, OscillatorType::Triangle) else {
            return;
        };
        let t = ctx.current_time();

        gain.gain().set_value_at_time(vol * 0.3, t).ok();
        gain.gain()
            .exponential_ramp_to_value_at_time(0.01, t + 0.25)
            .ok();
        osc.frequency().set_value_at_time(440.0, t).ok();
        osc.frequency()
            .exponential_ramp_to_value_at_time(220.0, t + 0.2)
            .ok();

        osc.start().ok();
        osc.stop_with_when(t + 0.3).ok();
    }

    /// Window smash, flavored per weapon
    fn play_break(&self, ctx: &AudioContext, vol: f32, flavor: BreakSound) {
        match flavor {
            BreakSound::Thud => self.play_thud(ctx, vol),
            BreakSound::Ping => self.play_ping(ctx, vol),
            BreakSound::Splash => self.play_splash(ctx, vol),
            BreakSound::Pop => self.play_pop(ctx, vol),
            BreakSound::Thwack => self.play_thwack(ctx, vol),
            BreakSound::Zap => self.play_zap(ctx, vol),
            BreakSound::Sparkle => self.play_sparkle(ctx, vol),
            BreakSound::Boom => self.play_boom(ctx, vol),
        }
    }

    /// Brick - dull masonry thud
    fn play_thud(&self, ctx: &AudioContext, vol: f32) {
        let t = ctx.current_time();

        if let Some((osc, gain)) = self.create_osc(ctx, 120.0, OscillatorType::Sine) {
            gain.gain().set_value_at_time(vol * 0.5, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + 0.2)
                .ok();
            osc.frequency().set_value_at_time(120.0, t).ok();
            osc.frequency()
                .exponential_ramp_to_value_at_time(50.0, t + 0.15)
                .ok();
            osc.start().ok();
            osc.stop_with_when(t + 0.25).ok();
        }

        if let Some((noise, gain)) = self.create_noise(ctx, 0.1) {
            gain.gain().set_value_at_time(vol * 0.2, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + 0.08)
                .ok();
            noise.start().ok();
        }
    }

    /// Slingshot - small bright ping
    fn play_ping(&self, ctx: &AudioContext, vol: f32) {
        let Some((osc, gain)) = self.create_osc(ctx, 1400.0, OscillatorType::Sine) else {
            return;
        };
        let t = ctx.current_time();

        gain.gain().set_value_at_time(vol * 0.3, t).ok();
        gain.gain()
            .exponential_ramp_to_value_at_time(0.01, t + 0.1)
            .ok();

        osc.start().ok();
        osc.stop_with_when(t + 0.12).ok();
    }

    /// Tomato - wet splat
    fn play_splash(&self, ctx: &AudioContext, vol: f32) {
        let t = ctx.current_time();

        if let Some((noise, gain)) = self.create_filtered_noise(ctx, 0.25, 500.0) {
            gain.gain().set_value_at_time(vol * 0.4, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + 0.2)
                .ok();
            noise.start().ok();
        }

        // Wobbly squish under the noise
        if let Some((osc, gain)) = self.create_osc(ctx, 250.0, OscillatorType::Sine) {
            gain.gain().set_value_at_time(vol * 0.2, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + 0.2)
                .ok();
            osc.frequency().set_value_at_time(250.0, t).ok();
            osc.frequency().set_value_at_time(180.0, t + 0.05).ok();
            osc.frequency().set_value_at_time(220.0, t + 0.1).ok();
            osc.frequency().set_value_at_time(120.0, t + 0.15).ok();
            osc.start().ok();
            osc.stop_with_when(t + 0.25).ok();
        }
    }

    /// Watermelon - hollow pop and burst
    fn play_pop(&self, ctx: &AudioContext, vol: f32) {
        let t = ctx.current_time();

        if let Some((osc, gain)) = self.create_osc(ctx, 300.0, OscillatorType::Sine) {
            gain.gain().set_value_at_time(vol * 0.45, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + 0.12)
                .ok();
            osc.frequency().set_value_at_time(300.0, t).ok();
            osc.frequency()
                .exponential_ramp_to_value_at_time(80.0, t + 0.1)
                .ok();
            osc.start().ok();
            osc.stop_with_when(t + 0.15).ok();
        }

        if let Some((noise, gain)) = self.create_filtered_noise(ctx, 0.2, 900.0) {
            gain.gain().set_value_at_time(vol * 0.3, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + 0.18)
                .ok();
            noise.start().ok();
        }
    }

    /// Cannonball - deep heavy impact
    fn play_thwack(&self, ctx: &AudioContext, vol: f32) {
        let t = ctx.current_time();

        if let Some((osc, gain)) = self.create_osc(ctx, 90.0, OscillatorType::Sine) {
            gain.gain().set_value_at_time(vol * 0.55, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + 0.3)
                .ok();
            osc.frequency().set_value_at_time(90.0, t).ok();
            osc.frequency()
                .exponential_ramp_to_value_at_time(40.0, t + 0.25)
                .ok();
            osc.start().ok();
            osc.stop_with_when(t + 0.35).ok();
        }

        if let Some((osc, gain)) = self.create_osc(ctx, 350.0, OscillatorType::Square) {
            gain.gain().set_value_at_time(vol * 0.2, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + 0.12)
                .ok();
            osc.start().ok();
            osc.stop_with_when(t + 0.15).ok();
        }
    }

    /// Fireball - crackling zap
    fn play_zap(&self, ctx: &AudioContext, vol: f32) {
        let Some((osc, gain)) = self.create_osc(ctx, 100.0, OscillatorType::Sawtooth) else {
            return;
        };
        let t = ctx.current_time();

        gain.gain().set_value_at_time(vol * 0.35, t).ok();
        gain.gain()
            .exponential_ramp_to_value_at_time(0.01, t + 0.2)
            .ok();
        osc.frequency().set_value_at_time(100.0, t).ok();
        osc.frequency().set_value_at_time(3000.0, t + 0.02).ok();
        osc.frequency().set_value_at_time(180.0, t + 0.04).ok();
        osc.frequency().set_value_at_time(2500.0, t + 0.06).ok();
        osc.frequency().set_value_at_time(120.0, t + 0.09).ok();
        osc.frequency().set_value_at_time(2000.0, t + 0.12).ok();
        osc.frequency().set_value_at_time(80.0, t + 0.16).ok();

        osc.start().ok();
        osc.stop_with_when(t + 0.22).ok();
    }

    /// Lightning - sparkly chime cascade
    fn play_sparkle(&self, ctx: &AudioContext, vol: f32) {
        for (i, freq) in [1200.0, 1800.0, 2400.0, 3200.0].iter().enumerate() {
            let delay = i as f64 * 0.03;
            if let Some((osc, gain)) = self.create_osc(ctx, *freq, OscillatorType::Sine) {
                let t = ctx.current_time() + delay;
                gain.gain().set_value_at_time(vol * 0.18, t).ok();
                gain.gain()
                    .exponential_ramp_to_value_at_time(0.01, t + 0.3)
                    .ok();
                osc.start_with_when(t).ok();
                osc.stop_with_when(t + 0.35).ok();
            }
        }
    }

    /// Catapult - full explosion
    fn play_boom(&self, ctx: &AudioContext, vol: f32) {
        let t = ctx.current_time();

        if let Some((osc, gain)) = self.create_osc(ctx, 100.0, OscillatorType::Sawtooth) {
            gain.gain().set_value_at_time(vol * 0.5, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + 0.4)
                .ok();
            osc.frequency().set_value_at_time(100.0, t).ok();
            osc.frequency()
                .exponential_ramp_to_value_at_time(30.0, t + 0.4)
                .ok();
            osc.start().ok();
            osc.stop_with_when(t + 0.5).ok();
        }

        if let Some((noise, gain)) = self.create_noise(ctx, 0.3) {
            gain.gain().set_value_at_time(vol * 0.35, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + 0.25)
                .ok();
            noise.start().ok();
        }
    }

    /// Bonus word revealed - rising arpeggio
    fn play_bonus_start(&self, ctx: &AudioContext, vol: f32) {
        for (i, freq) in [400.0, 500.0, 600.0, 800.0].iter().enumerate() {
            let delay = i as f64 * 0.08;
            if let Some((osc, gain)) = self.create_osc(ctx, *freq, OscillatorType::Triangle) {
                let t = ctx.current_time() + delay;
                gain.gain().set_value_at_time(vol * 0.25, t).ok();
                gain.gain()
                    .exponential_ramp_to_value_at_time(0.01, t + 0.2)
                    .ok();
                osc.start_with_when(t).ok();
                osc.stop_with_when(t + 0.25).ok();
            }
        }
    }

    /// Castle collapse - long low rumble
    fn play_rumble(&self, ctx: &AudioContext, vol: f32) {
        let t = ctx.current_time();

        if let Some((noise, gain)) = self.create_filtered_noise(ctx, 0.6, 150.0) {
            gain.gain().set_value_at_time(vol * 0.5, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + 0.55)
                .ok();
            noise.start().ok();
        }

        if let Some((osc, gain)) = self.create_osc(ctx, 45.0, OscillatorType::Sine) {
            gain.gain().set_value_at_time(vol * 0.35, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + 0.5)
                .ok();
            osc.start().ok();
            osc.stop_with_when(t + 0.6).ok();
        }
    }

    /// Game over - sad descending
    fn play_game_over(&self, ctx: &AudioContext, vol: f32) {
        for (i, freq) in [440.0, 330.0, 220.0].iter().enumerate() {
            let delay = i as f64 * 0.2;
            if let Some((osc, gain)) = self.create_osc(ctx, *freq, OscillatorType::Sine) {
                let t = ctx.current_time() + delay;
                gain.gain().set_value_at_time(vol * 0.3, t).ok();
                gain.gain()
                    .exponential_ramp_to_value_at_time(0.01, t + 0.3)
                    .ok();
                osc.start_with_when(t).ok();
                osc.stop_with_when(t + 0.4).ok();
            }
        }
    }
}
