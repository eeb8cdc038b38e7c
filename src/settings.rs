//! Game settings and preferences
//!
//! Persisted separately from player progress in LocalStorage.

use serde::{Deserialize, Serialize};

use crate::sim::{CharSet, ControlMode, RacerConfig, SpawnPolicy, SpeedLevel};

/// Game settings/preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    // === Audio ===
    /// Sound effects on/off
    pub sound_enabled: bool,
    /// Speak collected letters aloud
    pub speech_enabled: bool,
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Mute when the window loses focus
    pub mute_on_blur: bool,

    // === Road game ===
    /// Fall speed and spawn rate preset
    pub speed_level: SpeedLevel,
    /// Lane keys steer, or the car chases typed stars
    pub control: ControlMode,
    /// Which characters appear on stars
    pub char_set: CharSet,
    /// Timed rolls or minimum-gap spacing
    pub spawn_policy: SpawnPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            // Audio - everything on, slightly below full volume
            sound_enabled: true,
            speech_enabled: true,
            master_volume: 0.8,
            mute_on_blur: true,

            // Road game
            speed_level: SpeedLevel::default(),
            control: ControlMode::default(),
            char_set: CharSet::default(),
            spawn_policy: SpawnPolicy::default(),
        }
    }
}

impl Settings {
    /// Road-game configuration snapshot for a new session
    pub fn racer_config(&self) -> RacerConfig {
        RacerConfig {
            control: self.control,
            chars: self.char_set,
            policy: self.spawn_policy,
            speed: self.speed_level,
        }
    }

    /// Whether letters should be spoken aloud
    pub fn effective_speech(&self) -> bool {
        self.sound_enabled && self.speech_enabled
    }

    /// LocalStorage key (used only in wasm32)
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "type_rally_settings";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                if let Ok(settings) = serde_json::from_str(&json) {
                    log::info!("Loaded settings from LocalStorage");
                    return settings;
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Settings saved");
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}
