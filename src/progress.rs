//! Player progress: the star bank and unlocked gear
//!
//! Persisted to LocalStorage. Both games pay finished sessions into the
//! same bank; the castle shop spends from it.

use serde::{Deserialize, Serialize};

use crate::sim::weapon_index;

/// Everyone starts with the brick
pub const STARTER_ITEM: &str = "brick";

/// Persistent player progress
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    /// Stars banked across all finished sessions
    pub total_stars: u32,
    /// Ids of purchased gear
    pub owned_items: Vec<String>,
    /// Currently equipped gear id
    pub selected_item: String,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            total_stars: 0,
            owned_items: vec![STARTER_ITEM.to_string()],
            selected_item: STARTER_ITEM.to_string(),
        }
    }
}

impl Progress {
    /// LocalStorage key (used only in wasm32)
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "type_rally_progress";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn owns(&self, id: &str) -> bool {
        self.owned_items.iter().any(|i| i == id)
    }

    /// Index into the weapon catalog for the equipped gear
    pub fn selected_weapon(&self) -> usize {
        weapon_index(&self.selected_item).unwrap_or(0)
    }

    /// Bank a finished session's score
    pub fn add_stars(&mut self, stars: u32) {
        self.total_stars = self.total_stars.saturating_add(stars);
    }

    /// Buy and equip gear. Owned gear re-selects for free; returns
    /// false (and changes nothing) when the bank can't cover the cost.
    pub fn purchase(&mut self, id: &str, cost: u32) -> bool {
        if self.owns(id) {
            self.selected_item = id.to_string();
            return true;
        }
        if cost > self.total_stars {
            return false;
        }
        self.total_stars -= cost;
        self.owned_items.push(id.to_string());
        self.selected_item = id.to_string();
        true
    }

    /// Equip owned gear; rejects anything not yet purchased
    pub fn select(&mut self, id: &str) -> bool {
        if self.owns(id) {
            self.selected_item = id.to_string();
            true
        } else {
            false
        }
    }

    /// Load progress from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                if let Ok(progress) = serde_json::from_str::<Progress>(&json) {
                    log::info!(
                        "Loaded progress: {} stars, {} items",
                        progress.total_stars,
                        progress.owned_items.len()
                    );
                    return progress;
                }
            }
        }

        log::info!("No progress found, starting fresh");
        Self::new()
    }

    /// Save progress to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Progress saved ({} stars)", self.total_stars);
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::new()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_owns_starter() {
        let progress = Progress::new();
        assert!(progress.owns(STARTER_ITEM));
        assert_eq!(progress.selected_item, STARTER_ITEM);
        assert_eq!(progress.selected_weapon(), 0);
    }

    #[test]
    fn test_purchase_unaffordable_rejected() {
        let mut progress = Progress::new();
        progress.add_stars(40);
        assert!(!progress.purchase("slingshot", 50));
        assert_eq!(progress.total_stars, 40);
        assert!(!progress.owns("slingshot"));
        assert_eq!(progress.selected_item, STARTER_ITEM);
    }

    #[test]
    fn test_purchase_deducts_and_selects() {
        let mut progress = Progress::new();
        progress.add_stars(120);
        assert!(progress.purchase("tomato", 100));
        assert_eq!(progress.total_stars, 20);
        assert!(progress.owns("tomato"));
        assert_eq!(progress.selected_item, "tomato");
    }

    #[test]
    fn test_repurchase_is_free_reselect() {
        let mut progress = Progress::new();
        progress.add_stars(60);
        assert!(progress.purchase("slingshot", 50));
        assert!(progress.select(STARTER_ITEM));
        assert!(progress.purchase("slingshot", 50));
        assert_eq!(progress.total_stars, 10);
        assert_eq!(progress.selected_item, "slingshot");
        assert_eq!(progress.owned_items.len(), 2);
    }

    #[test]
    fn test_select_unowned_rejected() {
        let mut progress = Progress::new();
        assert!(!progress.select("catapult"));
        assert_eq!(progress.selected_item, STARTER_ITEM);
    }

    #[test]
    fn test_add_stars_saturates() {
        let mut progress = Progress::new();
        progress.add_stars(u32::MAX);
        progress.add_stars(10);
        assert_eq!(progress.total_stars, u32::MAX);
    }
}
