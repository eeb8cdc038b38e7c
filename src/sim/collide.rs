//! Hit resolution: typed-character matching and lane overlap
//!
//! Pure functions over the entity set so eligibility rules are testable
//! without a running session.

use super::state::{Item, ItemKind, Rect};
use crate::consts::*;

/// Vertical window in which stars may be collected
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollectBand {
    pub top: f32,
    pub bottom: f32,
}

impl CollectBand {
    pub fn contains(&self, y: f32) -> bool {
        y >= self.top && y <= self.bottom
    }
}

/// Case-insensitive character match
pub fn char_matches(target: char, pressed: char) -> bool {
    target.eq_ignore_ascii_case(&pressed)
}

/// Index of the star the keypress collects, if any.
///
/// Eligible stars sit inside the band, match the pressed character and,
/// when a lane is given, share it with the car. Among several matches
/// the one closest to the car wins, independent of storage order.
pub fn best_star(
    items: &[Item],
    pressed: char,
    lane: Option<u8>,
    band: CollectBand,
    car_center_y: f32,
) -> Option<usize> {
    items
        .iter()
        .enumerate()
        .filter(|(_, item)| item.kind == ItemKind::Star)
        .filter(|(_, item)| band.contains(item.center_y()))
        .filter(|(_, item)| lane.is_none_or(|l| item.lane == l))
        .filter(|(_, item)| item.ch.is_some_and(|c| char_matches(c, pressed)))
        .min_by(|(_, a), (_, b)| {
            let da = (a.center_y() - car_center_y).abs();
            let db = (b.center_y() - car_center_y).abs();
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
}

/// Car footprint centered on its smoothed x position
pub fn car_rect(car_x: f32) -> Rect {
    Rect::new(car_x - CAR_WIDTH / 2.0, CAR_TOP, CAR_WIDTH, CAR_HEIGHT)
}

/// First obstacle overlapping the car in its lane
pub fn obstacle_hit(items: &[Item], car_lane: u8, car_x: f32) -> Option<usize> {
    let car = car_rect(car_x);
    items.iter().position(|item| {
        item.kind == ItemKind::Obstacle && item.lane == car_lane && item.rect().overlaps(&car)
    })
}
