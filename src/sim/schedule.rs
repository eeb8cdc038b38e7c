//! Scheduled-event queue keyed by simulation tick
//!
//! Delayed effects are queued with an absolute due tick and drained once
//! per tick by the game step. The tick counter stops while paused, so
//! pending events keep their remaining delay without any bookkeeping.

/// Handle for cancelling a scheduled event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerId(u32);

#[derive(Debug, Clone)]
struct Entry<E> {
    id: u32,
    due_tick: u64,
    event: E,
}

/// Due-tick event queue
#[derive(Debug, Clone)]
pub struct TimerQueue<E> {
    entries: Vec<Entry<E>>,
    next_id: u32,
}

impl<E> Default for TimerQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> TimerQueue<E> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
        }
    }

    /// Queue an event for the given absolute tick
    pub fn schedule(&mut self, due_tick: u64, event: E) -> TimerId {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(Entry {
            id,
            due_tick,
            event,
        });
        TimerId(id)
    }

    /// Drop a pending event; returns false if it already fired
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id.0);
        self.entries.len() != before
    }

    /// Ticks left before the event fires (None once fired or cancelled)
    pub fn remaining(&self, id: TimerId, now: u64) -> Option<u64> {
        self.entries
            .iter()
            .find(|e| e.id == id.0)
            .map(|e| e.due_tick.saturating_sub(now))
    }

    /// Move every event due at or before `now` into `out`, earliest first
    pub fn drain_due(&mut self, now: u64, out: &mut Vec<E>) {
        if self.entries.iter().all(|e| e.due_tick > now) {
            return;
        }
        let mut due: Vec<Entry<E>> = Vec::new();
        let mut rest: Vec<Entry<E>> = Vec::new();
        for entry in self.entries.drain(..) {
            if entry.due_tick <= now {
                due.push(entry);
            } else {
                rest.push(entry);
            }
        }
        // Same-tick events fire in scheduling order
        due.sort_by_key(|e| (e.due_tick, e.id));
        out.extend(due.into_iter().map(|e| e.event));
        self.entries = rest;
    }

    /// Drop everything; screen switches must not leave stale callbacks
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_only_at_due_tick() {
        let mut q: TimerQueue<&str> = TimerQueue::new();
        q.schedule(10, "late");
        let mut out = Vec::new();
        q.drain_due(9, &mut out);
        assert!(out.is_empty());
        q.drain_due(10, &mut out);
        assert_eq!(out, vec!["late"]);
        assert!(q.is_empty());
    }

    #[test]
    fn test_drain_orders_by_due_then_schedule() {
        let mut q: TimerQueue<u32> = TimerQueue::new();
        q.schedule(5, 2);
        q.schedule(3, 1);
        q.schedule(5, 3);
        let mut out = Vec::new();
        q.drain_due(100, &mut out);
        assert_eq!(out, vec![1, 2, 3]);
    }

    #[test]
    fn test_cancel_prevents_fire() {
        let mut q: TimerQueue<&str> = TimerQueue::new();
        let keep = q.schedule(4, "keep");
        let drop = q.schedule(4, "drop");
        assert!(q.cancel(drop));
        assert!(!q.cancel(drop));
        let mut out = Vec::new();
        q.drain_due(4, &mut out);
        assert_eq!(out, vec!["keep"]);
        assert!(q.remaining(keep, 0).is_none());
    }

    #[test]
    fn test_remaining_counts_down() {
        let mut q: TimerQueue<()> = TimerQueue::new();
        let id = q.schedule(30, ());
        assert_eq!(q.remaining(id, 0), Some(30));
        assert_eq!(q.remaining(id, 12), Some(18));
        assert_eq!(q.remaining(id, 40), Some(0));
    }

    #[test]
    fn test_clear_drops_all() {
        let mut q: TimerQueue<u32> = TimerQueue::new();
        q.schedule(1, 1);
        q.schedule(2, 2);
        q.clear();
        let mut out = Vec::new();
        q.drain_due(100, &mut out);
        assert!(out.is_empty());
        assert_eq!(q.len(), 0);
    }
}
