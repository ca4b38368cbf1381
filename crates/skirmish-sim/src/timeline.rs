//! The event timeline: pending actions ordered by apparition time.
//!
//! Events are kept sorted by `(apparition_time, owner, insertion order)`
//! and drained through a watermark: each tick takes every not-yet-drained
//! event whose apparition time has been reached, exactly once. Drained
//! events are retained -- rollback re-simulation rewinds the watermark
//! and drains them again.
//!
//! An event whose apparition time is at or behind the watermark arrived
//! [`Late`](Admission::Late): the tick it belonged to has already been
//! simulated, and the caller must roll the board back before the event
//! can take effect.

use crate::event::GameEvent;

// ---------------------------------------------------------------------------
// Admission
// ---------------------------------------------------------------------------

/// The verdict of [`Timeline::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The event's apparition time is still ahead of the drain watermark;
    /// it will be drained in due course.
    Scheduled,
    /// The event's apparition time was already passed; the caller must
    /// rewind and re-simulate for it to take effect.
    Late,
}

// ---------------------------------------------------------------------------
// Timeline
// ---------------------------------------------------------------------------

/// Ordered set of events keyed by apparition time, with a drain watermark.
#[derive(Debug, Clone)]
pub struct Timeline {
    /// All known events, sorted by `(apparition_time, owner)` with equal
    /// keys in insertion order.
    events: Vec<GameEvent>,
    /// Index of the first event not yet drained. Invariant: everything
    /// before the cursor has `apparition_time <= drained_up_to`, and
    /// everything at or after it sorts later.
    cursor: usize,
    /// The simulation time up to which events have been drained.
    drained_up_to: f64,
}

impl Default for Timeline {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            cursor: 0,
            drained_up_to: f64::NEG_INFINITY,
        }
    }
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an event, keeping the ordering. Duplicates are not detected
    /// here; the peer layer suppresses them by event identity.
    pub fn add(&mut self, event: GameEvent) -> Admission {
        let apparition = event.apparition_time();
        // First index whose key sorts strictly after the new event; equal
        // keys stay ahead of it, preserving insertion order.
        let idx = self.events.partition_point(|e| {
            match e.apparition_time().total_cmp(&apparition) {
                std::cmp::Ordering::Less => true,
                std::cmp::Ordering::Equal => e.owner <= event.owner,
                std::cmp::Ordering::Greater => false,
            }
        });
        self.events.insert(idx, event);

        if apparition <= self.drained_up_to {
            // The event sorts inside the already-drained region, so the
            // cursor shifts to keep pointing at the first pending event.
            debug_assert!(idx <= self.cursor);
            self.cursor += 1;
            Admission::Late
        } else {
            Admission::Scheduled
        }
    }

    /// Take every not-yet-drained event with `apparition_time <= until`,
    /// in timeline order, advancing the watermark. Across a run of ticks
    /// the total drained equals the events added with apparition at or
    /// before the last tick's time -- nothing is skipped or repeated.
    pub fn drain_due(&mut self, until: f64) -> Vec<GameEvent> {
        let end = self.cursor
            + self.events[self.cursor..]
                .partition_point(|e| e.apparition_time() <= until);
        let due = self.events[self.cursor..end].to_vec();
        self.cursor = end;
        self.drained_up_to = self.drained_up_to.max(until);
        due
    }

    /// Events with apparition time inside `[start, end]`, drained or not.
    pub fn events_in_range(&self, start: f64, end: f64) -> Vec<GameEvent> {
        self.events
            .iter()
            .filter(|e| {
                let t = e.apparition_time();
                start <= t && t <= end
            })
            .cloned()
            .collect()
    }

    /// Move the watermark back to `t`, so a rolled-back board re-drains
    /// everything later than its checkpoint.
    pub fn rewind(&mut self, t: f64) {
        self.cursor = self.events.partition_point(|e| e.apparition_time() <= t);
        self.drained_up_to = t;
    }

    /// Number of events not yet drained.
    pub fn pending(&self) -> usize {
        self.events.len() - self.cursor
    }

    /// Total number of events known to the timeline.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::UnitKind;
    use crate::grid::Cell;
    use crate::player::PlayerId;

    fn spawn_at(timestamp: f64, owner: PlayerId) -> GameEvent {
        GameEvent::spawn_unit(UnitKind::Knight, Cell::new(3, 8), owner, timestamp)
    }

    // -- 1. Ordering ----------------------------------------------------------

    #[test]
    fn events_sort_by_apparition_time() {
        let mut tl = Timeline::new();
        tl.add(spawn_at(3.0, PlayerId::One));
        tl.add(spawn_at(1.0, PlayerId::One));
        tl.add(spawn_at(2.0, PlayerId::One));

        let due = tl.drain_due(10.0);
        let times: Vec<f64> = due.iter().map(|e| e.timestamp).collect();
        assert_eq!(times, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn equal_times_break_by_owner_then_insertion() {
        let mut tl = Timeline::new();
        let a = spawn_at(1.0, PlayerId::Two);
        let b = spawn_at(1.0, PlayerId::One);
        let mut c = spawn_at(1.0, PlayerId::Two);
        c.kind = crate::event::EventKind::SpawnUnit {
            unit: UnitKind::Wizard,
            cell: Cell::new(5, 20),
        };
        tl.add(a.clone());
        tl.add(b.clone());
        tl.add(c.clone());

        let due = tl.drain_due(10.0);
        assert_eq!(due[0], b, "player 1 drains first on equal times");
        assert_eq!(due[1], a, "equal keys keep insertion order");
        assert_eq!(due[2], c);
    }

    // -- 2. Drain watermark -----------------------------------------------------

    #[test]
    fn drain_is_exhaustive_and_non_repeating() {
        let mut tl = Timeline::new();
        for i in 0..50 {
            tl.add(spawn_at(i as f64 * 0.1, PlayerId::One));
        }

        let mut drained = 0;
        let dt = 1.0 / 25.0;
        let mut now = 0.0;
        for _ in 0..200 {
            now += dt;
            drained += tl.drain_due(now).len();
        }
        // Last apparition is 4.9 + 0.2 = 5.1 <= 8.0; everything drained
        // exactly once.
        assert_eq!(drained, 50);
        assert_eq!(tl.pending(), 0);
        assert_eq!(tl.len(), 50, "drained events are retained");
    }

    #[test]
    fn drain_respects_apparition_not_origin() {
        let mut tl = Timeline::new();
        tl.add(spawn_at(1.0, PlayerId::One)); // apparition 1.2
        assert!(tl.drain_due(1.0).is_empty());
        assert!(tl.drain_due(1.19).is_empty());
        assert_eq!(tl.drain_due(1.21).len(), 1);
    }

    // -- 3. Late detection -------------------------------------------------------

    #[test]
    fn apparition_behind_the_watermark_is_late() {
        let mut tl = Timeline::new();
        tl.add(spawn_at(1.0, PlayerId::One));
        tl.drain_due(2.0);

        assert_eq!(tl.add(spawn_at(0.5, PlayerId::Two)), Admission::Late);
        assert_eq!(tl.add(spawn_at(3.0, PlayerId::Two)), Admission::Scheduled);
    }

    #[test]
    fn lateness_does_not_need_prior_events() {
        // The timeline has drained nothing but time has passed; a stale
        // event is still late.
        let mut tl = Timeline::new();
        tl.drain_due(3.0);
        assert_eq!(tl.add(spawn_at(0.5, PlayerId::Two)), Admission::Late);
        assert_eq!(tl.pending(), 0, "late events are not drained normally");
    }

    #[test]
    fn late_insert_does_not_disturb_pending_events() {
        let mut tl = Timeline::new();
        tl.add(spawn_at(1.0, PlayerId::One));
        tl.add(spawn_at(5.0, PlayerId::One));
        tl.drain_due(2.0);

        tl.add(spawn_at(0.5, PlayerId::Two));
        // The pending event at 5.2 is still drained on time.
        let due = tl.drain_due(6.0);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].timestamp, 5.0);
    }

    #[test]
    fn fresh_timeline_schedules_everything() {
        let mut tl = Timeline::new();
        assert_eq!(tl.add(spawn_at(0.0, PlayerId::One)), Admission::Scheduled);
    }

    // -- 4. Rewind ----------------------------------------------------------------

    #[test]
    fn rewind_re_drains_later_events() {
        let mut tl = Timeline::new();
        tl.add(spawn_at(1.0, PlayerId::One)); // apparition 1.2
        tl.add(spawn_at(2.0, PlayerId::One)); // apparition 2.2
        tl.drain_due(3.0);
        assert_eq!(tl.pending(), 0);

        tl.rewind(1.5);
        assert_eq!(tl.pending(), 1);
        let due = tl.drain_due(3.0);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].timestamp, 2.0);
    }

    #[test]
    fn rewind_then_late_event_drains_in_order() {
        let mut tl = Timeline::new();
        tl.add(spawn_at(2.0, PlayerId::One));
        tl.drain_due(3.0);

        // A late event lands at apparition 1.2; rewinding to 1.0 replays
        // both in apparition order.
        assert_eq!(tl.add(spawn_at(1.0, PlayerId::Two)), Admission::Late);
        tl.rewind(1.0);
        let due = tl.drain_due(3.0);
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].timestamp, 1.0);
        assert_eq!(due[1].timestamp, 2.0);
    }

    // -- 5. Range queries ----------------------------------------------------------

    #[test]
    fn range_query_is_inclusive_and_nondestructive() {
        let mut tl = Timeline::new();
        tl.add(spawn_at(1.0, PlayerId::One)); // apparition 1.2
        tl.add(spawn_at(2.0, PlayerId::One)); // apparition 2.2

        let hits = tl.events_in_range(1.2, 2.2);
        assert_eq!(hits.len(), 2);
        assert_eq!(tl.pending(), 2);
    }
}
