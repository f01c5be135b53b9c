//! Reload throttling and job scheduling for directories and previews.
//!
//! This is the state machine `loader.c` implements in `loader_dir_reload` /
//! `schedule_dir_load` / `loader_dir_load_callback`, reproduced as closely
//! as a pure, testable FSM allows rather than simplified: a reload request
//! that arrives while a load is already in flight must be *coalesced*
//! (`next_requested_load` in the original) rather than dropped or used to
//! schedule a second concurrent load, and the gap between two load starts
//! for the same directory must never be shorter than `timeout`.

use std::time::{Duration, Instant};

/// Per-directory reload bookkeeping. One of these lives alongside each
/// cached `Dir`.
#[derive(Debug, Default)]
pub struct ReloadState {
    in_flight: bool,
    last_load_started: Option<Instant>,
    /// Set when a reload is requested while a load is in flight, or while
    /// one is already scheduled closer than the new request would need.
    /// Coalesces any number of requests into a single follow-up.
    pending: bool,
    scheduled_at: Option<Instant>,
}

impl ReloadState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight
    }

    /// Record a reload request arriving at `now`. Returns the instant the
    /// load should actually fire, or `None` if the request was coalesced
    /// into an in-flight load and there is nothing new to schedule.
    pub fn request(&mut self, now: Instant, timeout: Duration, delay: Duration) -> Option<Instant> {
        if self.in_flight {
            self.pending = true;
            return None;
        }

        // Never start two loads closer together than `timeout`.
        let earliest_allowed = match self.last_load_started {
            Some(started) => started + timeout,
            None => now,
        };
        // `delay` is a small debounce so a burst of inotify events collapses
        // into one reload instead of one per event.
        let target = earliest_allowed.max(now + delay);

        let deadline = match self.scheduled_at {
            Some(existing) => existing.max(target),
            None => target,
        };
        self.scheduled_at = Some(deadline);
        Some(deadline)
    }

    /// Is a scheduled (not yet in-flight) load due to fire at `now`?
    pub fn due(&self, now: Instant) -> bool {
        !self.in_flight && self.scheduled_at.is_some_and(|d| now >= d)
    }

    pub fn next_wakeup(&self) -> Option<Instant> {
        if self.in_flight {
            None
        } else {
            self.scheduled_at
        }
    }

    /// Mark the load as having started. Called right before submitting the
    /// worker job.
    pub fn start_load(&mut self, now: Instant) {
        self.in_flight = true;
        self.last_load_started = Some(now);
        self.scheduled_at = None;
    }

    /// Called when the worker result for this directory lands on the main
    /// thread. If a reload request was coalesced while the load was in
    /// flight, immediately re-enter the scheduling path (which will, in
    /// the common case, schedule the follow-up `timeout` after the load
    /// that just finished).
    pub fn finish_load(&mut self, now: Instant, timeout: Duration, delay: Duration) -> Option<Instant> {
        self.in_flight = false;
        if std::mem::take(&mut self.pending) {
            self.request(now, timeout, delay)
        } else {
            None
        }
    }

    /// Re-arm a pending (not in-flight) schedule at `now + timeout + delay`
    /// under new throttle settings, mirroring `loader_reschedule`'s role of
    /// re-applying a changed `inotify_timeout`/`inotify_delay` to timers
    /// that are already waiting to fire. A load already in flight is left
    /// alone; its own completion goes through `finish_load` as normal.
    pub fn reschedule(&mut self, now: Instant, timeout: Duration, delay: Duration) {
        if self.in_flight {
            return;
        }
        if self.scheduled_at.is_some() {
            self.scheduled_at = Some(now + timeout + delay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn p3_minimum_gap_between_load_starts() {
        let timeout = Duration::from_millis(1000);
        let delay = Duration::from_millis(50);
        let t0 = Instant::now();
        let mut state = ReloadState::new();

        let first = state.request(t0, timeout, delay).unwrap();
        assert!(first >= t0 + delay);
        state.start_load(first);

        // A second request arriving right after the first load starts
        // must not be allowed to fire before `timeout` has elapsed.
        let second_request_time = first + Duration::from_millis(10);
        let result = state.finish_load(first + Duration::from_millis(5), timeout, delay);
        assert!(result.is_none()); // nothing was pending

        let second = state.request(second_request_time, timeout, delay).unwrap();
        assert!(second >= first + timeout);
    }

    #[test]
    fn p4_request_during_flight_is_coalesced_not_dropped() {
        let timeout = Duration::from_millis(1000);
        let delay = Duration::from_millis(50);
        let t0 = Instant::now();
        let mut state = ReloadState::new();

        let first = state.request(t0, timeout, delay).unwrap();
        state.start_load(first);

        // request arrives mid-flight: must not schedule a second concurrent load
        let mid_flight = state.request(first + Duration::from_millis(100), timeout, delay);
        assert!(mid_flight.is_none());
        assert!(state.is_loading());

        // completing the load must surface the coalesced request as a new schedule
        let finish_time = first + Duration::from_millis(200);
        let follow_up = state.finish_load(finish_time, timeout, delay);
        assert!(follow_up.is_some());
        assert!(!state.is_loading());
    }

    #[test]
    fn no_pending_request_means_no_followup() {
        let timeout = Duration::from_millis(1000);
        let delay = Duration::from_millis(50);
        let t0 = Instant::now();
        let mut state = ReloadState::new();
        let first = state.request(t0, timeout, delay).unwrap();
        state.start_load(first);
        let follow_up = state.finish_load(first + Duration::from_millis(50), timeout, delay);
        assert!(follow_up.is_none());
    }

    #[test]
    fn due_is_false_before_deadline_and_true_after() {
        let timeout = Duration::from_millis(1000);
        let delay = Duration::from_millis(50);
        let t0 = Instant::now();
        let mut state = ReloadState::new();
        let deadline = state.request(t0, timeout, delay).unwrap();
        assert!(!state.due(deadline - Duration::from_millis(1)));
        assert!(state.due(deadline));
    }

    #[test]
    fn reschedule_moves_pending_deadline_out() {
        let timeout = Duration::from_millis(1000);
        let delay = Duration::from_millis(50);
        let t0 = Instant::now();
        let mut state = ReloadState::new();
        state.request(t0, timeout, delay).unwrap();

        let new_timeout = Duration::from_millis(5000);
        let new_delay = Duration::from_millis(200);
        state.reschedule(t0, new_timeout, new_delay);

        assert_eq!(state.next_wakeup(), Some(t0 + new_timeout + new_delay));
    }

    #[test]
    fn reschedule_is_a_no_op_while_in_flight() {
        let timeout = Duration::from_millis(1000);
        let delay = Duration::from_millis(50);
        let t0 = Instant::now();
        let mut state = ReloadState::new();
        let first = state.request(t0, timeout, delay).unwrap();
        state.start_load(first);

        state.reschedule(first, Duration::from_millis(5000), Duration::from_millis(200));
        assert!(state.is_loading());
        assert_eq!(state.next_wakeup(), None);
    }

    #[test]
    fn reschedule_is_a_no_op_with_nothing_pending() {
        let mut state = ReloadState::new();
        state.reschedule(Instant::now(), Duration::from_millis(1000), Duration::from_millis(50));
        assert_eq!(state.next_wakeup(), None);
    }
}
