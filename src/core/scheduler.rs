//! Display-frame scheduling.
//!
//! The playback loop never owns a clock. It asks a [`FrameScheduler`] for
//! "the next display refresh" and gets a [`FrameToken`] back. The host
//! (window loop, test, headless runner) reports refreshes with
//! [`FrameScheduler::take_due`]; the token it returns is what the controller
//! ticks with. Cancelling a token guarantees `take_due` never returns it.

/// Handle of one pending frame request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameToken(u64);

impl FrameToken {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Source of display-frame callbacks.
pub trait FrameScheduler {
    /// Request one callback at the next display refresh.
    ///
    /// At most one request is pending; a new request replaces the old one.
    fn schedule_next_frame(&mut self) -> FrameToken;

    /// Drop a request. No-op for tokens that already fired or were replaced.
    fn cancel(&mut self, token: FrameToken);

    /// Host side: a display refresh happened at `now` (ms). Returns the
    /// pending request it satisfies, consuming it.
    fn take_due(&mut self, now: f64) -> Option<FrameToken>;

    /// Whether a request is outstanding.
    fn is_pending(&self) -> bool;
}

/// Scheduler that fires on every reported refresh. Used by tests and by hosts
/// that already run at display rate.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    pending: Option<FrameToken>,
    next_id: u64,
    scheduled: usize,
    cancelled: usize,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total requests made so far.
    pub fn scheduled(&self) -> usize {
        self.scheduled
    }

    /// Total effective cancellations.
    pub fn cancelled(&self) -> usize {
        self.cancelled
    }
}

impl FrameScheduler for ManualScheduler {
    fn schedule_next_frame(&mut self) -> FrameToken {
        self.next_id += 1;
        self.scheduled += 1;
        let token = FrameToken(self.next_id);
        self.pending = Some(token);
        token
    }

    fn cancel(&mut self, token: FrameToken) {
        if self.pending == Some(token) {
            self.pending = None;
            self.cancelled += 1;
        }
    }

    fn take_due(&mut self, _now: f64) -> Option<FrameToken> {
        self.pending.take()
    }

    fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// Scheduler pacing refreshes at a fixed rate. Refreshes reported earlier
/// than one interval after the previous fire are ignored.
#[derive(Debug)]
pub struct IntervalScheduler {
    interval_ms: f64,
    pending: Option<FrameToken>,
    last_fire: Option<f64>,
    next_id: u64,
}

impl IntervalScheduler {
    /// `fps <= 0` falls back to 60.
    pub fn new(fps: f64) -> Self {
        let fps = if fps.is_finite() && fps > 0.0 { fps } else { 60.0 };
        Self {
            interval_ms: 1000.0 / fps,
            pending: None,
            last_fire: None,
            next_id: 0,
        }
    }

    pub fn interval_ms(&self) -> f64 {
        self.interval_ms
    }
}

impl FrameScheduler for IntervalScheduler {
    fn schedule_next_frame(&mut self) -> FrameToken {
        self.next_id += 1;
        let token = FrameToken(self.next_id);
        self.pending = Some(token);
        token
    }

    fn cancel(&mut self, token: FrameToken) {
        if self.pending == Some(token) {
            self.pending = None;
        }
    }

    fn take_due(&mut self, now: f64) -> Option<FrameToken> {
        self.pending?;
        // Half a millisecond of slack for timer jitter
        if let Some(last) = self.last_fire
            && now - last < self.interval_ms - 0.5
        {
            return None;
        }
        self.last_fire = Some(now);
        self.pending.take()
    }

    fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_fires_once() {
        let mut s = ManualScheduler::new();
        let t = s.schedule_next_frame();
        assert_eq!(s.take_due(0.0), Some(t));
        assert_eq!(s.take_due(16.0), None);
    }

    #[test]
    fn test_cancel_before_fire() {
        let mut s = ManualScheduler::new();
        let t = s.schedule_next_frame();
        s.cancel(t);
        assert!(!s.is_pending());
        assert_eq!(s.take_due(0.0), None);
        assert_eq!(s.cancelled(), 1);
    }

    #[test]
    fn test_stale_cancel_ignored() {
        let mut s = ManualScheduler::new();
        let old = s.schedule_next_frame();
        let new = s.schedule_next_frame();
        s.cancel(old);
        assert_eq!(s.take_due(0.0), Some(new));
        assert_eq!(s.cancelled(), 0);
    }

    #[test]
    fn test_interval_paces() {
        let mut s = IntervalScheduler::new(50.0); // 20ms
        s.schedule_next_frame();
        assert!(s.take_due(0.0).is_some());
        s.schedule_next_frame();
        assert!(s.take_due(10.0).is_none());
        assert!(s.is_pending());
        assert!(s.take_due(20.0).is_some());
    }
}
