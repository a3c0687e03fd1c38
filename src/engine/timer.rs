use std::time::{Duration, Instant};

/// Timers the quiz session schedules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// No correct answer within the failure timeout.
    FailureTimeout,
    /// Upper bound on waiting for the speech-end event.
    SpeechFallback,
    /// Minimum time a solved character stays on screen.
    MinimumDwell,
    /// Gap between the old character leaving and the next one appearing.
    Settle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Timer {
    kind: TimerKind,
    generation: u64,
    deadline: Instant,
}

/// Cancelable deadlines, each tagged with the generation that scheduled it.
///
/// `reset` drops everything and moves to a new generation; `expire` only
/// yields timers of the current generation, so a timer scheduled for a
/// superseded session can never fire.
#[derive(Debug, Default)]
pub struct TimerQueue {
    generation: u64,
    timers: Vec<Timer>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Cancel every timer and start a new generation. Returns the new generation.
    pub fn reset(&mut self) -> u64 {
        self.timers.clear();
        self.generation += 1;
        self.generation
    }

    /// Schedule (or reschedule) a timer of this kind.
    pub fn schedule(&mut self, kind: TimerKind, now: Instant, delay: Duration) {
        self.cancel(kind);
        self.timers.push(Timer {
            kind,
            generation: self.generation,
            deadline: now + delay,
        });
    }

    pub fn cancel(&mut self, kind: TimerKind) {
        self.timers.retain(|t| t.kind != kind);
    }

    pub fn is_pending(&self, kind: TimerKind) -> bool {
        self.timers.iter().any(|t| t.kind == kind)
    }

    pub fn deadline(&self, kind: TimerKind) -> Option<Instant> {
        self.timers
            .iter()
            .find(|t| t.kind == kind)
            .map(|t| t.deadline)
    }

    /// Remove and return the timers due at `now`, earliest first.
    pub fn expire(&mut self, now: Instant) -> Vec<TimerKind> {
        let generation = self.generation;
        let mut due: Vec<Timer> = Vec::new();
        self.timers.retain(|t| {
            if t.deadline <= now {
                due.push(*t);
                false
            } else {
                true
            }
        });
        due.sort_by_key(|t| t.deadline);
        due.into_iter()
            .filter(|t| t.generation == generation)
            .map(|t| t.kind)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expire_returns_only_due_timers() {
        let t0 = Instant::now();
        let mut queue = TimerQueue::new();
        queue.schedule(TimerKind::MinimumDwell, t0, Duration::from_secs(1));
        queue.schedule(TimerKind::FailureTimeout, t0, Duration::from_secs(15));

        assert!(queue.expire(t0 + Duration::from_millis(999)).is_empty());
        assert_eq!(
            queue.expire(t0 + Duration::from_secs(1)),
            vec![TimerKind::MinimumDwell]
        );
        assert!(!queue.is_pending(TimerKind::MinimumDwell));
        assert!(queue.is_pending(TimerKind::FailureTimeout));
    }

    #[test]
    fn test_expire_orders_by_deadline() {
        let t0 = Instant::now();
        let mut queue = TimerQueue::new();
        queue.schedule(TimerKind::Settle, t0, Duration::from_millis(800));
        queue.schedule(TimerKind::SpeechFallback, t0, Duration::from_millis(200));
        assert_eq!(
            queue.expire(t0 + Duration::from_secs(1)),
            vec![TimerKind::SpeechFallback, TimerKind::Settle]
        );
    }

    #[test]
    fn test_schedule_replaces_same_kind() {
        let t0 = Instant::now();
        let mut queue = TimerQueue::new();
        queue.schedule(TimerKind::FailureTimeout, t0, Duration::from_secs(15));
        queue.schedule(TimerKind::FailureTimeout, t0, Duration::from_secs(30));
        assert!(queue.expire(t0 + Duration::from_secs(20)).is_empty());
        assert_eq!(
            queue.deadline(TimerKind::FailureTimeout),
            Some(t0 + Duration::from_secs(30))
        );
    }

    #[test]
    fn test_reset_cancels_everything() {
        let t0 = Instant::now();
        let mut queue = TimerQueue::new();
        queue.schedule(TimerKind::FailureTimeout, t0, Duration::from_secs(15));
        let before = queue.generation();
        assert_eq!(queue.reset(), before + 1);
        assert!(!queue.is_pending(TimerKind::FailureTimeout));
        assert!(queue.expire(t0 + Duration::from_secs(60)).is_empty());
    }

    #[test]
    fn test_cancel() {
        let t0 = Instant::now();
        let mut queue = TimerQueue::new();
        queue.schedule(TimerKind::FailureTimeout, t0, Duration::from_secs(15));
        queue.cancel(TimerKind::FailureTimeout);
        assert!(queue.expire(t0 + Duration::from_secs(15)).is_empty());
    }
}
