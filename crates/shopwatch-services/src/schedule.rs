use std::time::{Duration, Instant};

/// Periodic dashboard refresh plus an optional one-shot refresh (used after
/// an order is placed). Independent of the active tab.
#[derive(Debug, Clone)]
pub struct RefreshSchedule {
    interval: Duration,
    next_periodic: Instant,
    one_shot: Option<Instant>,
}

impl RefreshSchedule {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            next_periodic: now + interval,
            one_shot: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Requests a refresh `delay` from `now`. A later request replaces an
    /// earlier pending one.
    pub fn refresh_after(&mut self, delay: Duration, now: Instant) {
        self.one_shot = Some(now + delay);
    }

    /// True when a refresh is due at `now`; consumes whatever fired.
    pub fn due(&mut self, now: Instant) -> bool {
        let mut fired = false;

        if now >= self.next_periodic {
            self.next_periodic = now + self.interval;
            fired = true;
        }
        if self.one_shot.is_some_and(|at| now >= at) {
            self.one_shot = None;
            fired = true;
        }
        fired
    }

    /// Time until the next refresh could fire.
    pub fn time_until_next(&self, now: Instant) -> Duration {
        let next = match self.one_shot {
            Some(at) => at.min(self.next_periodic),
            None => self.next_periodic,
        };
        next.saturating_duration_since(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_periodic_refresh() {
        let start = Instant::now();
        let mut schedule = RefreshSchedule::new(Duration::from_secs(30), start);

        assert!(!schedule.due(start + Duration::from_secs(29)));
        assert!(schedule.due(start + Duration::from_secs(30)));
        // Re-armed from the moment it fired.
        assert!(!schedule.due(start + Duration::from_secs(31)));
        assert!(schedule.due(start + Duration::from_secs(60)));
    }

    #[test]
    fn test_one_shot_fires_once() {
        let start = Instant::now();
        let mut schedule = RefreshSchedule::new(Duration::from_secs(30), start);
        schedule.refresh_after(Duration::from_secs(1), start);

        assert_eq!(schedule.time_until_next(start), Duration::from_secs(1));
        assert!(!schedule.due(start + Duration::from_millis(500)));
        assert!(schedule.due(start + Duration::from_secs(1)));
        assert!(!schedule.due(start + Duration::from_secs(2)));
        assert_eq!(
            schedule.time_until_next(start + Duration::from_secs(2)),
            Duration::from_secs(28)
        );
    }
}
