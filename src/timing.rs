use std::time::{Duration, Instant};

use tracing::debug;

/// Fires once per transition interval, measured on the monotonic clock.
///
/// The baseline moves forward by whole intervals, never to "now", so the
/// cadence does not slip when frames arrive late. A stall that spans
/// several intervals produces a single transition.
pub struct TransitionTimer {
    interval: Duration,
    baseline: Instant,
}

impl TransitionTimer {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            baseline: now,
        }
    }

    /// True on the first poll where at least one interval has elapsed.
    /// Missed intervals are not replayed: one poll never owes a second
    /// transition for the same stall.
    pub fn poll(&mut self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.baseline);
        if elapsed < self.interval {
            return false;
        }

        let periods = elapsed.as_nanos() / self.interval.as_nanos().max(1);
        let periods = u32::try_from(periods).unwrap_or(u32::MAX);
        if periods > 1 {
            debug!(missed = periods - 1, "transition timer fell behind");
        }
        self.baseline = self
            .baseline
            .checked_add(self.interval.saturating_mul(periods))
            .unwrap_or(now);
        true
    }

    /// Start a fresh interval at `now`.
    pub fn restart(&mut self, now: Instant) {
        self.baseline = now;
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Fixed timestep: turns elapsed frame time into whole simulation ticks so
/// drift speed does not depend on the frame rate.
pub struct TickPacer {
    step: Duration,
    last: Instant,
    carry: Duration,
    max_ticks: u32,
}

impl TickPacer {
    pub fn new(tick_rate: u32, max_ticks: u32, now: Instant) -> Self {
        Self {
            step: Duration::from_secs(1) / tick_rate.max(1),
            last: now,
            carry: Duration::ZERO,
            max_ticks,
        }
    }

    /// Ticks to run for the frame at `now`. The remainder carries over.
    pub fn ticks(&mut self, now: Instant) -> u32 {
        self.carry += now.saturating_duration_since(self.last);
        self.last = self.last.max(now);

        let due = self.carry.as_nanos() / self.step.as_nanos().max(1);
        if due > u128::from(self.max_ticks) {
            debug!(due = %due, max = self.max_ticks, "dropping tick backlog");
            self.carry = Duration::ZERO;
            return self.max_ticks;
        }

        let due = due as u32;
        self.carry -= self.step * due;
        due
    }

    pub fn step(&self) -> Duration {
        self.step
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    fn count_transitions(ticks_ms: &[u64]) -> Vec<u64> {
        let start = Instant::now();
        let mut timer = TransitionTimer::new(Duration::from_secs(2), start);
        ticks_ms
            .iter()
            .copied()
            .filter(|&t| timer.poll(start + ms(t)))
            .collect()
    }

    #[test]
    fn fires_once_on_a_tick_exactly_at_the_interval() {
        let fired = count_transitions(&[0, 500, 1000, 1500, 2000, 2100]);
        assert_eq!(fired, vec![2000]);
    }

    #[test]
    fn fires_once_on_the_first_tick_past_the_interval() {
        let fired = count_transitions(&[0, 500, 1000, 1500, 1999, 2100]);
        assert_eq!(fired, vec![2100]);
    }

    #[test]
    fn late_tick_keeps_the_cadence() {
        let start = Instant::now();
        let mut timer = TransitionTimer::new(Duration::from_secs(2), start);

        assert!(timer.poll(start + ms(2300)));
        // Baseline moved to 2.0s, not 2.3s: the next one is due at 4.0s.
        assert!(!timer.poll(start + ms(3900)));
        assert!(timer.poll(start + ms(4000)));
    }

    #[test]
    fn long_stall_fires_once_and_realigns() {
        let start = Instant::now();
        let mut timer = TransitionTimer::new(Duration::from_secs(2), start);

        assert!(timer.poll(start + ms(7500)));
        assert!(!timer.poll(start + ms(7600)));
        assert!(timer.poll(start + ms(8000)));
    }

    #[test]
    fn restart_rebases_the_interval() {
        let start = Instant::now();
        let mut timer = TransitionTimer::new(Duration::from_secs(2), start);

        timer.restart(start + ms(1500));
        assert!(!timer.poll(start + ms(2000)));
        assert!(timer.poll(start + ms(3500)));
    }

    #[test]
    fn pacer_carries_the_remainder() {
        let start = Instant::now();
        let mut pacer = TickPacer::new(100, 30, start);
        assert_eq!(pacer.step(), ms(10));

        assert_eq!(pacer.ticks(start), 0);
        assert_eq!(pacer.ticks(start + ms(25)), 2);
        assert_eq!(pacer.ticks(start + ms(30)), 1);
        assert_eq!(pacer.ticks(start + ms(39)), 0);
        assert_eq!(pacer.ticks(start + ms(40)), 1);
    }

    #[test]
    fn pacer_is_independent_of_the_frame_rate() {
        let start = Instant::now();
        let mut fast = TickPacer::new(120, 30, start);
        let mut slow = TickPacer::new(120, 30, start);

        let fast_total: u32 = (1..=240u64).map(|f| fast.ticks(start + ms(f * 1000 / 240))).sum();
        let slow_total: u32 = (1..=30u64).map(|f| slow.ticks(start + ms(f * 1000 / 30))).sum();
        assert_eq!(fast_total, 120);
        assert_eq!(slow_total, 120);
    }

    #[test]
    fn pacer_caps_ticks_after_a_stall() {
        let start = Instant::now();
        let mut pacer = TickPacer::new(100, 30, start);

        assert_eq!(pacer.ticks(start + Duration::from_secs(10)), 30);
        assert_eq!(pacer.ticks(start + Duration::from_secs(10) + ms(10)), 1);
    }
}
