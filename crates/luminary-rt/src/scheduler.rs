use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Shortest period or delay accepted for a timer. Shorter requests are
/// stretched so a zero interval can never spin the dispatch loop.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Identifier of a scheduled timer. Identifiers are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// A timer that came due during [`Scheduler::pop_due`].
#[derive(Debug, Clone, PartialEq)]
pub struct Fired<K> {
    pub id: TimerId,
    pub kind: K,
    /// Simulated time at which the timer fired.
    pub at: Duration,
    /// `true` when the timer stays armed for its next period.
    pub repeating: bool,
}

#[derive(Debug, Clone)]
struct Timer<K> {
    due: Duration,
    period: Option<Duration>,
    kind: K,
    seq: u64,
}

/// Single-threaded timer queue driven by a simulated monotonic clock.
///
/// The clock only moves when the owner asks it to: [`Scheduler::pop_due`]
/// jumps to the due time of each timer it yields and
/// [`Scheduler::advance_to`] settles the clock at the end of a step.
#[derive(Debug)]
pub struct Scheduler<K> {
    now: Duration,
    timers: BTreeMap<TimerId, Timer<K>>,
    next_id: u64,
    next_seq: u64,
}

impl<K> Default for Scheduler<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Scheduler<K> {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            timers: BTreeMap::new(),
            next_id: 1,
            next_seq: 0,
        }
    }

    /// Current simulated time.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Number of timers that are still armed.
    pub fn live_count(&self) -> usize {
        self.timers.len()
    }

    pub fn is_live(&self, id: TimerId) -> bool {
        self.timers.contains_key(&id)
    }

    /// Kind of a live timer.
    pub fn kind(&self, id: TimerId) -> Option<&K> {
        self.timers.get(&id).map(|timer| &timer.kind)
    }

    /// Iterates the kinds of all live timers.
    pub fn live_kinds(&self) -> impl Iterator<Item = &K> {
        self.timers.values().map(|timer| &timer.kind)
    }

    /// Arms a timer that fires once after `delay`.
    pub fn schedule_once(&mut self, delay: Duration, kind: K) -> TimerId {
        self.insert(delay, None, kind)
    }

    /// Arms a timer that first fires after `period` and then every `period`.
    pub fn schedule_repeating(&mut self, period: Duration, kind: K) -> TimerId {
        let period = period.max(MIN_PERIOD);
        self.insert(period, Some(period), kind)
    }

    /// Disarms a timer. Returns `false` if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let removed = self.timers.remove(&id).is_some();
        if removed {
            tracing::trace!(%id, "timer cancelled");
        }
        removed
    }

    /// Disarms every timer.
    pub fn cancel_all(&mut self) {
        self.timers.clear();
    }

    /// Yields the earliest timer due at or before `until`, moving the clock
    /// to its due time. Repeating timers are re-armed one period later.
    /// Timers due at the same instant fire in the order they were armed.
    pub fn pop_due(&mut self, until: Duration) -> Option<Fired<K>>
    where
        K: Clone,
    {
        let (&id, _) = self
            .timers
            .iter()
            .filter(|(_, timer)| timer.due <= until)
            .min_by_key(|(_, timer)| (timer.due, timer.seq))?;

        let seq = self.next_seq;
        let timer = self.timers.get_mut(&id)?;
        let at = timer.due.max(self.now);
        self.now = at;

        match timer.period {
            Some(period) => {
                timer.due = at + period;
                timer.seq = seq;
                self.next_seq += 1;
                Some(Fired {
                    id,
                    kind: timer.kind.clone(),
                    at,
                    repeating: true,
                })
            }
            None => {
                let timer = self.timers.remove(&id)?;
                Some(Fired {
                    id,
                    kind: timer.kind,
                    at,
                    repeating: false,
                })
            }
        }
    }

    /// Moves the clock forward to `until`. The clock never runs backwards.
    pub fn advance_to(&mut self, until: Duration) {
        if until > self.now {
            self.now = until;
        }
    }

    fn insert(&mut self, delay: Duration, period: Option<Duration>, kind: K) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let timer = Timer {
            due: self.now + delay.max(MIN_PERIOD),
            period,
            kind,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.timers.insert(id, timer);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Kind {
        A,
        B,
    }

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn drain(scheduler: &mut Scheduler<Kind>, until: Duration) -> Vec<(Kind, Duration)> {
        let mut fired = Vec::new();
        while let Some(event) = scheduler.pop_due(until) {
            fired.push((event.kind, event.at));
        }
        scheduler.advance_to(until);
        fired
    }

    #[test]
    fn one_shot_fires_once_and_disarms() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_once(ms(100), Kind::A);
        assert_eq!(drain(&mut scheduler, ms(99)), vec![]);
        assert_eq!(drain(&mut scheduler, ms(250)), vec![(Kind::A, ms(100))]);
        assert_eq!(scheduler.live_count(), 0);
        assert_eq!(scheduler.now(), ms(250));
    }

    #[test]
    fn repeating_timer_rearms_each_period() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_repeating(ms(250), Kind::B);
        let fired = drain(&mut scheduler, ms(1000));
        let times: Vec<_> = fired.iter().map(|(_, at)| *at).collect();
        assert_eq!(times, vec![ms(250), ms(500), ms(750), ms(1000)]);
        assert_eq!(scheduler.live_count(), 1);
    }

    #[test]
    fn ties_fire_in_arming_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_once(ms(10), Kind::B);
        scheduler.schedule_once(ms(10), Kind::A);
        let kinds: Vec<_> = drain(&mut scheduler, ms(10))
            .into_iter()
            .map(|(kind, _)| kind)
            .collect();
        assert_eq!(kinds, vec![Kind::B, Kind::A]);
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let mut scheduler = Scheduler::new();
        let id = scheduler.schedule_repeating(ms(10), Kind::A);
        assert!(scheduler.cancel(id));
        assert!(!scheduler.cancel(id));
        assert!(drain(&mut scheduler, ms(100)).is_empty());
    }

    #[test]
    fn zero_period_is_stretched() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_repeating(Duration::ZERO, Kind::A);
        assert_eq!(drain(&mut scheduler, ms(5)).len(), 5);
    }

    #[test]
    fn timers_armed_during_dispatch_fire_in_same_step() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_once(ms(10), Kind::A);
        let mut seen = Vec::new();
        while let Some(event) = scheduler.pop_due(ms(100)) {
            seen.push((event.kind, event.at));
            if event.kind == Kind::A {
                scheduler.schedule_once(ms(20), Kind::B);
            }
        }
        assert_eq!(seen, vec![(Kind::A, ms(10)), (Kind::B, ms(30))]);
    }
}
