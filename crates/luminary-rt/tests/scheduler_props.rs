use std::time::Duration;

use luminary_rt::{Scheduler, TimerSlot};
use proptest::prelude::*;

proptest! {
    /// Fired timers are observed in non-decreasing time order and the clock
    /// never runs backwards, whatever mix of timers is armed.
    #[test]
    fn fired_times_are_monotonic(
        delays in prop::collection::vec(1u64..500, 1..16),
        periods in prop::collection::vec(1u64..300, 0..6),
        horizon in 1u64..3_000,
    ) {
        let mut scheduler: Scheduler<usize> = Scheduler::new();
        for (index, delay) in delays.iter().enumerate() {
            scheduler.schedule_once(Duration::from_millis(*delay), index);
        }
        for (index, period) in periods.iter().enumerate() {
            scheduler.schedule_repeating(Duration::from_millis(*period), 1_000 + index);
        }

        let until = Duration::from_millis(horizon);
        let mut last = Duration::ZERO;
        while let Some(fired) = scheduler.pop_due(until) {
            prop_assert!(fired.at >= last);
            prop_assert!(fired.at <= until);
            last = fired.at;
        }
        scheduler.advance_to(until);
        prop_assert_eq!(scheduler.now(), until);
        let pending_once = delays.iter().filter(|delay| **delay > horizon).count();
        prop_assert_eq!(scheduler.live_count(), periods.len() + pending_once);
    }

    /// However often a slot is re-armed, at most one timer is live for it.
    #[test]
    fn slot_never_holds_two_timers(rearms in prop::collection::vec(any::<bool>(), 1..32)) {
        let mut scheduler: Scheduler<()> = Scheduler::new();
        let mut slot = TimerSlot::default();
        for repeating in rearms {
            if repeating {
                slot.arm_repeating(&mut scheduler, Duration::from_millis(5), ());
            } else {
                slot.arm_once(&mut scheduler, Duration::from_millis(5), ());
            }
            prop_assert_eq!(scheduler.live_count(), 1);
        }
        slot.clear(&mut scheduler);
        prop_assert_eq!(scheduler.live_count(), 0);
    }
}
