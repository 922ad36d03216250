use std::time::Duration;

use crate::{Fired, Scheduler, TimerId};

/// Lifecycle of one timer role owned by a component.
///
/// Arming a slot always cancels whatever the slot held before, so a role can
/// never have two live timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerSlot {
    #[default]
    Stopped,
    Running(TimerId),
}

impl TimerSlot {
    pub fn is_running(&self) -> bool {
        matches!(self, TimerSlot::Running(_))
    }

    pub fn id(&self) -> Option<TimerId> {
        match self {
            TimerSlot::Running(id) => Some(*id),
            TimerSlot::Stopped => None,
        }
    }

    /// Returns `true` if `id` is the timer this slot currently holds.
    pub fn owns(&self, id: TimerId) -> bool {
        self.id() == Some(id)
    }

    pub fn arm_once<K>(&mut self, scheduler: &mut Scheduler<K>, delay: Duration, kind: K) -> TimerId {
        self.clear(scheduler);
        let id = scheduler.schedule_once(delay, kind);
        *self = TimerSlot::Running(id);
        id
    }

    pub fn arm_repeating<K>(
        &mut self,
        scheduler: &mut Scheduler<K>,
        period: Duration,
        kind: K,
    ) -> TimerId {
        self.clear(scheduler);
        let id = scheduler.schedule_repeating(period, kind);
        *self = TimerSlot::Running(id);
        id
    }

    /// Cancels the held timer, if any. Safe to call repeatedly.
    pub fn clear<K>(&mut self, scheduler: &mut Scheduler<K>) -> bool {
        match std::mem::take(self) {
            TimerSlot::Running(id) => scheduler.cancel(id),
            TimerSlot::Stopped => false,
        }
    }

    /// Records that a timer fired. One-shot timers held by this slot are gone
    /// from the scheduler afterwards, so the slot returns to `Stopped`.
    /// Returns `true` if the fired timer belonged to this slot.
    pub fn acknowledge<K>(&mut self, fired: &Fired<K>) -> bool {
        if !self.owns(fired.id) {
            return false;
        }
        if !fired.repeating {
            *self = TimerSlot::Stopped;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arming_replaces_previous_timer() {
        let mut scheduler: Scheduler<u8> = Scheduler::new();
        let mut slot = TimerSlot::default();
        let first = slot.arm_repeating(&mut scheduler, Duration::from_millis(10), 1);
        let second = slot.arm_once(&mut scheduler, Duration::from_millis(10), 2);
        assert_ne!(first, second);
        assert!(!scheduler.is_live(first));
        assert_eq!(scheduler.live_count(), 1);
        assert!(slot.owns(second));
    }

    #[test]
    fn clear_is_idempotent() {
        let mut scheduler: Scheduler<u8> = Scheduler::new();
        let mut slot = TimerSlot::default();
        slot.arm_once(&mut scheduler, Duration::from_millis(10), 1);
        assert!(slot.clear(&mut scheduler));
        assert!(!slot.clear(&mut scheduler));
        assert_eq!(slot, TimerSlot::Stopped);
        assert_eq!(scheduler.live_count(), 0);
    }

    #[test]
    fn acknowledging_one_shot_stops_slot() {
        let mut scheduler: Scheduler<u8> = Scheduler::new();
        let mut slot = TimerSlot::default();
        slot.arm_once(&mut scheduler, Duration::from_millis(5), 7);
        let fired = scheduler.pop_due(Duration::from_millis(5)).expect("due");
        assert!(slot.acknowledge(&fired));
        assert!(!slot.is_running());
    }
}
