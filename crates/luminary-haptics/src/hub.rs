use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::device::{Actuator, HapticDescriptor};

/// Hot-plug notification for a haptic device.
pub enum DeviceEvent {
    Connected {
        descriptor: HapticDescriptor,
        actuator: Box<dyn Actuator>,
    },
    Disconnected {
        id: String,
    },
}

impl std::fmt::Debug for DeviceEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceEvent::Connected { descriptor, .. } => f
                .debug_struct("Connected")
                .field("descriptor", descriptor)
                .finish_non_exhaustive(),
            DeviceEvent::Disconnected { id } => {
                f.debug_struct("Disconnected").field("id", id).finish()
            }
        }
    }
}

/// Collects device notifications from any thread until the owner drains
/// them.
#[derive(Debug)]
pub struct HapticHub {
    tx: Sender<DeviceEvent>,
    rx: Receiver<DeviceEvent>,
}

impl Default for HapticHub {
    fn default() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }
}

impl HapticHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for platform watchers to report devices.
    pub fn sender(&self) -> Sender<DeviceEvent> {
        self.tx.clone()
    }

    pub fn connect(&self, descriptor: HapticDescriptor, actuator: Box<dyn Actuator>) {
        let _ = self.tx.send(DeviceEvent::Connected {
            descriptor,
            actuator,
        });
    }

    pub fn disconnect(&self, id: impl Into<String>) {
        let _ = self.tx.send(DeviceEvent::Disconnected { id: id.into() });
    }

    /// Pending events in arrival order.
    pub fn drain(&self) -> Vec<DeviceEvent> {
        self.rx.try_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::LoggingActuator;

    #[test]
    fn events_arrive_in_order_across_threads() {
        let hub = HapticHub::new();
        let sender = hub.sender();
        std::thread::spawn(move || {
            sender
                .send(DeviceEvent::Connected {
                    descriptor: HapticDescriptor::dual_rumble("pad"),
                    actuator: Box::new(LoggingActuator::new("pad")),
                })
                .unwrap();
            sender
                .send(DeviceEvent::Disconnected { id: "pad".into() })
                .unwrap();
        })
        .join()
        .unwrap();

        let events = hub.drain();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], DeviceEvent::Connected { .. }));
        assert!(matches!(events[1], DeviceEvent::Disconnected { .. }));
        assert!(hub.drain().is_empty());
    }
}
