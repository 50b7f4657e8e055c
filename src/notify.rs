use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};

use crate::models::SampleEvent;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

type Subscriber = Arc<dyn Fn(&SampleEvent) + Send + Sync>;

/// Holds at most one live subscriber.
///
/// Delivery happens on the sampler's tick task, synchronously; a slow
/// subscriber delays the next tick, so hosts should hand work off quickly.
#[derive(Clone, Default)]
pub struct NotificationChannel {
    slot: Arc<Mutex<Option<Subscriber>>>,
}

impl NotificationChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `subscriber`, replacing any previous one.
    pub fn subscribe<F>(&self, subscriber: F)
    where
        F: Fn(&SampleEvent) + Send + Sync + 'static,
    {
        let replaced = self.lock().replace(Arc::new(subscriber)).is_some();
        log_debug!("subscriber registered (replaced existing: {replaced})");
    }

    pub fn unsubscribe(&self) {
        self.lock().take();
    }

    pub fn has_subscriber(&self) -> bool {
        self.lock().is_some()
    }

    /// Deliver `event`; returns whether a subscriber received it.
    pub fn publish(&self, event: &SampleEvent) -> bool {
        let Some(subscriber) = self.lock().clone() else {
            return false;
        };

        match panic::catch_unwind(AssertUnwindSafe(|| subscriber(event))) {
            Ok(()) => true,
            Err(_) => {
                log_warn!("subscriber panicked on sample {}", event.sequence);
                false
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Subscriber>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Reading, Temperature};
    use chrono::Local;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn event(sequence: u64) -> SampleEvent {
        SampleEvent {
            session_id: "test".into(),
            sequence,
            reading: Reading {
                timestamp: Local::now(),
                processor: Temperature::disabled(),
                graphics: Temperature::disabled(),
                battery: Temperature::disabled(),
                enclosure: Temperature::disabled(),
                battery_level_percent: 0,
                battery_current_ma: 0,
                screen_brightness: -1,
            },
        }
    }

    #[test]
    fn publishing_without_subscriber_is_a_no_op() {
        let channel = NotificationChannel::new();
        assert!(!channel.publish(&event(1)));
    }

    #[test]
    fn second_subscribe_replaces_the_first() {
        let channel = NotificationChannel::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let counter = first.clone();
        channel.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let counter = second.clone();
        channel.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(channel.publish(&event(1)));
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let channel = NotificationChannel::new();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        channel.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        channel.unsubscribe();

        assert!(!channel.has_subscriber());
        assert!(!channel.publish(&event(1)));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn panicking_subscriber_does_not_escape() {
        let channel = NotificationChannel::new();
        channel.subscribe(|_| panic!("display went away"));

        assert!(!channel.publish(&event(3)));
        assert!(channel.has_subscriber());
    }

    #[test]
    fn subscriber_may_unsubscribe_from_inside_a_callback() {
        let channel = NotificationChannel::new();
        let inner = channel.clone();
        channel.subscribe(move |_| inner.unsubscribe());

        assert!(channel.publish(&event(1)));
        assert!(!channel.has_subscriber());
    }
}
