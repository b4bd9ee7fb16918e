//! C10 — Event sink: synchronous publish to in-process subscribers with an
//! append-only log write that happens-before subscriber invocation (§4.9,
//! §5 ordering guarantees).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use smartscheduler_domain::events::{DomainEvent, EventLogEntry};

use crate::clock::Clock;
use crate::clock::IdProvider;
use crate::ports::EventLogRepository;

/// A subscriber receives the event and the channels it was routed to.
/// Subscriber failures are swallowed — the log record is retained and the
/// publish call still reports success (§4.9).
pub trait EventSubscriber: Send + Sync {
    fn on_event(&self, event: &DomainEvent, channels: &[String]);
}

pub struct EventSink {
    repository: Arc<dyn EventLogRepository>,
    subscribers: Vec<Arc<dyn EventSubscriber>>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdProvider>,
}

impl EventSink {
    pub fn new(
        repository: Arc<dyn EventLogRepository>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdProvider>,
    ) -> Self {
        Self {
            repository,
            subscribers: Vec::new(),
            clock,
            ids,
        }
    }

    pub fn with_subscriber(mut self, subscriber: Arc<dyn EventSubscriber>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Publish `event` to `region`'s channels. Writes the append-only log
    /// row first; only then fans out to subscribers, matching the
    /// happens-after durability rule callers rely on for
    /// `RecommendationReady`/`JobAssigned`.
    pub async fn publish(&self, event: DomainEvent, region: &str, now_override: Option<DateTime<Utc>>) -> anyhow::Result<Uuid> {
        let channels = event.channels(region);
        let entry = EventLogEntry {
            id: self.ids.new_id(),
            event_type: event.event_type().to_string(),
            payload: serde_json::to_value(&event)?,
            published_at: now_override.unwrap_or_else(|| self.clock.now()),
            channels: channels.clone(),
        };

        self.repository.append(&entry).await?;

        for subscriber in &self.subscribers {
            subscriber.on_event(&event, &channels);
        }

        Ok(entry.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{FixedClock, UuidProvider};
    use crate::ports::MockEventLogRepository;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct CountingSubscriber {
        count: AtomicUsize,
        last_channels: Mutex<Vec<String>>,
    }

    impl EventSubscriber for CountingSubscriber {
        fn on_event(&self, _event: &DomainEvent, channels: &[String]) {
            self.count.fetch_add(1, Ordering::SeqCst);
            *self.last_channels.lock().unwrap() = channels.to_vec();
        }
    }

    #[tokio::test]
    async fn publish_writes_log_before_notifying_subscribers() {
        let mut mock = MockEventLogRepository::new();
        mock.expect_append().returning(|_| Ok(()));

        let subscriber = Arc::new(CountingSubscriber {
            count: AtomicUsize::new(0),
            last_channels: Mutex::new(Vec::new()),
        });

        let sink = EventSink::new(Arc::new(mock), Arc::new(FixedClock(Utc::now())), Arc::new(UuidProvider))
            .with_subscriber(subscriber.clone());

        let event = DomainEvent::JobCancelled { job_id: Uuid::new_v4(), reason: "dispatcher cancelled".into() };
        sink.publish(event, "region-0-0", None).await.unwrap();

        assert_eq!(subscriber.count.load(Ordering::SeqCst), 1);
        assert_eq!(subscriber.last_channels.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn publish_still_succeeds_if_log_append_fails_to_then_error_is_propagated() {
        let mut mock = MockEventLogRepository::new();
        mock.expect_append().returning(|_| Err(anyhow::anyhow!("db unavailable")));

        let sink = EventSink::new(Arc::new(mock), Arc::new(FixedClock(Utc::now())), Arc::new(UuidProvider));
        let event = DomainEvent::JobCancelled { job_id: Uuid::new_v4(), reason: "x".into() };
        let result = sink.publish(event, "region-0-0", None).await;
        assert!(result.is_err());
    }
}
