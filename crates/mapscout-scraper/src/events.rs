//! Session lifecycle events delivered to the caller.

use mapscout_core::PlaceRecord;
use tokio::sync::mpsc;

/// Receives everything a session reports.
///
/// Callbacks run inline on the session's task and must not block.
pub trait SessionObserver: Send + Sync {
    /// Progress and diagnostics; fired any number of times.
    fn on_status(&self, message: String);

    /// One accepted record, in completion order.
    fn on_record(&self, record: PlaceRecord);

    /// Fired exactly once per session, whatever the outcome.
    fn on_complete(&self);
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Status(String),
    Record(PlaceRecord),
    Complete,
}

/// Forwards events over an unbounded channel. Sends after the receiver is
/// dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl ChannelObserver {
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: SessionEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("session event receiver dropped");
        }
    }
}

impl SessionObserver for ChannelObserver {
    fn on_status(&self, message: String) {
        tracing::debug!(status = %message, "session status");
        self.send(SessionEvent::Status(message));
    }

    fn on_record(&self, record: PlaceRecord) {
        self.send(SessionEvent::Record(record));
    }

    fn on_complete(&self) {
        self.send(SessionEvent::Complete);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_arrive_in_send_order() {
        let (observer, mut rx) = ChannelObserver::new();
        observer.on_status("Searching: bakery".to_string());
        observer.on_complete();
        drop(observer);

        assert_eq!(
            rx.recv().await,
            Some(SessionEvent::Status("Searching: bakery".to_string()))
        );
        assert_eq!(rx.recv().await, Some(SessionEvent::Complete));
        assert_eq!(rx.recv().await, None);
    }

    #[test]
    fn sending_after_receiver_drop_is_harmless() {
        let (observer, rx) = ChannelObserver::new();
        drop(rx);
        observer.on_complete();
    }
}
