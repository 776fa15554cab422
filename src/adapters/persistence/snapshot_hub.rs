//! In-process fan-out of directory snapshots using a tokio broadcast channel.
//!
//! Each item is a full snapshot, so a subscriber that lags simply skips to a newer one.

use crate::domain::Group;
use crate::ports::GroupStream;
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

const CHANNEL_CAPACITY: usize = 64;

pub struct SnapshotHub {
    tx: broadcast::Sender<Vec<Group>>,
}

impl SnapshotHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Push a snapshot to every live subscriber. No-op when nobody listens.
    pub fn publish(&self, snapshot: Vec<Group>) {
        let _ = self.tx.send(snapshot);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Stream that yields `initial` first, then every published snapshot.
    ///
    /// Callers must take the receiver before reading `initial` so no change is missed
    /// in between; [`SnapshotHub::receiver`] + [`SnapshotHub::stream_from`] split those steps.
    pub fn receiver(&self) -> broadcast::Receiver<Vec<Group>> {
        self.tx.subscribe()
    }

    pub fn stream_from(
        rx: broadcast::Receiver<Vec<Group>>,
        initial: Vec<Group>,
    ) -> GroupStream {
        let updates = BroadcastStream::new(rx).filter_map(|result| result.ok());
        Box::pin(tokio_stream::once(initial).chain(updates))
    }
}

impl Default for SnapshotHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GroupId, JoinCode, NewGroup};
    use chrono::Utc;
    use std::time::Duration;

    fn group(id: &str) -> Group {
        let draft = NewGroup::new("Eagles", "Team", JoinCode::parse("AB12CD").unwrap()).unwrap();
        Group::from_new(GroupId(id.into()), draft, Utc::now())
    }

    #[tokio::test]
    async fn test_initial_snapshot_then_updates() {
        let hub = SnapshotHub::new();
        let rx = hub.receiver();
        let mut stream = SnapshotHub::stream_from(rx, vec![]);

        hub.publish(vec![group("a")]);

        let first = stream.next().await.unwrap();
        assert!(first.is_empty());
        let second = tokio::time::timeout(Duration::from_millis(100), stream.next())
            .await
            .expect("timeout")
            .expect("stream ended");
        assert_eq!(second.len(), 1);
    }

    #[tokio::test]
    async fn test_dropping_stream_unsubscribes() {
        let hub = SnapshotHub::new();
        let stream = SnapshotHub::stream_from(hub.receiver(), vec![]);
        assert_eq!(hub.subscriber_count(), 1);
        drop(stream);
        assert_eq!(hub.subscriber_count(), 0);
    }
}
