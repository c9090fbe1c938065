//! Outbound side of a client connection

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, watch};

use crate::game::player::ConnectionId;
use crate::ws::protocol::ServerMsg;

/// Send failures. The simulation logs and moves on; they never abort a tick.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("connection {0} is closed")]
    Closed(ConnectionId),
}

/// Cheap-to-clone handle the simulation uses to reach one client.
///
/// Named events go over an unbounded queue and are delivered in order.
/// Position frames go over a watch slot: an unsent frame is replaced by the next one.
#[derive(Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    events_tx: mpsc::UnboundedSender<ServerMsg>,
    frames_tx: Arc<watch::Sender<Bytes>>,
}

/// Receiving half, drained by the socket writer task
pub struct ConnectionOutbox {
    pub events_rx: mpsc::UnboundedReceiver<ServerMsg>,
    pub frames_rx: watch::Receiver<Bytes>,
}

impl ConnectionHandle {
    pub fn new(id: ConnectionId) -> (Self, ConnectionOutbox) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (frames_tx, frames_rx) = watch::channel(Bytes::new());

        let handle = Self {
            id,
            events_tx,
            frames_tx: Arc::new(frames_tx),
        };
        (handle, ConnectionOutbox { events_rx, frames_rx })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Reliable, ordered named event
    pub fn send_event(&self, msg: ServerMsg) -> Result<(), DispatchError> {
        self.events_tx
            .send(msg)
            .map_err(|_| DispatchError::Closed(self.id))
    }

    /// Unreliable position frame; overwrites any frame the writer has not sent yet
    pub fn send_frame(&self, frame: Bytes) -> Result<(), DispatchError> {
        self.frames_tx
            .send(frame)
            .map_err(|_| DispatchError::Closed(self.id))
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_frame_wins() {
        let (handle, mut outbox) = ConnectionHandle::new(ConnectionId(7));

        handle.send_frame(Bytes::from_static(b"one")).unwrap();
        handle.send_frame(Bytes::from_static(b"two")).unwrap();

        assert!(outbox.frames_rx.has_changed().unwrap());
        assert_eq!(&outbox.frames_rx.borrow_and_update()[..], b"two");
        assert!(!outbox.frames_rx.has_changed().unwrap());
    }

    #[test]
    fn test_events_are_queued_in_order() {
        let (handle, mut outbox) = ConnectionHandle::new(ConnectionId(7));

        handle
            .send_event(ServerMsg::Welcome {
                id: ConnectionId(7),
                map_size: 100.0,
                tick_interval_ms: 100,
            })
            .unwrap();
        handle
            .send_event(ServerMsg::Spawned {
                id: ConnectionId(7),
                name: "a".to_string(),
                x: 1.0,
                y: 2.0,
            })
            .unwrap();

        assert!(matches!(outbox.events_rx.try_recv(), Ok(ServerMsg::Welcome { .. })));
        assert!(matches!(outbox.events_rx.try_recv(), Ok(ServerMsg::Spawned { .. })));
    }

    #[test]
    fn test_send_after_close_is_an_error_not_a_panic() {
        let (handle, outbox) = ConnectionHandle::new(ConnectionId(3));
        drop(outbox);

        assert!(matches!(
            handle.send_frame(Bytes::from_static(b"x")),
            Err(DispatchError::Closed(ConnectionId(3)))
        ));
        assert!(handle
            .send_event(ServerMsg::Welcome {
                id: ConnectionId(3),
                map_size: 1.0,
                tick_interval_ms: 1,
            })
            .is_err());
    }

    #[test]
    fn test_writer_sees_event_after_handle_dropped() {
        let (handle, mut outbox) = ConnectionHandle::new(ConnectionId(4));
        handle
            .send_event(ServerMsg::Welcome {
                id: ConnectionId(4),
                map_size: 10.0,
                tick_interval_ms: 100,
            })
            .unwrap();
        drop(handle);

        tokio_test::block_on(async {
            assert!(outbox.events_rx.recv().await.is_some());
            assert!(outbox.events_rx.recv().await.is_none());
            assert!(outbox.frames_rx.changed().await.is_err());
        });
    }
}
