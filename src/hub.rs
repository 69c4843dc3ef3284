use crate::connection::{ConnId, Connection};
use crate::frame::ServerFrame;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, warn};

enum HubEvent {
    Register(Arc<Connection>),
    Unregister(Arc<Connection>),
    Broadcast(String),
    Count(oneshot::Sender<usize>),
    Shutdown,
}

/// Handle to the connection registry. The live set itself is owned by a
/// single dispatch task; every handle just queues events for it.
#[derive(Clone)]
pub struct Hub {
    tx: UnboundedSender<HubEvent>,
    next_id: Arc<AtomicU64>,
}

impl Hub {
    /// Starts the dispatch loop on the current runtime.
    pub fn spawn() -> (Self, JoinHandle<()>) {
        let (tx, rx) = unbounded_channel();
        let handle = tokio::spawn(dispatch_loop(rx).instrument(tracing::info_span!("hub")));
        let hub = Self {
            tx,
            next_id: Arc::new(AtomicU64::new(1)),
        };
        (hub, handle)
    }

    pub fn next_conn_id(&self) -> ConnId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn register(&self, conn: Arc<Connection>) {
        self.send(HubEvent::Register(conn));
    }

    /// Removes `conn` from the live set and closes its outbound queue.
    /// Safe to call any number of times.
    pub fn unregister(&self, conn: Arc<Connection>) {
        self.send(HubEvent::Unregister(conn));
    }

    pub fn broadcast(&self, frame: &ServerFrame) {
        self.send(HubEvent::Broadcast(frame.encode()));
    }

    /// Closes every live connection and stops the dispatch loop.
    pub fn shutdown(&self) {
        self.send(HubEvent::Shutdown);
    }

    /// Number of live connections, or 0 once the loop has stopped.
    pub async fn connection_count(&self) -> usize {
        let (tx, rx) = oneshot::channel();
        self.send(HubEvent::Count(tx));
        rx.await.unwrap_or(0)
    }

    fn send(&self, event: HubEvent) {
        if self.tx.send(event).is_err() {
            debug!("hub event dropped, dispatch loop is gone");
        }
    }
}

async fn dispatch_loop(mut rx: UnboundedReceiver<HubEvent>) {
    let mut live: HashMap<ConnId, Arc<Connection>> = HashMap::new();
    while let Some(event) = rx.recv().await {
        match event {
            HubEvent::Register(conn) => {
                // A connection already torn down by a failed push must stay out.
                if conn.is_closed() {
                    continue;
                }
                live.insert(conn.id(), conn);
            }
            HubEvent::Unregister(conn) => {
                live.remove(&conn.id());
                if conn.close() {
                    debug!(id = conn.id(), "connection unregistered");
                }
            }
            HubEvent::Broadcast(msg) => {
                live.retain(|id, conn| match conn.try_enqueue(msg.clone()) {
                    Ok(()) => true,
                    Err(TrySendError::Full(_)) => {
                        warn!(id, "outbound queue full, disconnecting");
                        conn.close();
                        false
                    }
                    Err(TrySendError::Closed(_)) => {
                        conn.close();
                        false
                    }
                });
            }
            HubEvent::Count(reply) => {
                let _ = reply.send(live.len());
            }
            HubEvent::Shutdown => break,
        }
    }
    info!(connections = live.len(), "hub stopping");
    for conn in live.values() {
        conn.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_then_unregister_leaves_nothing_behind() {
        let (hub, _loop) = Hub::spawn();
        let (conn, mut rx) = Connection::new(hub.next_conn_id(), 4, hub.clone());

        hub.register(conn.clone());
        assert_eq!(hub.connection_count().await, 1);

        hub.unregister(conn.clone());
        assert_eq!(hub.connection_count().await, 0);
        assert!(conn.is_closed());
        assert_eq!(rx.recv().await, None);

        hub.unregister(conn.clone());
        assert_eq!(hub.connection_count().await, 0);
        assert!(!conn.close());
    }

    #[tokio::test]
    async fn broadcast_drops_stalled_consumer() {
        let (hub, _loop) = Hub::spawn();
        let mut receivers = Vec::new();
        let mut conns = Vec::new();
        for _ in 0..3 {
            let (conn, rx) = Connection::new(hub.next_conn_id(), 1, hub.clone());
            hub.register(conn.clone());
            conns.push(conn);
            receivers.push(rx);
        }
        conns[1].try_enqueue("backlog".into()).unwrap();

        hub.broadcast(&ServerFrame::Connect("all".into()));
        assert_eq!(hub.connection_count().await, 2);

        assert!(conns[1].is_closed());
        assert_eq!(receivers[1].recv().await.as_deref(), Some("backlog"));
        assert_eq!(receivers[1].recv().await, None);
        for i in [0, 2] {
            assert!(!conns[i].is_closed());
            assert_eq!(receivers[i].recv().await.as_deref(), Some(r#"{"connect":"all"}"#));
        }
    }

    #[tokio::test]
    async fn closed_connection_is_not_registered() {
        let (hub, _loop) = Hub::spawn();
        let (conn, _rx) = Connection::new(hub.next_conn_id(), 1, hub.clone());
        conn.close();
        hub.register(conn);
        assert_eq!(hub.connection_count().await, 0);
    }

    #[tokio::test]
    async fn shutdown_closes_everything() {
        let (hub, handle) = Hub::spawn();
        let (a, _ra) = Connection::new(hub.next_conn_id(), 1, hub.clone());
        let (b, _rb) = Connection::new(hub.next_conn_id(), 1, hub.clone());
        hub.register(a.clone());
        hub.register(b.clone());
        hub.shutdown();
        handle.await.unwrap();
        assert!(a.is_closed());
        assert!(b.is_closed());
        assert_eq!(hub.connection_count().await, 0);
    }

    #[tokio::test]
    async fn ids_are_unique() {
        let (hub, _loop) = Hub::spawn();
        let first = hub.next_conn_id();
        assert_ne!(first, hub.clone().next_conn_id());
    }
}
