use crate::common::BoxError;
use crate::frame::ServerFrame;
use crate::hub::Hub;
use crate::store::SessionStore;
use crate::transport::{readers::frame_reader_task, writers::writer_task};
use futures::{Sink, Stream};
use parking_lot::Mutex;
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::mpsc::{self, Receiver, Sender, error::TrySendError};
use tracing::{Instrument, warn};

pub type ConnId = u64;

/// One player's push channel. The sender half of the outbound queue lives
/// here; dropping it is what closes the queue.
pub struct Connection {
    id: ConnId,
    tx: Mutex<Option<Sender<String>>>,
    hub: Hub,
}

impl Connection {
    pub fn new(id: ConnId, capacity: usize, hub: Hub) -> (Arc<Self>, Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        let conn = Arc::new(Self {
            id,
            tx: Mutex::new(Some(tx)),
            hub,
        });
        (conn, rx)
    }

    pub fn id(&self) -> ConnId {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        self.tx.lock().is_none()
    }

    /// Queues `frame` without waiting. A full queue means the consumer has
    /// stalled: the frame is dropped and the connection is disconnected.
    pub fn push(self: &Arc<Self>, frame: &ServerFrame) -> bool {
        match self.try_enqueue(frame.encode()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(id = self.id, "outbound queue full, disconnecting");
                self.hub.unregister(self.clone());
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    pub(crate) fn try_enqueue(&self, msg: String) -> Result<(), TrySendError<String>> {
        match self.tx.lock().as_ref() {
            Some(tx) => tx.try_send(msg),
            None => Err(TrySendError::Closed(msg)),
        }
    }

    /// Returns `true` only for the call that actually closed the queue.
    pub(crate) fn close(&self) -> bool {
        self.tx.lock().take().is_some()
    }
}

/// Runs one push channel to completion: registers it, spawns the writer,
/// reads until the transport ends, then tears everything down.
pub async fn serve<R, W>(reader: R, writer: W, hub: Hub, store: Arc<SessionStore>, capacity: usize)
where
    R: Stream<Item = Result<String, BoxError>> + Unpin,
    W: Sink<String> + Unpin + Send + 'static,
    W::Error: Display + Send,
{
    let id = hub.next_conn_id();
    let (conn, rx_out) = Connection::new(id, capacity, hub.clone());
    hub.register(conn.clone());

    let writer_handle = tokio::spawn(
        writer_task(writer, rx_out).instrument(tracing::info_span!("writer_task", id = id)),
    );

    frame_reader_task(reader, &conn, &store)
        .instrument(tracing::info_span!("reader_task", id = id))
        .await;

    hub.unregister(conn.clone());
    // Unregister is a no-op once the hub has stopped, so close here as well.
    conn.close();
    if let Err(e) = writer_handle.await {
        warn!(id, error = %e, "writer task failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SessionStore;
    use futures::StreamExt;
    use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};

    type Inbound = UnboundedSender<Result<String, BoxError>>;

    fn client(
        hub: &Hub,
        store: &Arc<SessionStore>,
    ) -> (Inbound, UnboundedReceiver<String>, tokio::task::JoinHandle<()>) {
        let (in_tx, in_rx) = unbounded::<Result<String, BoxError>>();
        let (out_tx, out_rx) = unbounded::<String>();
        let handle = tokio::spawn(serve(in_rx, out_tx, hub.clone(), store.clone(), 8));
        (in_tx, out_rx, handle)
    }

    fn join(session: &str, player: &str) -> Result<String, BoxError> {
        Ok(format!(r#"{{"join":{{"playerToken":"{player}","sessionToken":"{session}"}}}}"#))
    }

    #[tokio::test]
    async fn push_to_full_queue_disconnects() {
        let (hub, _loop) = Hub::spawn();
        let (conn, mut rx) = Connection::new(hub.next_conn_id(), 1, hub.clone());
        hub.register(conn.clone());

        assert!(conn.push(&ServerFrame::Submit(1)));
        assert!(!conn.push(&ServerFrame::Submit(2)));
        assert_eq!(hub.connection_count().await, 0);
        assert!(conn.is_closed());
        assert!(!conn.push(&ServerFrame::Submit(3)));

        assert_eq!(rx.recv().await.as_deref(), Some(r#"{"submit":1}"#));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn opponent_hears_connect_and_submit() {
        let (hub, _loop) = Hub::spawn();
        let store = Arc::new(SessionStore::new(44, 272));
        let (session, p1) = store.create("Al").unwrap();
        let joined = store.join(&session, "Bo").unwrap();

        let (in1, mut out1, _h1) = client(&hub, &store);
        let (in2, mut out2, _h2) = client(&hub, &store);

        in1.unbounded_send(join(&session, &p1)).unwrap();
        in1.unbounded_send(Ok("garbage".into())).unwrap();
        while store.bound_slots(&session) != Some((true, false)) {
            tokio::task::yield_now().await;
        }
        in2.unbounded_send(join(&session, &joined.player_token)).unwrap();

        assert_eq!(out1.next().await.as_deref(), Some(r#"{"connect":"Bo"}"#));

        store.submit(&session, &joined.player_token, 9).unwrap();
        assert_eq!(out1.next().await.as_deref(), Some(r#"{"submit":9}"#));
        assert_eq!(hub.connection_count().await, 2);

        drop(in2);
        assert_eq!(out2.next().await, None);
    }

    #[tokio::test]
    async fn teardown_finishes_after_hub_stopped() {
        let (hub, hub_loop) = Hub::spawn();
        hub.shutdown();
        hub_loop.await.unwrap();

        let store = Arc::new(SessionStore::new(44, 272));
        let (session, p1) = store.create("Al").unwrap();
        let (in_tx, mut out_rx, handle) = client(&hub, &store);
        in_tx.unbounded_send(join(&session, &p1)).unwrap();
        while store.bound_slots(&session) != Some((true, false)) {
            tokio::task::yield_now().await;
        }

        drop(in_tx);
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .expect("teardown hung")
            .unwrap();
        assert_eq!(out_rx.next().await, None);
    }

    #[tokio::test]
    async fn teardown_on_transport_error() {
        let (hub, _loop) = Hub::spawn();
        let store = Arc::new(SessionStore::new(44, 272));
        let (in_tx, mut out_rx, handle) = client(&hub, &store);

        in_tx.unbounded_send(Err("reset by peer".into())).unwrap();
        handle.await.unwrap();

        assert_eq!(out_rx.next().await, None);
        assert_eq!(hub.connection_count().await, 0);
    }
}
