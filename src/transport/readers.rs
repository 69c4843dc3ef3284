use crate::common::BoxError;
use crate::connection::Connection;
use crate::frame::ClientFrame;
use crate::store::SessionStore;
use futures::{Stream, StreamExt};
use std::sync::Arc;

/// Inbound half of a push channel. Returns once the transport closes or fails.
pub async fn frame_reader_task<R>(mut reader: R, conn: &Arc<Connection>, store: &SessionStore)
where
    R: Stream<Item = Result<String, BoxError>> + Unpin,
{
    while let Some(next) = reader.next().await {
        let text = match next {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!(error = %e, "push channel read failed");
                break;
            }
        };
        match ClientFrame::decode(&text) {
            Some(ClientFrame::Join(join)) => {
                store.bind_connection(&join.session_token, &join.player_token, conn.clone());
            }
            None => tracing::debug!(len = text.len(), "ignoring unrecognised frame"),
        }
    }
}
