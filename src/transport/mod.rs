pub mod readers;
pub mod writers;

use crate::common::BoxError;
use axum::extract::ws::{Message, WebSocket};
use futures::{Sink, SinkExt, Stream, StreamExt, future::ready};

/// Splits a WebSocket into a stream of inbound text frames and a sink of
/// outbound text frames. Control frames never reach the reader.
pub fn split_websocket(
    ws: WebSocket,
) -> (
    impl Stream<Item = Result<String, BoxError>> + Unpin + Send,
    impl Sink<String, Error = axum::Error> + Unpin + Send,
) {
    let (sink, stream) = ws.split();
    let inbound = stream.filter_map(|msg| {
        ready(match msg {
            Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
            Ok(Message::Binary(data)) => String::from_utf8(data.to_vec()).ok().map(Ok),
            Ok(Message::Ping(_) | Message::Pong(_) | Message::Close(_)) => None,
            Err(e) => Some(Err(BoxError::from(e))),
        })
    });
    let outbound =
        sink.with(|text: String| ready(Ok::<_, axum::Error>(Message::Text(text.into()))));
    (inbound, outbound)
}
