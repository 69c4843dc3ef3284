use futures::{Sink, SinkExt};
use std::fmt::Display;
use tokio::sync::mpsc::Receiver;

/// Outbound half of a push channel: writes queued frames in order until the
/// queue closes or a write fails, then closes the transport.
pub async fn writer_task<W>(mut writer: W, mut rx_out: Receiver<String>)
where
    W: Sink<String> + Unpin,
    W::Error: Display,
{
    while let Some(msg) = rx_out.recv().await {
        if let Err(e) = writer.send(msg).await {
            tracing::debug!(error = %e, "push channel write failed");
            break;
        }
    }
    if let Err(e) = writer.close().await {
        tracing::debug!(error = %e, "push channel close failed");
    }
}
