//! WebSocket transport.
//!
//! Each accepted connection becomes one session served by its own task. A
//! second task per connection drains the session's bounded outbox into the
//! socket, so slow peers never block the engine or other sessions.

use crate::agent::ports::AgentRepository;
use crate::protocol::{DispatchEngine, Router, ValidationError};
use crate::session::domain::SessionId;
use crate::task::ports::TaskRepository;
use futures_util::{SinkExt, StreamExt};
use mockable::Clock;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

/// Accepts WebSocket connections until `shutdown` is cancelled.
///
/// Each connection queues at most `outbox_capacity` outbound frames.
///
/// Open connections are closed when `shutdown` fires; their sessions are
/// disconnected the same way as a peer-initiated close.
pub async fn serve<A, T, C>(
    listener: TcpListener,
    engine: Arc<DispatchEngine<A, T, C>>,
    router: Router,
    outbox_capacity: usize,
    shutdown: CancellationToken,
) where
    A: AgentRepository + 'static,
    T: TaskRepository + 'static,
    C: Clock + Send + Sync + 'static,
{
    let outbox_capacity = outbox_capacity.max(1);
    if let Ok(address) = listener.local_addr() {
        info!(%address, "accepting websocket connections");
    }
    loop {
        let accepted = tokio::select! {
            () = shutdown.cancelled() => break,
            accepted = listener.accept() => accepted,
        };
        let (stream, peer) = match accepted {
            Ok(connection) => connection,
            Err(err) => {
                warn!(error = %err, "failed to accept connection");
                continue;
            }
        };
        let session_id = SessionId::new();
        let span = info_span!("session", %session_id, %peer);
        tokio::spawn(
            handle_connection(
                stream,
                peer,
                session_id,
                Arc::clone(&engine),
                router.clone(),
                outbox_capacity,
                shutdown.child_token(),
            )
            .instrument(span),
        );
    }
    info!("websocket listener stopped");
}

async fn handle_connection<A, T, C>(
    stream: TcpStream,
    peer: SocketAddr,
    session_id: SessionId,
    engine: Arc<DispatchEngine<A, T, C>>,
    router: Router,
    outbox_capacity: usize,
    shutdown: CancellationToken,
) where
    A: AgentRepository + 'static,
    T: TaskRepository + 'static,
    C: Clock + Send + Sync + 'static,
{
    let socket = match accept_async(stream).await {
        Ok(socket) => socket,
        Err(err) => {
            warn!(%peer, error = %err, "websocket handshake failed");
            return;
        }
    };
    let (mut sink, mut source) = socket.split();
    let (outbox, mut inbox) = mpsc::channel::<Arc<str>>(outbox_capacity);

    let writer = tokio::spawn(
        async move {
            while let Some(frame) = inbox.recv().await {
                if let Err(err) = sink.send(Message::text(frame.to_string())).await {
                    debug!(error = %err, "websocket send failed");
                    break;
                }
            }
            if let Err(err) = sink.close().await {
                debug!(error = %err, "websocket close failed");
            }
        }
        .in_current_span(),
    );

    router.deliver(engine.connect(session_id, outbox));

    loop {
        let next = tokio::select! {
            () = shutdown.cancelled() => break,
            next = source.next() => next,
        };
        match next {
            Some(Ok(Message::Text(text))) => {
                router.deliver(engine.handle_frame(session_id, text.as_str()).await);
            }
            Some(Ok(Message::Binary(_))) => {
                router.deliver(engine.reject(session_id, ValidationError::UnsupportedFrame("binary")));
            }
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(_)) => {}
            Some(Err(err)) => {
                debug!(error = %err, "websocket receive failed");
                break;
            }
        }
    }

    router.deliver(engine.disconnect(session_id).await);
    writer.abort();
    info!("session closed");
}
