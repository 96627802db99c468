//! Per-connection handler: admission, the writer task, and the read loop.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register the session with the broker, handing over the sending
//!      half of the outbound channel.
//!   2. Spawn the writer task: it drains the channel into the socket.
//!   3. Loop: receive frames → `Broker::on_message` → stop on `Close`.
//!   4. Tear down: `close_session`, drain the writer, close the socket.

use std::sync::Arc;

use gamespine_broker::Flow;
use gamespine_protocol::SessionId;
use gamespine_transport::{Connection, TcpConnection};
use tokio::sync::mpsc;

use crate::server::ServerState;
use crate::GamespineError;

/// Drop guard that closes the session when the handler exits.
///
/// Cleanup must happen even if the handler panics. `Drop` is synchronous,
/// so the async teardown runs in a fire-and-forget task; `close_session`
/// is idempotent and the normal path has already done the work.
struct SessionGuard {
    session_id: SessionId,
    state: Arc<ServerState>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let session_id = self.session_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.broker.lock().await.close_session(session_id);
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: TcpConnection,
    state: Arc<ServerState>,
) -> Result<(), GamespineError> {
    let conn_id = conn.id();

    let (outbound, mut rx) = mpsc::unbounded_channel::<String>();
    let session_id =
        state.broker.lock().await.register_session(outbound);
    tracing::debug!(%conn_id, %session_id, "handling new connection");

    let _guard = SessionGuard {
        session_id,
        state: Arc::clone(&state),
    };

    // The writer task ends when every sender is gone, which happens when
    // close_session drops the registry entry.
    let conn = Arc::new(conn);
    let writer_conn = Arc::clone(&conn);
    let writer = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            if let Err(e) = writer_conn.send(&line).await {
                tracing::debug!(error = %e, "send failed, writer stopping");
                break;
            }
        }
    });

    let result = read_loop(&conn, &state, session_id).await;

    // Teardown order matters: removing the session drops our sender, the
    // writer then drains what is already queued (a login refusal, say)
    // before the socket closes under it.
    state.broker.lock().await.close_session(session_id);
    let _ = writer.await;
    let _ = conn.close().await;

    result
}

async fn read_loop(
    conn: &TcpConnection,
    state: &Arc<ServerState>,
    session_id: SessionId,
) -> Result<(), GamespineError> {
    loop {
        let line = match conn.recv().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                tracing::debug!(%session_id, "peer closed the connection");
                return Ok(());
            }
            Err(e) => {
                tracing::debug!(%session_id, error = %e, "recv failed");
                return Err(e.into());
            }
        };

        let flow =
            state.broker.lock().await.on_message(session_id, &line);
        if flow == Flow::Close {
            tracing::debug!(%session_id, "broker requested close");
            return Ok(());
        }
    }
}
