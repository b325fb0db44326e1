//! Per-connection handler: registration, the writer task, the read loop.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register the connection with the hub → outbound queue (a
//!      reconnecting client names its room and player in the upgrade
//!      request's query and is put straight back into its game)
//!   2. Spawn a writer task draining the queue onto the socket
//!   3. Loop: receive frames → hand them to the hub
//!   4. On exit, the guard unregisters the connection

use std::sync::Arc;

use gamenight_protocol::{JoinGameRequest, RoomCode};
use gamenight_session::Frame;
use gamenight_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::{GameNightError, Hub};

/// Drop guard that unregisters the connection when the handler exits.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, we spawn a fire-and-forget task for the async lock.
struct ConnectionGuard {
    conn_id: ConnectionId,
    hub: Hub,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let hub = self.hub.clone();
        tokio::spawn(async move {
            hub.disconnect(conn_id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    hub: Hub,
) -> Result<(), GameNightError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    let origin = conn.peer_addr().map(|addr| addr.ip());
    tracing::debug!(%conn_id, ?origin, "handling new connection");

    let outbound = match resume_request(&conn) {
        Some(resume) => hub.register_resuming(conn_id, origin, resume).await?,
        None => hub.connect(conn_id, origin).await?,
    };
    let _guard = ConnectionGuard {
        conn_id,
        hub: hub.clone(),
    };
    let writer = spawn_writer(Arc::clone(&conn), outbound);

    loop {
        match conn.recv().await {
            Ok(Some(data)) => hub.handle_message(conn_id, &data).await,
            Ok(None) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
        }
    }

    writer.abort();
    // _guard drops here → hub disconnect fires.
    Ok(())
}

/// The `roomCode` and `name` a reconnecting client sent in its upgrade
/// request, as in `ws://host/ws?roomCode=4821&name=bob`.
fn resume_request(conn: &WebSocketConnection) -> Option<JoinGameRequest> {
    let room_code = conn.query_param("roomCode")?;
    let name = conn.query_param("name")?;
    if room_code.trim().is_empty() || name.trim().is_empty() {
        return None;
    }
    Some(JoinGameRequest {
        room_code: RoomCode::new(room_code.trim()),
        name,
    })
}

/// Writes queued frames to the socket in order.
///
/// The queue closing means the hub dropped this connection (evicted as a
/// slow consumer, or replaced by a rejoin elsewhere), so the socket is
/// closed too, which ends the read loop.
fn spawn_writer(
    conn: Arc<WebSocketConnection>,
    mut outbound: mpsc::Receiver<Frame>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let conn_id = conn.id();
        while let Some(frame) = outbound.recv().await {
            if let Err(e) = conn.send(&frame).await {
                tracing::debug!(%conn_id, error = %e, "send failed");
                break;
            }
        }
        tracing::debug!(%conn_id, "outbound queue closed");
        let _ = conn.close().await;
    })
}
