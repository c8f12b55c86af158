//! Per-connection handler: command routing and outbound event delivery.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register the connection with the session manager
//!   2. Spawn a writer task that encodes room events onto the socket
//!   3. Loop: receive frames → decode → dispatch to the right room
//!   4. On exit, detach every seat the connection held

use std::sync::Arc;

use lcr_engine::SeatProfile;
use lcr_protocol::{ClientCommand, Codec, ConnectionId, ErrorCode, RoomCode, ServerEvent};
use lcr_room::{EventSender, GameAction, RoomError, RoomHandle};
use lcr_session::{SessionError, generate_claim};
use lcr_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::LcrError;
use crate::server::ServerState;

/// Drop guard that tells every room the connection touched, and then the
/// session manager, that it has gone.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, we spawn a fire-and-forget task for the async locks.
///
/// Rooms hear first: a claim only becomes reclaimable once the room has
/// been sent the disconnect, so a reclaim always reaches the room after
/// the seat was detached.
struct ConnectionGuard<C: Codec> {
    conn: ConnectionId,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for ConnectionGuard<C> {
    fn drop(&mut self) {
        let conn = self.conn;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let rooms: Vec<RoomCode> = state
                .sessions
                .lock()
                .await
                .get(conn)
                .map(|session| session.rooms.iter().cloned().collect())
                .unwrap_or_default();

            for code in &rooms {
                let handle = state.rooms.lock().await.get(code);
                if let Ok(handle) = handle {
                    if let Err(e) = handle.disconnect(conn).await {
                        tracing::debug!(%conn, room = %code, error = %e, "room gone before disconnect");
                    }
                }
            }

            if let Err(e) = state.sessions.lock().await.disconnect(conn) {
                tracing::warn!(%conn, error = %e, "disconnect of unknown session");
            }
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), LcrError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();

    // Register the session and arm the guard together: if registration
    // fails there is nothing to clean up.
    state.sessions.lock().await.connect(conn_id)?;
    let _guard = ConnectionGuard {
        conn: conn_id,
        state: Arc::clone(&state),
    };
    tracing::info!(conn = %conn_id, peer = %conn.peer_addr(), "connection registered");

    let (events, mut outbound) = mpsc::unbounded_channel::<ServerEvent>();

    let writer = {
        let conn = Arc::clone(&conn);
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            while let Some(event) = outbound.recv().await {
                let bytes = match state.codec.encode(&event) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        tracing::warn!(conn = %conn_id, error = %e, "failed to encode event");
                        continue;
                    }
                };
                if let Err(e) = conn.send(&bytes).await {
                    tracing::debug!(conn = %conn_id, error = %e, "send failed");
                    break;
                }
            }
        })
    };

    loop {
        let data = match tokio::time::timeout(state.connection_timeout, conn.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::info!(conn = %conn_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(conn = %conn_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::info!(conn = %conn_id, "connection timed out");
                break;
            }
        };

        let command: ClientCommand = match state.codec.decode(&data) {
            Ok(command) => command,
            Err(e) => {
                tracing::debug!(conn = %conn_id, error = %e, "failed to decode command");
                send_error(&events, ErrorCode::InvalidMessage, &e.to_string());
                continue;
            }
        };

        dispatch(&state, conn_id, &events, command).await;
    }

    writer.abort();
    let _ = conn.close().await;
    // _guard drops here → seats detach, grace timers start.
    Ok(())
}

/// Routes one decoded command and reports any failure the client should
/// hear about.
async fn dispatch<C: Codec>(
    state: &ServerState<C>,
    conn: ConnectionId,
    events: &EventSender,
    command: ClientCommand,
) {
    let result = match command {
        ClientCommand::Ping => {
            let _ = events.send(ServerEvent::Pong);
            Ok(())
        }
        ClientCommand::CreateRoom => {
            let code = state.rooms.lock().await.create();
            let _ = events.send(ServerEvent::RoomCreated { code });
            Ok(())
        }
        ClientCommand::JoinRoom { code } => join_room(state, conn, events, &code).await,
        ClientCommand::JoinSeat {
            code,
            name,
            avatar,
            color,
        } => {
            let profile = SeatProfile {
                name,
                avatar,
                color,
            };
            join_seat(state, conn, events, &code, profile).await
        }
        ClientCommand::LeaveSeat { code } => leave_seat(state, conn, &code).await,
        ClientCommand::ReclaimSeat { claim } => reclaim_seat(state, conn, events, claim).await,
        ClientCommand::RollDice { code } => game(state, conn, &code, GameAction::Roll).await,
        ClientCommand::ResolveWilds { code, actions } => {
            game(state, conn, &code, GameAction::ResolveWilds(actions)).await
        }
        ClientCommand::TripleWildChoice { code, choice } => {
            game(state, conn, &code, GameAction::TripleWild(choice)).await
        }
        ClientCommand::ResetGame { code } => {
            match game(state, conn, &code, GameAction::Reset).await {
                // Resetting a room that is gone is a no-op.
                Err(LcrError::Room(RoomError::NotFound(_))) => {
                    tracing::debug!(%conn, room = %code, "reset of unknown room ignored");
                    Ok(())
                }
                other => other,
            }
        }
    };

    if let Err(e) = result {
        if e.is_reported() {
            tracing::debug!(%conn, error = %e, "command failed");
            send_error(events, e.code(), &e.to_string());
        } else {
            tracing::debug!(%conn, error = %e, "command ignored");
        }
    }
}

async fn lookup<C: Codec>(state: &ServerState<C>, code: &RoomCode) -> Result<RoomHandle, LcrError> {
    Ok(state.rooms.lock().await.get(code)?)
}

async fn join_room<C: Codec>(
    state: &ServerState<C>,
    conn: ConnectionId,
    events: &EventSender,
    code: &RoomCode,
) -> Result<(), LcrError> {
    let room = lookup(state, code).await?;
    room.subscribe(conn, events.clone()).await?;
    state.sessions.lock().await.subscribe(conn, code)?;
    Ok(())
}

async fn join_seat<C: Codec>(
    state: &ServerState<C>,
    conn: ConnectionId,
    events: &EventSender,
    code: &RoomCode,
    profile: SeatProfile,
) -> Result<(), LcrError> {
    let room = lookup(state, code).await?;
    let claim = generate_claim();
    let seat = room
        .join_seat(conn, profile, claim.clone(), events.clone())
        .await?;

    let mut sessions = state.sessions.lock().await;
    sessions.subscribe(conn, code)?;
    sessions.bind_seat(conn, code, seat, claim);
    Ok(())
}

async fn leave_seat<C: Codec>(
    state: &ServerState<C>,
    conn: ConnectionId,
    code: &RoomCode,
) -> Result<(), LcrError> {
    let room = lookup(state, code).await?;
    room.leave_seat(conn).await?;
    state.sessions.lock().await.release_seat(conn, code);
    Ok(())
}

/// Moves a detached seat onto this connection. The session registry vouches
/// for the claim first, then the room checks it against the seat.
async fn reclaim_seat<C: Codec>(
    state: &ServerState<C>,
    conn: ConnectionId,
    events: &EventSender,
    claim: String,
) -> Result<(), LcrError> {
    let seat_claim = state.sessions.lock().await.reclaim(&claim, conn)?;

    let reattached = match lookup(state, &seat_claim.room).await {
        Ok(room) => room
            .reclaim(conn, seat_claim.seat, claim.clone(), events.clone())
            .await
            .map_err(LcrError::from),
        // A swept room takes its seats with it.
        Err(_) => Err(SessionError::ClaimExpired.into()),
    };

    let mut sessions = state.sessions.lock().await;
    match reattached {
        Ok(()) => {
            sessions.subscribe(conn, &seat_claim.room)?;
            Ok(())
        }
        Err(e) => {
            // The room no longer holds that seat for this claim.
            sessions.forget_claim(&claim);
            Err(e)
        }
    }
}

async fn game<C: Codec>(
    state: &ServerState<C>,
    conn: ConnectionId,
    code: &RoomCode,
    action: GameAction,
) -> Result<(), LcrError> {
    let room = lookup(state, code).await?;
    room.game(conn, action).await?;
    Ok(())
}

fn send_error(events: &EventSender, code: ErrorCode, message: &str) {
    let _ = events.send(ServerEvent::ErrorMessage {
        code,
        message: message.to_string(),
    });
}
