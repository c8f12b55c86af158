//! Room actor: an isolated Tokio task that owns one table.
//!
//! Each room runs in its own task, communicating with the outside world
//! through an mpsc channel. Every command, including a grace timer going
//! off, is one message, so mutations of a room are applied one at a time
//! and in arrival order. Rooms never share state with each other.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use lcr_engine::{EngineError, FaceSource, Outbox, Room, SeatProfile};
use lcr_protocol::{
    ConnectionId, Phase, Recipient, RoomCode, SeatIndex, ServerEvent, StateSnapshot,
    TripleWildChoice, WildAction,
};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::{RoomConfig, RoomError};

/// Channel for delivering events to one connection's writer task.
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

/// A turn-protocol command from a player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameAction {
    Roll,
    ResolveWilds(Vec<WildAction>),
    TripleWild(TripleWildChoice),
    Reset,
}

/// Commands sent to a room actor through its channel.
///
/// The `oneshot::Sender` in some variants is a reply channel: the caller
/// sends a command and waits for the outcome on it.
pub(crate) enum RoomCommand {
    /// Start receiving the room's broadcasts.
    Subscribe {
        conn: ConnectionId,
        sender: EventSender,
        reply: oneshot::Sender<()>,
    },

    /// Take the lowest free seat. Subscribes as a side effect.
    JoinSeat {
        conn: ConnectionId,
        profile: SeatProfile,
        claim: String,
        sender: EventSender,
        reply: oneshot::Sender<Result<SeatIndex, RoomError>>,
    },

    LeaveSeat {
        conn: ConnectionId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Take a detached seat back. Subscribes as a side effect.
    Reclaim {
        conn: ConnectionId,
        seat: SeatIndex,
        claim: String,
        sender: EventSender,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    Game {
        conn: ConnectionId,
        action: GameAction,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// The connection is gone: stop sending to it, detach its seat.
    Disconnect { conn: ConnectionId },

    /// Sent by a grace timer. Ignored unless `epoch` is still current.
    GraceExpired { seat: SeatIndex, epoch: u64 },

    GetInfo { reply: oneshot::Sender<RoomInfo> },

    /// Stop if the room has been idle for at least `idle_timeout`. The
    /// reply says whether it stopped.
    ShutdownIfIdle {
        idle_timeout: Duration,
        reply: oneshot::Sender<bool>,
    },
}

/// A snapshot of room metadata plus the public table state.
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub code: RoomCode,
    pub phase: Phase,
    pub seated_count: usize,
    /// Seats whose player dropped and is within the grace period.
    pub detached_seats: usize,
    pub subscribers: usize,
    /// How long the room has had nobody seated and nobody watching.
    pub idle_for: Option<Duration>,
    pub state: StateSnapshot,
}

/// Handle to a running room actor. Used to send commands to it.
///
/// Cheap to clone: it is an `mpsc::Sender` and the room's code. The
/// [`RoomStore`](crate::RoomStore) holds one per room.
#[derive(Clone)]
pub struct RoomHandle {
    code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    fn unavailable(&self) -> RoomError {
        RoomError::Unavailable(self.code.clone())
    }

    /// Sends a command built around a fresh reply channel and waits for
    /// the reply.
    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Subscribes `conn`. It immediately receives `roomJoined` and the
    /// current `stateUpdate` on `sender`.
    pub async fn subscribe(
        &self,
        conn: ConnectionId,
        sender: EventSender,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Subscribe {
            conn,
            sender,
            reply,
        })
        .await
    }

    /// Seats `conn` at the lowest free seat under `claim`.
    pub async fn join_seat(
        &self,
        conn: ConnectionId,
        profile: SeatProfile,
        claim: String,
        sender: EventSender,
    ) -> Result<SeatIndex, RoomError> {
        self.request(|reply| RoomCommand::JoinSeat {
            conn,
            profile,
            claim,
            sender,
            reply,
        })
        .await?
    }

    pub async fn leave_seat(&self, conn: ConnectionId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::LeaveSeat { conn, reply })
            .await?
    }

    /// Reattaches `conn` to detached `seat` if `claim` matches.
    pub async fn reclaim(
        &self,
        conn: ConnectionId,
        seat: SeatIndex,
        claim: String,
        sender: EventSender,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Reclaim {
            conn,
            seat,
            claim,
            sender,
            reply,
        })
        .await?
    }

    /// Applies a turn-protocol command on behalf of `conn`.
    pub async fn game(
        &self,
        conn: ConnectionId,
        action: GameAction,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Game {
            conn,
            action,
            reply,
        })
        .await?
    }

    /// Tells the room `conn` has gone (fire-and-forget).
    pub async fn disconnect(&self, conn: ConnectionId) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Disconnect { conn })
            .await
            .map_err(|_| self.unavailable())
    }

    pub async fn get_info(&self) -> Result<RoomInfo, RoomError> {
        self.request(|reply| RoomCommand::GetInfo { reply }).await
    }

    /// Stops the room if nobody has been seated or watching for at least
    /// `idle_timeout`, and returns whether it stopped.
    ///
    /// The check and the stop are one step of the actor, so a join either
    /// lands first and keeps the room alive, or lands after and gets
    /// [`RoomError::Unavailable`].
    pub async fn shutdown_if_idle(&self, idle_timeout: Duration) -> Result<bool, RoomError> {
        self.request(|reply| RoomCommand::ShutdownIfIdle {
            idle_timeout,
            reply,
        })
        .await
    }
}

struct GraceTimer {
    epoch: u64,
    task: JoinHandle<()>,
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    room: Room,
    config: RoomConfig,
    dice: Box<dyn FaceSource>,
    /// Per-connection outbound channels, watchers and seated alike.
    subscribers: HashMap<ConnectionId, EventSender>,
    /// At most one pending timer per detached seat.
    grace_timers: HashMap<SeatIndex, GraceTimer>,
    next_epoch: u64,
    idle_since: Option<Instant>,
    receiver: mpsc::Receiver<RoomCommand>,
    /// Lets grace timers post back without keeping the room alive.
    mailbox: mpsc::WeakSender<RoomCommand>,
}

impl RoomActor {
    /// Runs the actor loop, processing commands until shutdown.
    async fn run(mut self) {
        tracing::info!(room = %self.room.code(), "room actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RoomCommand::Subscribe {
                    conn,
                    sender,
                    reply,
                } => {
                    self.handle_subscribe(conn, sender);
                    let _ = reply.send(());
                }
                RoomCommand::JoinSeat {
                    conn,
                    profile,
                    claim,
                    sender,
                    reply,
                } => {
                    let result = self.handle_join_seat(conn, profile, claim, sender);
                    let _ = reply.send(result);
                }
                RoomCommand::LeaveSeat { conn, reply } => {
                    let result = self.handle_leave_seat(conn);
                    let _ = reply.send(result);
                }
                RoomCommand::Reclaim {
                    conn,
                    seat,
                    claim,
                    sender,
                    reply,
                } => {
                    let result = self.handle_reclaim(conn, seat, &claim, sender);
                    let _ = reply.send(result);
                }
                RoomCommand::Game {
                    conn,
                    action,
                    reply,
                } => {
                    let result = self.handle_game(conn, action);
                    let _ = reply.send(result);
                }
                RoomCommand::Disconnect { conn } => self.handle_disconnect(conn),
                RoomCommand::GraceExpired { seat, epoch } => {
                    self.handle_grace_expired(seat, epoch);
                }
                RoomCommand::GetInfo { reply } => {
                    let _ = reply.send(self.info());
                }
                RoomCommand::ShutdownIfIdle {
                    idle_timeout,
                    reply,
                } => {
                    let stale = self.is_idle()
                        && self
                            .idle_since
                            .is_some_and(|since| since.elapsed() >= idle_timeout);
                    let _ = reply.send(stale);
                    if stale {
                        tracing::info!(room = %self.room.code(), "idle room shutting down");
                        break;
                    }
                }
            }
            self.track_idle();
        }

        for (_, timer) in self.grace_timers.drain() {
            timer.task.abort();
        }
        tracing::info!(room = %self.room.code(), "room actor stopped");
    }

    fn handle_subscribe(&mut self, conn: ConnectionId, sender: EventSender) {
        let _ = sender.send(self.room.lobby_view());
        let _ = sender.send(ServerEvent::StateUpdate(self.room.snapshot()));
        self.subscribers.insert(conn, sender);
        tracing::debug!(
            room = %self.room.code(),
            %conn,
            subscribers = self.subscribers.len(),
            "connection subscribed"
        );
    }

    fn handle_join_seat(
        &mut self,
        conn: ConnectionId,
        profile: SeatProfile,
        claim: String,
        sender: EventSender,
    ) -> Result<SeatIndex, RoomError> {
        let (seat, out) = self.room.join_seat(profile, conn, claim)?;
        self.subscribers.insert(conn, sender);
        self.dispatch(out);
        Ok(seat)
    }

    fn handle_leave_seat(&mut self, conn: ConnectionId) -> Result<(), RoomError> {
        let out = self.room.leave_seat(conn)?;
        self.dispatch(out);
        Ok(())
    }

    fn handle_reclaim(
        &mut self,
        conn: ConnectionId,
        seat: SeatIndex,
        claim: &str,
        sender: EventSender,
    ) -> Result<(), RoomError> {
        let out = self.room.reattach(seat, claim, conn)?;
        if let Some(timer) = self.grace_timers.remove(&seat) {
            timer.task.abort();
        }
        self.subscribers.insert(conn, sender);
        self.dispatch(out);
        Ok(())
    }

    fn handle_game(
        &mut self,
        conn: ConnectionId,
        action: GameAction,
    ) -> Result<(), RoomError> {
        // Anyone watching may reset; the rest needs a seat.
        let watching = self.subscribers.contains_key(&conn);
        let result = match (action, self.room.seat_of(conn)) {
            (GameAction::Reset, _) if watching => Ok(self.room.reset_game()),
            (GameAction::Reset, _) => Err(EngineError::IllegalState("reset from outside the room")),
            (_, None) => Err(EngineError::NotSeated(conn)),
            (GameAction::Roll, Some(seat)) => self.room.roll_dice(seat, &mut *self.dice),
            (GameAction::ResolveWilds(actions), Some(seat)) => {
                self.room.resolve_wilds(seat, &actions)
            }
            (GameAction::TripleWild(choice), Some(seat)) => {
                self.room.triple_wild_choice(seat, choice)
            }
        };

        match result {
            Ok(out) => {
                self.dispatch(out);
                Ok(())
            }
            Err(err) => {
                tracing::debug!(room = %self.room.code(), %conn, %err, "command rejected");
                Err(err.into())
            }
        }
    }

    fn handle_disconnect(&mut self, conn: ConnectionId) {
        self.subscribers.remove(&conn);
        let Some((seat, out)) = self.room.detach(conn) else {
            return;
        };
        self.dispatch(out);
        self.start_grace_timer(seat);
    }

    fn handle_grace_expired(&mut self, seat: SeatIndex, epoch: u64) {
        let current = self
            .grace_timers
            .get(&seat)
            .is_some_and(|timer| timer.epoch == epoch);
        if !current {
            return;
        }
        self.grace_timers.remove(&seat);
        if let Some(out) = self.room.expire_detached(seat) {
            self.dispatch(out);
        }
    }

    fn start_grace_timer(&mut self, seat: SeatIndex) {
        let epoch = self.next_epoch;
        self.next_epoch += 1;
        let grace = self.config.reconnect_grace;
        let mailbox = self.mailbox.clone();

        let task = tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            if let Some(room) = mailbox.upgrade() {
                let _ = room.send(RoomCommand::GraceExpired { seat, epoch }).await;
            }
        });
        if let Some(old) = self.grace_timers.insert(seat, GraceTimer { epoch, task }) {
            old.task.abort();
        }
        tracing::debug!(room = %self.room.code(), seat, ?grace, "grace timer started");
    }

    /// Delivers engine events to their recipients. Subscribers whose
    /// receiving end has gone are dropped.
    fn dispatch(&mut self, out: Outbox) {
        let mut gone = Vec::new();
        for (recipient, event) in out {
            match recipient {
                Recipient::Room => {
                    for (conn, sender) in &self.subscribers {
                        if sender.send(event.clone()).is_err() {
                            gone.push(*conn);
                        }
                    }
                }
                Recipient::Connection(conn) => {
                    if let Some(sender) = self.subscribers.get(&conn) {
                        if sender.send(event).is_err() {
                            gone.push(conn);
                        }
                    }
                }
            }
        }
        for conn in gone {
            self.subscribers.remove(&conn);
        }
    }

    fn is_idle(&self) -> bool {
        self.room.seated_count() == 0 && self.subscribers.is_empty()
    }

    fn track_idle(&mut self) {
        match (self.is_idle(), self.idle_since) {
            (true, None) => self.idle_since = Some(Instant::now()),
            (false, Some(_)) => self.idle_since = None,
            _ => {}
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            code: self.room.code().clone(),
            phase: self.room.phase(),
            seated_count: self.room.seated_count(),
            detached_seats: self.room.detached_seats().count(),
            subscribers: self.subscribers.len(),
            idle_for: self.idle_since.map(|since| since.elapsed()),
            state: self.room.snapshot(),
        }
    }
}

/// Spawns a new room actor task and returns a handle to communicate with it.
///
/// `config.channel_size` controls backpressure: once the channel is full,
/// senders wait.
pub(crate) fn spawn_room(
    code: RoomCode,
    config: RoomConfig,
    dice: Box<dyn FaceSource>,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(config.channel_size.max(1));

    let actor = RoomActor {
        room: Room::new(code.clone()).with_max_name_len(config.max_name_len),
        config,
        dice,
        subscribers: HashMap::new(),
        grace_timers: HashMap::new(),
        next_epoch: 0,
        idle_since: Some(Instant::now()),
        receiver: rx,
        mailbox: tx.downgrade(),
    };

    tokio::spawn(actor.run());

    RoomHandle { code, sender: tx }
}
