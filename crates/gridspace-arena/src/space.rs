//! Space actor: an isolated Tokio task that owns one space's occupants.
//!
//! Each live space runs in its own task and is reached only through an
//! mpsc channel. Commands are handled strictly one after another, so
//! join, move and leave for a space are totally ordered, and fan-out
//! for a command is finished before the next command starts.

use std::time::Instant;

use gridspace_protocol::{Position, ServerMessage, SpaceId, UserId};
use gridspace_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot};

use crate::manager::Directory;
use crate::router::Router;
use crate::{ArenaError, MoveOutcome, OccupantSender, Recipient, SpaceLayout, SpaceRuntime};

/// Commands sent to a space actor through its channel.
///
/// The `oneshot::Sender` in each variant is the reply channel.
pub(crate) enum SpaceCommand {
    Join {
        conn_id: ConnectionId,
        user_id: UserId,
        sender: OccupantSender,
        reply: oneshot::Sender<Result<Position, ArenaError>>,
    },
    Move {
        conn_id: ConnectionId,
        x: i64,
        y: i64,
        reply: oneshot::Sender<Result<MoveOutcome, ArenaError>>,
    },
    Leave {
        conn_id: ConnectionId,
        reply: oneshot::Sender<Result<(), ArenaError>>,
    },
    Snapshot {
        reply: oneshot::Sender<SpaceSnapshot>,
    },
}

/// A read-only copy of a space's occupant table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceSnapshot {
    pub space_id: SpaceId,
    pub width: u32,
    pub height: u32,
    /// In join order.
    pub occupants: Vec<OccupantSnapshot>,
}

/// One row of a [`SpaceSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccupantSnapshot {
    pub conn_id: ConnectionId,
    pub user_id: UserId,
    pub position: Position,
    /// When the occupant entered this space's runtime.
    pub joined_at: Instant,
}

/// Handle to a running space actor.
///
/// Cheap to clone. A connection keeps the handle of the space it joined
/// so that its moves go straight to the actor.
#[derive(Debug, Clone)]
pub struct SpaceHandle {
    space_id: SpaceId,
    /// Distinguishes successive actors for the same space id.
    generation: u64,
    sender: mpsc::Sender<SpaceCommand>,
}

impl SpaceHandle {
    /// Returns the space's ID.
    pub fn space_id(&self) -> &SpaceId {
        &self.space_id
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Adds an occupant; returns its spawn cell.
    ///
    /// On success the joiner has been sent `space-joined` and everyone
    /// else `user-joined`.
    pub async fn join(
        &self,
        conn_id: ConnectionId,
        user_id: UserId,
        sender: OccupantSender,
    ) -> Result<Position, ArenaError> {
        let (reply, rx) = oneshot::channel();
        self.request(
            SpaceCommand::Join {
                conn_id,
                user_id,
                sender,
                reply,
            },
            rx,
        )
        .await?
    }

    /// Requests a step to `(x, y)` for an occupant.
    pub async fn move_to(&self, conn_id: ConnectionId, x: i64, y: i64) -> Result<MoveOutcome, ArenaError> {
        let (reply, rx) = oneshot::channel();
        self.request(SpaceCommand::Move { conn_id, x, y, reply }, rx)
            .await?
    }

    /// Removes an occupant and tells the rest it left.
    pub async fn leave(&self, conn_id: ConnectionId) -> Result<(), ArenaError> {
        let (reply, rx) = oneshot::channel();
        self.request(SpaceCommand::Leave { conn_id, reply }, rx).await?
    }

    /// Copies the current occupant table.
    pub async fn snapshot(&self) -> Result<SpaceSnapshot, ArenaError> {
        let (reply, rx) = oneshot::channel();
        self.request(SpaceCommand::Snapshot { reply }, rx).await
    }

    async fn request<T>(&self, cmd: SpaceCommand, rx: oneshot::Receiver<T>) -> Result<T, ArenaError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| ArenaError::Unavailable(self.space_id.clone()))?;
        rx.await.map_err(|_| ArenaError::Unavailable(self.space_id.clone()))
    }
}

/// The internal actor state. Runs inside a Tokio task.
struct SpaceActor {
    runtime: SpaceRuntime,
    router: Router,
    generation: u64,
    receiver: mpsc::Receiver<SpaceCommand>,
    directory: Directory,
}

impl SpaceActor {
    /// Processes commands until the space has no occupants left, then
    /// releases itself.
    async fn run(mut self) {
        let space_id = self.runtime.space_id().clone();
        tracing::info!(
            %space_id,
            width = self.runtime.layout().width,
            height = self.runtime.layout().height,
            "space runtime created"
        );

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                SpaceCommand::Join {
                    conn_id,
                    user_id,
                    sender,
                    reply,
                } => {
                    let result = self.handle_join(conn_id, user_id, sender);
                    let _ = reply.send(result);
                }
                SpaceCommand::Move { conn_id, x, y, reply } => {
                    let result = self.handle_move(conn_id, x, y);
                    let _ = reply.send(result);
                }
                SpaceCommand::Leave { conn_id, reply } => {
                    let result = self.handle_leave(conn_id);
                    let _ = reply.send(result);
                }
                SpaceCommand::Snapshot { reply } => {
                    let _ = reply.send(self.snapshot());
                }
            }

            if self.runtime.is_empty() {
                break;
            }
        }

        self.release().await;
        tracing::info!(%space_id, "space runtime released");
    }

    fn handle_join(
        &mut self,
        conn_id: ConnectionId,
        user_id: UserId,
        sender: OccupantSender,
    ) -> Result<Position, ArenaError> {
        let spawn = self.runtime.insert(conn_id, user_id.clone())?;
        self.router.insert(conn_id, sender);

        tracing::info!(
            space_id = %self.runtime.space_id(),
            %conn_id,
            %user_id,
            %spawn,
            occupants = self.runtime.len(),
            "occupant joined"
        );

        let users = self.runtime.others(conn_id);
        self.dispatch(vec![
            (Recipient::Only(conn_id), ServerMessage::SpaceJoined { spawn, users }),
            (
                Recipient::AllExcept(conn_id),
                ServerMessage::UserJoined {
                    user_id,
                    x: spawn.x,
                    y: spawn.y,
                },
            ),
        ]);
        Ok(spawn)
    }

    fn handle_move(&mut self, conn_id: ConnectionId, x: i64, y: i64) -> Result<MoveOutcome, ArenaError> {
        let outcome = self.runtime.apply_move(conn_id, x, y)?;

        let event = match outcome {
            MoveOutcome::Accepted(to) => {
                let user_id = self
                    .runtime
                    .get(conn_id)
                    .map(|o| o.user_id.clone())
                    .ok_or_else(|| ArenaError::NotInSpace(conn_id, self.runtime.space_id().clone()))?;
                (
                    Recipient::All,
                    ServerMessage::Movement {
                        user_id,
                        x: to.x,
                        y: to.y,
                    },
                )
            }
            MoveOutcome::Rejected { at, reason } => {
                tracing::debug!(
                    space_id = %self.runtime.space_id(),
                    %conn_id,
                    x,
                    y,
                    ?reason,
                    "movement rejected"
                );
                (
                    Recipient::Only(conn_id),
                    ServerMessage::MovementRejected { x: at.x, y: at.y },
                )
            }
        };
        self.dispatch(vec![event]);
        Ok(outcome)
    }

    fn handle_leave(&mut self, conn_id: ConnectionId) -> Result<(), ArenaError> {
        let occupant = self.runtime.remove(conn_id)?;
        self.router.remove(conn_id);

        tracing::info!(
            space_id = %self.runtime.space_id(),
            %conn_id,
            user_id = %occupant.user_id,
            occupants = self.runtime.len(),
            "occupant left"
        );

        self.dispatch(vec![(
            Recipient::All,
            ServerMessage::UserLeft {
                user_id: occupant.user_id,
            },
        )]);
        Ok(())
    }

    /// Sends events, then evicts any occupant whose channel turned out to
    /// be closed. Each eviction is itself broadcast as `user-left`, which
    /// may uncover further broken channels; the loop runs until a round
    /// delivers cleanly.
    fn dispatch(&mut self, events: Vec<(Recipient, ServerMessage)>) {
        let mut broken = self.router.dispatch(events);
        while !broken.is_empty() {
            let mut departures = Vec::with_capacity(broken.len());
            for conn_id in broken {
                self.router.remove(conn_id);
                if let Ok(occupant) = self.runtime.remove(conn_id) {
                    tracing::warn!(
                        space_id = %self.runtime.space_id(),
                        %conn_id,
                        user_id = %occupant.user_id,
                        "evicting occupant with closed channel"
                    );
                    departures.push((
                        Recipient::All,
                        ServerMessage::UserLeft {
                            user_id: occupant.user_id,
                        },
                    ));
                }
            }
            broken = self.router.dispatch(departures);
        }
    }

    fn snapshot(&self) -> SpaceSnapshot {
        SpaceSnapshot {
            space_id: self.runtime.space_id().clone(),
            width: self.runtime.layout().width,
            height: self.runtime.layout().height,
            occupants: self
                .runtime
                .occupants()
                .into_iter()
                .map(|o| OccupantSnapshot {
                    conn_id: o.conn_id,
                    user_id: o.user_id.clone(),
                    position: o.position,
                    joined_at: o.joined_at,
                })
                .collect(),
        }
    }

    /// Unregisters this actor from the directory and fails whatever is
    /// still queued, so those callers retry against a fresh actor.
    async fn release(mut self) {
        {
            let mut spaces = self.directory.lock().await;
            let ours = spaces
                .get(self.runtime.space_id())
                .is_some_and(|h| h.generation() == self.generation);
            if ours {
                spaces.remove(self.runtime.space_id());
            }
        }

        self.receiver.close();
        while let Some(cmd) = self.receiver.recv().await {
            let unavailable = || ArenaError::Unavailable(self.runtime.space_id().clone());
            match cmd {
                SpaceCommand::Join { reply, .. } => {
                    let _ = reply.send(Err(unavailable()));
                }
                SpaceCommand::Move { reply, .. } => {
                    let _ = reply.send(Err(unavailable()));
                }
                SpaceCommand::Leave { reply, .. } => {
                    let _ = reply.send(Err(unavailable()));
                }
                SpaceCommand::Snapshot { reply } => {
                    let _ = reply.send(self.snapshot());
                }
            }
        }
    }
}

/// Spawns a new space actor task and returns a handle to it.
///
/// `channel_size` bounds the command queue; callers wait when it is full.
pub(crate) fn spawn_space(
    space_id: SpaceId,
    layout: SpaceLayout,
    generation: u64,
    channel_size: usize,
    directory: Directory,
) -> SpaceHandle {
    let (tx, rx) = mpsc::channel(channel_size);

    let actor = SpaceActor {
        runtime: SpaceRuntime::new(space_id.clone(), layout),
        router: Router::default(),
        generation,
        receiver: rx,
        directory,
    };

    tokio::spawn(actor.run());

    SpaceHandle {
        space_id,
        generation,
        sender: tx,
    }
}
