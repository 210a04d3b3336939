//! Arena manager: finds, lazily creates, and forgets space actors.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use gridspace_protocol::{Position, SpaceId, UserId};
use gridspace_transport::ConnectionId;
use tokio::sync::Mutex;

use crate::space::spawn_space;
use crate::{ArenaError, OccupantSender, SpaceHandle, SpaceLayout, SpaceSnapshot};

/// Counter for telling apart successive actors of the same space.
static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Default command channel size for space actors.
pub const DEFAULT_CHANNEL_SIZE: usize = 64;

/// How many times a join chases a space that was released under it.
const MAX_JOIN_ATTEMPTS: usize = 8;

/// Live space actors by space id. Shared with the actors themselves so
/// an emptied actor can remove its own entry.
pub(crate) type Directory = Arc<Mutex<HashMap<SpaceId, SpaceHandle>>>;

/// Tracks which spaces currently have a live runtime.
///
/// The directory lock is only held for a map lookup or insert, never
/// across a command to a space, so work in one space never waits on
/// another.
#[derive(Clone)]
pub struct ArenaManager {
    spaces: Directory,
    channel_size: usize,
}

impl ArenaManager {
    /// Creates an empty manager with the default channel size.
    pub fn new() -> Self {
        Self::with_channel_size(DEFAULT_CHANNEL_SIZE)
    }

    /// Creates an empty manager whose space actors queue up to
    /// `channel_size` commands.
    pub fn with_channel_size(channel_size: usize) -> Self {
        Self {
            spaces: Arc::new(Mutex::new(HashMap::new())),
            channel_size: channel_size.max(1),
        }
    }

    /// Joins a connection to a space, starting the space's runtime if it
    /// has none.
    ///
    /// `layout` is only used when a new runtime is started; a running
    /// space keeps the bounds it was created with.
    pub async fn join(
        &self,
        space_id: &SpaceId,
        layout: &SpaceLayout,
        conn_id: ConnectionId,
        user_id: UserId,
        sender: OccupantSender,
    ) -> Result<(SpaceHandle, Position), ArenaError> {
        for _ in 0..MAX_JOIN_ATTEMPTS {
            let handle = self.get_or_spawn(space_id, layout).await;
            match handle.join(conn_id, user_id.clone(), sender.clone()).await {
                Ok(spawn) => return Ok((handle, spawn)),
                // Released between lookup and join; the next lookup
                // starts a fresh runtime.
                Err(ArenaError::Unavailable(_)) => {
                    self.forget(&handle).await;
                }
                Err(e) => return Err(e),
            }
        }
        Err(ArenaError::Unavailable(space_id.clone()))
    }

    /// Returns the handle of a live space, if it has a runtime.
    pub async fn get(&self, space_id: &SpaceId) -> Option<SpaceHandle> {
        self.spaces.lock().await.get(space_id).cloned()
    }

    /// Copies a live space's occupant table.
    pub async fn snapshot(&self, space_id: &SpaceId) -> Option<SpaceSnapshot> {
        let handle = self.get(space_id).await?;
        handle.snapshot().await.ok()
    }

    /// Number of spaces with a live runtime.
    pub async fn space_count(&self) -> usize {
        self.spaces.lock().await.len()
    }

    async fn get_or_spawn(&self, space_id: &SpaceId, layout: &SpaceLayout) -> SpaceHandle {
        let mut spaces = self.spaces.lock().await;
        if let Some(handle) = spaces.get(space_id) {
            return handle.clone();
        }

        let handle = spawn_space(
            space_id.clone(),
            layout.clone(),
            NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
            self.channel_size,
            Arc::clone(&self.spaces),
        );
        spaces.insert(space_id.clone(), handle.clone());
        handle
    }

    /// Drops `handle` from the directory unless a newer actor replaced it.
    async fn forget(&self, handle: &SpaceHandle) {
        let mut spaces = self.spaces.lock().await;
        if spaces
            .get(handle.space_id())
            .is_some_and(|h| h.generation() == handle.generation())
        {
            spaces.remove(handle.space_id());
        }
    }
}

impl Default for ArenaManager {
    fn default() -> Self {
        Self::new()
    }
}
