//! Read-only lookup of persisted spaces.
//!
//! Spaces are created and edited by the CRUD subsystem. The realtime
//! layer only needs `get_space(id) -> bounds`, which [`SpaceDirectory`]
//! expresses. [`InMemorySpaceDirectory`] backs it with a map for tests
//! and for running the realtime layer standalone from a catalogue file.

use std::collections::HashMap;

use gridspace_arena::{ArenaError, SpaceLayout};
use gridspace_protocol::{Position, SpaceId};
use serde::Deserialize;
use tokio::sync::RwLock;

/// Looks up a space's layout. `None` means the space does not exist.
pub trait SpaceDirectory: Send + Sync + 'static {
    fn get_space(
        &self,
        space_id: &SpaceId,
    ) -> impl std::future::Future<Output = Option<SpaceLayout>> + Send;
}

/// One entry of a space catalogue, in the store's own format.
///
/// ```json
/// { "id": "lobby", "dimensions": "100x200", "obstacles": [{ "x": 20, "y": 20 }] }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct SpaceRecord {
    pub id: SpaceId,
    pub dimensions: String,
    /// Cells covered by static elements.
    #[serde(default)]
    pub obstacles: Vec<Position>,
}

impl SpaceRecord {
    /// Parses the dimensions string into a layout.
    pub fn layout(&self) -> Result<SpaceLayout, ArenaError> {
        Ok(SpaceLayout::from_dimensions(&self.dimensions)?.with_obstacles(self.obstacles.iter().copied()))
    }
}

/// A [`SpaceDirectory`] held in memory.
#[derive(Debug, Default)]
pub struct InMemorySpaceDirectory {
    spaces: RwLock<HashMap<SpaceId, SpaceLayout>>,
}

impl InMemorySpaceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a directory from catalogue records.
    ///
    /// # Errors
    /// Fails on the first record whose dimensions don't parse.
    pub fn from_records(records: impl IntoIterator<Item = SpaceRecord>) -> Result<Self, ArenaError> {
        let mut spaces = HashMap::new();
        for record in records {
            let layout = record.layout()?;
            spaces.insert(record.id, layout);
        }
        Ok(Self {
            spaces: RwLock::new(spaces),
        })
    }

    /// Adds or replaces a space.
    pub async fn insert(&self, space_id: SpaceId, layout: SpaceLayout) {
        self.spaces.write().await.insert(space_id, layout);
    }

    /// Removes a space. Live runtimes keep their bounds; only new joins
    /// are affected.
    pub async fn remove(&self, space_id: &SpaceId) -> Option<SpaceLayout> {
        self.spaces.write().await.remove(space_id)
    }

    pub async fn len(&self) -> usize {
        self.spaces.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.spaces.read().await.is_empty()
    }
}

impl SpaceDirectory for InMemorySpaceDirectory {
    async fn get_space(&self, space_id: &SpaceId) -> Option<SpaceLayout> {
        self.spaces.read().await.get(space_id).cloned()
    }
}
