//! Space geometry: grid bounds and static obstacles.

use std::collections::HashSet;

use gridspace_protocol::Position;
use serde::{Deserialize, Serialize};

use crate::ArenaError;

/// The static shape of a space, as read from the persisted store.
///
/// `obstacles` are the cells covered by static elements. They block
/// spawning and movement. Most spaces have none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceLayout {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub obstacles: HashSet<Position>,
}

impl SpaceLayout {
    /// A layout with no obstacles.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            obstacles: HashSet::new(),
        }
    }

    /// Parses the `"<W>x<H>"` form spaces and maps are stored with,
    /// where each side is one to four decimal digits (e.g. `"100x200"`).
    pub fn from_dimensions(dimensions: &str) -> Result<Self, ArenaError> {
        let invalid = || ArenaError::InvalidDimensions(dimensions.to_string());

        let (w, h) = dimensions.split_once('x').ok_or_else(invalid)?;
        let width = parse_side(w).ok_or_else(invalid)?;
        let height = parse_side(h).ok_or_else(invalid)?;
        Ok(Self::new(width, height))
    }

    /// Adds static obstacles.
    pub fn with_obstacles(mut self, cells: impl IntoIterator<Item = Position>) -> Self {
        self.obstacles.extend(cells);
        self
    }

    /// `true` if `(x, y)` lies on the grid. Takes signed values so raw
    /// client coordinates can be checked before conversion.
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < i64::from(self.width) && y < i64::from(self.height)
    }

    /// `true` if a static element covers `pos`.
    pub fn is_blocked(&self, pos: Position) -> bool {
        self.obstacles.contains(&pos)
    }

    /// Total number of cells.
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

fn parse_side(s: &str) -> Option<u32> {
    if s.is_empty() || s.len() > 4 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
