//! Occupant table and the rules that govern it.
//!
//! Everything here is synchronous and deterministic: given the same
//! table, spawn assignment and move validation always give the same
//! answer. The space actor is the only caller that mutates a
//! [`SpaceRuntime`].

use std::collections::HashMap;
use std::time::Instant;

use gridspace_protocol::{OccupantView, Position, SpaceId, UserId};
use gridspace_transport::ConnectionId;

use crate::{ArenaError, SpaceLayout};

/// One connection's presence in a space.
#[derive(Debug, Clone)]
pub struct Occupant {
    pub conn_id: ConnectionId,
    pub user_id: UserId,
    pub position: Position,
    pub joined_at: Instant,
    /// Monotonic per space; orders the `users` list in `space-joined`.
    join_seq: u64,
}

/// Why a move was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveRejection {
    /// `|dx| + |dy| != 1`: diagonal, zero-length, or multi-cell.
    NotOneStep,
    /// Target is off the grid.
    OutOfBounds,
    /// Another occupant stands on the target.
    Occupied,
    /// A static element covers the target.
    Blocked,
}

/// Result of a move request. Both variants are reported to the mover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The occupant now stands at this cell.
    Accepted(Position),
    /// Nothing changed; the occupant is still at `at`.
    Rejected { at: Position, reason: MoveRejection },
}

/// The live state of one space: bounds plus who stands where.
///
/// Invariants held by every method:
/// - every occupant is inside `[0, width) x [0, height)`
/// - no two occupants share a cell, and none stands on an obstacle
#[derive(Debug)]
pub struct SpaceRuntime {
    space_id: SpaceId,
    layout: SpaceLayout,
    occupants: HashMap<ConnectionId, Occupant>,
    next_seq: u64,
}

impl SpaceRuntime {
    pub fn new(space_id: SpaceId, layout: SpaceLayout) -> Self {
        Self {
            space_id,
            layout,
            occupants: HashMap::new(),
            next_seq: 0,
        }
    }

    pub fn space_id(&self) -> &SpaceId {
        &self.space_id
    }

    pub fn layout(&self) -> &SpaceLayout {
        &self.layout
    }

    pub fn len(&self) -> usize {
        self.occupants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occupants.is_empty()
    }

    pub fn get(&self, conn_id: ConnectionId) -> Option<&Occupant> {
        self.occupants.get(&conn_id)
    }

    /// Occupants in the order they joined.
    pub fn occupants(&self) -> Vec<&Occupant> {
        let mut all: Vec<&Occupant> = self.occupants.values().collect();
        all.sort_by_key(|o| o.join_seq);
        all
    }

    /// Connection ids of all current occupants.
    pub fn connections(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.occupants.keys().copied()
    }

    /// `true` if no occupant and no obstacle is on `pos`.
    pub fn is_free(&self, pos: Position) -> bool {
        !self.layout.is_blocked(pos) && !self.occupants.values().any(|o| o.position == pos)
    }

    /// Chooses a spawn cell for a newcomer.
    ///
    /// Starts at the centre `(width/2, height/2)` and scans forward in
    /// row-major order, wrapping to `(0, 0)` after the last cell, until it
    /// finds a cell that is neither occupied nor blocked. Returns `None`
    /// when the grid has no free cell.
    pub fn assign_spawn(&self) -> Option<Position> {
        let width = u64::from(self.layout.width);
        let area = self.layout.area();
        if area == 0 {
            return None;
        }

        let centre = u64::from(self.layout.height / 2) * width + u64::from(self.layout.width / 2);
        // Each taken cell can push the scan forward by at most one slot.
        let limit = area.min(self.occupants.len() as u64 + self.layout.obstacles.len() as u64 + 1);

        (0..limit)
            .map(|step| (centre + step) % area)
            .map(|index| Position::new((index % width) as u32, (index / width) as u32))
            .find(|pos| self.is_free(*pos))
    }

    /// Registers a newcomer at a freshly assigned spawn cell.
    pub fn insert(&mut self, conn_id: ConnectionId, user_id: UserId) -> Result<Position, ArenaError> {
        if self.occupants.contains_key(&conn_id) {
            return Err(ArenaError::AlreadyInSpace(conn_id, self.space_id.clone()));
        }
        let spawn = self
            .assign_spawn()
            .ok_or_else(|| ArenaError::SpaceFull(self.space_id.clone()))?;

        let join_seq = self.next_seq;
        self.next_seq += 1;
        self.occupants.insert(
            conn_id,
            Occupant {
                conn_id,
                user_id,
                position: spawn,
                joined_at: Instant::now(),
                join_seq,
            },
        );
        Ok(spawn)
    }

    /// Deregisters an occupant and returns it.
    pub fn remove(&mut self, conn_id: ConnectionId) -> Result<Occupant, ArenaError> {
        self.occupants
            .remove(&conn_id)
            .ok_or_else(|| ArenaError::NotInSpace(conn_id, self.space_id.clone()))
    }

    /// Everyone except `conn_id`, as listed in `space-joined`.
    pub fn others(&self, conn_id: ConnectionId) -> Vec<OccupantView> {
        self.occupants()
            .into_iter()
            .filter(|o| o.conn_id != conn_id)
            .map(|o| OccupantView {
                user_id: o.user_id.clone(),
                x: o.position.x,
                y: o.position.y,
            })
            .collect()
    }

    /// Checks a step from `from` to the absolute target `(x, y)` without
    /// applying it.
    ///
    /// Rules, in order: exactly one orthogonal step; inside the grid;
    /// not onto another occupant or an obstacle.
    pub fn validate_move(&self, from: Position, x: i64, y: i64) -> Result<Position, MoveRejection> {
        // Targets are arbitrary client i64s; a delta that overflows is
        // certainly not one step.
        let delta = (x.checked_sub(i64::from(from.x)), y.checked_sub(i64::from(from.y)));
        if !matches!(delta, (Some(-1 | 1), Some(0)) | (Some(0), Some(-1 | 1))) {
            return Err(MoveRejection::NotOneStep);
        }
        if !self.layout.contains(x, y) {
            return Err(MoveRejection::OutOfBounds);
        }

        let target = Position::new(x as u32, y as u32);
        if self.layout.is_blocked(target) {
            return Err(MoveRejection::Blocked);
        }
        if self.occupants.values().any(|o| o.position == target) {
            return Err(MoveRejection::Occupied);
        }
        Ok(target)
    }

    /// Validates and, if valid, commits a move for `conn_id`.
    pub fn apply_move(&mut self, conn_id: ConnectionId, x: i64, y: i64) -> Result<MoveOutcome, ArenaError> {
        let from = self
            .get(conn_id)
            .map(|o| o.position)
            .ok_or_else(|| ArenaError::NotInSpace(conn_id, self.space_id.clone()))?;

        let outcome = match self.validate_move(from, x, y) {
            Ok(target) => {
                if let Some(occupant) = self.occupants.get_mut(&conn_id) {
                    occupant.position = target;
                }
                MoveOutcome::Accepted(target)
            }
            Err(reason) => MoveOutcome::Rejected { at: from, reason },
        };
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    fn runtime(width: u32, height: u32) -> SpaceRuntime {
        SpaceRuntime::new(SpaceId::from("s"), SpaceLayout::new(width, height))
    }

    /// Puts `conn_id` at an exact cell by spawning and walking there.
    fn place(rt: &mut SpaceRuntime, conn_id: u64, at: Position) {
        rt.insert(conn(conn_id), UserId::from(format!("u{conn_id}"))).unwrap();
        rt.occupants.get_mut(&conn(conn_id)).unwrap().position = at;
    }

    // =====================================================================
    // Spawn assignment
    // =====================================================================

    #[test]
    fn test_first_spawn_is_centre() {
        let rt = runtime(100, 200);
        assert_eq!(rt.assign_spawn(), Some(Position::new(50, 100)));
    }

    #[test]
    fn test_spawn_scans_to_next_free_cell() {
        let mut rt = runtime(100, 200);
        let a = rt.insert(conn(1), "a".into()).unwrap();
        let b = rt.insert(conn(2), "b".into()).unwrap();
        let c = rt.insert(conn(3), "c".into()).unwrap();

        assert_eq!(a, Position::new(50, 100));
        assert_eq!(b, Position::new(51, 100));
        assert_eq!(c, Position::new(52, 100));
    }

    #[test]
    fn test_spawn_wraps_to_next_row_and_origin() {
        let mut rt = runtime(2, 2);
        // Centre of 2x2 is (1, 1), the last cell; the scan wraps to (0, 0).
        assert_eq!(rt.insert(conn(1), "a".into()).unwrap(), Position::new(1, 1));
        assert_eq!(rt.insert(conn(2), "b".into()).unwrap(), Position::new(0, 0));
        assert_eq!(rt.insert(conn(3), "c".into()).unwrap(), Position::new(1, 0));
        assert_eq!(rt.insert(conn(4), "d".into()).unwrap(), Position::new(0, 1));
    }

    #[test]
    fn test_spawn_fails_when_grid_full() {
        let mut rt = runtime(1, 1);
        rt.insert(conn(1), "a".into()).unwrap();

        let result = rt.insert(conn(2), "b".into());
        assert!(matches!(result, Err(ArenaError::SpaceFull(_))));
        assert_eq!(rt.len(), 1);
    }

    #[test]
    fn test_spawn_fails_on_empty_grid() {
        let rt = runtime(0, 5);
        assert_eq!(rt.assign_spawn(), None);
    }

    #[test]
    fn test_spawn_reuses_freed_centre() {
        let mut rt = runtime(10, 10);
        rt.insert(conn(1), "a".into()).unwrap();
        rt.insert(conn(2), "b".into()).unwrap();
        rt.remove(conn(1)).unwrap();

        assert_eq!(rt.insert(conn(3), "c".into()).unwrap(), Position::new(5, 5));
    }

    #[test]
    fn test_spawn_skips_obstacles() {
        let layout = SpaceLayout::new(10, 10).with_obstacles([Position::new(5, 5), Position::new(6, 5)]);
        let rt = SpaceRuntime::new(SpaceId::from("s"), layout);
        assert_eq!(rt.assign_spawn(), Some(Position::new(7, 5)));
    }

    #[test]
    fn test_spawns_never_collide() {
        let mut rt = runtime(7, 3);
        let mut seen = std::collections::HashSet::new();
        for id in 0..21 {
            let pos = rt.insert(conn(id), "u".into()).unwrap();
            assert!(seen.insert(pos), "duplicate spawn {pos}");
            assert!(pos.x < 7 && pos.y < 3);
        }
        assert!(rt.insert(conn(99), "u".into()).is_err());
    }

    #[test]
    fn test_insert_twice_is_rejected() {
        let mut rt = runtime(5, 5);
        rt.insert(conn(1), "a".into()).unwrap();
        assert!(matches!(
            rt.insert(conn(1), "a".into()),
            Err(ArenaError::AlreadyInSpace(..))
        ));
        assert_eq!(rt.len(), 1);
    }

    // =====================================================================
    // Movement validation
    // =====================================================================

    #[test]
    fn test_move_accepts_each_orthogonal_step() {
        let rt = runtime(10, 10);
        let from = Position::new(5, 5);
        for (x, y) in [(6, 5), (4, 5), (5, 6), (5, 4)] {
            assert_eq!(rt.validate_move(from, x, y), Ok(Position::new(x as u32, y as u32)));
        }
    }

    #[test]
    fn test_move_rejects_everything_but_one_step() {
        let rt = runtime(10, 10);
        let from = Position::new(5, 5);
        for (x, y) in [(5, 5), (6, 6), (4, 4), (7, 5), (5, 3), (2000, 3000)] {
            assert_eq!(
                rt.validate_move(from, x, y),
                Err(MoveRejection::NotOneStep),
                "({x}, {y})"
            );
        }
    }

    #[test]
    fn test_move_with_extreme_target_is_not_one_step() {
        let rt = runtime(10, 10);
        let from = Position::new(5, 5);
        for (x, y) in [
            (i64::MIN, 5),
            (5, i64::MIN),
            (i64::MAX, i64::MAX),
            (i64::MIN, i64::MIN),
            (i64::MAX, 5),
        ] {
            assert_eq!(
                rt.validate_move(from, x, y),
                Err(MoveRejection::NotOneStep),
                "({x}, {y})"
            );
        }
    }

    #[test]
    fn test_move_rejects_leaving_the_grid() {
        let rt = runtime(100, 200);
        assert_eq!(
            rt.validate_move(Position::new(99, 7), 100, 7),
            Err(MoveRejection::OutOfBounds)
        );
        assert_eq!(
            rt.validate_move(Position::new(0, 7), -1, 7),
            Err(MoveRejection::OutOfBounds)
        );
        assert_eq!(
            rt.validate_move(Position::new(3, 199), 3, 200),
            Err(MoveRejection::OutOfBounds)
        );
        assert_eq!(
            rt.validate_move(Position::new(3, 0), 3, -1),
            Err(MoveRejection::OutOfBounds)
        );
    }

    #[test]
    fn test_move_rejects_occupied_and_blocked_cells() {
        let layout = SpaceLayout::new(10, 10).with_obstacles([Position::new(2, 1)]);
        let mut rt = SpaceRuntime::new(SpaceId::from("s"), layout);
        place(&mut rt, 1, Position::new(1, 1));
        place(&mut rt, 2, Position::new(1, 2));

        assert_eq!(rt.validate_move(Position::new(1, 1), 1, 2), Err(MoveRejection::Occupied));
        assert_eq!(rt.validate_move(Position::new(1, 1), 2, 1), Err(MoveRejection::Blocked));
    }

    #[test]
    fn test_apply_move_commits_accepted_step() {
        let mut rt = runtime(10, 10);
        place(&mut rt, 1, Position::new(3, 3));

        let outcome = rt.apply_move(conn(1), 4, 3).unwrap();

        assert_eq!(outcome, MoveOutcome::Accepted(Position::new(4, 3)));
        assert_eq!(rt.get(conn(1)).unwrap().position, Position::new(4, 3));
    }

    #[test]
    fn test_apply_move_leaves_position_on_rejection() {
        let mut rt = runtime(10, 10);
        place(&mut rt, 1, Position::new(9, 3));

        let outcome = rt.apply_move(conn(1), 10, 3).unwrap();

        assert_eq!(
            outcome,
            MoveOutcome::Rejected {
                at: Position::new(9, 3),
                reason: MoveRejection::OutOfBounds,
            }
        );
        assert_eq!(rt.get(conn(1)).unwrap().position, Position::new(9, 3));
    }

    #[test]
    fn test_apply_move_for_stranger_is_error() {
        let mut rt = runtime(10, 10);
        assert!(matches!(rt.apply_move(conn(5), 1, 0), Err(ArenaError::NotInSpace(..))));
    }

    // =====================================================================
    // Views
    // =====================================================================

    #[test]
    fn test_others_lists_in_join_order_excluding_self() {
        let mut rt = runtime(10, 10);
        rt.insert(conn(9), "first".into()).unwrap();
        rt.insert(conn(2), "second".into()).unwrap();
        rt.insert(conn(5), "third".into()).unwrap();

        let ids: Vec<String> = rt.others(conn(2)).into_iter().map(|v| v.user_id.0).collect();
        assert_eq!(ids, vec!["first", "third"]);
    }

    #[test]
    fn test_remove_unknown_is_error() {
        let mut rt = runtime(3, 3);
        assert!(matches!(rt.remove(conn(1)), Err(ArenaError::NotInSpace(..))));
    }
}
