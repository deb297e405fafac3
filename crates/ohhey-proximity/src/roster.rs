//! Scene roster - consumer-side reconciliation of nearby sets
//!
//! A renderer keeps one visual per remote user. Each delivered nearby set is
//! authoritative, so the roster diffs it against what is currently placed
//! and reports what to add, move, and remove. The local user always sits at
//! the scene origin and is never part of the roster.

use std::collections::{HashMap, HashSet};

use ohhey_core::{GeoPosition, NearbyUser, SceneOffset, UserId};
use ohhey_geo::project_to_scene;

/// Changes needed to bring a scene in line with a nearby set
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RosterDiff {
    pub added: Vec<(UserId, SceneOffset)>,
    pub moved: Vec<(UserId, SceneOffset)>,
    pub removed: Vec<UserId>,
}

impl RosterDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.moved.is_empty() && self.removed.is_empty()
    }
}

/// Placed remote users and their scene offsets
#[derive(Debug)]
pub struct SceneRoster {
    local_user: UserId,
    placed: HashMap<UserId, SceneOffset>,
}

impl SceneRoster {
    pub fn new(local_user: UserId) -> Self {
        SceneRoster {
            local_user,
            placed: HashMap::new(),
        }
    }

    /// Apply a delivered nearby set.
    ///
    /// Idempotent: applying the same set from the same local fix twice
    /// yields an empty diff the second time.
    pub fn reconcile(&mut self, local: &GeoPosition, nearby: &[NearbyUser]) -> RosterDiff {
        let mut diff = RosterDiff::default();

        let current: HashSet<&UserId> = nearby
            .iter()
            .map(|n| &n.user_id)
            .filter(|id| **id != self.local_user)
            .collect();

        let mut removed: Vec<UserId> = self
            .placed
            .keys()
            .filter(|id| !current.contains(id))
            .cloned()
            .collect();
        removed.sort();
        for id in &removed {
            self.placed.remove(id);
        }
        diff.removed = removed;

        for user in nearby {
            if user.user_id == self.local_user {
                continue;
            }

            let offset = project_to_scene(local.coord(), user.position.coord());
            match self.placed.insert(user.user_id.clone(), offset) {
                None => diff.added.push((user.user_id.clone(), offset)),
                Some(previous) if previous != offset => {
                    diff.moved.push((user.user_id.clone(), offset))
                }
                Some(_) => {}
            }
        }

        diff
    }

    /// Offset of a placed user
    pub fn offset(&self, user: &UserId) -> Option<SceneOffset> {
        self.placed.get(user).copied()
    }

    pub fn contains(&self, user: &UserId) -> bool {
        self.placed.contains_key(user)
    }

    pub fn len(&self) -> usize {
        self.placed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placed.is_empty()
    }

    /// Placed users, sorted by id
    pub fn users(&self) -> Vec<UserId> {
        let mut users: Vec<UserId> = self.placed.keys().cloned().collect();
        users.sort();
        users
    }

    /// Forget everything, e.g. after the local user stops sharing
    pub fn clear(&mut self) -> Vec<UserId> {
        let mut removed: Vec<UserId> = self.placed.drain().map(|(id, _)| id).collect();
        removed.sort();
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ohhey_core::Timestamp;
    use ohhey_geo::{haversine_distance, offset_by_meters, SCENE_UNITS_PER_METER};

    fn local() -> GeoPosition {
        GeoPosition::new(37.0, -122.0, 5.0, Timestamp::from_millis(1))
    }

    fn nearby(id: &str, north: f64, east: f64) -> NearbyUser {
        let coord = offset_by_meters(local().coord(), north, east);
        let position = GeoPosition::new(coord.latitude, coord.longitude, 1.0, Timestamp::ZERO);
        NearbyUser {
            user_id: UserId::new(id),
            distance: haversine_distance(local().coord(), coord),
            position,
            last_updated: Timestamp::ZERO,
        }
    }

    #[test]
    fn test_add_move_remove() {
        let mut roster = SceneRoster::new(UserId::new("me"));

        let diff = roster.reconcile(&local(), &[nearby("a", 5.0, 0.0), nearby("b", 0.0, 5.0)]);
        assert_eq!(diff.added.len(), 2);
        assert!(diff.moved.is_empty() && diff.removed.is_empty());

        let diff = roster.reconcile(&local(), &[nearby("a", 6.0, 0.0)]);
        assert_eq!(diff.removed, vec![UserId::new("b")]);
        assert_eq!(diff.moved.len(), 1);
        assert_eq!(diff.moved[0].0, UserId::new("a"));
        assert!(diff.added.is_empty());

        assert_eq!(roster.users(), vec![UserId::new("a")]);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let mut roster = SceneRoster::new(UserId::new("me"));
        let set = [nearby("a", 5.0, 1.0), nearby("b", -3.0, 2.0)];

        roster.reconcile(&local(), &set);
        assert!(roster.reconcile(&local(), &set).is_empty());
        assert_eq!(roster.len(), 2);
    }

    #[test]
    fn test_local_user_never_placed() {
        let mut roster = SceneRoster::new(UserId::new("me"));
        let diff = roster.reconcile(&local(), &[nearby("me", 0.0, 0.0), nearby("a", 1.0, 0.0)]);

        assert_eq!(diff.added.len(), 1);
        assert!(!roster.contains(&UserId::new("me")));
    }

    #[test]
    fn test_offset_uses_scene_scale() {
        let mut roster = SceneRoster::new(UserId::new("me"));
        roster.reconcile(&local(), &[nearby("north", 10.0, 0.0)]);

        let offset = roster.offset(&UserId::new("north")).unwrap();
        assert!(offset.x.abs() < 1e-9);
        assert!((offset.z - 10.0 * SCENE_UNITS_PER_METER).abs() < 1e-6);
    }

    #[test]
    fn test_empty_set_clears_scene() {
        let mut roster = SceneRoster::new(UserId::new("me"));
        roster.reconcile(&local(), &[nearby("a", 1.0, 0.0)]);

        let diff = roster.reconcile(&local(), &[]);
        assert_eq!(diff.removed, vec![UserId::new("a")]);
        assert!(roster.is_empty());
    }

    #[test]
    fn test_local_move_shifts_everyone() {
        let mut roster = SceneRoster::new(UserId::new("me"));
        let set = [nearby("a", 5.0, 0.0)];
        roster.reconcile(&local(), &set);

        let moved_local = GeoPosition::new(37.00001, -122.0, 5.0, Timestamp::from_millis(2));
        let diff = roster.reconcile(&moved_local, &set);
        assert_eq!(diff.moved.len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut roster = SceneRoster::new(UserId::new("me"));
        roster.reconcile(&local(), &[nearby("b", 1.0, 0.0), nearby("a", 2.0, 0.0)]);

        assert_eq!(roster.clear(), vec![UserId::new("a"), UserId::new("b")]);
        assert!(roster.is_empty());
    }
}
