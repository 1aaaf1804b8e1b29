//! Reconciler: the local, optimistically-updated view of a server collection.
//!
//! Holds one [`Optimistic`] slot per entity, in server order. Flows call
//! [`Reconciler::begin`] before sending a mutation and settle it with
//! [`Reconciler::commit`] or [`Reconciler::rollback`] once the response is
//! in.
//!
//! # Invariants
//! - At most one pending mutation per entity.
//! - Each id appears at most once; merging a known id replaces it in place.

use std::collections::HashMap;

use crate::{Entity, Optimistic, StateError};

/// Optimistic view of a list of entities.
#[derive(Debug, Clone)]
pub struct Reconciler<E: Entity> {
    /// Display order, as last reported by the server.
    order: Vec<E::Id>,
    slots: HashMap<E::Id, Optimistic<E>>,
}

impl<E: Entity> Default for Reconciler<E> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            slots: HashMap::new(),
        }
    }
}

impl<E: Entity> Reconciler<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole view with a fresh server listing.
    ///
    /// Entities with a mutation in flight keep their pending delta visible,
    /// re-applied on top of the refreshed snapshot. Entities missing from the
    /// listing are dropped unless they are pending. Duplicate ids in the
    /// listing collapse to the last occurrence.
    pub fn replace_all(&mut self, entities: impl IntoIterator<Item = E>) {
        let mut fresh: HashMap<E::Id, Optimistic<E>> = HashMap::new();
        let mut order = Vec::new();

        for entity in entities {
            let id = entity.id();
            if !fresh.contains_key(&id) {
                order.push(id);
            }
            let slot = match self.slots.remove(&id) {
                Some(mut existing) if existing.is_pending() => {
                    existing.refresh(entity);
                    existing
                }
                _ => Optimistic::new(entity),
            };
            fresh.insert(id, slot);
        }

        for (id, slot) in self.slots.drain() {
            if slot.is_pending() && !fresh.contains_key(&id) {
                order.push(id);
                fresh.insert(id, slot);
            }
        }

        tracing::debug!(count = order.len(), "view replaced from server listing");
        self.order = order;
        self.slots = fresh;
    }

    /// Inserts or updates one confirmed entity.
    ///
    /// Idempotent: merging the same object twice leaves one copy. A known
    /// id keeps its position; a new one goes to the end.
    pub fn merge_confirmed(&mut self, entity: E) {
        let id = entity.id();
        match self.slots.get_mut(&id) {
            Some(slot) => slot.refresh(entity),
            None => {
                self.order.push(id);
                self.slots.insert(id, Optimistic::new(entity));
            }
        }
    }

    /// Applies `delta` to the entity's view ahead of the server.
    ///
    /// # Errors
    /// - [`StateError::NotFound`] if the id is not in the view
    /// - [`StateError::MutationInFlight`] if the entity already has a
    ///   pending mutation
    pub fn begin(
        &mut self,
        id: E::Id,
        delta: impl Fn(&mut E) + Send + Sync + 'static,
    ) -> Result<&E, StateError> {
        let slot = self
            .slots
            .get_mut(&id)
            .ok_or_else(|| StateError::NotFound(id.to_string()))?;
        let view = slot.begin(id.to_string(), delta)?;
        tracing::debug!(%id, "optimistic change applied");
        Ok(view)
    }

    /// Settles the pending mutation as accepted. `server` replaces the
    /// snapshot when the response carried the updated object.
    ///
    /// # Errors
    /// [`StateError::NotFound`] or [`StateError::NothingPending`].
    pub fn commit(&mut self, id: E::Id, server: Option<E>) -> Result<&E, StateError> {
        let slot = self
            .slots
            .get_mut(&id)
            .ok_or_else(|| StateError::NotFound(id.to_string()))?;
        let confirmed = slot.commit(id.to_string(), server)?;
        tracing::debug!(%id, "optimistic change confirmed");
        Ok(confirmed)
    }

    /// Settles the pending mutation as rejected, restoring the snapshot.
    ///
    /// # Errors
    /// [`StateError::NotFound`] or [`StateError::NothingPending`].
    pub fn rollback(&mut self, id: E::Id) -> Result<&E, StateError> {
        let slot = self
            .slots
            .get_mut(&id)
            .ok_or_else(|| StateError::NotFound(id.to_string()))?;
        let restored = slot.rollback(id.to_string())?;
        tracing::debug!(%id, "optimistic change rolled back");
        Ok(restored)
    }

    /// Current view of one entity.
    pub fn get(&self, id: E::Id) -> Option<&E> {
        self.slots.get(&id).map(Optimistic::view)
    }

    /// Last server-confirmed value of one entity.
    pub fn confirmed(&self, id: E::Id) -> Option<&E> {
        self.slots.get(&id).map(Optimistic::confirmed)
    }

    /// Current view of every entity, in order.
    pub fn view(&self) -> Vec<&E> {
        self.order
            .iter()
            .filter_map(|id| self.get(*id))
            .collect()
    }

    pub fn is_pending(&self, id: E::Id) -> bool {
        self.slots.get(&id).is_some_and(Optimistic::is_pending)
    }

    pub fn contains(&self, id: E::Id) -> bool {
        self.slots.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schoolhub_protocol::{Club, ClubId};

    fn club(id: u64, members: u32) -> Club {
        Club {
            id: ClubId(id),
            title: format!("Club {id}"),
            description: String::new(),
            direction: None,
            class_limit_min: None,
            class_limit_max: None,
            members_count: members,
            joined: false,
            administration: None,
        }
    }

    fn join(c: &mut Club) {
        c.joined = true;
        c.members_count += 1;
    }

    fn ids(r: &Reconciler<Club>) -> Vec<u64> {
        r.view().iter().map(|c| c.id.0).collect()
    }

    #[test]
    fn test_replace_all_keeps_server_order() {
        let mut r = Reconciler::new();
        r.replace_all([club(3, 0), club(1, 0), club(2, 0)]);
        assert_eq!(ids(&r), vec![3, 1, 2]);
    }

    #[test]
    fn test_replace_all_collapses_duplicate_ids() {
        let mut r = Reconciler::new();
        r.replace_all([club(1, 5), club(2, 0), club(1, 6)]);
        assert_eq!(ids(&r), vec![1, 2]);
        assert_eq!(r.get(ClubId(1)).unwrap().members_count, 6);
    }

    #[test]
    fn test_merge_confirmed_twice_is_idempotent() {
        let mut r = Reconciler::new();
        r.replace_all([club(1, 0)]);

        r.merge_confirmed(club(2, 1));
        r.merge_confirmed(club(2, 1));

        assert_eq!(ids(&r), vec![1, 2]);
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn test_merge_confirmed_known_id_keeps_position() {
        let mut r = Reconciler::new();
        r.replace_all([club(1, 0), club(2, 0)]);

        r.merge_confirmed(club(1, 9));

        assert_eq!(ids(&r), vec![1, 2]);
        assert_eq!(r.get(ClubId(1)).unwrap().members_count, 9);
    }

    #[test]
    fn test_begin_unknown_id_is_not_found() {
        let mut r: Reconciler<Club> = Reconciler::new();
        assert_eq!(
            r.begin(ClubId(9), join).unwrap_err(),
            StateError::NotFound("club-9".into())
        );
    }

    #[test]
    fn test_begin_twice_is_mutation_in_flight() {
        let mut r = Reconciler::new();
        r.replace_all([club(1, 3)]);
        r.begin(ClubId(1), join).unwrap();

        assert_eq!(
            r.begin(ClubId(1), join).unwrap_err(),
            StateError::MutationInFlight("club-1".into())
        );
    }

    #[test]
    fn test_mutations_on_different_entities_are_independent() {
        let mut r = Reconciler::new();
        r.replace_all([club(1, 3), club(2, 5)]);

        r.begin(ClubId(1), join).unwrap();
        r.begin(ClubId(2), join).unwrap();

        assert_eq!(r.get(ClubId(1)).unwrap().members_count, 4);
        assert_eq!(r.get(ClubId(2)).unwrap().members_count, 6);
    }

    #[test]
    fn test_rollback_restores_pre_update_values() {
        let mut r = Reconciler::new();
        r.replace_all([club(1, 3)]);
        r.begin(ClubId(1), join).unwrap();

        r.rollback(ClubId(1)).unwrap();

        let c = r.get(ClubId(1)).unwrap();
        assert!(!c.joined);
        assert_eq!(c.members_count, 3);
    }

    #[test]
    fn test_replace_all_during_pending_keeps_delta() {
        let mut r = Reconciler::new();
        r.replace_all([club(1, 3), club(2, 0)]);
        r.begin(ClubId(1), join).unwrap();

        // Listing refreshed without club 1 while the join is in flight.
        r.replace_all([club(2, 0)]);

        assert!(r.is_pending(ClubId(1)));
        assert_eq!(r.get(ClubId(1)).unwrap().members_count, 4);
        r.commit(ClubId(1), None).unwrap();
        assert_eq!(r.confirmed(ClubId(1)).unwrap().members_count, 4);
    }

    #[test]
    fn test_merge_confirmed_during_pending_keeps_fresher_count() {
        let mut r = Reconciler::new();
        r.replace_all([club(1, 3)]);
        r.begin(ClubId(1), join).unwrap();

        // Detail fetched mid-join: two other members joined meanwhile.
        r.merge_confirmed(club(1, 5));

        assert_eq!(r.get(ClubId(1)).unwrap().members_count, 6);
        r.commit(ClubId(1), None).unwrap();
        let c = r.confirmed(ClubId(1)).unwrap();
        assert!(c.joined);
        assert_eq!(c.members_count, 6);
    }

    #[test]
    fn test_replace_all_drops_settled_missing_entities() {
        let mut r = Reconciler::new();
        r.replace_all([club(1, 0), club(2, 0)]);

        r.replace_all([club(2, 0)]);

        assert!(!r.contains(ClubId(1)));
        assert_eq!(ids(&r), vec![2]);
    }
}
