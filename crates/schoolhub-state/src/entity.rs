//! The `Entity` trait: what the reconciler needs to know about a type.

use std::fmt::{Debug, Display};
use std::hash::Hash;

use schoolhub_protocol::{Club, ClubId};

/// A server-owned object with a stable identity.
///
/// The reconciler keys slots by [`Entity::id`], so two values with the same
/// id are the same object at different points in time. Merging a value
/// whose id is already present replaces it instead of appending a copy.
pub trait Entity: Clone + Send + Sync + 'static {
    type Id: Copy + Eq + Hash + Debug + Display + Send + Sync + 'static;

    fn id(&self) -> Self::Id;
}

impl Entity for Club {
    type Id = ClubId;

    fn id(&self) -> ClubId {
        self.id
    }
}
