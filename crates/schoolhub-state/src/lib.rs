//! Local view state for the SchoolHub client.
//!
//! Everything the user sees between a request and its response lives here:
//! optimistic changes waiting for the server, and the notices that report
//! how they ended.
//!
//! # Key types
//!
//! - [`Entity`]: a server object with a stable id
//! - [`Optimistic`]: one value with a confirmed snapshot and a pending delta
//! - [`Reconciler`]: an ordered collection of optimistic slots keyed by id
//! - [`Notices`]: transient (auto-dismissing) and persistent messages

mod entity;
mod error;
mod notice;
mod optimistic;
mod reconciler;

pub use entity::Entity;
pub use error::StateError;
pub use notice::{DEFAULT_NOTICE_TTL, Notice, NoticeId, NoticeKind, Notices};
pub use optimistic::Optimistic;
pub use reconciler::Reconciler;
