//! Session management for the SchoolHub client.
//!
//! This crate owns the one piece of state that outlives a run of the app:
//! the bearer token issued at sign-in.
//!
//! 1. **Storage**: where the token lives between launches ([`TokenStorage`]
//!    trait, [`FileTokenStorage`], [`MemoryTokenStorage`])
//! 2. **Session store**: save / read / clear with an observable
//!    signed-in state ([`SessionStore`], [`SessionEvent`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Client flows (above)  ← read the token before every authenticated call
//!     ↕
//! Session Layer (this crate)  ← persists the token, broadcasts sign-out
//!     ↕
//! Protocol Layer (below)  ← provides SessionToken
//! ```

mod error;
mod storage;
mod store;

pub use error::SessionError;
pub use storage::{FileTokenStorage, MemoryTokenStorage, TokenStorage};
pub use store::{SessionEvent, SessionStore};
