//! # Athena Client Session
//!
//! The session controller: owns the login, char and map connections, runs
//! inbound messages through the handler set on the caller's logic loop, and
//! walks the connection state machine from login to in-game.
//!
//! ## Modules
//!
//! - `session` - [`Session`], the controller itself
//! - `state` - [`SessionState`]
//! - `events` - [`SessionEvent`], what subscribers receive
//! - `liveness` - Ping scheduling and silence detection

pub mod events;
pub mod liveness;
pub mod session;
pub mod state;

pub use events::SessionEvent;
pub use liveness::Liveness;
pub use session::{Credentials, Session};
pub use state::SessionState;
