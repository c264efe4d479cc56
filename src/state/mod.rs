//! Shared server state: the live-session roster and the admission gate.

mod admission;
mod roster;
mod session;

pub use admission::Admission;
pub use roster::{RegisterError, Roster};
pub use session::{Liveness, Session};

/// Name used as the sender of server-originated notices.
pub const SERVER_NAME: &str = "Server";
