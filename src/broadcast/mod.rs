//! Live event broadcast
//!
//! A ractor-based publish/subscribe hub fans committed ledger entries out to
//! open subscriber sessions, filtered per session by the access policy.

pub mod hub;
pub mod message;
pub mod session;

pub use hub::*;
pub use message::*;
pub use session::*;
