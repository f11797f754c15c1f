//! Ports - async traits at the seams of the core
//!
//! Adapters implement these; services depend only on the traits.

pub mod blob;
pub mod ledger;
pub mod notifier;
pub mod store;

pub use blob::*;
pub use ledger::*;
pub use notifier::*;
pub use store::*;
