//! Adapters - concrete implementations of the ports

pub mod blob;
pub mod ledger;
pub mod notifier;
pub mod store;

pub use blob::*;
pub use ledger::*;
pub use notifier::*;
pub use store::*;
