pub mod adapters;
pub mod cascade;
pub mod images;
pub mod reconciler;
pub mod store;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use cascade::{Cascade, CascadeOutcome};
pub use reconciler::{NetworkReport, NetworkStatus, Reconciler, RunReport};
pub use store::SnapshotStore;
