pub mod gate;
pub mod coordinator;

pub use coordinator::{IndexingCoordinator, IndexingReport};
pub use gate::CommitGate;
