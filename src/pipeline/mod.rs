//! Incremental indexing pipeline
//!
//! Turns deduplicated content change notifications into index writes:
//! resolve the routable variation set, collect fields, write the document,
//! and cascade over descendants when the variation set changed shape.

mod processor;
mod rebuild;
mod stamps;

pub use processor::ChangeProcessor;
pub use rebuild::RebuildCoordinator;
pub use stamps::{InMemoryStampStore, SledStampStore, StampStore};
