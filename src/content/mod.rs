//! Content tree interface consumed from the host content system
//!
//! The indexing core never owns content; it reads nodes, ancestor chains and
//! path-ordered descendant pages through the [`ContentStore`] trait. An
//! in-memory implementation backs tests and small hosts.

pub mod node;
pub mod store;

pub use node::{ContentNode, ContentNodeBuilder, Property, PropertyValue};
pub use store::{ContentStore, InMemoryContentStore};
