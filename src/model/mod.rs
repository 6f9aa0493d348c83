//! Shared model types: variations, fields, documents and change events

pub mod change;
pub mod document;
pub mod field;
pub mod variation;

pub use change::{ChangeImpact, ChangeStamp, ContentChange};
pub use document::{AccessContext, IndexDocument, ObjectKind, Protection};
pub use field::{FieldValue, IndexField};
pub use variation::Variation;
