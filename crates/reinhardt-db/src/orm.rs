//! Object-relational primitives

pub mod instance;
pub mod memory;
pub mod model;
pub mod store;

pub use instance::Instance;
pub use memory::InMemoryStore;
pub use model::{FieldKind, FieldMeta, ModelMeta, RelationInfo};
pub use store::{ModelStore, StoreError};

/// Primary key type shared by every model
pub type Pk = u64;
