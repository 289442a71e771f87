//! # Reinhardt DB
//!
//! Model metadata and persistence primitives consumed by the serializer layer.
//!
//! - [`orm::ModelMeta`] describes a model's fields and relations.
//! - [`orm::Instance`] is one persisted row.
//! - [`orm::ModelStore`] is the persistence seam: create, fetch, save, delete and
//!   collection (many-to-many) assignment.
//! - [`orm::InMemoryStore`] is a complete in-process store, used by tests and by
//!   applications that do not need a database.

pub mod orm;

pub use orm::{
	FieldKind, FieldMeta, InMemoryStore, Instance, ModelMeta, ModelStore, Pk, RelationInfo,
	StoreError,
};
