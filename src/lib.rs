//! # Reinhardt Writable Nested
//!
//! Writable nested serializers for Reinhardt.
//!
//! A serializer schema describes which model fields a serializer accepts, with
//! bulk field options and separate required-field rules for create and update.
//! Nested serializer fields are written together with their parent: a nested
//! payload without `_pk` creates a related row, one with `_pk` updates the row
//! it names. Validation errors from every depth come back as one error tree,
//! and a save that fails part-way removes the rows it created.
//!
//! ## Modules
//!
//! - [`exception`]: validation errors and error trees
//! - [`orm`]: model metadata and the store the serializers write through
//! - [`settings`]: layered settings for nested writes
//! - [`serializers`]: schemas, validation and nested saves
//!
//! ## Quick Example
//!
//! ```rust
//! use reinhardt_writable_nested::prelude::*;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let address = Arc::new(
//!     ModelMeta::new("Address")
//!         .field(FieldMeta::auto_pk("id"))
//!         .field(FieldMeta::char("zip_code", 12)),
//! );
//! let user = Arc::new(
//!     ModelMeta::new("User")
//!         .field(FieldMeta::auto_pk("id"))
//!         .field(FieldMeta::char("username", 150))
//!         .field(FieldMeta::one_to_one("address", "Address").null()),
//! );
//!
//! let address_schema = SchemaBuilder::new("AddressSerializer")
//!     .meta(MetaOptions::new().with_model(address).with_fields(["id", "zip_code"]))
//!     .build()
//!     .unwrap();
//! let user_schema = SchemaBuilder::new("UserSerializer")
//!     .field(FieldDef::nested("address", address_schema))
//!     .meta(
//!         MetaOptions::new()
//!             .with_model(user)
//!             .with_fields(["id", "username", "address"])
//!             .with_required_fields_on_create(["username"]),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let store = InMemoryStore::new();
//! let mut serializer = ModelSerializer::new(user_schema)
//!     .with_data(json!({"username": "alice", "address": {"zip_code": "94105"}}));
//! assert!(serializer.is_valid());
//! let created = serializer.save(&store).await.unwrap();
//!
//! assert_eq!(created.related_pk("address"), Some(1));
//! assert_eq!(store.count("Address"), 1);
//! # });
//! ```

pub use reinhardt_conf::settings;
pub use reinhardt_core::exception;
pub use reinhardt_db::orm;
pub use reinhardt_serializers as serializers;

pub mod prelude {
	pub use reinhardt_conf::settings::NestedWriteSettings;
	pub use reinhardt_core::exception::{ErrorTree, NON_FIELD_ERRORS_KEY, ValidationError};
	pub use reinhardt_db::orm::{
		FieldMeta, InMemoryStore, Instance, ModelMeta, ModelStore, Pk, StoreError,
	};
	pub use reinhardt_serializers::{
		DISCRIMINATOR_FIELD, FieldDef, FieldOptions, MetaOptions, ModelSerializer, SchemaBuilder,
		SchemaError, SerializerError, SerializerSchema,
	};
}
