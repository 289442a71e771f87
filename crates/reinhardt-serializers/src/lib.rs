//! Writable nested model serializers for Reinhardt
//!
//! A [`SchemaBuilder`] turns serializer options ([`MetaOptions`]) and declared
//! fields into a [`SerializerSchema`]. Every schema gets a write-only `_pk`
//! field so a nested payload can name the existing row it updates.
//! A [`ModelSerializer`] validates input against a schema, honouring
//! operation-specific required fields, and saves it through a
//! [`reinhardt_db::orm::ModelStore`]. Nested payloads are created or updated
//! first. Validation failures from every depth are reported in one error tree,
//! and a failed save undoes the rows it already wrote.

pub mod compensation;
pub mod discriminator;
pub mod error;
pub mod fields;
pub mod meta;
pub mod nested;
pub mod relations;
pub mod schema;
pub mod serializer;
pub mod validation;

pub use compensation::{CompensationAction, CompensationEntry, CompensationFailure, CompensationSet};
pub use discriminator::{DISCRIMINATOR_FIELD, FieldNameResolver, inject_discriminator};
pub use error::{SchemaError, SerializerError, SerializerResult};
pub use fields::{FieldDef, FieldOptions, FieldType};
pub use meta::{ALL_FIELDS, FieldsSpec, MetaOptions, Operation, RequiredFieldTables};
pub use nested::{
	NestedSaveContext, NestedSerializerSave, NestedWriter, RELATED_OBJECT_EXISTS_MESSAGE,
	RelatedFieldData, Resolution, ResolveFailure,
};
pub use relations::{NestedResolvable, RelationDescriptor, classify};
pub use schema::{SchemaBuilder, SerializerSchema};
pub use serializer::ModelSerializer;
pub use validation::Payload;
