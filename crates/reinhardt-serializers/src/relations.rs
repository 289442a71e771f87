//! Relation classification
//!
//! Decides per relational model field whether it is to-one or to-many and
//! whether the serializer writes it through a nested serializer or by bare
//! primary key.

use crate::schema::SerializerSchema;
use indexmap::IndexMap;
use reinhardt_db::orm::ModelMeta;
use std::sync::Arc;

/// How one relational field is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDescriptor {
	pub related_model: String,
	pub to_many: bool,
	/// The serializer binds this field to a nested serializer
	pub nested: bool,
}

/// Classify every relation of `model` as seen by `schema`
///
/// The result follows model field declaration order. Relations the schema does
/// not expose are still reported, with `nested = false`.
///
/// # Examples
///
/// ```
/// use reinhardt_db::orm::{FieldMeta, ModelMeta};
/// use reinhardt_serializers::meta::MetaOptions;
/// use reinhardt_serializers::relations::classify;
/// use reinhardt_serializers::schema::SchemaBuilder;
/// use std::sync::Arc;
///
/// let tag = Arc::new(
///     ModelMeta::new("Tag")
///         .field(FieldMeta::auto_pk("id"))
///         .field(FieldMeta::char("name", 12)),
/// );
/// let schema = SchemaBuilder::new("TagSerializer")
///     .meta(MetaOptions::new().with_model(tag.clone()).with_all_fields())
///     .build()
///     .unwrap();
///
/// assert!(classify(&tag, &schema).is_empty());
/// ```
pub fn classify(
	model: &ModelMeta,
	schema: &SerializerSchema,
) -> IndexMap<String, RelationDescriptor> {
	model
		.relations()
		.into_iter()
		.map(|(name, info)| {
			let nested = schema
				.field(&name)
				.is_some_and(|field| field.as_nested_resolvable().is_some());
			(
				name,
				RelationDescriptor {
					related_model: info.related_model,
					to_many: info.to_many,
					nested,
				},
			)
		})
		.collect()
}

/// A field bound to a nested serializer
#[derive(Debug, Clone, Copy)]
pub enum NestedResolvable<'a> {
	/// One related object per payload
	Single(&'a Arc<SerializerSchema>),
	/// A sequence of related objects
	Collection(&'a Arc<SerializerSchema>),
}

impl<'a> NestedResolvable<'a> {
	/// Schema used for each related object
	pub fn schema(&self) -> &'a Arc<SerializerSchema> {
		match self {
			Self::Single(schema) | Self::Collection(schema) => schema,
		}
	}

	pub fn is_collection(&self) -> bool {
		matches!(self, Self::Collection(_))
	}
}
