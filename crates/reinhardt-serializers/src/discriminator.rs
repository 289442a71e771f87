//! The `_pk` discriminator field
//!
//! Every extended serializer carries a write-only integer field named `_pk`.
//! A nested payload that carries it updates the related row with that primary
//! key; a payload without it creates a new row.

use crate::fields::FieldDef;
use crate::meta::FieldsSpec;
use indexmap::IndexMap;
use reinhardt_db::orm::ModelMeta;
use std::sync::Arc;

pub const DISCRIMINATOR_FIELD: &str = "_pk";

pub const DISCRIMINATOR_HELP_TEXT: &str = "This *write-only* field is used for differentiating between \
	`create` and `update` operations of nested serializers. And must refer to a valid primary key for \
	the relevant nested serializer model to indicate that the operation on nested serializer is an \
	`update` of the object referred by the given primary key. Otherwise, a `create` operation is performed.";

/// Computes the field names used when `fields` is `__all__`
///
/// Receives the model and the names of the declared fields.
pub type FieldNameResolver = Arc<dyn Fn(&ModelMeta, &[String]) -> Vec<String> + Send + Sync>;

/// Definition of the injected discriminator field
pub fn discriminator_field() -> FieldDef {
	FieldDef::integer(DISCRIMINATOR_FIELD)
		.min_value(0)
		.write_only()
		.required(false)
		.help_text(DISCRIMINATOR_HELP_TEXT)
}

/// Model field names followed by declared fields the model does not have
pub fn default_field_names(model: &ModelMeta, declared: &[String]) -> Vec<String> {
	let mut names: Vec<String> = model
		.fields()
		.iter()
		.map(|field| field.name().to_string())
		.collect();
	for name in declared {
		if !names.contains(name) {
			names.push(name.clone());
		}
	}
	names
}

pub fn default_resolver() -> FieldNameResolver {
	Arc::new(default_field_names)
}

/// Add the discriminator to a serializer definition
///
/// The field is declared, then either appended to an explicit field list or
/// added by wrapping `resolver` for `__all__`. Applying it again changes
/// nothing.
///
/// # Examples
///
/// ```
/// use reinhardt_serializers::discriminator::{default_resolver, inject_discriminator};
/// use reinhardt_serializers::meta::FieldsSpec;
/// use indexmap::IndexMap;
///
/// let mut declared = IndexMap::new();
/// let mut fields = FieldsSpec::from_names(["state", "zip_code"]);
/// let mut resolver = default_resolver();
///
/// inject_discriminator(&mut declared, &mut fields, &mut resolver);
/// inject_discriminator(&mut declared, &mut fields, &mut resolver);
///
/// assert_eq!(fields, FieldsSpec::from_names(["state", "zip_code", "_pk"]));
/// assert!(declared["_pk"].is_write_only());
/// ```
pub fn inject_discriminator(
	declared: &mut IndexMap<String, FieldDef>,
	fields: &mut FieldsSpec,
	resolver: &mut FieldNameResolver,
) {
	let already_declared = declared.contains_key(DISCRIMINATOR_FIELD);
	declared.insert(DISCRIMINATOR_FIELD.to_string(), discriminator_field());

	match fields {
		FieldsSpec::Only(names) => {
			if !names.iter().any(|name| name == DISCRIMINATOR_FIELD) {
				names.push(DISCRIMINATOR_FIELD.to_string());
			}
		}
		FieldsSpec::All => {
			if already_declared {
				return;
			}
			let inner = Arc::clone(resolver);
			*resolver = Arc::new(move |model: &ModelMeta, declared: &[String]| {
				let mut names = inner(model, declared);
				if !names.iter().any(|name| name == DISCRIMINATOR_FIELD) {
					names.push(DISCRIMINATOR_FIELD.to_string());
				}
				names
			});
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::fields::FieldType;
	use reinhardt_db::orm::FieldMeta;
	use rstest::rstest;

	fn address_model() -> ModelMeta {
		ModelMeta::new("Address")
			.field(FieldMeta::auto_pk("id"))
			.field(FieldMeta::char("state", 2))
			.field(FieldMeta::char("zip_code", 12))
	}

	#[rstest]
	fn test_discriminator_field_shape() {
		let field = discriminator_field();

		assert!(field.is_write_only());
		assert!(!field.is_required());
		assert!(!field.is_read_only());
		assert!(matches!(
			field.field_type(),
			FieldType::Integer {
				min_value: Some(0),
				max_value: None
			}
		));
		assert!(field.get_help_text().unwrap().contains("`create` and `update`"));
	}

	#[rstest]
	fn test_all_fields_resolver_appends_discriminator_once() {
		let mut declared = IndexMap::new();
		let mut fields = FieldsSpec::All;
		let mut resolver = default_resolver();

		inject_discriminator(&mut declared, &mut fields, &mut resolver);
		inject_discriminator(&mut declared, &mut fields, &mut resolver);

		let names = resolver(&address_model(), &["_pk".to_string()]);
		assert_eq!(names, ["id", "state", "zip_code", "_pk"]);
		assert_eq!(fields, FieldsSpec::All);
	}

	#[rstest]
	fn test_default_field_names_keeps_declared_extras() {
		let names = default_field_names(&address_model(), &["state".to_string(), "label".to_string()]);
		assert_eq!(names, ["id", "state", "zip_code", "label"]);
	}
}
