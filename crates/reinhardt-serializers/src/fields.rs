//! Serializer field definitions

use crate::relations::NestedResolvable;
use crate::schema::SerializerSchema;
use std::sync::Arc;

/// Input/output type of a serializer field
#[non_exhaustive]
#[derive(Debug, Clone)]
pub enum FieldType {
	Char {
		max_length: Option<usize>,
	},
	Integer {
		min_value: Option<i64>,
		max_value: Option<i64>,
	},
	Boolean,
	/// Related object addressed by its primary key
	PrimaryKeyRelated { many: bool },
	/// Related object written through another serializer
	Nested {
		schema: Arc<SerializerSchema>,
		many: bool,
	},
}

/// A declared or model-generated serializer field
///
/// # Examples
///
/// ```
/// use reinhardt_serializers::fields::FieldDef;
///
/// let username = FieldDef::char("username").max_length(150).required(false);
/// assert!(!username.is_required());
///
/// let id = FieldDef::integer("id").read_only();
/// assert!(id.is_read_only());
/// assert!(!id.is_required());
/// ```
#[derive(Debug, Clone)]
pub struct FieldDef {
	name: String,
	field_type: FieldType,
	required: bool,
	read_only: bool,
	write_only: bool,
	allow_null: bool,
	allow_blank: bool,
	help_text: Option<String>,
}

impl FieldDef {
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
			required: true,
			read_only: false,
			write_only: false,
			allow_null: false,
			allow_blank: false,
			help_text: None,
		}
	}

	pub fn char(name: impl Into<String>) -> Self {
		Self::new(name, FieldType::Char { max_length: None })
	}

	pub fn integer(name: impl Into<String>) -> Self {
		Self::new(
			name,
			FieldType::Integer {
				min_value: None,
				max_value: None,
			},
		)
	}

	pub fn boolean(name: impl Into<String>) -> Self {
		Self::new(name, FieldType::Boolean)
	}

	pub fn primary_key_related(name: impl Into<String>) -> Self {
		Self::new(name, FieldType::PrimaryKeyRelated { many: false })
	}

	pub fn many_primary_key_related(name: impl Into<String>) -> Self {
		Self::new(name, FieldType::PrimaryKeyRelated { many: true })
	}

	/// Single related object written through `schema`
	pub fn nested(name: impl Into<String>, schema: Arc<SerializerSchema>) -> Self {
		Self::new(
			name,
			FieldType::Nested {
				schema,
				many: false,
			},
		)
	}

	/// Sequence of related objects written through `schema`
	pub fn nested_many(name: impl Into<String>, schema: Arc<SerializerSchema>) -> Self {
		Self::new(name, FieldType::Nested { schema, many: true })
	}

	pub fn required(mut self, required: bool) -> Self {
		self.required = required;
		self
	}

	/// Output only; a read-only field is never required
	pub fn read_only(mut self) -> Self {
		self.read_only = true;
		self.required = false;
		self
	}

	pub fn write_only(mut self) -> Self {
		self.write_only = true;
		self
	}

	pub fn allow_null(mut self) -> Self {
		self.allow_null = true;
		self
	}

	pub fn allow_blank(mut self) -> Self {
		self.allow_blank = true;
		self
	}

	/// Only affects character fields
	pub fn max_length(mut self, max_length: usize) -> Self {
		if let FieldType::Char { max_length: limit } = &mut self.field_type {
			*limit = Some(max_length);
		}
		self
	}

	/// Only affects integer fields
	pub fn min_value(mut self, min_value: i64) -> Self {
		if let FieldType::Integer { min_value: limit, .. } = &mut self.field_type {
			*limit = Some(min_value);
		}
		self
	}

	/// Only affects integer fields
	pub fn max_value(mut self, max_value: i64) -> Self {
		if let FieldType::Integer { max_value: limit, .. } = &mut self.field_type {
			*limit = Some(max_value);
		}
		self
	}

	pub fn help_text(mut self, help_text: impl Into<String>) -> Self {
		self.help_text = Some(help_text.into());
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn field_type(&self) -> &FieldType {
		&self.field_type
	}

	pub fn is_required(&self) -> bool {
		self.required
	}

	pub fn is_read_only(&self) -> bool {
		self.read_only
	}

	pub fn is_write_only(&self) -> bool {
		self.write_only
	}

	pub fn allows_null(&self) -> bool {
		self.allow_null
	}

	pub fn allows_blank(&self) -> bool {
		self.allow_blank
	}

	pub fn get_help_text(&self) -> Option<&str> {
		self.help_text.as_deref()
	}

	/// Nested write capability, if this field is bound to a nested serializer
	pub fn as_nested_resolvable(&self) -> Option<NestedResolvable<'_>> {
		match &self.field_type {
			FieldType::Nested {
				schema,
				many: false,
			} => Some(NestedResolvable::Single(schema)),
			FieldType::Nested { schema, many: true } => Some(NestedResolvable::Collection(schema)),
			_ => None,
		}
	}
}

/// Field keyword overrides, as used by `extra_kwargs` and `common_field_params`
///
/// Unset options leave the field untouched.
///
/// # Examples
///
/// ```
/// use reinhardt_serializers::fields::{FieldDef, FieldOptions};
///
/// let options = FieldOptions::new().with_write_only(true).with_allow_blank(false);
/// let mut field = FieldDef::char("password").allow_blank();
/// options.apply_to(&mut field);
///
/// assert!(field.is_write_only());
/// assert!(!field.allows_blank());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldOptions {
	pub required: Option<bool>,
	pub read_only: Option<bool>,
	pub write_only: Option<bool>,
	pub allow_null: Option<bool>,
	pub allow_blank: Option<bool>,
	pub max_length: Option<usize>,
	pub min_value: Option<i64>,
	pub max_value: Option<i64>,
	pub help_text: Option<String>,
}

impl FieldOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_required(mut self, required: bool) -> Self {
		self.required = Some(required);
		self
	}

	pub fn with_read_only(mut self, read_only: bool) -> Self {
		self.read_only = Some(read_only);
		self
	}

	pub fn with_write_only(mut self, write_only: bool) -> Self {
		self.write_only = Some(write_only);
		self
	}

	pub fn with_allow_null(mut self, allow_null: bool) -> Self {
		self.allow_null = Some(allow_null);
		self
	}

	pub fn with_allow_blank(mut self, allow_blank: bool) -> Self {
		self.allow_blank = Some(allow_blank);
		self
	}

	pub fn with_max_length(mut self, max_length: usize) -> Self {
		self.max_length = Some(max_length);
		self
	}

	pub fn with_min_value(mut self, min_value: i64) -> Self {
		self.min_value = Some(min_value);
		self
	}

	pub fn with_max_value(mut self, max_value: i64) -> Self {
		self.max_value = Some(max_value);
		self
	}

	pub fn with_help_text(mut self, help_text: impl Into<String>) -> Self {
		self.help_text = Some(help_text.into());
		self
	}

	/// Overlay `other` onto `self`; options set in `other` win
	pub fn update(&mut self, other: &FieldOptions) {
		self.required = other.required.or(self.required);
		self.read_only = other.read_only.or(self.read_only);
		self.write_only = other.write_only.or(self.write_only);
		self.allow_null = other.allow_null.or(self.allow_null);
		self.allow_blank = other.allow_blank.or(self.allow_blank);
		self.max_length = other.max_length.or(self.max_length);
		self.min_value = other.min_value.or(self.min_value);
		self.max_value = other.max_value.or(self.max_value);
		if other.help_text.is_some() {
			self.help_text = other.help_text.clone();
		}
	}

	pub fn apply_to(&self, field: &mut FieldDef) {
		if let Some(required) = self.required {
			field.required = required;
		}
		if let Some(write_only) = self.write_only {
			field.write_only = write_only;
		}
		if let Some(allow_null) = self.allow_null {
			field.allow_null = allow_null;
		}
		if let Some(allow_blank) = self.allow_blank {
			field.allow_blank = allow_blank;
		}
		if let Some(help_text) = &self.help_text {
			field.help_text = Some(help_text.clone());
		}
		match &mut field.field_type {
			FieldType::Char { max_length } => {
				if self.max_length.is_some() {
					*max_length = self.max_length;
				}
			}
			FieldType::Integer {
				min_value,
				max_value,
			} => {
				if self.min_value.is_some() {
					*min_value = self.min_value;
				}
				if self.max_value.is_some() {
					*max_value = self.max_value;
				}
			}
			_ => {}
		}
		if let Some(read_only) = self.read_only {
			field.read_only = read_only;
			if read_only {
				field.required = false;
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_update_overlays_only_set_options() {
		let mut base = FieldOptions::new()
			.with_required(true)
			.with_max_length(10);
		base.update(&FieldOptions::new().with_required(false));

		assert_eq!(base.required, Some(false));
		assert_eq!(base.max_length, Some(10));
	}

	#[rstest]
	fn test_apply_read_only_clears_required() {
		let mut field = FieldDef::char("state");
		FieldOptions::new()
			.with_required(true)
			.with_read_only(true)
			.apply_to(&mut field);

		assert!(field.is_read_only());
		assert!(!field.is_required());
	}

	#[rstest]
	fn test_apply_limits_match_field_type() {
		let mut age = FieldDef::integer("age");
		let mut name = FieldDef::char("name");
		let options = FieldOptions::new().with_min_value(0).with_max_length(5);

		options.apply_to(&mut age);
		options.apply_to(&mut name);

		assert!(matches!(
			age.field_type(),
			FieldType::Integer {
				min_value: Some(0),
				max_value: None
			}
		));
		assert!(matches!(
			name.field_type(),
			FieldType::Char {
				max_length: Some(5)
			}
		));
	}

	#[rstest]
	fn test_scalar_fields_are_not_nested_resolvable() {
		assert!(FieldDef::char("state").as_nested_resolvable().is_none());
		assert!(
			FieldDef::many_primary_key_related("tags")
				.as_nested_resolvable()
				.is_none()
		);
	}
}
