//! Meta configuration for serializers
//!
//! [`MetaOptions`] plays the role of Django REST Framework's inner `Meta` class:
//! it names the model and the fields, and carries the bulk field-option tables
//! applied when the schema is built.

use crate::error::SchemaError;
use crate::fields::FieldOptions;
use indexmap::IndexMap;
use reinhardt_db::orm::ModelMeta;
use std::fmt;
use std::sync::Arc;

/// Sentinel meaning "every model field plus every declared field"
pub const ALL_FIELDS: &str = "__all__";

/// The `fields` option
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldsSpec {
	All,
	Only(Vec<String>),
}

impl FieldsSpec {
	/// Build from a list of names; a single [`ALL_FIELDS`] entry selects every field
	pub fn from_names(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
		let names = collect_names(names);
		if names.len() == 1 && names[0] == ALL_FIELDS {
			Self::All
		} else {
			Self::Only(names)
		}
	}

	pub fn is_all(&self) -> bool {
		matches!(self, Self::All)
	}

	pub fn contains(&self, name: &str) -> bool {
		match self {
			Self::All => true,
			Self::Only(names) => names.iter().any(|n| n == name),
		}
	}
}

/// Kind of write a serializer performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
	Create,
	Update,
}

impl fmt::Display for Operation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Create => f.write_str("create"),
			Self::Update => f.write_str("update"),
		}
	}
}

/// Operation-dependent required-field tables
///
/// Plain tables require every listed key to be present in the input. `_any`
/// tables require at least one of the listed keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequiredFieldTables {
	pub on_create: Vec<String>,
	pub on_update: Vec<String>,
	pub on_create_any: Vec<String>,
	pub on_update_any: Vec<String>,
}

impl RequiredFieldTables {
	/// `(all_of, any_of)` for `operation`
	pub fn for_operation(&self, operation: Operation) -> (&[String], &[String]) {
		match operation {
			Operation::Create => (&self.on_create, &self.on_create_any),
			Operation::Update => (&self.on_update, &self.on_update_any),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.on_create.is_empty()
			&& self.on_update.is_empty()
			&& self.on_create_any.is_empty()
			&& self.on_update_any.is_empty()
	}

	/// A field may not appear in both the plain and the `_any` table of one operation
	pub fn check_conflicts(&self) -> Result<(), SchemaError> {
		for operation in [Operation::Create, Operation::Update] {
			let (all_of, any_of) = self.for_operation(operation);
			let common: Vec<&str> = all_of
				.iter()
				.filter(|field| any_of.contains(field))
				.map(String::as_str)
				.collect();
			if !common.is_empty() {
				return Err(SchemaError::ConflictingRequired {
					operation,
					fields: common.join(", "),
				});
			}
		}
		Ok(())
	}
}

/// Configuration builder for serializer schemas
///
/// # Examples
///
/// ```
/// use reinhardt_serializers::fields::FieldOptions;
/// use reinhardt_serializers::meta::MetaOptions;
///
/// let meta = MetaOptions::new()
///     .with_fields(["username", "password", "email"])
///     .with_read_only_fields(["email"])
///     .with_common_field_params(
///         ["username", "password"],
///         FieldOptions::new().with_allow_blank(false),
///     )
///     .with_required_fields_on_create(["username"]);
///
/// assert!(meta.fields().unwrap().contains("password"));
/// assert!(meta.is_read_only("email"));
/// assert_eq!(meta.required_fields().on_create, ["username"]);
/// ```
#[non_exhaustive]
#[derive(Debug, Clone, Default)]
pub struct MetaOptions {
	model: Option<Arc<ModelMeta>>,
	fields: Option<FieldsSpec>,
	read_only_fields: Vec<String>,
	write_only_fields: Vec<String>,
	extra_kwargs: IndexMap<String, FieldOptions>,
	non_required_fields: Option<Vec<String>>,
	common_field_params: Vec<(Vec<String>, FieldOptions)>,
	required: RequiredFieldTables,
}

fn collect_names(names: impl IntoIterator<Item = impl Into<String>>) -> Vec<String> {
	names.into_iter().map(Into::into).collect()
}

impl MetaOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_model(mut self, model: Arc<ModelMeta>) -> Self {
		self.model = Some(model);
		self
	}

	/// Explicit field list; `["__all__"]` is the same as [`MetaOptions::with_all_fields`]
	pub fn with_fields(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
		self.fields = Some(FieldsSpec::from_names(fields));
		self
	}

	pub fn with_all_fields(mut self) -> Self {
		self.fields = Some(FieldsSpec::All);
		self
	}

	pub fn with_read_only_fields(
		mut self,
		fields: impl IntoIterator<Item = impl Into<String>>,
	) -> Self {
		self.read_only_fields = collect_names(fields);
		self
	}

	pub fn with_write_only_fields(
		mut self,
		fields: impl IntoIterator<Item = impl Into<String>>,
	) -> Self {
		self.write_only_fields = collect_names(fields);
		self
	}

	/// Options for one model-generated field; declared fields are not affected
	pub fn with_extra_kwargs(mut self, field: impl Into<String>, options: FieldOptions) -> Self {
		self.extra_kwargs
			.entry(field.into())
			.or_default()
			.update(&options);
		self
	}

	/// Fields to mark `required = false`
	///
	/// When never set, defaults to the explicit field list (or nothing for
	/// [`ALL_FIELDS`]). The discriminator is always included.
	pub fn with_non_required_fields(
		mut self,
		fields: impl IntoIterator<Item = impl Into<String>>,
	) -> Self {
		self.non_required_fields = Some(collect_names(fields));
		self
	}

	/// Apply `options` to every listed field; later entries win
	pub fn with_common_field_params(
		mut self,
		fields: impl IntoIterator<Item = impl Into<String>>,
		options: FieldOptions,
	) -> Self {
		self.common_field_params
			.push((collect_names(fields), options));
		self
	}

	pub fn with_required_fields_on_create(
		mut self,
		fields: impl IntoIterator<Item = impl Into<String>>,
	) -> Self {
		self.required.on_create = collect_names(fields);
		self
	}

	pub fn with_required_fields_on_update(
		mut self,
		fields: impl IntoIterator<Item = impl Into<String>>,
	) -> Self {
		self.required.on_update = collect_names(fields);
		self
	}

	pub fn with_required_fields_on_create_any(
		mut self,
		fields: impl IntoIterator<Item = impl Into<String>>,
	) -> Self {
		self.required.on_create_any = collect_names(fields);
		self
	}

	pub fn with_required_fields_on_update_any(
		mut self,
		fields: impl IntoIterator<Item = impl Into<String>>,
	) -> Self {
		self.required.on_update_any = collect_names(fields);
		self
	}

	pub fn model(&self) -> Option<&Arc<ModelMeta>> {
		self.model.as_ref()
	}

	pub fn fields(&self) -> Option<&FieldsSpec> {
		self.fields.as_ref()
	}

	pub fn read_only_fields(&self) -> &[String] {
		&self.read_only_fields
	}

	pub fn write_only_fields(&self) -> &[String] {
		&self.write_only_fields
	}

	pub fn extra_kwargs(&self) -> &IndexMap<String, FieldOptions> {
		&self.extra_kwargs
	}

	pub fn non_required_fields(&self) -> Option<&[String]> {
		self.non_required_fields.as_deref()
	}

	pub fn common_field_params(&self) -> &[(Vec<String>, FieldOptions)] {
		&self.common_field_params
	}

	pub fn required_fields(&self) -> &RequiredFieldTables {
		&self.required
	}

	pub fn is_read_only(&self, field_name: &str) -> bool {
		self.read_only_fields.iter().any(|f| f == field_name)
	}

	pub fn is_write_only(&self, field_name: &str) -> bool {
		self.write_only_fields.iter().any(|f| f == field_name)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(vec!["__all__"], FieldsSpec::All)]
	#[case(vec!["state", "zip_code"], FieldsSpec::Only(vec!["state".into(), "zip_code".into()]))]
	#[case(vec!["__all__", "state"], FieldsSpec::Only(vec!["__all__".into(), "state".into()]))]
	fn test_fields_spec_from_names(#[case] names: Vec<&str>, #[case] expected: FieldsSpec) {
		assert_eq!(FieldsSpec::from_names(names), expected);
	}

	#[rstest]
	fn test_extra_kwargs_accumulate() {
		let meta = MetaOptions::new()
			.with_extra_kwargs("username", FieldOptions::new().with_required(false))
			.with_extra_kwargs("username", FieldOptions::new().with_max_length(20));

		let options = &meta.extra_kwargs()["username"];
		assert_eq!(options.required, Some(false));
		assert_eq!(options.max_length, Some(20));
	}

	#[rstest]
	#[case::create(Operation::Create)]
	#[case::update(Operation::Update)]
	fn test_conflicting_required_tables(#[case] operation: Operation) {
		let meta = match operation {
			Operation::Create => MetaOptions::new()
				.with_required_fields_on_create(["a", "b", "c"])
				.with_required_fields_on_create_any(["c", "a"]),
			Operation::Update => MetaOptions::new()
				.with_required_fields_on_update(["a", "b", "c"])
				.with_required_fields_on_update_any(["c", "a"]),
		};

		let error = meta.required_fields().check_conflicts().unwrap_err();

		assert_eq!(
			error.to_string(),
			format!(
				"\"a, c\" set inside both required_fields_on_{op} and required_fields_on_{op}_any",
				op = operation
			)
		);
	}

	#[rstest]
	fn test_disjoint_required_tables() {
		let meta = MetaOptions::new()
			.with_required_fields_on_create(["a"])
			.with_required_fields_on_create_any(["b", "c"])
			.with_required_fields_on_update_any(["a"]);

		assert!(meta.required_fields().check_conflicts().is_ok());
	}
}
