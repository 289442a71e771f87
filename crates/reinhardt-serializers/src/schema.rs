//! Serializer schemas
//!
//! A [`SerializerSchema`] is the immutable, fully resolved field set of one
//! serializer. It is produced once by [`SchemaBuilder::build`], which applies
//! the [`MetaOptions`] tables and injects the `_pk` discriminator.

use crate::discriminator::{
	DISCRIMINATOR_FIELD, FieldNameResolver, default_resolver, inject_discriminator,
};
use crate::error::SchemaError;
use crate::fields::{FieldDef, FieldOptions};
use crate::meta::{FieldsSpec, MetaOptions, RequiredFieldTables};
use indexmap::IndexMap;
use reinhardt_db::orm::{FieldKind, FieldMeta, ModelMeta};
use std::sync::Arc;

/// Resolved field set of one serializer
#[derive(Debug)]
pub struct SerializerSchema {
	name: String,
	model: Arc<ModelMeta>,
	fields: IndexMap<String, FieldDef>,
	declared: IndexMap<String, FieldDef>,
	required: RequiredFieldTables,
}

impl SerializerSchema {
	/// Serializer name, used in error messages
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn model(&self) -> &Arc<ModelMeta> {
		&self.model
	}

	pub fn field(&self, name: &str) -> Option<&FieldDef> {
		self.fields.get(name)
	}

	pub fn fields(&self) -> impl Iterator<Item = &FieldDef> {
		self.fields.values()
	}

	pub fn field_names(&self) -> impl Iterator<Item = &str> {
		self.fields.keys().map(String::as_str)
	}

	/// Fields accepted as input
	pub fn writable_fields(&self) -> impl Iterator<Item = &FieldDef> {
		self.fields.values().filter(|field| !field.is_read_only())
	}

	/// Fields emitted as output
	pub fn readable_fields(&self) -> impl Iterator<Item = &FieldDef> {
		self.fields.values().filter(|field| !field.is_write_only())
	}

	/// Fields declared explicitly on the serializer (inherited ones included)
	pub fn declared_fields(&self) -> &IndexMap<String, FieldDef> {
		&self.declared
	}

	pub fn required_fields(&self) -> &RequiredFieldTables {
		&self.required
	}
}

/// Builder for [`SerializerSchema`]
///
/// # Examples
///
/// ```
/// use reinhardt_db::orm::{FieldMeta, ModelMeta};
/// use reinhardt_serializers::meta::MetaOptions;
/// use reinhardt_serializers::schema::SchemaBuilder;
/// use std::sync::Arc;
///
/// let address = Arc::new(
///     ModelMeta::new("Address")
///         .field(FieldMeta::auto_pk("id"))
///         .field(FieldMeta::char("state", 2))
///         .field(FieldMeta::char("zip_code", 12)),
/// );
///
/// let schema = SchemaBuilder::new("AddressSerializer")
///     .meta(
///         MetaOptions::new()
///             .with_model(address)
///             .with_fields(["id", "state", "zip_code"])
///             .with_read_only_fields(["id"]),
///     )
///     .build()
///     .unwrap();
///
/// let names: Vec<_> = schema.field_names().collect();
/// assert_eq!(names, ["id", "state", "zip_code", "_pk"]);
/// assert!(schema.field("id").unwrap().is_read_only());
/// // Explicitly listed fields are not required unless a required table says so
/// assert!(!schema.field("state").unwrap().is_required());
/// ```
pub struct SchemaBuilder {
	name: String,
	declared: IndexMap<String, FieldDef>,
	meta: Option<MetaOptions>,
	bases: Vec<Arc<SerializerSchema>>,
	resolver: FieldNameResolver,
}

impl SchemaBuilder {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			declared: IndexMap::new(),
			meta: None,
			bases: Vec::new(),
			resolver: default_resolver(),
		}
	}

	/// Declare a field; declaring a name twice replaces the first definition
	pub fn field(mut self, field: FieldDef) -> Self {
		self.declared.insert(field.name().to_string(), field);
		self
	}

	pub fn meta(mut self, meta: MetaOptions) -> Self {
		self.meta = Some(meta);
		self
	}

	/// Inherit the declared fields of `base`
	///
	/// Bases added earlier take precedence over later ones, and fields declared
	/// on this builder take precedence over every base.
	pub fn extend(mut self, base: &Arc<SerializerSchema>) -> Self {
		self.bases.push(Arc::clone(base));
		self
	}

	/// Replace the field-name resolver used for `__all__`
	pub fn field_name_resolver(mut self, resolver: FieldNameResolver) -> Self {
		self.resolver = resolver;
		self
	}

	pub fn build(self) -> Result<Arc<SerializerSchema>, SchemaError> {
		let Self {
			name,
			declared,
			meta,
			bases,
			mut resolver,
		} = self;

		let meta = meta.ok_or_else(|| SchemaError::MissingMeta {
			serializer: name.clone(),
		})?;
		let explicit = meta
			.fields()
			.cloned()
			.ok_or_else(|| SchemaError::MissingFields {
				serializer: name.clone(),
			})?;
		let model = meta
			.model()
			.cloned()
			.ok_or_else(|| SchemaError::MissingModel {
				serializer: name.clone(),
			})?;
		meta.required_fields().check_conflicts()?;

		let declared = inherit_declared(&bases, declared);
		let mut with_discriminator = declared.clone();
		let mut fields_spec = explicit.clone();
		inject_discriminator(&mut with_discriminator, &mut fields_spec, &mut resolver);

		let names = match &fields_spec {
			FieldsSpec::Only(names) => names.clone(),
			FieldsSpec::All => {
				let declared_names: Vec<String> = with_discriminator.keys().cloned().collect();
				resolver(&model, &declared_names)
			}
		};

		let non_required: Vec<String> = {
			let mut listed = match meta.non_required_fields() {
				Some(listed) => listed.to_vec(),
				None => match &explicit {
					FieldsSpec::Only(names) => names.clone(),
					FieldsSpec::All => Vec::new(),
				},
			};
			listed.push(DISCRIMINATOR_FIELD.to_string());
			listed
		};

		let mut fields = IndexMap::new();
		for field_name in &names {
			if fields.contains_key(field_name) {
				continue;
			}
			let field = if let Some(field) = with_discriminator.get(field_name) {
				configure_declared(field.clone(), &meta, &non_required)
			} else if let Some(model_field) = model.get_field(field_name) {
				configure_generated(build_model_field(model_field), &meta, &non_required)
			} else {
				return Err(SchemaError::UnknownField {
					field: field_name.clone(),
					model: model.name().to_string(),
					serializer: name.clone(),
				});
			};
			fields.insert(field_name.clone(), field);
		}

		tracing::debug!(
			serializer = %name,
			model = model.name(),
			fields = fields.len(),
			"built serializer schema"
		);

		Ok(Arc::new(SerializerSchema {
			name,
			model,
			fields,
			declared,
			required: meta.required_fields().clone(),
		}))
	}
}

/// Inherited fields first, earlier bases winning, then the builder's own
fn inherit_declared(
	bases: &[Arc<SerializerSchema>],
	own: IndexMap<String, FieldDef>,
) -> IndexMap<String, FieldDef> {
	if bases.is_empty() {
		return own;
	}
	let mut merged: IndexMap<String, FieldDef> = IndexMap::new();
	for base in bases {
		for (name, field) in base.declared_fields() {
			if !merged.contains_key(name) {
				merged.insert(name.clone(), field.clone());
			}
		}
	}
	for (name, field) in own {
		merged.insert(name, field);
	}
	merged
}

fn common_params_for<'a>(
	meta: &'a MetaOptions,
	field_name: &'a str,
) -> impl Iterator<Item = &'a FieldOptions> + 'a {
	meta.common_field_params()
		.iter()
		.filter(move |(names, _)| names.iter().any(|name| name == field_name))
		.map(|(_, options)| options)
}

/// Declared fields take `non_required_fields` and `common_field_params` only
fn configure_declared(mut field: FieldDef, meta: &MetaOptions, non_required: &[String]) -> FieldDef {
	if non_required.iter().any(|name| name == field.name()) {
		field = field.required(false);
	}
	let name = field.name().to_string();
	for options in common_params_for(meta, &name) {
		options.apply_to(&mut field);
	}
	field
}

fn configure_generated(mut field: FieldDef, meta: &MetaOptions, non_required: &[String]) -> FieldDef {
	let name = field.name().to_string();
	let mut options = meta.extra_kwargs().get(&name).cloned().unwrap_or_default();
	if non_required.contains(&name) {
		options.required = Some(false);
	}
	for common in common_params_for(meta, &name) {
		options.update(common);
	}
	if meta.is_read_only(&name) {
		options.read_only = Some(true);
	}
	if meta.is_write_only(&name) {
		options.write_only = Some(true);
	}
	options.apply_to(&mut field);
	field
}

/// Default serializer field for a model field
fn build_model_field(model_field: &FieldMeta) -> FieldDef {
	let name = model_field.name();
	let field = match model_field.kind() {
		FieldKind::AutoPk => return FieldDef::integer(name).read_only(),
		FieldKind::Char { max_length } => {
			let field = FieldDef::char(name);
			match max_length {
				Some(max_length) => field.max_length(*max_length),
				None => field,
			}
		}
		FieldKind::Integer => FieldDef::integer(name),
		FieldKind::Boolean => FieldDef::boolean(name),
		FieldKind::ForeignKey { .. } | FieldKind::OneToOne { .. } => {
			FieldDef::primary_key_related(name)
		}
		FieldKind::ManyToMany { .. } => FieldDef::many_primary_key_related(name),
		// Storage kinds without an input representation are output only
		_ => return FieldDef::char(name).read_only(),
	};

	let mut field = field.required(
		!(model_field.is_null() || model_field.is_blank() || model_field.default_value().is_some()),
	);
	if model_field.is_null() {
		field = field.allow_null();
	}
	if model_field.is_blank() && matches!(model_field.kind(), FieldKind::Char { .. }) {
		field = field.allow_blank();
	}
	field
}
