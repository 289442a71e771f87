//! Model introspection metadata

use indexmap::IndexMap;
use serde_json::Value;

/// Storage type of a model field
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
	/// Auto-incrementing primary key
	AutoPk,
	Char { max_length: Option<usize> },
	Integer,
	Boolean,
	/// Many-to-one relation stored as the related primary key
	ForeignKey { to: String },
	/// One-to-one relation stored as the related primary key
	OneToOne { to: String },
	/// Many-to-many relation stored outside the row
	ManyToMany { to: String },
}

/// Description of a single model field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMeta {
	name: String,
	kind: FieldKind,
	null: bool,
	blank: bool,
	default: Option<Value>,
}

impl FieldMeta {
	fn new(name: impl Into<String>, kind: FieldKind) -> Self {
		Self {
			name: name.into(),
			kind,
			null: false,
			blank: false,
			default: None,
		}
	}

	pub fn auto_pk(name: impl Into<String>) -> Self {
		Self::new(name, FieldKind::AutoPk)
	}

	pub fn char(name: impl Into<String>, max_length: usize) -> Self {
		Self::new(
			name,
			FieldKind::Char {
				max_length: Some(max_length),
			},
		)
	}

	/// Character field without a length limit
	pub fn text(name: impl Into<String>) -> Self {
		Self::new(name, FieldKind::Char { max_length: None })
	}

	pub fn integer(name: impl Into<String>) -> Self {
		Self::new(name, FieldKind::Integer)
	}

	pub fn boolean(name: impl Into<String>) -> Self {
		Self::new(name, FieldKind::Boolean)
	}

	pub fn foreign_key(name: impl Into<String>, to: impl Into<String>) -> Self {
		Self::new(name, FieldKind::ForeignKey { to: to.into() })
	}

	pub fn one_to_one(name: impl Into<String>, to: impl Into<String>) -> Self {
		Self::new(name, FieldKind::OneToOne { to: to.into() })
	}

	pub fn many_to_many(name: impl Into<String>, to: impl Into<String>) -> Self {
		Self::new(name, FieldKind::ManyToMany { to: to.into() })
	}

	/// Allow `NULL` in storage
	pub fn null(mut self) -> Self {
		self.null = true;
		self
	}

	/// Allow empty input
	pub fn blank(mut self) -> Self {
		self.blank = true;
		self
	}

	pub fn with_default(mut self, value: Value) -> Self {
		self.default = Some(value);
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn kind(&self) -> &FieldKind {
		&self.kind
	}

	pub fn is_null(&self) -> bool {
		self.null
	}

	pub fn is_blank(&self) -> bool {
		self.blank
	}

	pub fn default_value(&self) -> Option<&Value> {
		self.default.as_ref()
	}

	pub fn is_primary_key(&self) -> bool {
		matches!(self.kind, FieldKind::AutoPk)
	}

	/// Name of the related model, for relation fields
	pub fn related_model(&self) -> Option<&str> {
		match &self.kind {
			FieldKind::ForeignKey { to } | FieldKind::OneToOne { to } | FieldKind::ManyToMany { to } => {
				Some(to)
			}
			_ => None,
		}
	}

	pub fn is_relation(&self) -> bool {
		self.related_model().is_some()
	}

	pub fn is_to_many(&self) -> bool {
		matches!(self.kind, FieldKind::ManyToMany { .. })
	}

	/// Whether the value lives in the row itself
	pub fn is_concrete(&self) -> bool {
		!self.is_to_many()
	}
}

/// Relation metadata derived from a [`FieldMeta`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationInfo {
	pub related_model: String,
	pub to_many: bool,
}

/// Metadata for one model
///
/// # Examples
///
/// ```
/// use reinhardt_db::orm::{FieldMeta, ModelMeta};
///
/// let client = ModelMeta::new("Client")
///     .field(FieldMeta::auto_pk("id"))
///     .field(FieldMeta::one_to_one("user", "User"))
///     .field(FieldMeta::many_to_many("tags", "Tag").blank());
///
/// let relations = client.relations();
/// assert_eq!(relations.len(), 2);
/// assert!(!relations["user"].to_many);
/// assert!(relations["tags"].to_many);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ModelMeta {
	name: String,
	fields: Vec<FieldMeta>,
}

impl ModelMeta {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			fields: Vec::new(),
		}
	}

	/// Append a field; a field with the same name is replaced in place
	pub fn field(mut self, field: FieldMeta) -> Self {
		match self.fields.iter_mut().find(|f| f.name == field.name) {
			Some(existing) => *existing = field,
			None => self.fields.push(field),
		}
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn fields(&self) -> &[FieldMeta] {
		&self.fields
	}

	pub fn get_field(&self, name: &str) -> Option<&FieldMeta> {
		self.fields.iter().find(|f| f.name == name)
	}

	pub fn pk_field(&self) -> Option<&FieldMeta> {
		self.fields.iter().find(|f| f.is_primary_key())
	}

	/// Name of the primary key field, `"id"` when none is declared
	pub fn pk_name(&self) -> &str {
		self.pk_field().map(FieldMeta::name).unwrap_or("id")
	}

	/// Relation fields in declaration order
	pub fn relations(&self) -> IndexMap<String, RelationInfo> {
		self.fields
			.iter()
			.filter_map(|field| {
				field.related_model().map(|related| {
					(
						field.name.clone(),
						RelationInfo {
							related_model: related.to_string(),
							to_many: field.is_to_many(),
						},
					)
				})
			})
			.collect()
	}
}
