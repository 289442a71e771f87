use super::Pk;
use serde::Serialize;
use serde_json::{Map, Value};

/// A persisted model row
///
/// Concrete field values (including relation primary keys) live in `fields`.
/// Many-to-many memberships are kept by the store and read through
/// [`ModelStore::collection`](super::ModelStore::collection).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Instance {
	model: String,
	pk: Pk,
	fields: Map<String, Value>,
}

impl Instance {
	pub fn new(model: impl Into<String>, pk: Pk, fields: Map<String, Value>) -> Self {
		Self {
			model: model.into(),
			pk,
			fields,
		}
	}

	/// Name of the model this row belongs to
	pub fn model(&self) -> &str {
		&self.model
	}

	pub fn pk(&self) -> Pk {
		self.pk
	}

	pub fn fields(&self) -> &Map<String, Value> {
		&self.fields
	}

	pub fn get(&self, field: &str) -> Option<&Value> {
		self.fields.get(field)
	}

	/// Assign a field value; persisted on the next `save`
	pub fn set(&mut self, field: impl Into<String>, value: Value) {
		self.fields.insert(field.into(), value);
	}

	/// Primary key held by a to-one relation field, `None` when the slot is empty
	pub fn related_pk(&self, field: &str) -> Option<Pk> {
		self.get(field).and_then(Value::as_u64)
	}

	pub fn into_fields(self) -> Map<String, Value> {
		self.fields
	}
}
