//! In-process [`ModelStore`] implementation

use super::{FieldKind, FieldMeta, Instance, ModelMeta, ModelStore, Pk, StoreError};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug)]
struct Table {
	meta: ModelMeta,
	next_pk: Pk,
	rows: BTreeMap<Pk, Map<String, Value>>,
	collections: HashMap<(Pk, String), Vec<Pk>>,
}

impl Table {
	fn new(meta: ModelMeta) -> Self {
		Self {
			meta,
			next_pk: 1,
			rows: BTreeMap::new(),
			collections: HashMap::new(),
		}
	}

	fn instance(&self, pk: Pk) -> Option<Instance> {
		self.rows
			.get(&pk)
			.map(|row| Instance::new(self.meta.name(), pk, row.clone()))
	}

	fn collection_field(&self, field: &str) -> Result<&FieldMeta, StoreError> {
		self.meta
			.get_field(field)
			.filter(|f| f.is_to_many())
			.ok_or_else(|| StoreError::UnexpectedField {
				model: self.meta.name().to_string(),
				field: field.to_string(),
			})
	}

	fn require_row(&self, pk: Pk) -> Result<(), StoreError> {
		if self.rows.contains_key(&pk) {
			Ok(())
		} else {
			Err(StoreError::DoesNotExist {
				model: self.meta.name().to_string(),
				pk,
			})
		}
	}
}

/// Thread-safe store keeping every table in memory
///
/// Tables are created on first use. Rows are validated against the model
/// metadata: unknown keywords, missing non-null columns, wrongly typed values
/// and dangling relation keys are rejected.
///
/// # Examples
///
/// ```
/// use reinhardt_db::orm::{FieldMeta, InMemoryStore, ModelMeta, ModelStore};
/// use serde_json::json;
///
/// # tokio_test_block(async {
/// let tag = ModelMeta::new("Tag")
///     .field(FieldMeta::auto_pk("id"))
///     .field(FieldMeta::char("name", 12));
/// let store = InMemoryStore::new();
///
/// let fields = json!({"name": "rust"}).as_object().cloned().unwrap();
/// let created = store.create(&tag, fields).await.unwrap();
/// assert_eq!(created.pk(), 1);
/// assert_eq!(store.count("Tag"), 1);
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Runtime::new().unwrap().block_on(f)
/// # }
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
	tables: Mutex<HashMap<String, Table>>,
}

impl InMemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Declare a model up front so relations can point at it before any row exists
	pub fn register(&self, meta: &ModelMeta) {
		self.tables
			.lock()
			.entry(meta.name().to_string())
			.or_insert_with(|| Table::new(meta.clone()));
	}

	/// Number of rows stored for `model`
	pub fn count(&self, model: &str) -> usize {
		self.tables
			.lock()
			.get(model)
			.map(|table| table.rows.len())
			.unwrap_or(0)
	}

	pub fn exists(&self, model: &str, pk: Pk) -> bool {
		self.tables
			.lock()
			.get(model)
			.is_some_and(|table| table.rows.contains_key(&pk))
	}

	/// Current state of a row, bypassing the async interface
	pub fn fetch(&self, model: &str, pk: Pk) -> Option<Instance> {
		self.tables.lock().get(model).and_then(|table| table.instance(pk))
	}

	/// Current members of a many-to-many field, bypassing the async interface
	pub fn members(&self, model: &str, pk: Pk, field: &str) -> Vec<Pk> {
		self.tables
			.lock()
			.get(model)
			.and_then(|table| table.collections.get(&(pk, field.to_string())).cloned())
			.unwrap_or_default()
	}
}

fn check_value(
	tables: &HashMap<String, Table>,
	model: &ModelMeta,
	field: &FieldMeta,
	value: &Value,
) -> Result<(), StoreError> {
	let invalid = |message: String| StoreError::InvalidValue {
		model: model.name().to_string(),
		field: field.name().to_string(),
		message,
	};

	if value.is_null() {
		return if field.is_null() {
			Ok(())
		} else {
			Err(StoreError::MissingField {
				model: model.name().to_string(),
				field: field.name().to_string(),
			})
		};
	}

	match field.kind() {
		FieldKind::Char { max_length } => {
			let text = value
				.as_str()
				.ok_or_else(|| invalid(format!("expected a string, got {}", value)))?;
			if let Some(max_length) = max_length
				&& text.chars().count() > *max_length
			{
				return Err(invalid(format!(
					"value too long for type character varying({})",
					max_length
				)));
			}
		}
		FieldKind::Integer => {
			value
				.as_i64()
				.ok_or_else(|| invalid(format!("expected an integer, got {}", value)))?;
		}
		FieldKind::Boolean => {
			value
				.as_bool()
				.ok_or_else(|| invalid(format!("expected a boolean, got {}", value)))?;
		}
		FieldKind::ForeignKey { to } | FieldKind::OneToOne { to } => {
			let pk = value
				.as_u64()
				.ok_or_else(|| invalid(format!("expected a primary key, got {}", value)))?;
			check_related(tables, to, pk).map_err(invalid)?;
		}
		_ => {}
	}
	Ok(())
}

fn check_related(tables: &HashMap<String, Table>, related: &str, pk: Pk) -> Result<(), String> {
	match tables.get(related) {
		Some(table) if table.rows.contains_key(&pk) => Ok(()),
		_ => Err(format!("related {} with pk {} does not exist", related, pk)),
	}
}

fn check_keywords<'a>(
	model: &ModelMeta,
	keys: impl Iterator<Item = &'a String>,
) -> Result<(), StoreError> {
	let pk_name = model.pk_name();
	for key in keys {
		let concrete = model
			.get_field(key)
			.is_some_and(|field| field.is_concrete());
		if key != pk_name && !concrete {
			return Err(StoreError::UnexpectedField {
				model: model.name().to_string(),
				field: key.clone(),
			});
		}
	}
	Ok(())
}

fn missing_value(model: &ModelMeta, field: &FieldMeta) -> Result<Value, StoreError> {
	if let Some(default) = field.default_value() {
		return Ok(default.clone());
	}
	if field.is_null() {
		return Ok(Value::Null);
	}
	if field.is_blank() && matches!(field.kind(), FieldKind::Char { .. }) {
		return Ok(Value::String(String::new()));
	}
	Err(StoreError::MissingField {
		model: model.name().to_string(),
		field: field.name().to_string(),
	})
}

#[async_trait]
impl ModelStore for InMemoryStore {
	async fn create(
		&self,
		model: &ModelMeta,
		mut fields: Map<String, Value>,
	) -> Result<Instance, StoreError> {
		let mut tables = self.tables.lock();
		check_keywords(model, fields.keys())?;

		let explicit_pk = match fields.remove(model.pk_name()) {
			None | Some(Value::Null) => None,
			Some(value) => Some(value.as_u64().ok_or_else(|| StoreError::InvalidValue {
				model: model.name().to_string(),
				field: model.pk_name().to_string(),
				message: format!("expected a primary key, got {}", value),
			})?),
		};

		let mut row = Map::new();
		for field in model.fields() {
			if field.is_primary_key() || !field.is_concrete() {
				continue;
			}
			let value = match fields.remove(field.name()) {
				Some(value) => value,
				None => missing_value(model, field)?,
			};
			check_value(&tables, model, field, &value)?;
			row.insert(field.name().to_string(), value);
		}

		let table = tables
			.entry(model.name().to_string())
			.or_insert_with(|| Table::new(model.clone()));
		let pk = match explicit_pk {
			Some(pk) if table.rows.contains_key(&pk) => {
				return Err(StoreError::InvalidValue {
					model: model.name().to_string(),
					field: model.pk_name().to_string(),
					message: format!("duplicate key value {}", pk),
				});
			}
			Some(pk) => pk,
			None => table.next_pk,
		};
		let next_pk = pk.checked_add(1).ok_or_else(|| StoreError::InvalidValue {
			model: model.name().to_string(),
			field: model.pk_name().to_string(),
			message: format!("primary key {} is out of range", pk),
		})?;
		table.next_pk = table.next_pk.max(next_pk);
		table.rows.insert(pk, row.clone());

		tracing::debug!(model = model.name(), pk, "created row");
		Ok(Instance::new(model.name(), pk, row))
	}

	async fn get(&self, model: &ModelMeta, pk: Pk) -> Result<Instance, StoreError> {
		self.tables
			.lock()
			.get(model.name())
			.and_then(|table| table.instance(pk))
			.ok_or_else(|| StoreError::DoesNotExist {
				model: model.name().to_string(),
				pk,
			})
	}

	async fn save(&self, instance: &Instance) -> Result<(), StoreError> {
		let mut tables = self.tables.lock();
		let meta = tables
			.get(instance.model())
			.map(|table| table.meta.clone())
			.ok_or_else(|| StoreError::UnknownModel(instance.model().to_string()))?;
		check_keywords(&meta, instance.fields().keys())?;

		let mut row = Map::new();
		{
			let table = &tables[instance.model()];
			table.require_row(instance.pk())?;
			let current = &table.rows[&instance.pk()];
			for field in meta.fields() {
				if field.is_primary_key() || !field.is_concrete() {
					continue;
				}
				let value = instance
					.get(field.name())
					.or_else(|| current.get(field.name()))
					.cloned()
					.unwrap_or(Value::Null);
				check_value(&tables, &meta, field, &value)?;
				row.insert(field.name().to_string(), value);
			}
		}

		if let Some(table) = tables.get_mut(instance.model()) {
			table.rows.insert(instance.pk(), row);
		}
		tracing::debug!(model = instance.model(), pk = instance.pk(), "saved row");
		Ok(())
	}

	async fn delete(&self, instance: &Instance) -> Result<(), StoreError> {
		let mut tables = self.tables.lock();
		let table = tables
			.get_mut(instance.model())
			.ok_or_else(|| StoreError::UnknownModel(instance.model().to_string()))?;
		table.require_row(instance.pk())?;
		table.rows.remove(&instance.pk());
		table.collections.retain(|(pk, _), _| *pk != instance.pk());

		tracing::debug!(model = instance.model(), pk = instance.pk(), "deleted row");
		Ok(())
	}

	async fn set_collection(
		&self,
		instance: &Instance,
		field: &str,
		pks: &[Pk],
	) -> Result<(), StoreError> {
		let mut tables = self.tables.lock();
		let related = {
			let table = tables
				.get(instance.model())
				.ok_or_else(|| StoreError::UnknownModel(instance.model().to_string()))?;
			table.require_row(instance.pk())?;
			let meta = table.collection_field(field)?;
			meta.related_model().unwrap_or_default().to_string()
		};

		let mut members: Vec<Pk> = Vec::with_capacity(pks.len());
		for pk in pks {
			check_related(&tables, &related, *pk).map_err(|message| StoreError::InvalidValue {
				model: instance.model().to_string(),
				field: field.to_string(),
				message,
			})?;
			if !members.contains(pk) {
				members.push(*pk);
			}
		}

		if let Some(table) = tables.get_mut(instance.model()) {
			table
				.collections
				.insert((instance.pk(), field.to_string()), members);
		}
		Ok(())
	}

	async fn collection(&self, instance: &Instance, field: &str) -> Result<Vec<Pk>, StoreError> {
		let tables = self.tables.lock();
		let table = tables
			.get(instance.model())
			.ok_or_else(|| StoreError::UnknownModel(instance.model().to_string()))?;
		table.require_row(instance.pk())?;
		table.collection_field(field)?;
		Ok(table
			.collections
			.get(&(instance.pk(), field.to_string()))
			.cloned()
			.unwrap_or_default())
	}
}
