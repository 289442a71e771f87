//! Model serializer
//!
//! Binds a [`SerializerSchema`] to input data and optionally an existing row,
//! validates the input and saves it through a [`ModelStore`], writing nested
//! serializer fields as described in [`crate::nested`].

use crate::error::SerializerError;
use crate::fields::FieldType;
use crate::nested::{NestedSaveContext, NestedSerializerSave, NestedWriter};
use crate::schema::SerializerSchema;
use crate::validation::{Payload, validate};
use reinhardt_conf::settings::NestedWriteSettings;
use reinhardt_core::exception::ValidationError;
use reinhardt_db::orm::{Instance, ModelStore};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Serializer bound to one model through its schema
///
/// # Examples
///
/// ```
/// use reinhardt_db::orm::{FieldMeta, InMemoryStore, ModelMeta};
/// use reinhardt_serializers::meta::MetaOptions;
/// use reinhardt_serializers::schema::SchemaBuilder;
/// use reinhardt_serializers::serializer::ModelSerializer;
/// use serde_json::json;
/// use std::sync::Arc;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let tag = Arc::new(
///     ModelMeta::new("Tag")
///         .field(FieldMeta::auto_pk("id"))
///         .field(FieldMeta::char("name", 12)),
/// );
/// let schema = SchemaBuilder::new("TagSerializer")
///     .meta(MetaOptions::new().with_model(tag).with_all_fields())
///     .build()
///     .unwrap();
/// let store = InMemoryStore::new();
///
/// let mut serializer = ModelSerializer::new(schema).with_data(json!({"name": "rust"}));
/// assert!(serializer.is_valid());
/// let created = serializer.save(&store).await.unwrap();
///
/// assert_eq!(created.get("name"), Some(&json!("rust")));
/// assert_eq!(store.count("Tag"), 1);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct ModelSerializer {
	schema: Arc<SerializerSchema>,
	instance: Option<Instance>,
	data: Option<Value>,
	partial: bool,
	settings: NestedWriteSettings,
	validated: Option<Payload>,
	errors: Option<ValidationError>,
}

impl ModelSerializer {
	/// Serializer that creates a new row
	pub fn new(schema: Arc<SerializerSchema>) -> Self {
		Self {
			schema,
			instance: None,
			data: None,
			partial: false,
			settings: NestedWriteSettings::default(),
			validated: None,
			errors: None,
		}
	}

	/// Serializer that updates `instance`
	pub fn for_instance(schema: Arc<SerializerSchema>, instance: Instance) -> Self {
		let mut serializer = Self::new(schema);
		serializer.instance = Some(instance);
		serializer
	}

	pub fn with_data(mut self, data: Value) -> Self {
		self.data = Some(data);
		self.validated = None;
		self.errors = None;
		self
	}

	/// Skip the "required" check for fields missing from the input
	pub fn partial(mut self, partial: bool) -> Self {
		self.partial = partial;
		self
	}

	pub fn with_settings(mut self, settings: NestedWriteSettings) -> Self {
		self.settings = settings;
		self
	}

	pub fn schema(&self) -> &Arc<SerializerSchema> {
		&self.schema
	}

	pub fn instance(&self) -> Option<&Instance> {
		self.instance.as_ref()
	}

	pub fn initial_data(&self) -> Option<&Value> {
		self.data.as_ref()
	}

	/// Validate the bound data, keeping either the payload or the errors
	pub fn run_validation(&mut self) -> Result<(), ValidationError> {
		let result = match &self.data {
			Some(data) => validate(&self.schema, data, self.instance.is_some(), self.partial),
			None => Err(ValidationError::non_field("No data provided.")),
		};
		match result {
			Ok(payload) => {
				self.validated = Some(payload);
				self.errors = None;
				Ok(())
			}
			Err(error) => {
				tracing::debug!(
					serializer = self.schema.name(),
					errors = error.detail().message_count(),
					"validation failed"
				);
				self.validated = None;
				self.errors = Some(error.clone());
				Err(error)
			}
		}
	}

	pub fn is_valid(&mut self) -> bool {
		self.run_validation().is_ok()
	}

	pub fn errors(&self) -> Option<&ValidationError> {
		self.errors.as_ref()
	}

	pub fn validated_data(&self) -> Option<&Payload> {
		self.validated.as_ref()
	}

	/// Adjust the validated payload before saving
	pub fn validated_data_mut(&mut self) -> Option<&mut Payload> {
		self.validated.as_mut()
	}

	/// Create or update the row, including nested serializer fields
	///
	/// When any step fails, every row created by this save is deleted and,
	/// unless disabled in the settings, every updated row is restored.
	pub async fn save(&mut self, store: &dyn ModelStore) -> Result<Instance, SerializerError> {
		let mut context = NestedSaveContext::new(self.settings.clone());
		match self.save_nested(&mut context, store).await {
			Ok(instance) => {
				context.commit();
				Ok(instance)
			}
			Err(error) => {
				tracing::debug!(
					serializer = self.schema.name(),
					error = %error,
					"save failed"
				);
				Err(context.rollback(store, error).await)
			}
		}
	}

	/// Save as part of an enclosing save; compensation is left to its owner
	pub async fn save_nested(
		&mut self,
		context: &mut NestedSaveContext,
		store: &dyn ModelStore,
	) -> Result<Instance, SerializerError> {
		let payload = self
			.validated
			.clone()
			.ok_or(SerializerError::NotValidated)?;
		let writer = NestedWriter::new(&self.schema, store);
		let saved = match self.instance.clone() {
			Some(instance) => writer.update_nested(context, instance, payload).await?,
			None => writer.create_nested(context, payload).await?,
		};
		self.instance = Some(saved.clone());
		Ok(saved)
	}

	/// Output representation of `instance`
	///
	/// Write-only fields are skipped. Relations, nested ones included, are
	/// rendered as primary keys.
	pub async fn to_representation(
		&self,
		instance: &Instance,
		store: &dyn ModelStore,
	) -> Result<Map<String, Value>, SerializerError> {
		let pk_name = self.schema.model().pk_name();
		let mut output = Map::new();
		for field in self.schema.readable_fields() {
			let name = field.name();
			let many = match field.field_type() {
				FieldType::PrimaryKeyRelated { many } | FieldType::Nested { many, .. } => *many,
				_ => false,
			};
			let value = if name == pk_name {
				Value::from(instance.pk())
			} else if many {
				Value::from(store.collection(instance, name).await?)
			} else {
				instance.get(name).cloned().unwrap_or(Value::Null)
			};
			output.insert(name.to_string(), value);
		}
		Ok(output)
	}
}
