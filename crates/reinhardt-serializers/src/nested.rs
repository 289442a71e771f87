//! Writable nested serializers
//!
//! [`NestedWriter`] creates and updates one model row from a validated payload,
//! first resolving every relational field whose value is a nested payload:
//!
//! - a nested payload without `_pk` creates a new related row through the
//!   nested serializer,
//! - a nested payload with `_pk` updates the related row with that primary key,
//! - bare primary keys are passed through unchanged.
//!
//! Every row created (and the prior state of every row updated) is recorded in
//! the [`NestedSaveContext`] shared by the whole save, so a failure anywhere can
//! be compensated by the top-level [`ModelSerializer::save`].

use crate::compensation::CompensationSet;
use crate::discriminator::DISCRIMINATOR_FIELD;
use crate::error::SerializerError;
use crate::relations::{RelationDescriptor, classify};
use crate::schema::SerializerSchema;
use crate::serializer::ModelSerializer;
use crate::validation::{Payload, type_name};
use async_trait::async_trait;
use indexmap::IndexMap;
use reinhardt_conf::settings::NestedWriteSettings;
use reinhardt_core::exception::{ErrorTreeBuilder, ValidationError};
use reinhardt_db::orm::{Instance, ModelStore, Pk, StoreError};
use serde_json::Value;
use std::sync::Arc;

/// Message for a to-one slot that is already filled but the payload has no `_pk`
pub const RELATED_OBJECT_EXISTS_MESSAGE: &str = "Related object already exists.";

fn no_such_object_message(model: &str, pk: impl std::fmt::Display) -> String {
	format!("No such {} object with primary key {} exists.", model, pk)
}

/// State shared by every serializer taking part in one top-level save
#[derive(Debug)]
pub struct NestedSaveContext {
	depth: usize,
	settings: NestedWriteSettings,
	compensation: CompensationSet,
}

impl NestedSaveContext {
	/// Create a context for a new top-level save
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_conf::settings::NestedWriteSettings;
	/// use reinhardt_serializers::nested::NestedSaveContext;
	///
	/// let context = NestedSaveContext::new(NestedWriteSettings::default());
	/// assert_eq!(context.depth(), 0);
	/// assert_eq!(context.max_depth(), 10);
	/// ```
	pub fn new(settings: NestedWriteSettings) -> Self {
		Self {
			depth: 0,
			settings,
			compensation: CompensationSet::new(),
		}
	}

	pub fn depth(&self) -> usize {
		self.depth
	}

	pub fn max_depth(&self) -> usize {
		self.settings.max_nesting_depth
	}

	pub fn settings(&self) -> &NestedWriteSettings {
		&self.settings
	}

	pub fn compensation(&self) -> &CompensationSet {
		&self.compensation
	}

	/// Descend into a nested serializer
	pub fn enter(&mut self) -> Result<(), SerializerError> {
		if self.depth >= self.max_depth() {
			return Err(SerializerError::DepthExceeded {
				max_depth: self.max_depth(),
			});
		}
		self.depth += 1;
		Ok(())
	}

	pub fn leave(&mut self) {
		self.depth = self.depth.saturating_sub(1);
	}

	pub fn record_created(&mut self, instance: Instance) {
		self.compensation.record_created(instance);
	}

	pub fn record_updated(&mut self, snapshot: Instance) {
		self.compensation.record_updated(snapshot);
	}

	/// The save succeeded; keep every change
	pub fn commit(&mut self) {
		self.compensation.discard();
	}

	/// Undo recorded changes after `error` and return the error to report
	pub async fn rollback(&mut self, store: &dyn ModelStore, error: SerializerError) -> SerializerError {
		let failures = self
			.compensation
			.compensate(store, self.settings.restore_updated_on_failure)
			.await;
		if failures.is_empty() {
			error
		} else {
			SerializerError::Compensation {
				original: Box::new(error),
				failures,
			}
		}
	}
}

/// Outcome of resolving one nested payload
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
	Created(Instance),
	Updated(Instance),
}

impl Resolution {
	pub fn instance(&self) -> &Instance {
		match self {
			Self::Created(instance) | Self::Updated(instance) => instance,
		}
	}

	pub fn is_created(&self) -> bool {
		matches!(self, Self::Created(_))
	}
}

/// Why a nested payload could not be resolved
#[derive(Debug)]
pub enum ResolveFailure {
	/// The nested serializer rejected its input
	Validation(ValidationError),
	/// `_pk` named a row that does not exist
	NotFound { model: String, pk: Pk },
	/// Not a problem with the input
	Fatal(SerializerError),
}

impl ResolveFailure {
	/// Report the failure one level up, under `field`
	pub fn into_field_error(self, field: &str) -> SerializerError {
		match self {
			Self::Validation(error) => ValidationError::wrap_under(field, error).into(),
			Self::NotFound { model, pk } => ValidationError::wrap_under(
				field,
				ValidationError::non_field(no_such_object_message(&model, pk)),
			)
			.into(),
			Self::Fatal(error) => error,
		}
	}
}

impl From<SerializerError> for ResolveFailure {
	fn from(error: SerializerError) -> Self {
		match error {
			SerializerError::Validation(error) => Self::Validation(error),
			other => Self::Fatal(other),
		}
	}
}

/// Relational values ready to be merged into the parent's write
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RelatedFieldData {
	/// To-one fields, as primary keys (or null)
	pub to_one: Payload,
	/// To-many fields, attached after the parent row is written
	pub to_many: IndexMap<String, Vec<Pk>>,
}

/// Create and update of nested serializers
#[async_trait]
pub trait NestedSerializerSave {
	/// Create a row from `payload`, resolving nested payloads first
	async fn create_nested(
		&self,
		context: &mut NestedSaveContext,
		payload: Payload,
	) -> Result<Instance, SerializerError>;

	/// Update `instance` from `payload`, resolving nested payloads first
	async fn update_nested(
		&self,
		context: &mut NestedSaveContext,
		instance: Instance,
		payload: Payload,
	) -> Result<Instance, SerializerError>;
}

/// Nested writes for one serializer schema
pub struct NestedWriter<'a> {
	schema: &'a Arc<SerializerSchema>,
	store: &'a dyn ModelStore,
}

impl<'a> NestedWriter<'a> {
	pub fn new(schema: &'a Arc<SerializerSchema>, store: &'a dyn ModelStore) -> Self {
		Self { schema, store }
	}

	/// See [`NestedSerializerSave::create_nested`]
	pub async fn create(
		&self,
		context: &mut NestedSaveContext,
		mut payload: Payload,
	) -> Result<Instance, SerializerError> {
		payload.remove(DISCRIMINATOR_FIELD);
		let related = self.resolve_related(context, &mut payload).await?;
		payload.extend(related.to_one);

		let model = self.schema.model();
		let instance = self
			.store
			.create(model, payload)
			.await
			.map_err(|source| SerializerError::Persistence {
				model: model.name().to_string(),
				manager: self.store.manager_name().to_string(),
				serializer: self.schema.name().to_string(),
				source,
			})?;
		context.record_created(instance.clone());
		tracing::debug!(
			serializer = self.schema.name(),
			model = model.name(),
			pk = instance.pk(),
			depth = context.depth(),
			"created object"
		);

		self.attach_collections(&instance, related.to_many).await?;
		Ok(instance)
	}

	/// See [`NestedSerializerSave::update_nested`]
	pub async fn update(
		&self,
		context: &mut NestedSaveContext,
		instance: Instance,
		mut payload: Payload,
	) -> Result<Instance, SerializerError> {
		payload.remove(DISCRIMINATOR_FIELD);
		self.check_existing_relations(&instance, &payload)?;
		let related = self.resolve_related(context, &mut payload).await?;

		// The stored row, not the caller's copy, is what a rollback writes back.
		let snapshot = self.store.get(self.schema.model(), instance.pk()).await?;
		let mut instance = instance;
		for (field, value) in payload.into_iter().chain(related.to_one) {
			instance.set(field, value);
		}
		self.store.save(&instance).await?;
		context.record_updated(snapshot);
		tracing::debug!(
			serializer = self.schema.name(),
			model = instance.model(),
			pk = instance.pk(),
			depth = context.depth(),
			"updated object"
		);

		self.attach_collections(&instance, related.to_many).await?;
		Ok(instance)
	}

	/// Create or update the related row described by one nested payload
	///
	/// Without `_pk` the nested serializer creates a new row. With `_pk` the row
	/// is looked up and the nested serializer updates it.
	pub async fn resolve_single(
		&self,
		context: &mut NestedSaveContext,
		relation: &RelationDescriptor,
		nested: &Arc<SerializerSchema>,
		payload: Payload,
	) -> Result<Resolution, ResolveFailure> {
		context.enter()?;
		let result = self.resolve_entered(context, relation, nested, payload).await;
		context.leave();
		result
	}

	async fn resolve_entered(
		&self,
		context: &mut NestedSaveContext,
		relation: &RelationDescriptor,
		nested: &Arc<SerializerSchema>,
		mut payload: Payload,
	) -> Result<Resolution, ResolveFailure> {
		let settings = context.settings().clone();
		let discriminator = payload.remove(DISCRIMINATOR_FIELD).filter(|value| !value.is_null());

		let Some(discriminator) = discriminator else {
			tracing::debug!(
				serializer = nested.name(),
				related_model = %relation.related_model,
				"creating nested object"
			);
			let mut serializer = ModelSerializer::new(Arc::clone(nested))
				.with_settings(settings)
				.with_data(Value::Object(payload));
			serializer
				.run_validation()
				.map_err(ResolveFailure::Validation)?;
			let instance = serializer.save_nested(context, self.store).await?;
			return Ok(Resolution::Created(instance));
		};

		let pk = discriminator.as_u64().ok_or_else(|| {
			ResolveFailure::Validation(ValidationError::field(
				DISCRIMINATOR_FIELD,
				"A valid integer is required.",
			))
		})?;
		let existing = match self.store.get(nested.model(), pk).await {
			Ok(existing) => existing,
			Err(StoreError::DoesNotExist { .. }) => {
				return Err(ResolveFailure::NotFound {
					model: relation.related_model.clone(),
					pk,
				});
			}
			Err(error) => return Err(ResolveFailure::Fatal(error.into())),
		};

		tracing::debug!(
			serializer = nested.name(),
			related_model = %relation.related_model,
			pk,
			"updating nested object"
		);
		let partial = settings.partial_nested_updates;
		let mut serializer = ModelSerializer::for_instance(Arc::clone(nested), existing)
			.with_settings(settings)
			.with_data(Value::Object(payload))
			.partial(partial);
		serializer
			.run_validation()
			.map_err(ResolveFailure::Validation)?;
		let instance = serializer.save_nested(context, self.store).await?;
		Ok(Resolution::Updated(instance))
	}

	/// Pull every relational field out of `payload` and resolve nested payloads
	///
	/// Fields are visited in schema order; to-many elements in payload order.
	/// A failure is reported under the field name, without an element index.
	pub async fn resolve_related(
		&self,
		context: &mut NestedSaveContext,
		payload: &mut Payload,
	) -> Result<RelatedFieldData, SerializerError> {
		let relations = classify(self.schema.model(), self.schema);
		let mut related = RelatedFieldData::default();

		for field in self.schema.writable_fields() {
			let name = field.name();
			let Some(relation) = relations.get(name) else {
				continue;
			};
			let Some(value) = payload.remove(name) else {
				continue;
			};
			let nested = field.as_nested_resolvable().map(|nested| nested.schema());

			if relation.to_many {
				let items = match value {
					Value::Array(items) => items,
					Value::Null => Vec::new(),
					other => {
						return Err(ValidationError::field(
							name,
							format!(
								"Expected a list of items but got type \"{}\".",
								type_name(&other)
							),
						)
						.into());
					}
				};
				let mut pks = Vec::with_capacity(items.len());
				for item in items {
					let pk = match (item, nested) {
						(Value::Object(item), Some(nested)) => self
							.resolve_single(context, relation, nested, item)
							.await
							.map_err(|failure| failure.into_field_error(name))?
							.instance()
							.pk(),
						(item, _) => item.as_u64().ok_or_else(|| {
							ValidationError::field(
								name,
								format!(
									"Incorrect type. Expected pk value, received {}.",
									type_name(&item)
								),
							)
						})?,
					};
					pks.push(pk);
				}
				related.to_many.insert(name.to_string(), pks);
			} else {
				let value = match (value, nested) {
					(Value::Object(item), Some(nested)) => {
						let resolution = self
							.resolve_single(context, relation, nested, item)
							.await
							.map_err(|failure| failure.into_field_error(name))?;
						Value::from(resolution.instance().pk())
					}
					(value, _) => value,
				};
				related.to_one.insert(name.to_string(), value);
			}
		}

		Ok(related)
	}

	/// Refuse nested to-one payloads that would re-point a filled slot
	///
	/// Every violation is reported before anything is written.
	fn check_existing_relations(
		&self,
		instance: &Instance,
		payload: &Payload,
	) -> Result<(), ValidationError> {
		let mut errors = ErrorTreeBuilder::new();
		for (name, relation) in self.schema.model().relations() {
			if relation.to_many {
				continue;
			}
			let Some(Value::Object(nested)) = payload.get(&name) else {
				continue;
			};
			let Some(current) = instance.related_pk(&name) else {
				continue;
			};
			match nested.get(DISCRIMINATOR_FIELD) {
				None | Some(Value::Null) => {
					errors.append(name.as_str(), RELATED_OBJECT_EXISTS_MESSAGE);
				}
				Some(given) if given.as_u64() != Some(current) => {
					errors.append(
						name.as_str(),
						no_such_object_message(&relation.related_model, given),
					);
				}
				Some(_) => {}
			}
		}
		match errors.build() {
			Some(tree) => Err(tree.into()),
			None => Ok(()),
		}
	}

	async fn attach_collections(
		&self,
		instance: &Instance,
		to_many: IndexMap<String, Vec<Pk>>,
	) -> Result<(), SerializerError> {
		for (field, pks) in to_many {
			self.store.set_collection(instance, &field, &pks).await?;
			tracing::debug!(
				model = instance.model(),
				pk = instance.pk(),
				field = %field,
				members = pks.len(),
				"attached collection"
			);
		}
		Ok(())
	}
}

#[async_trait]
impl NestedSerializerSave for NestedWriter<'_> {
	async fn create_nested(
		&self,
		context: &mut NestedSaveContext,
		payload: Payload,
	) -> Result<Instance, SerializerError> {
		self.create(context, payload).await
	}

	async fn update_nested(
		&self,
		context: &mut NestedSaveContext,
		instance: Instance,
		payload: Payload,
	) -> Result<Instance, SerializerError> {
		self.update(context, instance, payload).await
	}
}
