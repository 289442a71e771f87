//! Store wrapper that records calls and injects failures

use async_trait::async_trait;
use parking_lot::Mutex;
use reinhardt_db::orm::{Instance, ModelMeta, ModelStore, Pk, StoreError};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Store operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
	Create,
	Get,
	Save,
	Delete,
	SetCollection,
	Collection,
}

/// Call record for one store operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
	pub operation: StoreOperation,
	pub model: String,
}

/// [`ModelStore`] that forwards to `inner` unless told to fail
///
/// Failures are keyed by operation and model name. Every call is recorded,
/// failed ones included.
///
/// # Examples
///
/// ```
/// use reinhardt_db::orm::{InMemoryStore, ModelStore};
/// use reinhardt_test::fixtures::tag_meta;
/// use reinhardt_test::mock::{FaultyStore, StoreOperation};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let store = FaultyStore::new(InMemoryStore::new()).failing(StoreOperation::Create, "Tag");
///
/// let result = store.create(&tag_meta(), serde_json::Map::new()).await;
/// assert!(result.is_err());
/// assert_eq!(store.call_count(StoreOperation::Create), 1);
/// # });
/// ```
#[derive(Debug)]
pub struct FaultyStore<S> {
	inner: S,
	failures: Mutex<HashSet<(StoreOperation, String)>>,
	calls: Mutex<Vec<CallRecord>>,
}

impl<S: ModelStore> FaultyStore<S> {
	pub fn new(inner: S) -> Self {
		Self {
			inner,
			failures: Mutex::new(HashSet::new()),
			calls: Mutex::new(Vec::new()),
		}
	}

	/// Make `operation` on `model` fail from now on
	pub fn failing(self, operation: StoreOperation, model: impl Into<String>) -> Self {
		self.fail(operation, model);
		self
	}

	pub fn fail(&self, operation: StoreOperation, model: impl Into<String>) {
		self.failures.lock().insert((operation, model.into()));
	}

	/// Stop injecting failures
	pub fn heal(&self) {
		self.failures.lock().clear();
	}

	pub fn inner(&self) -> &S {
		&self.inner
	}

	pub fn calls(&self) -> Vec<CallRecord> {
		self.calls.lock().clone()
	}

	pub fn call_count(&self, operation: StoreOperation) -> usize {
		self.calls
			.lock()
			.iter()
			.filter(|call| call.operation == operation)
			.count()
	}

	fn enter(&self, operation: StoreOperation, model: &str) -> Result<(), StoreError> {
		self.calls.lock().push(CallRecord {
			operation,
			model: model.to_string(),
		});
		if self
			.failures
			.lock()
			.contains(&(operation, model.to_string()))
		{
			return Err(StoreError::Backend(format!(
				"injected {:?} failure for {}",
				operation, model
			)));
		}
		Ok(())
	}
}

#[async_trait]
impl<S: ModelStore> ModelStore for FaultyStore<S> {
	fn manager_name(&self) -> &str {
		self.inner.manager_name()
	}

	async fn create(
		&self,
		model: &ModelMeta,
		fields: Map<String, Value>,
	) -> Result<Instance, StoreError> {
		self.enter(StoreOperation::Create, model.name())?;
		self.inner.create(model, fields).await
	}

	async fn get(&self, model: &ModelMeta, pk: Pk) -> Result<Instance, StoreError> {
		self.enter(StoreOperation::Get, model.name())?;
		self.inner.get(model, pk).await
	}

	async fn save(&self, instance: &Instance) -> Result<(), StoreError> {
		self.enter(StoreOperation::Save, instance.model())?;
		self.inner.save(instance).await
	}

	async fn delete(&self, instance: &Instance) -> Result<(), StoreError> {
		self.enter(StoreOperation::Delete, instance.model())?;
		self.inner.delete(instance).await
	}

	async fn set_collection(
		&self,
		instance: &Instance,
		field: &str,
		pks: &[Pk],
	) -> Result<(), StoreError> {
		self.enter(StoreOperation::SetCollection, instance.model())?;
		self.inner.set_collection(instance, field, pks).await
	}

	async fn collection(&self, instance: &Instance, field: &str) -> Result<Vec<Pk>, StoreError> {
		self.enter(StoreOperation::Collection, instance.model())?;
		self.inner.collection(instance, field).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::fixtures::{TestModels, models, store};
	use reinhardt_db::orm::InMemoryStore;
	use rstest::*;

	#[rstest]
	#[tokio::test]
	async fn test_heal_restores_forwarding(models: TestModels, store: InMemoryStore) {
		let store = FaultyStore::new(store).failing(StoreOperation::Create, "Tag");
		let mut fields = Map::new();
		fields.insert("name".to_string(), Value::from("rust"));

		assert!(matches!(
			store.create(&models.tag, fields.clone()).await,
			Err(StoreError::Backend(_))
		));
		store.heal();
		let tag = store.create(&models.tag, fields).await.unwrap();

		assert_eq!(store.inner().count("Tag"), 1);
		assert_eq!(tag.pk(), 1);
		assert_eq!(store.call_count(StoreOperation::Create), 2);
	}

	#[rstest]
	#[tokio::test]
	async fn test_failures_are_per_model(models: TestModels, store: InMemoryStore) {
		let store = FaultyStore::new(store).failing(StoreOperation::Create, "User");
		let mut fields = Map::new();
		fields.insert("name".to_string(), Value::from("rust"));

		assert!(store.create(&models.tag, fields).await.is_ok());
		assert_eq!(
			store.calls(),
			vec![CallRecord {
				operation: StoreOperation::Create,
				model: "Tag".to_string(),
			}]
		);
	}
}
