//! Persistence seam used by the serializer layer

use super::{Instance, ModelMeta, Pk};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Errors raised by a [`ModelStore`]
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
	/// Lookup by primary key found nothing
	#[error("{model} matching query does not exist (pk={pk})")]
	DoesNotExist { model: String, pk: Pk },

	/// A keyword that is not a concrete field of the model
	#[error("{model}() got an unexpected keyword argument '{field}'")]
	UnexpectedField { model: String, field: String },

	/// A required column was missing or null
	#[error("NOT NULL constraint failed: {model}.{field}")]
	MissingField { model: String, field: String },

	/// A value of the wrong shape for its column
	#[error("Invalid value for {model}.{field}: {message}")]
	InvalidValue {
		model: String,
		field: String,
		message: String,
	},

	#[error("Unknown model: {0}")]
	UnknownModel(String),

	/// Backend-specific failure
	#[error("Backend error: {0}")]
	Backend(String),
}

/// Persistence primitives for model rows
///
/// Implementations must be safe to share between tasks. Serializers call the
/// store strictly sequentially within one save operation.
#[async_trait]
pub trait ModelStore: Send + Sync {
	/// Name of the default manager, used in error messages
	fn manager_name(&self) -> &str {
		"objects"
	}

	/// Insert a row from concrete field values and return it with its primary key
	async fn create(&self, model: &ModelMeta, fields: Map<String, Value>)
	-> Result<Instance, StoreError>;

	/// Fetch a row; [`StoreError::DoesNotExist`] when absent
	async fn get(&self, model: &ModelMeta, pk: Pk) -> Result<Instance, StoreError>;

	/// Persist every concrete field of an existing row
	async fn save(&self, instance: &Instance) -> Result<(), StoreError>;

	async fn delete(&self, instance: &Instance) -> Result<(), StoreError>;

	/// Replace the members of a many-to-many field
	async fn set_collection(
		&self,
		instance: &Instance,
		field: &str,
		pks: &[Pk],
	) -> Result<(), StoreError>;

	/// Members of a many-to-many field, in assignment order
	async fn collection(&self, instance: &Instance, field: &str) -> Result<Vec<Pk>, StoreError>;
}
