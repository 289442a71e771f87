//! Error types for serializer schemas and nested writes

use crate::compensation::CompensationFailure;
use crate::meta::Operation;
use reinhardt_core::exception::ValidationError;
use reinhardt_db::orm::StoreError;

/// Raised while building a [`SerializerSchema`](crate::schema::SerializerSchema)
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
	#[error("No `MetaOptions` set on {serializer}.")]
	MissingMeta { serializer: String },

	#[error("No \"fields\" set in the `MetaOptions` of {serializer}.")]
	MissingFields { serializer: String },

	#[error("No model set in the `MetaOptions` of {serializer}.")]
	MissingModel { serializer: String },

	#[error("Field name `{field}` is not valid for model `{model}` in {serializer}.")]
	UnknownField {
		field: String,
		model: String,
		serializer: String,
	},

	#[error(
		"\"{fields}\" set inside both required_fields_on_{operation} and required_fields_on_{operation}_any"
	)]
	ConflictingRequired { operation: Operation, fields: String },
}

/// Raised by serializer saves
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SerializerError {
	/// Input rejected; carries the aggregated error tree
	#[error(transparent)]
	Validation(#[from] ValidationError),

	/// The store refused to create a row from validated data
	#[error(
		"Got a `{source}` error when calling `{model}.{manager}.create()`. This may be because you have a writable field on the serializer class that is not a valid argument to `{model}.{manager}.create()`. You may need to make the field read-only, or override the {serializer}.create() method to handle this correctly."
	)]
	Persistence {
		model: String,
		manager: String,
		serializer: String,
		#[source]
		source: StoreError,
	},

	#[error(transparent)]
	Store(#[from] StoreError),

	#[error("Nested serializers exceed the maximum depth of {max_depth}")]
	DepthExceeded { max_depth: usize },

	/// Rolling back after `original` failed left some work in place
	#[error("{original} (compensation left {} change(s) in place)", .failures.len())]
	Compensation {
		original: Box<SerializerError>,
		failures: Vec<CompensationFailure>,
	},

	#[error("`save()` called before `is_valid()` succeeded")]
	NotValidated,
}

impl SerializerError {
	/// Validation detail of this error, looking through compensation wrappers
	pub fn validation(&self) -> Option<&ValidationError> {
		match self {
			Self::Validation(error) => Some(error),
			Self::Compensation { original, .. } => original.validation(),
			_ => None,
		}
	}

	/// The failure that triggered any compensation
	pub fn root_cause(&self) -> &SerializerError {
		match self {
			Self::Compensation { original, .. } => original.root_cause(),
			other => other,
		}
	}
}

pub type SerializerResult<T> = Result<T, SerializerError>;

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_persistence_message_names_the_caller() {
		let error = SerializerError::Persistence {
			model: "Address".to_string(),
			manager: "objects".to_string(),
			serializer: "AddressSerializer".to_string(),
			source: StoreError::UnexpectedField {
				model: "Address".to_string(),
				field: "owner".to_string(),
			},
		};

		let message = error.to_string();
		assert!(message.contains("`Address.objects.create()`"));
		assert!(message.contains("override the AddressSerializer.create() method"));
		assert!(message.contains("unexpected keyword argument 'owner'"));
	}

	#[rstest]
	fn test_validation_is_visible_through_compensation() {
		let error = SerializerError::Compensation {
			original: Box::new(SerializerError::Validation(ValidationError::field(
				"zip_code",
				"This field is required.",
			))),
			failures: Vec::new(),
		};

		assert!(error.validation().unwrap().has_keys(&["zip_code"]));
		assert!(matches!(error.root_cause(), SerializerError::Validation(_)));
	}
}
