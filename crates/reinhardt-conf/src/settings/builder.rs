//! Settings builder merging configuration sources by priority

use super::sources::{ConfigSource, SourceError};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Errors raised while assembling settings
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
	#[error("Failed to load {description}: {source}")]
	Source {
		description: String,
		#[source]
		source: SourceError,
	},

	#[error("Setting not found: {0}")]
	NotFound(String),

	#[error("Invalid value for setting '{key}': {source}")]
	InvalidValue {
		key: String,
		#[source]
		source: serde_json::Error,
	},
}

/// Collects configuration sources and merges them
///
/// Higher priority sources override lower ones; sources of equal priority
/// override in the order they were added.
///
/// # Examples
///
/// ```
/// use reinhardt_conf::settings::{DefaultSource, SettingsBuilder};
/// use serde_json::json;
///
/// let merged = SettingsBuilder::new()
///     .add_source(DefaultSource::new().with_value("max_nesting_depth", json!(10)))
///     .add_source(DefaultSource::new().with_value("max_nesting_depth", json!(3)))
///     .build()
///     .unwrap();
///
/// assert_eq!(merged.get::<usize>("max_nesting_depth").unwrap(), 3);
/// ```
#[derive(Default)]
pub struct SettingsBuilder {
	sources: Vec<Box<dyn ConfigSource>>,
}

impl SettingsBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add_source(mut self, source: impl ConfigSource + 'static) -> Self {
		self.sources.push(Box::new(source));
		self
	}

	/// Load every source and merge the results
	pub fn build(mut self) -> Result<MergedSettings, SettingsError> {
		self.sources.sort_by_key(|source| source.priority());

		let mut values = IndexMap::new();
		for source in &self.sources {
			let loaded = source.load().map_err(|source_error| SettingsError::Source {
				description: source.description(),
				source: source_error,
			})?;
			tracing::debug!(
				source = %source.description(),
				keys = loaded.len(),
				"loaded configuration source"
			);
			values.extend(loaded);
		}

		Ok(MergedSettings { values })
	}
}

/// Result of merging every configuration source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedSettings {
	values: IndexMap<String, Value>,
}

impl MergedSettings {
	/// Deserialize a single key
	pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, SettingsError> {
		let value = self
			.values
			.get(key)
			.ok_or_else(|| SettingsError::NotFound(key.to_string()))?;
		serde_json::from_value(value.clone()).map_err(|source| SettingsError::InvalidValue {
			key: key.to_string(),
			source,
		})
	}

	pub fn contains_key(&self, key: &str) -> bool {
		self.values.contains_key(key)
	}

	/// Deserialize every merged key into a typed settings struct
	pub fn into_typed<T: DeserializeOwned>(self) -> Result<T, SettingsError> {
		let object = Value::Object(self.values.into_iter().collect());
		serde_json::from_value(object).map_err(|source| SettingsError::InvalidValue {
			key: "<root>".to_string(),
			source,
		})
	}
}
