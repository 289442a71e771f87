//! Settings for nested serializer writes

use super::builder::{SettingsBuilder, SettingsError};
use super::sources::{DefaultSource, EnvSource, TomlFileSource};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "REINHARDT_SERIALIZERS_";

/// Behavior knobs for nested create/update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NestedWriteSettings {
	/// Deepest allowed chain of nested serializers below the top-level one
	pub max_nesting_depth: usize,
	/// Restore pre-update snapshots of nested objects when a later step fails
	pub restore_updated_on_failure: bool,
	/// Validate nested updates (payloads carrying `_pk`) as partial updates
	pub partial_nested_updates: bool,
}

impl Default for NestedWriteSettings {
	fn default() -> Self {
		Self {
			max_nesting_depth: 10,
			restore_updated_on_failure: true,
			partial_nested_updates: false,
		}
	}
}

impl NestedWriteSettings {
	/// Load from defaults, an optional TOML file and `REINHARDT_SERIALIZERS_*` variables
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_conf::settings::NestedWriteSettings;
	///
	/// let settings = NestedWriteSettings::load(None).unwrap();
	/// assert!(settings.max_nesting_depth > 0);
	/// ```
	pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
		let defaults = DefaultSource::from_serializable(&Self::default()).map_err(|source| {
			SettingsError::Source {
				description: "Default values".to_string(),
				source,
			}
		})?;

		let mut builder = SettingsBuilder::new().add_source(defaults);
		if let Some(path) = path {
			builder = builder.add_source(TomlFileSource::new(path));
		}
		builder
			.add_source(EnvSource::new().with_prefix(ENV_PREFIX))
			.build()?
			.into_typed()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serial_test::serial;
	use std::env;
	use std::fs;
	use tempfile::TempDir;

	#[rstest]
	#[serial(env)]
	fn test_load_without_overrides_matches_default() {
		assert_eq!(
			NestedWriteSettings::load(None).unwrap(),
			NestedWriteSettings::default()
		);
	}

	#[rstest]
	#[serial(env)]
	fn test_env_overrides_file() {
		let temp_dir = TempDir::new().unwrap();
		let path = temp_dir.path().join("serializers.toml");
		fs::write(
			&path,
			"max_nesting_depth = 4\nrestore_updated_on_failure = false\n",
		)
		.unwrap();
		// SAFETY: Environment mutation is serialized through #[serial(env)].
		unsafe {
			env::set_var("REINHARDT_SERIALIZERS_MAX_NESTING_DEPTH", "2");
		}

		let settings = NestedWriteSettings::load(Some(&path));

		// SAFETY: Environment mutation is serialized through #[serial(env)].
		unsafe {
			env::remove_var("REINHARDT_SERIALIZERS_MAX_NESTING_DEPTH");
		}
		let settings = settings.unwrap();
		assert_eq!(settings.max_nesting_depth, 2);
		assert!(!settings.restore_updated_on_failure);
		assert!(!settings.partial_nested_updates);
	}

	#[rstest]
	#[serial(env)]
	fn test_invalid_override_is_reported() {
		// SAFETY: Environment mutation is serialized through #[serial(env)].
		unsafe {
			env::set_var("REINHARDT_SERIALIZERS_MAX_NESTING_DEPTH", "deep");
		}

		let result = NestedWriteSettings::load(None);

		// SAFETY: Environment mutation is serialized through #[serial(env)].
		unsafe {
			env::remove_var("REINHARDT_SERIALIZERS_MAX_NESTING_DEPTH");
		}
		assert!(matches!(result, Err(SettingsError::InvalidValue { .. })));
	}
}
