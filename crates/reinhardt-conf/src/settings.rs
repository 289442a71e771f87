//! Settings management

pub mod builder;
pub mod nested;
pub mod sources;

pub use builder::{MergedSettings, SettingsBuilder, SettingsError};
pub use nested::NestedWriteSettings;
pub use sources::{ConfigSource, DefaultSource, EnvSource, SourceError, TomlFileSource};
