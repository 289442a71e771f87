//! # Reinhardt Configuration
//!
//! Layered settings for the serializer layer.
//!
//! Settings are assembled from configuration sources merged in priority order
//! (environment variables > configuration files > defaults) and deserialized
//! into typed structs such as [`NestedWriteSettings`].
//!
//! ## Quick Start
//!
//! ```rust
//! use reinhardt_conf::settings::NestedWriteSettings;
//!
//! let settings = NestedWriteSettings::default();
//! assert_eq!(settings.max_nesting_depth, 10);
//! assert!(settings.restore_updated_on_failure);
//! ```
//!
//! ## Module Organization
//!
//! - [`settings`]: sources, the settings builder and typed settings

pub mod settings;

pub use settings::{NestedWriteSettings, SettingsBuilder, SettingsError};
