//! # Reinhardt Test
//!
//! Testing utilities for the Reinhardt serializer crates.
//!
//! ## Features
//!
//! - **[`fixtures`]**: rstest fixtures for a small model graph (client, user,
//!   address, tag), its serializer schemas and a registered in-memory store
//! - **[`mock::FaultyStore`]**: store wrapper that records calls and injects
//!   failures per operation and model
//! - **[`logging`]**: test log output and in-memory log capture
//!
//! ## Quick Start
//!
//! ```rust
//! use reinhardt_serializers::ModelSerializer;
//! use reinhardt_test::fixtures::{TestSchemas, models, schemas, store};
//! use serde_json::json;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let models = models();
//! let store = store(models.clone());
//! let schemas: TestSchemas = schemas(models);
//!
//! let mut serializer = ModelSerializer::new(schemas.address)
//!     .with_data(json!({"state": "CA", "zip_code": "94105"}));
//! assert!(serializer.is_valid());
//! serializer.save(&store).await.unwrap();
//!
//! assert_eq!(store.count("Address"), 1);
//! # });
//! ```

pub mod fixtures;
pub mod logging;
pub mod mock;

pub use fixtures::{TestModels, TestSchemas};
pub use logging::{CapturedEvent, LogCapture, capture_logs, init_test_logging};
pub use mock::{CallRecord, FaultyStore, StoreOperation};
