//! rstest fixtures for serializer tests
//!
//! ```
//! use reinhardt_test::fixtures::{models, schemas};
//!
//! let schemas = schemas(models());
//! assert_eq!(schemas.client.name(), "ClientSerializer");
//! ```

pub mod model_fixtures;
pub mod serializers;

pub use model_fixtures::{
	TestModels, address_meta, client_meta, models, store, tag_meta, user_meta,
};
pub use serializers::{
	TestSchemas, address_schema, client_schema, schemas, tag_schema, user_schema,
};
