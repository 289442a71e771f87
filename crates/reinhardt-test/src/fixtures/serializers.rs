//! Serializer schemas for the test models
//!
//! Each schema nests the next one down the relation chain, so a client payload
//! can carry a user, its address and the address tags in one write.

use super::model_fixtures::{TestModels, models};
use reinhardt_serializers::{FieldDef, FieldOptions, MetaOptions, SchemaBuilder, SerializerSchema};
use rstest::*;
use std::sync::Arc;

/// Test serializer schemas, outermost last
#[derive(Debug, Clone)]
pub struct TestSchemas {
	pub tag: Arc<SerializerSchema>,
	pub address: Arc<SerializerSchema>,
	pub user: Arc<SerializerSchema>,
	pub client: Arc<SerializerSchema>,
}

pub fn tag_schema(models: &TestModels) -> Arc<SerializerSchema> {
	SchemaBuilder::new("TagSerializer")
		.meta(
			MetaOptions::new()
				.with_model(Arc::clone(&models.tag))
				.with_fields(["id", "name"])
				.with_read_only_fields(["id"]),
		)
		.build()
		.expect("TagSerializer schema")
}

/// `state` and `zip_code` are required, as the model declares them
pub fn address_schema(models: &TestModels, tag: Arc<SerializerSchema>) -> Arc<SerializerSchema> {
	SchemaBuilder::new("AddressSerializer")
		.field(FieldDef::nested_many("tags", tag).required(false))
		.meta(
			MetaOptions::new()
				.with_model(Arc::clone(&models.address))
				.with_fields(["id", "state", "zip_code", "tags"])
				.with_read_only_fields(["id"])
				.with_non_required_fields(Vec::<String>::new()),
		)
		.build()
		.expect("AddressSerializer schema")
}

pub fn user_schema(models: &TestModels, address: Arc<SerializerSchema>) -> Arc<SerializerSchema> {
	let optional = FieldOptions::new().with_required(false);
	SchemaBuilder::new("UserSerializer")
		.field(FieldDef::nested("address", address).required(false).allow_null())
		.meta(
			MetaOptions::new()
				.with_model(Arc::clone(&models.user))
				.with_fields(["id", "_pk", "username", "password", "address"])
				.with_read_only_fields(["id"])
				.with_extra_kwargs("username", optional.clone())
				.with_extra_kwargs("password", optional),
		)
		.build()
		.expect("UserSerializer schema")
}

pub fn client_schema(models: &TestModels, user: Arc<SerializerSchema>) -> Arc<SerializerSchema> {
	SchemaBuilder::new("ClientSerializer")
		.field(FieldDef::nested("user", user))
		.meta(
			MetaOptions::new()
				.with_model(Arc::clone(&models.client))
				.with_fields(["id", "user"])
				.with_read_only_fields(["id"]),
		)
		.build()
		.expect("ClientSerializer schema")
}

#[fixture]
pub fn schemas(models: TestModels) -> TestSchemas {
	let tag = tag_schema(&models);
	let address = address_schema(&models, Arc::clone(&tag));
	let user = user_schema(&models, Arc::clone(&address));
	let client = client_schema(&models, Arc::clone(&user));
	TestSchemas {
		tag,
		address,
		user,
		client,
	}
}
