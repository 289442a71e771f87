//! Operation-dependent required fields and bulk field options

use reinhardt_db::orm::InMemoryStore;
use reinhardt_serializers::{
	FieldDef, FieldOptions, MetaOptions, ModelSerializer, Operation, SchemaBuilder, SchemaError,
	SerializerSchema,
};
use reinhardt_test::fixtures::{TestModels, TestSchemas, models, schemas, store};
use rstest::*;
use serde_json::json;
use std::sync::Arc;

#[fixture]
fn account_schema(models: TestModels) -> Arc<SerializerSchema> {
	SchemaBuilder::new("AccountSerializer")
		.meta(
			MetaOptions::new()
				.with_model(models.user)
				.with_fields(["id", "username", "password", "address"])
				.with_read_only_fields(["id"])
				.with_required_fields_on_create(["username", "password"])
				.with_required_fields_on_update_any(["username", "password"]),
		)
		.build()
		.unwrap()
}

#[rstest]
fn test_create_requires_every_listed_field(account_schema: Arc<SerializerSchema>) {
	let mut serializer = ModelSerializer::new(account_schema).with_data(json!({"username": "alice"}));

	assert!(!serializer.is_valid());
	let detail = serializer.errors().unwrap().detail();
	assert_eq!(detail.messages("password").unwrap(), ["This field is required."]);
	assert!(!detail.contains_key("username"));
}

#[rstest]
fn test_update_requires_any_listed_field(account_schema: Arc<SerializerSchema>) {
	let instance = reinhardt_db::orm::Instance::new("User", 1, serde_json::Map::new());
	let mut serializer = ModelSerializer::for_instance(account_schema.clone(), instance.clone())
		.with_data(json!({"address": null}));

	assert!(!serializer.is_valid());
	assert_eq!(
		serializer.errors().unwrap().detail().messages("__all__").unwrap(),
		[r#"At least one of "username, password" is required."#]
	);

	let mut serializer =
		ModelSerializer::for_instance(account_schema, instance).with_data(json!({"password": "x"}));
	assert!(serializer.is_valid());
}

#[rstest]
fn test_discriminator_selects_update_tables(account_schema: Arc<SerializerSchema>) {
	let mut serializer =
		ModelSerializer::new(account_schema).with_data(json!({"_pk": 3, "username": "alice"}));

	assert!(serializer.is_valid(), "{:?}", serializer.errors());
}

#[rstest]
#[tokio::test]
async fn test_nested_tables_are_checked_on_save(
	models: TestModels,
	schemas: TestSchemas,
	store: InMemoryStore,
) {
	// Arrange
	let address = SchemaBuilder::new("ShortAddressSerializer")
		.meta(
			MetaOptions::new()
				.with_model(models.address)
				.with_fields(["id", "state", "zip_code"])
				.with_read_only_fields(["id"])
				.with_required_fields_on_create(["zip_code"]),
		)
		.build()
		.unwrap();
	let user = SchemaBuilder::new("UserWithAddressSerializer")
		.extend(&schemas.user)
		.field(FieldDef::nested("address", address).required(false))
		.meta(
			MetaOptions::new()
				.with_model(models.user)
				.with_fields(["id", "username", "password", "address"]),
		)
		.build()
		.unwrap();
	let mut serializer = ModelSerializer::new(user)
		.with_data(json!({"username": "alice", "password": "x", "address": {"state": "CA"}}));
	assert!(serializer.is_valid(), "{:?}", serializer.errors());

	// Act
	let error = serializer.save(&store).await.unwrap_err();

	// Assert
	assert_eq!(
		error.validation().unwrap().detail().to_string(),
		r#"{"address": {"zip_code": ["This field is required."]}}"#
	);
	assert_eq!(store.count("Address"), 0);
	assert_eq!(store.count("User"), 0);
}

#[rstest]
fn test_common_field_params_apply_to_each_listed_field(models: TestModels) {
	let schema = SchemaBuilder::new("StrictUserSerializer")
		.meta(
			MetaOptions::new()
				.with_model(models.user)
				.with_fields(["id", "username", "password"])
				.with_common_field_params(
					["username", "password"],
					FieldOptions::new().with_required(true).with_write_only(true),
				),
		)
		.build()
		.unwrap();

	for name in ["username", "password"] {
		let field = schema.field(name).unwrap();
		assert!(field.is_required(), "{name} should be required");
		assert!(field.is_write_only(), "{name} should be write-only");
	}
	let mut serializer = ModelSerializer::new(schema).with_data(json!({"username": "alice"}));
	assert!(!serializer.is_valid());
	assert!(serializer.errors().unwrap().has_keys(&["password"]));
}

#[rstest]
#[case::create(
	MetaOptions::new().with_required_fields_on_create(["username"]).with_required_fields_on_create_any(["username", "password"]),
	Operation::Create
)]
#[case::update(
	MetaOptions::new().with_required_fields_on_update(["password"]).with_required_fields_on_update_any(["password"]),
	Operation::Update
)]
fn test_conflicting_tables_are_rejected(
	models: TestModels,
	#[case] meta: MetaOptions,
	#[case] operation: Operation,
) {
	let error = SchemaBuilder::new("UserSerializer")
		.meta(meta.with_model(models.user).with_all_fields())
		.build()
		.unwrap_err();

	assert!(matches!(
		error,
		SchemaError::ConflictingRequired { operation: found, .. } if found == operation
	));
}

#[rstest]
fn test_schema_requires_meta_and_fields(models: TestModels) {
	assert_eq!(
		SchemaBuilder::new("BareSerializer").build().unwrap_err(),
		SchemaError::MissingMeta {
			serializer: "BareSerializer".to_string()
		}
	);
	assert_eq!(
		SchemaBuilder::new("BareSerializer")
			.meta(MetaOptions::new().with_model(models.user))
			.build()
			.unwrap_err()
			.to_string(),
		r#"No "fields" set in the `MetaOptions` of BareSerializer."#
	);
}

#[rstest]
fn test_all_fields_include_discriminator(models: TestModels) {
	let schema = SchemaBuilder::new("TagSerializer")
		.meta(MetaOptions::new().with_model(models.tag).with_all_fields())
		.build()
		.unwrap();

	let names: Vec<&str> = schema.field_names().collect();
	assert_eq!(names, ["id", "name", "_pk"]);
	let discriminator = schema.field("_pk").unwrap();
	assert!(discriminator.is_write_only());
	assert!(!discriminator.is_required());
}
