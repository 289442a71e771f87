//! End-to-end nested writes through the facade crate

use reinhardt_test::fixtures::{TestSchemas, schemas, store};
use reinhardt_test::init_test_logging;
use reinhardt_writable_nested::prelude::*;
use rstest::*;
use serial_test::serial;
use serde_json::{Value, json};
use std::fs;
use tempfile::TempDir;

#[rstest]
#[tokio::test]
async fn test_create_update_and_represent(schemas: TestSchemas, store: InMemoryStore) {
	// Arrange
	init_test_logging();
	let mut create = ModelSerializer::new(schemas.user.clone()).with_data(json!({
		"username": "alice",
		"password": "secret",
		"address": {"state": "CA", "zip_code": "94105", "tags": [{"name": "home"}]},
	}));
	assert!(create.is_valid(), "{:?}", create.errors());
	let user = create.save(&store).await.unwrap();
	let address_pk = user.related_pk("address").unwrap();

	// Act
	let mut update = ModelSerializer::for_instance(schemas.user.clone(), user.clone()).with_data(json!({
		"address": {
			"_pk": address_pk,
			"state": "OR",
			"zip_code": "97201",
			"tags": [{"name": "work"}],
		},
	}));
	assert!(update.is_valid(), "{:?}", update.errors());
	let updated = update.save(&store).await.unwrap();

	// Assert
	let output = update.to_representation(&updated, &store).await.unwrap();
	assert_eq!(
		Value::Object(output),
		json!({
			"id": user.pk(),
			"username": "alice",
			"password": "secret",
			"address": address_pk,
		})
	);
	let address = ModelSerializer::new(schemas.address.clone());
	let stored = store.fetch("Address", address_pk).unwrap();
	let output = address.to_representation(&stored, &store).await.unwrap();
	assert_eq!(output["state"], json!("OR"));
	assert_eq!(output["tags"], json!([2]));
	assert_eq!(store.count("Tag"), 2);
}

#[rstest]
#[tokio::test]
#[serial(env)]
async fn test_settings_file_limits_depth(schemas: TestSchemas, store: InMemoryStore) {
	// Arrange
	let temp_dir = TempDir::new().unwrap();
	let path = temp_dir.path().join("serializers.toml");
	fs::write(&path, "max_nesting_depth = 1\n").unwrap();
	let settings = NestedWriteSettings::load(Some(&path)).unwrap();
	assert_eq!(settings.max_nesting_depth, 1);

	let mut serializer = ModelSerializer::new(schemas.client)
		.with_settings(settings)
		.with_data(json!({
			"user": {
				"username": "bob",
				"password": "secret",
				"address": {"state": "CA", "zip_code": "94105"},
			},
		}));
	assert!(serializer.is_valid());

	// Act
	let error = serializer.save(&store).await.unwrap_err();

	// Assert
	assert!(matches!(error, SerializerError::DepthExceeded { max_depth: 1 }));
	assert_eq!(store.count("User"), 0);
}

#[rstest]
fn test_errors_from_every_field_are_aggregated(schemas: TestSchemas) {
	let mut serializer = ModelSerializer::new(schemas.address).with_data(json!({
		"state": "California",
		"tags": [{"name": "ok"}, {"name": ""}],
	}));

	assert!(!serializer.is_valid());
	let detail: ErrorTree = serializer.errors().unwrap().detail();
	assert_eq!(
		detail.messages("state").unwrap(),
		["Ensure this field has no more than 2 characters."]
	);
	assert_eq!(
		detail.messages("zip_code").unwrap(),
		["This field is required."]
	);
	assert_eq!(
		detail
			.lookup(&["tags", "1", "name"])
			.and_then(|detail| detail.as_messages())
			.unwrap(),
		["This field may not be blank."]
	);
	assert!(!detail.subtree("tags").unwrap().contains_key("0"));
}
