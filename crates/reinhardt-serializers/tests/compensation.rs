//! Undoing partial nested writes after a failure

use reinhardt_conf::settings::NestedWriteSettings;
use reinhardt_db::orm::{FieldMeta, InMemoryStore, Instance, ModelMeta, ModelStore, StoreError};
use reinhardt_serializers::{
	CompensationAction, FieldDef, MetaOptions, ModelSerializer, SchemaBuilder, SerializerError,
};
use reinhardt_test::fixtures::{TestSchemas, schemas, store};
use reinhardt_test::logging::capture_logs;
use reinhardt_test::mock::{FaultyStore, StoreOperation};
use rstest::*;
use serde_json::json;
use std::sync::Arc;
use tracing::Level;

fn client_payload() -> serde_json::Value {
	json!({
		"user": {
			"username": "alice",
			"password": "secret",
			"address": {
				"state": "CA",
				"zip_code": "94105",
				"tags": [{"name": "a"}, {"name": "b"}],
			},
		},
	})
}

async fn create_user_with_address(schemas: &TestSchemas, store: &dyn ModelStore) -> Instance {
	let mut serializer = ModelSerializer::new(schemas.user.clone()).with_data(json!({
		"username": "alice",
		"password": "secret",
		"address": {"state": "CA", "zip_code": "94105"},
	}));
	assert!(serializer.is_valid());
	serializer.save(store).await.unwrap()
}

#[rstest]
#[tokio::test]
async fn test_failed_parent_create_removes_nested_rows(schemas: TestSchemas, store: InMemoryStore) {
	// Arrange
	let store = FaultyStore::new(store).failing(StoreOperation::Create, "Client");
	let mut serializer = ModelSerializer::new(schemas.client).with_data(client_payload());
	assert!(serializer.is_valid());

	// Act
	let error = serializer.save(&store).await.unwrap_err();

	// Assert
	match &error {
		SerializerError::Persistence {
			model, serializer, ..
		} => {
			assert_eq!(model, "Client");
			assert_eq!(serializer, "ClientSerializer");
		}
		other => panic!("unexpected error: {other:?}"),
	}
	assert!(error.to_string().contains("`Client.objects.create()`"));
	for model in ["Client", "User", "Address", "Tag"] {
		assert_eq!(store.inner().count(model), 0, "{model} rows left behind");
	}
	assert_eq!(store.call_count(StoreOperation::Delete), 4);
}

#[rstest]
#[tokio::test]
async fn test_failed_sibling_field_removes_earlier_sibling(schemas: TestSchemas, store: InMemoryStore) {
	// Arrange
	let order = ModelMeta::new("Order")
		.field(FieldMeta::auto_pk("id"))
		.field(FieldMeta::foreign_key("address", "Address"))
		.field(FieldMeta::foreign_key("tag", "Tag"));
	store.register(&order);
	let schema = SchemaBuilder::new("OrderSerializer")
		.field(FieldDef::nested("address", schemas.address.clone()))
		.field(FieldDef::nested("tag", schemas.tag.clone()))
		.meta(
			MetaOptions::new()
				.with_model(Arc::new(order))
				.with_fields(["id", "address", "tag"])
				.with_read_only_fields(["id"]),
		)
		.build()
		.unwrap();
	let store = FaultyStore::new(store).failing(StoreOperation::Create, "Tag");
	let mut serializer = ModelSerializer::new(schema).with_data(json!({
		"address": {"state": "CA", "zip_code": "94105"},
		"tag": {"name": "gift"},
	}));
	assert!(serializer.is_valid(), "{:?}", serializer.errors());

	// Act
	let error = serializer.save(&store).await.unwrap_err();

	// Assert
	assert!(matches!(error, SerializerError::Persistence { .. }), "{error:?}");
	for model in ["Order", "Address", "Tag"] {
		assert_eq!(store.inner().count(model), 0, "{model} rows left behind");
	}
	let deleted: Vec<String> = store
		.calls()
		.into_iter()
		.filter(|call| call.operation == StoreOperation::Delete)
		.map(|call| call.model)
		.collect();
	assert_eq!(deleted, ["Address"]);
}

#[rstest]
#[tokio::test]
async fn test_compensation_runs_newest_first(schemas: TestSchemas, store: InMemoryStore) {
	let store = FaultyStore::new(store).failing(StoreOperation::Create, "Client");
	let mut serializer = ModelSerializer::new(schemas.client).with_data(client_payload());
	assert!(serializer.is_valid());

	serializer.save(&store).await.unwrap_err();

	let deleted: Vec<String> = store
		.calls()
		.into_iter()
		.filter(|call| call.operation == StoreOperation::Delete)
		.map(|call| call.model)
		.collect();
	assert_eq!(deleted, ["User", "Address", "Tag", "Tag"]);
}

#[rstest]
#[tokio::test]
async fn test_failed_save_restores_updated_rows(schemas: TestSchemas, store: InMemoryStore) {
	// Arrange
	let user = create_user_with_address(&schemas, &store).await;
	let address_pk = user.related_pk("address").unwrap();
	let store = FaultyStore::new(store).failing(StoreOperation::Save, "User");
	let mut serializer = ModelSerializer::for_instance(schemas.user, user).with_data(json!({
		"username": "changed",
		"address": {"_pk": address_pk, "state": "NY", "zip_code": "10001"},
	}));
	assert!(serializer.is_valid());

	// Act
	let error = serializer.save(&store).await.unwrap_err();

	// Assert
	assert!(matches!(
		error,
		SerializerError::Store(StoreError::Backend(_))
	));
	let address = store.inner().fetch("Address", address_pk).unwrap();
	assert_eq!(address.get("state"), Some(&json!("CA")));
	assert_eq!(address.get("zip_code"), Some(&json!("94105")));
}

#[rstest]
#[tokio::test]
async fn test_restore_can_be_disabled(schemas: TestSchemas, store: InMemoryStore) {
	// Arrange
	let user = create_user_with_address(&schemas, &store).await;
	let address_pk = user.related_pk("address").unwrap();
	let store = FaultyStore::new(store).failing(StoreOperation::Save, "User");
	let settings = NestedWriteSettings {
		restore_updated_on_failure: false,
		..Default::default()
	};
	let mut serializer = ModelSerializer::for_instance(schemas.user, user)
		.with_settings(settings)
		.with_data(json!({
			"address": {"_pk": address_pk, "state": "NY", "zip_code": "10001"},
		}));
	assert!(serializer.is_valid());

	// Act
	serializer.save(&store).await.unwrap_err();

	// Assert
	assert_eq!(
		store.inner().fetch("Address", address_pk).unwrap().get("state"),
		Some(&json!("NY"))
	);
}

#[rstest]
#[tokio::test]
async fn test_rollback_restores_stored_row_not_stale_copy(schemas: TestSchemas, store: InMemoryStore) {
	// Arrange
	let mut create = ModelSerializer::new(schemas.address.clone())
		.with_data(json!({"state": "CA", "zip_code": "94105"}));
	assert!(create.is_valid());
	let stale = create.save(&store).await.unwrap();
	let mut current = stale.clone();
	current.set("state", json!("NY"));
	store.save(&current).await.unwrap();

	let store = FaultyStore::new(store).failing(StoreOperation::SetCollection, "Address");
	let mut serializer = ModelSerializer::for_instance(schemas.address, stale.clone())
		.partial(true)
		.with_data(json!({"zip_code": "10001", "tags": [{"name": "a"}]}));
	assert!(serializer.is_valid());

	// Act
	let error = serializer.save(&store).await.unwrap_err();

	// Assert
	assert!(matches!(
		error,
		SerializerError::Store(StoreError::Backend(_))
	));
	let address = store.inner().fetch("Address", stale.pk()).unwrap();
	assert_eq!(address.get("state"), Some(&json!("NY")));
	assert_eq!(address.get("zip_code"), Some(&json!("94105")));
	assert_eq!(store.inner().count("Tag"), 0);
}

#[rstest]
#[tokio::test]
async fn test_failed_compensation_reports_both_errors(schemas: TestSchemas, store: InMemoryStore) {
	// Arrange
	let store = FaultyStore::new(store)
		.failing(StoreOperation::Create, "Client")
		.failing(StoreOperation::Delete, "User");
	let mut serializer = ModelSerializer::new(schemas.client).with_data(client_payload());
	assert!(serializer.is_valid());
	let logs = capture_logs();

	// Act
	let error = serializer.save(&store).await.unwrap_err();

	// Assert
	let SerializerError::Compensation { original, failures } = &error else {
		panic!("unexpected error: {error:?}");
	};
	assert!(matches!(**original, SerializerError::Persistence { .. }));
	assert!(matches!(error.root_cause(), SerializerError::Persistence { .. }));
	assert_eq!(failures.len(), 1);
	assert_eq!(failures[0].model, "User");
	assert_eq!(failures[0].action, CompensationAction::Delete);
	assert!(error.to_string().ends_with("(compensation left 1 change(s) in place)"));

	assert_eq!(store.inner().count("User"), 1);
	assert_eq!(store.inner().count("Address"), 0);
	assert_eq!(store.inner().count("Tag"), 0);

	assert!(logs.contains(Level::WARN, "nested save failed, compensating"));
	let failed_steps = logs.at_level(Level::ERROR);
	assert_eq!(failed_steps.len(), 1);
	assert_eq!(failed_steps[0].field("model"), Some("User"));
}

#[rstest]
#[tokio::test]
async fn test_depth_limit_aborts_save(schemas: TestSchemas, store: InMemoryStore) {
	let settings = NestedWriteSettings {
		max_nesting_depth: 1,
		..Default::default()
	};
	let mut serializer = ModelSerializer::new(schemas.client)
		.with_settings(settings)
		.with_data(client_payload());
	assert!(serializer.is_valid());

	let error = serializer.save(&store).await.unwrap_err();

	assert!(matches!(error, SerializerError::DepthExceeded { max_depth: 1 }));
	for model in ["Client", "User", "Address", "Tag"] {
		assert_eq!(store.count(model), 0);
	}
}
