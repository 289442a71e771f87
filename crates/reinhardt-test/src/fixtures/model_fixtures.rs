//! Model metadata and stores for serializer tests
//!
//! The models form a small chain of to-one relations with a many-to-many leaf:
//!
//! ```text
//! Client --user--> User --address--> Address --tags--> Tag
//! ```

use reinhardt_db::orm::{FieldMeta, InMemoryStore, ModelMeta};
use rstest::*;
use std::sync::Arc;

pub fn tag_meta() -> ModelMeta {
	ModelMeta::new("Tag")
		.field(FieldMeta::auto_pk("id"))
		.field(FieldMeta::char("name", 12))
}

pub fn address_meta() -> ModelMeta {
	ModelMeta::new("Address")
		.field(FieldMeta::auto_pk("id"))
		.field(FieldMeta::char("state", 2))
		.field(FieldMeta::char("zip_code", 12))
		.field(FieldMeta::many_to_many("tags", "Tag").blank())
}

pub fn user_meta() -> ModelMeta {
	ModelMeta::new("User")
		.field(FieldMeta::auto_pk("id"))
		.field(FieldMeta::char("username", 150))
		.field(FieldMeta::char("password", 128))
		.field(FieldMeta::one_to_one("address", "Address").null().blank())
}

pub fn client_meta() -> ModelMeta {
	ModelMeta::new("Client")
		.field(FieldMeta::auto_pk("id"))
		.field(FieldMeta::one_to_one("user", "User"))
		.field(FieldMeta::many_to_many("tags", "Tag").blank())
}

/// Every test model, shared by the serializer fixtures
#[derive(Debug, Clone)]
pub struct TestModels {
	pub tag: Arc<ModelMeta>,
	pub address: Arc<ModelMeta>,
	pub user: Arc<ModelMeta>,
	pub client: Arc<ModelMeta>,
}

impl TestModels {
	pub fn all(&self) -> [&Arc<ModelMeta>; 4] {
		[&self.tag, &self.address, &self.user, &self.client]
	}
}

#[fixture]
pub fn models() -> TestModels {
	TestModels {
		tag: Arc::new(tag_meta()),
		address: Arc::new(address_meta()),
		user: Arc::new(user_meta()),
		client: Arc::new(client_meta()),
	}
}

/// Empty in-memory store with every test model registered
///
/// # Examples
///
/// ```
/// use reinhardt_test::fixtures::{models, store};
///
/// let store = store(models());
/// assert_eq!(store.count("Address"), 0);
/// ```
#[fixture]
pub fn store(models: TestModels) -> InMemoryStore {
	let store = InMemoryStore::new();
	for meta in models.all() {
		store.register(meta);
	}
	store
}
