//! Nested error tree
//!
//! Trees are assembled through [`ErrorTreeBuilder`] during one validation pass and
//! are immutable once built. Two trees are combined by structural union:
//!
//! - message lists under the same key are concatenated,
//! - sub-trees under the same key are merged recursively,
//! - a message list colliding with a sub-tree is moved under the sub-tree's
//!   [`NON_FIELD_ERRORS_KEY`].

use super::NON_FIELD_ERRORS_KEY;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// Value stored under one key of an [`ErrorTree`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ErrorDetail {
	/// Messages attached directly to the key
	Messages(Vec<String>),
	/// Errors of a nested serializer bound to the key
	Tree(ErrorTree),
}

impl ErrorDetail {
	/// Messages attached to the key, if this is a leaf
	pub fn as_messages(&self) -> Option<&[String]> {
		match self {
			Self::Messages(messages) => Some(messages),
			Self::Tree(_) => None,
		}
	}

	/// Nested tree, if the key belongs to a nested serializer
	pub fn as_tree(&self) -> Option<&ErrorTree> {
		match self {
			Self::Tree(tree) => Some(tree),
			Self::Messages(_) => None,
		}
	}

	fn message_count(&self) -> usize {
		match self {
			Self::Messages(messages) => messages.len(),
			Self::Tree(tree) => tree.message_count(),
		}
	}

	fn absorb(&mut self, incoming: ErrorDetail) {
		match incoming {
			Self::Messages(messages) => match self {
				Self::Messages(existing) => existing.extend(messages),
				Self::Tree(tree) => tree.insert_detail(NON_FIELD_ERRORS_KEY, Self::Messages(messages)),
			},
			Self::Tree(tree) => match self {
				Self::Tree(existing) => existing.merge(tree),
				Self::Messages(existing) => {
					let mut lifted = ErrorTree::new();
					lifted.insert_detail(
						NON_FIELD_ERRORS_KEY,
						Self::Messages(std::mem::take(existing)),
					);
					lifted.merge(tree);
					*self = Self::Tree(lifted);
				}
			},
		}
	}
}

/// Ordered mapping from field name to [`ErrorDetail`]
///
/// Serializes to the JSON shape returned in API error bodies:
///
/// ```
/// use reinhardt_core::exception::ErrorTreeBuilder;
///
/// let mut inner = ErrorTreeBuilder::new();
/// inner.append("zip_code", "This field is required.");
///
/// let mut outer = ErrorTreeBuilder::new();
/// outer.nest("address", inner.build().unwrap());
/// let tree = outer.build().unwrap();
///
/// assert_eq!(
///     tree.to_string(),
///     r#"{"address": {"zip_code": ["This field is required."]}}"#
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ErrorTree {
	entries: IndexMap<String, ErrorDetail>,
}

impl ErrorTree {
	/// Create an empty tree
	pub fn new() -> Self {
		Self::default()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Number of top-level keys
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Total number of messages in the tree, at every depth
	pub fn message_count(&self) -> usize {
		self.entries.values().map(ErrorDetail::message_count).sum()
	}

	pub fn get(&self, key: &str) -> Option<&ErrorDetail> {
		self.entries.get(key)
	}

	/// Messages stored directly under `key`
	pub fn messages(&self, key: &str) -> Option<&[String]> {
		self.get(key).and_then(ErrorDetail::as_messages)
	}

	/// Nested tree stored under `key`
	pub fn subtree(&self, key: &str) -> Option<&ErrorTree> {
		self.get(key).and_then(ErrorDetail::as_tree)
	}

	pub fn contains_key(&self, key: &str) -> bool {
		self.entries.contains_key(key)
	}

	/// Whether every key in `keys` is present at the top level
	pub fn has_keys(&self, keys: &[&str]) -> bool {
		keys.iter().all(|key| self.contains_key(key))
	}

	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.entries.keys().map(String::as_str)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &ErrorDetail)> {
		self.entries.iter().map(|(key, detail)| (key.as_str(), detail))
	}

	/// Follow `path` through nested trees
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_core::exception::ErrorTreeBuilder;
	///
	/// let mut address = ErrorTreeBuilder::new();
	/// address.append("zip_code", "This field is required.");
	/// let mut user = ErrorTreeBuilder::new();
	/// user.nest("address", address.build().unwrap());
	/// let tree = user.build().unwrap().wrap("user");
	///
	/// let detail = tree.lookup(&["user", "address", "zip_code"]).unwrap();
	/// assert_eq!(detail.as_messages().unwrap(), ["This field is required."]);
	/// ```
	pub fn lookup(&self, path: &[&str]) -> Option<&ErrorDetail> {
		let (first, rest) = path.split_first()?;
		let detail = self.get(first)?;
		if rest.is_empty() {
			Some(detail)
		} else {
			detail.as_tree()?.lookup(rest)
		}
	}

	/// Re-key this tree one level deeper: `{field: self}`
	pub fn wrap(self, field: impl Into<String>) -> ErrorTree {
		let mut wrapped = ErrorTree::new();
		wrapped.insert_detail(field, ErrorDetail::Tree(self));
		wrapped
	}

	/// Structural union of `other` into `self`
	pub fn merge(&mut self, other: ErrorTree) {
		for (key, detail) in other.entries {
			self.insert_detail(key, detail);
		}
	}

	fn insert_detail(&mut self, key: impl Into<String>, detail: ErrorDetail) {
		let empty = match &detail {
			ErrorDetail::Messages(messages) => messages.is_empty(),
			ErrorDetail::Tree(tree) => tree.is_empty(),
		};
		if empty {
			return;
		}

		match self.entries.entry(key.into()) {
			indexmap::map::Entry::Occupied(mut slot) => slot.get_mut().absorb(detail),
			indexmap::map::Entry::Vacant(slot) => {
				slot.insert(detail);
			}
		}
	}
}

impl fmt::Display for ErrorTree {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("{")?;
		for (index, (key, detail)) in self.entries.iter().enumerate() {
			if index > 0 {
				f.write_str(", ")?;
			}
			write!(f, "{:?}: {}", key, detail)?;
		}
		f.write_str("}")
	}
}

impl fmt::Display for ErrorDetail {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Messages(messages) => {
				f.write_str("[")?;
				for (index, message) in messages.iter().enumerate() {
					if index > 0 {
						f.write_str(", ")?;
					}
					write!(f, "{:?}", message)?;
				}
				f.write_str("]")
			}
			Self::Tree(tree) => tree.fmt(f),
		}
	}
}

/// Incremental builder for an [`ErrorTree`]
///
/// # Examples
///
/// ```
/// use reinhardt_core::exception::{ErrorTreeBuilder, NON_FIELD_ERRORS_KEY};
///
/// let mut errors = ErrorTreeBuilder::new();
/// errors.append("state", "This field is required.");
/// errors.append(NON_FIELD_ERRORS_KEY, r#"At least one of "state, zip_code" is required."#);
///
/// let tree = errors.build().unwrap();
/// assert!(tree.has_keys(&["state", "__all__"]));
/// ```
#[derive(Debug, Default)]
pub struct ErrorTreeBuilder {
	tree: ErrorTree,
}

impl ErrorTreeBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Append `message` to the list stored under `key`, creating the list if needed
	pub fn append(&mut self, key: impl Into<String>, message: impl Into<String>) -> &mut Self {
		self.tree
			.insert_detail(key, ErrorDetail::Messages(vec![message.into()]));
		self
	}

	/// Store a nested serializer's errors under `key`
	pub fn nest(&mut self, key: impl Into<String>, tree: ErrorTree) -> &mut Self {
		self.tree.insert_detail(key, ErrorDetail::Tree(tree));
		self
	}

	/// Union `tree` into the errors collected so far
	pub fn merge(&mut self, tree: ErrorTree) -> &mut Self {
		self.tree.merge(tree);
		self
	}

	pub fn is_empty(&self) -> bool {
		self.tree.is_empty()
	}

	/// Finish the pass; `None` when nothing was recorded
	pub fn build(self) -> Option<ErrorTree> {
		if self.tree.is_empty() {
			None
		} else {
			Some(self.tree)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use rstest::rstest;
	use serde_json::json;

	fn flat(entries: &[(&str, &[&str])]) -> ErrorTree {
		let mut builder = ErrorTreeBuilder::new();
		for (key, messages) in entries {
			for message in *messages {
				builder.append(*key, *message);
			}
		}
		builder.build().unwrap_or_default()
	}

	#[rstest]
	fn test_append_creates_and_extends_list() {
		let mut builder = ErrorTreeBuilder::new();
		builder.append("foo", "Error spamegg");
		builder.append("bar", "Error spamegg");
		builder.append("bar", "Error baz");

		let tree = builder.build().unwrap();
		assert_eq!(tree.messages("foo").unwrap(), ["Error spamegg"]);
		assert_eq!(tree.messages("bar").unwrap(), ["Error spamegg", "Error baz"]);
	}

	#[rstest]
	fn test_empty_builder_builds_nothing() {
		let builder = ErrorTreeBuilder::new();
		assert!(builder.is_empty());
		assert!(builder.build().is_none());
	}

	#[rstest]
	fn test_merge_concatenates_messages() {
		let mut left = flat(&[("name", &["first"])]);
		left.merge(flat(&[("name", &["second"]), ("age", &["third"])]));

		assert_eq!(left.messages("name").unwrap(), ["first", "second"]);
		assert_eq!(left.messages("age").unwrap(), ["third"]);
		assert_eq!(left.keys().collect::<Vec<_>>(), ["name", "age"]);
	}

	#[rstest]
	fn test_merge_recurses_into_subtrees() {
		let mut left = flat(&[("state", &["bad state"])]).wrap("address");
		left.merge(flat(&[("zip_code", &["bad zip"])]).wrap("address"));

		let address = left.subtree("address").unwrap();
		assert!(address.has_keys(&["state", "zip_code"]));
	}

	#[rstest]
	#[case::messages_first(true)]
	#[case::tree_first(false)]
	fn test_merge_conflict_lifts_messages_under_non_field_key(#[case] messages_first: bool) {
		let messages = flat(&[("address", &["Related object already exists."])]);
		let nested = flat(&[("zip_code", &["This field is required."])]).wrap("address");

		let merged = if messages_first {
			let mut tree = messages;
			tree.merge(nested);
			tree
		} else {
			let mut tree = nested;
			tree.merge(messages);
			tree
		};

		let address = merged.subtree("address").unwrap();
		assert_eq!(
			address.messages(NON_FIELD_ERRORS_KEY).unwrap(),
			["Related object already exists."]
		);
		assert_eq!(
			address.messages("zip_code").unwrap(),
			["This field is required."]
		);
	}

	#[rstest]
	fn test_serializes_to_nested_json() {
		let tree = flat(&[("zip_code", &["This field is required."])])
			.wrap("address")
			.wrap("user");

		assert_eq!(
			serde_json::to_value(&tree).unwrap(),
			json!({"user": {"address": {"zip_code": ["This field is required."]}}})
		);
	}

	#[rstest]
	fn test_lookup_missing_path() {
		let tree = flat(&[("zip_code", &["x"])]).wrap("address");
		assert!(tree.lookup(&["address", "state"]).is_none());
		assert!(tree.lookup(&["address", "zip_code", "deeper"]).is_none());
		assert!(tree.lookup(&[]).is_none());
	}

	#[rstest]
	fn test_display_escapes_quotes() {
		let tree = flat(&[(NON_FIELD_ERRORS_KEY, &[r#"At least one of "a, b" is required."#])]);
		assert_eq!(
			tree.to_string(),
			r#"{"__all__": ["At least one of \"a, b\" is required."]}"#
		);
	}

	fn flat_tree_strategy() -> impl Strategy<Value = ErrorTree> {
		prop::collection::vec(
			(
				prop::sample::select(vec!["a", "b", "c", NON_FIELD_ERRORS_KEY]),
				prop::collection::vec("[a-z]{1,6}", 1..3),
				any::<bool>(),
			),
			0..6,
		)
		.prop_map(|entries| {
			let mut builder = ErrorTreeBuilder::new();
			for (key, messages, nested) in entries {
				if nested {
					let mut inner = ErrorTreeBuilder::new();
					for message in messages {
						inner.append("inner", message);
					}
					if let Some(tree) = inner.build() {
						builder.nest(key, tree);
					}
				} else {
					for message in messages {
						builder.append(key, message);
					}
				}
			}
			builder.build().unwrap_or_default()
		})
	}

	proptest! {
		#[test]
		fn prop_merge_preserves_message_count(
			left in flat_tree_strategy(),
			right in flat_tree_strategy(),
		) {
			let expected = left.message_count() + right.message_count();
			let mut merged = left;
			merged.merge(right);
			prop_assert_eq!(merged.message_count(), expected);
		}

		#[test]
		fn prop_merge_into_empty_is_identity(tree in flat_tree_strategy()) {
			let mut merged = ErrorTree::new();
			merged.merge(tree.clone());
			prop_assert_eq!(merged, tree);
		}

		#[test]
		fn prop_wrap_has_single_key(tree in flat_tree_strategy()) {
			prop_assume!(!tree.is_empty());
			let wrapped = tree.wrap("outer");
			prop_assert_eq!(wrapped.len(), 1);
			prop_assert!(wrapped.contains_key("outer"));
		}
	}
}
