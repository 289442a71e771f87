use super::{ErrorTree, ErrorTreeBuilder, NON_FIELD_ERRORS_KEY};
use std::fmt;

/// Structured validation failure raised by serializers
///
/// A failure carries one or more error groups. The groups are kept apart until
/// [`ValidationError::detail`] unions them, which is also what happens when the
/// failure is re-raised one level up by [`ValidationError::wrap_under`].
///
/// # Examples
///
/// ```
/// use reinhardt_core::exception::ValidationError;
///
/// let inner = ValidationError::field("zip_code", "This field is required.");
/// let outer = ValidationError::wrap_under("address", inner);
///
/// assert!(outer.has_keys(&["address"]));
/// let address = outer.detail();
/// let address = address.subtree("address").unwrap();
/// assert_eq!(address.messages("zip_code").unwrap(), ["This field is required."]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
	groups: Vec<ErrorTree>,
}

impl ValidationError {
	/// Create a failure from a single error tree
	pub fn new(tree: ErrorTree) -> Self {
		Self { groups: vec![tree] }
	}

	pub fn from_groups(groups: impl IntoIterator<Item = ErrorTree>) -> Self {
		Self {
			groups: groups.into_iter().collect(),
		}
	}

	/// Add another group of errors
	pub fn with_group(mut self, tree: ErrorTree) -> Self {
		self.groups.push(tree);
		self
	}

	/// Failure with a single message under [`NON_FIELD_ERRORS_KEY`]
	pub fn non_field(message: impl Into<String>) -> Self {
		Self::field(NON_FIELD_ERRORS_KEY, message)
	}

	/// Failure with a single message under `field`
	pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
		let mut builder = ErrorTreeBuilder::new();
		builder.append(field, message);
		Self::new(builder.build().unwrap_or_default())
	}

	/// Re-raise `inner` one level deeper
	///
	/// The result has `field_name` as its only top-level key. Its value is the
	/// union of every group carried by `inner`.
	pub fn wrap_under(field_name: impl Into<String>, inner: ValidationError) -> Self {
		Self::new(inner.into_detail().wrap(field_name))
	}

	pub fn groups(&self) -> &[ErrorTree] {
		&self.groups
	}

	/// Union of all groups
	pub fn detail(&self) -> ErrorTree {
		self.clone().into_detail()
	}

	pub fn into_detail(self) -> ErrorTree {
		let mut detail = ErrorTree::new();
		for group in self.groups {
			detail.merge(group);
		}
		detail
	}

	/// Whether every key in `keys` appears at the top level of any group
	pub fn has_keys(&self, keys: &[&str]) -> bool {
		keys.iter()
			.all(|key| self.groups.iter().any(|group| group.contains_key(key)))
	}
}

impl From<ErrorTree> for ValidationError {
	fn from(tree: ErrorTree) -> Self {
		Self::new(tree)
	}
}

impl fmt::Display for ValidationError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Validation error: {}", self.detail())
	}
}

impl std::error::Error for ValidationError {}
