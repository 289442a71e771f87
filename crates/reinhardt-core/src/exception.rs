//! Exception types for serializer validation
//!
//! Validation failures are reported as an [`ErrorTree`]: an ordered mapping from
//! a field name (or [`NON_FIELD_ERRORS_KEY`]) to either a list of messages or
//! another tree. Nested serializers produce trees that are re-wrapped under the
//! parent field name, so a failure three levels down keeps its full path.

pub mod tree;
pub mod validation;

pub use tree::{ErrorDetail, ErrorTree, ErrorTreeBuilder};
pub use validation::ValidationError;

/// Key under which errors that do not belong to a single field are stored.
pub const NON_FIELD_ERRORS_KEY: &str = "__all__";
