//! # Reinhardt Core
//!
//! Core components shared by the Reinhardt serializer crates.
//!
//! ## Modules
//!
//! - [`exception`]: validation errors and the nested error tree used to report
//!   field-scoped failures, including failures raised by nested serializers.

pub mod exception;

pub use exception::{ErrorDetail, ErrorTree, ErrorTreeBuilder, NON_FIELD_ERRORS_KEY, ValidationError};
