//! Input validation
//!
//! Turns raw JSON input into a validated [`Payload`] for one schema, or a
//! [`ValidationError`] carrying the full error tree. Nested serializer fields
//! are validated recursively; their errors are nested under the field name,
//! and element errors of many-nested fields under the element index.

use crate::discriminator::DISCRIMINATOR_FIELD;
use crate::fields::{FieldDef, FieldType};
use crate::meta::{Operation, RequiredFieldTables};
use crate::schema::SerializerSchema;
use reinhardt_core::exception::{
	ErrorDetail, ErrorTree, ErrorTreeBuilder, NON_FIELD_ERRORS_KEY, ValidationError,
};
use serde_json::{Map, Number, Value};

/// Validated field values keyed by field name
pub type Payload = Map<String, Value>;

pub const REQUIRED_MESSAGE: &str = "This field is required.";
pub const NULL_MESSAGE: &str = "This field may not be null.";
pub const BLANK_MESSAGE: &str = "This field may not be blank.";

/// Name of a JSON value's type, as used in error messages
pub fn type_name(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "boolean",
		Value::Number(_) => "number",
		Value::String(_) => "string",
		Value::Array(_) => "array",
		Value::Object(_) => "object",
	}
}

/// Which required-field tables apply to `data`
///
/// The update tables apply when an instance is bound or the input carries the
/// discriminator.
pub fn operation_for(data: &Map<String, Value>, has_instance: bool) -> Operation {
	if has_instance || data.contains_key(DISCRIMINATOR_FIELD) {
		Operation::Update
	} else {
		Operation::Create
	}
}

/// Presence checks from the `required_fields_on_*` tables
///
/// # Examples
///
/// ```
/// use reinhardt_serializers::meta::RequiredFieldTables;
/// use reinhardt_serializers::validation::check_required_fields;
/// use serde_json::json;
///
/// let tables = RequiredFieldTables {
///     on_create_any: vec!["state".into(), "zip_code".into()],
///     ..Default::default()
/// };
///
/// let data = json!({"tags": []});
/// let errors = check_required_fields(&tables, data.as_object().unwrap(), false).unwrap();
/// assert_eq!(
///     errors.messages("__all__").unwrap(),
///     [r#"At least one of "state, zip_code" is required."#]
/// );
///
/// let data = json!({"zip_code": "12345"});
/// assert!(check_required_fields(&tables, data.as_object().unwrap(), false).is_none());
/// ```
pub fn check_required_fields(
	tables: &RequiredFieldTables,
	data: &Map<String, Value>,
	has_instance: bool,
) -> Option<ErrorTree> {
	let (all_of, any_of) = tables.for_operation(operation_for(data, has_instance));

	let mut errors = ErrorTreeBuilder::new();
	for field in all_of {
		if !data.contains_key(field) {
			errors.append(field.as_str(), REQUIRED_MESSAGE);
		}
	}
	if !any_of.is_empty() && !any_of.iter().any(|field| data.contains_key(field)) {
		errors.append(
			NON_FIELD_ERRORS_KEY,
			format!("At least one of \"{}\" is required.", any_of.join(", ")),
		);
	}
	errors.build()
}

/// Full validation: the required-field tables, then every writable field
///
/// The table checks only run for mapping input; any failure there stops
/// validation before field checks.
pub fn validate(
	schema: &SerializerSchema,
	data: &Value,
	has_instance: bool,
	partial: bool,
) -> Result<Payload, ValidationError> {
	if let Value::Object(map) = data
		&& let Some(errors) = check_required_fields(schema.required_fields(), map, has_instance)
	{
		return Err(errors.into());
	}
	validate_payload(schema, data, partial)
}

/// Field-level validation of `data` against `schema`
///
/// Read-only fields and unknown keys are ignored. With `partial`, missing
/// required fields are not reported.
pub fn validate_payload(
	schema: &SerializerSchema,
	data: &Value,
	partial: bool,
) -> Result<Payload, ValidationError> {
	let Value::Object(data) = data else {
		return Err(ValidationError::non_field(format!(
			"Invalid data. Expected a dictionary, but got {}.",
			type_name(data)
		)));
	};

	let mut validated = Payload::new();
	let mut errors = ErrorTreeBuilder::new();
	for field in schema.writable_fields() {
		let Some(value) = data.get(field.name()) else {
			if field.is_required() && !partial {
				errors.append(field.name(), REQUIRED_MESSAGE);
			}
			continue;
		};
		match validate_field(field, value, partial) {
			Ok(value) => {
				validated.insert(field.name().to_string(), value);
			}
			Err(ErrorDetail::Tree(tree)) => {
				errors.nest(field.name(), tree);
			}
			Err(detail) => {
				for message in detail.as_messages().unwrap_or_default() {
					errors.append(field.name(), message.as_str());
				}
			}
		}
	}

	match errors.build() {
		Some(tree) => Err(tree.into()),
		None => Ok(validated),
	}
}

fn messages(message: impl Into<String>) -> ErrorDetail {
	ErrorDetail::Messages(vec![message.into()])
}

fn validate_field(field: &FieldDef, value: &Value, partial: bool) -> Result<Value, ErrorDetail> {
	if value.is_null() {
		return if field.allows_null() {
			Ok(Value::Null)
		} else {
			Err(messages(NULL_MESSAGE))
		};
	}

	match field.field_type() {
		FieldType::Char { max_length } => {
			validate_char(value, field.allows_blank(), *max_length).map_err(messages)
		}
		FieldType::Integer {
			min_value,
			max_value,
		} => validate_integer(value, *min_value, *max_value).map_err(messages),
		FieldType::Boolean => validate_boolean(value).map_err(messages),
		FieldType::PrimaryKeyRelated { many: false } => validate_pk(value).map_err(messages),
		FieldType::PrimaryKeyRelated { many: true } => {
			let items = expect_list(value).map_err(messages)?;
			let mut pks = Vec::with_capacity(items.len());
			let mut failures = Vec::new();
			for item in items {
				match validate_pk(item) {
					Ok(pk) => pks.push(pk),
					Err(message) => failures.push(message),
				}
			}
			if failures.is_empty() {
				Ok(Value::Array(pks))
			} else {
				Err(ErrorDetail::Messages(failures))
			}
		}
		FieldType::Nested { schema, many: false } => validate_payload(schema, value, partial)
			.map(Value::Object)
			.map_err(|error| ErrorDetail::Tree(error.into_detail())),
		FieldType::Nested { schema, many: true } => {
			let items = expect_list(value).map_err(messages)?;
			let mut payloads = Vec::with_capacity(items.len());
			let mut errors = ErrorTreeBuilder::new();
			for (index, item) in items.iter().enumerate() {
				match validate_payload(schema, item, partial) {
					Ok(payload) => payloads.push(Value::Object(payload)),
					Err(error) => {
						errors.nest(index.to_string(), error.into_detail());
					}
				}
			}
			match errors.build() {
				Some(tree) => Err(ErrorDetail::Tree(tree)),
				None => Ok(Value::Array(payloads)),
			}
		}
	}
}

fn expect_list(value: &Value) -> Result<&Vec<Value>, String> {
	value.as_array().ok_or_else(|| {
		format!(
			"Expected a list of items but got type \"{}\".",
			type_name(value)
		)
	})
}

fn validate_char(value: &Value, allow_blank: bool, max_length: Option<usize>) -> Result<Value, String> {
	let text = match value {
		Value::String(text) => text.trim().to_string(),
		Value::Number(number) => number.to_string(),
		_ => return Err("Not a valid string.".to_string()),
	};
	if text.is_empty() {
		return if allow_blank {
			Ok(Value::String(text))
		} else {
			Err(BLANK_MESSAGE.to_string())
		};
	}
	if let Some(max_length) = max_length
		&& text.chars().count() > max_length
	{
		return Err(format!(
			"Ensure this field has no more than {} characters.",
			max_length
		));
	}
	Ok(Value::String(text))
}

fn parse_integer(value: &Value) -> Option<i64> {
	match value {
		Value::Number(number) => number.as_i64().or_else(|| {
			number
				.as_f64()
				.filter(|float| float.fract() == 0.0 && float.abs() < i64::MAX as f64)
				.map(|float| float as i64)
		}),
		Value::String(text) => text.trim().parse().ok(),
		_ => None,
	}
}

fn validate_integer(
	value: &Value,
	min_value: Option<i64>,
	max_value: Option<i64>,
) -> Result<Value, String> {
	let integer =
		parse_integer(value).ok_or_else(|| "A valid integer is required.".to_string())?;
	if let Some(min_value) = min_value
		&& integer < min_value
	{
		return Err(format!(
			"Ensure this value is greater than or equal to {}.",
			min_value
		));
	}
	if let Some(max_value) = max_value
		&& integer > max_value
	{
		return Err(format!(
			"Ensure this value is less than or equal to {}.",
			max_value
		));
	}
	Ok(Value::Number(Number::from(integer)))
}

fn validate_boolean(value: &Value) -> Result<Value, String> {
	let parsed = match value {
		Value::Bool(flag) => Some(*flag),
		Value::Number(number) => match number.as_i64() {
			Some(1) => Some(true),
			Some(0) => Some(false),
			_ => None,
		},
		Value::String(text) => match text.trim().to_lowercase().as_str() {
			"true" | "1" | "yes" | "on" => Some(true),
			"false" | "0" | "no" | "off" => Some(false),
			_ => None,
		},
		_ => None,
	};
	parsed
		.map(Value::Bool)
		.ok_or_else(|| "Must be a valid boolean.".to_string())
}

fn validate_pk(value: &Value) -> Result<Value, String> {
	match value.as_u64() {
		Some(pk) => Ok(Value::Number(Number::from(pk))),
		None => Err(format!(
			"Incorrect type. Expected pk value, received {}.",
			type_name(value)
		)),
	}
}
