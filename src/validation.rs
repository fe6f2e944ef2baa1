//! Inbound body validation.
//!
//! A [`FieldContract`] names the required and optional top-level fields of a
//! JSON body plus an optional predicate. [`validate_body`] checks a raw body
//! against it and returns the body narrowed to the declared fields;
//! [`decode`] additionally deserializes into the endpoint's typed request.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{GatewayError, GatewayResult};

/// Predicate run after the required-field check.
///
/// On failure returns the offending field name and a message.
pub type BodyPredicate = fn(&Map<String, Value>) -> Result<(), (&'static str, String)>;

/// Declared shape of a request body.
#[derive(Clone, Copy)]
pub struct FieldContract {
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
    pub predicate: Option<BodyPredicate>,
}

impl FieldContract {
    pub const fn new(required: &'static [&'static str], optional: &'static [&'static str]) -> Self {
        Self {
            required,
            optional,
            predicate: None,
        }
    }

    pub const fn with_predicate(self, predicate: BodyPredicate) -> Self {
        Self {
            predicate: Some(predicate),
            ..self
        }
    }

    fn declares(&self, name: &str) -> bool {
        self.required.iter().chain(self.optional).any(|declared| *declared == name)
    }
}

impl std::fmt::Debug for FieldContract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldContract")
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("predicate", &self.predicate.is_some())
            .finish()
    }
}

/// A typed request body with a field contract.
pub trait RequestSchema: DeserializeOwned {
    const CONTRACT: FieldContract;
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Check `body` against `contract` and keep only declared fields.
pub fn validate_body(body: &Value, contract: &FieldContract) -> GatewayResult<Map<String, Value>> {
    let object = body
        .as_object()
        .ok_or_else(|| GatewayError::validation("Request body must be a JSON object"))?;

    let missing: Vec<&str> = contract
        .required
        .iter()
        .copied()
        .filter(|name| object.get(*name).map_or(true, is_empty))
        .collect();

    if !missing.is_empty() {
        return Err(GatewayError::invalid_fields(
            format!("Missing required field(s): {}", missing.join(", ")),
            missing,
        ));
    }

    let narrowed: Map<String, Value> = object
        .iter()
        .filter(|(name, _)| contract.declares(name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();

    if let Some(predicate) = contract.predicate {
        predicate(&narrowed).map_err(|(field, message)| GatewayError::invalid_fields(message, [field]))?;
    }

    Ok(narrowed)
}

/// Validate and deserialize a body into `T`.
pub fn decode<T: RequestSchema>(body: &Value) -> GatewayResult<T> {
    let narrowed = validate_body(body, &T::CONTRACT)?;
    serde_json::from_value(Value::Object(narrowed))
        .map_err(|e| GatewayError::validation(format!("Invalid request body: {e}")))
}

/// Predicate helper: the field, when present, must be a string.
pub fn expect_string(body: &Map<String, Value>, field: &'static str) -> Result<(), (&'static str, String)> {
    match body.get(field) {
        None | Some(Value::String(_)) => Ok(()),
        Some(_) => Err((field, format!("Field '{field}' must be a string"))),
    }
}

/// Predicate helper: the field, when present, must be an object.
pub fn expect_object(body: &Map<String, Value>, field: &'static str) -> Result<(), (&'static str, String)> {
    match body.get(field) {
        None | Some(Value::Object(_)) => Ok(()),
        Some(_) => Err((field, format!("Field '{field}' must be an object"))),
    }
}
