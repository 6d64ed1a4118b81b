// # Diff Builder
//
// Collects the fields whose desired value differs from the observed one.
//
// Only explicitly supplied desired values take part: `None` means "leave
// as configured". Immutable fields are collected separately and turn the
// whole diff into an error, so nothing is applied partially.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::traits::ResourceKind;

/// Field-by-field comparison of desired and observed state
#[derive(Debug, Clone)]
pub struct Diff {
    kind: ResourceKind,
    payload: Map<String, Value>,
    immutable: Vec<String>,
}

impl Diff {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            payload: Map::new(),
            immutable: Vec::new(),
        }
    }

    /// Record an updatable field if the desired value differs
    pub fn update<C: Serialize + ?Sized>(
        &mut self,
        field: &str,
        desired: Option<&Value>,
        current: &C,
    ) -> &mut Self {
        if let Some(desired) = desired {
            if !same(desired, &observed(current)) {
                self.payload.insert(field.to_string(), desired.clone());
            }
        }
        self
    }

    /// Record an immutable field if the desired value differs
    pub fn immutable<C: Serialize + ?Sized>(
        &mut self,
        field: &str,
        desired: Option<&Value>,
        current: &C,
    ) -> &mut Self {
        if let Some(desired) = desired {
            if !same(desired, &observed(current)) {
                self.immutable.push(field.to_string());
            }
        }
        self
    }

    /// Record a field change computed by the caller
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.payload.insert(field.to_string(), value.into());
        self
    }

    /// Record an immutable violation detected by the caller
    pub fn reject(&mut self, field: &str) -> &mut Self {
        self.immutable.push(field.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty() && self.immutable.is_empty()
    }

    /// Fields that would be sent
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.payload.keys().map(String::as_str)
    }

    /// The minimal update payload
    ///
    /// Fails with `ImmutableChange` if any immutable field differs.
    pub fn into_payload(self) -> Result<Map<String, Value>> {
        if self.immutable.is_empty() {
            Ok(self.payload)
        } else {
            Err(Error::immutable(self.kind, self.immutable))
        }
    }
}

fn observed<C: Serialize + ?Sized>(current: &C) -> Value {
    serde_json::to_value(current).unwrap_or(Value::Null)
}

/// JSON equality where `1` and `1.0` are the same number
pub fn same(desired: &Value, current: &Value) -> bool {
    match (desired, current) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(a, b)| same(a, b))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, value)| b.get(key).is_some_and(|other| same(value, other)))
        }
        _ => desired == current,
    }
}
