//! # Property Values
//!
//! Immutable snapshots of update-role values.
//!
//! ## Responsibilities
//! - **Snapshotting**: deep copies of `rhai::Dynamic` and `serde_json::Value` trees.
//! - **Typed Access**: accessors that fail with `DomError::TypeMismatch`.
//!
//! Nested arrays and objects are fully materialized when the value is built,
//! so a snapshot never aliases the live update-role representation.

use crate::errors::DomError;
use rhai::{Dynamic, FnPtr, Map};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

static UNDEFINED: PropertyValue = PropertyValue::Undefined;

/// Discriminant of a [`PropertyValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Undefined,
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
    Opaque,
    Callable,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Undefined => "undefined",
            ValueType::Null => "null",
            ValueType::Bool => "bool",
            ValueType::Number => "number",
            ValueType::String => "string",
            ValueType::Array => "array",
            ValueType::Object => "object",
            ValueType::Opaque => "opaque",
            ValueType::Callable => "callable",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A host object (image, path, ...) passed through the property system untouched.
///
/// Equality is identity: two handles are equal only if they share the same allocation.
#[derive(Clone)]
pub struct OpaqueHandle(Arc<dyn Any + Send + Sync>);

impl OpaqueHandle {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl PartialEq for OpaqueHandle {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.0) as *const (),
            Arc::as_ptr(&other.0) as *const (),
        )
    }
}

impl fmt::Debug for OpaqueHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OpaqueHandle({:p})", Arc::as_ptr(&self.0) as *const ())
    }
}

/// A deep-copied, read-only value written by the update role.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PropertyValue {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<PropertyValue>),
    Object(BTreeMap<String, PropertyValue>),
    Opaque(OpaqueHandle),
    /// A script callable, identified by its function name.
    Callable(String),
}

impl PropertyValue {
    /// Builds an object value from key/value pairs.
    pub fn object<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<PropertyValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        PropertyValue::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Wraps a host object.
    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        PropertyValue::Opaque(OpaqueHandle::new(value))
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            PropertyValue::Undefined => ValueType::Undefined,
            PropertyValue::Null => ValueType::Null,
            PropertyValue::Bool(_) => ValueType::Bool,
            PropertyValue::Number(_) => ValueType::Number,
            PropertyValue::String(_) => ValueType::String,
            PropertyValue::Array(_) => ValueType::Array,
            PropertyValue::Object(_) => ValueType::Object,
            PropertyValue::Opaque(_) => ValueType::Opaque,
            PropertyValue::Callable(_) => ValueType::Callable,
        }
    }

    /// `true` for `Undefined` and `Null`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, PropertyValue::Undefined | PropertyValue::Null)
    }

    fn mismatch(&self, expected: &'static str) -> DomError {
        DomError::TypeMismatch {
            expected,
            found: self.value_type().as_str(),
        }
    }

    pub fn as_bool(&self) -> Result<bool, DomError> {
        match self {
            PropertyValue::Bool(b) => Ok(*b),
            other => Err(other.mismatch("bool")),
        }
    }

    pub fn as_number(&self) -> Result<f64, DomError> {
        match self {
            PropertyValue::Number(n) => Ok(*n),
            other => Err(other.mismatch("number")),
        }
    }

    pub fn as_string(&self) -> Result<&str, DomError> {
        match self {
            PropertyValue::String(s) => Ok(s),
            other => Err(other.mismatch("string")),
        }
    }

    pub fn as_array(&self) -> Result<&[PropertyValue], DomError> {
        match self {
            PropertyValue::Array(items) => Ok(items),
            other => Err(other.mismatch("array")),
        }
    }

    pub fn as_map(&self) -> Result<&BTreeMap<String, PropertyValue>, DomError> {
        match self {
            PropertyValue::Object(map) => Ok(map),
            other => Err(other.mismatch("object")),
        }
    }

    /// Returns the member `name` of an object value, `Undefined` when absent.
    pub fn as_object(&self, name: &str) -> Result<&PropertyValue, DomError> {
        Ok(self.as_map()?.get(name).unwrap_or(&UNDEFINED))
    }

    pub fn has_key(&self, name: &str) -> bool {
        match self {
            PropertyValue::Object(map) => map.contains_key(name),
            _ => false,
        }
    }

    pub fn as_opaque<T: Any>(&self) -> Result<&T, DomError> {
        match self {
            PropertyValue::Opaque(handle) => {
                handle.downcast_ref::<T>().ok_or(DomError::TypeMismatch {
                    expected: std::any::type_name::<T>(),
                    found: "opaque",
                })
            }
            other => Err(other.mismatch(std::any::type_name::<T>())),
        }
    }

    pub fn as_callable(&self) -> Result<&str, DomError> {
        match self {
            PropertyValue::Callable(name) => Ok(name),
            other => Err(other.mismatch("callable")),
        }
    }

    /// Deep-copies a Rhai value.
    ///
    /// Custom types other than [`OpaqueHandle`] have no property representation and
    /// become `Undefined`.
    pub fn from_dynamic(value: &Dynamic) -> Self {
        if value.is_unit() {
            return PropertyValue::Null;
        }
        if let Ok(b) = value.as_bool() {
            return PropertyValue::Bool(b);
        }
        if let Ok(i) = value.as_int() {
            return PropertyValue::Number(i as f64);
        }
        if let Ok(f) = value.as_float() {
            return PropertyValue::Number(f);
        }
        if value.is_string() {
            return match value.clone().into_string() {
                Ok(s) => PropertyValue::String(s),
                Err(_) => PropertyValue::Undefined,
            };
        }
        if value.is_array() {
            return match value.clone().into_array() {
                Ok(items) => PropertyValue::Array(items.iter().map(Self::from_dynamic).collect()),
                Err(_) => PropertyValue::Undefined,
            };
        }
        if let Some(map) = value.clone().try_cast::<Map>() {
            return PropertyValue::Object(
                map.iter()
                    .map(|(k, v)| (k.to_string(), Self::from_dynamic(v)))
                    .collect(),
            );
        }
        if let Some(f) = value.clone().try_cast::<FnPtr>() {
            return PropertyValue::Callable(f.fn_name().to_string());
        }
        if let Some(handle) = value.clone().try_cast::<OpaqueHandle>() {
            return PropertyValue::Opaque(handle);
        }
        tracing::debug!("Dropping unsupported script value of type {}", value.type_name());
        PropertyValue::Undefined
    }
}

impl From<&serde_json::Value> for PropertyValue {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => PropertyValue::Null,
            serde_json::Value::Bool(b) => PropertyValue::Bool(*b),
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(PropertyValue::Number)
                .unwrap_or(PropertyValue::Undefined),
            serde_json::Value::String(s) => PropertyValue::String(s.clone()),
            serde_json::Value::Array(items) => {
                PropertyValue::Array(items.iter().map(PropertyValue::from).collect())
            }
            serde_json::Value::Object(map) => PropertyValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), PropertyValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Number(value)
    }
}

impl From<f32> for PropertyValue {
    fn from(value: f32) -> Self {
        PropertyValue::Number(value as f64)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        PropertyValue::Number(value as f64)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl<T: Into<PropertyValue>> From<Vec<T>> for PropertyValue {
    fn from(value: Vec<T>) -> Self {
        PropertyValue::Array(value.into_iter().map(Into::into).collect())
    }
}
