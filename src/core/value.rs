use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::core::error::ConversionError;
use crate::core::row::Row;

/// Scalar types the store binds natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarType {
    Bool,
    Int64,
    Float64,
    String,
    Bytes,
    Date,
    Timestamp,
}

impl ScalarType {
    pub const ALL: [ScalarType; 7] = [
        Self::Bool,
        Self::Int64,
        Self::Float64,
        Self::String,
        Self::Bytes,
        Self::Date,
        Self::Timestamp,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Bool => "BOOL",
            Self::Int64 => "INT64",
            Self::Float64 => "FLOAT64",
            Self::String => "STRING",
            Self::Bytes => "BYTES",
            Self::Date => "DATE",
            Self::Timestamp => "TIMESTAMP",
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Column type of a native value, nulls included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NativeType {
    Scalar(ScalarType),
    Array(ScalarType),
    StructArray,
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(ty) => write!(f, "{}", ty),
            Self::Array(ty) => write!(f, "ARRAY<{}>", ty),
            Self::StructArray => write!(f, "ARRAY<STRUCT>"),
        }
    }
}

/// Owned byte sequence.
///
/// Kept apart from `Vec<u8>` so a byte column is never mistaken for a
/// collection of integers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    pub fn copy_from(data: impl AsRef<[u8]>) -> Self {
        Self(data.as_ref().to_vec())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(data: Vec<u8>) -> Self {
        Self(data)
    }
}

impl From<&str> for Bytes {
    fn from(data: &str) -> Self {
        Self(data.as_bytes().to_vec())
    }
}

/// Homogeneous array of non-null native scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarArray {
    element_type: ScalarType,
    elements: Vec<Value>,
}

impl ScalarArray {
    pub fn new(element_type: ScalarType, elements: Vec<Value>) -> Result<Self, ConversionError> {
        for element in &elements {
            let actual = element.native_type();
            if element.is_null() || actual != NativeType::Scalar(element_type) {
                return Err(ConversionError::scalar_shape(element_type, actual));
            }
        }
        Ok(Self {
            element_type,
            elements,
        })
    }

    pub fn element_type(&self) -> ScalarType {
        self.element_type
    }

    pub fn elements(&self) -> &[Value] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn into_elements(self) -> Vec<Value> {
        self.elements
    }
}

/// A native column value as produced and consumed by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Typed null: the column type survives even without a payload.
    Null(NativeType),
    Bool(bool),
    Int64(i64),
    Float64(f64),
    String(String),
    Bytes(Bytes),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
    Array(ScalarArray),
    StructArray(Vec<Row>),
}

impl Value {
    pub fn native_type(&self) -> NativeType {
        match self {
            Self::Null(ty) => *ty,
            Self::Bool(_) => NativeType::Scalar(ScalarType::Bool),
            Self::Int64(_) => NativeType::Scalar(ScalarType::Int64),
            Self::Float64(_) => NativeType::Scalar(ScalarType::Float64),
            Self::String(_) => NativeType::Scalar(ScalarType::String),
            Self::Bytes(_) => NativeType::Scalar(ScalarType::Bytes),
            Self::Date(_) => NativeType::Scalar(ScalarType::Date),
            Self::Timestamp(_) => NativeType::Scalar(ScalarType::Timestamp),
            Self::Array(array) => NativeType::Array(array.element_type()),
            Self::StructArray(_) => NativeType::StructArray,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null(_))
    }

    pub fn null(ty: NativeType) -> Self {
        Self::Null(ty)
    }

    pub fn bool(value: bool) -> Self {
        Self::Bool(value)
    }

    pub fn int64(value: i64) -> Self {
        Self::Int64(value)
    }

    pub fn float64(value: f64) -> Self {
        Self::Float64(value)
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    pub fn bytes(value: impl Into<Bytes>) -> Self {
        Self::Bytes(value.into())
    }

    pub fn date(value: NaiveDate) -> Self {
        Self::Date(value)
    }

    pub fn timestamp(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }

    pub fn bool_array(values: impl IntoIterator<Item = bool>) -> Self {
        Self::scalar_array(ScalarType::Bool, values.into_iter().map(Self::Bool))
    }

    pub fn int64_array(values: impl IntoIterator<Item = i64>) -> Self {
        Self::scalar_array(ScalarType::Int64, values.into_iter().map(Self::Int64))
    }

    pub fn float64_array(values: impl IntoIterator<Item = f64>) -> Self {
        Self::scalar_array(ScalarType::Float64, values.into_iter().map(Self::Float64))
    }

    pub fn string_array<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        Self::scalar_array(
            ScalarType::String,
            values.into_iter().map(|value| Self::String(value.into())),
        )
    }

    pub fn bytes_array(values: impl IntoIterator<Item = Bytes>) -> Self {
        Self::scalar_array(ScalarType::Bytes, values.into_iter().map(Self::Bytes))
    }

    pub fn date_array(values: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self::scalar_array(ScalarType::Date, values.into_iter().map(Self::Date))
    }

    pub fn timestamp_array(values: impl IntoIterator<Item = DateTime<Utc>>) -> Self {
        Self::scalar_array(
            ScalarType::Timestamp,
            values.into_iter().map(Self::Timestamp),
        )
    }

    pub fn struct_array(rows: impl IntoIterator<Item = Row>) -> Self {
        Self::StructArray(rows.into_iter().collect())
    }

    // Constructors above only ever feed matching element variants.
    fn scalar_array(element_type: ScalarType, values: impl Iterator<Item = Value>) -> Self {
        Self::Array(ScalarArray {
            element_type,
            elements: values.collect(),
        })
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ScalarArray> {
        match self {
            Self::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_struct_array(&self) -> Option<&[Row]> {
        match self {
            Self::StructArray(rows) => Some(rows),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null(_) => write!(f, "NULL"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int64(i) => write!(f, "{}", i),
            Self::Float64(fl) => write!(f, "{}", fl),
            Self::String(s) => write!(f, "{}", s),
            Self::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            Self::Array(array) => {
                write!(f, "[")?;
                for (idx, element) in array.elements().iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, "]")
            }
            Self::StructArray(rows) => write!(f, "<{} rows>", rows.len()),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int64(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float64(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}
