use crate::core::value::{NativeType, ScalarType};
use thiserror::Error;

/// Structural problems: the type (or the row schema) cannot be mapped at all.
///
/// These signal a programming or schema mismatch and are never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    #[error("Entity '{0}' has no table name")]
    MissingTable(String),

    #[error("Entity '{0}' has no primary key field")]
    MissingPrimaryKey(String),

    #[error("Entity '{entity}' declares more than one primary key: {fields:?}")]
    MultiplePrimaryKeys { entity: String, fields: Vec<String> },

    #[error("Entity '{0}' has no persistent fields")]
    NoFields(String),

    #[error("Column '{column}' is mapped by more than one field of '{entity}'")]
    DuplicateColumn { entity: String, column: String },

    #[error("Field '{entity}.{field}' is a collection without an inner type")]
    MissingInnerType { entity: String, field: String },

    #[error("Field '{entity}.{field}' has unsupported inner type {inner}")]
    UnsupportedInnerType {
        entity: String,
        field: String,
        inner: String,
    },

    #[error("Field '{entity}.{field}' declares inner type {inner} but its elements are {element}")]
    InnerTypeMismatch {
        entity: String,
        field: String,
        inner: String,
        element: String,
    },

    #[error("Field '{entity}.{field}': unsupported iterable element type {element}")]
    UnsupportedElementType {
        entity: String,
        field: String,
        element: String,
    },

    #[error("Field '{entity}.{field}' has unsupported type {declared}")]
    UnsupportedType {
        entity: String,
        field: String,
        declared: String,
    },

    #[error("Column '{column}' not found in row for '{entity}'")]
    ColumnNotFound { entity: String, column: String },

    #[error("Entity '{entity}' has no accessor for field '{field}'")]
    UnknownField { entity: String, field: String },
}

/// Value-level failures: this particular value has the wrong runtime shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        expected: NativeType,
        actual: NativeType,
    },

    #[error("Value {value} is out of range for {target}")]
    OutOfRange { value: String, target: String },

    #[error("Cannot parse '{input}' as {target}: {reason}")]
    Parse {
        input: String,
        target: String,
        reason: String,
    },

    #[error("No converter from {from} to {to}")]
    NoConverter { from: String, to: String },

    #[error("Expected array of length {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

impl ConversionError {
    pub fn type_mismatch(expected: impl ToString, actual: impl ToString) -> Self {
        Self::TypeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub fn no_converter(from: impl ToString, to: impl ToString) -> Self {
        Self::NoConverter {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub(crate) fn scalar_shape(expected: ScalarType, actual: NativeType) -> Self {
        Self::ShapeMismatch {
            expected: NativeType::Scalar(expected),
            actual,
        }
    }
}

/// Error surfaced by every mapping call.
///
/// The two kinds stay distinct so callers can tell "this type isn't mappable"
/// from "this value is malformed".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

impl Error {
    pub fn is_mapping(&self) -> bool {
        matches!(self, Self::Mapping(_))
    }

    pub fn is_conversion(&self) -> bool {
        matches!(self, Self::Conversion(_))
    }

    pub fn as_mapping(&self) -> Option<&MappingError> {
        match self {
            Self::Mapping(err) => Some(err),
            Self::Conversion(_) => None,
        }
    }

    pub fn as_conversion(&self) -> Option<&ConversionError> {
        match self {
            Self::Conversion(err) => Some(err),
            Self::Mapping(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
