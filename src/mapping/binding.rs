//! Type binding strategy: which native write/read operation serves a field.
//!
//! Every persistent field resolves to one [`BindingKind`]. The write side
//! turns a [`FieldValue`] into typed binder calls; the read side turns a native
//! [`Value`] back into a `FieldValue` of the declared type. Declared scalars
//! without a native binding go through the [`Converter`] in both directions.

use tracing::trace;

use crate::core::error::{ConversionError, MappingError, Result};
use crate::core::value::{NativeType, ScalarType, Value};
use crate::mapping::convert::Converter;
use crate::mapping::field::{DeclaredType, EntityDescriptor, FieldValue, InnerType, ScalarKind};
use crate::mapping::metadata::PersistentField;
use crate::mapping::reader::EntityReader;
use crate::write::binder::ValueBinder;

/// Resolved binding of a persistent field.
///
/// `declared` is the field's scalar (or element) kind, `stored` the native
/// type it is written as.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BindingKind {
    Scalar {
        declared: ScalarKind,
        stored: ScalarType,
    },
    FixedArray {
        declared: ScalarKind,
        stored: ScalarType,
    },
    Collection {
        declared: ScalarKind,
        stored: ScalarType,
    },
    NestedEntities(EntityDescriptor),
}

impl BindingKind {
    /// Column type this binding reads and writes.
    pub fn native_type(&self) -> NativeType {
        match self {
            Self::Scalar { stored, .. } => NativeType::Scalar(*stored),
            Self::FixedArray { stored, .. } | Self::Collection { stored, .. } => {
                NativeType::Array(*stored)
            }
            Self::NestedEntities(_) => NativeType::StructArray,
        }
    }
}

/// Decides how `field` of `entity` is bound.
///
/// Purely structural: the same field always resolves the same way, whatever
/// value it currently holds.
pub fn resolve_binding(
    entity: &str,
    field: &PersistentField,
    converter: &dyn Converter,
) -> std::result::Result<BindingKind, MappingError> {
    let unsupported_type = || MappingError::UnsupportedType {
        entity: entity.to_string(),
        field: field.name().to_string(),
        declared: field.declared_type().to_string(),
    };

    match field.declared_type() {
        DeclaredType::Scalar(declared) => {
            let stored = storage_type(declared, converter).ok_or_else(unsupported_type)?;
            Ok(BindingKind::Scalar { declared, stored })
        }
        DeclaredType::FixedArray(declared) => {
            let stored = storage_type(declared, converter).ok_or_else(unsupported_type)?;
            Ok(BindingKind::FixedArray { declared, stored })
        }
        DeclaredType::Collection => {
            let inner = field.inner().ok_or_else(|| MappingError::MissingInnerType {
                entity: entity.to_string(),
                field: field.name().to_string(),
            })?;
            if let Some(element) = field.element_type().filter(|element| *element != inner) {
                return Err(MappingError::InnerTypeMismatch {
                    entity: entity.to_string(),
                    field: field.name().to_string(),
                    inner: inner.to_string(),
                    element: element.to_string(),
                });
            }
            let unsupported_inner = || MappingError::UnsupportedInnerType {
                entity: entity.to_string(),
                field: field.name().to_string(),
                inner: inner.to_string(),
            };
            match inner {
                InnerType::Scalar(declared) => {
                    let stored = storage_type(declared, converter).ok_or_else(unsupported_inner)?;
                    Ok(BindingKind::Collection { declared, stored })
                }
                InnerType::Entity(descriptor) => Ok(BindingKind::NestedEntities(descriptor)),
                InnerType::Container | InnerType::Unsupported(_) => Err(unsupported_inner()),
            }
        }
        DeclaredType::Entity(_) | DeclaredType::Unsupported(_) => Err(unsupported_type()),
    }
}

fn storage_type(kind: ScalarKind, converter: &dyn Converter) -> Option<ScalarType> {
    kind.native().or_else(|| converter.native_target(kind))
}

// ---------------------------------------------------------------------------
// Write side
// ---------------------------------------------------------------------------

/// Pushes `value` through the binder call matching `kind`.
pub fn bind(
    binder: ValueBinder<'_>,
    entity: &str,
    field: &PersistentField,
    kind: &BindingKind,
    value: FieldValue,
    converter: &dyn Converter,
) -> Result<()> {
    trace!(entity, column = binder.column(), ?kind, "binding column");
    match kind {
        BindingKind::Scalar { stored, .. } => {
            let native = match value {
                FieldValue::Null => None,
                present => Some(to_native(present, *stored, converter)?),
            };
            bind_scalar(binder, *stored, native)?;
        }
        BindingKind::FixedArray { stored, .. } | BindingKind::Collection { stored, .. } => {
            let natives = match value {
                FieldValue::Null => None,
                FieldValue::List(items) => Some(
                    items
                        .into_iter()
                        .map(|item| to_native(item, *stored, converter))
                        .collect::<std::result::Result<Vec<_>, _>>()?,
                ),
                other => {
                    return Err(ConversionError::type_mismatch("list", other.describe()).into());
                }
            };
            bind_array(binder, *stored, natives)?;
        }
        BindingKind::NestedEntities(_) => check_writable(entity, field, kind)?,
    }
    Ok(())
}

/// Fails for bindings the write path cannot serve.
pub fn check_writable(
    entity: &str,
    field: &PersistentField,
    kind: &BindingKind,
) -> std::result::Result<(), MappingError> {
    match kind {
        BindingKind::NestedEntities(descriptor) => Err(MappingError::UnsupportedElementType {
            entity: entity.to_string(),
            field: field.name().to_string(),
            element: descriptor.type_name().to_string(),
        }),
        _ => Ok(()),
    }
}

fn to_native(
    value: FieldValue,
    stored: ScalarType,
    converter: &dyn Converter,
) -> std::result::Result<Value, ConversionError> {
    let target = ScalarKind::from(stored);
    let converted = if value.scalar_kind() == Some(target) {
        value
    } else {
        converter.convert(value, target)?
    };
    let description = converted.describe();
    converted
        .into_native()
        .ok_or_else(|| ConversionError::type_mismatch(stored, description))
}

macro_rules! typed_scalar {
    ($value:expr, $variant:ident, $ty:expr) => {
        match $value {
            None => None,
            Some(Value::$variant(v)) => Some(v),
            Some(other) => return Err(ConversionError::scalar_shape($ty, other.native_type())),
        }
    };
}

macro_rules! typed_elements {
    ($values:expr, $variant:ident, $ty:expr) => {
        match $values {
            None => None,
            Some(values) => Some(
                values
                    .into_iter()
                    .map(|value| match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(ConversionError::scalar_shape($ty, other.native_type())),
                    })
                    .collect::<std::result::Result<Vec<_>, _>>()?,
            ),
        }
    };
}

fn bind_scalar(
    binder: ValueBinder<'_>,
    stored: ScalarType,
    value: Option<Value>,
) -> std::result::Result<(), ConversionError> {
    match stored {
        ScalarType::Bool => binder.to_bool(typed_scalar!(value, Bool, stored)),
        ScalarType::Int64 => binder.to_int64(typed_scalar!(value, Int64, stored)),
        ScalarType::Float64 => binder.to_float64(typed_scalar!(value, Float64, stored)),
        ScalarType::String => binder.to_string(typed_scalar!(value, String, stored)),
        ScalarType::Bytes => binder.to_bytes(typed_scalar!(value, Bytes, stored)),
        ScalarType::Date => binder.to_date(typed_scalar!(value, Date, stored)),
        ScalarType::Timestamp => binder.to_timestamp(typed_scalar!(value, Timestamp, stored)),
    }
    Ok(())
}

fn bind_array(
    binder: ValueBinder<'_>,
    stored: ScalarType,
    values: Option<Vec<Value>>,
) -> std::result::Result<(), ConversionError> {
    match stored {
        ScalarType::Bool => binder.to_bool_array(typed_elements!(values, Bool, stored)),
        ScalarType::Int64 => binder.to_int64_array(typed_elements!(values, Int64, stored)),
        ScalarType::Float64 => binder.to_float64_array(typed_elements!(values, Float64, stored)),
        ScalarType::String => binder.to_string_array(typed_elements!(values, String, stored)),
        ScalarType::Bytes => binder.to_bytes_array(typed_elements!(values, Bytes, stored)),
        ScalarType::Date => binder.to_date_array(typed_elements!(values, Date, stored)),
        ScalarType::Timestamp => {
            binder.to_timestamp_array(typed_elements!(values, Timestamp, stored))
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Read side
// ---------------------------------------------------------------------------

/// Coerces a native column value into the field's declared type.
pub fn extract(kind: &BindingKind, value: &Value, reader: &EntityReader<'_>) -> Result<FieldValue> {
    if value.is_null() {
        return Ok(FieldValue::Null);
    }

    match kind {
        BindingKind::Scalar { declared, stored } => {
            let Some(field_value) = FieldValue::from_native(value) else {
                return Err(ConversionError::scalar_shape(*stored, value.native_type()).into());
            };
            Ok(from_native(field_value, *declared, reader.converter())?)
        }
        BindingKind::FixedArray { declared, stored } | BindingKind::Collection { declared, stored } => {
            let Value::Array(array) = value else {
                return Err(ConversionError::ShapeMismatch {
                    expected: kind.native_type(),
                    actual: value.native_type(),
                }
                .into());
            };
            let items = array
                .elements()
                .iter()
                .map(|element| {
                    let field_value = FieldValue::from_native(element).ok_or_else(|| {
                        ConversionError::scalar_shape(*stored, element.native_type())
                    })?;
                    from_native(field_value, *declared, reader.converter())
                })
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(FieldValue::List(items))
        }
        BindingKind::NestedEntities(descriptor) => {
            let Value::StructArray(rows) = value else {
                return Err(ConversionError::ShapeMismatch {
                    expected: kind.native_type(),
                    actual: value.native_type(),
                }
                .into());
            };
            let items = rows
                .iter()
                .map(|row| descriptor.read(reader, row).map(FieldValue::Entity))
                .collect::<Result<Vec<_>>>()?;
            Ok(FieldValue::List(items))
        }
    }
}

fn from_native(
    value: FieldValue,
    declared: ScalarKind,
    converter: &dyn Converter,
) -> std::result::Result<FieldValue, ConversionError> {
    if value.scalar_kind() == Some(declared) {
        Ok(value)
    } else {
        converter.convert(value, declared)
    }
}
