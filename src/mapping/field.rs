//! Host-side field values and the codec that moves Rust field types in and
//! out of them.
//!
//! Every persistent field type implements [`FieldCodec`]. The codec says what
//! shape the type has (`declared_type`) and converts a field to and from the
//! dynamic [`FieldValue`] the binding strategy works on.

use std::any::{Any, TypeId};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::core::error::{ConversionError, Result};
use crate::core::row::Row;
use crate::core::value::{Bytes, ScalarType, Value};
use crate::mapping::metadata::Entity;
use crate::mapping::reader::EntityReader;

/// Declared scalar type of a field: the native scalars plus the host types
/// that need the conversion fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    Int64,
    Float64,
    String,
    Bytes,
    Date,
    Timestamp,
    Int32,
    Float32,
    Uuid,
    SystemTime,
    Int8,
    Int16,
    UInt8,
    UInt16,
    UInt32,
}

impl ScalarKind {
    /// Native type this kind binds to directly, `None` for non-native kinds.
    pub fn native(self) -> Option<ScalarType> {
        match self {
            Self::Bool => Some(ScalarType::Bool),
            Self::Int64 => Some(ScalarType::Int64),
            Self::Float64 => Some(ScalarType::Float64),
            Self::String => Some(ScalarType::String),
            Self::Bytes => Some(ScalarType::Bytes),
            Self::Date => Some(ScalarType::Date),
            Self::Timestamp => Some(ScalarType::Timestamp),
            Self::Int32
            | Self::Float32
            | Self::Uuid
            | Self::SystemTime
            | Self::Int8
            | Self::Int16
            | Self::UInt8
            | Self::UInt16
            | Self::UInt32 => None,
        }
    }

    pub fn is_native(self) -> bool {
        self.native().is_some()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int64 => "i64",
            Self::Float64 => "f64",
            Self::String => "String",
            Self::Bytes => "Bytes",
            Self::Date => "NaiveDate",
            Self::Timestamp => "DateTime<Utc>",
            Self::Int32 => "i32",
            Self::Float32 => "f32",
            Self::Uuid => "Uuid",
            Self::SystemTime => "SystemTime",
            Self::Int8 => "i8",
            Self::Int16 => "i16",
            Self::UInt8 => "u8",
            Self::UInt16 => "u16",
            Self::UInt32 => "u32",
        }
    }
}

impl From<ScalarType> for ScalarKind {
    fn from(ty: ScalarType) -> Self {
        match ty {
            ScalarType::Bool => Self::Bool,
            ScalarType::Int64 => Self::Int64,
            ScalarType::Float64 => Self::Float64,
            ScalarType::String => Self::String,
            ScalarType::Bytes => Self::Bytes,
            ScalarType::Date => Self::Date,
            ScalarType::Timestamp => Self::Timestamp,
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Dynamic value of one entity field.
pub enum FieldValue {
    /// `None`, or a null read from the store.
    Null,
    Bool(bool),
    Int64(i64),
    Float64(f64),
    String(String),
    Bytes(Bytes),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
    Int32(i32),
    Float32(f32),
    Uuid(Uuid),
    SystemTime(SystemTime),
    Int8(i8),
    Int16(i16),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    List(Vec<FieldValue>),
    /// A nested entity instance built by the read path.
    Entity(Box<dyn Any + Send>),
    /// Placeholder for a nested entity on the write path; carries only its type name.
    EntityRef(&'static str),
}

impl FieldValue {
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match self {
            Self::Bool(_) => Some(ScalarKind::Bool),
            Self::Int64(_) => Some(ScalarKind::Int64),
            Self::Float64(_) => Some(ScalarKind::Float64),
            Self::String(_) => Some(ScalarKind::String),
            Self::Bytes(_) => Some(ScalarKind::Bytes),
            Self::Date(_) => Some(ScalarKind::Date),
            Self::Timestamp(_) => Some(ScalarKind::Timestamp),
            Self::Int32(_) => Some(ScalarKind::Int32),
            Self::Float32(_) => Some(ScalarKind::Float32),
            Self::Uuid(_) => Some(ScalarKind::Uuid),
            Self::SystemTime(_) => Some(ScalarKind::SystemTime),
            Self::Int8(_) => Some(ScalarKind::Int8),
            Self::Int16(_) => Some(ScalarKind::Int16),
            Self::UInt8(_) => Some(ScalarKind::UInt8),
            Self::UInt16(_) => Some(ScalarKind::UInt16),
            Self::UInt32(_) => Some(ScalarKind::UInt32),
            Self::Null | Self::List(_) | Self::Entity(_) | Self::EntityRef(_) => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short type description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::List(items) => format!("list of {} items", items.len()),
            Self::Entity(_) => "entity".to_string(),
            Self::EntityRef(name) => format!("entity {}", name),
            scalar => scalar
                .scalar_kind()
                .map(|kind| kind.name().to_string())
                .unwrap_or_default(),
        }
    }

    /// Native value for scalars of a native kind; `None` for everything else.
    pub fn into_native(self) -> Option<Value> {
        match self {
            Self::Bool(v) => Some(Value::Bool(v)),
            Self::Int64(v) => Some(Value::Int64(v)),
            Self::Float64(v) => Some(Value::Float64(v)),
            Self::String(v) => Some(Value::String(v)),
            Self::Bytes(v) => Some(Value::Bytes(v)),
            Self::Date(v) => Some(Value::Date(v)),
            Self::Timestamp(v) => Some(Value::Timestamp(v)),
            _ => None,
        }
    }

    /// Host value of a native scalar; `None` for nulls, arrays and struct arrays.
    pub fn from_native(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(v) => Some(Self::Bool(*v)),
            Value::Int64(v) => Some(Self::Int64(*v)),
            Value::Float64(v) => Some(Self::Float64(*v)),
            Value::String(v) => Some(Self::String(v.clone())),
            Value::Bytes(v) => Some(Self::Bytes(v.clone())),
            Value::Date(v) => Some(Self::Date(*v)),
            Value::Timestamp(v) => Some(Self::Timestamp(*v)),
            Value::Null(_) | Value::Array(_) | Value::StructArray(_) => None,
        }
    }
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "Null"),
            Self::Bool(v) => write!(f, "Bool({:?})", v),
            Self::Int64(v) => write!(f, "Int64({:?})", v),
            Self::Float64(v) => write!(f, "Float64({:?})", v),
            Self::String(v) => write!(f, "String({:?})", v),
            Self::Bytes(v) => write!(f, "Bytes({:?})", v),
            Self::Date(v) => write!(f, "Date({:?})", v),
            Self::Timestamp(v) => write!(f, "Timestamp({:?})", v),
            Self::Int32(v) => write!(f, "Int32({:?})", v),
            Self::Float32(v) => write!(f, "Float32({:?})", v),
            Self::Uuid(v) => write!(f, "Uuid({:?})", v),
            Self::SystemTime(v) => write!(f, "SystemTime({:?})", v),
            Self::Int8(v) => write!(f, "Int8({:?})", v),
            Self::Int16(v) => write!(f, "Int16({:?})", v),
            Self::UInt8(v) => write!(f, "UInt8({:?})", v),
            Self::UInt16(v) => write!(f, "UInt16({:?})", v),
            Self::UInt32(v) => write!(f, "UInt32({:?})", v),
            Self::List(items) => f.debug_tuple("List").field(items).finish(),
            Self::Entity(_) => write!(f, "Entity(..)"),
            Self::EntityRef(name) => write!(f, "EntityRef({})", name),
        }
    }
}

type ReadEmbeddedFn = fn(&EntityReader<'_>, &Row) -> Result<Box<dyn Any + Send>>;

/// Handle on an entity type used as a field or element type.
///
/// Two descriptors are equal when they describe the same Rust type.
#[derive(Clone, Copy)]
pub struct EntityDescriptor {
    type_id: TypeId,
    type_name: &'static str,
    read: ReadEmbeddedFn,
}

impl EntityDescriptor {
    pub fn of<E: Entity>() -> Self {
        Self {
            type_id: TypeId::of::<E>(),
            type_name: entity_type_name::<E>(),
            read: read_embedded::<E>,
        }
    }

    /// Unqualified type name, the same form entity metadata and errors use.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Reads one sub-row into a boxed instance of the described type.
    pub(crate) fn read(&self, reader: &EntityReader<'_>, row: &Row) -> Result<Box<dyn Any + Send>> {
        (self.read)(reader, row)
    }
}

impl fmt::Debug for EntityDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityDescriptor")
            .field("type_name", &self.type_name)
            .finish()
    }
}

impl PartialEq for EntityDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

/// `std::any::type_name` without the module path: `app::model::Order` becomes
/// `Order`. Generic arguments are kept as written.
pub(crate) fn entity_type_name<E: 'static>() -> &'static str {
    let full = std::any::type_name::<E>();
    let path_end = full.find('<').unwrap_or(full.len());
    match full[..path_end].rfind("::") {
        Some(pos) => &full[pos + 2..],
        None => full,
    }
}

fn read_embedded<E: Entity>(reader: &EntityReader<'_>, row: &Row) -> Result<Box<dyn Any + Send>> {
    let entity: E = reader.read_embedded(row)?;
    Ok(Box::new(entity))
}

/// Shape of a field's Rust type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeclaredType {
    Scalar(ScalarKind),
    /// `[T; N]` of a scalar `T`.
    FixedArray(ScalarKind),
    /// `Vec<T>`; the element type comes from the field's inner-type hint.
    Collection,
    Entity(EntityDescriptor),
    Unsupported(&'static str),
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(kind) => write!(f, "{}", kind),
            Self::FixedArray(kind) => write!(f, "[{}; N]", kind),
            Self::Collection => write!(f, "Vec<_>"),
            Self::Entity(descriptor) => write!(f, "{}", descriptor.type_name()),
            Self::Unsupported(name) => write!(f, "{}", name),
        }
    }
}

/// Declared element type of a collection field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InnerType {
    Scalar(ScalarKind),
    Entity(EntityDescriptor),
    /// The element is itself a container.
    Container,
    Unsupported(&'static str),
}

impl InnerType {
    pub fn of<T: FieldCodec>() -> Self {
        match T::declared_type() {
            DeclaredType::Scalar(kind) => Self::Scalar(kind),
            DeclaredType::Entity(descriptor) => Self::Entity(descriptor),
            DeclaredType::FixedArray(_) | DeclaredType::Collection => Self::Container,
            DeclaredType::Unsupported(name) => Self::Unsupported(name),
        }
    }
}

impl fmt::Display for InnerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(kind) => write!(f, "{}", kind),
            Self::Entity(descriptor) => write!(f, "{}", descriptor.type_name()),
            Self::Container => write!(f, "nested collection"),
            Self::Unsupported(name) => write!(f, "{}", name),
        }
    }
}

/// Conversion between a Rust field type and [`FieldValue`].
pub trait FieldCodec: Sized {
    fn declared_type() -> DeclaredType;

    /// Element type of a `Vec<T>`, checked against the field's inner-type hint.
    fn element_type() -> Option<InnerType> {
        None
    }

    fn to_field_value(&self) -> FieldValue;

    /// Rebuilds the field. `FieldValue::Null` yields the type's zero value.
    fn from_field_value(value: FieldValue) -> std::result::Result<Self, ConversionError>;
}

macro_rules! scalar_codec {
    ($ty:ty, $kind:ident, $zero:expr) => {
        impl FieldCodec for $ty {
            fn declared_type() -> DeclaredType {
                DeclaredType::Scalar(ScalarKind::$kind)
            }

            fn to_field_value(&self) -> FieldValue {
                FieldValue::$kind(self.clone())
            }

            fn from_field_value(value: FieldValue) -> std::result::Result<Self, ConversionError> {
                match value {
                    FieldValue::$kind(v) => Ok(v),
                    FieldValue::Null => Ok($zero),
                    other => Err(ConversionError::type_mismatch(
                        ScalarKind::$kind,
                        other.describe(),
                    )),
                }
            }
        }
    };
}

scalar_codec!(bool, Bool, false);
scalar_codec!(i64, Int64, 0);
scalar_codec!(f64, Float64, 0.0);
scalar_codec!(String, String, String::new());
scalar_codec!(Bytes, Bytes, Bytes::default());
scalar_codec!(NaiveDate, Date, NaiveDate::default());
scalar_codec!(DateTime<Utc>, Timestamp, DateTime::<Utc>::default());
scalar_codec!(i32, Int32, 0);
scalar_codec!(f32, Float32, 0.0);
scalar_codec!(Uuid, Uuid, Uuid::nil());
scalar_codec!(SystemTime, SystemTime, UNIX_EPOCH);
scalar_codec!(i8, Int8, 0);
scalar_codec!(i16, Int16, 0);
scalar_codec!(u8, UInt8, 0);
scalar_codec!(u16, UInt16, 0);
scalar_codec!(u32, UInt32, 0);

impl<T: FieldCodec> FieldCodec for Option<T> {
    fn declared_type() -> DeclaredType {
        T::declared_type()
    }

    fn element_type() -> Option<InnerType> {
        T::element_type()
    }

    fn to_field_value(&self) -> FieldValue {
        match self {
            Some(value) => value.to_field_value(),
            None => FieldValue::Null,
        }
    }

    fn from_field_value(value: FieldValue) -> std::result::Result<Self, ConversionError> {
        match value {
            FieldValue::Null => Ok(None),
            other => T::from_field_value(other).map(Some),
        }
    }
}

impl<T: FieldCodec> FieldCodec for Vec<T> {
    fn declared_type() -> DeclaredType {
        DeclaredType::Collection
    }

    fn element_type() -> Option<InnerType> {
        Some(InnerType::of::<T>())
    }

    fn to_field_value(&self) -> FieldValue {
        FieldValue::List(self.iter().map(FieldCodec::to_field_value).collect())
    }

    fn from_field_value(value: FieldValue) -> std::result::Result<Self, ConversionError> {
        match value {
            FieldValue::List(items) => items.into_iter().map(T::from_field_value).collect(),
            FieldValue::Null => Ok(Vec::new()),
            other => Err(ConversionError::type_mismatch("list", other.describe())),
        }
    }
}

impl<T: FieldCodec, const N: usize> FieldCodec for [T; N] {
    fn declared_type() -> DeclaredType {
        match T::declared_type() {
            DeclaredType::Scalar(kind) => DeclaredType::FixedArray(kind),
            _ => DeclaredType::Unsupported(std::any::type_name::<Self>()),
        }
    }

    fn to_field_value(&self) -> FieldValue {
        FieldValue::List(self.iter().map(FieldCodec::to_field_value).collect())
    }

    fn from_field_value(value: FieldValue) -> std::result::Result<Self, ConversionError> {
        let items = match value {
            FieldValue::List(items) => {
                if items.len() != N {
                    return Err(ConversionError::LengthMismatch {
                        expected: N,
                        actual: items.len(),
                    });
                }
                items
                    .into_iter()
                    .map(T::from_field_value)
                    .collect::<std::result::Result<Vec<_>, _>>()?
            }
            FieldValue::Null => (0..N)
                .map(|_| T::from_field_value(FieldValue::Null))
                .collect::<std::result::Result<Vec<_>, _>>()?,
            other => return Err(ConversionError::type_mismatch("array", other.describe())),
        };
        let actual = items.len();
        items
            .try_into()
            .map_err(|_| ConversionError::LengthMismatch {
                expected: N,
                actual,
            })
    }
}

/// `FieldCodec::from_field_value` for entity types; used by `#[derive(Entity)]`.
pub fn entity_from_field_value<E: Entity>(
    value: FieldValue,
) -> std::result::Result<E, ConversionError> {
    let name = entity_type_name::<E>();
    match value {
        FieldValue::Entity(boxed) => boxed
            .downcast::<E>()
            .map(|entity| *entity)
            .map_err(|_| ConversionError::type_mismatch(name, "entity of another type")),
        FieldValue::Null => Ok(E::default()),
        other => Err(ConversionError::type_mismatch(name, other.describe())),
    }
}
