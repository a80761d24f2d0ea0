//! Conversion fallback for declared types the store has no native binding for.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use uuid::Uuid;

use crate::core::error::ConversionError;
use crate::core::value::ScalarType;
use crate::mapping::field::{FieldValue, ScalarKind};

/// Pluggable value converter.
pub trait Converter: Send + Sync {
    /// Native type a non-native kind is stored as; `None` if unsupported.
    fn native_target(&self, kind: ScalarKind) -> Option<ScalarType>;

    /// Converts a scalar into `target`. Nulls pass through unchanged.
    fn convert(&self, value: FieldValue, target: ScalarKind) -> Result<FieldValue, ConversionError>;
}

pub type ConversionFn =
    Arc<dyn Fn(FieldValue) -> Result<FieldValue, ConversionError> + Send + Sync>;

lazy_static! {
    static ref SHARED_CONVERSIONS: Arc<ConversionService> =
        Arc::new(ConversionService::with_defaults());
}

/// Registry of scalar-to-scalar conversions.
#[derive(Clone, Default)]
pub struct ConversionService {
    conversions: HashMap<(ScalarKind, ScalarKind), ConversionFn>,
    native_targets: HashMap<ScalarKind, ScalarType>,
}

macro_rules! register_conversion {
    ($service:expr, $from:ident => $to:ident, |$v:ident| $body:expr) => {
        $service.register(ScalarKind::$from, ScalarKind::$to, |value| match value {
            FieldValue::$from($v) => $body,
            other => Err(ConversionError::type_mismatch(
                ScalarKind::$from,
                other.describe(),
            )),
        });
    };
}

/// Widening into `Int64`, checked narrowing back, and parsing from strings.
macro_rules! register_integer {
    ($service:expr, $kind:ident, $ty:ty) => {
        register_conversion!($service, $kind => Int64, |v| Ok(FieldValue::Int64(i64::from(v))));
        register_conversion!($service, Int64 => $kind, |v| {
            <$ty>::try_from(v)
                .map(FieldValue::$kind)
                .map_err(|_| out_of_range(v, ScalarKind::$kind))
        });
        register_conversion!($service, String => $kind, |v| {
            v.trim()
                .parse::<$ty>()
                .map(FieldValue::$kind)
                .map_err(|err| parse_error(&v, ScalarKind::$kind, err))
        });
    };
}

impl ConversionService {
    /// No conversions and no native targets.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut service = Self::empty();

        for kind in [
            ScalarKind::Int8,
            ScalarKind::Int16,
            ScalarKind::Int32,
            ScalarKind::UInt8,
            ScalarKind::UInt16,
            ScalarKind::UInt32,
        ] {
            service.register_native_target(kind, ScalarType::Int64);
        }
        service.register_native_target(ScalarKind::Float32, ScalarType::Float64);
        service.register_native_target(ScalarKind::Uuid, ScalarType::String);
        service.register_native_target(ScalarKind::SystemTime, ScalarType::Timestamp);

        register_integer!(service, Int8, i8);
        register_integer!(service, Int16, i16);
        register_integer!(service, Int32, i32);
        register_integer!(service, UInt8, u8);
        register_integer!(service, UInt16, u16);
        register_integer!(service, UInt32, u32);
        register_conversion!(service, Float32 => Float64, |v| Ok(FieldValue::Float64(f64::from(v))));
        register_conversion!(service, Float64 => Float32, |v| {
            if v.is_finite() && v.abs() > f64::from(f32::MAX) {
                Err(out_of_range(v, ScalarKind::Float32))
            } else {
                Ok(FieldValue::Float32(v as f32))
            }
        });
        register_conversion!(service, Int64 => Float64, |v| Ok(FieldValue::Float64(v as f64)));
        register_conversion!(service, Uuid => String, |v| Ok(FieldValue::String(v.to_string())));
        register_conversion!(service, String => Uuid, |v| {
            Uuid::parse_str(&v)
                .map(FieldValue::Uuid)
                .map_err(|err| parse_error(&v, ScalarKind::Uuid, err))
        });
        register_conversion!(service, SystemTime => Timestamp, |v| {
            system_time_to_timestamp(v)
                .map(FieldValue::Timestamp)
                .ok_or_else(|| out_of_range(format!("{:?}", v), ScalarKind::Timestamp))
        });
        register_conversion!(service, Timestamp => SystemTime, |v| {
            timestamp_to_system_time(v)
                .map(FieldValue::SystemTime)
                .ok_or_else(|| out_of_range(v, ScalarKind::SystemTime))
        });
        register_conversion!(service, String => Int64, |v| {
            v.trim()
                .parse::<i64>()
                .map(FieldValue::Int64)
                .map_err(|err| parse_error(&v, ScalarKind::Int64, err))
        });
        register_conversion!(service, String => Float64, |v| {
            v.trim()
                .parse::<f64>()
                .map(FieldValue::Float64)
                .map_err(|err| parse_error(&v, ScalarKind::Float64, err))
        });
        register_conversion!(service, String => Float32, |v| {
            v.trim()
                .parse::<f32>()
                .map(FieldValue::Float32)
                .map_err(|err| parse_error(&v, ScalarKind::Float32, err))
        });
        register_conversion!(service, String => Bool, |v| {
            v.trim()
                .parse::<bool>()
                .map(FieldValue::Bool)
                .map_err(|err| parse_error(&v, ScalarKind::Bool, err))
        });

        service
    }

    /// Process-wide instance with the default conversions.
    pub fn shared() -> Arc<ConversionService> {
        Arc::clone(&SHARED_CONVERSIONS)
    }

    /// Registers (or replaces) the conversion from `from` to `to`.
    pub fn register<F>(&mut self, from: ScalarKind, to: ScalarKind, convert: F) -> &mut Self
    where
        F: Fn(FieldValue) -> Result<FieldValue, ConversionError> + Send + Sync + 'static,
    {
        self.conversions.insert((from, to), Arc::new(convert));
        self
    }

    /// Declares the native type a non-native kind is stored as. Both
    /// directions still need a registered conversion.
    pub fn register_native_target(&mut self, kind: ScalarKind, native: ScalarType) -> &mut Self {
        self.native_targets.insert(kind, native);
        self
    }

    pub fn can_convert(&self, from: ScalarKind, to: ScalarKind) -> bool {
        from == to || self.conversions.contains_key(&(from, to))
    }
}

impl Converter for ConversionService {
    fn native_target(&self, kind: ScalarKind) -> Option<ScalarType> {
        kind.native()
            .or_else(|| self.native_targets.get(&kind).copied())
    }

    fn convert(&self, value: FieldValue, target: ScalarKind) -> Result<FieldValue, ConversionError> {
        if value.is_null() {
            return Ok(value);
        }
        let Some(from) = value.scalar_kind() else {
            return Err(ConversionError::type_mismatch(target, value.describe()));
        };
        if from == target {
            return Ok(value);
        }
        match self.conversions.get(&(from, target)) {
            Some(convert) => convert(value),
            None => Err(ConversionError::no_converter(from, target)),
        }
    }
}

impl fmt::Debug for ConversionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pairs: Vec<String> = self
            .conversions
            .keys()
            .map(|(from, to)| format!("{} -> {}", from, to))
            .collect();
        pairs.sort();
        f.debug_struct("ConversionService")
            .field("conversions", &pairs)
            .field("native_targets", &self.native_targets)
            .finish()
    }
}

fn out_of_range(value: impl fmt::Display, target: ScalarKind) -> ConversionError {
    ConversionError::OutOfRange {
        value: value.to_string(),
        target: target.to_string(),
    }
}

/// `None` when `time` is outside the range `DateTime<Utc>` can hold.
fn system_time_to_timestamp(time: SystemTime) -> Option<DateTime<Utc>> {
    let (secs, nanos) = match time.duration_since(UNIX_EPOCH) {
        Ok(after) => (i64::try_from(after.as_secs()).ok()?, after.subsec_nanos()),
        Err(err) => {
            let before = err.duration();
            let secs = i64::try_from(before.as_secs()).ok()?.checked_neg()?;
            match before.subsec_nanos() {
                0 => (secs, 0),
                nanos => (secs.checked_sub(1)?, 1_000_000_000 - nanos),
            }
        }
    };
    DateTime::from_timestamp(secs, nanos)
}

fn timestamp_to_system_time(ts: DateTime<Utc>) -> Option<SystemTime> {
    let secs = ts.timestamp();
    let nanos = Duration::from_nanos(u64::from(ts.timestamp_subsec_nanos()));
    let whole = Duration::from_secs(secs.unsigned_abs());
    let base = if secs >= 0 {
        UNIX_EPOCH.checked_add(whole)?
    } else {
        UNIX_EPOCH.checked_sub(whole)?
    };
    base.checked_add(nanos)
}

fn parse_error(input: &str, target: ScalarKind, reason: impl fmt::Display) -> ConversionError {
    ConversionError::Parse {
        input: input.to_string(),
        target: target.to_string(),
        reason: reason.to_string(),
    }
}
