use chrono::{DateTime, NaiveDate, Utc};

use crate::core::value::{Bytes, NativeType, ScalarType, Value};

/// Per-write sink of column values.
///
/// Implementors only need `bind`; `set` hands out the typed, column-scoped
/// binder the mapper talks to.
pub trait WriteBuilder {
    fn bind(&mut self, column: &str, value: Value);

    fn set(&mut self, column: &str) -> ValueBinder<'_>
    where
        Self: Sized,
    {
        ValueBinder::new(self, column)
    }
}

/// Binds one column. Every `to_*` call takes an `Option`; `None` binds the
/// null of that column type.
pub struct ValueBinder<'a> {
    builder: &'a mut dyn WriteBuilder,
    column: String,
}

impl<'a> ValueBinder<'a> {
    pub fn new(builder: &'a mut dyn WriteBuilder, column: &str) -> Self {
        Self {
            builder,
            column: column.to_string(),
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn to_value(self, value: Value) {
        self.builder.bind(&self.column, value);
    }

    pub fn to_null(self, ty: NativeType) {
        self.to_value(Value::Null(ty));
    }

    pub fn to_bool(self, value: Option<bool>) {
        self.scalar(ScalarType::Bool, value.map(Value::Bool));
    }

    pub fn to_int64(self, value: Option<i64>) {
        self.scalar(ScalarType::Int64, value.map(Value::Int64));
    }

    pub fn to_float64(self, value: Option<f64>) {
        self.scalar(ScalarType::Float64, value.map(Value::Float64));
    }

    pub fn to_string(self, value: Option<String>) {
        self.scalar(ScalarType::String, value.map(Value::String));
    }

    pub fn to_bytes(self, value: Option<Bytes>) {
        self.scalar(ScalarType::Bytes, value.map(Value::Bytes));
    }

    pub fn to_date(self, value: Option<NaiveDate>) {
        self.scalar(ScalarType::Date, value.map(Value::Date));
    }

    pub fn to_timestamp(self, value: Option<DateTime<Utc>>) {
        self.scalar(ScalarType::Timestamp, value.map(Value::Timestamp));
    }

    pub fn to_bool_array(self, values: Option<Vec<bool>>) {
        self.array(ScalarType::Bool, values.map(|values| Value::bool_array(values)));
    }

    pub fn to_int64_array(self, values: Option<Vec<i64>>) {
        self.array(ScalarType::Int64, values.map(|values| Value::int64_array(values)));
    }

    pub fn to_float64_array(self, values: Option<Vec<f64>>) {
        self.array(ScalarType::Float64, values.map(|values| Value::float64_array(values)));
    }

    pub fn to_string_array(self, values: Option<Vec<String>>) {
        self.array(ScalarType::String, values.map(|values| Value::string_array(values)));
    }

    pub fn to_bytes_array(self, values: Option<Vec<Bytes>>) {
        self.array(ScalarType::Bytes, values.map(|values| Value::bytes_array(values)));
    }

    pub fn to_date_array(self, values: Option<Vec<NaiveDate>>) {
        self.array(ScalarType::Date, values.map(|values| Value::date_array(values)));
    }

    pub fn to_timestamp_array(self, values: Option<Vec<DateTime<Utc>>>) {
        self.array(ScalarType::Timestamp, values.map(|values| Value::timestamp_array(values)));
    }

    fn scalar(self, ty: ScalarType, value: Option<Value>) {
        let value = value.unwrap_or(Value::Null(NativeType::Scalar(ty)));
        self.to_value(value);
    }

    fn array(self, ty: ScalarType, value: Option<Value>) {
        let value = value.unwrap_or(Value::Null(NativeType::Array(ty)));
        self.to_value(value);
    }
}
