pub mod cursor;
pub mod error;
pub mod row;
pub mod value;

pub use cursor::{ResultSet, RowCursor};
pub use error::{ConversionError, Error, MappingError, Result};
pub use row::{Row, RowBuilder};
pub use value::{Bytes, NativeType, ScalarArray, ScalarType, Value};
