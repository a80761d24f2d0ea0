// ============================================================================
// rowmapper Library
// ============================================================================

//! Entity <-> row mapping for a columnar store.
//!
//! Entity types derive [`Entity`], which generates their field accessor table
//! and metadata. An [`EntityMapper`] then writes entities into any
//! [`WriteBuilder`] (such as a [`Mutation`]) and reads them back from a
//! [`Row`] or a [`RowCursor`]. Field types the store has no native binding for
//! (`i32` and narrower integers, `f32`, `Uuid`, `SystemTime`) go through a
//! [`Converter`].
//!
//! # Examples
//!
//! ```
//! use rowmapper::{Entity, EntityMapper};
//!
//! #[derive(Debug, Default, PartialEq, Entity)]
//! #[entity(table = "counters")]
//! struct Counter {
//!     #[column(primary_key)]
//!     id: String,
//!     count: i32,
//!     #[column(inner_type = String)]
//!     tags: Vec<String>,
//! }
//!
//! # fn main() -> rowmapper::Result<()> {
//! let mapper = EntityMapper::new();
//! let counter = Counter {
//!     id: "k1".to_string(),
//!     count: 123,
//!     tags: vec!["a".to_string(), "b".to_string()],
//! };
//!
//! let mutation = mapper.insert(&counter)?;
//! assert_eq!(mutation.table(), "counters");
//!
//! let back: Counter = mapper.read(&mutation.into_row())?;
//! assert_eq!(back, counter);
//! # Ok(())
//! # }
//! ```

extern crate self as rowmapper;

pub mod core;
pub mod mapping;
pub mod prelude;
pub mod write;

// Re-export main types for convenience
pub use crate::core::{
    ConversionError, Error, MappingError, Result,
    cursor::{ResultSet, RowCursor},
    row::{Row, RowBuilder},
    value::{Bytes, NativeType, ScalarArray, ScalarType, Value},
};

pub use mapping::{
    BindingKind, ConversionService, Converter, DeclaredType, Entity, EntityDescriptor,
    EntityMapper, EntityMetadata, EntityReader, EntityWriter, FieldCodec, FieldValue, InnerType,
    MapperConfig, MappingContext, PersistentField, ScalarKind, entity_from_field_value,
};

pub use write::{Mutation, MutationOp, ValueBinder, WriteBuilder};

// Derive macro; shares the trait's name the way serde does.
pub use rowmapper_derive::Entity;
