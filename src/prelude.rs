//! Everything an application mapping its own types usually needs.
//!
//! ```
//! use rowmapper::prelude::*;
//! ```

pub use crate::{
    Entity, EntityMapper, Error, FieldCodec, MapperConfig, Mutation, MutationOp, Result, Row,
    RowCursor, Value, WriteBuilder,
};
