use std::collections::HashSet;

use tracing::trace;

use crate::core::error::{MappingError, Result};
use crate::mapping::binding::{self, resolve_binding};
use crate::mapping::config::MapperConfig;
use crate::mapping::context::MappingContext;
use crate::mapping::convert::Converter;
use crate::mapping::metadata::Entity;
use crate::mapping::reader::warn_unknown_columns;
use crate::write::binder::WriteBuilder;

/// Write path: entity fields into a row builder.
pub struct EntityWriter<'a> {
    context: &'a MappingContext,
    converter: &'a dyn Converter,
    config: &'a MapperConfig,
}

impl<'a> EntityWriter<'a> {
    pub fn new(
        context: &'a MappingContext,
        converter: &'a dyn Converter,
        config: &'a MapperConfig,
    ) -> Self {
        Self {
            context,
            converter,
            config,
        }
    }

    /// Binds every persistent field of `entity` (or only those whose column is
    /// in `columns`) on `builder`.
    ///
    /// The builder is the only thing mutated. A failure part-way leaves the
    /// columns bound so far in place.
    pub fn write<E, B>(
        &self,
        entity: &E,
        builder: &mut B,
        columns: Option<&HashSet<String>>,
    ) -> Result<()>
    where
        E: Entity,
        B: WriteBuilder,
    {
        let metadata = self.context.resolve::<E>()?;
        let entity_name = metadata.type_name();

        if let Some(columns) = columns {
            warn_unknown_columns(self.config, &metadata, columns);
        }

        let mut bound = 0usize;
        for field in metadata.fields() {
            let column = field.column_name();
            if columns.is_some_and(|columns| !columns.contains(column)) {
                continue;
            }

            let kind = resolve_binding(entity_name, field, self.converter)?;
            binding::check_writable(entity_name, field, &kind)?;

            let value = entity
                .read_field(field.name())
                .ok_or_else(|| MappingError::UnknownField {
                    entity: entity_name.to_string(),
                    field: field.name().to_string(),
                })?;
            binding::bind(builder.set(column), entity_name, field, &kind, value, self.converter)?;
            bound += 1;
        }

        trace!(entity = entity_name, columns = bound, "wrote entity");
        Ok(())
    }
}
