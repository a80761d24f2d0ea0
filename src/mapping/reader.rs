use std::collections::HashSet;

use log::warn;
use tracing::{debug, debug_span, trace};

use crate::core::cursor::{CursorGuard, RowCursor};
use crate::core::error::{MappingError, Result};
use crate::core::row::Row;
use crate::mapping::binding::{self, resolve_binding};
use crate::mapping::config::MapperConfig;
use crate::mapping::context::MappingContext;
use crate::mapping::convert::Converter;
use crate::mapping::field::entity_type_name;
use crate::mapping::metadata::{Entity, EntityMetadata};

/// Read path: rows into entity instances.
pub struct EntityReader<'a> {
    context: &'a MappingContext,
    converter: &'a dyn Converter,
    config: &'a MapperConfig,
}

impl<'a> EntityReader<'a> {
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

    pub fn converter(&self) -> &'a dyn Converter {
        self.converter
    }

    /// Reads one row. With `columns`, only the listed columns are read and the
    /// remaining fields keep their default value.
    pub fn read<E: Entity>(&self, row: &Row, columns: Option<&HashSet<String>>) -> Result<E> {
        let metadata = self.context.resolve::<E>()?;
        self.warn_unmapped(&metadata, columns);
        self.read_with(&metadata, row, columns)
    }

    /// Reads every remaining row of `cursor`. The cursor is closed when this
    /// returns, on success or failure.
    pub fn read_list<E, C>(&self, cursor: &mut C, columns: Option<&HashSet<String>>) -> Result<Vec<E>>
    where
        E: Entity,
        C: RowCursor + ?Sized,
    {
        let mut cursor = CursorGuard::new(cursor);
        let span = debug_span!("rowmapper.read_list", entity = entity_type_name::<E>());
        let _enter = span.enter();

        let metadata = self.context.resolve::<E>()?;
        self.warn_unmapped(&metadata, columns);
        let mut entities = Vec::new();
        while cursor.advance() {
            let Some(row) = cursor.current() else {
                break;
            };
            entities.push(self.read_with(&metadata, row, columns)?);
        }

        debug!(rows = entities.len(), "read entity list");
        Ok(entities)
    }

    /// Reads a nested element: all columns, no table or key required.
    pub(crate) fn read_embedded<E: Entity>(&self, row: &Row) -> Result<E> {
        let metadata = self.context.resolve_embedded::<E>()?;
        self.read_with(&metadata, row, None)
    }

    fn read_with<E: Entity>(
        &self,
        metadata: &EntityMetadata,
        row: &Row,
        columns: Option<&HashSet<String>>,
    ) -> Result<E> {
        let entity_name = metadata.type_name();
        let mut entity = E::default();
        for field in metadata.fields() {
            let column = field.column_name();
            if columns.is_some_and(|columns| !columns.contains(column)) {
                continue;
            }

            let Some(value) = row.get(column) else {
                return Err(MappingError::ColumnNotFound {
                    entity: entity_name.to_string(),
                    column: column.to_string(),
                }
                .into());
            };

            let kind = resolve_binding(entity_name, field, self.converter)?;
            let field_value = binding::extract(&kind, value, self)?;
            entity.write_field(field.name(), field_value)?;
        }

        trace!(entity = entity_name, "read entity");
        Ok(entity)
    }

    fn warn_unmapped(&self, metadata: &EntityMetadata, columns: Option<&HashSet<String>>) {
        if let Some(columns) = columns {
            warn_unknown_columns(self.config, metadata, columns);
        }
    }
}

/// Logs each subset column no field of `metadata` maps to, once per call.
pub(crate) fn warn_unknown_columns(
    config: &MapperConfig,
    metadata: &EntityMetadata,
    columns: &HashSet<String>,
) {
    if !config.warn_on_unknown_columns {
        return;
    }
    for column in metadata.unmapped_columns(columns) {
        warn!(
            "column '{}' is not mapped by {}; ignoring",
            column,
            metadata.type_name()
        );
    }
}
