use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::core::cursor::RowCursor;
use crate::core::error::{MappingError, Result};
use crate::core::row::Row;
use crate::core::value::Value;
use crate::mapping::config::MapperConfig;
use crate::mapping::context::MappingContext;
use crate::mapping::convert::{ConversionService, Converter};
use crate::mapping::field::entity_type_name;
use crate::mapping::metadata::Entity;
use crate::mapping::reader::EntityReader;
use crate::mapping::writer::EntityWriter;
use crate::write::binder::WriteBuilder;
use crate::write::mutation::{Mutation, MutationOp};

/// Entry point of the mapper.
///
/// Owns the metadata cache, the converter used for non-native types and the
/// configuration. Cheap to share between threads behind an `Arc`.
///
/// ```ignore
/// let mapper = EntityMapper::new();
/// let mutation = mapper.insert(&user)?;
/// let user: User = mapper.read(&mutation.into_row())?;
/// ```
pub struct EntityMapper {
    context: MappingContext,
    converter: Arc<dyn Converter>,
    config: MapperConfig,
}

impl EntityMapper {
    pub fn new() -> Self {
        Self::with_config(MapperConfig::default())
    }

    pub fn with_config(config: MapperConfig) -> Self {
        let converter: Arc<dyn Converter> = ConversionService::shared();
        Self {
            context: MappingContext::with_cache(config.cache_metadata),
            converter,
            config,
        }
    }

    /// Replaces the conversion fallback.
    pub fn with_converter(mut self, converter: Arc<dyn Converter>) -> Self {
        self.converter = converter;
        self
    }

    pub fn context(&self) -> &MappingContext {
        &self.context
    }

    pub fn converter(&self) -> &dyn Converter {
        self.converter.as_ref()
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    pub fn reader(&self) -> EntityReader<'_> {
        EntityReader::new(&self.context, self.converter.as_ref(), &self.config)
    }

    pub fn writer(&self) -> EntityWriter<'_> {
        EntityWriter::new(&self.context, self.converter.as_ref(), &self.config)
    }

    // --- write ---

    pub fn write<E: Entity, B: WriteBuilder>(&self, entity: &E, builder: &mut B) -> Result<()> {
        self.writer().write(entity, builder, None)
    }

    /// Writes only the fields whose column is listed. Unknown names are ignored.
    pub fn write_columns<E: Entity, B: WriteBuilder>(
        &self,
        entity: &E,
        builder: &mut B,
        columns: &[&str],
    ) -> Result<()> {
        self.writer().write(entity, builder, Some(&column_set(columns)))
    }

    // --- read ---

    pub fn read<E: Entity>(&self, row: &Row) -> Result<E> {
        self.reader().read(row, None)
    }

    /// Reads only the listed columns; other fields keep their default value.
    pub fn read_columns<E: Entity>(&self, row: &Row, columns: &[&str]) -> Result<E> {
        self.reader().read(row, Some(&column_set(columns)))
    }

    /// Drains `cursor` into entities and closes it.
    pub fn read_list<E: Entity, C: RowCursor + ?Sized>(&self, cursor: &mut C) -> Result<Vec<E>> {
        self.reader().read_list(cursor, None)
    }

    pub fn read_list_columns<E: Entity, C: RowCursor + ?Sized>(
        &self,
        cursor: &mut C,
        columns: &[&str],
    ) -> Result<Vec<E>> {
        self.reader().read_list(cursor, Some(&column_set(columns)))
    }

    // --- mutations ---

    /// Builds a mutation of kind `op` against the entity's table.
    pub fn mutation<E: Entity>(
        &self,
        op: MutationOp,
        entity: &E,
        columns: Option<&[&str]>,
    ) -> Result<Mutation> {
        let metadata = self.context.resolve::<E>()?;
        let mut mutation = Mutation::new(op, metadata.table_name().unwrap_or_default());
        let columns = columns.map(column_set);
        self.writer().write(entity, &mut mutation, columns.as_ref())?;
        debug!(
            entity = metadata.type_name(),
            table = mutation.table(),
            %op,
            columns = mutation.values().len(),
            "built mutation"
        );
        Ok(mutation)
    }

    pub fn insert<E: Entity>(&self, entity: &E) -> Result<Mutation> {
        self.mutation(MutationOp::Insert, entity, None)
    }

    pub fn update<E: Entity>(&self, entity: &E) -> Result<Mutation> {
        self.mutation(MutationOp::Update, entity, None)
    }

    /// Update of the listed columns. The primary key column is always included.
    pub fn update_columns<E: Entity>(&self, entity: &E, columns: &[&str]) -> Result<Mutation> {
        let key = self.primary_key_column::<E>()?;
        let mut with_key: Vec<&str> = columns.to_vec();
        with_key.push(&key);
        self.mutation(MutationOp::Update, entity, Some(with_key.as_slice()))
    }

    pub fn upsert<E: Entity>(&self, entity: &E) -> Result<Mutation> {
        self.mutation(MutationOp::InsertOrUpdate, entity, None)
    }

    pub fn replace<E: Entity>(&self, entity: &E) -> Result<Mutation> {
        self.mutation(MutationOp::Replace, entity, None)
    }

    /// Delete mutation carrying only the primary key column.
    pub fn delete<E: Entity>(&self, entity: &E) -> Result<Mutation> {
        let key = self.primary_key_column::<E>()?;
        let key_only = [key.as_str()];
        self.mutation(MutationOp::Delete, entity, Some(&key_only[..]))
    }

    /// Native value of the entity's primary key.
    pub fn primary_key_value<E: Entity>(&self, entity: &E) -> Result<Value> {
        let key = self.primary_key_column::<E>()?;
        let mutation = self.delete(entity)?;
        mutation.get(&key).cloned().ok_or_else(|| {
            MappingError::ColumnNotFound {
                entity: entity_type_name::<E>().to_string(),
                column: key.clone(),
            }
            .into()
        })
    }

    fn primary_key_column<E: Entity>(&self) -> Result<String> {
        let metadata = self.context.resolve::<E>()?;
        metadata
            .primary_key()
            .map(|field| field.column_name().to_string())
            .ok_or_else(|| MappingError::MissingPrimaryKey(metadata.type_name().to_string()).into())
    }
}

impl Default for EntityMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EntityMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityMapper")
            .field("context", &self.context)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn column_set(columns: &[&str]) -> HashSet<String> {
    columns.iter().map(|column| column.to_string()).collect()
}
