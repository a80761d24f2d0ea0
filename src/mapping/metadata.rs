use std::collections::HashSet;

use crate::core::error::{MappingError, Result};
use crate::mapping::field::{DeclaredType, FieldCodec, FieldValue, InnerType};

/// A mapped record type.
///
/// Usually derived with `#[derive(Entity)]`; the generated impl is the field
/// accessor table the mapper uses instead of reflection.
pub trait Entity: Default + Send + 'static {
    /// Table name, fields, column names, primary key and inner-type hints.
    fn entity_metadata() -> EntityMetadata;

    /// Current value of the field named `field`; `None` if there is no such field.
    fn read_field(&self, field: &str) -> Option<FieldValue>;

    /// Assigns the field named `field`.
    fn write_field(&mut self, field: &str, value: FieldValue) -> Result<()>;
}

/// One persistent field of an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistentField {
    name: &'static str,
    column_name: String,
    declared_type: DeclaredType,
    element_type: Option<InnerType>,
    inner_type: Option<InnerType>,
    primary_key: bool,
}

impl PersistentField {
    pub fn new(name: &'static str, declared_type: DeclaredType) -> Self {
        Self {
            name,
            column_name: name.to_string(),
            declared_type,
            element_type: None,
            inner_type: None,
            primary_key: false,
        }
    }

    /// Field whose declared type comes from its Rust type.
    pub fn of<T: FieldCodec>(name: &'static str) -> Self {
        Self {
            element_type: T::element_type(),
            ..Self::new(name, T::declared_type())
        }
    }

    /// Overrides the column name. An empty name keeps the field name.
    pub fn column(mut self, column_name: &str) -> Self {
        if !column_name.is_empty() {
            self.column_name = column_name.to_string();
        }
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn inner_type(mut self, inner_type: InnerType) -> Self {
        self.inner_type = Some(inner_type);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn column_name(&self) -> &str {
        &self.column_name
    }

    pub fn declared_type(&self) -> DeclaredType {
        self.declared_type
    }

    /// The inner-type hint.
    pub fn inner(&self) -> Option<InnerType> {
        self.inner_type
    }

    /// Element type of the Rust collection, when known.
    pub fn element_type(&self) -> Option<InnerType> {
        self.element_type
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }
}

/// Immutable mapping description of one entity type.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityMetadata {
    type_name: &'static str,
    table_name: Option<String>,
    fields: Vec<PersistentField>,
}

impl EntityMetadata {
    pub fn builder(type_name: &'static str) -> EntityMetadataBuilder {
        EntityMetadataBuilder {
            metadata: EntityMetadata {
                type_name,
                table_name: None,
                fields: Vec::new(),
            },
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn table_name(&self) -> Option<&str> {
        self.table_name.as_deref()
    }

    /// Persistent fields in declaration order.
    pub fn fields(&self) -> &[PersistentField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&PersistentField> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn field_by_column(&self, column: &str) -> Option<&PersistentField> {
        self.fields.iter().find(|field| field.column_name == column)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.column_name())
    }

    /// Names in `columns` that no field maps to, sorted.
    pub fn unmapped_columns<'c>(&self, columns: &'c HashSet<String>) -> Vec<&'c str> {
        let mut unmapped: Vec<&str> = columns
            .iter()
            .map(String::as_str)
            .filter(|column| self.field_by_column(column).is_none())
            .collect();
        unmapped.sort_unstable();
        unmapped
    }

    pub fn primary_key(&self) -> Option<&PersistentField> {
        self.fields.iter().find(|field| field.primary_key)
    }

    /// Checks the invariants of a top-level entity: a table, exactly one
    /// primary key, at least one field, unique column names.
    pub fn validate(&self) -> std::result::Result<(), MappingError> {
        self.validate_embedded()?;

        if self.table_name.as_deref().is_none_or(str::is_empty) {
            return Err(MappingError::MissingTable(self.type_name.to_string()));
        }

        let keys: Vec<String> = self
            .fields
            .iter()
            .filter(|field| field.primary_key)
            .map(|field| field.name.to_string())
            .collect();
        match keys.len() {
            0 => Err(MappingError::MissingPrimaryKey(self.type_name.to_string())),
            1 => Ok(()),
            _ => Err(MappingError::MultiplePrimaryKeys {
                entity: self.type_name.to_string(),
                fields: keys,
            }),
        }
    }

    /// Checks the invariants of a type used only as a nested element: at
    /// least one field and unique column names.
    pub fn validate_embedded(&self) -> std::result::Result<(), MappingError> {
        if self.fields.is_empty() {
            return Err(MappingError::NoFields(self.type_name.to_string()));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.column_name.as_str()) {
                return Err(MappingError::DuplicateColumn {
                    entity: self.type_name.to_string(),
                    column: field.column_name.clone(),
                });
            }
        }
        Ok(())
    }
}

pub struct EntityMetadataBuilder {
    metadata: EntityMetadata,
}

impl EntityMetadataBuilder {
    pub fn table(mut self, table_name: impl Into<String>) -> Self {
        self.metadata.table_name = Some(table_name.into());
        self
    }

    pub fn field(mut self, field: PersistentField) -> Self {
        self.metadata.fields.push(field);
        self
    }

    pub fn build(self) -> EntityMetadata {
        self.metadata
    }
}
