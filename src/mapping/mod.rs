pub mod binding;
pub mod config;
pub mod context;
pub mod convert;
pub mod field;
pub mod mapper;
pub mod metadata;
pub mod reader;
pub mod writer;

pub use binding::BindingKind;
pub use config::MapperConfig;
pub use context::MappingContext;
pub use convert::{ConversionService, Converter};
pub use field::{
    DeclaredType, EntityDescriptor, FieldCodec, FieldValue, InnerType, ScalarKind,
    entity_from_field_value,
};
pub use mapper::EntityMapper;
pub use metadata::{Entity, EntityMetadata, EntityMetadataBuilder, PersistentField};
pub use reader::EntityReader;
pub use writer::EntityWriter;
