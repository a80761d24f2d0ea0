use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rowmapper::{
    Bytes, ConversionError, ConversionService, Entity, EntityMapper, MapperConfig, MappingError,
    MutationOp, NativeType, ResultSet, Row, ScalarType, Value, WriteBuilder,
};
use uuid::Uuid;

#[derive(Debug, Default, Clone, PartialEq, Entity)]
#[entity(table = "test_table")]
struct TestEntity {
    #[column(primary_key)]
    id: String,
    #[column(name = "custom_column")]
    string_field: Option<String>,
    boolean_field: bool,
    long_field: i64,
    double_field: f64,
    int_field: i32,
    #[column(inner_type = f64)]
    double_list: Vec<f64>,
    #[column(inner_type = SystemTime)]
    moments: Vec<SystemTime>,
    bytes_field: Bytes,
    date_field: NaiveDate,
    timestamp_field: DateTime<Utc>,
    fixed: [i64; 2],
    #[column(inner_type = bool)]
    bool_list: Vec<bool>,
    #[column(inner_type = i64)]
    long_list: Vec<i64>,
    #[column(inner_type = Bytes)]
    bytes_list: Vec<Bytes>,
    #[column(inner_type = NaiveDate)]
    date_list: Vec<NaiveDate>,
    #[column(inner_type = DateTime<Utc>)]
    timestamp_list: Vec<DateTime<Utc>>,
    int_triple: [i32; 3],
    #[column(inner_type = Uuid)]
    uuid_list: Vec<Uuid>,
    #[column(skip)]
    transient: String,
}

#[derive(Debug, Default, Clone, PartialEq, Entity)]
#[entity(table = "counters")]
struct Counter {
    #[column(primary_key)]
    id: String,
    count: i32,
    #[column(inner_type = String)]
    tags: Vec<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Entity)]
struct LineItem {
    sku: String,
    quantity: i32,
    #[column(inner_type = f64)]
    prices: Vec<f64>,
}

#[derive(Debug, Default, Clone, PartialEq, Entity)]
#[entity(table = "orders")]
struct Order {
    #[column(primary_key)]
    id: String,
    #[column(inner_type = LineItem)]
    items: Vec<LineItem>,
}

#[derive(Debug, Default, Entity)]
#[entity(table = "wrappers")]
struct Wrapper {
    #[column(primary_key)]
    id: String,
    item: LineItem,
}

#[derive(Debug, Default, Entity)]
#[entity(table = "readings")]
struct Readings {
    #[column(primary_key)]
    id: String,
    values: Vec<f64>,
}

#[derive(Debug, Default, Entity)]
#[entity(table = "grids")]
struct Grid {
    #[column(primary_key)]
    id: String,
    #[column(inner_type = Vec<f64>)]
    rows: Vec<Vec<f64>>,
}

#[derive(Debug, Default, Clone, PartialEq, Entity)]
#[entity(table = "sessions")]
struct Session {
    #[column(primary_key)]
    id: Uuid,
    user: String,
    ratio: f32,
    #[column(inner_type = i32)]
    codes: Vec<i32>,
    started: Option<SystemTime>,
}

#[derive(Debug, Default, Clone, PartialEq, Entity)]
#[entity(table = "sensors")]
struct Sensor {
    #[column(primary_key)]
    id: u32,
    level: u8,
    offset: i16,
    small: i8,
    #[column(inner_type = u16)]
    ports: Vec<u16>,
}

#[derive(Debug, Default, Entity)]
#[entity(table = "events")]
struct Event {
    #[column(primary_key)]
    id: String,
    at: Option<SystemTime>,
}

#[derive(Debug, Default, Entity)]
#[entity(table = "tagged")]
struct Tagged {
    #[column(primary_key)]
    id: String,
    #[column(inner_type = f64)]
    tags: Vec<String>,
}

#[derive(Debug, Default, Entity)]
#[entity(table = "aliases")]
struct Aliased {
    #[column(primary_key)]
    id: String,
    #[column(name = "label")]
    first: String,
    #[column(name = "label")]
    second: String,
}

#[derive(Default)]
struct RecordingBuilder {
    bound: Vec<(String, Value)>,
}

impl RecordingBuilder {
    fn columns(&self) -> Vec<&str> {
        self.bound.iter().map(|(column, _)| column.as_str()).collect()
    }

    fn value(&self, column: &str) -> Option<&Value> {
        self.bound
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }
}

impl WriteBuilder for RecordingBuilder {
    fn bind(&mut self, column: &str, value: Value) {
        self.bound.push((column.to_string(), value));
    }
}

fn moment(millis: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_millis(millis)
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

fn instant(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

fn sample_uuid() -> Uuid {
    Uuid::from_u128(0x6f3b_2c1d_0000_4000_8000_0000_0000_0042)
}

fn sample_entity() -> TestEntity {
    TestEntity {
        id: "e1".to_string(),
        string_field: Some("hello".to_string()),
        boolean_field: true,
        long_field: 42,
        double_field: 1.25,
        int_field: 7,
        double_list: vec![1.0, 2.5, -3.0],
        moments: vec![moment(1_000), moment(2_500)],
        bytes_field: Bytes::from(vec![1, 2, 3]),
        date_field: NaiveDate::from_ymd_opt(2024, 5, 17).unwrap(),
        timestamp_field: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        fixed: [10, 20],
        bool_list: vec![true, false, true],
        long_list: vec![i64::MIN, 0, i64::MAX],
        bytes_list: vec![Bytes::from(vec![0xde, 0xad]), Bytes::default()],
        date_list: vec![day(1), day(31)],
        timestamp_list: vec![instant(0), instant(1_700_000_123)],
        int_triple: [1, -2, i32::MAX],
        uuid_list: vec![sample_uuid(), Uuid::nil()],
        transient: "not persisted".to_string(),
    }
}

fn sample_row() -> Row {
    let mapper = EntityMapper::new();
    mapper.insert(&sample_entity()).unwrap().into_row()
}

// ============================================================================
// Write path
// ============================================================================

#[test]
fn test_write_binds_every_persistent_field() {
    let mapper = EntityMapper::new();
    let mut builder = RecordingBuilder::default();
    mapper.write(&sample_entity(), &mut builder).unwrap();

    assert_eq!(
        builder.columns(),
        vec![
            "id",
            "custom_column",
            "boolean_field",
            "long_field",
            "double_field",
            "int_field",
            "double_list",
            "moments",
            "bytes_field",
            "date_field",
            "timestamp_field",
            "fixed",
            "bool_list",
            "long_list",
            "bytes_list",
            "date_list",
            "timestamp_list",
            "int_triple",
            "uuid_list",
        ]
    );
    assert_eq!(builder.value("custom_column"), Some(&Value::string("hello")));
    assert_eq!(builder.value("int_field"), Some(&Value::int64(7)));
    assert_eq!(
        builder.value("double_list"),
        Some(&Value::float64_array([1.0, 2.5, -3.0]))
    );
    assert_eq!(
        builder.value("moments"),
        Some(&Value::timestamp_array([
            DateTime::<Utc>::from(moment(1_000)),
            DateTime::<Utc>::from(moment(2_500)),
        ]))
    );
    assert_eq!(builder.value("fixed"), Some(&Value::int64_array([10, 20])));
    assert!(builder.value("transient").is_none());
}

#[test]
fn test_write_binds_every_native_array_kind() {
    let mapper = EntityMapper::new();
    let mut builder = RecordingBuilder::default();
    mapper.write(&sample_entity(), &mut builder).unwrap();

    assert_eq!(
        builder.value("bool_list"),
        Some(&Value::bool_array([true, false, true]))
    );
    assert_eq!(
        builder.value("long_list"),
        Some(&Value::int64_array([i64::MIN, 0, i64::MAX]))
    );
    assert_eq!(
        builder.value("bytes_list"),
        Some(&Value::bytes_array([
            Bytes::from(vec![0xde, 0xad]),
            Bytes::default()
        ]))
    );
    assert_eq!(
        builder.value("date_list"),
        Some(&Value::date_array([day(1), day(31)]))
    );
    assert_eq!(
        builder.value("timestamp_list"),
        Some(&Value::timestamp_array([instant(0), instant(1_700_000_123)]))
    );
    assert_eq!(
        builder.value("int_triple"),
        Some(&Value::int64_array([1, -2, i64::from(i32::MAX)]))
    );
    assert_eq!(
        builder.value("uuid_list"),
        Some(&Value::string_array([
            sample_uuid().to_string(),
            Uuid::nil().to_string()
        ]))
    );
}

#[test]
fn test_empty_lists_bind_empty_arrays() {
    let mapper = EntityMapper::new();
    let entity = TestEntity {
        bool_list: Vec::new(),
        bytes_list: Vec::new(),
        uuid_list: Vec::new(),
        ..sample_entity()
    };
    let row = mapper.insert(&entity).unwrap().into_row();
    assert_eq!(row.get("bool_list"), Some(&Value::bool_array(Vec::new())));
    assert_eq!(row.get("bytes_list"), Some(&Value::bytes_array(Vec::new())));
    assert_eq!(
        row.get("uuid_list"),
        Some(&Value::string_array(Vec::<String>::new()))
    );

    let back: TestEntity = mapper.read(&row).unwrap();
    assert!(back.bool_list.is_empty());
    assert!(back.bytes_list.is_empty());
    assert!(back.uuid_list.is_empty());
}

#[test]
fn test_none_binds_typed_null() {
    let mapper = EntityMapper::new();
    let entity = TestEntity {
        string_field: None,
        ..sample_entity()
    };
    let mut builder = RecordingBuilder::default();
    mapper.write(&entity, &mut builder).unwrap();

    assert_eq!(
        builder.value("custom_column"),
        Some(&Value::Null(NativeType::Scalar(ScalarType::String)))
    );
}

#[test]
fn test_write_columns_subset() {
    let mapper = EntityMapper::new();
    let entity = sample_entity();

    let mut untouched = RecordingBuilder::default();
    mapper
        .write_columns(&entity, &mut untouched, &["not_a_column"])
        .unwrap();
    assert!(untouched.bound.is_empty());

    let mut partial = RecordingBuilder::default();
    mapper
        .write_columns(&entity, &mut partial, &["long_field", "custom_column"])
        .unwrap();
    assert_eq!(partial.columns(), vec!["custom_column", "long_field"]);
}

#[test]
fn test_counter_round_trip() {
    let mapper = EntityMapper::new();
    let counter = Counter {
        id: "k1".to_string(),
        count: 123,
        tags: vec!["a".to_string(), "b".to_string()],
    };

    let row = mapper.insert(&counter).unwrap().into_row();
    assert_eq!(
        row,
        Row::builder()
            .add("id", Value::string("k1"))
            .add("count", Value::int64(123))
            .add("tags", Value::string_array(["a", "b"]))
            .build()
    );

    let back: Counter = mapper.read(&row).unwrap();
    assert_eq!(back, counter);
}

#[test]
fn test_full_round_trip() {
    let mapper = EntityMapper::new();
    let back: TestEntity = mapper.read(&sample_row()).unwrap();

    let expected = TestEntity {
        transient: String::new(),
        ..sample_entity()
    };
    assert_eq!(back, expected);
}

#[test]
fn test_non_native_types_use_fallback() {
    let mapper = EntityMapper::new();
    let id = Uuid::new_v4();
    let session = Session {
        id,
        user: "alice".to_string(),
        ratio: 0.5,
        codes: vec![1, -2, 3],
        started: None,
    };

    let mutation = mapper.upsert(&session).unwrap();
    assert_eq!(mutation.op(), MutationOp::InsertOrUpdate);
    assert_eq!(mutation.get("id"), Some(&Value::string(id.to_string())));
    assert_eq!(mutation.get("ratio"), Some(&Value::float64(0.5)));
    assert_eq!(mutation.get("codes"), Some(&Value::int64_array([1, -2, 3])));
    assert_eq!(
        mutation.get("started"),
        Some(&Value::Null(NativeType::Scalar(ScalarType::Timestamp)))
    );

    let back: Session = mapper.read(&mutation.into_row()).unwrap();
    assert_eq!(back, session);
}

#[test]
fn test_narrow_integers_round_trip_through_int64() {
    let mapper = EntityMapper::new();
    let sensor = Sensor {
        id: u32::MAX,
        level: 200,
        offset: -300,
        small: i8::MIN,
        ports: vec![80, 443, u16::MAX],
    };

    let row = mapper.insert(&sensor).unwrap().into_row();
    assert_eq!(row.get("id"), Some(&Value::int64(i64::from(u32::MAX))));
    assert_eq!(row.get("small"), Some(&Value::int64(-128)));
    assert_eq!(
        row.get("ports"),
        Some(&Value::int64_array([80, 443, 65_535]))
    );

    let back: Sensor = mapper.read(&row).unwrap();
    assert_eq!(back, sensor);

    let mut negative = row.clone();
    negative.set("level", Value::int64(-1));
    let err = mapper.read::<Sensor>(&negative).unwrap_err();
    assert!(matches!(
        err.as_conversion(),
        Some(ConversionError::OutOfRange { target, .. }) if target == "u8"
    ));
}

#[test]
fn test_system_time_outside_timestamp_range_fails_write() {
    let mapper = EntityMapper::new();
    let event = Event {
        id: "ev1".to_string(),
        at: Some(UNIX_EPOCH + Duration::from_secs(1 << 44)),
    };

    let err = mapper.insert(&event).unwrap_err();
    assert!(err.is_conversion());
    assert!(matches!(
        err.as_conversion(),
        Some(ConversionError::OutOfRange { .. })
    ));

    let before_epoch = Event {
        id: "ev2".to_string(),
        at: Some(UNIX_EPOCH - Duration::from_millis(2_250)),
    };
    let row = mapper.insert(&before_epoch).unwrap().into_row();
    let back: Event = mapper.read(&row).unwrap();
    assert_eq!(back.at, before_epoch.at);
}

// ============================================================================
// Read path
// ============================================================================

#[test]
fn test_read_list_closes_cursor_once() {
    let mapper = EntityMapper::new();
    let mut rs = ResultSet::new(vec![sample_row(), sample_row()]);

    let entities: Vec<TestEntity> = mapper.read_list(&mut rs).unwrap();
    assert_eq!(entities.len(), 2);
    assert_eq!(rs.close_count(), 1);
}

#[test]
fn test_read_list_columns_reads_partial_rows() {
    let mapper = EntityMapper::new();
    let row = Row::builder()
        .add("id", Value::string("p1"))
        .add("long_field", Value::int64(5))
        .build();
    let mut rs = ResultSet::new(vec![row]);

    let entities: Vec<TestEntity> = mapper
        .read_list_columns(&mut rs, &["id", "long_field", "unknown"])
        .unwrap();
    assert_eq!(
        entities,
        vec![TestEntity {
            id: "p1".to_string(),
            long_field: 5,
            ..TestEntity::default()
        }]
    );
    assert!(rs.is_closed());
}

#[test]
fn test_read_columns_leaves_other_fields_default() {
    let mapper = EntityMapper::new();
    let entity: TestEntity = mapper
        .read_columns(
            &sample_row(),
            &["id", "int_field", "date_list", "uuid_list", "unknown"],
        )
        .unwrap();

    assert_eq!(
        entity,
        TestEntity {
            id: "e1".to_string(),
            int_field: 7,
            date_list: vec![day(1), day(31)],
            uuid_list: vec![sample_uuid(), Uuid::nil()],
            ..TestEntity::default()
        }
    );
    assert_eq!(entity.string_field, None);
    assert!(entity.moments.is_empty());
    assert_eq!(entity.int_triple, [0, 0, 0]);

    let sparse = Row::builder().add("long_field", Value::int64(9)).build();
    let entity: TestEntity = mapper.read_columns(&sparse, &["long_field"]).unwrap();
    assert_eq!(entity.long_field, 9);
    assert_eq!(entity.id, "");

    let err = mapper
        .read_columns::<TestEntity>(&sparse, &["long_field", "double_field"])
        .unwrap_err();
    assert!(matches!(
        err.as_mapping(),
        Some(MappingError::ColumnNotFound { column, .. }) if column == "double_field"
    ));
}

#[test]
fn test_missing_column_is_mapping_error() {
    let mapper = EntityMapper::new();
    let row = Row::builder().add("id", Value::string("p1")).build();

    let err = mapper.read::<TestEntity>(&row).unwrap_err();
    assert_eq!(
        err.as_mapping(),
        Some(&MappingError::ColumnNotFound {
            entity: "TestEntity".to_string(),
            column: "custom_column".to_string(),
        })
    );

    let mut rs = ResultSet::new(vec![row]);
    let err = mapper.read_list::<TestEntity, _>(&mut rs).unwrap_err();
    assert!(err.is_mapping());
    assert_eq!(rs.close_count(), 1);
}

#[test]
fn test_explicit_null_column_reads_as_none() {
    let mapper = EntityMapper::new();
    let mut row = sample_row();
    row.set("custom_column", Value::null(NativeType::Scalar(ScalarType::String)));
    row.set("long_field", Value::null(NativeType::Scalar(ScalarType::Int64)));
    row.set("double_list", Value::null(NativeType::Array(ScalarType::Float64)));

    let entity: TestEntity = mapper.read(&row).unwrap();
    assert_eq!(entity.string_field, None);
    assert_eq!(entity.long_field, 0);
    assert!(entity.double_list.is_empty());
}

#[test]
fn test_unconvertible_value_is_conversion_error() {
    let mapper = EntityMapper::new();
    let mut bad = sample_row();
    bad.set("double_field", Value::string("UNCONVERTABLE VALUE"));

    let err = mapper.read::<TestEntity>(&bad).unwrap_err();
    assert!(err.is_conversion());
    assert!(matches!(err.as_conversion(), Some(ConversionError::Parse { .. })));

    let mut rs = ResultSet::new(vec![sample_row(), bad]);
    let err = mapper.read_list::<TestEntity, _>(&mut rs).unwrap_err();
    assert!(err.is_conversion());
    assert_eq!(rs.close_count(), 1);
}

#[test]
fn test_parseable_string_is_coerced() {
    let mapper = EntityMapper::new();
    let mut row = sample_row();
    row.set("double_field", Value::string("2.5"));
    row.set("long_field", Value::string("-17"));

    let entity: TestEntity = mapper.read(&row).unwrap();
    assert_eq!(entity.double_field, 2.5);
    assert_eq!(entity.long_field, -17);
}

#[test]
fn test_shape_mismatch_is_conversion_error() {
    let mapper = EntityMapper::new();

    let mut scalar_for_array = sample_row();
    scalar_for_array.set("fixed", Value::int64(1));
    let err = mapper.read::<TestEntity>(&scalar_for_array).unwrap_err();
    assert!(matches!(
        err.as_conversion(),
        Some(ConversionError::ShapeMismatch { .. })
    ));

    let mut wrong_length = sample_row();
    wrong_length.set("fixed", Value::int64_array([1, 2, 3]));
    let err = mapper.read::<TestEntity>(&wrong_length).unwrap_err();
    assert_eq!(
        err.as_conversion(),
        Some(&ConversionError::LengthMismatch {
            expected: 2,
            actual: 3
        })
    );
}

#[test]
fn test_out_of_range_narrowing_fails() {
    let mapper = EntityMapper::new();
    let mut row = sample_row();
    row.set("int_field", Value::int64(i64::from(i32::MAX) + 1));

    let err = mapper.read::<TestEntity>(&row).unwrap_err();
    assert!(matches!(
        err.as_conversion(),
        Some(ConversionError::OutOfRange { .. })
    ));
}

// ============================================================================
// Nested entities
// ============================================================================

fn order_row() -> Row {
    Row::builder()
        .add("id", Value::string("o1"))
        .add(
            "items",
            Value::struct_array([
                Row::builder()
                    .add("sku", Value::string("apple"))
                    .add("quantity", Value::int64(2))
                    .add("prices", Value::float64_array([1.5, 1.25]))
                    .build(),
                Row::builder()
                    .add("sku", Value::string("pear"))
                    .add("quantity", Value::int64(1))
                    .add("prices", Value::float64_array(Vec::<f64>::new()))
                    .build(),
            ]),
        )
        .build()
}

#[test]
fn test_nested_entities_are_read_recursively() {
    let mapper = EntityMapper::new();
    let order: Order = mapper.read(&order_row()).unwrap();

    assert_eq!(
        order,
        Order {
            id: "o1".to_string(),
            items: vec![
                LineItem {
                    sku: "apple".to_string(),
                    quantity: 2,
                    prices: vec![1.5, 1.25],
                },
                LineItem {
                    sku: "pear".to_string(),
                    quantity: 1,
                    prices: Vec::new(),
                },
            ],
        }
    );
}

#[test]
fn test_nested_row_missing_column_fails() {
    let mapper = EntityMapper::new();
    let row = Row::builder()
        .add("id", Value::string("o1"))
        .add(
            "items",
            Value::struct_array([Row::builder().add("sku", Value::string("apple")).build()]),
        )
        .build();

    let err = mapper.read::<Order>(&row).unwrap_err();
    assert!(matches!(
        err.as_mapping(),
        Some(MappingError::ColumnNotFound { column, .. }) if column == "quantity"
    ));
}

#[test]
fn test_writing_nested_entities_is_unsupported() {
    let mapper = EntityMapper::new();
    let order = Order {
        id: "o1".to_string(),
        items: vec![LineItem::default()],
    };
    let mut builder = RecordingBuilder::default();

    let err = mapper.write(&order, &mut builder).unwrap_err();
    assert_eq!(
        err.as_mapping(),
        Some(&MappingError::UnsupportedElementType {
            entity: "Order".to_string(),
            field: "items".to_string(),
            element: "LineItem".to_string(),
        })
    );
    assert_eq!(builder.columns(), vec!["id"]);
}

#[test]
fn test_nested_entity_field_is_unsupported() {
    let mapper = EntityMapper::new();

    let mut builder = RecordingBuilder::default();
    let err = mapper.write(&Wrapper::default(), &mut builder).unwrap_err();
    assert!(matches!(
        err.as_mapping(),
        Some(MappingError::UnsupportedType { .. })
    ));

    let row = Row::builder()
        .add("id", Value::string("w1"))
        .add("item", Value::struct_array(Vec::<Row>::new()))
        .build();
    let err = mapper.read::<Wrapper>(&row).unwrap_err();
    assert!(matches!(
        err.as_mapping(),
        Some(MappingError::UnsupportedType { .. })
    ));
}

// ============================================================================
// Structural errors
// ============================================================================

#[test]
fn test_collection_without_inner_type_fails_even_when_empty() {
    let mapper = EntityMapper::new();
    let mut builder = RecordingBuilder::default();

    let err = mapper.write(&Readings::default(), &mut builder).unwrap_err();
    assert!(matches!(
        err.as_mapping(),
        Some(MappingError::MissingInnerType { .. })
    ));
}

#[test]
fn test_nested_collections_are_unsupported() {
    let mapper = EntityMapper::new();
    let grid = Grid {
        id: "g1".to_string(),
        rows: vec![vec![1.0]],
    };
    let err = mapper.insert(&grid).unwrap_err();
    assert!(matches!(
        err.as_mapping(),
        Some(MappingError::UnsupportedInnerType { .. })
    ));
}

#[test]
fn test_inner_type_hint_must_match_elements() {
    let mapper = EntityMapper::new();
    let tagged = Tagged {
        id: "t1".to_string(),
        tags: vec!["1.5".to_string(), "2".to_string()],
    };

    let mut builder = RecordingBuilder::default();
    let err = mapper.write(&tagged, &mut builder).unwrap_err();
    assert_eq!(
        err.as_mapping(),
        Some(&MappingError::InnerTypeMismatch {
            entity: "Tagged".to_string(),
            field: "tags".to_string(),
            inner: "f64".to_string(),
            element: "String".to_string(),
        })
    );
    assert_eq!(builder.columns(), vec!["id"]);

    let row = Row::builder()
        .add("id", Value::string("t1"))
        .add("tags", Value::float64_array([1.5, 2.0]))
        .build();
    let err = mapper.read::<Tagged>(&row).unwrap_err();
    assert!(matches!(
        err.as_mapping(),
        Some(MappingError::InnerTypeMismatch { .. })
    ));
}

#[test]
fn test_embedded_type_is_not_a_table() {
    let mapper = EntityMapper::new();
    let err = mapper.insert(&LineItem::default()).unwrap_err();
    assert_eq!(
        err.as_mapping(),
        Some(&MappingError::MissingTable("LineItem".to_string()))
    );
}

#[test]
fn test_duplicate_columns_rejected() {
    let mapper = EntityMapper::new();
    let err = mapper.insert(&Aliased::default()).unwrap_err();
    assert!(matches!(
        err.as_mapping(),
        Some(MappingError::DuplicateColumn { column, .. }) if column == "label"
    ));
}

#[test]
fn test_empty_conversion_service_disables_fallback() {
    let mapper = EntityMapper::new().with_converter(Arc::new(ConversionService::empty()));

    let err = mapper.insert(&Session::default()).unwrap_err();
    assert!(matches!(
        err.as_mapping(),
        Some(MappingError::UnsupportedType { field, .. }) if field == "id"
    ));

    let counter = Counter {
        id: "k1".to_string(),
        count: 1,
        tags: Vec::new(),
    };
    let err = mapper.insert(&counter).unwrap_err();
    assert!(matches!(
        err.as_mapping(),
        Some(MappingError::UnsupportedType { field, .. }) if field == "count"
    ));
}

// ============================================================================
// Mutations
// ============================================================================

#[test]
fn test_mutation_kinds() {
    let mapper = EntityMapper::new();
    let entity = sample_entity();

    let insert = mapper.insert(&entity).unwrap();
    assert_eq!(insert.op(), MutationOp::Insert);
    assert_eq!(insert.table(), "test_table");
    assert_eq!(insert.values().len(), 19);

    assert_eq!(mapper.update(&entity).unwrap().op(), MutationOp::Update);
    assert_eq!(mapper.replace(&entity).unwrap().op(), MutationOp::Replace);

    let update = mapper.update_columns(&entity, &["long_field"]).unwrap();
    assert_eq!(update.columns().collect::<Vec<_>>(), vec!["id", "long_field"]);
}

#[test]
fn test_delete_carries_only_primary_key() {
    let mapper = EntityMapper::new();
    let delete = mapper.delete(&sample_entity()).unwrap();

    assert_eq!(delete.op(), MutationOp::Delete);
    assert_eq!(delete.columns().collect::<Vec<_>>(), vec!["id"]);
    assert_eq!(delete.get("id"), Some(&Value::string("e1")));
    assert_eq!(
        mapper.primary_key_value(&sample_entity()).unwrap(),
        Value::string("e1")
    );
}

// ============================================================================
// Metadata cache and sharing
// ============================================================================

#[test]
fn test_metadata_cache() {
    let mapper = EntityMapper::new();
    assert_eq!(mapper.context().cached_types(), 0);

    mapper.insert(&sample_entity()).unwrap();
    mapper.insert(&sample_entity()).unwrap();
    assert_eq!(mapper.context().cached_types(), 1);

    let _: Order = mapper.read(&order_row()).unwrap();
    assert_eq!(mapper.context().cached_types(), 3);

    mapper.context().clear();
    assert_eq!(mapper.context().cached_types(), 0);

    let uncached = EntityMapper::with_config(MapperConfig::new().cache_metadata(false));
    uncached.insert(&sample_entity()).unwrap();
    assert_eq!(uncached.context().cached_types(), 0);
}

#[test]
fn test_metadata_in_declaration_order() {
    let metadata = TestEntity::entity_metadata();
    assert_eq!(metadata.table_name(), Some("test_table"));
    assert_eq!(metadata.primary_key().map(|field| field.name()), Some("id"));
    assert!(metadata.field("transient").is_none());
    assert_eq!(
        metadata.field("string_field").map(|field| field.column_name()),
        Some("custom_column")
    );
    assert_eq!(metadata.fields().len(), 19);
}

#[test]
fn test_mapper_is_shared_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<EntityMapper>();

    let mapper = EntityMapper::new();
    let row = sample_row();
    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                let entity: TestEntity = mapper.read(&row).unwrap();
                assert_eq!(entity.id, "e1");
            });
        }
    });
    assert_eq!(mapper.context().cached_types(), 1);
}
