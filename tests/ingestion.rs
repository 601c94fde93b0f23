use fluent_dataset::ingestion::csv::read_csv_path;
use fluent_dataset::ingestion::json::{parse_json_str, read_json_path};
use fluent_dataset::{read_records, read_schema, Aggregate, DataType, Dataset, Field, IngestionFormat, IngestionOptions, Schema};
use serde_json::json;

fn people_schema_nested() -> Schema {
    Schema::new(vec![
        Field::new("id", DataType::Int64),
        Field::new("user.name", DataType::Utf8),
        Field::new("score", DataType::Float64),
        Field::new("active", DataType::Bool),
    ])
}

#[test]
fn read_json_array_from_path_happy_path() {
    let records = read_json_path("tests/fixtures/people.json", Some(&people_schema_nested())).unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0]["id"], json!(1));
    assert_eq!(records[1]["user"]["name"], json!("Grace"));
}

#[test]
fn ndjson_and_json_fixtures_load_the_same_records() {
    let opts = IngestionOptions::default();
    let from_array = read_records("tests/fixtures/people.json", &opts).unwrap();
    let from_lines = read_records("tests/fixtures/people.ndjson", &opts).unwrap();
    assert_eq!(from_array, from_lines);
}

#[test]
fn json_errors_on_missing_field_and_type_mismatch() {
    let schema = people_schema_nested();
    let input = r#"[{"id":1,"user":{"name":"Ada"},"score":98.5}]"#;
    let msg = parse_json_str(input, Some(&schema)).unwrap_err().to_string();
    assert!(msg.contains("schema mismatch"));
    assert!(msg.contains("missing required field 'active'"));

    let input = r#"[{"id":"nope","user":{"name":"Ada"},"score":98.5,"active":true}]"#;
    let msg = parse_json_str(input, Some(&schema)).unwrap_err().to_string();
    assert!(msg.contains("failed to parse value"));
    assert!(msg.contains("column 'id'"));
}

#[test]
fn csv_with_schema_types_columns() {
    let schema = Schema::new(vec![
        Field::new("id", DataType::Int64),
        Field::new("score", DataType::Float64),
        Field::new("active", DataType::Bool),
    ]);
    let records = read_csv_path("tests/fixtures/people.csv", Some(&schema)).unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(
        records[2],
        json!({"id": 3, "name": "Linus", "dept": "ops", "score": 71.0, "active": true})
    );
}

#[test]
fn schema_file_types_csv_columns() {
    let schema = read_schema("tests/fixtures/people.schema.json").unwrap();
    assert_eq!(
        schema,
        Schema::new(vec![
            Field::new("id", DataType::Int64),
            Field::new("score", DataType::Float64),
            Field::new("active", DataType::Bool),
        ])
    );

    let opts = IngestionOptions::default().with_schema(schema);
    let records = read_records("tests/fixtures/people.csv", &opts).unwrap();
    assert_eq!(records[2]["score"], json!(71.0));
    assert_eq!(records[2]["active"], json!(true));
    assert!(read_schema("tests/fixtures/people.csv").is_err());
}

#[test]
fn forced_format_overrides_extension() {
    let opts = IngestionOptions::default().with_format(IngestionFormat::Json);
    let records = read_records("tests/fixtures/people.ndjson", &opts).unwrap();
    assert_eq!(records.len(), 3);

    let opts = IngestionOptions::default().with_format(IngestionFormat::Csv);
    assert!(read_records("tests/fixtures/does_not_exist.txt", &opts).is_err());
}

#[test]
fn dataset_from_path_feeds_a_pipeline() {
    let mut customers = Dataset::from_path("tests/fixtures/people.csv", &IngestionOptions::default()).unwrap();
    let orders = Dataset::from_path("tests/fixtures/orders.csv", &IngestionOptions::default()).unwrap();

    customers
        .merge(
            orders,
            fluent_dataset::KeySelectors::on([("id", "customer_id")]),
            fluent_dataset::MergeOptions::default(),
        )
        .unwrap()
        .group(|r| r["name"].clone())
        .reduce(Aggregate::new().first("name", "name").sum("spent", "total").count("orders"))
        .unwrap();

    assert_eq!(
        customers.get().unwrap(),
        json!([
            {"name": "Ada", "spent": 30, "orders": 2},
            {"name": "Grace", "spent": 10, "orders": 1},
        ])
    );
}
