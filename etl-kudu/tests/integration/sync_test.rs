use etl_kudu::client::{KuduValue, MemoryKuduCluster};
use etl_kudu::conversions::hash::hash_column_value;
use etl_kudu::conversions::timestamp::sentinel_timestamp;
use etl_kudu::test_utils::event::{
    order_row, orders_event, orders_mapping, user_row, user_rows, users_event, users_mapping,
};
use etl_kudu::test_utils::schema::{
    ORDERS_TABLE, USERS_TABLE, create_orders_table, create_users_table,
};
use etl_kudu::test_utils::template::build_sync_service;
use etl_kudu::types::{EventType, MutationEvent, RowData};
use etl_telemetry::tracing::init_test_tracing;

#[tokio::test]
async fn batches_rows_by_commit_batch() {
    init_test_tracing();

    for (rows, commit_batch) in [(10usize, 3), (9, 3), (1, 5), (7, 1), (0, 4)] {
        let cluster = MemoryKuduCluster::new();
        create_users_table(&cluster);
        let service = build_sync_service(&cluster);
        let mut mapping = users_mapping();
        mapping.commit_batch = commit_batch;

        let event = users_event(EventType::Insert, user_rows(1..=rows as i64));
        service.sync(Some(&mapping), &event).await.unwrap();

        let expected_batches = rows.div_ceil(commit_batch) as u64;
        assert_eq!(
            cluster.sessions_opened(),
            expected_batches,
            "{rows} rows in batches of {commit_batch}"
        );
        assert_eq!(cluster.row_count(USERS_TABLE), rows);
        assert_eq!(cluster.open_sessions(), 0);
    }
}

#[tokio::test]
async fn replays_a_canal_json_event() {
    init_test_tracing();
    let cluster = MemoryKuduCluster::new();
    create_users_table(&cluster);
    let service = build_sync_service(&cluster);

    let event: MutationEvent = serde_json::from_str(
        r#"{
            "type": "insert",
            "database": "test",
            "table": "users",
            "data": [{"ID": "5", "name": "json", "age": "41", "created_at": "0"}],
            "pkNames": ["ID"],
            "isDdl": false,
            "es": 1700000000000,
            "ts": 1700000000123
        }"#,
    )
    .unwrap();
    service.sync(Some(&users_mapping()), &event).await.unwrap();

    let rows = cluster.rows(USERS_TABLE);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("id"), Some(&KuduValue::Int64(5)));
    assert_eq!(rows[0].get("age"), Some(&KuduValue::Int32(41)));
    assert_eq!(
        rows[0].get("created_at"),
        Some(&KuduValue::UnixtimeMicros(
            sentinel_timestamp().timestamp_micros()
        ))
    );
}

#[tokio::test]
async fn upsert_twice_yields_the_same_rows() {
    init_test_tracing();
    let cluster = MemoryKuduCluster::new();
    create_users_table(&cluster);
    let service = build_sync_service(&cluster);
    let mapping = users_mapping();
    let event = users_event(EventType::Update, user_rows(1..=25));

    service.sync(Some(&mapping), &event).await.unwrap();
    let first = cluster.rows(USERS_TABLE);
    service.sync(Some(&mapping), &event).await.unwrap();

    assert_eq!(cluster.rows(USERS_TABLE), first);
    assert_eq!(first.len(), 25);
}

#[tokio::test]
async fn duplicate_insert_and_missing_delete_are_not_retried() {
    init_test_tracing();
    let cluster = MemoryKuduCluster::new();
    create_users_table(&cluster);
    let service = build_sync_service(&cluster);
    let mapping = users_mapping();

    let insert = users_event(EventType::Insert, user_rows(1..=3));
    service.sync(Some(&mapping), &insert).await.unwrap();
    service.sync(Some(&mapping), &insert).await.unwrap();

    let delete = users_event(EventType::Delete, user_rows(10..=12));
    service.sync(Some(&mapping), &delete).await.unwrap();

    assert_eq!(cluster.sessions_opened(), 3);
    assert_eq!(cluster.connect_count(), 1);
    assert_eq!(cluster.row_count(USERS_TABLE), 3);
}

#[tokio::test]
async fn persistent_row_errors_are_absorbed() {
    init_test_tracing();
    let cluster = MemoryKuduCluster::new();
    create_users_table(&cluster);
    cluster.fail_table_writes(USERS_TABLE, u32::MAX);
    let service = build_sync_service(&cluster);

    service
        .sync(
            Some(&users_mapping()),
            &users_event(EventType::Update, user_rows(1..=4)),
        )
        .await
        .unwrap();

    assert_eq!(cluster.sessions_opened(), 31);
    assert_eq!(cluster.connect_count(), 11);
    assert_eq!(cluster.open_sessions(), 0);
    assert_eq!(cluster.row_count(USERS_TABLE), 0);
}

#[tokio::test]
async fn delete_remaps_composite_keys() {
    init_test_tracing();
    let cluster = MemoryKuduCluster::new();
    create_orders_table(&cluster);
    let service = build_sync_service(&cluster);
    let mapping = orders_mapping();

    let rows = vec![order_row(1, "eu"), order_row(1, "us"), order_row(2, "eu")];
    service
        .sync(Some(&mapping), &orders_event(EventType::Insert, rows))
        .await
        .unwrap();

    let deleted = RowData::new()
        .with("orderId", 1i64)
        .with("REGION", "us")
        .with("amount", 1.5);
    service
        .sync(
            Some(&mapping),
            &orders_event(EventType::Delete, vec![deleted]),
        )
        .await
        .unwrap();

    let remaining: Vec<(Option<KuduValue>, Option<KuduValue>)> = cluster
        .rows(ORDERS_TABLE)
        .iter()
        .map(|row| (row.get("order_id").cloned(), row.get("region").cloned()))
        .collect();
    assert_eq!(remaining.len(), 2);
    assert!(!remaining.contains(&(
        Some(KuduValue::Int64(1)),
        Some(KuduValue::String("us".to_string()))
    )));
}

#[tokio::test]
async fn mismatched_source_does_not_touch_the_target() {
    init_test_tracing();
    let cluster = MemoryKuduCluster::new();
    create_users_table(&cluster);
    let service = build_sync_service(&cluster);
    let mapping = users_mapping();

    service
        .sync(
            Some(&mapping),
            &users_event(EventType::Insert, user_rows(1..=2)),
        )
        .await
        .unwrap();
    let before = cluster.rows(USERS_TABLE);

    let mut wrong_table = users_event(EventType::Delete, user_rows(1..=2));
    wrong_table.table = "customers".to_string();
    let mut wrong_database = users_event(EventType::Truncate, Vec::new());
    wrong_database.database = "TEST".to_string();

    service.sync(Some(&mapping), &wrong_table).await.unwrap();
    service.sync(Some(&mapping), &wrong_database).await.unwrap();

    assert_eq!(cluster.rows(USERS_TABLE), before);
}

#[tokio::test]
async fn encrypted_columns_are_hashed_for_writes_and_deletes() {
    init_test_tracing();
    let cluster = MemoryKuduCluster::new();
    create_users_table(&cluster);
    let service = build_sync_service(&cluster);
    let mut mapping = users_mapping();
    mapping.encryption_columns = vec!["PHONE".to_string()];

    service
        .sync(
            Some(&mapping),
            &users_event(EventType::Insert, vec![user_row(7)]),
        )
        .await
        .unwrap();

    let rows = cluster.rows(USERS_TABLE);
    assert_eq!(
        rows[0].get("phone"),
        Some(&KuduValue::String(hash_column_value("555-0007")))
    );
    assert_ne!(
        rows[0].get("phone"),
        Some(&KuduValue::String("555-0007".to_string()))
    );
}

#[tokio::test]
async fn invalid_boolean_stops_filling_the_row() {
    init_test_tracing();
    let cluster = MemoryKuduCluster::new();
    create_users_table(&cluster);
    let service = build_sync_service(&cluster);

    let row = RowData::new()
        .with("id", 1i64)
        .with("name", "partial")
        .with("active", "yes")
        .with("age", "30");
    service
        .sync(
            Some(&users_mapping()),
            &users_event(EventType::Insert, vec![row]),
        )
        .await
        .unwrap();

    let rows = cluster.rows(USERS_TABLE);
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].get("name"),
        Some(&KuduValue::String("partial".to_string()))
    );
    assert_eq!(rows[0].get("active"), None);
    assert_eq!(rows[0].get("age"), None);
}

#[tokio::test]
async fn timestamps_are_truncated_to_seconds() {
    init_test_tracing();
    let cluster = MemoryKuduCluster::new();
    create_users_table(&cluster);
    let service = build_sync_service(&cluster);

    let rows = vec![
        user_row(1).with("created_at", "2024-01-02 03:04:05.999"),
        user_row(2).with("created_at", "2024-01-02 03:04:05"),
        user_row(3).with("created_at", "not-a-date"),
        user_row(4).with("created_at", "0"),
    ];
    service
        .sync(
            Some(&users_mapping()),
            &users_event(EventType::Insert, rows),
        )
        .await
        .unwrap();

    let stored: Vec<Option<KuduValue>> = cluster
        .rows(USERS_TABLE)
        .iter()
        .map(|row| row.get("created_at").cloned())
        .collect();
    let sentinel = Some(KuduValue::UnixtimeMicros(
        sentinel_timestamp().timestamp_micros(),
    ));
    assert_eq!(stored[0], stored[1]);
    assert_eq!(stored[2], sentinel);
    assert_eq!(stored[3], sentinel);
    assert_ne!(stored[0], sentinel);
}
