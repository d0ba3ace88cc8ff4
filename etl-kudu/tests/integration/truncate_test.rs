use etl_kudu::client::MemoryKuduCluster;
use etl_kudu::error::ErrorKind;
use etl_kudu::template::TRUNCATE_BACKUP_SUFFIX;
use etl_kudu::test_utils::event::{user_rows, users_event, users_mapping};
use etl_kudu::test_utils::schema::{
    ORDERS_TABLE, USERS_BUCKETS, USERS_SEED, USERS_TABLE, create_orders_table,
    create_users_table, users_schema,
};
use etl_kudu::test_utils::template::{build_sync_service, build_template};
use etl_kudu::types::{EventType, PartitionSchema};
use etl_telemetry::tracing::init_test_tracing;

fn backup_table(table: &str) -> String {
    format!("{table}{TRUNCATE_BACKUP_SUFFIX}")
}

#[tokio::test]
async fn truncate_event_recreates_an_empty_table() {
    init_test_tracing();
    let cluster = MemoryKuduCluster::new();
    create_users_table(&cluster);
    let service = build_sync_service(&cluster);
    let mapping = users_mapping();

    service
        .sync(
            Some(&mapping),
            &users_event(EventType::Insert, user_rows(1..=40)),
        )
        .await
        .unwrap();
    assert_eq!(cluster.row_count(USERS_TABLE), 40);

    service
        .sync(Some(&mapping), &users_event(EventType::Truncate, Vec::new()))
        .await
        .unwrap();

    let partition = cluster.partition_schema(USERS_TABLE).unwrap();
    assert_eq!(partition.total_hash_buckets(), USERS_BUCKETS);
    assert_eq!(partition.hash_bucket_schemas[0].seed, USERS_SEED);
    assert!(partition.range_partition_columns.is_empty());
    assert_eq!(cluster.schema(USERS_TABLE), Some(users_schema()));
    assert_eq!(cluster.row_count(USERS_TABLE), 0);
    assert!(!cluster.has_table(&backup_table(USERS_TABLE)));
}

#[tokio::test]
async fn truncate_hashes_on_the_composite_key_by_default() {
    init_test_tracing();
    let cluster = MemoryKuduCluster::new();
    create_orders_table(&cluster);
    let template = build_template(&cluster);

    template.truncate(ORDERS_TABLE, None).await.unwrap();

    let partition = cluster.partition_schema(ORDERS_TABLE).unwrap();
    assert_eq!(
        partition.hash_bucket_schemas[0].columns,
        vec!["order_id".to_string(), "region".to_string()]
    );
}

#[tokio::test]
async fn truncate_accepts_explicit_partition_columns() {
    init_test_tracing();
    let cluster = MemoryKuduCluster::new();
    create_orders_table(&cluster);
    let template = build_template(&cluster);

    template
        .truncate(ORDERS_TABLE, Some(&["region".to_string()]))
        .await
        .unwrap();

    let partition = cluster.partition_schema(ORDERS_TABLE).unwrap();
    assert_eq!(
        partition.hash_bucket_schemas[0].columns,
        vec!["region".to_string()]
    );
}

#[tokio::test]
async fn stale_backup_is_replaced() {
    init_test_tracing();
    let cluster = MemoryKuduCluster::new();
    create_users_table(&cluster);
    cluster.create_table(
        backup_table(USERS_TABLE),
        users_schema(),
        PartitionSchema::hash(vec!["id".to_string()], 2, 0),
    );
    let template = build_template(&cluster);

    template.truncate(USERS_TABLE, None).await.unwrap();

    assert_eq!(
        cluster.table_names(),
        vec![USERS_TABLE.to_string()]
    );
    assert_eq!(
        cluster
            .partition_schema(USERS_TABLE)
            .unwrap()
            .total_hash_buckets(),
        USERS_BUCKETS
    );
}

#[tokio::test]
async fn incomplete_rename_is_not_an_error() {
    init_test_tracing();
    let cluster = MemoryKuduCluster::new();
    create_users_table(&cluster);
    cluster.set_alter_never_done(true);
    let template = build_template(&cluster);

    template.truncate(USERS_TABLE, None).await.unwrap();

    assert!(cluster.has_table(USERS_TABLE));
}

#[tokio::test]
async fn unreadable_rename_status_is_not_an_error() {
    init_test_tracing();
    let cluster = MemoryKuduCluster::new();
    create_users_table(&cluster);
    let template = build_template(&cluster);
    template
        .insert(USERS_TABLE, &[], &user_rows(1..=5))
        .await
        .unwrap();
    cluster.set_alter_status_unavailable(true);

    template.truncate(USERS_TABLE, None).await.unwrap();

    assert!(cluster.has_table(USERS_TABLE));
    assert!(!cluster.has_table(&backup_table(USERS_TABLE)));
    assert_eq!(cluster.row_count(USERS_TABLE), 0);
}

#[tokio::test]
async fn truncate_requires_hash_partitioning() {
    init_test_tracing();
    let cluster = MemoryKuduCluster::new();
    cluster.create_table(
        USERS_TABLE,
        users_schema(),
        PartitionSchema {
            hash_bucket_schemas: Vec::new(),
            range_partition_columns: vec!["id".to_string()],
        },
    );
    let template = build_template(&cluster);

    let err = template.truncate(USERS_TABLE, None).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DestinationSchemaError);
    assert!(cluster.has_table(USERS_TABLE));
}

#[tokio::test]
async fn truncating_a_missing_table_fails() {
    init_test_tracing();
    let cluster = MemoryKuduCluster::new();
    let template = build_template(&cluster);

    let err = template.truncate(USERS_TABLE, None).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DestinationTableMissing);
}
