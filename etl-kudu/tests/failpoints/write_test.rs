use etl_kudu::client::MemoryKuduCluster;
use etl_kudu::error::ErrorKind;
use etl_kudu::failpoints::{
    TRUNCATE__AFTER_BACKUP_CREATED, WRITE_BATCH__BEFORE_APPLY, WRITE_BATCH__BEFORE_FLUSH,
};
use etl_kudu::template::TRUNCATE_BACKUP_SUFFIX;
use etl_kudu::test_utils::event::{user_rows, users_event, users_mapping};
use etl_kudu::test_utils::failpoints::CustomFailScenario;
use etl_kudu::test_utils::schema::{USERS_TABLE, create_users_table};
use etl_kudu::test_utils::template::{build_sync_service, build_template};
use etl_kudu::types::EventType;
use etl_telemetry::tracing::init_test_tracing;

#[tokio::test]
async fn first_attempt_timeout_is_returned_and_session_closed() {
    init_test_tracing();
    let _scenario = CustomFailScenario::setup(&[(WRITE_BATCH__BEFORE_FLUSH, "return(timeout)")]);

    let cluster = MemoryKuduCluster::new();
    create_users_table(&cluster);
    let service = build_sync_service(&cluster);

    let err = service
        .sync(
            Some(&users_mapping()),
            &users_event(EventType::Insert, user_rows(1..=5)),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DestinationTimeout);
    assert!(err.is_connectivity());
    assert_eq!(cluster.sessions_opened(), 1);
    assert_eq!(cluster.open_sessions(), 0);
}

#[tokio::test]
async fn retry_attempt_errors_force_a_reconnect() {
    init_test_tracing();
    let _scenario = CustomFailScenario::setup(&[(
        WRITE_BATCH__BEFORE_APPLY,
        "1*off->1*return(connection)->off",
    )]);

    let cluster = MemoryKuduCluster::new();
    create_users_table(&cluster);
    cluster.fail_table_writes(USERS_TABLE, 1);
    let template = build_template(&cluster);

    template
        .upsert(USERS_TABLE, &[], &user_rows(1..=3))
        .await
        .unwrap();

    // Scheduled reconnect before the first retry, forced one before the second.
    assert_eq!(cluster.connect_count(), 3);
    assert_eq!(cluster.sessions_opened(), 3);
    assert_eq!(cluster.open_sessions(), 0);
    assert_eq!(cluster.row_count(USERS_TABLE), 3);
}

#[tokio::test]
async fn interrupted_truncate_leaves_the_original_table() {
    init_test_tracing();
    let _scenario =
        CustomFailScenario::setup(&[(TRUNCATE__AFTER_BACKUP_CREATED, "1*return(write)")]);

    let cluster = MemoryKuduCluster::new();
    create_users_table(&cluster);
    let template = build_template(&cluster);
    template
        .insert(USERS_TABLE, &[], &user_rows(1..=3))
        .await
        .unwrap();

    let err = template.truncate(USERS_TABLE, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DestinationWriteFailed);

    let backup_table = format!("{USERS_TABLE}{TRUNCATE_BACKUP_SUFFIX}");
    assert!(cluster.has_table(&backup_table));
    assert_eq!(cluster.row_count(USERS_TABLE), 3);

    // The failpoint fires once, so the next truncate replaces the stale backup.
    template.truncate(USERS_TABLE, None).await.unwrap();

    assert!(!cluster.has_table(&backup_table));
    assert_eq!(cluster.row_count(USERS_TABLE), 0);
}
