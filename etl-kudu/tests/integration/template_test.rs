use std::time::Duration;

use etl_config::shared::{WriteConfig, WriteRetryConfig};
use etl_kudu::client::{ConnectionStatus, KuduValue, MemoryKuduCluster};
use etl_kudu::error::ErrorKind;
use etl_kudu::test_utils::event::{user_row, user_rows};
use etl_kudu::test_utils::schema::{USERS_TABLE, create_users_table};
use etl_kudu::test_utils::template::{build_template, build_template_with, test_retry_config};
use etl_kudu::types::RowData;
use etl_telemetry::tracing::init_test_tracing;

#[tokio::test]
async fn intermediate_flushes_keep_the_buffer_below_two_thirds() {
    init_test_tracing();
    let cluster = MemoryKuduCluster::new();
    create_users_table(&cluster);
    let template = build_template(&cluster);

    template
        .insert(USERS_TABLE, &[], &user_rows(1..=1000))
        .await
        .unwrap();

    // A buffer of 500 flushes once more than 332 operations are pending.
    assert_eq!(cluster.flush_sizes(), vec![333, 333, 333, 1]);
    assert_eq!(cluster.row_count(USERS_TABLE), 1000);
    assert_eq!(cluster.sessions_opened(), 1);
}

#[tokio::test]
async fn writes_every_supported_column_type() {
    init_test_tracing();
    let cluster = MemoryKuduCluster::new();
    create_users_table(&cluster);
    let template = build_template(&cluster);

    template
        .insert(USERS_TABLE, &[], &[user_row(4)])
        .await
        .unwrap();

    let rows = cluster.rows(USERS_TABLE);
    let row = &rows[0];
    assert_eq!(row.get("id"), Some(&KuduValue::Int64(4)));
    assert_eq!(row.get("name"), Some(&KuduValue::String("user-4".to_string())));
    assert_eq!(row.get("age"), Some(&KuduValue::Int32(24)));
    assert_eq!(row.get("level"), Some(&KuduValue::Int8(4)));
    assert_eq!(row.get("rank"), Some(&KuduValue::Int16(40)));
    assert_eq!(row.get("score"), Some(&KuduValue::Double(4.5)));
    assert_eq!(row.get("ratio"), Some(&KuduValue::Float(0.25)));
    assert_eq!(row.get("active"), Some(&KuduValue::Bool(true)));
    assert_eq!(
        row.get("avatar"),
        Some(&KuduValue::Binary(b"avatar-4".to_vec()))
    );
    assert_eq!(
        row.get("created_at"),
        Some(&KuduValue::UnixtimeMicros(1_704_164_645_000_000))
    );
    // Decimal columns and columns missing from the schema are left out.
    assert_eq!(row.get("balance"), None);
    assert_eq!(row.get("nickname"), None);
}

#[tokio::test]
async fn nulls_are_written_as_column_nulls() {
    init_test_tracing();
    let cluster = MemoryKuduCluster::new();
    create_users_table(&cluster);
    let template = build_template(&cluster);

    let row = RowData::new()
        .with("id", 1i64)
        .with("name", "nullable")
        .with("age", Option::<i64>::None);
    template.upsert(USERS_TABLE, &[], &[row]).await.unwrap();

    let rows = cluster.rows(USERS_TABLE);
    assert_eq!(rows[0].get("age"), Some(&KuduValue::Null));
}

#[tokio::test(start_paused = true)]
async fn retries_back_off_exponentially() {
    init_test_tracing();
    let cluster = MemoryKuduCluster::new();
    create_users_table(&cluster);
    cluster.fail_table_writes(USERS_TABLE, 3);
    let template = build_template_with(
        &cluster,
        WriteConfig::default(),
        WriteRetryConfig::default(),
    );

    let started = tokio::time::Instant::now();
    template
        .upsert(USERS_TABLE, &[], &user_rows(1..=2))
        .await
        .unwrap();
    let elapsed = started.elapsed();

    // 100ms, 200ms and 400ms, each with up to 30% jitter.
    assert!(elapsed >= Duration::from_millis(700), "{elapsed:?}");
    assert!(elapsed <= Duration::from_millis(950), "{elapsed:?}");
    assert_eq!(cluster.sessions_opened(), 4);
    assert_eq!(cluster.row_count(USERS_TABLE), 2);
}

#[tokio::test]
async fn retries_reconnect_every_third_remaining_attempt() {
    init_test_tracing();
    let cluster = MemoryKuduCluster::new();
    create_users_table(&cluster);
    let retry_config = WriteRetryConfig {
        max_attempts: 7,
        ..test_retry_config()
    };
    cluster.fail_table_writes(USERS_TABLE, u32::MAX);
    let template = build_template_with(&cluster, WriteConfig::default(), retry_config);

    template
        .insert(USERS_TABLE, &[], &[user_row(1)])
        .await
        .unwrap();

    // Reconnects before the attempts with 6 and 3 remaining.
    assert_eq!(cluster.connect_count(), 3);
    assert_eq!(template.connection().generation().await, 3);
    assert_eq!(cluster.sessions_opened(), 8);
    assert_eq!(cluster.open_sessions(), 0);
}

#[tokio::test]
async fn failed_connect_on_first_attempt_is_returned() {
    init_test_tracing();
    let cluster = MemoryKuduCluster::new();
    create_users_table(&cluster);
    cluster.fail_next_connects(1);
    let template = build_template(&cluster);

    let err = template
        .insert(USERS_TABLE, &[], &[user_row(1)])
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DestinationConnectionFailed);
    assert_eq!(
        template.connection().status().await,
        ConnectionStatus::Disconnected
    );

    template
        .insert(USERS_TABLE, &[], &[user_row(1)])
        .await
        .unwrap();
    assert_eq!(cluster.row_count(USERS_TABLE), 1);
}

#[tokio::test]
async fn diagnostics_report_table_state() {
    init_test_tracing();
    let cluster = MemoryKuduCluster::new();
    create_users_table(&cluster);
    let template = build_template(&cluster);

    assert!(template.table_exists(USERS_TABLE).await.unwrap());
    assert!(!template.table_exists("impala::test.nope").await.unwrap());

    template
        .insert(USERS_TABLE, &[], &user_rows(1..=12))
        .await
        .unwrap();
    assert_eq!(template.count_rows(USERS_TABLE).await.unwrap(), 12);

    template.close().await.unwrap();
    assert_eq!(
        template.connection().status().await,
        ConnectionStatus::Closed
    );
}
