use std::ops::RangeInclusive;

use etl_config::shared::MappingConfig;

use crate::test_utils::schema::{ORDERS_TABLE, USERS_TABLE};
use crate::types::{EventType, MutationEvent, RowData};

pub const SOURCE_DATABASE: &str = "test";
pub const USERS_SOURCE_TABLE: &str = "users";
pub const ORDERS_SOURCE_TABLE: &str = "orders";

/// A users row as the replication source emits it, with every value as text.
///
/// The phone number is `555-{id:04}`.
pub fn user_row(id: i64) -> RowData {
    RowData::new()
        .with("ID", id)
        .with("name", format!("user-{id}"))
        .with("age", (20 + id % 50).to_string())
        .with("level", (id % 5).to_string())
        .with("rank", (id % 1000 * 10).to_string())
        .with("score", format!("{}.5", id))
        .with("ratio", "0.25")
        .with("active", if id % 2 == 0 { "true" } else { "FALSE" })
        .with("avatar", format!("avatar-{id}"))
        .with("phone", format!("555-{id:04}"))
        .with("created_at", "2024-01-02 03:04:05")
        .with("balance", "12.34")
        .with("nickname", format!("nick-{id}"))
}

pub fn user_rows(ids: RangeInclusive<i64>) -> Vec<RowData> {
    ids.map(user_row).collect()
}

pub fn order_row(order_id: i64, region: &str) -> RowData {
    RowData::new()
        .with("order_id", order_id)
        .with("region", region)
        .with("amount", order_id as f64 * 1.5)
        .with("note", format!("order {order_id}"))
}

pub fn users_event(event_type: EventType, rows: Vec<RowData>) -> MutationEvent {
    MutationEvent::new(event_type, SOURCE_DATABASE, USERS_SOURCE_TABLE).with_rows(rows)
}

pub fn orders_event(event_type: EventType, rows: Vec<RowData>) -> MutationEvent {
    MutationEvent::new(event_type, SOURCE_DATABASE, ORDERS_SOURCE_TABLE).with_rows(rows)
}

/// Mapping of `test.users` onto [`USERS_TABLE`] keyed by `id`.
pub fn users_mapping() -> MappingConfig {
    let mut mapping = MappingConfig::new(SOURCE_DATABASE, USERS_SOURCE_TABLE, USERS_TABLE);
    mapping.target_pk.insert("id".to_string(), None);

    mapping
}

/// Mapping of `test.orders` onto [`ORDERS_TABLE`], whose source key is `orderId, region`.
pub fn orders_mapping() -> MappingConfig {
    let mut mapping = MappingConfig::new(SOURCE_DATABASE, ORDERS_SOURCE_TABLE, ORDERS_TABLE);
    mapping
        .target_pk
        .insert("orderId".to_string(), Some("order_id".to_string()));
    mapping.target_pk.insert("region".to_string(), None);

    mapping
}
