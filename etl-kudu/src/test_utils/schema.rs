use crate::client::MemoryKuduCluster;
use crate::types::{ColumnSchema, ColumnType, PartitionSchema, TableSchema};

pub const USERS_TABLE: &str = "impala::test.users";
pub const ORDERS_TABLE: &str = "impala::test.orders";

pub const USERS_BUCKETS: u32 = 4;
pub const USERS_SEED: u32 = 7;
pub const ORDERS_BUCKETS: u32 = 3;

/// A table using every column type the sink knows about.
///
/// `balance` is a decimal column, which the sink never writes.
pub fn users_schema() -> TableSchema {
    TableSchema::new(vec![
        ColumnSchema::key("id", ColumnType::Int64),
        ColumnSchema::new("name", ColumnType::String).not_null(),
        ColumnSchema::new("age", ColumnType::Int32),
        ColumnSchema::new("level", ColumnType::Int8),
        ColumnSchema::new("rank", ColumnType::Int16),
        ColumnSchema::new("score", ColumnType::Double),
        ColumnSchema::new("ratio", ColumnType::Float),
        ColumnSchema::new("active", ColumnType::Bool),
        ColumnSchema::new("avatar", ColumnType::Binary),
        ColumnSchema::new("phone", ColumnType::String),
        ColumnSchema::new("created_at", ColumnType::UnixtimeMicros),
        ColumnSchema::new("balance", ColumnType::Decimal),
    ])
}

/// A table with a composite primary key.
pub fn orders_schema() -> TableSchema {
    TableSchema::new(vec![
        ColumnSchema::key("order_id", ColumnType::Int64),
        ColumnSchema::key("region", ColumnType::String),
        ColumnSchema::new("amount", ColumnType::Double),
        ColumnSchema::new("note", ColumnType::String),
    ])
}

pub fn create_users_table(cluster: &MemoryKuduCluster) {
    cluster.create_table(
        USERS_TABLE,
        users_schema(),
        PartitionSchema::hash(vec!["id".to_string()], USERS_BUCKETS, USERS_SEED),
    );
}

pub fn create_orders_table(cluster: &MemoryKuduCluster) {
    cluster.create_table(
        ORDERS_TABLE,
        orders_schema(),
        PartitionSchema::hash(
            vec!["order_id".to_string(), "region".to_string()],
            ORDERS_BUCKETS,
            0,
        ),
    );
}
