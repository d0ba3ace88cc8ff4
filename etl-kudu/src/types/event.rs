use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::RowData;

/// Kind of a mutation event.
///
/// DML kinds are matched case-insensitively. The index markers `CINDEX` and `DINDEX` only
/// match their exact upper-case spelling; anything else is kept verbatim in
/// [`EventType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    Insert,
    Update,
    Delete,
    Truncate,
    CreateIndex,
    DropIndex,
    Other(String),
}

impl EventType {
    pub fn parse(value: &str) -> Self {
        match value {
            "CINDEX" => return EventType::CreateIndex,
            "DINDEX" => return EventType::DropIndex,
            _ => {}
        }

        if value.eq_ignore_ascii_case("INSERT") {
            EventType::Insert
        } else if value.eq_ignore_ascii_case("UPDATE") {
            EventType::Update
        } else if value.eq_ignore_ascii_case("DELETE") {
            EventType::Delete
        } else if value.eq_ignore_ascii_case("TRUNCATE") {
            EventType::Truncate
        } else {
            EventType::Other(value.to_owned())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventType::Insert => "INSERT",
            EventType::Update => "UPDATE",
            EventType::Delete => "DELETE",
            EventType::Truncate => "TRUNCATE",
            EventType::CreateIndex => "CINDEX",
            EventType::DropIndex => "DINDEX",
            EventType::Other(value) => value,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for EventType {
    fn from(value: &str) -> Self {
        EventType::parse(value)
    }
}

impl Serialize for EventType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(EventType::parse(&value))
    }
}

/// A row-level change captured from the source database.
///
/// Serializes to the flat JSON message shape emitted by the replication source, with the kind
/// under `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub table: String,
    /// Rows after the change. Absent for DDL events.
    #[serde(default)]
    pub data: Option<Vec<RowData>>,
    /// Changed columns before an update, kept for logging.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old: Option<Vec<RowData>>,
    #[serde(rename = "pkNames", default)]
    pub pk_names: Option<Vec<String>>,
    #[serde(rename = "isDdl", default)]
    pub is_ddl: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    /// Execution time of the change on the source, epoch millis.
    #[serde(default)]
    pub es: i64,
    /// Time the event was produced, epoch millis.
    #[serde(default)]
    pub ts: i64,
}

impl MutationEvent {
    pub fn new(
        event_type: impl Into<EventType>,
        database: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            database: database.into(),
            table: table.into(),
            data: None,
            old: None,
            pk_names: None,
            is_ddl: false,
            sql: None,
            es: 0,
            ts: 0,
        }
    }

    pub fn with_rows(mut self, rows: Vec<RowData>) -> Self {
        self.data = Some(rows);
        self
    }

    pub fn rows(&self) -> &[RowData] {
        self.data.as_deref().unwrap_or_default()
    }

    /// Renders the event as JSON for logging.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|err| {
            format!(
                "<unserializable event {}.{}: {err}>",
                self.database, self.table
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;

    #[test]
    fn parses_dml_kinds_case_insensitively() {
        assert_eq!(EventType::parse("insert"), EventType::Insert);
        assert_eq!(EventType::parse("Update"), EventType::Update);
        assert_eq!(EventType::parse("DELETE"), EventType::Delete);
        assert_eq!(EventType::parse("truncate"), EventType::Truncate);
    }

    #[test]
    fn index_markers_match_exactly() {
        assert_eq!(EventType::parse("CINDEX"), EventType::CreateIndex);
        assert_eq!(EventType::parse("DINDEX"), EventType::DropIndex);
        assert_eq!(
            EventType::parse("cindex"),
            EventType::Other("cindex".to_string())
        );
    }

    #[test]
    fn deserializes_flat_message() {
        let json = r#"{
            "data": [{"id": "1", "name": "alice"}],
            "database": "shop",
            "es": 1700000000000,
            "isDdl": false,
            "old": null,
            "pkNames": ["id"],
            "table": "users",
            "ts": 1700000000123,
            "type": "INSERT"
        }"#;

        let event: MutationEvent = serde_json::from_str(json).unwrap();

        assert_eq!(event.event_type, EventType::Insert);
        assert_eq!(event.database, "shop");
        assert_eq!(event.pk_names.as_deref(), Some(&["id".to_string()][..]));
        assert_eq!(event.rows().len(), 1);
        assert_eq!(
            event.rows()[0].get("NAME"),
            Some(&Value::Text("alice".to_string()))
        );

        let rendered = event.to_json();
        assert!(rendered.contains(r#""type":"INSERT""#));
        assert!(!rendered.contains(r#""old""#));
    }

    #[test]
    fn events_without_data_have_no_rows() {
        let event = MutationEvent::new("TRUNCATE", "shop", "users");

        assert!(event.rows().is_empty());
    }
}
