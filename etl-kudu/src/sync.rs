use etl_config::shared::MappingConfig;
use tracing::{debug, error};

use crate::client::{KuduConnector, OperationKind};
use crate::error::EtlResult;
use crate::template::KuduTemplate;
use crate::types::{EventType, MutationEvent, RowData};

/// Replays mutation events against Kudu through a [`KuduTemplate`].
#[derive(Debug)]
pub struct KuduSyncService<C>
where
    C: KuduConnector,
{
    template: KuduTemplate<C>,
}

impl<C> KuduSyncService<C>
where
    C: KuduConnector,
{
    pub fn new(template: KuduTemplate<C>) -> Self {
        Self { template }
    }

    pub fn template(&self) -> &KuduTemplate<C> {
        &self.template
    }

    /// Applies one event under its mapping.
    ///
    /// Events without a mapping, or whose source database and table differ from the mapping,
    /// are dropped. Inserts become inserts, updates become upserts and deletes are reduced to
    /// the mapped primary key. Rows are written in chunks of [`MappingConfig::commit_batch`];
    /// the first failing chunk stops the event and its error is returned.
    pub async fn sync(
        &self,
        config: Option<&MappingConfig>,
        event: &MutationEvent,
    ) -> EtlResult<()> {
        let Some(config) = config else {
            return Ok(());
        };

        debug!(event = %event.to_json(), "kudu sync event");

        let result = match &event.event_type {
            EventType::Insert => self.write_event(OperationKind::Insert, config, event).await,
            EventType::Update => self.write_event(OperationKind::Upsert, config, event).await,
            EventType::Delete => self.write_event(OperationKind::Delete, config, event).await,
            EventType::Truncate => self.truncate(config, event).await,
            EventType::CreateIndex | EventType::DropIndex => Ok(()),
            EventType::Other(event_type) => {
                error!(
                    event_type = %event_type,
                    event = %event.to_json(),
                    "unexpected dml type, event ignored"
                );
                Ok(())
            }
        };

        if let Err(err) = &result {
            error!(
                error = %err,
                target_table = %config.target_table,
                event = %event.to_json(),
                "kudu sync failed"
            );
        }

        result
    }

    async fn write_event(
        &self,
        kind: OperationKind,
        config: &MappingConfig,
        event: &MutationEvent,
    ) -> EtlResult<()> {
        if !matches_source(config, event) {
            return Ok(());
        }

        let rows = event.rows();
        if rows.is_empty() {
            return Ok(());
        }

        let projected;
        let rows = if kind == OperationKind::Delete {
            projected = rows
                .iter()
                .map(|row| primary_key_row(config, row))
                .collect::<Vec<_>>();
            projected.as_slice()
        } else {
            rows
        };

        for batch in rows.chunks(config.commit_batch.max(1)) {
            self.template
                .write(kind, &config.target_table, &config.encryption_columns, batch)
                .await?;
        }

        Ok(())
    }

    async fn truncate(&self, config: &MappingConfig, event: &MutationEvent) -> EtlResult<()> {
        if !matches_source(config, event) {
            return Ok(());
        }

        self.template.truncate(&config.target_table, None).await
    }
}

/// Database and table names are compared case-sensitively.
fn matches_source(config: &MappingConfig, event: &MutationEvent) -> bool {
    event.table == config.table && event.database == config.database
}

/// Keeps the primary-key columns of `row` under their target names.
fn primary_key_row(config: &MappingConfig, row: &RowData) -> RowData {
    let mut key = RowData::with_capacity(config.target_pk.len());
    for (column, value) in row.iter() {
        if let Some(target) = config.target_pk_column(column) {
            key.insert(target, value.clone());
        }
    }

    key
}
