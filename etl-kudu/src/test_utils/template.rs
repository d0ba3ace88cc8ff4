use etl_config::shared::{KuduConnectionConfig, WriteConfig, WriteRetryConfig};

use crate::client::{MemoryKuduCluster, MemoryKuduConnector};
use crate::sync::KuduSyncService;
use crate::template::KuduTemplate;

/// Default retry policy without sleeping between attempts.
pub fn test_retry_config() -> WriteRetryConfig {
    WriteRetryConfig::default().without_delay()
}

pub fn build_template(cluster: &MemoryKuduCluster) -> KuduTemplate<MemoryKuduConnector> {
    build_template_with(cluster, WriteConfig::default(), test_retry_config())
}

pub fn build_template_with(
    cluster: &MemoryKuduCluster,
    write_config: WriteConfig,
    retry_config: WriteRetryConfig,
) -> KuduTemplate<MemoryKuduConnector> {
    KuduTemplate::new(
        MemoryKuduConnector::new(cluster.clone()),
        KuduConnectionConfig::from_masters("kudu-master-1:7051,kudu-master-2:7051"),
        write_config,
        retry_config,
    )
    .expect("test template configuration is valid")
}

pub fn build_sync_service(cluster: &MemoryKuduCluster) -> KuduSyncService<MemoryKuduConnector> {
    KuduSyncService::new(build_template(cluster))
}
