use etl_config::shared::KuduConnectionConfig;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::bail;
use crate::client::{KuduClient, KuduConnector};
use crate::error::{ErrorKind, EtlResult};
use crate::metrics::ETL_KUDU_RECONNECTS_TOTAL;

/// Lifecycle state of a [`KuduConnection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No client has been created yet, or the last connect attempt failed.
    Disconnected,
    Connected,
    /// The previous client was dropped and a new one is being created.
    Reconnecting,
    /// Terminal. No further clients are created.
    Closed,
}

#[derive(Debug)]
struct ConnectionState<T> {
    status: ConnectionStatus,
    client: Option<T>,
    generation: u64,
}

/// Owns the shared Kudu client.
///
/// The client is created on first use and replaced on [`KuduConnection::reconnect`]. Lazy
/// creation, replacement and close are serialized, so concurrent callers never observe a
/// half-built client. Callers receive clones of the handle and may keep using a clone after
/// it has been replaced; such a clone fails with a connectivity error once closed.
#[derive(Debug)]
pub struct KuduConnection<C>
where
    C: KuduConnector,
{
    connector: C,
    config: KuduConnectionConfig,
    state: Mutex<ConnectionState<C::Client>>,
}

impl<C> KuduConnection<C>
where
    C: KuduConnector,
{
    pub fn new(connector: C, config: KuduConnectionConfig) -> Self {
        Self {
            connector,
            config,
            state: Mutex::new(ConnectionState {
                status: ConnectionStatus::Disconnected,
                client: None,
                generation: 0,
            }),
        }
    }

    pub fn config(&self) -> &KuduConnectionConfig {
        &self.config
    }

    /// Returns the shared client, connecting first if needed.
    pub async fn client(&self) -> EtlResult<C::Client> {
        let mut state = self.state.lock().await;

        if state.status == ConnectionStatus::Closed {
            bail!(
                ErrorKind::InvalidState,
                "Kudu connection is closed",
                "the shared client was closed and cannot be reused"
            );
        }

        if let Some(client) = &state.client {
            return Ok(client.clone());
        }

        self.connect_locked(&mut state).await
    }

    /// Closes the current client, if any, and connects a new one.
    pub async fn reconnect(&self) -> EtlResult<C::Client> {
        let mut state = self.state.lock().await;

        if state.status == ConnectionStatus::Closed {
            bail!(
                ErrorKind::InvalidState,
                "Kudu connection is closed",
                "cannot reconnect after close"
            );
        }

        state.status = ConnectionStatus::Reconnecting;
        if let Some(client) = state.client.take() {
            if let Err(err) = client.close().await {
                warn!(error = %err, "failed to close previous kudu client");
            }
        }

        metrics::counter!(ETL_KUDU_RECONNECTS_TOTAL).increment(1);

        self.connect_locked(&mut state).await
    }

    /// Closes the client and moves to [`ConnectionStatus::Closed`].
    ///
    /// Closing twice is a no-op.
    pub async fn close(&self) -> EtlResult<()> {
        let mut state = self.state.lock().await;

        if state.status == ConnectionStatus::Closed {
            return Ok(());
        }

        state.status = ConnectionStatus::Closed;
        if let Some(client) = state.client.take() {
            client.close().await?;
            info!(generation = state.generation, "kudu client closed");
        }

        Ok(())
    }

    pub async fn status(&self) -> ConnectionStatus {
        self.state.lock().await.status
    }

    /// Number of clients created so far.
    pub async fn generation(&self) -> u64 {
        self.state.lock().await.generation
    }

    async fn connect_locked(
        &self,
        state: &mut ConnectionState<C::Client>,
    ) -> EtlResult<C::Client> {
        match self.connector.connect(&self.config).await {
            Ok(client) => {
                state.generation += 1;
                state.status = ConnectionStatus::Connected;
                state.client = Some(client.clone());

                info!(
                    masters = ?self.config.master_addresses,
                    generation = state.generation,
                    "connected to kudu"
                );

                Ok(client)
            }
            Err(err) => {
                state.status = ConnectionStatus::Disconnected;
                state.client = None;

                Err(err)
            }
        }
    }
}
