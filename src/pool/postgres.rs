//! PostgreSQL connector backed by `tokio-postgres`.
//!
//! Liveness is a `SELECT 1` round-trip.

use async_trait::async_trait;
use tokio_postgres::{Client, NoTls};

use crate::config::EndpointConfig;
use crate::pool::connector::{BoxError, Connector};

const DEFAULT_PORT: u16 = 5432;

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresConnector;

/// Split "host:port" into its parts, falling back to the default port.
fn split_address(address: &str) -> Result<(&str, u16), BoxError> {
    match address.rsplit_once(':') {
        Some((host, port)) => Ok((host, port.parse()?)),
        None => Ok((address, DEFAULT_PORT)),
    }
}

#[async_trait]
impl Connector for PostgresConnector {
    type Connection = Client;

    async fn connect(&self, endpoint: &EndpointConfig) -> Result<Client, BoxError> {
        let (host, port) = split_address(&endpoint.address)?;

        let mut config = tokio_postgres::Config::new();
        config
            .host(host)
            .port(port)
            .user(&endpoint.username)
            .password(&endpoint.password)
            .connect_timeout(endpoint.connect_timeout());
        if let Some(database) = &endpoint.database {
            config.dbname(database);
        }

        let (client, connection) = config.connect(NoTls).await?;
        let address = endpoint.address.clone();
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::debug!(address = %address, error = %e, "PostgreSQL connection ended");
            }
        });

        Ok(client)
    }

    async fn is_valid(&self, conn: &mut Client) -> bool {
        !conn.is_closed() && conn.simple_query("SELECT 1").await.is_ok()
    }
}
