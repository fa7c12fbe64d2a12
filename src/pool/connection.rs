//! Borrowed connection guard.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::OwnedSemaphorePermit;

use crate::pool::connector::Connector;
use crate::pool::endpoint::EndpointPool;
use crate::pool::types::EndpointRole;

/// A connection checked out of an [`EndpointPool`].
///
/// Dereferences to the driver's connection type. Dropping the guard hands the
/// connection back to its pool and frees the pool slot.
pub struct PooledConnection<C: Connector> {
    conn: Option<C::Connection>,
    pool: Arc<EndpointPool<C>>,
    created_at: Instant,
    // Dropped after `conn` is returned, so a waiter that wins the slot finds
    // the connection already parked in the idle set.
    _permit: OwnedSemaphorePermit,
}

impl<C: Connector> PooledConnection<C> {
    pub(crate) fn new(
        conn: C::Connection,
        pool: Arc<EndpointPool<C>>,
        created_at: Instant,
        permit: OwnedSemaphorePermit,
    ) -> Self {
        Self {
            conn: Some(conn),
            pool,
            created_at,
            _permit: permit,
        }
    }

    /// The role of the pool this connection came from.
    pub fn role(&self) -> EndpointRole {
        self.pool.role()
    }

    /// Address of the endpoint this connection talks to.
    pub fn address(&self) -> &str {
        self.pool.address()
    }

    /// Time since the physical connection was opened.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Close the physical connection instead of returning it to the pool.
    pub fn discard(mut self) {
        self.conn.take();
    }
}

impl<C: Connector> Deref for PooledConnection<C> {
    type Target = C::Connection;

    fn deref(&self) -> &Self::Target {
        self.conn
            .as_ref()
            .expect("BUG: PooledConnection used after release")
    }
}

impl<C: Connector> DerefMut for PooledConnection<C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn
            .as_mut()
            .expect("BUG: PooledConnection used after release")
    }
}

impl<C: Connector> Drop for PooledConnection<C> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn, self.created_at);
        }
    }
}

impl<C: Connector> std::fmt::Debug for PooledConnection<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("role", &self.role())
            .field("address", &self.address())
            .field("age", &self.age())
            .finish()
    }
}
