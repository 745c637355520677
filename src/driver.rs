//! The database-connectivity shim: open / prepare / ping / close.
//!
//! A connection owns the store handle and the active application token; the
//! token is rebound by `USE` for the remainder of the connection's life
//! (the backend's single-active-database model). Statements and cursors
//! borrow the connection for one call and hold no state across calls.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::rows::Rows;
use crate::sql::compiler;
use crate::sql::context::Param;
use crate::store::{StoreCache, TableStore};

/// Connection factory over a [`StoreCache`].
pub struct Driver {
    cache: StoreCache,
}

impl Driver {
    pub fn new(cache: StoreCache) -> Driver {
        Driver { cache }
    }

    /// Open a connection from a DSN. The store client is resolved through
    /// the cache, one per app id.
    pub fn open(&self, dsn: &str) -> Result<Connection> {
        let config = Config::from_dsn(dsn)?;
        debug!(conn = %config.display_string(), "open connection");
        let store = self.cache.obtain(&config);
        Ok(Connection::new(store, config.app_token, config.timeout))
    }
}

/// One logical connection to an application. Not safe for concurrent use
/// from multiple threads; pool connections instead of sharing one.
pub struct Connection {
    store: Arc<dyn TableStore>,
    app_token: String,
    timeout: Duration,
}

impl Connection {
    pub fn new(
        store: Arc<dyn TableStore>,
        app_token: impl Into<String>,
        timeout: Duration,
    ) -> Connection {
        Connection {
            store,
            app_token: app_token.into(),
            timeout,
        }
    }

    pub fn store(&self) -> Arc<dyn TableStore> {
        self.store.clone()
    }

    pub fn app_token(&self) -> &str {
        &self.app_token
    }

    pub(crate) fn set_app_token(&mut self, app_token: String) {
        self.app_token = app_token;
    }

    /// Verify the connection by fetching the active application's metadata.
    pub async fn ping(&self) -> Result<()> {
        self.store.get_app(&self.app_token).await.map(drop)
    }

    /// Prepare a statement. The text is held unparsed until execution.
    pub fn prepare(&mut self, query: impl Into<String>) -> Statement<'_> {
        let query = query.into();
        debug!(%query, "prepare statement");
        Statement { conn: self, query }
    }

    /// Prepare and execute in one step.
    pub async fn query(
        &mut self,
        query: impl Into<String>,
        params: Vec<Param>,
    ) -> Result<Option<Box<dyn Rows>>> {
        self.prepare(query).query(params).await
    }

    /// The backend has no transactions; the handle is a no-op placeholder
    /// satisfying the generic driver contract.
    pub fn begin(&mut self) -> Transaction {
        Transaction
    }

    /// Always fails: connections are meant to be pooled and reused, not
    /// torn down ad hoc.
    pub fn close(&self) -> Result<()> {
        Err(Error::CloseUnsupported)
    }
}

/// A prepared statement borrowing its connection for one call.
pub struct Statement<'c> {
    conn: &'c mut Connection,
    query: String,
}

impl Statement<'_> {
    pub fn query_text(&self) -> &str {
        &self.query
    }

    /// Execute, returning a cursor for row-producing statements. The
    /// connection's timeout bounds the whole execution; dropping the future
    /// cancels it mid-pagination.
    pub async fn query(&mut self, params: Vec<Param>) -> Result<Option<Box<dyn Rows>>> {
        let timeout = self.conn.timeout;
        let query = self.query.clone();
        match tokio::time::timeout(timeout, compiler::execute(self.conn, &query, params)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(timeout)),
        }
    }

    /// Execute a statement for its side effects, draining any cursor and
    /// reporting the drained row count.
    pub async fn exec(&mut self, params: Vec<Param>) -> Result<u64> {
        let mut affected = 0;
        if let Some(mut rows) = self.query(params).await? {
            while rows.next().await?.is_some() {
                affected += 1;
            }
        }
        Ok(affected)
    }
}

/// No-op transaction handle.
pub struct Transaction;

impl Transaction {
    pub fn commit(self) -> Result<()> {
        Ok(())
    }

    pub fn rollback(self) -> Result<()> {
        Ok(())
    }
}
