//! Scoped transaction executor.
//!
//! Every database tool runs its statements through [`ScopedExecutor`]:
//!
//! 1. check out one connection
//! 2. `BEGIN TRANSACTION READ ONLY`
//! 3. run the unit of work, stopping at its first failure
//! 4. `ROLLBACK`, best effort
//! 5. release the connection, exactly once
//!
//! Nothing is ever committed. A panic inside the unit is caught and reported as
//! an internal error so the connection still goes back to the pool.

use crate::db::pool::{ConnectionPool, PooledConnection};
use crate::error::{DbError, DbResult};
use futures_util::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tracing::{debug, warn};

/// A unit of work executed inside one read-only transaction.
pub trait UnitOfWork<C: PooledConnection>: Send {
    type Output: Send;

    fn run(self, conn: &mut C) -> impl Future<Output = DbResult<Self::Output>> + Send;
}

/// Result of one scoped execution.
///
/// `outcome` is what the unit of work produced. `cleanup` carries a rollback
/// failure, which is reported separately and never replaces `outcome`.
#[derive(Debug)]
pub struct ScopedOutcome<T> {
    pub outcome: DbResult<T>,
    pub cleanup: Option<DbError>,
}

impl<T> ScopedOutcome<T> {
    fn failed(err: DbError) -> Self {
        Self {
            outcome: Err(err),
            cleanup: None,
        }
    }
}

/// Runs units of work against an optional pool.
#[derive(Debug, Clone)]
pub struct ScopedExecutor<P> {
    pool: Option<P>,
}

impl<P: ConnectionPool> ScopedExecutor<P> {
    pub fn new(pool: Option<P>) -> Self {
        Self { pool }
    }

    /// Whether a pool is available.
    pub fn is_configured(&self) -> bool {
        self.pool.is_some()
    }

    fn pool(&self) -> DbResult<&P> {
        self.pool
            .as_ref()
            .ok_or_else(|| DbError::not_configured("Database pool"))
    }

    /// Run `work` and return its outcome and the cleanup diagnostic separately.
    pub async fn run_scoped<W>(&self, work: W) -> ScopedOutcome<W::Output>
    where
        W: UnitOfWork<P::Connection>,
    {
        let pool = match self.pool() {
            Ok(pool) => pool,
            Err(e) => return ScopedOutcome::failed(e),
        };

        let mut conn = match pool.acquire().await {
            Ok(conn) => conn,
            Err(e) => return ScopedOutcome::failed(e),
        };

        let start = Instant::now();
        let outcome = AssertUnwindSafe(async {
            conn.begin_read_only().await?;
            work.run(&mut conn).await
        })
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| {
            let message = panic_message(payload.as_ref());
            warn!(panic = %message, "Unit of work panicked");
            Err(DbError::internal(format!("unit of work panicked: {}", message)))
        });

        let cleanup = conn.rollback().await.err();
        conn.release();

        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            ok = outcome.is_ok(),
            "Scoped execution finished"
        );

        ScopedOutcome { outcome, cleanup }
    }

    /// Run `work`, log any rollback failure, and prefix a failed outcome with
    /// `operation`.
    ///
    /// A missing pool is reported as-is, before any connection attempt.
    pub async fn run<W>(&self, operation: &str, work: W) -> DbResult<W::Output>
    where
        W: UnitOfWork<P::Connection>,
    {
        self.pool()?;

        let ScopedOutcome { outcome, cleanup } = self.run_scoped(work).await;
        if let Some(err) = cleanup {
            warn!(operation, error = %err, "Rollback failed; connection released anyway");
        }
        outcome.map_err(|e| e.within(operation))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
