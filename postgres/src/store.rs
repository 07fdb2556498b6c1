//! `PostgreSQL` counter store.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE id_counters (
//!     code TEXT PRIMARY KEY CHECK (code ~ '^[A-Z]{2,6}$'),
//!     seq BIGINT NOT NULL CHECK (seq > 0),
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT now()
//! );
//! ```
//!
//! # Atomicity
//!
//! [`PostgresCounterStore::increment`] is one statement:
//!
//! ```sql
//! INSERT INTO id_counters (code, seq) VALUES ($1, $2)
//! ON CONFLICT (code) DO UPDATE SET seq = id_counters.seq + EXCLUDED.seq
//! RETURNING seq
//! ```
//!
//! The conflicting row is locked for the update, so concurrent increments for one
//! code queue behind each other and each sees the previous one's result. Concurrent
//! first allocations race on the primary key; the loser takes the `DO UPDATE`
//! branch. No explicit transaction or advisory lock is involved.

use crate::config::PostgresConfig;
use chrono::{DateTime, Utc};
use seqid_core::store::StoreFuture;
use seqid_core::{CounterRecord, CounterStore, EntityCode, PersistenceError};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Instant;

/// SQLSTATE `numeric_value_out_of_range`.
const NUMERIC_VALUE_OUT_OF_RANGE: &str = "22003";

type CounterRow = (String, i64, DateTime<Utc>);

/// PostgreSQL-backed counter store.
///
/// # Example
///
/// ```no_run
/// use seqid_core::IdAllocator;
/// use seqid_postgres::PostgresCounterStore;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = PostgresCounterStore::new("postgres://localhost/app").await?;
/// store.migrate().await?;
///
/// let allocator = IdAllocator::new(Arc::new(store));
/// let id = allocator.allocate("EV").await?;
/// println!("new event: {id}");
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct PostgresCounterStore {
    pool: PgPool,
}

impl PostgresCounterStore {
    /// Connect to `database_url` with a default pool.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Database`] if the connection fails.
    pub async fn new(database_url: &str) -> Result<Self, PersistenceError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| PersistenceError::Database(format!("Failed to connect: {e}")))?;

        Ok(Self::from_pool(pool))
    }

    /// Connect using pool settings from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Database`] if the connection fails.
    pub async fn connect(config: &PostgresConfig) -> Result<Self, PersistenceError> {
        let pool = config
            .pool_options()
            .connect(&config.url)
            .await
            .map_err(|e| PersistenceError::Database(format!("Failed to connect: {e}")))?;

        tracing::info!(
            max_connections = config.max_connections,
            "Connected to counter database"
        );

        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing pool, e.g. one shared with the rest of the application.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `id_counters` table if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Database`] if the migration fails.
    pub async fn migrate(&self) -> Result<(), PersistenceError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| PersistenceError::Database(format!("Migration failed: {e}")))?;

        tracing::info!("Counter store migrations applied");
        Ok(())
    }

    /// Get the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn increment_inner(&self, code: &EntityCode, by: u64) -> Result<u64, PersistenceError> {
        let by = i64::try_from(by).map_err(|_| PersistenceError::Overflow { code: code.clone() })?;

        let (seq,): (i64,) = sqlx::query_as(
            r"
            INSERT INTO id_counters (code, seq)
            VALUES ($1, $2)
            ON CONFLICT (code) DO UPDATE
            SET seq = id_counters.seq + EXCLUDED.seq
            RETURNING seq
            ",
        )
        .bind(code.as_str())
        .bind(by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_increment_error(code, &e))?;

        to_seq(code, seq)
    }
}

impl CounterStore for PostgresCounterStore {
    fn increment<'a>(&'a self, code: &'a EntityCode, by: u64) -> StoreFuture<'a, u64> {
        Box::pin(async move {
            let start = Instant::now();
            let result = self.increment_inner(code, by).await;

            metrics::histogram!("seqid.store.increment_duration_seconds")
                .record(start.elapsed().as_secs_f64());
            match &result {
                Ok(seq) => tracing::trace!(code = %code, by, seq, "Counter incremented"),
                Err(e) => {
                    metrics::counter!("seqid.store.errors", "op" => "increment").increment(1);
                    tracing::warn!(code = %code, by, error = %e, "Counter increment failed");
                }
            }

            result
        })
    }

    fn load<'a>(&'a self, code: &'a EntityCode) -> StoreFuture<'a, Option<CounterRecord>> {
        Box::pin(async move {
            let row: Option<CounterRow> = sqlx::query_as(
                r"
                SELECT code, seq, created_at
                FROM id_counters
                WHERE code = $1
                ",
            )
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PersistenceError::Database(format!("Failed to load counter: {e}")))?;

            row.map(row_to_record).transpose()
        })
    }

    fn list(&self) -> StoreFuture<'_, Vec<CounterRecord>> {
        Box::pin(async move {
            let rows: Vec<CounterRow> = sqlx::query_as(
                r"
                SELECT code, seq, created_at
                FROM id_counters
                ORDER BY code ASC
                ",
            )
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PersistenceError::Database(format!("Failed to list counters: {e}")))?;

            rows.into_iter().map(row_to_record).collect()
        })
    }
}

fn map_increment_error(code: &EntityCode, error: &sqlx::Error) -> PersistenceError {
    if let sqlx::Error::Database(db) = error {
        if db.code().as_deref() == Some(NUMERIC_VALUE_OUT_OF_RANGE) {
            return PersistenceError::Overflow { code: code.clone() };
        }
    }
    PersistenceError::Database(format!("Failed to increment counter: {error}"))
}

fn to_seq(code: &EntityCode, value: i64) -> Result<u64, PersistenceError> {
    u64::try_from(value)
        .ok()
        .filter(|seq| *seq > 0)
        .ok_or_else(|| PersistenceError::CorruptCounter {
            code: code.clone(),
            value,
        })
}

fn row_to_record((code, seq, created_at): CounterRow) -> Result<CounterRecord, PersistenceError> {
    let code = EntityCode::try_from(code)
        .map_err(|e| PersistenceError::Database(format!("Invalid code in id_counters: {e}")))?;
    let seq = to_seq(&code, seq)?;
    Ok(CounterRecord::new(code, seq, created_at))
}
