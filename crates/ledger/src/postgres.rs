use async_trait::async_trait;
use common::{DriverId, TransactionId};
use sqlx::{PgConnection, PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    EventEnvelope, EventId, LedgerError, OrderId, Result, Version, WalletTransaction,
    store::{AppendOptions, EventStream, LedgerStore, validate_append},
};

const EVENT_COLUMNS: &str =
    "position, id, event_type, stream_id, stream_type, version, recorded_at, payload";

/// PostgreSQL-backed ledger.
///
/// Relies on the `unique_stream_version` and `unique_transaction_order`
/// constraints from `migrations/` to resolve concurrent writers.
#[derive(Clone)]
pub struct PostgresLedger {
    pool: PgPool,
}

impl PostgresLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_event(row: PgRow) -> Result<EventEnvelope> {
        Ok(EventEnvelope {
            event_id: EventId::from_uuid(row.try_get::<Uuid, _>("id")?),
            event_type: row.try_get("event_type")?,
            stream_id: OrderId::from_uuid(row.try_get::<Uuid, _>("stream_id")?),
            stream_type: row.try_get("stream_type")?,
            version: Version::new(row.try_get("version")?),
            position: row.try_get("position")?,
            recorded_at: row.try_get("recorded_at")?,
            payload: row.try_get("payload")?,
        })
    }

    fn row_to_transaction(row: PgRow) -> Result<WalletTransaction> {
        Ok(WalletTransaction {
            id: TransactionId::from_uuid(row.try_get::<Uuid, _>("id")?),
            wallet_id: DriverId::from_uuid(row.try_get::<Uuid, _>("wallet_id")?),
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            amount_cents: row.try_get("amount_cents")?,
            kind: row.try_get::<String, _>("kind")?.parse()?,
            status: row.try_get::<String, _>("status")?.parse()?,
            created_at: row.try_get("created_at")?,
        })
    }

    async fn insert_events(
        conn: &mut PgConnection,
        events: &[EventEnvelope],
        options: &AppendOptions,
    ) -> Result<Version> {
        validate_append(events, options)?;
        let stream_id = events[0].stream_id;

        if let Some(expected) = options.expected_version {
            let current: Option<i64> =
                sqlx::query_scalar("SELECT MAX(version) FROM events WHERE stream_id = $1")
                    .bind(stream_id.as_uuid())
                    .fetch_one(&mut *conn)
                    .await?;
            let actual = Version::new(current.unwrap_or(0));

            if actual != expected {
                return Err(LedgerError::ConcurrencyConflict {
                    order_id: stream_id,
                    expected,
                    actual,
                });
            }
        }

        let mut last_version = Version::initial();
        for event in events {
            sqlx::query(
                r#"
                INSERT INTO events (id, event_type, stream_id, stream_type, version, recorded_at, payload)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(event.event_id.as_uuid())
            .bind(&event.event_type)
            .bind(event.stream_id.as_uuid())
            .bind(&event.stream_type)
            .bind(event.version.as_i64())
            .bind(event.recorded_at)
            .bind(&event.payload)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                // A concurrent writer committed the same version first.
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.constraint() == Some("unique_stream_version")
                {
                    return LedgerError::ConcurrencyConflict {
                        order_id: stream_id,
                        expected: options.expected_version.unwrap_or(Version::initial()),
                        actual: event.version,
                    };
                }
                LedgerError::Database(e)
            })?;

            last_version = event.version;
        }

        Ok(last_version)
    }
}

#[async_trait]
impl LedgerStore for PostgresLedger {
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version> {
        let mut tx = self.pool.begin().await?;
        let version = Self::insert_events(&mut *tx, &events, &options).await?;
        tx.commit().await?;
        Ok(version)
    }

    async fn append_with_transaction(
        &self,
        events: Vec<EventEnvelope>,
        options: AppendOptions,
        transaction: WalletTransaction,
    ) -> Result<Version> {
        let mut tx = self.pool.begin().await?;
        let version = Self::insert_events(&mut *tx, &events, &options).await?;

        sqlx::query(
            r#"
            INSERT INTO wallet_transactions (id, wallet_id, order_id, amount_cents, kind, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(transaction.id.as_uuid())
        .bind(transaction.wallet_id.as_uuid())
        .bind(transaction.order_id.as_uuid())
        .bind(transaction.amount_cents)
        .bind(transaction.kind.as_str())
        .bind(transaction.status.as_str())
        .bind(transaction.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("unique_transaction_order")
            {
                return LedgerError::DuplicateTransaction {
                    order_id: transaction.order_id,
                };
            }
            LedgerError::Database(e)
        })?;

        tx.commit().await?;
        Ok(version)
    }

    async fn get_stream(&self, stream_id: OrderId) -> Result<Vec<EventEnvelope>> {
        let sql =
            format!("SELECT {EVENT_COLUMNS} FROM events WHERE stream_id = $1 ORDER BY version ASC");
        let rows = sqlx::query(&sql)
            .bind(stream_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_event).collect()
    }

    async fn stream_all_events(&self, after_position: i64) -> Result<EventStream> {
        use futures_util::stream;

        let sql =
            format!("SELECT {EVENT_COLUMNS} FROM events WHERE position > $1 ORDER BY position ASC");
        let rows = sqlx::query(&sql)
            .bind(after_position)
            .fetch_all(&self.pool)
            .await?;

        let events: Vec<_> = rows.into_iter().map(Self::row_to_event).collect();
        Ok(Box::pin(stream::iter(events)))
    }

    async fn stream_version(&self, stream_id: OrderId) -> Result<Option<Version>> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM events WHERE stream_id = $1")
                .bind(stream_id.as_uuid())
                .fetch_one(&self.pool)
                .await?;

        Ok(version.map(Version::new))
    }

    async fn transaction_for_order(&self, order_id: OrderId) -> Result<Option<WalletTransaction>> {
        let row = sqlx::query(
            r#"
            SELECT id, wallet_id, order_id, amount_cents, kind, status, created_at
            FROM wallet_transactions
            WHERE order_id = $1
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_transaction).transpose()
    }

    async fn wallet_transactions(&self, wallet_id: DriverId) -> Result<Vec<WalletTransaction>> {
        let rows = sqlx::query(
            r#"
            SELECT id, wallet_id, order_id, amount_cents, kind, status, created_at
            FROM wallet_transactions
            WHERE wallet_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(wallet_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_transaction).collect()
    }
}
