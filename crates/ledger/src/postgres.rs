use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    entry::{DispatchState, EventId, LedgerEntry},
    error::{LedgerError, Result},
    ledger::{EntryStream, EventLedger, validate_entries_for_append},
};

const ENTRY_COLUMNS: &str =
    "position, id, event_type, owner_id, payload, produced_at, state, attempts, last_error, next_attempt_at";

/// PostgreSQL-backed event ledger.
///
/// Entries live in the `outbox_entries` table. The `position` column
/// (BIGSERIAL) captures production order; `claimed_at` is the exclusive
/// claim flag, taken under `FOR UPDATE SKIP LOCKED` so concurrent workers
/// never claim the same entry.
#[derive(Clone)]
pub struct PostgresLedger {
    pool: PgPool,
}

impl PostgresLedger {
    /// Creates a new PostgreSQL ledger.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Appends entries as part of a caller-owned transaction.
    ///
    /// This is the transactional-outbox coupling point: the caller updates
    /// the aggregate row and inserts the produced entries in the same
    /// transaction, so a rollback removes both.
    pub async fn append_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        entries: &[LedgerEntry],
    ) -> Result<()> {
        validate_entries_for_append(entries)?;

        for entry in entries {
            sqlx::query(
                r#"
                INSERT INTO outbox_entries (id, event_type, owner_id, payload, produced_at, state)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(entry.event_id.as_uuid())
            .bind(&entry.event_type)
            .bind(entry.owner_id)
            .bind(&entry.payload)
            .bind(entry.produced_at)
            .bind(entry.state.as_str())
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    fn row_to_entry(row: PgRow) -> Result<LedgerEntry> {
        let state_tag: String = row.try_get("state")?;
        let state = DispatchState::parse(&state_tag).ok_or_else(|| {
            LedgerError::Validation(format!("Unknown dispatch state: {state_tag}"))
        })?;

        Ok(LedgerEntry {
            event_id: EventId::from_uuid(row.try_get::<Uuid, _>("id")?),
            event_type: row.try_get("event_type")?,
            owner_id: row.try_get("owner_id")?,
            payload: row.try_get("payload")?,
            produced_at: row.try_get("produced_at")?,
            state,
            attempts: row.try_get::<i32, _>("attempts")? as u32,
            last_error: row.try_get("last_error")?,
            next_attempt_at: row.try_get("next_attempt_at")?,
        })
    }
}

#[async_trait]
impl EventLedger for PostgresLedger {
    async fn append(&self, entries: Vec<LedgerEntry>) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::append_in_tx(&mut tx, &entries).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn claim_batch(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<LedgerEntry>> {
        // Deliverable entries whose owner has no earlier unresolved or
        // in-flight entry; claimed by setting claimed_at. SKIP LOCKED keeps
        // concurrent claimers from blocking on each other.
        let rows = sqlx::query(&format!(
            r#"
            WITH eligible AS (
                SELECT o.position FROM outbox_entries o
                WHERE o.claimed_at IS NULL
                  AND (o.state = 'pending'
                       OR (o.state = 'failed'
                           AND o.next_attempt_at IS NOT NULL
                           AND o.next_attempt_at <= $1))
                  AND NOT EXISTS (
                      SELECT 1 FROM outbox_entries p
                      WHERE p.owner_id = o.owner_id
                        AND p.position < o.position
                        AND (p.claimed_at IS NOT NULL
                             OR p.state = 'pending'
                             OR (p.state = 'failed' AND p.next_attempt_at IS NOT NULL))
                  )
                ORDER BY o.position
                LIMIT $2
                FOR UPDATE OF o SKIP LOCKED
            )
            UPDATE outbox_entries SET claimed_at = $1
            WHERE position IN (SELECT position FROM eligible)
            RETURNING {ENTRY_COLUMNS}
            "#
        ))
        .bind(now)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut claimed = rows
            .into_iter()
            .map(|row| {
                let position: i64 = row.try_get("position")?;
                Ok((position, Self::row_to_entry(row)?))
            })
            .collect::<Result<Vec<_>>>()?;
        claimed.sort_by_key(|(position, _)| *position);

        Ok(claimed.into_iter().map(|(_, entry)| entry).collect())
    }

    async fn mark_dispatched(&self, event_id: EventId) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE outbox_entries
            SET state = 'dispatched', next_attempt_at = NULL, claimed_at = NULL
            WHERE id = $1
            "#,
        )
        .bind(event_id.as_uuid())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::EntryNotFound(event_id));
        }

        metrics::counter!("ledger_entries_dispatched").increment(1);
        Ok(())
    }

    async fn mark_failed(
        &self,
        event_id: EventId,
        reason: &str,
        retry_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE outbox_entries
            SET state = 'failed',
                attempts = attempts + 1,
                last_error = $2,
                next_attempt_at = $3,
                claimed_at = NULL
            WHERE id = $1
            "#,
        )
        .bind(event_id.as_uuid())
        .bind(reason)
        .bind(retry_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::EntryNotFound(event_id));
        }

        if retry_at.is_none() {
            metrics::counter!("ledger_entries_dead_lettered").increment(1);
            tracing::warn!(%event_id, reason, "ledger entry dead-lettered");
        }
        Ok(())
    }

    async fn entry(&self, event_id: EventId) -> Result<Option<LedgerEntry>> {
        let row = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM outbox_entries WHERE id = $1"
        ))
        .bind(event_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_entry).transpose()
    }

    async fn entries_in_state(&self, state: DispatchState) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM outbox_entries WHERE state = $1 ORDER BY position"
        ))
        .bind(state.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_entry).collect()
    }

    async fn pending_count(&self) -> Result<usize> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM outbox_entries WHERE state = 'pending'")
                .fetch_one(&self.pool)
                .await?;
        Ok(count as usize)
    }

    async fn stream_all(&self) -> Result<EntryStream> {
        use futures_util::stream;

        let rows = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM outbox_entries ORDER BY position"
        ))
        .fetch_all(&self.pool)
        .await?;

        let entries = rows
            .into_iter()
            .map(Self::row_to_entry)
            .collect::<Result<Vec<_>>>()?;
        Ok(Box::pin(stream::iter(entries.into_iter().map(Ok))))
    }
}
