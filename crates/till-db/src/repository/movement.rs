//! # Movement Repository
//!
//! Append-only storage for ledger movements.
//!
//! Rows are never updated or deleted. Within a register, `sequence` is
//! strictly increasing and `created_at` never decreases, so newest-first is
//! simply `ORDER BY sequence DESC`.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use till_core::{Movement, Scope};

const SELECT_MOVEMENT: &str = r#"
    SELECT
        id, tenant_id, branch_id, register_id, sequence,
        movement_type, amount_cents, payment_method,
        description, reference, order_id, order_number,
        created_at, created_by
    FROM cash_movements
"#;

/// Where the next movement of a register goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerTail {
    pub next_sequence: i64,
    pub last_created_at: Option<DateTime<Utc>>,
}

impl LedgerTail {
    /// Clamps `now` so timestamps never go backwards within a register.
    pub fn stamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.last_created_at {
            Some(last) if last > now => last,
            _ => now,
        }
    }
}

/// Repository for movement database operations.
#[derive(Debug, Clone)]
pub struct MovementRepository {
    pool: SqlitePool,
}

impl MovementRepository {
    /// Creates a new MovementRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MovementRepository { pool }
    }

    /// Gets a movement by ID.
    pub async fn get(&self, scope: &Scope, id: &str) -> DbResult<Option<Movement>> {
        let sql = format!("{SELECT_MOVEMENT} WHERE id = ?1 AND tenant_id = ?2 AND branch_id = ?3");
        let movement = sqlx::query_as::<_, Movement>(&sql)
            .bind(id)
            .bind(&scope.tenant_id)
            .bind(&scope.branch_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(movement)
    }

    /// Lists a register's movements newest-first.
    pub async fn list(&self, scope: &Scope, register_id: &str) -> DbResult<Vec<Movement>> {
        let mut conn = self.pool.acquire().await?;
        Self::list_for_register(&mut conn, scope, register_id).await
    }

    /// Movements of a register that reference an order, newest-first.
    pub async fn find_by_order(
        &self,
        scope: &Scope,
        register_id: &str,
        order_id: &str,
    ) -> DbResult<Vec<Movement>> {
        let sql = format!(
            "{SELECT_MOVEMENT} WHERE register_id = ?1 AND order_id = ?2 \
             AND tenant_id = ?3 AND branch_id = ?4 ORDER BY sequence DESC"
        );
        let movements = sqlx::query_as::<_, Movement>(&sql)
            .bind(register_id)
            .bind(order_id)
            .bind(&scope.tenant_id)
            .bind(&scope.branch_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }

    /// Lists a register's movements on a specific connection, newest-first.
    pub async fn list_for_register(
        conn: &mut SqliteConnection,
        scope: &Scope,
        register_id: &str,
    ) -> DbResult<Vec<Movement>> {
        let sql = format!(
            "{SELECT_MOVEMENT} WHERE register_id = ?1 AND tenant_id = ?2 AND branch_id = ?3 \
             ORDER BY sequence DESC"
        );
        let movements = sqlx::query_as::<_, Movement>(&sql)
            .bind(register_id)
            .bind(&scope.tenant_id)
            .bind(&scope.branch_id)
            .fetch_all(&mut *conn)
            .await?;

        Ok(movements)
    }

    /// Reads the position of the next append.
    ///
    /// Only meaningful once the caller holds the write lock.
    pub async fn tail(conn: &mut SqliteConnection, register_id: &str) -> DbResult<LedgerTail> {
        let last: Option<(i64, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT sequence, created_at
            FROM cash_movements
            WHERE register_id = ?1
            ORDER BY sequence DESC
            LIMIT 1
            "#,
        )
        .bind(register_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(match last {
            Some((sequence, created_at)) => LedgerTail {
                next_sequence: sequence + 1,
                last_created_at: Some(created_at),
            },
            None => LedgerTail {
                next_sequence: 1,
                last_created_at: None,
            },
        })
    }

    /// Inserts a movement.
    pub async fn insert(conn: &mut SqliteConnection, movement: &Movement) -> DbResult<()> {
        debug!(
            id = %movement.id,
            register_id = %movement.register_id,
            sequence = movement.sequence,
            movement_type = %movement.movement_type,
            "Inserting movement"
        );

        sqlx::query(
            r#"
            INSERT INTO cash_movements (
                id, tenant_id, branch_id, register_id, sequence,
                movement_type, amount_cents, payment_method,
                description, reference, order_id, order_number,
                created_at, created_by
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8,
                ?9, ?10, ?11, ?12,
                ?13, ?14
            )
            "#,
        )
        .bind(&movement.id)
        .bind(&movement.tenant_id)
        .bind(&movement.branch_id)
        .bind(&movement.register_id)
        .bind(movement.sequence)
        .bind(movement.movement_type)
        .bind(movement.amount_cents)
        .bind(movement.payment_method)
        .bind(&movement.description)
        .bind(&movement.reference)
        .bind(&movement.order_id)
        .bind(&movement.order_number)
        .bind(movement.created_at)
        .bind(&movement.created_by)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
