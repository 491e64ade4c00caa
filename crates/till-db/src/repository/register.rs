//! # Register Repository
//!
//! Database operations for cash registers.
//!
//! ## Write Statements
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  insert_open      INSERT ... SELECT ... WHERE NOT EXISTS (open one)    │
//! │                   → the single-open check and the insert are atomic    │
//! │                                                                         │
//! │  apply_delta      UPDATE current_balance = current_balance + ?         │
//! │                   WHERE status = 'open' AND |new balance| <= limit     │
//! │                   → first statement of every append transaction,      │
//! │                     takes the write lock before anything is read       │
//! │                                                                         │
//! │  lock             UPDATE updated_at = ? WHERE status = 'open'          │
//! │                   → same, for close, audit and rebuild                 │
//! │                                                                         │
//! │  mark_closed      UPDATE status = 'closed' WHERE status = 'open'       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All write statements are associated functions over a connection so the
//! engine can compose them inside one transaction.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use till_core::{Money, Register, Scope, MAX_BALANCE_CENTS};

const SELECT_REGISTER: &str = r#"
    SELECT
        id, tenant_id, branch_id, name, status,
        initial_balance_cents, current_balance_cents,
        expected_final_balance_cents, actual_final_balance_cents,
        opened_at, opened_by, closed_at, closed_by,
        notes, updated_at
    FROM cash_registers
"#;

/// Final figures written when a register closes.
#[derive(Debug, Clone)]
pub struct CloseRecord<'a> {
    pub expected_final_balance: Money,
    pub actual_final_balance: Option<Money>,
    pub closed_at: DateTime<Utc>,
    pub closed_by: &'a str,
    pub notes: Option<&'a str>,
}

/// Repository for register database operations.
#[derive(Debug, Clone)]
pub struct RegisterRepository {
    pool: SqlitePool,
}

impl RegisterRepository {
    /// Creates a new RegisterRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RegisterRepository { pool }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets a register by ID within a scope.
    pub async fn get(&self, scope: &Scope, id: &str) -> DbResult<Option<Register>> {
        let mut conn = self.pool.acquire().await?;
        Self::find(&mut conn, scope, id).await
    }

    /// Lists registers newest-first.
    pub async fn list(&self, scope: &Scope) -> DbResult<Vec<Register>> {
        let sql = format!(
            "{SELECT_REGISTER} WHERE tenant_id = ?1 AND branch_id = ?2 \
             ORDER BY opened_at DESC, rowid DESC"
        );
        let registers = sqlx::query_as::<_, Register>(&sql)
            .bind(&scope.tenant_id)
            .bind(&scope.branch_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(registers)
    }

    /// Lists open registers newest-first.
    pub async fn list_open(&self, scope: &Scope) -> DbResult<Vec<Register>> {
        let sql = format!(
            "{SELECT_REGISTER} WHERE tenant_id = ?1 AND branch_id = ?2 AND status = 'open' \
             ORDER BY opened_at DESC, rowid DESC"
        );
        let registers = sqlx::query_as::<_, Register>(&sql)
            .bind(&scope.tenant_id)
            .bind(&scope.branch_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(registers)
    }

    /// Gets a register on a specific connection (inside a transaction).
    pub async fn find(
        conn: &mut SqliteConnection,
        scope: &Scope,
        id: &str,
    ) -> DbResult<Option<Register>> {
        let sql = format!("{SELECT_REGISTER} WHERE id = ?1 AND tenant_id = ?2 AND branch_id = ?3");
        let register = sqlx::query_as::<_, Register>(&sql)
            .bind(id)
            .bind(&scope.tenant_id)
            .bind(&scope.branch_id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(register)
    }

    /// Returns the open register of the scope, if any.
    pub async fn find_open(conn: &mut SqliteConnection, scope: &Scope) -> DbResult<Option<Register>> {
        let sql = format!(
            "{SELECT_REGISTER} WHERE tenant_id = ?1 AND branch_id = ?2 AND status = 'open' \
             ORDER BY opened_at DESC, rowid DESC LIMIT 1"
        );
        let register = sqlx::query_as::<_, Register>(&sql)
            .bind(&scope.tenant_id)
            .bind(&scope.branch_id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(register)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Inserts a freshly opened register.
    ///
    /// With `single_open`, the insert only happens when the scope has no open
    /// register. Returns whether a row was inserted.
    pub async fn insert_open(
        conn: &mut SqliteConnection,
        register: &Register,
        single_open: bool,
    ) -> DbResult<bool> {
        debug!(id = %register.id, name = %register.name, "Inserting register");

        let guard = if single_open {
            "WHERE NOT EXISTS (
                SELECT 1 FROM cash_registers
                WHERE tenant_id = ?2 AND branch_id = ?3 AND status = 'open'
            )"
        } else {
            ""
        };

        let sql = format!(
            r#"
            INSERT INTO cash_registers (
                id, tenant_id, branch_id, name, status,
                initial_balance_cents, current_balance_cents,
                expected_final_balance_cents, actual_final_balance_cents,
                opened_at, opened_by, closed_at, closed_by,
                notes, updated_at
            )
            SELECT
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7,
                ?8, ?9,
                ?10, ?11, ?12, ?13,
                ?14, ?15
            {guard}
            "#
        );

        let result = sqlx::query(&sql)
            .bind(&register.id)
            .bind(&register.tenant_id)
            .bind(&register.branch_id)
            .bind(&register.name)
            .bind(register.status)
            .bind(register.initial_balance_cents)
            .bind(register.current_balance_cents)
            .bind(register.expected_final_balance_cents)
            .bind(register.actual_final_balance_cents)
            .bind(register.opened_at)
            .bind(&register.opened_by)
            .bind(register.closed_at)
            .bind(&register.closed_by)
            .bind(&register.notes)
            .bind(register.updated_at)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Atomically adds `delta` to the balance of an open register.
    ///
    /// Returns false when no open register matched, or when the new balance
    /// would leave `±MAX_BALANCE_CENTS`. The statement still takes the write
    /// lock in both cases.
    pub async fn apply_delta(
        conn: &mut SqliteConnection,
        scope: &Scope,
        id: &str,
        delta: Money,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        debug!(register_id = %id, delta = %delta, "Applying balance delta");

        let result = sqlx::query(
            r#"
            UPDATE cash_registers
            SET current_balance_cents = current_balance_cents + ?1,
                updated_at = ?2
            WHERE id = ?3 AND tenant_id = ?4 AND branch_id = ?5 AND status = 'open'
              AND ABS(current_balance_cents + ?1) <= ?6
            "#,
        )
        .bind(delta.cents())
        .bind(now)
        .bind(id)
        .bind(&scope.tenant_id)
        .bind(&scope.branch_id)
        .bind(MAX_BALANCE_CENTS)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Takes the database write lock for a register.
    ///
    /// Only an open register's `updated_at` is touched; a closed row stays as
    /// it is. Returns whether an open register matched, so callers tell a
    /// closed register from a missing one with [`RegisterRepository::find`].
    pub async fn lock(
        conn: &mut SqliteConnection,
        scope: &Scope,
        id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE cash_registers
            SET updated_at = ?1
            WHERE id = ?2 AND tenant_id = ?3 AND branch_id = ?4 AND status = 'open'
            "#,
        )
        .bind(now)
        .bind(id)
        .bind(&scope.tenant_id)
        .bind(&scope.branch_id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Closes an open register. Returns false if it was not open.
    pub async fn mark_closed(
        conn: &mut SqliteConnection,
        scope: &Scope,
        id: &str,
        record: &CloseRecord<'_>,
    ) -> DbResult<bool> {
        debug!(
            register_id = %id,
            expected = %record.expected_final_balance,
            "Closing register"
        );

        let result = sqlx::query(
            r#"
            UPDATE cash_registers
            SET status = 'closed',
                expected_final_balance_cents = ?1,
                actual_final_balance_cents = ?2,
                closed_at = ?3,
                closed_by = ?4,
                notes = ?5,
                updated_at = ?3
            WHERE id = ?6 AND tenant_id = ?7 AND branch_id = ?8 AND status = 'open'
            "#,
        )
        .bind(record.expected_final_balance.cents())
        .bind(record.actual_final_balance.map(|m| m.cents()))
        .bind(record.closed_at)
        .bind(record.closed_by)
        .bind(record.notes)
        .bind(id)
        .bind(&scope.tenant_id)
        .bind(&scope.branch_id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Overwrites the tracked balance (repair path).
    pub async fn set_balance(
        conn: &mut SqliteConnection,
        scope: &Scope,
        id: &str,
        balance: Money,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        debug!(register_id = %id, balance = %balance, "Overwriting tracked balance");

        let result = sqlx::query(
            r#"
            UPDATE cash_registers
            SET current_balance_cents = ?1,
                updated_at = ?2
            WHERE id = ?3 AND tenant_id = ?4 AND branch_id = ?5
            "#,
        )
        .bind(balance.cents())
        .bind(now)
        .bind(id)
        .bind(&scope.tenant_id)
        .bind(&scope.branch_id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::testing::open_register;

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = db().await;
        let scope = Scope::new("t1", "b1");
        let reg = open_register(&scope, "Front", 10_000);

        let mut conn = db.pool().acquire().await.unwrap();
        assert!(RegisterRepository::insert_open(&mut conn, &reg, true).await.unwrap());
        drop(conn);

        let loaded = db.registers().get(&scope, &reg.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Front");
        assert_eq!(loaded.current_balance_cents, 10_000);
        assert!(loaded.is_open());
    }

    #[tokio::test]
    async fn test_scope_isolation() {
        let db = db().await;
        let scope = Scope::new("t1", "b1");
        let reg = open_register(&scope, "Front", 0);

        let mut conn = db.pool().acquire().await.unwrap();
        RegisterRepository::insert_open(&mut conn, &reg, true).await.unwrap();
        drop(conn);

        let other = Scope::new("t1", "b2");
        assert!(db.registers().get(&other, &reg.id).await.unwrap().is_none());
        assert!(db.registers().list(&other).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_single_open_guard() {
        let db = db().await;
        let scope = Scope::new("t1", "b1");
        let first = open_register(&scope, "A", 0);
        let second = open_register(&scope, "B", 0);

        let mut conn = db.pool().acquire().await.unwrap();
        assert!(RegisterRepository::insert_open(&mut conn, &first, true).await.unwrap());
        assert!(!RegisterRepository::insert_open(&mut conn, &second, true).await.unwrap());
        assert!(RegisterRepository::insert_open(&mut conn, &second, false).await.unwrap());

        let open = RegisterRepository::find_open(&mut conn, &scope).await.unwrap();
        assert!(open.is_some());
    }

    #[tokio::test]
    async fn test_apply_delta_only_when_open() {
        let db = db().await;
        let scope = Scope::new("t1", "b1");
        let reg = open_register(&scope, "Front", 10_000);
        let now = Utc::now();

        let mut conn = db.pool().acquire().await.unwrap();
        RegisterRepository::insert_open(&mut conn, &reg, true).await.unwrap();

        assert!(
            RegisterRepository::apply_delta(&mut conn, &scope, &reg.id, Money::from_cents(-2_500), now)
                .await
                .unwrap()
        );

        let record = CloseRecord {
            expected_final_balance: Money::from_cents(7_500),
            actual_final_balance: None,
            closed_at: now,
            closed_by: "ana",
            notes: None,
        };
        assert!(RegisterRepository::mark_closed(&mut conn, &scope, &reg.id, &record).await.unwrap());
        assert!(!RegisterRepository::mark_closed(&mut conn, &scope, &reg.id, &record).await.unwrap());
        let before = RegisterRepository::find(&mut conn, &scope, &reg.id).await.unwrap().unwrap();

        assert!(
            !RegisterRepository::apply_delta(&mut conn, &scope, &reg.id, Money::from_cents(100), now)
                .await
                .unwrap()
        );
        let later = now + chrono::Duration::minutes(5);
        assert!(!RegisterRepository::lock(&mut conn, &scope, &reg.id, later).await.unwrap());
        assert!(!RegisterRepository::lock(&mut conn, &scope, "missing", later).await.unwrap());

        let closed = RegisterRepository::find(&mut conn, &scope, &reg.id).await.unwrap().unwrap();
        assert_eq!(closed.updated_at, before.updated_at);
        assert_eq!(closed.current_balance_cents, 7_500);
        assert_eq!(closed.expected_final_balance_cents, Some(7_500));
        assert_eq!(closed.closed_by.as_deref(), Some("ana"));
        assert!(!closed.is_open());
    }

    #[tokio::test]
    async fn test_apply_delta_keeps_balance_in_range() {
        let db = db().await;
        let scope = Scope::new("t1", "b1");
        let reg = open_register(&scope, "Front", 10_000);
        let now = Utc::now();

        let mut conn = db.pool().acquire().await.unwrap();
        RegisterRepository::insert_open(&mut conn, &reg, true).await.unwrap();

        let to_limit = Money::from_cents(MAX_BALANCE_CENTS - 10_000);
        assert!(RegisterRepository::apply_delta(&mut conn, &scope, &reg.id, to_limit, now).await.unwrap());
        assert!(
            !RegisterRepository::apply_delta(&mut conn, &scope, &reg.id, Money::from_cents(1), now)
                .await
                .unwrap()
        );
        assert!(
            !RegisterRepository::apply_delta(&mut conn, &scope, &reg.id, Money::from_cents(i64::MAX), now)
                .await
                .unwrap()
        );

        let loaded = RegisterRepository::find(&mut conn, &scope, &reg.id).await.unwrap().unwrap();
        assert_eq!(loaded.current_balance_cents, MAX_BALANCE_CENTS);
        assert!(loaded.is_open());
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let db = db().await;
        let scope = Scope::new("t1", "b1");
        let mut older = open_register(&scope, "Morning", 0);
        older.opened_at -= chrono::Duration::hours(8);
        let newer = open_register(&scope, "Evening", 0);

        let mut conn = db.pool().acquire().await.unwrap();
        RegisterRepository::insert_open(&mut conn, &older, false).await.unwrap();
        RegisterRepository::insert_open(&mut conn, &newer, false).await.unwrap();
        drop(conn);

        let names: Vec<String> = db
            .registers()
            .list(&scope)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["Evening", "Morning"]);
        assert_eq!(db.registers().list_open(&scope).await.unwrap().len(), 2);
    }
}
