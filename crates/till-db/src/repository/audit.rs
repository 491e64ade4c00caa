//! # Audit Repository
//!
//! Stores committed audits. The denomination breakdown is kept as a JSON
//! text column:
//!
//! ```text
//! denominations = '{"bills":{"2000":3},"coins":{"25":8}}'   or NULL
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use till_core::{Audit, AuditStatus, Denominations, Scope};

const SELECT_AUDIT: &str = r#"
    SELECT
        id, tenant_id, branch_id, register_id,
        performed_at, performed_by,
        expected_cash_cents, actual_cash_cents, difference_cents,
        status, notes, denominations, adjustment_movement_id
    FROM cash_audits
"#;

/// Raw `cash_audits` row.
#[derive(Debug, sqlx::FromRow)]
struct AuditRow {
    id: String,
    tenant_id: String,
    branch_id: String,
    register_id: String,
    performed_at: DateTime<Utc>,
    performed_by: String,
    expected_cash_cents: i64,
    actual_cash_cents: i64,
    difference_cents: i64,
    status: AuditStatus,
    notes: Option<String>,
    denominations: Option<String>,
    adjustment_movement_id: Option<String>,
}

impl TryFrom<AuditRow> for Audit {
    type Error = DbError;

    fn try_from(row: AuditRow) -> DbResult<Self> {
        let denominations = row
            .denominations
            .as_deref()
            .map(|json| serde_json::from_str::<Denominations>(json))
            .transpose()?;

        Ok(Audit {
            id: row.id,
            tenant_id: row.tenant_id,
            branch_id: row.branch_id,
            register_id: row.register_id,
            performed_at: row.performed_at,
            performed_by: row.performed_by,
            expected_cash_cents: row.expected_cash_cents,
            actual_cash_cents: row.actual_cash_cents,
            difference_cents: row.difference_cents,
            status: row.status,
            notes: row.notes,
            denominations,
            adjustment_movement_id: row.adjustment_movement_id,
        })
    }
}

/// Repository for audit database operations.
#[derive(Debug, Clone)]
pub struct AuditRepository {
    pool: SqlitePool,
}

impl AuditRepository {
    /// Creates a new AuditRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AuditRepository { pool }
    }

    /// Gets an audit by ID.
    pub async fn get(&self, scope: &Scope, id: &str) -> DbResult<Option<Audit>> {
        let sql = format!("{SELECT_AUDIT} WHERE id = ?1 AND tenant_id = ?2 AND branch_id = ?3");
        let row = sqlx::query_as::<_, AuditRow>(&sql)
            .bind(id)
            .bind(&scope.tenant_id)
            .bind(&scope.branch_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Audit::try_from).transpose()
    }

    /// Lists a register's audits newest-first.
    pub async fn list(&self, scope: &Scope, register_id: &str) -> DbResult<Vec<Audit>> {
        let sql = format!(
            "{SELECT_AUDIT} WHERE register_id = ?1 AND tenant_id = ?2 AND branch_id = ?3 \
             ORDER BY performed_at DESC, rowid DESC"
        );
        let rows = sqlx::query_as::<_, AuditRow>(&sql)
            .bind(register_id)
            .bind(&scope.tenant_id)
            .bind(&scope.branch_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Audit::try_from).collect()
    }

    /// Most recent audit of a register.
    pub async fn last(&self, scope: &Scope, register_id: &str) -> DbResult<Option<Audit>> {
        let sql = format!(
            "{SELECT_AUDIT} WHERE register_id = ?1 AND tenant_id = ?2 AND branch_id = ?3 \
             ORDER BY performed_at DESC, rowid DESC LIMIT 1"
        );
        let row = sqlx::query_as::<_, AuditRow>(&sql)
            .bind(register_id)
            .bind(&scope.tenant_id)
            .bind(&scope.branch_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Audit::try_from).transpose()
    }

    /// Inserts a committed audit.
    pub async fn insert(conn: &mut SqliteConnection, audit: &Audit) -> DbResult<()> {
        debug!(
            id = %audit.id,
            register_id = %audit.register_id,
            status = %audit.status,
            "Inserting audit"
        );

        let denominations = audit
            .denominations
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO cash_audits (
                id, tenant_id, branch_id, register_id,
                performed_at, performed_by,
                expected_cash_cents, actual_cash_cents, difference_cents,
                status, notes, denominations, adjustment_movement_id
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6,
                ?7, ?8, ?9,
                ?10, ?11, ?12, ?13
            )
            "#,
        )
        .bind(&audit.id)
        .bind(&audit.tenant_id)
        .bind(&audit.branch_id)
        .bind(&audit.register_id)
        .bind(audit.performed_at)
        .bind(&audit.performed_by)
        .bind(audit.expected_cash_cents)
        .bind(audit.actual_cash_cents)
        .bind(audit.difference_cents)
        .bind(audit.status)
        .bind(&audit.notes)
        .bind(denominations)
        .bind(&audit.adjustment_movement_id)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::register::RegisterRepository;
    use crate::repository::testing::open_register;
    use till_core::Money;

    fn audit(register_id: &str, scope: &Scope, actual: i64, expected: i64) -> Audit {
        let difference = actual - expected;
        Audit {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id: scope.tenant_id.clone(),
            branch_id: scope.branch_id.clone(),
            register_id: register_id.to_string(),
            performed_at: Utc::now(),
            performed_by: "ana".to_string(),
            expected_cash_cents: expected,
            actual_cash_cents: actual,
            difference_cents: difference,
            status: AuditStatus::classify(Money::from_cents(difference)),
            notes: None,
            denominations: None,
            adjustment_movement_id: None,
        }
    }

    #[tokio::test]
    async fn test_denominations_round_trip_through_json_column() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let scope = Scope::new("t1", "b1");
        let reg = open_register(&scope, "Front", 0);

        let mut record = audit(&reg.id, &scope, 12_500, 5_000);
        record.denominations = Some(Denominations::new().with_bill(10_000, 1).with_coin(25, 100));

        let mut conn = db.pool().acquire().await.unwrap();
        RegisterRepository::insert_open(&mut conn, &reg, true).await.unwrap();
        AuditRepository::insert(&mut conn, &record).await.unwrap();
        drop(conn);

        let loaded = db.audits().get(&scope, &record.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, AuditStatus::Surplus);
        assert_eq!(loaded.difference_cents, 7_500);
        assert_eq!(loaded.denominations, record.denominations);
        assert_eq!(loaded.denomination_total(), Some(Money::from_cents(12_500)));
    }

    #[tokio::test]
    async fn test_list_and_last() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let scope = Scope::new("t1", "b1");
        let reg = open_register(&scope, "Front", 0);

        let mut first = audit(&reg.id, &scope, 100, 100);
        first.performed_at -= chrono::Duration::minutes(30);
        let second = audit(&reg.id, &scope, 90, 100);

        let mut conn = db.pool().acquire().await.unwrap();
        RegisterRepository::insert_open(&mut conn, &reg, true).await.unwrap();
        AuditRepository::insert(&mut conn, &first).await.unwrap();
        AuditRepository::insert(&mut conn, &second).await.unwrap();
        drop(conn);

        let listed = db.audits().list(&scope, &reg.id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[0].status, AuditStatus::Shortage);

        let last = db.audits().last(&scope, &reg.id).await.unwrap().unwrap();
        assert_eq!(last.id, second.id);

        assert!(db.audits().last(&scope, "other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_denominations_surface_as_serialization_error() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let scope = Scope::new("t1", "b1");
        let reg = open_register(&scope, "Front", 0);
        let record = audit(&reg.id, &scope, 0, 0);

        let mut conn = db.pool().acquire().await.unwrap();
        RegisterRepository::insert_open(&mut conn, &reg, true).await.unwrap();
        AuditRepository::insert(&mut conn, &record).await.unwrap();
        sqlx::query("UPDATE cash_audits SET denominations = 'not json' WHERE id = ?1")
            .bind(&record.id)
            .execute(&mut *conn)
            .await
            .unwrap();
        drop(conn);

        let err = db.audits().get(&scope, &record.id).await.unwrap_err();
        assert!(matches!(err, DbError::Serialization(_)));
    }
}
