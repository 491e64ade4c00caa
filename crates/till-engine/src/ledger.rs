//! # Movement Ledger
//!
//! Appends movements and keeps `current_balance` in step with them.
//!
//! ## Append Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                 │
//! │   1. UPDATE cash_registers                                             │
//! │        SET current_balance = current_balance + delta                   │
//! │        WHERE id = ? AND status = 'open'      ← takes the write lock    │
//! │          AND |balance + delta| <= MAX_BALANCE_CENTS                    │
//! │        0 rows? → RegisterNotFound / RegisterClosed / Validation        │
//! │   2. SELECT last sequence, created_at        ← stable under the lock   │
//! │   3. INSERT INTO cash_movements (sequence + 1, max(now, last))         │
//! │  COMMIT                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Concurrent appends to one register queue on SQLite's write lock, so the
//! balance update never races and sequence numbers follow commit order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::{debug, info};
use uuid::Uuid;

use till_core::validation::{
    validate_actor, validate_description, validate_movement_amount, validate_required,
    validate_scope,
};
use till_core::{
    Money, Movement, MovementType, NewMovement, PaymentMethod, Scope, ValidationError,
    MAX_BALANCE_CENTS,
};
use till_db::{Database, MovementRepository, RegisterRepository};

use crate::error::{EngineError, EngineResult};

/// An order payment or refund coming from checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPayment {
    pub register_id: String,
    pub order_id: String,
    pub order_number: Option<String>,
    pub amount: Money,
    pub payment_method: PaymentMethod,
}

impl OrderPayment {
    /// `#A-17` when the order has a number, else the order id.
    fn label(&self) -> &str {
        self.order_number.as_deref().unwrap_or(&self.order_id)
    }
}

/// Movement ledger operations.
#[derive(Debug, Clone)]
pub struct Ledger {
    db: Database,
}

impl Ledger {
    pub(crate) fn new(db: Database) -> Self {
        Ledger { db }
    }

    /// Appends a movement to an open register.
    ///
    /// ## Errors
    /// - `Validation` for a blank scope, actor or register id, an amount
    ///   beyond `MAX_AMOUNT_CENTS`, or a balance that would leave
    ///   `±MAX_BALANCE_CENTS`
    /// - `RegisterNotFound` / `RegisterClosed` (not retryable)
    /// - `Database` (retryable when transient; check [`Ledger::get`] first)
    pub async fn append(
        &self,
        scope: &Scope,
        actor: &str,
        request: NewMovement,
    ) -> EngineResult<Movement> {
        validate_scope(scope)?;
        validate_actor(actor)?;
        validate_required("register_id", &request.register_id)?;
        validate_movement_amount(request.amount)?;

        let mut tx = self.db.begin().await?;
        let movement = append_in(&mut tx, scope, actor, request, Utc::now()).await?;
        tx.commit().await?;

        info!(
            register_id = %movement.register_id,
            movement_id = %movement.id,
            sequence = movement.sequence,
            movement_type = %movement.movement_type,
            amount = %movement.amount(),
            "Movement appended"
        );
        Ok(movement)
    }

    /// Records an order payment as a SALE.
    pub async fn register_sale(
        &self,
        scope: &Scope,
        actor: &str,
        payment: OrderPayment,
    ) -> EngineResult<Movement> {
        validate_required("order_id", &payment.order_id)?;

        let description = format!("Sale for order #{}", payment.label());
        let request = NewMovement::new(
            payment.register_id.clone(),
            MovementType::Sale,
            payment.amount,
            payment.payment_method,
            description,
        )
        .with_order(payment.order_id, payment.order_number);

        self.append(scope, actor, request).await
    }

    /// Records an order refund as a REFUND.
    pub async fn register_refund(
        &self,
        scope: &Scope,
        actor: &str,
        payment: OrderPayment,
        reason: &str,
    ) -> EngineResult<Movement> {
        validate_required("order_id", &payment.order_id)?;

        let reason = reason.trim();
        let description = if reason.is_empty() {
            format!("Refund for order #{}", payment.label())
        } else {
            format!("Refund for order #{}: {}", payment.label(), reason)
        };
        let request = NewMovement::new(
            payment.register_id.clone(),
            MovementType::Refund,
            payment.amount,
            payment.payment_method,
            description,
        )
        .with_order(payment.order_id, payment.order_number);

        self.append(scope, actor, request).await
    }

    /// Lists a register's movements newest-first, whatever its status.
    pub async fn list(&self, scope: &Scope, register_id: &str) -> EngineResult<Vec<Movement>> {
        validate_scope(scope)?;
        Ok(self.db.movements().list(scope, register_id).await?)
    }

    /// Looks up a movement by id.
    pub async fn get(&self, scope: &Scope, movement_id: &str) -> EngineResult<Option<Movement>> {
        validate_scope(scope)?;
        Ok(self.db.movements().get(scope, movement_id).await?)
    }

    /// Movements of a register that reference an order, newest-first.
    pub async fn find_by_order(
        &self,
        scope: &Scope,
        register_id: &str,
        order_id: &str,
    ) -> EngineResult<Vec<Movement>> {
        validate_scope(scope)?;
        Ok(self
            .db
            .movements()
            .find_by_order(scope, register_id, order_id)
            .await?)
    }
}

/// Appends on a connection that is already inside a transaction.
///
/// The balance update runs first so the transaction holds the write lock
/// before anything is read.
pub(crate) async fn append_in(
    conn: &mut SqliteConnection,
    scope: &Scope,
    actor: &str,
    request: NewMovement,
    now: DateTime<Utc>,
) -> EngineResult<Movement> {
    let description = validate_description(&request.description)?;
    let stored = request.movement_type.normalize_amount(request.amount);
    let delta = request.movement_type.balance_delta(stored);

    let applied = RegisterRepository::apply_delta(conn, scope, &request.register_id, delta, now).await?;
    if !applied {
        let register = RegisterRepository::find(conn, scope, &request.register_id)
            .await?
            .ok_or_else(|| EngineError::not_found(&request.register_id))?;
        register.ensure_open()?;
        return Err(ValidationError::invalid_amount(
            "amount",
            format!(
                "register balance would exceed {}",
                Money::from_cents(MAX_BALANCE_CENTS)
            ),
        )
        .into());
    }

    let tail = MovementRepository::tail(conn, &request.register_id).await?;
    let movement = Movement {
        id: Uuid::new_v4().to_string(),
        tenant_id: scope.tenant_id.clone(),
        branch_id: scope.branch_id.clone(),
        register_id: request.register_id,
        sequence: tail.next_sequence,
        movement_type: request.movement_type,
        amount_cents: stored.cents(),
        payment_method: request.payment_method,
        description,
        reference: request.reference,
        order_id: request.order_id,
        order_number: request.order_number,
        created_at: tail.stamp(now),
        created_by: actor.to_string(),
    };
    MovementRepository::insert(conn, &movement).await?;

    debug!(register_id = %movement.register_id, delta = %delta, "Balance updated");
    Ok(movement)
}

// =============================================================================
// Unit Tests
// =============================================================================
