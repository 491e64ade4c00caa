//! # Denomination Counter
//!
//! Turns a drawer count (face value → number of pieces) into a total.
//!
//! ## Shape
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  bills: { 2000: 3, 1000: 2 }   →  $60.00 + $20.00          │
//! │  coins: {  100: 4,   25: 8 }   →   $4.00 +  $2.00          │
//! │                                   ───────                  │
//! │                           total:   $86.00                  │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Keys are face values in cents. Raw counts arrive from a form, so they go
//! through [`DenominationInput::sanitize`] first: empty entries are dropped,
//! negative counts become zero, and a face value that is not positive is
//! rejected. So is a count above [`MAX_DENOMINATION_COUNT`] or a group whose
//! total exceeds [`MAX_AMOUNT_CENTS`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_AMOUNT_CENTS, MAX_DENOMINATION_COUNT};

/// A sanitized drawer count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Denominations {
    /// Bill face value (cents) → count.
    #[ts(type = "Record<string, number>")]
    #[serde(default)]
    pub bills: BTreeMap<i64, i64>,

    /// Coin face value (cents) → count.
    #[ts(type = "Record<string, number>")]
    #[serde(default)]
    pub coins: BTreeMap<i64, i64>,
}

impl Denominations {
    pub fn new() -> Self {
        Denominations::default()
    }

    /// Adds `count` bills of `face_value_cents`.
    pub fn with_bill(mut self, face_value_cents: i64, count: i64) -> Self {
        *self.bills.entry(face_value_cents).or_insert(0) += count;
        self
    }

    /// Adds `count` coins of `face_value_cents`.
    pub fn with_coin(mut self, face_value_cents: i64, count: i64) -> Self {
        *self.coins.entry(face_value_cents).or_insert(0) += count;
        self
    }

    pub fn bills_total(&self) -> Money {
        group_total(&self.bills)
    }

    pub fn coins_total(&self) -> Money {
        group_total(&self.coins)
    }

    /// Σ face value × count over bills and coins.
    ///
    /// Saturates at the `i64` range; sanitized counts never get there.
    ///
    /// ## Example
    /// ```rust
    /// use till_core::Denominations;
    ///
    /// let count = Denominations::new()
    ///     .with_bill(10_000, 1)
    ///     .with_bill(2_000, 1)
    ///     .with_coin(100, 5);
    /// assert_eq!(count.total().cents(), 12_500);
    /// ```
    pub fn total(&self) -> Money {
        Money::from_cents(
            self.bills_total()
                .cents()
                .saturating_add(self.coins_total().cents()),
        )
    }

    /// Number of physical pieces counted.
    pub fn piece_count(&self) -> i64 {
        self.bills
            .values()
            .chain(self.coins.values())
            .fold(0i64, |acc, count| acc.saturating_add(*count))
    }

    pub fn is_empty(&self) -> bool {
        self.bills.is_empty() && self.coins.is_empty()
    }
}

fn group_total(group: &BTreeMap<i64, i64>) -> Money {
    let cents = group.iter().fold(0i64, |acc, (face, count)| {
        acc.saturating_add(face.saturating_mul(*count))
    });
    Money::from_cents(cents)
}

// =============================================================================
// Raw Input
// =============================================================================

/// A drawer count as submitted, before sanitization.
///
/// `None` counts come from blank form fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DenominationInput {
    #[ts(type = "Record<string, number | null>")]
    #[serde(default)]
    pub bills: BTreeMap<i64, Option<i64>>,

    #[ts(type = "Record<string, number | null>")]
    #[serde(default)]
    pub coins: BTreeMap<i64, Option<i64>>,
}

impl DenominationInput {
    /// Normalizes raw counts into [`Denominations`].
    ///
    /// Zero counts are kept so the breakdown shows what was checked.
    pub fn sanitize(self) -> Result<Denominations, ValidationError> {
        Ok(Denominations {
            bills: sanitize_group("bills", self.bills)?,
            coins: sanitize_group("coins", self.coins)?,
        })
    }
}

impl From<Denominations> for DenominationInput {
    fn from(d: Denominations) -> Self {
        DenominationInput {
            bills: d.bills.into_iter().map(|(k, v)| (k, Some(v))).collect(),
            coins: d.coins.into_iter().map(|(k, v)| (k, Some(v))).collect(),
        }
    }
}

fn sanitize_group(
    group: &str,
    raw: BTreeMap<i64, Option<i64>>,
) -> Result<BTreeMap<i64, i64>, ValidationError> {
    let invalid = |face_value_cents: i64, reason: String| ValidationError::InvalidDenomination {
        group: group.to_string(),
        face_value_cents,
        reason,
    };

    let limit = Money::from_cents(MAX_AMOUNT_CENTS);
    let mut total = Money::zero();
    let mut clean = BTreeMap::new();
    for (face_value_cents, count) in raw {
        let Some(count) = count else { continue };
        if face_value_cents <= 0 {
            return Err(invalid(face_value_cents, "face value must be positive".to_string()));
        }
        if count > MAX_DENOMINATION_COUNT {
            return Err(invalid(
                face_value_cents,
                format!("count must be at most {MAX_DENOMINATION_COUNT}"),
            ));
        }

        let count = count.max(0);
        total = Money::from_cents(face_value_cents)
            .checked_mul(count)
            .and_then(|value| total.checked_add(value))
            .filter(|t| *t <= limit)
            .ok_or_else(|| invalid(face_value_cents, format!("{group} total exceeds {limit}")))?;
        clean.insert(face_value_cents, count);
    }
    Ok(clean)
}

// =============================================================================
// Unit Tests
// =============================================================================
