//! Shared domain types for the seller console: plans, subscriptions,
//! catalog products, and the tenure selection that drives pricing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Plans & subscriptions
// ---------------------------------------------------------------------------

/// A subscription plan from the catalog. Reference data: the console never
/// mutates plans, it only prices and transitions against them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub name: String,
    /// Price per base month, in `currency`.
    pub price: f64,
    pub currency: String,
    /// False for plans that can be claimed without a payment flow.
    pub requires_payment: bool,
    /// Ordinal position among plans. Transitions to a lower `order` are
    /// downgrades and are gated client-side.
    pub order: u32,
    /// Grant length, in months, when the plan is claimed for free.
    pub claim_months: u32,
}

/// Subscription lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Pending,
    Expired,
}

/// A seller's subscription to a plan. Replaced wholesale on every confirmed
/// plan transition, never partially mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub plan_id: String,
    pub start_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub status: SubscriptionStatus,
}

impl Subscription {
    pub fn is_active(&self) -> bool {
        self.status == SubscriptionStatus::Active
    }

    /// Whole days between now and expiry. Negative once expired.
    pub fn days_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        (self.expiry_date - now).num_days()
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// A product in the seller's catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
    pub currency: String,
    pub stock: u32,
    pub active: bool,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tenure
// ---------------------------------------------------------------------------

/// Lower bound for a custom commitment, in months.
pub const MIN_CUSTOM_MONTHS: u32 = 4;
/// Upper bound for a custom commitment, in months.
pub const MAX_CUSTOM_MONTHS: u32 = 48;

/// The commitment length chosen for a subscription. Either a named preset or
/// a custom month count clamped to `[MIN_CUSTOM_MONTHS, MAX_CUSTOM_MONTHS]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tenure {
    /// One month, fully discounted, claimable once per plan.
    Trial,
    OneMonth,
    SixMonths,
    TwelveMonths,
    TwentyFourMonths,
    FortyEightMonths,
    Custom(u32),
}

impl Tenure {
    /// Resolved month count. `Trial` is always exactly one month; custom
    /// selections are clamped into the allowed range.
    pub fn months(&self) -> u32 {
        match self {
            Self::Trial | Self::OneMonth => 1,
            Self::SixMonths => 6,
            Self::TwelveMonths => 12,
            Self::TwentyFourMonths => 24,
            Self::FortyEightMonths => 48,
            Self::Custom(m) => (*m).clamp(MIN_CUSTOM_MONTHS, MAX_CUSTOM_MONTHS),
        }
    }

    pub fn is_trial(&self) -> bool {
        matches!(self, Self::Trial)
    }

    /// Human-readable duration for summaries and payment requests.
    pub fn label(&self) -> String {
        match self {
            Self::Trial => "Trial".to_string(),
            Self::OneMonth => "1 month".to_string(),
            other => format!("{} months", other.months()),
        }
    }
}

/// Priced breakdown of a plan over a chosen tenure. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentSummary {
    pub plan_name: String,
    pub duration_label: String,
    pub original_price: f64,
    pub discount: f64,
    pub total: f64,
    pub per_month: f64,
}
