//! Tenure pricing: turns a plan and a commitment length into a priced
//! summary. Pure and allocation-light; screens call it on every keystroke
//! while the seller adjusts a custom duration, before anything is committed.

use merchant_core::types::{PaymentSummary, Plan, Tenure};

/// Hard ceiling on the tenure discount, reached by very long commitments.
pub const MAX_DISCOUNT_RATE: f64 = 0.60;

/// Discount rate for a total commitment of `months`. Step function,
/// non-decreasing, with a linear tail past 36 months capped at
/// [`MAX_DISCOUNT_RATE`]. Trials are handled by [`summarize`], not here.
pub fn discount_rate(months: u32) -> f64 {
    match months {
        0..=1 => 0.0,
        2..=3 => 0.05,
        4..=6 => 0.12,
        7..=12 => 0.22,
        13..=18 => 0.30,
        19..=24 => 0.38,
        25..=36 => 0.48,
        m => (0.48 + f64::from(m - 36) * 0.01).min(MAX_DISCOUNT_RATE),
    }
}

/// Price `plan` over `tenure`. Never mutates its inputs; calling it twice
/// with the same arguments yields the same summary.
pub fn summarize(plan: &Plan, tenure: Tenure) -> PaymentSummary {
    let months = tenure.months();
    // Trial overrides the schedule: one month, fully discounted.
    let rate = if tenure.is_trial() { 1.0 } else { discount_rate(months) };

    let original_price = plan.price * f64::from(months);
    let discount = original_price * rate;
    let total = original_price - discount;
    let per_month = if months > 0 { total / f64::from(months) } else { 0.0 };

    PaymentSummary {
        plan_name: plan.name.clone(),
        duration_label: tenure.label(),
        original_price,
        discount,
        total,
        per_month,
    }
}
