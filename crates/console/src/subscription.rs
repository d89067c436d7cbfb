//! Subscription lifecycle: the current-plan state machine, the transition
//! policy (upgrade / trial / free claim, downgrades gated), and the
//! optimistic swap of the subscription through the mutation coordinator.
//!
//! The downgrade and trial-once gates here are UX conveniences, not a
//! security boundary. The remote authority re-validates plan ordering and
//! trial consumption on every request it receives.

use chrono::{Duration, Utc};
use dashmap::{DashMap, DashSet};
use merchant_backend::client::{BackendClient, PaymentOrder, PlanRequest, PlanRequestKind};
use merchant_core::config::ConsoleConfig;
use merchant_core::error::{ConsoleError, ConsoleResult};
use merchant_core::types::{PaymentSummary, Plan, Subscription, SubscriptionStatus, Tenure};
use serde::Serialize;
use tracing::{info, warn};

use crate::mutation::MutationCoordinator;
use crate::pricing;

/// Coordinator key for the single subscription slot.
const SUBSCRIPTION_KEY: &str = "subscription";

/// Where the seller's subscription currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    NoPlan,
    Active { plan_id: String },
    Transitioning { from: Option<String>, to: String },
}

/// How a confirmed transition was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    Trial,
    FreeClaim,
    Paid,
}

/// Receipt for a confirmed plan transition.
#[derive(Debug, Clone, Serialize)]
pub struct Transition {
    pub kind: TransitionKind,
    pub subscription: Subscription,
    pub summary: PaymentSummary,
    /// Token for the hosted payment form, present on paid transitions.
    pub form_token: Option<String>,
}

/// Near-expiry view derived from the displayed subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExpirationWarning {
    pub expiring_soon: bool,
    /// Whole days until expiry. Negative once expired.
    pub days_remaining: i64,
}

/// Owns the subscription slot and drives every plan transition through the
/// mutation coordinator: the target plan shows as current immediately, and a
/// refused or failed request restores the prior subscription in full.
pub struct SubscriptionManager<B: BackendClient> {
    backend: B,
    plans: DashMap<String, Plan>,
    slot: MutationCoordinator<&'static str, Subscription>,
    /// Plan ids whose trial has been consumed. Never reset here.
    trials_claimed: DashSet<String>,
    config: ConsoleConfig,
}

impl<B: BackendClient> SubscriptionManager<B> {
    pub fn new(backend: B, plans: Vec<Plan>, config: ConsoleConfig) -> Self {
        info!(plans = plans.len(), "Subscription manager initialized");
        let catalog = DashMap::new();
        for plan in plans {
            catalog.insert(plan.id.clone(), plan);
        }
        Self {
            backend,
            plans: catalog,
            slot: MutationCoordinator::new(),
            trials_claimed: DashSet::new(),
            config,
        }
    }

    /// Install an existing subscription, e.g. restored at login.
    pub fn adopt(&self, subscription: Subscription) {
        self.slot.seed(SUBSCRIPTION_KEY, subscription);
    }

    pub fn plan(&self, plan_id: &str) -> Option<Plan> {
        self.plans.get(plan_id).map(|p| p.clone())
    }

    /// The subscription as the seller currently sees it, speculative or
    /// confirmed.
    pub fn current(&self) -> Option<Subscription> {
        self.slot.displayed(&SUBSCRIPTION_KEY)
    }

    pub fn state(&self) -> LifecycleState {
        if self.slot.is_pending(&SUBSCRIPTION_KEY) {
            let from = self.slot.canonical(&SUBSCRIPTION_KEY).map(|s| s.plan_id);
            let to = self
                .slot
                .displayed(&SUBSCRIPTION_KEY)
                .map(|s| s.plan_id)
                .unwrap_or_default();
            return LifecycleState::Transitioning { from, to };
        }
        match self.slot.displayed(&SUBSCRIPTION_KEY) {
            Some(subscription) => LifecycleState::Active {
                plan_id: subscription.plan_id,
            },
            None => LifecycleState::NoPlan,
        }
    }

    pub fn trial_claimed(&self, plan_id: &str) -> bool {
        self.trials_claimed.contains(plan_id)
    }

    /// Price a prospective transition without committing anything.
    pub fn preview(&self, target_plan_id: &str, tenure: Tenure) -> ConsoleResult<PaymentSummary> {
        let target = self
            .plan(target_plan_id)
            .ok_or_else(|| ConsoleError::UnknownPlan(target_plan_id.to_string()))?;
        Ok(pricing::summarize(&target, tenure))
    }

    /// Request a transition to `target_plan_id` over `tenure`.
    ///
    /// Downgrades and repeat trial claims are refused locally, before any
    /// optimistic state exists or any remote call is made. Everything else is
    /// applied optimistically, sent to the backend, and confirmed or rolled
    /// back when the call settles.
    pub async fn request_transition(
        &self,
        target_plan_id: &str,
        tenure: Tenure,
    ) -> ConsoleResult<Transition> {
        let target = self
            .plan(target_plan_id)
            .ok_or_else(|| ConsoleError::UnknownPlan(target_plan_id.to_string()))?;
        let current = self.slot.canonical(&SUBSCRIPTION_KEY);

        if let Some(current_plan) = current.as_ref().and_then(|c| self.plan(&c.plan_id)) {
            if target.order < current_plan.order {
                metrics::counter!("console.downgrades_denied").increment(1);
                warn!(from = %current_plan.id, to = %target.id, "Downgrade refused");
                return Err(ConsoleError::DowngradeNotAllowed {
                    from: current_plan.name,
                    to: target.name,
                });
            }
        }

        if tenure.is_trial() && self.trials_claimed.contains(target_plan_id) {
            return Err(ConsoleError::TrialAlreadyClaimed(target_plan_id.to_string()));
        }

        let summary = pricing::summarize(&target, tenure);
        let kind = if tenure.is_trial() {
            TransitionKind::Trial
        } else if !target.requires_payment || summary.total == 0.0 {
            TransitionKind::FreeClaim
        } else {
            TransitionKind::Paid
        };

        let months = match kind {
            TransitionKind::Trial => 1,
            TransitionKind::FreeClaim => target.claim_months.max(1),
            TransitionKind::Paid => tenure.months(),
        };

        let now = Utc::now();
        let speculative = Subscription {
            plan_id: target.id.clone(),
            start_date: now,
            expiry_date: now + Duration::days(30 * i64::from(months)),
            status: SubscriptionStatus::Pending,
        };
        self.slot.apply(SUBSCRIPTION_KEY, speculative.clone());

        let mut form_token = None;
        let (success, message) = match kind {
            TransitionKind::Paid => {
                let outcome = self
                    .backend
                    .create_payment(PaymentOrder {
                        plan_id: target.id.clone(),
                        duration_label: summary.duration_label.clone(),
                        months,
                        amount: summary.total,
                    })
                    .await;
                form_token = outcome.form_token;
                (outcome.success, outcome.message)
            }
            TransitionKind::Trial | TransitionKind::FreeClaim => {
                let request_kind = match kind {
                    TransitionKind::Trial => PlanRequestKind::Trial,
                    _ => PlanRequestKind::FreeClaim,
                };
                let outcome = self
                    .backend
                    .create_request(PlanRequest {
                        kind: request_kind,
                        from_plan: current.as_ref().map(|c| c.plan_id.clone()),
                        to_plan: target.id.clone(),
                        months,
                        amount: 0.0,
                    })
                    .await;
                (outcome.success, outcome.message)
            }
        };

        if !success {
            self.slot.rollback(&SUBSCRIPTION_KEY);
            warn!(plan_id = %target.id, "Plan transition refused, subscription restored");
            return Err(ConsoleError::remote(message));
        }

        // The authority accepted the transition: supersede the pending
        // display with the active form of the subscription, then adopt it.
        let confirmed = Subscription {
            status: SubscriptionStatus::Active,
            ..speculative
        };
        self.slot.apply(SUBSCRIPTION_KEY, confirmed.clone());
        self.slot.confirm(&SUBSCRIPTION_KEY);

        if kind == TransitionKind::Trial {
            self.trials_claimed.insert(target.id.clone());
            metrics::counter!("console.trials_claimed").increment(1);
        }

        info!(
            plan_id = %target.id,
            months,
            total = summary.total,
            kind = ?kind,
            "Plan transition confirmed"
        );

        Ok(Transition {
            kind,
            subscription: confirmed,
            summary,
            form_token,
        })
    }

    /// Near-expiry status of the displayed subscription, against the
    /// configured threshold. `None` when there is no subscription.
    pub fn expiration_warning(&self) -> Option<ExpirationWarning> {
        let subscription = self.slot.displayed(&SUBSCRIPTION_KEY)?;
        let days_remaining = subscription.days_until_expiry(Utc::now());
        Some(ExpirationWarning {
            expiring_soon: days_remaining <= self.config.near_expiry_days,
            days_remaining,
        })
    }

    /// Revert a transition that outlived the configured pending bound.
    /// Returns `MutationTimedOut` when one was reverted.
    pub fn expire_stale_transition(&self) -> ConsoleResult<()> {
        let stale = self
            .slot
            .expire_stale(std::time::Duration::from_secs(self.config.pending_timeout_secs));
        if stale.is_empty() {
            Ok(())
        } else {
            Err(ConsoleError::MutationTimedOut(SUBSCRIPTION_KEY.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use merchant_backend::InMemoryBackend;
    use std::sync::Arc;

    fn test_plans() -> Vec<Plan> {
        vec![
            Plan {
                id: "free".into(),
                name: "Free".into(),
                price: 0.0,
                currency: "USD".into(),
                requires_payment: false,
                order: 0,
                claim_months: 2,
            },
            Plan {
                id: "basic".into(),
                name: "Basic".into(),
                price: 50.0,
                currency: "USD".into(),
                requires_payment: true,
                order: 1,
                claim_months: 1,
            },
            Plan {
                id: "pro".into(),
                name: "Pro".into(),
                price: 100.0,
                currency: "USD".into(),
                requires_payment: true,
                order: 2,
                claim_months: 1,
            },
        ]
    }

    fn manager() -> (Arc<InMemoryBackend>, SubscriptionManager<Arc<InMemoryBackend>>) {
        let backend = Arc::new(InMemoryBackend::new());
        let manager =
            SubscriptionManager::new(backend.clone(), test_plans(), ConsoleConfig::default());
        (backend, manager)
    }

    fn active_subscription(plan_id: &str, days_left: i64) -> Subscription {
        let now = Utc::now();
        Subscription {
            plan_id: plan_id.into(),
            start_date: now - Duration::days(10),
            expiry_date: now + Duration::days(days_left),
            status: SubscriptionStatus::Active,
        }
    }

    #[tokio::test]
    async fn test_downgrade_refused_without_remote_call() {
        let (backend, manager) = manager();
        manager.adopt(active_subscription("pro", 90));

        let result = manager.request_transition("basic", Tenure::TwelveMonths).await;
        assert!(matches!(result, Err(ConsoleError::DowngradeNotAllowed { .. })));

        // Local gate only: nothing reached the backend, nothing went pending.
        assert_eq!(backend.call_counts().total(), 0);
        assert_eq!(
            manager.state(),
            LifecycleState::Active { plan_id: "pro".into() }
        );
    }

    #[tokio::test]
    async fn test_trial_claim_is_free_and_single_use() {
        let (backend, manager) = manager();

        let transition = manager.request_transition("pro", Tenure::Trial).await.unwrap();
        assert_eq!(transition.kind, TransitionKind::Trial);
        assert_eq!(transition.summary.total, 0.0);
        assert_eq!(transition.summary.per_month, 0.0);
        assert!(manager.trial_claimed("pro"));
        assert!(transition.subscription.is_active());

        let requests = backend.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].kind, PlanRequestKind::Trial);
        assert_eq!(requests[0].amount, 0.0);
        assert_eq!(requests[0].from_plan, None);

        // Second claim is refused locally.
        let again = manager.request_transition("pro", Tenure::Trial).await;
        assert!(matches!(again, Err(ConsoleError::TrialAlreadyClaimed(_))));
        assert_eq!(backend.call_counts().plan_requests, 1);
    }

    #[tokio::test]
    async fn test_paid_upgrade_prices_and_confirms() {
        let (backend, manager) = manager();
        manager.adopt(active_subscription("basic", 20));

        let transition = manager
            .request_transition("pro", Tenure::TwelveMonths)
            .await
            .unwrap();
        assert_eq!(transition.kind, TransitionKind::Paid);
        assert!((transition.summary.total - 936.0).abs() < 1e-9);
        assert!(transition.form_token.is_some());
        assert_eq!(
            manager.state(),
            LifecycleState::Active { plan_id: "pro".into() }
        );

        let payments = backend.recorded_payments();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].plan_id, "pro");
        assert_eq!(payments[0].months, 12);
        assert!((payments[0].amount - 936.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_failed_transition_restores_prior_subscription_in_full() {
        let (backend, manager) = manager();
        let prior = active_subscription("basic", 20);
        manager.adopt(prior.clone());

        backend.fail_next("card declined");
        let result = manager.request_transition("pro", Tenure::SixMonths).await;
        match result {
            Err(ConsoleError::Remote(message)) => assert_eq!(message, "card declined"),
            other => panic!("expected remote error, got {:?}", other.map(|t| t.kind)),
        }

        // Start, expiry and status all restored together.
        assert_eq!(manager.current(), Some(prior));
        assert_eq!(
            manager.state(),
            LifecycleState::Active { plan_id: "basic".into() }
        );
    }

    #[tokio::test]
    async fn test_free_claim_uses_plan_grant_length() {
        let (backend, manager) = manager();

        let transition = manager
            .request_transition("free", Tenure::OneMonth)
            .await
            .unwrap();
        assert_eq!(transition.kind, TransitionKind::FreeClaim);

        let requests = backend.recorded_requests();
        assert_eq!(requests[0].kind, PlanRequestKind::FreeClaim);
        // Grant length comes from the plan, not the selected tenure.
        assert_eq!(requests[0].months, 2);

        let days = transition
            .subscription
            .days_until_expiry(transition.subscription.start_date);
        assert_eq!(days, 60);
    }

    #[tokio::test]
    async fn test_same_tier_resubscription_allowed() {
        let (_backend, manager) = manager();
        manager.adopt(active_subscription("pro", 5));

        let transition = manager
            .request_transition("pro", Tenure::TwelveMonths)
            .await
            .unwrap();
        assert_eq!(transition.subscription.plan_id, "pro");
    }

    #[tokio::test]
    async fn test_expiration_warning_thresholds() {
        let (_backend, manager) = manager();
        assert!(manager.expiration_warning().is_none());

        manager.adopt(active_subscription("pro", 3));
        let warning = manager.expiration_warning().unwrap();
        assert!(warning.expiring_soon);
        assert_eq!(warning.days_remaining, 3);

        manager.adopt(active_subscription("pro", 60));
        let warning = manager.expiration_warning().unwrap();
        assert!(!warning.expiring_soon);
    }

    #[tokio::test]
    async fn test_stale_transition_reverts_with_timeout_error() {
        let backend = Arc::new(InMemoryBackend::new());
        let config = ConsoleConfig {
            pending_timeout_secs: 0,
            ..ConsoleConfig::default()
        };
        let manager = SubscriptionManager::new(backend, test_plans(), config);

        let prior = active_subscription("basic", 20);
        manager.adopt(prior.clone());

        // Nothing pending: the watchdog has nothing to do.
        assert!(manager.expire_stale_transition().is_ok());

        // Simulate a transition whose remote call never settles.
        manager.slot.apply(
            SUBSCRIPTION_KEY,
            Subscription {
                plan_id: "pro".into(),
                start_date: Utc::now(),
                expiry_date: Utc::now() + Duration::days(360),
                status: SubscriptionStatus::Pending,
            },
        );
        assert!(matches!(
            manager.state(),
            LifecycleState::Transitioning { .. }
        ));

        let result = manager.expire_stale_transition();
        assert!(matches!(result, Err(ConsoleError::MutationTimedOut(_))));
        assert_eq!(manager.current(), Some(prior));
    }

    #[tokio::test]
    async fn test_preview_does_not_touch_state() {
        let (backend, manager) = manager();

        let summary = manager.preview("pro", Tenure::Custom(9)).unwrap();
        assert!((summary.original_price - 900.0).abs() < 1e-9);
        assert_eq!(backend.call_counts().total(), 0);
        assert_eq!(manager.state(), LifecycleState::NoPlan);
    }
}
