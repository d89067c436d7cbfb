//! MerchantDesk — marketplace seller console core.
//!
//! Entry point for the development walkthrough: wires the console engines to
//! the in-memory backend, runs a seller session (price edit with rollback,
//! trial claim, paid upgrade) and logs every step.

use std::sync::Arc;

use clap::Parser;
use merchant_backend::InMemoryBackend;
use merchant_console::{CatalogPriceEditor, SubscriptionManager};
use merchant_core::config::AppConfig;
use merchant_core::types::{Plan, Tenure};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "merchant-desk")]
#[command(about = "Marketplace seller console core")]
#[command(version)]
struct Cli {
    /// Seller tenant identifier (overrides config)
    #[arg(long, env = "MERCHANT_DESK__TENANT_ID")]
    tenant_id: Option<String>,

    /// Near-expiry threshold in days (overrides config)
    #[arg(long, env = "MERCHANT_DESK__CONSOLE__NEAR_EXPIRY_DAYS")]
    near_expiry_days: Option<i64>,
}

/// Plan catalog used by the development backend.
fn demo_plans() -> Vec<Plan> {
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
            price: 25.0,
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
        Plan {
            id: "enterprise".into(),
            name: "Enterprise".into(),
            price: 299.0,
            currency: "USD".into(),
            requires_payment: true,
            order: 3,
            claim_months: 1,
        },
    ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "merchant_desk=info,merchant_console=info,merchant_backend=info".into()),
        )
        .init();

    let cli = Cli::parse();

    info!("MerchantDesk starting up");

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    if let Some(tenant_id) = cli.tenant_id {
        config.tenant_id = tenant_id;
    }
    if let Some(days) = cli.near_expiry_days {
        config.console.near_expiry_days = days;
    }

    info!(
        tenant_id = %config.tenant_id,
        near_expiry_days = config.console.near_expiry_days,
        pending_timeout_secs = config.console.pending_timeout_secs,
        "Configuration loaded"
    );

    let backend = Arc::new(InMemoryBackend::new());
    let products = backend.seed_demo_catalog();

    let catalog = CatalogPriceEditor::new(backend.clone(), products.clone(), config.console.clone());
    let subscriptions =
        SubscriptionManager::new(backend.clone(), demo_plans(), config.console.clone());

    // Inline price edit, confirmed by the backend.
    let mug = products[0].id;
    let new_price = catalog.edit_price(mug, 29.5).await?;
    info!(product_id = %mug, new_price, "Inline edit confirmed");

    // The same edit with the backend refusing: the display reverts.
    backend.fail_next("price service unavailable");
    if let Err(err) = catalog.edit_price(mug, 99.0).await {
        warn!(error = %err, "Inline edit rolled back");
    }
    info!(displayed = ?catalog.displayed_price(&mug), "Displayed price after rollback");

    // Price a year of Pro while the seller is still deciding.
    let preview = subscriptions.preview("pro", Tenure::TwelveMonths)?;
    info!(
        plan = %preview.plan_name,
        total = preview.total,
        per_month = preview.per_month,
        "Priced a 12-month commitment"
    );

    // Claim the Basic trial, then commit to Pro for a year.
    let trial = subscriptions.request_transition("basic", Tenure::Trial).await?;
    info!(plan_id = %trial.subscription.plan_id, kind = ?trial.kind, "Trial claimed");

    let upgrade = subscriptions
        .request_transition("pro", Tenure::TwelveMonths)
        .await?;
    info!(
        plan_id = %upgrade.subscription.plan_id,
        amount = upgrade.summary.total,
        form_token = ?upgrade.form_token,
        "Upgrade confirmed"
    );

    if let Some(warning) = subscriptions.expiration_warning() {
        info!(
            days_remaining = warning.days_remaining,
            expiring_soon = warning.expiring_soon,
            "Subscription expiry status"
        );
    }

    Ok(())
}
