//! Call shapes for the remote marketplace authority.
//!
//! Every operation resolves to a discriminated success/failure struct. The
//! server re-validates everything the console gates client-side (plan
//! ordering, one trial per plan); the console's checks are UX, not security.

use merchant_core::types::Product;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Plain acknowledgement for operations with no payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiAck {
    pub success: bool,
    pub error: Option<String>,
}

impl ApiAck {
    pub fn ok() -> Self {
        Self { success: true, error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { success: false, error: Some(error.into()) }
    }
}

/// Result of persisting a product. `data` carries the server's canonical copy
/// on success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedProduct {
    pub success: bool,
    pub data: Option<Product>,
    pub error: Option<String>,
}

/// Result of opening a payment. `form_token` feeds the hosted payment form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentOutcome {
    pub success: bool,
    pub message: Option<String>,
    pub form_token: Option<String>,
}

/// Result of filing a plan request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestOutcome {
    pub success: bool,
    pub message: Option<String>,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Why a zero-amount plan request was filed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanRequestKind {
    /// One-time trial claim.
    Trial,
    /// Claim of a plan that does not require payment.
    FreeClaim,
}

/// A plan transition filed without a payment flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRequest {
    pub kind: PlanRequestKind,
    pub from_plan: Option<String>,
    pub to_plan: String,
    pub months: u32,
    pub amount: f64,
}

/// A paid plan transition, priced by the console's tenure engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentOrder {
    pub plan_id: String,
    pub duration_label: String,
    pub months: u32,
    pub amount: f64,
}

// ---------------------------------------------------------------------------
// Client trait
// ---------------------------------------------------------------------------

/// Async boundary to the marketplace backend.
///
/// Implementations must not panic for expected business failures; those come
/// back as `success = false`. Transport errors are reported the same way so
/// the caller has a single failure path.
#[allow(async_fn_in_trait)]
pub trait BackendClient: Send + Sync {
    /// Persist a single product's price change.
    async fn update_product_price(&self, product_id: Uuid, new_price: f64) -> ApiAck;

    /// Create or update a product.
    async fn save_product(&self, product: Product) -> SavedProduct;

    /// Remove a product from the catalog.
    async fn delete_product(&self, product_id: Uuid) -> ApiAck;

    /// Open a payment for a paid plan transition.
    async fn create_payment(&self, order: PaymentOrder) -> PaymentOutcome;

    /// File a zero-amount plan request (trial or free claim).
    async fn create_request(&self, request: PlanRequest) -> RequestOutcome;
}

// Several screens share one client behind an Arc.
impl<T: BackendClient> BackendClient for std::sync::Arc<T> {
    async fn update_product_price(&self, product_id: Uuid, new_price: f64) -> ApiAck {
        (**self).update_product_price(product_id, new_price).await
    }

    async fn save_product(&self, product: Product) -> SavedProduct {
        (**self).save_product(product).await
    }

    async fn delete_product(&self, product_id: Uuid) -> ApiAck {
        (**self).delete_product(product_id).await
    }

    async fn create_payment(&self, order: PaymentOrder) -> PaymentOutcome {
        (**self).create_payment(order).await
    }

    async fn create_request(&self, request: PlanRequest) -> RequestOutcome {
        (**self).create_request(request).await
    }
}
