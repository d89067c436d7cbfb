//! In-memory development backend backed by `DashMap`. Stands in for the
//! marketplace API during development and tests; supports one-shot failure
//! injection so rollback paths can be exercised deterministically.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::Utc;
use dashmap::DashMap;
use merchant_core::types::Product;
use tracing::{debug, info};
use uuid::Uuid;

use crate::client::{
    ApiAck, BackendClient, PaymentOrder, PaymentOutcome, PlanRequest, RequestOutcome, SavedProduct,
};

/// Snapshot of how many times each operation has been called.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub price_updates: u64,
    pub product_saves: u64,
    pub product_deletes: u64,
    pub payments: u64,
    pub plan_requests: u64,
}

impl CallCounts {
    pub fn total(&self) -> u64 {
        self.price_updates
            + self.product_saves
            + self.product_deletes
            + self.payments
            + self.plan_requests
    }
}

/// DashMap-backed stand-in for the marketplace backend.
pub struct InMemoryBackend {
    products: DashMap<Uuid, Product>,
    payments: DashMap<Uuid, PaymentOrder>,
    requests: DashMap<Uuid, PlanRequest>,
    fail_next: Mutex<Option<String>>,
    price_updates: AtomicU64,
    product_saves: AtomicU64,
    product_deletes: AtomicU64,
    payment_calls: AtomicU64,
    request_calls: AtomicU64,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            products: DashMap::new(),
            payments: DashMap::new(),
            requests: DashMap::new(),
            fail_next: Mutex::new(None),
            price_updates: AtomicU64::new(0),
            product_saves: AtomicU64::new(0),
            product_deletes: AtomicU64::new(0),
            payment_calls: AtomicU64::new(0),
            request_calls: AtomicU64::new(0),
        }
    }

    /// Make the next operation fail with the given error text. Consumed by
    /// exactly one call.
    pub fn fail_next(&self, message: impl Into<String>) {
        *self.fail_next.lock().unwrap() = Some(message.into());
    }

    fn take_failure(&self) -> Option<String> {
        self.fail_next.lock().unwrap().take()
    }

    /// Insert a product directly, bypassing the call counters. Used to seed
    /// state before a scenario.
    pub fn insert_product(&self, product: Product) {
        self.products.insert(product.id, product);
    }

    pub fn product(&self, id: &Uuid) -> Option<Product> {
        self.products.get(id).map(|p| p.clone())
    }

    pub fn recorded_payments(&self) -> Vec<PaymentOrder> {
        self.payments.iter().map(|e| e.value().clone()).collect()
    }

    pub fn recorded_requests(&self) -> Vec<PlanRequest> {
        self.requests.iter().map(|e| e.value().clone()).collect()
    }

    pub fn call_counts(&self) -> CallCounts {
        CallCounts {
            price_updates: self.price_updates.load(Ordering::Relaxed),
            product_saves: self.product_saves.load(Ordering::Relaxed),
            product_deletes: self.product_deletes.load(Ordering::Relaxed),
            payments: self.payment_calls.load(Ordering::Relaxed),
            plan_requests: self.request_calls.load(Ordering::Relaxed),
        }
    }

    /// Seed a small demo catalog and return it.
    pub fn seed_demo_catalog(&self) -> Vec<Product> {
        let now = Utc::now();
        let products = vec![
            Product {
                id: Uuid::parse_str("00000000-0000-0000-0000-0000000000a1").unwrap(),
                name: "Ceramic mug".into(),
                price: 25.0,
                currency: "USD".into(),
                stock: 120,
                active: true,
                updated_at: now,
            },
            Product {
                id: Uuid::parse_str("00000000-0000-0000-0000-0000000000a2").unwrap(),
                name: "Linen tote bag".into(),
                price: 18.5,
                currency: "USD".into(),
                stock: 64,
                active: true,
                updated_at: now,
            },
            Product {
                id: Uuid::parse_str("00000000-0000-0000-0000-0000000000a3").unwrap(),
                name: "Walnut serving board".into(),
                price: 49.0,
                currency: "USD".into(),
                stock: 18,
                active: true,
                updated_at: now,
            },
        ];
        for p in &products {
            self.products.insert(p.id, p.clone());
        }
        info!(count = products.len(), "Seeded demo catalog");
        products
    }
}

impl BackendClient for InMemoryBackend {
    async fn update_product_price(&self, product_id: Uuid, new_price: f64) -> ApiAck {
        self.price_updates.fetch_add(1, Ordering::Relaxed);
        if let Some(message) = self.take_failure() {
            return ApiAck::failed(message);
        }
        match self.products.get_mut(&product_id) {
            Some(mut product) => {
                product.price = new_price;
                product.updated_at = Utc::now();
                debug!(product_id = %product_id, new_price, "Product price updated");
                ApiAck::ok()
            }
            None => ApiAck::failed(format!("Product {} not found", product_id)),
        }
    }

    async fn save_product(&self, product: Product) -> SavedProduct {
        self.product_saves.fetch_add(1, Ordering::Relaxed);
        if let Some(message) = self.take_failure() {
            return SavedProduct { success: false, data: None, error: Some(message) };
        }
        let mut stored = product;
        stored.updated_at = Utc::now();
        self.products.insert(stored.id, stored.clone());
        debug!(product_id = %stored.id, "Product saved");
        SavedProduct { success: true, data: Some(stored), error: None }
    }

    async fn delete_product(&self, product_id: Uuid) -> ApiAck {
        self.product_deletes.fetch_add(1, Ordering::Relaxed);
        if let Some(message) = self.take_failure() {
            return ApiAck::failed(message);
        }
        match self.products.remove(&product_id) {
            Some(_) => {
                debug!(product_id = %product_id, "Product deleted");
                ApiAck::ok()
            }
            None => ApiAck::failed(format!("Product {} not found", product_id)),
        }
    }

    async fn create_payment(&self, order: PaymentOrder) -> PaymentOutcome {
        self.payment_calls.fetch_add(1, Ordering::Relaxed);
        if let Some(message) = self.take_failure() {
            return PaymentOutcome { success: false, message: Some(message), form_token: None };
        }
        let payment_id = Uuid::new_v4();
        info!(
            payment_id = %payment_id,
            plan_id = %order.plan_id,
            amount = order.amount,
            months = order.months,
            "Payment created"
        );
        self.payments.insert(payment_id, order);
        PaymentOutcome {
            success: true,
            message: None,
            form_token: Some(format!("tok-{}", payment_id.simple())),
        }
    }

    async fn create_request(&self, request: PlanRequest) -> RequestOutcome {
        self.request_calls.fetch_add(1, Ordering::Relaxed);
        if let Some(message) = self.take_failure() {
            return RequestOutcome { success: false, message: Some(message) };
        }
        let request_id = Uuid::new_v4();
        info!(
            request_id = %request_id,
            kind = ?request.kind,
            to_plan = %request.to_plan,
            "Plan request filed"
        );
        self.requests.insert(request_id, request);
        RequestOutcome { success: true, message: None }
    }
}
