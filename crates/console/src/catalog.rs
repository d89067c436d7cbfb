//! Inline price editing for the product catalog.
//!
//! A thin specialization of the optimistic pattern: the coordinator tracks
//! only the displayed price per product, while the authoritative product list
//! is folded forward by this editor once the backend confirms.

use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use merchant_backend::client::BackendClient;
use merchant_core::config::ConsoleConfig;
use merchant_core::error::{ConsoleError, ConsoleResult};
use merchant_core::types::Product;
use tracing::{info, warn};
use uuid::Uuid;

use crate::mutation::MutationCoordinator;

pub struct CatalogPriceEditor<B: BackendClient> {
    backend: B,
    products: DashMap<Uuid, Product>,
    prices: MutationCoordinator<Uuid, f64>,
    config: ConsoleConfig,
}

impl<B: BackendClient> CatalogPriceEditor<B> {
    pub fn new(backend: B, products: Vec<Product>, config: ConsoleConfig) -> Self {
        let editor = Self {
            backend,
            products: DashMap::new(),
            prices: MutationCoordinator::new(),
            config,
        };
        for product in products {
            editor.prices.seed(product.id, product.price);
            editor.products.insert(product.id, product);
        }
        editor
    }

    /// Change a product's price: shown immediately, confirmed or reverted
    /// when the backend answers. Validation failures reject before any
    /// speculative state exists.
    pub async fn edit_price(&self, product_id: Uuid, new_price: f64) -> ConsoleResult<f64> {
        if !new_price.is_finite() || new_price < 0.0 {
            return Err(ConsoleError::InvalidPrice(new_price));
        }
        if !self.products.contains_key(&product_id) {
            return Err(ConsoleError::UnknownProduct(product_id));
        }

        self.prices.apply(product_id, new_price);

        let ack = self.backend.update_product_price(product_id, new_price).await;
        if !ack.success {
            self.prices.rollback(&product_id);
            warn!(product_id = %product_id, "Price edit refused, display reverted");
            return Err(ConsoleError::remote(ack.error));
        }

        self.prices.confirm(&product_id);
        if let Some(mut product) = self.products.get_mut(&product_id) {
            product.price = new_price;
            product.updated_at = Utc::now();
        }
        info!(product_id = %product_id, new_price, "Price edit confirmed");
        Ok(new_price)
    }

    /// The price the seller currently sees for a product, speculative or
    /// confirmed.
    pub fn displayed_price(&self, product_id: &Uuid) -> Option<f64> {
        self.prices.displayed(product_id)
    }

    pub fn is_pending(&self, product_id: &Uuid) -> bool {
        self.prices.is_pending(product_id)
    }

    pub fn product(&self, product_id: &Uuid) -> Option<Product> {
        self.products.get(product_id).map(|p| p.clone())
    }

    pub fn list_products(&self) -> Vec<Product> {
        self.products.iter().map(|p| p.value().clone()).collect()
    }

    /// Create or update a product and fold the server's canonical copy into
    /// the list.
    pub async fn save_product(&self, product: Product) -> ConsoleResult<Product> {
        if !product.price.is_finite() || product.price < 0.0 {
            return Err(ConsoleError::InvalidPrice(product.price));
        }

        let fallback = product.clone();
        let saved = self.backend.save_product(product).await;
        if !saved.success {
            return Err(ConsoleError::remote(saved.error));
        }

        let stored = saved.data.unwrap_or(fallback);
        self.prices.seed(stored.id, stored.price);
        self.products.insert(stored.id, stored.clone());
        info!(product_id = %stored.id, "Product saved");
        Ok(stored)
    }

    /// Delete a product and drop all local state for its key.
    pub async fn delete_product(&self, product_id: Uuid) -> ConsoleResult<()> {
        let ack = self.backend.delete_product(product_id).await;
        if !ack.success {
            return Err(ConsoleError::remote(ack.error));
        }
        self.products.remove(&product_id);
        self.prices.remove(&product_id);
        info!(product_id = %product_id, "Product deleted");
        Ok(())
    }

    /// Revert price edits whose remote call outlived the configured pending
    /// bound. Returns the affected product ids.
    pub fn expire_stale(&self) -> Vec<Uuid> {
        self.prices
            .expire_stale(Duration::from_secs(self.config.pending_timeout_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use merchant_backend::InMemoryBackend;
    use std::sync::Arc;

    fn product(name: &str, price: f64) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: name.into(),
            price,
            currency: "USD".into(),
            stock: 10,
            active: true,
            updated_at: Utc::now(),
        }
    }

    fn editor_with(
        products: Vec<Product>,
    ) -> (Arc<InMemoryBackend>, CatalogPriceEditor<Arc<InMemoryBackend>>) {
        let backend = Arc::new(InMemoryBackend::new());
        for p in &products {
            backend.insert_product(p.clone());
        }
        let editor = CatalogPriceEditor::new(backend.clone(), products, ConsoleConfig::default());
        (backend, editor)
    }

    #[tokio::test]
    async fn test_confirmed_edit_updates_display_and_list() {
        let item = product("Mug", 25.0);
        let (_backend, editor) = editor_with(vec![item.clone()]);

        let price = editor.edit_price(item.id, 30.0).await.unwrap();
        assert_eq!(price, 30.0);
        assert_eq!(editor.displayed_price(&item.id), Some(30.0));
        // The authoritative list was folded forward too.
        assert_eq!(editor.product(&item.id).unwrap().price, 30.0);
        assert!(!editor.is_pending(&item.id));
    }

    #[tokio::test]
    async fn test_failed_edit_reverts_and_surfaces_backend_text() {
        let item = product("Mug", 25.0);
        let (backend, editor) = editor_with(vec![item.clone()]);

        backend.fail_next("price locked by an open promotion");
        let result = editor.edit_price(item.id, 30.0).await;
        match result {
            Err(ConsoleError::Remote(message)) => {
                assert_eq!(message, "price locked by an open promotion");
            }
            other => panic!("expected remote error, got {other:?}"),
        }

        assert_eq!(editor.displayed_price(&item.id), Some(25.0));
        assert_eq!(editor.product(&item.id).unwrap().price, 25.0);
    }

    #[tokio::test]
    async fn test_invalid_price_rejected_before_any_call() {
        let item = product("Mug", 25.0);
        let (backend, editor) = editor_with(vec![item.clone()]);

        for bad in [-1.0, f64::NAN, f64::INFINITY] {
            let result = editor.edit_price(item.id, bad).await;
            assert!(matches!(result, Err(ConsoleError::InvalidPrice(_))));
        }
        assert_eq!(backend.call_counts().total(), 0);
        assert!(!editor.is_pending(&item.id));
    }

    #[tokio::test]
    async fn test_unknown_product_rejected_locally() {
        let (backend, editor) = editor_with(vec![]);
        let result = editor.edit_price(Uuid::new_v4(), 10.0).await;
        assert!(matches!(result, Err(ConsoleError::UnknownProduct(_))));
        assert_eq!(backend.call_counts().total(), 0);
    }

    #[tokio::test]
    async fn test_edits_to_different_products_are_independent() {
        let a = product("Mug", 25.0);
        let b = product("Tote", 18.5);
        let (backend, editor) = editor_with(vec![a.clone(), b.clone()]);

        backend.fail_next("transient failure");
        assert!(editor.edit_price(a.id, 99.0).await.is_err());
        assert!(editor.edit_price(b.id, 20.0).await.is_ok());

        assert_eq!(editor.displayed_price(&a.id), Some(25.0));
        assert_eq!(editor.displayed_price(&b.id), Some(20.0));
    }

    #[tokio::test]
    async fn test_save_product_folds_canonical_copy() {
        let (_backend, editor) = editor_with(vec![]);

        let saved = editor.save_product(product("Board", 49.0)).await.unwrap();
        assert_eq!(editor.displayed_price(&saved.id), Some(49.0));
        assert_eq!(editor.list_products().len(), 1);
    }

    #[tokio::test]
    async fn test_stale_price_edit_reverted() {
        let item = product("Mug", 25.0);
        let backend = Arc::new(InMemoryBackend::new());
        backend.insert_product(item.clone());
        let config = ConsoleConfig {
            pending_timeout_secs: 0,
            ..ConsoleConfig::default()
        };
        let editor = CatalogPriceEditor::new(backend, vec![item.clone()], config);

        // Simulate an edit whose remote call never settles.
        editor.prices.apply(item.id, 99.0);
        assert_eq!(editor.displayed_price(&item.id), Some(99.0));

        let stale = editor.expire_stale();
        assert_eq!(stale, vec![item.id]);
        assert_eq!(editor.displayed_price(&item.id), Some(25.0));
    }

    #[tokio::test]
    async fn test_delete_product_clears_local_state() {
        let item = product("Mug", 25.0);
        let (_backend, editor) = editor_with(vec![item.clone()]);

        editor.delete_product(item.id).await.unwrap();
        assert!(editor.product(&item.id).is_none());
        assert_eq!(editor.displayed_price(&item.id), None);
    }
}
