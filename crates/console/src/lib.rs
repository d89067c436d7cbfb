//! Optimistic-mutation and tenure-pricing core of the MerchantDesk seller
//! console.
//!
//! Screens apply a user's change immediately, let the remote authority
//! confirm or refuse it, and roll the display back deterministically on
//! failure. The pricing engine is pure and is safe to call on every
//! keystroke while a seller adjusts a custom commitment length.

pub mod catalog;
pub mod mutation;
pub mod pricing;
pub mod subscription;

pub use catalog::CatalogPriceEditor;
pub use mutation::MutationCoordinator;
pub use subscription::{
    ExpirationWarning, LifecycleState, SubscriptionManager, Transition, TransitionKind,
};
