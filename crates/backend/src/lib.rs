//! Remote-authority boundary for the seller console.
//!
//! The console core only ever talks to the backend through the call shapes in
//! [`client`]. Business failures come back as `success = false` with an error
//! message, never as a transport fault; callers treat an unreachable server
//! the same way. [`memory`] provides the DashMap-backed development backend;
//! swap in an HTTP client against the real marketplace API for production.

pub mod client;
pub mod memory;

pub use client::{
    ApiAck, BackendClient, PaymentOrder, PaymentOutcome, PlanRequest, PlanRequestKind,
    RequestOutcome, SavedProduct,
};
pub use memory::InMemoryBackend;
