//! Server module for exposing the ledger over HTTP
//!
//! - [`BillingHost`] wires storage into the ledger from configuration
//! - [`ServerBuilder`] turns a host into an axum router and serves it

pub mod builder;
pub mod host;
pub mod router;

pub use builder::ServerBuilder;
pub use host::BillingHost;
pub use router::{build_health_routes, build_invoice_routes};
