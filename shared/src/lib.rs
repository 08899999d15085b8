//! Shared types and domain logic for the Mart ERP platform
//!
//! This crate holds the I/O-free core used by the backend server and, through
//! WASM, by the admin app: document numbering, status transition tables,
//! line-item totals, goods-receipt math and the stock policy.

pub mod models;
pub mod numbering;
pub mod status;
pub mod stock;
pub mod types;
pub mod validation;

pub use models::*;
pub use numbering::*;
pub use status::*;
pub use stock::*;
pub use types::*;
pub use validation::*;
