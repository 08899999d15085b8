//! HTTP request handlers

pub mod auth;
pub mod bill;
pub mod contact;
pub mod delivery_challan;
pub mod finance;
pub mod grn;
pub mod health;
pub mod item;
pub mod machine;
pub mod production;
pub mod proforma_invoice;
pub mod purchase;
pub mod purchase_order;
pub mod reporting;
pub mod stock_transfer;

pub use auth::*;
pub use bill::*;
pub use contact::*;
pub use delivery_challan::*;
pub use finance::*;
pub use grn::*;
pub use health::*;
pub use item::*;
pub use machine::*;
pub use production::*;
pub use proforma_invoice::*;
pub use purchase::*;
pub use purchase_order::*;
pub use reporting::*;
pub use stock_transfer::*;
