//! Domain models for the retail ERP

mod bill;
mod contact;
mod grn;
mod line;
mod production;
mod purchase_order;
mod user;

pub use bill::*;
pub use contact::*;
pub use grn::*;
pub use line::*;
pub use production::*;
pub use purchase_order::*;
pub use user::*;
