//! Business logic services for the retail ERP

pub mod auth;
pub mod bill;
pub mod contact;
pub mod delivery_challan;
pub mod document;
pub mod finance;
pub mod grn;
pub mod item;
pub mod machine;
pub mod production;
pub mod proforma_invoice;
pub mod purchase;
pub mod purchase_order;
pub mod reporting;
pub mod sequence;
pub mod stock;
pub mod stock_transfer;

#[cfg(test)]
pub(crate) mod test_support;

pub use auth::AuthService;
pub use bill::BillService;
pub use contact::ContactService;
pub use delivery_challan::DeliveryChallanService;
pub use finance::FinanceService;
pub use grn::GrnService;
pub use item::ItemService;
pub use machine::MachineService;
pub use production::ProductionService;
pub use proforma_invoice::ProformaInvoiceService;
pub use purchase::PurchaseService;
pub use purchase_order::PurchaseOrderService;
pub use reporting::ReportingService;
pub use sequence::SequenceService;
pub use stock::StockLedger;
pub use stock_transfer::StockTransferService;
