//! Route definitions for the retail ERP API

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/auth/me", get(handlers::me))
        .route("/auth/register", post(handlers::register))
        .nest("/items", item_routes())
        .nest("/contacts", contact_routes())
        .nest("/machines", machine_routes())
        .nest("/billing", billing_routes())
        .nest("/purchases", purchase_routes())
        .nest("/purchase-orders", purchase_order_routes())
        .nest("/grn", grn_routes())
        .nest("/stock-transfers", stock_transfer_routes())
        .nest("/productions", production_routes())
        .nest("/proforma-invoices", proforma_invoice_routes())
        .nest("/delivery-challans", delivery_challan_routes())
        .nest("/finance", finance_routes())
        .nest("/reports", report_routes())
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public)
        .route("/auth/login", post(handlers::login))
        .route("/auth/refresh", post(handlers::refresh))
        .merge(protected)
}

fn item_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_items).post(handlers::create_item))
        .route("/bulk-upload", post(handlers::bulk_upload_items))
        .route(
            "/:item_id",
            get(handlers::get_item)
                .put(handlers::update_item)
                .delete(handlers::delete_item),
        )
}

fn contact_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_contacts).post(handlers::create_contact))
        .route(
            "/:contact_id",
            get(handlers::get_contact)
                .put(handlers::update_contact)
                .delete(handlers::delete_contact),
        )
}

fn machine_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_machines).post(handlers::create_machine))
        .route(
            "/:machine_id",
            get(handlers::get_machine)
                .put(handlers::update_machine)
                .delete(handlers::delete_machine),
        )
}

/// Bills and purchases move stock on creation, so they cannot be deleted
fn billing_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_bills).post(handlers::create_bill))
        .route("/:id", get(handlers::get_bill))
}

fn purchase_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_purchases).post(handlers::create_purchase))
        .route("/:id", get(handlers::get_purchase))
}

fn purchase_order_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_purchase_orders).post(handlers::create_purchase_order),
        )
        .route(
            "/:id",
            get(handlers::get_purchase_order).delete(handlers::delete_purchase_order),
        )
        .route("/:id/status", patch(handlers::update_purchase_order_status))
}

fn grn_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_grns).post(handlers::create_grn))
        .route("/pending-pos", get(handlers::list_pending_purchase_orders))
        .route("/:id", get(handlers::get_grn).delete(handlers::delete_grn))
        .route("/:id/status", patch(handlers::update_grn_status))
        .route("/:id/inspect", patch(handlers::inspect_grn))
}

fn stock_transfer_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_stock_transfers).post(handlers::create_stock_transfer),
        )
        .route(
            "/:id",
            get(handlers::get_stock_transfer).delete(handlers::delete_stock_transfer),
        )
        .route("/:id/status", patch(handlers::update_stock_transfer_status))
}

fn production_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_productions).post(handlers::create_production))
        .route(
            "/:id",
            get(handlers::get_production).delete(handlers::delete_production),
        )
        .route("/:id/status", patch(handlers::update_production_status))
}

fn proforma_invoice_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_proforma_invoices).post(handlers::create_proforma_invoice),
        )
        .route(
            "/:id",
            get(handlers::get_proforma_invoice).delete(handlers::delete_proforma_invoice),
        )
        .route("/:id/status", patch(handlers::update_proforma_invoice_status))
}

fn delivery_challan_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_delivery_challans).post(handlers::create_delivery_challan),
        )
        .route(
            "/:id",
            get(handlers::get_delivery_challan).delete(handlers::delete_delivery_challan),
        )
        .route("/:id/status", patch(handlers::update_delivery_challan_status))
}

fn finance_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/accounts",
            get(handlers::list_accounts).post(handlers::create_account),
        )
        .route("/accounts/:account_id", get(handlers::get_account))
        .route(
            "/expenses",
            get(handlers::list_expenses).post(handlers::create_expense),
        )
        .route(
            "/expenses/:expense_id",
            get(handlers::get_expense).delete(handlers::delete_expense),
        )
}

fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(handlers::get_dashboard))
        .route("/sales-summary", get(handlers::get_sales_summary))
        .route("/daily-sales", get(handlers::get_daily_sales))
        .route("/top-items", get(handlers::get_top_items))
        .route("/low-stock", get(handlers::get_low_stock_report))
}
