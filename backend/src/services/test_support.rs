//! Fixtures for service tests that need PostgreSQL.
//!
//! Configuration is read the same way the server reads it, so point
//! `MART__DATABASE__URL` at a disposable database and set `MART__JWT__SECRET`,
//! then run `cargo test -- --ignored`. Migrations are applied on connect.

use rust_decimal::Decimal;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use super::contact::{ContactService, CreateContactInput};
use super::item::{CreateItemInput, Item, ItemService};
use crate::config::Config;
use shared::ContactKind;

pub async fn setup() -> (PgPool, Config) {
    let config = Config::load().expect("test configuration");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database.url)
        .await
        .expect("connect to test database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("apply migrations");
    (pool, config)
}

pub async fn supplier(pool: &PgPool) -> Uuid {
    ContactService::new(pool.clone())
        .create(CreateContactInput {
            name: "Fresh Farms Wholesale".to_string(),
            kind: ContactKind::Supplier,
            phone: None,
            email: None,
            address: None,
            tax_id: None,
        })
        .await
        .expect("create supplier")
        .id
}

/// An item with a unique SKU and the given opening stock and buy price
pub async fn item(pool: &PgPool, stock: Decimal, buy_price: Decimal) -> Item {
    ItemService::new(pool.clone())
        .create(CreateItemInput {
            name: "Basmati Rice 5kg".to_string(),
            sku: format!("T-{}", Uuid::new_v4().simple()),
            category: None,
            unit: None,
            stock: Some(stock),
            buy_price: Some(buy_price),
            sell_price: None,
            tax_rate: None,
            low_stock_threshold: None,
        })
        .await
        .expect("create item")
}

pub async fn stock_of(pool: &PgPool, item_id: Uuid) -> (Decimal, Decimal) {
    sqlx::query_as::<_, (Decimal, Decimal)>("SELECT stock, buy_price FROM items WHERE id = $1")
        .bind(item_id)
        .fetch_one(pool)
        .await
        .expect("read item stock")
}
