use chrono::{DateTime, Utc};
use serde::Serialize;

use super::product::Product;
use super::seller::Seller;

/// One stock-affecting event. Names are copied at write time and never resynced.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: i64,
    pub user_id: i64,
    pub seller_id: i64,
    pub product_id: i64,
    pub seller_name: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: f64,
    pub total_price: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPurchase {
    pub user_id: i64,
    pub seller_id: i64,
    pub product_id: i64,
    pub seller_name: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: f64,
    pub total_price: f64,
}

impl NewPurchase {
    /// Snapshot of `product` as it stands after the write, bought from `seller`.
    pub fn record(user_id: i64, product: &Product, seller: &Seller) -> Self {
        Self {
            user_id,
            seller_id: seller.id,
            product_id: product.id,
            seller_name: seller.name.clone(),
            product_name: product.name.clone(),
            quantity: product.stock,
            unit_price: product.price,
            total_price: product.stock as f64 * product.price,
        }
    }
}
