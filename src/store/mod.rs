//! Persistence seam for the inventory.
//!
//! [`InventoryStore`] covers plain reads and writes that need no
//! coordination. Anything that must land together with a ledger entry goes
//! through a [`StoreTransaction`] obtained from [`InventoryStore::begin`].
//! A transaction handle is a scoped value: dropping it without calling
//! [`StoreTransaction::commit`] releases it and discards its writes.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::catalog::{CatalogEntry, CatalogKind};
use crate::models::product::{NewProduct, Product, ProductPage};
use crate::models::purchase::{NewPurchase, Purchase};
use crate::models::seller::{NewSeller, Seller};
use crate::query::ProductFilter;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("transaction already finished")]
    TransactionClosed,
    #[error("invalid stored row: {0}")]
    InvalidRow(String),
    #[error("{table} {id} does not exist")]
    MissingReference { table: &'static str, id: i64 },
    #[error("stock of product {id} would overflow adding {delta}")]
    StockOverflow { id: i64, delta: i64 },
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Open a transaction. Writes made through it are invisible to every
    /// other reader until it commits.
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>>;

    async fn product_exists(&self, id: i64) -> StoreResult<bool>;

    async fn find_owned_product(&self, id: i64, user_id: i64) -> StoreResult<Option<Product>>;

    /// One page of the user's products matching `filter`, plus the total
    /// number of matches across all pages.
    async fn query_products(&self, user_id: i64, filter: &ProductFilter) -> StoreResult<ProductPage>;

    async fn delete_products(&self, ids: &[i64]) -> StoreResult<u64>;

    async fn total_stock(&self, user_id: i64) -> StoreResult<i64>;

    async fn insert_seller(&self, seller: NewSeller) -> StoreResult<Seller>;

    async fn find_owned_seller(&self, id: i64, user_id: i64) -> StoreResult<Option<Seller>>;

    async fn list_sellers(&self, user_id: i64) -> StoreResult<Vec<Seller>>;

    async fn insert_catalog_entry(
        &self,
        kind: CatalogKind,
        user_id: i64,
        name: String,
    ) -> StoreResult<CatalogEntry>;

    async fn list_catalog_entries(&self, kind: CatalogKind, user_id: i64) -> StoreResult<Vec<CatalogEntry>>;

    async fn list_purchases(&self, user_id: i64) -> StoreResult<Vec<Purchase>>;
}

#[async_trait]
pub trait StoreTransaction: Send {
    async fn find_seller(&mut self, id: i64) -> StoreResult<Option<Seller>>;

    async fn insert_product(&mut self, product: NewProduct) -> StoreResult<Product>;

    /// Add `delta` to the product's stock as a single arithmetic update and
    /// return the post-increment row, or `None` if the product is gone.
    async fn increment_stock(&mut self, id: i64, delta: i64) -> StoreResult<Option<Product>>;

    async fn insert_purchase(&mut self, purchase: NewPurchase) -> StoreResult<Purchase>;

    async fn commit(&mut self) -> StoreResult<()>;

    /// Discard every write. A no-op once the transaction has finished.
    async fn rollback(&mut self) -> StoreResult<()>;
}
