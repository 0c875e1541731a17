use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tracing::debug;

use super::{InventoryStore, StoreError, StoreResult, StoreTransaction};
use crate::models::catalog::{CatalogEntry, CatalogKind};
use crate::models::product::{
    CatalogRef, NewProduct, Product, ProductDetails, ProductPage, ProductSize, SellerRef,
};
use crate::models::purchase::{NewPurchase, Purchase};
use crate::models::seller::{NewSeller, Seller};
use crate::query::ProductFilter;

const PRODUCT_COLUMNS: &str = "id, user_id, seller_id, category_id, brand_id, name,
                price::FLOAT8 AS price, stock, size, description, created_at, updated_at";

const PURCHASE_COLUMNS: &str = "id, user_id, seller_id, product_id, seller_name, product_name, quantity,
                unit_price::FLOAT8  AS unit_price,
                total_price::FLOAT8 AS total_price,
                created_at";

const SELLER_COLUMNS: &str = "id, user_id, name, email, contact_no, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i64,
    user_id: i64,
    seller_id: i64,
    category_id: Option<i64>,
    brand_id: Option<i64>,
    name: String,
    price: f64,
    stock: i64,
    size: Option<String>,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Product {
            id: row.id,
            user_id: row.user_id,
            seller_id: row.seller_id,
            category_id: row.category_id,
            brand_id: row.brand_id,
            name: row.name,
            price: row.price,
            stock: row.stock,
            size: parse_size(row.size)?,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ProductDetailsRow {
    id: i64,
    user_id: i64,
    seller_id: i64,
    category_id: Option<i64>,
    brand_id: Option<i64>,
    name: String,
    price: f64,
    stock: i64,
    size: Option<String>,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    category_name: Option<String>,
    brand_name: Option<String>,
    seller_name: Option<String>,
    seller_email: Option<String>,
    seller_contact_no: Option<String>,
}

impl TryFrom<ProductDetailsRow> for ProductDetails {
    type Error = StoreError;

    fn try_from(row: ProductDetailsRow) -> Result<Self, Self::Error> {
        let label = |id: Option<i64>, name: Option<String>| match (id, name) {
            (Some(id), Some(name)) => Some(CatalogRef { id, name }),
            _ => None,
        };
        Ok(ProductDetails {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            price: row.price,
            stock: row.stock,
            size: parse_size(row.size)?,
            description: row.description,
            category: label(row.category_id, row.category_name),
            brand: label(row.brand_id, row.brand_name),
            seller: row.seller_name.map(|name| SellerRef {
                id: row.seller_id,
                name,
                email: row.seller_email,
                contact_no: row.seller_contact_no,
            }),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn parse_size(raw: Option<String>) -> StoreResult<Option<ProductSize>> {
    raw.map(|s| s.parse::<ProductSize>().map_err(StoreError::InvalidRow))
        .transpose()
}

/// `%` and `_` in a search term are literal, not wildcards.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn push_product_filter(qb: &mut QueryBuilder<'_, Postgres>, user_id: i64, filter: &ProductFilter) {
    qb.push(" WHERE p.user_id = ").push_bind(user_id);
    if let Some(search) = &filter.search {
        qb.push(" AND p.name ILIKE ").push_bind(like_pattern(search));
    }
    if let Some(category_id) = filter.category_id {
        qb.push(" AND p.category_id = ").push_bind(category_id);
    }
    if let Some(brand_id) = filter.brand_id {
        qb.push(" AND p.brand_id = ").push_bind(brand_id);
    }
    if let Some(seller_id) = filter.seller_id {
        qb.push(" AND p.seller_id = ").push_bind(seller_id);
    }
    if let Some(size) = filter.size {
        qb.push(" AND p.size = ").push_bind(size.as_str());
    }
    if let Some(min_price) = filter.min_price {
        qb.push(" AND p.price >= ").push_bind(min_price).push("::FLOAT8");
    }
    if let Some(max_price) = filter.max_price {
        qb.push(" AND p.price <= ").push_bind(max_price).push("::FLOAT8");
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InventoryStore for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTransaction { tx: Some(tx) }))
    }

    async fn product_exists(&self, id: i64) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM products WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn find_owned_product(&self, id: i64, user_id: i64) -> StoreResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Product::try_from).transpose()
    }

    async fn query_products(&self, user_id: i64, filter: &ProductFilter) -> StoreResult<ProductPage> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT p.id, p.user_id, p.seller_id, p.category_id, p.brand_id, p.name,
                    p.price::FLOAT8 AS price, p.stock, p.size, p.description,
                    p.created_at, p.updated_at,
                    c.name AS category_name,
                    b.name AS brand_name,
                    s.name AS seller_name, s.email AS seller_email, s.contact_no AS seller_contact_no
             FROM products p
             LEFT JOIN categories c ON c.id = p.category_id
             LEFT JOIN brands b     ON b.id = p.brand_id
             LEFT JOIN sellers s    ON s.id = p.seller_id",
        );
        push_product_filter(&mut qb, user_id, filter);
        qb.push(format!(
            " ORDER BY {} {}, p.id ASC",
            filter.sort_key.column(),
            filter.sort_order.keyword()
        ));
        qb.push(" LIMIT ").push_bind(i64::from(filter.limit));
        qb.push(" OFFSET ").push_bind(filter.offset());

        let rows = qb
            .build_query_as::<ProductDetailsRow>()
            .fetch_all(&self.pool)
            .await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products p");
        push_product_filter(&mut count, user_id, filter);
        let total_count = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool).await?;

        let products = rows
            .into_iter()
            .map(ProductDetails::try_from)
            .collect::<StoreResult<Vec<_>>>()?;
        debug!(returned = products.len(), total_count, "Queried products");

        Ok(ProductPage { products, total_count })
    }

    async fn delete_products(&self, ids: &[i64]) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM products WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn total_stock(&self, user_id: i64) -> StoreResult<i64> {
        let total: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(stock), 0)::BIGINT FROM products WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(total)
    }

    async fn insert_seller(&self, seller: NewSeller) -> StoreResult<Seller> {
        let seller = sqlx::query_as::<_, Seller>(&format!(
            "INSERT INTO sellers (user_id, name, email, contact_no)
             VALUES ($1, $2, $3, $4)
             RETURNING {SELLER_COLUMNS}"
        ))
        .bind(seller.user_id)
        .bind(seller.name)
        .bind(seller.email)
        .bind(seller.contact_no)
        .fetch_one(&self.pool)
        .await?;
        Ok(seller)
    }

    async fn find_owned_seller(&self, id: i64, user_id: i64) -> StoreResult<Option<Seller>> {
        let seller = sqlx::query_as::<_, Seller>(&format!(
            "SELECT {SELLER_COLUMNS} FROM sellers WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(seller)
    }

    async fn list_sellers(&self, user_id: i64) -> StoreResult<Vec<Seller>> {
        let sellers = sqlx::query_as::<_, Seller>(&format!(
            "SELECT {SELLER_COLUMNS} FROM sellers WHERE user_id = $1 ORDER BY name, id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(sellers)
    }

    async fn insert_catalog_entry(
        &self,
        kind: CatalogKind,
        user_id: i64,
        name: String,
    ) -> StoreResult<CatalogEntry> {
        let entry = sqlx::query_as::<_, CatalogEntry>(&format!(
            "INSERT INTO {} (user_id, name) VALUES ($1, $2) RETURNING id, user_id, name, created_at",
            kind.table()
        ))
        .bind(user_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(entry)
    }

    async fn list_catalog_entries(&self, kind: CatalogKind, user_id: i64) -> StoreResult<Vec<CatalogEntry>> {
        let entries = sqlx::query_as::<_, CatalogEntry>(&format!(
            "SELECT id, user_id, name, created_at FROM {} WHERE user_id = $1 ORDER BY name, id",
            kind.table()
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    async fn list_purchases(&self, user_id: i64) -> StoreResult<Vec<Purchase>> {
        let purchases = sqlx::query_as::<_, Purchase>(&format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchases WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(purchases)
    }
}

pub struct PgTransaction {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgTransaction {
    fn open(&mut self) -> StoreResult<&mut Transaction<'static, Postgres>> {
        self.tx.as_mut().ok_or(StoreError::TransactionClosed)
    }
}

#[async_trait]
impl StoreTransaction for PgTransaction {
    async fn find_seller(&mut self, id: i64) -> StoreResult<Option<Seller>> {
        let tx = self.open()?;
        let seller = sqlx::query_as::<_, Seller>(&format!(
            "SELECT {SELLER_COLUMNS} FROM sellers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(seller)
    }

    async fn insert_product(&mut self, product: NewProduct) -> StoreResult<Product> {
        let tx = self.open()?;
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "INSERT INTO products
                (user_id, seller_id, category_id, brand_id, name, price, stock, size, description)
             VALUES ($1, $2, $3, $4, $5, $6::FLOAT8, $7, $8, $9)
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(product.user_id)
        .bind(product.seller_id)
        .bind(product.category_id)
        .bind(product.brand_id)
        .bind(product.name)
        .bind(product.price)
        .bind(product.stock)
        .bind(product.size.map(ProductSize::as_str))
        .bind(product.description)
        .fetch_one(&mut **tx)
        .await?;
        Product::try_from(row)
    }

    async fn increment_stock(&mut self, id: i64, delta: i64) -> StoreResult<Option<Product>> {
        let tx = self.open()?;
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "UPDATE products SET stock = stock + $1, updated_at = NOW()
             WHERE id = $2
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(delta)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
        row.map(Product::try_from).transpose()
    }

    async fn insert_purchase(&mut self, purchase: NewPurchase) -> StoreResult<Purchase> {
        let tx = self.open()?;
        let purchase = sqlx::query_as::<_, Purchase>(&format!(
            "INSERT INTO purchases
                (user_id, seller_id, product_id, seller_name, product_name, quantity, unit_price, total_price)
             VALUES ($1, $2, $3, $4, $5, $6, $7::FLOAT8, $8::FLOAT8)
             RETURNING {PURCHASE_COLUMNS}"
        ))
        .bind(purchase.user_id)
        .bind(purchase.seller_id)
        .bind(purchase.product_id)
        .bind(purchase.seller_name)
        .bind(purchase.product_name)
        .bind(purchase.quantity)
        .bind(purchase.unit_price)
        .bind(purchase.total_price)
        .fetch_one(&mut **tx)
        .await?;
        Ok(purchase)
    }

    async fn commit(&mut self) -> StoreResult<()> {
        let tx = self.tx.take().ok_or(StoreError::TransactionClosed)?;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&mut self) -> StoreResult<()> {
        match self.tx.take() {
            Some(tx) => Ok(tx.rollback().await?),
            None => Ok(()),
        }
    }
}
