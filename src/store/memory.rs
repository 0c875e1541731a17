//! In-memory store for local development and tests.
//!
//! All tables sit behind one async mutex. A transaction holds the lock for
//! its whole lifetime and writes to a private copy of the tables; commit
//! swaps the copy in, dropping the handle throws it away. Transactions are
//! therefore fully serialized, and readers never see a half-applied write.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{InventoryStore, StoreError, StoreResult, StoreTransaction};
use crate::models::catalog::{CatalogEntry, CatalogKind};
use crate::models::product::{CatalogRef, NewProduct, Product, ProductDetails, ProductPage, SellerRef};
use crate::models::purchase::{NewPurchase, Purchase};
use crate::models::seller::{NewSeller, Seller};
use crate::query::ProductFilter;

#[derive(Debug, Clone, Default)]
struct Tables {
    next_id: i64,
    sellers: BTreeMap<i64, Seller>,
    categories: BTreeMap<i64, CatalogEntry>,
    brands: BTreeMap<i64, CatalogEntry>,
    products: BTreeMap<i64, Product>,
    purchases: BTreeMap<i64, Purchase>,
}

impl Tables {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn catalog(&self, kind: CatalogKind) -> &BTreeMap<i64, CatalogEntry> {
        match kind {
            CatalogKind::Category => &self.categories,
            CatalogKind::Brand => &self.brands,
        }
    }

    fn catalog_mut(&mut self, kind: CatalogKind) -> &mut BTreeMap<i64, CatalogEntry> {
        match kind {
            CatalogKind::Category => &mut self.categories,
            CatalogKind::Brand => &mut self.brands,
        }
    }

    fn details(&self, product: &Product) -> ProductDetails {
        let label = |entry: &CatalogEntry| CatalogRef {
            id: entry.id,
            name: entry.name.clone(),
        };
        ProductDetails {
            id: product.id,
            user_id: product.user_id,
            name: product.name.clone(),
            price: product.price,
            stock: product.stock,
            size: product.size,
            description: product.description.clone(),
            category: product
                .category_id
                .and_then(|id| self.categories.get(&id))
                .map(label),
            brand: product.brand_id.and_then(|id| self.brands.get(&id)).map(label),
            seller: self.sellers.get(&product.seller_id).map(|s| SellerRef {
                id: s.id,
                name: s.name.clone(),
                email: s.email.clone(),
                contact_no: s.contact_no.clone(),
            }),
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InventoryStore for InMemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(InMemoryTransaction {
            guard: Some(guard),
            staged,
        }))
    }

    async fn product_exists(&self, id: i64) -> StoreResult<bool> {
        Ok(self.tables.lock().await.products.contains_key(&id))
    }

    async fn find_owned_product(&self, id: i64, user_id: i64) -> StoreResult<Option<Product>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .products
            .get(&id)
            .filter(|p| p.user_id == user_id)
            .cloned())
    }

    async fn query_products(&self, user_id: i64, filter: &ProductFilter) -> StoreResult<ProductPage> {
        let tables = self.tables.lock().await;
        let mut matches: Vec<&Product> = tables
            .products
            .values()
            .filter(|p| filter.matches(user_id, p))
            .collect();
        matches.sort_by(|a, b| filter.compare(a, b));

        let total_count = matches.len() as i64;
        let offset = usize::try_from(filter.offset()).unwrap_or(usize::MAX);
        let products = matches
            .into_iter()
            .skip(offset)
            .take(filter.limit as usize)
            .map(|p| tables.details(p))
            .collect();

        Ok(ProductPage { products, total_count })
    }

    async fn delete_products(&self, ids: &[i64]) -> StoreResult<u64> {
        let mut tables = self.tables.lock().await;
        let mut deleted = 0;
        for id in ids {
            if tables.products.remove(id).is_some() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn total_stock(&self, user_id: i64) -> StoreResult<i64> {
        let tables = self.tables.lock().await;
        Ok(tables
            .products
            .values()
            .filter(|p| p.user_id == user_id)
            .map(|p| p.stock)
            .sum())
    }

    async fn insert_seller(&self, seller: NewSeller) -> StoreResult<Seller> {
        let mut tables = self.tables.lock().await;
        let now = Utc::now();
        let seller = Seller {
            id: tables.allocate_id(),
            user_id: seller.user_id,
            name: seller.name,
            email: seller.email,
            contact_no: seller.contact_no,
            created_at: now,
            updated_at: now,
        };
        tables.sellers.insert(seller.id, seller.clone());
        Ok(seller)
    }

    async fn find_owned_seller(&self, id: i64, user_id: i64) -> StoreResult<Option<Seller>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .sellers
            .get(&id)
            .filter(|s| s.user_id == user_id)
            .cloned())
    }

    async fn list_sellers(&self, user_id: i64) -> StoreResult<Vec<Seller>> {
        let tables = self.tables.lock().await;
        let mut sellers: Vec<Seller> = tables
            .sellers
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        sellers.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(sellers)
    }

    async fn insert_catalog_entry(
        &self,
        kind: CatalogKind,
        user_id: i64,
        name: String,
    ) -> StoreResult<CatalogEntry> {
        let mut tables = self.tables.lock().await;
        let entry = CatalogEntry {
            id: tables.allocate_id(),
            user_id,
            name,
            created_at: Utc::now(),
        };
        tables.catalog_mut(kind).insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn list_catalog_entries(&self, kind: CatalogKind, user_id: i64) -> StoreResult<Vec<CatalogEntry>> {
        let tables = self.tables.lock().await;
        let mut entries: Vec<CatalogEntry> = tables
            .catalog(kind)
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(entries)
    }

    async fn list_purchases(&self, user_id: i64) -> StoreResult<Vec<Purchase>> {
        let tables = self.tables.lock().await;
        let mut purchases: Vec<Purchase> = tables
            .purchases
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        purchases.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(purchases)
    }
}

pub struct InMemoryTransaction {
    guard: Option<OwnedMutexGuard<Tables>>,
    staged: Tables,
}

impl InMemoryTransaction {
    fn tables(&mut self) -> StoreResult<&mut Tables> {
        if self.guard.is_none() {
            return Err(StoreError::TransactionClosed);
        }
        Ok(&mut self.staged)
    }
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn find_seller(&mut self, id: i64) -> StoreResult<Option<Seller>> {
        Ok(self.tables()?.sellers.get(&id).cloned())
    }

    async fn insert_product(&mut self, product: NewProduct) -> StoreResult<Product> {
        let tables = self.tables()?;
        // Same references the products table enforces with foreign keys.
        if !tables.sellers.contains_key(&product.seller_id) {
            return Err(StoreError::MissingReference {
                table: "sellers",
                id: product.seller_id,
            });
        }
        for kind in [CatalogKind::Category, CatalogKind::Brand] {
            let id = match kind {
                CatalogKind::Category => product.category_id,
                CatalogKind::Brand => product.brand_id,
            };
            if let Some(id) = id {
                if !tables.catalog(kind).contains_key(&id) {
                    return Err(StoreError::MissingReference {
                        table: kind.table(),
                        id,
                    });
                }
            }
        }
        let now = Utc::now();
        let product = Product {
            id: tables.allocate_id(),
            user_id: product.user_id,
            seller_id: product.seller_id,
            category_id: product.category_id,
            brand_id: product.brand_id,
            name: product.name,
            price: product.price,
            stock: product.stock,
            size: product.size,
            description: product.description,
            created_at: now,
            updated_at: now,
        };
        tables.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn increment_stock(&mut self, id: i64, delta: i64) -> StoreResult<Option<Product>> {
        let tables = self.tables()?;
        let Some(product) = tables.products.get_mut(&id) else {
            return Ok(None);
        };
        product.stock = product
            .stock
            .checked_add(delta)
            .ok_or(StoreError::StockOverflow { id, delta })?;
        product.updated_at = Utc::now();
        Ok(Some(product.clone()))
    }

    async fn insert_purchase(&mut self, purchase: NewPurchase) -> StoreResult<Purchase> {
        let tables = self.tables()?;
        let purchase = Purchase {
            id: tables.allocate_id(),
            user_id: purchase.user_id,
            seller_id: purchase.seller_id,
            product_id: purchase.product_id,
            seller_name: purchase.seller_name,
            product_name: purchase.product_name,
            quantity: purchase.quantity,
            unit_price: purchase.unit_price,
            total_price: purchase.total_price,
            created_at: Utc::now(),
        };
        tables.purchases.insert(purchase.id, purchase.clone());
        Ok(purchase)
    }

    async fn commit(&mut self) -> StoreResult<()> {
        let mut guard = self.guard.take().ok_or(StoreError::TransactionClosed)?;
        *guard = std::mem::take(&mut self.staged);
        Ok(())
    }

    async fn rollback(&mut self) -> StoreResult<()> {
        self.guard = None;
        self.staged = Tables::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_seller(user_id: i64, name: &str) -> NewSeller {
        NewSeller {
            user_id,
            name: name.into(),
            email: None,
            contact_no: None,
        }
    }

    fn new_product(user_id: i64, seller_id: i64, name: &str, stock: i64) -> NewProduct {
        NewProduct {
            user_id,
            seller_id,
            category_id: None,
            brand_id: None,
            name: name.into(),
            price: 2.0,
            stock,
            size: None,
            description: None,
        }
    }

    #[tokio::test]
    async fn uncommitted_writes_are_discarded_on_drop() {
        let store = InMemoryStore::new();
        let seller = store.insert_seller(new_seller(1, "Acme")).await.unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_product(new_product(1, seller.id, "Pen", 5)).await.unwrap();
        }

        assert_eq!(store.total_stock(1).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn committed_writes_become_visible() {
        let store = InMemoryStore::new();
        let seller = store.insert_seller(new_seller(1, "Acme")).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let product = tx.insert_product(new_product(1, seller.id, "Pen", 5)).await.unwrap();
        tx.commit().await.unwrap();
        drop(tx);

        assert!(store.product_exists(product.id).await.unwrap());
        assert_eq!(store.total_stock(1).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn finished_transaction_rejects_further_writes() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.commit().await.unwrap();

        let err = tx.find_seller(1).await.unwrap_err();
        assert!(matches!(err, StoreError::TransactionClosed));
        // rollback after commit is a no-op
        tx.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn insert_product_requires_existing_references() {
        let store = InMemoryStore::new();
        let seller = store.insert_seller(new_seller(1, "Acme")).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let err = tx.insert_product(new_product(1, 999, "Pen", 5)).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingReference { table: "sellers", id: 999 }));

        let mut dangling = new_product(1, seller.id, "Pen", 5);
        dangling.brand_id = Some(777);
        let err = tx.insert_product(dangling).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingReference { table: "brands", id: 777 }));
    }

    #[tokio::test]
    async fn increment_past_i64_max_is_rejected() {
        let store = InMemoryStore::new();
        let seller = store.insert_seller(new_seller(1, "Acme")).await.unwrap();
        let mut tx = store.begin().await.unwrap();
        let product = tx.insert_product(new_product(1, seller.id, "Pen", 5)).await.unwrap();

        let err = tx.increment_stock(product.id, i64::MAX).await.unwrap_err();
        assert!(matches!(err, StoreError::StockOverflow { delta: i64::MAX, .. }));
    }

    #[tokio::test]
    async fn increment_of_missing_product_returns_none() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        assert!(tx.increment_stock(42, 3).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn listings_are_scoped_to_owner() {
        let store = InMemoryStore::new();
        store.insert_seller(new_seller(1, "Zed")).await.unwrap();
        store.insert_seller(new_seller(1, "Acme")).await.unwrap();
        store.insert_seller(new_seller(2, "Other")).await.unwrap();
        store
            .insert_catalog_entry(CatalogKind::Brand, 2, "Bic".into())
            .await
            .unwrap();

        let names: Vec<String> = store
            .list_sellers(1)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Acme", "Zed"]);
        assert!(store
            .list_catalog_entries(CatalogKind::Brand, 1)
            .await
            .unwrap()
            .is_empty());
        assert!(store
            .list_catalog_entries(CatalogKind::Category, 2)
            .await
            .unwrap()
            .is_empty());
    }
}
