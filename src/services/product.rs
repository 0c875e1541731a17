//! Product workflows.
//!
//! Creating a product and restocking one are the only writes that touch the
//! purchase ledger. Each runs inside a single store transaction: the product
//! write and its ledger entry commit together or not at all. Everything else
//! here is a plain read or delete against the store.

use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::dtos::product::{AddStockRequest, CreateProductRequest, ProductListQuery, Restock};
use crate::error::AppError;
use crate::models::product::{NewProduct, Product, ProductPage};
use crate::models::purchase::NewPurchase;
use crate::query::ProductFilter;
use crate::store::{InventoryStore, StoreError, StoreTransaction};

const INVALID_SELLER: &str = "Invalid seller ID";
const CREATE_FAILED: &str = "Product creation failed";
const RESTOCK_FAILED: &str = "Product update failed";

/// Why a transactional workflow stopped before committing.
#[derive(Debug, Error)]
enum WorkflowError {
    #[error("seller {0} does not exist")]
    UnknownSeller(i64),
    #[error("product {0} does not exist")]
    UnknownProduct(i64),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl WorkflowError {
    fn into_app_error(self, failure: &'static str) -> AppError {
        match self {
            WorkflowError::UnknownSeller(_) => AppError::validation(INVALID_SELLER),
            other => {
                error!(error = %other, "{failure}");
                AppError::operation_failed(failure)
            }
        }
    }
}

/// Commit on success, roll back on failure. The handle is dropped on return
/// either way, which releases it.
async fn settle<T>(
    mut tx: Box<dyn StoreTransaction>,
    outcome: Result<T, WorkflowError>,
    failure: &'static str,
) -> Result<T, AppError> {
    let outcome = match outcome {
        Ok(value) => tx.commit().await.map(|()| value).map_err(WorkflowError::from),
        Err(e) => Err(e),
    };

    match outcome {
        Ok(value) => Ok(value),
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "Rollback failed");
            }
            Err(err.into_app_error(failure))
        }
    }
}

async fn insert_with_ledger(
    tx: &mut dyn StoreTransaction,
    product: NewProduct,
) -> Result<Product, WorkflowError> {
    let seller = tx
        .find_seller(product.seller_id)
        .await?
        .ok_or(WorkflowError::UnknownSeller(product.seller_id))?;

    let user_id = product.user_id;
    let product = tx.insert_product(product).await?;
    tx.insert_purchase(NewPurchase::record(user_id, &product, &seller))
        .await?;
    Ok(product)
}

async fn restock_with_ledger(
    tx: &mut dyn StoreTransaction,
    id: i64,
    restock: Restock,
    user_id: i64,
) -> Result<Product, WorkflowError> {
    let seller = tx
        .find_seller(restock.seller_id)
        .await?
        .ok_or(WorkflowError::UnknownSeller(restock.seller_id))?;

    let product = tx
        .increment_stock(id, restock.delta)
        .await?
        .ok_or(WorkflowError::UnknownProduct(id))?;
    // The entry records the post-increment stock, not the delta.
    tx.insert_purchase(NewPurchase::record(user_id, &product, &seller))
        .await?;
    Ok(product)
}

/// Create a product and its opening ledger entry.
#[instrument(skip(store, payload))]
pub async fn create(
    store: &dyn InventoryStore,
    payload: CreateProductRequest,
    user_id: i64,
) -> Result<Product, AppError> {
    let new_product = payload.validate(user_id)?;

    let mut tx = store.begin().await.map_err(|e| {
        error!(error = %e, "Could not open transaction");
        AppError::operation_failed(CREATE_FAILED)
    })?;
    let outcome = insert_with_ledger(tx.as_mut(), new_product).await;
    let product = settle(tx, outcome, CREATE_FAILED).await?;

    info!(product_id = product.id, stock = product.stock, "Created product");
    Ok(product)
}

/// Increase a product's stock by the requested amount and record the purchase.
#[instrument(skip(store, payload))]
pub async fn add_to_stock(
    store: &dyn InventoryStore,
    id: i64,
    payload: AddStockRequest,
    user_id: i64,
) -> Result<Product, AppError> {
    let restock = payload.validate()?;

    let mut tx = store.begin().await.map_err(|e| {
        error!(error = %e, "Could not open transaction");
        AppError::operation_failed(RESTOCK_FAILED)
    })?;
    let outcome = restock_with_ledger(tx.as_mut(), id, restock, user_id).await;
    let product = settle(tx, outcome, RESTOCK_FAILED).await?;

    info!(product_id = product.id, stock = product.stock, "Restocked product");
    Ok(product)
}

#[instrument(skip(store, query))]
pub async fn read_all(
    store: &dyn InventoryStore,
    query: ProductListQuery,
    user_id: i64,
) -> Result<ProductPage, AppError> {
    let filter = ProductFilter::try_from(query)?;
    Ok(store.query_products(user_id, &filter).await?)
}

/// `Ok(None)` when the product exists but belongs to someone else; callers
/// cannot tell that apart from a product they simply do not own.
#[instrument(skip(store))]
pub async fn read(
    store: &dyn InventoryStore,
    id: i64,
    user_id: i64,
) -> Result<Option<Product>, AppError> {
    if !store.product_exists(id).await? {
        return Err(AppError::not_found("Product not found"));
    }
    Ok(store.find_owned_product(id, user_id).await?)
}

#[instrument(skip(store))]
pub async fn bulk_delete(store: &dyn InventoryStore, ids: &[i64]) -> Result<u64, AppError> {
    let deleted = store.delete_products(ids).await?;
    info!(requested = ids.len(), deleted, "Bulk deleted products");
    Ok(deleted)
}

#[instrument(skip(store))]
pub async fn count_total_product(store: &dyn InventoryStore, user_id: i64) -> Result<i64, AppError> {
    Ok(store.total_stock(user_id).await?)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::models::catalog::{CatalogEntry, CatalogKind};
    use crate::models::purchase::Purchase;
    use crate::models::seller::{NewSeller, Seller};
    use crate::store::memory::InMemoryStore;
    use crate::store::StoreResult;

    const OWNER: i64 = 1;
    const STRANGER: i64 = 2;

    async fn seed_seller(store: &InMemoryStore, name: &str) -> Seller {
        store
            .insert_seller(NewSeller {
                user_id: OWNER,
                name: name.into(),
                email: None,
                contact_no: None,
            })
            .await
            .unwrap()
    }

    fn create_request(seller: i64, name: &str, stock: i64, price: f64) -> CreateProductRequest {
        serde_json::from_value(json!({
            "seller": seller,
            "name": name,
            "stock": stock,
            "price": price,
        }))
        .unwrap()
    }

    fn restock_request(seller: i64, stock: i64) -> AddStockRequest {
        AddStockRequest {
            seller: Some(seller),
            stock: Some(stock),
        }
    }

    #[tokio::test]
    async fn create_writes_product_and_ledger_entry() {
        let store = InMemoryStore::new();
        let seller = seed_seller(&store, "S1").await;

        let product = create(&store, create_request(seller.id, "Pen", 100, 2.0), OWNER)
            .await
            .unwrap();
        assert_eq!(product.stock, 100);
        assert_eq!(product.price, 2.0);
        assert_eq!(product.user_id, OWNER);

        let ledger = store.list_purchases(OWNER).await.unwrap();
        assert_eq!(ledger.len(), 1);
        let entry = &ledger[0];
        assert_eq!(entry.product_id, product.id);
        assert_eq!(entry.seller_id, seller.id);
        assert_eq!(entry.product_name, "Pen");
        assert_eq!(entry.seller_name, "S1");
        assert_eq!(entry.quantity, 100);
        assert_eq!(entry.unit_price, 2.0);
        assert_eq!(entry.total_price, 200.0);
    }

    #[tokio::test]
    async fn create_with_unknown_seller_is_a_validation_error_and_writes_nothing() {
        let store = InMemoryStore::new();

        let err = create(&store, create_request(999, "Pen", 10, 1.0), OWNER)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(ref m) if m == INVALID_SELLER));

        assert_eq!(store.total_stock(OWNER).await.unwrap(), 0);
        assert!(store.list_purchases(OWNER).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_rejects_missing_fields_before_touching_the_store() {
        let store = FailingLedgerStore::default();
        let err = create(&store, CreateProductRequest::default(), OWNER)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        assert_eq!(store.transactions_opened(), 0);
    }

    #[tokio::test]
    async fn ledger_failure_rolls_back_the_product() {
        let store = FailingLedgerStore::default();
        let seller = seed_seller(&store.inner, "S1").await;

        let err = create(&store, create_request(seller.id, "Pen", 10, 1.0), OWNER)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::OperationFailed(ref m) if m == CREATE_FAILED));

        let page = store
            .inner
            .query_products(OWNER, &ProductFilter::default())
            .await
            .unwrap();
        assert_eq!(page.total_count, 0);
        assert!(store.inner.list_purchases(OWNER).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn restock_ledger_entry_uses_post_increment_stock() {
        let store = InMemoryStore::new();
        let seller = seed_seller(&store, "S1").await;
        let product = create(&store, create_request(seller.id, "Pen", 100, 2.0), OWNER)
            .await
            .unwrap();

        let updated = add_to_stock(&store, product.id, restock_request(seller.id, 50), OWNER)
            .await
            .unwrap();
        assert_eq!(updated.stock, 150);

        let ledger = store.list_purchases(OWNER).await.unwrap();
        assert_eq!(ledger.len(), 2);
        let restock_entry = ledger.iter().max_by_key(|p| p.id).unwrap();
        assert_eq!(restock_entry.quantity, 150);
        assert_eq!(restock_entry.unit_price, 2.0);
        assert_eq!(restock_entry.total_price, 300.0);
    }

    #[tokio::test]
    async fn restock_records_the_restocking_seller() {
        let store = InMemoryStore::new();
        let original = seed_seller(&store, "Original").await;
        let wholesaler = seed_seller(&store, "Wholesaler").await;
        let product = create(&store, create_request(original.id, "Pen", 1, 1.0), OWNER)
            .await
            .unwrap();

        add_to_stock(&store, product.id, restock_request(wholesaler.id, 4), OWNER)
            .await
            .unwrap();

        let ledger = store.list_purchases(OWNER).await.unwrap();
        let restock_entry = ledger.iter().max_by_key(|p| p.id).unwrap();
        assert_eq!(restock_entry.seller_id, wholesaler.id);
        assert_eq!(restock_entry.seller_name, "Wholesaler");
    }

    #[tokio::test]
    async fn restock_with_unknown_seller_changes_nothing() {
        let store = InMemoryStore::new();
        let seller = seed_seller(&store, "S1").await;
        let product = create(&store, create_request(seller.id, "Pen", 100, 2.0), OWNER)
            .await
            .unwrap();

        let err = add_to_stock(&store, product.id, restock_request(999, 50), OWNER)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        assert_eq!(store.total_stock(OWNER).await.unwrap(), 100);
        assert_eq!(store.list_purchases(OWNER).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn restock_of_missing_product_fails_generically() {
        let store = InMemoryStore::new();
        let seller = seed_seller(&store, "S1").await;

        let err = add_to_stock(&store, 12345, restock_request(seller.id, 5), OWNER)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::OperationFailed(ref m) if m == RESTOCK_FAILED));
        assert!(store.list_purchases(OWNER).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn restock_overflowing_stock_fails_and_changes_nothing() {
        let store = InMemoryStore::new();
        let seller = seed_seller(&store, "S1").await;
        let product = create(&store, create_request(seller.id, "Pen", 5, 1.0), OWNER)
            .await
            .unwrap();

        let err = add_to_stock(&store, product.id, restock_request(seller.id, i64::MAX), OWNER)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::OperationFailed(ref m) if m == RESTOCK_FAILED));

        let current = store.find_owned_product(product.id, OWNER).await.unwrap().unwrap();
        assert_eq!(current.stock, 5);
        assert_eq!(store.list_purchases(OWNER).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn create_with_dangling_category_fails_and_writes_nothing() {
        let store = InMemoryStore::new();
        let seller = seed_seller(&store, "S1").await;
        let mut request = create_request(seller.id, "Pen", 5, 1.0);
        request.category = Some(4242);

        let err = create(&store, request, OWNER).await.unwrap_err();
        assert!(matches!(err, AppError::OperationFailed(ref m) if m == CREATE_FAILED));
        assert_eq!(store.total_stock(OWNER).await.unwrap(), 0);
        assert!(store.list_purchases(OWNER).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_restocks_do_not_lose_updates() {
        let store = Arc::new(InMemoryStore::new());
        let seller = seed_seller(&store, "S1").await;
        let product = create(&*store, create_request(seller.id, "Pen", 10, 1.0), OWNER)
            .await
            .unwrap();

        let deltas: Vec<i64> = (1..=20).collect();
        let handles: Vec<_> = deltas
            .iter()
            .map(|&delta| {
                let store = Arc::clone(&store);
                let seller_id = seller.id;
                let product_id = product.id;
                tokio::spawn(async move {
                    add_to_stock(&*store, product_id, restock_request(seller_id, delta), OWNER).await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let expected = 10 + deltas.iter().sum::<i64>();
        let current = store.find_owned_product(product.id, OWNER).await.unwrap().unwrap();
        assert_eq!(current.stock, expected);
        assert_eq!(store.list_purchases(OWNER).await.unwrap().len(), deltas.len() + 1);
    }

    #[tokio::test]
    async fn read_hides_products_owned_by_others() {
        let store = InMemoryStore::new();
        let seller = seed_seller(&store, "S1").await;
        let product = create(&store, create_request(seller.id, "Pen", 1, 1.0), OWNER)
            .await
            .unwrap();

        assert_eq!(read(&store, product.id, OWNER).await.unwrap(), Some(product.clone()));
        assert_eq!(read(&store, product.id, STRANGER).await.unwrap(), None);
        assert!(matches!(
            read(&store, product.id + 1000, OWNER).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn bulk_delete_counts_only_actual_deletions() {
        let store = InMemoryStore::new();
        let seller = seed_seller(&store, "S1").await;
        let a = create(&store, create_request(seller.id, "A", 1, 1.0), OWNER).await.unwrap();
        let b = create(&store, create_request(seller.id, "B", 1, 1.0), OWNER).await.unwrap();
        let c = create(&store, create_request(seller.id, "C", 1, 1.0), OWNER).await.unwrap();

        let deleted = bulk_delete(&store, &[a.id, b.id, 9999]).await.unwrap();
        assert_eq!(deleted, 2);
        assert!(!store.product_exists(a.id).await.unwrap());
        assert!(!store.product_exists(b.id).await.unwrap());
        assert!(store.product_exists(c.id).await.unwrap());
        // the ledger is untouched
        assert_eq!(store.list_purchases(OWNER).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn total_stock_sums_only_the_users_products() {
        let store = InMemoryStore::new();
        let seller = seed_seller(&store, "S1").await;
        create(&store, create_request(seller.id, "A", 5, 1.0), OWNER).await.unwrap();
        create(&store, create_request(seller.id, "B", 7, 1.0), OWNER).await.unwrap();
        create(&store, create_request(seller.id, "C", 100, 1.0), STRANGER).await.unwrap();

        assert_eq!(count_total_product(&store, OWNER).await.unwrap(), 12);
        assert_eq!(count_total_product(&store, 77).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn read_all_filters_sorts_pages_and_enriches() {
        let store = InMemoryStore::new();
        let seller = seed_seller(&store, "S1").await;
        let brand = store
            .insert_catalog_entry(CatalogKind::Brand, OWNER, "Bic".into())
            .await
            .unwrap();
        for (name, price) in [("Blue pen", 3.0), ("Red pen", 1.0), ("Pencil", 2.0), ("Eraser", 0.5)] {
            let mut request = create_request(seller.id, name, 10, price);
            request.brand = Some(brand.id);
            create(&store, request, OWNER).await.unwrap();
        }
        create(&store, create_request(seller.id, "Stranger pen", 10, 1.0), STRANGER)
            .await
            .unwrap();

        let query = ProductListQuery {
            search: Some("PEN".into()),
            sort_by: Some("price".into()),
            sort_order: Some("asc".into()),
            limit: Some("2".into()),
            ..ProductListQuery::default()
        };
        let page = read_all(&store, query, OWNER).await.unwrap();

        assert_eq!(page.total_count, 3);
        let names: Vec<&str> = page.products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Red pen", "Pencil"]);
        let first = &page.products[0];
        assert_eq!(first.brand.as_ref().map(|b| b.name.as_str()), Some("Bic"));
        assert_eq!(first.seller.as_ref().map(|s| s.name.as_str()), Some("S1"));
        assert!(first.category.is_none());

        let second_page = read_all(
            &store,
            ProductListQuery {
                search: Some("pen".into()),
                sort_by: Some("price".into()),
                sort_order: Some("asc".into()),
                limit: Some("2".into()),
                page: Some("2".into()),
                ..ProductListQuery::default()
            },
            OWNER,
        )
        .await
        .unwrap();
        assert_eq!(second_page.total_count, 3);
        assert_eq!(second_page.products.len(), 1);
        assert_eq!(second_page.products[0].name, "Blue pen");
    }

    /// In-memory store whose transactions refuse ledger writes.
    #[derive(Default)]
    struct FailingLedgerStore {
        inner: InMemoryStore,
        opened: std::sync::atomic::AtomicUsize,
    }

    impl FailingLedgerStore {
        fn transactions_opened(&self) -> usize {
            self.opened.load(std::sync::atomic::Ordering::SeqCst)
        }
    }

    struct FailingLedgerTransaction {
        inner: Box<dyn StoreTransaction>,
    }

    #[async_trait]
    impl StoreTransaction for FailingLedgerTransaction {
        async fn find_seller(&mut self, id: i64) -> StoreResult<Option<Seller>> {
            self.inner.find_seller(id).await
        }

        async fn insert_product(&mut self, product: NewProduct) -> StoreResult<Product> {
            self.inner.insert_product(product).await
        }

        async fn increment_stock(&mut self, id: i64, delta: i64) -> StoreResult<Option<Product>> {
            self.inner.increment_stock(id, delta).await
        }

        async fn insert_purchase(&mut self, _purchase: NewPurchase) -> StoreResult<Purchase> {
            Err(StoreError::InvalidRow("ledger unavailable".into()))
        }

        async fn commit(&mut self) -> StoreResult<()> {
            self.inner.commit().await
        }

        async fn rollback(&mut self) -> StoreResult<()> {
            self.inner.rollback().await
        }
    }

    #[async_trait]
    impl InventoryStore for FailingLedgerStore {
        async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
            self.opened.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(Box::new(FailingLedgerTransaction {
                inner: self.inner.begin().await?,
            }))
        }

        async fn product_exists(&self, id: i64) -> StoreResult<bool> {
            self.inner.product_exists(id).await
        }

        async fn find_owned_product(&self, id: i64, user_id: i64) -> StoreResult<Option<Product>> {
            self.inner.find_owned_product(id, user_id).await
        }

        async fn query_products(&self, user_id: i64, filter: &ProductFilter) -> StoreResult<ProductPage> {
            self.inner.query_products(user_id, filter).await
        }

        async fn delete_products(&self, ids: &[i64]) -> StoreResult<u64> {
            self.inner.delete_products(ids).await
        }

        async fn total_stock(&self, user_id: i64) -> StoreResult<i64> {
            self.inner.total_stock(user_id).await
        }

        async fn insert_seller(&self, seller: NewSeller) -> StoreResult<Seller> {
            self.inner.insert_seller(seller).await
        }

        async fn find_owned_seller(&self, id: i64, user_id: i64) -> StoreResult<Option<Seller>> {
            self.inner.find_owned_seller(id, user_id).await
        }

        async fn list_sellers(&self, user_id: i64) -> StoreResult<Vec<Seller>> {
            self.inner.list_sellers(user_id).await
        }

        async fn insert_catalog_entry(
            &self,
            kind: CatalogKind,
            user_id: i64,
            name: String,
        ) -> StoreResult<CatalogEntry> {
            self.inner.insert_catalog_entry(kind, user_id, name).await
        }

        async fn list_catalog_entries(&self, kind: CatalogKind, user_id: i64) -> StoreResult<Vec<CatalogEntry>> {
            self.inner.list_catalog_entries(kind, user_id).await
        }

        async fn list_purchases(&self, user_id: i64) -> StoreResult<Vec<Purchase>> {
            self.inner.list_purchases(user_id).await
        }
    }
}
