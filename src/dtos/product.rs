// src/dtos/product.rs
use serde::{Deserialize, Serialize};

use super::fields::{self, non_empty};
use crate::error::AppError;
use crate::models::product::{NewProduct, ProductSize};
use crate::query::{ProductFilter, ProductSortKey, SortOrder, DEFAULT_LIMIT, DEFAULT_PAGE, MAX_LIMIT};

const MISSING_PRODUCT_FIELDS: &str = "Missing required fields: seller, name, stock, price";
const MISSING_STOCK_FIELDS: &str = "Missing required fields: seller, stock";
const INVALID_PRICE: &str = "Price must be a positive amount with at most two decimal places";

/// Prices are stored as NUMERIC(14,2): at least one cent, whole cents only,
/// below 10^12.
fn is_storable_price(price: f64) -> bool {
    if !price.is_finite() || price >= 1e12 {
        return false;
    }
    let cents = price * 100.0;
    cents.round() >= 1.0 && (cents - cents.round()).abs() < 1e-6
}

/// Fields outside this struct are ignored, never written.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[serde(default, deserialize_with = "fields::optional_id")]
    pub seller: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub stock: Option<i64>,
    #[serde(default, deserialize_with = "fields::optional_id")]
    pub category: Option<i64>,
    #[serde(default, deserialize_with = "fields::optional_id")]
    pub brand: Option<i64>,
    #[serde(default, deserialize_with = "fields::optional_size")]
    pub size: Option<ProductSize>,
    #[serde(default)]
    pub description: Option<String>,
}

impl CreateProductRequest {
    pub fn validate(self, user_id: i64) -> Result<NewProduct, AppError> {
        let name = self.name.as_deref().map(str::trim).unwrap_or_default();
        let (Some(seller_id), Some(stock), Some(price)) = (self.seller, self.stock, self.price) else {
            return Err(AppError::validation(MISSING_PRODUCT_FIELDS));
        };
        if name.is_empty() {
            return Err(AppError::validation(MISSING_PRODUCT_FIELDS));
        }
        if stock <= 0 {
            return Err(AppError::validation("Stock must be greater than 0"));
        }
        if !is_storable_price(price) {
            return Err(AppError::validation(INVALID_PRICE));
        }

        Ok(NewProduct {
            user_id,
            seller_id,
            category_id: self.category,
            brand_id: self.brand,
            name: name.to_string(),
            price,
            stock,
            size: self.size,
            description: self.description,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AddStockRequest {
    #[serde(default, deserialize_with = "fields::optional_id")]
    pub seller: Option<i64>,
    #[serde(default)]
    pub stock: Option<i64>,
}

/// A validated restock: who sold it and how many units arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Restock {
    pub seller_id: i64,
    pub delta: i64,
}

impl AddStockRequest {
    pub fn validate(self) -> Result<Restock, AppError> {
        let (Some(seller_id), Some(delta)) = (self.seller, self.stock) else {
            return Err(AppError::validation(MISSING_STOCK_FIELDS));
        };
        if delta <= 0 {
            return Err(AppError::validation("Stock must be greater than 0"));
        }
        Ok(Restock { seller_id, delta })
    }
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    #[serde(deserialize_with = "fields::id_list")]
    pub ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteResponse {
    pub deleted_count: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalStockResponse {
    pub total_quantity: i64,
}

/// Raw list parameters, all taken as strings so blank values can be dropped.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub seller: Option<String>,
    pub size: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

fn parse_param<T: std::str::FromStr>(name: &str, raw: Option<String>) -> Result<Option<T>, AppError> {
    non_empty(raw)
        .map(|value| {
            value
                .parse()
                .map_err(|_| AppError::validation(format!("Invalid value for '{name}': {value}")))
        })
        .transpose()
}

impl TryFrom<ProductListQuery> for ProductFilter {
    type Error = AppError;

    fn try_from(query: ProductListQuery) -> Result<Self, Self::Error> {
        let page = parse_param::<u32>("page", query.page)?.unwrap_or(DEFAULT_PAGE);
        let limit = parse_param::<u32>("limit", query.limit)?.unwrap_or(DEFAULT_LIMIT);
        if page == 0 {
            return Err(AppError::validation("page must be at least 1"));
        }
        if limit == 0 {
            return Err(AppError::validation("limit must be at least 1"));
        }

        let sort_key = match non_empty(query.sort_by) {
            Some(raw) => ProductSortKey::parse(&raw)
                .ok_or_else(|| AppError::validation(format!("Cannot sort products by '{raw}'")))?,
            None => ProductSortKey::CreatedAt,
        };
        let sort_order = match non_empty(query.sort_order) {
            Some(raw) => SortOrder::parse(&raw)
                .ok_or_else(|| AppError::validation(format!("Invalid sort order '{raw}'")))?,
            None => SortOrder::Desc,
        };

        Ok(ProductFilter {
            search: non_empty(query.search),
            category_id: parse_param("category", query.category)?,
            brand_id: parse_param("brand", query.brand)?,
            seller_id: parse_param("seller", query.seller)?,
            size: parse_param("size", query.size)?,
            min_price: parse_param("minPrice", query.min_price)?,
            max_price: parse_param("maxPrice", query.max_price)?,
            sort_key,
            sort_order,
            page,
            limit: limit.min(MAX_LIMIT),
        })
    }
}
