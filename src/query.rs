// Store-level view over the caller's list parameters: filter, sort, page.
use std::cmp::Ordering;

use crate::models::product::{Product, ProductSize};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductSortKey {
    Name,
    Price,
    Stock,
    CreatedAt,
}

impl ProductSortKey {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "name" => Some(ProductSortKey::Name),
            "price" => Some(ProductSortKey::Price),
            "stock" => Some(ProductSortKey::Stock),
            "createdAt" => Some(ProductSortKey::CreatedAt),
            _ => None,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            ProductSortKey::Name => "p.name",
            ProductSortKey::Price => "p.price",
            ProductSortKey::Stock => "p.stock",
            ProductSortKey::CreatedAt => "p.created_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub category_id: Option<i64>,
    pub brand_id: Option<i64>,
    pub seller_id: Option<i64>,
    pub size: Option<ProductSize>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub sort_key: ProductSortKey,
    pub sort_order: SortOrder,
    pub page: u32,
    pub limit: u32,
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self {
            search: None,
            category_id: None,
            brand_id: None,
            seller_id: None,
            size: None,
            min_price: None,
            max_price: None,
            sort_key: ProductSortKey::CreatedAt,
            sort_order: SortOrder::Desc,
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl ProductFilter {
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.limit)
    }

    /// Same predicate the SQL store builds, for stores that filter in memory.
    pub fn matches(&self, user_id: i64, product: &Product) -> bool {
        if product.user_id != user_id {
            return false;
        }
        if let Some(search) = &self.search {
            if !product.name.to_lowercase().contains(&search.to_lowercase()) {
                return false;
            }
        }
        if self.category_id.is_some() && product.category_id != self.category_id {
            return false;
        }
        if self.brand_id.is_some() && product.brand_id != self.brand_id {
            return false;
        }
        if let Some(seller_id) = self.seller_id {
            if product.seller_id != seller_id {
                return false;
            }
        }
        if self.size.is_some() && product.size != self.size {
            return false;
        }
        if let Some(min) = self.min_price {
            if product.price < min {
                return false;
            }
        }
        if let Some(max) = self.max_price {
            if product.price > max {
                return false;
            }
        }
        true
    }

    pub fn compare(&self, a: &Product, b: &Product) -> Ordering {
        let by_key = match self.sort_key {
            ProductSortKey::Name => a.name.cmp(&b.name),
            ProductSortKey::Price => a.price.total_cmp(&b.price),
            ProductSortKey::Stock => a.stock.cmp(&b.stock),
            ProductSortKey::CreatedAt => a.created_at.cmp(&b.created_at),
        };
        let by_key = match self.sort_order {
            SortOrder::Asc => by_key,
            SortOrder::Desc => by_key.reverse(),
        };
        by_key.then(a.id.cmp(&b.id))
    }
}
