use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProductSize {
    Small,
    Medium,
    Large,
}

impl ProductSize {
    pub fn as_str(self) -> &'static str {
        match self {
            ProductSize::Small => "SMALL",
            ProductSize::Medium => "MEDIUM",
            ProductSize::Large => "LARGE",
        }
    }
}

impl fmt::Display for ProductSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SMALL" => Ok(ProductSize::Small),
            "MEDIUM" => Ok(ProductSize::Medium),
            "LARGE" => Ok(ProductSize::Large),
            other => Err(format!("unknown product size '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub user_id: i64,
    pub seller_id: i64,
    pub category_id: Option<i64>,
    pub brand_id: Option<i64>,
    pub name: String,
    pub price: f64,
    pub stock: i64,
    pub size: Option<ProductSize>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated product ready to be written. Only built from a create request.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub user_id: i64,
    pub seller_id: i64,
    pub category_id: Option<i64>,
    pub brand_id: Option<i64>,
    pub name: String,
    pub price: f64,
    pub stock: i64,
    pub size: Option<ProductSize>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogRef {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerRef {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub contact_no: Option<String>,
}

/// Product row as shown in listings, with related records resolved for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetails {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub price: f64,
    pub stock: i64,
    pub size: Option<ProductSize>,
    pub description: Option<String>,
    pub category: Option<CatalogRef>,
    pub brand: Option<CatalogRef>,
    pub seller: Option<SellerRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub products: Vec<ProductDetails>,
    pub total_count: i64,
}
