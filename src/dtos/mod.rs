pub mod catalog;
pub mod fields;
pub mod product;
pub mod seller;
