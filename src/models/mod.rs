pub mod catalog;
pub mod product;
pub mod purchase;
pub mod seller;
