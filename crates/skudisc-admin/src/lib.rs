pub mod client;
pub mod error;
pub mod types;

pub use client::{sku_search_query, AdminClient, DiscountMetafield};
pub use error::AdminError;
