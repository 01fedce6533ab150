pub mod app_config;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod configuration;
pub mod discount;
pub mod error;
pub mod import;
pub mod listing;
pub mod merge;
pub mod pipeline;
pub mod pricing;
pub mod serialize;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use app_config::{AppConfig, Environment};
pub use catalog::{CatalogResolver, MetafieldStore, ResolvedProduct, ResolvedVariant};
pub use config::{load_app_config, load_app_config_from_env};
pub use configuration::Configuration;
pub use discount::{DiscountRecord, DiscountType};
pub use error::{ConfigError, LineError, LineErrorKind, ReconcileError};
pub use merge::{MergeResult, PickResult};
pub use pipeline::{bulk_import, LookupOptions};
pub use session::{EditorSession, SessionState};
