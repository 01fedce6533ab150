//! In-memory collaborators shared by unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::catalog::{CatalogResolver, MetafieldStore, ResolvedProduct, ResolvedVariant};

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub(crate) struct FakeError(pub String);

/// Catalog that answers from a fixed product list and counts lookups.
pub(crate) struct FakeCatalog {
    products: Vec<ResolvedProduct>,
    pub calls: AtomicUsize,
    /// Fail the n-th call (1-based) when set.
    pub fail_on_call: Option<usize>,
}

impl FakeCatalog {
    pub fn new(products: Vec<ResolvedProduct>) -> Self {
        Self {
            products,
            calls: AtomicUsize::new(0),
            fail_on_call: None,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CatalogResolver for FakeCatalog {
    type Error = FakeError;

    async fn resolve_skus(&self, skus: &[String]) -> Result<Vec<ResolvedProduct>, FakeError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_call == Some(call) {
            return Err(FakeError("catalog unavailable".to_owned()));
        }
        Ok(self
            .products
            .iter()
            .filter(|p| {
                p.variants.iter().any(|v| {
                    v.sku
                        .as_deref()
                        .is_some_and(|s| skus.iter().any(|r| r.eq_ignore_ascii_case(s)))
                })
            })
            .cloned()
            .collect())
    }
}

/// Metafield store backed by a mutex, optionally failing reads or writes.
pub(crate) struct MemoryStore {
    pub value: Mutex<Option<String>>,
    pub fail_reads: bool,
    pub fail_writes: bool,
    pub writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new(value: Option<&str>) -> Self {
        Self {
            value: Mutex::new(value.map(str::to_owned)),
            fail_reads: false,
            fail_writes: false,
            writes: AtomicUsize::new(0),
        }
    }

    pub fn stored(&self) -> Option<String> {
        self.value.lock().expect("store mutex").clone()
    }
}

impl MetafieldStore for MemoryStore {
    type Error = FakeError;

    async fn read(&self) -> Result<Option<String>, FakeError> {
        if self.fail_reads {
            return Err(FakeError("503 upstream timeout".to_owned()));
        }
        Ok(self.stored())
    }

    async fn write(&self, json: &str) -> Result<(), FakeError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(FakeError("Access to this namespace and key on Metafields is not allowed".to_owned()));
        }
        *self.value.lock().expect("store mutex") = Some(json.to_owned());
        Ok(())
    }
}

pub(crate) fn product(id: u32, title: &str, variants: &[(&str, &str)]) -> ResolvedProduct {
    ResolvedProduct {
        id: format!("gid://shopify/Product/{id}"),
        title: title.to_owned(),
        image: Some(format!("https://cdn.shopify.com/{id}.jpg")),
        min_price: variants.first().map(|(_, price)| (*price).to_owned()),
        variants: variants
            .iter()
            .enumerate()
            .map(|(n, (sku, price))| ResolvedVariant {
                id: format!("gid://shopify/ProductVariant/{id}{n}"),
                sku: Some((*sku).to_owned()),
                price: Some((*price).to_owned()),
                title: None,
            })
            .collect(),
    }
}
