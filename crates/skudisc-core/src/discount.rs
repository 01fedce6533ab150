use serde::{Deserialize, Serialize};

/// Upper bound applied to fixed-amount discounts when a value is edited or
/// loaded. Percentages are bounded by `100`.
pub const FIXED_AMOUNT_CEILING: f64 = 1_000_000.0;

/// Percentage-off vs fixed-currency-amount-off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiscountType {
    #[default]
    #[serde(rename = "percentage")]
    Percentage,
    #[serde(rename = "fixedAmount")]
    FixedAmount,
}

impl DiscountType {
    /// Largest value a discount of this type may hold at rest.
    #[must_use]
    pub fn max_value(self) -> f64 {
        match self {
            DiscountType::Percentage => 100.0,
            DiscountType::FixedAmount => FIXED_AMOUNT_CEILING,
        }
    }

    /// Clamps `value` into `[0, max_value]`. Non-finite input becomes `0`.
    #[must_use]
    pub fn clamp(self, value: f64) -> f64 {
        if !value.is_finite() {
            return 0.0;
        }
        value.clamp(0.0, self.max_value())
    }

    /// Returns `true` when `value` already satisfies this type's bound.
    #[must_use]
    pub fn is_in_range(self, value: f64) -> bool {
        value.is_finite() && (0.0..=self.max_value()).contains(&value)
    }

    /// Wire name used in the persisted configuration.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DiscountType::Percentage => "percentage",
            DiscountType::FixedAmount => "fixedAmount",
        }
    }

    /// Parses a wire name. Accepts the persisted spelling plus the kebab/snake
    /// variants a merchant might type.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "percentage" | "percent" | "%" => Some(DiscountType::Percentage),
            "fixedAmount" | "fixed-amount" | "fixed_amount" | "fixed" | "$" => {
                Some(DiscountType::FixedAmount)
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for DiscountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One SKU or product/variant entry under configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountRecord {
    /// Stable key within a configuration; see [`resolve_identifier`].
    pub identifier: String,
    /// Merchant-visible SKU. Empty when a whole product was picked.
    pub sku: String,
    pub title: String,
    pub image: Option<String>,
    /// Original unit price as a decimal string, exactly as the catalog returns it.
    pub price: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub variant_id: Option<String>,
    pub product_id: Option<String>,
}

impl DiscountRecord {
    /// Builds a record and derives its identifier from the supplied fields.
    #[must_use]
    pub fn new(
        sku: impl Into<String>,
        title: impl Into<String>,
        discount_type: DiscountType,
        discount_value: f64,
    ) -> Self {
        let mut record = Self {
            identifier: String::new(),
            sku: sku.into(),
            title: title.into(),
            image: None,
            price: None,
            discount_type,
            discount_value,
            variant_id: None,
            product_id: None,
        };
        record.identifier = resolve_identifier(&record);
        record
    }

    /// Builder-style setter for catalog metadata; recomputes the identifier.
    #[must_use]
    pub fn with_catalog(
        mut self,
        variant_id: Option<String>,
        product_id: Option<String>,
        image: Option<String>,
        price: Option<String>,
    ) -> Self {
        self.variant_id = variant_id.filter(|v| !v.is_empty());
        self.product_id = product_id.filter(|p| !p.is_empty());
        self.image = image;
        self.price = price;
        self.identifier = resolve_identifier(&self);
        self
    }

    /// Case-insensitive SKU comparison. Records with no SKU never match.
    #[must_use]
    pub fn has_sku(&self, sku: &str) -> bool {
        !self.sku.is_empty() && self.sku.eq_ignore_ascii_case(sku)
    }
}

/// Derives the stable key for a record: variant id, then SKU, then title.
///
/// Two products sharing a title with neither SKU nor variant id collide on
/// the same identifier; callers see the second one as already present.
#[must_use]
pub fn resolve_identifier(record: &DiscountRecord) -> String {
    if let Some(variant_id) = record.variant_id.as_deref().filter(|v| !v.is_empty()) {
        return variant_id.to_owned();
    }
    if !record.sku.is_empty() {
        return record.sku.clone();
    }
    record.title.clone()
}
