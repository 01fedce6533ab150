//! The app's discounts as the merchant sees them: status tabs, title
//! search, sorting and CSV export.

use std::cmp::Ordering;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountStatus {
    Active,
    Scheduled,
    Expired,
}

impl std::fmt::Display for DiscountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscountStatus::Active => write!(f, "ACTIVE"),
            DiscountStatus::Scheduled => write!(f, "SCHEDULED"),
            DiscountStatus::Expired => write!(f, "EXPIRED"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscountKind {
    AutomaticApp,
    CodeApp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountSummary {
    /// Discount node GID, the owner of the configuration metafield.
    pub discount_id: String,
    pub title: String,
    pub status: DiscountStatus,
    pub kind: DiscountKind,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub async_usage_count: u64,
    /// First redeem code, for code discounts.
    pub code: Option<String>,
    pub function_id: Option<String>,
}

/// Keeps the discounts backed by `function_id`.
#[must_use]
pub fn for_function(discounts: Vec<DiscountSummary>, function_id: &str) -> Vec<DiscountSummary> {
    discounts
        .into_iter()
        .filter(|d| d.function_id.as_deref() == Some(function_id))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusTab {
    #[default]
    All,
    Active,
    Scheduled,
}

impl StatusTab {
    #[must_use]
    pub fn matches(self, status: DiscountStatus) -> bool {
        match self {
            StatusTab::All => true,
            StatusTab::Active => status == DiscountStatus::Active,
            StatusTab::Scheduled => status == DiscountStatus::Scheduled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TabCounts {
    pub all: usize,
    pub active: usize,
    pub scheduled: usize,
}

#[must_use]
pub fn tab_counts(discounts: &[DiscountSummary]) -> TabCounts {
    TabCounts {
        all: discounts.len(),
        active: discounts
            .iter()
            .filter(|d| StatusTab::Active.matches(d.status))
            .count(),
        scheduled: discounts
            .iter()
            .filter(|d| StatusTab::Scheduled.matches(d.status))
            .count(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    CreatedAt,
    StartsAt,
    AsyncUsageCount,
    Title,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl Default for SortOrder {
    fn default() -> Self {
        Self {
            key: SortKey::CreatedAt,
            direction: SortDirection::Desc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid sort order '{0}': expected '<createdAt|startsAt|asyncUsageCount|title> <asc|desc>'")]
pub struct ParseSortOrderError(String);

impl FromStr for SortOrder {
    type Err = ParseSortOrderError;

    /// Parses `"createdAt desc"`, `"title asc"` and the like. A missing
    /// direction means descending.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseSortOrderError(s.to_string());
        let mut parts = s.split_whitespace();
        let key = match parts.next().ok_or_else(err)? {
            "createdAt" => SortKey::CreatedAt,
            "startsAt" => SortKey::StartsAt,
            "asyncUsageCount" => SortKey::AsyncUsageCount,
            "title" => SortKey::Title,
            _ => return Err(err()),
        };
        let direction = match parts.next() {
            None | Some("desc") => SortDirection::Desc,
            Some("asc") => SortDirection::Asc,
            Some(_) => return Err(err()),
        };
        if parts.next().is_some() {
            return Err(err());
        }
        Ok(Self { key, direction })
    }
}

/// Tab filter, case-insensitive title search and sort, in that order.
/// The sort is stable; discounts without a start date sort last in both
/// directions when ordering by start date.
#[must_use]
pub fn view(
    discounts: &[DiscountSummary],
    tab: StatusTab,
    query: Option<&str>,
    order: SortOrder,
) -> Vec<DiscountSummary> {
    let needle = query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase);

    let mut out: Vec<DiscountSummary> = discounts
        .iter()
        .filter(|d| tab.matches(d.status))
        .filter(|d| {
            needle
                .as_deref()
                .is_none_or(|n| d.title.to_lowercase().contains(n))
        })
        .cloned()
        .collect();

    out.sort_by(|a, b| compare(a, b, order));
    out
}

fn compare(a: &DiscountSummary, b: &DiscountSummary, order: SortOrder) -> Ordering {
    let directed = |ord: Ordering| match order.direction {
        SortDirection::Asc => ord,
        SortDirection::Desc => ord.reverse(),
    };
    match order.key {
        SortKey::CreatedAt => directed(a.created_at.cmp(&b.created_at)),
        SortKey::StartsAt => match (a.starts_at, b.starts_at) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(x), Some(y)) => directed(x.cmp(&y)),
        },
        SortKey::AsyncUsageCount => directed(a.async_usage_count.cmp(&b.async_usage_count)),
        SortKey::Title => directed(a.title.to_lowercase().cmp(&b.title.to_lowercase())),
    }
}

fn csv_date(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

/// Renders discounts as CSV with every field quoted.
///
/// # Errors
///
/// Returns a `csv::Error` if a record cannot be written.
pub fn to_csv(discounts: &[DiscountSummary]) -> Result<String, csv::Error> {
    let mut wtr = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(vec![]);

    wtr.write_record([
        "Title",
        "Status",
        "Created Date",
        "Start Date",
        "End Date",
        "Usage Count",
        "Code",
    ])?;
    for d in discounts {
        wtr.write_record([
            d.title.clone(),
            d.status.to_string(),
            csv_date(Some(d.created_at)),
            csv_date(d.starts_at),
            csv_date(d.ends_at),
            d.async_usage_count.to_string(),
            d.code.clone().unwrap_or_default(),
        ])?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    String::from_utf8(bytes)
        .map_err(|e| csv::Error::from(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}
