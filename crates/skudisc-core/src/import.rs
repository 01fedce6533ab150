//! Bulk-import parsing and validation.
//!
//! Merchants paste one `SKU <sep> value` pair per line, where the separator
//! is any run of tabs, commas, colons or whitespace. Parsing reports every
//! line (errors included) and validation is all-or-nothing for the batch:
//! a single bad line rejects the whole paste before any catalog lookup.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::discount::{DiscountType, FIXED_AMOUNT_CEILING};
use crate::error::{LineError, LineErrorKind, ReconcileError};

static DELIMITERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\t,:\s]+").expect("valid delimiter regex"));

/// One non-blank input line after tokenizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    Entry {
        line_number: usize,
        sku: String,
        raw_value: String,
    },
    Invalid(LineError),
}

impl ParsedLine {
    #[must_use]
    pub fn line_number(&self) -> usize {
        match self {
            ParsedLine::Entry { line_number, .. } => *line_number,
            ParsedLine::Invalid(err) => err.line_number,
        }
    }
}

/// A line that passed validation for the batch's discount type.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedEntry {
    pub line_number: usize,
    pub sku: String,
    pub value: f64,
}

/// A fully validated bulk import, ready for catalog resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportBatch {
    pub discount_type: DiscountType,
    /// One entry per distinct SKU (case-insensitive), in order of first
    /// appearance. A repeated SKU keeps its first spelling and last value.
    pub entries: Vec<ValidatedEntry>,
}

impl ImportBatch {
    /// The SKUs the merchant asked for, as spelled in the input.
    #[must_use]
    pub fn requested_skus(&self) -> BTreeSet<String> {
        self.entries.iter().map(|e| e.sku.clone()).collect()
    }

    /// SKUs in input order, for chunked catalog lookups.
    #[must_use]
    pub fn skus(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.sku.clone()).collect()
    }

    /// Finds the requested entry matching a catalog SKU, ignoring case.
    #[must_use]
    pub fn entry_for(&self, catalog_sku: &str) -> Option<&ValidatedEntry> {
        self.entries
            .iter()
            .find(|e| e.sku.eq_ignore_ascii_case(catalog_sku))
    }
}

/// Splits raw pasted text into one [`ParsedLine`] per non-blank line.
///
/// Line numbers count every `\n`-separated line of `raw`, blank ones
/// included, so they match what the merchant sees in the text box.
#[must_use]
pub fn parse(raw: &str) -> Vec<ParsedLine> {
    raw.split('\n')
        .enumerate()
        .filter_map(|(idx, line)| {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(parse_line(idx + 1, trimmed))
            }
        })
        .collect()
}

fn parse_line(line_number: usize, trimmed: &str) -> ParsedLine {
    // Keep a leading empty token so ",10" surfaces as a missing SKU rather
    // than a one-column line.
    let tokens: Vec<&str> = DELIMITERS
        .split(trimmed)
        .enumerate()
        .filter(|(i, t)| *i == 0 || !t.is_empty())
        .map(|(_, t)| t)
        .collect();

    let invalid_format = || ParsedLine::Invalid(LineError::new(line_number, LineErrorKind::InvalidFormat));

    if tokens.len() < 2 {
        return invalid_format();
    }

    let raw_value = tokens[tokens.len() - 1];
    if !has_value_shape(raw_value) {
        return invalid_format();
    }

    ParsedLine::Entry {
        line_number,
        sku: tokens[0].trim().to_owned(),
        raw_value: raw_value.to_owned(),
    }
}

/// A value column starts like a number: digit, sign, decimal point or a
/// currency prefix. Anything else means the line has no value column.
fn has_value_shape(token: &str) -> bool {
    token
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | '$'))
}

/// Parses a value column. A single leading `$` or trailing `%` is accepted.
fn parse_value(raw: &str) -> Option<f64> {
    let stripped = raw.strip_prefix('$').unwrap_or(raw);
    let stripped = stripped.strip_suffix('%').unwrap_or(stripped);
    stripped.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Validates one parsed line against the batch's discount type.
///
/// # Errors
///
/// Returns the line's [`LineError`]: the parse error for an invalid line,
/// otherwise the first failed check of missing SKU, unparseable value,
/// negative value, or a value above its type's ceiling.
pub fn validate(line: &ParsedLine, discount_type: DiscountType) -> Result<ValidatedEntry, LineError> {
    let (line_number, sku, raw_value) = match line {
        ParsedLine::Invalid(err) => return Err(*err),
        ParsedLine::Entry {
            line_number,
            sku,
            raw_value,
        } => (*line_number, sku, raw_value),
    };

    let fail = |kind| Err(LineError::new(line_number, kind));

    if sku.is_empty() {
        return fail(LineErrorKind::MissingSku);
    }
    let Some(value) = parse_value(raw_value) else {
        return fail(LineErrorKind::InvalidValue);
    };
    if value < 0.0 {
        return fail(LineErrorKind::NegativeValue);
    }
    if discount_type == DiscountType::Percentage && value > 100.0 {
        return fail(LineErrorKind::PercentageOutOfRange);
    }
    if discount_type == DiscountType::FixedAmount && value > FIXED_AMOUNT_CEILING {
        return fail(LineErrorKind::FixedAmountOutOfRange);
    }

    Ok(ValidatedEntry {
        line_number,
        sku: sku.clone(),
        value,
    })
}

/// Validates every parsed line. Either all lines pass and a batch is
/// returned, or the full ordered list of line errors is.
///
/// # Errors
///
/// - [`ReconcileError::Validation`] with every failing line, in input order.
/// - [`ReconcileError::EmptyBatch`] when there were no lines at all.
pub fn validate_batch(
    lines: &[ParsedLine],
    discount_type: DiscountType,
) -> Result<ImportBatch, ReconcileError> {
    let mut errors = Vec::new();
    let mut entries: Vec<ValidatedEntry> = Vec::new();

    for line in lines {
        match validate(line, discount_type) {
            Ok(entry) => {
                if let Some(existing) = entries
                    .iter_mut()
                    .find(|e| e.sku.eq_ignore_ascii_case(&entry.sku))
                {
                    existing.value = entry.value;
                    existing.line_number = entry.line_number;
                } else {
                    entries.push(entry);
                }
            }
            Err(err) => errors.push(err),
        }
    }

    if !errors.is_empty() {
        return Err(ReconcileError::Validation(errors));
    }
    if entries.is_empty() {
        return Err(ReconcileError::EmptyBatch);
    }

    Ok(ImportBatch {
        discount_type,
        entries,
    })
}

/// Parses and validates raw pasted text in one step.
///
/// # Errors
///
/// See [`validate_batch`].
pub fn parse_batch(raw: &str, discount_type: DiscountType) -> Result<ImportBatch, ReconcileError> {
    validate_batch(&parse(raw), discount_type)
}
