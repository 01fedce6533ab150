use thiserror::Error;

/// Boxed error from an external collaborator (catalog resolver, metafield store).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Why a single bulk-import line was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LineErrorKind {
    #[error("Invalid format. Expected: SKU, Discount")]
    InvalidFormat,
    #[error("Missing SKU")]
    MissingSku,
    #[error("Invalid discount value")]
    InvalidValue,
    #[error("Discount value cannot be negative")]
    NegativeValue,
    #[error("Percentage discount must be between 0-100%")]
    PercentageOutOfRange,
    #[error("Fixed amount discount cannot exceed 1000000")]
    FixedAmountOutOfRange,
}

/// A rejected bulk-import line, numbered from 1 against the raw input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Line {line_number}: {kind}")]
pub struct LineError {
    pub line_number: usize,
    pub kind: LineErrorKind,
}

impl LineError {
    #[must_use]
    pub fn new(line_number: usize, kind: LineErrorKind) -> Self {
        Self { line_number, kind }
    }
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// One or more lines failed parsing or validation; nothing was applied.
    #[error("bulk import rejected: {}", format_line_errors(.0))]
    Validation(Vec<LineError>),

    #[error("No valid SKU-value pairs found")]
    EmptyBatch,

    #[error("catalog lookup failed: {source}")]
    CatalogLookupFailed {
        #[source]
        source: BoxError,
    },

    /// The store could not be read. Nothing is known about what it holds,
    /// so no session is built.
    #[error("could not read saved configuration: {source}")]
    LoadFailed {
        #[source]
        source: BoxError,
    },

    #[error("could not load saved configuration: {reason}")]
    MalformedConfiguration { reason: String },

    #[error("failed to save configuration: {source}")]
    PersistFailed {
        #[source]
        source: BoxError,
    },

    #[error("a save is already in progress")]
    SaveInProgress,

    #[error("no record with identifier '{0}'")]
    UnknownRecord(String),
}

fn format_line_errors(errors: &[LineError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
