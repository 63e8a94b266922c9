//! Crate-wide error taxonomy.
//!
//! Every fallible operation in the engine returns one of these kinds so that
//! the propagation policy of the spec (attenuate in scan/fetch, log-and-hold
//! in per-pair management, disable-and-reraise at the cycle top level) can be
//! implemented by matching on the variant rather than on ad-hoc strings.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Network/transient exchange error. Retried locally for cancels, not for placements.
    #[error("transient exchange I/O error: {0}")]
    TransientIo(String),

    /// Exchange rejected the request for lack of (or expired) credentials.
    #[error("exchange authentication required for {asset}: {reason}")]
    AuthRequired { asset: String, reason: String },

    /// A row with this identity already exists; callers should treat this as success.
    #[error("duplicate {kind} id: {id}")]
    Duplicate { kind: &'static str, id: String },

    /// The ledger or in-memory state violated an invariant that should be impossible.
    #[error("broken invariant: {0}")]
    BrokenInvariant(String),

    /// Unrecoverable: ledger unavailable, configuration malformed. Engine exits.
    #[error("fatal error: {0}")]
    Fatal(String),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("database connection error: {0}")]
    Connection(#[from] diesel::r2d2::Error),

    #[error("database pool error: {0}")]
    Pool(String),

    #[error("migration error: {0}")]
    Migration(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("signing error: {0}")]
    Signing(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadFile(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True if this error represents a duplicate-insert that callers should
    /// silently treat as success (§7 `DUPLICATE`).
    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }
}
