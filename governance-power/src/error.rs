use anchor_lang::prelude::Pubkey;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Failure to obtain account records from the chain data source.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("account source unavailable: {0}")]
    Unavailable(String),
    #[error("account source is rate limiting requests")]
    RateLimited,
    #[error("account fetch timed out after {0:?}")]
    Timeout(Duration),
    #[error("account source returned unusable data: {0}")]
    InvalidData(String),
    #[error("account fetch failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: Box<FetchError> },
}

impl FetchError {
    /// Unavailability, rate limits and timeouts may go away on their own.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::Unavailable(_) | FetchError::RateLimited | FetchError::Timeout(_)
        )
    }
}

/// A single account record that cannot be trusted. The record is skipped,
/// the scan continues.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("malformed record: {len} bytes is shorter than the {min} byte header")]
    TooShort { len: usize, min: usize },
    #[error("malformed record: discriminator {found:?} is not a voter account")]
    DiscriminatorMismatch { found: [u8; 8] },
}

/// Non-fatal findings attached to a record and to the summaries it
/// contributes to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DecodeWarning {
    /// The opportunistic scan found an amount the authoritative slot scan
    /// does not account for. Not counted, kept for review.
    DecodeAmbiguity {
        account: Pubkey,
        offset: usize,
        amount_native: u64,
    },
    UnknownLockupKind {
        account: Pubkey,
        offset: usize,
        raw: u8,
    },
    InvertedLockup {
        account: Pubkey,
        offset: usize,
        start_ts: i64,
        end_ts: i64,
    },
    EmptyUsedSlot {
        account: Pubkey,
        offset: usize,
    },
}

impl fmt::Display for DecodeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeWarning::DecodeAmbiguity {
                account,
                offset,
                amount_native,
            } => write!(
                f,
                "{}: amount {} at offset {} is not backed by a deposit slot",
                account, amount_native, offset
            ),
            DecodeWarning::UnknownLockupKind {
                account,
                offset,
                raw,
            } => write!(
                f,
                "{}: slot at offset {} has unknown lockup kind {}",
                account, offset, raw
            ),
            DecodeWarning::InvertedLockup {
                account,
                offset,
                start_ts,
                end_ts,
            } => write!(
                f,
                "{}: slot at offset {} ends ({}) before it starts ({})",
                account, offset, end_ts, start_ts
            ),
            DecodeWarning::EmptyUsedSlot { account, offset } => write!(
                f,
                "{}: slot at offset {} is marked used but holds nothing",
                account, offset
            ),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PowerError {
    /// Logic fault: the wallet's summary is withheld rather than reported
    /// with numbers that do not add up.
    #[error("aggregation invariant violated for {wallet}: {detail}")]
    AggregationInvariantViolation { wallet: Pubkey, detail: String },
    #[error("scan was cancelled before {wallet} was aggregated")]
    Cancelled { wallet: Pubkey },
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink write failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("sink could not encode record: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("sink rejected record: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors that abort a whole scan.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
