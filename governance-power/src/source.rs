use crate::error::FetchError;
use anchor_lang::prelude::Pubkey;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::BufRead;
use std::str::FromStr;
use std::thread;
use std::time::Duration;

/// One account as returned by the chain data source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawAccount {
    pub address: Pubkey,
    pub data: Vec<u8>,
}

/// Where account records come from.
///
/// `size_filter`, when set, restricts the result to accounts of exactly that
/// many bytes.
pub trait AccountSource {
    fn fetch_program_accounts(
        &self,
        program_id: &Pubkey,
        size_filter: Option<u64>,
    ) -> Result<Vec<RawAccount>, FetchError>;
}

fn matches_size(account: &RawAccount, size_filter: Option<u64>) -> bool {
    size_filter.map_or(true, |size| account.data.len() as u64 == size)
}

/// Accounts held in memory, keyed by owning program.
#[derive(Clone, Debug, Default)]
pub struct MemoryAccountSource {
    accounts: HashMap<Pubkey, Vec<RawAccount>>,
}

impl MemoryAccountSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, program_id: Pubkey, account: RawAccount) {
        self.accounts.entry(program_id).or_default().push(account);
    }

    pub fn with_accounts(program_id: Pubkey, accounts: impl IntoIterator<Item = RawAccount>) -> Self {
        let mut source = Self::new();
        for account in accounts {
            source.insert(program_id, account);
        }
        source
    }
}

impl AccountSource for MemoryAccountSource {
    fn fetch_program_accounts(
        &self,
        program_id: &Pubkey,
        size_filter: Option<u64>,
    ) -> Result<Vec<RawAccount>, FetchError> {
        Ok(self
            .accounts
            .get(program_id)
            .map(|accounts| {
                accounts
                    .iter()
                    .filter(|a| matches_size(a, size_filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Accounts exported to a text file, one `<address> <base64 data>` per line.
///
/// The file holds the accounts of a single program, so the program id is
/// not checked.
#[derive(Clone, Debug)]
pub struct Base64FileSource {
    path: std::path::PathBuf,
}

impl Base64FileSource {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AccountSource for Base64FileSource {
    fn fetch_program_accounts(
        &self,
        _program_id: &Pubkey,
        size_filter: Option<u64>,
    ) -> Result<Vec<RawAccount>, FetchError> {
        let file = std::fs::File::open(&self.path).map_err(|e| {
            FetchError::Unavailable(format!("{}: {}", self.path.display(), e))
        })?;
        let accounts = parse_account_lines(std::io::BufReader::new(file))?;
        Ok(accounts
            .into_iter()
            .filter(|a| matches_size(a, size_filter))
            .collect())
    }
}

/// Reads `<address> <base64 data>` lines. Blank lines and `#` comments are
/// skipped.
pub fn parse_account_lines(reader: impl BufRead) -> Result<Vec<RawAccount>, FetchError> {
    let mut accounts = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| FetchError::Unavailable(e.to_string()))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let invalid = |what: &str| FetchError::InvalidData(format!("line {}: {}", index + 1, what));
        let mut fields = line.split_whitespace();
        let (address, data) = match (fields.next(), fields.next(), fields.next()) {
            (Some(address), Some(data), None) => (address, data),
            _ => return Err(invalid("expected `<address> <base64 data>`")),
        };
        let address = Pubkey::from_str(address).map_err(|_| invalid("bad address"))?;
        let data = base64::decode(data).map_err(|_| invalid("bad base64 data"))?;
        accounts.push(RawAccount { address, data });
    }
    Ok(accounts)
}

/// Retry schedule for fetching accounts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchPolicy {
    /// Attempts including the first one.
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Per-request timeout handed to network-backed sources.
    pub timeout_secs: u64,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff_ms: 500,
            max_backoff_ms: 8_000,
            timeout_secs: 60,
        }
    }
}

impl FetchPolicy {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Backoff before retry number `retry` (starting at 1), doubling from
    /// `initial_backoff_ms` up to `max_backoff_ms`.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u64.checked_shl(retry.saturating_sub(1)).unwrap_or(u64::MAX);
        Duration::from_millis(
            self.initial_backoff_ms
                .saturating_mul(factor)
                .min(self.max_backoff_ms),
        )
    }
}

/// Fetches program accounts, retrying retryable failures with exponential
/// backoff. Gives up with `FetchError::Exhausted` after `max_attempts`.
pub fn fetch_with_retry(
    source: &dyn AccountSource,
    program_id: &Pubkey,
    size_filter: Option<u64>,
    policy: &FetchPolicy,
) -> Result<Vec<RawAccount>, FetchError> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match source.fetch_program_accounts(program_id, size_filter) {
            Ok(accounts) => {
                info!(
                    "fetched {} accounts of {} (attempt {})",
                    accounts.len(),
                    program_id,
                    attempt
                );
                return Ok(accounts);
            }
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let backoff = policy.backoff(attempt);
                warn!(
                    "fetch attempt {}/{} failed: {}, retrying in {:?}",
                    attempt, max_attempts, e, backoff
                );
                thread::sleep(backoff);
                attempt += 1;
            }
            Err(e) if e.is_retryable() => {
                return Err(FetchError::Exhausted {
                    attempts: attempt,
                    last: Box::new(e),
                })
            }
            Err(e) => return Err(e),
        }
    }
}
