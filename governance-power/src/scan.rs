use crate::aggregate::{PowerAggregator, WalletPowerSummary};
use crate::config::ScanConfig;
use crate::decode::RecordDecoder;
use crate::error::{DecodeError, PowerError, ScanError};
use crate::source::{fetch_with_retry, AccountSource, RawAccount};
use crate::state::VoterRecord;
use anchor_lang::prelude::Pubkey;
use log::{info, warn};
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Progress of a scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Fetching,
    Decoding,
    Aggregating { wallets: usize },
    Done,
    Failed,
}

/// Cooperative cancellation, checked before each wallet is aggregated.
///
/// A cancel applies to the scan that is running or, if none is, to the next
/// one. The orchestrator clears the token when a scan ends.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// A wallet that did not get a summary.
#[derive(Clone, Debug, PartialEq)]
pub struct WalletFailure {
    pub wallet: Pubkey,
    pub error: PowerError,
}

/// Result of one full pass.
#[derive(Clone, Debug)]
pub struct ScanOutcome {
    pub program_id: Pubkey,
    /// Unix timestamp lockups were evaluated at.
    pub as_of: i64,
    pub accounts_fetched: usize,
    pub accounts_decoded: usize,
    /// Accounts skipped because they could not be decoded.
    pub decode_failures: Vec<(Pubkey, DecodeError)>,
    /// Summaries in the order the wallets were requested.
    pub summaries: Vec<WalletPowerSummary>,
    pub failures: Vec<WalletFailure>,
}

/// Decoded accounts of one scan, indexed by the wallets they name.
///
/// Lives exactly as long as one scan pass.
struct AccountSnapshot {
    records: Vec<VoterRecord>,
    by_wallet: HashMap<Pubkey, Vec<usize>>,
}

impl AccountSnapshot {
    fn new(records: Vec<VoterRecord>) -> Self {
        let mut by_wallet: HashMap<Pubkey, Vec<usize>> = HashMap::new();
        for (index, record) in records.iter().enumerate() {
            by_wallet.entry(record.voter_authority).or_default().push(index);
            if record.voting_proxy != record.voter_authority {
                by_wallet.entry(record.voting_proxy).or_default().push(index);
            }
        }
        Self { records, by_wallet }
    }

    /// Records naming `wallet` as authority or proxy, in snapshot order.
    fn records_for<'a>(&'a self, wallet: &Pubkey) -> impl Iterator<Item = &'a VoterRecord> + 'a {
        self.by_wallet
            .get(wallet)
            .into_iter()
            .flatten()
            .map(move |index| &self.records[*index])
    }
}

/// Drives one scan: fetch once, decode, aggregate per wallet.
pub struct ScanOrchestrator<S> {
    source: S,
    config: ScanConfig,
    decoder: RecordDecoder,
    aggregator: PowerAggregator,
    cancel: CancelToken,
    state: ScanState,
}

impl<S: AccountSource> ScanOrchestrator<S> {
    pub fn new(source: S, config: ScanConfig) -> Result<Self, ScanError> {
        config.validate()?;
        Ok(Self {
            decoder: config.decoder()?,
            aggregator: config.aggregator()?,
            source,
            config,
            cancel: CancelToken::new(),
            state: ScanState::Idle,
        })
    }

    /// Token that aborts the current scan between wallets.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    fn transition(&mut self, state: ScanState) {
        info!("scan state {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    pub fn scan(&mut self, program_id: &Pubkey, wallets: &[Pubkey]) -> Result<ScanOutcome, ScanError> {
        let as_of = self.config.as_of.unwrap_or_else(unix_now);

        self.transition(ScanState::Fetching);
        let accounts = match fetch_with_retry(
            &self.source,
            program_id,
            self.config.size_filter(),
            &self.config.fetch,
        ) {
            Ok(accounts) => accounts,
            Err(e) => {
                warn!("scan of {} failed: {}", program_id, e);
                self.transition(ScanState::Failed);
                self.cancel.reset();
                return Err(e.into());
            }
        };
        let accounts_fetched = accounts.len();

        self.transition(ScanState::Decoding);
        let (snapshot, decode_failures) = self.decode_all(accounts);
        let accounts_decoded = snapshot.records.len();

        self.transition(ScanState::Aggregating {
            wallets: wallets.len(),
        });
        let aggregator = &self.aggregator;
        let cancel = &self.cancel;
        let snapshot = &snapshot;
        let results: Vec<Result<WalletPowerSummary, PowerError>> = wallets
            .par_iter()
            .map(|wallet| {
                if cancel.is_cancelled() {
                    return Err(PowerError::Cancelled { wallet: *wallet });
                }
                aggregator.aggregate(snapshot.records_for(wallet), wallet, as_of)
            })
            .collect();

        let mut summaries = Vec::new();
        let mut failures = Vec::new();
        for (wallet, result) in wallets.iter().zip(results) {
            match result {
                Ok(summary) => summaries.push(summary),
                Err(error) => {
                    warn!("no summary for {}: {}", wallet, error);
                    failures.push(WalletFailure {
                        wallet: *wallet,
                        error,
                    });
                }
            }
        }

        self.transition(ScanState::Done);
        self.cancel.reset();
        info!(
            "scanned {} accounts ({} decoded) for {} wallets, {} failed",
            accounts_fetched,
            accounts_decoded,
            wallets.len(),
            failures.len()
        );
        Ok(ScanOutcome {
            program_id: *program_id,
            as_of,
            accounts_fetched,
            accounts_decoded,
            decode_failures,
            summaries,
            failures,
        })
    }

    /// Decodes accounts in parallel. Order is preserved, and an account that
    /// fails to decode is reported and skipped.
    fn decode_all(&self, accounts: Vec<RawAccount>) -> (AccountSnapshot, Vec<(Pubkey, DecodeError)>) {
        let decoder = &self.decoder;
        let decoded: Vec<Result<VoterRecord, (Pubkey, DecodeError)>> = accounts
            .par_iter()
            .map(|account| {
                decoder
                    .decode(account.address, &account.data)
                    .map_err(|e| (account.address, e))
            })
            .collect();

        let mut records = Vec::with_capacity(decoded.len());
        let mut failures = Vec::new();
        for result in decoded {
            match result {
                Ok(record) => records.push(record),
                Err((address, e)) => {
                    warn!("skipping account {}: {}", address, e);
                    failures.push((address, e));
                }
            }
        }
        (AccountSnapshot::new(records), failures)
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
