//! # Introduction
//!
//! Voter-stake-registry keeps every participant's deposits in a `Voter`
//! account. Each deposit may be locked up, and locked deposits vote with a
//! boosted weight that decays as the lockup runs out. This crate reads those
//! accounts off-chain and turns them into a per-wallet governance power.
//!
//! The pipeline for one scan is:
//!
//! - Fetch every voter account of the program once ([`source`]).
//! - Decode each account into its authority, voting proxy and deposit
//!   candidates ([`decode`]). Deposit slots are read in their fixed stride and
//!   a few extra offsets are read opportunistically.
//! - Collapse duplicate and phantom candidates into a canonical deposit set
//!   ([`dedupe`]).
//! - Score every deposit with its lockup multiplier ([`multiplier`]).
//! - Sum deposits into native and delegated power per wallet ([`aggregate`]).
//!
//! [`scan::ScanOrchestrator`] drives the whole pass and [`report`] turns the
//! outcome into the JSON export.
//!
//! # Delegation
//!
//! A voter account names both the authority that owns the deposits and a
//! voting proxy that may vote them. Power counts as native for the authority
//! and as delegated for a proxy that differs from the authority. An account
//! never counts twice for the same wallet.

use anchor_lang::prelude::*;

pub mod aggregate;
pub mod config;
pub mod decode;
pub mod dedupe;
pub mod error;
pub mod layout;
pub mod multiplier;
pub mod report;
pub mod scan;
pub mod sink;
pub mod source;
pub mod state;

pub use aggregate::{classify, Classification, PowerAggregator, WalletPowerSummary};
pub use config::{DepositConfig, ScanConfig, VotingMintFactors};
pub use decode::{AmountRange, RecordDecoder};
pub use dedupe::{DepositDeduplicator, ResolvedDeposits};
pub use error::*;
pub use layout::VoterLayout;
pub use multiplier::LockupMultiplier;
pub use report::ScanReport;
pub use scan::{CancelToken, ScanOrchestrator, ScanOutcome, ScanState, WalletFailure};
pub use sink::{publish, JsonLinesSink, MemorySink, PowerSink, WalletPowerRecord};
pub use source::{AccountSource, Base64FileSource, FetchPolicy, MemoryAccountSource, RawAccount};

// The deployed voter-stake-registry program address.
declare_id!("vsr2nfGVNHmSY8uxoBGqq8AQbwz3JwaEaHqGbsTPXqQ");
