use crate::aggregate::WalletPowerSummary;
use crate::error::SinkError;
use crate::scan::ScanOutcome;
use anchor_lang::prelude::Pubkey;
use log::{debug, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;

/// The tuple handed to persistence for one wallet.
#[derive(Clone, Debug, PartialEq)]
pub struct WalletPowerRecord {
    pub wallet: Pubkey,
    pub native_power: f64,
    pub delegated_power: f64,
    pub total_power: f64,
    /// Unix timestamp the power was evaluated at.
    pub as_of: i64,
}

impl WalletPowerRecord {
    pub fn from_summary(summary: &WalletPowerSummary, as_of: i64) -> Self {
        Self {
            wallet: summary.wallet,
            native_power: summary.native_power,
            delegated_power: summary.delegated_power,
            total_power: summary.total_power,
            as_of,
        }
    }

    /// Refuses records no consumer should store.
    pub fn check(&self) -> Result<(), SinkError> {
        let powers = [self.native_power, self.delegated_power, self.total_power];
        if powers.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(SinkError::Rejected(format!(
                "{} has invalid power {:?}",
                self.wallet, powers
            )));
        }
        Ok(())
    }
}

/// Persistence for computed power. Upserting the same values again must be
/// a no-op from the consumer's point of view.
pub trait PowerSink {
    fn upsert_wallet_power(&mut self, record: &WalletPowerRecord) -> Result<(), SinkError>;
}

/// Keeps the latest record per wallet.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    records: BTreeMap<Pubkey, WalletPowerRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, wallet: &Pubkey) -> Option<&WalletPowerRecord> {
        self.records.get(wallet)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl PowerSink for MemorySink {
    fn upsert_wallet_power(&mut self, record: &WalletPowerRecord) -> Result<(), SinkError> {
        record.check()?;
        self.records.insert(record.wallet, record.clone());
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpsertLine {
    wallet: String,
    native_power: f64,
    delegated_power: f64,
    total_power: f64,
    as_of: i64,
}

/// Appends every upsert as one JSON line. Consumers replay the log keeping
/// the last line per wallet.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> PowerSink for JsonLinesSink<W> {
    fn upsert_wallet_power(&mut self, record: &WalletPowerRecord) -> Result<(), SinkError> {
        record.check()?;
        let line = UpsertLine {
            wallet: record.wallet.to_string(),
            native_power: record.native_power,
            delegated_power: record.delegated_power,
            total_power: record.total_power,
            as_of: record.as_of,
        };
        serde_json::to_writer(&mut self.writer, &line)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Pushes every summary of a scan into `sink`. A failed upsert does not
/// stop the others; the failures are returned.
pub fn publish(outcome: &ScanOutcome, sink: &mut dyn PowerSink) -> Vec<(Pubkey, SinkError)> {
    let mut failures = Vec::new();
    for summary in &outcome.summaries {
        let record = WalletPowerRecord::from_summary(summary, outcome.as_of);
        match sink.upsert_wallet_power(&record) {
            Ok(()) => debug!("upserted {} = {}", record.wallet, record.total_power),
            Err(e) => {
                warn!("upsert of {} failed: {}", record.wallet, e);
                failures.push((record.wallet, e));
            }
        }
    }
    failures
}
