use crate::error::DecodeWarning;
use crate::state::*;
use log::debug;
use std::collections::BTreeSet;

/// Turns the raw candidates of one account into its canonical deposits.
#[derive(Clone, Debug)]
pub struct DepositDeduplicator {
    /// Unlocked amounts that are sentinel markers rather than deposits.
    phantom_amounts_native: BTreeSet<u64>,
    /// Candidates without the used flag must be at least this large.
    min_amount_native: u64,
    /// Opportunistic amounts within this many seconds of the evaluation time
    /// are read as timestamps. Zero disables the window.
    timestamp_window_secs: u64,
}

/// The deposits of one account that count, plus what was left out for review.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResolvedDeposits {
    pub deposits: Vec<DepositEntry>,
    pub warnings: Vec<DecodeWarning>,
}

impl DepositDeduplicator {
    pub fn new(phantom_amounts_native: impl IntoIterator<Item = u64>, min_amount_native: u64) -> Self {
        Self {
            phantom_amounts_native: phantom_amounts_native.into_iter().collect(),
            min_amount_native,
            timestamp_window_secs: 0,
        }
    }

    pub fn with_timestamp_window(mut self, secs: u64) -> Self {
        self.timestamp_window_secs = secs;
        self
    }

    fn is_phantom(&self, candidate: &DepositCandidate) -> bool {
        candidate.entry.lockup.kind == LockupKind::None
            && self
                .phantom_amounts_native
                .contains(&candidate.entry.amount_native)
    }

    fn is_noise(&self, candidate: &DepositCandidate) -> bool {
        !candidate.is_used && candidate.entry.amount_native < self.min_amount_native
    }

    /// An opportunistic word that is really a unix timestamp: one of the
    /// account's own lockup bounds, or a value close to `curr_ts`.
    fn is_timestamp(&self, candidate: &DepositCandidate, slot_times: &BTreeSet<u64>, curr_ts: i64) -> bool {
        if candidate.source != CandidateSource::Opportunistic {
            return false;
        }
        let value = candidate.entry.amount_native;
        if slot_times.contains(&value) {
            return true;
        }
        self.timestamp_window_secs > 0
            && (i128::from(value) - i128::from(curr_ts)).unsigned_abs()
                <= u128::from(self.timestamp_window_secs)
    }

    /// Removes phantoms, noise and timestamp-valued words, then drops
    /// opportunistic candidates whose native amount is already accounted for.
    ///
    /// Slot candidates are never merged with each other: two used slots with
    /// equal amounts are two deposits. An opportunistic candidate survives
    /// only if no slot and no lower-offset opportunistic candidate has the
    /// same amount. The result is ordered by offset, and running it again on
    /// its own output with the same `curr_ts` changes nothing.
    pub fn dedupe(&self, candidates: &[DepositCandidate], curr_ts: i64) -> Vec<DepositCandidate> {
        let slot_times: BTreeSet<u64> = candidates
            .iter()
            .filter(|c| c.source == CandidateSource::Structured && c.entry.lockup.kind != LockupKind::None)
            .flat_map(|c| [c.entry.lockup.start_ts, c.entry.lockup.end_ts])
            .filter_map(|ts| u64::try_from(ts).ok())
            .collect();

        let mut ranked: Vec<&DepositCandidate> = candidates
            .iter()
            .filter(|c| {
                !self.is_phantom(c) && !self.is_noise(c) && !self.is_timestamp(c, &slot_times, curr_ts)
            })
            .collect();
        ranked.sort_by_key(|c| (c.source, c.entry.source_offset));

        let mut seen = BTreeSet::new();
        let mut kept: Vec<DepositCandidate> = ranked
            .into_iter()
            .filter(|c| {
                let fresh = seen.insert(c.entry.amount_native);
                fresh || c.source == CandidateSource::Structured
            })
            .copied()
            .collect();
        kept.sort_by_key(|c| (c.entry.source_offset, c.source));
        kept
    }

    /// Decides which deposits of a record count at `curr_ts`.
    ///
    /// Slot deposits are authoritative whenever there are any. Opportunistic
    /// amounts they do not explain are reported as ambiguities instead of
    /// being counted. Without slot deposits the opportunistic amounts are the
    /// only evidence and count as unlocked deposits.
    pub fn resolve(&self, record: &VoterRecord, curr_ts: i64) -> ResolvedDeposits {
        let kept = self.dedupe(&record.candidates, curr_ts);
        let (structured, opportunistic): (Vec<_>, Vec<_>) = kept
            .into_iter()
            .partition(|c| c.source == CandidateSource::Structured);

        let mut warnings = record.warnings.clone();
        let deposits = if structured.is_empty() {
            opportunistic.iter().map(|c| c.entry).collect()
        } else {
            for c in &opportunistic {
                debug!(
                    "{}: ignoring unexplained amount {} at offset {}",
                    record.address, c.entry.amount_native, c.entry.source_offset
                );
                warnings.push(DecodeWarning::DecodeAmbiguity {
                    account: record.address,
                    offset: c.entry.source_offset,
                    amount_native: c.entry.amount_native,
                });
            }
            structured.iter().map(|c| c.entry).collect()
        };
        ResolvedDeposits { deposits, warnings }
    }
}
