use crate::state::lockup::{Lockup, LockupKind};
use serde::Serialize;

/// Which decoding strategy produced a deposit candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CandidateSource {
    /// Read from a fixed-stride deposit slot.
    Structured,
    /// Read as a bare amount from one of the extra known offsets.
    Opportunistic,
}

/// Bookkeeping for a single deposit as read from a voter account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DepositEntry {
    /// Amount deposited, in native units (6 decimals for the usual mints).
    pub amount_native: u64,

    /// Amount locked when the lockup began. Equal to `amount_native` for
    /// deposits read without a slot.
    pub amount_initially_locked_native: u64,

    pub lockup: Lockup,

    /// Byte offset inside the account the amount was read from.
    pub source_offset: usize,
}

impl DepositEntry {
    /// An unlocked deposit of `amount_native`.
    pub fn unlocked(amount_native: u64, source_offset: usize) -> Self {
        Self {
            amount_native,
            amount_initially_locked_native: amount_native,
            lockup: Lockup::default(),
            source_offset,
        }
    }

    /// Amount converted to whole tokens.
    pub fn ui_amount(&self, decimals: u8) -> f64 {
        self.amount_native as f64 / 10f64.powi(i32::from(decimals))
    }

    /// Returns the amount of unlocked tokens for this deposit, in native
    /// units of the original locked amount.
    pub fn vested(&self, curr_ts: i64) -> u64 {
        let lockup = &self.lockup;
        if lockup.kind == LockupKind::None || curr_ts >= lockup.end_ts {
            return self.amount_initially_locked_native;
        }
        if curr_ts < lockup.start_ts {
            return 0;
        }
        if lockup.kind.is_vesting() {
            self.vested_linearly(curr_ts)
        } else {
            0
        }
    }

    fn vested_linearly(&self, curr_ts: i64) -> u64 {
        let period_current = self.lockup.period_current(curr_ts);
        let periods_total = self.lockup.periods_total();
        if periods_total == 0 || period_current >= periods_total {
            return self.amount_initially_locked_native;
        }
        let vested = (self.amount_initially_locked_native as u128) * (period_current as u128)
            / (periods_total as u128);
        u64::try_from(vested).unwrap_or(self.amount_initially_locked_native)
    }

    /// Returns native tokens still locked.
    pub fn amount_locked(&self, curr_ts: i64) -> u64 {
        self.amount_initially_locked_native
            .saturating_sub(self.vested(curr_ts))
            .min(self.amount_native)
    }

    /// Returns native tokens that could be withdrawn now.
    pub fn amount_unlocked(&self, curr_ts: i64) -> u64 {
        self.amount_native
            .saturating_sub(self.amount_locked(curr_ts))
    }
}

/// A deposit as produced by one of the decoding strategies, before the
/// deduplicator decided whether it is real.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DepositCandidate {
    pub entry: DepositEntry,
    pub source: CandidateSource,
    /// The slot's `is_used` flag. Always false for opportunistic reads.
    pub is_used: bool,
}

impl DepositCandidate {
    pub fn structured(entry: DepositEntry) -> Self {
        Self {
            entry,
            source: CandidateSource::Structured,
            is_used: true,
        }
    }

    pub fn opportunistic(amount_native: u64, offset: usize) -> Self {
        Self {
            entry: DepositEntry::unlocked(amount_native, offset),
            source: CandidateSource::Opportunistic,
            is_used: false,
        }
    }
}

/// A deposit together with the multiplier and power it was scored with.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoredDeposit {
    pub entry: DepositEntry,
    pub multiplier: f64,
    /// `ui_amount * multiplier`.
    pub power: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::lockup::SECS_PER_DAY;

    const START: i64 = 1634929833;

    fn deposit(kind: LockupKind, days: i64, amount: u64) -> DepositEntry {
        DepositEntry {
            amount_native: amount,
            amount_initially_locked_native: amount,
            lockup: Lockup::new(kind, START, START + days * SECS_PER_DAY),
            source_offset: 104,
        }
    }

    #[test]
    fn cliff_stays_locked_until_end() {
        let d = deposit(LockupKind::Cliff, 10, 10_000_000);
        assert_eq!(d.amount_locked(START - 1), 10_000_000);
        assert_eq!(d.amount_locked(START + 9 * SECS_PER_DAY), 10_000_000);
        assert_eq!(d.amount_locked(START + 10 * SECS_PER_DAY), 0);
        assert_eq!(d.amount_unlocked(START + 10 * SECS_PER_DAY), 10_000_000);
    }

    #[test]
    fn daily_vests_per_period() {
        let d = deposit(LockupKind::Daily, 10, 10_000_000);
        assert_eq!(d.vested(START), 0);
        assert_eq!(d.vested(START + SECS_PER_DAY / 2), 0);
        assert_eq!(d.vested(START + SECS_PER_DAY), 1_000_000);
        assert_eq!(d.vested(START + 3 * SECS_PER_DAY + 10), 3_000_000);
        assert_eq!(d.amount_locked(START + 3 * SECS_PER_DAY), 7_000_000);
        assert_eq!(d.vested(START + 11 * SECS_PER_DAY), 10_000_000);
    }

    #[test]
    fn withdrawn_vesting_deposit_caps_locked_amount() {
        let mut d = deposit(LockupKind::Daily, 10, 10_000_000);
        // half vested and all of that withdrawn
        d.amount_native = 5_000_000;
        assert_eq!(d.amount_locked(START + 5 * SECS_PER_DAY), 5_000_000);
        assert_eq!(d.amount_unlocked(START + 5 * SECS_PER_DAY), 0);
    }

    #[test]
    fn unlocked_deposit_is_fully_available() {
        let d = DepositEntry::unlocked(42_000_000, 2672);
        assert_eq!(d.amount_locked(0), 0);
        assert_eq!(d.amount_unlocked(0), 42_000_000);
        assert_eq!(d.ui_amount(6), 42.0);
    }
}
