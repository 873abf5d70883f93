use serde::Serialize;

/// Seconds in one day.
pub const SECS_PER_DAY: i64 = 86_400;

/// Seconds in one month.
pub const SECS_PER_MONTH: i64 = 365 * SECS_PER_DAY / 12;

/// Lockup state of a single deposit, as stored in its deposit slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Lockup {
    pub kind: LockupKind,
    // Start of the lockup.
    pub start_ts: i64,
    // End of the lockup.
    pub end_ts: i64,
}

impl Default for Lockup {
    fn default() -> Self {
        Self {
            kind: LockupKind::None,
            start_ts: 0,
            end_ts: 0,
        }
    }
}

impl Lockup {
    pub fn new(kind: LockupKind, start_ts: i64, end_ts: i64) -> Self {
        Self {
            kind,
            start_ts,
            end_ts,
        }
    }

    /// A lockup that is over (or never existed) no longer boosts anything.
    pub fn is_expired(&self, curr_ts: i64) -> bool {
        self.kind == LockupKind::None || self.end_ts <= curr_ts
    }

    /// Number of seconds left on the lockup, zero once it ended.
    pub fn seconds_left(&self, curr_ts: i64) -> u64 {
        if self.kind == LockupKind::None {
            return 0;
        }
        u64::try_from(self.end_ts.saturating_sub(curr_ts)).unwrap_or(0)
    }

    /// Total length of the lockup in seconds.
    pub fn duration_secs(&self) -> u64 {
        u64::try_from(self.end_ts.saturating_sub(self.start_ts)).unwrap_or(0)
    }

    /// Returns the number of periods left on the lockup.
    pub fn periods_left(&self, curr_ts: i64) -> u64 {
        self.periods_total()
            .saturating_sub(self.period_current(curr_ts))
    }

    /// Returns the current period in the vesting schedule.
    pub fn period_current(&self, curr_ts: i64) -> u64 {
        let period_secs = self.kind.period_secs();
        if period_secs == 0 {
            return 0;
        }
        let secs_elapsed = curr_ts.saturating_sub(self.start_ts);
        u64::try_from(secs_elapsed / period_secs).unwrap_or(0)
    }

    /// Returns the total amount of periods in the lockup period.
    ///
    /// Decoded lockups are not guaranteed to span a whole number of periods,
    /// a trailing partial period counts as a full one.
    pub fn periods_total(&self) -> u64 {
        let period_secs = self.kind.period_secs() as u64;
        if period_secs == 0 {
            return 0;
        }
        let lockup_secs = self.duration_secs();
        lockup_secs / period_secs + u64::from(lockup_secs % period_secs != 0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LockupKind {
    None,
    Daily,
    Monthly,
    Cliff,
    Constant,
}

impl LockupKind {
    /// Maps the on-chain `u8` tag to a lockup kind.
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(LockupKind::None),
            1 => Some(LockupKind::Daily),
            2 => Some(LockupKind::Monthly),
            3 => Some(LockupKind::Cliff),
            4 => Some(LockupKind::Constant),
            _ => None,
        }
    }

    pub fn period_secs(&self) -> i64 {
        match self {
            LockupKind::None => 0,
            LockupKind::Daily => SECS_PER_DAY,
            LockupKind::Monthly => SECS_PER_MONTH,
            LockupKind::Cliff => SECS_PER_DAY, // arbitrary choice
            LockupKind::Constant => SECS_PER_DAY, // arbitrary choice
        }
    }

    /// Daily and monthly lockups unlock continuously over their duration.
    pub fn is_vesting(&self) -> bool {
        matches!(self, LockupKind::Daily | LockupKind::Monthly)
    }
}
