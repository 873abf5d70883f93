use crate::error::ConfigError;
use crate::state::*;
use serde::{Deserialize, Serialize};

/// Registrar voting mint configs express factors in 1/SCALED_FACTOR_BASE units.
pub const SCALED_FACTOR_BASE: u64 = 1_000_000_000;

/// Number of seconds in a year, as used for lockup saturation.
pub const SECS_PER_YEAR: u64 = 365 * 24 * 60 * 60;

/// # Lockup Multiplier
///
/// Maps a deposit's lockup to the scalar its amount is multiplied with:
///
/// ```text
///    multiplier = baseline_factor + bonus_factor * min(1, max(0, locked_secs / saturation_secs))
/// ```
///
/// Unlocked and expired deposits always get exactly 1.0.
///
/// ## Cliff Lockup
///
/// `locked_secs` is the time left until the cliff. The bonus decays linearly
/// as the cliff comes closer.
///
/// ## Vesting and Constant Lockups
///
/// Tokens unlock continuously, so `locked_secs` is the still-locked fraction
/// of the lockup applied to its total duration:
///
/// ```text
///    locked_secs = (1 - elapsed / duration) * duration
/// ```
///
/// with `elapsed` clamped to `[0, duration]`, so a lockup that has not
/// started yet counts with its full duration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockupMultiplier {
    /// Factor every locked deposit gets, at least 1.0.
    pub baseline_factor: f64,
    /// Extra factor reached by a lockup of `saturation_secs` or more.
    pub bonus_factor: f64,
    /// Lockup time needed to reach the full bonus. Zero means any active
    /// lockup is fully saturated.
    pub saturation_secs: u64,
}

impl Default for LockupMultiplier {
    fn default() -> Self {
        Self {
            baseline_factor: 1.0,
            bonus_factor: 3.0,
            saturation_secs: 5 * SECS_PER_YEAR,
        }
    }
}

impl LockupMultiplier {
    /// Builds the multiplier from a registrar voting mint config's scaled
    /// factors.
    pub fn from_scaled_factors(
        baseline_vote_weight_scaled_factor: u64,
        max_extra_lockup_vote_weight_scaled_factor: u64,
        lockup_saturation_secs: u64,
    ) -> Self {
        let base = SCALED_FACTOR_BASE as f64;
        Self {
            baseline_factor: baseline_vote_weight_scaled_factor as f64 / base,
            bonus_factor: max_extra_lockup_vote_weight_scaled_factor as f64 / base,
            saturation_secs: lockup_saturation_secs,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.baseline_factor.is_finite() || self.baseline_factor < 1.0 {
            return Err(ConfigError::Invalid(format!(
                "baseline factor {} must be a finite value of at least 1.0",
                self.baseline_factor
            )));
        }
        if !self.bonus_factor.is_finite() || self.bonus_factor < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "bonus factor {} must be finite and non-negative",
                self.bonus_factor
            )));
        }
        Ok(())
    }

    pub fn multiplier(&self, lockup: &Lockup, curr_ts: i64) -> f64 {
        if lockup.is_expired(curr_ts) {
            return 1.0;
        }
        let locked_secs = match lockup.kind {
            LockupKind::None => return 1.0,
            LockupKind::Cliff => lockup.seconds_left(curr_ts) as f64,
            LockupKind::Daily | LockupKind::Monthly | LockupKind::Constant => {
                let duration = lockup.duration_secs();
                if duration == 0 {
                    0.0
                } else {
                    let duration = duration as f64;
                    let elapsed = (curr_ts.saturating_sub(lockup.start_ts) as f64).clamp(0.0, duration);
                    (1.0 - elapsed / duration) * duration
                }
            }
        };
        self.baseline_factor + self.bonus_factor * self.saturation_ratio(locked_secs)
    }

    fn saturation_ratio(&self, locked_secs: f64) -> f64 {
        if self.saturation_secs == 0 {
            return 1.0;
        }
        (locked_secs / self.saturation_secs as f64).clamp(0.0, 1.0)
    }

    /// Scores a deposit at `curr_ts`.
    pub fn score(&self, entry: &DepositEntry, curr_ts: i64, decimals: u8) -> ScoredDeposit {
        let multiplier = self.multiplier(&entry.lockup, curr_ts);
        ScoredDeposit {
            entry: *entry,
            multiplier,
            power: entry.ui_amount(decimals) * multiplier,
        }
    }
}
