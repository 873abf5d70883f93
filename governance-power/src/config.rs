use crate::aggregate::PowerAggregator;
use crate::decode::{AmountRange, RecordDecoder};
use crate::dedupe::DepositDeduplicator;
use crate::error::ConfigError;
use crate::layout::VoterLayout;
use crate::multiplier::{LockupMultiplier, SECS_PER_YEAR};
use crate::source::FetchPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How deposit amounts are interpreted and filtered. Amounts here are in
/// whole tokens.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepositConfig {
    /// Decimals of the governing token mint.
    pub decimals: u8,
    /// Unlocked amounts that are sentinel markers, not deposits.
    pub phantom_amounts: Vec<u64>,
    /// Smallest amount an unflagged candidate may have.
    pub min_amount: u64,
    /// Largest amount the opportunistic scan accepts.
    pub max_amount: u64,
    /// Opportunistic words this close to the evaluation time are read as
    /// timestamps and dropped. Zero disables the window.
    pub timestamp_window_secs: u64,
}

impl Default for DepositConfig {
    fn default() -> Self {
        Self {
            decimals: 6,
            phantom_amounts: vec![1_000, 11_000],
            min_amount: 1,
            max_amount: 50_000_000,
            timestamp_window_secs: 5 * SECS_PER_YEAR,
        }
    }
}

impl DepositConfig {
    /// Converts whole tokens to native units.
    pub fn to_native(&self, whole: u64) -> Result<u64, ConfigError> {
        10u64
            .checked_pow(u32::from(self.decimals))
            .and_then(|unit| whole.checked_mul(unit))
            .ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "{} tokens with {} decimals overflow u64",
                    whole, self.decimals
                ))
            })
    }
}

/// Multiplier factors as stored in a registrar's voting mint config.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingMintFactors {
    pub baseline_vote_weight_scaled_factor: u64,
    pub max_extra_lockup_vote_weight_scaled_factor: u64,
    pub lockup_saturation_secs: u64,
}

/// Everything a scan needs besides the endpoint, program and wallets.
///
/// Loaded from a JSON file. Every field is optional and falls back to the
/// defaults of the deployed program.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub layout: VoterLayout,
    pub multiplier: LockupMultiplier,
    /// Registrar factors; when set they replace `multiplier`.
    pub voting_mint: Option<VotingMintFactors>,
    pub deposits: DepositConfig,
    pub fetch: FetchPolicy,
    /// Skip the exact-size fetch filter, e.g. for sources that return
    /// truncated accounts.
    pub disable_size_filter: bool,
    /// Evaluate lockups at this unix timestamp instead of the scan start.
    pub as_of: Option<i64>,
}

impl ScanConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: ScanConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.layout.validate()?;
        self.lockup_multiplier().validate()?;
        if self.deposits.min_amount == 0 {
            return Err(ConfigError::Invalid("min amount must be positive".to_string()));
        }
        let range = self.amount_range()?;
        if range.min_native > range.max_native {
            return Err(ConfigError::Invalid(format!(
                "min amount {} is above max amount {}",
                self.deposits.min_amount, self.deposits.max_amount
            )));
        }
        for amount in &self.deposits.phantom_amounts {
            self.deposits.to_native(*amount)?;
        }
        Ok(())
    }

    /// The multiplier deposits are scored with.
    pub fn lockup_multiplier(&self) -> LockupMultiplier {
        match self.voting_mint {
            Some(f) => LockupMultiplier::from_scaled_factors(
                f.baseline_vote_weight_scaled_factor,
                f.max_extra_lockup_vote_weight_scaled_factor,
                f.lockup_saturation_secs,
            ),
            None => self.multiplier,
        }
    }

    pub fn size_filter(&self) -> Option<u64> {
        (!self.disable_size_filter).then(|| self.layout.account_size as u64)
    }

    pub fn amount_range(&self) -> Result<AmountRange, ConfigError> {
        Ok(AmountRange {
            min_native: self.deposits.to_native(self.deposits.min_amount)?,
            max_native: self.deposits.to_native(self.deposits.max_amount)?,
        })
    }

    pub fn decoder(&self) -> Result<RecordDecoder, ConfigError> {
        RecordDecoder::new(self.layout.clone(), self.amount_range()?)
    }

    pub fn deduplicator(&self) -> Result<DepositDeduplicator, ConfigError> {
        let phantoms = self
            .deposits
            .phantom_amounts
            .iter()
            .map(|a| self.deposits.to_native(*a))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(DepositDeduplicator::new(
            phantoms,
            self.deposits.to_native(self.deposits.min_amount)?,
        )
        .with_timestamp_window(self.deposits.timestamp_window_secs))
    }

    pub fn aggregator(&self) -> Result<PowerAggregator, ConfigError> {
        Ok(PowerAggregator::new(
            self.deduplicator()?,
            self.lockup_multiplier(),
            self.deposits.decimals,
        ))
    }
}
