use crate::dedupe::DepositDeduplicator;
use crate::error::{DecodeWarning, PowerError};
use crate::multiplier::LockupMultiplier;
use crate::state::*;
use anchor_lang::prelude::Pubkey;
use log::{debug, trace};

/// Relative tolerance between the two ways of summing a wallet's power.
const CONSERVATION_TOLERANCE: f64 = 1e-9;

/// How an account relates to the wallet being evaluated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    Native,
    Delegated,
    Irrelevant,
}

/// Classifies `record` for `wallet`.
///
/// - native: the wallet is the authority
/// - delegated: the wallet is the proxy, and the authority is neither the
///   wallet nor the proxy itself
///
/// The last clause keeps self-referential records from counting twice.
pub fn classify(record: &VoterRecord, wallet: &Pubkey) -> Classification {
    if record.voter_authority == *wallet {
        Classification::Native
    } else if record.voting_proxy == *wallet && record.voter_authority != record.voting_proxy {
        Classification::Delegated
    } else {
        Classification::Irrelevant
    }
}

/// Governance power of one wallet over one snapshot of voter accounts.
///
/// Recomputed from scratch on every scan, never updated in place.
#[derive(Clone, Debug, PartialEq)]
pub struct WalletPowerSummary {
    pub wallet: Pubkey,
    pub native_power: f64,
    pub delegated_power: f64,
    /// Always `native_power + delegated_power`.
    pub total_power: f64,
    /// Every account that classified as native or delegated, in snapshot order.
    pub contributing_accounts: Vec<Pubkey>,
    pub native_deposits: Vec<ScoredDeposit>,
    pub delegated_deposits: Vec<ScoredDeposit>,
    pub warnings: Vec<DecodeWarning>,
}

#[derive(Clone, Debug)]
pub struct PowerAggregator {
    deduplicator: DepositDeduplicator,
    multiplier: LockupMultiplier,
    decimals: u8,
}

impl PowerAggregator {
    pub fn new(deduplicator: DepositDeduplicator, multiplier: LockupMultiplier, decimals: u8) -> Self {
        Self {
            deduplicator,
            multiplier,
            decimals,
        }
    }

    /// Sums the power `wallet` holds across `accounts` at `curr_ts`.
    ///
    /// Accounts are visited in the order given and deposits in offset
    /// order, so the same snapshot always yields bit-identical sums.
    pub fn aggregate<'a>(
        &self,
        accounts: impl IntoIterator<Item = &'a VoterRecord>,
        wallet: &Pubkey,
        curr_ts: i64,
    ) -> Result<WalletPowerSummary, PowerError> {
        let mut summary = WalletPowerSummary {
            wallet: *wallet,
            native_power: 0.0,
            delegated_power: 0.0,
            total_power: 0.0,
            contributing_accounts: Vec::new(),
            native_deposits: Vec::new(),
            delegated_deposits: Vec::new(),
            warnings: Vec::new(),
        };
        let mut native_accounts = Vec::new();
        let mut delegated_accounts = Vec::new();
        // every deposit's power summed in visiting order, for the conservation check
        let mut deposits_power = 0.0;

        for record in accounts {
            let classification = classify(record, wallet);
            let (bucket, deposits, bucket_accounts) = match classification {
                Classification::Native => (
                    &mut summary.native_power,
                    &mut summary.native_deposits,
                    &mut native_accounts,
                ),
                Classification::Delegated => (
                    &mut summary.delegated_power,
                    &mut summary.delegated_deposits,
                    &mut delegated_accounts,
                ),
                Classification::Irrelevant => continue,
            };

            let resolved = self.deduplicator.resolve(record, curr_ts);
            for entry in &resolved.deposits {
                let scored = self.multiplier.score(entry, curr_ts, self.decimals);
                trace!(
                    "{} {:?}: {} x {} = {}",
                    record.address,
                    classification,
                    entry.ui_amount(self.decimals),
                    scored.multiplier,
                    scored.power
                );
                *bucket += scored.power;
                deposits_power += scored.power;
                deposits.push(scored);
            }
            bucket_accounts.push(record.address);
            summary.contributing_accounts.push(record.address);
            summary.warnings.extend(resolved.warnings);
        }

        summary.total_power = summary.native_power + summary.delegated_power;
        self.check_invariants(&summary, deposits_power, &native_accounts, &delegated_accounts)?;
        debug!(
            "{}: native {} delegated {} total {}",
            wallet, summary.native_power, summary.delegated_power, summary.total_power
        );
        Ok(summary)
    }

    fn check_invariants(
        &self,
        summary: &WalletPowerSummary,
        deposits_power: f64,
        native_accounts: &[Pubkey],
        delegated_accounts: &[Pubkey],
    ) -> Result<(), PowerError> {
        let violation = |detail: String| PowerError::AggregationInvariantViolation {
            wallet: summary.wallet,
            detail,
        };

        let all_deposits = summary
            .native_deposits
            .iter()
            .chain(summary.delegated_deposits.iter());
        for scored in all_deposits {
            if !scored.power.is_finite() || scored.power < 0.0 || scored.multiplier < 1.0 {
                return Err(violation(format!(
                    "deposit at offset {} scored {} with multiplier {}",
                    scored.entry.source_offset, scored.power, scored.multiplier
                )));
            }
        }

        if let Some(both) = native_accounts
            .iter()
            .find(|a| delegated_accounts.contains(a))
        {
            return Err(violation(format!(
                "account {} counted as both native and delegated",
                both
            )));
        }

        let drift = (summary.total_power - deposits_power).abs();
        if drift > CONSERVATION_TOLERANCE * summary.total_power.abs().max(1.0) {
            return Err(violation(format!(
                "total {} does not match summed deposits {}",
                summary.total_power, deposits_power
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNIT: u64 = 1_000_000;

    fn aggregator() -> PowerAggregator {
        PowerAggregator::new(
            DepositDeduplicator::new([1_000 * UNIT, 11_000 * UNIT], UNIT),
            LockupMultiplier::default(),
            6,
        )
    }

    fn record(authority: Pubkey, proxy: Pubkey, amounts: &[u64]) -> VoterRecord {
        VoterRecord {
            address: Pubkey::new_unique(),
            voter_authority: authority,
            registrar: Pubkey::default(),
            voting_proxy: proxy,
            candidates: amounts
                .iter()
                .enumerate()
                .map(|(i, a)| DepositCandidate::structured(DepositEntry::unlocked(*a, 104 + 80 * i)))
                .collect(),
            warnings: vec![],
        }
    }

    #[test]
    fn classification_rules() {
        let w = Pubkey::new_unique();
        let x = Pubkey::new_unique();
        let y = Pubkey::new_unique();
        assert_eq!(classify(&record(w, w, &[]), &w), Classification::Native);
        assert_eq!(classify(&record(w, x, &[]), &w), Classification::Native);
        assert_eq!(classify(&record(x, w, &[]), &w), Classification::Delegated);
        assert_eq!(classify(&record(x, x, &[]), &w), Classification::Irrelevant);
        assert_eq!(classify(&record(x, y, &[]), &w), Classification::Irrelevant);
    }

    #[test]
    fn sums_native_and_delegated() {
        let w = Pubkey::new_unique();
        let x = Pubkey::new_unique();
        let accounts = vec![
            record(w, w, &[10 * UNIT, 5 * UNIT]),
            record(x, w, &[7 * UNIT]),
            record(x, x, &[100 * UNIT]),
        ];
        let s = aggregator().aggregate(&accounts, &w, 0).unwrap();
        assert_eq!(s.native_power, 15.0);
        assert_eq!(s.delegated_power, 7.0);
        assert_eq!(s.total_power, 22.0);
        assert_eq!(
            s.contributing_accounts,
            vec![accounts[0].address, accounts[1].address]
        );
        assert_eq!(s.native_deposits.len(), 2);
        assert_eq!(s.delegated_deposits.len(), 1);
    }

    #[test]
    fn wallet_without_accounts_has_zero_power() {
        let accounts = [record(Pubkey::new_unique(), Pubkey::new_unique(), &[UNIT])];
        let s = aggregator()
            .aggregate(&accounts, &Pubkey::new_unique(), 0)
            .unwrap();
        assert_eq!(s.total_power, 0.0);
        assert!(s.contributing_accounts.is_empty());
    }

    #[test]
    fn non_finite_power_is_a_violation() {
        let broken = PowerAggregator::new(
            DepositDeduplicator::new([], 0),
            LockupMultiplier {
                baseline_factor: 1.0,
                bonus_factor: f64::INFINITY,
                saturation_secs: 0,
            },
            6,
        );
        let w = Pubkey::new_unique();
        let mut r = record(w, w, &[]);
        r.candidates.push(DepositCandidate::structured(DepositEntry {
            amount_native: UNIT,
            amount_initially_locked_native: UNIT,
            lockup: Lockup::new(LockupKind::Cliff, 0, 100),
            source_offset: 104,
        }));
        let err = broken.aggregate(&[r], &w, 0).unwrap_err();
        assert!(matches!(err, PowerError::AggregationInvariantViolation { .. }));
    }
}
