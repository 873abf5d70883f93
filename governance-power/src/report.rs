use crate::aggregate::WalletPowerSummary;
use crate::scan::ScanOutcome;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::cmp::Ordering;

//
// Export format declarations. These are built from the scan outcome and
// then converted to JSON.
//

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_wallets: usize,
    pub wallets_with_power: usize,
    pub total_native_power: f64,
    pub total_delegated_power: f64,
    pub total_governance_power: f64,
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DisplayWalletPower {
    pub wallet: String,
    pub native_power: f64,
    pub delegated_power: f64,
    pub total_power: f64,
    pub contributing_accounts: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DisplayFailure {
    pub wallet: String,
    pub error: String,
}

/// The JSON export of one scan, results sorted by total power descending.
#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub scan_date: String,
    pub summary: ReportSummary,
    pub results: Vec<DisplayWalletPower>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<DisplayFailure>,
}

impl DisplayWalletPower {
    fn from_summary(summary: &WalletPowerSummary) -> Self {
        Self {
            wallet: summary.wallet.to_string(),
            native_power: summary.native_power,
            delegated_power: summary.delegated_power,
            total_power: summary.total_power,
            contributing_accounts: summary
                .contributing_accounts
                .iter()
                .map(|a| a.to_string())
                .collect(),
            warnings: summary.warnings.iter().map(|w| w.to_string()).collect(),
        }
    }
}

impl ScanReport {
    pub fn from_outcome(outcome: &ScanOutcome) -> Self {
        let mut results: Vec<DisplayWalletPower> = outcome
            .summaries
            .iter()
            .map(DisplayWalletPower::from_summary)
            .collect();
        results.sort_by(|a, b| {
            b.total_power
                .partial_cmp(&a.total_power)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.wallet.cmp(&b.wallet))
        });

        let summary = ReportSummary {
            total_wallets: outcome.summaries.len() + outcome.failures.len(),
            wallets_with_power: results.iter().filter(|r| r.total_power > 0.0).count(),
            total_native_power: results.iter().map(|r| r.native_power).sum(),
            total_delegated_power: results.iter().map(|r| r.delegated_power).sum(),
            total_governance_power: results.iter().map(|r| r.total_power).sum(),
        };

        Self {
            scan_date: format_timestamp(outcome.as_of),
            summary,
            results,
            failures: outcome
                .failures
                .iter()
                .map(|f| DisplayFailure {
                    wallet: f.wallet.to_string(),
                    error: f.error.to_string(),
                })
                .collect(),
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// RFC 3339 UTC time of a unix timestamp. Falls back to the raw number
/// outside chrono's range.
fn format_timestamp(ts: i64) -> String {
    DateTime::<Utc>::from_timestamp(ts, 0)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| ts.to_string())
}
