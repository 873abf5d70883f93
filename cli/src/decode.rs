use anchor_lang::prelude::Pubkey;
use anyhow::{anyhow, bail, Result};
use governance_power::layout::voter_discriminator;
use governance_power::multiplier::SECS_PER_YEAR;
use governance_power::*;
use serde::Serialize;
use std::collections::HashMap;
use std::io;
use std::io::BufRead;
use std::path::PathBuf;

//
// Output format declarations. These are built from the decoded
// accounts and then converted to JSON.
//

#[derive(Serialize)]
struct DisplayDepositEntry {
    offset: usize,
    kind: String,
    amount: f64,
    unlocked_now: u64,
    locked_now: u64,
    locked_1y: u64,
    locked_2y: u64,
    locked_3y: u64,
    locked_4y: u64,
    locked_5y: u64,
    periods_left: u64,
    multiplier: f64,
    power: f64,
}

#[derive(Serialize)]
struct DisplayVoter {
    voter_authority: String,
    registrar: String,
    voting_proxy: Option<String>,
    deposit_entries: Vec<DisplayDepositEntry>,
    power: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
}

struct Decoding {
    config: ScanConfig,
    multiplier: LockupMultiplier,
    decoder: RecordDecoder,
    dedup: DepositDeduplicator,
    now_ts: i64,
}

type Handler = fn(&Decoding, &[u8]) -> Result<()>;

/// Decode a Voter account and print its JSON to stdout
fn decode_voter(ctx: &Decoding, data: &[u8]) -> Result<()> {
    // stdin carries no address
    let voter = ctx.decoder.decode(Pubkey::default(), data)?;
    let resolved = ctx.dedup.resolve(&voter, ctx.now_ts);
    let year = SECS_PER_YEAR as i64;
    let now_ts = ctx.now_ts;
    let decimals = ctx.config.deposits.decimals;

    let deposit_entries: Vec<DisplayDepositEntry> = resolved
        .deposits
        .iter()
        .map(|d| {
            let scored = ctx.multiplier.score(d, now_ts, decimals);
            DisplayDepositEntry {
                offset: d.source_offset,
                kind: format!("{:?}", d.lockup.kind),
                amount: d.ui_amount(decimals),
                unlocked_now: d.amount_unlocked(now_ts),
                locked_now: d.amount_locked(now_ts),
                locked_1y: d.amount_locked(now_ts + year),
                locked_2y: d.amount_locked(now_ts + 2 * year),
                locked_3y: d.amount_locked(now_ts + 3 * year),
                locked_4y: d.amount_locked(now_ts + 4 * year),
                locked_5y: d.amount_locked(now_ts + 5 * year),
                periods_left: d.lockup.periods_left(now_ts),
                multiplier: scored.multiplier,
                power: scored.power,
            }
        })
        .collect();

    let ser = DisplayVoter {
        voter_authority: voter.voter_authority.to_string(),
        registrar: voter.registrar.to_string(),
        voting_proxy: voter.is_delegated().then(|| voter.voting_proxy.to_string()),
        power: deposit_entries.iter().map(|d| d.power).sum(),
        deposit_entries,
        warnings: resolved.warnings.iter().map(|w| w.to_string()).collect(),
    };
    println!("{}", serde_json::to_string(&ser)?);
    Ok(())
}

// Read a sequence of base64 encoded accounts from stdin
// and write their decoded versions back out as JSON.
pub fn decode_account(config: Option<PathBuf>, as_of: Option<i64>) -> Result<()> {
    let config = match config {
        Some(path) => ScanConfig::load(path)?,
        None => ScanConfig::default(),
    };
    config.validate()?;
    let now_ts = match as_of.or(config.as_of) {
        Some(ts) => ts,
        None => std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)?
            .as_secs() as i64,
    };
    let ctx = Decoding {
        decoder: config.decoder()?,
        dedup: config.deduplicator()?,
        multiplier: config.lockup_multiplier(),
        config,
        now_ts,
    };

    let account_types: HashMap<[u8; 8], Handler> =
        HashMap::from([(voter_discriminator(), decode_voter as Handler)]);

    for line in io::stdin().lock().lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let data = base64::decode(line)?;

        if data.len() < 8 {
            bail!("data length {} too small for discriminator", data.len());
        }
        let discr = &data[0..8];
        let handler = account_types
            .get(discr)
            .ok_or_else(|| anyhow!("discriminator {:?} not recognized", discr))?;

        handler(&ctx, &data)?;
    }
    Ok(())
}
