use crate::rpc::RpcAccountSource;
use crate::ScanOptions;
use anchor_lang::prelude::Pubkey;
use anyhow::{bail, Context, Result};
use governance_power::*;
use log::{info, warn};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::str::FromStr;

pub fn scan_rpc(url: &str, options: &ScanOptions) -> Result<()> {
    let config = load_config(options)?;
    let source = RpcAccountSource::new(url, config.fetch.timeout());
    info!("scanning through {}", url);
    run(source, config, options)
}

pub fn scan_file(input: PathBuf, options: &ScanOptions) -> Result<()> {
    let config = load_config(options)?;
    info!("scanning accounts from {}", input.display());
    run(Base64FileSource::new(input), config, options)
}

fn load_config(options: &ScanOptions) -> Result<ScanConfig> {
    let mut config = match &options.config {
        Some(path) => ScanConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ScanConfig::default(),
    };
    if options.as_of.is_some() {
        config.as_of = options.as_of;
    }
    Ok(config)
}

fn parse_wallets(options: &ScanOptions) -> Result<Vec<Pubkey>> {
    let mut raw: Vec<String> = options.wallets.clone();
    if let Some(path) = &options.wallets_file {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading wallets from {}", path.display()))?;
        raw.extend(
            text.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .map(String::from),
        );
    }

    let mut wallets = Vec::with_capacity(raw.len());
    for s in raw {
        let wallet =
            Pubkey::from_str(&s).with_context(|| format!("invalid wallet address {}", s))?;
        if !wallets.contains(&wallet) {
            wallets.push(wallet);
        }
    }
    if wallets.is_empty() {
        bail!("no wallets given");
    }
    Ok(wallets)
}

fn run<S: AccountSource>(source: S, config: ScanConfig, options: &ScanOptions) -> Result<()> {
    let program_id = Pubkey::from_str(&options.program)
        .with_context(|| format!("invalid program id {}", options.program))?;
    let wallets = parse_wallets(options)?;

    let mut orchestrator = ScanOrchestrator::new(source, config)?;
    let outcome = orchestrator.scan(&program_id, &wallets)?;
    if !outcome.decode_failures.is_empty() {
        warn!(
            "{} of {} accounts could not be decoded",
            outcome.decode_failures.len(),
            outcome.accounts_fetched
        );
    }

    if let Some(path) = &options.upsert_log {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening upsert log {}", path.display()))?;
        let mut sink = JsonLinesSink::new(BufWriter::new(file));
        let failed = publish(&outcome, &mut sink);
        sink.into_inner().flush()?;
        if !failed.is_empty() {
            bail!("{} wallet upserts failed", failed.len());
        }
    }

    let json = ScanReport::from_outcome(&outcome).to_json_pretty()?;
    match &options.output {
        Some(path) => {
            let mut file = File::create(path)
                .with_context(|| format!("creating report {}", path.display()))?;
            writeln!(file, "{}", json)?;
            info!("report written to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
