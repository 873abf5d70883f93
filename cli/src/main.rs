use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod decode;
mod rpc;
mod scan;

#[derive(Parser, Debug)]
#[clap(version)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

/// Options shared by the scanning commands.
#[derive(Args, Debug)]
pub struct ScanOptions {
    /// Voter stake registry program to scan
    #[clap(long, default_value_t = governance_power::ID.to_string())]
    program: String,

    /// JSON scan configuration; defaults apply when omitted
    #[clap(long)]
    config: Option<PathBuf>,

    /// Write the JSON report here instead of stdout
    #[clap(long)]
    output: Option<PathBuf>,

    /// Append one JSON line per wallet upsert to this file
    #[clap(long)]
    upsert_log: Option<PathBuf>,

    /// Evaluate lockups at this unix timestamp instead of now
    #[clap(long)]
    as_of: Option<i64>,

    /// Read additional wallets, one per line, from this file
    #[clap(long)]
    wallets_file: Option<PathBuf>,

    /// Wallets to compute governance power for
    wallets: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode base64 voter accounts read from stdin
    DecodeAccount {
        #[clap(long)]
        config: Option<PathBuf>,

        #[clap(long)]
        as_of: Option<i64>,
    },
    /// Compute governance power from a live RPC node
    Scan {
        #[clap(long, default_value = "https://api.mainnet-beta.solana.com")]
        url: String,

        #[clap(flatten)]
        options: ScanOptions,
    },
    /// Compute governance power from an "address base64" account dump
    ScanFile {
        #[clap(long)]
        input: PathBuf,

        #[clap(flatten)]
        options: ScanOptions,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Command::DecodeAccount { config, as_of } => decode::decode_account(config, as_of),
        Command::Scan { url, options } => scan::scan_rpc(&url, &options),
        Command::ScanFile { input, options } => scan::scan_file(input, &options),
    }
}
