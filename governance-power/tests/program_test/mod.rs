#![allow(dead_code)]

use anchor_lang::prelude::Pubkey;
use bytemuck::Zeroable;
use governance_power::layout::{voter_discriminator, RawDepositSlot, DEPOSIT_SLOT_LEN};
use governance_power::*;

/// One whole token of a 6 decimal mint, in native units.
pub const UNIT: u64 = 1_000_000;

pub const START: i64 = 1_700_000_000;
pub const DAY: i64 = 86_400;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Clone, Copy)]
pub struct DepositCookie {
    pub amount: u64,
    pub kind: u8,
    pub start_ts: i64,
    pub end_ts: i64,
    pub is_used: bool,
}

impl DepositCookie {
    pub fn unlocked(tokens: u64) -> Self {
        Self {
            amount: tokens * UNIT,
            kind: 0,
            start_ts: 0,
            end_ts: 0,
            is_used: true,
        }
    }

    pub fn cliff(tokens: u64, start_ts: i64, end_ts: i64) -> Self {
        Self {
            amount: tokens * UNIT,
            kind: 3,
            start_ts,
            end_ts,
            is_used: true,
        }
    }

    pub fn daily(tokens: u64, start_ts: i64, days: i64) -> Self {
        Self {
            amount: tokens * UNIT,
            kind: 1,
            start_ts,
            end_ts: start_ts + days * DAY,
            is_used: true,
        }
    }

    fn slot(&self) -> RawDepositSlot {
        RawDepositSlot {
            start_ts: self.start_ts,
            end_ts: self.end_ts,
            kind: self.kind,
            amount_deposited_native: self.amount,
            amount_initially_locked_native: self.amount,
            is_used: u8::from(self.is_used),
            ..RawDepositSlot::zeroed()
        }
    }
}

/// Builds the bytes of a voter account in the default layout.
pub struct VoterCookie {
    pub address: Pubkey,
    pub authority: Pubkey,
    pub voting_proxy: Pubkey,
    data: Vec<u8>,
}

impl VoterCookie {
    pub fn new(authority: Pubkey) -> Self {
        Self::delegated(authority, authority)
    }

    pub fn delegated(authority: Pubkey, voting_proxy: Pubkey) -> Self {
        let layout = VoterLayout::default();
        let mut data = vec![0u8; layout.account_size];
        data[..8].copy_from_slice(&voter_discriminator());
        write(&mut data, layout.voter_authority_offset, authority.as_ref());
        write(&mut data, layout.registrar_offset, Pubkey::new_unique().as_ref());
        write(&mut data, layout.voting_proxy_offset, voting_proxy.as_ref());
        Self {
            address: Pubkey::new_unique(),
            authority,
            voting_proxy,
            data,
        }
    }

    pub fn deposit(mut self, index: usize, deposit: DepositCookie) -> Self {
        let offset = VoterLayout::default().deposits_offset + index * DEPOSIT_SLOT_LEN;
        write(&mut self.data, offset, bytemuck::bytes_of(&deposit.slot()));
        self
    }

    /// Writes a bare amount at one of the tail offsets.
    pub fn tail_amount(mut self, offset: usize, native: u64) -> Self {
        write(&mut self.data, offset, &native.to_le_bytes());
        self
    }

    pub fn truncated(mut self, len: usize) -> Self {
        self.data.truncate(len);
        self
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn raw(&self) -> RawAccount {
        RawAccount {
            address: self.address,
            data: self.data.clone(),
        }
    }
}

fn write(data: &mut [u8], offset: usize, bytes: &[u8]) {
    data[offset..offset + bytes.len()].copy_from_slice(bytes);
}

/// Configuration with deterministic evaluation time and no retry delays.
pub fn test_config() -> ScanConfig {
    let mut config = ScanConfig::default();
    config.as_of = Some(START);
    config.fetch.initial_backoff_ms = 0;
    config.fetch.max_backoff_ms = 0;
    config
}

pub fn decode_all(cookies: &[VoterCookie]) -> Vec<state::VoterRecord> {
    let decoder = test_config().decoder().unwrap();
    cookies
        .iter()
        .map(|c| decoder.decode(c.address, c.bytes()).unwrap())
        .collect()
}

pub fn aggregator() -> PowerAggregator {
    test_config().aggregator().unwrap()
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() <= 1e-9 * expected.abs().max(1.0),
        "got {}, expected {}",
        actual,
        expected
    );
}
