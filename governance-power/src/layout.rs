use crate::error::ConfigError;
use anchor_lang::solana_program::hash::hash;
use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use static_assertions::const_assert_eq;

/// Size of one deposit slot in the voter account.
pub const DEPOSIT_SLOT_LEN: usize = 80;

/// Size of a public key field.
pub const PUBKEY_LEN: usize = 32;

/// Size of the anchor account discriminator.
pub const DISCRIMINATOR_LEN: usize = 8;

/// One deposit slot exactly as laid out on chain.
///
/// Booleans are kept as `u8` so the struct stays `Pod`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct RawDepositSlot {
    pub start_ts: i64,
    pub end_ts: i64,
    pub kind: u8,
    pub lockup_padding: [u8; 15],
    pub amount_deposited_native: u64,
    pub amount_initially_locked_native: u64,
    pub is_used: u8,
    pub allow_clawback: u8,
    pub voting_mint_config_idx: u8,
    pub reserved: [u8; 29],
}
const_assert_eq!(std::mem::size_of::<RawDepositSlot>(), DEPOSIT_SLOT_LEN);

/// Byte layout of a voter account.
///
/// The deployed program version does not publish a schema, so every offset
/// is configurable. The defaults describe the 2728 byte voter account:
///
/// ```text
///    0..8      discriminator
///    8..40     voter authority
///   40..72     registrar
///   72..104    voting proxy
///  104..2664   32 deposit slots of 80 bytes
/// 2664..2666   bumps
/// 2666..2728   reserved tail
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoterLayout {
    pub voter_authority_offset: usize,
    pub registrar_offset: usize,
    pub voting_proxy_offset: usize,
    pub deposits_offset: usize,
    pub deposit_slot_count: usize,
    /// Offsets outside the slot array where unlocked amounts have been seen.
    pub opportunistic_offsets: Vec<usize>,
    /// Exact account size used as fetch filter.
    pub account_size: usize,
}

impl Default for VoterLayout {
    fn default() -> Self {
        Self {
            voter_authority_offset: 8,
            registrar_offset: 40,
            voting_proxy_offset: 72,
            deposits_offset: 104,
            deposit_slot_count: 32,
            opportunistic_offsets: (2672..=2720).step_by(8).collect(),
            account_size: 2728,
        }
    }
}

/// Width of an opportunistic amount word.
pub const AMOUNT_WORD_LEN: usize = 8;

impl VoterLayout {
    /// Bytes needed to read the discriminator and all identifier fields.
    pub fn header_len(&self) -> Result<usize, ConfigError> {
        let mut len = DISCRIMINATOR_LEN;
        for (name, offset) in self.header_fields() {
            len = len.max(field_end(name, offset, PUBKEY_LEN)?);
        }
        Ok(len)
    }

    fn header_fields(&self) -> [(&'static str, usize); 3] {
        [
            ("voter_authority_offset", self.voter_authority_offset),
            ("registrar_offset", self.registrar_offset),
            ("voting_proxy_offset", self.voting_proxy_offset),
        ]
    }

    /// End of the last deposit slot.
    pub fn slots_end(&self) -> Result<usize, ConfigError> {
        let slots_len = self
            .deposit_slot_count
            .checked_mul(DEPOSIT_SLOT_LEN)
            .ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "{} deposit slots overflow",
                    self.deposit_slot_count
                ))
            })?;
        field_end("deposits_offset", self.deposits_offset, slots_len)
    }

    /// Start offset of every deposit slot.
    pub fn slot_offsets(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.deposit_slot_count).map(move |i| self.deposits_offset + i * DEPOSIT_SLOT_LEN)
    }

    /// Checks that every field lies behind the discriminator and inside
    /// `account_size`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, offset) in self.header_fields() {
            if offset < DISCRIMINATOR_LEN {
                return Err(ConfigError::Invalid(format!(
                    "{} {} overlaps the discriminator",
                    name, offset
                )));
            }
        }
        if self.deposits_offset < DISCRIMINATOR_LEN {
            return Err(ConfigError::Invalid(
                "deposit slots overlap the discriminator".to_string(),
            ));
        }
        self.within_account("header", self.header_len()?)?;
        self.within_account("deposit slots", self.slots_end()?)?;
        for &offset in &self.opportunistic_offsets {
            let end = field_end("opportunistic offset", offset, AMOUNT_WORD_LEN)?;
            self.within_account("opportunistic offset", end)?;
        }
        Ok(())
    }

    fn within_account(&self, what: &str, end: usize) -> Result<(), ConfigError> {
        if end > self.account_size {
            return Err(ConfigError::Invalid(format!(
                "{} ends at {}, past the {} byte account",
                what, end, self.account_size
            )));
        }
        Ok(())
    }
}

fn field_end(name: &str, offset: usize, len: usize) -> Result<usize, ConfigError> {
    offset
        .checked_add(len)
        .ok_or_else(|| ConfigError::Invalid(format!("{} {} overflows", name, offset)))
}

/// Anchor account discriminator of the `Voter` account.
pub fn voter_discriminator() -> [u8; DISCRIMINATOR_LEN] {
    let mut discriminator = [0u8; DISCRIMINATOR_LEN];
    discriminator.copy_from_slice(&hash(b"account:Voter").to_bytes()[..DISCRIMINATOR_LEN]);
    discriminator
}
