use crate::error::{ConfigError, DecodeError, DecodeWarning};
use crate::layout::{
    voter_discriminator, RawDepositSlot, VoterLayout, AMOUNT_WORD_LEN, DEPOSIT_SLOT_LEN, PUBKEY_LEN,
};
use crate::state::*;
use anchor_lang::prelude::Pubkey;
use log::trace;

/// Inclusive range of native amounts the opportunistic scan accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AmountRange {
    pub min_native: u64,
    pub max_native: u64,
}

impl AmountRange {
    pub fn contains(&self, amount_native: u64) -> bool {
        (self.min_native..=self.max_native).contains(&amount_native)
    }
}

/// Interprets raw account bytes as a voter record.
///
/// Decoding is pure. Both strategies report their candidates side by side;
/// deciding which of them are real is left to the deduplicator.
#[derive(Clone, Debug)]
pub struct RecordDecoder {
    layout: VoterLayout,
    header_len: usize,
    discriminator: [u8; 8],
    amount_range: AmountRange,
}

impl RecordDecoder {
    /// Fails if the layout does not fit its own account size.
    pub fn new(layout: VoterLayout, amount_range: AmountRange) -> Result<Self, ConfigError> {
        layout.validate()?;
        Ok(Self {
            header_len: layout.header_len()?,
            layout,
            discriminator: voter_discriminator(),
            amount_range,
        })
    }

    pub fn layout(&self) -> &VoterLayout {
        &self.layout
    }

    pub fn decode(&self, address: Pubkey, data: &[u8]) -> Result<VoterRecord, DecodeError> {
        let min = self.header_len;
        if data.len() < min {
            return Err(DecodeError::TooShort {
                len: data.len(),
                min,
            });
        }
        let too_short = || DecodeError::TooShort {
            len: data.len(),
            min,
        };

        let found: [u8; 8] = read_array(data, 0).ok_or_else(too_short)?;
        if found != self.discriminator {
            return Err(DecodeError::DiscriminatorMismatch { found });
        }
        let read_pubkey = |offset: usize| {
            read_array::<PUBKEY_LEN>(data, offset)
                .map(Pubkey::new_from_array)
                .ok_or_else(too_short)
        };

        let mut record = VoterRecord {
            address,
            voter_authority: read_pubkey(self.layout.voter_authority_offset)?,
            registrar: read_pubkey(self.layout.registrar_offset)?,
            voting_proxy: read_pubkey(self.layout.voting_proxy_offset)?,
            candidates: Vec::new(),
            warnings: Vec::new(),
        };
        self.structured_scan(data, &mut record);
        self.opportunistic_scan(data, &mut record);
        record
            .candidates
            .sort_by_key(|c| (c.entry.source_offset, c.source));
        Ok(record)
    }

    /// Reads every complete deposit slot whose `is_used` flag is set.
    fn structured_scan(&self, data: &[u8], record: &mut VoterRecord) {
        for offset in self.layout.slot_offsets() {
            let slot = match offset
                .checked_add(DEPOSIT_SLOT_LEN)
                .and_then(|end| data.get(offset..end))
            {
                Some(bytes) => bytemuck::pod_read_unaligned::<RawDepositSlot>(bytes),
                // slots past the end of a short buffer are simply absent
                None => break,
            };
            if slot.is_used == 0 {
                continue;
            }
            let account = record.address;
            let kind = match LockupKind::from_raw(slot.kind) {
                Some(kind) => kind,
                None => {
                    record.warnings.push(DecodeWarning::UnknownLockupKind {
                        account,
                        offset,
                        raw: slot.kind,
                    });
                    continue;
                }
            };
            if kind != LockupKind::None && slot.end_ts < slot.start_ts {
                record.warnings.push(DecodeWarning::InvertedLockup {
                    account,
                    offset,
                    start_ts: slot.start_ts,
                    end_ts: slot.end_ts,
                });
                continue;
            }
            if slot.amount_deposited_native == 0 {
                record
                    .warnings
                    .push(DecodeWarning::EmptyUsedSlot { account, offset });
                continue;
            }
            let lockup = if kind == LockupKind::None {
                Lockup::default()
            } else {
                Lockup::new(kind, slot.start_ts, slot.end_ts)
            };
            trace!(
                "{}: slot at {} holds {} ({:?})",
                account,
                offset,
                slot.amount_deposited_native,
                kind
            );
            record.candidates.push(DepositCandidate::structured(DepositEntry {
                amount_native: slot.amount_deposited_native,
                amount_initially_locked_native: slot.amount_initially_locked_native,
                lockup,
                source_offset: offset,
            }));
        }
    }

    /// Reads bare `u64` amounts at the extra known offsets, keeping only
    /// values inside the plausible amount range.
    fn opportunistic_scan(&self, data: &[u8], record: &mut VoterRecord) {
        for &offset in &self.layout.opportunistic_offsets {
            let amount = match read_array::<AMOUNT_WORD_LEN>(data, offset) {
                Some(bytes) => u64::from_le_bytes(bytes),
                None => continue,
            };
            if !self.amount_range.contains(amount) {
                continue;
            }
            trace!("{}: opportunistic amount {} at {}", record.address, amount, offset);
            record
                .candidates
                .push(DepositCandidate::opportunistic(amount, offset));
        }
    }
}

fn read_array<const N: usize>(data: &[u8], offset: usize) -> Option<[u8; N]> {
    data.get(offset..offset.checked_add(N)?)?.try_into().ok()
}
