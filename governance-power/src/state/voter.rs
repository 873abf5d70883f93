use crate::error::DecodeWarning;
use crate::state::deposit_entry::DepositCandidate;
use anchor_lang::prelude::Pubkey;

/// A decoded voter account.
///
/// Immutable once decoded and only kept for the duration of one scan.
#[derive(Clone, Debug, PartialEq)]
pub struct VoterRecord {
    /// Address of the voter account itself.
    pub address: Pubkey,
    /// Wallet that owns the deposits.
    pub voter_authority: Pubkey,
    pub registrar: Pubkey,
    /// Wallet entitled to vote the deposits. Equal to the authority unless
    /// delegated.
    pub voting_proxy: Pubkey,
    /// Deposit candidates from both decoding strategies, in offset order.
    pub candidates: Vec<DepositCandidate>,
    /// Slot-level problems found while decoding.
    pub warnings: Vec<DecodeWarning>,
}

impl VoterRecord {
    /// Whether the deposits are delegated to some other wallet.
    ///
    /// A default (all zero) proxy means no delegate was ever set.
    pub fn is_delegated(&self) -> bool {
        self.voting_proxy != self.voter_authority && self.voting_proxy != Pubkey::default()
    }
}
