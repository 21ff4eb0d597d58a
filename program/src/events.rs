//! Structured notifications emitted by both programs.
//!
//! Each event is borsh-encoded, base64-wrapped and written to the program log
//! behind a per-program prefix, so a log line names its emitter without
//! tracking the invoke stack.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{msg, pubkey::Pubkey};

pub const RAFFLE_EVENT_PREFIX: &str = "raffle-event:";
pub const VRF_EVENT_PREFIX: &str = "vrf-event:";

const PROGRAM_LOG: &str = "Program log: ";

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub enum RaffleEvent {
    RaffleEnter { player: Pubkey },
    RequestedRaffleWinner { request_id: u64 },
    WinnerPicked { winner: Pubkey },
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub enum VrfEvent {
    SubscriptionCreated {
        subscription_id: u64,
        owner: Pubkey,
    },
    SubscriptionFunded {
        subscription_id: u64,
        old_balance: u64,
        new_balance: u64,
    },
    ConsumerAdded {
        subscription_id: u64,
        consumer: Pubkey,
    },
    ConsumerRemoved {
        subscription_id: u64,
        consumer: Pubkey,
    },
    RandomWordsRequested {
        key_hash: [u8; 32],
        request_id: u64,
        subscription_id: u64,
        request_confirmations: u16,
        callback_gas_limit: u32,
        num_words: u32,
        sender: Pubkey,
    },
    RandomWordsFulfilled {
        request_id: u64,
        output_seed: u64,
        payment: u64,
        success: bool,
    },
}

impl RaffleEvent {
    pub fn emit(&self) {
        emit_with_prefix(RAFFLE_EVENT_PREFIX, self);
    }

    pub fn from_log(line: &str) -> Option<Self> {
        decode_with_prefix(RAFFLE_EVENT_PREFIX, line)
    }
}

impl VrfEvent {
    pub fn emit(&self) {
        emit_with_prefix(VRF_EVENT_PREFIX, self);
    }

    pub fn from_log(line: &str) -> Option<Self> {
        decode_with_prefix(VRF_EVENT_PREFIX, line)
    }
}

fn emit_with_prefix<T: BorshSerialize>(prefix: &str, event: &T) {
    // serializing into a Vec cannot fail for these types
    if let Ok(bytes) = borsh::to_vec(event) {
        msg!("{}{}", prefix, STANDARD.encode(bytes));
    }
}

fn decode_with_prefix<T: BorshDeserialize>(prefix: &str, line: &str) -> Option<T> {
    let line = line.strip_prefix(PROGRAM_LOG).unwrap_or(line);
    let payload = line.strip_prefix(prefix)?;
    let bytes = STANDARD.decode(payload.trim()).ok()?;
    T::try_from_slice(&bytes).ok()
}
