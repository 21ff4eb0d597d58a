// Mock VRF coordinator - State
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

use crate::state::AccountData;

pub const CONFIG_SEED: &[u8] = b"config";
pub const SUBSCRIPTION_SEED: &[u8] = b"subscription";
pub const REQUEST_SEED: &[u8] = b"request";
/// Seed of the PDA that signs consumer callbacks
pub const AUTHORITY_SEED: &[u8] = b"coordinator";
/// Consumers prove their identity with the PDA `[CONSUMER_AUTHORITY_SEED, consumer]`
/// of the program owning the consumer account
pub const CONSUMER_AUTHORITY_SEED: &[u8] = b"vrf-consumer";

pub const MAX_CONSUMERS: usize = 16;
pub const MAX_NUM_WORDS: u32 = 8;

/// Global coordinator settings and id counters
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub struct CoordinatorConfig {
    pub is_initialized: bool,
    /// Flat premium charged per fulfillment
    pub base_fee: u64,
    /// Oracle currency charged per unit of callback gas
    pub gas_price_link: u64,
    pub next_subscription_id: u64,
    pub next_request_id: u64,
}

impl CoordinatorConfig {
    pub const LEN: usize = 1 + 8 + 8 + 8 + 8;

    pub fn new(base_fee: u64, gas_price_link: u64) -> Self {
        Self {
            is_initialized: true,
            base_fee,
            gas_price_link,
            next_subscription_id: 1,
            next_request_id: 1,
        }
    }

    /// Cost of answering a request with the given callback budget.
    pub fn payment(&self, callback_gas_limit: u32) -> Option<u64> {
        self.gas_price_link
            .checked_mul(callback_gas_limit as u64)?
            .checked_add(self.base_fee)
    }
}

/// Prepaid account for randomness requests
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub struct Subscription {
    pub is_initialized: bool,
    pub id: u64,
    pub owner: Pubkey,
    /// Oracle currency balance, bookkeeping only
    pub balance: u64,
    pub consumers: Vec<Pubkey>,
}

impl Subscription {
    pub const LEN: usize = 1 + 8 + 32 + 8 + 4 + 32 * MAX_CONSUMERS;

    pub fn is_consumer(&self, consumer: &Pubkey) -> bool {
        self.consumers.contains(consumer)
    }
}

/// An issued, not yet fulfilled randomness request
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub struct RandomnessRequest {
    pub is_initialized: bool,
    pub id: u64,
    pub subscription_id: u64,
    /// Account the words are delivered for
    pub consumer: Pubkey,
    /// Program invoked with the callback
    pub consumer_program: Pubkey,
    pub key_hash: [u8; 32],
    pub request_confirmations: u16,
    pub callback_gas_limit: u32,
    pub num_words: u32,
}

impl RandomnessRequest {
    pub const LEN: usize = 1 + 8 + 8 + 32 + 32 + 32 + 2 + 4 + 4;
}

impl AccountData for CoordinatorConfig {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl AccountData for Subscription {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl AccountData for RandomnessRequest {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

pub fn find_config_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[CONFIG_SEED], program_id)
}

pub fn find_subscription_address(program_id: &Pubkey, subscription_id: u64) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[SUBSCRIPTION_SEED, &subscription_id.to_le_bytes()], program_id)
}

pub fn find_request_address(program_id: &Pubkey, request_id: u64) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[REQUEST_SEED, &request_id.to_le_bytes()], program_id)
}

pub fn find_authority_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[AUTHORITY_SEED], program_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_is_base_fee_plus_gas() {
        let config = CoordinatorConfig::new(250_000_000_000_000_000, 1_000_000_000);
        assert_eq!(config.payment(500_000), Some(250_500_000_000_000_000));
        let greedy = CoordinatorConfig::new(u64::MAX, 1);
        assert_eq!(greedy.payment(1), None);
    }

    #[test]
    fn full_subscription_fits_in_len() {
        let subscription = Subscription {
            is_initialized: true,
            id: 1,
            owner: Pubkey::new_unique(),
            balance: 0,
            consumers: (0..MAX_CONSUMERS).map(|_| Pubkey::new_unique()).collect(),
        };
        let mut data = vec![0u8; Subscription::LEN];
        subscription.pack(&mut data).unwrap();
        assert_eq!(Subscription::unpack(&data).unwrap(), subscription);
        assert_eq!(borsh::to_vec(&subscription).unwrap().len(), Subscription::LEN);
    }

    #[test]
    fn zeroed_request_is_not_initialized() {
        assert!(RandomnessRequest::unpack_initialized(&[0u8; RandomnessRequest::LEN]).is_none());
        assert!(RandomnessRequest::unpack_initialized(&[]).is_none());
    }
}
