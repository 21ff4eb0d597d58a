use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};
use std::mem::size_of;

use crate::instruction::{pack_words, unpack_fixed_bytes, unpack_pubkey, unpack_u16, unpack_u32, unpack_u64, unpack_words};
use crate::vrf_state::{
    find_authority_address, find_config_address, find_request_address, find_subscription_address, MAX_NUM_WORDS,
};

/// Tag of the instruction the coordinator sends to a consumer program when
/// delivering words. Consumers must decode it with `unpack_fulfill_callback`.
pub const RAW_FULFILL_RANDOM_WORDS: u8 = 3;

#[derive(Clone, Debug, PartialEq)]
pub enum VrfInstruction {
    /// Initialize the coordinator config
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` Deployer, pays for the config account
    /// 1. `[writable]` Config PDA
    /// 2. `[]` The system program
    Initialize {
        /// Flat premium per fulfillment
        base_fee: u64,
        /// Oracle currency per unit of callback gas
        gas_price_link: u64,
    },

    /// Create a subscription owned by the signer
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` Subscription owner
    /// 1. `[writable]` Config PDA
    /// 2. `[writable]` Subscription PDA for `config.next_subscription_id`
    /// 3. `[]` The system program
    CreateSubscription {},

    /// Credit a subscription. The mock does not move any tokens.
    ///
    /// Accounts expected:
    /// 0. `[signer]` Funder
    /// 1. `[writable]` Subscription PDA
    FundSubscription { subscription_id: u64, amount: u64 },

    /// Authorize a consumer account (owner only)
    ///
    /// Accounts expected:
    /// 0. `[signer]` Subscription owner
    /// 1. `[writable]` Subscription PDA
    AddConsumer { subscription_id: u64, consumer: Pubkey },

    /// Revoke a consumer account (owner only)
    ///
    /// Accounts expected:
    /// 0. `[signer]` Subscription owner
    /// 1. `[writable]` Subscription PDA
    RemoveConsumer { subscription_id: u64, consumer: Pubkey },

    /// Issue a randomness request
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` Payer for the request account
    /// 1. `[]` Consumer account, must be registered on the subscription
    /// 2. `[signer]` Consumer authority, PDA `["vrf-consumer", consumer]` of the consumer's owner
    /// 3. `[writable]` Config PDA
    /// 4. `[]` Subscription PDA
    /// 5. `[writable]` Request PDA for `config.next_request_id`
    /// 6. `[]` The system program
    RequestRandomWords {
        key_hash: [u8; 32],
        subscription_id: u64,
        request_confirmations: u16,
        callback_gas_limit: u32,
        num_words: u32,
    },

    /// Deliver hash-derived words for a request
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` Fulfiller, receives the request account rent
    /// 1. `[]` Config PDA
    /// 2. `[writable]` Request PDA
    /// 3. `[writable]` Subscription PDA
    /// 4. `[]` Coordinator authority PDA
    /// 5. `[]` Consumer program
    /// 6. `[writable]` Consumer account
    /// Remaining accounts are forwarded to the consumer callback
    FulfillRandomWords { request_id: u64 },

    /// Deliver caller-chosen words for a request. Same accounts as
    /// `FulfillRandomWords`.
    FulfillRandomWordsWithOverride { request_id: u64, words: Vec<u64> },
}

impl VrfInstruction {
    /// Unpacks a byte buffer into a VrfInstruction
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        let (tag, rest) = input.split_first().ok_or(ProgramError::InvalidInstructionData)?;

        Ok(match tag {
            0 => {
                let (base_fee, rest) = unpack_u64(rest)?;
                let (gas_price_link, _) = unpack_u64(rest)?;
                Self::Initialize { base_fee, gas_price_link }
            }
            1 => Self::CreateSubscription {},
            2 => {
                let (subscription_id, rest) = unpack_u64(rest)?;
                let (amount, _) = unpack_u64(rest)?;
                Self::FundSubscription { subscription_id, amount }
            }
            3 => {
                let (subscription_id, rest) = unpack_u64(rest)?;
                let (consumer, _) = unpack_pubkey(rest)?;
                Self::AddConsumer { subscription_id, consumer }
            }
            4 => {
                let (subscription_id, rest) = unpack_u64(rest)?;
                let (consumer, _) = unpack_pubkey(rest)?;
                Self::RemoveConsumer { subscription_id, consumer }
            }
            5 => {
                let (key_hash, rest) = unpack_fixed_bytes::<32>(rest)?;
                let (subscription_id, rest) = unpack_u64(rest)?;
                let (request_confirmations, rest) = unpack_u16(rest)?;
                let (callback_gas_limit, rest) = unpack_u32(rest)?;
                let (num_words, _) = unpack_u32(rest)?;
                Self::RequestRandomWords {
                    key_hash,
                    subscription_id,
                    request_confirmations,
                    callback_gas_limit,
                    num_words,
                }
            }
            6 => {
                let (request_id, _) = unpack_u64(rest)?;
                Self::FulfillRandomWords { request_id }
            }
            7 => {
                let (request_id, rest) = unpack_u64(rest)?;
                let (words, _) = unpack_words(rest)?;
                Self::FulfillRandomWordsWithOverride { request_id, words }
            }
            _ => return Err(ProgramError::InvalidInstructionData),
        })
    }

    /// Packs a VrfInstruction into a byte buffer
    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(size_of::<Self>());
        match self {
            Self::Initialize { base_fee, gas_price_link } => {
                buf.push(0);
                buf.extend_from_slice(&base_fee.to_le_bytes());
                buf.extend_from_slice(&gas_price_link.to_le_bytes());
            }
            Self::CreateSubscription {} => buf.push(1),
            Self::FundSubscription { subscription_id, amount } => {
                buf.push(2);
                buf.extend_from_slice(&subscription_id.to_le_bytes());
                buf.extend_from_slice(&amount.to_le_bytes());
            }
            Self::AddConsumer { subscription_id, consumer } => {
                buf.push(3);
                buf.extend_from_slice(&subscription_id.to_le_bytes());
                buf.extend_from_slice(consumer.as_ref());
            }
            Self::RemoveConsumer { subscription_id, consumer } => {
                buf.push(4);
                buf.extend_from_slice(&subscription_id.to_le_bytes());
                buf.extend_from_slice(consumer.as_ref());
            }
            Self::RequestRandomWords {
                key_hash,
                subscription_id,
                request_confirmations,
                callback_gas_limit,
                num_words,
            } => {
                buf.push(5);
                buf.extend_from_slice(key_hash);
                buf.extend_from_slice(&subscription_id.to_le_bytes());
                buf.extend_from_slice(&request_confirmations.to_le_bytes());
                buf.extend_from_slice(&callback_gas_limit.to_le_bytes());
                buf.extend_from_slice(&num_words.to_le_bytes());
            }
            Self::FulfillRandomWords { request_id } => {
                buf.push(6);
                buf.extend_from_slice(&request_id.to_le_bytes());
            }
            Self::FulfillRandomWordsWithOverride { request_id, words } => {
                buf.push(7);
                buf.extend_from_slice(&request_id.to_le_bytes());
                pack_words(&mut buf, words);
            }
        }
        buf
    }
}

/// Data of the callback instruction delivered to a consumer program.
pub fn pack_fulfill_callback(request_id: u64, words: &[u64]) -> Vec<u8> {
    let mut buf = vec![RAW_FULFILL_RANDOM_WORDS];
    buf.extend_from_slice(&request_id.to_le_bytes());
    pack_words(&mut buf, words);
    buf
}

/// Decodes callback data after the tag byte.
pub fn unpack_fulfill_callback(rest: &[u8]) -> Result<(u64, Vec<u64>), ProgramError> {
    let (request_id, rest) = unpack_u64(rest)?;
    let (words, _) = unpack_words(rest)?;
    Ok((request_id, words))
}

/// Create initialize instruction
pub fn initialize(program_id: &Pubkey, authority: &Pubkey, base_fee: u64, gas_price_link: u64) -> Instruction {
    let (config, _) = find_config_address(program_id);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*authority, true),
            AccountMeta::new(config, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: VrfInstruction::Initialize { base_fee, gas_price_link }.pack(),
    }
}

/// Create create_subscription instruction for the id the config hands out next
pub fn create_subscription(program_id: &Pubkey, owner: &Pubkey, next_subscription_id: u64) -> Instruction {
    let (config, _) = find_config_address(program_id);
    let (subscription, _) = find_subscription_address(program_id, next_subscription_id);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*owner, true),
            AccountMeta::new(config, false),
            AccountMeta::new(subscription, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: VrfInstruction::CreateSubscription {}.pack(),
    }
}

/// Create fund_subscription instruction
pub fn fund_subscription(program_id: &Pubkey, funder: &Pubkey, subscription_id: u64, amount: u64) -> Instruction {
    let (subscription, _) = find_subscription_address(program_id, subscription_id);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*funder, true),
            AccountMeta::new(subscription, false),
        ],
        data: VrfInstruction::FundSubscription { subscription_id, amount }.pack(),
    }
}

/// Create add_consumer instruction
pub fn add_consumer(program_id: &Pubkey, owner: &Pubkey, subscription_id: u64, consumer: &Pubkey) -> Instruction {
    let (subscription, _) = find_subscription_address(program_id, subscription_id);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*owner, true),
            AccountMeta::new(subscription, false),
        ],
        data: VrfInstruction::AddConsumer {
            subscription_id,
            consumer: *consumer,
        }
        .pack(),
    }
}

/// Create remove_consumer instruction
pub fn remove_consumer(program_id: &Pubkey, owner: &Pubkey, subscription_id: u64, consumer: &Pubkey) -> Instruction {
    let (subscription, _) = find_subscription_address(program_id, subscription_id);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*owner, true),
            AccountMeta::new(subscription, false),
        ],
        data: VrfInstruction::RemoveConsumer {
            subscription_id,
            consumer: *consumer,
        }
        .pack(),
    }
}

/// Create request_random_words instruction for the id the config hands out next
#[allow(clippy::too_many_arguments)]
pub fn request_random_words(
    program_id: &Pubkey,
    payer: &Pubkey,
    consumer: &Pubkey,
    consumer_authority: &Pubkey,
    next_request_id: u64,
    key_hash: [u8; 32],
    subscription_id: u64,
    request_confirmations: u16,
    callback_gas_limit: u32,
    num_words: u32,
) -> Instruction {
    let (config, _) = find_config_address(program_id);
    let (subscription, _) = find_subscription_address(program_id, subscription_id);
    let (request, _) = find_request_address(program_id, next_request_id);
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new_readonly(*consumer, false),
            AccountMeta::new_readonly(*consumer_authority, true),
            AccountMeta::new(config, false),
            AccountMeta::new_readonly(subscription, false),
            AccountMeta::new(request, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: VrfInstruction::RequestRandomWords {
            key_hash,
            subscription_id,
            request_confirmations,
            callback_gas_limit,
            num_words,
        }
        .pack(),
    }
}

/// Create fulfill_random_words instruction.
///
/// `candidates` are forwarded to the consumer callback as writable accounts.
pub fn fulfill_random_words(
    program_id: &Pubkey,
    fulfiller: &Pubkey,
    request_id: u64,
    subscription_id: u64,
    consumer_program: &Pubkey,
    consumer: &Pubkey,
    candidates: &[Pubkey],
) -> Instruction {
    fulfill_instruction(
        program_id,
        fulfiller,
        request_id,
        subscription_id,
        consumer_program,
        consumer,
        candidates,
        VrfInstruction::FulfillRandomWords { request_id }.pack(),
    )
}

/// Create fulfill_random_words_with_override instruction, keeping at most
/// `MAX_NUM_WORDS` words
#[allow(clippy::too_many_arguments)]
pub fn fulfill_random_words_with_override(
    program_id: &Pubkey,
    fulfiller: &Pubkey,
    request_id: u64,
    subscription_id: u64,
    consumer_program: &Pubkey,
    consumer: &Pubkey,
    candidates: &[Pubkey],
    mut words: Vec<u64>,
) -> Instruction {
    words.truncate(MAX_NUM_WORDS as usize);
    fulfill_instruction(
        program_id,
        fulfiller,
        request_id,
        subscription_id,
        consumer_program,
        consumer,
        candidates,
        VrfInstruction::FulfillRandomWordsWithOverride { request_id, words }.pack(),
    )
}

#[allow(clippy::too_many_arguments)]
fn fulfill_instruction(
    program_id: &Pubkey,
    fulfiller: &Pubkey,
    request_id: u64,
    subscription_id: u64,
    consumer_program: &Pubkey,
    consumer: &Pubkey,
    candidates: &[Pubkey],
    data: Vec<u8>,
) -> Instruction {
    let (config, _) = find_config_address(program_id);
    let (request, _) = find_request_address(program_id, request_id);
    let (subscription, _) = find_subscription_address(program_id, subscription_id);
    let (authority, _) = find_authority_address(program_id);

    let mut accounts = vec![
        AccountMeta::new(*fulfiller, true),
        AccountMeta::new_readonly(config, false),
        AccountMeta::new(request, false),
        AccountMeta::new(subscription, false),
        AccountMeta::new_readonly(authority, false),
        AccountMeta::new_readonly(*consumer_program, false),
        AccountMeta::new(*consumer, false),
    ];
    accounts.extend(candidates.iter().map(|key| AccountMeta::new(*key, false)));

    Instruction {
        program_id: *program_id,
        accounts,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_layout_survives_unpack() {
        let instruction = VrfInstruction::RequestRandomWords {
            key_hash: [9u8; 32],
            subscription_id: 4,
            request_confirmations: 3,
            callback_gas_limit: 500_000,
            num_words: 1,
        };
        assert_eq!(VrfInstruction::unpack(&instruction.pack()).unwrap(), instruction);
    }

    #[test]
    fn callback_data_starts_with_consumer_tag() {
        let data = pack_fulfill_callback(7, &[11, 12]);
        assert_eq!(data[0], RAW_FULFILL_RANDOM_WORDS);
        assert_eq!(unpack_fulfill_callback(&data[1..]).unwrap(), (7, vec![11, 12]));
    }

    #[test]
    fn truncated_data_is_rejected() {
        assert_eq!(
            VrfInstruction::unpack(&[2, 1, 0]),
            Err(ProgramError::InvalidInstructionData)
        );
        assert_eq!(VrfInstruction::unpack(&[]), Err(ProgramError::InvalidInstructionData));
    }
}
