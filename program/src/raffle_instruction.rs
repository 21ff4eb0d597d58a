use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};
use std::mem::size_of;

use crate::instruction::{unpack_fixed_bytes, unpack_u32, unpack_u64};
use crate::raffle_state::find_consumer_authority;
use crate::vrf_instruction::{pack_fulfill_callback, unpack_fulfill_callback, RAW_FULFILL_RANDOM_WORDS};
use crate::vrf_state::{find_config_address, find_request_address, find_subscription_address};

#[derive(Clone, Debug, PartialEq)]
pub enum RaffleInstruction {
    /// Initialize a raffle instance
    ///
    /// Accounts expected:
    /// 0. `[signer]` The deployer
    /// 1. `[writable]` The raffle account, allocated with `Raffle::LEN` and owned by this program
    /// 2. `[]` The VRF coordinator program
    Initialize {
        /// Subscription paying for randomness
        subscription_id: u64,
        /// Key hash of the coordinator gas lane
        gas_lane: [u8; 32],
        /// Seconds between winner selections
        interval: u64,
        /// Minimum lamports per entry
        entrance_fee: u64,
        /// Gas budget for the randomness callback
        callback_gas_limit: u32,
    },

    /// Enter the current round
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The player, pays `amount`
    /// 1. `[writable]` The raffle account
    /// 2. `[]` The system program
    EnterRaffle {
        /// Lamports paid, at least the entrance fee
        amount: u64,
    },

    /// Close the round and request randomness (anyone may call once upkeep is needed)
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` Caller, pays for the coordinator request account
    /// 1. `[writable]` The raffle account
    /// 2. `[]` Consumer authority PDA `["vrf-consumer", raffle]`
    /// 3. `[]` The VRF coordinator program
    /// 4. `[writable]` Coordinator config PDA
    /// 5. `[]` Subscription PDA
    /// 6. `[writable]` Request PDA for the coordinator's next request id
    /// 7. `[]` The system program
    PerformUpkeep {},

    /// Randomness delivery from the coordinator
    ///
    /// Accounts expected:
    /// 0. `[signer]` Coordinator authority PDA `["coordinator"]`
    /// 1. `[writable]` The raffle account
    /// Remaining `[writable]` accounts are winner candidates; the winner must be among them
    FulfillRandomWords {
        request_id: u64,
        random_words: Vec<u64>,
    },
}

impl RaffleInstruction {
    /// Unpacks a byte buffer into a RaffleInstruction
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        let (tag, rest) = input.split_first().ok_or(ProgramError::InvalidInstructionData)?;

        Ok(match *tag {
            0 => {
                let (subscription_id, rest) = unpack_u64(rest)?;
                let (gas_lane, rest) = unpack_fixed_bytes::<32>(rest)?;
                let (interval, rest) = unpack_u64(rest)?;
                let (entrance_fee, rest) = unpack_u64(rest)?;
                let (callback_gas_limit, _) = unpack_u32(rest)?;
                Self::Initialize {
                    subscription_id,
                    gas_lane,
                    interval,
                    entrance_fee,
                    callback_gas_limit,
                }
            }
            1 => {
                let (amount, _) = unpack_u64(rest)?;
                Self::EnterRaffle { amount }
            }
            2 => Self::PerformUpkeep {},
            RAW_FULFILL_RANDOM_WORDS => {
                let (request_id, random_words) = unpack_fulfill_callback(rest)?;
                Self::FulfillRandomWords {
                    request_id,
                    random_words,
                }
            }
            _ => return Err(ProgramError::InvalidInstructionData),
        })
    }

    /// Packs a RaffleInstruction into a byte buffer
    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(size_of::<Self>());
        match self {
            Self::Initialize {
                subscription_id,
                gas_lane,
                interval,
                entrance_fee,
                callback_gas_limit,
            } => {
                buf.push(0);
                buf.extend_from_slice(&subscription_id.to_le_bytes());
                buf.extend_from_slice(gas_lane);
                buf.extend_from_slice(&interval.to_le_bytes());
                buf.extend_from_slice(&entrance_fee.to_le_bytes());
                buf.extend_from_slice(&callback_gas_limit.to_le_bytes());
            }
            Self::EnterRaffle { amount } => {
                buf.push(1);
                buf.extend_from_slice(&amount.to_le_bytes());
            }
            Self::PerformUpkeep {} => buf.push(2),
            Self::FulfillRandomWords {
                request_id,
                random_words,
            } => buf = pack_fulfill_callback(*request_id, random_words),
        }
        buf
    }
}

/// Create initialize instruction
#[allow(clippy::too_many_arguments)]
pub fn initialize(
    program_id: &Pubkey,
    deployer: &Pubkey,
    raffle_account: &Pubkey,
    vrf_coordinator: &Pubkey,
    subscription_id: u64,
    gas_lane: [u8; 32],
    interval: u64,
    entrance_fee: u64,
    callback_gas_limit: u32,
) -> Instruction {
    let data = RaffleInstruction::Initialize {
        subscription_id,
        gas_lane,
        interval,
        entrance_fee,
        callback_gas_limit,
    }
    .pack();

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*deployer, true),
            AccountMeta::new(*raffle_account, false),
            AccountMeta::new_readonly(*vrf_coordinator, false),
        ],
        data,
    }
}

/// Create enter_raffle instruction
pub fn enter_raffle(program_id: &Pubkey, player: &Pubkey, raffle_account: &Pubkey, amount: u64) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*player, true),
            AccountMeta::new(*raffle_account, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: RaffleInstruction::EnterRaffle { amount }.pack(),
    }
}

/// Create perform_upkeep instruction.
///
/// `next_request_id` is the coordinator config's `next_request_id` at
/// submission time; the request account is derived from it.
pub fn perform_upkeep(
    program_id: &Pubkey,
    caller: &Pubkey,
    raffle_account: &Pubkey,
    vrf_coordinator: &Pubkey,
    subscription_id: u64,
    next_request_id: u64,
) -> Instruction {
    let (consumer_authority, _) = find_consumer_authority(raffle_account, program_id);
    let (config, _) = find_config_address(vrf_coordinator);
    let (subscription, _) = find_subscription_address(vrf_coordinator, subscription_id);
    let (request, _) = find_request_address(vrf_coordinator, next_request_id);

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*caller, true),
            AccountMeta::new(*raffle_account, false),
            AccountMeta::new_readonly(consumer_authority, false),
            AccountMeta::new_readonly(*vrf_coordinator, false),
            AccountMeta::new(config, false),
            AccountMeta::new_readonly(subscription, false),
            AccountMeta::new(request, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: RaffleInstruction::PerformUpkeep {}.pack(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_layout_survives_unpack() {
        let instruction = RaffleInstruction::Initialize {
            subscription_id: 1,
            gas_lane: [3u8; 32],
            interval: 30,
            entrance_fee: 100_000_000,
            callback_gas_limit: 500_000,
        };
        assert_eq!(RaffleInstruction::unpack(&instruction.pack()).unwrap(), instruction);
    }

    #[test]
    fn fulfill_uses_coordinator_callback_layout() {
        let instruction = RaffleInstruction::FulfillRandomWords {
            request_id: 2,
            random_words: vec![99],
        };
        assert_eq!(instruction.pack(), pack_fulfill_callback(2, &[99]));
        assert_eq!(RaffleInstruction::unpack(&instruction.pack()).unwrap(), instruction);
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert_eq!(RaffleInstruction::unpack(&[9]), Err(ProgramError::InvalidInstructionData));
    }
}
