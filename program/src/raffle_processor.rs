use crate::events::RaffleEvent;
use crate::raffle_error::RaffleError;
use crate::raffle_instruction::RaffleInstruction;
use crate::raffle_state::{find_consumer_authority, Raffle, RaffleState, MAX_PLAYERS, NUM_WORDS, REQUEST_CONFIRMATIONS};
use crate::state::AccountData;
use crate::vrf_instruction;
use crate::vrf_state::{find_authority_address, CoordinatorConfig, CONSUMER_AUTHORITY_SEED};

use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    program::{invoke, invoke_signed},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_instruction,
    sysvar::{clock::Clock, rent::Rent, Sysvar},
};

pub struct Processor;

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = RaffleInstruction::unpack(instruction_data)
            .map_err(|_| RaffleError::InvalidInstructionData)?;

        match instruction {
            RaffleInstruction::Initialize {
                subscription_id,
                gas_lane,
                interval,
                entrance_fee,
                callback_gas_limit,
            } => {
                msg!("Instruction: Initialize");
                Self::process_initialize(
                    accounts,
                    subscription_id,
                    gas_lane,
                    interval,
                    entrance_fee,
                    callback_gas_limit,
                    program_id,
                )
            }
            RaffleInstruction::EnterRaffle { amount } => {
                msg!("Instruction: Enter Raffle");
                Self::process_enter_raffle(accounts, amount, program_id)
            }
            RaffleInstruction::PerformUpkeep {} => {
                msg!("Instruction: Perform Upkeep");
                Self::process_perform_upkeep(accounts, program_id)
            }
            RaffleInstruction::FulfillRandomWords {
                request_id,
                random_words,
            } => {
                msg!("Instruction: Fulfill Random Words");
                Self::process_fulfill_random_words(accounts, request_id, &random_words, program_id)
            }
        }
    }

    /// Process the Initialize instruction
    ///
    /// Stores the constructor parameters and opens the first round
    #[allow(clippy::too_many_arguments)]
    fn process_initialize(
        accounts: &[AccountInfo],
        subscription_id: u64,
        gas_lane: [u8; 32],
        interval: u64,
        entrance_fee: u64,
        callback_gas_limit: u32,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let deployer_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let coordinator_info = next_account_info(account_info_iter)?;

        if !deployer_info.is_signer {
            msg!("Deployer must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        if raffle_info.owner != program_id {
            msg!("Raffle account must be owned by this program");
            return Err(ProgramError::IncorrectProgramId);
        }

        if raffle_info.data_len() < Raffle::LEN {
            msg!("Raffle account does not have enough space. Need {} bytes", Raffle::LEN);
            return Err(ProgramError::AccountDataTooSmall);
        }

        if Raffle::unpack_initialized(&raffle_info.data.borrow()).is_some() {
            msg!("Raffle account is already initialized");
            return Err(RaffleError::AlreadyInitialized.into());
        }

        let clock = Clock::get()?;
        let raffle = Raffle::new(
            *coordinator_info.key,
            subscription_id,
            gas_lane,
            interval,
            entrance_fee,
            callback_gas_limit,
            clock.unix_timestamp,
        );
        raffle.pack(&mut raffle_info.data.borrow_mut())?;

        msg!(
            "Raffle initialized: Coordinator={}, Subscription={}, Interval={}s, EntranceFee={}",
            coordinator_info.key,
            subscription_id,
            interval,
            entrance_fee
        );
        Ok(())
    }

    fn process_enter_raffle(accounts: &[AccountInfo], amount: u64, program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let player_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !player_info.is_signer {
            msg!("Player must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut raffle = Self::load_raffle(raffle_info, program_id)?;

        if amount < raffle.entrance_fee {
            msg!("Entrance fee is {} lamports, got {}", raffle.entrance_fee, amount);
            return Err(RaffleError::NotEnoughFundsEntered.into());
        }

        if raffle.state != RaffleState::Open {
            return Err(RaffleError::NotOpen.into());
        }

        if raffle.players.len() >= MAX_PLAYERS {
            return Err(RaffleError::RaffleFull.into());
        }

        invoke(
            &system_instruction::transfer(player_info.key, raffle_info.key, amount),
            &[
                player_info.clone(),
                raffle_info.clone(),
                system_program_info.clone(),
            ],
        )?;

        raffle.players.push(*player_info.key);
        raffle.pack(&mut raffle_info.data.borrow_mut())?;

        RaffleEvent::RaffleEnter {
            player: *player_info.key,
        }
        .emit();
        Ok(())
    }

    fn process_perform_upkeep(accounts: &[AccountInfo], program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let caller_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let consumer_authority_info = next_account_info(account_info_iter)?;
        let coordinator_program_info = next_account_info(account_info_iter)?;
        let config_info = next_account_info(account_info_iter)?;
        let subscription_info = next_account_info(account_info_iter)?;
        let request_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !caller_info.is_signer {
            msg!("Caller must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut raffle = Self::load_raffle(raffle_info, program_id)?;
        let clock = Clock::get()?;
        let pot = Self::pot(raffle_info)?;

        if !raffle.check_upkeep(clock.unix_timestamp, pot) {
            msg!(
                "Upkeep not needed: balance={}, players={}, state={}",
                pot,
                raffle.players.len(),
                u8::from(raffle.state)
            );
            return Err(RaffleError::UpkeepNotNeeded.into());
        }

        if *coordinator_program_info.key != raffle.vrf_coordinator {
            msg!("Coordinator does not match the one this raffle was deployed with");
            return Err(ProgramError::IncorrectProgramId);
        }

        if config_info.owner != coordinator_program_info.key {
            return Err(ProgramError::IncorrectProgramId);
        }
        let config = CoordinatorConfig::unpack_initialized(&config_info.data.borrow())
            .ok_or(ProgramError::UninitializedAccount)?;
        let request_id = config.next_request_id;

        let (consumer_authority, bump_seed) = find_consumer_authority(raffle_info.key, program_id);
        if *consumer_authority_info.key != consumer_authority {
            msg!("Invalid consumer authority address");
            return Err(ProgramError::InvalidSeeds);
        }

        invoke_signed(
            &vrf_instruction::request_random_words(
                coordinator_program_info.key,
                caller_info.key,
                raffle_info.key,
                consumer_authority_info.key,
                request_id,
                raffle.gas_lane,
                raffle.subscription_id,
                REQUEST_CONFIRMATIONS,
                raffle.callback_gas_limit,
                NUM_WORDS,
            ),
            &[
                caller_info.clone(),
                raffle_info.clone(),
                consumer_authority_info.clone(),
                config_info.clone(),
                subscription_info.clone(),
                request_info.clone(),
                system_program_info.clone(),
                coordinator_program_info.clone(),
            ],
            &[&[CONSUMER_AUTHORITY_SEED, raffle_info.key.as_ref(), &[bump_seed]]],
        )?;

        raffle.state = RaffleState::Calculating;
        raffle.pending_request_id = request_id;
        raffle.pack(&mut raffle_info.data.borrow_mut())?;

        RaffleEvent::RequestedRaffleWinner { request_id }.emit();
        Ok(())
    }

    /// Pays the whole pot to `players[words[0] % players.len()]` and opens a new round.
    ///
    /// Any failure here aborts the transaction, so a failed payout leaves the
    /// round, the player list and the pending request untouched.
    fn process_fulfill_random_words(
        accounts: &[AccountInfo],
        request_id: u64,
        random_words: &[u64],
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let coordinator_authority_info = next_account_info(account_info_iter)?;
        let raffle_info = next_account_info(account_info_iter)?;
        let candidates = account_info_iter.as_slice();

        let mut raffle = Self::load_raffle(raffle_info, program_id)?;

        let (coordinator_authority, _) = find_authority_address(&raffle.vrf_coordinator);
        if !coordinator_authority_info.is_signer || *coordinator_authority_info.key != coordinator_authority {
            return Err(RaffleError::OnlyCoordinatorCanFulfill.into());
        }

        if !raffle.has_pending_request() || raffle.pending_request_id != request_id {
            msg!("Request {} is not pending (pending={})", request_id, raffle.pending_request_id);
            return Err(RaffleError::UnknownRequest.into());
        }

        let random_word = *random_words.first().ok_or(RaffleError::InvalidInstructionData)?;
        let winner = raffle
            .winner_for(random_word)
            .ok_or(RaffleError::TransferFailed)?;

        let winner_info = candidates
            .iter()
            .find(|info| *info.key == winner && info.is_writable)
            .ok_or_else(|| {
                msg!("Winner {} was not supplied as a writable account", winner);
                RaffleError::TransferFailed
            })?;

        let pot = Self::pot(raffle_info)?;
        let raffle_lamports = raffle_info
            .lamports()
            .checked_sub(pot)
            .ok_or(RaffleError::TransferFailed)?;
        let winner_lamports = winner_info
            .lamports()
            .checked_add(pot)
            .ok_or(RaffleError::TransferFailed)?;
        **raffle_info.try_borrow_mut_lamports()? = raffle_lamports;
        **winner_info.try_borrow_mut_lamports()? = winner_lamports;

        let clock = Clock::get()?;
        raffle.recent_winner = winner;
        raffle.players.clear();
        raffle.state = RaffleState::Open;
        raffle.last_timestamp = clock.unix_timestamp;
        raffle.pending_request_id = 0;
        raffle.pack(&mut raffle_info.data.borrow_mut())?;

        msg!("Winner {} received {} lamports", winner, pot);
        RaffleEvent::WinnerPicked { winner }.emit();
        Ok(())
    }

    fn load_raffle(raffle_info: &AccountInfo, program_id: &Pubkey) -> Result<Raffle, ProgramError> {
        if raffle_info.owner != program_id {
            msg!("Raffle account must be owned by this program");
            return Err(ProgramError::IncorrectProgramId);
        }
        let raffle = Raffle::unpack_initialized(&raffle_info.data.borrow())
            .ok_or(ProgramError::UninitializedAccount)?;
        Ok(raffle)
    }

    /// Lamports held above the rent-exempt minimum
    fn pot(raffle_info: &AccountInfo) -> Result<u64, ProgramError> {
        let rent = Rent::get()?;
        Ok(raffle_info
            .lamports()
            .saturating_sub(rent.minimum_balance(raffle_info.data_len())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fulfill(program_id: &Pubkey, raffle: &Raffle, request_id: u64) -> ProgramResult {
        let (authority_key, _) = find_authority_address(&raffle.vrf_coordinator);
        let raffle_key = Pubkey::new_unique();
        let system = solana_program::system_program::id();

        let mut authority_lamports = 0;
        let mut authority_data: [u8; 0] = [];
        let mut raffle_lamports = 10_000_000_000;
        let mut raffle_data = vec![0u8; Raffle::LEN];
        raffle.pack(&mut raffle_data).unwrap();

        let accounts = [
            AccountInfo::new(&authority_key, true, false, &mut authority_lamports, &mut authority_data, &system, false, 0),
            AccountInfo::new(&raffle_key, false, true, &mut raffle_lamports, &mut raffle_data, program_id, false, 0),
        ];
        let data = RaffleInstruction::FulfillRandomWords {
            request_id,
            random_words: vec![0],
        }
        .pack();
        Processor::process(program_id, &accounts, &data)
    }

    fn calculating_raffle(pending_request_id: u64) -> Raffle {
        let mut raffle = Raffle::new(Pubkey::new_unique(), 1, [7u8; 32], 30, 100, 500_000, 0);
        raffle.players.push(Pubkey::new_unique());
        raffle.state = RaffleState::Calculating;
        raffle.pending_request_id = pending_request_id;
        raffle
    }

    #[test]
    fn fulfill_rejects_request_that_is_not_pending() {
        let program_id = Pubkey::new_unique();

        assert_eq!(
            fulfill(&program_id, &calculating_raffle(5), 6),
            Err(RaffleError::UnknownRequest.into())
        );

        let mut open = calculating_raffle(0);
        open.state = RaffleState::Open;
        assert_eq!(fulfill(&program_id, &open, 0), Err(RaffleError::UnknownRequest.into()));
    }
}
