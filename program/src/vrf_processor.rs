// Mock VRF coordinator for development networks.
//
// Answers randomness requests on demand instead of through an oracle: whoever
// calls FulfillRandomWords delivers hash-derived (or caller-chosen) words to
// the consumer program, signed by the coordinator authority PDA.
use crate::events::VrfEvent;
use crate::state::AccountData;
use crate::utils::mock_random_words;
use crate::vrf_error::VrfError;
use crate::vrf_instruction::{pack_fulfill_callback, VrfInstruction};
use crate::vrf_state::{
    find_authority_address, find_config_address, find_request_address, find_subscription_address,
    CoordinatorConfig, RandomnessRequest, Subscription, AUTHORITY_SEED, CONFIG_SEED,
    CONSUMER_AUTHORITY_SEED, MAX_CONSUMERS, MAX_NUM_WORDS, REQUEST_SEED, SUBSCRIPTION_SEED,
};

use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    instruction::{AccountMeta, Instruction},
    msg,
    program::invoke_signed,
    program_error::ProgramError,
    pubkey::Pubkey,
    system_instruction,
    sysvar::{rent::Rent, Sysvar},
};

pub struct Processor;

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction =
            VrfInstruction::unpack(instruction_data).map_err(|_| VrfError::InvalidInstructionData)?;

        match instruction {
            VrfInstruction::Initialize {
                base_fee,
                gas_price_link,
            } => {
                msg!("Instruction: Initialize Coordinator");
                Self::process_initialize(accounts, base_fee, gas_price_link, program_id)
            }
            VrfInstruction::CreateSubscription {} => {
                msg!("Instruction: Create Subscription");
                Self::process_create_subscription(accounts, program_id)
            }
            VrfInstruction::FundSubscription {
                subscription_id,
                amount,
            } => {
                msg!("Instruction: Fund Subscription");
                Self::process_fund_subscription(accounts, subscription_id, amount, program_id)
            }
            VrfInstruction::AddConsumer {
                subscription_id,
                consumer,
            } => {
                msg!("Instruction: Add Consumer");
                Self::process_add_consumer(accounts, subscription_id, consumer, program_id)
            }
            VrfInstruction::RemoveConsumer {
                subscription_id,
                consumer,
            } => {
                msg!("Instruction: Remove Consumer");
                Self::process_remove_consumer(accounts, subscription_id, consumer, program_id)
            }
            VrfInstruction::RequestRandomWords {
                key_hash,
                subscription_id,
                request_confirmations,
                callback_gas_limit,
                num_words,
            } => {
                msg!("Instruction: Request Random Words");
                Self::process_request_random_words(
                    accounts,
                    key_hash,
                    subscription_id,
                    request_confirmations,
                    callback_gas_limit,
                    num_words,
                    program_id,
                )
            }
            VrfInstruction::FulfillRandomWords { request_id } => {
                msg!("Instruction: Fulfill Random Words");
                Self::process_fulfill_random_words(accounts, request_id, None, program_id)
            }
            VrfInstruction::FulfillRandomWordsWithOverride { request_id, words } => {
                msg!("Instruction: Fulfill Random Words With Override");
                Self::process_fulfill_random_words(accounts, request_id, Some(words), program_id)
            }
        }
    }

    fn process_initialize(
        accounts: &[AccountInfo],
        base_fee: u64,
        gas_price_link: u64,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let authority_info = next_account_info(account_info_iter)?;
        let config_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !authority_info.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        let (expected_config, bump_seed) = find_config_address(program_id);
        if *config_info.key != expected_config {
            msg!("Invalid config account address");
            return Err(ProgramError::InvalidSeeds);
        }

        if config_info.owner == program_id {
            msg!("Coordinator config already exists");
            return Err(VrfError::AlreadyInitialized.into());
        }

        Self::create_pda_account(
            authority_info,
            config_info,
            system_program_info,
            CoordinatorConfig::LEN,
            program_id,
            &[CONFIG_SEED, &[bump_seed]],
        )?;

        CoordinatorConfig::new(base_fee, gas_price_link).pack(&mut config_info.data.borrow_mut())?;

        msg!("Coordinator initialized: BaseFee={}, GasPriceLink={}", base_fee, gas_price_link);
        Ok(())
    }

    fn process_create_subscription(accounts: &[AccountInfo], program_id: &Pubkey) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let owner_info = next_account_info(account_info_iter)?;
        let config_info = next_account_info(account_info_iter)?;
        let subscription_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !owner_info.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut config = Self::load_config(config_info, program_id)?;
        let subscription_id = config.next_subscription_id;

        let (expected_subscription, bump_seed) = find_subscription_address(program_id, subscription_id);
        if *subscription_info.key != expected_subscription {
            msg!("Subscription account does not match id {}", subscription_id);
            return Err(ProgramError::InvalidSeeds);
        }

        Self::create_pda_account(
            owner_info,
            subscription_info,
            system_program_info,
            Subscription::LEN,
            program_id,
            &[SUBSCRIPTION_SEED, &subscription_id.to_le_bytes(), &[bump_seed]],
        )?;

        let subscription = Subscription {
            is_initialized: true,
            id: subscription_id,
            owner: *owner_info.key,
            balance: 0,
            consumers: Vec::new(),
        };
        subscription.pack(&mut subscription_info.data.borrow_mut())?;

        config.next_subscription_id = subscription_id.checked_add(1).ok_or(VrfError::Overflow)?;
        config.pack(&mut config_info.data.borrow_mut())?;

        VrfEvent::SubscriptionCreated {
            subscription_id,
            owner: *owner_info.key,
        }
        .emit();
        Ok(())
    }

    fn process_fund_subscription(
        accounts: &[AccountInfo],
        subscription_id: u64,
        amount: u64,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let funder_info = next_account_info(account_info_iter)?;
        let subscription_info = next_account_info(account_info_iter)?;

        if !funder_info.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut subscription = Self::load_subscription(subscription_info, subscription_id, program_id)?;
        let old_balance = subscription.balance;
        subscription.balance = old_balance.checked_add(amount).ok_or(VrfError::Overflow)?;
        subscription.pack(&mut subscription_info.data.borrow_mut())?;

        VrfEvent::SubscriptionFunded {
            subscription_id,
            old_balance,
            new_balance: subscription.balance,
        }
        .emit();
        Ok(())
    }

    fn process_add_consumer(
        accounts: &[AccountInfo],
        subscription_id: u64,
        consumer: Pubkey,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let owner_info = next_account_info(account_info_iter)?;
        let subscription_info = next_account_info(account_info_iter)?;

        let mut subscription = Self::load_subscription(subscription_info, subscription_id, program_id)?;
        Self::check_owner(owner_info, &subscription)?;

        if subscription.is_consumer(&consumer) {
            // already added, nothing to do
            return Ok(());
        }
        if subscription.consumers.len() >= MAX_CONSUMERS {
            return Err(VrfError::TooManyConsumers.into());
        }

        subscription.consumers.push(consumer);
        subscription.pack(&mut subscription_info.data.borrow_mut())?;

        VrfEvent::ConsumerAdded {
            subscription_id,
            consumer,
        }
        .emit();
        Ok(())
    }

    fn process_remove_consumer(
        accounts: &[AccountInfo],
        subscription_id: u64,
        consumer: Pubkey,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let owner_info = next_account_info(account_info_iter)?;
        let subscription_info = next_account_info(account_info_iter)?;

        let mut subscription = Self::load_subscription(subscription_info, subscription_id, program_id)?;
        Self::check_owner(owner_info, &subscription)?;

        if !subscription.is_consumer(&consumer) {
            return Err(VrfError::InvalidConsumer.into());
        }

        subscription.consumers.retain(|key| *key != consumer);
        // the shrunk vector leaves stale bytes behind, clear them first
        subscription_info.data.borrow_mut().fill(0);
        subscription.pack(&mut subscription_info.data.borrow_mut())?;

        VrfEvent::ConsumerRemoved {
            subscription_id,
            consumer,
        }
        .emit();
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn process_request_random_words(
        accounts: &[AccountInfo],
        key_hash: [u8; 32],
        subscription_id: u64,
        request_confirmations: u16,
        callback_gas_limit: u32,
        num_words: u32,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let payer_info = next_account_info(account_info_iter)?;
        let consumer_info = next_account_info(account_info_iter)?;
        let consumer_authority_info = next_account_info(account_info_iter)?;
        let config_info = next_account_info(account_info_iter)?;
        let subscription_info = next_account_info(account_info_iter)?;
        let request_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !payer_info.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut config = Self::load_config(config_info, program_id)?;
        let subscription = Self::load_subscription(subscription_info, subscription_id, program_id)?;

        if !subscription.is_consumer(consumer_info.key) {
            msg!("{} is not a consumer of subscription {}", consumer_info.key, subscription_id);
            return Err(VrfError::InvalidConsumer.into());
        }

        let (expected_authority, _) = Pubkey::find_program_address(
            &[CONSUMER_AUTHORITY_SEED, consumer_info.key.as_ref()],
            consumer_info.owner,
        );
        if !consumer_authority_info.is_signer || *consumer_authority_info.key != expected_authority {
            msg!("Request was not signed by the consumer's authority");
            return Err(VrfError::InvalidConsumer.into());
        }

        if num_words == 0 || num_words > MAX_NUM_WORDS {
            return Err(VrfError::InvalidNumWords.into());
        }

        let request_id = config.next_request_id;
        let (expected_request, bump_seed) = find_request_address(program_id, request_id);
        if *request_info.key != expected_request {
            msg!("Request account does not match id {}", request_id);
            return Err(ProgramError::InvalidSeeds);
        }

        Self::create_pda_account(
            payer_info,
            request_info,
            system_program_info,
            RandomnessRequest::LEN,
            program_id,
            &[REQUEST_SEED, &request_id.to_le_bytes(), &[bump_seed]],
        )?;

        let request = RandomnessRequest {
            is_initialized: true,
            id: request_id,
            subscription_id,
            consumer: *consumer_info.key,
            consumer_program: *consumer_info.owner,
            key_hash,
            request_confirmations,
            callback_gas_limit,
            num_words,
        };
        request.pack(&mut request_info.data.borrow_mut())?;

        config.next_request_id = request_id.checked_add(1).ok_or(VrfError::Overflow)?;
        config.pack(&mut config_info.data.borrow_mut())?;

        VrfEvent::RandomWordsRequested {
            key_hash,
            request_id,
            subscription_id,
            request_confirmations,
            callback_gas_limit,
            num_words,
            sender: *consumer_info.key,
        }
        .emit();
        Ok(())
    }

    /// Deletes the request, charges the subscription and calls the consumer back.
    fn process_fulfill_random_words(
        accounts: &[AccountInfo],
        request_id: u64,
        words_override: Option<Vec<u64>>,
        program_id: &Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let fulfiller_info = next_account_info(account_info_iter)?;
        let config_info = next_account_info(account_info_iter)?;
        let request_info = next_account_info(account_info_iter)?;
        let subscription_info = next_account_info(account_info_iter)?;
        let authority_info = next_account_info(account_info_iter)?;
        let consumer_program_info = next_account_info(account_info_iter)?;
        let consumer_info = next_account_info(account_info_iter)?;
        let forwarded = account_info_iter.as_slice();

        if !fulfiller_info.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        let config = Self::load_config(config_info, program_id)?;

        let (expected_request, _) = find_request_address(program_id, request_id);
        if *request_info.key != expected_request || request_info.owner != program_id {
            return Err(VrfError::NonexistentRequest.into());
        }
        let request = RandomnessRequest::unpack_initialized(&request_info.data.borrow())
            .filter(|request| request.id == request_id)
            .ok_or(VrfError::NonexistentRequest)?;

        if *consumer_info.key != request.consumer || *consumer_program_info.key != request.consumer_program {
            return Err(VrfError::InvalidConsumer.into());
        }

        let mut subscription =
            Self::load_subscription(subscription_info, request.subscription_id, program_id)?;

        let words = match words_override {
            Some(words) if words.len() != request.num_words as usize => {
                msg!("Expected {} words, got {}", request.num_words, words.len());
                return Err(VrfError::InvalidNumWords.into());
            }
            Some(words) => words,
            None => mock_random_words(request_id, request.num_words),
        };

        let payment = config
            .payment(request.callback_gas_limit)
            .ok_or(VrfError::Overflow)?;
        if subscription.balance < payment {
            return Err(VrfError::InsufficientBalance.into());
        }

        let (authority, bump_seed) = find_authority_address(program_id);
        if *authority_info.key != authority {
            return Err(ProgramError::InvalidSeeds);
        }

        let mut metas = vec![
            AccountMeta::new_readonly(authority, true),
            AccountMeta::new(*consumer_info.key, false),
        ];
        metas.extend(forwarded.iter().map(|info| AccountMeta {
            pubkey: *info.key,
            is_signer: false,
            is_writable: info.is_writable,
        }));

        let mut callback_accounts = vec![
            authority_info.clone(),
            consumer_info.clone(),
            consumer_program_info.clone(),
        ];
        callback_accounts.extend(forwarded.iter().cloned());

        invoke_signed(
            &Instruction {
                program_id: request.consumer_program,
                accounts: metas,
                data: pack_fulfill_callback(request_id, &words),
            },
            &callback_accounts,
            &[&[AUTHORITY_SEED, &[bump_seed]]],
        )?;

        subscription.balance -= payment;
        subscription.pack(&mut subscription_info.data.borrow_mut())?;

        // close the request so the same id can never be answered twice
        let fulfiller_lamports = fulfiller_info
            .lamports()
            .checked_add(request_info.lamports())
            .ok_or(VrfError::Overflow)?;
        **request_info.try_borrow_mut_lamports()? = 0;
        **fulfiller_info.try_borrow_mut_lamports()? = fulfiller_lamports;
        request_info.data.borrow_mut().fill(0);

        VrfEvent::RandomWordsFulfilled {
            request_id,
            output_seed: request_id,
            payment,
            success: true,
        }
        .emit();
        Ok(())
    }

    fn load_config(config_info: &AccountInfo, program_id: &Pubkey) -> Result<CoordinatorConfig, ProgramError> {
        if config_info.owner != program_id || *config_info.key != find_config_address(program_id).0 {
            return Err(VrfError::NotInitialized.into());
        }
        CoordinatorConfig::unpack_initialized(&config_info.data.borrow()).ok_or_else(|| VrfError::NotInitialized.into())
    }

    fn load_subscription(
        subscription_info: &AccountInfo,
        subscription_id: u64,
        program_id: &Pubkey,
    ) -> Result<Subscription, ProgramError> {
        if subscription_info.owner != program_id {
            return Err(VrfError::InvalidSubscription.into());
        }
        Subscription::unpack_initialized(&subscription_info.data.borrow())
            .filter(|subscription| subscription.id == subscription_id)
            .ok_or_else(|| VrfError::InvalidSubscription.into())
    }

    fn check_owner(owner_info: &AccountInfo, subscription: &Subscription) -> ProgramResult {
        if !owner_info.is_signer || *owner_info.key != subscription.owner {
            msg!("Only the subscription owner {} may change consumers", subscription.owner);
            return Err(VrfError::MustBeSubOwner.into());
        }
        Ok(())
    }

    fn create_pda_account<'a>(
        payer_info: &AccountInfo<'a>,
        new_account_info: &AccountInfo<'a>,
        system_program_info: &AccountInfo<'a>,
        space: usize,
        program_id: &Pubkey,
        signer_seeds: &[&[u8]],
    ) -> ProgramResult {
        let rent = Rent::get()?;
        invoke_signed(
            &system_instruction::create_account(
                payer_info.key,
                new_account_info.key,
                rent.minimum_balance(space),
                space as u64,
                program_id,
            ),
            &[
                payer_info.clone(),
                new_account_info.clone(),
                system_program_info.clone(),
            ],
            &[signer_seeds],
        )
    }
}
