// Raffle program and the mock VRF coordinator it is tested against

// Shared modules
pub mod events;
pub mod instruction;
pub mod state;
pub mod utils;

// Raffle modules
pub mod raffle_entrypoint;
pub mod raffle_error;
pub mod raffle_instruction;
pub mod raffle_processor;
pub mod raffle_state;

// Mock VRF coordinator modules
pub mod vrf_error;
pub mod vrf_instruction;
pub mod vrf_processor;
pub mod vrf_state;

use solana_program::{account_info::AccountInfo, entrypoint::ProgramResult, pubkey::Pubkey};

solana_program::declare_id!("5cPZfyb3owKyzJuufGVmmvFq2S6vRQPtfHNRBvWRRsvQ");

/// Address the mock coordinator is deployed at on local networks
pub mod vrf_coordinator_mock {
    solana_program::declare_id!("7dExQjqNUjN5Pjo4HNH7E4HFgk2zMsPJpmmJVYytkL8G");
}

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    raffle_processor::Processor::process(program_id, accounts, instruction_data)
}

pub fn process_vrf_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    vrf_processor::Processor::process(program_id, accounts, instruction_data)
}
