// Shared account data handling for both programs
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::program_error::ProgramError;
use std::io::Write;

/// Borsh read/write over fixed-size account data.
pub trait AccountData: BorshSerialize + BorshDeserialize + Sized {
    fn is_initialized(&self) -> bool;

    fn unpack(data: &[u8]) -> Result<Self, ProgramError> {
        let mut slice = data;
        Self::deserialize(&mut slice).map_err(|_| ProgramError::InvalidAccountData)
    }

    /// None for zeroed data or data that does not decode.
    fn unpack_initialized(data: &[u8]) -> Option<Self> {
        Self::unpack(data).ok().filter(|value| value.is_initialized())
    }

    fn pack(&self, dst: &mut [u8]) -> Result<(), ProgramError> {
        let bytes = borsh::to_vec(self).map_err(|_| ProgramError::InvalidAccountData)?;
        let mut cursor = dst;
        cursor
            .write_all(&bytes)
            .map_err(|_| ProgramError::AccountDataTooSmall)
    }
}
