// Mock VRF coordinator - Errors
use solana_program::{decode_error::DecodeError, msg, program_error::PrintProgramError, program_error::ProgramError};
use thiserror::Error;

/// Codes start at 100 so they never collide with `RaffleError` codes
/// when both programs run in the same transaction.
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum VrfError {
    #[error("Invalid instruction data")]
    InvalidInstructionData = 100,

    #[error("Coordinator already initialized")]
    AlreadyInitialized,

    #[error("Coordinator not initialized")]
    NotInitialized,

    #[error("Invalid subscription")]
    InvalidSubscription,

    #[error("Must be subscription owner")]
    MustBeSubOwner,

    #[error("Too many consumers")]
    TooManyConsumers,

    #[error("Invalid consumer")]
    InvalidConsumer,

    #[error("Invalid number of random words")]
    InvalidNumWords,

    #[error("nonexistent request")]
    NonexistentRequest,

    #[error("Insufficient subscription balance")]
    InsufficientBalance,

    #[error("Arithmetic overflow")]
    Overflow,
}

impl From<VrfError> for ProgramError {
    fn from(e: VrfError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for VrfError {
    fn type_of() -> &'static str {
        "VRF Coordinator Error"
    }
}

impl PrintProgramError for VrfError {
    fn print<E>(&self) {
        msg!(&self.to_string());
    }
}

impl VrfError {
    /// Every variant, in code order.
    pub const ALL: [VrfError; 11] = [
        VrfError::InvalidInstructionData,
        VrfError::AlreadyInitialized,
        VrfError::NotInitialized,
        VrfError::InvalidSubscription,
        VrfError::MustBeSubOwner,
        VrfError::TooManyConsumers,
        VrfError::InvalidConsumer,
        VrfError::InvalidNumWords,
        VrfError::NonexistentRequest,
        VrfError::InsufficientBalance,
        VrfError::Overflow,
    ];

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|e| *e as u32 == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raffle_error::RaffleError;

    #[test]
    fn codes_do_not_overlap_raffle_errors() {
        for error in VrfError::ALL {
            assert!(RaffleError::from_code(error as u32).is_none());
            assert_eq!(VrfError::from_code(error as u32), Some(error));
        }
        assert_eq!(VrfError::NonexistentRequest.to_string(), "nonexistent request");
    }
}
