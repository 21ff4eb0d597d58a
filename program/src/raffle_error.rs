use solana_program::{decode_error::DecodeError, msg, program_error::PrintProgramError, program_error::ProgramError};
use thiserror::Error;

/// Errors that may be returned by the Raffle program
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum RaffleError {
    /// Invalid instruction data passed
    #[error("Invalid instruction data")]
    InvalidInstructionData,

    /// Raffle account is already initialized
    #[error("Raffle already initialized")]
    AlreadyInitialized,

    /// Payment is below the entrance fee
    #[error("Not enough lamports entered")]
    NotEnoughFundsEntered,

    /// A randomness request is outstanding, entries are closed
    #[error("Raffle is not open")]
    NotOpen,

    /// The player list has reached capacity
    #[error("Raffle is full")]
    RaffleFull,

    /// perform_upkeep was called while check_upkeep is false
    #[error("Upkeep not needed")]
    UpkeepNotNeeded,

    /// Paying out the pot to the winner failed
    #[error("Transfer to winner failed")]
    TransferFailed,

    /// Callback was not signed by the configured coordinator
    #[error("Only the VRF coordinator can fulfill")]
    OnlyCoordinatorCanFulfill,

    /// Callback request id does not match the outstanding request
    #[error("Unknown randomness request")]
    UnknownRequest,

    /// Requested player index is past the end of the list
    #[error("Player index out of range")]
    PlayerIndexOutOfRange,
}

impl From<RaffleError> for ProgramError {
    fn from(e: RaffleError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for RaffleError {
    fn type_of() -> &'static str {
        "Raffle Error"
    }
}

impl PrintProgramError for RaffleError {
    fn print<E>(&self) {
        msg!(&self.to_string());
    }
}

impl RaffleError {
    /// Every variant, in code order.
    pub const ALL: [RaffleError; 10] = [
        RaffleError::InvalidInstructionData,
        RaffleError::AlreadyInitialized,
        RaffleError::NotEnoughFundsEntered,
        RaffleError::NotOpen,
        RaffleError::RaffleFull,
        RaffleError::UpkeepNotNeeded,
        RaffleError::TransferFailed,
        RaffleError::OnlyCoordinatorCanFulfill,
        RaffleError::UnknownRequest,
        RaffleError::PlayerIndexOutOfRange,
    ];

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|e| *e as u32 == code)
    }
}
