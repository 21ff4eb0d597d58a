use std::time::Duration;

use raffle::{raffle_error::RaffleError, vrf_error::VrfError};
use solana_client::client_error::ClientError;
use solana_program_test::{BanksClientError, ProgramTestError};
use solana_sdk::{instruction::InstructionError, pubkey::Pubkey, transaction::TransactionError};
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum DeployError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("banks client error: {0}")]
    Banks(#[from] BanksClientError),

    #[error("rpc client error: {0}")]
    Rpc(#[from] ClientError),

    #[error("transaction failed: {0}")]
    Transaction(#[from] TransactionError),

    #[error("program test error: {0:?}")]
    ProgramTest(ProgramTestError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Raffle(#[from] RaffleError),

    #[error(transparent)]
    Vrf(#[from] VrfError),

    #[error("account {0} not found")]
    AccountNotFound(Pubkey),

    #[error("account {0} does not hold the expected data")]
    InvalidAccountData(Pubkey),

    #[error("transaction did not emit {0}")]
    MissingEvent(&'static str),

    #[error("timed out after {timeout:?} waiting for {event}")]
    EventTimeout {
        event: &'static str,
        timeout: Duration,
    },

    #[error("event stream closed")]
    EventStreamClosed,

    #[error("verification failed: {0}")]
    Verification(String),
}

impl From<ProgramTestError> for DeployError {
    fn from(e: ProgramTestError) -> Self {
        DeployError::ProgramTest(e)
    }
}

impl DeployError {
    pub fn transaction_error(&self) -> Option<TransactionError> {
        match self {
            DeployError::Transaction(e) => Some(e.clone()),
            DeployError::Banks(BanksClientError::TransactionError(e))
            | DeployError::Banks(BanksClientError::SimulationError { err: e, .. }) => Some(e.clone()),
            DeployError::Rpc(e) => e.get_transaction_error(),
            _ => None,
        }
    }

    /// Code of the custom program error that rejected the transaction, if any.
    pub fn custom_code(&self) -> Option<u32> {
        match self.transaction_error()? {
            TransactionError::InstructionError(_, InstructionError::Custom(code)) => Some(code),
            _ => None,
        }
    }

    pub fn raffle_error(&self) -> Option<RaffleError> {
        if let DeployError::Raffle(e) = self {
            return Some(*e);
        }
        self.custom_code().and_then(RaffleError::from_code)
    }

    pub fn vrf_error(&self) -> Option<VrfError> {
        if let DeployError::Vrf(e) = self {
            return Some(*e);
        }
        self.custom_code().and_then(VrfError::from_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_codes_map_back_to_program_errors() {
        let err = DeployError::from(TransactionError::InstructionError(
            0,
            InstructionError::Custom(VrfError::NonexistentRequest as u32),
        ));
        assert_eq!(err.vrf_error(), Some(VrfError::NonexistentRequest));
        assert_eq!(err.raffle_error(), None);

        let err = DeployError::from(BanksClientError::TransactionError(
            TransactionError::InstructionError(1, InstructionError::Custom(RaffleError::NotOpen as u32)),
        ));
        assert_eq!(err.raffle_error(), Some(RaffleError::NotOpen));

        let err = DeployError::MissingEvent("WinnerPicked");
        assert_eq!(err.custom_code(), None);
    }
}
