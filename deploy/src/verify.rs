// Source verification for public deployments
use log::{error, info};
use reqwest::StatusCode;
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;

use crate::client::RaffleParams;
use crate::error::DeployError;

#[allow(async_fn_in_trait)]
pub trait Verifier {
    async fn verify(&self, address: &Pubkey, params: &RaffleParams) -> Result<(), DeployError>;
}

#[derive(Serialize, Debug)]
struct VerificationRequest {
    address: String,
    program_id: String,
    constructor_arguments: Vec<String>,
}

/// Submits deployments to an HTTP verification service.
pub struct HttpVerifier {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl HttpVerifier {
    pub fn new(url: String, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            api_key,
        }
    }
}

/// Maps a service response to success. "Already verified" counts as success.
pub fn check_response(status: StatusCode, body: &str) -> Result<(), DeployError> {
    if body.to_lowercase().contains("already verified") {
        info!("already verified");
        return Ok(());
    }
    if status.is_success() {
        return Ok(());
    }
    error!("verification rejected with {status}: {body}");
    Err(DeployError::Verification(format!("{status}: {body}")))
}

impl Verifier for HttpVerifier {
    async fn verify(&self, address: &Pubkey, params: &RaffleParams) -> Result<(), DeployError> {
        info!("verifying {address}");
        let request = VerificationRequest {
            address: address.to_string(),
            program_id: raffle::id().to_string(),
            constructor_arguments: params.to_arguments(),
        };
        let mut builder = self.client.post(&self.url).json(&request);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        check_response(status, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_verified_is_swallowed() {
        assert!(check_response(StatusCode::BAD_REQUEST, "Contract source code Already Verified").is_ok());
        assert!(check_response(StatusCode::OK, "{\"status\":\"ok\"}").is_ok());
    }

    #[test]
    fn other_rejections_propagate() {
        let err = check_response(StatusCode::INTERNAL_SERVER_ERROR, "bytecode mismatch").unwrap_err();
        assert!(matches!(err, DeployError::Verification(message) if message.contains("bytecode mismatch")));
    }
}
