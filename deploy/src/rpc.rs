// Remote cluster reached over JSON-RPC
use std::time::Duration;

use log::{debug, info};
use solana_client::{nonblocking::rpc_client::RpcClient, rpc_config::RpcTransactionConfig};
use solana_sdk::{
    account::{from_account, Account},
    clock::Clock,
    commitment_config::CommitmentConfig,
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    sysvar,
    transaction::Transaction,
};
use solana_transaction_status::{option_serializer::OptionSerializer, UiTransactionEncoding};

use crate::cluster::Cluster;
use crate::error::DeployError;
use crate::events::{ChainEvent, EventBus};

const CONFIRMATION_POLL: Duration = Duration::from_millis(500);

pub struct RpcCluster {
    network: String,
    client: RpcClient,
    payer: Keypair,
    confirmations: u64,
    events: EventBus,
}

impl RpcCluster {
    pub fn new(network: &str, rpc_url: String, payer: Keypair, confirmations: u64) -> Self {
        Self {
            network: network.to_string(),
            client: RpcClient::new_with_commitment(rpc_url, CommitmentConfig::confirmed()),
            payer,
            confirmations,
            events: EventBus::new(),
        }
    }

    /// Blocks until `signature` has at least `self.confirmations` confirmations.
    /// A rooted transaction reports no count and counts as deep enough.
    async fn wait_for_confirmations(&self, signature: &Signature) -> Result<(), DeployError> {
        loop {
            let statuses = self.client.get_signature_statuses(&[*signature]).await?.value;
            if let Some(Some(status)) = statuses.into_iter().next() {
                if let Some(err) = status.err {
                    return Err(err.into());
                }
                match status.confirmations {
                    None => return Ok(()),
                    Some(depth) if depth as u64 >= self.confirmations => return Ok(()),
                    Some(depth) => debug!("{signature}: {depth}/{} confirmations", self.confirmations),
                }
            }
            tokio::time::sleep(CONFIRMATION_POLL).await;
        }
    }

    async fn transaction_logs(&self, signature: &Signature) -> Result<Vec<String>, DeployError> {
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::Json),
            commitment: Some(CommitmentConfig::confirmed()),
            max_supported_transaction_version: Some(0),
        };
        let transaction = self.client.get_transaction_with_config(signature, config).await?;
        Ok(match transaction.transaction.meta.map(|meta| meta.log_messages) {
            Some(OptionSerializer::Some(logs)) => logs,
            _ => Vec::new(),
        })
    }
}

impl Cluster for RpcCluster {
    fn network(&self) -> &str {
        &self.network
    }

    fn payer(&self) -> &Keypair {
        &self.payer
    }

    fn events(&self) -> &EventBus {
        &self.events
    }

    async fn send(&mut self, instructions: &[Instruction], signers: &[&Keypair]) -> Result<Vec<ChainEvent>, DeployError> {
        let blockhash = self.client.get_latest_blockhash().await?;
        let mut all_signers = vec![&self.payer];
        all_signers.extend_from_slice(signers);
        let transaction = Transaction::new_signed_with_payer(
            instructions,
            Some(&self.payer.pubkey()),
            &all_signers,
            blockhash,
        );

        let signature = self.client.send_and_confirm_transaction(&transaction).await?;
        info!("{}: sent {signature}", self.network);
        self.wait_for_confirmations(&signature).await?;

        let events = ChainEvent::parse_logs(&self.transaction_logs(&signature).await?);
        self.events.publish(&events);
        Ok(events)
    }

    async fn get_account(&mut self, address: &Pubkey) -> Result<Option<Account>, DeployError> {
        let response = self
            .client
            .get_account_with_commitment(address, CommitmentConfig::confirmed())
            .await?;
        Ok(response.value)
    }

    async fn get_balance(&mut self, address: &Pubkey) -> Result<u64, DeployError> {
        Ok(self.client.get_balance(address).await?)
    }

    async fn minimum_balance(&mut self, data_len: usize) -> Result<u64, DeployError> {
        Ok(self
            .client
            .get_minimum_balance_for_rent_exemption(data_len)
            .await?)
    }

    async fn clock(&mut self) -> Result<Clock, DeployError> {
        let account = self.client.get_account(&sysvar::clock::id()).await?;
        from_account::<Clock, _>(&account).ok_or(DeployError::InvalidAccountData(sysvar::clock::id()))
    }
}
