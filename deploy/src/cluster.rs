//! Chains the deploy steps and the test harness can talk to.

use std::collections::HashSet;

use log::debug;
use raffle::vrf_coordinator_mock;
use solana_program_test::{processor, ProgramTest, ProgramTestBanksClientExt, ProgramTestContext};
use solana_sdk::{
    account::Account,
    clock::{Clock, UnixTimestamp},
    hash::Hash,
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    system_instruction,
    transaction::Transaction,
};

use crate::error::DeployError;
use crate::events::{ChainEvent, EventBus};

/// A chain the deploy steps can submit to.
///
/// `send` returns once the transaction is confirmed to the cluster's
/// required depth, and publishes the decoded events on `events()`.
#[allow(async_fn_in_trait)]
pub trait Cluster {
    fn network(&self) -> &str;

    fn payer(&self) -> &Keypair;

    fn events(&self) -> &EventBus;

    async fn send(&mut self, instructions: &[Instruction], signers: &[&Keypair]) -> Result<Vec<ChainEvent>, DeployError>;

    async fn get_account(&mut self, address: &Pubkey) -> Result<Option<Account>, DeployError>;

    async fn get_balance(&mut self, address: &Pubkey) -> Result<u64, DeployError>;

    async fn minimum_balance(&mut self, data_len: usize) -> Result<u64, DeployError>;

    async fn clock(&mut self) -> Result<Clock, DeployError>;
}

/// In-process chain with both programs loaded, used on `program-test`.
pub struct LocalCluster {
    context: ProgramTestContext,
    events: EventBus,
    // banks rejects a transaction it has already seen under the same blockhash
    sent: HashSet<Signature>,
    sent_blockhash: Hash,
}

impl LocalCluster {
    pub fn program_test() -> ProgramTest {
        let mut program_test = ProgramTest::new(
            "raffle",
            raffle::id(),
            processor!(raffle::process_instruction),
        );
        program_test.add_program(
            "vrf_coordinator_mock",
            vrf_coordinator_mock::id(),
            processor!(raffle::process_vrf_instruction),
        );
        program_test.prefer_bpf(false);
        program_test
    }

    pub async fn start() -> Self {
        Self::from_context(Self::program_test().start_with_context().await)
    }

    pub fn from_context(context: ProgramTestContext) -> Self {
        Self {
            context,
            events: EventBus::new(),
            sent: HashSet::new(),
            sent_blockhash: Hash::default(),
        }
    }

    // signatures only collide under one blockhash, forget the rest
    fn track_blockhash(&mut self, blockhash: Hash) {
        if blockhash != self.sent_blockhash {
            self.sent.clear();
            self.sent_blockhash = blockhash;
        }
    }

    /// A new keypair holding `lamports`, paid for by the payer.
    pub async fn funded_account(&mut self, lamports: u64) -> Result<Keypair, DeployError> {
        let account = Keypair::new();
        let payer = self.context.payer.pubkey();
        self.send(
            &[system_instruction::transfer(&payer, &account.pubkey(), lamports)],
            &[],
        )
        .await?;
        Ok(account)
    }

    pub async fn funded_accounts(&mut self, count: usize, lamports: u64) -> Result<Vec<Keypair>, DeployError> {
        let mut accounts = Vec::with_capacity(count);
        for _ in 0..count {
            accounts.push(self.funded_account(lamports).await?);
        }
        Ok(accounts)
    }

    /// Moves the clock forward without producing a block.
    pub async fn increase_time(&mut self, seconds: i64) -> Result<(), DeployError> {
        let mut clock = self.clock().await?;
        clock.unix_timestamp = clock.unix_timestamp.saturating_add(seconds);
        debug!("clock advanced to {}", clock.unix_timestamp);
        self.context.set_sysvar(&clock);
        Ok(())
    }

    /// Produces a block. The clock never moves backwards across it.
    pub async fn mine(&mut self) -> Result<(), DeployError> {
        let before = self.clock().await?;
        self.context.warp_to_slot(before.slot + 1)?;
        let mut after = self.clock().await?;
        if after.unix_timestamp < before.unix_timestamp {
            after.unix_timestamp = before.unix_timestamp;
            self.context.set_sysvar(&after);
        }
        self.context.last_blockhash = self
            .context
            .banks_client
            .get_new_latest_blockhash(&self.context.last_blockhash)
            .await?;
        self.track_blockhash(self.context.last_blockhash);
        Ok(())
    }

    pub async fn unix_timestamp(&mut self) -> Result<UnixTimestamp, DeployError> {
        Ok(self.clock().await?.unix_timestamp)
    }
}

impl Cluster for LocalCluster {
    fn network(&self) -> &str {
        "program-test"
    }

    fn payer(&self) -> &Keypair {
        &self.context.payer
    }

    fn events(&self) -> &EventBus {
        &self.events
    }

    async fn send(&mut self, instructions: &[Instruction], signers: &[&Keypair]) -> Result<Vec<ChainEvent>, DeployError> {
        let mut blockhash = self.context.banks_client.get_latest_blockhash().await?;
        self.track_blockhash(blockhash);
        let transaction = loop {
            let mut all_signers = vec![&self.context.payer];
            all_signers.extend_from_slice(signers);
            let transaction = Transaction::new_signed_with_payer(
                instructions,
                Some(&self.context.payer.pubkey()),
                &all_signers,
                blockhash,
            );
            if self.sent.insert(transaction.signatures[0]) {
                break transaction;
            }
            blockhash = self
                .context
                .banks_client
                .get_new_latest_blockhash(&blockhash)
                .await?;
            self.track_blockhash(blockhash);
        };

        let outcome = self
            .context
            .banks_client
            .process_transaction_with_metadata(transaction)
            .await?;
        let logs = outcome
            .metadata
            .map(|metadata| metadata.log_messages)
            .unwrap_or_default();
        if let Err(err) = outcome.result {
            for line in &logs {
                debug!("{line}");
            }
            return Err(err.into());
        }

        let events = ChainEvent::parse_logs(&logs);
        self.events.publish(&events);
        Ok(events)
    }

    async fn get_account(&mut self, address: &Pubkey) -> Result<Option<Account>, DeployError> {
        Ok(self.context.banks_client.get_account(*address).await?)
    }

    async fn get_balance(&mut self, address: &Pubkey) -> Result<u64, DeployError> {
        Ok(self.context.banks_client.get_balance(*address).await?)
    }

    async fn minimum_balance(&mut self, data_len: usize) -> Result<u64, DeployError> {
        let rent = self.context.banks_client.get_rent().await?;
        Ok(rent.minimum_balance(data_len))
    }

    async fn clock(&mut self) -> Result<Clock, DeployError> {
        Ok(self.context.banks_client.get_sysvar::<Clock>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sent_signatures_reset_with_blockhash() {
        let mut cluster = LocalCluster::start().await;
        cluster.funded_accounts(3, 1_000_000).await.unwrap();
        assert!(!cluster.sent.is_empty());

        cluster.mine().await.unwrap();
        assert!(cluster.sent.is_empty());

        cluster.funded_account(1_000_000).await.unwrap();
        assert_eq!(cluster.sent.len(), 1);
    }
}
