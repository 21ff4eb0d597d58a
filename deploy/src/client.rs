//! Typed handles over the two programs.
//!
//! Each method builds the instruction with the program crate's builders,
//! submits it through a `Cluster` and decodes the resulting account state or
//! events.

use log::info;
use raffle::{
    events::{RaffleEvent, VrfEvent},
    raffle_instruction,
    raffle_state::{Raffle, RaffleState, NUM_WORDS, REQUEST_CONFIRMATIONS},
    state::AccountData,
    utils::mock_random_words,
    vrf_instruction,
    vrf_error::VrfError,
    vrf_state::{find_config_address, find_subscription_address, CoordinatorConfig, Subscription, MAX_NUM_WORDS},
};
use solana_sdk::{
    clock::UnixTimestamp,
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    system_instruction,
};

use crate::cluster::Cluster;
use crate::error::DeployError;
use crate::events::ChainEvent;

async fn load<T: AccountData, C: Cluster>(cluster: &mut C, address: &Pubkey) -> Result<T, DeployError> {
    let account = cluster
        .get_account(address)
        .await?
        .ok_or(DeployError::AccountNotFound(*address))?;
    T::unpack_initialized(&account.data).ok_or(DeployError::InvalidAccountData(*address))
}

/// Constructor parameters of a raffle instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaffleParams {
    pub vrf_coordinator: Pubkey,
    pub subscription_id: u64,
    pub gas_lane: [u8; 32],
    pub interval: u64,
    pub entrance_fee: u64,
    pub callback_gas_limit: u32,
}

impl RaffleParams {
    /// Arguments in constructor order, rendered for the verification service.
    pub fn to_arguments(&self) -> Vec<String> {
        vec![
            self.vrf_coordinator.to_string(),
            self.subscription_id.to_string(),
            format!("0x{}", hex::encode(self.gas_lane)),
            self.interval.to_string(),
            self.entrance_fee.to_string(),
            self.callback_gas_limit.to_string(),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaffleClient {
    pub program_id: Pubkey,
    pub address: Pubkey,
}

impl RaffleClient {
    pub fn new(address: Pubkey) -> Self {
        Self {
            program_id: raffle::id(),
            address,
        }
    }

    /// Allocates the raffle account and initializes it in one transaction.
    pub async fn create<C: Cluster>(cluster: &mut C, params: &RaffleParams) -> Result<Self, DeployError> {
        let account = Keypair::new();
        let client = Self::new(account.pubkey());
        let deployer = cluster.payer().pubkey();
        let lamports = cluster.minimum_balance(Raffle::LEN).await?;

        cluster
            .send(
                &[
                    system_instruction::create_account(
                        &deployer,
                        &client.address,
                        lamports,
                        Raffle::LEN as u64,
                        &client.program_id,
                    ),
                    raffle_instruction::initialize(
                        &client.program_id,
                        &deployer,
                        &client.address,
                        &params.vrf_coordinator,
                        params.subscription_id,
                        params.gas_lane,
                        params.interval,
                        params.entrance_fee,
                        params.callback_gas_limit,
                    ),
                ],
                &[&account],
            )
            .await?;

        info!("raffle deployed at {}", client.address);
        Ok(client)
    }

    pub async fn state<C: Cluster>(&self, cluster: &mut C) -> Result<Raffle, DeployError> {
        load(cluster, &self.address).await
    }

    /// Lamports held above the rent-exempt minimum.
    pub async fn pot<C: Cluster>(&self, cluster: &mut C) -> Result<u64, DeployError> {
        let balance = cluster.get_balance(&self.address).await?;
        let minimum = cluster.minimum_balance(Raffle::LEN).await?;
        Ok(balance.saturating_sub(minimum))
    }

    pub async fn enter<C: Cluster>(&self, cluster: &mut C, player: &Keypair, amount: u64) -> Result<(), DeployError> {
        let instruction = raffle_instruction::enter_raffle(&self.program_id, &player.pubkey(), &self.address, amount);
        cluster.send(&[instruction], &[player]).await?;
        Ok(())
    }

    /// Evaluated with the same predicate the program applies.
    pub async fn check_upkeep<C: Cluster>(&self, cluster: &mut C) -> Result<bool, DeployError> {
        let raffle = self.state(cluster).await?;
        let pot = self.pot(cluster).await?;
        let now = cluster.clock().await?.unix_timestamp;
        Ok(raffle.check_upkeep(now, pot))
    }

    /// Returns the id of the randomness request the raffle issued.
    pub async fn perform_upkeep<C: Cluster>(&self, cluster: &mut C) -> Result<u64, DeployError> {
        let raffle = self.state(cluster).await?;
        let coordinator = CoordinatorClient::new(raffle.vrf_coordinator);
        let next_request_id = coordinator.config(cluster).await?.next_request_id;
        let caller = cluster.payer().pubkey();

        let instruction = raffle_instruction::perform_upkeep(
            &self.program_id,
            &caller,
            &self.address,
            &raffle.vrf_coordinator,
            raffle.subscription_id,
            next_request_id,
        );
        let events = cluster.send(&[instruction], &[]).await?;
        events
            .iter()
            .find_map(|event| match event {
                ChainEvent::Raffle(RaffleEvent::RequestedRaffleWinner { request_id }) => Some(*request_id),
                _ => None,
            })
            .ok_or(DeployError::MissingEvent("RequestedRaffleWinner"))
    }

    pub async fn entrance_fee<C: Cluster>(&self, cluster: &mut C) -> Result<u64, DeployError> {
        Ok(self.state(cluster).await?.entrance_fee)
    }

    pub async fn interval<C: Cluster>(&self, cluster: &mut C) -> Result<u64, DeployError> {
        Ok(self.state(cluster).await?.interval)
    }

    pub async fn raffle_state<C: Cluster>(&self, cluster: &mut C) -> Result<RaffleState, DeployError> {
        Ok(self.state(cluster).await?.state)
    }

    pub async fn player<C: Cluster>(&self, cluster: &mut C, index: usize) -> Result<Pubkey, DeployError> {
        Ok(self.state(cluster).await?.player(index)?)
    }

    pub async fn num_players<C: Cluster>(&self, cluster: &mut C) -> Result<usize, DeployError> {
        Ok(self.state(cluster).await?.num_players())
    }

    pub async fn recent_winner<C: Cluster>(&self, cluster: &mut C) -> Result<Pubkey, DeployError> {
        Ok(self.state(cluster).await?.recent_winner)
    }

    pub async fn last_timestamp<C: Cluster>(&self, cluster: &mut C) -> Result<UnixTimestamp, DeployError> {
        Ok(self.state(cluster).await?.last_timestamp)
    }

    pub fn request_confirmations(&self) -> u16 {
        REQUEST_CONFIRMATIONS
    }

    pub fn num_words(&self) -> u32 {
        NUM_WORDS
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorClient {
    pub program_id: Pubkey,
}

impl CoordinatorClient {
    pub fn new(program_id: Pubkey) -> Self {
        Self { program_id }
    }

    pub fn config_address(&self) -> Pubkey {
        find_config_address(&self.program_id).0
    }

    pub async fn initialize<C: Cluster>(&self, cluster: &mut C, base_fee: u64, gas_price_link: u64) -> Result<(), DeployError> {
        let authority = cluster.payer().pubkey();
        let instruction = vrf_instruction::initialize(&self.program_id, &authority, base_fee, gas_price_link);
        cluster.send(&[instruction], &[]).await?;
        Ok(())
    }

    pub async fn is_initialized<C: Cluster>(&self, cluster: &mut C) -> Result<bool, DeployError> {
        let account = cluster.get_account(&self.config_address()).await?;
        Ok(account
            .filter(|account| account.owner == self.program_id)
            .and_then(|account| CoordinatorConfig::unpack_initialized(&account.data))
            .is_some())
    }

    pub async fn config<C: Cluster>(&self, cluster: &mut C) -> Result<CoordinatorConfig, DeployError> {
        load(cluster, &self.config_address()).await
    }

    pub async fn subscription<C: Cluster>(&self, cluster: &mut C, subscription_id: u64) -> Result<Subscription, DeployError> {
        load(cluster, &find_subscription_address(&self.program_id, subscription_id).0).await
    }

    /// Returns the id announced by `SubscriptionCreated`.
    pub async fn create_subscription<C: Cluster>(&self, cluster: &mut C) -> Result<u64, DeployError> {
        let next_subscription_id = self.config(cluster).await?.next_subscription_id;
        let owner = cluster.payer().pubkey();
        let instruction = vrf_instruction::create_subscription(&self.program_id, &owner, next_subscription_id);
        let events = cluster.send(&[instruction], &[]).await?;
        events
            .iter()
            .find_map(|event| match event {
                ChainEvent::Vrf(VrfEvent::SubscriptionCreated { subscription_id, .. }) => Some(*subscription_id),
                _ => None,
            })
            .ok_or(DeployError::MissingEvent("SubscriptionCreated"))
    }

    pub async fn fund_subscription<C: Cluster>(&self, cluster: &mut C, subscription_id: u64, amount: u64) -> Result<(), DeployError> {
        let funder = cluster.payer().pubkey();
        let instruction = vrf_instruction::fund_subscription(&self.program_id, &funder, subscription_id, amount);
        cluster.send(&[instruction], &[]).await?;
        Ok(())
    }

    pub async fn add_consumer<C: Cluster>(&self, cluster: &mut C, subscription_id: u64, consumer: &Pubkey) -> Result<(), DeployError> {
        let owner = cluster.payer().pubkey();
        let instruction = vrf_instruction::add_consumer(&self.program_id, &owner, subscription_id, consumer);
        cluster.send(&[instruction], &[]).await?;
        Ok(())
    }

    pub async fn remove_consumer<C: Cluster>(&self, cluster: &mut C, subscription_id: u64, consumer: &Pubkey) -> Result<(), DeployError> {
        let owner = cluster.payer().pubkey();
        let instruction = vrf_instruction::remove_consumer(&self.program_id, &owner, subscription_id, consumer);
        cluster.send(&[instruction], &[]).await?;
        Ok(())
    }

    /// Answers `request_id` with hash-derived words.
    pub async fn fulfill_random_words<C: Cluster>(&self, cluster: &mut C, request_id: u64, consumer: &RaffleClient) -> Result<(), DeployError> {
        self.fulfill(cluster, request_id, consumer, None).await
    }

    pub async fn fulfill_random_words_with_override<C: Cluster>(
        &self,
        cluster: &mut C,
        request_id: u64,
        consumer: &RaffleClient,
        words: Vec<u64>,
    ) -> Result<(), DeployError> {
        if words.len() > MAX_NUM_WORDS as usize {
            return Err(VrfError::InvalidNumWords.into());
        }
        self.fulfill(cluster, request_id, consumer, Some(words)).await
    }

    async fn fulfill<C: Cluster>(
        &self,
        cluster: &mut C,
        request_id: u64,
        consumer: &RaffleClient,
        words: Option<Vec<u64>>,
    ) -> Result<(), DeployError> {
        let raffle = consumer.state(cluster).await?;
        let fulfiller = cluster.payer().pubkey();
        // only the account the delivered word selects has to be forwarded
        let first_word = match &words {
            Some(words) => words.first().copied(),
            None => mock_random_words(request_id, NUM_WORDS).first().copied(),
        };
        let candidates: Vec<Pubkey> = first_word.and_then(|word| raffle.winner_for(word)).into_iter().collect();
        let instruction = match words {
            Some(words) => vrf_instruction::fulfill_random_words_with_override(
                &self.program_id,
                &fulfiller,
                request_id,
                raffle.subscription_id,
                &consumer.program_id,
                &consumer.address,
                &candidates,
                words,
            ),
            None => vrf_instruction::fulfill_random_words(
                &self.program_id,
                &fulfiller,
                request_id,
                raffle.subscription_id,
                &consumer.program_id,
                &consumer.address,
                &candidates,
            ),
        };
        cluster.send(&[instruction], &[]).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor_arguments_keep_order() {
        let params = RaffleParams {
            vrf_coordinator: Pubkey::new_unique(),
            subscription_id: 1,
            gas_lane: [0xab; 32],
            interval: 30,
            entrance_fee: 100_000_000,
            callback_gas_limit: 500_000,
        };
        let arguments = params.to_arguments();
        assert_eq!(arguments.len(), 6);
        assert_eq!(arguments[0], params.vrf_coordinator.to_string());
        assert_eq!(arguments[2], format!("0x{}", "ab".repeat(32)));
        assert_eq!(arguments[5], "500000");
    }
}
