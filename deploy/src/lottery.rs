//! Raffle deployment and, on development chains, its subscription.

use log::info;
use raffle::utils::lamports_to_sol;
use solana_sdk::pubkey::Pubkey;

use crate::client::{CoordinatorClient, RaffleClient, RaffleParams};
use crate::cluster::Cluster;
use crate::config::{ConfigError, ResolvedNetwork, FUND_AMOUNT};
use crate::error::DeployError;
use crate::mocks::MockCoordinator;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedRaffle {
    pub client: RaffleClient,
    pub params: RaffleParams,
}

impl DeployedRaffle {
    pub fn address(&self) -> Pubkey {
        self.client.address
    }
}

/// Creates a subscription and credits it with `amount`.
pub async fn create_and_fund_subscription<C: Cluster>(
    cluster: &mut C,
    coordinator: &CoordinatorClient,
    amount: u64,
) -> Result<u64, DeployError> {
    let subscription_id = coordinator.create_subscription(cluster).await?;
    coordinator.fund_subscription(cluster, subscription_id, amount).await?;
    info!("subscription {subscription_id} created and funded with {amount}");
    Ok(subscription_id)
}

/// Deploys the raffle wired to `mock` on development chains, or to the
/// configured coordinator and subscription elsewhere. Locally the new raffle
/// is registered as a consumer before this returns.
pub async fn deploy_raffle<C: Cluster>(
    cluster: &mut C,
    network: &ResolvedNetwork,
    mock: Option<&MockCoordinator>,
) -> Result<DeployedRaffle, DeployError> {
    let (vrf_coordinator, subscription_id) = match (mock, network.vrf_coordinator, network.subscription_id) {
        (Some(mock), _, _) => {
            let subscription_id = create_and_fund_subscription(cluster, &mock.client, FUND_AMOUNT).await?;
            (mock.client.program_id, subscription_id)
        }
        (None, Some(coordinator), Some(subscription_id)) => (coordinator, subscription_id),
        (None, None, _) => {
            return Err(ConfigError::MissingField {
                network: network.name.clone(),
                field: "vrf_coordinator",
            }
            .into())
        }
        (None, Some(_), None) => {
            return Err(ConfigError::MissingField {
                network: network.name.clone(),
                field: "subscription_id",
            }
            .into())
        }
    };

    let params = RaffleParams {
        vrf_coordinator,
        subscription_id,
        gas_lane: network.gas_lane,
        interval: network.interval,
        entrance_fee: network.entrance_fee,
        callback_gas_limit: network.callback_gas_limit,
    };
    info!(
        "deploying raffle on {}: fee {} SOL, interval {}s, subscription {}",
        network.name,
        lamports_to_sol(params.entrance_fee),
        params.interval,
        params.subscription_id
    );
    let client = RaffleClient::create(cluster, &params).await?;

    if let Some(mock) = mock {
        mock.client
            .add_consumer(cluster, subscription_id, &client.address)
            .await?;
        info!("raffle {} added as consumer of subscription {subscription_id}", client.address);
    }

    Ok(DeployedRaffle { client, params })
}
