// Mock oracle deployment for development chains
use log::info;
use raffle::vrf_coordinator_mock;

use crate::client::CoordinatorClient;
use crate::cluster::Cluster;
use crate::config::{ResolvedNetwork, BASE_FEE, GAS_PRICE_LINK};
use crate::error::DeployError;

/// The mock coordinator the rest of a local deployment is wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockCoordinator {
    pub client: CoordinatorClient,
}

/// Initializes the mock coordinator on development chains; `None` elsewhere.
///
/// A coordinator already configured by an earlier run on the same chain is
/// reused as is.
pub async fn deploy_mocks<C: Cluster>(cluster: &mut C, network: &ResolvedNetwork) -> Result<Option<MockCoordinator>, DeployError> {
    if !network.is_development {
        return Ok(None);
    }

    info!("local network detected, deploying mocks");
    let client = CoordinatorClient::new(vrf_coordinator_mock::id());
    if client.is_initialized(cluster).await? {
        info!("mock coordinator already configured at {}", client.config_address());
    } else {
        client.initialize(cluster, BASE_FEE, GAS_PRICE_LINK).await?;
        info!("mocks deployed");
    }
    Ok(Some(MockCoordinator { client }))
}
