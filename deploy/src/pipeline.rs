//! The ordered deployment: mocks, raffle and subscription, verification, frontend.

use log::{info, warn};

use crate::cluster::Cluster;
use crate::config::ResolvedNetwork;
use crate::error::DeployError;
use crate::frontend::FrontendPublisher;
use crate::idl::raffle_idl;
use crate::lottery::{deploy_raffle, DeployedRaffle};
use crate::mocks::{deploy_mocks, MockCoordinator};
use crate::verify::Verifier;

/// What each step produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    pub network: String,
    pub mock: Option<MockCoordinator>,
    pub raffle: DeployedRaffle,
    pub verified: bool,
    pub frontend_updated: bool,
}

/// Runs every step in order against `cluster`. The first failure aborts the run.
///
/// `publisher` is `None` unless frontend publication was requested.
pub async fn deploy_all<C: Cluster, V: Verifier>(
    cluster: &mut C,
    network: &ResolvedNetwork,
    verifier: Option<&V>,
    publisher: Option<&FrontendPublisher>,
) -> Result<Deployment, DeployError> {
    let mock = deploy_mocks(cluster, network).await?;
    let raffle = deploy_raffle(cluster, network, mock.as_ref()).await?;

    let mut verified = false;
    if !network.is_development {
        match verifier {
            Some(verifier) => {
                verifier.verify(&raffle.address(), &raffle.params).await?;
                verified = true;
            }
            None => warn!("no verification service configured, skipping verification"),
        }
    }

    let frontend_updated = match publisher {
        Some(publisher) => {
            publisher.publish(&network.name, &raffle.address(), &raffle_idl())?;
            true
        }
        None => false,
    };

    info!("deployment on {} complete: raffle {}", network.name, raffle.address());
    Ok(Deployment {
        network: network.name.clone(),
        mock,
        raffle,
        verified,
        frontend_updated,
    })
}
