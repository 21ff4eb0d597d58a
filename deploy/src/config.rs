//! Per-network deployment parameters and the environment toggles read once per run.

use std::{env, path::PathBuf, str::FromStr};

use log::debug;
use raffle::utils::sol_to_lamports;
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

/// Flat premium the mock coordinator charges per fulfillment.
pub const BASE_FEE: u64 = 250_000_000_000_000_000;
/// Oracle currency charged per unit of callback gas by the mock coordinator.
pub const GAS_PRICE_LINK: u64 = 1_000_000_000;
/// Amount credited to a freshly created local subscription.
pub const FUND_AMOUNT: u64 = 1_000_000_000_000_000_000;

pub const VERIFICATION_BLOCK_CONFIRMATIONS: u64 = 6;

/// Networks where mocks are deployed and subscriptions created on the fly.
pub const DEVELOPMENT_CHAINS: [&str; 2] = ["program-test", "localnet"];

pub const FRONTEND_ADDRESSES_FILE: &str = "../frontend-lottery/constants/contractAddresses.json";
pub const FRONTEND_IDL_FILE: &str = "../frontend-lottery/constants/abi.json";

// 30 gwei key hash
const GAS_LANE_30_GWEI: [u8; 32] = [
    71, 78, 52, 160, 119, 223, 88, 128, 125, 190, 156, 150, 211, 192, 9, 178, 59, 60, 109, 12,
    206, 67, 62, 89, 187, 245, 179, 79, 130, 59, 197, 108,
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no configuration for network `{0}`")]
    UnknownNetwork(String),

    #[error("network `{network}` is missing required field `{field}`")]
    MissingField {
        network: String,
        field: &'static str,
    },

    #[error("network `{network}` has an invalid coordinator address `{value}`")]
    InvalidCoordinator { network: String, value: String },

    #[error("environment variable {name} has invalid value `{value}`")]
    InvalidEnv { name: &'static str, value: String },
}

/// One row of the network table. `None` fields fall back to `default`
/// where that is allowed, otherwise resolution fails.
#[derive(Debug, Clone, Copy)]
pub struct NetworkConfig {
    pub name: &'static str,
    pub subscription_id: Option<u64>,
    pub gas_lane: Option<[u8; 32]>,
    pub keepers_update_interval: Option<u64>,
    /// In SOL
    pub raffle_entrance_fee: Option<f64>,
    pub callback_gas_limit: Option<u32>,
    pub vrf_coordinator: Option<&'static str>,
}

const DEFAULT_NETWORK: NetworkConfig = NetworkConfig {
    name: "default",
    subscription_id: None,
    gas_lane: None,
    keepers_update_interval: Some(30),
    raffle_entrance_fee: None,
    callback_gas_limit: None,
    vrf_coordinator: None,
};

const LOCAL_NETWORK: NetworkConfig = NetworkConfig {
    name: "localnet",
    subscription_id: Some(3124),
    gas_lane: Some(GAS_LANE_30_GWEI),
    keepers_update_interval: Some(30),
    raffle_entrance_fee: Some(0.1),
    callback_gas_limit: Some(500_000),
    vrf_coordinator: None,
};

pub const NETWORKS: [NetworkConfig; 5] = [
    DEFAULT_NETWORK,
    NetworkConfig {
        name: "program-test",
        ..LOCAL_NETWORK
    },
    LOCAL_NETWORK,
    NetworkConfig {
        name: "devnet",
        // opaque configuration; this mock's callback protocol has no public deployment
        vrf_coordinator: Some("EB3aqy3TdwU97zak42tycJqvgj1aoyPuWa2as8i7NyCY"),
        ..LOCAL_NETWORK
    },
    NetworkConfig {
        name: "mainnet-beta",
        keepers_update_interval: Some(30),
        ..DEFAULT_NETWORK
    },
];

pub fn network_config(network: &str) -> Option<&'static NetworkConfig> {
    NETWORKS.iter().find(|config| config.name == network)
}

pub fn is_development_chain(network: &str) -> bool {
    DEVELOPMENT_CHAINS.contains(&network)
}

/// Validated parameters for one deployment.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedNetwork {
    pub name: String,
    pub is_development: bool,
    /// `None` on development chains, where the mock is deployed instead
    pub vrf_coordinator: Option<Pubkey>,
    /// `None` on development chains, where a fresh subscription is created
    pub subscription_id: Option<u64>,
    pub gas_lane: [u8; 32],
    pub interval: u64,
    /// In lamports
    pub entrance_fee: u64,
    pub callback_gas_limit: u32,
}

/// Resolves and validates the parameters for `network`.
///
/// Fails before any chain interaction when a required field is absent.
/// Only the upkeep interval may come from the `default` entry.
pub fn resolve(network: &str) -> Result<ResolvedNetwork, ConfigError> {
    let config = network_config(network)
        .filter(|config| config.name != DEFAULT_NETWORK.name)
        .ok_or_else(|| ConfigError::UnknownNetwork(network.to_string()))?;
    let missing = |field| ConfigError::MissingField {
        network: network.to_string(),
        field,
    };

    let is_development = is_development_chain(network);
    let interval = config
        .keepers_update_interval
        .or(DEFAULT_NETWORK.keepers_update_interval)
        .ok_or_else(|| missing("keepers_update_interval"))?;
    let gas_lane = config.gas_lane.ok_or_else(|| missing("gas_lane"))?;
    let entrance_fee = config
        .raffle_entrance_fee
        .map(sol_to_lamports)
        .ok_or_else(|| missing("raffle_entrance_fee"))?;
    let callback_gas_limit = config
        .callback_gas_limit
        .ok_or_else(|| missing("callback_gas_limit"))?;

    let (vrf_coordinator, subscription_id) = if is_development {
        (None, None)
    } else {
        let value = config.vrf_coordinator.ok_or_else(|| missing("vrf_coordinator"))?;
        let coordinator = Pubkey::from_str(value).map_err(|_| ConfigError::InvalidCoordinator {
            network: network.to_string(),
            value: value.to_string(),
        })?;
        let subscription_id = config.subscription_id.ok_or_else(|| missing("subscription_id"))?;
        (Some(coordinator), Some(subscription_id))
    };

    debug!("resolved network {network}: interval={interval}s fee={entrance_fee} lamports");
    Ok(ResolvedNetwork {
        name: network.to_string(),
        is_development,
        vrf_coordinator,
        subscription_id,
        gas_lane,
        interval,
        entrance_fee,
        callback_gas_limit,
    })
}

/// Environment toggles, read after `.env` is loaded.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub update_frontend: bool,
    pub block_confirmations: Option<u64>,
    pub rpc_url: Option<String>,
    pub payer_keypair: Option<PathBuf>,
    pub verify_api_url: Option<String>,
    pub verify_api_key: Option<String>,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let block_confirmations = match env::var("BLOCK_CONFIRMATIONS") {
            Ok(value) => Some(value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                name: "BLOCK_CONFIRMATIONS",
                value,
            })?),
            Err(_) => None,
        };
        Ok(Self {
            update_frontend: env_flag("UPDATE_FRONTEND"),
            block_confirmations,
            rpc_url: env::var("RPC_URL").ok(),
            payer_keypair: env::var_os("PAYER_KEYPAIR").map(PathBuf::from),
            verify_api_url: env::var("VERIFY_API_URL").ok(),
            verify_api_key: env::var("VERIFY_API_KEY").ok(),
        })
    }

    /// Confirmations to await after deploying to `network`.
    pub fn wait_confirmations(&self, network: &ResolvedNetwork) -> u64 {
        if network.is_development {
            1
        } else {
            self.block_confirmations
                .unwrap_or(VERIFICATION_BLOCK_CONFIRMATIONS)
        }
    }
}

// an empty value counts as unset, so `UPDATE_FRONTEND=` in .env stays off
fn env_flag(name: &str) -> bool {
    env::var(name).map(|value| !value.is_empty()).unwrap_or(false)
}
