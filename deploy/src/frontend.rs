//! Writes deployed addresses and the IDL where the frontend picks them up.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use log::info;
use solana_sdk::pubkey::Pubkey;

use crate::config::{FRONTEND_ADDRESSES_FILE, FRONTEND_IDL_FILE};
use crate::error::DeployError;
use crate::idl::Idl;

/// Network name to every raffle address deployed there.
pub type ContractAddresses = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontendPublisher {
    addresses_file: PathBuf,
    idl_file: PathBuf,
}

impl Default for FrontendPublisher {
    fn default() -> Self {
        Self::new(FRONTEND_ADDRESSES_FILE, FRONTEND_IDL_FILE)
    }
}

impl FrontendPublisher {
    pub fn new(addresses_file: impl Into<PathBuf>, idl_file: impl Into<PathBuf>) -> Self {
        Self {
            addresses_file: addresses_file.into(),
            idl_file: idl_file.into(),
        }
    }

    /// Records `address` under `network` and rewrites the IDL. Publishing the
    /// same address twice leaves a single entry.
    pub fn publish(&self, network: &str, address: &Pubkey, idl: &Idl) -> Result<(), DeployError> {
        info!("writing to front end");
        self.update_addresses(network, address)?;
        self.update_idl(idl)?;
        info!("front end written");
        Ok(())
    }

    pub fn read_addresses(&self) -> Result<ContractAddresses, DeployError> {
        if !self.addresses_file.exists() {
            return Ok(ContractAddresses::new());
        }
        let contents = fs::read_to_string(&self.addresses_file)?;
        if contents.trim().is_empty() {
            return Ok(ContractAddresses::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    fn update_addresses(&self, network: &str, address: &Pubkey) -> Result<(), DeployError> {
        let mut addresses = self.read_addresses()?;
        let entry = addresses.entry(network.to_string()).or_default();
        let address = address.to_string();
        if !entry.contains(&address) {
            entry.push(address);
        }
        write_json(&self.addresses_file, &addresses)
    }

    fn update_idl(&self, idl: &Idl) -> Result<(), DeployError> {
        write_json(&self.idl_file, idl)
    }
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), DeployError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}
