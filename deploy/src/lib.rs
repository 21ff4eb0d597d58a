// Deployment pipeline and test harness for the raffle program
pub mod client;
pub mod cluster;
pub mod config;
pub mod error;
pub mod events;
pub mod frontend;
pub mod idl;
pub mod lottery;
pub mod mocks;
pub mod pipeline;
pub mod rpc;
pub mod verify;

pub use client::{CoordinatorClient, RaffleClient, RaffleParams};
pub use cluster::{Cluster, LocalCluster};
pub use error::DeployError;
pub use pipeline::{deploy_all, Deployment};
