use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::Parser;
use log::info;
use raffle_deploy::{
    config::{self, Settings},
    deploy_all,
    frontend::FrontendPublisher,
    rpc::RpcCluster,
    verify::HttpVerifier,
    Deployment, LocalCluster,
};
use solana_sdk::signature::read_keypair_file;

#[derive(Parser, Debug)]
#[command(name = "raffle-deploy")]
#[command(about = "Deploy the raffle program and its oracle wiring to a Solana cluster")]
struct Cli {
    /// Network to deploy to: program-test, localnet, devnet or mainnet-beta
    #[arg(long, default_value = "program-test")]
    network: String,

    /// Publish the address and IDL to the frontend project
    #[arg(long)]
    update_frontend: bool,

    /// Confirmations to await on public networks
    #[arg(long)]
    confirmations: Option<u64>,
}

fn default_keypair_path() -> PathBuf {
    let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_default();
    home.join(".config").join("solana").join("id.json")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // a missing .env is fine, the environment may already be set
    dotenv::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let mut settings = Settings::from_env()?;
    settings.update_frontend |= cli.update_frontend;
    if cli.confirmations.is_some() {
        settings.block_confirmations = cli.confirmations;
    }

    let network = config::resolve(&cli.network)?;
    let publisher = settings.update_frontend.then(FrontendPublisher::default);
    let verifier = settings
        .verify_api_url
        .clone()
        .map(|url| HttpVerifier::new(url, settings.verify_api_key.clone()));

    let deployment: Deployment = if network.name == "program-test" {
        let mut cluster = LocalCluster::start().await;
        deploy_all(&mut cluster, &network, verifier.as_ref(), publisher.as_ref()).await?
    } else {
        let rpc_url = settings
            .rpc_url
            .clone()
            .with_context(|| format!("RPC_URL must be set to deploy to {}", network.name))?;
        let keypair_path = settings.payer_keypair.clone().unwrap_or_else(default_keypair_path);
        let payer = read_keypair_file(&keypair_path)
            .map_err(|e| anyhow!("failed to read payer keypair {}: {e}", keypair_path.display()))?;
        let confirmations = settings.wait_confirmations(&network);
        let mut cluster = RpcCluster::new(&network.name, rpc_url, payer, confirmations);
        deploy_all(&mut cluster, &network, verifier.as_ref(), publisher.as_ref()).await?
    };

    info!(
        "raffle {} deployed on {} (verified: {}, frontend updated: {})",
        deployment.raffle.address(),
        deployment.network,
        deployment.verified,
        deployment.frontend_updated
    );
    println!("{}", deployment.raffle.address());
    Ok(())
}
