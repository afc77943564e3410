//! Application entry point.

use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use secrecy::SecretString;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use gallery_tx_relayer::api::create_router;
use gallery_tx_relayer::app::{AppState, OrchestratorConfig};
use gallery_tx_relayer::domain::{ChainClient, WalletSigner, parse_env};
use gallery_tx_relayer::infra::blockchain::{FeeStrategy, parse_endpoint_map};
use gallery_tx_relayer::infra::{
    DEFAULT_MAX_RECORDS, DefaultBuilderFactory, InMemoryActionStore, KeypairSigner,
    RecentFeesStrategy, RpcChainClient, RpcClientConfig, StaticFeeStrategy,
};

const DEFAULT_SWAP_API_URL: &str = "https://quote-api.jup.ag/v6";

/// Application configuration
struct Config {
    rpc_url: String,
    wallet_key: SecretString,
    host: String,
    port: u16,
    swap_api_url: String,
    /// Named endpoints that return ready-made transactions
    remote_endpoints: HashMap<String, String>,
    /// Fixed compute-unit price; recent network fees are used when unset
    priority_fee: Option<u64>,
    max_records: usize,
    rpc_config: RpcClientConfig,
    orchestrator_config: OrchestratorConfig,
}

impl Config {
    fn from_env() -> Result<Self> {
        let rpc_url = env::var("SOLANA_RPC_URL")
            .unwrap_or_else(|_| "https://api.devnet.solana.com".to_string());
        let wallet_key = Self::load_wallet_key()?;
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);
        let swap_api_url = env::var("SWAP_API_URL")
            .ok()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_SWAP_API_URL.to_string());
        let remote_endpoints = match env::var("REMOTE_ENDPOINTS") {
            Ok(value) => parse_endpoint_map(&value).context("Invalid REMOTE_ENDPOINTS")?,
            Err(_) => HashMap::new(),
        };
        let priority_fee = match env::var("PRIORITY_FEE_MICROLAMPORTS") {
            Ok(value) => Some(
                value
                    .trim()
                    .parse::<u64>()
                    .context("PRIORITY_FEE_MICROLAMPORTS must be an integer")?,
            ),
            Err(_) => None,
        };
        let max_records =
            parse_env::<usize>("STORE_MAX_RECORDS")?.unwrap_or(DEFAULT_MAX_RECORDS);

        Ok(Self {
            rpc_url,
            wallet_key,
            host,
            port,
            swap_api_url,
            remote_endpoints,
            priority_fee,
            max_records,
            rpc_config: RpcClientConfig::from_env()?,
            orchestrator_config: OrchestratorConfig::from_env()?,
        })
    }

    fn load_wallet_key() -> Result<SecretString> {
        let key_str = env::var("WALLET_PRIVATE_KEY").map_err(|_| {
            anyhow::anyhow!(
                "WALLET_PRIVATE_KEY environment variable is not set.\n\
                 Please set it to the Base58-encoded private key of the relayer wallet."
            )
        })?;

        if key_str.trim().is_empty() {
            anyhow::bail!("WALLET_PRIVATE_KEY environment variable is empty.");
        }

        Ok(SecretString::from(key_str))
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    init_tracing();

    info!("Gallery transaction relayer v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    let signer = Arc::new(
        KeypairSigner::from_base58(&config.wallet_key)
            .context("Failed to parse WALLET_PRIVATE_KEY as Base58")?,
    );
    info!(wallet = %signer.pubkey(), "Wallet loaded");

    let chain_client: Arc<dyn ChainClient> =
        Arc::new(RpcChainClient::new(&config.rpc_url, config.rpc_config.clone())?);
    info!(
        rpc_url = %config.rpc_url,
        commitment = %config.rpc_config.commitment,
        "RPC client created"
    );

    let fees: Arc<dyn FeeStrategy> = match config.priority_fee {
        Some(micro_lamports) => Arc::new(StaticFeeStrategy::new(micro_lamports)),
        None => Arc::new(RecentFeesStrategy::new(Arc::clone(&chain_client))),
    };
    info!(strategy = fees.name(), "Priority fee strategy selected");

    let http_client = reqwest::Client::builder()
        .timeout(config.rpc_config.timeout)
        .build()
        .context("Failed to create HTTP client")?;
    let factory = DefaultBuilderFactory::new(
        Arc::clone(&chain_client),
        fees,
        http_client,
        config.swap_api_url.clone(),
        config.remote_endpoints,
    );
    let endpoint_names = factory.remote_endpoint_names().join(", ");
    if endpoint_names.is_empty() {
        info!("No remote endpoints configured");
    } else {
        info!(endpoints = %endpoint_names, "Remote endpoints configured");
    }

    let orchestrator_config = config.orchestrator_config;
    info!(
        max_attempts = orchestrator_config.max_attempts,
        retry_delay_ms = orchestrator_config.retry_delay.as_millis() as u64,
        poll_interval_ms = orchestrator_config.poll_interval.as_millis() as u64,
        confirmation_timeout_secs = orchestrator_config.confirmation_timeout.as_secs(),
        target_commitment = %orchestrator_config.target_commitment,
        "Orchestrator configured"
    );

    let app_state = Arc::new(AppState::new(
        Arc::new(InMemoryActionStore::with_capacity(config.max_records)),
        chain_client,
        signer,
        Arc::new(factory),
        orchestrator_config,
    ));

    let router = create_router(app_state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Server starting on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
