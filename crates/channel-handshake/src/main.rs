use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ibc_channel_handshake::{
    ChainConfig, ChainSession, ChannelRecord, HandshakeConfig, HandshakeCoordinator, HandshakeIdentity,
    HandshakeMetrics, HandshakeSide, ProofCollector, ProofClaim, RpcChainSession, TimeoutNegotiator,
};

#[derive(Parser)]
#[command(name = "channel-handshake")]
#[command(about = "Open an IBC channel between two chains")]
#[command(version)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/handshake.toml")]
    pub config: PathBuf,

    /// Log level, used when RUST_LOG is unset (overrides the config file)
    #[arg(long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the four-phase channel open handshake
    Handshake {
        /// Connection identifier on chain 1
        conn1: String,
        /// Channel identifier on chain 1
        chan1: String,
        /// JSON channel record for chain 1
        chanfile1: PathBuf,
        /// Connection identifier on chain 2
        conn2: String,
        /// Channel identifier on chain 2
        chan2: String,
        /// JSON channel record for chain 2
        chanfile2: PathBuf,

        /// Config entry for chain 1
        #[arg(long, default_value = "chain-a")]
        chain1: String,
        /// Config entry for chain 2
        #[arg(long, default_value = "chain-b")]
        chain2: String,
        /// RPC endpoint override for chain 1
        #[arg(long)]
        node1: Option<String>,
        /// RPC endpoint override for chain 2
        #[arg(long)]
        node2: Option<String>,
        /// Signer override for chain 1
        #[arg(long)]
        from1: Option<String>,
        /// Signer override for chain 2
        #[arg(long)]
        from2: Option<String>,
        /// Blocks added to the counterparty height for each phase timeout
        #[arg(long)]
        timeout_horizon: Option<u64>,
        /// Skip the check for a handshake already in progress
        #[arg(long)]
        force: bool,
    },
    /// Show the proven handshake state of one channel endpoint
    Query {
        /// Config entry of the chain to query
        chain: String,
        /// Connection identifier
        conn: String,
        /// Channel identifier
        chan: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = HandshakeConfig::load(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;

    let log_level = cli.log_level.clone().unwrap_or_else(|| config.global.log_level.clone());

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "ibc_channel_handshake={},channel_handshake={}",
                    log_level, log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Loaded configuration from: {}", cli.config.display());

    match cli.command {
        Commands::Handshake {
            conn1,
            chan1,
            chanfile1,
            conn2,
            chan2,
            chanfile2,
            chain1,
            chain2,
            node1,
            node2,
            from1,
            from2,
            timeout_horizon,
            force,
        } => {
            // Bad channel files are rejected before any chain is contacted
            let channel1 = ChannelRecord::from_json_file(&chanfile1)?;
            let channel2 = ChannelRecord::from_json_file(&chanfile2)?;

            let session1 = open_session(config.get_chain(&chain1)?, node1, from1)?;
            let session2 = open_session(config.get_chain(&chain2)?, node2, from2)?;

            let horizon = timeout_horizon.unwrap_or(config.handshake.timeout_horizon);
            anyhow::ensure!(horizon > 0, "timeout horizon must be positive");

            let side1 = HandshakeSide::new(session1, HandshakeIdentity::new(conn1, chan1), channel1);
            let side2 = HandshakeSide::new(session2, HandshakeIdentity::new(conn2, chan2), channel2);

            run_handshake(side1, side2, horizon, config.handshake.check_existing && !force).await
        }
        Commands::Query { chain, conn, chan } => {
            let session = open_session(config.get_chain(&chain)?, None, None)?;
            query_endpoint(session.as_ref(), &HandshakeIdentity::new(conn, chan)).await
        }
    }
}

fn open_session(
    chain: &ChainConfig,
    node: Option<String>,
    from: Option<String>,
) -> anyhow::Result<Box<dyn ChainSession>> {
    let mut chain = chain.clone();
    if let Some(node) = node {
        chain.rpc_endpoint = node;
    }
    if let Some(from) = from {
        chain.signer = from;
    }
    Ok(Box::new(RpcChainSession::new(&chain)?))
}

async fn run_handshake(
    side1: HandshakeSide,
    side2: HandshakeSide,
    horizon: u64,
    check_existing: bool,
) -> anyhow::Result<()> {
    info!(horizon, check_existing, "🤝 Starting channel handshake");
    if !check_existing {
        warn!("Existing handshake check disabled; an in-progress handshake will be duplicated");
    }

    let metrics = Arc::new(HandshakeMetrics::new()?);
    let coordinator = HandshakeCoordinator::new(side1, side2, TimeoutNegotiator::new(horizon))
        .with_existing_check(check_existing)
        .with_metrics(metrics);

    match coordinator.run().await {
        Ok(report) => {
            for outcome in &report.phases {
                println!(
                    "{:<8} {:<16} tx {} (timeout {:?}, next timeout {:?}, {} proofs)",
                    outcome.phase.as_str(),
                    outcome.chain_id,
                    outcome.tx_hash,
                    outcome.timeout,
                    outcome.next_timeout,
                    outcome.proofs
                );
            }
            Ok(())
        }
        Err(e) => {
            let last = e.last_completed().map_or("none", |p| p.as_str());
            Err(anyhow::Error::new(e)
                .context(format!("channel handshake aborted (last completed phase: {})", last)))
        }
    }
}

async fn query_endpoint(session: &dyn ChainSession, identity: &HandshakeIdentity) -> anyhow::Result<()> {
    let height = session.latest_height().await?;
    println!("{} at height {}: {}", session.chain_id(), height, identity);

    let claims = [ProofClaim::ChannelRecord, ProofClaim::PhaseState, ProofClaim::Timeout];
    let bundle = ProofCollector::collect(session, identity, &claims).await?;

    if let Some(state) = bundle.state {
        println!("  state:   {}", state);
    }
    if let Some(timeout) = bundle.timeout {
        println!("  timeout: {}", timeout);
    }
    if let Some(channel) = &bundle.channel {
        println!("  channel: {}", serde_json::to_string_pretty(channel)?);
    }
    for proof in bundle.into_proofs() {
        println!(
            "  proof {:<8} height {} ({} bytes)",
            proof.claim.to_string(),
            proof.proof.height,
            proof.proof.bytes.len()
        );
    }
    Ok(())
}
