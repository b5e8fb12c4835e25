use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand};
use heartbeat_membership::membership::config::MembershipConfig;
use heartbeat_membership::membership::service::MembershipService;
use heartbeat_membership::membership::types::NodeIdentity;
use heartbeat_membership::simulation::{Simulation, SimulationConfig};
use heartbeat_membership::transport::NetworkConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "membership-node", about = "Heartbeat gossip membership node")]
struct Cli {
    /// trace, debug, info, warn or error
    #[arg(long, default_value = "info", global = true)]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one node over UDP.
    Run(RunArgs),
    /// Run a whole group in-process over an emulated network.
    Simulate(SimulateArgs),
}

#[derive(Args)]
struct ProtocolArgs {
    /// TOML file with protocol settings; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    fail_timeout_ticks: Option<u64>,

    #[arg(long)]
    gossip_fanout: Option<usize>,

    /// Only a gossip reply confirms a join
    #[arg(long)]
    strict_join_ack: bool,
}

impl ProtocolArgs {
    fn load(&self) -> Result<MembershipConfig> {
        let mut config = match &self.config {
            Some(path) => MembershipConfig::from_file(path)?,
            None => MembershipConfig::default(),
        };
        if let Some(ticks) = self.fail_timeout_ticks {
            config.fail_timeout_ticks = ticks;
        }
        if self.gossip_fanout.is_some() {
            config.gossip_fanout = self.gossip_fanout;
        }
        if self.strict_join_ack {
            config.strict_join_ack = true;
        }
        Ok(config)
    }
}

#[derive(Args)]
struct RunArgs {
    /// Address this node listens on, e.g. 127.0.0.1:5000
    #[arg(long)]
    bind: SocketAddr,

    /// Well-known introducer; omit to start as the introducer
    #[arg(long)]
    introducer: Option<NodeIdentity>,

    #[arg(long)]
    tick_ms: Option<u64>,

    #[command(flatten)]
    protocol: ProtocolArgs,
}

#[derive(Args)]
struct SimulateArgs {
    #[arg(long, default_value_t = 10)]
    nodes: usize,

    #[arg(long, default_value_t = 100)]
    rounds: u64,

    /// Probability that any message is lost
    #[arg(long, default_value_t = 0.0)]
    drop_probability: f64,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Node index (1-based) to crash
    #[arg(long, requires = "crash_round")]
    crash_node: Option<usize>,

    #[arg(long)]
    crash_round: Option<u64>,

    #[command(flatten)]
    protocol: ProtocolArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .init();

    match cli.command {
        Command::Run(args) => run_node(args).await,
        Command::Simulate(args) => simulate(args),
    }
}

async fn run_node(args: RunArgs) -> Result<()> {
    let mut config = args.protocol.load()?;
    if let Some(ms) = args.tick_ms {
        config.tick_period_ms = ms;
    }

    match args.introducer {
        Some(introducer) => {
            config.introducer = introducer;
            tracing::info!("Introducer: {}", introducer);
        }
        None => {
            config.introducer = NodeIdentity::try_from(args.bind)?;
            tracing::info!("Starting as introducer (founder)");
        }
    }

    let service = MembershipService::new(args.bind, config).await?;
    tracing::info!("Node identity: {}", service.identity);
    service.clone().start().await?;

    let stats_service = service.clone();
    let reporter = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));

        loop {
            interval.tick().await;
            let members = stats_service.members().await;
            tracing::info!(
                "Cluster stats: {} members, status {:?}, heartbeat {}",
                members.len(),
                stats_service.status().await,
                stats_service.heartbeat().await
            );
            for entry in members {
                tracing::info!("  - {} hb={} updated={}", entry.identity, entry.heartbeat, entry.last_updated);
            }
        }
    });

    tracing::info!("Press Ctrl+C to shutdown");
    tokio::signal::ctrl_c().await?;

    reporter.abort();
    service.shutdown().await;
    Ok(())
}

fn simulate(args: SimulateArgs) -> Result<()> {
    if !(0.0..=1.0).contains(&args.drop_probability) {
        bail!("drop probability must lie in [0, 1]");
    }

    let membership = args.protocol.load()?;
    let mut sim = Simulation::new(SimulationConfig {
        nodes: args.nodes,
        membership,
        network: NetworkConfig {
            drop_probability: args.drop_probability,
            seed: args.seed,
            ..NetworkConfig::default()
        },
    })?;

    sim.start_all()?;
    let crash = args
        .crash_node
        .zip(args.crash_round)
        .map(|(node, round)| (Simulation::identity_of(node), round));

    for round in 0..args.rounds {
        if let Some((victim, at)) = crash
            && at == round
        {
            sim.crash(victim)?;
        }
        sim.step();
    }

    for identity in sim.identities() {
        let Some(runtime) = sim.runtime(&identity) else {
            continue;
        };
        let stats = sim.stats(&identity);
        let view: Vec<String> = runtime.members().iter().map(|e| e.identity.to_string()).collect();
        tracing::info!(
            "{} {:?} hb={} sent={} recv={} view=[{}]",
            identity,
            runtime.status(),
            runtime.heartbeat(),
            stats.sent,
            stats.received,
            view.join(", ")
        );
    }
    tracing::info!("Converged after {} rounds: {}", sim.round(), sim.is_converged());

    Ok(())
}
