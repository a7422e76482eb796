use clap::Parser;
use std::net::SocketAddr;
use topology_sim::{
    api::{ApiConfig, ApiState, spawn_api_server},
    config::{Config, read_config_file},
    util::{get_bind_addr, is_production},
};
use tracing::{info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short)]
    file: Option<String>,

    /// Address to bind to, overrides the config file and environment
    #[arg(long)]
    bind: Option<SocketAddr>,
}

fn init() {
    let filter = filter::Targets::new().with_targets(vec![
        ("topology_sim", LevelFilter::DEBUG),
        ("topology_hub", LevelFilter::TRACE),
        ("tower_http", LevelFilter::DEBUG),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = match &args.file {
        Some(file) => read_config_file(file)?,
        None => Config::default(),
    };

    let simulation = config.simulation.unwrap_or_default();
    simulation.validate()?;

    let api_config = ApiConfig {
        bind_addr: args.bind.or(config.bind).unwrap_or_else(get_bind_addr),
        enable_cors: !is_production(),
    };

    let state = ApiState::new(simulation);
    let addr = spawn_api_server(api_config, state.clone()).await?;
    info!("hub ready on http://{addr}");

    tokio::signal::ctrl_c().await?;

    info!("shutting down, stopping {} systems", state.systems.len().await);
    state.systems.shutdown_all().await;

    Ok(())
}
