use anyhow::Context;
use basalt_config::BasaltConfig;
use basalt_graph::Solution;
use basalt_ring::{ChannelName, RingError, ShutdownToken, SolutionChannel};
use clap::Parser;
use std::path::PathBuf;

/// Creates the solution channel, collects candidates from any number of
/// generators, and reports each strict improvement until one proves the
/// graph 3-colorable.
#[derive(Parser, Debug)]
#[command(name = "supervisor")]
#[command(about = "Track the best 3-coloring edge-removal candidate")]
struct Args {
    /// TOML config file; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => {
            BasaltConfig::load(path.display().to_string()).context("failed to load config")?
        }
        None => BasaltConfig::default(),
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let token = ShutdownToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || handler_token.cancel())
        .context("failed to install signal handler")?;

    let name = ChannelName::new(&config.channel_name)?;
    let channel = SolutionChannel::create(&name).context("failed to create solution channel")?;
    tracing::info!(
        prefix = %config.channel_name,
        capacity = channel.capacity(),
        "channel ready, waiting for generators"
    );

    let mut best: Option<usize> = None;
    loop {
        let payload = match channel.read(&token) {
            Ok(payload) => payload,
            Err(RingError::Cancelled) => {
                tracing::info!("interrupted, shutting down");
                break;
            }
            Err(RingError::Closed) => break,
            Err(err) => return Err(err).context("reading from the channel failed"),
        };

        let solution = match Solution::decode(&payload) {
            Ok(solution) => solution,
            Err(err) => {
                tracing::warn!(%err, len = payload.len(), "discarding malformed message");
                continue;
            }
        };

        let cost = solution.cost();
        if best.is_none_or(|b| cost < b) {
            best = Some(cost);
            if solution.is_optimal() {
                println!("The graph is 3-colorable!");
            } else {
                println!("Solution with {cost} edges: {solution}");
            }
        }
        if solution.is_optimal() {
            break;
        }
    }

    channel
        .close()
        .map_err(|err| anyhow::anyhow!("channel teardown incomplete: {err}"))?;
    Ok(())
}
