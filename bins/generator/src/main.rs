use anyhow::Context;
use basalt_config::BasaltConfig;
use basalt_graph::{Graph, MAX_REMOVED_EDGES, Solution, random_candidate};
use basalt_ring::{ChannelName, RingError, ShutdownToken, SolutionChannel};
use clap::Parser;
use std::path::PathBuf;

/// Randomized search worker: colors the graph at random over and over and
/// publishes every candidate that beats its own previous best.
#[derive(Parser, Debug)]
#[command(name = "generator")]
#[command(about = "Publish 3-coloring edge-removal candidates to a running supervisor")]
struct Args {
    /// Edges of the graph, one `a-b` pair per argument (e.g. `0-1 0-2 1-2`).
    #[arg(required = true)]
    edges: Vec<String>,

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

    let graph = Graph::parse(&args.edges).context("invalid edge list")?;
    tracing::info!(
        vertices = graph.vertex_count(),
        edges = graph.edge_count(),
        "parsed graph"
    );

    let name = ChannelName::new(&config.channel_name)?;
    let channel = SolutionChannel::attach(&name)
        .context("failed to attach to the solution channel; is the supervisor running?")?;

    let mut rng = rand::rng();
    // Publish only strict improvements over this generator's own best, so
    // channel traffic shrinks as the search converges.
    let mut bound = MAX_REMOVED_EDGES;
    let mut rounds: u64 = 0;

    while !token.is_cancelled() && channel.is_alive() {
        rounds += 1;
        let Some(removed) = random_candidate(&graph, &mut rng, bound) else {
            continue;
        };
        let solution = Solution { removed };
        let cost = solution.cost();
        let payload = solution.encode().context("candidate does not encode")?;

        match channel.write(&payload, &token) {
            Ok(()) => {
                tracing::info!(cost, rounds, "published candidate");
                if solution.is_optimal() {
                    break;
                }
                bound = cost;
            }
            Err(RingError::Closed) | Err(RingError::Cancelled) => break,
            Err(err) => return Err(err).context("writing to the channel failed"),
        }
    }

    tracing::info!(rounds, "search finished");
    channel
        .close()
        .map_err(|err| anyhow::anyhow!("channel teardown incomplete: {err}"))?;
    Ok(())
}
