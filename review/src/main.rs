use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cozy_chess::Move;
use engine::{EngineConfig, UciProcess};
use review::{config, AnalysisSession, BenchmarkRunner, BenchmarkStore};

/// Engine-backed position and game analysis.
#[derive(Parser)]
#[command(name = "review", about = "Engine-backed position and game analysis")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a single position.
    Analyze {
        /// Position in FEN notation.
        #[arg(long)]
        fen: String,
        /// Search depth; defaults to the benchmarked recommendation.
        #[arg(long)]
        depth: Option<u32>,
    },
    /// Replay a game given as UCI moves and judge every ply.
    Game {
        /// Moves in played order (e2e4 e7e5 ...).
        moves: Vec<String>,
        #[arg(long)]
        depth: Option<u32>,
    },
    /// Measure host search throughput and print the performance tier.
    Bench {
        /// Discard any cached result first.
        #[arg(short, long)]
        force: bool,
    },
    /// Drop the persisted benchmark result.
    ClearCache,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let store = BenchmarkStore::new(config::data_dir());

    match cli.command {
        Commands::Analyze { fen, depth } => {
            let depth = depth.unwrap_or_else(|| recommended_depth(&store));
            let engine = UciProcess::start(EngineConfig::default()).await;
            let mut session = AnalysisSession::new(engine);
            let eval = session.analyze(&fen, depth).await;
            let win_probability = analysis::win_probability(eval.score.to_cp());
            let report = serde_json::json!({
                "evaluation": eval,
                "win_probability": win_probability,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
            session.shutdown().await;
        }
        Commands::Game { moves, depth } => {
            let moves: Vec<Move> = moves
                .iter()
                .map(|s| {
                    engine::uci::parse_uci_move(s)
                        .with_context(|| format!("invalid move token: {}", s))
                })
                .collect::<Result<_>>()?;
            let depth = depth.unwrap_or_else(|| recommended_depth(&store));
            let engine = UciProcess::start(EngineConfig::default()).await;
            let mut session = AnalysisSession::new(engine);
            let report = review::review_game(&mut session, &moves, depth).await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            session.shutdown().await;
        }
        Commands::Bench { force } => {
            let runner = BenchmarkRunner::new(store);
            if force {
                runner.clear_cache()?;
            }
            let result = runner.run().await;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::ClearCache => {
            store.clear()?;
            tracing::info!("Benchmark cache cleared");
        }
    }

    Ok(())
}

/// Depth suggested by the cached benchmark, or the conservative default.
fn recommended_depth(store: &BenchmarkStore) -> u32 {
    store.load_fresh().map(|r| r.recommended_depth).unwrap_or(16)
}
