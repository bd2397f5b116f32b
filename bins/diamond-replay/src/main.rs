//! DiamondPad replay tool.
//!
//! Feeds a JSON fixture of buys, transfers, and account ages through bundle
//! detection, the relationship graph, and the holder book, then prints every
//! analysis, cluster, leaderboard, and graph summary as JSON lines on stdout.
//! Launches listed in the fixture are created and activated first, so the
//! closing stats line also carries the protocol totals.

mod fixture;
mod settings;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};

use diamond_core::config::Settings;
use diamond_core::launch::LaunchStatus;
use diamond_core::protocol::{LaunchRegistry, ProtocolStats};
use diamond_core::time::{Clock, ManualClock};
use diamond_core::traits::{AnalysisSink, BundlerRegistry};
use diamond_core::types::{BundleAnalysis, ClaimRecord};
use diamond_detect::{
    BundleDetector, Collaborators, LaunchMonitor, MemoryBundlerRegistry, MemoryLedger,
};
use diamond_graph::{ClusterResult, GraphStats, WalletGraph};
use diamond_rewards::{generate_leaderboard, HolderBook, LeaderboardEntry};

use crate::fixture::Fixture;

#[derive(Parser, Debug)]
#[command(
    name = "diamond-replay",
    version,
    about = "Replay a launch fixture through DiamondPad bundle detection and rewards"
)]
struct Args {
    /// Fixture file (JSON)
    fixture: PathBuf,

    /// Settings file (TOML). DIAMOND_* environment variables override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Leaderboard entries printed per launch
    #[arg(long, default_value_t = 10)]
    top: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log output format ("text" or "json")
    #[arg(long, default_value = "text")]
    log_format: String,
}

/// One line of replay output.
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Line<'a> {
    Analysis(&'a BundleAnalysis),
    Claim(&'a ClaimRecord),
    Cluster(&'a ClusterResult),
    Leaderboard {
        launch_id: &'a str,
        entries: &'a [LeaderboardEntry],
    },
    Stats {
        #[serde(flatten)]
        graph: &'a GraphStats,
        #[serde(flatten)]
        protocol: ProtocolStats,
        known_bundlers: usize,
        bundled: usize,
    },
}

/// Writes analyses and claims as they are recorded.
struct JsonLinesSink<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    fn emit(&self, line: &Line<'_>) {
        let mut out = self.out.lock();
        let written = serde_json::to_writer(&mut *out, line)
            .map_err(std::io::Error::from)
            .and_then(|()| out.write_all(b"\n"));
        if let Err(e) = written {
            warn!(error = %e, "replay: failed to write output line");
        }
    }
}

impl<W: Write + Send> AnalysisSink for JsonLinesSink<W> {
    fn record_analysis(&self, analysis: &BundleAnalysis) {
        self.emit(&Line::Analysis(analysis));
    }

    fn record_claim(&self, claim: &ClaimRecord) {
        self.emit(&Line::Claim(claim));
    }
}

async fn replay<W: Write + Send + 'static>(
    settings: Settings,
    fixture: &Fixture,
    sink: Arc<JsonLinesSink<W>>,
    top: usize,
) -> Result<usize> {
    let clock = Arc::new(ManualClock::new(fixture.start_time()));
    let dyn_clock: Arc<dyn Clock> = clock.clone();

    let ledger = Arc::new(MemoryLedger::new(dyn_clock.clone()));
    fixture.seed(&ledger);
    let launches = Arc::new(LaunchRegistry::new());
    for params in &fixture.launches {
        let launch = launches
            .create_launch(params.clone(), clock.now_ms())
            .with_context(|| format!("creating launch {:?}", params.launch_id))?;
        launches.set_status(launch.id(), LaunchStatus::Active)?;
    }
    let registry = Arc::new(
        MemoryBundlerRegistry::with_wallets(fixture.known_bundlers.iter(), clock.now_ms())
            .with_totals(launches.totals()),
    );
    let graph = Arc::new(WalletGraph::new(settings.graph.clone(), dyn_clock.clone()));
    let detector = Arc::new(BundleDetector::new(
        settings.detector.clone(),
        Collaborators::single(ledger),
        registry.clone(),
        graph.clone(),
        dyn_clock,
    ));
    let monitor = LaunchMonitor::new(detector, sink.clone());
    let book =
        HolderBook::new(settings.rewards.clone(), sink.clone()).with_launches(launches.clone());

    let mut bundled = 0;
    for buy in fixture.ordered_buys() {
        if buy.timestamp > clock.now_ms() {
            clock.set(buy.timestamp);
        }
        book.record_buy(&buy);
        if monitor.ingest(buy).await.is_bundled {
            bundled += 1;
        }
    }

    for cluster in graph.find_clusters() {
        sink.emit(&Line::Cluster(&cluster));
    }
    for launch_id in fixture.launch_ids() {
        let holders = book.holders(Some(&launch_id));
        let entries =
            generate_leaderboard(&holders, Some(&launch_id), clock.now_ms(), Some(top));
        sink.emit(&Line::Leaderboard {
            launch_id: &launch_id,
            entries: &entries,
        });
    }
    sink.emit(&Line::Stats {
        graph: &graph.stats(),
        protocol: launches.stats(),
        known_bundlers: registry.len(),
        bundled,
    });
    Ok(bundled)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, &args.log_format);

    info!("DiamondPad replay v{}", env!("CARGO_PKG_VERSION"));
    let settings = settings::load_settings(args.config.as_deref()).context("loading settings")?;
    let fixture = Fixture::load(&args.fixture)?;
    info!(
        buys = fixture.buys.len(),
        transfers = fixture.transfers.len(),
        known_bundlers = fixture.known_bundlers.len(),
        launches = fixture.launches.len(),
        "replay: fixture loaded"
    );

    let sink = Arc::new(JsonLinesSink::new(std::io::stdout()));
    let bundled = replay(settings, &fixture, sink, args.top).await?;
    info!(bundled, "replay: complete");
    Ok(())
}

/// Initialize tracing with the given level and output format.
///
/// Logs go to stderr so stdout carries only JSON lines. `format = "json"`
/// emits structured logs; anything else is human-readable text.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
