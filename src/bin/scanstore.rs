//! Write the configured key space with one of the four strategies and report
//! per-worker throughput.

use std::{net::Ipv4Addr, path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::{CommandFactory, Parser};
use scanstore::{
    config::{BackendKind, ConfigError},
    store::{MemoryStore, StatusStore},
    verify::verify_coverage,
    Orchestrator, RunConfig, RunReport, Strategy,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const IMPLEMENTATION_HELP: &str = "id of implementation to test:
(1) serial recording
(2) batch recording
(3) concurrent batch recording
(4) concurrent batch recording with shuffled inputs";

#[derive(Debug, Parser)]
#[command(name = "scanstore")]
#[command(about = "Compare upsert strategies for bulk key-status writes")]
struct Args {
    /// Strategy to run (1-4, or its name).
    #[arg(short = 'i', long = "implementation", value_name = "ID", long_help = IMPLEMENTATION_HELP)]
    implementation: Option<Strategy>,
    /// Path to YAML run config. Defaults to the baseline run.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Exit as soon as the run finishes instead of waiting for a keypress.
    #[arg(long)]
    no_wait: bool,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let Some(strategy) = args.implementation else {
        eprintln!("{}", Args::command().render_long_help());
        std::process::exit(1);
    };
    init_tracing();

    let config = match &args.config {
        Some(path) => RunConfig::from_yaml_file(path)?,
        None => {
            let config = RunConfig::default();
            config.validate()?;
            config
        }
    };
    let keys: Arc<[Ipv4Addr]> = config.keys()?.into();

    let report = match config.backend.kind {
        BackendKind::Memory => execute(MemoryStore::new(), strategy, &config, keys).await?,
        #[cfg(feature = "redb")]
        BackendKind::Redb => {
            let path = backend_path(&config)?;
            ensure_parent(&path)?;
            let store = scanstore::store::RedbStore::open(&path)
                .with_context(|| format!("could not open {}", path.display()))?;
            execute(store, strategy, &config, keys).await?
        }
        #[cfg(feature = "sled")]
        BackendKind::Sled => {
            let path = backend_path(&config)?;
            let store = scanstore::store::SledStore::open(&path)
                .with_context(|| format!("could not open {}", path.display()))?;
            execute(store, strategy, &config, keys).await?
        }
        #[allow(unreachable_patterns)]
        kind => return Err(ConfigError::BackendUnavailable(kind).into()),
    };

    println!("{}", report.table());
    println!(
        "{} {} in {}ms over {} keys",
        report.strategy, report.state, report.elapsed_ms, report.key_count
    );
    if let Some(coverage) = &report.coverage {
        println!(
            "coverage: {} of {} keys stored, {} missing, {} rows total",
            coverage.found, coverage.expected, coverage.missing, coverage.stored_rows
        );
    }
    if let Some(dir) = &config.report.dir {
        let path = report.write_json(dir)?;
        println!("wrote results to {}", path.display());
    }

    if !args.no_wait {
        println!("press enter to exit");
        let mut line = String::new();
        BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await?;
    }

    report.ensure_completed()?;
    Ok(())
}

async fn execute<S>(
    store: S,
    strategy: Strategy,
    config: &RunConfig,
    keys: Arc<[Ipv4Addr]>,
) -> anyhow::Result<RunReport>
where
    S: StatusStore + 'static,
{
    let store = Arc::new(store);
    let mut orchestrator = Orchestrator::new(config.plan(strategy));
    if let Some(seed) = config.runtime.seed {
        orchestrator = orchestrator.with_seed(seed);
    }
    let mut report = orchestrator.run(Arc::clone(&keys), Arc::clone(&store)).await?;

    if config.runtime.verify {
        let coverage =
            tokio::task::spawn_blocking(move || verify_coverage(store.as_ref(), &keys[..]))
                .await??;
        report = report.with_coverage(coverage);
    }
    Ok(report)
}

#[cfg(any(feature = "redb", feature = "sled"))]
fn backend_path(config: &RunConfig) -> anyhow::Result<PathBuf> {
    config
        .backend
        .resolved_path()
        .with_context(|| format!("backend {} has no path", config.backend.kind))
}

#[cfg(feature = "redb")]
fn ensure_parent(path: &std::path::Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create store directory {}", parent.display()))?;
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .compact(),
        )
        .init();
}
