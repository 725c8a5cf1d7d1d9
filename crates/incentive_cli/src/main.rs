//! incentive CLI: run scenarios, query claims, report, verify.

use clap::{Parser, Subcommand};
use incentive::sim::{run_scenario, Scenario, ShareLedger};
use incentive::verify::{reproducibility_hash, verify_snapshot_hash, StateSnapshot};
use incentive::{ClaimType, Keeper, MemoryStore, Params, ReportData, SqliteStore, Store};
use incentive_report::render_report;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();
    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run_run(args),
        Command::Query(args) => run_query(args),
        Command::Params(args) => run_params(args),
        Command::Report(args) => run_report(args),
        Command::Verify(args) => run_verify(args),
    }
}

#[derive(Parser)]
#[command(name = "incentive")]
#[command(author = "gorusys <goru.connector@outlook.com>")]
#[command(about = "Lazy reward accumulation and claim synchronization")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a scenario and write a state snapshot plus its hash.
    Run(RunArgs),
    /// Show a claim as it would look if synchronized now.
    Query(QueryArgs),
    /// Print the effective params after validation.
    Params(ParamsArgs),
    /// Generate an HTML report from a snapshot.
    Report(ReportArgs),
    /// Verify a snapshot's reproducibility hash.
    Verify(VerifyArgs),
}

#[derive(Parser)]
struct RunArgs {
    #[arg(long)]
    scenario: PathBuf,
    /// Override the scenario's params with this file.
    #[arg(long)]
    params: Option<PathBuf>,
    /// Persist state in SQLite at this path instead of memory.
    #[arg(long)]
    db: Option<PathBuf>,
    #[arg(long, default_value = "./reports")]
    out_dir: PathBuf,
}

#[derive(Parser)]
struct QueryArgs {
    #[arg(long)]
    snapshot: PathBuf,
    #[arg(long)]
    claim_type: ClaimType,
    #[arg(long)]
    owner: String,
}

#[derive(Parser)]
struct ParamsArgs {
    /// Read this file instead of INCENTIVE_PARAMS_PATH / ./config / cwd.
    #[arg(long)]
    path: Option<PathBuf>,
}

#[derive(Parser)]
struct ReportArgs {
    #[arg(long)]
    snapshot: PathBuf,
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser)]
struct VerifyArgs {
    #[arg(long)]
    snapshot: PathBuf,
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .replace([' ', ':'], "_")
}

fn read_snapshot(path: &Path) -> Result<StateSnapshot, Box<dyn std::error::Error>> {
    let json = std::fs::read_to_string(path)?;
    let snapshot: StateSnapshot = serde_json::from_str(&json)?;
    snapshot.validate()?;
    Ok(snapshot)
}

fn run_run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut scenario = Scenario::load_from_path(&args.scenario)?;
    if let Some(path) = &args.params {
        scenario.params = Params::load_from_path(path)?;
    }
    let snapshot = match &args.db {
        Some(db) => snapshot_of(&scenario, SqliteStore::open(db)?)?,
        None => snapshot_of(&scenario, MemoryStore::new())?,
    };
    if !snapshot.failures.is_empty() {
        warn!(count = snapshot.failures.len(), "some actions were rejected");
    }
    let hash = reproducibility_hash(&snapshot)?;

    std::fs::create_dir_all(&args.out_dir)?;
    let name = file_stem(&args.scenario);
    let snapshot_path = args.out_dir.join(format!("{}.snapshot.json", name));
    let hash_path = args.out_dir.join(format!("{}.snapshot.sha256", name));
    std::fs::write(&snapshot_path, serde_json::to_string_pretty(&snapshot)?)?;
    std::fs::write(&hash_path, format!("{}\n", hash))?;
    info!(?snapshot_path, ?hash_path, claims = snapshot.claims.len(), "run complete");
    println!("{}", hash);
    Ok(())
}

fn snapshot_of<S: Store>(
    scenario: &Scenario,
    store: S,
) -> Result<StateSnapshot, Box<dyn std::error::Error>> {
    let outcome = run_scenario(scenario, store)?;
    Ok(StateSnapshot::from_outcome(&outcome)?)
}

fn run_query(args: QueryArgs) -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = read_snapshot(&args.snapshot)?;
    let mut store = MemoryStore::new();
    snapshot.import_into(&mut store)?;
    let keeper = Keeper::new(store, snapshot.params.clone());
    let ledger = ShareLedger::from_positions(&snapshot.positions)?;
    let Some(claim) = keeper.claim(args.claim_type, &args.owner)? else {
        eprintln!("no {} claim for {}", args.claim_type, args.owner);
        std::process::exit(1);
    };
    let simulated = keeper.simulate_synchronization(&claim, &ledger.view(args.claim_type))?;
    println!("{}", serde_json::to_string_pretty(&simulated)?);
    Ok(())
}

fn run_params(args: ParamsArgs) -> Result<(), Box<dyn std::error::Error>> {
    let params = match &args.path {
        Some(path) => Params::load_from_path(path)?,
        None => Params::load()?,
    };
    println!("{}", serde_json::to_string_pretty(&params)?);
    Ok(())
}

fn run_report(args: ReportArgs) -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = read_snapshot(&args.snapshot)?;
    let reproducibility_hash_sha256 = reproducibility_hash(&snapshot)?;
    let data = ReportData {
        snapshot,
        reproducibility_hash_sha256,
    };
    let html_path = args.out.unwrap_or_else(|| {
        args.snapshot
            .with_file_name(format!("{}.html", file_stem(&args.snapshot)))
    });
    render_report(&data, &html_path)?;
    info!(?html_path, "report complete");
    Ok(())
}

fn run_verify(args: VerifyArgs) -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = read_snapshot(&args.snapshot)?;
    let sha256_path = args
        .snapshot
        .with_file_name(format!("{}.sha256", file_stem(&args.snapshot)));
    let expected = std::fs::read_to_string(&sha256_path).ok();
    let result = match &expected {
        Some(exp) => verify_snapshot_hash(&snapshot, exp)?,
        None => {
            warn!(?sha256_path, "no hash file found");
            incentive::VerificationResult {
                snapshot_hash: reproducibility_hash(&snapshot)?,
                expected_hash: None,
                matches: false,
            }
        }
    };
    if result.matches {
        println!("OK\t{}", result.snapshot_hash);
    } else {
        eprintln!(
            "MISMATCH\tcomputed={}\texpected={:?}",
            result.snapshot_hash, result.expected_hash
        );
        std::process::exit(1);
    }
    Ok(())
}
