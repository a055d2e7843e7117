use clap::Parser;
use dotenv::dotenv;
use regroup::resolution::read_artifact;
use regroup::{ApplierConfig, PostgresExerciseStore, RegroupError, ResolutionApplier, StoreConfig};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "applier")]
#[command(
    about = "Apply a resolution artifact to the exercise database in batches",
    long_about = None
)]
struct Cli {
    /// Resolution artifact written by `resolver`
    resolutions: PathBuf,
    #[arg(long, env = "REGROUP_DB_HOST", default_value = "localhost")]
    host: String,
    #[arg(long, env = "REGROUP_DB_PORT", default_value_t = 5433)]
    port: u16,
    #[arg(long = "db", env = "REGROUP_DB_NAME", default_value = "postgres")]
    dbname: String,
    #[arg(long, env = "REGROUP_DB_USER", default_value = "app_user")]
    user: String,
    /// Metadata attribute holding the external problem id
    #[arg(long, env = "REGROUP_PROBLEM_KEY", default_value = "mathflatProblemId")]
    problem_key: String,
    /// Records per transaction
    #[arg(long, default_value_t = 1000)]
    chunk_size: usize,
    /// Resume from this chunk index
    #[arg(long, default_value_t = 0)]
    start_chunk: usize,
}

fn main() -> Result<(), RegroupError> {
    dotenv().ok();
    regroup::init_tracing("regroup-applier");
    let cli = Cli::parse();
    let start = Instant::now();

    let store_config = StoreConfig {
        host: cli.host,
        port: cli.port,
        dbname: cli.dbname,
        user: cli.user,
        problem_key: cli.problem_key,
        ..StoreConfig::from_env()
    };

    println!("[applier] Connecting to database: {}", store_config.describe());
    let store = PostgresExerciseStore::connect(&store_config)?;

    println!("[applier] Loading results from {}", cli.resolutions.display());
    let records = read_artifact(&cli.resolutions)?;
    println!("[applier] Loaded {} results", records.len());

    let config = ApplierConfig {
        chunk_size: cli.chunk_size.max(1),
        start_chunk: cli.start_chunk,
    };
    println!(
        "[applier] Uploading in chunks of {} starting at chunk {}...",
        config.chunk_size, config.start_chunk
    );
    let mut applier = ResolutionApplier::new(store, config);
    let report = applier.apply(&records)?;

    println!(
        "[applier] Upload completed: {} chunks, {} groups created, {} skipped, {} problems moved, {} missing ({:.2}s)",
        report.chunks_committed,
        report.applied,
        report.skipped.len(),
        report.reassigned,
        report.missing,
        start.elapsed().as_secs_f64()
    );
    Ok(())
}
