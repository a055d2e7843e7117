use clap::Parser;
use dotenv::dotenv;
use regroup::proposal::load_groupings;
use regroup::resolution::{count_crossings, write_artifact};
use regroup::{CrossingResolver, GroupSnapshot, RegroupError, ResolverConfig, ReverseIndex};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "resolver")]
#[command(
    about = "Resolve proposed exercise groupings against the existing group snapshot",
    long_about = None
)]
struct Cli {
    /// CSV export of existing exercise groups
    snapshot: PathBuf,
    /// JSON array of proposed groupings
    groupings: PathBuf,
    /// Where to write the resolution artifact
    #[arg(short, long, default_value = "resolutions.json")]
    output: PathBuf,
    /// Worker threads
    #[arg(short, long, default_value_t = 8, env = "REGROUP_WORKERS")]
    workers: usize,
    /// Log progress every N groupings (0 disables)
    #[arg(long, default_value_t = 1000)]
    progress_every: usize,
}

fn main() -> Result<(), RegroupError> {
    dotenv().ok();
    regroup::init_tracing("regroup-resolver");
    let cli = Cli::parse();
    let start = Instant::now();

    println!("[resolver] Loading exercise groups from {}", cli.snapshot.display());
    let snapshot = GroupSnapshot::load(&cli.snapshot)?;
    println!(
        "[resolver] Loaded {} exercise groups (max id {})",
        snapshot.len(),
        snapshot.max_group_id()
    );

    println!("[resolver] Building problem-to-groups index...");
    let index = ReverseIndex::build(&snapshot);
    println!("[resolver] Indexed {} problems", index.len());

    println!("[resolver] Loading proposed groupings from {}", cli.groupings.display());
    let groupings = load_groupings(&cli.groupings)?;
    println!("[resolver] Loaded {} proposed groupings", groupings.len());

    let config = ResolverConfig {
        workers: cli.workers.max(1),
        progress_every: cli.progress_every,
    };
    println!("[resolver] Resolving with {} workers...", config.workers);
    let resolver = CrossingResolver::new(&snapshot, &index, config);
    let records = resolver.resolve_all(&groupings)?;

    println!("[resolver] Writing {} records to {}", records.len(), cli.output.display());
    write_artifact(&cli.output, &records)?;

    println!(
        "[resolver] Completed! Processed {} groupings with {} crossings in {:.2}s",
        groupings.len(),
        count_crossings(&records),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}
