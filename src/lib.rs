pub mod applier;
pub mod config;
pub mod error;
pub mod index;
#[cfg(feature = "postgres")]
pub mod postgres_store;
pub mod proposal;
pub mod representative;
pub mod resolution;
pub mod resolver;
pub mod snapshot;
pub mod store;

pub use applier::{ApplyReport, RecordOutcome, ResolutionApplier};
pub use config::{ApplierConfig, ResolverConfig, StoreConfig};
pub use error::*;
pub use index::ReverseIndex;
#[cfg(feature = "postgres")]
pub use postgres_store::PostgresExerciseStore;
pub use resolution::{CrossingGroup, ResolutionRecord};
pub use resolver::CrossingResolver;
pub use snapshot::{ExistingGroup, GroupSnapshot};
pub use store::{ExerciseStoreLike, ExerciseTxLike, InMemoryExerciseStore};

/// External problem identifier
pub type ProblemId = i64;
pub type GroupId = i64;
pub type CategoryId = i64;

/// Install a fmt subscriber filtered by `RUST_LOG` (default `info`).
pub fn init_tracing(service_name: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!(service = service_name, "tracing initialized");
    }
}
