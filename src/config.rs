/// Knobs for the crossing resolver's worker pool
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub workers: usize,
    /// Log a progress line every `progress_every` groupings (0 disables)
    pub progress_every: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            workers: 8,
            progress_every: 1000,
        }
    }
}

impl ResolverConfig {
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApplierConfig {
    /// Records per transaction
    pub chunk_size: usize,
    /// Chunks before this index are assumed committed by an earlier run
    pub start_chunk: usize,
}

impl Default for ApplierConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            start_chunk: 0,
        }
    }
}

/// Connection parameters for the relational store.
///
/// Every field has a `REGROUP_DB_*` environment counterpart; see [`StoreConfig::from_env`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: Option<String>,
    /// Metadata attribute holding the external problem identifier
    pub problem_key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5433,
            dbname: "postgres".to_string(),
            user: "app_user".to_string(),
            password: None,
            problem_key: "mathflatProblemId".to_string(),
        }
    }
}

impl StoreConfig {
    /// Build from `REGROUP_DB_HOST`, `REGROUP_DB_PORT`, `REGROUP_DB_NAME`, `REGROUP_DB_USER`,
    /// `REGROUP_DB_PASSWORD` and `REGROUP_PROBLEM_KEY`, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            host: lookup("REGROUP_DB_HOST").unwrap_or(defaults.host),
            port: lookup("REGROUP_DB_PORT")
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(defaults.port),
            dbname: lookup("REGROUP_DB_NAME").unwrap_or(defaults.dbname),
            user: lookup("REGROUP_DB_USER").unwrap_or(defaults.user),
            password: lookup("REGROUP_DB_PASSWORD").filter(|p| !p.is_empty()),
            problem_key: lookup("REGROUP_PROBLEM_KEY").unwrap_or(defaults.problem_key),
        }
    }

    /// Connection description without the password, for logs
    pub fn describe(&self) -> String {
        format!("host={} port={} dbname={} user={}", self.host, self.port, self.dbname, self.user)
    }
}
