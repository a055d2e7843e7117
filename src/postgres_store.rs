use crate::config::StoreConfig;
use crate::error::RegroupError;
use crate::store::{ExerciseStoreLike, ExerciseTxLike};
use crate::{CategoryId, GroupId, ProblemId};
use postgres::{Client, NoTls, Transaction};
use tracing::info;

/// `exercises` / `exercise_groups` tables reached through a synchronous client.
///
/// Exercises are addressed by the external problem id stored as text in
/// `metadata->>'<problem_key>'`.
pub struct PostgresExerciseStore {
    client: Client,
    problem_key: String,
}

impl PostgresExerciseStore {
    pub fn connect(config: &StoreConfig) -> Result<Self, RegroupError> {
        let mut pg = postgres::Config::new();
        pg.host(&config.host)
            .port(config.port)
            .dbname(&config.dbname)
            .user(&config.user);
        if let Some(password) = &config.password {
            pg.password(password);
        }
        let mut client = pg.connect(NoTls)?;
        client.simple_query("SELECT 1")?;
        info!(target: "regroup::store", "connected: {}", config.describe());
        Ok(Self {
            client,
            problem_key: config.problem_key.clone(),
        })
    }
}

impl ExerciseStoreLike for PostgresExerciseStore {
    type Tx<'a>
        = PostgresTx<'a>
    where
        Self: 'a;

    fn begin(&mut self) -> Result<Self::Tx<'_>, RegroupError> {
        let problem_key = self.problem_key.as_str();
        let tx = self.client.transaction()?;
        Ok(PostgresTx { tx, problem_key })
    }
}

pub struct PostgresTx<'a> {
    tx: Transaction<'a>,
    problem_key: &'a str,
}

impl ExerciseTxLike for PostgresTx<'_> {
    fn category_for_problem(
        &mut self,
        problem_id: ProblemId,
    ) -> Result<Option<CategoryId>, RegroupError> {
        let row = self.tx.query_opt(
            "SELECT category_id::BIGINT FROM exercises
             WHERE metadata->>$1 = $2 AND deleted_at IS NULL
             LIMIT 1",
            &[&self.problem_key, &problem_id.to_string()],
        )?;
        Ok(row.map(|r| r.get::<_, i64>(0)))
    }

    fn insert_group(&mut self, category_id: CategoryId) -> Result<GroupId, RegroupError> {
        let row = self.tx.query_one(
            "INSERT INTO exercise_groups (category_id, metadata, created_at, updated_at)
             VALUES ($1::BIGINT, '{}', NOW(), NOW())
             RETURNING id::BIGINT",
            &[&category_id],
        )?;
        Ok(row.get::<_, i64>(0))
    }

    fn soft_delete_group(&mut self, group_id: GroupId) -> Result<(), RegroupError> {
        self.tx.execute(
            "UPDATE exercise_groups SET deleted_at = NOW(), updated_at = NOW()
             WHERE id = $1::BIGINT AND deleted_at IS NULL",
            &[&group_id],
        )?;
        Ok(())
    }

    fn reassign_problem(
        &mut self,
        problem_id: ProblemId,
        group_id: GroupId,
    ) -> Result<u64, RegroupError> {
        Ok(self.tx.execute(
            "UPDATE exercises SET exercise_group_id = $1::BIGINT, updated_at = NOW()
             WHERE metadata->>$2 = $3 AND deleted_at IS NULL",
            &[&group_id, &self.problem_key, &problem_id.to_string()],
        )?)
    }

    fn group_representatives(
        &mut self,
        group_id: GroupId,
    ) -> Result<Vec<(ProblemId, bool)>, RegroupError> {
        let rows = self.tx.query(
            "SELECT CAST(metadata->>$2 AS BIGINT), solution_video_id IS NOT NULL
             FROM exercises
             WHERE exercise_group_id = $1::BIGINT
               AND is_representative = true
               AND deleted_at IS NULL
             ORDER BY id",
            &[&group_id, &self.problem_key],
        )?;
        Ok(rows
            .iter()
            .filter_map(|r| {
                let problem_id: Option<i64> = r.get(0);
                problem_id.map(|p| (p, r.get::<_, bool>(1)))
            })
            .collect())
    }

    fn problem_has_video(&mut self, problem_id: ProblemId) -> Result<Option<bool>, RegroupError> {
        let row = self.tx.query_opt(
            "SELECT solution_video_id IS NOT NULL FROM exercises
             WHERE metadata->>$1 = $2 AND deleted_at IS NULL
             LIMIT 1",
            &[&self.problem_key, &problem_id.to_string()],
        )?;
        Ok(row.map(|r| r.get::<_, bool>(0)))
    }

    fn set_exclusive_representative(
        &mut self,
        group_id: GroupId,
        problem_id: ProblemId,
    ) -> Result<(), RegroupError> {
        self.tx.execute(
            "UPDATE exercises SET is_representative = false, updated_at = NOW()
             WHERE exercise_group_id = $1::BIGINT AND deleted_at IS NULL",
            &[&group_id],
        )?;
        self.tx.execute(
            "UPDATE exercises SET is_representative = true, updated_at = NOW()
             WHERE metadata->>$1 = $2 AND exercise_group_id = $3::BIGINT AND deleted_at IS NULL",
            &[&self.problem_key, &problem_id.to_string(), &group_id],
        )?;
        Ok(())
    }

    fn commit(self) -> Result<(), RegroupError> {
        self.tx.commit()?;
        Ok(())
    }
}
