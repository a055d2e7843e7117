use crate::config::ApplierConfig;
use crate::error::RegroupError;
use crate::representative::{
    select_representative, Provenance, RepresentativeCandidate, RepresentativeSource, Selection,
};
use crate::resolution::{CrossingGroup, ResolutionRecord};
use crate::store::{ExerciseStoreLike, ExerciseTxLike};
use crate::{CategoryId, GroupId, ProblemId};
use itertools::Itertools;
use tracing::{debug, info, warn};

/// What happened to one record inside its chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Applied {
        group_id: GroupId,
        representative: Option<ProblemId>,
        reassigned: usize,
        missing: usize,
    },
    /// None of the member problems exist any more
    Skipped,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub chunks_committed: usize,
    pub applied: usize,
    /// `new_group_id`s of records skipped because no member exists
    pub skipped: Vec<GroupId>,
    pub reassigned: usize,
    pub missing: usize,
}

impl ApplyReport {
    fn absorb(&mut self, record: &ResolutionRecord, outcome: &RecordOutcome) {
        match outcome {
            RecordOutcome::Applied { reassigned, missing, .. } => {
                self.applied += 1;
                self.reassigned += reassigned;
                self.missing += missing;
            }
            RecordOutcome::Skipped => self.skipped.push(record.new_group_id),
        }
    }
}

/// Writes resolution records to a store, one transaction per chunk.
pub struct ResolutionApplier<S> {
    store: S,
    config: ApplierConfig,
}

impl<S: ExerciseStoreLike> ResolutionApplier<S> {
    pub fn new(store: S, config: ApplierConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Apply `records` chunk by chunk. The first failing chunk is rolled back and returned
    /// as [`RegroupError::Chunk`]; chunks committed before it stay committed.
    pub fn apply(&mut self, records: &[ResolutionRecord]) -> Result<ApplyReport, RegroupError> {
        let chunk_size = self.config.chunk_size.max(1);
        let total = records.len();
        let mut report = ApplyReport::default();

        for (n, chunk) in records.chunks(chunk_size).enumerate() {
            let first = n * chunk_size;
            let last = first + chunk.len() - 1;
            if n < self.config.start_chunk {
                debug!(chunk = n, "skipping chunk before start_chunk");
                continue;
            }

            let outcomes = self.apply_chunk(chunk).map_err(|e| RegroupError::Chunk {
                first,
                last,
                source: Box::new(e),
            })?;
            for (record, outcome) in chunk.iter().zip(outcomes.iter()) {
                report.absorb(record, outcome);
            }
            report.chunks_committed += 1;
            info!(chunk = n, "processed batch {}-{} ({}/{})", first, last, last + 1, total);
        }
        Ok(report)
    }

    /// Apply one chunk inside a single transaction. Any error drops the transaction, rolling back
    /// every record of the chunk.
    pub fn apply_chunk(
        &mut self,
        chunk: &[ResolutionRecord],
    ) -> Result<Vec<RecordOutcome>, RegroupError> {
        let mut tx = self.store.begin()?;
        let mut outcomes = Vec::with_capacity(chunk.len());
        for record in chunk {
            let outcome = apply_record(&mut tx, record).map_err(|e| {
                warn!(
                    new_group_id = record.new_group_id,
                    error = %e,
                    "record failed; rolling back chunk"
                );
                e
            })?;
            outcomes.push(outcome);
        }
        tx.commit()?;
        Ok(outcomes)
    }
}

/// Materialize one record: new group, tombstoned crossings, moved members and an exclusive
/// representative.
pub fn apply_record<T: ExerciseTxLike>(
    tx: &mut T,
    record: &ResolutionRecord,
) -> Result<RecordOutcome, RegroupError> {
    // Older artifacts may repeat a member; each problem moves once.
    let members: Vec<ProblemId> = record.problem_ids.iter().copied().unique().collect();

    let Some(category_id) = resolve_category(tx, &members)? else {
        warn!(
            new_group_id = record.new_group_id,
            "skipping group - no valid problems found"
        );
        return Ok(RecordOutcome::Skipped);
    };

    let group_id = tx.insert_group(category_id)?;

    // Representatives have to be read before their exercises move to the new group.
    let crossed = crossed_representatives(tx, &record.crossing_groups)?;

    for crossing in &record.crossing_groups {
        tx.soft_delete_group(crossing.group_id)?;
    }

    let mut reassigned = 0;
    let mut missing = 0;
    for &problem_id in &members {
        if tx.reassign_problem(problem_id, group_id)? > 0 {
            reassigned += 1;
        } else {
            missing += 1;
        }
    }

    let mut source = LiveSource { tx: &mut *tx, crossed };
    let selection = select_representative(&members, &record.crossing_groups, &mut source)?;
    let representative = match selection {
        Some(selection) => set_representative(tx, group_id, record, selection)?,
        None => None,
    };

    debug!(
        new_group_id = record.new_group_id,
        group_id, category_id, reassigned, missing, "applied resolution"
    );
    Ok(RecordOutcome::Applied {
        group_id,
        representative,
        reassigned,
        missing,
    })
}

fn resolve_category<T: ExerciseTxLike>(
    tx: &mut T,
    problem_ids: &[ProblemId],
) -> Result<Option<CategoryId>, RegroupError> {
    for &problem_id in problem_ids {
        if let Some(category_id) = tx.category_for_problem(problem_id)? {
            return Ok(Some(category_id));
        }
    }
    Ok(None)
}

fn crossed_representatives<T: ExerciseTxLike>(
    tx: &mut T,
    crossings: &[CrossingGroup],
) -> Result<Vec<RepresentativeCandidate>, RegroupError> {
    let mut candidates = Vec::new();
    for crossing in crossings {
        for (problem_id, has_video) in tx.group_representatives(crossing.group_id)? {
            candidates.push(RepresentativeCandidate {
                problem_id,
                has_video,
                provenance: Provenance::CrossedGroup(crossing.group_id),
            });
        }
    }
    Ok(candidates)
}

fn set_representative<T: ExerciseTxLike>(
    tx: &mut T,
    group_id: GroupId,
    record: &ResolutionRecord,
    selection: Selection,
) -> Result<Option<ProblemId>, RegroupError> {
    let problem_id = selection.problem_id();
    if tx.problem_has_video(problem_id)?.is_none() {
        warn!(
            new_group_id = record.new_group_id,
            problem_id, "selected representative no longer exists; flags left unchanged"
        );
        return Ok(None);
    }
    if problem_id != record.representative {
        debug!(
            new_group_id = record.new_group_id,
            resolved = record.representative,
            live = problem_id,
            reason = %selection.reason,
            "representative changed since resolution"
        );
    }
    tx.set_exclusive_representative(group_id, problem_id)?;
    Ok(Some(problem_id))
}

/// Application-time view: crossed representatives captured from the live store, member videos
/// queried live.
struct LiveSource<'t, T> {
    tx: &'t mut T,
    crossed: Vec<RepresentativeCandidate>,
}

impl<T: ExerciseTxLike> RepresentativeSource for LiveSource<'_, T> {
    fn crossed_representatives(
        &mut self,
        _crossings: &[CrossingGroup],
    ) -> Result<Vec<RepresentativeCandidate>, RegroupError> {
        Ok(self.crossed.clone())
    }

    fn first_member_with_video(
        &mut self,
        members: &[ProblemId],
    ) -> Result<Option<ProblemId>, RegroupError> {
        for &problem_id in members {
            if self.tx.problem_has_video(problem_id)? == Some(true) {
                return Ok(Some(problem_id));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ExerciseRow, InMemoryExerciseStore};

    fn record(
        new_group_id: GroupId,
        problem_ids: Vec<ProblemId>,
        crossings: Vec<(GroupId, Vec<ProblemId>)>,
    ) -> ResolutionRecord {
        let representative = problem_ids.iter().copied().max().unwrap_or(0);
        ResolutionRecord {
            new_group_id,
            base_group_id: crossings.iter().map(|(g, _)| *g).max().unwrap_or(0),
            problem_ids,
            crossing_groups: crossings
                .into_iter()
                .map(|(group_id, intersection)| CrossingGroup { group_id, intersection })
                .collect(),
            representative,
            selection_reason: String::new(),
        }
    }

    #[test]
    fn test_category_comes_from_first_existing_member() {
        let mut store = InMemoryExerciseStore::new();
        store.add_exercise(ExerciseRow::new(5, 70));
        store.add_exercise(ExerciseRow::new(6, 80));
        let mut tx = store.begin().unwrap();
        assert_eq!(resolve_category(&mut tx, &[1, 6, 5]).unwrap(), Some(80));
        assert_eq!(resolve_category(&mut tx, &[1, 2]).unwrap(), None);
    }

    #[test]
    fn test_representative_read_before_members_move() {
        let mut store = InMemoryExerciseStore::new();
        store.add_group(10, 1);
        store.add_exercise(ExerciseRow::new(1, 1).in_group(10));
        store.add_exercise(ExerciseRow::new(2, 1).in_group(10).representative());
        store.add_exercise(ExerciseRow::new(9, 1).with_video());

        let mut tx = store.begin().unwrap();
        let outcome = apply_record(&mut tx, &record(11, vec![2, 9], vec![(10, vec![2])])).unwrap();
        tx.commit().unwrap();

        match outcome {
            RecordOutcome::Applied { group_id, representative, reassigned, missing } => {
                assert_eq!(group_id, 11);
                assert_eq!(representative, Some(2));
                assert_eq!((reassigned, missing), (2, 0));
            }
            RecordOutcome::Skipped => panic!("record should apply"),
        }
        assert_eq!(store.representatives_of(11), vec![2]);
        assert!(!store.group(10).unwrap().is_live());
    }

    #[test]
    fn test_member_with_video_chosen_when_no_crossed_representative_survives() {
        let mut store = InMemoryExerciseStore::new();
        store.add_exercise(ExerciseRow::new(3, 1));
        store.add_exercise(ExerciseRow::new(4, 1).with_video());
        store.add_exercise(ExerciseRow::new(8, 1));

        let mut tx = store.begin().unwrap();
        let outcome = apply_record(&mut tx, &record(20, vec![3, 4, 8], vec![])).unwrap();
        tx.commit().unwrap();
        assert!(matches!(outcome, RecordOutcome::Applied { representative: Some(4), .. }));
    }

    #[test]
    fn test_vanished_highest_member_leaves_flags_alone() {
        let mut store = InMemoryExerciseStore::new();
        store.add_exercise(ExerciseRow::new(3, 1));

        let mut tx = store.begin().unwrap();
        let outcome = apply_record(&mut tx, &record(20, vec![3, 50], vec![])).unwrap();
        tx.commit().unwrap();
        assert!(matches!(
            outcome,
            RecordOutcome::Applied { representative: None, reassigned: 1, missing: 1, .. }
        ));
        assert!(store.representatives_of(1).is_empty());
    }

    #[test]
    fn test_repeated_member_moves_once() {
        let mut store = InMemoryExerciseStore::new();
        store.add_exercise(ExerciseRow::new(1, 1));

        let mut tx = store.begin().unwrap();
        let outcome = apply_record(&mut tx, &record(20, vec![1, 1], vec![])).unwrap();
        tx.commit().unwrap();
        assert!(matches!(
            outcome,
            RecordOutcome::Applied { representative: Some(1), reassigned: 1, missing: 0, .. }
        ));
    }

    #[test]
    fn test_start_chunk_skips_earlier_chunks() {
        let mut store = InMemoryExerciseStore::new();
        store.add_exercise(ExerciseRow::new(1, 1));
        store.add_exercise(ExerciseRow::new(2, 1));
        let records = vec![record(100, vec![1], vec![]), record(101, vec![2], vec![])];

        let config = ApplierConfig { chunk_size: 1, start_chunk: 1 };
        let mut applier = ResolutionApplier::new(store, config);
        let report = applier.apply(&records).unwrap();
        assert_eq!(report.chunks_committed, 1);
        assert_eq!(report.applied, 1);
        let store = applier.into_store();
        assert_eq!(store.exercise(1).unwrap().group_id, None);
        assert!(store.exercise(2).unwrap().group_id.is_some());
    }
}
