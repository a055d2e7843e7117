use crate::config::ResolverConfig;
use crate::error::RegroupError;
use crate::index::ReverseIndex;
use crate::proposal::ProposedGrouping;
use crate::representative::{select_representative, SnapshotSource};
use crate::resolution::{CrossingGroup, ResolutionRecord};
use crate::snapshot::GroupSnapshot;
use crate::{GroupId, ProblemId};
use crossbeam_channel::{Receiver, Sender};
use rustc_hash::FxHashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::{debug, info};

/// Matches proposed groupings against the snapshot and assigns fresh group ids.
///
/// The snapshot and index are only read; the id counter is the single piece of
/// shared mutable state between workers.
pub struct CrossingResolver<'a> {
    snapshot: &'a GroupSnapshot,
    index: &'a ReverseIndex,
    config: ResolverConfig,
}

impl<'a> CrossingResolver<'a> {
    pub fn new(
        snapshot: &'a GroupSnapshot,
        index: &'a ReverseIndex,
        config: ResolverConfig,
    ) -> Self {
        Self { snapshot, index, config }
    }

    /// Resolve every grouping on the worker pool. Output is sorted by new group id;
    /// empty groupings produce no record and consume no id.
    pub fn resolve_all(
        &self,
        groupings: &[ProposedGrouping],
    ) -> Result<Vec<ResolutionRecord>, RegroupError> {
        let next_id = AtomicI64::new(self.snapshot.max_group_id() + 1);
        let workers = self.config.workers.max(1);

        let (job_tx, job_rx) = crossbeam_channel::unbounded::<usize>();
        let (result_tx, result_rx) =
            crossbeam_channel::unbounded::<Result<ResolutionRecord, RegroupError>>();

        for i in 0..groupings.len() {
            job_tx
                .send(i)
                .map_err(|e| RegroupError::Other(format!("work queue closed: {}", e)))?;
        }
        drop(job_tx);

        info!(groupings = groupings.len(), workers, "resolving crossings");

        std::thread::scope(|scope| {
            for worker in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                let next_id = &next_id;
                scope.spawn(move || self.work(worker, job_rx, result_tx, groupings, next_id));
            }
        });
        drop(result_tx);

        let mut records = Vec::with_capacity(groupings.len());
        for result in result_rx.iter() {
            records.push(result?);
        }
        records.sort_by_key(|r| r.new_group_id);
        Ok(records)
    }

    fn work(
        &self,
        worker: usize,
        jobs: Receiver<usize>,
        results: Sender<Result<ResolutionRecord, RegroupError>>,
        groupings: &[ProposedGrouping],
        next_id: &AtomicI64,
    ) {
        for i in jobs.iter() {
            if self.config.progress_every > 0 && i % self.config.progress_every == 0 {
                info!(worker, "processing grouping {}/{}", i + 1, groupings.len());
            }
            if let Some(result) = self.resolve_one(&groupings[i], next_id).transpose() {
                if results.send(result).is_err() {
                    break;
                }
            }
        }
        debug!(worker, "worker drained");
    }

    /// Resolve a single grouping, drawing its new id from `next_id`.
    pub fn resolve_one(
        &self,
        grouping: &[ProblemId],
        next_id: &AtomicI64,
    ) -> Result<Option<ResolutionRecord>, RegroupError> {
        if grouping.is_empty() {
            return Ok(None);
        }

        let (crossing_groups, base_group_id) = self.crossings_for(grouping);
        let new_group_id = next_id.fetch_add(1, Ordering::Relaxed);

        let mut source = SnapshotSource::new(self.snapshot);
        let Some(selection) = select_representative(grouping, &crossing_groups, &mut source)? else {
            return Ok(None);
        };

        Ok(Some(ResolutionRecord {
            new_group_id,
            base_group_id,
            problem_ids: grouping.to_vec(),
            crossing_groups,
            representative: selection.problem_id(),
            selection_reason: selection.reason.as_str().to_string(),
        }))
    }

    /// Existing groups overlapping `grouping`, ascending by id, plus the highest crossed id
    /// (0 if none).
    pub fn crossings_for(&self, grouping: &[ProblemId]) -> (Vec<CrossingGroup>, GroupId) {
        let wanted: FxHashSet<ProblemId> = grouping.iter().copied().collect();
        let mut crossings = Vec::new();
        let mut base_group_id = 0;

        for group_id in self.index.crossing_candidates(grouping) {
            let Some(group) = self.snapshot.get(group_id) else {
                continue;
            };
            let intersection = intersect(&wanted, &group.problem_ids);
            if intersection.is_empty() {
                continue;
            }
            base_group_id = base_group_id.max(group_id);
            crossings.push(CrossingGroup { group_id, intersection });
        }
        (crossings, base_group_id)
    }
}

/// `members` filtered to `wanted`, keeping first occurrences in `members` order.
pub fn intersect(wanted: &FxHashSet<ProblemId>, members: &[ProblemId]) -> Vec<ProblemId> {
    let mut seen = FxHashSet::default();
    members
        .iter()
        .copied()
        .filter(|p| wanted.contains(p) && seen.insert(*p))
        .collect()
}
