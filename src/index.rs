use crate::snapshot::GroupSnapshot;
use crate::{GroupId, ProblemId};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

/// Problem id -> ids of the existing groups that contain it.
///
/// A problem can sit in several groups before reconciliation, so each entry is a
/// sorted, duplicate-free list.
#[derive(Debug, Clone, Default)]
pub struct ReverseIndex {
    map: FxHashMap<ProblemId, Vec<GroupId>>,
}

impl ReverseIndex {
    pub fn build(snapshot: &GroupSnapshot) -> Self {
        let mut map: FxHashMap<ProblemId, Vec<GroupId>> = FxHashMap::default();
        // Snapshot iterates in ascending id order, so pushes keep every list sorted.
        for group in snapshot.groups() {
            for &problem_id in &group.problem_ids {
                let entry = map.entry(problem_id).or_default();
                if entry.last() != Some(&group.id) {
                    entry.push(group.id);
                }
            }
        }
        Self { map }
    }

    pub fn groups_for(&self, problem_id: ProblemId) -> &[GroupId] {
        self.map.get(&problem_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Union of the groups of every problem in `grouping`, ascending.
    pub fn crossing_candidates(&self, grouping: &[ProblemId]) -> BTreeSet<GroupId> {
        grouping
            .iter()
            .flat_map(|&p| self.groups_for(p).iter().copied())
            .collect()
    }

    /// Number of indexed problems
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
