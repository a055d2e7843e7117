use crate::error::RegroupError;
use crate::{CategoryId, GroupId, ProblemId};
use rustc_hash::FxHashSet;
use std::collections::BTreeMap;
use std::time::SystemTime;

/// A relational store that hands out transactions.
pub trait ExerciseStoreLike {
    type Tx<'a>: ExerciseTxLike
    where
        Self: 'a;

    fn begin(&mut self) -> Result<Self::Tx<'_>, RegroupError>;
}

/// The statements the applier issues inside one chunk transaction.
///
/// Dropping a transaction without calling `commit` rolls it back.
pub trait ExerciseTxLike {
    /// Category of the live exercise keyed by `problem_id`
    fn category_for_problem(
        &mut self,
        problem_id: ProblemId,
    ) -> Result<Option<CategoryId>, RegroupError>;
    fn insert_group(&mut self, category_id: CategoryId) -> Result<GroupId, RegroupError>;
    fn soft_delete_group(&mut self, group_id: GroupId) -> Result<(), RegroupError>;
    /// Returns the number of rows moved; 0 when the problem no longer exists.
    fn reassign_problem(
        &mut self,
        problem_id: ProblemId,
        group_id: GroupId,
    ) -> Result<u64, RegroupError>;
    /// Live members of `group_id` flagged as representative, with their video flag
    fn group_representatives(
        &mut self,
        group_id: GroupId,
    ) -> Result<Vec<(ProblemId, bool)>, RegroupError>;
    /// `None` when the problem no longer exists
    fn problem_has_video(&mut self, problem_id: ProblemId) -> Result<Option<bool>, RegroupError>;
    /// Clear the flag on every live member of `group_id`, then set it on `problem_id`.
    fn set_exclusive_representative(
        &mut self,
        group_id: GroupId,
        problem_id: ProblemId,
    ) -> Result<(), RegroupError>;
    fn commit(self) -> Result<(), RegroupError>
    where
        Self: Sized;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseRow {
    pub problem_id: ProblemId,
    pub category_id: CategoryId,
    pub group_id: Option<GroupId>,
    pub is_representative: bool,
    pub has_solution_video: bool,
    pub deleted_at: Option<SystemTime>,
}

impl ExerciseRow {
    pub fn new(problem_id: ProblemId, category_id: CategoryId) -> Self {
        Self {
            problem_id,
            category_id,
            group_id: None,
            is_representative: false,
            has_solution_video: false,
            deleted_at: None,
        }
    }

    pub fn in_group(mut self, group_id: GroupId) -> Self {
        self.group_id = Some(group_id);
        self
    }

    pub fn representative(mut self) -> Self {
        self.is_representative = true;
        self
    }

    pub fn with_video(mut self) -> Self {
        self.has_solution_video = true;
        self
    }

    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupRow {
    pub category_id: CategoryId,
    pub deleted_at: Option<SystemTime>,
}

impl GroupRow {
    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct StoreState {
    pub exercises: Vec<ExerciseRow>,
    pub groups: BTreeMap<GroupId, GroupRow>,
}

impl StoreState {
    fn live_exercises(&self, problem_id: ProblemId) -> impl Iterator<Item = &ExerciseRow> {
        self.exercises
            .iter()
            .filter(move |e| e.is_live() && e.problem_id == problem_id)
    }

    fn next_group_id(&self) -> GroupId {
        self.groups.keys().next_back().copied().unwrap_or(0) + 1
    }
}

/// Store kept in memory. Each transaction works on a copy that replaces the state on commit.
#[derive(Debug, Default)]
pub struct InMemoryExerciseStore {
    state: StoreState,
    rejected_categories: FxHashSet<CategoryId>,
}

impl InMemoryExerciseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_group(&mut self, group_id: GroupId, category_id: CategoryId) {
        self.state.groups.insert(
            group_id,
            GroupRow {
                category_id,
                deleted_at: None,
            },
        );
    }

    pub fn add_exercise(&mut self, row: ExerciseRow) {
        self.state.exercises.push(row);
    }

    /// Make `insert_group` fail for this category, as a constraint violation would.
    pub fn reject_category(&mut self, category_id: CategoryId) {
        self.rejected_categories.insert(category_id);
    }

    pub fn state(&self) -> &StoreState {
        &self.state
    }

    pub fn group(&self, group_id: GroupId) -> Option<&GroupRow> {
        self.state.groups.get(&group_id)
    }

    pub fn live_group_ids(&self) -> Vec<GroupId> {
        self.state
            .groups
            .iter()
            .filter(|(_, g)| g.is_live())
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn exercise(&self, problem_id: ProblemId) -> Option<&ExerciseRow> {
        self.state.live_exercises(problem_id).next()
    }

    /// Live problems flagged as representative of `group_id`
    pub fn representatives_of(&self, group_id: GroupId) -> Vec<ProblemId> {
        self.state
            .exercises
            .iter()
            .filter(|e| e.is_live() && e.group_id == Some(group_id) && e.is_representative)
            .map(|e| e.problem_id)
            .collect()
    }
}

impl ExerciseStoreLike for InMemoryExerciseStore {
    type Tx<'a>
        = InMemoryTx<'a>
    where
        Self: 'a;

    fn begin(&mut self) -> Result<Self::Tx<'_>, RegroupError> {
        let working = self.state.clone();
        Ok(InMemoryTx { store: self, working })
    }
}

pub struct InMemoryTx<'a> {
    store: &'a mut InMemoryExerciseStore,
    working: StoreState,
}

impl ExerciseTxLike for InMemoryTx<'_> {
    fn category_for_problem(
        &mut self,
        problem_id: ProblemId,
    ) -> Result<Option<CategoryId>, RegroupError> {
        Ok(self.working.live_exercises(problem_id).next().map(|e| e.category_id))
    }

    fn insert_group(&mut self, category_id: CategoryId) -> Result<GroupId, RegroupError> {
        if self.store.rejected_categories.contains(&category_id) {
            return Err(RegroupError::Database(format!(
                "insert into exercise_groups rejected for category {}",
                category_id
            )));
        }
        let group_id = self.working.next_group_id();
        self.working.groups.insert(
            group_id,
            GroupRow {
                category_id,
                deleted_at: None,
            },
        );
        Ok(group_id)
    }

    fn soft_delete_group(&mut self, group_id: GroupId) -> Result<(), RegroupError> {
        if let Some(group) = self.working.groups.get_mut(&group_id) {
            if group.deleted_at.is_none() {
                group.deleted_at = Some(SystemTime::now());
            }
        }
        Ok(())
    }

    fn reassign_problem(
        &mut self,
        problem_id: ProblemId,
        group_id: GroupId,
    ) -> Result<u64, RegroupError> {
        let mut moved = 0;
        for row in self
            .working
            .exercises
            .iter_mut()
            .filter(|e| e.is_live() && e.problem_id == problem_id)
        {
            row.group_id = Some(group_id);
            moved += 1;
        }
        Ok(moved)
    }

    fn group_representatives(
        &mut self,
        group_id: GroupId,
    ) -> Result<Vec<(ProblemId, bool)>, RegroupError> {
        Ok(self
            .working
            .exercises
            .iter()
            .filter(|e| e.is_live() && e.group_id == Some(group_id) && e.is_representative)
            .map(|e| (e.problem_id, e.has_solution_video))
            .collect())
    }

    fn problem_has_video(&mut self, problem_id: ProblemId) -> Result<Option<bool>, RegroupError> {
        Ok(self
            .working
            .live_exercises(problem_id)
            .next()
            .map(|e| e.has_solution_video))
    }

    fn set_exclusive_representative(
        &mut self,
        group_id: GroupId,
        problem_id: ProblemId,
    ) -> Result<(), RegroupError> {
        for row in self
            .working
            .exercises
            .iter_mut()
            .filter(|e| e.is_live() && e.group_id == Some(group_id))
        {
            row.is_representative = row.problem_id == problem_id;
        }
        Ok(())
    }

    fn commit(self) -> Result<(), RegroupError> {
        self.store.state = self.working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> InMemoryExerciseStore {
        let mut store = InMemoryExerciseStore::new();
        store.add_group(10, 7);
        store.add_exercise(ExerciseRow::new(1, 7).in_group(10).representative());
        store.add_exercise(ExerciseRow::new(2, 7).in_group(10).with_video());
        store
    }

    #[test]
    fn test_dropped_transaction_rolls_back() {
        let mut store = store();
        {
            let mut tx = store.begin().unwrap();
            tx.soft_delete_group(10).unwrap();
            let new_id = tx.insert_group(7).unwrap();
            assert_eq!(new_id, 11);
        }
        assert!(store.group(10).unwrap().is_live());
        assert!(store.group(11).is_none());
    }

    #[test]
    fn test_commit_publishes_changes() {
        let mut store = store();
        let mut tx = store.begin().unwrap();
        let new_id = tx.insert_group(7).unwrap();
        assert_eq!(tx.reassign_problem(2, new_id).unwrap(), 1);
        assert_eq!(tx.reassign_problem(99, new_id).unwrap(), 0);
        tx.set_exclusive_representative(new_id, 2).unwrap();
        tx.commit().unwrap();
        assert_eq!(store.representatives_of(new_id), vec![2]);
        assert_eq!(store.representatives_of(10), vec![1]);
    }

    #[test]
    fn test_deleted_exercises_are_invisible() {
        let mut store = store();
        let mut gone = ExerciseRow::new(3, 8);
        gone.deleted_at = Some(SystemTime::now());
        store.add_exercise(gone);
        let mut tx = store.begin().unwrap();
        assert_eq!(tx.category_for_problem(3).unwrap(), None);
        assert_eq!(tx.problem_has_video(3).unwrap(), None);
        assert_eq!(tx.problem_has_video(2).unwrap(), Some(true));
        assert_eq!(tx.group_representatives(10).unwrap(), vec![(1, false)]);
    }

    #[test]
    fn test_rejected_category_fails_insert() {
        let mut store = store();
        store.reject_category(7);
        let mut tx = store.begin().unwrap();
        assert!(matches!(tx.insert_group(7), Err(RegroupError::Database(_))));
    }
}
