use regroup::proposal::ProposedGrouping;
use regroup::{
    CrossingGroup, CrossingResolver, ExistingGroup, GroupSnapshot, ResolverConfig, ReverseIndex,
};
use std::collections::{BTreeMap, BTreeSet};

fn resolve(
    snapshot: &GroupSnapshot,
    groupings: &[ProposedGrouping],
    workers: usize,
) -> Vec<regroup::ResolutionRecord> {
    let index = ReverseIndex::build(snapshot);
    CrossingResolver::new(snapshot, &index, ResolverConfig::with_workers(workers))
        .resolve_all(groupings)
        .expect("resolution should succeed")
}

#[test]
fn test_existing_representative_carried_over_without_video() {
    let snapshot = GroupSnapshot::from_groups(vec![
        ExistingGroup::new(10, vec![1, 2, 3]).with_representative(2, false),
    ]);

    let records = resolve(&snapshot, &[vec![2, 3, 4]], 8);

    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(
        record.crossing_groups,
        vec![CrossingGroup { group_id: 10, intersection: vec![2, 3] }]
    );
    assert_eq!(record.new_group_id, 11);
    assert_eq!(record.base_group_id, 10);
    assert_eq!(record.representative, 2);
    assert_eq!(record.selection_reason, "existing representative carried over, no video evidence");
}

#[test]
fn test_lowest_crossed_group_wins_between_video_representatives() {
    let snapshot = GroupSnapshot::from_groups(vec![
        ExistingGroup::new(10, vec![1, 2, 3]).with_representative(2, true),
        ExistingGroup::new(20, vec![4, 5]).with_representative(5, true),
    ]);

    // 5 sits in group 20 but is not proposed, so only 2 survives as a candidate
    let records = resolve(&snapshot, &[vec![2, 4]], 8);
    let record = &records[0];
    let crossed: Vec<_> = record.crossing_groups.iter().map(|c| c.group_id).collect();
    assert_eq!(crossed, vec![10, 20]);
    assert_eq!(record.representative, 2);
    assert_eq!(record.base_group_id, 20);
    assert_eq!(
        record.selection_reason,
        "existing representative carried over, with video evidence"
    );

    // With both representatives proposed, the lower group id breaks the tie
    let records = resolve(&snapshot, &[vec![5, 2, 4]], 8);
    assert_eq!(records[0].representative, 2);
}

#[test]
fn test_no_crossing_selects_highest_id() {
    let snapshot = GroupSnapshot::from_groups(vec![
        ExistingGroup::new(10, vec![1, 2, 3]).with_representative(2, false),
    ]);

    let records = resolve(&snapshot, &[vec![40, 70, 55]], 8);
    let record = &records[0];
    assert!(record.crossing_groups.is_empty());
    assert_eq!(record.base_group_id, 0);
    assert_eq!(record.representative, 70);
    assert_eq!(record.selection_reason, "no crossing");
}

fn wide_fixture() -> (GroupSnapshot, Vec<ProposedGrouping>) {
    let mut groups = Vec::new();
    for g in 1..=300i64 {
        let base = g * 3;
        let mut group = ExistingGroup::new(g * 2, vec![base, base + 1, base + 2, base + 4]);
        if g % 3 == 0 {
            group = group.with_representative(base + 1, g % 2 == 0);
        }
        groups.push(group);
    }
    let snapshot = GroupSnapshot::from_groups(groups);

    let mut groupings: Vec<ProposedGrouping> = Vec::new();
    for i in 0..500i64 {
        let start = (i * 7) % 900;
        groupings.push(vec![start, start + 2, start + 5, 2000 + i]);
        if i % 50 == 0 {
            groupings.push(vec![]);
        }
    }
    (snapshot, groupings)
}

#[test]
fn test_worker_count_does_not_change_outcomes() {
    let (snapshot, groupings) = wide_fixture();
    let max_existing = snapshot.max_group_id();

    let mut outcome_sets = Vec::new();
    for workers in [1, 8, 64] {
        let records = resolve(&snapshot, &groupings, workers);

        let ids: BTreeSet<_> = records.iter().map(|r| r.new_group_id).collect();
        assert_eq!(ids.len(), records.len(), "ids must be distinct with {} workers", workers);
        assert!(records.iter().all(|r| r.new_group_id > max_existing));
        assert!(records.windows(2).all(|w| w[0].new_group_id < w[1].new_group_id));

        let outcomes: BTreeMap<Vec<i64>, (i64, String)> = records
            .iter()
            .map(|r| {
                let mut members = r.problem_ids.clone();
                members.sort_unstable();
                (members, (r.representative, r.selection_reason.clone()))
            })
            .collect();
        outcome_sets.push(outcomes);
    }
    assert_eq!(outcome_sets[0], outcome_sets[1]);
    assert_eq!(outcome_sets[0], outcome_sets[2]);
}

#[test]
fn test_intersections_match_set_semantics() {
    let (snapshot, groupings) = wide_fixture();
    let records = resolve(&snapshot, &groupings, 8);

    for record in &records {
        let proposed: BTreeSet<_> = record.problem_ids.iter().copied().collect();
        let crossed: BTreeSet<_> = record.crossing_groups.iter().map(|c| c.group_id).collect();

        for group in snapshot.groups() {
            let expected: Vec<i64> = group
                .problem_ids
                .iter()
                .copied()
                .filter(|p| proposed.contains(p))
                .collect();
            match record.crossing_groups.iter().find(|c| c.group_id == group.id) {
                Some(crossing) => assert_eq!(crossing.intersection, expected),
                None => assert!(expected.is_empty(), "group {} should have crossed", group.id),
            }
        }
        assert_eq!(record.base_group_id, crossed.iter().next_back().copied().unwrap_or(0));
    }
}

#[test]
fn test_empty_groupings_emit_nothing() {
    let snapshot = GroupSnapshot::from_groups(vec![ExistingGroup::new(4, vec![1])]);
    let records = resolve(&snapshot, &[vec![], vec![1], vec![]], 2);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].new_group_id, 5);
}
