use crate::error::RegroupError;
use crate::{GroupId, ProblemId};
use itertools::Itertools;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use tracing::warn;

/// One pre-existing exercise group as exported from the store.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExistingGroup {
    pub id: GroupId,
    pub problem_ids: Vec<ProblemId>,
    pub video_flags: FxHashMap<ProblemId, bool>,
    pub representative_id: Option<ProblemId>,
    pub has_representative: bool,
    pub representative_has_video: bool,
}

impl ExistingGroup {
    pub fn new(id: GroupId, problem_ids: Vec<ProblemId>) -> Self {
        Self {
            id,
            problem_ids: problem_ids.into_iter().unique().collect(),
            ..Self::default()
        }
    }

    pub fn with_representative(mut self, problem_id: ProblemId, has_video: bool) -> Self {
        self.representative_id = Some(problem_id);
        self.has_representative = true;
        self.representative_has_video = has_video;
        self
    }

    /// The representative only counts when the flag is set and the id is real.
    pub fn current_representative(&self) -> Option<ProblemId> {
        match self.representative_id {
            Some(id) if self.has_representative && id > 0 => Some(id),
            _ => None,
        }
    }

    pub fn has_video(&self, problem_id: ProblemId) -> bool {
        self.video_flags.get(&problem_id).copied().unwrap_or(false)
    }

    pub fn contains(&self, problem_id: ProblemId) -> bool {
        self.problem_ids.contains(&problem_id)
    }
}

/// Read-only universe of existing groups, ordered by id.
#[derive(Debug, Clone, Default)]
pub struct GroupSnapshot {
    groups: BTreeMap<GroupId, ExistingGroup>,
}

impl GroupSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_groups<I: IntoIterator<Item = ExistingGroup>>(groups: I) -> Self {
        let mut snapshot = Self::new();
        for group in groups {
            snapshot.insert(group);
        }
        snapshot
    }

    /// Later rows with the same id replace earlier ones.
    pub fn insert(&mut self, group: ExistingGroup) {
        self.groups.insert(group.id, group);
    }

    pub fn get(&self, id: GroupId) -> Option<&ExistingGroup> {
        self.groups.get(&id)
    }

    pub fn groups(&self) -> impl Iterator<Item = &ExistingGroup> {
        self.groups.values()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn max_group_id(&self) -> GroupId {
        self.groups.keys().next_back().copied().unwrap_or(0).max(0)
    }

    pub fn load(path: &Path) -> Result<Self, RegroupError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Parse the CSV export. The header row is skipped and trailing columns may be missing.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, RegroupError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let mut snapshot = Self::new();
        for (row, record) in csv_reader.records().enumerate() {
            let record = record?;
            let raw_id = record.get(0).unwrap_or("").trim();
            let Ok(id) = raw_id.parse::<GroupId>() else {
                warn!(
                    row = row + 1,
                    value = raw_id,
                    "skipping snapshot row with non-integer group id"
                );
                continue;
            };
            snapshot.insert(parse_row(id, &record));
        }
        Ok(snapshot)
    }
}

fn parse_row(id: GroupId, record: &csv::StringRecord) -> ExistingGroup {
    let field = |i: usize| record.get(i).map(str::trim).unwrap_or("");

    let member_tokens = split_tokens(field(1));
    let flag_tokens = split_tokens(field(2));

    if !flag_tokens.is_empty() && flag_tokens.len() != member_tokens.len() {
        warn!(
            group_id = id,
            members = member_tokens.len(),
            flags = flag_tokens.len(),
            "video flag count does not match member count; unmatched members get no video"
        );
    }

    // Flags align with the raw tokens, so pair before dropping unparseable ids.
    // Past this point they are keyed by problem id.
    let mut members = Vec::with_capacity(member_tokens.len());
    let mut video_flags = FxHashMap::default();
    for (position, token) in member_tokens.iter().enumerate() {
        let Ok(problem_id) = token.parse::<ProblemId>() else {
            continue;
        };
        members.push(problem_id);
        if let Some(flag) = flag_tokens.get(position) {
            *video_flags.entry(problem_id).or_insert(false) |= parse_bool(flag);
        }
    }

    let representative = field(3).parse::<ProblemId>().unwrap_or(0);

    ExistingGroup {
        id,
        problem_ids: members.into_iter().unique().collect(),
        video_flags,
        representative_id: (representative > 0).then_some(representative),
        has_representative: parse_bool(field(4)),
        representative_has_video: parse_bool(field(5)),
    }
}

/// Comma-separated tokens, trimmed but kept in place even when empty. A blank column has none.
fn split_tokens(value: &str) -> Vec<&str> {
    if value.is_empty() {
        return Vec::new();
    }
    value.split(',').map(str::trim).collect()
}

fn parse_bool(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}
