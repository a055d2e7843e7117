use crate::error::RegroupError;
use crate::{GroupId, ProblemId};
use serde::{Deserialize, Serialize};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Overlap between a proposed grouping and one existing group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossingGroup {
    #[serde(alias = "ID")]
    pub group_id: GroupId,
    #[serde(alias = "Intersection", default)]
    pub intersection: Vec<ProblemId>,
}

/// Outcome of resolving one proposed grouping; the hand-off between resolver and applier.
///
/// Field order is the serialized order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionRecord {
    #[serde(alias = "NewGroupID")]
    pub new_group_id: GroupId,
    #[serde(alias = "BaseGroupID")]
    pub base_group_id: GroupId,
    #[serde(alias = "ProblemIDs", default)]
    pub problem_ids: Vec<ProblemId>,
    #[serde(alias = "CrossingGroups", default)]
    pub crossing_groups: Vec<CrossingGroup>,
    #[serde(alias = "Representative")]
    pub representative: ProblemId,
    #[serde(alias = "SelectionReason", default)]
    pub selection_reason: String,
}

impl ResolutionRecord {
    pub fn has_crossings(&self) -> bool {
        !self.crossing_groups.is_empty()
    }
}

pub fn write_artifact(path: &Path, records: &[ResolutionRecord]) -> Result<(), RegroupError> {
    let file = std::fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

pub fn read_artifact(path: &Path) -> Result<Vec<ResolutionRecord>, RegroupError> {
    let file = std::fs::File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Records that crossed at least one existing group
pub fn count_crossings(records: &[ResolutionRecord]) -> usize {
    records.iter().filter(|r| r.has_crossings()).count()
}
