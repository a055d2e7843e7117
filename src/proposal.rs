use crate::error::RegroupError;
use crate::ProblemId;
use itertools::Itertools;
use std::io::BufReader;
use std::path::Path;

/// A batch member: problem ids proposed to share one group.
pub type ProposedGrouping = Vec<ProblemId>;

/// Load `[[id, ...], ...]`. Duplicate ids inside one grouping are collapsed, first occurrence kept.
pub fn load_groupings(path: &Path) -> Result<Vec<ProposedGrouping>, RegroupError> {
    let file = std::fs::File::open(path)?;
    let raw: Vec<Vec<ProblemId>> = serde_json::from_reader(BufReader::new(file))?;
    Ok(normalize(raw))
}

pub fn parse_groupings(text: &str) -> Result<Vec<ProposedGrouping>, RegroupError> {
    let raw: Vec<Vec<ProblemId>> = serde_json::from_str(text)?;
    Ok(normalize(raw))
}

fn normalize(raw: Vec<Vec<ProblemId>>) -> Vec<ProposedGrouping> {
    raw.into_iter()
        .map(|grouping| grouping.into_iter().unique().collect())
        .collect()
}
