//! Representative selection.
//!
//! One policy serves both phases: the resolver asks a snapshot-backed source, the
//! applier asks a source backed by the live store transaction.
//!
//! Precedence:
//! 1. a crossed group's current representative that is a member of the new group and has a video
//! 2. such a representative without a video
//! 3. a member that currently has a video (only sources that can observe it)
//! 4. the highest member id
//!
//! Crossings are expected in ascending existing-group order, which makes the lowest
//! crossed group id win ties inside tiers 1 and 2.

use crate::error::RegroupError;
use crate::resolution::CrossingGroup;
use crate::snapshot::GroupSnapshot;
use crate::{GroupId, ProblemId};
use rustc_hash::FxHashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    CrossedGroup(GroupId),
    Member,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepresentativeCandidate {
    pub problem_id: ProblemId,
    pub has_video: bool,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionReason {
    CarriedOverWithVideo,
    CarriedOver,
    MemberWithVideo,
    NoCrossing,
    NoCrossedRepresentative,
    CrossedRepresentativeOutside,
}

impl SelectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionReason::CarriedOverWithVideo => {
                "existing representative carried over, with video evidence"
            }
            SelectionReason::CarriedOver => {
                "existing representative carried over, no video evidence"
            }
            SelectionReason::MemberWithVideo => "member with solution video",
            SelectionReason::NoCrossing => "no crossing",
            SelectionReason::NoCrossedRepresentative => "crossed groups had no representative",
            SelectionReason::CrossedRepresentativeOutside => {
                "crossed representatives outside grouping"
            }
        }
    }
}

impl fmt::Display for SelectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub candidate: RepresentativeCandidate,
    pub reason: SelectionReason,
}

impl Selection {
    pub fn problem_id(&self) -> ProblemId {
        self.candidate.problem_id
    }
}

/// State the policy needs, from whichever side of the pipeline is asking.
pub trait RepresentativeSource {
    /// Current representatives of the crossed groups, in crossing order.
    fn crossed_representatives(
        &mut self,
        crossings: &[CrossingGroup],
    ) -> Result<Vec<RepresentativeCandidate>, RegroupError>;

    /// First member, in member order, that currently has a solution video.
    /// Sources without per-member video knowledge return `Ok(None)`.
    fn first_member_with_video(
        &mut self,
        members: &[ProblemId],
    ) -> Result<Option<ProblemId>, RegroupError>;
}

pub fn select_representative<S>(
    members: &[ProblemId],
    crossings: &[CrossingGroup],
    source: &mut S,
) -> Result<Option<Selection>, RegroupError>
where
    S: RepresentativeSource + ?Sized,
{
    let Some(&highest) = members.iter().max() else {
        return Ok(None);
    };

    let existing = source.crossed_representatives(crossings)?;
    let member_set: FxHashSet<ProblemId> = members.iter().copied().collect();
    let inside: Vec<RepresentativeCandidate> = existing
        .iter()
        .copied()
        .filter(|c| member_set.contains(&c.problem_id))
        .collect();

    if let Some(candidate) = inside.iter().find(|c| c.has_video) {
        return Ok(Some(Selection {
            candidate: *candidate,
            reason: SelectionReason::CarriedOverWithVideo,
        }));
    }
    if let Some(candidate) = inside.first() {
        return Ok(Some(Selection {
            candidate: *candidate,
            reason: SelectionReason::CarriedOver,
        }));
    }

    if let Some(problem_id) = source.first_member_with_video(members)? {
        return Ok(Some(Selection {
            candidate: RepresentativeCandidate {
                problem_id,
                has_video: true,
                provenance: Provenance::Member,
            },
            reason: SelectionReason::MemberWithVideo,
        }));
    }

    let reason = if crossings.is_empty() {
        SelectionReason::NoCrossing
    } else if existing.is_empty() {
        SelectionReason::NoCrossedRepresentative
    } else {
        SelectionReason::CrossedRepresentativeOutside
    };
    Ok(Some(Selection {
        candidate: RepresentativeCandidate {
            problem_id: highest,
            has_video: false,
            provenance: Provenance::Member,
        },
        reason,
    }))
}

/// Resolve-time view: representatives as recorded in the snapshot, no member video evidence.
pub struct SnapshotSource<'a> {
    snapshot: &'a GroupSnapshot,
}

impl<'a> SnapshotSource<'a> {
    pub fn new(snapshot: &'a GroupSnapshot) -> Self {
        Self { snapshot }
    }
}

impl RepresentativeSource for SnapshotSource<'_> {
    fn crossed_representatives(
        &mut self,
        crossings: &[CrossingGroup],
    ) -> Result<Vec<RepresentativeCandidate>, RegroupError> {
        Ok(crossings
            .iter()
            .filter_map(|crossing| {
                let group = self.snapshot.get(crossing.group_id)?;
                let problem_id = group.current_representative()?;
                Some(RepresentativeCandidate {
                    problem_id,
                    has_video: group.representative_has_video,
                    provenance: Provenance::CrossedGroup(group.id),
                })
            })
            .collect())
    }

    fn first_member_with_video(
        &mut self,
        _members: &[ProblemId],
    ) -> Result<Option<ProblemId>, RegroupError> {
        Ok(None)
    }
}
