//! Submission verification
//!
//! A submission is correct when, after both it and the canonical sequence are
//! normalized over the level's interchangeable groups, the two resolve to the
//! same code text line for line. Text is compared rather than ids so that two
//! fragments with identical code are interchangeable.

use crate::normalize::normalize;
use crate::types::{FragmentId, Level, Submission};
use serde::Serialize;

/// Why a submission was rejected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Mismatch {
    /// Extra or missing fragments.
    Length { expected: usize, actual: usize },
    /// First position whose code differs (or does not resolve).
    Content { position: usize },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Accepted,
    Rejected(Mismatch),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }
}

/// Verify a flattened id sequence against a level.
pub fn verify(submitted: &[FragmentId], level: &Level) -> bool {
    check(submitted, level).is_accepted()
}

/// Verify a row-structured submission.
pub fn verify_submission(submission: &Submission, level: &Level) -> bool {
    verify(&submission.flatten(), level)
}

/// Like [`verify`], but reports where the submission went wrong.
pub fn check(submitted: &[FragmentId], level: &Level) -> Verdict {
    let groups = &level.interchangeable_groups;
    let (user, canonical) = if groups.is_empty() {
        (submitted.to_vec(), level.canonical_sequence.clone())
    } else {
        (
            normalize(submitted, groups),
            normalize(&level.canonical_sequence, groups),
        )
    };

    if user.len() != canonical.len() {
        return Verdict::Rejected(Mismatch::Length {
            expected: canonical.len(),
            actual: user.len(),
        });
    }

    let user_code = resolve(&user, level);
    let canonical_code = resolve(&canonical, level);
    match user_code
        .iter()
        .zip(&canonical_code)
        .position(|(a, b)| !same_code(*a, *b))
    {
        Some(position) => Verdict::Rejected(Mismatch::Content { position }),
        None => Verdict::Accepted,
    }
}

/// Map ids to trimmed code text; `None` marks an id with no fragment.
fn resolve<'a>(ids: &[FragmentId], level: &'a Level) -> Vec<Option<&'a str>> {
    ids.iter()
        .map(|id| level.fragment(id).map(|f| f.text.trim()))
        .collect()
}

/// Unresolvable ids never match anything, not even each other.
fn same_code(a: Option<&str>, b: Option<&str>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a == b)
}
